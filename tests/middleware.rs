//! Middleware behavior driven through axum routers without a socket.

use std::sync::atomic::{AtomicBool, Ordering};
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use axum::{
    body::{Body, Bytes},
    http::{Request, StatusCode},
    routing::{get, post},
    Extension, Router,
};

use ctxlog::config::AppConfig;
use ctxlog::http::{
    ContextLayer, EntropyError, HttpServer, MakeRequestId, RequestId, RequestIdError,
    RequestIdLayer, RequestLogLayer, X_REQUEST_ID,
};
use ctxlog::logging::{self, Context, JsonSink, Level, LevelRegister, Options, Value};

mod common;

fn instrumented(router: Router, ctx: Context) -> Router {
    router
        .layer(RequestLogLayer::new())
        .layer(RequestIdLayer::new())
        .layer(ContextLayer::new(ctx))
}

async fn header_seen_by_handler(req: Request<Body>) -> String {
    req.headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string()
}

fn is_generated_id(id: &str) -> bool {
    id.len() == 64 && id.chars().all(|c| matches!(c, '0'..='9' | 'a'..='f'))
}

#[tokio::test]
async fn generates_id_when_header_missing() {
    let (_, _, ctx) = common::capture_context(Level::Debug);
    let router = instrumented(Router::new().route("/", get(header_seen_by_handler)), ctx);

    let (response, body) = common::send(router, Request::get("/").body(Body::empty()).unwrap()).await;

    let header = response.headers()[X_REQUEST_ID].to_str().unwrap().to_string();
    assert!(is_generated_id(&header), "unexpected id {header:?}");
    assert_eq!(std::str::from_utf8(&body).unwrap(), header);
}

#[tokio::test]
async fn honors_existing_id() {
    let (_, _, ctx) = common::capture_context(Level::Debug);
    let router = instrumented(Router::new().route("/", get(header_seen_by_handler)), ctx);

    let req = Request::get("/")
        .header(X_REQUEST_ID, "abc123")
        .body(Body::empty())
        .unwrap();
    let (response, body) = common::send(router, req).await;

    assert_eq!(response.headers()[X_REQUEST_ID], "abc123");
    assert_eq!(&body[..], b"abc123");
}

#[tokio::test]
async fn empty_header_counts_as_missing() {
    let (_, _, ctx) = common::capture_context(Level::Debug);
    let router = instrumented(Router::new().route("/", get(header_seen_by_handler)), ctx);

    let req = Request::get("/")
        .header(X_REQUEST_ID, "")
        .body(Body::empty())
        .unwrap();
    let (response, _) = common::send(router, req).await;

    assert!(is_generated_id(response.headers()[X_REQUEST_ID].to_str().unwrap()));
}

#[tokio::test]
async fn request_id_reaches_extensions_and_logger() {
    let (sink, _, ctx) = common::capture_context(Level::Debug);
    let router = instrumented(
        Router::new().route(
            "/",
            get(|Extension(id): Extension<RequestId>, ctx: Context| async move {
                ctx.logger().info("handled", &[]);
                id.to_string()
            }),
        ),
        ctx,
    );

    let req = Request::get("/")
        .header(X_REQUEST_ID, "trace-me")
        .body(Body::empty())
        .unwrap();
    let (_, body) = common::send(router, req).await;
    assert_eq!(&body[..], b"trace-me");

    let records = sink.records();
    let handled = records.iter().find(|r| r.message == "handled").unwrap();
    assert_eq!(handled.name.as_deref(), Some("test.request"));
    assert_eq!(handled.field("id"), Some(&Value::Str("trace-me".into())));
    assert_eq!(handled.field("method"), Some(&Value::Str("GET".into())));
}

struct NoEntropy;

impl MakeRequestId for NoEntropy {
    fn make_request_id(&self) -> Result<RequestId, RequestIdError> {
        Err(EntropyError::new("random source unavailable").into())
    }
}

#[tokio::test]
async fn entropy_failure_answers_500_without_calling_handler() {
    let (sink, _, ctx) = common::capture_context(Level::Debug);
    let called = Arc::new(AtomicBool::new(false));
    let flag = called.clone();

    let router = Router::new()
        .route(
            "/",
            get(move || {
                let flag = flag.clone();
                async move {
                    flag.store(true, Ordering::SeqCst);
                    "unreachable"
                }
            }),
        )
        .layer(RequestIdLayer::with_generator(NoEntropy))
        .layer(ContextLayer::new(ctx));

    let (response, _) = common::send(router, Request::get("/").body(Body::empty()).unwrap()).await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(response.headers().get(X_REQUEST_ID).is_none());
    assert!(!called.load(Ordering::SeqCst));

    let records = sink.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].level, Level::Error);
    assert!(matches!(
        records[0].field("error"),
        Some(Value::Str(msg)) if msg.contains("random source unavailable")
    ));
}

#[tokio::test]
async fn entropy_failure_is_skipped_when_id_supplied() {
    let (_, _, ctx) = common::capture_context(Level::Debug);
    let router = Router::new()
        .route("/", get(|| async { "ok" }))
        .layer(RequestIdLayer::with_generator(NoEntropy))
        .layer(ContextLayer::new(ctx));

    let req = Request::get("/")
        .header(X_REQUEST_ID, "given")
        .body(Body::empty())
        .unwrap();
    let (response, _) = common::send(router, req).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[X_REQUEST_ID], "given");
}

#[tokio::test]
async fn completion_entry_reports_sizes_and_default_status() {
    let (sink, _, ctx) = common::capture_context(Level::Debug);
    let router = instrumented(
        Router::new().route("/upload", post(|body: Bytes| async move { format!("{} bytes", body.len()) })),
        ctx,
    );

    let req = Request::post("/upload")
        .header("host", "api.test")
        .body(Body::from(vec![b'x'; 42]))
        .unwrap();
    let (response, body) = common::send(router, req).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(&body[..], b"42 bytes");

    let records = sink.records();
    let entry = records
        .iter()
        .find(|r| r.message == "request completed")
        .expect("completion entry");
    assert_eq!(entry.level, Level::Info);
    assert_eq!(entry.name.as_deref(), Some("test.request"));
    assert_eq!(entry.field("host"), Some(&Value::Str("api.test".into())));
    assert_eq!(entry.field("path"), Some(&Value::Str("/upload".into())));
    assert_eq!(entry.field("request_body_bytes"), Some(&Value::U64(42)));
    assert_eq!(entry.field("response_body_bytes"), Some(&Value::U64(8)));
    assert_eq!(entry.field("response_status_code"), Some(&Value::U64(200)));
    assert!(matches!(entry.field("elapsed_duration"), Some(Value::Duration(_))));
    assert!(matches!(entry.field("id"), Some(Value::Str(id)) if is_generated_id(id)));
}

#[tokio::test]
async fn completion_entry_reports_explicit_status() {
    let (sink, register, ctx) = common::capture_context(Level::Debug);
    let router = HttpServer::new(AppConfig::default(), ctx, register).router();

    let (response, body) =
        common::send(router, Request::get("/status/404").body(Body::empty()).unwrap()).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(body.is_empty());

    let records = sink.records();
    let entry = records
        .iter()
        .find(|r| r.message == "request completed")
        .expect("completion entry");
    assert_eq!(entry.field("response_status_code"), Some(&Value::U64(404)));
    assert_eq!(entry.field("response_body_bytes"), Some(&Value::U64(0)));
}

#[tokio::test]
async fn threshold_above_info_suppresses_completion_entry() {
    let (sink, register, ctx) = common::capture_context(Level::Warn);
    let router = HttpServer::new(AppConfig::default(), ctx, register).router();

    let (response, _) = common::send(
        router,
        Request::post("/echo").body(Body::from("quiet")).unwrap(),
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn handlers_without_context_layer_get_nop_logger() {
    let router = Router::new().route(
        "/",
        get(|ctx: Context| async move {
            ctx.logger().error("goes nowhere", &[]);
            if ctx.logger().is_nop() { "nop" } else { "real" }
        }),
    );

    let (_, body) = common::send(router, Request::get("/").body(Body::empty()).unwrap()).await;
    assert_eq!(&body[..], b"nop");
}

#[derive(Clone, Default)]
struct Lines(Arc<Mutex<Vec<u8>>>);

impl Write for Lines {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[tokio::test]
async fn json_completion_entry_has_typed_fields() {
    let lines = Lines::default();
    let ctx = logging::new(
        &Context::background(),
        JsonSink::new(lines.clone()),
        Options::new().level(LevelRegister::new(Level::Info)).name("srv"),
    );
    let router = instrumented(
        Router::new().route("/upload", post(|body: Bytes| async move { body })),
        ctx,
    );

    let req = Request::post("/upload")
        .header(X_REQUEST_ID, "abc")
        .body(Body::from(vec![b'x'; 42]))
        .unwrap();
    let (response, _) = common::send(router, req).await;
    assert_eq!(response.status(), StatusCode::OK);

    let output = String::from_utf8(lines.0.lock().unwrap().clone()).unwrap();
    let entry: serde_json::Value = output
        .lines()
        .map(|line| serde_json::from_str::<serde_json::Value>(line).unwrap())
        .find(|entry| entry["msg"] == "request completed")
        .expect("completion entry");

    assert_eq!(entry["logger"], "srv.request");
    assert_eq!(entry["id"], "abc");
    assert_eq!(entry["method"], "POST");
    assert!(entry["request_body_bytes"].is_u64());
    assert_eq!(entry["request_body_bytes"], 42);
    assert_eq!(entry["response_body_bytes"], 42);
    assert_eq!(entry["response_status_code"], 200);
    assert!(entry["elapsed_duration"].is_f64());
}
