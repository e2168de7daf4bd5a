//! Request-scoped logger registry.
//!
//! # Responsibilities
//! - Carry a logger handle through a call chain in an immutable scope chain
//! - Derive child scopes with extra fields or a longer name
//! - Fall back to the no-op logger when nothing was stored
//!
//! # Design Decisions
//! - A `Context` is a cheap `Arc` clone; children point at their parent
//! - A child scope shadows its parent's logger without mutating it
//! - When no logger is present, derivation returns the input context unchanged

use std::fmt;
use std::sync::Arc;

use super::field::Field;
use super::logger::{Logger, Options};
use super::sink::Sink;

/// Immutable chain of request scopes.
#[derive(Clone, Default)]
pub struct Context {
    scope: Option<Arc<Scope>>,
}

struct Scope {
    logger: Logger,
    parent: Context,
}

impl Context {
    /// The empty root context.
    pub fn background() -> Self {
        Self::default()
    }

    /// Nearest stored logger, or [`Logger::nop`].
    pub fn logger(&self) -> &Logger {
        match &self.scope {
            Some(scope) => &scope.logger,
            None => Logger::nop(),
        }
    }

    pub fn has_logger(&self) -> bool {
        self.scope.is_some()
    }

    /// The context this one was derived from.
    pub fn parent(&self) -> Option<&Context> {
        self.scope.as_ref().map(|scope| &scope.parent)
    }

    /// Number of scopes between this context and the root.
    pub fn depth(&self) -> usize {
        let mut depth = 0;
        let mut current = self;
        while let Some(parent) = current.parent() {
            depth += 1;
            current = parent;
        }
        depth
    }

    fn child(&self, logger: Logger) -> Context {
        Context {
            scope: Some(Arc::new(Scope {
                logger,
                parent: self.clone(),
            })),
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("depth", &self.depth())
            .field("logger", self.logger())
            .finish()
    }
}

/// Build a logger from `sink` and `options` and store it in a child of `ctx`.
pub fn new<S: Sink>(ctx: &Context, sink: S, options: Options) -> Context {
    with_logger(ctx, Logger::new(sink, options))
}

/// Store an existing logger in a child of `ctx`.
pub fn with_logger(ctx: &Context, logger: Logger) -> Context {
    ctx.child(logger)
}

/// Logger stored in `ctx`, or the no-op logger.
pub fn from_context(ctx: &Context) -> &Logger {
    ctx.logger()
}

/// Add fields to the context logger and store the result in a child context.
///
/// Without a stored logger, returns `ctx` unchanged and the no-op logger.
pub fn with(ctx: &Context, fields: impl IntoIterator<Item = Field>) -> (Context, Logger) {
    match &ctx.scope {
        Some(scope) => {
            let logger = scope.logger.with(fields);
            (ctx.child(logger.clone()), logger)
        }
        None => (ctx.clone(), Logger::nop().clone()),
    }
}

/// Append `name` (and optional fields) to the context logger and store the
/// result in a child context.
pub fn named(
    ctx: &Context,
    name: &str,
    fields: impl IntoIterator<Item = Field>,
) -> (Context, Logger) {
    match &ctx.scope {
        Some(scope) => {
            let logger = scope.logger.named(name).with(fields);
            (ctx.child(logger.clone()), logger)
        }
        None => (ctx.clone(), Logger::nop().clone()),
    }
}

/// Log an info message to the context logger.
pub fn info(ctx: &Context, message: &str, fields: &[Field]) {
    ctx.logger().info(message, fields)
}

/// Log an error message to the context logger.
pub fn error(ctx: &Context, message: &str, fields: &[Field]) {
    ctx.logger().error(message, fields)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::field::Value;
    use crate::logging::level::{Level, LevelRegister};
    use crate::logging::sink::CaptureSink;

    fn root(sink: &CaptureSink) -> Context {
        new(
            &Context::background(),
            sink.clone(),
            Options::new().level(LevelRegister::new(Level::Debug)),
        )
    }

    #[test]
    fn empty_context_yields_nop() {
        let ctx = Context::background();
        assert!(!ctx.has_logger());
        assert!(from_context(&ctx).is_nop());
        info(&ctx, "nowhere", &[]);
        error(&ctx, "nowhere", &[Field::string("k", "v")]);
    }

    #[test]
    fn with_on_empty_context_returns_it_unchanged() {
        let ctx = Context::background();
        let (child, logger) = with(&ctx, [Field::string("id", "x")]);
        assert!(logger.is_nop());
        assert!(!child.has_logger());
        assert_eq!(child.depth(), 0);

        let (child, logger) = named(&ctx, "request", Vec::<Field>::new());
        assert!(logger.is_nop());
        assert_eq!(child.depth(), 0);
    }

    #[test]
    fn with_shadows_without_mutating_parent() {
        let sink = CaptureSink::new();
        let parent = root(&sink);
        let (child, handle) = with(&parent, [Field::string("id", "abc")]);

        assert_eq!(child.depth(), 2);
        assert_eq!(from_context(&child).fields(), handle.fields());
        assert!(from_context(&parent).fields().is_empty());

        info(&parent, "parent", &[]);
        info(&child, "child", &[]);
        let records = sink.records();
        assert_eq!(records[0].field("id"), None);
        assert_eq!(records[1].field("id"), Some(&Value::Str("abc".into())));
    }

    #[test]
    fn with_unions_fields() {
        let sink = CaptureSink::new();
        let (ctx, _) = with(&root(&sink), [Field::string("a", "1")]);
        let (ctx, _) = with(&ctx, [Field::string("b", "2")]);

        let keys: Vec<&str> = from_context(&ctx).fields().iter().map(Field::key).collect();
        assert_eq!(keys, ["a", "b"]);
    }

    #[test]
    fn named_extends_name_and_adds_fields() {
        let sink = CaptureSink::new();
        let base = with_logger(
            &Context::background(),
            Logger::new(sink.clone(), Options::new().name("server")),
        );
        let (ctx, logger) = named(&base, "request", [Field::string("method", "GET")]);

        assert_eq!(logger.name(), Some("server.request"));
        assert_eq!(from_context(&base).name(), Some("server"));

        error(&ctx, "boom", &[]);
        let record = &sink.records()[0];
        assert_eq!(record.level, Level::Error);
        assert_eq!(record.name.as_deref(), Some("server.request"));
        assert_eq!(record.field("method"), Some(&Value::Str("GET".into())));
    }

    #[test]
    fn parent_link_is_preserved() {
        let sink = CaptureSink::new();
        let base = root(&sink);
        let (child, _) = with(&base, [Field::string("k", "v")]);
        let parent = child.parent().unwrap();
        assert!(parent.logger().fields().is_empty());
        assert_eq!(parent.depth(), 1);
    }
}
