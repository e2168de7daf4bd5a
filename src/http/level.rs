//! Runtime level endpoint.
//!
//! `GET` returns `{"level":"info"}`; `PUT {"level":"warn"}` updates the shared
//! register and returns the new level. Unknown names answer 400.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::logging::{Context, Field, Level, LevelRegister};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelStatus {
    pub level: Level,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LevelUpdate {
    pub level: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct LevelError {
    pub error: String,
}

/// Router serving the level endpoint at its root.
pub fn level_routes(register: LevelRegister) -> Router {
    Router::new()
        .route("/", get(get_level).put(put_level))
        .with_state(register)
}

async fn get_level(State(register): State<LevelRegister>) -> Json<LevelStatus> {
    Json(LevelStatus {
        level: register.level(),
    })
}

async fn put_level(
    State(register): State<LevelRegister>,
    ctx: Context,
    Json(update): Json<LevelUpdate>,
) -> Response {
    let previous = register.level();
    match register.set(&update.level) {
        Ok(()) => {
            ctx.logger().info(
                "log level changed",
                &[
                    Field::display("from", previous),
                    Field::display("to", register.level()),
                ],
            );
            Json(LevelStatus {
                level: register.level(),
            })
            .into_response()
        }
        Err(err) => (
            StatusCode::BAD_REQUEST,
            Json(LevelError {
                error: err.to_string(),
            }),
        )
            .into_response(),
    }
}
