use axum::{http::StatusCode, routing::get, Router};

use crate::state::AppState;

pub fn health_routes() -> Router<AppState> {
    Router::new()
        .route("/health/live", get(live))
        .route("/health/ready", get(ready))
}

pub async fn live() -> (StatusCode, &'static str) {
    (StatusCode::OK, "OK")
}

pub async fn ready() -> (StatusCode, &'static str) {
    (StatusCode::OK, "READY")
}
