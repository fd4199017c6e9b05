pub mod health;
pub mod index;
pub mod profile;

use axum::{routing::get, Router};

use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(index::index))
        .route("/profile", get(profile::profile))
        .merge(health::health_routes())
}
