pub mod admin;
pub mod health;
pub mod snapshot;

use crate::AppState;
use axum::Router;

/// Create the API router.
pub fn router() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .merge(snapshot::router())
        .merge(admin::router())
}
