//! Snapshot serving endpoint.

use crate::types::Snapshot;
use crate::AppState;
use axum::{extract::State, routing::get, Json, Router};

/// Serve the aggregated snapshot, refreshing it first when the cached
/// one has aged past the refresh window.
async fn get_data(State(state): State<AppState>) -> Json<Snapshot> {
    Json(state.refresher.ensure_fresh().await)
}

pub fn router() -> Router<AppState> {
    Router::new().route("/data", get(get_data))
}
