//! Administrative endpoints: symbol universe replacement and cache reset.
//! Both clear all cached state and take effect on the next refresh cycle.

use crate::error::{AppError, Result};
use crate::AppState;
use axum::{extract::State, routing::post, Json, Router};
use serde::Serialize;
use tracing::info;

#[derive(Serialize)]
struct MessageResponse {
    message: &'static str,
}

/// Replace the symbol universe. Symbols are trimmed and uppercased;
/// the whole cache is invalidated, replaced symbols included.
async fn update_symbols(
    State(state): State<AppState>,
    Json(symbols): Json<Vec<String>>,
) -> Result<Json<MessageResponse>> {
    let symbols: Vec<String> = symbols
        .into_iter()
        .map(|s| s.trim().to_uppercase())
        .filter(|s| !s.is_empty())
        .collect();

    if symbols.is_empty() {
        return Err(AppError::BadRequest(
            "symbol list must not be empty".to_string(),
        ));
    }

    info!(count = symbols.len(), "replacing symbol universe");
    state.cache.replace_symbols(symbols).await;

    Ok(Json(MessageResponse {
        message: "Symbols updated successfully. Cache cleared.",
    }))
}

/// Clear all cached state. Idempotent.
async fn reset_cache(State(state): State<AppState>) -> Json<MessageResponse> {
    info!("clearing snapshot cache");
    state.cache.reset().await;
    Json(MessageResponse {
        message: "Cache cleared successfully.",
    })
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/symbols", post(update_symbols))
        .route("/cache/reset", post(reset_cache))
}
