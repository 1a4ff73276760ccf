//! Vigil - Multi-source equity market data aggregation server

pub mod api;
pub mod clock;
pub mod config;
pub mod error;
pub mod services;
pub mod sources;
pub mod types;

use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<config::Config>,
    pub cache: Arc<services::SnapshotCache>,
    pub refresher: Arc<services::RefreshEngine>,
}

// Re-export commonly used types
pub use clock::SessionPhase;
pub use services::SnapshotCache;
pub use types::*;
