pub mod cache;
pub mod indicators;
pub mod reconcile;
pub mod refresh;
pub mod signals;

pub use cache::{SnapshotCache, SymbolState};
pub use reconcile::SourceReadings;
pub use refresh::RefreshEngine;
