//! Process-wide snapshot cache.
//!
//! One RwLock guards the whole per-symbol map, the symbol universe, and
//! the last built snapshot, so administrative clears are atomic with
//! respect to readers: a reader sees either the full prior state or the
//! full empty state, never a mix. A generation counter lets a refresh
//! that started before a clear detect that its results are stale.

use crate::clock::SessionPhase;
use crate::types::{DailyBar, Indicators, Snapshot};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Cached per-symbol state. Unresolved fields are `None` and persist from
/// cycle to cycle until a source resolves them again.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SymbolState {
    pub phase: Option<SessionPhase>,
    pub price: Option<f64>,
    pub volume: Option<u64>,
    pub vwap: Option<f64>,
    pub pre_market_price: Option<f64>,
    pub after_hours_price: Option<f64>,
    pub gap_pct: Option<f64>,
    pub pre_market_change_pct: Option<f64>,
    pub after_hours_change_pct: Option<f64>,
    pub overnight_return_pct: Option<f64>,
    pub history: Vec<DailyBar>,
    pub indicators: Option<Indicators>,
}

#[derive(Debug)]
struct CacheInner {
    generation: u64,
    symbols: Vec<String>,
    states: HashMap<String, SymbolState>,
    snapshot: Option<Snapshot>,
    last_refresh: Option<Instant>,
}

impl CacheInner {
    fn fresh(generation: u64, symbols: Vec<String>) -> Self {
        Self {
            generation,
            symbols,
            states: HashMap::new(),
            snapshot: None,
            last_refresh: None,
        }
    }
}

/// Snapshot cache shared between the refresh cycle (writer) and the
/// serving handlers (readers).
pub struct SnapshotCache {
    inner: RwLock<CacheInner>,
}

impl SnapshotCache {
    pub fn new(symbols: Vec<String>) -> Self {
        Self {
            inner: RwLock::new(CacheInner::fresh(0, symbols)),
        }
    }

    /// The current symbol universe.
    pub async fn symbols(&self) -> Vec<String> {
        self.inner.read().await.symbols.clone()
    }

    /// Begin a refresh: the generation to apply against, the universe, and
    /// a copy of the prior per-symbol states.
    pub async fn begin_cycle(&self) -> (u64, Vec<String>, HashMap<String, SymbolState>) {
        let inner = self.inner.read().await;
        (
            inner.generation,
            inner.symbols.clone(),
            inner.states.clone(),
        )
    }

    /// Apply a completed cycle's states and snapshot. Returns false (and
    /// discards the results) when the cache was cleared or the universe
    /// replaced while the cycle was running.
    pub async fn apply_cycle(
        &self,
        generation: u64,
        states: HashMap<String, SymbolState>,
        snapshot: Snapshot,
    ) -> bool {
        let mut inner = self.inner.write().await;
        if inner.generation != generation {
            return false;
        }
        inner.states = states;
        inner.snapshot = Some(snapshot);
        inner.last_refresh = Some(Instant::now());
        true
    }

    /// Last built snapshot, if any cycle has completed since the last clear.
    pub async fn snapshot(&self) -> Option<Snapshot> {
        self.inner.read().await.snapshot.clone()
    }

    /// Whether the last completed refresh is younger than `max_age`.
    pub async fn fresh_within(&self, max_age: Duration) -> bool {
        let inner = self.inner.read().await;
        match inner.last_refresh {
            Some(at) => at.elapsed() < max_age && inner.snapshot.is_some(),
            None => false,
        }
    }

    /// Clear all cached state. Idempotent.
    pub async fn reset(&self) {
        let mut inner = self.inner.write().await;
        let symbols = inner.symbols.clone();
        *inner = CacheInner::fresh(inner.generation + 1, symbols);
    }

    /// Replace the symbol universe and clear all cached state in the same
    /// critical section. Partial invalidation is never valid, so this
    /// clears even when the new universe equals the old one.
    pub async fn replace_symbols(&self, symbols: Vec<String>) {
        let mut inner = self.inner.write().await;
        *inner = CacheInner::fresh(inner.generation + 1, symbols);
    }
}
