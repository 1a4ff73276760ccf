//! Refresh cycle orchestration.
//!
//! One cycle fetches history, recomputes indicators, runs the source
//! cascade for every symbol, and publishes a new snapshot. Cycles are
//! single-flighted and throttled: requests landing inside the refresh
//! window are served the cached snapshot without touching providers.

use crate::clock::{self, SessionPhase};
use crate::config::{Config, MacroProxies};
use crate::services::cache::{SnapshotCache, SymbolState};
use crate::services::reconcile::{self, SourceReadings};
use crate::services::{indicators, signals};
use crate::sources::{
    FastQuote, FinnhubClient, PolygonClient, QuoteData, YahooChartClient, YahooQuotesClient,
};
use crate::types::{Snapshot, Summary, SummaryEntry, TickerRow, Trend};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Drives refresh cycles against the shared cache.
pub struct RefreshEngine {
    config: Arc<Config>,
    cache: Arc<SnapshotCache>,
    chart: YahooChartClient,
    quotes: YahooQuotesClient,
    finnhub: Option<FinnhubClient>,
    polygon: Option<PolygonClient>,
    // Single-flights the cycle; handlers queue here instead of racing
    // provider fetches.
    cycle_gate: Mutex<()>,
}

impl RefreshEngine {
    /// Build the engine, composing optional sources from configuration.
    /// A source needs both its toggle and its API key to participate.
    pub fn new(config: Arc<Config>, cache: Arc<SnapshotCache>) -> Self {
        let finnhub = config
            .use_finnhub
            .then(|| config.finnhub_api_key.clone())
            .flatten()
            .map(FinnhubClient::new);
        let polygon = config
            .use_polygon
            .then(|| config.polygon_api_key.clone())
            .flatten()
            .map(PolygonClient::new);

        Self {
            config,
            cache,
            chart: YahooChartClient::new(),
            quotes: YahooQuotesClient::new(),
            finnhub,
            polygon,
            cycle_gate: Mutex::new(()),
        }
    }

    /// Serve the cached snapshot when it is inside the refresh window,
    /// otherwise run a cycle. Concurrent callers during a cycle wait for
    /// it and then get its result from the cache.
    pub async fn ensure_fresh(&self) -> Snapshot {
        let window = Duration::from_secs(self.config.refresh_rate_secs);

        if self.cache.fresh_within(window).await {
            if let Some(snapshot) = self.cache.snapshot().await {
                return snapshot;
            }
        }

        let _gate = self.cycle_gate.lock().await;

        // A cycle may have completed while we queued on the gate.
        if self.cache.fresh_within(window).await {
            if let Some(snapshot) = self.cache.snapshot().await {
                return snapshot;
            }
        }

        self.run_cycle().await
    }

    /// Run one full refresh cycle and publish the result. Returns the
    /// built snapshot even when the cache rejected it as stale.
    pub async fn run_cycle(&self) -> Snapshot {
        let phase = clock::current_phase();
        let (generation, symbols, mut states) = self.cache.begin_cycle().await;
        info!(%phase, symbols = symbols.len(), "starting refresh cycle");

        // Per-symbol ticker metadata, reused for the prior regular close
        // and as the last-resort price/volume cascade step.
        let mut fasts: HashMap<String, FastQuote> = HashMap::new();
        for symbol in &symbols {
            match self.quotes.fetch_fast(symbol).await {
                Ok(fast) => {
                    fasts.insert(symbol.clone(), fast);
                }
                Err(reason) => debug!(%symbol, %reason, "fast quote unavailable"),
            }
        }

        for symbol in &symbols {
            let fast = fasts.get(symbol).cloned();
            let state = states.entry(symbol.clone()).or_default();
            self.refresh_history(symbol, state, fast.as_ref()).await;
        }

        let batch = match self.quotes.fetch_batch(&symbols).await {
            Ok(quotes) => quotes,
            Err(reason) => {
                warn!(%reason, "batch quote fetch unavailable");
                HashMap::new()
            }
        };

        for symbol in &symbols {
            let readings = self
                .gather(
                    symbol,
                    phase,
                    batch.get(symbol).cloned(),
                    fasts.get(symbol).cloned(),
                )
                .await;
            let state = states.entry(symbol.clone()).or_default();
            reconcile::reconcile(state, phase, &readings);
        }

        let snapshot = self.build_snapshot(phase, &symbols, &states);

        if !self.cache.apply_cycle(generation, states, snapshot.clone()).await {
            debug!("universe changed mid-cycle, discarding results");
        }

        snapshot
    }

    /// Replace the daily history and recompute indicators for one symbol.
    /// History is replaced wholesale, even when every source came back
    /// empty; indicators are only overwritten on a successful compute.
    async fn refresh_history(
        &self,
        symbol: &str,
        state: &mut SymbolState,
        fast: Option<&FastQuote>,
    ) {
        state.history = match self.chart.daily_history(symbol).await {
            Ok(bars) => bars,
            Err(reason) => {
                debug!(symbol, %reason, "primary history unavailable");
                match &self.polygon {
                    Some(polygon) => match polygon.daily_history(symbol).await {
                        Ok(bars) => bars,
                        Err(reason) => {
                            debug!(symbol, %reason, "fallback history unavailable");
                            Vec::new()
                        }
                    },
                    None => Vec::new(),
                }
            }
        };

        if state.history.is_empty() {
            return;
        }

        let provider_prev = fast.and_then(|f| f.previous_close);
        if let Some(mut computed) = indicators::compute(&state.history, provider_prev) {
            if computed.prior_regular_close.is_none() {
                computed.prior_regular_close = self
                    .chart
                    .previous_close(symbol)
                    .await
                    .ok()
                    .filter(|c| *c > 0.0);
            }
            state.indicators = Some(computed);
        }
    }

    /// Fetch this cycle's readings for one symbol. Fallback sources are
    /// only hit when every higher-priority source failed to resolve the
    /// field they back, preserving the cascade's call laziness.
    async fn gather(
        &self,
        symbol: &str,
        phase: SessionPhase,
        batch: Option<QuoteData>,
        fast: Option<FastQuote>,
    ) -> SourceReadings {
        let vwap = match self.chart.session_vwap(symbol, phase).await {
            Ok(v) if v > 0.0 => Some(v),
            _ => self.chart.day_vwap(symbol).await.ok().filter(|v| *v > 0.0),
        };

        let batch_resolves_price = batch
            .as_ref()
            .and_then(|b| reconcile::batch_price(b, phase))
            .is_some();

        let intraday = if batch_resolves_price {
            None
        } else {
            match self.chart.intraday_pulse(symbol, phase).await {
                Ok(pulse) => Some(pulse),
                Err(reason) => {
                    debug!(symbol, %reason, "intraday pulse unavailable");
                    None
                }
            }
        };

        let price_still_missing = !batch_resolves_price
            && intraday
                .as_ref()
                .and_then(|p| p.price.filter(|v| *v > 0.0))
                .is_none();

        let secondary = if price_still_missing {
            match &self.finnhub {
                Some(finnhub) => match finnhub.quote(symbol).await {
                    Ok(quote) => Some(quote),
                    Err(reason) => {
                        debug!(symbol, %reason, "secondary quote unavailable");
                        None
                    }
                },
                None => None,
            }
        } else {
            None
        };

        let volume_resolved = batch
            .as_ref()
            .and_then(|b| b.regular_volume())
            .is_some()
            || intraday.as_ref().is_some_and(|p| p.volume > 0)
            || fast
                .as_ref()
                .is_some_and(|f| f.last_volume.or(f.avg_volume).is_some());

        let last_resort_volume = if volume_resolved {
            None
        } else {
            match &self.polygon {
                Some(polygon) => polygon.previous_volume(symbol).await.ok(),
                None => None,
            }
        };

        SourceReadings {
            batch,
            intraday,
            secondary,
            fast,
            vwap,
            last_resort_volume,
        }
    }

    fn build_snapshot(
        &self,
        phase: SessionPhase,
        symbols: &[String],
        states: &HashMap<String, SymbolState>,
    ) -> Snapshot {
        let default_state = SymbolState::default();
        let tickers: Vec<TickerRow> = symbols
            .iter()
            .map(|symbol| {
                let state = states.get(symbol).unwrap_or(&default_state);
                build_row(symbol, phase, state)
            })
            .collect();

        let summary = build_summary(&tickers, &self.config.macro_proxies);

        Snapshot {
            timestamp: clock::exchange_now().format("%Y-%m-%d %H:%M:%S").to_string(),
            status: phase,
            tickers,
            summary,
        }
    }
}

/// Flatten cached state into the wire row. Unresolved values serialize
/// as zeros, matching the historical response shape.
pub(crate) fn build_row(symbol: &str, phase: SessionPhase, state: &SymbolState) -> TickerRow {
    let ind = state.indicators.as_ref();
    let (score, note) = signals::composite_score(state);
    let trend_score = ind.map(|i| i.trend_score).unwrap_or(0);
    let session = state.phase.unwrap_or(phase);

    TickerRow {
        ticker: symbol.to_string(),
        session,
        session_liquidity: session.liquidity().to_string(),
        price: state.price.unwrap_or(0.0),
        regular_close: ind.and_then(|i| i.prior_regular_close).unwrap_or(0.0),
        pre_market_price: state.pre_market_price.unwrap_or(0.0),
        after_hours_price: state.after_hours_price.unwrap_or(0.0),
        gap_percent: state.gap_pct.unwrap_or(0.0),
        pre_market_change_percent: state.pre_market_change_pct.unwrap_or(0.0),
        after_hours_change_percent: state.after_hours_change_pct.unwrap_or(0.0),
        overnight_return_percent: state.overnight_return_pct.unwrap_or(0.0),
        volume: state.volume.unwrap_or(0),
        rvol: signals::rvol(state),
        atr_percent: ind.map(|i| i.atr_pct).unwrap_or(0.0),
        atr: ind.map(|i| i.atr).unwrap_or(0.0),
        rsi: ind.map(|i| i.rsi).unwrap_or(0.0),
        vwap: state.vwap.unwrap_or(0.0),
        distance_from_vwap: signals::vwap_distance(state.price, state.vwap),
        trend_score,
        score,
        signal: signals::classify(state),
        trend: Trend::from_score(trend_score),
        note: note.to_string(),
    }
}

/// Summarize the macro proxy rows. An entry appears only when its proxy
/// symbol is part of the universe.
pub(crate) fn build_summary(tickers: &[TickerRow], proxies: &MacroProxies) -> Summary {
    let mut summary = Summary::default();

    for row in tickers {
        if row.ticker == proxies.bond_yields {
            let falling = row.gap_percent < 0.0;
            summary.bond_yields = Some(SummaryEntry {
                status: Some(if falling { "FALLING" } else { "RISING" }.to_string()),
                tag: if falling {
                    "YIELDS FALLING"
                } else {
                    "YIELDS RISING"
                }
                .to_string(),
                value: format!("{}: {:.2} ({:+.2}%)", row.ticker, row.price, row.gap_percent),
            });
        } else if row.ticker == proxies.us_dollar {
            summary.us_dollar = Some(SummaryEntry {
                status: None,
                tag: if row.gap_percent > 0.0 {
                    "DOLLAR STRONG"
                } else {
                    "DOLLAR WEAK"
                }
                .to_string(),
                value: format!("{:.2}", row.price),
            });
        } else if row.ticker == proxies.market_fear {
            summary.market_fear = Some(SummaryEntry {
                status: Some(if row.gap_percent < 0.0 { "RISK ON" } else { "RISK OFF" }.to_string()),
                tag: if row.gap_percent > 0.0 {
                    "FEAR RISING"
                } else {
                    "FEAR FALLING"
                }
                .to_string(),
                value: format!("{}: {:.2} ({:+.2}%)", row.ticker, row.price, row.gap_percent),
            });
        }
    }

    summary
}
