//! Per-symbol reconciliation of multi-source readings.
//!
//! The cascade is strict: for each of price, volume, and VWAP the first
//! source in priority order that yields a positive value wins the cycle,
//! and lower-priority sources never overwrite it. Unresolved fields keep
//! whatever the cache held from earlier cycles.

use crate::clock::SessionPhase;
use crate::services::cache::SymbolState;
use crate::sources::{FastQuote, IntradayPulse, QuoteData, SecondaryQuote};

/// Already-fetched adapter outcomes for one symbol. `None` means the
/// source was unavailable (or disabled) this cycle.
#[derive(Debug, Clone, Default)]
pub struct SourceReadings {
    /// Batch quote entry (highest-priority price/volume source).
    pub batch: Option<QuoteData>,
    /// Intraday chart observation.
    pub intraday: Option<IntradayPulse>,
    /// Secondary quote source, when enabled.
    pub secondary: Option<SecondaryQuote>,
    /// Ticker metadata, the last-resort price/volume source.
    pub fast: Option<FastQuote>,
    /// Session VWAP already resolved through its own two-step cascade;
    /// `Some` only when a positive value was produced.
    pub vwap: Option<f64>,
    /// Previous session's volume from the last-resort source, fetched
    /// only when no earlier source can resolve volume this cycle.
    pub last_resort_volume: Option<u64>,
}

/// Resolve the batch-quote price for the current phase: the session
/// price when the phase has one, falling through to the regular price.
pub(crate) fn batch_price(batch: &QuoteData, phase: SessionPhase) -> Option<f64> {
    match phase {
        SessionPhase::PreMarket if batch.pre_market().is_some() => batch.pre_market(),
        SessionPhase::AfterHours if batch.post_market().is_some() => batch.post_market(),
        _ => batch.regular(),
    }
}

/// Phase-keyed price from ticker metadata, falling through to the last
/// traded price.
fn fast_price(fast: &FastQuote, phase: SessionPhase) -> Option<f64> {
    match phase {
        SessionPhase::PreMarket if fast.pre_market_price.is_some() => fast.pre_market_price,
        SessionPhase::AfterHours if fast.post_market_price.is_some() => fast.post_market_price,
        _ => fast.last_price,
    }
}

/// Run one reconciliation pass for a symbol, updating the cached state
/// in place. `state.indicators` must already reflect this cycle's
/// indicator computation, since the derived metrics read the prior
/// regular close from it.
pub fn reconcile(state: &mut SymbolState, phase: SessionPhase, readings: &SourceReadings) {
    state.phase = Some(phase);

    // VWAP was resolved upstream; only a positive result replaces the
    // cached value.
    if let Some(vwap) = readings.vwap.filter(|v| *v > 0.0) {
        state.vwap = Some(vwap);
    }

    // Session prices observed this cycle. These locals, not the cache,
    // drive the derived metrics below.
    let mut pre_price = readings.batch.as_ref().and_then(|b| b.pre_market());
    let mut post_price = readings.batch.as_ref().and_then(|b| b.post_market());

    // Price cascade.
    let mut price = readings
        .batch
        .as_ref()
        .and_then(|b| batch_price(b, phase));

    let mut volume = readings.batch.as_ref().and_then(|b| b.regular_volume());

    if price.is_none() {
        if let Some(pulse) = &readings.intraday {
            price = pulse.price.filter(|p| *p > 0.0);
            if volume.is_none() && pulse.volume > 0 {
                volume = Some(pulse.volume);
            }
        }
    }

    if price.is_none() {
        price = readings
            .secondary
            .as_ref()
            .map(|q| q.current)
            .filter(|c| *c > 0.0);
    }

    if let Some(fast) = &readings.fast {
        if volume.is_none() {
            volume = fast.last_volume.or(fast.avg_volume).filter(|v| *v > 0);
        }
        if price.is_none() {
            price = fast_price(fast, phase).filter(|p| *p > 0.0);
        }
    }

    if volume.is_none() {
        volume = readings.last_resort_volume.filter(|v| *v > 0);
    }

    if let Some(vol) = volume {
        state.volume = Some(vol);
    }

    let Some(price) = price else {
        // Nothing resolved; the cache keeps last cycle's values.
        return;
    };
    state.price = Some(price);

    // In an extended session with no separately observed session price,
    // the resolved price is the session price.
    if phase == SessionPhase::PreMarket && pre_price.is_none() {
        pre_price = Some(price);
    } else if phase == SessionPhase::AfterHours && post_price.is_none() {
        post_price = Some(price);
    }

    let reg_close = state
        .indicators
        .as_ref()
        .and_then(|i| i.prior_regular_close)
        .filter(|c| *c > 0.0);

    if let Some(reg_close) = reg_close {
        state.gap_pct = Some((price - reg_close) / reg_close * 100.0);
    }

    if let Some(pre) = pre_price {
        state.pre_market_price = Some(pre);
        if let Some(reg_close) = reg_close {
            state.pre_market_change_pct = Some((pre - reg_close) / reg_close * 100.0);
        }
    }

    if let Some(post) = post_price {
        state.after_hours_price = Some(post);
        if let Some(reg_close) = reg_close {
            state.after_hours_change_pct = Some((post - reg_close) / reg_close * 100.0);
        }
    }

    // Overnight return compares the session prices observed this cycle.
    // When only one side was observed, the previously cached value
    // persists untouched; whether the cached after-hours operand belongs
    // to the previous session is a known timing ambiguity carried over
    // from the original behavior.
    if let (Some(pre), Some(post)) = (pre_price, post_price) {
        if post > 0.0 {
            state.overnight_return_pct = Some((pre - post) / post * 100.0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Indicators;

    fn indicators_with_prior_close(prior: f64) -> Indicators {
        Indicators {
            sma_20: None,
            sma_50: None,
            sma_200: None,
            rsi: 50.0,
            atr: 0.0,
            atr_pct: 0.0,
            trend_score: 0,
            prior_regular_close: Some(prior),
        }
    }

    fn batch(pre: Option<f64>, post: Option<f64>, reg: Option<f64>, vol: Option<u64>) -> QuoteData {
        QuoteData {
            symbol: "TEST".to_string(),
            pre_market_price: pre,
            post_market_price: post,
            regular_market_price: reg,
            regular_market_volume: vol,
            ..Default::default()
        }
    }

    #[test]
    fn test_batch_regular_price_wins_when_open() {
        let mut state = SymbolState::default();
        let readings = SourceReadings {
            batch: Some(batch(None, None, Some(150.0), Some(1_000_000))),
            intraday: Some(IntradayPulse {
                price: Some(149.0),
                volume: 2_000_000,
            }),
            ..Default::default()
        };

        reconcile(&mut state, SessionPhase::Open, &readings);
        assert_eq!(state.price, Some(150.0));
        assert_eq!(state.volume, Some(1_000_000));
    }

    #[test]
    fn test_phase_selects_batch_field() {
        let quote = batch(Some(101.0), Some(102.0), Some(100.0), None);

        let mut state = SymbolState::default();
        reconcile(
            &mut state,
            SessionPhase::PreMarket,
            &SourceReadings {
                batch: Some(quote.clone()),
                ..Default::default()
            },
        );
        assert_eq!(state.price, Some(101.0));

        let mut state = SymbolState::default();
        reconcile(
            &mut state,
            SessionPhase::AfterHours,
            &SourceReadings {
                batch: Some(quote.clone()),
                ..Default::default()
            },
        );
        assert_eq!(state.price, Some(102.0));

        let mut state = SymbolState::default();
        reconcile(
            &mut state,
            SessionPhase::Open,
            &SourceReadings {
                batch: Some(quote),
                ..Default::default()
            },
        );
        assert_eq!(state.price, Some(100.0));
    }

    #[test]
    fn test_pre_market_falls_through_to_regular() {
        // No pre-market price on the feed: the regular price still wins.
        let mut state = SymbolState::default();
        reconcile(
            &mut state,
            SessionPhase::PreMarket,
            &SourceReadings {
                batch: Some(batch(None, None, Some(99.5), None)),
                ..Default::default()
            },
        );
        assert_eq!(state.price, Some(99.5));
        // And becomes the observed pre-market price.
        assert_eq!(state.pre_market_price, Some(99.5));
    }

    #[test]
    fn test_intraday_fallback_when_batch_missing() {
        let mut state = SymbolState::default();
        reconcile(
            &mut state,
            SessionPhase::Open,
            &SourceReadings {
                intraday: Some(IntradayPulse {
                    price: Some(42.0),
                    volume: 500_000,
                }),
                ..Default::default()
            },
        );
        assert_eq!(state.price, Some(42.0));
        assert_eq!(state.volume, Some(500_000));
    }

    #[test]
    fn test_secondary_then_fast_fallback() {
        let mut state = SymbolState::default();
        reconcile(
            &mut state,
            SessionPhase::Open,
            &SourceReadings {
                secondary: Some(SecondaryQuote {
                    current: 12.5,
                    previous_close: Some(12.0),
                }),
                fast: Some(FastQuote {
                    last_price: Some(13.0),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        // Secondary outranks fast metadata.
        assert_eq!(state.price, Some(12.5));

        let mut state = SymbolState::default();
        reconcile(
            &mut state,
            SessionPhase::Open,
            &SourceReadings {
                fast: Some(FastQuote {
                    last_price: Some(13.0),
                    last_volume: Some(77_000),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        assert_eq!(state.price, Some(13.0));
        assert_eq!(state.volume, Some(77_000));
    }

    #[test]
    fn test_fast_avg_volume_when_last_missing() {
        let mut state = SymbolState::default();
        reconcile(
            &mut state,
            SessionPhase::Open,
            &SourceReadings {
                fast: Some(FastQuote {
                    last_price: Some(13.0),
                    avg_volume: Some(88_000),
                    ..Default::default()
                }),
                ..Default::default()
            },
        );
        assert_eq!(state.volume, Some(88_000));
    }

    #[test]
    fn test_nothing_resolved_keeps_cached_values() {
        let mut state = SymbolState {
            price: Some(50.0),
            volume: Some(10_000),
            vwap: Some(49.5),
            ..Default::default()
        };
        reconcile(&mut state, SessionPhase::Open, &SourceReadings::default());
        assert_eq!(state.price, Some(50.0));
        assert_eq!(state.volume, Some(10_000));
        assert_eq!(state.vwap, Some(49.5));
    }

    #[test]
    fn test_vwap_zero_never_overwrites() {
        let mut state = SymbolState {
            vwap: Some(49.5),
            ..Default::default()
        };
        reconcile(
            &mut state,
            SessionPhase::Open,
            &SourceReadings {
                vwap: Some(0.0),
                ..Default::default()
            },
        );
        assert_eq!(state.vwap, Some(49.5));
    }

    #[test]
    fn test_gap_requires_prior_close() {
        let mut state = SymbolState::default();
        reconcile(
            &mut state,
            SessionPhase::Open,
            &SourceReadings {
                batch: Some(batch(None, None, Some(110.0), None)),
                ..Default::default()
            },
        );
        assert_eq!(state.gap_pct, None);

        let mut state = SymbolState {
            indicators: Some(indicators_with_prior_close(100.0)),
            ..Default::default()
        };
        reconcile(
            &mut state,
            SessionPhase::Open,
            &SourceReadings {
                batch: Some(batch(None, None, Some(110.0), None)),
                ..Default::default()
            },
        );
        let gap = state.gap_pct.unwrap();
        assert!((gap - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_overnight_return_same_cycle_operands() {
        let mut state = SymbolState {
            indicators: Some(indicators_with_prior_close(100.0)),
            ..Default::default()
        };
        reconcile(
            &mut state,
            SessionPhase::PreMarket,
            &SourceReadings {
                batch: Some(batch(Some(101.0), Some(100.0), None, None)),
                ..Default::default()
            },
        );
        let overnight = state.overnight_return_pct.unwrap();
        assert!((overnight - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_overnight_return_not_computed_across_cycles() {
        // Known timing ambiguity: a cached after-hours price from an
        // earlier cycle does not participate; only same-cycle pairs do,
        // and the stale cached overnight value persists.
        let mut state = SymbolState {
            after_hours_price: Some(100.0),
            overnight_return_pct: Some(-2.0),
            indicators: Some(indicators_with_prior_close(100.0)),
            ..Default::default()
        };
        reconcile(
            &mut state,
            SessionPhase::PreMarket,
            &SourceReadings {
                batch: Some(batch(Some(101.0), None, None, None)),
                ..Default::default()
            },
        );
        assert_eq!(state.overnight_return_pct, Some(-2.0));
        assert_eq!(state.pre_market_price, Some(101.0));
        // The cached after-hours price survives the phase change.
        assert_eq!(state.after_hours_price, Some(100.0));
    }

    #[test]
    fn test_session_price_persisted_once_set() {
        let mut state = SymbolState::default();
        reconcile(
            &mut state,
            SessionPhase::AfterHours,
            &SourceReadings {
                batch: Some(batch(None, Some(55.0), Some(54.0), None)),
                ..Default::default()
            },
        );
        assert_eq!(state.after_hours_price, Some(55.0));

        // Next cycle, phase CLOSED, nothing observed: the price stays.
        reconcile(&mut state, SessionPhase::Closed, &SourceReadings::default());
        assert_eq!(state.after_hours_price, Some(55.0));
    }
}
