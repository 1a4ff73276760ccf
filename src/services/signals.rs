//! Signal classification and composite scoring.
//!
//! Pure functions over cached symbol state. Sentinel handling is
//! deliberate: an unresolved price or VWAP disables the VWAP-relative
//! terms rather than producing a nonsense distance.

use crate::services::cache::SymbolState;
use crate::types::TradeSignal;

/// Annotation attached to the score when price sits well below VWAP.
pub const HV_BREAK_NOTE: &str = "(HV BREAK)";

/// Relative volume: current volume over the mean of the last 20 daily
/// volumes. 1.0 when history is missing or the average is zero.
pub fn rvol(state: &SymbolState) -> f64 {
    if state.history.is_empty() {
        return 1.0;
    }

    let tail = &state.history[state.history.len().saturating_sub(20)..];
    let avg: f64 = tail.iter().map(|b| b.volume as f64).sum::<f64>() / tail.len() as f64;
    if avg == 0.0 {
        return 1.0;
    }

    state.volume.unwrap_or(0) as f64 / avg
}

/// Percent distance of price from VWAP. 0 when either is unresolved.
pub fn vwap_distance(price: Option<f64>, vwap: Option<f64>) -> f64 {
    match (price, vwap) {
        (Some(p), Some(v)) if p > 0.0 && v > 0.0 => (p - v) / v * 100.0,
        _ => 0.0,
    }
}

/// Classify the discrete trade signal. First matching rule wins, so a
/// volume breakout outranks an extreme RSI reading.
pub fn classify(state: &SymbolState) -> TradeSignal {
    let rsi = state.indicators.as_ref().map(|i| i.rsi).unwrap_or(50.0);
    let atr_pct = state.indicators.as_ref().map(|i| i.atr_pct).unwrap_or(0.0);
    let rvol = rvol(state);
    let dist = vwap_distance(state.price, state.vwap);

    if rvol > 2.0 && dist > atr_pct {
        TradeSignal::Breakout
    } else if rvol > 2.0 && dist < -atr_pct {
        TradeSignal::Breakdown
    } else if rsi < 30.0 {
        TradeSignal::Oversold
    } else if rsi > 70.0 {
        TradeSignal::Overbought
    } else if dist.abs() < 0.2 {
        TradeSignal::VwapPin
    } else {
        TradeSignal::Neutral
    }
}

/// Composite integer score plus an optional annotation. Zero with no
/// note when the price is unresolved or no indicators exist yet.
pub fn composite_score(state: &SymbolState) -> (i32, &'static str) {
    let price = state.price.filter(|p| *p > 0.0);
    let (Some(_), Some(ind)) = (price, state.indicators.as_ref()) else {
        return (0, "");
    };

    let mut score = ind.trend_score;
    let mut note = "";

    if ind.rsi > 60.0 {
        score += 1;
    } else if ind.rsi < 40.0 {
        score -= 1;
    }

    if state.vwap.filter(|v| *v > 0.0).is_some() {
        let dist = vwap_distance(state.price, state.vwap);
        if dist > 0.0 {
            score += 1;
        } else {
            score -= 1;
            // Well below VWAP earns an extra penalty.
            if dist.abs() > ind.atr_pct * 0.25 {
                score -= 1;
                note = HV_BREAK_NOTE;
            }
        }
    }

    let rvol = rvol(state);
    if rvol > 2.0 {
        score += 1;
    } else if rvol < 0.5 {
        score -= 1;
    }

    (score, note)
}
