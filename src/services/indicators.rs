//! Technical indicator computation over daily history.
//!
//! All smoothed indicators use the Wilder convention: an exponential
//! average with alpha = 1/period, seeded from the first observation
//! rather than a warm-up average.

use crate::types::{DailyBar, Indicators};

/// Wilder smoothing factor for the 14-period RSI and ATR.
const WILDER_ALPHA: f64 = 1.0 / 14.0;
/// Guard against division by zero in the RS ratio.
const RSI_EPSILON: f64 = 1e-9;

/// Simple moving average of the last `period` values. `None` when the
/// series is shorter than the window.
pub fn sma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }
    let sum: f64 = closes[closes.len() - period..].iter().sum();
    Some(sum / period as f64)
}

/// Wilder-smoothed RSI over the close series. Requires at least 2 closes;
/// short series yield whatever the formula produces, with no neutral
/// special case.
pub fn wilder_rsi(closes: &[f64]) -> Option<f64> {
    if closes.len() < 2 {
        return None;
    }

    // The first delta slot has no prior close and smooths in as zero,
    // matching an adjust-free exponential average seeded at zero.
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;

    for pair in closes.windows(2) {
        let change = pair[1] - pair[0];
        let (gain, loss) = if change > 0.0 {
            (change, 0.0)
        } else {
            (0.0, -change)
        };
        avg_gain += WILDER_ALPHA * (gain - avg_gain);
        avg_loss += WILDER_ALPHA * (loss - avg_loss);
    }

    let rs = avg_gain / (avg_loss + RSI_EPSILON);
    Some(100.0 - 100.0 / (1.0 + rs))
}

/// True range of a bar against the prior close.
fn true_range(bar: &DailyBar, prior_close: f64) -> f64 {
    let hl = bar.high - bar.low;
    let hc = (bar.high - prior_close).abs();
    let lc = (bar.low - prior_close).abs();
    hl.max(hc).max(lc)
}

/// Wilder-smoothed ATR. The first bar has no prior close, so its true
/// range is just high-low, which also seeds the average.
pub fn wilder_atr(bars: &[DailyBar]) -> Option<f64> {
    let first = bars.first()?;
    let mut atr = first.high - first.low;

    for pair in bars.windows(2) {
        let tr = true_range(&pair[1], pair[0].close);
        atr += WILDER_ALPHA * (tr - atr);
    }

    Some(atr)
}

/// Integer trend score in [-3, +3]: moving-average ordering plus price
/// position. Terms with a missing operand contribute nothing.
pub fn trend_score(
    last_close: f64,
    sma_20: Option<f64>,
    sma_50: Option<f64>,
    sma_200: Option<f64>,
) -> i32 {
    let mut score = 0;

    if let (Some(s20), Some(s50)) = (sma_20, sma_50) {
        score += if s20 > s50 { 1 } else { -1 };
    }
    if let (Some(s50), Some(s200)) = (sma_50, sma_200) {
        score += if s50 > s200 { 1 } else { -1 };
    }
    if let Some(s20) = sma_20 {
        score += if last_close > s20 { 1 } else { -1 };
    }

    score
}

/// Compute the full indicator set from ascending daily history.
///
/// `provider_prev_close` is the provider-reported previous close, tried
/// first when resolving the prior regular close; the second-to-last
/// fetched bar is next. The independent previous-close lookup (the final
/// step of the cascade) is the caller's job since it needs I/O.
///
/// Returns `None` when the history cannot support any computation; the
/// caller leaves the prior cycle's indicators in place.
pub fn compute(bars: &[DailyBar], provider_prev_close: Option<f64>) -> Option<Indicators> {
    if bars.is_empty() {
        return None;
    }

    let closes: Vec<f64> = bars.iter().map(|b| b.close).collect();
    let last_close = *closes.last()?;
    if last_close <= 0.0 {
        return None;
    }

    let sma_20 = sma(&closes, 20);
    let sma_50 = sma(&closes, 50);
    let sma_200 = sma(&closes, 200);

    let rsi = wilder_rsi(&closes).unwrap_or(50.0);
    let atr = wilder_atr(bars).unwrap_or(0.0);
    let atr_pct = atr / last_close * 100.0;

    let prior_regular_close = provider_prev_close
        .filter(|pc| *pc > 0.0)
        .or_else(|| {
            (closes.len() >= 2)
                .then(|| closes[closes.len() - 2])
                .filter(|c| *c > 0.0)
        });

    Some(Indicators {
        sma_20,
        sma_50,
        sma_200,
        rsi,
        atr,
        atr_pct,
        trend_score: trend_score(last_close, sma_20, sma_50, sma_200),
        prior_regular_close,
    })
}
