use crate::clock::SessionPhase;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

/// One daily OHLCV bar. History sequences are ascending by date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyBar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

/// Technical indicator set computed from daily history.
///
/// SMA fields are `None` when the history is shorter than the window.
/// `prior_regular_close` is the last completed regular-session close,
/// `None` when no source could resolve it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Indicators {
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub sma_200: Option<f64>,
    pub rsi: f64,
    pub atr: f64,
    pub atr_pct: f64,
    pub trend_score: i32,
    pub prior_regular_close: Option<f64>,
}

/// Discrete trade signal classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeSignal {
    #[serde(rename = "BREAKOUT")]
    Breakout,
    #[serde(rename = "BREAKDOWN")]
    Breakdown,
    #[serde(rename = "OVERSOLD")]
    Oversold,
    #[serde(rename = "OVERBOUGHT")]
    Overbought,
    #[serde(rename = "VWAP PIN")]
    VwapPin,
    #[serde(rename = "NEUTRAL")]
    Neutral,
}

impl fmt::Display for TradeSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TradeSignal::Breakout => write!(f, "BREAKOUT"),
            TradeSignal::Breakdown => write!(f, "BREAKDOWN"),
            TradeSignal::Oversold => write!(f, "OVERSOLD"),
            TradeSignal::Overbought => write!(f, "OVERBOUGHT"),
            TradeSignal::VwapPin => write!(f, "VWAP PIN"),
            TradeSignal::Neutral => write!(f, "NEUTRAL"),
        }
    }
}

/// Trend label derived from the trend score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    #[serde(rename = "UP")]
    Up,
    #[serde(rename = "DOWN")]
    Down,
    #[serde(rename = "FLAT")]
    Flat,
}

impl Trend {
    /// UP at trend score >= 2, DOWN at <= -2, FLAT between.
    pub fn from_score(score: i32) -> Self {
        if score >= 2 {
            Trend::Up
        } else if score <= -2 {
            Trend::Down
        } else {
            Trend::Flat
        }
    }
}

/// One per-symbol row in the served snapshot.
///
/// Wire format note: unresolved values serialize as 0 / 0.0 rather than
/// null, matching the historical response shape consumed by clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickerRow {
    pub ticker: String,
    pub session: SessionPhase,
    pub session_liquidity: String,
    pub price: f64,
    pub regular_close: f64,
    pub pre_market_price: f64,
    pub after_hours_price: f64,
    pub gap_percent: f64,
    pub pre_market_change_percent: f64,
    pub after_hours_change_percent: f64,
    pub overnight_return_percent: f64,
    pub volume: u64,
    pub rvol: f64,
    pub atr_percent: f64,
    pub atr: f64,
    pub rsi: f64,
    pub vwap: f64,
    pub distance_from_vwap: f64,
    pub trend_score: i32,
    pub score: i32,
    pub signal: TradeSignal,
    pub trend: Trend,
    pub note: String,
}

/// One macro proxy entry in the snapshot summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryEntry {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    pub tag: String,
    pub value: String,
}

/// Cross-symbol summary keyed by macro proxies. Entries are present only
/// when the proxy symbol is part of the current universe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Summary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bond_yields: Option<SummaryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub us_dollar: Option<SummaryEntry>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub market_fear: Option<SummaryEntry>,
}

/// The full served snapshot for one refresh cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub timestamp: String,
    pub status: SessionPhase,
    pub tickers: Vec<TickerRow>,
    pub summary: Summary,
}
