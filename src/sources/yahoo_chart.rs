//! Yahoo Finance chart API client.
//!
//! Backs the intraday price/volume feed, both session VWAP computations,
//! the daily-history feed, and the independent previous-close lookup.
//! Uses the unofficial v8 chart endpoint.

use super::{normalize_yahoo_symbol, Fetch, Unavailable};
use crate::clock::{self, SessionPhase, EXCHANGE_TZ};
use crate::types::DailyBar;
use chrono::{DateTime, TimeZone, Utc};
use chrono_tz::Tz;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Daily-history lookback windows, tried in order until one returns bars.
const HISTORY_WINDOWS: &[&str] = &["3mo", "1mo", "5d"];

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    result: Option<Vec<ChartResult>>,
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    timestamp: Option<Vec<i64>>,
    indicators: ChartIndicators,
}

#[derive(Debug, Deserialize)]
struct ChartIndicators {
    quote: Vec<ChartQuote>,
}

#[derive(Debug, Deserialize)]
struct ChartQuote {
    open: Option<Vec<Option<f64>>>,
    high: Option<Vec<Option<f64>>>,
    low: Option<Vec<Option<f64>>>,
    close: Option<Vec<Option<f64>>>,
    volume: Option<Vec<Option<u64>>>,
}

/// Raw per-bar arrays from one chart request.
struct ChartSlice {
    timestamps: Vec<i64>,
    opens: Vec<Option<f64>>,
    highs: Vec<Option<f64>>,
    lows: Vec<Option<f64>>,
    closes: Vec<Option<f64>>,
    volumes: Vec<Option<u64>>,
}

/// Latest intraday observation: last traded price and the session-cumulative
/// volume past the phase cutoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IntradayPulse {
    pub price: Option<f64>,
    pub volume: u64,
}

/// Yahoo chart API client.
pub struct YahooChartClient {
    client: Client,
}

impl YahooChartClient {
    pub fn new() -> Self {
        let client = Client::builder()
            .user_agent(
                "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36",
            )
            .build()
            .unwrap_or_else(|_| Client::new());

        Self { client }
    }

    async fn fetch_slice(&self, url: &str, timeout: Duration) -> Fetch<ChartSlice> {
        debug!("Fetching Yahoo chart data: {}", url);

        let response = self.client.get(url).timeout(timeout).send().await?;

        if !response.status().is_success() {
            return Err(Unavailable::Status(response.status().as_u16()));
        }

        let data: ChartResponse = response.json().await?;

        if let Some(error) = data.chart.error {
            return Err(Unavailable::Parse(format!(
                "{} - {}",
                error.code, error.description
            )));
        }

        let result = data
            .chart
            .result
            .and_then(|r| r.into_iter().next())
            .ok_or(Unavailable::Empty)?;

        let timestamps = result.timestamp.unwrap_or_default();
        let quote = result
            .indicators
            .quote
            .into_iter()
            .next()
            .ok_or(Unavailable::Empty)?;

        Ok(ChartSlice {
            timestamps,
            opens: quote.open.unwrap_or_default(),
            highs: quote.high.unwrap_or_default(),
            lows: quote.low.unwrap_or_default(),
            closes: quote.close.unwrap_or_default(),
            volumes: quote.volume.unwrap_or_default(),
        })
    }

    /// Last non-null 1-minute close plus volume summed from the session
    /// cutoff for the given phase (09:30 when OPEN, 16:00 when AFTER-HOURS,
    /// everything otherwise).
    pub async fn intraday_pulse(&self, symbol: &str, phase: SessionPhase) -> Fetch<IntradayPulse> {
        let url = format!(
            "{}/{}?range=1d&interval=1m&includePrePost=true",
            CHART_URL,
            normalize_yahoo_symbol(symbol)
        );
        let slice = self.fetch_slice(&url, Duration::from_secs(2)).await?;

        let price = slice.closes.iter().rev().find_map(|c| *c);

        let now = clock::exchange_now();
        let cutoff_ts = match phase {
            SessionPhase::Open => clock::today_at(now, 9, 30).timestamp(),
            SessionPhase::AfterHours => clock::today_at(now, 16, 0).timestamp(),
            _ => 0,
        };

        let volume = slice
            .timestamps
            .iter()
            .zip(slice.volumes.iter())
            .filter(|(ts, _)| **ts >= cutoff_ts)
            .filter_map(|(_, v)| *v)
            .sum();

        Ok(IntradayPulse { price, volume })
    }

    /// Session-anchored VWAP over 1-minute bars from the anchor (04:00 when
    /// PRE-MARKET, 09:30 otherwise) to now. Bars with null close or
    /// non-positive volume are skipped. `Empty` when the anchor is still in
    /// the future or no bar qualifies.
    pub async fn session_vwap(&self, symbol: &str, phase: SessionPhase) -> Fetch<f64> {
        let now = clock::exchange_now();
        let (anchor, include_pre) = if phase == SessionPhase::PreMarket {
            (clock::today_at(now, 4, 0), true)
        } else {
            (clock::today_at(now, 9, 30), false)
        };

        if now < anchor {
            return Err(Unavailable::Empty);
        }

        let url = format!(
            "{}/{}?period1={}&period2={}&interval=1m&includePrePost={}",
            CHART_URL,
            normalize_yahoo_symbol(symbol),
            anchor.timestamp(),
            now.timestamp(),
            include_pre
        );
        let slice = self.fetch_slice(&url, Duration::from_secs(3)).await?;

        vwap_of(&slice.closes, &slice.volumes)
    }

    /// VWAP over the full current day's 1-minute bars, used when the
    /// session-anchored computation yields nothing.
    pub async fn day_vwap(&self, symbol: &str) -> Fetch<f64> {
        let url = format!(
            "{}/{}?range=1d&interval=1m",
            CHART_URL,
            normalize_yahoo_symbol(symbol)
        );
        let slice = self.fetch_slice(&url, Duration::from_secs(2)).await?;

        vwap_of(&slice.closes, &slice.volumes)
    }

    /// Ascending daily OHLCV bars, trying progressively shorter lookback
    /// windows. `Empty` when every window comes back bare.
    pub async fn daily_history(&self, symbol: &str) -> Fetch<Vec<DailyBar>> {
        let mut last_err = Unavailable::Empty;

        for range in HISTORY_WINDOWS {
            let url = format!(
                "{}/{}?range={}&interval=1d",
                CHART_URL,
                normalize_yahoo_symbol(symbol),
                range
            );
            match self.fetch_slice(&url, Duration::from_secs(5)).await {
                Ok(slice) => {
                    let bars = slice.into_daily_bars(&EXCHANGE_TZ);
                    if !bars.is_empty() {
                        return Ok(bars);
                    }
                    last_err = Unavailable::Empty;
                }
                Err(e) => last_err = e,
            }
        }

        Err(last_err)
    }

    /// Second-to-last valid daily close over a 5-day window. Used only as
    /// the last resort for the prior regular close.
    pub async fn previous_close(&self, symbol: &str) -> Fetch<f64> {
        let url = format!(
            "{}/{}?range=5d&interval=1d",
            CHART_URL,
            normalize_yahoo_symbol(symbol)
        );
        let slice = self.fetch_slice(&url, Duration::from_secs(2)).await?;

        let valid: Vec<f64> = slice.closes.iter().filter_map(|c| *c).collect();
        if valid.len() >= 2 {
            Ok(valid[valid.len() - 2])
        } else {
            Err(Unavailable::Empty)
        }
    }
}

impl Default for YahooChartClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ChartSlice {
    /// Convert raw arrays to daily bars, dropping rows without a positive
    /// close. Dates are taken in the exchange timezone.
    fn into_daily_bars(self, tz: &Tz) -> Vec<DailyBar> {
        let mut bars = Vec::with_capacity(self.timestamps.len());

        for (i, &ts) in self.timestamps.iter().enumerate() {
            let close = self.closes.get(i).and_then(|v| *v).unwrap_or(0.0);
            if close <= 0.0 {
                continue;
            }

            let date = to_exchange_date(ts, tz);
            bars.push(DailyBar {
                date,
                open: self.opens.get(i).and_then(|v| *v).unwrap_or(0.0),
                high: self.highs.get(i).and_then(|v| *v).unwrap_or(0.0),
                low: self.lows.get(i).and_then(|v| *v).unwrap_or(0.0),
                close,
                volume: self.volumes.get(i).and_then(|v| *v).unwrap_or(0),
            });
        }

        bars
    }
}

fn to_exchange_date(ts: i64, tz: &Tz) -> chrono::NaiveDate {
    let utc: DateTime<Utc> = Utc
        .timestamp_opt(ts, 0)
        .single()
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap());
    utc.with_timezone(tz).date_naive()
}

/// Volume-weighted average over paired close/volume bars with a non-null
/// close and positive volume.
fn vwap_of(closes: &[Option<f64>], volumes: &[Option<u64>]) -> Fetch<f64> {
    let mut vp = 0.0;
    let mut tv = 0.0;

    for (c, v) in closes.iter().zip(volumes.iter()) {
        let (Some(close), Some(volume)) = (c, v) else {
            continue;
        };
        if *volume == 0 {
            continue;
        }
        vp += close * *volume as f64;
        tv += *volume as f64;
    }

    if tv > 0.0 {
        Ok(vp / tv)
    } else {
        Err(Unavailable::Empty)
    }
}
