//! Polygon aggregates client, the secondary daily-history and volume source.
//!
//! Disabled by default; the free tier is heavily rate limited, so the
//! history fetch deliberately pauses before each request.

use super::{Fetch, Unavailable};
use crate::types::DailyBar;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const POLYGON_URL: &str = "https://api.polygon.io";
const HISTORY_LOOKBACK_DAYS: i64 = 70;
/// Free-tier rate limit: 5 requests/minute.
const RATE_LIMIT_PAUSE_SECS: u64 = 15;

#[derive(Debug, Deserialize)]
struct AggsResponse {
    #[serde(rename = "resultsCount", default)]
    results_count: u64,
    results: Option<Vec<AggsBar>>,
}

#[derive(Debug, Deserialize)]
struct AggsBar {
    /// Bar start, ms since epoch
    t: i64,
    o: Option<f64>,
    h: Option<f64>,
    l: Option<f64>,
    c: Option<f64>,
    v: Option<f64>,
}

/// Polygon API client.
pub struct PolygonClient {
    client: Client,
    api_key: String,
}

impl PolygonClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    /// Ascending daily bars over the trailing lookback window.
    pub async fn daily_history(&self, symbol: &str) -> Fetch<Vec<DailyBar>> {
        let end = Utc::now().date_naive();
        let start = (Utc::now() - ChronoDuration::days(HISTORY_LOOKBACK_DAYS)).date_naive();
        let url = format!(
            "{}/v2/aggs/ticker/{}/range/1/day/{}/{}?adjusted=true&sort=asc&apiKey={}",
            POLYGON_URL, symbol, start, end, self.api_key
        );
        debug!("Fetching Polygon history for {}", symbol);

        tokio::time::sleep(Duration::from_secs(RATE_LIMIT_PAUSE_SECS)).await;

        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(5))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Unavailable::Status(response.status().as_u16()));
        }

        let data: AggsResponse = response.json().await?;
        if data.results_count == 0 {
            return Err(Unavailable::Empty);
        }

        let bars: Vec<DailyBar> = data
            .results
            .unwrap_or_default()
            .into_iter()
            .filter_map(bar_from_aggs)
            .collect();

        if bars.is_empty() {
            return Err(Unavailable::Empty);
        }
        Ok(bars)
    }

    /// Previous session's traded volume, the last-resort volume source.
    pub async fn previous_volume(&self, symbol: &str) -> Fetch<u64> {
        let url = format!(
            "{}/v2/aggs/ticker/{}/prev?adjusted=true&apiKey={}",
            POLYGON_URL, symbol, self.api_key
        );
        debug!("Fetching Polygon previous volume for {}", symbol);

        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(2))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Unavailable::Status(response.status().as_u16()));
        }

        let data: AggsResponse = response.json().await?;
        data.results
            .unwrap_or_default()
            .first()
            .and_then(|bar| bar.v)
            .filter(|v| *v > 0.0)
            .map(|v| v as u64)
            .ok_or(Unavailable::Empty)
    }
}

fn bar_from_aggs(bar: AggsBar) -> Option<DailyBar> {
    let close = bar.c.filter(|c| *c > 0.0)?;
    let date = Utc.timestamp_millis_opt(bar.t).single()?.date_naive();

    Some(DailyBar {
        date,
        open: bar.o.unwrap_or(0.0),
        high: bar.h.unwrap_or(0.0),
        low: bar.l.unwrap_or(0.0),
        close,
        volume: bar.v.unwrap_or(0.0) as u64,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aggs_response_deserialization() {
        let json = r#"{
            "resultsCount": 2,
            "results": [
                {"t": 1700000000000, "o": 10.0, "h": 11.0, "l": 9.5, "c": 10.5, "v": 1500000},
                {"t": 1700086400000, "o": 10.5, "h": 11.2, "l": 10.1, "c": 11.0, "v": 1700000}
            ]
        }"#;
        let data: AggsResponse = serde_json::from_str(json).unwrap();
        assert_eq!(data.results_count, 2);
        let bars: Vec<DailyBar> = data
            .results
            .unwrap()
            .into_iter()
            .filter_map(bar_from_aggs)
            .collect();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, 10.5);
        assert_eq!(bars[1].volume, 1_700_000);
        assert!(bars[0].date < bars[1].date);
    }

    #[test]
    fn test_bar_from_aggs_rejects_missing_close() {
        let bar = AggsBar {
            t: 1_700_000_000_000,
            o: Some(10.0),
            h: Some(11.0),
            l: Some(9.0),
            c: None,
            v: Some(100.0),
        };
        assert!(bar_from_aggs(bar).is_none());
    }
}
