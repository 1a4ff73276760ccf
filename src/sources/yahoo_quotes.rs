//! Yahoo Finance quote API client.
//!
//! One batch call covers the whole symbol universe and carries the
//! session-specific prices (pre/post/regular) plus regular volume. The same
//! endpoint queried per symbol backs the "fast quote" ticker metadata used
//! by the last-resort cascade steps.

use super::{normalize_yahoo_symbol, Fetch, Unavailable};
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const QUOTE_URL: &str = "https://query1.finance.yahoo.com/v7/finance/quote";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteEnvelope {
    quote_response: QuoteBody,
}

#[derive(Debug, Deserialize)]
struct QuoteBody {
    result: Option<Vec<QuoteData>>,
}

/// One symbol's entry in the quote payload. Missing and zero fields both
/// mean "absent" on this feed; accessors normalize that.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuoteData {
    pub symbol: String,
    pub pre_market_price: Option<f64>,
    pub post_market_price: Option<f64>,
    pub regular_market_price: Option<f64>,
    pub regular_market_volume: Option<u64>,
    pub regular_market_previous_close: Option<f64>,
    pub average_daily_volume_3_month: Option<u64>,
}

fn positive(value: Option<f64>) -> Option<f64> {
    value.filter(|v| *v > 0.0)
}

fn positive_vol(value: Option<u64>) -> Option<u64> {
    value.filter(|v| *v > 0)
}

impl QuoteData {
    pub fn pre_market(&self) -> Option<f64> {
        positive(self.pre_market_price)
    }

    pub fn post_market(&self) -> Option<f64> {
        positive(self.post_market_price)
    }

    pub fn regular(&self) -> Option<f64> {
        positive(self.regular_market_price)
    }

    pub fn regular_volume(&self) -> Option<u64> {
        positive_vol(self.regular_market_volume)
    }
}

/// Ticker metadata snapshot used as the final price/volume fallback.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FastQuote {
    pub previous_close: Option<f64>,
    pub last_price: Option<f64>,
    pub pre_market_price: Option<f64>,
    pub post_market_price: Option<f64>,
    pub last_volume: Option<u64>,
    pub avg_volume: Option<u64>,
}

impl From<&QuoteData> for FastQuote {
    fn from(q: &QuoteData) -> Self {
        Self {
            previous_close: positive(q.regular_market_previous_close),
            last_price: positive(q.regular_market_price),
            pre_market_price: positive(q.pre_market_price),
            post_market_price: positive(q.post_market_price),
            last_volume: positive_vol(q.regular_market_volume),
            avg_volume: positive_vol(q.average_daily_volume_3_month),
        }
    }
}

/// Yahoo quote API client.
pub struct YahooQuotesClient {
    client: Client,
}

impl YahooQuotesClient {
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

    async fn fetch(&self, symbols: &str, timeout: Duration) -> Fetch<Vec<QuoteData>> {
        let url = format!("{}?symbols={}", QUOTE_URL, symbols);
        debug!("Fetching Yahoo quotes: {}", url);

        let response = self.client.get(&url).timeout(timeout).send().await?;

        if !response.status().is_success() {
            return Err(Unavailable::Status(response.status().as_u16()));
        }

        let data: QuoteEnvelope = response.json().await?;
        data.quote_response.result.ok_or(Unavailable::Empty)
    }

    /// One payload for the whole universe, keyed back by the requested
    /// symbol spelling.
    pub async fn fetch_batch(&self, symbols: &[String]) -> Fetch<HashMap<String, QuoteData>> {
        if symbols.is_empty() {
            return Err(Unavailable::Empty);
        }

        let joined = symbols
            .iter()
            .map(|s| normalize_yahoo_symbol(s))
            .collect::<Vec<_>>()
            .join(",");

        let quotes = self.fetch(&joined, Duration::from_secs(3)).await?;

        let by_yahoo_symbol: HashMap<String, QuoteData> = quotes
            .into_iter()
            .map(|q| (q.symbol.clone(), q))
            .collect();

        let mut out = HashMap::new();
        for symbol in symbols {
            if let Some(q) = by_yahoo_symbol.get(&normalize_yahoo_symbol(symbol)) {
                out.insert(symbol.clone(), q.clone());
            }
        }

        if out.is_empty() {
            return Err(Unavailable::Empty);
        }
        Ok(out)
    }

    /// Single-symbol metadata fetch, independent of the batch call.
    pub async fn fetch_fast(&self, symbol: &str) -> Fetch<FastQuote> {
        let quotes = self
            .fetch(&normalize_yahoo_symbol(symbol), Duration::from_secs(2))
            .await?;

        quotes
            .first()
            .map(FastQuote::from)
            .ok_or(Unavailable::Empty)
    }
}

impl Default for YahooQuotesClient {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_data_deserialization() {
        let json = r#"{
            "symbol": "PLTR",
            "preMarketPrice": 24.5,
            "regularMarketPrice": 25.1,
            "regularMarketVolume": 31000000,
            "regularMarketPreviousClose": 24.9,
            "averageDailyVolume3Month": 45000000
        }"#;
        let quote: QuoteData = serde_json::from_str(json).unwrap();
        assert_eq!(quote.symbol, "PLTR");
        assert_eq!(quote.pre_market(), Some(24.5));
        assert_eq!(quote.post_market(), None);
        assert_eq!(quote.regular(), Some(25.1));
        assert_eq!(quote.regular_volume(), Some(31_000_000));
    }

    #[test]
    fn test_zero_fields_treated_as_absent() {
        let quote = QuoteData {
            symbol: "SPY".to_string(),
            pre_market_price: Some(0.0),
            regular_market_price: Some(450.0),
            regular_market_volume: Some(0),
            ..Default::default()
        };
        assert_eq!(quote.pre_market(), None);
        assert_eq!(quote.regular_volume(), None);
        assert_eq!(quote.regular(), Some(450.0));
    }

    #[test]
    fn test_fast_quote_from_quote_data() {
        let quote = QuoteData {
            symbol: "KTOS".to_string(),
            regular_market_price: Some(18.2),
            regular_market_previous_close: Some(18.0),
            regular_market_volume: Some(900_000),
            average_daily_volume_3_month: Some(1_200_000),
            ..Default::default()
        };
        let fast = FastQuote::from(&quote);
        assert_eq!(fast.last_price, Some(18.2));
        assert_eq!(fast.previous_close, Some(18.0));
        assert_eq!(fast.last_volume, Some(900_000));
        assert_eq!(fast.avg_volume, Some(1_200_000));
        assert_eq!(fast.pre_market_price, None);
    }

    #[test]
    fn test_quote_envelope_deserialization() {
        let json = r#"{
            "quoteResponse": {
                "result": [
                    { "symbol": "SPY", "regularMarketPrice": 450.0 }
                ]
            }
        }"#;
        let envelope: QuoteEnvelope = serde_json::from_str(json).unwrap();
        let result = envelope.quote_response.result.unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].symbol, "SPY");
    }
}
