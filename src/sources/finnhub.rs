//! Finnhub quote client, the secondary single-symbol price source.

use super::{Fetch, Unavailable};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const FINNHUB_URL: &str = "https://finnhub.io/api/v1";

/// Finnhub quote response.
#[derive(Debug, Clone, Deserialize)]
struct FinnhubQuote {
    /// Current price
    #[serde(rename = "c")]
    current: Option<f64>,
    /// Previous close price
    #[serde(rename = "pc")]
    previous_close: Option<f64>,
}

/// Secondary quote: current price plus the provider's previous close.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SecondaryQuote {
    pub current: f64,
    pub previous_close: Option<f64>,
}

/// Finnhub API client.
pub struct FinnhubClient {
    client: Client,
    api_key: String,
}

impl FinnhubClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
        }
    }

    /// Current price and previous close for a symbol. `Empty` when the
    /// provider reports a non-positive current price (its "unknown symbol"
    /// convention).
    pub async fn quote(&self, symbol: &str) -> Fetch<SecondaryQuote> {
        let url = format!(
            "{}/quote?symbol={}&token={}",
            FINNHUB_URL, symbol, self.api_key
        );
        debug!("Fetching Finnhub quote for {}", symbol);

        let response = self
            .client
            .get(&url)
            .timeout(Duration::from_secs(2))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Unavailable::Status(response.status().as_u16()));
        }

        let quote: FinnhubQuote = response.json().await?;

        match quote.current {
            Some(current) if current > 0.0 => Ok(SecondaryQuote {
                current,
                previous_close: quote.previous_close.filter(|pc| *pc > 0.0),
            }),
            _ => Err(Unavailable::Empty),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finnhub_quote_deserialization() {
        let json = r#"{"c": 25.13, "d": 0.4, "dp": 1.6, "h": 25.4, "l": 24.6, "o": 24.8, "pc": 24.73, "t": 1700000000}"#;
        let quote: FinnhubQuote = serde_json::from_str(json).unwrap();
        assert_eq!(quote.current, Some(25.13));
        assert_eq!(quote.previous_close, Some(24.73));
    }

    #[test]
    fn test_finnhub_unknown_symbol_shape() {
        // Finnhub returns zeros for unknown symbols rather than an error.
        let json = r#"{"c": 0, "pc": 0}"#;
        let quote: FinnhubQuote = serde_json::from_str(json).unwrap();
        assert_eq!(quote.current, Some(0.0));
    }
}
