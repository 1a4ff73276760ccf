//! Provider source clients.
//!
//! Every client method returns `Fetch<T>`: the value, or a tagged
//! [`Unavailable`] describing why the source produced nothing. Callers in
//! the reconciliation cascade match on the error and fall through to the
//! next source; nothing at this layer panics or propagates transport
//! errors upward.

pub mod finnhub;
pub mod polygon;
pub mod yahoo_chart;
pub mod yahoo_quotes;

pub use finnhub::{FinnhubClient, SecondaryQuote};
pub use polygon::PolygonClient;
pub use yahoo_chart::{IntradayPulse, YahooChartClient};
pub use yahoo_quotes::{FastQuote, QuoteData, YahooQuotesClient};

use thiserror::Error;

/// Reason a source yielded no usable data.
#[derive(Debug, Clone, Error)]
pub enum Unavailable {
    #[error("source disabled by configuration")]
    Disabled,
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected status: {0}")]
    Status(u16),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("no data returned")]
    Empty,
}

impl From<reqwest::Error> for Unavailable {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Unavailable::Parse(e.to_string())
        } else {
            Unavailable::Network(e.to_string())
        }
    }
}

/// Outcome of a single source fetch.
pub type Fetch<T> = Result<T, Unavailable>;

/// Normalize a ticker symbol for Yahoo endpoints.
/// Yahoo uses hyphens instead of dots for share classes (e.g. BRK-B, not BRK.B).
pub(crate) fn normalize_yahoo_symbol(symbol: &str) -> String {
    symbol.to_uppercase().replace('.', "-")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_yahoo_symbol() {
        assert_eq!(normalize_yahoo_symbol("aapl"), "AAPL");
        assert_eq!(normalize_yahoo_symbol("BRK.B"), "BRK-B");
        assert_eq!(normalize_yahoo_symbol("BRK-B"), "BRK-B");
    }

    #[test]
    fn test_unavailable_display() {
        assert_eq!(
            Unavailable::Disabled.to_string(),
            "source disabled by configuration"
        );
        assert_eq!(Unavailable::Status(429).to_string(), "unexpected status: 429");
    }
}
