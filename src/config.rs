use std::env;

/// Default symbol universe tracked at startup.
pub const DEFAULT_SYMBOLS: &[&str] = &[
    "ONDS", "UMAC", "RCAT", "DFTX", "KTOS", "VST", "RKLB", "PLTR", "CEG", "ISRG", "WFRD", "SPY",
    "VXX", "IEF", "UUP",
];

/// Symbols used as cross-market proxies in the snapshot summary.
#[derive(Debug, Clone)]
pub struct MacroProxies {
    /// Bond-yield proxy (an inverse-yield bond ETF).
    pub bond_yields: String,
    /// US dollar strength proxy.
    pub us_dollar: String,
    /// Volatility / market fear proxy.
    pub market_fear: String,
}

impl Default for MacroProxies {
    fn default() -> Self {
        Self {
            bond_yields: "IEF".to_string(),
            us_dollar: "UUP".to_string(),
            market_fear: "VXX".to_string(),
        }
    }
}

/// Application configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host address.
    pub host: String,
    /// Server port.
    pub port: u16,
    /// Initial symbol universe.
    pub symbols: Vec<String>,
    /// Finnhub API key for the secondary quote source.
    pub finnhub_api_key: Option<String>,
    /// Whether the Finnhub secondary quote source is enabled.
    pub use_finnhub: bool,
    /// Polygon API key for the secondary history/volume source.
    pub polygon_api_key: Option<String>,
    /// Whether the Polygon fallback source is enabled.
    pub use_polygon: bool,
    /// Minimum seconds between two refresh cycles; requests inside the
    /// window are served the cached snapshot.
    pub refresh_rate_secs: u64,
    /// Macro proxy symbols for the summary block.
    pub macro_proxies: MacroProxies,
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let symbols = env::var("SYMBOLS")
            .ok()
            .map(|s| {
                s.split(',')
                    .map(|t| t.trim().to_uppercase())
                    .filter(|t| !t.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect());

        let macro_proxies = MacroProxies {
            bond_yields: env::var("BOND_PROXY").unwrap_or_else(|_| "IEF".to_string()),
            us_dollar: env::var("DOLLAR_PROXY").unwrap_or_else(|_| "UUP".to_string()),
            market_fear: env::var("FEAR_PROXY").unwrap_or_else(|_| "VXX".to_string()),
        };

        Self {
            host: env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env::var("PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(8000),
            symbols,
            finnhub_api_key: env::var("FINNHUB_API_KEY").ok().filter(|k| !k.is_empty()),
            use_finnhub: env_bool("USE_FINNHUB", true),
            polygon_api_key: env::var("POLYGON_API_KEY").ok().filter(|k| !k.is_empty()),
            use_polygon: env_bool("USE_POLYGON", false),
            refresh_rate_secs: env::var("REFRESH_RATE_SECONDS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(30),
            macro_proxies,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            finnhub_api_key: None,
            use_finnhub: true,
            polygon_api_key: None,
            use_polygon: false,
            refresh_rate_secs: 30,
            macro_proxies: MacroProxies::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_symbols_present() {
        let config = Config::default();
        assert!(config.symbols.iter().any(|s| s == "SPY"));
        assert!(config.symbols.iter().any(|s| s == "VXX"));
        assert_eq!(config.port, 8000);
    }

    #[test]
    fn test_default_toggles() {
        let config = Config::default();
        assert!(config.use_finnhub);
        assert!(!config.use_polygon);
    }

    #[test]
    fn test_default_macro_proxies() {
        let proxies = MacroProxies::default();
        assert_eq!(proxies.bond_yields, "IEF");
        assert_eq!(proxies.us_dollar, "UUP");
        assert_eq!(proxies.market_fear, "VXX");
    }
}
