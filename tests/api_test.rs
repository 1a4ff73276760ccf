//! Wire-format tests for the served snapshot.
//!
//! The response shape is consumed by existing dashboards; unresolved
//! values must serialize as zeros and labels must keep their exact
//! historical spellings.

use vigil::types::{
    Snapshot, Summary, SummaryEntry, TickerRow, TradeSignal, Trend,
};
use vigil::SessionPhase;

fn sample_row() -> TickerRow {
    TickerRow {
        ticker: "PLTR".to_string(),
        session: SessionPhase::Open,
        session_liquidity: "HIGH".to_string(),
        price: 25.1,
        regular_close: 24.9,
        pre_market_price: 0.0,
        after_hours_price: 0.0,
        gap_percent: 0.8,
        pre_market_change_percent: 0.0,
        after_hours_change_percent: 0.0,
        overnight_return_percent: 0.0,
        volume: 31_000_000,
        rvol: 1.4,
        atr_percent: 3.2,
        atr: 0.8,
        rsi: 55.0,
        vwap: 25.0,
        distance_from_vwap: 0.4,
        trend_score: 2,
        score: 3,
        signal: TradeSignal::Neutral,
        trend: Trend::Up,
        note: String::new(),
    }
}

#[test]
fn test_ticker_row_has_all_wire_keys() {
    let value = serde_json::to_value(sample_row()).unwrap();
    let row = value.as_object().unwrap();

    for key in [
        "ticker",
        "session",
        "session_liquidity",
        "price",
        "regular_close",
        "pre_market_price",
        "after_hours_price",
        "gap_percent",
        "pre_market_change_percent",
        "after_hours_change_percent",
        "overnight_return_percent",
        "volume",
        "rvol",
        "atr_percent",
        "atr",
        "rsi",
        "vwap",
        "distance_from_vwap",
        "trend_score",
        "score",
        "signal",
        "trend",
        "note",
    ] {
        assert!(row.contains_key(key), "missing wire key: {}", key);
    }
    assert_eq!(row.len(), 23);
}

#[test]
fn test_label_spellings() {
    let value = serde_json::to_value(sample_row()).unwrap();
    assert_eq!(value["session"], "OPEN");
    assert_eq!(value["signal"], "NEUTRAL");
    assert_eq!(value["trend"], "UP");

    let mut row = sample_row();
    row.session = SessionPhase::PreMarket;
    row.signal = TradeSignal::VwapPin;
    row.trend = Trend::Flat;
    let value = serde_json::to_value(row).unwrap();
    assert_eq!(value["session"], "PRE-MARKET");
    assert_eq!(value["signal"], "VWAP PIN");
    assert_eq!(value["trend"], "FLAT");
}

#[test]
fn test_snapshot_envelope() {
    let snapshot = Snapshot {
        timestamp: "2024-01-03 10:15:00".to_string(),
        status: SessionPhase::Open,
        tickers: vec![sample_row()],
        summary: Summary {
            bond_yields: Some(SummaryEntry {
                status: Some("FALLING".to_string()),
                tag: "YIELDS FALLING".to_string(),
                value: "IEF: 95.12 (-0.34%)".to_string(),
            }),
            us_dollar: Some(SummaryEntry {
                status: None,
                tag: "DOLLAR WEAK".to_string(),
                value: "28.71".to_string(),
            }),
            market_fear: None,
        },
    };

    let value = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(value["timestamp"], "2024-01-03 10:15:00");
    assert_eq!(value["status"], "OPEN");
    assert_eq!(value["tickers"].as_array().unwrap().len(), 1);

    let summary = value["summary"].as_object().unwrap();
    assert_eq!(summary["bond_yields"]["status"], "FALLING");
    // The dollar entry carries no status key at all.
    assert!(!summary["us_dollar"]
        .as_object()
        .unwrap()
        .contains_key("status"));
    // Proxies outside the universe are omitted, not null.
    assert!(!summary.contains_key("market_fear"));
}

#[test]
fn test_snapshot_round_trips() {
    let snapshot = Snapshot {
        timestamp: "2024-01-03 10:15:00".to_string(),
        status: SessionPhase::AfterHours,
        tickers: vec![sample_row()],
        summary: Summary::default(),
    };

    let json = serde_json::to_string(&snapshot).unwrap();
    let parsed: Snapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.status, SessionPhase::AfterHours);
    assert_eq!(parsed.tickers[0].ticker, "PLTR");
    assert_eq!(parsed.tickers[0].signal, TradeSignal::Neutral);
}

#[test]
fn test_admin_response_shapes() {
    let response = serde_json::json!({
        "message": "Symbols updated successfully. Cache cleared."
    });
    assert!(response["message"].as_str().unwrap().contains("Cache cleared"));

    let error = serde_json::json!({
        "error": "Bad request: symbol list must not be empty",
        "status": 400
    });
    assert_eq!(error["status"], 400);
}
