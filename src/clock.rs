//! Market clock for the US equity session.
//!
//! All session boundaries are wall-clock times in the exchange timezone
//! (America/New_York). Weekends are always CLOSED; holidays are not
//! modeled and fall through to the weekday schedule.

use chrono::{DateTime, Datelike, TimeZone, Timelike, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The exchange timezone used for all session-phase decisions.
pub const EXCHANGE_TZ: Tz = chrono_tz::America::New_York;

/// Trading session phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SessionPhase {
    #[serde(rename = "PRE-MARKET")]
    PreMarket,
    #[serde(rename = "OPEN")]
    Open,
    #[serde(rename = "AFTER-HOURS")]
    AfterHours,
    #[serde(rename = "CLOSED")]
    Closed,
}

impl SessionPhase {
    /// Liquidity tag for the snapshot: extended-hours sessions trade thin.
    pub fn liquidity(&self) -> &'static str {
        match self {
            SessionPhase::PreMarket | SessionPhase::AfterHours => "LOW",
            SessionPhase::Open | SessionPhase::Closed => "HIGH",
        }
    }

    pub fn is_extended(&self) -> bool {
        matches!(self, SessionPhase::PreMarket | SessionPhase::AfterHours)
    }
}

impl fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionPhase::PreMarket => write!(f, "PRE-MARKET"),
            SessionPhase::Open => write!(f, "OPEN"),
            SessionPhase::AfterHours => write!(f, "AFTER-HOURS"),
            SessionPhase::Closed => write!(f, "CLOSED"),
        }
    }
}

/// Current time in the exchange timezone.
pub fn exchange_now() -> DateTime<Tz> {
    Utc::now().with_timezone(&EXCHANGE_TZ)
}

/// Determine the session phase for an exchange-local instant.
///
/// PRE-MARKET [04:00, 09:30), OPEN [09:30, 16:00), AFTER-HOURS
/// [16:00, 20:00), CLOSED otherwise and on weekends.
pub fn session_phase(now: DateTime<Tz>) -> SessionPhase {
    if matches!(now.weekday(), Weekday::Sat | Weekday::Sun) {
        return SessionPhase::Closed;
    }

    let minutes = now.hour() * 60 + now.minute();
    match minutes {
        m if (4 * 60..9 * 60 + 30).contains(&m) => SessionPhase::PreMarket,
        m if (9 * 60 + 30..16 * 60).contains(&m) => SessionPhase::Open,
        m if (16 * 60..20 * 60).contains(&m) => SessionPhase::AfterHours,
        _ => SessionPhase::Closed,
    }
}

/// The current session phase by exchange wall clock.
pub fn current_phase() -> SessionPhase {
    session_phase(exchange_now())
}

/// Exchange-local instant at `hour:minute` on the same day as `now`.
pub fn today_at(now: DateTime<Tz>, hour: u32, minute: u32) -> DateTime<Tz> {
    EXCHANGE_TZ
        .with_ymd_and_hms(now.year(), now.month(), now.day(), hour, minute, 0)
        .single()
        // A DST transition can make the local time ambiguous or missing;
        // earliest() covers ambiguous, falling back to `now` never happens
        // for the fixed 04:00/09:30/16:00 anchors in this timezone.
        .or_else(|| {
            EXCHANGE_TZ
                .with_ymd_and_hms(now.year(), now.month(), now.day(), hour, minute, 0)
                .earliest()
        })
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(weekday_date: (i32, u32, u32), h: u32, m: u32) -> DateTime<Tz> {
        let (y, mo, d) = weekday_date;
        EXCHANGE_TZ.with_ymd_and_hms(y, mo, d, h, m, 0).unwrap()
    }

    // 2024-01-03 is a Wednesday.
    const WED: (i32, u32, u32) = (2024, 1, 3);
    // 2024-01-06 is a Saturday.
    const SAT: (i32, u32, u32) = (2024, 1, 6);

    #[test]
    fn test_weekend_closed() {
        assert_eq!(session_phase(at(SAT, 12, 0)), SessionPhase::Closed);
    }

    #[test]
    fn test_pre_market_boundaries() {
        assert_eq!(session_phase(at(WED, 3, 59)), SessionPhase::Closed);
        assert_eq!(session_phase(at(WED, 4, 0)), SessionPhase::PreMarket);
        assert_eq!(session_phase(at(WED, 9, 29)), SessionPhase::PreMarket);
    }

    #[test]
    fn test_open_boundaries() {
        assert_eq!(session_phase(at(WED, 9, 30)), SessionPhase::Open);
        assert_eq!(session_phase(at(WED, 15, 59)), SessionPhase::Open);
    }

    #[test]
    fn test_after_hours_boundaries() {
        assert_eq!(session_phase(at(WED, 16, 0)), SessionPhase::AfterHours);
        assert_eq!(session_phase(at(WED, 19, 59)), SessionPhase::AfterHours);
        assert_eq!(session_phase(at(WED, 20, 0)), SessionPhase::Closed);
    }

    #[test]
    fn test_overnight_closed() {
        assert_eq!(session_phase(at(WED, 0, 30)), SessionPhase::Closed);
        assert_eq!(session_phase(at(WED, 23, 0)), SessionPhase::Closed);
    }

    #[test]
    fn test_liquidity_tags() {
        assert_eq!(SessionPhase::PreMarket.liquidity(), "LOW");
        assert_eq!(SessionPhase::AfterHours.liquidity(), "LOW");
        assert_eq!(SessionPhase::Open.liquidity(), "HIGH");
        assert_eq!(SessionPhase::Closed.liquidity(), "HIGH");
    }

    #[test]
    fn test_phase_wire_format() {
        let json = serde_json::to_string(&SessionPhase::PreMarket).unwrap();
        assert_eq!(json, "\"PRE-MARKET\"");
        let json = serde_json::to_string(&SessionPhase::AfterHours).unwrap();
        assert_eq!(json, "\"AFTER-HOURS\"");
    }

    #[test]
    fn test_today_at_anchor() {
        let now = at(WED, 11, 15);
        let anchor = today_at(now, 9, 30);
        assert_eq!(anchor.hour(), 9);
        assert_eq!(anchor.minute(), 30);
        assert!(anchor < now);
    }
}
