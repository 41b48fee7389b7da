//! Rate-limit wait computation for catalog searches.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current wall-clock time in epoch milliseconds.
pub fn epoch_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// How long to sleep after a rate-limit response.
///
/// Sleeps until `reset_at_ms` plus `slack`. Without a reset time the reset is
/// assumed to be `fallback` from now. A reset already in the past sleeps only
/// the slack.
pub fn rate_limit_wait(
    reset_at_ms: Option<u64>,
    now_ms: u64,
    fallback: Duration,
    slack: Duration,
) -> Duration {
    let reset_at_ms =
        reset_at_ms.unwrap_or_else(|| now_ms.saturating_add(fallback.as_millis() as u64));
    Duration::from_millis(reset_at_ms.saturating_sub(now_ms)) + slack
}

/// Extract the reset time from a rate-limit error payload.
///
/// The catalog sends `{"message": ..., "reset": <epoch millis>}`; the value may
/// arrive as an integer, a float or a numeric string.
pub(crate) fn parse_reset(body: &str) -> Option<u64> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    match value.get("reset")? {
        serde_json::Value::Number(n) => n.as_u64().or_else(|| n.as_f64().map(|f| f as u64)),
        serde_json::Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SLACK: Duration = Duration::from_secs(60);
    const FALLBACK: Duration = Duration::from_secs(3600);

    #[test]
    fn test_wait_until_reset_plus_slack() {
        let now = 1_700_000_000_000;
        let wait = rate_limit_wait(Some(now + 5000), now, FALLBACK, SLACK);
        assert_eq!(wait, Duration::from_millis(65_000));
    }

    #[test]
    fn test_missing_reset_falls_back_to_one_hour() {
        let wait = rate_limit_wait(None, 1_000, FALLBACK, SLACK);
        assert_eq!(wait, Duration::from_secs(3600 + 60));
    }

    #[test]
    fn test_past_reset_sleeps_only_slack() {
        let wait = rate_limit_wait(Some(500), 10_000, FALLBACK, SLACK);
        assert_eq!(wait, SLACK);
    }

    #[test]
    fn test_parse_reset_variants() {
        assert_eq!(parse_reset(r#"{"reset": 1700000005000}"#), Some(1_700_000_005_000));
        assert_eq!(parse_reset(r#"{"reset": "1700000005000"}"#), Some(1_700_000_005_000));
        assert_eq!(parse_reset(r#"{"message": "Too many requests"}"#), None);
        assert_eq!(parse_reset("not json"), None);
    }
}
