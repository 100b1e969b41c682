//! Date helpers shared by the loan workflow and notifications

use chrono::{DateTime, Duration, NaiveDate, Utc};

/// Parse a due or return date.
///
/// Accepts an RFC 3339 instant, or a calendar date (`2024-01-15`) which is
/// taken as midnight UTC. Every stored date goes through here so that due
/// dates and actual return dates compare on the same scale.
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// `days` from `from`
pub fn days_after(from: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    from + Duration::days(days)
}

/// Human readable date, e.g. `15 Jan 2024`
pub fn display_date(value: DateTime<Utc>) -> String {
    value.format("%d %b %Y").to_string()
}
