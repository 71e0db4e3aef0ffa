//! Date formatting used by HTTP validators, Atom feeds and tag URIs.
//!
//! All timestamps are milliseconds since the Unix epoch, UTC.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

const HTTP_DATE: &str = "%a, %d %b %Y %H:%M:%S GMT";
const RFC850_DATE: &str = "%A, %d-%b-%y %H:%M:%S GMT";
const ASCTIME_DATE: &str = "%a %b %e %H:%M:%S %Y";

fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
}

/// Formats `millis` as an IMF-fixdate, e.g. `Sun, 09 Sep 2001 01:46:40 GMT`.
pub fn to_http_date(millis: i64) -> Option<String> {
    from_millis(millis).map(|dt| dt.format(HTTP_DATE).to_string())
}

/// Parses any of the three HTTP-date formats into epoch milliseconds.
pub fn parse_http_date(s: &str) -> Option<i64> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.timestamp_millis());
    }
    [RFC850_DATE, ASCTIME_DATE].iter().find_map(|fmt| {
        NaiveDateTime::parse_from_str(s, fmt)
            .ok()
            .map(|naive| naive.and_utc().timestamp_millis())
    })
}

/// Formats `millis` as RFC 3339 with millisecond precision, e.g. `2001-09-09T01:46:40.000Z`.
pub fn to_atom_date(millis: i64) -> Option<String> {
    from_millis(millis).map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Formats the UTC calendar day of `millis` as `yyyy-mm-dd`.
pub fn to_tag_date(millis: i64) -> Option<String> {
    from_millis(millis).map(|dt| dt.format("%Y-%m-%d").to_string())
}

/// Current time in epoch milliseconds.
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    const BILLENNIUM: i64 = 1_000_000_000_000;

    #[test]
    fn test_http_date_round_trip() {
        let s = to_http_date(BILLENNIUM).unwrap();
        assert_eq!(s, "Sun, 09 Sep 2001 01:46:40 GMT");
        assert_eq!(parse_http_date(&s), Some(BILLENNIUM));
    }

    #[test]
    fn test_parse_obsolete_formats() {
        assert_eq!(
            parse_http_date("Sunday, 09-Sep-01 01:46:40 GMT"),
            Some(BILLENNIUM)
        );
        assert_eq!(parse_http_date("Sun Sep  9 01:46:40 2001"), Some(BILLENNIUM));
        assert_eq!(parse_http_date("yesterday"), None);
    }

    #[test]
    fn test_atom_date() {
        assert_eq!(
            to_atom_date(BILLENNIUM + 5).unwrap(),
            "2001-09-09T01:46:40.005Z"
        );
    }

    #[test]
    fn test_tag_date() {
        assert_eq!(to_tag_date(BILLENNIUM).unwrap(), "2001-09-09");
        assert_eq!(to_tag_date(0).unwrap(), "1970-01-01");
    }
}
