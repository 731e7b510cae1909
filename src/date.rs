//! Calendar date/time strings.
//!
//! Accepted inputs are RFC 3339, RFC 2822, a bare `YYYY-MM-DD` and the naive
//! `YYYY-MM-DD[T ]HH:MM[:SS[.fff]]` forms. Values without an offset are taken
//! as UTC. Every accepted date is rendered back as RFC 3339 in UTC with
//! millisecond precision.
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

const NAIVE_DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

pub fn parse(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if let Ok(date) = DateTime::parse_from_rfc3339(text) {
        return Some(date.with_timezone(&Utc));
    }
    if let Ok(date) = DateTime::parse_from_rfc2822(text) {
        return Some(date.with_timezone(&Utc));
    }
    for format in NAIVE_DATETIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(text, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|day| day.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Canonical text of a date string, or `None` when it is not a date.
pub fn normalize(text: &str) -> Option<String> {
    parse(text).map(|date| date.to_rfc3339_opts(SecondsFormat::Millis, true))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offsets_are_folded_into_utc() {
        assert_eq!(
            normalize("2024-01-02T03:04:05+02:00").as_deref(),
            Some("2024-01-02T01:04:05.000Z")
        );
        assert_eq!(
            normalize("2024-01-02T03:04:05.5Z").as_deref(),
            Some("2024-01-02T03:04:05.500Z")
        );
    }

    #[test]
    fn naive_forms_are_utc() {
        assert_eq!(normalize("2024-01-02").as_deref(), Some("2024-01-02T00:00:00.000Z"));
        assert_eq!(
            normalize("2024-01-02 03:04:05").as_deref(),
            Some("2024-01-02T03:04:05.000Z")
        );
        assert_eq!(normalize("2024-01-02T03:04").as_deref(), Some("2024-01-02T03:04:00.000Z"));
    }

    #[test]
    fn rfc2822_is_accepted() {
        assert_eq!(
            normalize("Tue, 2 Jan 2024 03:04:05 +0000").as_deref(),
            Some("2024-01-02T03:04:05.000Z")
        );
    }

    #[test]
    fn canonical_text_is_a_fixed_point() {
        let once = normalize("2024-02-29T23:59:59.123Z").unwrap();
        assert_eq!(normalize(&once).as_deref(), Some(once.as_str()));
    }

    #[test]
    fn garbage_is_rejected() {
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("yesterday"), None);
        assert_eq!(normalize("2024-13-01"), None);
        assert_eq!(normalize("12345"), None);
    }
}
