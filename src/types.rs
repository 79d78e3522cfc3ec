//! Shared wire vocabulary: name/value pairs and the timestamp codec used by
//! both the alert and feed schemas.

use std::fmt;

use chrono::{DateTime, FixedOffset, Local, SecondsFormat};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// A single named value, serialized as `<valueName>`/`<value>` children.
///
/// Lists of these carry multi-valued attributes such as geocoding schemes;
/// several entries may share a name, and insertion order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedValue {
    #[serde(rename = "valueName")]
    pub name: String,
    pub value: String,
}

impl NamedValue {
    /// Create a pair from anything string-like.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Value of the first pair named `name`, or `""` when absent.
pub fn search<'a>(pairs: &'a [NamedValue], name: &str) -> &'a str {
    pairs
        .iter()
        .find(|p| p.name == name)
        .map(|p| p.value.as_str())
        .unwrap_or("")
}

/// Every value recorded under `name`, in insertion order.
pub fn search_all<'a>(pairs: &'a [NamedValue], name: &str) -> Vec<&'a str> {
    pairs
        .iter()
        .filter(|p| p.name == name)
        .map(|p| p.value.as_str())
        .collect()
}

/// Timestamp in the RFC 3339 wire format shared by alert and feed documents,
/// e.g. `2003-06-11T22:39:00-07:00`.
///
/// The empty string means "absent"; every non-empty value must parse under
/// the canonical format. Check [`TimeStr::is_empty`] before calling
/// [`TimeStr::parse`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TimeStr(String);

impl TimeStr {
    /// Render a calendar time in the canonical wire format, second
    /// precision, `Z` for UTC.
    pub fn from_datetime(t: &DateTime<FixedOffset>) -> Self {
        Self(t.to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    /// The current local time in the canonical wire format.
    pub fn now() -> Self {
        Self(Local::now().to_rfc3339_opts(SecondsFormat::Secs, true))
    }

    /// Parse back into a calendar time with explicit UTC offset.
    pub fn parse(&self) -> Result<DateTime<FixedOffset>> {
        DateTime::parse_from_rfc3339(&self.0).map_err(|source| Error::MalformedTimestamp {
            value: self.0.clone(),
            source,
        })
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TimeStr {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TimeStr {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for TimeStr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Offset, TimeZone, Timelike};

    fn pairs() -> Vec<NamedValue> {
        vec![
            NamedValue::new("SAME", "006037"),
            NamedValue::new("UGC", "CAZ041"),
            NamedValue::new("SAME", "006038"),
        ]
    }

    #[test]
    fn search_returns_first_match() {
        let list = pairs();
        assert_eq!(search(&list, "SAME"), "006037");
        assert_eq!(search(&list, "UGC"), "CAZ041");
    }

    #[test]
    fn search_returns_empty_for_unknown_name() {
        assert_eq!(search(&pairs(), "FIPS6"), "");
        assert_eq!(search(&[], "SAME"), "");
    }

    #[test]
    fn search_all_preserves_order_and_duplicates() {
        let list = pairs();
        assert_eq!(search_all(&list, "SAME"), vec!["006037", "006038"]);
        assert!(search_all(&list, "FIPS6").is_empty());
    }

    #[test]
    fn timestamp_round_trips_with_negative_offset() {
        let offset = FixedOffset::west_opt(7 * 3600).unwrap();
        let t = offset
            .with_ymd_and_hms(2003, 6, 11, 22, 39, 0)
            .single()
            .unwrap();
        let ts = TimeStr::from_datetime(&t);
        assert_eq!(ts.as_str(), "2003-06-11T22:39:00-07:00");

        let parsed = ts.parse().unwrap();
        assert_eq!(parsed.year(), 2003);
        assert_eq!(parsed.month(), 6);
        assert_eq!(parsed.day(), 11);
        assert_eq!(parsed.hour(), 22);
        assert_eq!(parsed.minute(), 39);
        assert_eq!(parsed.second(), 0);
        assert_eq!(parsed.offset().fix().local_minus_utc(), -7 * 3600);
        assert_eq!(parsed, t);
    }

    #[test]
    fn timestamp_round_trips_utc_as_zulu() {
        let offset = FixedOffset::east_opt(0).unwrap();
        let t = offset
            .with_ymd_and_hms(2018, 8, 15, 16, 57, 0)
            .single()
            .unwrap();
        let ts = TimeStr::from_datetime(&t);
        assert_eq!(ts.as_str(), "2018-08-15T16:57:00Z");
        assert_eq!(ts.parse().unwrap(), t);
    }

    #[test]
    fn malformed_timestamps_error() {
        for bad in ["", "yesterday", "2003-06-11", "2003-06-11 22:39:00"] {
            let err = TimeStr::from(bad).parse().unwrap_err();
            assert!(
                matches!(err, Error::MalformedTimestamp { .. }),
                "expected MalformedTimestamp for {bad:?}, got {err:?}"
            );
        }
    }

    #[test]
    fn now_produces_parseable_value() {
        TimeStr::now().parse().unwrap();
    }
}
