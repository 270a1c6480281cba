//! Cleanup filter: which stored items a batch removal should delete.
//!
//! The daily cleanup removes "today's" uploads.  What counts as today depends
//! on where the day boundary is drawn, so the policy is explicit
//! configuration rather than an implicit use of the host clock.
//!
//! # Day policies
//!
//! | Policy       | Config value   | Today is...                              |
//! |--------------|----------------|------------------------------------------|
//! | `Local`      | `"local"`      | the calendar date in the host time zone  |
//! | `Utc`        | `"utc"`        | the calendar date in UTC                 |
//! | `FixedOffset`| `"fixed:+600"` | the date at a fixed offset, in minutes   |
//!
//! Item timestamps are compared as the device reports them (the device's
//! own wall clock); only "now" is interpreted through the policy.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, FixedOffset, Local, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use super::artwork::ArtworkItem;

/// Largest accepted fixed offset, in minutes (±18 h, the chrono limit).
const MAX_OFFSET_MINUTES: i32 = 18 * 60;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid day policy {0:?}: expected \"local\", \"utc\" or \"fixed:<+/-minutes>\"")]
pub struct DayPolicyParseError(pub String);

/// Where the boundary between two days is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DayPolicy {
    /// Midnight in the host's local time zone.
    #[default]
    Local,
    /// Midnight UTC.
    Utc,
    /// Midnight at a fixed offset from UTC, in minutes.
    FixedOffset { minutes: i32 },
}

impl DayPolicy {
    /// Returns the calendar date that `now` falls on under this policy.
    pub fn today(&self, now: DateTime<Utc>) -> NaiveDate {
        match *self {
            DayPolicy::Local => now.with_timezone(&Local).date_naive(),
            DayPolicy::Utc => now.date_naive(),
            DayPolicy::FixedOffset { minutes } => match FixedOffset::east_opt(minutes * 60) {
                Some(offset) => now.with_timezone(&offset).date_naive(),
                None => now.date_naive(),
            },
        }
    }
}

impl FromStr for DayPolicy {
    type Err = DayPolicyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let value = s.trim().to_ascii_lowercase();
        match value.as_str() {
            "local" => Ok(DayPolicy::Local),
            "utc" => Ok(DayPolicy::Utc),
            other => {
                let minutes = other
                    .strip_prefix("fixed:")
                    .and_then(|m| m.trim_start_matches('+').parse::<i32>().ok())
                    .filter(|m| m.abs() <= MAX_OFFSET_MINUTES)
                    .ok_or_else(|| DayPolicyParseError(s.to_string()))?;
                Ok(DayPolicy::FixedOffset { minutes })
            }
        }
    }
}

impl fmt::Display for DayPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DayPolicy::Local => f.write_str("local"),
            DayPolicy::Utc => f.write_str("utc"),
            DayPolicy::FixedOffset { minutes } => write!(f, "fixed:{minutes:+}"),
        }
    }
}

impl Serialize for DayPolicy {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DayPolicy {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Client-side filter applied to a fresh content listing.
///
/// `None` fields match everything.  An item with no parseable creation date
/// never matches a day filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CleanupFilter {
    pub category: Option<String>,
    pub day: Option<NaiveDate>,
}

impl CleanupFilter {
    /// Filter for items created today under `policy`, optionally in one category.
    pub fn today(category: Option<String>, policy: DayPolicy, now: DateTime<Utc>) -> Self {
        Self {
            category,
            day: Some(policy.today(now)),
        }
    }

    pub fn matches(&self, item: &ArtworkItem) -> bool {
        let category_ok = self
            .category
            .as_deref()
            .map_or(true, |category| item.category == category);
        let day_ok = match self.day {
            None => true,
            Some(day) => item.created.map_or(false, |created| created.date() == day),
        };
        category_ok && day_ok
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::artwork::{parse_device_timestamp, ContentId};
    use chrono::TimeZone;

    fn item(category: &str, created: Option<&str>) -> ArtworkItem {
        ArtworkItem {
            id: ContentId::from("MY_F0001"),
            category: category.to_string(),
            created: created.and_then(parse_device_timestamp),
            digest: None,
        }
    }

    #[test]
    fn test_day_policy_parses_all_forms() {
        assert_eq!("local".parse::<DayPolicy>().unwrap(), DayPolicy::Local);
        assert_eq!("UTC".parse::<DayPolicy>().unwrap(), DayPolicy::Utc);
        assert_eq!(
            "fixed:+600".parse::<DayPolicy>().unwrap(),
            DayPolicy::FixedOffset { minutes: 600 }
        );
        assert_eq!(
            "fixed:-300".parse::<DayPolicy>().unwrap(),
            DayPolicy::FixedOffset { minutes: -300 }
        );
    }

    #[test]
    fn test_day_policy_rejects_garbage_and_out_of_range_offsets() {
        assert!("tomorrow".parse::<DayPolicy>().is_err());
        assert!("fixed:abc".parse::<DayPolicy>().is_err());
        assert!("fixed:+2000".parse::<DayPolicy>().is_err());
    }

    #[test]
    fn test_day_policy_display_round_trips() {
        for policy in [
            DayPolicy::Local,
            DayPolicy::Utc,
            DayPolicy::FixedOffset { minutes: 600 },
            DayPolicy::FixedOffset { minutes: -90 },
        ] {
            assert_eq!(policy.to_string().parse::<DayPolicy>().unwrap(), policy);
        }
    }

    #[test]
    fn test_fixed_offset_moves_day_boundary() {
        // Arrange – 20:00 UTC on Jan 1 is already Jan 2 at UTC+10
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 20, 0, 0).unwrap();

        // Act
        let utc_day = DayPolicy::Utc.today(now);
        let sydney_day = DayPolicy::FixedOffset { minutes: 600 }.today(now);

        // Assert
        assert_eq!(utc_day, NaiveDate::from_ymd_opt(2026, 1, 1).unwrap());
        assert_eq!(sydney_day, NaiveDate::from_ymd_opt(2026, 1, 2).unwrap());
    }

    #[test]
    fn test_filter_matches_category_and_day() {
        // Arrange
        let filter = CleanupFilter {
            category: Some("MY-C0002".to_string()),
            day: NaiveDate::from_ymd_opt(2026, 5, 4),
        };

        // Act / Assert
        assert!(filter.matches(&item("MY-C0002", Some("2026:05:04 09:00:00"))));
        assert!(!filter.matches(&item("MY-C0002", Some("2026:05:03 23:59:59"))));
        assert!(!filter.matches(&item("MY-C0004", Some("2026:05:04 09:00:00"))));
    }

    #[test]
    fn test_filter_without_date_never_matches_undated_day_filter() {
        let filter = CleanupFilter {
            category: None,
            day: NaiveDate::from_ymd_opt(2026, 5, 4),
        };
        assert!(!filter.matches(&item("MY-C0002", None)));
    }

    #[test]
    fn test_empty_filter_matches_everything() {
        let filter = CleanupFilter::default();
        assert!(filter.matches(&item("anything", None)));
    }

    #[test]
    fn test_today_filter_uses_policy_date() {
        let now = Utc.with_ymd_and_hms(2026, 7, 9, 12, 0, 0).unwrap();
        let filter = CleanupFilter::today(None, DayPolicy::Utc, now);
        assert_eq!(filter.day, NaiveDate::from_ymd_opt(2026, 7, 9));
    }
}
