//! Acquisition-date grouping of selected scenes.
//!
//! The catalog's native acquisition datetime is the primary date source;
//! the historical 8-digit substring pattern on the scene id is kept as a
//! documented fallback. Scenes with neither are reported back so the
//! caller can surface a warning instead of losing them silently.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;

/// Matches an 8-digit date embedded in a scene identifier,
/// e.g. `S2-16D_V2_20240105_A012345`.
fn date_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(\d{8})").expect("valid date pattern"))
}

/// Acquisition day (`YYYYMMDD`) for a scene.
///
/// Prefers the catalog datetime; falls back to the 8-digit substring in
/// the id; `None` when neither is available.
pub fn acquisition_day(id: &str, datetime: Option<DateTime<Utc>>) -> Option<String> {
    if let Some(dt) = datetime {
        return Some(dt.format("%Y%m%d").to_string());
    }
    date_pattern()
        .captures(id)
        .map(|caps| caps[1].to_string())
}

/// Partition of scene ids by acquisition day.
#[derive(Debug, Default)]
pub struct DateGroups {
    /// Day → scene ids, preserving the input (selection) order within each
    /// group; the first member is the group's representative.
    pub groups: BTreeMap<String, Vec<String>>,

    /// Scene ids with no extractable date, skipped from calibration.
    pub skipped: Vec<String>,
}

/// Group `(id, datetime)` pairs by acquisition day.
///
/// The groups are a partition: every scene with an extractable date lands
/// in exactly one group, and the union of the groups is exactly the set of
/// scenes with extractable dates.
pub fn group_by_day<'a, I>(entries: I) -> DateGroups
where
    I: IntoIterator<Item = (&'a str, Option<DateTime<Utc>>)>,
{
    let mut result = DateGroups::default();
    for (id, datetime) in entries {
        match acquisition_day(id, datetime) {
            Some(day) => result.groups.entry(day).or_default().push(id.to_string()),
            None => result.skipped.push(id.to_string()),
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_day_from_datetime() {
        let dt = Utc.with_ymd_and_hms(2024, 1, 5, 13, 30, 0).unwrap();
        assert_eq!(acquisition_day("whatever", Some(dt)), Some("20240105".to_string()));
    }

    #[test]
    fn test_day_fallback_from_id() {
        assert_eq!(
            acquisition_day("S2-16D_V2_20240105_A012345", None),
            Some("20240105".to_string())
        );
    }

    #[test]
    fn test_day_unextractable() {
        assert_eq!(acquisition_day("no-date-here", None), None);
    }

    #[test]
    fn test_grouping_is_a_partition() {
        let dt = |d: u32| Utc.with_ymd_and_hms(2024, 1, d, 0, 0, 0).unwrap();
        let entries = vec![
            ("a", Some(dt(5))),
            ("b", Some(dt(20))),
            ("c", Some(dt(5))),
            ("mystery", None),
        ];

        let result = group_by_day(entries);

        assert_eq!(result.groups.len(), 2);
        assert_eq!(result.groups["20240105"], vec!["a", "c"]);
        assert_eq!(result.groups["20240120"], vec!["b"]);
        assert_eq!(result.skipped, vec!["mystery"]);

        // Disjoint and exhaustive over dated scenes.
        let total: usize = result.groups.values().map(Vec::len).sum();
        assert_eq!(total + result.skipped.len(), 4);
    }

    #[test]
    fn test_grouping_preserves_input_order_within_group() {
        let entries = vec![
            ("second_20240105", None),
            ("first_20240105", None),
        ];
        let result = group_by_day(entries);
        assert_eq!(
            result.groups["20240105"],
            vec!["second_20240105", "first_20240105"]
        );
    }
}
