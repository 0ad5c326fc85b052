//! Age-based selection of playlist memberships

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::models::PlaylistItem;

const MILLIS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Minimum age a membership must exceed to be selected, in whole days.
///
/// Parses from `"30"` or `"30d"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetentionThreshold {
    days: u32,
}

impl RetentionThreshold {
    #[must_use]
    pub const fn days(days: u32) -> Self {
        Self { days }
    }

    #[must_use]
    pub const fn as_days(self) -> u32 {
        self.days
    }

    /// Threshold length in milliseconds
    #[must_use]
    pub fn as_millis(self) -> i64 {
        i64::from(self.days) * MILLIS_PER_DAY
    }

    /// Instant before which memberships count as old
    #[must_use]
    pub fn cutoff(self, now: i64) -> i64 {
        now.saturating_sub(self.as_millis())
    }
}

impl FromStr for RetentionThreshold {
    type Err = Error;

    fn from_str(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_suffix('d')
            .or_else(|| trimmed.strip_suffix('D'))
            .unwrap_or(trimmed);

        if digits.is_empty() || !digits.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(Error::InvalidInput(format!(
                "Invalid retention threshold '{raw}': expected a number of days like 30 or 30d"
            )));
        }

        digits.parse::<u32>().map(Self::days).map_err(|_| {
            Error::InvalidInput(format!("Retention threshold '{raw}' is too large"))
        })
    }
}

impl fmt::Display for RetentionThreshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.days)
    }
}

/// Memberships whose age timestamp is strictly older than `now - threshold`.
///
/// Memberships without a resolvable timestamp are skipped. Input order is
/// preserved.
#[must_use]
pub fn select_older_than<'a, I>(
    items: I,
    threshold: RetentionThreshold,
    now: i64,
) -> Vec<&'a PlaylistItem>
where
    I: IntoIterator<Item = &'a PlaylistItem>,
{
    let cutoff = threshold.cutoff(now);
    items
        .into_iter()
        .filter(|item| item.age_timestamp().is_some_and(|at| at < cutoff))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const NOW: i64 = 1_700_000_000_000;

    fn added(item_id: &str, added_at: Option<i64>) -> PlaylistItem {
        PlaylistItem {
            added_at,
            ..PlaylistItem::new(item_id, "WL", item_id, 0)
        }
    }

    #[test]
    fn test_parse_threshold() {
        assert_eq!("30".parse::<RetentionThreshold>().unwrap().as_days(), 30);
        assert_eq!("30d".parse::<RetentionThreshold>().unwrap().as_days(), 30);
        assert_eq!(" 7D ".parse::<RetentionThreshold>().unwrap().as_days(), 7);
        assert_eq!(RetentionThreshold::days(30).to_string(), "30d");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        for raw in ["", "d", "-3", "3w", "thirty", "1.5d", "99999999999d"] {
            let error = raw.parse::<RetentionThreshold>().unwrap_err();
            assert!(matches!(error, Error::InvalidInput(_)), "{raw}");
        }
    }

    #[test]
    fn test_boundary_is_exclusive() {
        let threshold = RetentionThreshold::days(30);
        let thirty_days = 30 * MILLIS_PER_DAY;
        let items = vec![
            added("exact", Some(NOW - thirty_days)),
            added("older", Some(NOW - thirty_days - 1_000)),
            added("newer", Some(NOW - 29 * MILLIS_PER_DAY)),
        ];

        let selected = select_older_than(&items, threshold, NOW);
        assert_eq!(
            selected.iter().map(|item| item.item_id.as_str()).collect::<Vec<_>>(),
            vec!["older"]
        );
    }

    #[test]
    fn test_falls_back_to_first_observation() {
        let threshold = RetentionThreshold::days(1);
        let observed = PlaylistItem::new("seen", "WL", "v", 0).first_seen(NOW - 2 * MILLIS_PER_DAY);
        let unknown = added("unknown", None);

        let items = [observed, unknown];
        let selected = select_older_than(&items, threshold, NOW);
        assert_eq!(selected.len(), 1);
        assert_eq!(selected[0].item_id, "seen");
    }
}
