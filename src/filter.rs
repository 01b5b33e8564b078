//! Recency filter deciding which work items a run downloads.

use crate::entry::WorkItem;
use chrono::{DateTime, TimeZone, Utc};
use tracing::debug;

/// True iff `item` was updated strictly after `reference`
///
/// Both sides are compared as absolute instants; a reference given in any
/// offset is converted before the comparison.
pub fn should_download<Tz: TimeZone>(item: &WorkItem, reference: &DateTime<Tz>) -> bool {
    let reference = reference.with_timezone(&Utc);
    let newer = item.updated_at > reference;
    debug!(
        item = %item,
        reference = %reference.to_rfc3339(),
        newer,
        "checking whether item should be downloaded"
    );
    newer
}

/// Items updated after `reference`, in their original order
pub fn select_newer<'a, Tz: TimeZone>(
    items: &'a [WorkItem],
    reference: &DateTime<Tz>,
) -> Vec<&'a WorkItem> {
    items
        .iter()
        .filter(|item| should_download(item, reference))
        .collect()
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use chrono::FixedOffset;

    fn item(title: &str, updated_at: DateTime<Utc>) -> WorkItem {
        WorkItem {
            title: title.to_string(),
            source_url: format!("http://media.example/{title}.mp4"),
            local_filename: format!("{title}.mp4"),
            updated_at,
            description: None,
        }
    }

    fn berlin() -> FixedOffset {
        FixedOffset::east_opt(2 * 3600).unwrap()
    }

    #[test]
    fn strictly_newer_items_qualify() {
        let vodcast = item("one", Utc.with_ymd_and_hms(2010, 10, 26, 9, 53, 49).unwrap());

        let before = berlin().with_ymd_and_hms(2010, 10, 25, 11, 53, 49).unwrap();
        let after = berlin().with_ymd_and_hms(2010, 10, 27, 11, 53, 49).unwrap();

        assert!(should_download(&vodcast, &before));
        assert!(!should_download(&vodcast, &after));
    }

    #[test]
    fn equal_instant_does_not_qualify() {
        let updated = Utc.with_ymd_and_hms(2010, 10, 26, 9, 53, 49).unwrap();
        let vodcast = item("one", updated);

        assert!(!should_download(&vodcast, &updated));
        // Same instant written in Berlin time
        let same_in_berlin = berlin().with_ymd_and_hms(2010, 10, 26, 11, 53, 49).unwrap();
        assert!(!should_download(&vodcast, &same_in_berlin));
    }

    #[test]
    fn reference_in_local_time_is_reconciled_before_comparison() {
        // 09:53:49Z is 11:53:49 in Berlin; a naive comparison of 09:53 vs 10:53
        // would reject the item
        let vodcast = item("one", Utc.with_ymd_and_hms(2010, 10, 26, 9, 53, 49).unwrap());
        let reference = berlin().with_ymd_and_hms(2010, 10, 26, 10, 53, 49).unwrap();

        assert!(should_download(&vodcast, &reference));
    }

    #[test]
    fn later_reference_never_admits_more_items() {
        let vodcast = item("one", Utc.with_ymd_and_hms(2010, 10, 27, 9, 53, 49).unwrap());
        let base = Utc.with_ymd_and_hms(2010, 10, 25, 0, 0, 0).unwrap();

        let mut previous = true;
        for hours in 0..96 {
            let reference = base + chrono::Duration::hours(hours);
            let current = should_download(&vodcast, &reference);
            assert!(
                previous || !current,
                "item became eligible again at reference {reference}"
            );
            previous = current;
        }
        assert!(!previous, "item must be excluded by the last reference");
    }

    #[test]
    fn select_newer_preserves_feed_order() {
        let items = vec![
            item("three", Utc.with_ymd_and_hms(2010, 10, 28, 9, 53, 49).unwrap()),
            item("one", Utc.with_ymd_and_hms(2010, 10, 26, 9, 53, 49).unwrap()),
            item("two", Utc.with_ymd_and_hms(2010, 10, 27, 9, 53, 49).unwrap()),
        ];
        let reference = Utc.with_ymd_and_hms(2010, 10, 27, 0, 0, 0).unwrap();

        let selected: Vec<&str> = select_newer(&items, &reference)
            .into_iter()
            .map(|item| item.title.as_str())
            .collect();

        assert_eq!(selected, vec!["three", "two"]);
    }
}
