//! Read-only projections of a collection window for display.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;

use crate::model::CollectionWindow;

const LONG_DATE_FORMAT: &str = "%A, %d %B %Y";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.f";
const CLOCK_FORMAT: &str = "%H:%M";
const MIDNIGHT: &str = "00:00";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
/// Upcoming collection of a bin.
pub struct NextCollectionView {
    /// Midnight on the next collection day.
    pub value: Option<NaiveDateTime>,
    /// Scheduled collections after the next one.
    pub future_collections: usize,
    /// Whole days from today, negative when overdue.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days_until: Option<i64>,
    /// Long form such as "Saturday, 03 May 2025".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collection_date: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
/// Most recent collection of a bin.
pub struct LastCollectionView {
    /// Upstream timestamp, verbatim.
    pub value: Option<String>,
    /// Time of day as `HH:MM`.
    pub collection_time: Option<String>,
    /// Date portion of the timestamp.
    pub collection_date: Option<String>,
    /// Reported outcome.
    pub outcome: Option<String>,
    /// Upstream batch identifier.
    pub workpack: Option<String>,
}

/// Project the upcoming collection relative to `today`.
#[must_use]
pub fn next_collection(window: &CollectionWindow, today: NaiveDate) -> NextCollectionView {
    let Some(date) = window.next_date else {
        return NextCollectionView {
            value: None,
            future_collections: window.future_dates_count,
            days_until: None,
            collection_date: None,
        };
    };

    NextCollectionView {
        value: date.and_hms_opt(0, 0, 0),
        future_collections: window.future_dates_count,
        days_until: Some((date - today).num_days()),
        collection_date: Some(date.format(LONG_DATE_FORMAT).to_string()),
    }
}

/// Project the last reported collection.
#[must_use]
pub fn last_collection(window: &CollectionWindow) -> LastCollectionView {
    let Some(last) = window.last_collection.as_ref() else {
        return LastCollectionView::default();
    };

    LastCollectionView {
        value: Some(last.timestamp.clone()),
        collection_time: Some(clock_time(&last.timestamp)),
        collection_date: Some(last.date.clone()),
        outcome: Some(last.outcome.clone()),
        workpack: Some(last.workpack.clone()),
    }
}

/// `HH:MM` of a timestamp, `00:00` when it cannot be read.
fn clock_time(timestamp: &str) -> String {
    NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
        .map(|parsed| parsed.time())
        .or_else(|_| DateTime::parse_from_rfc3339(timestamp).map(|parsed| parsed.time()))
        .map_or_else(|_| MIDNIGHT.to_owned(), |time| time.format(CLOCK_FORMAT).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::LastCollection;

    fn ymd(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).expect("valid test date")
    }

    fn window_with_last(timestamp: &str) -> CollectionWindow {
        CollectionWindow {
            last_collection: Some(LastCollection {
                timestamp: timestamp.to_owned(),
                date: timestamp.split('T').next().unwrap_or_default().to_owned(),
                outcome: "Collected".to_owned(),
                workpack: "W1".to_owned(),
            }),
            ..CollectionWindow::default()
        }
    }

    #[test]
    fn next_view_counts_days_and_formats_date() {
        let window = CollectionWindow {
            next_date: Some(ymd(2025, 5, 3)),
            future_dates_count: 4,
            last_collection: None,
        };
        let view = next_collection(&window, ymd(2025, 4, 30));
        assert_eq!(view.value.map(|midnight| midnight.to_string()), Some("2025-05-03 00:00:00".to_owned()));
        assert_eq!(view.future_collections, 4);
        assert_eq!(view.days_until, Some(3));
        assert_eq!(view.collection_date.as_deref(), Some("Saturday, 03 May 2025"));
    }

    #[test]
    fn next_view_goes_negative_when_overdue() {
        let window = CollectionWindow {
            next_date: Some(ymd(2025, 5, 3)),
            ..CollectionWindow::default()
        };
        assert_eq!(next_collection(&window, ymd(2025, 5, 5)).days_until, Some(-2));
        assert_eq!(next_collection(&window, ymd(2025, 5, 3)).days_until, Some(0));
    }

    #[test]
    fn next_view_without_date_only_reports_count() {
        let view = next_collection(&CollectionWindow::default(), ymd(2025, 5, 3));
        assert_eq!(view.value, None);
        assert_eq!(view.future_collections, 0);
        assert_eq!(view.days_until, None);
        assert_eq!(view.collection_date, None);
    }

    #[test]
    fn last_view_reads_clock_time() {
        let view = last_collection(&window_with_last("2025-05-01T08:05:00"));
        assert_eq!(view.value.as_deref(), Some("2025-05-01T08:05:00"));
        assert_eq!(view.collection_time.as_deref(), Some("08:05"));
        assert_eq!(view.collection_date.as_deref(), Some("2025-05-01"));
        assert_eq!(view.outcome.as_deref(), Some("Collected"));
        assert_eq!(view.workpack.as_deref(), Some("W1"));
    }

    #[test]
    fn clock_time_tolerates_fractions_and_offsets() {
        assert_eq!(clock_time("2025-05-01T13:47:12.532"), "13:47");
        assert_eq!(clock_time("2025-05-01T13:47:12"), "13:47");
        assert_eq!(clock_time("2025-05-01T06:30:00Z"), "06:30");
        assert_eq!(clock_time("2025-05-01"), "00:00");
        assert_eq!(clock_time("yesterday"), "00:00");
    }

    #[test]
    fn last_view_is_empty_without_event() {
        assert_eq!(
            last_collection(&CollectionWindow::default()),
            LastCollectionView::default()
        );
    }
}
