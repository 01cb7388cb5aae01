//! Turns the upstream response into a complete [`ResultSet`].
//!
//! The API embeds two JSON documents as strings: `dates` maps bin keys to
//! scheduled ISO dates, and `status` carries a `streetStatus` list of past
//! collection events. Anything malformed degrades to empty values; this
//! module never fails.

use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::model::{BinType, LastCollection, ResultSet};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// `status` document as embedded in the response.
#[derive(Debug, Default, Deserialize)]
struct StatusDocument {
    #[serde(default, rename = "streetStatus")]
    street_status: Vec<Value>,
}

/// Single event from `streetStatus`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct StreetStatusEntry {
    #[serde(rename = "type", deserialize_with = "lenient_text")]
    typ: String,
    #[serde(deserialize_with = "lenient_text")]
    date: String,
    #[serde(deserialize_with = "lenient_text")]
    outcome: String,
    #[serde(deserialize_with = "lenient_text")]
    workpack: String,
}

/// Scalars as their text form, `null` and nested values as empty.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => text,
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    })
}

/// Normalize a raw response body.
#[must_use]
pub fn normalize(body: &Value) -> ResultSet {
    let dates = decode_embedded(body, "dates")
        .and_then(|value| match value {
            Value::Object(map) => Some(map),
            _ => None,
        })
        .unwrap_or_default();

    let status = decode_embedded(body, "status")
        .and_then(|value| {
            serde_json::from_value::<StatusDocument>(value)
                .inspect_err(|err| warn!(error = %err, "status document has unexpected shape"))
                .ok()
        })
        .unwrap_or_default();

    let mut result = ResultSet::empty();

    for bin in BinType::ALL {
        let raw_dates = raw_date_list(&dates, bin);
        let window = result.window_mut(bin);
        window.future_dates_count = raw_dates.len().saturating_sub(1);
        window.next_date = earliest_date(raw_dates, bin);
    }

    for (bin, last) in latest_events(&status.street_status) {
        result.window_mut(bin).last_collection = Some(last);
    }

    result
}

/// Parse a string-encoded JSON field. Missing or undecodable fields yield `None`.
fn decode_embedded(body: &Value, field: &str) -> Option<Value> {
    let Some(raw) = body.get(field) else {
        debug!(field, "field missing from response");
        return None;
    };
    let Some(text) = raw.as_str() else {
        warn!(field, "field is not a JSON-encoded string");
        return None;
    };
    serde_json::from_str(text)
        .inspect_err(|err| warn!(field, error = %err, "failed to decode embedded JSON"))
        .ok()
}

fn raw_date_list(dates: &Map<String, Value>, bin: BinType) -> &[Value] {
    match dates.get(bin.key()) {
        Some(Value::Array(entries)) => entries.as_slice(),
        Some(other) => {
            warn!(bin = %bin, value = %other, "date list is not an array");
            &[]
        }
        None => &[],
    }
}

/// Smallest date in the list with any time or zone suffix dropped.
///
/// Upstream dates are fixed-width ISO strings, so string order is date order.
/// Entries that are not strings cannot be dates and are passed over.
fn earliest_date(raw_dates: &[Value], bin: BinType) -> Option<NaiveDate> {
    let first = raw_dates.iter().filter_map(Value::as_str).min()?;
    let day = date_prefix(first);
    NaiveDate::parse_from_str(day, DATE_FORMAT)
        .inspect_err(|err| warn!(bin = %bin, raw = first, error = %err, "unparseable next date"))
        .ok()
}

fn date_prefix(raw: &str) -> &str {
    let head = raw.split('T').next().unwrap_or(raw);
    head.get(..10).unwrap_or(head)
}

/// Latest event per bin type.
///
/// Ties on the timestamp keep the event that appears first in the feed.
fn latest_events(events: &[Value]) -> Vec<(BinType, LastCollection)> {
    let mut latest = BTreeMap::<BinType, StreetStatusEntry>::new();

    for raw in events {
        if !raw.is_object() {
            warn!(event = %raw, "skipping street status entry that is not an object");
            continue;
        }
        let Ok(entry) = serde_json::from_value::<StreetStatusEntry>(raw.clone()) else {
            warn!(event = %raw, "skipping malformed street status entry");
            continue;
        };
        let Some(bin) = BinType::from_event_type(&entry.typ) else {
            debug!(event_type = %entry.typ, "dropping event with unmapped type");
            continue;
        };

        match latest.entry(bin) {
            Entry::Vacant(slot) => {
                slot.insert(entry);
            }
            Entry::Occupied(mut slot) => {
                if entry.date > slot.get().date {
                    slot.insert(entry);
                }
            }
        }
    }

    latest
        .into_iter()
        .map(|(bin, entry)| {
            let date = entry.date.split('T').next().unwrap_or_default().to_owned();
            (
                bin,
                LastCollection {
                    timestamp: entry.date,
                    date,
                    outcome: entry.outcome,
                    workpack: entry.workpack,
                },
            )
        })
        .collect()
}
