//! Domain data structures for bin types, collection windows, and result sets.

use std::collections::BTreeMap;
use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::ports::BindayError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
/// Waste streams collected by the council, tracked independently.
pub enum BinType {
    /// General waste, the black bin.
    #[serde(rename = "blackBinDay")]
    Black,
    /// Mixed recycling.
    #[serde(rename = "recyclingBinDay")]
    Recycling,
    /// Garden waste.
    #[serde(rename = "gardenBinDay")]
    Garden,
    /// Food waste caddy.
    #[serde(rename = "foodBinDay")]
    Food,
}

impl BinType {
    /// Every known bin type in display order.
    pub const ALL: [BinType; 4] = [
        BinType::Black,
        BinType::Recycling,
        BinType::Garden,
        BinType::Food,
    ];

    /// Key used by the upstream `dates` document.
    #[must_use]
    pub fn key(self) -> &'static str {
        match self {
            BinType::Black => "blackBinDay",
            BinType::Recycling => "recyclingBinDay",
            BinType::Garden => "gardenBinDay",
            BinType::Food => "foodBinDay",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            BinType::Black => "Black Bin",
            BinType::Recycling => "Recycling",
            BinType::Garden => "Garden",
            BinType::Food => "Food",
        }
    }

    /// Icon hint for surfaces rendering this bin.
    #[must_use]
    pub fn icon(self) -> &'static str {
        match self {
            BinType::Black => "mdi:delete-empty",
            BinType::Recycling | BinType::Garden | BinType::Food => "mdi:recycle",
        }
    }

    /// Resolve an upstream `dates` key.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|bin| bin.key() == key)
    }

    /// Map a street status event type onto a bin. Matching ignores case.
    #[must_use]
    pub fn from_event_type(event_type: &str) -> Option<Self> {
        match event_type.to_lowercase().as_str() {
            "general" => Some(BinType::Black),
            "recycling" => Some(BinType::Recycling),
            "food" => Some(BinType::Food),
            "garden" => Some(BinType::Garden),
            _ => None,
        }
    }
}

impl fmt::Display for BinType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}", self.key())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Most recent collection reported by the street status feed.
pub struct LastCollection {
    /// Upstream timestamp, kept verbatim.
    pub timestamp: String,
    /// Date portion of `timestamp`.
    pub date: String,
    /// Outcome reported by the crew, e.g. "Collected".
    pub outcome: String,
    /// Upstream batch identifier of the round.
    pub workpack: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
/// Normalized schedule for a single bin type.
pub struct CollectionWindow {
    /// Earliest scheduled collection.
    pub next_date: Option<NaiveDate>,
    /// Scheduled collections after `next_date`.
    pub future_dates_count: usize,
    /// Latest actual collection, if the feed reported one.
    pub last_collection: Option<LastCollection>,
}

static EMPTY_WINDOW: CollectionWindow = CollectionWindow {
    next_date: None,
    future_dates_count: 0,
    last_collection: None,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
/// Collection windows for every known bin type.
///
/// Built in one normalization pass and replaced wholesale on refresh.
pub struct ResultSet {
    windows: BTreeMap<BinType, CollectionWindow>,
}

impl ResultSet {
    /// A result set holding an empty window for every bin type.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            windows: BinType::ALL
                .into_iter()
                .map(|bin| (bin, CollectionWindow::default()))
                .collect(),
        }
    }

    /// Window for the given bin type.
    #[must_use]
    pub fn window(&self, bin: BinType) -> &CollectionWindow {
        self.windows.get(&bin).unwrap_or(&EMPTY_WINDOW)
    }

    pub(crate) fn window_mut(&mut self, bin: BinType) -> &mut CollectionWindow {
        self.windows.entry(bin).or_default()
    }

    /// Iterate over all windows in bin order.
    pub fn iter(&self) -> impl Iterator<Item = (BinType, &CollectionWindow)> {
        self.windows.iter().map(|(bin, window)| (*bin, window))
    }
}

impl Default for ResultSet {
    fn default() -> Self {
        Self::empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
/// Property and street references the upstream API resolves a schedule from.
pub struct PropertyRef {
    /// Unique property reference number.
    pub uprn: String,
    /// Unique street reference number.
    pub usrn: String,
}

impl PropertyRef {
    /// Construct a new reference pair.
    #[must_use]
    pub fn new<P: Into<String>, S: Into<String>>(uprn: P, usrn: S) -> Self {
        Self {
            uprn: uprn.into(),
            usrn: usrn.into(),
        }
    }

    /// Check that both references are filled in.
    ///
    /// # Errors
    ///
    /// Returns [`BindayError::InvalidInput`] when either reference is blank.
    pub fn validate(&self) -> Result<(), BindayError> {
        if self.uprn.trim().is_empty() {
            return Err(BindayError::InvalidInput("uprn must not be empty".to_owned()));
        }
        if self.usrn.trim().is_empty() {
            return Err(BindayError::InvalidInput("usrn must not be empty".to_owned()));
        }
        Ok(())
    }
}
