//! Registry of the read-only entities exposed to the host.

use std::fmt;

use chrono::NaiveDate;

use crate::model::{BinType, CollectionWindow, ResultSet};
use crate::ports::BindayError;
use crate::view::{last_collection, next_collection};

const UNIQUE_ID_PREFIX: &str = "canterbury_bins";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Which projection an entity shows.
pub enum ViewKind {
    /// Upcoming collection.
    Next,
    /// Last reported collection.
    Last,
}

impl fmt::Display for ViewKind {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slug = match self {
            ViewKind::Next => "next",
            ViewKind::Last => "last",
        };
        write!(formatter, "{slug}")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Static description of one entity.
pub struct EntityDescriptor {
    /// Stable identifier derived from the view kind and bin key.
    pub unique_id: String,
    /// Display name.
    pub name: String,
    /// Icon hint.
    pub icon: &'static str,
    /// Bin the entity reports on.
    pub bin: BinType,
    /// Projection shown.
    pub kind: ViewKind,
}

impl EntityDescriptor {
    fn new(bin: BinType, kind: ViewKind) -> Self {
        let verb = match kind {
            ViewKind::Next => "Next",
            ViewKind::Last => "Last",
        };
        Self {
            unique_id: format!("{UNIQUE_ID_PREFIX}_{kind}_{}", bin.key()),
            name: format!("{verb} {} Collection", bin.label()),
            icon: bin.icon(),
            bin,
            kind,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// Rendered state of an entity.
pub struct EntityState {
    /// Main value, absent when unknown.
    pub value: Option<String>,
    /// Extra attributes in display order.
    pub attributes: Vec<(&'static str, String)>,
}

/// All entities for one tracked property.
pub struct EntityRegistry {
    entities: Vec<EntityDescriptor>,
}

impl EntityRegistry {
    /// Register a next and a last entity for every bin type.
    #[must_use]
    pub fn new() -> Self {
        let entities = BinType::ALL
            .into_iter()
            .flat_map(|bin| {
                [
                    EntityDescriptor::new(bin, ViewKind::Next),
                    EntityDescriptor::new(bin, ViewKind::Last),
                ]
            })
            .collect();
        Self { entities }
    }

    /// Iterator over registered entities.
    pub fn entities_iter(&self) -> impl Iterator<Item = &EntityDescriptor> {
        self.entities.iter()
    }

    /// Number of registered entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Whether nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Look up an entity by its unique id.
    ///
    /// # Errors
    ///
    /// Returns [`BindayError::UnknownEntity`] when no entity has that id.
    pub fn entity(&self, unique_id: &str) -> Result<&EntityDescriptor, BindayError> {
        self.entities
            .iter()
            .find(|entity| entity.unique_id == unique_id)
            .ok_or_else(|| BindayError::UnknownEntity(unique_id.to_owned()))
    }

    /// Render an entity against the cached result, or with no data at all.
    #[must_use]
    pub fn state(
        &self,
        entity: &EntityDescriptor,
        result: Option<&ResultSet>,
        today: NaiveDate,
    ) -> EntityState {
        let Some(result) = result else {
            return EntityState::default();
        };
        let window = result.window(entity.bin);
        match entity.kind {
            ViewKind::Next => next_state(window, today),
            ViewKind::Last => last_state(window),
        }
    }
}

impl Default for EntityRegistry {
    fn default() -> Self {
        Self::new()
    }
}

fn next_state(window: &CollectionWindow, today: NaiveDate) -> EntityState {
    let view = next_collection(window, today);
    let mut attributes = vec![("future_collections", view.future_collections.to_string())];
    if let Some(days) = view.days_until {
        attributes.push(("days_until", days.to_string()));
    }
    if let Some(date) = view.collection_date {
        attributes.push(("collection_date", date));
    }
    EntityState {
        value: view
            .value
            .map(|midnight| midnight.format("%Y-%m-%dT%H:%M:%S").to_string()),
        attributes,
    }
}

fn last_state(window: &CollectionWindow) -> EntityState {
    let view = last_collection(window);
    let attributes = [
        ("collection_time", view.collection_time),
        ("collection_date", view.collection_date),
        ("outcome", view.outcome),
        ("workpack", view.workpack),
    ]
    .into_iter()
    .filter_map(|(name, value)| value.map(|value| (name, value)))
    .collect();
    EntityState {
        value: view.value,
        attributes,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::normalize::normalize;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, 1).expect("valid test date")
    }

    fn sample() -> ResultSet {
        normalize(&json!({
            "dates": json!({"blackBinDay": ["2025-05-10", "2025-05-03"]}).to_string(),
            "status": json!({"streetStatus": [
                {"type": "general", "date": "2025-04-24T08:00:00", "outcome": "Collected", "workpack": "W0"},
            ]})
            .to_string(),
        }))
    }

    #[test]
    fn registers_next_and_last_for_every_bin() {
        let registry = EntityRegistry::new();
        assert_eq!(registry.len(), 8);

        let ids: Vec<&str> = registry
            .entities_iter()
            .map(|entity| entity.unique_id.as_str())
            .collect();
        assert_eq!(ids.first(), Some(&"canterbury_bins_next_blackBinDay"));
        assert!(ids.contains(&"canterbury_bins_last_foodBinDay"));

        let garden = registry
            .entity("canterbury_bins_next_gardenBinDay")
            .expect("garden entity");
        assert_eq!(garden.name, "Next Garden Collection");
        assert_eq!(garden.icon, "mdi:recycle");

        let black = registry
            .entity("canterbury_bins_last_blackBinDay")
            .expect("black entity");
        assert_eq!(black.name, "Last Black Bin Collection");
        assert_eq!(black.icon, "mdi:delete-empty");
    }

    #[test]
    fn unknown_entity_is_an_error() {
        let registry = EntityRegistry::new();
        assert!(matches!(
            registry.entity("canterbury_bins_next_glassBinDay"),
            Err(BindayError::UnknownEntity(_))
        ));
    }

    #[test]
    fn next_state_carries_value_and_attributes() {
        let registry = EntityRegistry::new();
        let result = sample();
        let entity = registry
            .entity("canterbury_bins_next_blackBinDay")
            .expect("entity");
        let state = registry.state(entity, Some(&result), today());

        assert_eq!(state.value.as_deref(), Some("2025-05-03T00:00:00"));
        assert_eq!(
            state.attributes,
            vec![
                ("future_collections", "1".to_owned()),
                ("days_until", "2".to_owned()),
                ("collection_date", "Saturday, 03 May 2025".to_owned()),
            ]
        );
    }

    #[test]
    fn last_state_carries_event_details() {
        let registry = EntityRegistry::new();
        let result = sample();
        let entity = registry
            .entity("canterbury_bins_last_blackBinDay")
            .expect("entity");
        let state = registry.state(entity, Some(&result), today());

        assert_eq!(state.value.as_deref(), Some("2025-04-24T08:00:00"));
        assert!(state.attributes.contains(&("collection_time", "08:00".to_owned())));
        assert!(state.attributes.contains(&("workpack", "W0".to_owned())));
    }

    #[test]
    fn states_are_empty_without_data() {
        let registry = EntityRegistry::new();
        for entity in registry.entities_iter() {
            assert_eq!(registry.state(entity, None, today()), EntityState::default());
        }

        let result = ResultSet::empty();
        let entity = registry
            .entity("canterbury_bins_next_foodBinDay")
            .expect("entity");
        let state = registry.state(entity, Some(&result), today());
        assert_eq!(state.value, None);
        assert_eq!(state.attributes, vec![("future_collections", "0".to_owned())]);
    }
}
