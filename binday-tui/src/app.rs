use std::sync::Arc;

use binday_core::{
    coordinator::{Coordinator, CoordinatorState},
    entity::{EntityDescriptor, EntityRegistry, EntityState},
    model::PropertyRef,
};
use chrono::{Local, NaiveDate};

pub(crate) struct App {
    pub coordinator: Coordinator,
    pub registry: EntityRegistry,
    pub property: PropertyRef,
    pub entity_index: usize,
}

impl App {
    pub(crate) fn new(coordinator: Coordinator, property: PropertyRef) -> Self {
        Self {
            coordinator,
            registry: EntityRegistry::new(),
            property,
            entity_index: 0,
        }
    }

    pub(crate) fn today() -> NaiveDate {
        Local::now().date_naive()
    }

    pub(crate) fn state(&self) -> Arc<CoordinatorState> {
        self.coordinator.state()
    }

    /// Every entity rendered against one state snapshot.
    pub(crate) fn rows(&self, state: &CoordinatorState) -> Vec<(&EntityDescriptor, EntityState)> {
        let today = Self::today();
        let result = state.data.as_ref().map(|snapshot| &snapshot.result);
        self.registry
            .entities_iter()
            .map(|entity| (entity, self.registry.state(entity, result, today)))
            .collect()
    }

    pub(crate) fn select_previous(&mut self) {
        if self.entity_index > 0 {
            self.entity_index -= 1;
        }
    }

    pub(crate) fn select_next(&mut self) {
        if self.entity_index + 1 < self.registry.len() {
            self.entity_index += 1;
        }
    }

    pub(crate) async fn shutdown(self) {
        self.coordinator.shutdown().await;
    }
}
