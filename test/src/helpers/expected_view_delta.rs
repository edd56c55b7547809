use std::collections::BTreeMap;

use shardview_shared::{
    ComponentData, ComponentId, ComponentUpdate, EntityDelta, EntityDeltaKind, EntityId, ViewDelta,
};

/// Fluent description of the entity deltas a tick should produce. Lists are
/// sorted on `build`, so entries can be given in any order.
#[derive(Default)]
pub struct ExpectedViewDelta {
    entities: BTreeMap<EntityId, EntityDelta>,
}

impl ExpectedViewDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entity(mut self, entity_id: EntityId, kind: EntityDeltaKind) -> Self {
        self.entities
            .insert(entity_id, EntityDelta::new(entity_id, kind));
        self
    }

    fn delta_mut(&mut self, entity_id: EntityId) -> &mut EntityDelta {
        self.entities
            .entry(entity_id)
            .or_insert_with(|| EntityDelta::new(entity_id, EntityDeltaKind::Update))
    }

    pub fn component_added(mut self, entity_id: EntityId, data: ComponentData) -> Self {
        self.delta_mut(entity_id).components_added.push(data);
        self
    }

    pub fn component_removed(mut self, entity_id: EntityId, component_id: ComponentId) -> Self {
        self.delta_mut(entity_id).components_removed.push(component_id);
        self
    }

    pub fn component_updated(mut self, entity_id: EntityId, update: ComponentUpdate) -> Self {
        self.delta_mut(entity_id).component_updates.push(update);
        self
    }

    pub fn component_refreshed(mut self, entity_id: EntityId, data: ComponentData) -> Self {
        self.delta_mut(entity_id).components_refreshed.push(data);
        self
    }

    pub fn authority_gained(mut self, entity_id: EntityId, component_id: ComponentId) -> Self {
        self.delta_mut(entity_id).authority_gained.push(component_id);
        self
    }

    pub fn authority_lost(mut self, entity_id: EntityId, component_id: ComponentId) -> Self {
        self.delta_mut(entity_id).authority_lost.push(component_id);
        self
    }

    pub fn authority_lost_temporarily(mut self, entity_id: EntityId, component_id: ComponentId) -> Self {
        self.delta_mut(entity_id)
            .authority_lost_temporarily
            .push(component_id);
        self
    }

    pub fn build(self) -> Vec<EntityDelta> {
        self.entities
            .into_values()
            .map(|mut delta| {
                delta.components_added.sort_by_key(ComponentData::component_id);
                delta.components_removed.sort();
                delta.component_updates.sort_by_key(ComponentUpdate::component_id);
                delta.components_refreshed.sort_by_key(ComponentData::component_id);
                delta.authority_gained.sort();
                delta.authority_lost.sort();
                delta.authority_lost_temporarily.sort();
                delta
            })
            .collect()
    }

    pub fn matches(self, delta: &ViewDelta) -> bool {
        delta.entity_deltas() == self.build().as_slice()
    }
}

/// Asserts that a `ViewDelta` holds exactly the given entity deltas
#[macro_export]
macro_rules! assert_view_delta {
    ($delta:expr, $expected:expr) => {
        assert_eq!(
            $delta.entity_deltas(),
            $expected.build().as_slice(),
            "view delta does not match"
        );
    };
}
