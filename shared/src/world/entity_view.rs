use std::collections::BTreeMap;

use crate::{ComponentData, ComponentId, EntityId};

/// Whether this process may mutate a given Component.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Authority {
    #[default]
    NotAuthoritative,
    Authoritative,
    /// Still authoritative, but the runtime has announced the authority is
    /// about to move elsewhere.
    AuthorityLossImminent,
}

impl Authority {
    /// Loss-imminent still counts as authoritative for writes.
    pub fn is_authoritative(&self) -> bool {
        !matches!(self, Authority::NotAuthoritative)
    }
}

/// Everything the view knows about a single Entity.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntityViewElement {
    pub components: BTreeMap<ComponentId, ComponentData>,
    // NotAuthoritative is never stored
    pub authority: BTreeMap<ComponentId, Authority>,
}

impl EntityViewElement {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_component(&self, component_id: ComponentId) -> bool {
        self.components.contains_key(&component_id)
    }

    pub fn component(&self, component_id: ComponentId) -> Option<&ComponentData> {
        self.components.get(&component_id)
    }

    pub fn authority(&self, component_id: ComponentId) -> Authority {
        self.authority
            .get(&component_id)
            .copied()
            .unwrap_or_default()
    }

    pub fn has_authority(&self, component_id: ComponentId) -> bool {
        self.authority(component_id).is_authoritative()
    }
}

/// The local mirror of every Entity this process currently sees. Only the
/// delta computation mutates it; everything else reads it between ticks.
#[derive(Clone, Debug, Default)]
pub struct EntityView {
    entities: BTreeMap<EntityId, EntityViewElement>,
}

impl EntityView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn has_entity(&self, entity_id: EntityId) -> bool {
        self.entities.contains_key(&entity_id)
    }

    pub fn get(&self, entity_id: EntityId) -> Option<&EntityViewElement> {
        self.entities.get(&entity_id)
    }

    pub fn has_component(&self, entity_id: EntityId, component_id: ComponentId) -> bool {
        self.entities
            .get(&entity_id)
            .is_some_and(|element| element.has_component(component_id))
    }

    pub fn component(&self, entity_id: EntityId, component_id: ComponentId) -> Option<&ComponentData> {
        self.entities
            .get(&entity_id)
            .and_then(|element| element.component(component_id))
    }

    pub fn authority(&self, entity_id: EntityId, component_id: ComponentId) -> Authority {
        self.entities
            .get(&entity_id)
            .map(|element| element.authority(component_id))
            .unwrap_or_default()
    }

    /// Iterates entities in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = (&EntityId, &EntityViewElement)> {
        self.entities.iter()
    }

    pub(crate) fn insert_entity(&mut self, entity_id: EntityId) {
        self.entities.insert(entity_id, EntityViewElement::new());
    }

    pub(crate) fn remove_entity(&mut self, entity_id: EntityId) -> Option<EntityViewElement> {
        self.entities.remove(&entity_id)
    }

    pub(crate) fn get_mut(&mut self, entity_id: EntityId) -> Option<&mut EntityViewElement> {
        self.entities.get_mut(&entity_id)
    }
}
