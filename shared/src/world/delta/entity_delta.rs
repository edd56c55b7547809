use crate::{ComponentData, ComponentId, ComponentUpdate, EntityId};

/// A borrowed view of one component change, as handed to callbacks.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ComponentChange<'a> {
    Add(&'a ComponentData),
    Remove(ComponentId),
    Update(&'a ComponentUpdate),
    Refresh(&'a ComponentData),
}

impl<'a> ComponentChange<'a> {
    pub fn component_id(&self) -> ComponentId {
        match self {
            ComponentChange::Add(data) | ComponentChange::Refresh(data) => data.component_id(),
            ComponentChange::Remove(component_id) => *component_id,
            ComponentChange::Update(update) => update.component_id(),
        }
    }

    /// The full component value, for adds and refreshes.
    pub fn data(&self) -> Option<&'a ComponentData> {
        match self {
            ComponentChange::Add(data) | ComponentChange::Refresh(data) => Some(data),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EntityComponentChange<'a> {
    pub entity_id: EntityId,
    pub change: ComponentChange<'a>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum EntityDeltaKind {
    /// The entity was not in the view at the start of the tick.
    Add,
    /// The entity is no longer in the view.
    Remove,
    /// The entity was present before and after the tick.
    Update,
}

/// Net changes to one entity over one tick. Every list is sorted by
/// component id.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EntityDelta {
    pub entity_id: EntityId,
    pub kind: EntityDeltaKind,
    pub components_added: Vec<ComponentData>,
    pub components_removed: Vec<ComponentId>,
    pub component_updates: Vec<ComponentUpdate>,
    pub components_refreshed: Vec<ComponentData>,
    pub authority_gained: Vec<ComponentId>,
    pub authority_lost: Vec<ComponentId>,
    pub authority_lost_temporarily: Vec<ComponentId>,
}

impl EntityDelta {
    pub fn new(entity_id: EntityId, kind: EntityDeltaKind) -> Self {
        Self {
            entity_id,
            kind,
            components_added: Vec::new(),
            components_removed: Vec::new(),
            component_updates: Vec::new(),
            components_refreshed: Vec::new(),
            authority_gained: Vec::new(),
            authority_lost: Vec::new(),
            authority_lost_temporarily: Vec::new(),
        }
    }

    pub fn has_changes(&self) -> bool {
        !(self.components_added.is_empty()
            && self.components_removed.is_empty()
            && self.component_updates.is_empty()
            && self.components_refreshed.is_empty()
            && self.authority_gained.is_empty()
            && self.authority_lost.is_empty()
            && self.authority_lost_temporarily.is_empty())
    }

    pub fn added(&self) -> impl Iterator<Item = ComponentChange<'_>> {
        self.components_added.iter().map(ComponentChange::Add)
    }

    pub fn removed(&self) -> impl Iterator<Item = ComponentChange<'_>> {
        self.components_removed
            .iter()
            .copied()
            .map(ComponentChange::Remove)
    }

    pub fn updated(&self) -> impl Iterator<Item = ComponentChange<'_>> {
        self.component_updates.iter().map(ComponentChange::Update)
    }

    pub fn refreshed(&self) -> impl Iterator<Item = ComponentChange<'_>> {
        self.components_refreshed
            .iter()
            .map(ComponentChange::Refresh)
    }
}
