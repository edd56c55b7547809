use std::collections::{BTreeMap, BTreeSet};

use crate::{world::delta::error::ViewError, ComponentId, EntityId, EntityView, Op};

/// Tracks entity and component presence as a batch would leave it, without
/// touching the view.
struct PresenceOverlay<'v> {
    view: &'v EntityView,
    entities: BTreeMap<EntityId, bool>,
    components: BTreeMap<(EntityId, ComponentId), bool>,
    // entities removed at least once in this batch; their original
    // components are gone even if the entity comes back
    cleared_entities: BTreeSet<EntityId>,
}

impl<'v> PresenceOverlay<'v> {
    fn new(view: &'v EntityView) -> Self {
        Self {
            view,
            entities: BTreeMap::new(),
            components: BTreeMap::new(),
            cleared_entities: BTreeSet::new(),
        }
    }

    fn has_entity(&self, entity_id: EntityId) -> bool {
        match self.entities.get(&entity_id) {
            Some(present) => *present,
            None => self.view.has_entity(entity_id),
        }
    }

    fn has_component(&self, entity_id: EntityId, component_id: ComponentId) -> bool {
        if let Some(present) = self.components.get(&(entity_id, component_id)) {
            return *present;
        }
        if self.cleared_entities.contains(&entity_id) {
            return false;
        }
        self.view.has_component(entity_id, component_id)
    }

    fn set_entity(&mut self, entity_id: EntityId, present: bool) {
        self.entities.insert(entity_id, present);
        if !present {
            self.cleared_entities.insert(entity_id);
            self.components
                .retain(|(component_entity, _), _| *component_entity != entity_id);
        }
    }

    fn set_component(&mut self, entity_id: EntityId, component_id: ComponentId, present: bool) {
        self.components.insert((entity_id, component_id), present);
    }
}

/// Checks every op of a batch against the view as the preceding ops would
/// leave it.
pub fn validate_ops(view: &EntityView, ops: &[Op]) -> Result<(), ViewError> {
    let mut overlay = PresenceOverlay::new(view);

    for (op_index, op) in ops.iter().enumerate() {
        let entity_id = match op.entity_id() {
            Some(entity_id) => entity_id,
            None => continue,
        };

        if let Op::AddEntity { .. } = op {
            if overlay.has_entity(entity_id) {
                return Err(ViewError::EntityAlreadyExists {
                    entity_id,
                    op_index,
                });
            }
            overlay.set_entity(entity_id, true);
            continue;
        }

        if !overlay.has_entity(entity_id) {
            return Err(ViewError::EntityNotFound {
                entity_id,
                op_type: op.op_type(),
                op_index,
            });
        }

        match op {
            Op::RemoveEntity { .. } => overlay.set_entity(entity_id, false),
            Op::AddComponent { data, .. } => {
                let component_id = data.component_id();
                if overlay.has_component(entity_id, component_id) {
                    return Err(ViewError::ComponentAlreadyExists {
                        entity_id,
                        component_id,
                        op_index,
                    });
                }
                overlay.set_component(entity_id, component_id, true);
            }
            _ => {
                let component_id = match op {
                    Op::RemoveComponent { component_id, .. }
                    | Op::AuthorityChange { component_id, .. } => *component_id,
                    Op::ComponentUpdate { update, .. } => update.component_id(),
                    Op::ComponentRefresh { data, .. } => data.component_id(),
                    _ => continue,
                };
                if !overlay.has_component(entity_id, component_id) {
                    return Err(ViewError::ComponentNotFound {
                        entity_id,
                        component_id,
                        op_type: op.op_type(),
                        op_index,
                    });
                }
                if let Op::RemoveComponent { .. } = op {
                    overlay.set_component(entity_id, component_id, false);
                }
            }
        }
    }

    Ok(())
}
