use std::collections::{BTreeMap, BTreeSet};

use log::{trace, warn};

use crate::{
    world::delta::{
        authority_record::AuthorityRecord,
        component_record::ComponentRecord,
        entity_delta::{EntityDelta, EntityDeltaKind},
        error::ViewError,
        validation::validate_ops,
    },
    Authority, ComponentData, ComponentId, ComponentUpdate, DisconnectOp, EntityId, EntityView,
    Op, OpList,
};

/// Structured net changes produced by applying one tick's ops to the view.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ViewDelta {
    entity_deltas: Vec<EntityDelta>,
    worker_messages: Vec<Op>,
    removed_entities: Vec<EntityId>,
    disconnect: Option<DisconnectOp>,
}

impl ViewDelta {
    pub fn new() -> Self {
        Self::default()
    }

    /// A delta made only of `entity_deltas`, which must be sorted by entity id.
    pub(crate) fn from_entity_deltas(entity_deltas: Vec<EntityDelta>) -> Self {
        Self {
            entity_deltas,
            ..Self::default()
        }
    }

    /// Sorted by entity id.
    pub fn entity_deltas(&self) -> &[EntityDelta] {
        &self.entity_deltas
    }

    pub fn entity_delta(&self, entity_id: EntityId) -> Option<&EntityDelta> {
        self.entity_deltas
            .binary_search_by_key(&entity_id, |delta| delta.entity_id)
            .ok()
            .map(|index| &self.entity_deltas[index])
    }

    /// Every entity a remove op targeted in this batch, sorted, including
    /// entities added back later in the same batch.
    pub fn removed_entities(&self) -> &[EntityId] {
        &self.removed_entities
    }

    pub fn was_removed(&self, entity_id: EntityId) -> bool {
        self.removed_entities.binary_search(&entity_id).is_ok()
    }

    /// Command responses and incoming command requests, in arrival order.
    pub fn worker_messages(&self) -> &[Op] {
        &self.worker_messages
    }

    pub fn disconnect(&self) -> Option<&DisconnectOp> {
        self.disconnect.as_ref()
    }

    pub fn is_empty(&self) -> bool {
        self.entity_deltas.is_empty()
            && self.worker_messages.is_empty()
            && self.removed_entities.is_empty()
            && self.disconnect.is_none()
    }

    pub fn clear(&mut self) {
        self.entity_deltas.clear();
        self.worker_messages.clear();
        self.removed_entities.clear();
        self.disconnect = None;
    }

    /// Validates the batch against `view`, then applies it and returns the
    /// net changes. On error the view is untouched.
    pub fn try_from_ops(view: &mut EntityView, op_lists: Vec<OpList>) -> Result<Self, ViewError> {
        let ops = flatten_until_disconnect(op_lists);
        validate_ops(view, &ops)?;

        trace!("applying {} op(s) to a view of {} entities", ops.len(), view.len());

        let mut builder = ViewDeltaBuilder::default();
        let mut delta = ViewDelta::new();
        for op in ops {
            match op {
                Op::AddEntity { entity_id } => builder.add_entity(view, entity_id),
                Op::RemoveEntity { entity_id } => builder.remove_entity(view, entity_id),
                Op::AddComponent { entity_id, data } => builder.add_component(view, entity_id, data),
                Op::RemoveComponent {
                    entity_id,
                    component_id,
                } => builder.remove_component(view, entity_id, component_id),
                Op::ComponentUpdate { entity_id, update } => {
                    builder.update_component(view, entity_id, update)
                }
                Op::ComponentRefresh { entity_id, data } => {
                    builder.refresh_component(view, entity_id, data)
                }
                Op::AuthorityChange {
                    entity_id,
                    component_id,
                    authority,
                } => builder.set_authority(view, entity_id, component_id, authority),
                Op::Disconnect(disconnect) => delta.disconnect = Some(disconnect),
                worker_message => delta.worker_messages.push(worker_message),
            }
        }

        delta.removed_entities = builder.removed.iter().copied().collect();
        delta.entity_deltas = builder.finish(view);
        Ok(delta)
    }
}

fn flatten_until_disconnect(op_lists: Vec<OpList>) -> Vec<Op> {
    let mut ops = Vec::new();
    let mut ignored = 0;
    let mut disconnected = false;

    for op in op_lists.into_iter().flatten() {
        if disconnected {
            ignored += 1;
            continue;
        }
        disconnected = matches!(op, Op::Disconnect(_));
        ops.push(op);
    }

    if ignored > 0 {
        warn!("ignoring {} op(s) received after a disconnect", ignored);
    }
    ops
}

struct EntityRecord {
    present_at_start: bool,
    components: BTreeMap<ComponentId, ComponentRecord>,
    authority: BTreeMap<ComponentId, AuthorityRecord>,
}

impl EntityRecord {
    fn observe_authority(&mut self, component_id: ComponentId, current: Authority, next: Authority) {
        self.authority
            .entry(component_id)
            .or_insert_with(|| AuthorityRecord::new(current))
            .observe(next);
    }

    fn record(&mut self, component_id: ComponentId, apply: impl FnOnce(Option<ComponentRecord>) -> ComponentRecord) {
        let previous = self.components.remove(&component_id);
        self.components.insert(component_id, apply(previous));
    }
}

/// Applies already validated ops to the view while recording what each
/// entity and component went through.
#[derive(Default)]
struct ViewDeltaBuilder {
    entities: BTreeMap<EntityId, EntityRecord>,
    removed: BTreeSet<EntityId>,
}

impl ViewDeltaBuilder {
    // must be called before the op mutates the view
    fn entity_record(&mut self, view: &EntityView, entity_id: EntityId) -> &mut EntityRecord {
        self.entities
            .entry(entity_id)
            .or_insert_with(|| EntityRecord {
                present_at_start: view.has_entity(entity_id),
                components: BTreeMap::new(),
                authority: BTreeMap::new(),
            })
    }

    fn add_entity(&mut self, view: &mut EntityView, entity_id: EntityId) {
        self.entity_record(view, entity_id);
        view.insert_entity(entity_id);
    }

    fn remove_entity(&mut self, view: &mut EntityView, entity_id: EntityId) {
        if view.has_entity(entity_id) {
            self.removed.insert(entity_id);
        }
        let record = self.entity_record(view, entity_id);
        let Some(element) = view.remove_entity(entity_id) else {
            return;
        };

        for (component_id, authority) in element.authority {
            record.observe_authority(component_id, authority, Authority::NotAuthoritative);
        }
        for (component_id, data) in element.components {
            record.record(component_id, |previous| {
                ComponentRecord::on_remove(previous, data)
            });
        }
    }

    fn add_component(&mut self, view: &mut EntityView, entity_id: EntityId, data: ComponentData) {
        let record = self.entity_record(view, entity_id);
        let Some(element) = view.get_mut(entity_id) else {
            return;
        };

        let component_id = data.component_id();
        record.record(component_id, ComponentRecord::on_add);
        element.components.insert(component_id, data);
    }

    fn remove_component(&mut self, view: &mut EntityView, entity_id: EntityId, component_id: ComponentId) {
        let record = self.entity_record(view, entity_id);
        let Some(element) = view.get_mut(entity_id) else {
            return;
        };
        let Some(data) = element.components.remove(&component_id) else {
            return;
        };

        if let Some(authority) = element.authority.remove(&component_id) {
            record.observe_authority(component_id, authority, Authority::NotAuthoritative);
        }
        record.record(component_id, |previous| {
            ComponentRecord::on_remove(previous, data)
        });
    }

    fn update_component(&mut self, view: &mut EntityView, entity_id: EntityId, update: ComponentUpdate) {
        let record = self.entity_record(view, entity_id);
        let component_id = update.component_id();
        let Some(data) = view
            .get_mut(entity_id)
            .and_then(|element| element.components.get_mut(&component_id))
        else {
            return;
        };

        data.apply_update(&update);
        record.record(component_id, |previous| {
            ComponentRecord::on_update(previous, &update)
        });
    }

    fn refresh_component(&mut self, view: &mut EntityView, entity_id: EntityId, data: ComponentData) {
        let record = self.entity_record(view, entity_id);
        let Some(element) = view.get_mut(entity_id) else {
            return;
        };

        let component_id = data.component_id();
        record.record(component_id, ComponentRecord::on_refresh);
        element.components.insert(component_id, data);
    }

    fn set_authority(
        &mut self,
        view: &mut EntityView,
        entity_id: EntityId,
        component_id: ComponentId,
        authority: Authority,
    ) {
        let record = self.entity_record(view, entity_id);
        let Some(element) = view.get_mut(entity_id) else {
            return;
        };

        record.observe_authority(component_id, element.authority(component_id), authority);
        if authority.is_authoritative() {
            element.authority.insert(component_id, authority);
        } else {
            element.authority.remove(&component_id);
        }
    }

    fn finish(self, view: &EntityView) -> Vec<EntityDelta> {
        let mut entity_deltas = Vec::new();

        for (entity_id, record) in self.entities {
            let kind = match (record.present_at_start, view.has_entity(entity_id)) {
                (false, false) => continue,
                (false, true) => EntityDeltaKind::Add,
                (true, false) => EntityDeltaKind::Remove,
                (true, true) => EntityDeltaKind::Update,
            };
            let mut entity_delta = EntityDelta::new(entity_id, kind);

            for (component_id, component_record) in record.components {
                let current = view.component(entity_id, component_id);
                match (component_record, current) {
                    (ComponentRecord::Added, Some(data)) => {
                        entity_delta.components_added.push(data.clone())
                    }
                    (ComponentRecord::Updated(update), _) if !update.is_empty() => {
                        entity_delta.component_updates.push(update)
                    }
                    (ComponentRecord::Refreshed, Some(data)) => {
                        entity_delta.components_refreshed.push(data.clone())
                    }
                    (ComponentRecord::Readded { previous, dirty }, Some(data)) => {
                        if dirty || *data != previous {
                            entity_delta.components_refreshed.push(data.clone());
                        }
                    }
                    (ComponentRecord::Removed { .. }, _) => {
                        entity_delta.components_removed.push(component_id)
                    }
                    _ => {}
                }
            }

            for (component_id, authority_record) in record.authority {
                let events = authority_record.events(view.authority(entity_id, component_id));
                if events.gained {
                    entity_delta.authority_gained.push(component_id);
                }
                if events.lost {
                    entity_delta.authority_lost.push(component_id);
                }
                if events.lost_temporarily {
                    entity_delta.authority_lost_temporarily.push(component_id);
                }
            }

            if kind != EntityDeltaKind::Update || entity_delta.has_changes() {
                entity_deltas.push(entity_delta);
            }
        }

        entity_deltas
    }
}
