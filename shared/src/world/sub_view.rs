use std::{
    cell::RefCell,
    collections::{BTreeMap, BTreeSet},
    rc::Rc,
};

use log::trace;

use crate::{
    CallbackId, ComponentData, ComponentId, Dispatcher, EntityComponentChange, EntityDelta,
    EntityDeltaKind, EntityId, EntityQuery, EntityView, EntityViewElement, QueryConstraint,
    ViewDelta,
};

/// Decides whether a tagged entity belongs in a `SubView`.
pub type FilterPredicate = Box<dyn Fn(EntityId, &EntityViewElement) -> bool>;

/// Changes that make a `SubView` run its filter again for the entity.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RefreshTrigger {
    /// The component was added, updated, refreshed or removed.
    Component(ComponentId),
    /// Authority over the component was gained or lost, even temporarily.
    Authority(ComponentId),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum SubViewEvent {
    Tagged(EntityId),
    Untagged(EntityId),
    Refresh(EntityId),
}

type PendingEvents = Rc<RefCell<Vec<SubViewEvent>>>;

/// The part of the view made of entities carrying a tag component and
/// passing a filter, with its own per-tick delta.
///
/// Entities entering the sub view show up in its delta as added with every
/// current component, entities leaving it as removed. Complete entities
/// forward their changes from the full delta unchanged. Membership is
/// settled once per tick in `advance`.
pub struct SubView {
    tag: ComponentId,
    filter: FilterPredicate,
    pending: PendingEvents,
    callback_ids: Vec<CallbackId>,
    tagged: BTreeSet<EntityId>,
    complete: BTreeSet<EntityId>,
    newly_complete: BTreeSet<EntityId>,
    newly_incomplete: BTreeSet<EntityId>,
    delta: ViewDelta,
}

impl SubView {
    /// Registers the tag and refresh callbacks with `dispatcher`. Entities
    /// already tagged in `view` are picked up on the first `advance`.
    pub fn new(
        tag: ComponentId,
        filter: FilterPredicate,
        refresh_triggers: &[RefreshTrigger],
        dispatcher: &mut Dispatcher,
        view: &EntityView,
    ) -> Self {
        let pending = PendingEvents::default();
        let mut callback_ids = Vec::new();

        let events = pending.clone();
        callback_ids.push(dispatcher.register_component_added_callback(
            tag,
            move |event| events.borrow_mut().push(SubViewEvent::Tagged(event.entity_id)),
            view,
        ));
        let events = pending.clone();
        callback_ids.push(dispatcher.register_component_removed_callback(tag, move |event| {
            events.borrow_mut().push(SubViewEvent::Untagged(event.entity_id))
        }));

        for trigger in refresh_triggers {
            callback_ids.extend(register_refresh_trigger(*trigger, &pending, dispatcher, view));
        }

        Self {
            tag,
            filter,
            pending,
            callback_ids,
            tagged: BTreeSet::new(),
            complete: BTreeSet::new(),
            newly_complete: BTreeSet::new(),
            newly_incomplete: BTreeSet::new(),
            delta: ViewDelta::new(),
        }
    }

    /// A sub view of every tagged entity.
    pub fn unfiltered(tag: ComponentId, dispatcher: &mut Dispatcher, view: &EntityView) -> Self {
        Self::new(tag, Box::new(|_, _| true), &[], dispatcher, view)
    }

    pub fn tag(&self) -> ComponentId {
        self.tag
    }

    /// Callbacks this sub view registered with the dispatcher.
    pub fn callback_ids(&self) -> &[CallbackId] {
        &self.callback_ids
    }

    pub fn view_delta(&self) -> &ViewDelta {
        &self.delta
    }

    pub fn is_complete(&self, entity_id: EntityId) -> bool {
        self.complete.contains(&entity_id)
    }

    pub fn complete_entities(&self) -> &BTreeSet<EntityId> {
        &self.complete
    }

    /// Entities that entered the sub view in the last `advance`.
    pub fn newly_complete_entities(&self) -> &BTreeSet<EntityId> {
        &self.newly_complete
    }

    /// Entities that left the sub view in the last `advance`.
    pub fn newly_incomplete_entities(&self) -> &BTreeSet<EntityId> {
        &self.newly_incomplete
    }

    /// Runs the filter for `entity_id` again on the next `advance`, for
    /// filters that depend on state outside the view.
    pub fn refresh_entity(&self, entity_id: EntityId) {
        self.pending
            .borrow_mut()
            .push(SubViewEvent::Refresh(entity_id));
    }

    /// Restricts `query` to tagged entities and asks for the tag in the
    /// results.
    pub fn tag_query(&self, query: &mut EntityQuery) {
        if let Some(result_components) = query.result_components.as_mut() {
            if !result_components.contains(&self.tag) {
                result_components.push(self.tag);
            }
        }

        let tag_constraint = QueryConstraint::Component(self.tag);
        match &mut query.constraint {
            QueryConstraint::And(constraints) if !constraints.is_empty() => {
                constraints.push(tag_constraint)
            }
            constraint => {
                let previous = std::mem::replace(constraint, QueryConstraint::And(Vec::new()));
                *constraint = QueryConstraint::And(vec![previous, tag_constraint]);
            }
        }
    }

    /// Adds the tag to the components of an entity about to be created.
    pub fn tag_entity(&self, components: &mut Vec<ComponentData>) {
        components.push(ComponentData::new(self.tag));
    }

    /// Settles membership from everything observed since the last call and
    /// projects `delta` onto the sub view. Call once per tick, after the
    /// dispatcher has run on `delta`.
    pub fn advance(&mut self, view: &EntityView, delta: &ViewDelta) {
        self.newly_complete.clear();
        self.newly_incomplete.clear();

        let events = std::mem::take(&mut *self.pending.borrow_mut());
        let mut to_check = BTreeSet::new();
        for event in events {
            match event {
                SubViewEvent::Tagged(entity_id) => {
                    self.tagged.insert(entity_id);
                    to_check.insert(entity_id);
                }
                SubViewEvent::Untagged(entity_id) => {
                    self.tagged.remove(&entity_id);
                    to_check.remove(&entity_id);
                    self.mark_incomplete(entity_id);
                }
                SubViewEvent::Refresh(entity_id) => {
                    if self.tagged.contains(&entity_id) {
                        to_check.insert(entity_id);
                    }
                }
            }
        }

        for entity_id in to_check {
            let passes = view
                .get(entity_id)
                .is_some_and(|element| (self.filter)(entity_id, element));
            if passes {
                self.mark_complete(entity_id);
            } else {
                self.mark_incomplete(entity_id);
            }
        }

        self.delta = self.project(view, delta);
        self.complete.extend(self.newly_complete.iter().copied());

        if !self.newly_complete.is_empty() || !self.newly_incomplete.is_empty() {
            trace!(
                "sub view for tag {}: {} entered, {} left, {} complete",
                self.tag,
                self.newly_complete.len(),
                self.newly_incomplete.len(),
                self.complete.len()
            );
        }
    }

    fn mark_complete(&mut self, entity_id: EntityId) {
        // left and came back within the tick
        if self.newly_incomplete.remove(&entity_id) {
            self.complete.insert(entity_id);
            return;
        }
        if !self.complete.contains(&entity_id) {
            self.newly_complete.insert(entity_id);
        }
    }

    fn mark_incomplete(&mut self, entity_id: EntityId) {
        if self.newly_complete.remove(&entity_id) {
            return;
        }
        if self.complete.remove(&entity_id) {
            self.newly_incomplete.insert(entity_id);
        }
    }

    fn project(&self, view: &EntityView, delta: &ViewDelta) -> ViewDelta {
        let mut entity_deltas = BTreeMap::new();

        for entity_delta in delta.entity_deltas() {
            if self.complete.contains(&entity_delta.entity_id) {
                entity_deltas.insert(entity_delta.entity_id, entity_delta.clone());
            }
        }
        for entity_id in &self.newly_complete {
            if let Some(element) = view.get(*entity_id) {
                entity_deltas.insert(*entity_id, entering_delta(*entity_id, element));
            }
        }
        for entity_id in &self.newly_incomplete {
            entity_deltas.insert(
                *entity_id,
                leaving_delta(*entity_id, view.get(*entity_id), delta.entity_delta(*entity_id)),
            );
        }

        ViewDelta::from_entity_deltas(entity_deltas.into_values().collect())
    }
}

fn register_refresh_trigger(
    trigger: RefreshTrigger,
    pending: &PendingEvents,
    dispatcher: &mut Dispatcher,
    view: &EntityView,
) -> Vec<CallbackId> {
    match trigger {
        RefreshTrigger::Component(component_id) => vec![
            dispatcher.register_component_value_callback(
                component_id,
                refresh_on_component(pending),
                view,
            ),
            dispatcher.register_component_removed_callback(component_id, refresh_on_component(pending)),
        ],
        RefreshTrigger::Authority(component_id) => vec![
            dispatcher.register_authority_gained_callback(
                component_id,
                refresh_on_authority(pending),
                view,
            ),
            dispatcher.register_authority_lost_callback(component_id, refresh_on_authority(pending)),
            dispatcher.register_authority_lost_temporarily_callback(
                component_id,
                refresh_on_authority(pending),
            ),
        ],
    }
}

fn refresh_on_component(pending: &PendingEvents) -> impl FnMut(EntityComponentChange<'_>) + 'static {
    let events = pending.clone();
    move |event| events.borrow_mut().push(SubViewEvent::Refresh(event.entity_id))
}

fn refresh_on_authority(pending: &PendingEvents) -> impl FnMut(EntityId) + 'static {
    let events = pending.clone();
    move |entity_id| events.borrow_mut().push(SubViewEvent::Refresh(entity_id))
}

fn entering_delta(entity_id: EntityId, element: &EntityViewElement) -> EntityDelta {
    let mut entity_delta = EntityDelta::new(entity_id, EntityDeltaKind::Add);
    entity_delta.components_added = element.components.values().cloned().collect();
    entity_delta.authority_gained = element.authority.keys().copied().collect();
    entity_delta
}

/// Removes what the sub view last reported for the entity: its components
/// and authority as they stood before this tick.
fn leaving_delta(
    entity_id: EntityId,
    element: Option<&EntityViewElement>,
    entity_delta: Option<&EntityDelta>,
) -> EntityDelta {
    let mut components: BTreeSet<ComponentId> = element
        .map(|element| element.components.keys().copied().collect())
        .unwrap_or_default();
    let mut authority: BTreeSet<ComponentId> = element
        .map(|element| element.authority.keys().copied().collect())
        .unwrap_or_default();

    if let Some(entity_delta) = entity_delta {
        components.extend(entity_delta.components_removed.iter().copied());
        for data in &entity_delta.components_added {
            components.remove(&data.component_id());
        }
        authority.extend(entity_delta.authority_lost.iter().copied());
        for component_id in &entity_delta.authority_gained {
            authority.remove(component_id);
        }
    }

    let mut leaving = EntityDelta::new(entity_id, EntityDeltaKind::Remove);
    leaving.components_removed = components.into_iter().collect();
    leaving.authority_lost = authority.into_iter().collect();
    leaving
}
