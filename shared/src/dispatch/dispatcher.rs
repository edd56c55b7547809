use std::collections::BTreeMap;

use log::{debug, trace};

use crate::{
    dispatch::{
        callbacks::{
            AuthorityCallback, CallbackId, CallbackKind, CallbackRemover, Callbacks,
            ComponentCallback,
        },
        error::DispatchError,
    },
    ComponentChange, ComponentId, EntityComponentChange, EntityId, EntityView, ViewDelta,
};

struct ComponentCallbacks {
    component_id: ComponentId,
    added: Callbacks<ComponentCallback>,
    removed: Callbacks<ComponentCallback>,
    value: Callbacks<ComponentCallback>,
}

struct AuthorityCallbacks {
    component_id: ComponentId,
    gained: Callbacks<AuthorityCallback>,
    lost: Callbacks<AuthorityCallback>,
    lost_temporarily: Callbacks<AuthorityCallback>,
}

/// Callbacks of every kind for one component id.
trait Bucket {
    fn new(component_id: ComponentId) -> Self;
    fn component_id(&self) -> ComponentId;
    fn is_empty(&self) -> bool;
}

impl Bucket for ComponentCallbacks {
    fn new(component_id: ComponentId) -> Self {
        Self {
            component_id,
            added: Callbacks::default(),
            removed: Callbacks::default(),
            value: Callbacks::default(),
        }
    }

    fn component_id(&self) -> ComponentId {
        self.component_id
    }

    fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty() && self.value.is_empty()
    }
}

impl Bucket for AuthorityCallbacks {
    fn new(component_id: ComponentId) -> Self {
        Self {
            component_id,
            gained: Callbacks::default(),
            lost: Callbacks::default(),
            lost_temporarily: Callbacks::default(),
        }
    }

    fn component_id(&self) -> ComponentId {
        self.component_id
    }

    fn is_empty(&self) -> bool {
        self.gained.is_empty() && self.lost.is_empty() && self.lost_temporarily.is_empty()
    }
}

fn bucket_mut<B: Bucket>(buckets: &mut Vec<B>, component_id: ComponentId) -> &mut B {
    let index = match buckets.binary_search_by_key(&component_id, B::component_id) {
        Ok(index) => index,
        Err(index) => {
            buckets.insert(index, B::new(component_id));
            index
        }
    };
    &mut buckets[index]
}

/// Removes a callback from the bucket for `component_id`, dropping the
/// bucket once it holds no callbacks.
fn remove_from_bucket<B: Bucket>(
    buckets: &mut Vec<B>,
    component_id: ComponentId,
    remove: impl FnOnce(&mut B) -> bool,
) -> bool {
    let Ok(index) = buckets.binary_search_by_key(&component_id, B::component_id) else {
        return false;
    };
    let removed = remove(&mut buckets[index]);
    if buckets[index].is_empty() {
        buckets.remove(index);
    }
    removed
}

/// Merge-join of changes sorted by component id against buckets sorted by
/// component id. Linear in the length of both.
fn for_each_match<T, B: Bucket>(
    changes: impl IntoIterator<Item = T>,
    change_key: impl Fn(&T) -> ComponentId,
    buckets: &mut [B],
    mut on_match: impl FnMut(T, &mut B),
) {
    let mut index = 0;
    for change in changes {
        let key = change_key(&change);
        while index < buckets.len() && buckets[index].component_id() < key {
            index += 1;
        }
        if index == buckets.len() {
            return;
        }
        if buckets[index].component_id() == key {
            on_match(change, &mut buckets[index]);
        }
    }
}

/// Routes each tick's `ViewDelta` to callbacks registered per component
/// type and event kind.
#[derive(Default)]
pub struct Dispatcher {
    next_callback_id: u64,
    component_callbacks: Vec<ComponentCallbacks>,
    authority_callbacks: Vec<AuthorityCallbacks>,
    locations: BTreeMap<CallbackId, (ComponentId, CallbackKind)>,
    remover: CallbackRemover,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle that can remove callbacks while a dispatch pass is running.
    pub fn callback_remover(&self) -> CallbackRemover {
        self.remover.clone()
    }

    /// Registered callbacks, not counting those removed through a
    /// `CallbackRemover` and still waiting to be dropped.
    pub fn callback_count(&self) -> usize {
        let pending = self
            .remover
            .count_pending(|callback_id| self.locations.contains_key(callback_id));
        self.locations.len() - pending
    }

    fn allocate_id(&mut self, component_id: ComponentId, kind: CallbackKind) -> CallbackId {
        self.next_callback_id += 1;
        let callback_id = CallbackId::new(self.next_callback_id);
        self.locations.insert(callback_id, (component_id, kind));
        trace!(
            "registered {:?} callback {} for component {}",
            kind,
            callback_id,
            component_id
        );
        callback_id
    }

    // Registration

    /// Registers a callback for components of `component_id` being added.
    /// It is invoked at once for every such component already in `view`.
    pub fn register_component_added_callback(
        &mut self,
        component_id: ComponentId,
        mut callback: impl FnMut(EntityComponentChange<'_>) + 'static,
        view: &EntityView,
    ) -> CallbackId {
        invoke_for_existing_components(component_id, &mut callback, view);
        let callback_id = self.allocate_id(component_id, CallbackKind::ComponentAdded);
        bucket_mut(&mut self.component_callbacks, component_id)
            .added
            .add(callback_id, Box::new(callback));
        callback_id
    }

    pub fn register_component_removed_callback(
        &mut self,
        component_id: ComponentId,
        callback: impl FnMut(EntityComponentChange<'_>) + 'static,
    ) -> CallbackId {
        let callback_id = self.allocate_id(component_id, CallbackKind::ComponentRemoved);
        bucket_mut(&mut self.component_callbacks, component_id)
            .removed
            .add(callback_id, Box::new(callback));
        callback_id
    }

    /// Registers a callback for every new value of components of
    /// `component_id`: adds, updates, and refreshes. It is invoked at once
    /// for every such component already in `view`.
    pub fn register_component_value_callback(
        &mut self,
        component_id: ComponentId,
        mut callback: impl FnMut(EntityComponentChange<'_>) + 'static,
        view: &EntityView,
    ) -> CallbackId {
        invoke_for_existing_components(component_id, &mut callback, view);
        let callback_id = self.allocate_id(component_id, CallbackKind::ComponentValue);
        bucket_mut(&mut self.component_callbacks, component_id)
            .value
            .add(callback_id, Box::new(callback));
        callback_id
    }

    /// Invoked at once for every entity already authoritative over
    /// `component_id` in `view`.
    pub fn register_authority_gained_callback(
        &mut self,
        component_id: ComponentId,
        mut callback: impl FnMut(EntityId) + 'static,
        view: &EntityView,
    ) -> CallbackId {
        for (entity_id, element) in view.iter() {
            if element.has_component(component_id) && element.has_authority(component_id) {
                callback(*entity_id);
            }
        }
        let callback_id = self.allocate_id(component_id, CallbackKind::AuthorityGained);
        bucket_mut(&mut self.authority_callbacks, component_id)
            .gained
            .add(callback_id, Box::new(callback));
        callback_id
    }

    pub fn register_authority_lost_callback(
        &mut self,
        component_id: ComponentId,
        callback: impl FnMut(EntityId) + 'static,
    ) -> CallbackId {
        let callback_id = self.allocate_id(component_id, CallbackKind::AuthorityLost);
        bucket_mut(&mut self.authority_callbacks, component_id)
            .lost
            .add(callback_id, Box::new(callback));
        callback_id
    }

    pub fn register_authority_lost_temporarily_callback(
        &mut self,
        component_id: ComponentId,
        callback: impl FnMut(EntityId) + 'static,
    ) -> CallbackId {
        let callback_id = self.allocate_id(component_id, CallbackKind::AuthorityLostTemporarily);
        bucket_mut(&mut self.authority_callbacks, component_id)
            .lost_temporarily
            .add(callback_id, Box::new(callback));
        callback_id
    }

    // Removal

    /// Removes a registered callback
    ///
    /// # Panics
    ///
    /// Panics if no callback with this id is registered.
    /// Consider using `try_remove_callback` for non-panicking error handling.
    pub fn remove_callback(&mut self, callback_id: CallbackId) {
        self.try_remove_callback(callback_id)
            .expect("callback is not registered")
    }

    pub fn try_remove_callback(&mut self, callback_id: CallbackId) -> Result<(), DispatchError> {
        let (component_id, kind) = self
            .locations
            .remove(&callback_id)
            .ok_or(DispatchError::CallbackNotFound { callback_id })?;

        let removed = match kind {
            CallbackKind::ComponentAdded
            | CallbackKind::ComponentRemoved
            | CallbackKind::ComponentValue => {
                remove_from_bucket(&mut self.component_callbacks, component_id, |bucket| match kind {
                    CallbackKind::ComponentAdded => bucket.added.remove(callback_id),
                    CallbackKind::ComponentRemoved => bucket.removed.remove(callback_id),
                    _ => bucket.value.remove(callback_id),
                })
            }
            CallbackKind::AuthorityGained
            | CallbackKind::AuthorityLost
            | CallbackKind::AuthorityLostTemporarily => {
                remove_from_bucket(&mut self.authority_callbacks, component_id, |bucket| match kind {
                    CallbackKind::AuthorityGained => bucket.gained.remove(callback_id),
                    CallbackKind::AuthorityLost => bucket.lost.remove(callback_id),
                    _ => bucket.lost_temporarily.remove(callback_id),
                })
            }
        };
        debug_assert!(removed, "callback {} missing from its bucket", callback_id);

        trace!("removed callback {}", callback_id);
        Ok(())
    }

    fn flush_pending_removals(&mut self) {
        for callback_id in self.remover.take_pending() {
            if self.try_remove_callback(callback_id).is_err() {
                debug!("callback {} was already removed", callback_id);
            }
        }
    }

    // Dispatch

    /// Invokes every matching callback for every entity in `delta`.
    ///
    /// Per entity the order is: added (each followed by its value
    /// callbacks), removed, updated, refreshed, authority gained, authority
    /// lost, authority lost temporarily. Within each group callbacks run in
    /// ascending component id order.
    pub fn invoke_callbacks(&mut self, delta: &ViewDelta) {
        self.flush_pending_removals();

        let remover = &self.remover;
        let change_key = |change: &ComponentChange<'_>| change.component_id();
        let authority_key = |component_id: &ComponentId| *component_id;

        for entity_delta in delta.entity_deltas() {
            let entity_id = entity_delta.entity_id;
            let event = |change| EntityComponentChange { entity_id, change };

            for_each_match(
                entity_delta.added(),
                change_key,
                &mut self.component_callbacks,
                |change, bucket| {
                    bucket.added.invoke(remover, |callback| callback(event(change)));
                    bucket.value.invoke(remover, |callback| callback(event(change)));
                },
            );
            for_each_match(
                entity_delta.removed(),
                change_key,
                &mut self.component_callbacks,
                |change, bucket| {
                    bucket.removed.invoke(remover, |callback| callback(event(change)));
                },
            );
            for_each_match(
                entity_delta.updated(),
                change_key,
                &mut self.component_callbacks,
                |change, bucket| {
                    bucket.value.invoke(remover, |callback| callback(event(change)));
                },
            );
            for_each_match(
                entity_delta.refreshed(),
                change_key,
                &mut self.component_callbacks,
                |change, bucket| {
                    bucket.value.invoke(remover, |callback| callback(event(change)));
                },
            );

            for_each_match(
                entity_delta.authority_gained.iter().copied(),
                authority_key,
                &mut self.authority_callbacks,
                |_, bucket| bucket.gained.invoke(remover, |callback| callback(entity_id)),
            );
            for_each_match(
                entity_delta.authority_lost.iter().copied(),
                authority_key,
                &mut self.authority_callbacks,
                |_, bucket| bucket.lost.invoke(remover, |callback| callback(entity_id)),
            );
            for_each_match(
                entity_delta.authority_lost_temporarily.iter().copied(),
                authority_key,
                &mut self.authority_callbacks,
                |_, bucket| {
                    bucket
                        .lost_temporarily
                        .invoke(remover, |callback| callback(entity_id))
                },
            );
        }

        self.flush_pending_removals();
    }
}

fn invoke_for_existing_components(
    component_id: ComponentId,
    callback: &mut impl FnMut(EntityComponentChange<'_>),
    view: &EntityView,
) {
    for (entity_id, element) in view.iter() {
        if let Some(data) = element.component(component_id) {
            callback(EntityComponentChange {
                entity_id: *entity_id,
                change: ComponentChange::Add(data),
            });
        }
    }
}
