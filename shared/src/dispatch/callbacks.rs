use std::{cell::RefCell, collections::BTreeSet, fmt, rc::Rc};

use crate::{EntityComponentChange, EntityId};

/// Handle for one registered callback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CallbackId(u64);

impl CallbackId {
    pub(crate) const fn new(value: u64) -> Self {
        Self(value)
    }

    pub const fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for CallbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub type ComponentCallback = Box<dyn FnMut(EntityComponentChange<'_>)>;
pub type AuthorityCallback = Box<dyn FnMut(EntityId)>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CallbackKind {
    ComponentAdded,
    ComponentRemoved,
    ComponentValue,
    AuthorityGained,
    AuthorityLost,
    AuthorityLostTemporarily,
}

/// Removes callbacks from inside other callbacks.
///
/// A removed callback is skipped for the rest of the current dispatch pass
/// and dropped from the dispatcher when the pass ends. Outside a pass the
/// callback is dropped at the start of the next `invoke_callbacks`, and
/// `Dispatcher::callback_count` no longer counts it in the meantime.
#[derive(Clone, Default)]
pub struct CallbackRemover {
    pending: Rc<RefCell<BTreeSet<CallbackId>>>,
}

impl CallbackRemover {
    pub fn remove(&self, callback_id: CallbackId) {
        self.pending.borrow_mut().insert(callback_id);
    }

    pub(crate) fn count_pending(&self, is_registered: impl Fn(&CallbackId) -> bool) -> usize {
        self.pending.borrow().iter().filter(|id| is_registered(id)).count()
    }

    pub(crate) fn is_pending(&self, callback_id: CallbackId) -> bool {
        self.pending.borrow().contains(&callback_id)
    }

    pub(crate) fn take_pending(&self) -> BTreeSet<CallbackId> {
        std::mem::take(&mut *self.pending.borrow_mut())
    }
}

/// Callbacks of one kind for one component, in registration order.
pub(crate) struct Callbacks<C> {
    entries: Vec<(CallbackId, C)>,
}

impl<C> Default for Callbacks<C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<C> Callbacks<C> {
    pub fn add(&mut self, callback_id: CallbackId, callback: C) {
        self.entries.push((callback_id, callback));
    }

    pub fn remove(&mut self, callback_id: CallbackId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(id, _)| *id != callback_id);
        self.entries.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Calls `call` on every callback not removed so far. The pending set is
    /// checked before each call so removals made by earlier callbacks in the
    /// same pass take effect immediately.
    pub fn invoke(&mut self, remover: &CallbackRemover, mut call: impl FnMut(&mut C)) {
        for (callback_id, callback) in self.entries.iter_mut() {
            if remover.is_pending(*callback_id) {
                continue;
            }
            call(callback);
        }
    }
}
