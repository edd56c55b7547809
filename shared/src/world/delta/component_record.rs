use crate::{ComponentData, ComponentUpdate};

/// Net effect of all ops in a batch on one (entity, component) pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ComponentRecord {
    /// Absent at the start of the batch, present now.
    Added,
    /// Present throughout, only partially updated.
    Updated(ComponentUpdate),
    /// Present throughout, whole value replaced at least once.
    Refreshed,
    /// Present at the start, absent now.
    Removed {
        previous: ComponentData,
        dirty: bool,
    },
    /// Present at the start, removed, then added again.
    Readded {
        previous: ComponentData,
        dirty: bool,
    },
    /// Added and removed again within the batch.
    Cancelled,
}

impl ComponentRecord {
    pub fn on_add(record: Option<ComponentRecord>) -> ComponentRecord {
        match record {
            Some(ComponentRecord::Removed { previous, dirty }) => {
                ComponentRecord::Readded { previous, dirty }
            }
            _ => ComponentRecord::Added,
        }
    }

    pub fn on_update(record: Option<ComponentRecord>, update: &ComponentUpdate) -> ComponentRecord {
        match record {
            None => ComponentRecord::Updated(update.clone()),
            Some(ComponentRecord::Updated(mut merged)) => {
                merged.merge(update.clone());
                ComponentRecord::Updated(merged)
            }
            Some(other) => other,
        }
    }

    pub fn on_refresh(record: Option<ComponentRecord>) -> ComponentRecord {
        match record {
            None | Some(ComponentRecord::Updated(_)) => ComponentRecord::Refreshed,
            Some(other) => other,
        }
    }

    /// `current` is the value just before removal.
    pub fn on_remove(record: Option<ComponentRecord>, current: ComponentData) -> ComponentRecord {
        match record {
            None => ComponentRecord::Removed {
                previous: current,
                dirty: false,
            },
            Some(ComponentRecord::Updated(_)) | Some(ComponentRecord::Refreshed) => {
                ComponentRecord::Removed {
                    previous: current,
                    dirty: true,
                }
            }
            Some(ComponentRecord::Readded { previous, dirty }) => {
                ComponentRecord::Removed { previous, dirty }
            }
            Some(ComponentRecord::Added) | Some(ComponentRecord::Cancelled) => {
                ComponentRecord::Cancelled
            }
            Some(removed @ ComponentRecord::Removed { .. }) => removed,
        }
    }
}
