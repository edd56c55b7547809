use std::collections::{BTreeMap, BTreeSet};

use crate::{world::component::error::ComponentError, ComponentId, FieldId};

/// Serialized field values, keyed by field index. The bytes themselves are
/// never interpreted by the view.
pub type FieldMap = BTreeMap<FieldId, Vec<u8>>;

/// The full value of a Component, as received on add or refresh.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentData {
    component_id: ComponentId,
    fields: FieldMap,
}

impl ComponentData {
    pub fn new(component_id: ComponentId) -> Self {
        Self {
            component_id,
            fields: FieldMap::new(),
        }
    }

    pub fn with_fields(component_id: ComponentId, fields: FieldMap) -> Self {
        Self {
            component_id,
            fields,
        }
    }

    pub fn with_field(mut self, field_id: FieldId, value: impl Into<Vec<u8>>) -> Self {
        self.fields.insert(field_id, value.into());
        self
    }

    pub fn component_id(&self) -> ComponentId {
        self.component_id
    }

    pub fn field(&self, field_id: FieldId) -> Option<&[u8]> {
        self.fields.get(&field_id).map(Vec::as_slice)
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn set_field(&mut self, field_id: FieldId, value: impl Into<Vec<u8>>) {
        self.fields.insert(field_id, value.into());
    }

    /// Applies an update in place
    ///
    /// # Panics
    ///
    /// Panics if the update is for a different component type.
    /// Consider using `try_apply_update` for non-panicking error handling.
    pub fn apply_update(&mut self, update: &ComponentUpdate) {
        self.try_apply_update(update)
            .expect("cannot apply an update for a different component type")
    }

    pub fn try_apply_update(&mut self, update: &ComponentUpdate) -> Result<(), ComponentError> {
        if update.component_id != self.component_id {
            return Err(ComponentError::MismatchedComponent {
                expected: self.component_id,
                actual: update.component_id,
            });
        }

        for field_id in &update.cleared_fields {
            self.fields.remove(field_id);
        }
        for (field_id, value) in &update.fields {
            self.fields.insert(*field_id, value.clone());
        }

        Ok(())
    }
}

/// A partial change to a Component: a set of overwritten fields and a set of
/// cleared fields. A field is never in both sets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ComponentUpdate {
    component_id: ComponentId,
    fields: FieldMap,
    cleared_fields: BTreeSet<FieldId>,
}

impl ComponentUpdate {
    pub fn new(component_id: ComponentId) -> Self {
        Self {
            component_id,
            fields: FieldMap::new(),
            cleared_fields: BTreeSet::new(),
        }
    }

    pub fn with_field(mut self, field_id: FieldId, value: impl Into<Vec<u8>>) -> Self {
        self.set_field(field_id, value);
        self
    }

    pub fn with_cleared_field(mut self, field_id: FieldId) -> Self {
        self.clear_field(field_id);
        self
    }

    pub fn component_id(&self) -> ComponentId {
        self.component_id
    }

    pub fn field(&self, field_id: FieldId) -> Option<&[u8]> {
        self.fields.get(&field_id).map(Vec::as_slice)
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn cleared_fields(&self) -> &BTreeSet<FieldId> {
        &self.cleared_fields
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.cleared_fields.is_empty()
    }

    pub fn set_field(&mut self, field_id: FieldId, value: impl Into<Vec<u8>>) {
        self.cleared_fields.remove(&field_id);
        self.fields.insert(field_id, value.into());
    }

    pub fn clear_field(&mut self, field_id: FieldId) {
        self.fields.remove(&field_id);
        self.cleared_fields.insert(field_id);
    }

    /// Folds a later update into this one, so that applying the result is
    /// equivalent to applying `self` then `later`.
    ///
    /// # Panics
    ///
    /// Panics if the updates are for different component types.
    /// Consider using `try_merge` for non-panicking error handling.
    pub fn merge(&mut self, later: ComponentUpdate) {
        self.try_merge(later)
            .expect("cannot merge updates for different component types")
    }

    pub fn try_merge(&mut self, later: ComponentUpdate) -> Result<(), ComponentError> {
        if later.component_id != self.component_id {
            return Err(ComponentError::MismatchedComponent {
                expected: self.component_id,
                actual: later.component_id,
            });
        }

        for field_id in later.cleared_fields {
            self.clear_field(field_id);
        }
        for (field_id, value) in later.fields {
            self.set_field(field_id, value);
        }

        Ok(())
    }
}
