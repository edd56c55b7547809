//! # Delta
//! Applies op batches to the `EntityView` and condenses them into a
//! per-entity `ViewDelta`.
//!
//! A batch is first validated as a whole, then applied op by op while a
//! record per (entity, component) tracks what the component went through.
//! The records are then folded into the net changes the application sees:
//! at most one of added / updated / refreshed / removed per component, plus
//! authority transitions.

pub mod authority_record;
pub mod component_record;
pub mod entity_delta;
pub mod error;
pub mod validation;
pub mod view_delta;
