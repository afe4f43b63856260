//! Game content: component definitions and the static entity type table.

pub mod components;
pub mod entity_types;
