//! Per-entity update systems, collision and spawning.
//!
//! Each system checks for the components it needs instead of switching on
//! entity type. Systems may create or remove entities; those changes are
//! buffered by the world until the next flush.

pub mod collision;
pub mod health;
pub mod limbs;
pub mod movement;
pub mod pickup;
pub mod spawning;
pub mod wander;

use crate::world::World;

pub fn age_entities(world: &mut World) {
    for entity_id in world.active_entity_ids() {
        if let Some(entity) = world.entity_mut(entity_id) {
            entity.age_ticks += 1;
        }
    }
}

/// Runs every per-entity system once. Wander must run before movement so
/// the acceleration it picks is integrated in the same tick.
pub fn run_update_phase(world: &mut World) {
    wander::update(world);
    movement::update(world);
    limbs::update(world);
    pickup::update(world);
    health::update(world);
    age_entities(world);
}
