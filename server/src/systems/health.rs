//! Regeneration and death.

use crate::content::components::REGEN_DELAY_TICKS;
use crate::content::entity_types::{entity_info, SpawnParams};
use crate::world::{EntityId, World};
use log::info;
use rand::Rng;
use shared::protocol::ItemStack;
use shared::{EntityType, Point};
use std::f32::consts::TAU;

const DROP_SPEED: f32 = 120.0;

pub fn update(world: &mut World) {
    for entity_id in world.components.health.entity_ids() {
        let Some(entity) = world.entity(entity_id) else {
            continue;
        };
        if !entity.is_active() {
            continue;
        }
        let position = entity.position;
        let entity_type = entity.entity_type;

        let health = world.components.health.get_component_mut(entity_id);
        if health.is_dead() {
            kill(world, entity_id, entity_type, position);
            continue;
        }
        health.ticks_since_damage = health.ticks_since_damage.saturating_add(1);
        if health.ticks_since_damage >= REGEN_DELAY_TICKS && health.health < health.max_health {
            health.health = (health.health + health.regen_per_tick).min(health.max_health);
        }
    }
}

/// Registers the death, scatters the entity's drops and inventory, and
/// flags it for removal.
fn kill(world: &mut World, entity_id: EntityId, entity_type: EntityType, position: Point) {
    world.register_entity_death(entity_id, position);
    if entity_type == EntityType::Player {
        info!("Player entity {} died", entity_id);
    }

    let mut drops: Vec<ItemStack> = entity_info(entity_type)
        .drops
        .iter()
        .map(|&(item_type, amount)| ItemStack { item_type, amount })
        .collect();
    if world.components.inventory.has_component(entity_id) {
        drops.extend(world.components.inventory.get_component_mut(entity_id).drain());
    }

    for stack in drops {
        let angle = world.rng_mut().gen_range(0.0..TAU);
        world.create_entity(
            EntityType::ItemEntity,
            position,
            0.0,
            SpawnParams::item(stack.item_type, stack.amount, Point::from_angle(angle, DROP_SPEED)),
        );
    }
    world.remove_entity(entity_id);
}
