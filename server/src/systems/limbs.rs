//! Main and offhand limb state machines: attacking and eating.

use crate::content::components::{Limb, LimbState, EAT_TICKS, RETURN_TICKS, WINDUP_TICKS};
use crate::world::{EntityId, World};
use shared::geometry::{circle_touches, PlacedHitbox};
use shared::{Bounds, LimbAction, Point};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LimbEffect {
    Swing,
    Eat,
}

/// Advances one limb a tick. `can_eat` gates entering the eating state.
fn step_limb(limb: &mut Limb, can_eat: bool) -> Option<LimbEffect> {
    let (next, effect) = match limb.state {
        LimbState::Idle => match limb.action {
            LimbAction::Attack => (
                LimbState::Windup {
                    ticks_left: WINDUP_TICKS,
                },
                None,
            ),
            LimbAction::Eat if can_eat => (
                LimbState::Eating {
                    ticks_left: EAT_TICKS,
                },
                None,
            ),
            _ => (LimbState::Idle, None),
        },
        LimbState::Windup { ticks_left } if ticks_left <= 1 => (LimbState::Swing, Some(LimbEffect::Swing)),
        LimbState::Windup { ticks_left } => (
            LimbState::Windup {
                ticks_left: ticks_left - 1,
            },
            None,
        ),
        LimbState::Swing => (
            LimbState::Return {
                ticks_left: RETURN_TICKS,
            },
            None,
        ),
        LimbState::Return { ticks_left } if ticks_left <= 1 => (LimbState::Idle, None),
        LimbState::Return { ticks_left } => (
            LimbState::Return {
                ticks_left: ticks_left - 1,
            },
            None,
        ),
        LimbState::Eating { .. } if limb.action != LimbAction::Eat || !can_eat => (LimbState::Idle, None),
        LimbState::Eating { ticks_left } if ticks_left <= 1 => (LimbState::Idle, Some(LimbEffect::Eat)),
        LimbState::Eating { ticks_left } => (
            LimbState::Eating {
                ticks_left: ticks_left - 1,
            },
            None,
        ),
    };
    limb.state = next;
    effect
}

fn selected_food(world: &World, entity_id: EntityId) -> Option<f32> {
    if !world.components.inventory.has_component(entity_id) {
        return None;
    }
    world
        .components
        .inventory
        .get_component(entity_id)
        .selected()
        .and_then(|stack| stack.item_type.food_value())
}

pub fn update(world: &mut World) {
    for entity_id in world.components.limbs.entity_ids() {
        if !world.is_active(entity_id) {
            continue;
        }
        let can_eat = selected_food(world, entity_id).is_some();
        let mut limbs = *world.components.limbs.get_component(entity_id);
        let effects = [
            step_limb(&mut limbs.main, can_eat),
            step_limb(&mut limbs.offhand, can_eat),
        ];
        *world.components.limbs.get_component_mut(entity_id) = limbs;

        for effect in effects.into_iter().flatten() {
            match effect {
                LimbEffect::Swing => swing(world, entity_id),
                LimbEffect::Eat => eat(world, entity_id),
            }
        }
    }
}

/// Damages everything the swing reaches and harvests resources into the
/// attacker's inventory.
fn swing(world: &mut World, attacker_id: EntityId) {
    let Some(attacker) = world.entity(attacker_id) else {
        return;
    };
    let limbs = *world.components.limbs.get_component(attacker_id);
    let reach_point = attacker.position + Point::from_angle(attacker.rotation, limbs.reach);

    let query = Bounds::around(reach_point, limbs.hit_radius, limbs.hit_radius);
    let range = world.board.chunk_range(&query);
    let targets: Vec<EntityId> = world
        .board
        .entities_in_range(range)
        .into_iter()
        .filter(|&target_id| target_id != attacker_id)
        .filter(|&target_id| {
            world.entity(target_id).is_some_and(|target| {
                target.is_active()
                    && target.hitboxes.iter().any(|hitbox| {
                        circle_touches(
                            reach_point,
                            limbs.hit_radius,
                            PlacedHitbox::new(hitbox, target.position, target.rotation),
                        )
                    })
            })
        })
        .collect();

    for target_id in targets {
        world.damage_entity(target_id, limbs.damage);
        harvest(world, attacker_id, target_id);
    }
}

fn harvest(world: &mut World, attacker_id: EntityId, target_id: EntityId) {
    if !world.components.resource.has_component(target_id)
        || !world.components.inventory.has_component(attacker_id)
    {
        return;
    }
    let resource = *world.components.resource.get_component(target_id);
    let taken = resource.yield_per_hit.min(resource.remaining);
    if taken == 0 {
        return;
    }
    let leftover = world
        .components
        .inventory
        .get_component_mut(attacker_id)
        .add_item(resource.item_type, taken);
    world
        .components
        .resource
        .get_component_mut(target_id)
        .remaining -= taken - leftover;
}

fn eat(world: &mut World, entity_id: EntityId) {
    let Some(food) = selected_food(world, entity_id) else {
        return;
    };
    let inventory = world.components.inventory.get_component_mut(entity_id);
    let slot = inventory.selected_slot;
    if inventory.remove_from_slot(slot, 1) {
        world.heal_entity(entity_id, food);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::content::entity_types::SpawnParams;
    use crate::world::events::WorldEvent;
    use shared::{EntityType, ItemType};

    fn world() -> World {
        World::new(WorldConfig {
            chunk_size: 100.0,
            width_chunks: 10,
            height_chunks: 10,
            spawning_enabled: false,
            ..Default::default()
        })
    }

    fn spawn_player(world: &mut World, position: Point) -> EntityId {
        let tribe = world.tribes.create_tribe();
        world.create_entity(EntityType::Player, position, 0.0, SpawnParams::player(1, tribe))
    }

    #[test]
    fn test_attack_cycle_timing() {
        let mut limb = Limb {
            action: LimbAction::Attack,
            state: LimbState::Idle,
        };
        let mut swings = Vec::new();
        for tick in 0..(1 + WINDUP_TICKS + 1 + RETURN_TICKS) {
            if step_limb(&mut limb, false) == Some(LimbEffect::Swing) {
                swings.push(tick);
            }
        }
        assert_eq!(swings, vec![WINDUP_TICKS]);
        assert_eq!(limb.state, LimbState::Idle);
    }

    #[test]
    fn test_eating_is_cancelled_without_food() {
        let mut limb = Limb {
            action: LimbAction::Eat,
            state: LimbState::Idle,
        };
        step_limb(&mut limb, false);
        assert_eq!(limb.state, LimbState::Idle);
        step_limb(&mut limb, true);
        assert!(matches!(limb.state, LimbState::Eating { .. }));
        step_limb(&mut limb, false);
        assert_eq!(limb.state, LimbState::Idle);
    }

    #[test]
    fn test_swing_hits_and_harvests_tree() {
        let mut world = world();
        let player = spawn_player(&mut world, Point::new(400.0, 400.0));
        let tree = world.create_entity(EntityType::Tree, Point::new(480.0, 400.0), 0.0, SpawnParams::default());
        world.push_join_buffer();
        world.components.limbs.get_component_mut(player).main.action = LimbAction::Attack;

        for _ in 0..=WINDUP_TICKS {
            update(&mut world);
        }

        let health = world.components.health.get_component(tree);
        assert!(health.health < health.max_health);
        let inventory = world.components.inventory.get_component(player);
        assert_eq!(inventory.count(ItemType::Wood), 1);
        assert!(world
            .take_events()
            .iter()
            .any(|event| matches!(event, WorldEvent::Hit(hit) if hit.entity_id == tree)));
    }

    #[test]
    fn test_eating_consumes_food_and_heals() {
        let mut world = world();
        let player = spawn_player(&mut world, Point::new(400.0, 400.0));
        world.push_join_buffer();
        world
            .components
            .inventory
            .get_component_mut(player)
            .add_item(ItemType::Berry, 2);
        world.components.health.get_component_mut(player).health = 5.0;
        world.components.limbs.get_component_mut(player).main.action = LimbAction::Eat;

        for _ in 0..=EAT_TICKS {
            update(&mut world);
        }

        assert_eq!(
            world.components.inventory.get_component(player).count(ItemType::Berry),
            1
        );
        assert_eq!(world.components.health.get_component(player).health, 7.0);
    }
}
