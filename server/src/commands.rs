//! Executes parsed text commands on behalf of a player.
//!
//! Every command returns whether it had an effect; a rejected command
//! leaves the world untouched.

use crate::content::entity_types::SpawnParams;
use crate::world::{EntityId, World};
use log::{info, warn};
use shared::{Command, EntityType, Point};

/// Distance in front of the player where summoned entities appear.
const SUMMON_DISTANCE: f32 = 120.0;
const MAX_SUMMON: u32 = 50;

pub fn execute_command(world: &mut World, player_id: EntityId, command: &Command) -> bool {
    if !world.is_active(player_id) {
        warn!("Command {:?} from inactive entity {}", command, player_id);
        return false;
    }

    let executed = match *command {
        Command::Kill => {
            let health = world.components.health.get_component(player_id).health;
            world.damage_entity(player_id, health.max(0.0))
        }
        Command::Damage { amount } => world.damage_entity(player_id, amount),
        Command::Heal { amount } => world.heal_entity(player_id, amount),
        Command::Give { item, amount } => {
            let leftover = world
                .components
                .inventory
                .get_component_mut(player_id)
                .add_item(item, amount);
            leftover < amount
        }
        Command::Teleport { x, y } => teleport(world, player_id, Point::new(x, y)),
        Command::TeleportBiome { biome } => match world.random_position_in_biome(biome) {
            Some(position) => teleport(world, player_id, position),
            None => false,
        },
        Command::Summon {
            entity_type,
            amount,
        } => summon(world, player_id, entity_type, amount),
        Command::Research { tech } => match world.tribe_of(player_id) {
            Some(tribe_id) => world.tribes.start_research(tribe_id, tech),
            None => false,
        },
        Command::ClearInventory => {
            world.components.inventory.get_component_mut(player_id).drain();
            true
        }
    };

    if executed {
        info!("Entity {} ran {:?}", player_id, command);
    } else {
        warn!("Command {:?} from entity {} had no effect", command, player_id);
    }
    executed
}

fn in_world(world: &World, position: Point) -> bool {
    position.x >= 0.0
        && position.y >= 0.0
        && position.x <= world.config().world_width()
        && position.y <= world.config().world_height()
}

/// Moves the player. Chunk membership catches up at the next chunk sync.
fn teleport(world: &mut World, player_id: EntityId, position: Point) -> bool {
    if !in_world(world, position) {
        return false;
    }
    let Some(entity) = world.entity_mut(player_id) else {
        return false;
    };
    entity.position = position;
    entity.velocity = Point::ZERO;
    true
}

fn summon(world: &mut World, player_id: EntityId, entity_type: EntityType, amount: u32) -> bool {
    let params = match entity_type {
        EntityType::Player | EntityType::ItemEntity => return false,
        EntityType::Totem => match world.tribe_of(player_id) {
            Some(tribe_id) => SpawnParams {
                tribe_id: Some(tribe_id),
                ..Default::default()
            },
            None => return false,
        },
        _ => SpawnParams::default(),
    };
    let Some(player) = world.entity(player_id) else {
        return false;
    };
    let position = player.position + Point::from_angle(player.rotation, SUMMON_DISTANCE);
    if !in_world(world, position) {
        return false;
    }
    for _ in 0..amount.min(MAX_SUMMON) {
        world.create_entity(entity_type, position, 0.0, params);
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use shared::{ItemType, TechType};

    fn setup() -> (World, EntityId) {
        let mut world = World::new(WorldConfig {
            chunk_size: 100.0,
            width_chunks: 10,
            height_chunks: 10,
            spawning_enabled: false,
            ..Default::default()
        });
        let tribe = world.tribes.create_tribe();
        let player = world.create_entity(EntityType::Player, Point::new(500.0, 500.0), 0.0, SpawnParams::player(1, tribe));
        world.push_join_buffer();
        (world, player)
    }

    #[test]
    fn test_give_and_clear_inventory() {
        let (mut world, player) = setup();
        assert!(execute_command(&mut world, player, &Command::parse("give wood 12").unwrap()));
        assert_eq!(world.components.inventory.get_component(player).count(ItemType::Wood), 12);
        assert!(execute_command(&mut world, player, &Command::ClearInventory));
        assert_eq!(world.components.inventory.get_component(player).count(ItemType::Wood), 0);
    }

    #[test]
    fn test_teleport_outside_world_is_rejected() {
        let (mut world, player) = setup();
        assert!(!execute_command(&mut world, player, &Command::Teleport { x: -5.0, y: 10.0 }));
        assert!(execute_command(&mut world, player, &Command::Teleport { x: 900.0, y: 10.0 }));
        assert_eq!(world.entity(player).unwrap().position, Point::new(900.0, 10.0));
    }

    #[test]
    fn test_kill_leaves_zero_health() {
        let (mut world, player) = setup();
        assert!(execute_command(&mut world, player, &Command::Kill));
        assert!(world.components.health.get_component(player).is_dead());
    }

    #[test]
    fn test_summon_stages_entities_in_front() {
        let (mut world, player) = setup();
        let command = Command::Summon {
            entity_type: EntityType::Cow,
            amount: 3,
        };
        assert!(execute_command(&mut world, player, &command));
        assert_eq!(world.staged_count(), 3);
        assert_eq!(world.census_count(EntityType::Cow), 3);

        let players = Command::Summon {
            entity_type: EntityType::Player,
            amount: 1,
        };
        assert!(!execute_command(&mut world, player, &players));
    }

    #[test]
    fn test_research_starts_once() {
        let (mut world, player) = setup();
        let command = Command::Research {
            tech: TechType::Herding,
        };
        assert!(execute_command(&mut world, player, &command));
        assert!(!execute_command(&mut world, player, &command));
    }

    #[test]
    fn test_inactive_player_is_rejected() {
        let (mut world, player) = setup();
        world.remove_entity(player);
        assert!(!execute_command(&mut world, player, &Command::Heal { amount: 5.0 }));
    }
}
