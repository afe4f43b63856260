//! Probabilistic natural spawning, capped by the tile census.

use crate::content::entity_types::SpawnParams;
use crate::world::{EntityId, World};
use rand::Rng;
use shared::{EntityType, TileType};
use std::f32::consts::TAU;

struct SpawnRule {
    entity_type: EntityType,
    tile_type: TileType,
    /// One entity allowed per this many matching tiles.
    tiles_per_entity: u32,
    chance: f64,
}

const SPAWN_RULES: [SpawnRule; 3] = [
    SpawnRule {
        entity_type: EntityType::Cow,
        tile_type: TileType::Grass,
        tiles_per_entity: 60,
        chance: 0.05,
    },
    SpawnRule {
        entity_type: EntityType::Tree,
        tile_type: TileType::Grass,
        tiles_per_entity: 30,
        chance: 0.1,
    },
    SpawnRule {
        entity_type: EntityType::Boulder,
        tile_type: TileType::Rock,
        tiles_per_entity: 40,
        chance: 0.05,
    },
];

/// Population cap for `entity_type`, or 0 if it never spawns naturally.
pub fn spawn_cap(world: &World, entity_type: EntityType) -> u32 {
    SPAWN_RULES
        .iter()
        .find(|rule| rule.entity_type == entity_type)
        .map_or(0, |rule| {
            (world.tiles.count_of_type(rule.tile_type) / rule.tiles_per_entity)
                .min(world.config().max_spawned_per_type)
        })
}

/// Attempts at most one spawn per rule. Returns the staged ids.
pub fn run_spawn_pass(world: &mut World) -> Vec<EntityId> {
    let mut spawned = Vec::new();
    if !world.config().spawning_enabled {
        return spawned;
    }
    for rule in &SPAWN_RULES {
        if world.census_count(rule.entity_type) >= spawn_cap(world, rule.entity_type) {
            continue;
        }
        if !world.rng_mut().gen_bool(rule.chance) {
            continue;
        }
        let Some(position) = world.random_position_on_tile(rule.tile_type) else {
            continue;
        };
        let rotation = world.rng_mut().gen_range(0.0..TAU);
        spawned.push(world.create_entity(rule.entity_type, position, rotation, SpawnParams::default()));
    }
    spawned
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;

    fn world(spawning_enabled: bool) -> World {
        World::new(WorldConfig {
            chunk_size: 256.0,
            width_chunks: 8,
            height_chunks: 8,
            seed: 42,
            spawning_enabled,
            ..Default::default()
        })
    }

    #[test]
    fn test_disabled_spawning_stages_nothing() {
        let mut world = world(false);
        for _ in 0..100 {
            assert!(run_spawn_pass(&mut world).is_empty());
        }
        assert_eq!(world.staged_count(), 0);
    }

    #[test]
    fn test_census_never_exceeds_cap() {
        let mut world = world(true);
        for _ in 0..5_000 {
            run_spawn_pass(&mut world);
            world.push_join_buffer();
        }
        for rule in &SPAWN_RULES {
            assert!(world.census_count(rule.entity_type) <= spawn_cap(&world, rule.entity_type));
        }
    }

    #[test]
    fn test_spawns_land_on_matching_tiles() {
        let mut world = world(true);
        for _ in 0..500 {
            for id in run_spawn_pass(&mut world) {
                let entity = world.entity(id).unwrap();
                let rule = SPAWN_RULES
                    .iter()
                    .find(|rule| rule.entity_type == entity.entity_type)
                    .unwrap();
                assert_eq!(world.tiles.tile_at(entity.position).unwrap().tile_type, rule.tile_type);
            }
        }
    }

    #[test]
    fn test_players_are_never_spawned() {
        let world = world(true);
        assert_eq!(spawn_cap(&world, EntityType::Player), 0);
    }
}
