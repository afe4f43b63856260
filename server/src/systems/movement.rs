//! Velocity integration for every active entity with motion parameters.

use crate::content::entity_types::entity_info;
use crate::world::World;
use shared::motion::{clamp_to_world, integrate};
use shared::Point;

pub fn update(world: &mut World) {
    let dt = world.config().tick_dt();
    let width = world.config().world_width();
    let height = world.config().world_height();

    for entity_id in world.active_entity_ids() {
        let Some(entity) = world.entity(entity_id) else {
            continue;
        };
        let Some(params) = entity_info(entity.entity_type).motion else {
            continue;
        };
        let flow = world
            .tiles
            .tile_at(entity.position)
            .map_or(Point::ZERO, |tile| tile.flow);

        let Some(entity) = world.entity_mut(entity_id) else {
            continue;
        };
        let acceleration = entity.acceleration;
        integrate(
            &mut entity.position,
            &mut entity.velocity,
            acceleration,
            &params,
            dt,
        );
        entity.position += flow * dt;
        entity.position = clamp_to_world(entity.position, width, height);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::content::entity_types::SpawnParams;
    use shared::EntityType;

    fn world() -> World {
        World::new(WorldConfig {
            chunk_size: 100.0,
            width_chunks: 10,
            height_chunks: 10,
            spawning_enabled: false,
            ..Default::default()
        })
    }

    #[test]
    fn test_static_entities_do_not_move() {
        let mut world = world();
        let tree = world.create_entity(EntityType::Tree, Point::new(500.0, 500.0), 0.0, SpawnParams::default());
        world.push_join_buffer();
        world.entity_mut(tree).unwrap().acceleration = Point::new(1000.0, 0.0);
        update(&mut world);
        assert_eq!(world.entity(tree).unwrap().position, Point::new(500.0, 500.0));
    }

    #[test]
    fn test_positions_stay_inside_world() {
        let mut world = world();
        let cow = world.create_entity(EntityType::Cow, Point::new(5.0, 5.0), 0.0, SpawnParams::default());
        world.push_join_buffer();
        {
            let entity = world.entity_mut(cow).unwrap();
            entity.velocity = Point::new(-150.0, -150.0);
        }
        for _ in 0..10 {
            update(&mut world);
        }
        let position = world.entity(cow).unwrap().position;
        assert!(position.x >= 0.0 && position.y >= 0.0);
    }

    #[test]
    fn test_staged_entities_are_skipped() {
        let mut world = world();
        let cow = world.create_entity(
            EntityType::Cow,
            Point::new(300.0, 300.0),
            0.0,
            SpawnParams {
                velocity: Point::new(100.0, 0.0),
                ..Default::default()
            },
        );
        update(&mut world);
        assert_eq!(world.entity(cow).unwrap().position, Point::new(300.0, 300.0));
    }
}
