//! Entities with an inventory absorb item entities they touch.

use crate::world::{EntityId, World};
use shared::geometry::{hitbox_overlap, PlacedHitbox};
use shared::EntityType;

fn touching(world: &World, a: EntityId, b: EntityId) -> bool {
    let (Some(a), Some(b)) = (world.entity(a), world.entity(b)) else {
        return false;
    };
    a.hitboxes.iter().any(|ha| {
        b.hitboxes.iter().any(|hb| {
            hitbox_overlap(
                PlacedHitbox::new(ha, a.position, a.rotation),
                PlacedHitbox::new(hb, b.position, b.rotation),
            )
            .is_some()
        })
    })
}

pub fn update(world: &mut World) {
    for collector_id in world.components.inventory.entity_ids() {
        let Some(range) = world
            .entity(collector_id)
            .filter(|entity| entity.is_active())
            .and_then(|entity| entity.chunk_range())
        else {
            continue;
        };

        for item_id in world.board.entities_in_range(range) {
            let is_item = world
                .entity(item_id)
                .is_some_and(|entity| entity.is_active() && entity.entity_type == EntityType::ItemEntity);
            if !is_item || !touching(world, collector_id, item_id) {
                continue;
            }

            let item = *world.components.item.get_component(item_id);
            let leftover = world
                .components
                .inventory
                .get_component_mut(collector_id)
                .add_item(item.item_type, item.amount);
            if leftover == 0 {
                world.remove_entity(item_id);
            } else {
                world.components.item.get_component_mut(item_id).amount = leftover;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::content::components::Inventory;
    use crate::content::entity_types::SpawnParams;
    use shared::{ItemType, Point};

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
    fn test_player_picks_up_touching_item_once() {
        let mut world = world();
        let tribe = world.tribes.create_tribe();
        let player = world.create_entity(EntityType::Player, Point::new(250.0, 250.0), 0.0, SpawnParams::player(1, tribe));
        let near = world.create_entity(
            EntityType::ItemEntity,
            Point::new(270.0, 250.0),
            0.0,
            SpawnParams::item(ItemType::Wood, 4, Point::ZERO),
        );
        let far = world.create_entity(
            EntityType::ItemEntity,
            Point::new(600.0, 600.0),
            0.0,
            SpawnParams::item(ItemType::Wood, 4, Point::ZERO),
        );
        world.push_join_buffer();

        update(&mut world);
        update(&mut world);
        assert_eq!(world.components.inventory.get_component(player).count(ItemType::Wood), 4);
        assert!(!world.is_active(near));
        assert!(world.is_active(far));
    }

    #[test]
    fn test_full_inventory_leaves_remainder() {
        let mut world = world();
        let tribe = world.tribes.create_tribe();
        let player = world.create_entity(EntityType::Player, Point::new(250.0, 250.0), 0.0, SpawnParams::player(1, tribe));
        let item = world.create_entity(
            EntityType::ItemEntity,
            Point::new(250.0, 250.0),
            0.0,
            SpawnParams::item(ItemType::Rock, 150, Point::ZERO),
        );
        world.push_join_buffer();
        *world.components.inventory.get_component_mut(player) = Inventory::new(1);

        update(&mut world);
        assert_eq!(world.components.inventory.get_component(player).count(ItemType::Rock), 99);
        assert_eq!(world.components.item.get_component(item).amount, 51);
        assert!(world.is_active(item));
    }
}
