//! Static content table: what every entity type is made of.
//!
//! The component list fixes both which components are constructed when an
//! entity is created and the order their payloads appear on the wire.

use crate::content::components::{
    Health, Inventory, Item, Limbs, PlayerLink, Resource, TribeMember, Wander,
};
use crate::world::components::Components;
use crate::world::tribes::TribeId;
use crate::world::EntityId;
use shared::motion::{MotionParams, ANIMAL_MOTION, PLAYER_MOTION};
use shared::protocol::ItemStack;
use shared::{ComponentType, EntityType, Hitbox, ItemType, Point};

pub const COLLISION_PLAYER: u32 = 1;
pub const COLLISION_CREATURE: u32 = 1 << 1;
pub const COLLISION_OBSTACLE: u32 = 1 << 2;
pub const COLLISION_ITEM: u32 = 1 << 3;

const ITEM_MOTION: MotionParams = MotionParams {
    friction: 0.01,
    max_speed: 300.0,
    max_acceleration: 0.0,
};

#[derive(Debug)]
pub struct EntityTypeInfo {
    pub entity_type: EntityType,
    pub components: &'static [ComponentType],
    pub hitboxes: &'static [Hitbox],
    pub collision_bit: u32,
    pub collision_mask: u32,
    pub max_health: f32,
    /// `None` for entities that never move on their own.
    pub motion: Option<MotionParams>,
    /// Items dropped on death.
    pub drops: &'static [(ItemType, u32)],
    pub resource: Option<(ItemType, u32)>,
}

static ENTITY_TYPES: [EntityTypeInfo; 6] = [
    EntityTypeInfo {
        entity_type: EntityType::Player,
        components: &[
            ComponentType::Health,
            ComponentType::Inventory,
            ComponentType::PlayerLink,
            ComponentType::TribeMember,
            ComponentType::Limbs,
        ],
        hitboxes: &[Hitbox::circle(32.0, 1.0)],
        collision_bit: COLLISION_PLAYER,
        collision_mask: COLLISION_PLAYER | COLLISION_CREATURE | COLLISION_OBSTACLE,
        max_health: 20.0,
        motion: Some(PLAYER_MOTION),
        drops: &[],
        resource: None,
    },
    EntityTypeInfo {
        entity_type: EntityType::Cow,
        components: &[ComponentType::Health, ComponentType::Wander],
        hitboxes: &[Hitbox::circle(40.0, 3.0)],
        collision_bit: COLLISION_CREATURE,
        collision_mask: COLLISION_PLAYER | COLLISION_CREATURE | COLLISION_OBSTACLE,
        max_health: 10.0,
        motion: Some(ANIMAL_MOTION),
        drops: &[(ItemType::RawBeef, 2), (ItemType::Leather, 1)],
        resource: None,
    },
    EntityTypeInfo {
        entity_type: EntityType::Tree,
        components: &[ComponentType::Health, ComponentType::Resource],
        hitboxes: &[Hitbox::circle(48.0, 0.0)],
        collision_bit: COLLISION_OBSTACLE,
        collision_mask: COLLISION_PLAYER | COLLISION_CREATURE,
        max_health: 40.0,
        motion: None,
        drops: &[(ItemType::Wood, 3)],
        resource: Some((ItemType::Wood, 20)),
    },
    EntityTypeInfo {
        entity_type: EntityType::Boulder,
        components: &[ComponentType::Health, ComponentType::Resource],
        hitboxes: &[
            Hitbox::rectangle(96.0, 64.0, 0.0),
            Hitbox::circle(24.0, 0.0).with_offset(Point::new(0.0, -40.0)),
        ],
        collision_bit: COLLISION_OBSTACLE,
        collision_mask: COLLISION_PLAYER | COLLISION_CREATURE,
        max_health: 60.0,
        motion: None,
        drops: &[(ItemType::Rock, 3)],
        resource: Some((ItemType::Rock, 30)),
    },
    EntityTypeInfo {
        entity_type: EntityType::ItemEntity,
        components: &[ComponentType::Item],
        hitboxes: &[Hitbox::circle(16.0, 0.5)],
        collision_bit: COLLISION_ITEM,
        collision_mask: 0,
        max_health: 0.0,
        motion: Some(ITEM_MOTION),
        drops: &[],
        resource: None,
    },
    EntityTypeInfo {
        entity_type: EntityType::Totem,
        components: &[ComponentType::Health, ComponentType::TribeMember],
        hitboxes: &[Hitbox::rectangle(48.0, 48.0, 0.0)],
        collision_bit: COLLISION_OBSTACLE,
        collision_mask: COLLISION_PLAYER | COLLISION_CREATURE,
        max_health: 100.0,
        motion: None,
        drops: &[(ItemType::Wood, 5)],
        resource: None,
    },
];

pub fn entity_info(entity_type: EntityType) -> &'static EntityTypeInfo {
    &ENTITY_TYPES[entity_type.tag() as usize - 1]
}

/// Per-instance values some component constructors need.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpawnParams {
    pub session_id: Option<u32>,
    pub tribe_id: Option<TribeId>,
    pub item: Option<ItemStack>,
    pub velocity: Point,
}

impl SpawnParams {
    pub fn player(session_id: u32, tribe_id: TribeId) -> Self {
        Self {
            session_id: Some(session_id),
            tribe_id: Some(tribe_id),
            ..Default::default()
        }
    }

    pub fn item(item_type: ItemType, amount: u32, velocity: Point) -> Self {
        Self {
            item: Some(ItemStack { item_type, amount }),
            velocity,
            ..Default::default()
        }
    }
}

/// Stages every component the type declares.
///
/// # Panics
///
/// If a component needs a spawn parameter the caller did not supply.
pub fn construct_components(
    components: &mut Components,
    entity_id: EntityId,
    info: &EntityTypeInfo,
    params: &SpawnParams,
) {
    for component_type in info.components {
        match component_type {
            ComponentType::Health => components
                .health
                .add_component(entity_id, Health::new(info.max_health)),
            ComponentType::Inventory => components
                .inventory
                .add_component(entity_id, Inventory::new(Inventory::SLOT_COUNT)),
            ComponentType::PlayerLink => {
                let session_id = params.session_id.unwrap_or_else(|| {
                    panic!("{:?} needs a session id", info.entity_type)
                });
                components
                    .player_link
                    .add_component(entity_id, PlayerLink { session_id })
            }
            ComponentType::TribeMember => {
                let tribe_id = params
                    .tribe_id
                    .unwrap_or_else(|| panic!("{:?} needs a tribe id", info.entity_type));
                components
                    .tribe_member
                    .add_component(entity_id, TribeMember { tribe_id })
            }
            ComponentType::Limbs => components.limbs.add_component(entity_id, Limbs::default()),
            ComponentType::Wander => components.wander.add_component(entity_id, Wander::default()),
            ComponentType::Item => {
                let stack = params
                    .item
                    .unwrap_or_else(|| panic!("{:?} needs an item stack", info.entity_type));
                components.item.add_component(
                    entity_id,
                    Item {
                        item_type: stack.item_type,
                        amount: stack.amount,
                    },
                )
            }
            ComponentType::Resource => {
                let (item_type, remaining) = info
                    .resource
                    .unwrap_or_else(|| panic!("{:?} has no resource row", info.entity_type));
                components.resource.add_component(
                    entity_id,
                    Resource {
                        item_type,
                        remaining,
                        yield_per_hit: 1,
                    },
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_is_indexed_by_tag() {
        for entity_type in EntityType::ALL {
            assert_eq!(entity_info(entity_type).entity_type, entity_type);
        }
    }

    #[test]
    fn test_every_type_has_a_hitbox() {
        for entity_type in EntityType::ALL {
            assert!(!entity_info(entity_type).hitboxes.is_empty());
        }
    }

    #[test]
    fn test_health_types_have_positive_max_health() {
        for entity_type in EntityType::ALL {
            let info = entity_info(entity_type);
            if info.components.contains(&ComponentType::Health) {
                assert!(info.max_health > 0.0, "{:?}", entity_type);
            }
        }
    }
}
