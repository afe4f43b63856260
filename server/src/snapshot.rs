//! Packet assembly: turns world state into the per-session snapshot and the
//! on-demand sync packets.

use crate::content::entity_types::entity_info;
use crate::session::Session;
use crate::world::{Entity, EntityId, World};
use shared::protocol::{
    DebugData, DebugSubscriptions, FullResyncPacket, InventoryState, SyncDataPacket,
    TickStatsData,
};
use log::debug;
use shared::codec::TAG_SIZE;
use shared::{ChunkRect, EntityRecord, GameDataPacket, Point, MAX_DATAGRAM_SIZE};

/// Entities overlapping any chunk of `view`, each exactly once.
pub fn visible_entities(world: &World, view: ChunkRect) -> Vec<EntityId> {
    world.board.entities_in_range(view)
}

/// Full record of one entity. Component payloads follow the order the
/// entity type declares; components without a serializer are skipped.
pub fn build_entity_record(world: &World, entity: &Entity) -> EntityRecord {
    let components = entity_info(entity.entity_type)
        .components
        .iter()
        .filter_map(|&component_type| world.components.store(component_type).serialize(entity.id))
        .collect();
    EntityRecord {
        id: entity.id,
        entity_type: entity.entity_type,
        position: entity.position,
        velocity: entity.velocity,
        rotation: entity.rotation,
        hitboxes: entity.hitboxes.clone(),
        age_ticks: entity.age_ticks,
        collision_bit: entity.collision_bit,
        collision_mask: entity.collision_mask,
        components,
    }
}

fn inventory_state(world: &World, entity_id: EntityId) -> Option<InventoryState> {
    if world.components.inventory.has_component(entity_id) {
        Some(world.components.inventory.get_component(entity_id).to_state())
    } else {
        None
    }
}

/// Where a session's snapshot is centred: its player, or the middle of its
/// view when it has none.
fn view_focus(world: &World, session: &Session, view: ChunkRect) -> Point {
    if let Some(entity) = session.player_entity.and_then(|id| world.entity(id)) {
        return entity.position;
    }
    let chunk_size = world.config().chunk_size;
    Point::new(
        (view.min_x + view.max_x + 1) as f32 * chunk_size / 2.0,
        (view.min_y + view.max_y + 1) as f32 * chunk_size / 2.0,
    )
}

/// Records for the visible entities, nearest to `focus` first, stopping
/// before the encoded records would exceed `budget` bytes.
fn nearest_records(world: &World, visible: Vec<EntityId>, focus: Point, budget: usize) -> Vec<EntityRecord> {
    let mut entities: Vec<&Entity> = visible.into_iter().filter_map(|id| world.entity(id)).collect();
    entities.sort_by(|a, b| {
        a.position
            .distance_to(&focus)
            .total_cmp(&b.position.distance_to(&focus))
    });

    let mut used = 0;
    let mut records = Vec::with_capacity(entities.len());
    for entity in entities {
        let record = build_entity_record(world, entity);
        used += record.encoded_len();
        if used > budget {
            break;
        }
        records.push(record);
    }
    records
}

/// The snapshot for one session: everything in its extended view, its own
/// inventory, and the events queued for it this tick. When the view holds
/// more than one datagram can carry, the entities nearest the player are
/// kept.
pub fn build_game_data(world: &World, session: &Session, tick_stats: TickStatsData) -> GameDataPacket {
    let view = session.extended_view(world.board.width(), world.board.height());

    let player_entity_id = session
        .player_entity
        .filter(|&entity_id| world.entity(entity_id).is_some());

    let subscriptions = session.debug_subscriptions;
    let debug = DebugData {
        tick_stats: subscriptions
            .contains(DebugSubscriptions::TICK_STATS)
            .then_some(tick_stats),
        visible_chunks: subscriptions
            .contains(DebugSubscriptions::VISIBLE_CHUNKS)
            .then_some(view),
    };

    let mut data = GameDataPacket {
        tick: world.tick(),
        world_time: world.world_time(),
        last_processed_input: session.last_processed_input,
        player_entity_id,
        entities: Vec::new(),
        inventory: player_entity_id.and_then(|entity_id| inventory_state(world, entity_id)),
        hits: session.hits.clone(),
        heals: session.heals.clone(),
        deaths: session.deaths.clone(),
        completions: session.completions.clone(),
        tile_updates: session.tile_updates.clone(),
        debug,
    };

    let budget = MAX_DATAGRAM_SIZE.saturating_sub(TAG_SIZE + data.encoded_len());
    let visible = visible_entities(world, view);
    let visible_count = visible.len();
    data.entities = nearest_records(world, visible, view_focus(world, session, view), budget);
    if data.entities.len() < visible_count {
        debug!(
            "Session {} snapshot trimmed to {} of {} visible entities",
            session.id,
            data.entities.len(),
            visible_count
        );
    }
    data
}

fn health_of(world: &World, entity_id: EntityId) -> (f32, f32) {
    if world.components.health.has_component(entity_id) {
        let health = world.components.health.get_component(entity_id);
        (health.health, health.max_health)
    } else {
        (0.0, 0.0)
    }
}

pub fn build_sync_data(world: &World, entity_id: EntityId) -> Option<SyncDataPacket> {
    let entity = world.entity(entity_id)?;
    Some(SyncDataPacket {
        position: entity.position,
        velocity: entity.velocity,
        health: health_of(world, entity_id).0,
    })
}

pub fn build_full_resync(world: &World, entity_id: EntityId) -> Option<FullResyncPacket> {
    let entity = world.entity(entity_id)?;
    let (health, max_health) = health_of(world, entity_id);
    Some(FullResyncPacket {
        tick: world.tick(),
        position: entity.position,
        velocity: entity.velocity,
        rotation: entity.rotation,
        health,
        max_health,
        inventory: inventory_state(world, entity_id).unwrap_or_default(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WorldConfig;
    use crate::content::entity_types::SpawnParams;
    use shared::{ComponentType, EntityType, Hitbox, ServerPacket};

    fn world() -> World {
        World::new(WorldConfig {
            chunk_size: 100.0,
            width_chunks: 10,
            height_chunks: 10,
            spawning_enabled: false,
            ..Default::default()
        })
    }

    fn session(view: ChunkRect) -> Session {
        let mut session = Session::new(1, "127.0.0.1:9000".parse().unwrap());
        session.visible_chunks = view;
        session
    }

    fn stats() -> TickStatsData {
        TickStatsData {
            tick_duration_ms: 1.0,
            active_entities: 0,
            sessions: 1,
        }
    }

    #[test]
    fn test_entity_spanning_chunks_appears_once() {
        let mut world = world();
        let wide = world.create_entity(EntityType::Cow, Point::new(200.0, 200.0), 0.0, SpawnParams::default());
        world.entity_mut(wide).unwrap().hitboxes = vec![Hitbox::rectangle(150.0, 150.0, 0.0)];
        world.push_join_buffer();
        assert_eq!(world.board.chunks_containing(wide).len(), 4);

        let data = build_game_data(&world, &session(ChunkRect::new(1, 1, 2, 2)), stats());
        assert_eq!(data.entities.len(), 1);
        assert_eq!(data.entities[0].id, wide);
    }

    #[test]
    fn test_view_is_extended_by_one_chunk() {
        let mut world = world();
        let cow = world.create_entity(EntityType::Cow, Point::new(450.0, 450.0), 0.0, SpawnParams::default());
        world.push_join_buffer();

        let near = build_game_data(&world, &session(ChunkRect::single(3, 3)), stats());
        assert_eq!(near.entities.iter().map(|e| e.id).collect::<Vec<_>>(), vec![cow]);
        let far = build_game_data(&world, &session(ChunkRect::single(1, 1)), stats());
        assert!(far.entities.is_empty());
    }

    #[test]
    fn test_components_follow_declared_order() {
        let mut world = world();
        let tribe = world.tribes.create_tribe();
        let player = world.create_entity(EntityType::Player, Point::new(50.0, 50.0), 0.0, SpawnParams::player(7, tribe));
        world.push_join_buffer();

        let record = build_entity_record(&world, world.entity(player).unwrap());
        let order: Vec<ComponentType> = record.components.iter().map(|c| c.component_type()).collect();
        assert_eq!(
            order,
            vec![
                ComponentType::Health,
                ComponentType::PlayerLink,
                ComponentType::TribeMember,
                ComponentType::Limbs
            ]
        );
    }

    #[test]
    fn test_debug_sections_follow_subscriptions() {
        let world = world();
        let mut session = session(ChunkRect::single(0, 0));
        let data = build_game_data(&world, &session, stats());
        assert_eq!(data.debug, DebugData::default());

        session.debug_subscriptions = DebugSubscriptions(DebugSubscriptions::VISIBLE_CHUNKS);
        let data = build_game_data(&world, &session, stats());
        assert_eq!(data.debug.visible_chunks, Some(ChunkRect::new(0, 0, 1, 1)));
        assert!(data.debug.tick_stats.is_none());
    }

    #[test]
    fn test_dense_view_is_trimmed_to_one_datagram() {
        let mut world = World::new(WorldConfig {
            spawning_enabled: false,
            ..Default::default()
        });
        let mut trees = Vec::new();
        for i in 0..1500u32 {
            let position = Point::new((i * 97 % 6000) as f32 + 40.0, (i * 61 % 6000) as f32 + 40.0);
            trees.push(world.create_entity(EntityType::Tree, position, 0.0, SpawnParams::default()));
        }
        let tribe = world.tribes.create_tribe();
        let player = world.create_entity(EntityType::Player, Point::new(3000.0, 3000.0), 0.0, SpawnParams::player(1, tribe));
        world.push_join_buffer();

        let mut session = session(ChunkRect::new(0, 0, 63, 63));
        session.player_entity = Some(player);
        let data = build_game_data(&world, &session, stats());

        assert!(data.entities.len() < trees.len());
        assert!(data.entities.iter().any(|e| e.id == player));
        assert!(ServerPacket::GameData(data).encode().unwrap().len() <= MAX_DATAGRAM_SIZE);
    }

    #[test]
    fn test_full_resync_carries_inventory() {
        let mut world = world();
        let tribe = world.tribes.create_tribe();
        let player = world.create_entity(EntityType::Player, Point::new(50.0, 50.0), 0.0, SpawnParams::player(7, tribe));
        world.push_join_buffer();
        world
            .components
            .inventory
            .get_component_mut(player)
            .add_item(shared::ItemType::Leather, 3);

        let resync = build_full_resync(&world, player).unwrap();
        assert_eq!(resync.health, 20.0);
        assert_eq!(resync.inventory.slots.len(), 10);
        assert!(build_full_resync(&world, 999).is_none());
    }
}
