//! Client-side world view with prediction and reconciliation.
//!
//! The confirmed view is exactly the last snapshot. The client's own entity
//! is additionally predicted: every input is applied locally as soon as it
//! is sampled, and when a snapshot arrives the inputs the server has not yet
//! processed are replayed on top of the confirmed state.

use log::{debug, info, warn};
use shared::motion::{clamp_to_world, integrate, PLAYER_MOTION};
use shared::protocol::{
    DeathEvent, DebugSubscriptions, FullResyncPacket, HealEvent, HitEvent, InitialPlayerData,
    InventoryState, ResearchCompleteEvent, SyncDataPacket, TileUpdate,
};
use shared::{
    ChunkRect, ClientPacket, ComponentMask, ComponentType, EntityRecord, GameDataPacket,
    InputPacket, LimbAction, Point, ServerPacket, PROTOCOL_VERSION, TICK_DT,
};
use std::collections::{BTreeMap, VecDeque};

/// Predicted and confirmed positions further apart than this trigger a
/// rollback to the replayed state.
pub const ROLLBACK_THRESHOLD: f32 = 5.0;
/// Snapshots in a row without our own entity before the client asks to
/// respawn and resync.
pub const MISSING_PLAYER_SNAPSHOTS: u32 = 20;
pub const EVENT_HISTORY: usize = 64;
pub const MAX_INPUT_HISTORY: usize = 256;

/// Components the client reads from entity records. The rest are skipped
/// without decoding.
pub fn component_mask() -> ComponentMask {
    ComponentMask::NONE
        .with(ComponentType::Health)
        .with(ComponentType::Limbs)
        .with(ComponentType::Item)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictedState {
    pub position: Point,
    pub velocity: Point,
    pub rotation: f32,
}

impl PredictedState {
    fn from_record(record: &EntityRecord) -> Self {
        Self {
            position: record.position,
            velocity: record.velocity,
            rotation: record.rotation,
        }
    }
}

/// What the player wants to do this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InputIntent {
    pub acceleration: Point,
    pub rotation: f32,
    pub selected_slot: u32,
    pub main_action: LimbAction,
    pub offhand_action: LimbAction,
}

impl Default for InputIntent {
    fn default() -> Self {
        Self {
            acceleration: Point::ZERO,
            rotation: 0.0,
            selected_slot: 0,
            main_action: LimbAction::None,
            offhand_action: LimbAction::None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ClientEvent {
    Hit(HitEvent),
    Heal(HealEvent),
    Death(DeathEvent),
    ResearchComplete(ResearchCompleteEvent),
    TileUpdate(TileUpdate),
}

pub struct ClientWorld {
    pub session_id: Option<u32>,
    pub player_entity_id: Option<u32>,
    pub tick: u32,
    pub world_time: f32,
    pub confirmed: BTreeMap<u32, EntityRecord>,
    pub predicted: Option<PredictedState>,
    pub input_history: VecDeque<InputPacket>,
    pub inventory: Option<InventoryState>,
    pub events: VecDeque<ClientEvent>,
    pub debug_subscriptions: DebugSubscriptions,
    /// Visible area around the predicted position, in world units.
    pub view_size: Point,
    pub rollbacks: u32,
    next_sequence: u32,
    chunk_size: f32,
    world_size: Point,
    world_chunks: (u32, u32),
    snapshots_without_player: u32,
    resync_after_activation: bool,
}

impl ClientWorld {
    pub fn new(view_size: Point) -> Self {
        Self {
            session_id: None,
            player_entity_id: None,
            tick: 0,
            world_time: 0.0,
            confirmed: BTreeMap::new(),
            predicted: None,
            input_history: VecDeque::new(),
            inventory: None,
            events: VecDeque::new(),
            debug_subscriptions: DebugSubscriptions::default(),
            view_size,
            rollbacks: 0,
            next_sequence: 1,
            chunk_size: shared::CHUNK_SIZE,
            world_size: Point::new(f32::MAX, f32::MAX),
            world_chunks: (shared::WORLD_SIZE_CHUNKS, shared::WORLD_SIZE_CHUNKS),
            snapshots_without_player: 0,
            resync_after_activation: false,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.session_id.is_some()
    }

    /// Marks the client as paused; the next activation asks for a full
    /// resync.
    pub fn deactivate(&mut self) -> ClientPacket {
        self.resync_after_activation = true;
        ClientPacket::Deactivate
    }

    /// Applies one server packet and returns the packets to send in reply.
    pub fn handle_server_packet(&mut self, packet: ServerPacket) -> Vec<ClientPacket> {
        match packet {
            ServerPacket::InitialPlayerData(data) => self.apply_initial_data(data),
            ServerPacket::GameData(data) => self.apply_game_data(data),
            ServerPacket::SyncData(sync) => {
                self.apply_sync(sync);
                Vec::new()
            }
            ServerPacket::FullResync(resync) => {
                self.apply_full_resync(resync);
                Vec::new()
            }
            ServerPacket::Disconnected { reason } => {
                warn!("Disconnected: {}", reason);
                self.session_id = None;
                self.player_entity_id = None;
                self.predicted = None;
                Vec::new()
            }
        }
    }

    fn apply_initial_data(&mut self, data: InitialPlayerData) -> Vec<ClientPacket> {
        info!(
            "Joined as session {} controlling entity {}",
            data.session_id, data.entity_id
        );
        self.session_id = Some(data.session_id);
        if self.player_entity_id != Some(data.entity_id) {
            self.predicted = None;
            self.input_history.clear();
        }
        self.player_entity_id = Some(data.entity_id);
        self.tick = data.tick;
        self.chunk_size = data.chunk_size;
        self.world_chunks = (data.world_width_chunks, data.world_height_chunks);
        self.world_size = Point::new(
            data.chunk_size * data.world_width_chunks as f32,
            data.chunk_size * data.world_height_chunks as f32,
        );
        self.snapshots_without_player = 0;

        if std::mem::take(&mut self.resync_after_activation) {
            vec![ClientPacket::FullResyncRequest]
        } else {
            Vec::new()
        }
    }

    fn apply_game_data(&mut self, data: GameDataPacket) -> Vec<ClientPacket> {
        self.tick = data.tick;
        self.world_time = data.world_time;
        self.confirmed = data
            .entities
            .into_iter()
            .map(|record| (record.id, record))
            .collect();
        if data.inventory.is_some() {
            self.inventory = data.inventory;
        }
        self.record_events(&data.hits, ClientEvent::Hit);
        self.record_events(&data.heals, ClientEvent::Heal);
        self.record_events(&data.deaths, ClientEvent::Death);
        self.record_events(&data.completions, ClientEvent::ResearchComplete);
        self.record_events(&data.tile_updates, ClientEvent::TileUpdate);

        let own_record = data
            .player_entity_id
            .and_then(|entity_id| self.confirmed.get(&entity_id))
            .cloned();
        match own_record {
            Some(record) => {
                self.snapshots_without_player = 0;
                self.player_entity_id = Some(record.id);
                self.reconcile(&record, data.last_processed_input);
                Vec::new()
            }
            None => self.note_missing_player(),
        }
    }

    fn note_missing_player(&mut self) -> Vec<ClientPacket> {
        self.snapshots_without_player += 1;
        if self.snapshots_without_player < MISSING_PLAYER_SNAPSHOTS {
            return Vec::new();
        }
        info!(
            "No own entity for {} snapshots, asking to respawn",
            self.snapshots_without_player
        );
        self.snapshots_without_player = 0;
        self.player_entity_id = None;
        self.predicted = None;
        self.input_history.clear();
        self.resync_after_activation = true;
        vec![ClientPacket::Activate {
            client_version: PROTOCOL_VERSION,
        }]
    }

    fn record_events<T: Copy>(&mut self, events: &[T], wrap: fn(T) -> ClientEvent) {
        for &event in events {
            if self.events.len() == EVENT_HISTORY {
                self.events.pop_front();
            }
            self.events.push_back(wrap(event));
        }
    }

    /// Replays unacknowledged inputs from the confirmed record and rolls
    /// back if the prediction strayed too far.
    fn reconcile(&mut self, record: &EntityRecord, last_processed_input: u32) {
        while self
            .input_history
            .front()
            .is_some_and(|input| input.sequence <= last_processed_input)
        {
            self.input_history.pop_front();
        }

        let mut replayed = PredictedState::from_record(record);
        for input in &self.input_history {
            step(&mut replayed, input.acceleration, self.world_size);
            replayed.rotation = input.rotation;
        }

        match self.predicted {
            Some(predicted) => {
                let distance = predicted.position.distance_to(&replayed.position);
                if distance > ROLLBACK_THRESHOLD {
                    debug!("Rollback needed! Distance: {:.2}", distance);
                    self.rollbacks += 1;
                    self.predicted = Some(replayed);
                }
            }
            None => self.predicted = Some(replayed),
        }
    }

    fn apply_sync(&mut self, sync: SyncDataPacket) {
        if let Some(predicted) = self.predicted.as_mut() {
            predicted.position = sync.position;
            predicted.velocity = sync.velocity;
        }
        self.input_history.clear();
    }

    fn apply_full_resync(&mut self, resync: FullResyncPacket) {
        debug!("Full resync at tick {}", resync.tick);
        self.tick = resync.tick;
        self.predicted = Some(PredictedState {
            position: resync.position,
            velocity: resync.velocity,
            rotation: resync.rotation,
        });
        self.inventory = Some(resync.inventory);
        self.input_history.clear();
    }

    /// Chunk rectangle covering the view around the predicted position.
    pub fn visible_chunks(&self) -> ChunkRect {
        let Some(predicted) = self.predicted else {
            return ChunkRect::single(0, 0);
        };
        let half = self.view_size * 0.5;
        let to_chunk = |value: f32| (value / self.chunk_size).floor() as i32;
        ChunkRect::new(
            to_chunk(predicted.position.x - half.x),
            to_chunk(predicted.position.y - half.y),
            to_chunk(predicted.position.x + half.x),
            to_chunk(predicted.position.y + half.y),
        )
        .clamp(self.world_chunks.0, self.world_chunks.1)
    }

    /// Samples an input from `intent`, applies it to the prediction and
    /// returns the packet to send. `None` until the own entity is known.
    pub fn predict(&mut self, intent: InputIntent) -> Option<InputPacket> {
        let before = self.predicted?;
        let input = InputPacket {
            sequence: self.next_sequence,
            position: before.position,
            velocity: before.velocity,
            acceleration: intent.acceleration,
            rotation: intent.rotation,
            selected_slot: intent.selected_slot,
            main_action: intent.main_action,
            offhand_action: intent.offhand_action,
            interacting_entity_id: 0,
            debug_subscriptions: self.debug_subscriptions,
            visible_chunks: self.visible_chunks(),
        };
        self.next_sequence += 1;

        let mut after = before;
        step(&mut after, intent.acceleration, self.world_size);
        after.rotation = intent.rotation;
        self.predicted = Some(after);

        if self.input_history.len() == MAX_INPUT_HISTORY {
            self.input_history.pop_front();
        }
        self.input_history.push_back(input.clone());
        Some(input)
    }

    /// Health of an entity as last confirmed.
    pub fn health_of(&self, entity_id: u32) -> Option<f32> {
        self.confirmed.get(&entity_id)?.components.iter().find_map(|component| match component {
            shared::ComponentPayload::Health(health) => Some(health.health),
            _ => None,
        })
    }
}

fn step(state: &mut PredictedState, acceleration: Point, world_size: Point) {
    integrate(
        &mut state.position,
        &mut state.velocity,
        acceleration,
        &PLAYER_MOTION,
        TICK_DT,
    );
    state.position = clamp_to_world(state.position, world_size.x, world_size.y);
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use shared::payload::HealthPayload;
    use shared::{ComponentPayload, EntityType, Hitbox};

    fn record(id: u32, position: Point, velocity: Point) -> EntityRecord {
        EntityRecord {
            id,
            entity_type: EntityType::Player,
            position,
            velocity,
            rotation: 0.0,
            hitboxes: vec![Hitbox::circle(32.0, 1.0)],
            age_ticks: 0,
            collision_bit: 1,
            collision_mask: 0,
            components: vec![ComponentPayload::Health(HealthPayload {
                health: 15.0,
                max_health: 20.0,
            })],
        }
    }

    fn joined() -> ClientWorld {
        let mut world = ClientWorld::new(Point::new(800.0, 600.0));
        world.handle_server_packet(ServerPacket::InitialPlayerData(InitialPlayerData {
            session_id: 1,
            entity_id: 5,
            tick: 0,
            chunk_size: 256.0,
            world_width_chunks: 16,
            world_height_chunks: 16,
        }));
        world
    }

    fn snapshot(entities: Vec<EntityRecord>, player: Option<u32>, last_processed_input: u32) -> ServerPacket {
        ServerPacket::GameData(GameDataPacket {
            tick: 1,
            last_processed_input,
            player_entity_id: player,
            entities,
            ..Default::default()
        })
    }

    fn push_right() -> InputIntent {
        InputIntent {
            acceleration: Point::new(1600.0, 0.0),
            ..Default::default()
        }
    }

    #[test]
    fn test_first_snapshot_seeds_prediction() {
        let mut world = joined();
        assert!(world.predict(push_right()).is_none());

        world.handle_server_packet(snapshot(vec![record(5, Point::new(100.0, 100.0), Point::ZERO)], Some(5), 0));
        assert_eq!(world.predicted.unwrap().position, Point::new(100.0, 100.0));
        assert_eq!(world.health_of(5), Some(15.0));
    }

    #[test]
    fn test_input_reports_state_before_acceleration() {
        let mut world = joined();
        world.handle_server_packet(snapshot(vec![record(5, Point::new(100.0, 100.0), Point::ZERO)], Some(5), 0));

        let input = world.predict(push_right()).unwrap();
        assert_eq!(input.sequence, 1);
        assert_eq!(input.position, Point::new(100.0, 100.0));
        assert!(world.predicted.unwrap().position.x > 100.0);
        assert_eq!(input.visible_chunks, ChunkRect::new(0, 0, 1, 1));
    }

    #[test]
    fn test_matching_snapshot_does_not_roll_back() {
        let mut world = joined();
        world.handle_server_packet(snapshot(vec![record(5, Point::new(500.0, 500.0), Point::ZERO)], Some(5), 0));
        world.predict(push_right());
        world.predict(push_right());
        let predicted = world.predicted.unwrap();

        // Server has applied input 1 only.
        let mut confirmed = PredictedState::from_record(&record(5, Point::new(500.0, 500.0), Point::ZERO));
        step(&mut confirmed, Point::new(1600.0, 0.0), Point::new(4096.0, 4096.0));
        world.handle_server_packet(snapshot(
            vec![record(5, confirmed.position, confirmed.velocity)],
            Some(5),
            1,
        ));

        assert_eq!(world.rollbacks, 0);
        assert_eq!(world.input_history.len(), 1);
        assert_approx_eq!(world.predicted.unwrap().position.x, predicted.position.x, 1e-3);
    }

    #[test]
    fn test_diverged_prediction_rolls_back_and_replays() {
        let mut world = joined();
        world.handle_server_packet(snapshot(vec![record(5, Point::new(500.0, 500.0), Point::ZERO)], Some(5), 0));
        world.predict(push_right());
        world.predict(push_right());

        // The server pushed us 100 units up while applying input 1.
        world.handle_server_packet(snapshot(vec![record(5, Point::new(500.0, 400.0), Point::ZERO)], Some(5), 1));
        assert_eq!(world.rollbacks, 1);
        let predicted = world.predicted.unwrap();
        assert_approx_eq!(predicted.position.y, 400.0, 1e-3);
        assert!(predicted.position.x > 500.0);
    }

    #[test]
    fn test_missing_player_triggers_respawn_then_resync() {
        let mut world = joined();
        let mut replies = Vec::new();
        for _ in 0..MISSING_PLAYER_SNAPSHOTS {
            replies = world.handle_server_packet(snapshot(Vec::new(), None, 0));
        }
        assert_eq!(
            replies,
            vec![ClientPacket::Activate {
                client_version: PROTOCOL_VERSION
            }]
        );

        let replies = world.handle_server_packet(ServerPacket::InitialPlayerData(InitialPlayerData {
            session_id: 1,
            entity_id: 9,
            tick: 40,
            chunk_size: 256.0,
            world_width_chunks: 16,
            world_height_chunks: 16,
        }));
        assert_eq!(replies, vec![ClientPacket::FullResyncRequest]);
        assert_eq!(world.player_entity_id, Some(9));
    }

    #[test]
    fn test_event_history_is_bounded() {
        let mut world = joined();
        let hits: Vec<HitEvent> = (0..100)
            .map(|i| HitEvent {
                entity_id: i,
                position: Point::ZERO,
                damage: 1.0,
            })
            .collect();
        world.handle_server_packet(ServerPacket::GameData(GameDataPacket {
            hits,
            ..Default::default()
        }));
        assert_eq!(world.events.len(), EVENT_HISTORY);
        assert_eq!(
            world.events.back(),
            Some(&ClientEvent::Hit(HitEvent {
                entity_id: 99,
                position: Point::ZERO,
                damage: 1.0
            }))
        );
    }

    #[test]
    fn test_full_resync_replaces_prediction() {
        let mut world = joined();
        world.handle_server_packet(snapshot(vec![record(5, Point::new(500.0, 500.0), Point::ZERO)], Some(5), 0));
        world.predict(push_right());

        world.handle_server_packet(ServerPacket::FullResync(FullResyncPacket {
            tick: 10,
            position: Point::new(10.0, 20.0),
            velocity: Point::ZERO,
            rotation: 1.0,
            health: 20.0,
            max_health: 20.0,
            inventory: InventoryState::default(),
        }));
        assert_eq!(world.predicted.unwrap().position, Point::new(10.0, 20.0));
        assert!(world.input_history.is_empty());
        assert_eq!(world.inventory, Some(InventoryState::default()));
    }

    #[test]
    fn test_disconnected_clears_session() {
        let mut world = joined();
        world.handle_server_packet(ServerPacket::Disconnected {
            reason: "Server full".to_string(),
        });
        assert!(!world.is_connected());
    }
}
