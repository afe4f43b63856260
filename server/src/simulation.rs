//! The authoritative simulation: one world, its sessions, and the fixed
//! per-tick phase order.
//!
//! Packet handlers only stage work (a pending input, a queued command, a
//! flag on the session, a buffered create or remove). Everything structural
//! happens inside [`Simulation::run_tick`].

use crate::commands::execute_command;
use crate::config::WorldConfig;
use crate::content::entity_types::{entity_info, SpawnParams};
use crate::session::{Session, SessionManager};
use crate::snapshot::{build_full_resync, build_game_data, build_sync_data};
use crate::systems::{collision, run_update_phase, spawning};
use crate::world::events::WorldEvent;
use crate::world::{EntityId, World};
use log::{debug, info, warn};
use shared::motion::clamp_to_world;
use shared::protocol::{InitialPlayerData, InputPacket, TickStatsData};
use shared::{ClientPacket, Command, EntityType, Packet, Point, ServerPacket, TileType};
use shared::{MAX_DATAGRAM_SIZE, PROTOCOL_VERSION};
use std::net::SocketAddr;
use std::time::{Duration, Instant};

pub struct Simulation {
    pub world: World,
    pub sessions: SessionManager,
    last_tick_duration: Duration,
}

/// Encodes a packet for the transport. Packets that fail to encode or do
/// not fit in one datagram are dropped with a warning.
pub fn encode_for_dispatch(packet: &ServerPacket, addr: SocketAddr) -> Option<Packet> {
    match packet.encode() {
        Ok(encoded) if encoded.len() > MAX_DATAGRAM_SIZE => {
            warn!(
                "Dropping {:?} for {}: {} bytes exceeds datagram limit",
                packet.packet_type(),
                addr,
                encoded.len()
            );
            None
        }
        Ok(encoded) => Some(encoded),
        Err(e) => {
            warn!("Failed to encode {:?} for {}: {}", packet.packet_type(), addr, e);
            None
        }
    }
}

impl Simulation {
    pub fn new(config: WorldConfig, max_clients: usize) -> Self {
        Self {
            world: World::new(config),
            sessions: SessionManager::new(max_clients),
            last_tick_duration: Duration::ZERO,
        }
    }

    pub fn last_tick_duration(&self) -> Duration {
        self.last_tick_duration
    }

    /// Stages the effect of one client packet. Returns immediate replies.
    pub fn handle_packet(&mut self, addr: SocketAddr, packet: ClientPacket) -> Vec<(SocketAddr, ServerPacket)> {
        if let ClientPacket::Activate { client_version } = packet {
            return self.activate(addr, client_version);
        }

        let Some(session_id) = self.sessions.find_by_addr(addr) else {
            warn!("{:?} from unknown address {}", packet.packet_type(), addr);
            return Vec::new();
        };

        if let ClientPacket::Disconnect = packet {
            self.disconnect_session(session_id);
            return Vec::new();
        }

        let Some(session) = self.sessions.get_mut(session_id) else {
            return Vec::new();
        };
        session.touch();

        match packet {
            ClientPacket::Deactivate => {
                session.is_active = false;
                debug!("Session {} deactivated", session_id);
            }
            ClientPacket::PlayerInput(input) => {
                if input.is_finite() {
                    session.queue_input(input);
                } else {
                    warn!(
                        "Dropping input {} from session {} with non-finite values",
                        input.sequence, session_id
                    );
                }
            }
            ClientPacket::SyncRequest => session.sync_requested = true,
            ClientPacket::FullResyncRequest => session.full_resync_requested = true,
            ClientPacket::Command(command) => match Command::from_packet(&command) {
                Ok(command) => session.pending_commands.push(command),
                Err(e) => warn!("Rejected command from session {}: {}", session_id, e),
            },
            ClientPacket::Activate { .. } | ClientPacket::Disconnect => {}
        }
        Vec::new()
    }

    fn activate(&mut self, addr: SocketAddr, client_version: u32) -> Vec<(SocketAddr, ServerPacket)> {
        if client_version != PROTOCOL_VERSION {
            warn!(
                "Client {} has protocol version {}, expected {}",
                addr, client_version, PROTOCOL_VERSION
            );
            let reason = format!("Protocol version {} required", PROTOCOL_VERSION);
            return vec![(addr, ServerPacket::Disconnected { reason })];
        }

        let session_id = match self.sessions.find_by_addr(addr) {
            Some(session_id) => session_id,
            None => match self.sessions.add_session(addr) {
                Some(session_id) => session_id,
                None => {
                    warn!("Rejecting {}: server full", addr);
                    let reason = "Server full".to_string();
                    return vec![(addr, ServerPacket::Disconnected { reason })];
                }
            },
        };

        let existing = self
            .sessions
            .get(session_id)
            .and_then(|session| session.player_entity);
        let entity_id = match existing {
            Some(entity_id) => entity_id,
            None => self.spawn_player(session_id),
        };

        let Some(session) = self.sessions.get_mut(session_id) else {
            return Vec::new();
        };
        session.touch();
        session.is_active = true;
        session.player_entity = Some(entity_id);

        let config = self.world.config();
        let reply = InitialPlayerData {
            session_id,
            entity_id,
            tick: self.world.tick(),
            chunk_size: config.chunk_size,
            world_width_chunks: config.width_chunks,
            world_height_chunks: config.height_chunks,
        };
        vec![(addr, ServerPacket::InitialPlayerData(reply))]
    }

    /// Stages a player entity in a tribe of its own, on grass when there is
    /// any.
    fn spawn_player(&mut self, session_id: u32) -> EntityId {
        let center = Point::new(
            self.world.config().world_width() / 2.0,
            self.world.config().world_height() / 2.0,
        );
        let position = self
            .world
            .random_position_on_tile(TileType::Grass)
            .unwrap_or(center);
        let tribe_id = self.world.tribes.create_tribe();
        let entity_id = self.world.create_entity(
            EntityType::Player,
            position,
            0.0,
            SpawnParams::player(session_id, tribe_id),
        );
        info!(
            "Spawned player entity {} for session {} at ({:.0}, {:.0})",
            entity_id, session_id, position.x, position.y
        );
        entity_id
    }

    /// Destroys the session and flags its entity. The entity leaves the
    /// world at the next removal flush.
    pub fn disconnect_session(&mut self, session_id: u32) {
        let session = self.sessions.remove_session(session_id);
        if let Some(entity_id) = session.player_entity {
            self.world.remove_entity(entity_id);
        }
    }

    /// Disconnects every session that has been silent for too long.
    pub fn check_timeouts(&mut self) -> Vec<u32> {
        let timed_out = self.sessions.timed_out(self.world.config().client_timeout);
        for &session_id in &timed_out {
            info!("Session {} timed out", session_id);
            self.disconnect_session(session_id);
        }
        timed_out
    }

    /// Runs one full tick and returns the encoded packets to send.
    pub fn run_tick(&mut self) -> Vec<(SocketAddr, Packet)> {
        let started = Instant::now();

        self.world.push_join_buffer();
        self.world.remove_flagged_entities();
        self.apply_inputs();
        self.execute_commands();
        self.world.update_tribes();
        self.world.sync_chunks();

        run_update_phase(&mut self.world);
        self.world.sync_chunks();

        collision::resolve_collisions(&mut self.world);
        self.world.sync_chunks();

        spawning::run_spawn_pass(&mut self.world);

        self.world.push_join_buffer();
        self.world.remove_flagged_entities();
        self.refresh_player_entities();

        self.distribute_events();
        let outgoing = self.assemble_packets();

        self.world.advance_clock();
        self.last_tick_duration = started.elapsed();
        outgoing
    }

    fn apply_inputs(&mut self) {
        for session in self.sessions.iter_mut() {
            let Some(input) = session.pending_input.take() else {
                continue;
            };
            session.visible_chunks = input.visible_chunks;
            session.debug_subscriptions = input.debug_subscriptions;
            session.last_processed_input = input.sequence;
            if let Some(entity_id) = session.player_entity {
                apply_input(&mut self.world, entity_id, &input);
            }
        }
    }

    fn execute_commands(&mut self) {
        for session in self.sessions.iter_mut() {
            let commands = std::mem::take(&mut session.pending_commands);
            let Some(entity_id) = session.player_entity else {
                if !commands.is_empty() {
                    warn!(
                        "Dropping {} commands from session {} without an entity",
                        commands.len(),
                        session.id
                    );
                }
                continue;
            };
            for command in &commands {
                execute_command(&mut self.world, entity_id, command);
            }
        }
    }

    /// Forgets player entities that died or were removed this tick.
    fn refresh_player_entities(&mut self) {
        for session in self.sessions.iter_mut() {
            if let Some(entity_id) = session.player_entity {
                if self.world.entity(entity_id).is_none() {
                    info!("Session {} lost its player entity {}", session.id, entity_id);
                    session.player_entity = None;
                }
            }
        }
    }

    /// Appends each world event to every active session whose extended
    /// view contains the event's chunk.
    fn distribute_events(&mut self) {
        let events = self.world.take_events();
        if events.is_empty() {
            return;
        }
        let (width, height) = (self.world.board.width(), self.world.board.height());
        for event in events {
            let (chunk_x, chunk_y) = self.world.board.chunk_at(event.origin());
            for session in self.sessions.iter_mut() {
                if session.is_active && session.extended_view(width, height).contains(chunk_x, chunk_y) {
                    push_event(session, event);
                }
            }
        }
    }

    fn tick_stats(&self) -> TickStatsData {
        TickStatsData {
            tick_duration_ms: self.last_tick_duration.as_secs_f32() * 1000.0,
            active_entities: self.world.entity_count() as u32,
            sessions: self.sessions.len() as u32,
        }
    }

    /// Encodes every active session's packets. A session's event queues are
    /// cleared only once its snapshot made it into a datagram.
    fn assemble_packets(&mut self) -> Vec<(SocketAddr, Packet)> {
        let tick_stats = self.tick_stats();
        let mut outgoing = Vec::new();
        for session in self.sessions.iter_mut() {
            if !session.is_active {
                continue;
            }
            let game_data = ServerPacket::GameData(build_game_data(&self.world, session, tick_stats));
            match encode_for_dispatch(&game_data, session.addr) {
                Some(packet) => {
                    outgoing.push((session.addr, packet));
                    session.clear_events();
                }
                None => warn!(
                    "Keeping {} events for session {} until a snapshot fits",
                    session.pending_event_count(),
                    session.id
                ),
            }

            let mut extras = Vec::new();
            if std::mem::take(&mut session.sync_requested) {
                if let Some(sync) = session.player_entity.and_then(|id| build_sync_data(&self.world, id)) {
                    extras.push(ServerPacket::SyncData(sync));
                }
            }
            if std::mem::take(&mut session.full_resync_requested) {
                if let Some(resync) = session
                    .player_entity
                    .and_then(|id| build_full_resync(&self.world, id))
                {
                    extras.push(ServerPacket::FullResync(resync));
                }
            }
            outgoing.extend(
                extras
                    .iter()
                    .filter_map(|packet| encode_for_dispatch(packet, session.addr))
                    .map(|packet| (session.addr, packet)),
            );
        }
        outgoing
    }

    /// Drops every session and regenerates the world.
    pub fn reset(&mut self) {
        self.world.reset();
        self.sessions.clear();
        self.last_tick_duration = Duration::ZERO;
    }
}

/// Applies one input to the player's entity. The reported position is
/// trusted only within what the player could have moved in the tolerance
/// window; otherwise the server position stands.
fn apply_input(world: &mut World, entity_id: EntityId, input: &InputPacket) {
    let config = world.config();
    let (width, height) = (config.world_width(), config.world_height());
    let max_speed = entity_info(EntityType::Player)
        .motion
        .map_or(0.0, |motion| motion.max_speed);
    let tolerance = max_speed * config.tick_dt() * config.position_tolerance_ticks;

    let Some(entity) = world.entity_mut(entity_id) else {
        return;
    };
    if !entity.is_active() {
        return;
    }
    let drift = entity.position.distance_to(&input.position);
    if drift <= tolerance {
        entity.position = clamp_to_world(input.position, width, height);
        entity.velocity = input.velocity;
    } else {
        debug!(
            "Entity {} reported a position {:.1} away, keeping server state",
            entity_id, drift
        );
    }
    entity.acceleration = input.acceleration;
    entity.rotation = input.rotation;

    if world.components.limbs.has_component(entity_id) {
        let limbs = world.components.limbs.get_component_mut(entity_id);
        limbs.main.action = input.main_action;
        limbs.offhand.action = input.offhand_action;
    }
    if world.components.inventory.has_component(entity_id) {
        world
            .components
            .inventory
            .get_component_mut(entity_id)
            .select(input.selected_slot as usize);
    }
}

fn push_event(session: &mut Session, event: WorldEvent) {
    match event {
        WorldEvent::Hit(hit) => session.hits.push(hit),
        WorldEvent::Heal(heal) => session.heals.push(heal),
        WorldEvent::Death(death) => session.deaths.push(death),
        WorldEvent::ResearchComplete(completion) => session.completions.push(completion),
        WorldEvent::TileUpdate { update, .. } => session.tile_updates.push(update),
    }
}
