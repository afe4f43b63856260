//! Per-client session state and the session registry.
//!
//! A session lives as long as the client's connection. It records the
//! client's reported view, the newest input waiting to be applied, and the
//! event queues filled during a tick and drained when the snapshot is sent.

use crate::world::EntityId;
use log::info;
use shared::protocol::{
    DeathEvent, DebugSubscriptions, HealEvent, HitEvent, InputPacket, ResearchCompleteEvent,
    TileUpdate,
};
use shared::{ChunkRect, Command};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Session {
    pub id: u32,
    pub addr: SocketAddr,
    /// Last time any packet arrived from this client.
    pub last_seen: Instant,
    pub player_entity: Option<EntityId>,
    /// Deactivated sessions keep their entity but receive no snapshots.
    pub is_active: bool,
    /// Chunk rectangle the client last reported as on screen.
    pub visible_chunks: ChunkRect,
    pub last_processed_input: u32,
    /// Newest input not yet applied. Older ones are superseded.
    pub pending_input: Option<InputPacket>,
    pub pending_commands: Vec<Command>,
    pub debug_subscriptions: DebugSubscriptions,
    pub sync_requested: bool,
    pub full_resync_requested: bool,
    pub hits: Vec<HitEvent>,
    pub heals: Vec<HealEvent>,
    pub deaths: Vec<DeathEvent>,
    pub completions: Vec<ResearchCompleteEvent>,
    pub tile_updates: Vec<TileUpdate>,
}

impl Session {
    pub fn new(id: u32, addr: SocketAddr) -> Self {
        Self {
            id,
            addr,
            last_seen: Instant::now(),
            player_entity: None,
            is_active: true,
            visible_chunks: ChunkRect::single(0, 0),
            last_processed_input: 0,
            pending_input: None,
            pending_commands: Vec::new(),
            debug_subscriptions: DebugSubscriptions::default(),
            sync_requested: false,
            full_resync_requested: false,
            hits: Vec::new(),
            heals: Vec::new(),
            deaths: Vec::new(),
            completions: Vec::new(),
            tile_updates: Vec::new(),
        }
    }

    pub fn touch(&mut self) {
        self.last_seen = Instant::now();
    }

    pub fn is_timed_out(&self, timeout: Duration) -> bool {
        self.last_seen.elapsed() > timeout
    }

    /// Stages an input. Stale or duplicate sequences are ignored.
    pub fn queue_input(&mut self, input: InputPacket) -> bool {
        let newest = self
            .pending_input
            .as_ref()
            .map_or(self.last_processed_input, |pending| pending.sequence);
        if input.sequence <= newest {
            return false;
        }
        self.pending_input = Some(input);
        true
    }

    /// The reported view grown by one chunk on every side and clamped to
    /// the board.
    pub fn extended_view(&self, width_chunks: u32, height_chunks: u32) -> ChunkRect {
        self.visible_chunks
            .expand(1)
            .clamp(width_chunks, height_chunks)
    }

    pub fn clear_events(&mut self) {
        self.hits.clear();
        self.heals.clear();
        self.deaths.clear();
        self.completions.clear();
        self.tile_updates.clear();
    }

    pub fn pending_event_count(&self) -> usize {
        self.hits.len()
            + self.heals.len()
            + self.deaths.len()
            + self.completions.len()
            + self.tile_updates.len()
    }
}

/// Registry of connected sessions, keyed by id in ascending order.
pub struct SessionManager {
    sessions: BTreeMap<u32, Session>,
    next_session_id: u32,
    max_clients: usize,
}

impl SessionManager {
    pub fn new(max_clients: usize) -> Self {
        Self {
            sessions: BTreeMap::new(),
            next_session_id: 1,
            max_clients,
        }
    }

    /// Returns `None` when the server is full.
    pub fn add_session(&mut self, addr: SocketAddr) -> Option<u32> {
        if self.sessions.len() >= self.max_clients {
            return None;
        }
        let session_id = self.next_session_id;
        self.next_session_id += 1;
        self.sessions.insert(session_id, Session::new(session_id, addr));
        info!("Session {} connected from {}", session_id, addr);
        Some(session_id)
    }

    /// # Panics
    ///
    /// If no session has this id.
    pub fn remove_session(&mut self, session_id: u32) -> Session {
        match self.sessions.remove(&session_id) {
            Some(session) => {
                info!("Session {} disconnected", session_id);
                session
            }
            None => panic!("removing unknown session {}", session_id),
        }
    }

    pub fn find_by_addr(&self, addr: SocketAddr) -> Option<u32> {
        self.sessions
            .values()
            .find(|session| session.addr == addr)
            .map(|session| session.id)
    }

    pub fn get(&self, session_id: u32) -> Option<&Session> {
        self.sessions.get(&session_id)
    }

    pub fn get_mut(&mut self, session_id: u32) -> Option<&mut Session> {
        self.sessions.get_mut(&session_id)
    }

    /// Ids of sessions silent for longer than `timeout`. They are not removed.
    pub fn timed_out(&self, timeout: Duration) -> Vec<u32> {
        self.sessions
            .values()
            .filter(|session| session.is_timed_out(timeout))
            .map(|session| session.id)
            .collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Session> {
        self.sessions.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Session> {
        self.sessions.values_mut()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    pub fn clear(&mut self) {
        self.sessions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{LimbAction, Point};

    fn test_addr() -> SocketAddr {
        "127.0.0.1:8080".parse().unwrap()
    }

    fn test_addr2() -> SocketAddr {
        "127.0.0.1:8081".parse().unwrap()
    }

    fn input(sequence: u32) -> InputPacket {
        InputPacket {
            sequence,
            position: Point::ZERO,
            velocity: Point::ZERO,
            acceleration: Point::ZERO,
            rotation: 0.0,
            selected_slot: 0,
            main_action: LimbAction::None,
            offhand_action: LimbAction::None,
            interacting_entity_id: 0,
            debug_subscriptions: DebugSubscriptions::default(),
            visible_chunks: ChunkRect::single(0, 0),
        }
    }

    #[test]
    fn test_add_session_respects_capacity() {
        let mut manager = SessionManager::new(1);
        assert_eq!(manager.add_session(test_addr()), Some(1));
        assert_eq!(manager.add_session(test_addr2()), None);
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_find_by_addr() {
        let mut manager = SessionManager::new(4);
        let first = manager.add_session(test_addr()).unwrap();
        let second = manager.add_session(test_addr2()).unwrap();
        assert_eq!(manager.find_by_addr(test_addr()), Some(first));
        assert_eq!(manager.find_by_addr(test_addr2()), Some(second));

        let unknown: SocketAddr = "192.168.1.1:9999".parse().unwrap();
        assert_eq!(manager.find_by_addr(unknown), None);
    }

    #[test]
    fn test_session_ids_are_not_reused() {
        let mut manager = SessionManager::new(4);
        let first = manager.add_session(test_addr()).unwrap();
        manager.remove_session(first);
        assert_eq!(manager.add_session(test_addr()), Some(first + 1));
    }

    #[test]
    #[should_panic(expected = "unknown session")]
    fn test_removing_unknown_session_panics() {
        let mut manager = SessionManager::new(4);
        manager.remove_session(7);
    }

    #[test]
    fn test_timeouts() {
        let mut manager = SessionManager::new(4);
        let id = manager.add_session(test_addr()).unwrap();
        assert!(manager.timed_out(Duration::from_secs(1)).is_empty());

        manager.get_mut(id).unwrap().last_seen = Instant::now() - Duration::from_secs(2);
        assert_eq!(manager.timed_out(Duration::from_secs(1)), vec![id]);
    }

    #[test]
    fn test_newest_input_wins() {
        let mut session = Session::new(1, test_addr());
        assert!(session.queue_input(input(2)));
        assert!(!session.queue_input(input(1)));
        assert!(session.queue_input(input(5)));
        assert_eq!(session.pending_input.as_ref().unwrap().sequence, 5);

        session.pending_input = None;
        session.last_processed_input = 5;
        assert!(!session.queue_input(input(5)));
    }

    #[test]
    fn test_extended_view_is_clamped() {
        let mut session = Session::new(1, test_addr());
        session.visible_chunks = ChunkRect::new(0, 2, 3, 4);
        assert_eq!(session.extended_view(10, 6), ChunkRect::new(0, 1, 4, 5));
    }
}
