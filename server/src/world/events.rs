//! World-level side effects raised during a tick. They are collected in the
//! world's outbox and scoped to sessions when packets are assembled.

use shared::protocol::{DeathEvent, HealEvent, HitEvent, ResearchCompleteEvent, TileUpdate};
use shared::Point;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WorldEvent {
    Hit(HitEvent),
    Heal(HealEvent),
    Death(DeathEvent),
    ResearchComplete(ResearchCompleteEvent),
    TileUpdate {
        update: TileUpdate,
        origin: Point,
    },
}

impl WorldEvent {
    /// World position used to decide which sessions see the event.
    pub fn origin(&self) -> Point {
        match self {
            WorldEvent::Hit(e) => e.position,
            WorldEvent::Heal(e) => e.position,
            WorldEvent::Death(e) => e.position,
            WorldEvent::ResearchComplete(e) => e.position,
            WorldEvent::TileUpdate { origin, .. } => *origin,
        }
    }
}
