//! World and server tuning. `Default` carries the production values; tests
//! build smaller worlds with custom chunk sizes.

use shared::{CHUNK_SIZE, TICK_RATE, TILE_SIZE, WORLD_SIZE_CHUNKS};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct WorldConfig {
    /// Side length of one chunk, in world units.
    pub chunk_size: f32,
    pub width_chunks: u32,
    pub height_chunks: u32,
    pub tile_size: f32,
    pub tick_rate: u32,
    /// Seed for world generation and every random decision in the tick.
    pub seed: u64,
    /// Sessions silent for longer than this are disconnected.
    pub client_timeout: Duration,
    /// Ticks of movement a reported client position may differ from the
    /// server's before it is rejected.
    pub position_tolerance_ticks: f32,
    /// Spawn pass toggle, off in tests that need a quiet world.
    pub spawning_enabled: bool,
    /// Upper bound on naturally spawned entities of each type.
    pub max_spawned_per_type: u32,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            chunk_size: CHUNK_SIZE,
            width_chunks: WORLD_SIZE_CHUNKS,
            height_chunks: WORLD_SIZE_CHUNKS,
            tile_size: TILE_SIZE,
            tick_rate: TICK_RATE,
            seed: 0,
            client_timeout: Duration::from_secs(5),
            position_tolerance_ticks: 4.0,
            spawning_enabled: true,
            max_spawned_per_type: 400,
        }
    }
}

impl WorldConfig {
    pub fn world_width(&self) -> f32 {
        self.chunk_size * self.width_chunks as f32
    }

    pub fn world_height(&self) -> f32 {
        self.chunk_size * self.height_chunks as f32
    }

    pub fn tick_dt(&self) -> f32 {
        1.0 / self.tick_rate as f32
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_nanos(1_000_000_000 / self.tick_rate as u64)
    }
}
