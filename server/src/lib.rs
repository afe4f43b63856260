//! # Simulation Server Library
//!
//! The authoritative server for a chunked 2D survival world. It owns every
//! entity, advances the world at a fixed tick rate, and streams per-client
//! snapshots of whatever each client can see.
//!
//! ## Tick Phases
//!
//! Every tick runs the same sequence:
//!
//! 1. Flush staged joins and flagged removals, apply staged client inputs
//!    and commands, advance tribe research.
//! 2. Run the per-entity systems (wander, movement, limbs, pickup, health,
//!    aging).
//! 3. Resolve collisions using chunk range queries.
//! 4. Attempt natural spawns against the tile census.
//! 5. Flush joins and removals again.
//! 6. Scope events to sessions and assemble one snapshot per active session.
//! 7. Advance the tick counter and world clock.
//!
//! Entity creation and removal are buffered between the flush points, so no
//! system ever sees the board or a component array change under it.
//!
//! ## Module Organization
//!
//! - `world`: entities, component arrays with join/remove hooks, the chunk
//!   board, the tile grid and tribe aggregates.
//! - `content`: component types and the static entity type table.
//! - `systems`: per-entity update systems, collision and spawning.
//! - `commands`: the text command dispatcher.
//! - `session` and `snapshot`: per-client state, visibility and packet
//!   assembly.
//! - `simulation`: the tick itself and packet handling.
//! - `scheduler` and `network`: real-time pacing and the UDP loop.
//! - `benchmark`: the timed benchmark mode.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use server::config::WorldConfig;
//! use server::network::Server;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut server = Server::new("127.0.0.1:8080", WorldConfig::default(), 32, false).await?;
//!     server.run().await?;
//!     Ok(())
//! }
//! ```

pub mod benchmark;
pub mod commands;
pub mod config;
pub mod content;
pub mod network;
pub mod scheduler;
pub mod session;
pub mod simulation;
pub mod snapshot;
pub mod systems;
pub mod world;
