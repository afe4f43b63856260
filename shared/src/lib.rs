//! Types shared by the server and the client: the binary codec, the packet
//! catalogue, the command language, 2D math and hitbox geometry.

pub mod catalog;
pub mod codec;
pub mod command;
pub mod geometry;
pub mod math;
pub mod motion;
pub mod payload;
pub mod protocol;

pub use catalog::{Biome, EntityType, ItemType, TechType, TileType};
pub use codec::{CodecError, Packet, PacketReader, PacketWriter};
pub use command::{parse_command_line, Command, CommandArg, CommandError, CommandPacket};
pub use geometry::{Bounds, Hitbox, HitboxShape};
pub use math::Point;
pub use payload::{ComponentMask, ComponentPayload, ComponentType};
pub use protocol::{
    ChunkRect, ClientPacket, EntityRecord, GameDataPacket, InputPacket, LimbAction, PacketType,
    ServerPacket,
};

/// Bumped whenever the wire format changes.
pub const PROTOCOL_VERSION: u32 = 1;

/// Simulation ticks per second.
pub const TICK_RATE: u32 = 20;
/// Seconds simulated by one tick.
pub const TICK_DT: f32 = 1.0 / TICK_RATE as f32;

/// Side length of one tile, in world units.
pub const TILE_SIZE: f32 = 64.0;
/// Side length of one chunk, in world units.
pub const CHUNK_SIZE: f32 = 256.0;
/// World width and height, in chunks.
pub const WORLD_SIZE_CHUNKS: u32 = 64;

/// Largest UDP datagram either end sends or accepts.
pub const MAX_DATAGRAM_SIZE: usize = 65_507;
