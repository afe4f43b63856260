//! Packet catalogue: type tags and the payload shape behind each of them.
//!
//! Every packet is `[type: u32][payload...]`. Client packets are decoded by
//! the server, server packets by the client. Each packet struct knows how to
//! write itself to a [`PacketWriter`] and read itself back from a
//! [`PacketReader`] in the same field order.

use crate::catalog::{EntityType, ItemType, TechType, TileType};
use crate::codec::{string_field_size, CodecError, Packet, PacketReader, PacketWriter};
use crate::command::CommandPacket;
use crate::geometry::{Hitbox, HitboxShape};
use crate::math::Point;
use crate::payload::{ComponentMask, ComponentPayload};

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketType {
    // client -> server
    Activate = 1,
    Deactivate = 2,
    PlayerInput = 3,
    SyncRequest = 4,
    FullResyncRequest = 5,
    Command = 6,
    Disconnect = 7,
    // server -> client
    InitialPlayerData = 101,
    GameData = 102,
    SyncData = 103,
    FullResync = 104,
    Disconnected = 105,
}

impl PacketType {
    const ALL: [PacketType; 12] = [
        PacketType::Activate,
        PacketType::Deactivate,
        PacketType::PlayerInput,
        PacketType::SyncRequest,
        PacketType::FullResyncRequest,
        PacketType::Command,
        PacketType::Disconnect,
        PacketType::InitialPlayerData,
        PacketType::GameData,
        PacketType::SyncData,
        PacketType::FullResync,
        PacketType::Disconnected,
    ];

    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Result<Self, CodecError> {
        Self::ALL
            .into_iter()
            .find(|t| t.tag() == tag)
            .ok_or(CodecError::UnknownPacketType(tag))
    }
}

/// What a limb is asked to do this tick.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LimbAction {
    #[default]
    None = 0,
    Attack = 1,
    Eat = 2,
}

impl LimbAction {
    pub fn tag(self) -> u32 {
        self as u32
    }

    pub fn from_tag(tag: u32) -> Result<Self, CodecError> {
        match tag {
            0 => Ok(LimbAction::None),
            1 => Ok(LimbAction::Attack),
            2 => Ok(LimbAction::Eat),
            value => Err(CodecError::InvalidValue {
                field: "limb action",
                value,
            }),
        }
    }
}

/// Bitmask of optional debug sections a client wants in its snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DebugSubscriptions(pub u32);

impl DebugSubscriptions {
    pub const TICK_STATS: u32 = 1;
    pub const VISIBLE_CHUNKS: u32 = 1 << 1;

    pub fn contains(self, flag: u32) -> bool {
        self.0 & flag != 0
    }
}

/// Inclusive rectangle of chunk coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChunkRect {
    pub min_x: i32,
    pub min_y: i32,
    pub max_x: i32,
    pub max_y: i32,
}

impl ChunkRect {
    pub const fn new(min_x: i32, min_y: i32, max_x: i32, max_y: i32) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// A rectangle covering a single chunk.
    pub const fn single(x: i32, y: i32) -> Self {
        Self::new(x, y, x, y)
    }

    pub fn is_empty(&self) -> bool {
        self.min_x > self.max_x || self.min_y > self.max_y
    }

    pub fn contains(&self, x: i32, y: i32) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }

    /// Grows the rectangle by `by` chunks on every side, saturating at the
    /// `i32` range.
    pub fn expand(&self, by: i32) -> Self {
        Self::new(
            self.min_x.saturating_sub(by),
            self.min_y.saturating_sub(by),
            self.max_x.saturating_add(by),
            self.max_y.saturating_add(by),
        )
    }

    /// Clamps to a `width` x `height` chunk grid. The result may be empty.
    pub fn clamp(&self, width: u32, height: u32) -> Self {
        Self::new(
            self.min_x.max(0),
            self.min_y.max(0),
            self.max_x.min(width as i32 - 1),
            self.max_y.min(height as i32 - 1),
        )
    }

    /// Every chunk coordinate in the rectangle, row by row.
    pub fn chunks(&self) -> impl Iterator<Item = (i32, i32)> {
        let rect = *self;
        (rect.min_y..=rect.max_y).flat_map(move |y| (rect.min_x..=rect.max_x).map(move |x| (x, y)))
    }

    pub fn chunk_count(&self) -> usize {
        if self.is_empty() {
            0
        } else {
            ((self.max_x - self.min_x + 1) * (self.max_y - self.min_y + 1)) as usize
        }
    }

    fn write_to(&self, writer: &mut PacketWriter) {
        writer.write_i32(self.min_x);
        writer.write_i32(self.min_y);
        writer.write_i32(self.max_x);
        writer.write_i32(self.max_y);
    }

    fn read_from(reader: &mut PacketReader<'_>) -> Result<Self, CodecError> {
        Ok(Self::new(
            reader.read_i32()?,
            reader.read_i32()?,
            reader.read_i32()?,
            reader.read_i32()?,
        ))
    }
}

/// One sampled frame of player input.
///
/// `position` and `velocity` are the client's state *before* `acceleration`
/// is applied, so the server can step from the same starting point.
#[derive(Debug, Clone, PartialEq)]
pub struct InputPacket {
    pub sequence: u32,
    pub position: Point,
    pub velocity: Point,
    pub acceleration: Point,
    pub rotation: f32,
    pub selected_slot: u32,
    pub main_action: LimbAction,
    pub offhand_action: LimbAction,
    /// Entity the player is interacting with, 0 for none.
    pub interacting_entity_id: u32,
    pub debug_subscriptions: DebugSubscriptions,
    pub visible_chunks: ChunkRect,
}

impl InputPacket {
    /// Whether every float field is a real number. Inputs with NaN or
    /// infinite values are never applied.
    pub fn is_finite(&self) -> bool {
        self.position.is_finite()
            && self.velocity.is_finite()
            && self.acceleration.is_finite()
            && self.rotation.is_finite()
    }

    fn write_to(&self, writer: &mut PacketWriter) {
        writer.write_u32(self.sequence);
        writer.write_point(self.position);
        writer.write_point(self.velocity);
        writer.write_point(self.acceleration);
        writer.write_f32(self.rotation);
        writer.write_u32(self.selected_slot);
        writer.write_u32(self.main_action.tag());
        writer.write_u32(self.offhand_action.tag());
        writer.write_u32(self.interacting_entity_id);
        writer.write_u32(self.debug_subscriptions.0);
        self.visible_chunks.write_to(writer);
    }

    fn read_from(reader: &mut PacketReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            sequence: reader.read_u32()?,
            position: reader.read_point()?,
            velocity: reader.read_point()?,
            acceleration: reader.read_point()?,
            rotation: reader.read_f32()?,
            selected_slot: reader.read_u32()?,
            main_action: LimbAction::from_tag(reader.read_u32()?)?,
            offhand_action: LimbAction::from_tag(reader.read_u32()?)?,
            interacting_entity_id: reader.read_u32()?,
            debug_subscriptions: DebugSubscriptions(reader.read_u32()?),
            visible_chunks: ChunkRect::read_from(reader)?,
        })
    }
}

/// Packets sent by clients.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientPacket {
    Activate { client_version: u32 },
    Deactivate,
    PlayerInput(InputPacket),
    SyncRequest,
    FullResyncRequest,
    Command(CommandPacket),
    Disconnect,
}

impl ClientPacket {
    pub fn packet_type(&self) -> PacketType {
        match self {
            ClientPacket::Activate { .. } => PacketType::Activate,
            ClientPacket::Deactivate => PacketType::Deactivate,
            ClientPacket::PlayerInput(_) => PacketType::PlayerInput,
            ClientPacket::SyncRequest => PacketType::SyncRequest,
            ClientPacket::FullResyncRequest => PacketType::FullResyncRequest,
            ClientPacket::Command(_) => PacketType::Command,
            ClientPacket::Disconnect => PacketType::Disconnect,
        }
    }

    pub fn encode(&self) -> Result<Packet, CodecError> {
        let mut writer = PacketWriter::new(self.packet_type().tag());
        match self {
            ClientPacket::Activate { client_version } => writer.write_u32(*client_version),
            ClientPacket::PlayerInput(input) => input.write_to(&mut writer),
            ClientPacket::Command(command) => command.write_to(&mut writer)?,
            ClientPacket::Deactivate
            | ClientPacket::SyncRequest
            | ClientPacket::FullResyncRequest
            | ClientPacket::Disconnect => {}
        }
        Ok(writer.finish())
    }

    pub fn decode(packet: &Packet) -> Result<Self, CodecError> {
        let mut reader = packet.reader();
        let decoded = match PacketType::from_tag(packet.tag())? {
            PacketType::Activate => ClientPacket::Activate {
                client_version: reader.read_u32()?,
            },
            PacketType::Deactivate => ClientPacket::Deactivate,
            PacketType::PlayerInput => ClientPacket::PlayerInput(InputPacket::read_from(&mut reader)?),
            PacketType::SyncRequest => ClientPacket::SyncRequest,
            PacketType::FullResyncRequest => ClientPacket::FullResyncRequest,
            PacketType::Command => ClientPacket::Command(CommandPacket::read_from(&mut reader)?),
            PacketType::Disconnect => ClientPacket::Disconnect,
            other => return Err(CodecError::UnknownPacketType(other.tag())),
        };
        Ok(decoded)
    }
}

const HITBOX_CIRCLE: u32 = 0;
const HITBOX_RECTANGLE: u32 = 1;
const HITBOX_WIRE_SIZE: usize = 24;

fn write_hitbox(writer: &mut PacketWriter, hitbox: &Hitbox) {
    let (kind, a, b) = match hitbox.shape {
        HitboxShape::Circle { radius } => (HITBOX_CIRCLE, radius, 0.0),
        HitboxShape::Rectangle { width, height } => (HITBOX_RECTANGLE, width, height),
    };
    writer.write_u32(kind);
    writer.write_point(hitbox.offset);
    writer.write_f32(hitbox.mass);
    writer.write_f32(a);
    writer.write_f32(b);
}

fn read_hitbox(reader: &mut PacketReader<'_>) -> Result<Hitbox, CodecError> {
    let kind = reader.read_u32()?;
    let offset = reader.read_point()?;
    let mass = reader.read_f32()?;
    let a = reader.read_f32()?;
    let b = reader.read_f32()?;
    let hitbox = match kind {
        HITBOX_CIRCLE => Hitbox::circle(a, mass),
        HITBOX_RECTANGLE => Hitbox::rectangle(a, b, mass),
        value => {
            return Err(CodecError::InvalidValue {
                field: "hitbox kind",
                value,
            })
        }
    };
    Ok(hitbox.with_offset(offset))
}

/// Full state of one visible entity.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityRecord {
    pub id: u32,
    pub entity_type: EntityType,
    pub position: Point,
    pub velocity: Point,
    pub rotation: f32,
    pub hitboxes: Vec<Hitbox>,
    pub age_ticks: u32,
    pub collision_bit: u32,
    pub collision_mask: u32,
    /// Serialized components in the entity type's declared order.
    pub components: Vec<ComponentPayload>,
}

impl EntityRecord {
    const FIXED_SIZE: usize = 4 * 12;

    pub fn encoded_len(&self) -> usize {
        Self::FIXED_SIZE
            + self.hitboxes.len() * HITBOX_WIRE_SIZE
            + self
                .components
                .iter()
                .map(ComponentPayload::encoded_len)
                .sum::<usize>()
    }

    pub fn write_to(&self, writer: &mut PacketWriter) -> Result<(), CodecError> {
        writer.write_u32(self.id);
        writer.write_u32(self.entity_type.tag());
        writer.write_point(self.position);
        writer.write_point(self.velocity);
        writer.write_f32(self.rotation);
        writer.write_u32(self.hitboxes.len() as u32);
        for hitbox in &self.hitboxes {
            write_hitbox(writer, hitbox);
        }
        writer.write_u32(self.age_ticks);
        writer.write_u32(self.collision_bit);
        writer.write_u32(self.collision_mask);
        writer.write_u32(self.components.len() as u32);
        for component in &self.components {
            component.write_to(writer)?;
        }
        Ok(())
    }

    pub fn read_from(reader: &mut PacketReader<'_>, mask: ComponentMask) -> Result<Self, CodecError> {
        let id = reader.read_u32()?;
        let entity_type = EntityType::from_tag(reader.read_u32()?)?;
        let position = reader.read_point()?;
        let velocity = reader.read_point()?;
        let rotation = reader.read_f32()?;

        let hitbox_count = reader.read_count(HITBOX_WIRE_SIZE)?;
        let mut hitboxes = Vec::with_capacity(hitbox_count);
        for _ in 0..hitbox_count {
            hitboxes.push(read_hitbox(reader)?);
        }

        let age_ticks = reader.read_u32()?;
        let collision_bit = reader.read_u32()?;
        let collision_mask = reader.read_u32()?;

        let component_count = reader.read_count(4)?;
        let mut components = Vec::with_capacity(component_count);
        for _ in 0..component_count {
            if let Some(component) = ComponentPayload::read_from(reader, mask)? {
                components.push(component);
            }
        }

        Ok(Self {
            id,
            entity_type,
            position,
            velocity,
            rotation,
            hitboxes,
            age_ticks,
            collision_bit,
            collision_mask,
            components,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitEvent {
    pub entity_id: u32,
    pub position: Point,
    pub damage: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HealEvent {
    pub entity_id: u32,
    pub position: Point,
    pub amount: f32,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeathEvent {
    pub entity_id: u32,
    pub position: Point,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResearchCompleteEvent {
    pub tribe_id: u32,
    pub tech: TechType,
    pub position: Point,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TileUpdate {
    pub tile_x: u32,
    pub tile_y: u32,
    pub tile_type: TileType,
    pub is_wall: bool,
}

/// Fixed-width array element shared by the event queues.
trait WireEvent: Sized {
    const SIZE: usize;
    fn write_to(&self, writer: &mut PacketWriter);
    fn read_from(reader: &mut PacketReader<'_>) -> Result<Self, CodecError>;
}

impl WireEvent for HitEvent {
    const SIZE: usize = 16;

    fn write_to(&self, writer: &mut PacketWriter) {
        writer.write_u32(self.entity_id);
        writer.write_point(self.position);
        writer.write_f32(self.damage);
    }

    fn read_from(reader: &mut PacketReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            entity_id: reader.read_u32()?,
            position: reader.read_point()?,
            damage: reader.read_f32()?,
        })
    }
}

impl WireEvent for HealEvent {
    const SIZE: usize = 16;

    fn write_to(&self, writer: &mut PacketWriter) {
        writer.write_u32(self.entity_id);
        writer.write_point(self.position);
        writer.write_f32(self.amount);
    }

    fn read_from(reader: &mut PacketReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            entity_id: reader.read_u32()?,
            position: reader.read_point()?,
            amount: reader.read_f32()?,
        })
    }
}

impl WireEvent for DeathEvent {
    const SIZE: usize = 12;

    fn write_to(&self, writer: &mut PacketWriter) {
        writer.write_u32(self.entity_id);
        writer.write_point(self.position);
    }

    fn read_from(reader: &mut PacketReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            entity_id: reader.read_u32()?,
            position: reader.read_point()?,
        })
    }
}

impl WireEvent for ResearchCompleteEvent {
    const SIZE: usize = 16;

    fn write_to(&self, writer: &mut PacketWriter) {
        writer.write_u32(self.tribe_id);
        writer.write_u32(self.tech.tag());
        writer.write_point(self.position);
    }

    fn read_from(reader: &mut PacketReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            tribe_id: reader.read_u32()?,
            tech: TechType::from_tag(reader.read_u32()?)?,
            position: reader.read_point()?,
        })
    }
}

impl WireEvent for TileUpdate {
    const SIZE: usize = 16;

    fn write_to(&self, writer: &mut PacketWriter) {
        writer.write_u32(self.tile_x);
        writer.write_u32(self.tile_y);
        writer.write_u32(self.tile_type.tag());
        writer.write_bool(self.is_wall);
    }

    fn read_from(reader: &mut PacketReader<'_>) -> Result<Self, CodecError> {
        Ok(Self {
            tile_x: reader.read_u32()?,
            tile_y: reader.read_u32()?,
            tile_type: TileType::from_tag(reader.read_u32()?)?,
            is_wall: reader.read_bool()?,
        })
    }
}

fn write_events<T: WireEvent>(writer: &mut PacketWriter, events: &[T]) {
    writer.write_u32(events.len() as u32);
    for event in events {
        event.write_to(writer);
    }
}

fn read_events<T: WireEvent>(reader: &mut PacketReader<'_>) -> Result<Vec<T>, CodecError> {
    let count = reader.read_count(T::SIZE)?;
    let mut events = Vec::with_capacity(count);
    for _ in 0..count {
        events.push(T::read_from(reader)?);
    }
    Ok(events)
}

fn events_len<T: WireEvent>(events: &[T]) -> usize {
    4 + events.len() * T::SIZE
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemStack {
    pub item_type: ItemType,
    pub amount: u32,
}

/// Inventory contents of the recipient's own entity.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct InventoryState {
    pub selected_slot: u32,
    pub slots: Vec<Option<ItemStack>>,
}

impl InventoryState {
    fn encoded_len(&self) -> usize {
        8 + self.slots.len() * 8
    }

    fn write_to(&self, writer: &mut PacketWriter) {
        writer.write_u32(self.selected_slot);
        writer.write_u32(self.slots.len() as u32);
        for slot in &self.slots {
            match slot {
                Some(stack) => {
                    writer.write_u32(stack.item_type.tag());
                    writer.write_u32(stack.amount);
                }
                None => {
                    writer.write_u32(0);
                    writer.write_u32(0);
                }
            }
        }
    }

    fn read_from(reader: &mut PacketReader<'_>) -> Result<Self, CodecError> {
        let selected_slot = reader.read_u32()?;
        let count = reader.read_count(8)?;
        let mut slots = Vec::with_capacity(count);
        for _ in 0..count {
            let tag = reader.read_u32()?;
            let amount = reader.read_u32()?;
            let slot = match tag {
                0 => None,
                tag => Some(ItemStack {
                    item_type: ItemType::from_tag(tag)?,
                    amount,
                }),
            };
            slots.push(slot);
        }
        Ok(Self {
            selected_slot,
            slots,
        })
    }
}

/// Optional diagnostics, sent only to subscribed clients.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct DebugData {
    pub tick_stats: Option<TickStatsData>,
    pub visible_chunks: Option<ChunkRect>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickStatsData {
    pub tick_duration_ms: f32,
    pub active_entities: u32,
    pub sessions: u32,
}

impl DebugData {
    fn encoded_len(&self) -> usize {
        4 + self.tick_stats.map_or(0, |_| 12) + self.visible_chunks.map_or(0, |_| 16)
    }

    fn write_to(&self, writer: &mut PacketWriter) {
        let mut flags = 0;
        if self.tick_stats.is_some() {
            flags |= DebugSubscriptions::TICK_STATS;
        }
        if self.visible_chunks.is_some() {
            flags |= DebugSubscriptions::VISIBLE_CHUNKS;
        }
        writer.write_u32(flags);
        if let Some(stats) = &self.tick_stats {
            writer.write_f32(stats.tick_duration_ms);
            writer.write_u32(stats.active_entities);
            writer.write_u32(stats.sessions);
        }
        if let Some(rect) = &self.visible_chunks {
            rect.write_to(writer);
        }
    }

    fn read_from(reader: &mut PacketReader<'_>) -> Result<Self, CodecError> {
        let flags = DebugSubscriptions(reader.read_u32()?);
        let tick_stats = if flags.contains(DebugSubscriptions::TICK_STATS) {
            Some(TickStatsData {
                tick_duration_ms: reader.read_f32()?,
                active_entities: reader.read_u32()?,
                sessions: reader.read_u32()?,
            })
        } else {
            None
        };
        let visible_chunks = if flags.contains(DebugSubscriptions::VISIBLE_CHUNKS) {
            Some(ChunkRect::read_from(reader)?)
        } else {
            None
        };
        Ok(Self {
            tick_stats,
            visible_chunks,
        })
    }
}

/// The per-tick snapshot sent to every active session.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GameDataPacket {
    pub tick: u32,
    pub world_time: f32,
    /// Sequence of the newest input the server applied for this client.
    pub last_processed_input: u32,
    /// Entity ids start at 1; `None` is sent as 0.
    pub player_entity_id: Option<u32>,
    pub entities: Vec<EntityRecord>,
    pub inventory: Option<InventoryState>,
    pub hits: Vec<HitEvent>,
    pub heals: Vec<HealEvent>,
    pub deaths: Vec<DeathEvent>,
    pub completions: Vec<ResearchCompleteEvent>,
    pub tile_updates: Vec<TileUpdate>,
    pub debug: DebugData,
}

impl GameDataPacket {
    /// Exact payload size, used to pre-size the writer.
    pub fn encoded_len(&self) -> usize {
        16 + 4
            + self
                .entities
                .iter()
                .map(EntityRecord::encoded_len)
                .sum::<usize>()
            + 4
            + self.inventory.as_ref().map_or(0, InventoryState::encoded_len)
            + events_len(&self.hits)
            + events_len(&self.heals)
            + events_len(&self.deaths)
            + events_len(&self.completions)
            + events_len(&self.tile_updates)
            + self.debug.encoded_len()
    }

    fn write_to(&self, writer: &mut PacketWriter) -> Result<(), CodecError> {
        writer.write_u32(self.tick);
        writer.write_f32(self.world_time);
        writer.write_u32(self.last_processed_input);
        writer.write_u32(self.player_entity_id.unwrap_or(0));
        writer.write_u32(self.entities.len() as u32);
        for entity in &self.entities {
            entity.write_to(writer)?;
        }
        writer.write_bool(self.inventory.is_some());
        if let Some(inventory) = &self.inventory {
            inventory.write_to(writer);
        }
        write_events(writer, &self.hits);
        write_events(writer, &self.heals);
        write_events(writer, &self.deaths);
        write_events(writer, &self.completions);
        write_events(writer, &self.tile_updates);
        self.debug.write_to(writer);
        Ok(())
    }

    fn read_from(reader: &mut PacketReader<'_>, mask: ComponentMask) -> Result<Self, CodecError> {
        let tick = reader.read_u32()?;
        let world_time = reader.read_f32()?;
        let last_processed_input = reader.read_u32()?;
        let player_entity_id = match reader.read_u32()? {
            0 => None,
            id => Some(id),
        };

        let entity_count = reader.read_count(EntityRecord::FIXED_SIZE)?;
        let mut entities = Vec::with_capacity(entity_count);
        for _ in 0..entity_count {
            entities.push(EntityRecord::read_from(reader, mask)?);
        }

        let inventory = if reader.read_bool()? {
            Some(InventoryState::read_from(reader)?)
        } else {
            None
        };

        Ok(Self {
            tick,
            world_time,
            last_processed_input,
            player_entity_id,
            entities,
            inventory,
            hits: read_events(reader)?,
            heals: read_events(reader)?,
            deaths: read_events(reader)?,
            completions: read_events(reader)?,
            tile_updates: read_events(reader)?,
            debug: DebugData::read_from(reader)?,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SyncDataPacket {
    pub position: Point,
    pub velocity: Point,
    pub health: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FullResyncPacket {
    pub tick: u32,
    pub position: Point,
    pub velocity: Point,
    pub rotation: f32,
    pub health: f32,
    pub max_health: f32,
    pub inventory: InventoryState,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InitialPlayerData {
    pub session_id: u32,
    pub entity_id: u32,
    pub tick: u32,
    pub chunk_size: f32,
    pub world_width_chunks: u32,
    pub world_height_chunks: u32,
}

/// Packets sent by the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerPacket {
    InitialPlayerData(InitialPlayerData),
    GameData(GameDataPacket),
    SyncData(SyncDataPacket),
    FullResync(FullResyncPacket),
    Disconnected { reason: String },
}

impl ServerPacket {
    pub fn packet_type(&self) -> PacketType {
        match self {
            ServerPacket::InitialPlayerData(_) => PacketType::InitialPlayerData,
            ServerPacket::GameData(_) => PacketType::GameData,
            ServerPacket::SyncData(_) => PacketType::SyncData,
            ServerPacket::FullResync(_) => PacketType::FullResync,
            ServerPacket::Disconnected { .. } => PacketType::Disconnected,
        }
    }

    fn encoded_len(&self) -> usize {
        match self {
            ServerPacket::InitialPlayerData(_) => 24,
            ServerPacket::GameData(data) => data.encoded_len(),
            ServerPacket::SyncData(_) => 20,
            ServerPacket::FullResync(resync) => 32 + resync.inventory.encoded_len(),
            ServerPacket::Disconnected { reason } => string_field_size(reason),
        }
    }

    pub fn encode(&self) -> Result<Packet, CodecError> {
        let mut writer = PacketWriter::with_capacity(self.packet_type().tag(), self.encoded_len());
        match self {
            ServerPacket::InitialPlayerData(data) => {
                writer.write_u32(data.session_id);
                writer.write_u32(data.entity_id);
                writer.write_u32(data.tick);
                writer.write_f32(data.chunk_size);
                writer.write_u32(data.world_width_chunks);
                writer.write_u32(data.world_height_chunks);
            }
            ServerPacket::GameData(data) => data.write_to(&mut writer)?,
            ServerPacket::SyncData(sync) => {
                writer.write_point(sync.position);
                writer.write_point(sync.velocity);
                writer.write_f32(sync.health);
            }
            ServerPacket::FullResync(resync) => {
                writer.write_u32(resync.tick);
                writer.write_point(resync.position);
                writer.write_point(resync.velocity);
                writer.write_f32(resync.rotation);
                writer.write_f32(resync.health);
                writer.write_f32(resync.max_health);
                resync.inventory.write_to(&mut writer);
            }
            ServerPacket::Disconnected { reason } => writer.write_string(reason)?,
        }
        Ok(writer.finish())
    }

    pub fn decode(packet: &Packet) -> Result<Self, CodecError> {
        Self::decode_with_mask(packet, ComponentMask::ALL)
    }

    /// Decodes, materializing only the component payloads in `mask`.
    pub fn decode_with_mask(packet: &Packet, mask: ComponentMask) -> Result<Self, CodecError> {
        let mut reader = packet.reader();
        let decoded = match PacketType::from_tag(packet.tag())? {
            PacketType::InitialPlayerData => ServerPacket::InitialPlayerData(InitialPlayerData {
                session_id: reader.read_u32()?,
                entity_id: reader.read_u32()?,
                tick: reader.read_u32()?,
                chunk_size: reader.read_f32()?,
                world_width_chunks: reader.read_u32()?,
                world_height_chunks: reader.read_u32()?,
            }),
            PacketType::GameData => {
                ServerPacket::GameData(GameDataPacket::read_from(&mut reader, mask)?)
            }
            PacketType::SyncData => ServerPacket::SyncData(SyncDataPacket {
                position: reader.read_point()?,
                velocity: reader.read_point()?,
                health: reader.read_f32()?,
            }),
            PacketType::FullResync => ServerPacket::FullResync(FullResyncPacket {
                tick: reader.read_u32()?,
                position: reader.read_point()?,
                velocity: reader.read_point()?,
                rotation: reader.read_f32()?,
                health: reader.read_f32()?,
                max_health: reader.read_f32()?,
                inventory: InventoryState::read_from(&mut reader)?,
            }),
            PacketType::Disconnected => ServerPacket::Disconnected {
                reason: reader.read_string()?,
            },
            other => return Err(CodecError::UnknownPacketType(other.tag())),
        };
        Ok(decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{ComponentType, HealthPayload, ItemPayload};

    fn sample_input() -> InputPacket {
        InputPacket {
            sequence: 41,
            position: Point::new(10.0, 20.0),
            velocity: Point::new(1.5, -2.0),
            acceleration: Point::new(0.0, 300.0),
            rotation: 1.25,
            selected_slot: 2,
            main_action: LimbAction::Attack,
            offhand_action: LimbAction::Eat,
            interacting_entity_id: 0,
            debug_subscriptions: DebugSubscriptions(DebugSubscriptions::TICK_STATS),
            visible_chunks: ChunkRect::new(0, 0, 3, 2),
        }
    }

    fn sample_record() -> EntityRecord {
        EntityRecord {
            id: 9,
            entity_type: EntityType::Cow,
            position: Point::new(300.0, 310.0),
            velocity: Point::new(4.0, 0.0),
            rotation: 0.5,
            hitboxes: vec![
                Hitbox::circle(24.0, 2.0),
                Hitbox::rectangle(10.0, 6.0, 0.0).with_offset(Point::new(20.0, 0.0)),
            ],
            age_ticks: 77,
            collision_bit: 1,
            collision_mask: 3,
            components: vec![
                ComponentPayload::Health(HealthPayload {
                    health: 8.0,
                    max_health: 10.0,
                }),
                ComponentPayload::Item(ItemPayload {
                    item_type: 1,
                    amount: 4,
                }),
            ],
        }
    }

    #[test]
    fn test_client_packets_round_trip() {
        let packets = vec![
            ClientPacket::Activate { client_version: 1 },
            ClientPacket::Deactivate,
            ClientPacket::PlayerInput(sample_input()),
            ClientPacket::SyncRequest,
            ClientPacket::FullResyncRequest,
            ClientPacket::Command(crate::command::parse_command_line("give wood 3").unwrap()),
            ClientPacket::Disconnect,
        ];

        for packet in packets {
            let encoded = packet.encode().unwrap();
            assert_eq!(encoded.tag(), packet.packet_type().tag());
            assert_eq!(ClientPacket::decode(&encoded).unwrap(), packet);
        }
    }

    #[test]
    fn test_expand_saturates_at_extremes() {
        let rect = ChunkRect::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX).expand(1);
        assert_eq!(rect, ChunkRect::new(i32::MIN, i32::MIN, i32::MAX, i32::MAX));
        assert_eq!(rect.clamp(4, 3), ChunkRect::new(0, 0, 3, 2));
        assert_eq!(ChunkRect::single(2, 2).expand(1), ChunkRect::new(1, 1, 3, 3));
    }

    #[test]
    fn test_input_with_nan_is_not_finite() {
        assert!(sample_input().is_finite());
        let mut input = sample_input();
        input.acceleration = Point::new(f32::NAN, 0.0);
        assert!(!input.is_finite());
        let mut input = sample_input();
        input.rotation = f32::INFINITY;
        assert!(!input.is_finite());
    }

    #[test]
    fn test_game_data_encoded_len_is_exact() {
        let data = GameDataPacket {
            tick: 12,
            world_time: 0.6,
            last_processed_input: 41,
            player_entity_id: Some(9),
            entities: vec![sample_record()],
            inventory: Some(InventoryState {
                selected_slot: 1,
                slots: vec![
                    None,
                    Some(ItemStack {
                        item_type: ItemType::Wood,
                        amount: 3,
                    }),
                ],
            }),
            hits: vec![HitEvent {
                entity_id: 9,
                position: Point::new(300.0, 310.0),
                damage: 2.0,
            }],
            heals: vec![],
            deaths: vec![DeathEvent {
                entity_id: 4,
                position: Point::ZERO,
            }],
            completions: vec![ResearchCompleteEvent {
                tribe_id: 1,
                tech: TechType::Herding,
                position: Point::new(5.0, 5.0),
            }],
            tile_updates: vec![TileUpdate {
                tile_x: 3,
                tile_y: 4,
                tile_type: TileType::Dirt,
                is_wall: true,
            }],
            debug: DebugData {
                tick_stats: Some(TickStatsData {
                    tick_duration_ms: 1.5,
                    active_entities: 10,
                    sessions: 1,
                }),
                visible_chunks: None,
            },
        };

        let packet = ServerPacket::GameData(data.clone());
        let encoded = packet.encode().unwrap();
        assert_eq!(encoded.len(), 4 + data.encoded_len());
        assert_eq!(ServerPacket::decode(&encoded).unwrap(), packet);
    }

    #[test]
    fn test_decode_with_mask_drops_unwanted_components() {
        let data = GameDataPacket {
            entities: vec![sample_record()],
            ..Default::default()
        };
        let encoded = ServerPacket::GameData(data).encode().unwrap();

        let mask = ComponentMask::NONE.with(ComponentType::Item);
        match ServerPacket::decode_with_mask(&encoded, mask).unwrap() {
            ServerPacket::GameData(decoded) => {
                let record = &decoded.entities[0];
                assert_eq!(record.components.len(), 1);
                assert_eq!(record.components[0].component_type(), ComponentType::Item);
                assert_eq!(record.age_ticks, 77);
            }
            other => panic!("unexpected packet {:?}", other),
        }
    }

    #[test]
    fn test_wrong_direction_packet_is_rejected() {
        let encoded = ClientPacket::SyncRequest.encode().unwrap();
        assert_eq!(
            ServerPacket::decode(&encoded),
            Err(CodecError::UnknownPacketType(PacketType::SyncRequest.tag()))
        );

        let mut writer = PacketWriter::new(999);
        writer.write_u32(0);
        assert_eq!(
            ClientPacket::decode(&writer.finish()),
            Err(CodecError::UnknownPacketType(999))
        );
    }

    #[test]
    fn test_chunk_rect_expand_and_clamp() {
        let rect = ChunkRect::new(0, 2, 3, 5).expand(1).clamp(4, 6);
        assert_eq!(rect, ChunkRect::new(0, 1, 3, 5));
        assert_eq!(rect.chunk_count(), 20);
        assert_eq!(rect.chunks().count(), 20);
        assert!(rect.contains(3, 1));
        assert!(!rect.contains(4, 1));

        let outside = ChunkRect::new(10, 10, 12, 12).clamp(4, 4);
        assert!(outside.is_empty());
        assert_eq!(outside.chunks().count(), 0);
    }

    #[test]
    fn test_server_control_packets_round_trip() {
        let packets = vec![
            ServerPacket::InitialPlayerData(InitialPlayerData {
                session_id: 1,
                entity_id: 5,
                tick: 100,
                chunk_size: 256.0,
                world_width_chunks: 64,
                world_height_chunks: 64,
            }),
            ServerPacket::SyncData(SyncDataPacket {
                position: Point::new(1.0, 2.0),
                velocity: Point::ZERO,
                health: 20.0,
            }),
            ServerPacket::FullResync(FullResyncPacket {
                tick: 3,
                position: Point::new(1.0, 2.0),
                velocity: Point::new(3.0, 4.0),
                rotation: 0.1,
                health: 15.0,
                max_health: 20.0,
                inventory: InventoryState::default(),
            }),
            ServerPacket::Disconnected {
                reason: "Server full".to_string(),
            },
        ];

        for packet in packets {
            let encoded = packet.encode().unwrap();
            assert_eq!(encoded.len(), 4 + packet.encoded_len());
            assert_eq!(ServerPacket::decode(&encoded).unwrap(), packet);
        }
    }
}
