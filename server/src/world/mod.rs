//! The simulated world: entities, their components, the chunk board, tiles
//! and tribe aggregates, owned together so every subsystem receives the
//! whole world by reference.
//!
//! Structural changes are buffered. [`World::create_entity`] stages a new
//! entity and [`World::remove_entity`] only flags one; both take effect at
//! [`World::push_join_buffer`] and [`World::remove_flagged_entities`], which
//! the tick runs at fixed points. Between those points every query sees a
//! stable world.

pub mod board;
pub mod component_array;
pub mod components;
pub mod events;
pub mod tiles;
pub mod tribes;

use crate::config::WorldConfig;
use crate::content::entity_types::{construct_components, entity_info, SpawnParams};
use board::Board;
use component_array::HookContext;
use components::Components;
use events::WorldEvent;
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::SeedableRng;
use shared::geometry::entity_bounds;
use shared::protocol::{DeathEvent, HealEvent, HitEvent, ResearchCompleteEvent};
use shared::{Biome, Bounds, ChunkRect, EntityType, Hitbox, Point, TechType, TileType};
use std::collections::{BTreeMap, HashMap};
use tiles::TileGrid;
use tribes::{TribeId, Tribes};

pub type EntityId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    /// Created this tick, not yet on the board.
    Staged,
    Active,
    /// Still queryable until the next removal flush.
    FlaggedForRemoval,
}

#[derive(Debug, Clone)]
pub struct Entity {
    pub id: EntityId,
    pub entity_type: EntityType,
    pub position: Point,
    pub velocity: Point,
    pub acceleration: Point,
    pub rotation: f32,
    pub hitboxes: Vec<Hitbox>,
    pub collision_bit: u32,
    pub collision_mask: u32,
    pub age_ticks: u32,
    pub state: EntityState,
    /// Chunks the board currently files this entity under.
    chunk_range: Option<ChunkRect>,
}

impl Entity {
    pub fn bounds(&self) -> Option<Bounds> {
        entity_bounds(self.position, self.rotation, &self.hitboxes)
    }

    pub fn chunk_range(&self) -> Option<ChunkRect> {
        self.chunk_range
    }

    pub fn is_active(&self) -> bool {
        self.state == EntityState::Active
    }
}

pub struct World {
    config: WorldConfig,
    entities: Vec<Entity>,
    index: HashMap<EntityId, usize>,
    next_entity_id: EntityId,
    join_buffer: Vec<EntityId>,
    removal_buffer: Vec<EntityId>,
    pub components: Components,
    pub board: Board,
    pub tiles: TileGrid,
    pub tribes: Tribes,
    census: BTreeMap<EntityType, u32>,
    events: Vec<WorldEvent>,
    rng: StdRng,
    tick: u32,
    world_time: f32,
}

fn generate_tiles(config: &WorldConfig, rng: &mut StdRng) -> TileGrid {
    let width = (config.world_width() / config.tile_size).ceil() as u32;
    let height = (config.world_height() / config.tile_size).ceil() as u32;
    TileGrid::generate(width, height, config.tile_size, rng)
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        let mut rng = StdRng::seed_from_u64(config.seed);
        let tiles = generate_tiles(&config, &mut rng);
        let board = Board::new(config.chunk_size, config.width_chunks, config.height_chunks);
        Self {
            config,
            entities: Vec::new(),
            index: HashMap::new(),
            next_entity_id: 1,
            join_buffer: Vec::new(),
            removal_buffer: Vec::new(),
            components: Components::new(),
            board,
            tiles,
            tribes: Tribes::new(),
            census: BTreeMap::new(),
            events: Vec::new(),
            rng,
            tick: 0,
            world_time: 0.0,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Allocates an id and stages the entity with every component its type
    /// declares. Nothing can see it until the next join flush.
    pub fn create_entity(
        &mut self,
        entity_type: EntityType,
        position: Point,
        rotation: f32,
        params: SpawnParams,
    ) -> EntityId {
        let id = self.next_entity_id;
        self.next_entity_id += 1;

        let info = entity_info(entity_type);
        construct_components(&mut self.components, id, info, &params);

        self.index.insert(id, self.entities.len());
        self.entities.push(Entity {
            id,
            entity_type,
            position,
            velocity: params.velocity,
            acceleration: Point::ZERO,
            rotation,
            hitboxes: info.hitboxes.to_vec(),
            collision_bit: info.collision_bit,
            collision_mask: info.collision_mask,
            age_ticks: 0,
            state: EntityState::Staged,
            chunk_range: None,
        });
        self.join_buffer.push(id);
        *self.census.entry(entity_type).or_default() += 1;
        id
    }

    /// Flags an entity for removal at the next removal flush. Returns false
    /// if it does not exist or is already flagged.
    pub fn remove_entity(&mut self, entity_id: EntityId) -> bool {
        let Some(&slot) = self.index.get(&entity_id) else {
            return false;
        };
        let entity = &mut self.entities[slot];
        if entity.state == EntityState::FlaggedForRemoval {
            return false;
        }
        entity.state = EntityState::FlaggedForRemoval;
        self.removal_buffer.push(entity_id);
        true
    }

    /// Puts every staged entity on the board and moves staged components
    /// into their arrays.
    pub fn push_join_buffer(&mut self) {
        for entity_id in std::mem::take(&mut self.join_buffer) {
            let Some(&slot) = self.index.get(&entity_id) else {
                continue;
            };
            let entity = &mut self.entities[slot];
            if entity.state == EntityState::Staged {
                entity.state = EntityState::Active;
            }
            let range = entity_bounds(entity.position, entity.rotation, &entity.hitboxes)
                .map(|bounds| self.board.chunk_range(&bounds));
            self.board.update_chunks(entity_id, None, range);
            entity.chunk_range = range;
        }

        let mut ctx = HookContext {
            tribes: &mut self.tribes,
        };
        self.components.push_join_buffer(&mut ctx);
    }

    /// Evicts every flagged entity from the board and its component arrays,
    /// running the removal hooks.
    pub fn remove_flagged_entities(&mut self) {
        let removals = std::mem::take(&mut self.removal_buffer);
        if removals.is_empty() {
            return;
        }
        let mut ctx = HookContext {
            tribes: &mut self.tribes,
        };
        for entity_id in removals {
            let Some(slot) = self.index.remove(&entity_id) else {
                continue;
            };
            let entity = self.entities.swap_remove(slot);
            if let Some(moved) = self.entities.get(slot) {
                self.index.insert(moved.id, slot);
            }

            self.board.update_chunks(entity_id, entity.chunk_range, None);
            for &component_type in entity_info(entity.entity_type).components {
                self.components
                    .store_mut(component_type)
                    .remove_component(entity_id, &mut ctx);
            }
            if let Some(count) = self.census.get_mut(&entity.entity_type) {
                *count = count.saturating_sub(1);
            }
            debug!("Removed entity {} ({:?})", entity_id, entity.entity_type);
        }
    }

    /// Re-files every joined entity whose hitbox bounds moved into other chunks.
    pub fn sync_chunks(&mut self) {
        for entity in &mut self.entities {
            if entity.state == EntityState::Staged {
                continue;
            }
            let range = entity_bounds(entity.position, entity.rotation, &entity.hitboxes)
                .map(|bounds| self.board.chunk_range(&bounds));
            if range != entity.chunk_range {
                self.board.update_chunks(entity.id, entity.chunk_range, range);
                entity.chunk_range = range;
            }
        }
    }

    pub fn entity(&self, entity_id: EntityId) -> Option<&Entity> {
        self.index.get(&entity_id).map(|&slot| &self.entities[slot])
    }

    pub fn entity_mut(&mut self, entity_id: EntityId) -> Option<&mut Entity> {
        self.index
            .get(&entity_id)
            .map(|&slot| &mut self.entities[slot])
    }

    /// True for entities that have joined and are not flagged.
    pub fn is_active(&self, entity_id: EntityId) -> bool {
        self.entity(entity_id).is_some_and(Entity::is_active)
    }

    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.iter()
    }

    /// Ids of the entities that may act this tick.
    pub fn active_entity_ids(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|entity| entity.is_active())
            .map(|entity| entity.id)
            .collect()
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn staged_count(&self) -> usize {
        self.join_buffer.len()
    }

    pub fn census_count(&self, entity_type: EntityType) -> u32 {
        self.census.get(&entity_type).copied().unwrap_or(0)
    }

    /// Lowers an entity's health. Returns false if it has no health.
    pub fn damage_entity(&mut self, entity_id: EntityId, amount: f32) -> bool {
        let Some(position) = self.entity(entity_id).map(|entity| entity.position) else {
            return false;
        };
        if !self.components.health.has_component(entity_id) {
            return false;
        }
        let health = self.components.health.get_component_mut(entity_id);
        health.health -= amount;
        health.ticks_since_damage = 0;
        self.register_entity_hit(entity_id, position, amount);
        true
    }

    /// Raises an entity's health up to its maximum. Returns false if it has
    /// no health.
    pub fn heal_entity(&mut self, entity_id: EntityId, amount: f32) -> bool {
        let Some(position) = self.entity(entity_id).map(|entity| entity.position) else {
            return false;
        };
        if !self.components.health.has_component(entity_id) {
            return false;
        }
        let health = self.components.health.get_component_mut(entity_id);
        health.health = (health.health + amount).min(health.max_health);
        self.register_entity_heal(entity_id, position, amount);
        true
    }

    pub fn register_entity_hit(&mut self, entity_id: EntityId, position: Point, damage: f32) {
        self.events.push(WorldEvent::Hit(HitEvent {
            entity_id,
            position,
            damage,
        }));
    }

    pub fn register_entity_heal(&mut self, entity_id: EntityId, position: Point, amount: f32) {
        self.events.push(WorldEvent::Heal(HealEvent {
            entity_id,
            position,
            amount,
        }));
    }

    pub fn register_entity_death(&mut self, entity_id: EntityId, position: Point) {
        self.events.push(WorldEvent::Death(DeathEvent {
            entity_id,
            position,
        }));
    }

    pub fn register_research_complete(&mut self, tribe_id: TribeId, tech: TechType, position: Point) {
        self.events
            .push(WorldEvent::ResearchComplete(ResearchCompleteEvent {
                tribe_id,
                tech,
                position,
            }));
    }

    /// Changes a tile and queues the update. Returns false outside the grid.
    pub fn set_tile(&mut self, tile_x: u32, tile_y: u32, tile_type: TileType, is_wall: bool) -> bool {
        let Some(update) = self.tiles.set_tile(tile_x, tile_y, tile_type, is_wall) else {
            return false;
        };
        let origin = self.tiles.tile_center(tile_x, tile_y);
        self.events.push(WorldEvent::TileUpdate { update, origin });
        true
    }

    pub fn take_events(&mut self) -> Vec<WorldEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn rng_mut(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    /// Center of a random open tile in `biome`, or `None` if the biome has none.
    pub fn random_position_in_biome(&mut self, biome: Biome) -> Option<Point> {
        let (x, y) = self.tiles.random_tile_in_biome(biome, &mut self.rng)?;
        Some(self.tiles.tile_center(x, y))
    }

    /// Center of a random tile of `tile_type`, or `None` if there is none.
    pub fn random_position_on_tile(&mut self, tile_type: TileType) -> Option<Point> {
        let (x, y) = self.tiles.random_tile_of_type(tile_type, &mut self.rng)?;
        Some(self.tiles.tile_center(x, y))
    }

    /// Tribe of an entity, if it belongs to one.
    pub fn tribe_of(&self, entity_id: EntityId) -> Option<TribeId> {
        if self.components.tribe_member.has_component(entity_id) {
            Some(self.components.tribe_member.get_component(entity_id).tribe_id)
        } else {
            None
        }
    }

    /// Where a tribe is announced: its totem, else its first member.
    fn tribe_position(&self, tribe_id: TribeId) -> Option<Point> {
        let mut fallback = None;
        for (entity_id, member) in self.components.tribe_member.iter() {
            if member.tribe_id != tribe_id {
                continue;
            }
            let Some(entity) = self.entity(entity_id) else {
                continue;
            };
            if entity.entity_type == EntityType::Totem {
                return Some(entity.position);
            }
            fallback.get_or_insert(entity.position);
        }
        fallback
    }

    /// Advances tribe research and announces completions.
    pub fn update_tribes(&mut self) {
        for completion in self.tribes.advance_research() {
            debug!(
                "Tribe {} finished researching {:?}",
                completion.tribe_id, completion.tech
            );
            match self.tribe_position(completion.tribe_id) {
                Some(position) => {
                    self.register_research_complete(completion.tribe_id, completion.tech, position)
                }
                None => warn!(
                    "Tribe {} has no member in the world, not announcing {:?}",
                    completion.tribe_id, completion.tech
                ),
            }
        }
    }

    pub fn tick(&self) -> u32 {
        self.tick
    }

    pub fn world_time(&self) -> f32 {
        self.world_time
    }

    pub fn advance_clock(&mut self) {
        self.tick += 1;
        self.world_time += self.config.tick_dt();
    }

    /// Drops all state and regenerates the world from the configured seed.
    pub fn reset(&mut self) {
        self.entities.clear();
        self.index.clear();
        self.next_entity_id = 1;
        self.join_buffer.clear();
        self.removal_buffer.clear();
        self.components.clear();
        self.board.clear();
        self.tribes.clear();
        self.census.clear();
        self.events.clear();
        self.rng = StdRng::seed_from_u64(self.config.seed);
        self.tiles = generate_tiles(&self.config, &mut self.rng);
        self.tick = 0;
        self.world_time = 0.0;
    }
}
