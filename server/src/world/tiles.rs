//! Tile grid with a running census by tile type and biome.
//!
//! Tiles are generated once when the world is built and afterwards only
//! change type or wall flag in place. The census lets the spawn pass and
//! biome teleports ask "how many / pick one" without scanning the grid.

use rand::rngs::StdRng;
use rand::Rng;
use shared::protocol::TileUpdate;
use shared::{Biome, Point, TileType};
use std::collections::HashMap;

/// Tiles per biome region edge during generation.
const REGION_TILES: u32 = 8;
const SAMPLE_ATTEMPTS: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    pub tile_type: TileType,
    pub biome: Biome,
    pub is_wall: bool,
    /// Direction water pushes entities standing on it.
    pub flow: Point,
}

#[derive(Debug)]
pub struct TileGrid {
    tile_size: f32,
    width: u32,
    height: u32,
    tiles: Vec<Tile>,
    type_census: HashMap<TileType, u32>,
    biome_tiles: HashMap<Biome, Vec<u32>>,
}

fn default_tile(biome: Biome, rng: &mut StdRng) -> Tile {
    let (tile_type, is_wall) = match biome {
        Biome::Grassland => {
            if rng.gen_bool(0.1) {
                (TileType::Dirt, false)
            } else {
                (TileType::Grass, false)
            }
        }
        Biome::Tundra => (TileType::Snow, false),
        Biome::Desert => (TileType::Sand, false),
        Biome::River => (TileType::Water, false),
        Biome::Mountains => (TileType::Rock, rng.gen_bool(0.15)),
    };
    let flow = if biome == Biome::River {
        Point::new(0.0, 30.0)
    } else {
        Point::ZERO
    };
    Tile {
        tile_type,
        biome,
        is_wall,
        flow,
    }
}

impl TileGrid {
    /// Generates a `width` x `height` grid. Biomes are chosen per square
    /// region so neighbouring tiles share terrain.
    pub fn generate(width: u32, height: u32, tile_size: f32, rng: &mut StdRng) -> Self {
        let regions_x = width.div_ceil(REGION_TILES);
        let regions_y = height.div_ceil(REGION_TILES);
        let region_biomes: Vec<Biome> = (0..regions_x * regions_y)
            .map(|_| Biome::ALL[rng.gen_range(0..Biome::ALL.len())])
            .collect();

        let mut grid = Self {
            tile_size,
            width,
            height,
            tiles: Vec::with_capacity((width * height) as usize),
            type_census: HashMap::new(),
            biome_tiles: HashMap::new(),
        };

        for y in 0..height {
            for x in 0..width {
                let region = (y / REGION_TILES) * regions_x + x / REGION_TILES;
                let tile = default_tile(region_biomes[region as usize], rng);
                *grid.type_census.entry(tile.tile_type).or_default() += 1;
                grid.biome_tiles
                    .entry(tile.biome)
                    .or_default()
                    .push(y * width + x);
                grid.tiles.push(tile);
            }
        }
        grid
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> Option<&Tile> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles.get((y * self.width + x) as usize)
    }

    /// Tile under a world position.
    pub fn tile_at(&self, position: Point) -> Option<&Tile> {
        if position.x < 0.0 || position.y < 0.0 {
            return None;
        }
        self.get(
            (position.x / self.tile_size) as u32,
            (position.y / self.tile_size) as u32,
        )
    }

    /// World position of a tile's center.
    pub fn tile_center(&self, x: u32, y: u32) -> Point {
        Point::new(
            (x as f32 + 0.5) * self.tile_size,
            (y as f32 + 0.5) * self.tile_size,
        )
    }

    pub fn count_of_type(&self, tile_type: TileType) -> u32 {
        self.type_census.get(&tile_type).copied().unwrap_or(0)
    }

    pub fn count_in_biome(&self, biome: Biome) -> u32 {
        self.biome_tiles.get(&biome).map_or(0, |tiles| tiles.len() as u32)
    }

    /// Changes a tile in place, keeping the census current. Returns the
    /// update to broadcast, or `None` if the tile is outside the grid.
    pub fn set_tile(&mut self, x: u32, y: u32, tile_type: TileType, is_wall: bool) -> Option<TileUpdate> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let tile = &mut self.tiles[(y * self.width + x) as usize];
        if tile.tile_type != tile_type {
            if let Some(count) = self.type_census.get_mut(&tile.tile_type) {
                *count -= 1;
            }
            *self.type_census.entry(tile_type).or_default() += 1;
        }
        tile.tile_type = tile_type;
        tile.is_wall = is_wall;
        Some(TileUpdate {
            tile_x: x,
            tile_y: y,
            tile_type,
            is_wall,
        })
    }

    /// A uniformly chosen tile of `tile_type`, or `None` if the census has none.
    pub fn random_tile_of_type(&self, tile_type: TileType, rng: &mut StdRng) -> Option<(u32, u32)> {
        let count = self.count_of_type(tile_type);
        if count == 0 {
            return None;
        }
        for _ in 0..SAMPLE_ATTEMPTS {
            let index = rng.gen_range(0..self.tiles.len());
            if self.tiles[index].tile_type == tile_type {
                return Some(self.coords(index as u32));
            }
        }
        let nth = rng.gen_range(0..count as usize);
        self.tiles
            .iter()
            .enumerate()
            .filter(|(_, tile)| tile.tile_type == tile_type)
            .nth(nth)
            .map(|(index, _)| self.coords(index as u32))
    }

    /// A uniformly chosen non-wall tile in `biome`, or `None` if there is none.
    pub fn random_tile_in_biome(&self, biome: Biome, rng: &mut StdRng) -> Option<(u32, u32)> {
        let candidates = self.biome_tiles.get(&biome)?;
        let open: Vec<u32> = candidates
            .iter()
            .copied()
            .filter(|&index| !self.tiles[index as usize].is_wall)
            .collect();
        if open.is_empty() {
            return None;
        }
        Some(self.coords(open[rng.gen_range(0..open.len())]))
    }

    fn coords(&self, index: u32) -> (u32, u32) {
        (index % self.width, index / self.width)
    }
}
