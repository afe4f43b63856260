//! Uniform chunk grid used for every proximity query: visibility, collision
//! candidates, melee reach and pickup.
//!
//! Each chunk holds the ids of the entities whose hitbox bounds overlap it,
//! so an entity may sit in several chunks at once.

use crate::world::EntityId;
use shared::{Bounds, ChunkRect, Point};
use std::collections::BTreeSet;

#[derive(Debug)]
pub struct Board {
    chunk_size: f32,
    width: u32,
    height: u32,
    chunks: Vec<BTreeSet<EntityId>>,
}

impl Board {
    pub fn new(chunk_size: f32, width: u32, height: u32) -> Self {
        assert!(chunk_size > 0.0, "chunk size must be positive");
        assert!(width > 0 && height > 0, "board must have at least one chunk");
        Self {
            chunk_size,
            width,
            height,
            chunks: vec![BTreeSet::new(); (width * height) as usize],
        }
    }

    pub fn chunk_size(&self) -> f32 {
        self.chunk_size
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// Rectangle covering the whole board.
    pub fn full_rect(&self) -> ChunkRect {
        ChunkRect::new(0, 0, self.width as i32 - 1, self.height as i32 - 1)
    }

    fn axis_coord(&self, value: f32, limit: u32) -> i32 {
        ((value / self.chunk_size).floor() as i32).clamp(0, limit as i32 - 1)
    }

    /// Chunk containing a world position, clamped to the board.
    pub fn chunk_at(&self, position: Point) -> (i32, i32) {
        (
            self.axis_coord(position.x, self.width),
            self.axis_coord(position.y, self.height),
        )
    }

    /// Chunks overlapped by a world-space rectangle, clamped to the board.
    pub fn chunk_range(&self, bounds: &Bounds) -> ChunkRect {
        ChunkRect::new(
            self.axis_coord(bounds.min_x, self.width),
            self.axis_coord(bounds.min_y, self.height),
            self.axis_coord(bounds.max_x, self.width),
            self.axis_coord(bounds.max_y, self.height),
        )
    }

    fn slot(&self, x: i32, y: i32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// Moves `entity_id` from the chunks of `old` to the chunks of `new`,
    /// touching only the chunks that differ.
    pub fn update_chunks(
        &mut self,
        entity_id: EntityId,
        old: Option<ChunkRect>,
        new: Option<ChunkRect>,
    ) {
        if old == new {
            return;
        }
        if let Some(old) = old {
            for (x, y) in old.chunks() {
                if new.map_or(true, |new| !new.contains(x, y)) {
                    let slot = self.slot(x, y);
                    self.chunks[slot].remove(&entity_id);
                }
            }
        }
        if let Some(new) = new {
            for (x, y) in new.chunks() {
                if old.map_or(true, |old| !old.contains(x, y)) {
                    let slot = self.slot(x, y);
                    self.chunks[slot].insert(entity_id);
                }
            }
        }
    }

    pub fn chunk(&self, x: i32, y: i32) -> Option<&BTreeSet<EntityId>> {
        if x < 0 || y < 0 || x >= self.width as i32 || y >= self.height as i32 {
            return None;
        }
        Some(&self.chunks[self.slot(x, y)])
    }

    /// Every entity overlapping any chunk in `rect`, each id once, ascending.
    pub fn entities_in_range(&self, rect: ChunkRect) -> Vec<EntityId> {
        let rect = rect.clamp(self.width, self.height);
        let mut found = BTreeSet::new();
        for (x, y) in rect.chunks() {
            found.extend(self.chunks[self.slot(x, y)].iter().copied());
        }
        found.into_iter().collect()
    }

    /// Chunks currently holding `entity_id`. Scans the whole board.
    pub fn chunks_containing(&self, entity_id: EntityId) -> Vec<(i32, i32)> {
        self.full_rect()
            .chunks()
            .filter(|&(x, y)| self.chunks[self.slot(x, y)].contains(&entity_id))
            .collect()
    }

    /// Total number of chunk memberships, counting multi-chunk entities once per chunk.
    pub fn membership_count(&self) -> usize {
        self.chunks.iter().map(BTreeSet::len).sum()
    }

    pub fn clear(&mut self) {
        for chunk in &mut self.chunks {
            chunk.clear();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunk_coordinates_floor_and_clamp() {
        let board = Board::new(100.0, 10, 10);
        assert_eq!(board.chunk_at(Point::new(0.0, 0.0)), (0, 0));
        assert_eq!(board.chunk_at(Point::new(99.9, 100.0)), (0, 1));
        assert_eq!(board.chunk_at(Point::new(-20.0, 5000.0)), (0, 9));
    }

    #[test]
    fn test_update_chunks_moves_membership() {
        let mut board = Board::new(100.0, 10, 10);
        let old = ChunkRect::new(0, 0, 1, 1);
        board.update_chunks(7, None, Some(old));
        assert_eq!(board.membership_count(), 4);

        let new = ChunkRect::new(1, 1, 2, 1);
        board.update_chunks(7, Some(old), Some(new));
        assert_eq!(board.chunks_containing(7), vec![(1, 1), (2, 1)]);

        board.update_chunks(7, Some(new), None);
        assert_eq!(board.membership_count(), 0);
    }

    #[test]
    fn test_range_query_deduplicates() {
        let mut board = Board::new(100.0, 10, 10);
        board.update_chunks(3, None, Some(ChunkRect::new(2, 2, 4, 4)));
        board.update_chunks(1, None, Some(ChunkRect::single(3, 3)));

        let found = board.entities_in_range(ChunkRect::new(0, 0, 9, 9));
        assert_eq!(found, vec![1, 3]);
        assert!(board.entities_in_range(ChunkRect::single(5, 5)).is_empty());
    }

    #[test]
    fn test_range_outside_board_is_empty() {
        let mut board = Board::new(100.0, 4, 4);
        board.update_chunks(1, None, Some(ChunkRect::single(0, 0)));
        assert!(board.entities_in_range(ChunkRect::new(10, 10, 12, 12)).is_empty());
        assert_eq!(board.entities_in_range(ChunkRect::new(-3, -3, 0, 0)), vec![1]);
    }

    #[test]
    fn test_chunk_range_of_bounds() {
        let board = Board::new(100.0, 10, 10);
        let bounds = Bounds::around(Point::new(100.0, 50.0), 20.0, 20.0);
        assert_eq!(board.chunk_range(&bounds), ChunkRect::new(0, 0, 1, 0));
    }
}
