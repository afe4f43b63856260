//! Collision resolution. Candidates come from the board; every unordered
//! pair is resolved once per pass with a mass-weighted push-out. Hitboxes
//! with zero mass are immovable.

use crate::world::{EntityId, World};
use shared::geometry::{hitbox_overlap, Overlap, PlacedHitbox};
use shared::motion::clamp_to_world;
use shared::{Hitbox, Point};

/// Do two entities' collision bits and masks let them interact?
pub fn collides_with(bit_a: u32, mask_a: u32, bit_b: u32, mask_b: u32) -> bool {
    (bit_a & mask_b) != 0 || (bit_b & mask_a) != 0
}

fn inverse_mass(hitbox: &Hitbox) -> f32 {
    if hitbox.mass > 0.0 {
        1.0 / hitbox.mass
    } else {
        0.0
    }
}

struct Body {
    position: Point,
    velocity: Point,
    rotation: f32,
    hitboxes: Vec<Hitbox>,
}

fn body(world: &World, entity_id: EntityId) -> Option<(Body, u32, u32)> {
    let entity = world.entity(entity_id)?;
    Some((
        Body {
            position: entity.position,
            velocity: entity.velocity,
            rotation: entity.rotation,
            hitboxes: entity.hitboxes.clone(),
        },
        entity.collision_bit,
        entity.collision_mask,
    ))
}

/// Pushes `a` and `b` apart along the overlap normal, cancelling any
/// velocity that drives them further together.
fn separate(a: &mut Body, b: &mut Body, overlap: Overlap, inv_a: f32, inv_b: f32) {
    let total = inv_a + inv_b;
    let share_a = inv_a / total;
    let share_b = inv_b / total;

    a.position -= overlap.normal * (overlap.depth * share_a);
    b.position += overlap.normal * (overlap.depth * share_b);

    if inv_a > 0.0 {
        let into = a.velocity.dot(&overlap.normal);
        if into > 0.0 {
            a.velocity -= overlap.normal * into;
        }
    }
    if inv_b > 0.0 {
        let into = b.velocity.dot(&overlap.normal);
        if into < 0.0 {
            b.velocity -= overlap.normal * into;
        }
    }
}

/// Resolves one pair. Returns true if they overlapped.
fn resolve_pair(world: &mut World, a_id: EntityId, b_id: EntityId) -> bool {
    let (Some((mut a, bit_a, mask_a)), Some((mut b, bit_b, mask_b))) = (body(world, a_id), body(world, b_id)) else {
        return false;
    };
    if !collides_with(bit_a, mask_a, bit_b, mask_b) {
        return false;
    }

    let mut collided = false;
    for ha in a.hitboxes.clone() {
        for hb in b.hitboxes.clone() {
            let (inv_a, inv_b) = (inverse_mass(&ha), inverse_mass(&hb));
            if inv_a + inv_b == 0.0 {
                continue;
            }
            let overlap = hitbox_overlap(
                PlacedHitbox::new(&ha, a.position, a.rotation),
                PlacedHitbox::new(&hb, b.position, b.rotation),
            );
            if let Some(overlap) = overlap {
                separate(&mut a, &mut b, overlap, inv_a, inv_b);
                collided = true;
            }
        }
    }

    if collided {
        let width = world.config().world_width();
        let height = world.config().world_height();
        for (entity_id, moved) in [(a_id, a), (b_id, b)] {
            if let Some(entity) = world.entity_mut(entity_id) {
                entity.position = clamp_to_world(moved.position, width, height);
                entity.velocity = moved.velocity;
            }
        }
    }
    collided
}

/// Resolves every overlapping pair of active entities. Returns the number
/// of pairs that were pushed apart.
pub fn resolve_collisions(world: &mut World) -> usize {
    let mut resolved = 0;
    for entity_id in world.active_entity_ids() {
        let Some(range) = world.entity(entity_id).and_then(|entity| entity.chunk_range()) else {
            continue;
        };
        for other_id in world.board.entities_in_range(range) {
            if other_id <= entity_id || !world.is_active(other_id) {
                continue;
            }
            if resolve_pair(world, entity_id, other_id) {
                resolved += 1;
            }
        }
    }
    resolved
}
