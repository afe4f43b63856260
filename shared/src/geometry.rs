//! Hitbox shapes, axis-aligned bounds and narrow-phase overlap tests.
//!
//! Circular hitboxes rotate their local offset with the owning entity.
//! Rectangular hitboxes also have their offset rotated but stay axis-aligned,
//! which keeps bounds and overlap tests cheap and symmetric.

use crate::math::Point;

const EPSILON: f32 = 0.0001;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum HitboxShape {
    Circle { radius: f32 },
    Rectangle { width: f32, height: f32 },
}

/// One collision volume attached to an entity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hitbox {
    pub shape: HitboxShape,
    /// Offset from the entity position, in the entity's local (unrotated) frame.
    pub offset: Point,
    /// Mass used for collision push-out. Zero means immovable.
    pub mass: f32,
}

impl Hitbox {
    pub const fn circle(radius: f32, mass: f32) -> Self {
        Self {
            shape: HitboxShape::Circle { radius },
            offset: Point::ZERO,
            mass,
        }
    }

    pub const fn rectangle(width: f32, height: f32, mass: f32) -> Self {
        Self {
            shape: HitboxShape::Rectangle { width, height },
            offset: Point::ZERO,
            mass,
        }
    }

    pub const fn with_offset(mut self, offset: Point) -> Self {
        self.offset = offset;
        self
    }

    /// World-space center of the hitbox for an entity at `position` facing `rotation`.
    pub fn world_center(&self, position: Point, rotation: f32) -> Point {
        position + self.offset.rotate(rotation)
    }

    pub fn bounds(&self, position: Point, rotation: f32) -> Bounds {
        let center = self.world_center(position, rotation);
        let (half_w, half_h) = self.half_extents();
        Bounds {
            min_x: center.x - half_w,
            min_y: center.y - half_h,
            max_x: center.x + half_w,
            max_y: center.y + half_h,
        }
    }

    fn half_extents(&self) -> (f32, f32) {
        match self.shape {
            HitboxShape::Circle { radius } => (radius, radius),
            HitboxShape::Rectangle { width, height } => (width / 2.0, height / 2.0),
        }
    }
}

/// Axis-aligned rectangle in world units. Edges are inclusive.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min_x: f32,
    pub min_y: f32,
    pub max_x: f32,
    pub max_y: f32,
}

impl Bounds {
    pub fn around(center: Point, half_width: f32, half_height: f32) -> Self {
        Self {
            min_x: center.x - half_width,
            min_y: center.y - half_height,
            max_x: center.x + half_width,
            max_y: center.y + half_height,
        }
    }

    pub fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            min_x: self.min_x.min(other.min_x),
            min_y: self.min_y.min(other.min_y),
            max_x: self.max_x.max(other.max_x),
            max_y: self.max_y.max(other.max_y),
        }
    }

    pub fn intersects(&self, other: &Bounds) -> bool {
        !(self.max_x < other.min_x
            || other.max_x < self.min_x
            || self.max_y < other.min_y
            || other.max_y < self.min_y)
    }

    pub fn contains_point(&self, point: Point) -> bool {
        point.x >= self.min_x && point.x <= self.max_x && point.y >= self.min_y && point.y <= self.max_y
    }

    pub fn center(&self) -> Point {
        Point::new(
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        )
    }
}

/// Combined bounds of every hitbox on an entity, or `None` for an entity without hitboxes.
pub fn entity_bounds(position: Point, rotation: f32, hitboxes: &[Hitbox]) -> Option<Bounds> {
    hitboxes
        .iter()
        .map(|hitbox| hitbox.bounds(position, rotation))
        .reduce(|acc, b| acc.union(&b))
}

/// Penetration between two hitboxes. `normal` points from the first hitbox towards the second.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Overlap {
    pub normal: Point,
    pub depth: f32,
}

/// A hitbox placed in the world.
#[derive(Debug, Clone, Copy)]
pub struct PlacedHitbox<'a> {
    pub hitbox: &'a Hitbox,
    pub position: Point,
    pub rotation: f32,
}

impl<'a> PlacedHitbox<'a> {
    pub fn new(hitbox: &'a Hitbox, position: Point, rotation: f32) -> Self {
        Self {
            hitbox,
            position,
            rotation,
        }
    }

    fn center(&self) -> Point {
        self.hitbox.world_center(self.position, self.rotation)
    }

    fn bounds(&self) -> Bounds {
        self.hitbox.bounds(self.position, self.rotation)
    }
}

pub fn hitbox_overlap(a: PlacedHitbox<'_>, b: PlacedHitbox<'_>) -> Option<Overlap> {
    match (a.hitbox.shape, b.hitbox.shape) {
        (HitboxShape::Circle { radius: ra }, HitboxShape::Circle { radius: rb }) => {
            circle_circle(a.center(), ra, b.center(), rb)
        }
        (HitboxShape::Circle { radius }, HitboxShape::Rectangle { .. }) => {
            circle_rect(a.center(), radius, &b.bounds())
        }
        (HitboxShape::Rectangle { .. }, HitboxShape::Circle { radius }) => {
            circle_rect(b.center(), radius, &a.bounds()).map(|overlap| Overlap {
                normal: overlap.normal.scale(-1.0),
                depth: overlap.depth,
            })
        }
        (HitboxShape::Rectangle { .. }, HitboxShape::Rectangle { .. }) => {
            rect_rect(&a.bounds(), &b.bounds())
        }
    }
}

/// Does a circle at `center` touch the hitbox?
pub fn circle_touches(center: Point, radius: f32, other: PlacedHitbox<'_>) -> bool {
    let probe = Hitbox::circle(radius, 0.0);
    hitbox_overlap(PlacedHitbox::new(&probe, center, 0.0), other).is_some()
}

fn circle_circle(ca: Point, ra: f32, cb: Point, rb: f32) -> Option<Overlap> {
    let delta = cb - ca;
    let distance = delta.magnitude();
    let depth = ra + rb - distance;
    if depth <= 0.0 {
        return None;
    }

    // Coincident centers push along +x so the pair still separates
    let normal = if distance < EPSILON {
        Point::new(1.0, 0.0)
    } else {
        delta.scale(1.0 / distance)
    };
    Some(Overlap { normal, depth })
}

fn circle_rect(center: Point, radius: f32, rect: &Bounds) -> Option<Overlap> {
    let closest = Point::new(
        center.x.clamp(rect.min_x, rect.max_x),
        center.y.clamp(rect.min_y, rect.max_y),
    );
    let delta = closest - center;
    let distance = delta.magnitude();

    if distance >= EPSILON {
        let depth = radius - distance;
        if depth <= 0.0 {
            return None;
        }
        return Some(Overlap {
            normal: delta.scale(1.0 / distance),
            depth,
        });
    }

    // Center inside the rectangle: treat the circle as its bounding box
    rect_rect(&Bounds::around(center, radius, radius), rect)
}

fn rect_rect(a: &Bounds, b: &Bounds) -> Option<Overlap> {
    let overlap_x = a.max_x.min(b.max_x) - a.min_x.max(b.min_x);
    let overlap_y = a.max_y.min(b.max_y) - a.min_y.max(b.min_y);
    if overlap_x <= 0.0 || overlap_y <= 0.0 {
        return None;
    }

    let direction = b.center() - a.center();
    if overlap_x < overlap_y {
        let sign = if direction.x < 0.0 { -1.0 } else { 1.0 };
        Some(Overlap {
            normal: Point::new(sign, 0.0),
            depth: overlap_x,
        })
    } else {
        let sign = if direction.y < 0.0 { -1.0 } else { 1.0 };
        Some(Overlap {
            normal: Point::new(0.0, sign),
            depth: overlap_y,
        })
    }
}
