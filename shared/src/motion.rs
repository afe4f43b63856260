//! Movement integration shared by the server's movement system and the
//! client's prediction, so both sides step the same way.

use crate::math::Point;

/// Parameters of one entity's motion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotionParams {
    /// Fraction of velocity kept per second when no acceleration is applied.
    pub friction: f32,
    pub max_speed: f32,
    pub max_acceleration: f32,
}

pub const PLAYER_MOTION: MotionParams = MotionParams {
    friction: 0.02,
    max_speed: 400.0,
    max_acceleration: 1600.0,
};

pub const ANIMAL_MOTION: MotionParams = MotionParams {
    friction: 0.05,
    max_speed: 150.0,
    max_acceleration: 600.0,
};

/// Limits `acceleration` to the entity's maximum magnitude.
pub fn clamp_acceleration(acceleration: Point, params: &MotionParams) -> Point {
    if acceleration.magnitude() > params.max_acceleration {
        acceleration.normalize() * params.max_acceleration
    } else {
        acceleration
    }
}

/// Advances velocity then position by `dt` seconds.
pub fn integrate(
    position: &mut Point,
    velocity: &mut Point,
    acceleration: Point,
    params: &MotionParams,
    dt: f32,
) {
    let acceleration = clamp_acceleration(acceleration, params);
    *velocity += acceleration * dt;
    *velocity = *velocity * params.friction.powf(dt);

    let speed = velocity.magnitude();
    if speed > params.max_speed {
        *velocity = velocity.normalize() * params.max_speed;
    } else if speed < 0.01 {
        *velocity = Point::ZERO;
    }

    *position += *velocity * dt;
}

/// Keeps a position inside a `width` x `height` world.
pub fn clamp_to_world(position: Point, width: f32, height: f32) -> Point {
    Point::new(position.x.clamp(0.0, width), position.y.clamp(0.0, height))
}
