//! Idle wandering for creatures: rest for a while, then walk to a random
//! point nearby.

use crate::content::components::WanderState;
use crate::content::entity_types::entity_info;
use crate::world::World;
use rand::Rng;
use shared::motion::clamp_to_world;
use shared::Point;
use std::f32::consts::TAU;

const ARRIVAL_DISTANCE: f32 = 16.0;
const MAX_WALK_TICKS: u32 = 200;
const MIN_IDLE_TICKS: u32 = 20;
const MAX_IDLE_TICKS: u32 = 120;

pub fn update(world: &mut World) {
    let width = world.config().world_width();
    let height = world.config().world_height();

    for entity_id in world.components.wander.entity_ids() {
        let Some(entity) = world.entity(entity_id) else {
            continue;
        };
        if !entity.is_active() {
            continue;
        }
        let position = entity.position;
        let max_acceleration = entity_info(entity.entity_type)
            .motion
            .map_or(0.0, |motion| motion.max_acceleration);

        let mut wander = *world.components.wander.get_component(entity_id);
        let mut acceleration = Point::ZERO;
        wander.state = match wander.state {
            WanderState::Idle { ticks_left: 0 } => {
                let rng = world.rng_mut();
                let angle = rng.gen_range(0.0..TAU);
                let distance = rng.gen_range(0.0..wander.radius);
                let target = clamp_to_world(position + Point::from_angle(angle, distance), width, height);
                WanderState::Moving {
                    target,
                    ticks_left: MAX_WALK_TICKS,
                }
            }
            WanderState::Idle { ticks_left } => WanderState::Idle {
                ticks_left: ticks_left - 1,
            },
            WanderState::Moving { target, ticks_left }
                if ticks_left == 0 || position.distance_to(&target) < ARRIVAL_DISTANCE =>
            {
                WanderState::Idle {
                    ticks_left: world.rng_mut().gen_range(MIN_IDLE_TICKS..MAX_IDLE_TICKS),
                }
            }
            WanderState::Moving { target, ticks_left } => {
                acceleration = (target - position).normalize() * max_acceleration;
                WanderState::Moving {
                    target,
                    ticks_left: ticks_left - 1,
                }
            }
        };

        *world.components.wander.get_component_mut(entity_id) = wander;
        if let Some(entity) = world.entity_mut(entity_id) {
            entity.acceleration = acceleration;
            if acceleration != Point::ZERO {
                entity.rotation = acceleration.angle();
            }
        }
    }
}
