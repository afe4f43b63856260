//! Scripted input for the headless client: a seeded random walk that
//! occasionally attacks or eats.

use crate::game::InputIntent;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use shared::motion::PLAYER_MOTION;
use shared::{LimbAction, Point};
use std::f32::consts::TAU;

/// Inputs between direction changes, inclusive range.
const MIN_HOLD: u32 = 10;
const MAX_HOLD: u32 = 60;

pub struct ScriptedInput {
    rng: StdRng,
    heading: f32,
    moving: bool,
    hold_left: u32,
    action: LimbAction,
}

impl ScriptedInput {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            heading: 0.0,
            moving: false,
            hold_left: 0,
            action: LimbAction::None,
        }
    }

    /// Next frame of input. The heading, movement and action are held for a
    /// random number of frames before a new choice is made.
    pub fn next_intent(&mut self) -> InputIntent {
        if self.hold_left == 0 {
            self.heading = self.rng.gen_range(0.0..TAU);
            self.moving = self.rng.gen_bool(0.8);
            self.action = match self.rng.gen_range(0..10) {
                0 | 1 => LimbAction::Attack,
                2 => LimbAction::Eat,
                _ => LimbAction::None,
            };
            self.hold_left = self.rng.gen_range(MIN_HOLD..=MAX_HOLD);
        }
        self.hold_left -= 1;

        let acceleration = if self.moving {
            Point::from_angle(self.heading, PLAYER_MOTION.max_acceleration)
        } else {
            Point::ZERO
        };
        InputIntent {
            acceleration,
            rotation: self.heading,
            selected_slot: 0,
            main_action: self.action,
            offhand_action: LimbAction::None,
        }
    }
}
