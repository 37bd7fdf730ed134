//! Cyclist - Individual competitor state and behavior
//!
//! Each cyclist has a control intent, speed, lean, a boost energy pool and
//! race progress. The race updates both cyclists every frame while racing.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::game_server::input::{ControlIntent, KeyBindings, KeyState};
use crate::game_server::physics::BodyHandle;
use crate::game_server::race::RaceConfig;

/// Character animation state driven by the cyclist's motion
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum AnimState {
    #[default]
    Idle,
    Normal,
    Speed,
}

/// Cyclist state flags
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CyclistFlags {
    /// Terminal: set once for the winner, never cleared
    pub finished: bool,
    pub boosting: bool,
}

/// Complete state for a single cyclist
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CyclistState {
    /// Player number (1 or 2)
    pub id: u32,
    /// Display name
    pub name: String,
    /// Body in the physics host, if one was assigned
    pub body: Option<BodyHandle>,
    /// Key layout
    pub controls: KeyBindings,
    /// This frame's control intent
    pub intent: ControlIntent,
    /// Signed scalar speed along the heading (m/s)
    pub current_speed: f32,
    /// Visual roll (degrees)
    pub current_lean: f32,
    /// Boost energy
    pub current_energy: f32,
    /// Accumulated ground-plane distance (m)
    pub distance: f32,
    /// Position at the previous distance sample
    pub last_position: Vec3,
    /// Current animation state
    pub anim: AnimState,
    /// Status flags
    pub flags: CyclistFlags,
}

impl CyclistState {
    /// Create a new cyclist with a full energy pool
    pub fn new(
        id: u32,
        name: impl Into<String>,
        body: Option<BodyHandle>,
        controls: KeyBindings,
        max_energy: f32,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            body,
            controls,
            intent: ControlIntent::default(),
            current_speed: 0.0,
            current_lean: 0.0,
            current_energy: max_energy,
            distance: 0.0,
            last_position: Vec3::ZERO,
            anim: AnimState::Idle,
            flags: CyclistFlags::default(),
        }
    }

    /// Clear intent, speed and boost; energy and progress are kept
    pub fn reset_controls(&mut self) {
        self.intent = ControlIntent::default();
        self.current_speed = 0.0;
        self.flags.boosting = false;
    }

    pub fn is_moving(&self) -> bool {
        self.intent.is_moving
    }

    pub fn is_boosting(&self) -> bool {
        self.flags.boosting
    }

    pub fn is_finished(&self) -> bool {
        self.flags.finished
    }

    fn controllable(&self) -> bool {
        !self.flags.finished && self.body.is_some()
    }
}

/// Heading/lean change produced by one movement step
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Steering {
    /// Yaw to add this frame (degrees)
    pub yaw_delta: f32,
    /// Roll to set (degrees)
    pub lean: f32,
}

/// Cyclist simulation logic
pub struct Cyclist;

impl Cyclist {
    /// Below this speed the cycle cannot turn and distance is not counted
    pub const SPEED_EPSILON: f32 = 0.1;
    /// Acceleration multiplier while boosting
    const BOOST_ACCELERATION_FACTOR: f32 = 1.5;

    /// Read the player's keys into their control intent
    pub fn sample_input(state: &mut CyclistState, keys: &KeyState) {
        if !state.controllable() {
            state.reset_controls();
            return;
        }
        state.intent = ControlIntent::sample(&state.controls, keys);
    }

    /// Advance speed, heading and lean for one frame
    pub fn update_movement(
        state: &mut CyclistState,
        config: &RaceConfig,
        delta: f32,
    ) -> Option<Steering> {
        if !state.controllable() {
            return None;
        }

        state.flags.boosting = state.intent.boost_requested
            && state.current_energy >= config.min_energy_to_boost
            && state.intent.vertical > 0.0;

        let speed_multiplier = if state.flags.boosting {
            config.boost_multiplier
        } else {
            1.0
        };
        let target_speed = state.intent.vertical * config.max_speed * speed_multiplier;

        if state.intent.vertical != 0.0 {
            let accel = if state.flags.boosting {
                config.acceleration * Self::BOOST_ACCELERATION_FACTOR
            } else {
                config.acceleration
            };
            state.current_speed = move_towards(state.current_speed, target_speed, accel * delta);
        } else {
            state.current_speed = move_towards(state.current_speed, 0.0, config.deceleration * delta);
        }

        // Turning authority scales with speed
        let mut yaw_delta = 0.0;
        if state.current_speed.abs() > Self::SPEED_EPSILON {
            let authority = if config.max_speed > 0.0 {
                (state.current_speed.abs() / config.max_speed).clamp(0.0, 1.0)
            } else {
                0.0
            };
            yaw_delta = state.intent.horizontal * config.turn_speed * delta * authority;
        }

        let top_speed = config.max_speed * config.boost_multiplier;
        let normalized_speed = if top_speed > 0.0 {
            state.current_speed.abs() / top_speed
        } else {
            0.0
        };
        let target_lean = -state.intent.horizontal * config.lean_angle * normalized_speed;
        state.current_lean = lerp(
            state.current_lean,
            target_lean,
            config.lean_smoothing * delta,
        );

        Some(Steering {
            yaw_delta,
            lean: state.current_lean,
        })
    }

    /// Drain energy while boosting, recharge otherwise.
    /// Returns true on the frame the pool runs dry.
    pub fn update_energy(state: &mut CyclistState, config: &RaceConfig, delta: f32) -> bool {
        if state.flags.finished {
            return false;
        }

        if state.flags.boosting {
            state.current_energy = (state.current_energy - config.energy_drain_rate * delta).max(0.0);
            if state.current_energy <= 0.0 {
                state.flags.boosting = false;
                return true;
            }
        } else {
            state.current_energy =
                (state.current_energy + config.energy_recharge_rate * delta).min(config.max_energy);
        }
        false
    }

    /// Accumulate ground-plane displacement since the last sample
    pub fn track_distance(state: &mut CyclistState, position: Vec3) {
        if state.flags.finished {
            return;
        }

        let moved = Vec3::new(position.x, 0.0, position.z)
            .distance(Vec3::new(state.last_position.x, 0.0, state.last_position.z));

        // Reversing or creeping never adds progress, and never subtracts it either
        if state.current_speed > Self::SPEED_EPSILON {
            state.distance += moved;
        }
        state.last_position = position;
    }

    /// Animation state the cyclist should be in right now
    pub fn target_anim(state: &CyclistState) -> AnimState {
        if state.flags.finished {
            AnimState::Idle
        } else if state.flags.boosting {
            AnimState::Speed
        } else if state.intent.is_moving {
            AnimState::Normal
        } else {
            AnimState::Idle
        }
    }

    /// Switch animation state; returns true if it changed
    pub fn set_anim(state: &mut CyclistState, anim: AnimState) -> bool {
        if state.anim == anim {
            return false;
        }
        state.anim = anim;
        log::debug!("{} animation: {:?}", state.name, anim);
        true
    }

    /// Halt the cyclist: no speed, no intent, no boost
    pub fn stop(state: &mut CyclistState) {
        state.reset_controls();
    }
}

/// Step `current` toward `target` by at most `max_delta`, never overshooting
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    if (target - current).abs() <= max_delta {
        target
    } else {
        current + (target - current).signum() * max_delta
    }
}

/// Linear interpolation with `t` clamped to [0, 1]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t.clamp(0.0, 1.0)
}

/// Compact cyclist state for IPC transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CyclistSnapshot {
    pub id: u32,
    pub name: String,
    pub distance: f32,
    pub speed: f32,
    pub lean: f32,
    pub energy: f32,
    pub boosting: bool,
    pub moving: bool,
    pub anim: AnimState,
    pub finished: bool,
}

impl From<&CyclistState> for CyclistSnapshot {
    fn from(state: &CyclistState) -> Self {
        Self {
            id: state.id,
            name: state.name.clone(),
            distance: state.distance,
            speed: state.current_speed,
            lean: state.current_lean,
            energy: state.current_energy,
            boosting: state.flags.boosting,
            moving: state.intent.is_moving,
            anim: state.anim,
            finished: state.flags.finished,
        }
    }
}
