//! Countdown - Start-light sequence before the race
//!
//! Three lights turn green one interval apart. The race goes live on the
//! third light, and the lights hide after a short grace period.

use serde::{Deserialize, Serialize};

const LIGHTS: usize = 3;

/// Display state of a single start light
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightState {
    #[default]
    Red,
    Green,
    Hidden,
}

/// Boundaries crossed while advancing the countdown
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountdownEvent {
    /// Light at this index (0..3) turned green
    LightGreen(u8),
    /// Players become controllable
    Go,
    LightsHidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum Stage {
    /// Waiting for light `n` to turn green
    Light(u8),
    /// Race is live, lights still showing
    Grace,
    Done,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Countdown {
    stage: Stage,
    /// Time left in the current stage (seconds)
    remaining: f32,
    interval: f32,
    lights: [LightState; LIGHTS],
}

impl Countdown {
    pub const LIGHT_COUNT: usize = LIGHTS;
    pub const DEFAULT_INTERVAL: f32 = 1.0;
    pub const GRACE_PERIOD: f32 = 0.5;

    /// Sequence with lights `interval` seconds apart
    pub fn new(interval: f32) -> Self {
        let interval = if interval.is_finite() && interval >= 0.0 {
            interval
        } else {
            Self::DEFAULT_INTERVAL
        };
        Self {
            stage: Stage::Light(0),
            remaining: interval,
            interval,
            lights: [LightState::Red; Self::LIGHT_COUNT],
        }
    }

    /// Run the clock forward. A long frame may cross several boundaries.
    pub fn advance(&mut self, delta: f32) -> Vec<CountdownEvent> {
        let mut events = Vec::new();
        let mut budget = delta.max(0.0);

        while self.stage != Stage::Done && budget >= self.remaining {
            budget -= self.remaining;
            match self.stage {
                Stage::Light(n) => {
                    self.lights[n as usize] = LightState::Green;
                    events.push(CountdownEvent::LightGreen(n));
                    log::info!("Countdown: light {} green", n + 1);

                    if (n as usize) + 1 < Self::LIGHT_COUNT {
                        self.stage = Stage::Light(n + 1);
                        self.remaining = self.interval;
                    } else {
                        events.push(CountdownEvent::Go);
                        log::info!("GO! Race started!");
                        self.stage = Stage::Grace;
                        self.remaining = Self::GRACE_PERIOD;
                    }
                }
                Stage::Grace => {
                    self.lights = [LightState::Hidden; Self::LIGHT_COUNT];
                    events.push(CountdownEvent::LightsHidden);
                    self.stage = Stage::Done;
                    self.remaining = 0.0;
                }
                Stage::Done => {}
            }
        }

        if self.stage != Stage::Done {
            self.remaining -= budget;
        }
        events
    }

    pub fn lights(&self) -> [LightState; Self::LIGHT_COUNT] {
        self.lights
    }

    /// True once `Go` has fired
    pub fn is_live(&self) -> bool {
        matches!(self.stage, Stage::Grace | Stage::Done)
    }

    pub fn is_done(&self) -> bool {
        self.stage == Stage::Done
    }
}

impl Default for Countdown {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL)
    }
}
