//! Events - Outbound notifications for the presentation layer
//!
//! The simulation never plays audio, swaps sprites or loads scenes itself.
//! It queues `GameEvent`s that the frontend drains once per tick.

use serde::{Deserialize, Serialize};

use crate::game_server::countdown::LightState;
use crate::game_server::cyclist::AnimState;
use crate::game_server::scene::SceneRequest;

/// One-shot audio cues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    CountdownBeep,
    Winner,
    ButtonClick,
}

/// Everything the simulation wants the outside world to react to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    PlaySound(SoundCue),
    CountdownLight { index: u8, light: LightState },
    CountdownLightsHidden,
    /// Player's gameplay scripts switched on (after GO) or off (frozen / stopped)
    GameplayEnabled { player: u32, enabled: bool },
    AnimationChanged { player: u32, state: AnimState },
    EnergyDepleted { player: u32 },
    WinnerDeclared { player: u32, name: String, distance: f32 },
    SceneRequested(SceneRequest),
}
