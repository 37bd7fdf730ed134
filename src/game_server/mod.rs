//! Game Server Module
//!
//! Two-player bicycle race: input, cycle physics, energy, countdown and win
//! detection, plus the home and results screens around it. Engine-agnostic;
//! the desktop shell talks to it through Tauri commands.

pub mod countdown;
pub mod cyclist;
pub mod events;
pub mod history;
pub mod hud;
pub mod input;
pub mod menu;
pub mod physics;
pub mod race;
pub mod results;
pub mod scene;
pub mod settings;
pub mod simulation;
pub mod world;

pub use cyclist::{AnimState, Cyclist, CyclistState};
pub use events::{GameEvent, SoundCue};
pub use input::{ControlIntent, KeyBindings, KeyCode, KeyState};
pub use physics::{BodyHandle, PhysicsHost};
pub use race::{Race, RaceConfig, RaceResult, RaceStatus};
pub use scene::{Scene, SceneRequest};
pub use settings::SettingsStore;
pub use simulation::{GameServer, SessionSnapshot};
pub use world::SimWorld;
