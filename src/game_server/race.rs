//! Race - Race configuration and state management
//!
//! Owns both cyclists, runs the countdown, drives the per-frame and
//! per-physics-tick passes, and decides the single winner.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::game_server::countdown::{Countdown, CountdownEvent, LightState};
use crate::game_server::cyclist::{AnimState, Cyclist, CyclistSnapshot, CyclistState};
use crate::game_server::events::{GameEvent, SoundCue};
use crate::game_server::hud::{self, HudReadout};
use crate::game_server::input::{KeyBindings, KeyState};
use crate::game_server::physics::{self, BodyHandle, BodySettings, PhysicsHost};
use crate::game_server::scene::{Scene, SceneRequest};

/// Race tuning. Immutable once the race starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaceConfig {
    /// Distance needed to win (m)
    pub winning_distance: f32,
    /// Nominal time from countdown start to GO (s). Informational: the
    /// lights always run one second apart.
    pub countdown_duration: f32,
    /// Time between the winner being declared and the results scene (s)
    pub winner_display_delay: f32,

    pub max_speed: f32,
    pub acceleration: f32,
    pub deceleration: f32,
    /// Degrees per second at full speed
    pub turn_speed: f32,
    /// Max visual roll (degrees)
    pub lean_angle: f32,
    pub lean_smoothing: f32,

    pub boost_multiplier: f32,
    pub max_energy: f32,
    /// Energy per second while boosting
    pub energy_drain_rate: f32,
    /// Energy per second otherwise
    pub energy_recharge_rate: f32,
    pub min_energy_to_boost: f32,

    pub ground_check_distance: f32,
    pub stabilization_force: f32,
    pub anti_wheelie_force: f32,
    /// rad/s
    pub max_angular_velocity: f32,

    pub boundary_push_force: f32,
    pub boundary_check_distance: f32,
}

impl Default for RaceConfig {
    fn default() -> Self {
        Self {
            winning_distance: 100.0,
            countdown_duration: 3.0,
            winner_display_delay: 5.0,
            max_speed: 15.0,
            acceleration: 5.0,
            deceleration: 8.0,
            turn_speed: 80.0,
            lean_angle: 15.0,
            lean_smoothing: 5.0,
            boost_multiplier: 1.5,
            max_energy: 100.0,
            energy_drain_rate: 30.0,
            energy_recharge_rate: 15.0,
            min_energy_to_boost: 10.0,
            ground_check_distance: 0.5,
            stabilization_force: 10.0,
            anti_wheelie_force: 50.0,
            max_angular_velocity: 2.0,
            boundary_push_force: 20.0,
            boundary_check_distance: 1.0,
        }
    }
}

impl RaceConfig {
    pub const MIN_WINNING_DISTANCE: f32 = 50.0;
    pub const MAX_WINNING_DISTANCE: f32 = 500.0;

    /// Load overrides from a JSON file. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading race config {}", path.display()))?;
        let config: RaceConfig = serde_json::from_str(&text)
            .with_context(|| format!("parsing race config {}", path.display()))?;
        Ok(config.sanitized())
    }

    pub fn set_winning_distance(&mut self, distance: f32) {
        self.winning_distance =
            distance.clamp(Self::MIN_WINNING_DISTANCE, Self::MAX_WINNING_DISTANCE);
    }

    /// Negative or non-finite values become zero
    pub fn sanitized(mut self) -> Self {
        for value in [
            &mut self.winning_distance,
            &mut self.countdown_duration,
            &mut self.winner_display_delay,
            &mut self.max_speed,
            &mut self.acceleration,
            &mut self.deceleration,
            &mut self.turn_speed,
            &mut self.lean_angle,
            &mut self.lean_smoothing,
            &mut self.boost_multiplier,
            &mut self.max_energy,
            &mut self.energy_drain_rate,
            &mut self.energy_recharge_rate,
            &mut self.min_energy_to_boost,
            &mut self.ground_check_distance,
            &mut self.stabilization_force,
            &mut self.anti_wheelie_force,
            &mut self.max_angular_velocity,
            &mut self.boundary_push_force,
            &mut self.boundary_check_distance,
        ] {
            if !value.is_finite() || *value < 0.0 {
                *value = 0.0;
            }
        }
        self
    }
}

/// Race status. Only ever moves forward.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RaceStatus {
    #[default]
    Waiting,
    Countdown,
    Racing,
    Finished,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WinReason {
    DistanceReached,
    FinishLine,
}

/// Outcome of a finished race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    pub player: u32,
    pub name: String,
    pub distance: f32,
    pub reason: WinReason,
    /// Seconds since GO
    pub race_time: f32,
}

/// Complete race state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Race {
    pub config: RaceConfig,
    pub status: RaceStatus,
    /// Player 1 then player 2
    pub players: [CyclistState; 2],
    countdown: Countdown,
    /// Seconds since GO
    pub elapsed_time: f32,
    pub result: Option<RaceResult>,
    /// Time left before the results scene is requested
    winner_timer: Option<f32>,
    events: Vec<GameEvent>,
}

impl Race {
    pub const DEFAULT_NAMES: [&'static str; 2] = ["Player 1", "Player 2"];

    pub fn new(config: RaceConfig, bodies: [Option<BodyHandle>; 2]) -> Self {
        let players = [
            CyclistState::new(
                1,
                Self::DEFAULT_NAMES[0],
                bodies[0],
                KeyBindings::player1(),
                config.max_energy,
            ),
            CyclistState::new(
                2,
                Self::DEFAULT_NAMES[1],
                bodies[1],
                KeyBindings::player2(),
                config.max_energy,
            ),
        ];
        Self {
            countdown: Countdown::default(),
            config,
            status: RaceStatus::Waiting,
            players,
            elapsed_time: 0.0,
            result: None,
            winner_timer: None,
            events: Vec::new(),
        }
    }

    fn index(player: u32) -> Option<usize> {
        match player {
            1 => Some(0),
            2 => Some(1),
            _ => None,
        }
    }

    /// Log anything the race will have to do without. Returns false if a
    /// cycle body is missing.
    pub fn validate_references<H: PhysicsHost + ?Sized>(&self, host: &H) -> bool {
        let mut ok = true;
        for player in &self.players {
            match player.body {
                None => {
                    log::error!("{}: no cycle body assigned", player.name);
                    ok = false;
                }
                Some(body) if !host.contains(body) => {
                    log::error!("{}: cycle body {:?} not found in physics host", player.name, body);
                    ok = false;
                }
                Some(_) => {}
            }
        }
        if self.config.boundary_check_distance <= 0.0 {
            log::warn!("Boundary check distance is zero, track boundaries disabled");
        }
        ok
    }

    /// Empty names fall back to "Player 1" / "Player 2"
    pub fn set_player_names(&mut self, p1: &str, p2: &str) {
        for (player, (name, fallback)) in self
            .players
            .iter_mut()
            .zip([p1, p2].into_iter().zip(Self::DEFAULT_NAMES))
        {
            player.name = if name.trim().is_empty() {
                fallback.to_string()
            } else {
                name.to_string()
            };
        }
    }

    pub fn set_winning_distance(&mut self, distance: f32) {
        self.config.set_winning_distance(distance);
        log::info!("Winning distance set to {}m", self.config.winning_distance);
    }

    pub fn set_controls(&mut self, player: u32, controls: KeyBindings) {
        if let Some(i) = Self::index(player) {
            self.players[i].controls = controls;
        }
    }

    pub fn status(&self) -> RaceStatus {
        self.status
    }

    pub fn player(&self, player: u32) -> Option<&CyclistState> {
        Self::index(player).map(|i| &self.players[i])
    }

    pub fn player_distance(&self, player: u32) -> f32 {
        self.player(player).map_or(0.0, |p| p.distance)
    }

    pub fn player_speed(&self, player: u32) -> f32 {
        self.player(player).map_or(0.0, |p| p.current_speed)
    }

    pub fn player_energy(&self, player: u32) -> f32 {
        self.player(player).map_or(0.0, |p| p.current_energy)
    }

    pub fn lights(&self) -> [LightState; Countdown::LIGHT_COUNT] {
        self.countdown.lights()
    }

    /// Drain queued events
    pub fn take_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Freeze both cycles and start the light sequence
    pub fn begin_countdown<H: PhysicsHost + ?Sized>(&mut self, host: &mut H) {
        if self.status != RaceStatus::Waiting {
            return;
        }
        self.status = RaceStatus::Countdown;
        self.countdown = Countdown::default();
        log::info!("Starting countdown...");

        for index in 0..Countdown::LIGHT_COUNT {
            self.events.push(GameEvent::CountdownLight {
                index: index as u8,
                light: LightState::Red,
            });
        }

        for player in &mut self.players {
            if let Some(body) = player.body {
                host.set_kinematic(body, true);
                if let Some(pose) = host.pose(body) {
                    player.last_position = pose.position;
                }
            }
            self.events.push(GameEvent::GameplayEnabled {
                player: player.id,
                enabled: false,
            });
            log::debug!("{} frozen: true", player.name);
        }
    }

    /// Frame pass
    pub fn update<H: PhysicsHost + ?Sized>(&mut self, host: &mut H, keys: &KeyState, delta: f32) {
        self.log_key_presses(keys);

        match self.status {
            RaceStatus::Waiting | RaceStatus::Countdown => {
                for i in 0..2 {
                    self.set_anim(i, AnimState::Idle);
                }
            }

            RaceStatus::Racing => {
                self.elapsed_time += delta;

                for player in &mut self.players {
                    Cyclist::sample_input(player, keys);
                }

                for player in &mut self.players {
                    let Some(steering) = Cyclist::update_movement(player, &self.config, delta) else {
                        continue;
                    };
                    if let Some(body) = player.body {
                        physics::apply_heading_and_lean(host, body, steering.yaw_delta, steering.lean);
                    }
                }

                for i in 0..2 {
                    let target = Cyclist::target_anim(&self.players[i]);
                    self.set_anim(i, target);
                }

                for player in &mut self.players {
                    if Cyclist::update_energy(player, &self.config, delta) {
                        log::info!("{} energy depleted", player.name);
                        self.events.push(GameEvent::EnergyDepleted { player: player.id });
                    }
                }

                for player in &mut self.players {
                    let Some(pose) = player.body.and_then(|b| host.pose(b)) else {
                        continue;
                    };
                    Cyclist::track_distance(player, pose.position);
                }

                self.check_win_condition(host);
            }

            RaceStatus::Finished => {
                if let Some(remaining) = self.winner_timer.as_mut() {
                    *remaining -= delta;
                    if *remaining <= 0.0 {
                        self.winner_timer = None;
                        log::info!("Loading results scene");
                        self.events
                            .push(GameEvent::SceneRequested(SceneRequest::Load(Scene::Results)));
                    }
                }
            }
        }

        // The grace period runs on into the race (and past an early winner),
        // so the lights are advanced after this frame's pass: GO takes effect
        // from the next frame.
        if self.status != RaceStatus::Waiting && !self.countdown.is_done() {
            for event in self.countdown.advance(delta) {
                self.on_countdown_event(host, event);
            }
        }
    }

    /// Physics pass, zero or more times per frame
    pub fn fixed_update<H: PhysicsHost + ?Sized>(&mut self, host: &mut H) {
        if self.status != RaceStatus::Racing {
            return;
        }

        for player in self.players.iter().filter(|p| !p.is_finished()) {
            if let Some(body) = player.body {
                physics::apply_drive(host, body, player.current_speed, &self.config);
            }
        }
        for player in self.players.iter().filter(|p| !p.is_finished()) {
            if let Some(body) = player.body {
                physics::correct_boundary(host, body, &self.config);
            }
        }
    }

    /// Finish-line trigger entered by `body`
    pub fn on_finish_line_crossed<H: PhysicsHost + ?Sized>(&mut self, host: &mut H, body: BodyHandle) {
        if self.status != RaceStatus::Racing {
            return;
        }
        let Some(index) = self.players.iter().position(|p| p.body == Some(body)) else {
            log::debug!("Finish line crossed by unknown body {:?}", body);
            return;
        };
        log::info!("{} crossed the finish line", self.players[index].name);
        self.declare_winner(host, index, WinReason::FinishLine);
    }

    fn check_win_condition<H: PhysicsHost + ?Sized>(&mut self, host: &mut H) {
        let winner = self
            .players
            .iter()
            .position(|p| !p.is_finished() && p.distance >= self.config.winning_distance);
        if let Some(index) = winner {
            self.declare_winner(host, index, WinReason::DistanceReached);
        }
    }

    /// Returns false if the race was not live or the player already finished
    fn declare_winner<H: PhysicsHost + ?Sized>(
        &mut self,
        host: &mut H,
        index: usize,
        reason: WinReason,
    ) -> bool {
        if self.status != RaceStatus::Racing || self.players[index].is_finished() {
            return false;
        }

        self.status = RaceStatus::Finished;
        self.players[index].flags.finished = true;

        let winner = &self.players[index];
        log::info!("WINNER: {} at {:.1}m", winner.name, winner.distance);
        let result = RaceResult {
            player: winner.id,
            name: winner.name.clone(),
            distance: winner.distance,
            reason,
            race_time: self.elapsed_time,
        };

        self.events.push(GameEvent::PlaySound(SoundCue::Winner));
        for i in 0..2 {
            self.stop_player(host, i);
        }

        self.events.push(GameEvent::WinnerDeclared {
            player: result.player,
            name: result.name.clone(),
            distance: result.distance,
        });
        self.result = Some(result);
        self.winner_timer = Some(self.config.winner_display_delay);
        log::info!(
            "Going to results in {} seconds...",
            self.config.winner_display_delay
        );
        true
    }

    fn stop_player<H: PhysicsHost + ?Sized>(&mut self, host: &mut H, index: usize) {
        Cyclist::stop(&mut self.players[index]);
        self.set_anim(index, AnimState::Idle);

        let player = &self.players[index];
        if let Some(body) = player.body {
            host.set_velocity(body, glam::Vec3::ZERO);
            host.set_angular_velocity(body, glam::Vec3::ZERO);
        }
        self.events.push(GameEvent::GameplayEnabled {
            player: player.id,
            enabled: false,
        });
        log::debug!("{} stopped", player.name);
    }

    fn on_countdown_event<H: PhysicsHost + ?Sized>(&mut self, host: &mut H, event: CountdownEvent) {
        match event {
            CountdownEvent::LightGreen(index) => {
                self.events.push(GameEvent::CountdownLight {
                    index,
                    light: LightState::Green,
                });
                self.events.push(GameEvent::PlaySound(SoundCue::CountdownBeep));
            }
            CountdownEvent::Go => self.go(host),
            CountdownEvent::LightsHidden => self.events.push(GameEvent::CountdownLightsHidden),
        }
    }

    fn go<H: PhysicsHost + ?Sized>(&mut self, host: &mut H) {
        self.status = RaceStatus::Racing;
        let settings = BodySettings::for_config(&self.config);

        for player in &self.players {
            if let Some(body) = player.body {
                host.set_kinematic(body, false);
                host.configure(body, settings);
            }
            self.events.push(GameEvent::GameplayEnabled {
                player: player.id,
                enabled: true,
            });
            log::debug!("{} frozen: false", player.name);
        }
    }

    fn set_anim(&mut self, index: usize, anim: AnimState) {
        let player = &mut self.players[index];
        if Cyclist::set_anim(player, anim) {
            self.events.push(GameEvent::AnimationChanged {
                player: player.id,
                state: anim,
            });
        }
    }

    fn log_key_presses(&self, keys: &KeyState) {
        if !log::log_enabled!(log::Level::Debug) {
            return;
        }
        for player in &self.players {
            for key in [player.controls.forward, player.controls.boost] {
                if keys.was_pressed(key) {
                    log::debug!("Player {}: {:?} pressed", player.id, key);
                }
            }
        }
    }

    /// Get compact snapshot for IPC transfer
    pub fn get_snapshot(&self) -> RaceSnapshot {
        RaceSnapshot {
            status: self.status,
            elapsed_time: self.elapsed_time,
            lights: self.countdown.lights(),
            winning_distance: self.config.winning_distance,
            winning_distance_text: hud::winning_distance_text(self.config.winning_distance),
            players: self.players.iter().map(CyclistSnapshot::from).collect(),
            hud: self
                .players
                .iter()
                .map(|p| HudReadout::from_cyclist(p, &self.config))
                .collect(),
            result: self.result.clone(),
        }
    }
}

/// Compact race snapshot for IPC transfer
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RaceSnapshot {
    pub status: RaceStatus,
    pub elapsed_time: f32,
    pub lights: [LightState; Countdown::LIGHT_COUNT],
    pub winning_distance: f32,
    pub winning_distance_text: String,
    pub players: Vec<CyclistSnapshot>,
    pub hud: Vec<HudReadout>,
    pub result: Option<RaceResult>,
}
