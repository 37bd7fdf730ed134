//! Simulation - Main game server and loop
//!
//! Owns the settings store and whichever scene is active, runs the race's
//! frame pass once per tick and its physics pass on a fixed step, and turns
//! race outcomes into persisted results.

use serde::{Deserialize, Serialize};
use std::time::Instant;

use crate::game_server::events::GameEvent;
use crate::game_server::history::History;
use crate::game_server::hud::LogoPosition;
use crate::game_server::input::{KeyCode, KeyState};
use crate::game_server::menu::{HomeAction, HomeMenu};
use crate::game_server::physics::BodyHandle;
use crate::game_server::race::{Race, RaceConfig, RaceSnapshot, RaceStatus};
use crate::game_server::results::{ResultsAction, ResultsScreen};
use crate::game_server::scene::{IntroScreen, Scene, SceneRequest};
use crate::game_server::settings::{keys, SettingsStore};
use crate::game_server::world::SimWorld;

/// Server statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerStats {
    /// Physics steps per second
    pub physics_rate: f32,
    pub avg_tick_time_ms: f32,
    pub scene: Scene,
    pub race_status: Option<RaceStatus>,
    pub running: bool,
}

/// Everything the frontend needs to draw one frame
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub scene: Scene,
    pub race: Option<RaceSnapshot>,
    pub menu: Option<HomeMenu>,
    pub results: Option<ResultsScreen>,
    pub logo_position: Option<LogoPosition>,
    pub theme: i32,
    pub paused: bool,
}

/// A race in progress plus the world its cycles live in
struct RaceSession {
    race: Race,
    world: SimWorld,
    cycles: [i32; 2],
    logo_position: Option<LogoPosition>,
}

/// Main game server
pub struct GameServer {
    settings: SettingsStore,
    /// Tuning used for every new race; the winning distance comes from settings
    base_config: RaceConfig,
    scene: Scene,
    intro: Option<IntroScreen>,
    menu: Option<HomeMenu>,
    results: Option<ResultsScreen>,
    session: Option<RaceSession>,
    /// Events waiting for the frontend
    events: Vec<GameEvent>,
    keys: KeyState,
    /// Physics step length (seconds)
    fixed_step: f32,
    accumulator: f32,
    last_tick: Instant,
    /// Recent tick durations for averaging
    tick_times: Vec<f32>,
    running: bool,
    quit_requested: bool,
}

impl GameServer {
    pub const PHYSICS_RATE: f32 = 50.0;
    /// Physics steps allowed per frame before time is dropped
    const MAX_STEPS_PER_FRAME: u32 = 8;
    const TICK_HISTORY: usize = 60;

    /// Create a new game server, starting on the intro splash
    pub fn new(settings: SettingsStore) -> Self {
        Self {
            settings,
            base_config: RaceConfig::default(),
            scene: Scene::Intro,
            intro: Some(IntroScreen::new()),
            menu: None,
            results: None,
            session: None,
            events: Vec::new(),
            keys: KeyState::new(),
            fixed_step: 1.0 / Self::PHYSICS_RATE,
            accumulator: 0.0,
            last_tick: Instant::now(),
            tick_times: Vec::with_capacity(Self::TICK_HISTORY),
            running: true,
            quit_requested: false,
        }
    }

    pub fn with_config(mut self, config: RaceConfig) -> Self {
        self.base_config = config.sanitized();
        self
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn scene(&self) -> Scene {
        self.scene
    }

    pub fn race(&self) -> Option<&Race> {
        self.session.as_ref().map(|s| &s.race)
    }

    pub fn world(&self) -> Option<&SimWorld> {
        self.session.as_ref().map(|s| &s.world)
    }

    /// Cycle models chosen for the current race
    pub fn cycles(&self) -> Option<[i32; 2]> {
        self.session.as_ref().map(|s| s.cycles)
    }

    pub fn quit_requested(&self) -> bool {
        self.quit_requested
    }

    /// Switch scenes, tearing down whatever was active
    pub fn load_scene(&mut self, scene: Scene) {
        log::info!("Loading scene {:?}", scene);
        self.scene = scene;
        self.intro = None;
        self.menu = None;
        self.results = None;
        self.session = None;
        self.accumulator = 0.0;

        match scene {
            Scene::Intro => self.intro = Some(IntroScreen::new()),
            Scene::Home => self.menu = Some(HomeMenu::open(&self.settings)),
            Scene::Race => self.start_race(),
            Scene::Results => self.results = Some(ResultsScreen::open(&self.settings)),
        }
    }

    fn start_race(&mut self) {
        let mut config = self.base_config.clone();
        // Stored meter is trusted as-is; only the public setter clamps
        config.winning_distance = self
            .settings
            .get_float(keys::WINNING_METER, config.winning_distance);

        let p1 = self.settings.get_string(keys::PLAYER1_NAME, Race::DEFAULT_NAMES[0]);
        let p2 = self.settings.get_string(keys::PLAYER2_NAME, Race::DEFAULT_NAMES[1]);
        let cycles = [
            self.settings.get_int(keys::PLAYER1_CYCLE, 0),
            self.settings.get_int(keys::PLAYER2_CYCLE, 0),
        ];
        let logo_position = LogoPosition::from_index(self.settings.get_int(keys::LOGO_POSITION, 1));
        log::info!(
            "Loaded settings: Distance={}m, P1={}, P2={}",
            config.winning_distance,
            p1,
            p2
        );

        let (mut world, bodies) = SimWorld::two_lane_track(config.winning_distance);
        let mut race = Race::new(config, bodies.map(Some));
        race.set_player_names(&p1, &p2);
        race.validate_references(&world);
        race.begin_countdown(&mut world);

        self.session = Some(RaceSession {
            race,
            world,
            cycles,
            logo_position,
        });
        self.collect_race_events();
    }

    /// Advance the active scene by `delta` seconds of game time
    pub fn advance(&mut self, delta: f32, keys: &KeyState) {
        if !self.running || self.quit_requested {
            return;
        }
        let delta = delta.max(0.0);

        match self.scene {
            Scene::Intro => {
                let request = self.intro.as_mut().and_then(|intro| intro.update(delta));
                if let Some(request) = request {
                    self.handle_request(request);
                }
            }
            Scene::Race => {
                if let Some(session) = &mut self.session {
                    let RaceSession { race, world, .. } = session;
                    race.update(world, keys, delta);

                    let max_backlog = self.fixed_step * Self::MAX_STEPS_PER_FRAME as f32;
                    self.accumulator = (self.accumulator + delta).min(max_backlog);
                    while self.accumulator >= self.fixed_step {
                        race.fixed_update(world);
                        for body in world.step(self.fixed_step) {
                            race.on_finish_line_crossed(world, body);
                        }
                        self.accumulator -= self.fixed_step;
                    }
                }
                self.collect_race_events();
            }
            Scene::Home | Scene::Results => {}
        }
    }

    /// Perform a single tick using wall-clock time
    pub fn tick(&mut self, held: &[KeyCode]) -> SessionSnapshot {
        let now = Instant::now();
        let delta = now.duration_since(self.last_tick).as_secs_f32();
        self.last_tick = now;

        let tick_start = Instant::now();

        let keys = self.keys.advance(held.iter().copied());
        self.advance(delta, &keys);
        self.keys = keys;

        let tick_time = tick_start.elapsed().as_secs_f32() * 1000.0;
        self.tick_times.push(tick_time);
        if self.tick_times.len() > Self::TICK_HISTORY {
            self.tick_times.remove(0);
        }

        self.get_snapshot()
    }

    pub fn home_action(&mut self, action: HomeAction) {
        let Some(menu) = self.menu.as_mut() else {
            log::warn!("Home action {:?} outside the home scene", action);
            return;
        };
        let persists = matches!(
            action,
            HomeAction::Start
                | HomeAction::ConfirmPlayer1
                | HomeAction::ReadyToRace
                | HomeAction::SaveSettings
        );
        let events = menu.apply(action, &mut self.settings);
        if persists {
            self.persist();
        }
        self.process_events(events);
    }

    pub fn results_action(&mut self, action: ResultsAction) {
        let Some(results) = self.results.as_mut() else {
            log::warn!("Results action {:?} outside the results scene", action);
            return;
        };
        let events = results.apply(action, &mut self.settings);
        if action == ResultsAction::ClearHistory {
            self.persist();
        }
        self.process_events(events);
    }

    /// Finish-line trigger reported by an external physics engine
    pub fn finish_line_crossed(&mut self, body: BodyHandle) {
        if let Some(session) = &mut self.session {
            session.race.on_finish_line_crossed(&mut session.world, body);
        }
        self.collect_race_events();
    }

    /// Clamped to [50, 500]; applies to the active race only and moves its
    /// finish line to match
    pub fn set_winning_distance(&mut self, distance: f32) -> Option<f32> {
        let session = self.session.as_mut()?;
        session.race.set_winning_distance(distance);
        let distance = session.race.config.winning_distance;
        session.world.lay_track(distance);
        Some(distance)
    }

    /// Take everything queued for the frontend
    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    fn collect_race_events(&mut self) {
        let events = match &mut self.session {
            Some(session) => session.race.take_events(),
            None => return,
        };
        self.process_events(events);
    }

    fn process_events(&mut self, events: Vec<GameEvent>) {
        for event in events {
            if let GameEvent::WinnerDeclared { name, distance, .. } = &event {
                self.settings.set_string(keys::WINNER_NAME, name.as_str());
                self.settings.set_float(keys::WINNER_DISTANCE, *distance);
                History::push(&mut self.settings, name, *distance);
                self.persist();
            }
            let request = match &event {
                GameEvent::SceneRequested(request) => Some(*request),
                _ => None,
            };

            self.events.push(event);
            if let Some(request) = request {
                self.handle_request(request);
            }
        }
    }

    fn handle_request(&mut self, request: SceneRequest) {
        match request {
            SceneRequest::Load(scene) => self.load_scene(scene),
            SceneRequest::Quit => {
                log::info!("Quit requested");
                self.quit_requested = true;
            }
        }
    }

    fn persist(&self) {
        if let Err(e) = self.settings.save() {
            log::error!("Failed to save settings: {:#}", e);
        }
    }

    /// Get current session snapshot
    pub fn get_snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            scene: self.scene,
            race: self.session.as_ref().map(|s| s.race.get_snapshot()),
            menu: self.menu.clone(),
            results: self.results.clone(),
            logo_position: self.session.as_ref().and_then(|s| s.logo_position),
            theme: self.settings.get_int(keys::UI_THEME, 0),
            paused: !self.running,
        }
    }

    /// Get server statistics
    pub fn get_stats(&self) -> ServerStats {
        let avg_tick_time = if self.tick_times.is_empty() {
            0.0
        } else {
            self.tick_times.iter().sum::<f32>() / self.tick_times.len() as f32
        };

        ServerStats {
            physics_rate: 1.0 / self.fixed_step,
            avg_tick_time_ms: avg_tick_time,
            scene: self.scene,
            race_status: self.race().map(|r| r.status()),
            running: self.running,
        }
    }

    /// Back to the home screen, dropping any race in progress
    pub fn reset(&mut self) {
        self.events.clear();
        self.tick_times.clear();
        self.keys = KeyState::new();
        self.running = true;
        self.quit_requested = false;
        self.load_scene(Scene::Home);
    }

    /// Pause the simulation
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Resume the simulation
    pub fn resume(&mut self) {
        self.running = true;
        self.last_tick = Instant::now();
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl Default for GameServer {
    fn default() -> Self {
        Self::new(SettingsStore::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game_server::race::{RaceResult, WinReason};

    const DT: f32 = 1.0 / 60.0;

    fn server_on(scene: Scene) -> GameServer {
        let mut server = GameServer::default();
        server.load_scene(scene);
        server.drain_events();
        server
    }

    #[test]
    fn intro_moves_to_home() {
        let mut server = GameServer::default();
        let idle = KeyState::new();
        for _ in 0..(6.4 / DT) as usize {
            server.advance(DT, &idle);
        }
        assert_eq!(server.scene(), Scene::Intro);

        for _ in 0..10 {
            server.advance(DT, &idle);
        }
        assert_eq!(server.scene(), Scene::Home);
        assert!(server.get_snapshot().menu.is_some());
    }

    #[test]
    fn race_uses_stored_settings() {
        let mut settings = SettingsStore::new();
        settings.set_float(keys::WINNING_METER, 60.0);
        settings.set_string(keys::PLAYER1_NAME, "Alice");
        settings.set_int(keys::PLAYER2_CYCLE, 3);
        let mut server = GameServer::new(settings);

        server.load_scene(Scene::Race);

        let race = server.race().unwrap();
        assert_eq!(race.status(), RaceStatus::Countdown);
        assert_eq!(race.config.winning_distance, 60.0);
        assert_eq!(race.players[0].name, "Alice");
        assert_eq!(race.players[1].name, "Player 2");
        assert_eq!(server.cycles(), Some([0, 3]));
    }

    #[test]
    fn winner_is_persisted_and_results_follow() {
        let mut server = server_on(Scene::Race);
        let keys = KeyState::from_held([KeyCode::W]);
        let mut frames = 0;
        while server.scene() == Scene::Race && frames < 60 * 60 {
            server.advance(DT, &keys);
            frames += 1;
        }

        assert_eq!(server.scene(), Scene::Results);
        let store = server.settings();
        assert_eq!(store.get_string(keys::WINNER_NAME, ""), "Player 1");
        assert!(store.get_float(keys::WINNER_DISTANCE, 0.0) >= 100.0);
        assert_eq!(History::count(store), 1);

        let results = server.get_snapshot().results.unwrap();
        assert_eq!(results.winner_name, "Player 1");
        let events = server.drain_events();
        assert!(events
            .iter()
            .any(|e| matches!(e, GameEvent::WinnerDeclared { player: 1, .. })));
    }

    #[test]
    fn paused_server_does_not_advance() {
        let mut server = server_on(Scene::Race);
        server.pause();
        for _ in 0..300 {
            server.advance(DT, &KeyState::new());
        }
        assert_eq!(server.race().unwrap().status(), RaceStatus::Countdown);

        server.resume();
        for _ in 0..200 {
            server.advance(DT, &KeyState::new());
        }
        assert_eq!(server.race().unwrap().status(), RaceStatus::Racing);
    }

    #[test]
    fn home_flow_reaches_race() {
        let mut server = server_on(Scene::Home);
        server.home_action(HomeAction::OpenSettings);
        server.home_action(HomeAction::SetNameEntry(false));
        server.home_action(HomeAction::SaveSettings);
        server.home_action(HomeAction::Start);
        server.home_action(HomeAction::SelectCycle { player: 1, index: 1 });
        server.home_action(HomeAction::ConfirmPlayer1);
        server.home_action(HomeAction::SelectCycle { player: 2, index: 2 });
        server.home_action(HomeAction::ReadyToRace);

        assert_eq!(server.scene(), Scene::Race);
        assert_eq!(server.cycles(), Some([1, 2]));
    }

    #[test]
    fn quit_stops_the_session() {
        let mut server = server_on(Scene::Home);
        server.home_action(HomeAction::Quit);
        assert!(server.quit_requested());
    }

    #[test]
    fn winning_distance_only_with_active_race() {
        let mut server = server_on(Scene::Home);
        assert_eq!(server.set_winning_distance(200.0), None);

        server.load_scene(Scene::Race);
        assert_eq!(server.set_winning_distance(1000.0), Some(500.0));
    }

    /// Hold `keys` until the race has a winner
    fn race_to_result(server: &mut GameServer, keys: &KeyState) -> RaceResult {
        let mut frames = 0;
        while server.race().is_some_and(|r| r.result.is_none()) && frames < 60 * 60 {
            server.advance(DT, keys);
            frames += 1;
        }
        server
            .race()
            .and_then(|r| r.result.clone())
            .expect("race finished with a winner")
    }

    #[test]
    fn default_race_is_won_on_distance() {
        let mut server = server_on(Scene::Race);
        let result = race_to_result(&mut server, &KeyState::from_held([KeyCode::W]));

        assert_eq!(result.player, 1);
        assert_eq!(result.reason, WinReason::DistanceReached);
        assert!(result.distance >= 100.0, "won at {}m", result.distance);
        assert!(server.settings().get_float(keys::WINNER_DISTANCE, 0.0) >= 100.0);
    }

    #[test]
    fn raised_winning_distance_moves_the_finish_line() {
        let mut server = server_on(Scene::Race);
        assert_eq!(server.set_winning_distance(300.0), Some(300.0));

        let result = race_to_result(&mut server, &KeyState::from_held([KeyCode::W]));

        assert_eq!(result.reason, WinReason::DistanceReached);
        assert!(result.distance >= 300.0, "won at {}m", result.distance);
    }

    #[test]
    fn reset_returns_home() {
        let mut server = server_on(Scene::Race);
        server.pause();
        server.reset();
        assert_eq!(server.scene(), Scene::Home);
        assert!(server.race().is_none());
        assert!(server.is_running());
    }
}
