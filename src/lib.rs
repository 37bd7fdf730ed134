//! Cycle Race - Tauri Backend
//!
//! Provides the race simulation and commands for frontend communication.

pub mod game_server;

#[cfg(feature = "desktop")]
mod commands {
    use std::sync::Mutex;
    use tauri::{AppHandle, State};

    use crate::game_server::menu::HomeAction;
    use crate::game_server::results::{ResultsAction, ResultsScreen};
    use crate::game_server::simulation::{GameServer, ServerStats, SessionSnapshot};
    use crate::game_server::{BodyHandle, GameEvent, KeyCode, Scene};

    /// Get the active scene
    #[tauri::command]
    pub fn get_scene(server: State<'_, Mutex<GameServer>>) -> Result<Scene, String> {
        let server = server.lock().map_err(|e| e.to_string())?;
        Ok(server.scene())
    }

    /// Switch to another scene
    #[tauri::command]
    pub fn load_scene(server: State<'_, Mutex<GameServer>>, scene: Scene) -> Result<(), String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        server.load_scene(scene);
        Ok(())
    }

    /// Advance the simulation with the keys currently held and return the new state
    #[tauri::command]
    pub fn tick(
        app: AppHandle,
        server: State<'_, Mutex<GameServer>>,
        keys: Vec<KeyCode>,
    ) -> Result<SessionSnapshot, String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        let snapshot = server.tick(&keys);
        if server.quit_requested() {
            log::info!("Exiting");
            app.exit(0);
        }
        Ok(snapshot)
    }

    /// Get current snapshot without advancing simulation
    #[tauri::command]
    pub fn get_snapshot(server: State<'_, Mutex<GameServer>>) -> Result<SessionSnapshot, String> {
        let server = server.lock().map_err(|e| e.to_string())?;
        Ok(server.get_snapshot())
    }

    /// Events queued since the last call
    #[tauri::command]
    pub fn drain_events(server: State<'_, Mutex<GameServer>>) -> Result<Vec<GameEvent>, String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        Ok(server.drain_events())
    }

    /// Get server statistics
    #[tauri::command]
    pub fn get_stats(server: State<'_, Mutex<GameServer>>) -> Result<ServerStats, String> {
        let server = server.lock().map_err(|e| e.to_string())?;
        Ok(server.get_stats())
    }

    /// Pause the simulation
    #[tauri::command]
    pub fn pause_race(server: State<'_, Mutex<GameServer>>) -> Result<(), String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        server.pause();
        log::info!("Race paused");
        Ok(())
    }

    /// Resume the simulation
    #[tauri::command]
    pub fn resume_race(server: State<'_, Mutex<GameServer>>) -> Result<(), String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        server.resume();
        log::info!("Race resumed");
        Ok(())
    }

    /// Back to the home screen
    #[tauri::command]
    pub fn reset_race(server: State<'_, Mutex<GameServer>>) -> Result<(), String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        server.reset();
        log::info!("Race reset");
        Ok(())
    }

    /// Finish-line trigger reported by the frontend's own physics
    #[tauri::command]
    pub fn finish_line_crossed(server: State<'_, Mutex<GameServer>>, body: u32) -> Result<(), String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        server.finish_line_crossed(BodyHandle(body));
        Ok(())
    }

    #[tauri::command]
    pub fn home_action(server: State<'_, Mutex<GameServer>>, action: HomeAction) -> Result<(), String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        server.home_action(action);
        Ok(())
    }

    #[tauri::command]
    pub fn results_action(
        server: State<'_, Mutex<GameServer>>,
        action: ResultsAction,
    ) -> Result<(), String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        server.results_action(action);
        Ok(())
    }

    #[tauri::command]
    pub fn history_count(server: State<'_, Mutex<GameServer>>) -> Result<usize, String> {
        let server = server.lock().map_err(|e| e.to_string())?;
        Ok(ResultsScreen::history_count(server.settings()))
    }

    /// Returns the clamped distance, or None without an active race
    #[tauri::command]
    pub fn set_winning_distance(
        server: State<'_, Mutex<GameServer>>,
        distance: f32,
    ) -> Result<Option<f32>, String> {
        let mut server = server.lock().map_err(|e| e.to_string())?;
        Ok(server.set_winning_distance(distance))
    }
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use game_server::{GameServer, RaceConfig, SettingsStore};
    use std::sync::Mutex;
    use tauri::Manager;

    tauri::Builder::default()
        .setup(|app| {
            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(log::LevelFilter::Info)
                        .build(),
                )?;
            }

            let data_dir = app.path().app_data_dir()?;
            let settings = SettingsStore::load_or_empty(data_dir.join("settings.json"));

            let mut server = GameServer::new(settings);
            let config_path = app.path().app_config_dir()?.join("race.json");
            if config_path.exists() {
                match RaceConfig::from_json_file(&config_path) {
                    Ok(config) => server = server.with_config(config),
                    Err(e) => log::warn!("Ignoring race config: {:#}", e),
                }
            }

            app.manage(Mutex::new(server));
            log::info!("Cycle race game server initialized");
            Ok(())
        })
        .invoke_handler(tauri::generate_handler![
            commands::get_scene,
            commands::load_scene,
            commands::tick,
            commands::get_snapshot,
            commands::drain_events,
            commands::get_stats,
            commands::pause_race,
            commands::resume_race,
            commands::reset_race,
            commands::finish_line_crossed,
            commands::home_action,
            commands::results_action,
            commands::history_count,
            commands::set_winning_distance,
        ])
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
