//! Menu - Home screen: names, cycle selection and settings panels

use serde::{Deserialize, Serialize};

use crate::game_server::events::{GameEvent, SoundCue};
use crate::game_server::scene::{Scene, SceneRequest};
use crate::game_server::settings::{keys, SettingsStore};

/// Number of selectable cycles per player
pub const CYCLE_COUNT: u8 = 4;
/// Number of UI themes and logo positions
pub const OPTION_COUNT: i32 = 3;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MenuPanel {
    #[default]
    Home,
    CycleSelection,
    Settings,
}

/// Settings being edited; only written to the store on save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MenuSettings {
    pub winning_meter: f32,
    pub theme: i32,
    pub logo_position: i32,
    pub name_entry_enabled: bool,
}

impl MenuSettings {
    pub const MIN_WINNING_METER: f32 = 50.0;
    pub const MAX_WINNING_METER: f32 = 1000.0;

    pub fn load(store: &SettingsStore) -> Self {
        let settings = Self {
            winning_meter: store.get_float(keys::WINNING_METER, 100.0),
            theme: store.get_int(keys::UI_THEME, 0),
            logo_position: store.get_int(keys::LOGO_POSITION, 1),
            name_entry_enabled: store.get_bool(keys::NAME_ENTRY_ENABLED, true),
        };
        log::debug!("Menu settings loaded: {:?}", settings);
        settings
    }

    fn save(&self, store: &mut SettingsStore) {
        store.set_float(keys::WINNING_METER, self.winning_meter);
        store.set_int(keys::UI_THEME, self.theme);
        store.set_int(keys::LOGO_POSITION, self.logo_position);
        store.set_bool(keys::NAME_ENTRY_ENABLED, self.name_entry_enabled);
    }

    pub fn winning_meter_text(&self) -> String {
        format!("{:.0}m", self.winning_meter)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum HomeAction {
    SetPlayerName { player: u32, name: String },
    Start,
    OpenSettings,
    SelectCycle { player: u32, index: u8 },
    ConfirmPlayer1,
    ReadyToRace,
    SetWinningMeter(f32),
    SelectTheme(i32),
    SelectLogo(i32),
    SetNameEntry(bool),
    SaveSettings,
    BackFromSettings,
    Quit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeMenu {
    pub panel: MenuPanel,
    pub names: [String; 2],
    pub settings: MenuSettings,
    pub cycles: [Option<u8>; 2],
    pub player1_confirmed: bool,
}

impl HomeMenu {
    pub fn open(store: &SettingsStore) -> Self {
        Self {
            panel: MenuPanel::Home,
            names: [String::new(), String::new()],
            settings: MenuSettings::load(store),
            cycles: [None, None],
            player1_confirmed: false,
        }
    }

    pub fn start_enabled(&self) -> bool {
        !self.settings.name_entry_enabled || self.names.iter().all(|n| !n.trim().is_empty())
    }

    /// Handle one UI action. Actions that don't apply to the visible panel
    /// are ignored. Settings are written only on start, confirm, ready and save.
    pub fn apply(&mut self, action: HomeAction, store: &mut SettingsStore) -> Vec<GameEvent> {
        let click = GameEvent::PlaySound(SoundCue::ButtonClick);

        match (self.panel, action) {
            (MenuPanel::Home, HomeAction::SetPlayerName { player, name }) => {
                if let Some(slot) = player_slot(player) {
                    self.names[slot] = name;
                }
                vec![]
            }
            (MenuPanel::Home, HomeAction::Start) => {
                if !self.start_enabled() {
                    return vec![];
                }
                let [p1, p2] = self.resolved_names();
                store.set_string(keys::PLAYER1_NAME, &p1);
                store.set_string(keys::PLAYER2_NAME, &p2);
                log::info!("Players: {} vs {}", p1, p2);

                self.cycles = [None, None];
                self.player1_confirmed = false;
                self.panel = MenuPanel::CycleSelection;
                vec![click]
            }
            (MenuPanel::Home, HomeAction::OpenSettings) => {
                self.settings = MenuSettings::load(store);
                self.panel = MenuPanel::Settings;
                vec![click]
            }
            (MenuPanel::Home, HomeAction::Quit) => {
                log::info!("Quit button pressed");
                vec![click, GameEvent::SceneRequested(SceneRequest::Quit)]
            }

            (MenuPanel::CycleSelection, HomeAction::SelectCycle { player, index }) => {
                let Some(slot) = player_slot(player) else {
                    return vec![];
                };
                // P1 picks until confirmed, then only P2 may pick
                let allowed = (slot == 0) != self.player1_confirmed;
                if !allowed || index >= CYCLE_COUNT {
                    return vec![];
                }
                self.cycles[slot] = Some(index);
                log::debug!("P{} selected cycle {}", player, index);
                vec![click]
            }
            (MenuPanel::CycleSelection, HomeAction::ConfirmPlayer1) => {
                let Some(cycle) = self.cycles[0].filter(|_| !self.player1_confirmed) else {
                    return vec![];
                };
                self.player1_confirmed = true;
                store.set_int(keys::PLAYER1_CYCLE, cycle as i32);
                log::info!("P1 confirmed cycle {}", cycle);
                vec![click]
            }
            (MenuPanel::CycleSelection, HomeAction::ReadyToRace) => {
                let Some(cycle) = self.cycles[1].filter(|_| self.player1_confirmed) else {
                    return vec![];
                };
                store.set_int(keys::PLAYER2_CYCLE, cycle as i32);
                log::info!("P2 confirmed cycle {}. Loading race...", cycle);
                vec![click, GameEvent::SceneRequested(SceneRequest::Load(Scene::Race))]
            }

            (MenuPanel::Settings, HomeAction::SetWinningMeter(value)) => {
                self.settings.winning_meter =
                    value.clamp(MenuSettings::MIN_WINNING_METER, MenuSettings::MAX_WINNING_METER);
                vec![]
            }
            (MenuPanel::Settings, HomeAction::SelectTheme(theme)) => {
                if !(0..OPTION_COUNT).contains(&theme) {
                    return vec![];
                }
                self.settings.theme = theme;
                vec![click]
            }
            (MenuPanel::Settings, HomeAction::SelectLogo(position)) => {
                if !(0..OPTION_COUNT).contains(&position) {
                    return vec![];
                }
                self.settings.logo_position = position;
                vec![click]
            }
            (MenuPanel::Settings, HomeAction::SetNameEntry(enabled)) => {
                self.settings.name_entry_enabled = enabled;
                vec![]
            }
            (MenuPanel::Settings, HomeAction::SaveSettings) => {
                self.settings.save(store);
                log::info!("Settings saved: {:?}", self.settings);
                self.panel = MenuPanel::Home;
                vec![click]
            }
            (MenuPanel::Settings, HomeAction::BackFromSettings) => {
                self.settings = MenuSettings::load(store);
                log::info!("Settings discarded");
                self.panel = MenuPanel::Home;
                vec![click]
            }

            (panel, action) => {
                log::debug!("Ignoring {:?} on {:?} panel", action, panel);
                vec![]
            }
        }
    }

    fn resolved_names(&self) -> [String; 2] {
        let defaults = ["Player 1", "Player 2"];
        let mut names = defaults.map(String::from);
        if self.settings.name_entry_enabled {
            for (slot, name) in self.names.iter().enumerate() {
                if !name.trim().is_empty() {
                    names[slot] = name.clone();
                }
            }
        }
        names
    }
}

fn player_slot(player: u32) -> Option<usize> {
    match player {
        1 => Some(0),
        2 => Some(1),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn click() -> GameEvent {
        GameEvent::PlaySound(SoundCue::ButtonClick)
    }

    fn name(player: u32, name: &str) -> HomeAction {
        HomeAction::SetPlayerName {
            player,
            name: name.to_string(),
        }
    }

    #[test]
    fn start_needs_both_names_when_entry_enabled() {
        let mut store = SettingsStore::new();
        let mut menu = HomeMenu::open(&store);

        menu.apply(name(1, "Alice"), &mut store);
        assert!(menu.apply(HomeAction::Start, &mut store).is_empty());
        assert_eq!(menu.panel, MenuPanel::Home);

        menu.apply(name(2, "Bob"), &mut store);
        assert_eq!(menu.apply(HomeAction::Start, &mut store), vec![click()]);
        assert_eq!(menu.panel, MenuPanel::CycleSelection);
        assert_eq!(store.get_string(keys::PLAYER1_NAME, ""), "Alice");
        assert_eq!(store.get_string(keys::PLAYER2_NAME, ""), "Bob");
    }

    #[test]
    fn name_entry_off_uses_default_names() {
        let mut store = SettingsStore::new();
        store.set_bool(keys::NAME_ENTRY_ENABLED, false);
        let mut menu = HomeMenu::open(&store);
        menu.apply(name(1, "Ignored"), &mut store);

        menu.apply(HomeAction::Start, &mut store);

        assert_eq!(store.get_string(keys::PLAYER1_NAME, ""), "Player 1");
        assert_eq!(store.get_string(keys::PLAYER2_NAME, ""), "Player 2");
    }

    #[test]
    fn cycle_selection_flow() {
        let mut store = SettingsStore::new();
        store.set_bool(keys::NAME_ENTRY_ENABLED, false);
        let mut menu = HomeMenu::open(&store);
        menu.apply(HomeAction::Start, &mut store);

        // nothing picked yet
        assert!(menu.apply(HomeAction::ConfirmPlayer1, &mut store).is_empty());
        // P2 can't pick before P1 confirms
        assert!(menu
            .apply(HomeAction::SelectCycle { player: 2, index: 1 }, &mut store)
            .is_empty());
        // out of range
        assert!(menu
            .apply(HomeAction::SelectCycle { player: 1, index: 4 }, &mut store)
            .is_empty());

        menu.apply(HomeAction::SelectCycle { player: 1, index: 2 }, &mut store);
        menu.apply(HomeAction::ConfirmPlayer1, &mut store);
        assert_eq!(store.get_int(keys::PLAYER1_CYCLE, -1), 2);

        // P1 locked in
        assert!(menu
            .apply(HomeAction::SelectCycle { player: 1, index: 0 }, &mut store)
            .is_empty());
        assert!(menu.apply(HomeAction::ReadyToRace, &mut store).is_empty());

        menu.apply(HomeAction::SelectCycle { player: 2, index: 3 }, &mut store);
        let events = menu.apply(HomeAction::ReadyToRace, &mut store);
        assert_eq!(store.get_int(keys::PLAYER2_CYCLE, -1), 3);
        assert!(events.contains(&GameEvent::SceneRequested(SceneRequest::Load(Scene::Race))));
    }

    #[test]
    fn restarting_resets_selection() {
        let mut store = SettingsStore::new();
        store.set_bool(keys::NAME_ENTRY_ENABLED, false);
        let mut menu = HomeMenu::open(&store);
        menu.apply(HomeAction::Start, &mut store);
        menu.apply(HomeAction::SelectCycle { player: 1, index: 1 }, &mut store);
        menu.apply(HomeAction::ConfirmPlayer1, &mut store);

        menu.panel = MenuPanel::Home;
        menu.apply(HomeAction::Start, &mut store);
        assert_eq!(menu.cycles, [None, None]);
        assert!(!menu.player1_confirmed);
    }

    #[test]
    fn settings_save_and_discard() {
        let mut store = SettingsStore::new();
        let mut menu = HomeMenu::open(&store);

        menu.apply(HomeAction::OpenSettings, &mut store);
        menu.apply(HomeAction::SetWinningMeter(5000.0), &mut store);
        menu.apply(HomeAction::SelectTheme(2), &mut store);
        assert_eq!(menu.settings.winning_meter_text(), "1000m");
        menu.apply(HomeAction::BackFromSettings, &mut store);
        assert_eq!(menu.panel, MenuPanel::Home);
        assert!(!store.has_key(keys::WINNING_METER));
        assert_eq!(menu.settings.winning_meter, 100.0);

        menu.apply(HomeAction::OpenSettings, &mut store);
        menu.apply(HomeAction::SetWinningMeter(20.0), &mut store);
        menu.apply(HomeAction::SelectLogo(0), &mut store);
        menu.apply(HomeAction::SetNameEntry(false), &mut store);
        menu.apply(HomeAction::SaveSettings, &mut store);

        assert_eq!(store.get_float(keys::WINNING_METER, 0.0), 50.0);
        assert_eq!(store.get_int(keys::LOGO_POSITION, 1), 0);
        assert!(!store.get_bool(keys::NAME_ENTRY_ENABLED, true));
        assert!(menu.start_enabled());
    }

    #[test]
    fn quit_requests_exit() {
        let mut store = SettingsStore::new();
        let mut menu = HomeMenu::open(&store);
        let events = menu.apply(HomeAction::Quit, &mut store);
        assert_eq!(events, vec![click(), GameEvent::SceneRequested(SceneRequest::Quit)]);
    }
}
