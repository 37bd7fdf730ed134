//! Results - Post-race winner and history screen

use serde::{Deserialize, Serialize};

use crate::game_server::events::{GameEvent, SoundCue};
use crate::game_server::history::History;
use crate::game_server::hud::format_distance;
use crate::game_server::scene::{Scene, SceneRequest};
use crate::game_server::settings::{keys, SettingsStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultsPanel {
    #[default]
    Winner,
    History,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultsAction {
    ShowHistory,
    BackFromHistory,
    PlayAgain,
    MainMenu,
    ClearHistory,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRow {
    pub rank: usize,
    pub name: String,
    pub distance_text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsScreen {
    pub panel: ResultsPanel,
    pub winner_name: String,
    pub winner_distance: f32,
    pub winner_distance_text: String,
    pub rows: Vec<HistoryRow>,
}

impl ResultsScreen {
    pub fn open(store: &SettingsStore) -> Self {
        let winner_name = store.get_string(keys::WINNER_NAME, "Unknown");
        let winner_distance = store.get_float(keys::WINNER_DISTANCE, 0.0);
        log::info!("Winner: {} - {:.1}m", winner_name, winner_distance);

        Self {
            panel: ResultsPanel::Winner,
            winner_distance_text: format_distance(winner_distance),
            winner_name,
            winner_distance,
            rows: Vec::new(),
        }
    }

    pub fn apply(&mut self, action: ResultsAction, store: &mut SettingsStore) -> Vec<GameEvent> {
        let click = GameEvent::PlaySound(SoundCue::ButtonClick);
        match action {
            ResultsAction::ShowHistory => {
                self.rows = Self::history_rows(store);
                self.panel = ResultsPanel::History;
                vec![click]
            }
            ResultsAction::BackFromHistory => {
                self.panel = ResultsPanel::Winner;
                vec![click]
            }
            ResultsAction::PlayAgain => {
                vec![click, GameEvent::SceneRequested(SceneRequest::Load(Scene::Race))]
            }
            ResultsAction::MainMenu => {
                vec![click, GameEvent::SceneRequested(SceneRequest::Load(Scene::Home))]
            }
            ResultsAction::ClearHistory => {
                History::clear(store);
                self.rows.clear();
                log::info!("History cleared");
                vec![]
            }
        }
    }

    pub fn history_rows(store: &SettingsStore) -> Vec<HistoryRow> {
        History::entries(store)
            .into_iter()
            .map(|entry| HistoryRow {
                rank: entry.rank,
                name: entry.name,
                distance_text: format_distance(entry.distance),
            })
            .collect()
    }

    pub fn history_count(store: &SettingsStore) -> usize {
        History::count(store)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_store_shows_unknown_winner() {
        let screen = ResultsScreen::open(&SettingsStore::new());
        assert_eq!(screen.winner_name, "Unknown");
        assert_eq!(screen.winner_distance_text, "0.0m");
        assert_eq!(screen.panel, ResultsPanel::Winner);
    }

    #[test]
    fn history_panel_lists_rows() {
        let mut store = SettingsStore::new();
        History::push(&mut store, "Alice", 100.04);
        History::push(&mut store, "Bob", 120.26);
        let mut screen = ResultsScreen::open(&store);

        screen.apply(ResultsAction::ShowHistory, &mut store);

        assert_eq!(screen.panel, ResultsPanel::History);
        assert_eq!(
            screen.rows[0],
            HistoryRow {
                rank: 1,
                name: "Bob".into(),
                distance_text: "120.3m".into()
            }
        );
        assert_eq!(screen.rows[1].distance_text, "100.0m");

        screen.apply(ResultsAction::BackFromHistory, &mut store);
        assert_eq!(screen.panel, ResultsPanel::Winner);
    }

    #[test]
    fn navigation_requests_scenes() {
        let mut store = SettingsStore::new();
        let mut screen = ResultsScreen::open(&store);
        assert!(screen
            .apply(ResultsAction::PlayAgain, &mut store)
            .contains(&GameEvent::SceneRequested(SceneRequest::Load(Scene::Race))));
        assert!(screen
            .apply(ResultsAction::MainMenu, &mut store)
            .contains(&GameEvent::SceneRequested(SceneRequest::Load(Scene::Home))));
    }

    #[test]
    fn clear_history_empties_store() {
        let mut store = SettingsStore::new();
        History::push(&mut store, "Alice", 60.0);
        let mut screen = ResultsScreen::open(&store);

        screen.apply(ResultsAction::ClearHistory, &mut store);

        assert_eq!(ResultsScreen::history_count(&store), 0);
    }
}
