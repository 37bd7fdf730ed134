//! History - Most-recent-first leaderboard of past winners
//!
//! Stored in the settings store as `HistoryName_{1..5}` / `HistoryDist_{1..5}`.

use serde::{Deserialize, Serialize};

use crate::game_server::settings::{keys, SettingsStore};

pub const HISTORY_CAPACITY: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// 1 is the most recent race
    pub rank: usize,
    pub name: String,
    pub distance: f32,
}

pub struct History;

impl History {
    /// Record a result in slot 1, shifting older ones down. Slot 5 falls off.
    pub fn push(store: &mut SettingsStore, name: &str, distance: f32) {
        for slot in (1..HISTORY_CAPACITY).rev() {
            let prev_name = store.get_string(&keys::history_name(slot), "");
            let prev_dist = store.get_float(&keys::history_distance(slot), 0.0);
            store.set_string(&keys::history_name(slot + 1), prev_name);
            store.set_float(&keys::history_distance(slot + 1), prev_dist);
        }
        store.set_string(&keys::history_name(1), name);
        store.set_float(&keys::history_distance(1), distance);
        log::info!("History: recorded {} at {:.1}m", name, distance);
    }

    /// Non-empty slots, most recent first
    pub fn entries(store: &SettingsStore) -> Vec<HistoryEntry> {
        (1..=HISTORY_CAPACITY)
            .filter_map(|slot| {
                let name = store.get_string(&keys::history_name(slot), "");
                if name.is_empty() {
                    return None;
                }
                Some(HistoryEntry {
                    rank: slot,
                    name,
                    distance: store.get_float(&keys::history_distance(slot), 0.0),
                })
            })
            .collect()
    }

    pub fn count(store: &SettingsStore) -> usize {
        (1..=HISTORY_CAPACITY)
            .filter(|slot| !store.get_string(&keys::history_name(*slot), "").is_empty())
            .count()
    }

    pub fn clear(store: &mut SettingsStore) {
        for slot in 1..=HISTORY_CAPACITY {
            store.delete_key(&keys::history_name(slot));
            store.delete_key(&keys::history_distance(slot));
        }
    }
}
