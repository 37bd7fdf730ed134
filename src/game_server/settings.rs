//! Settings - Persisted key/value store shared by every scene
//!
//! Values are typed (float, int, string) and kept in memory until an explicit
//! `save`. Reads of a missing key, or of a key holding another type, fall back
//! to the caller's default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Well-known setting keys
pub mod keys {
    pub const WINNING_METER: &str = "WinningMeter";
    pub const UI_THEME: &str = "UITheme";
    pub const LOGO_POSITION: &str = "LogoPosition";
    pub const NAME_ENTRY_ENABLED: &str = "NameEntryEnabled";
    pub const PLAYER1_NAME: &str = "Player1Name";
    pub const PLAYER2_NAME: &str = "Player2Name";
    pub const PLAYER1_CYCLE: &str = "Player1Cycle";
    pub const PLAYER2_CYCLE: &str = "Player2Cycle";
    pub const WINNER_NAME: &str = "WinnerName";
    pub const WINNER_DISTANCE: &str = "WinnerDistance";

    /// `HistoryName_{slot}`, slot is 1-based
    pub fn history_name(slot: usize) -> String {
        format!("HistoryName_{}", slot)
    }

    /// `HistoryDist_{slot}`, slot is 1-based
    pub fn history_distance(slot: usize) -> String {
        format!("HistoryDist_{}", slot)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SettingValue {
    Float(f32),
    Int(i32),
    Str(String),
}

#[derive(Debug, Clone, Default)]
pub struct SettingsStore {
    values: BTreeMap<String, SettingValue>,
    path: Option<PathBuf>,
}

impl SettingsStore {
    /// In-memory store with no backing file
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from `path`. A missing file yields an empty store bound to that path.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let values = if path.exists() {
            let text = fs::read_to_string(path)
                .with_context(|| format!("reading settings from {}", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("parsing settings in {}", path.display()))?
        } else {
            log::info!("No settings at {}, starting fresh", path.display());
            BTreeMap::new()
        };

        Ok(Self {
            values,
            path: Some(path.to_path_buf()),
        })
    }

    /// Empty store that will save to `path`
    pub fn empty_at(path: impl AsRef<Path>) -> Self {
        Self {
            values: BTreeMap::new(),
            path: Some(path.as_ref().to_path_buf()),
        }
    }

    /// Like `load`, but an unreadable or corrupt file starts an empty store
    /// bound to the same path. The next save replaces the bad file.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        Self::load(path).unwrap_or_else(|e| {
            log::warn!("Ignoring settings: {:#}", e);
            Self::empty_at(path)
        })
    }

    /// Write to the backing file, if any
    pub fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            fs::create_dir_all(dir)
                .with_context(|| format!("creating settings directory {}", dir.display()))?;
        }
        let text = serde_json::to_string_pretty(&self.values)?;
        fs::write(path, text)
            .with_context(|| format!("writing settings to {}", path.display()))?;
        log::debug!("Settings saved to {}", path.display());
        Ok(())
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get_float(&self, key: &str, default: f32) -> f32 {
        match self.values.get(key) {
            Some(SettingValue::Float(v)) => *v,
            _ => default,
        }
    }

    pub fn get_int(&self, key: &str, default: i32) -> i32 {
        match self.values.get(key) {
            Some(SettingValue::Int(v)) => *v,
            _ => default,
        }
    }

    pub fn get_string(&self, key: &str, default: &str) -> String {
        match self.values.get(key) {
            Some(SettingValue::Str(v)) => v.clone(),
            _ => default.to_string(),
        }
    }

    /// Flags are stored as ints, 1 meaning true
    pub fn get_bool(&self, key: &str, default: bool) -> bool {
        self.get_int(key, default as i32) == 1
    }

    pub fn set_float(&mut self, key: &str, value: f32) {
        self.values.insert(key.to_string(), SettingValue::Float(value));
    }

    pub fn set_int(&mut self, key: &str, value: i32) {
        self.values.insert(key.to_string(), SettingValue::Int(value));
    }

    pub fn set_string(&mut self, key: &str, value: impl Into<String>) {
        self.values
            .insert(key.to_string(), SettingValue::Str(value.into()));
    }

    pub fn set_bool(&mut self, key: &str, value: bool) {
        self.set_int(key, value as i32);
    }

    pub fn delete_key(&mut self, key: &str) {
        self.values.remove(key);
    }

    pub fn has_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_for_missing_and_mistyped_keys() {
        let mut store = SettingsStore::new();
        assert_eq!(store.get_float(keys::WINNING_METER, 100.0), 100.0);

        store.set_int(keys::WINNING_METER, 7);
        assert_eq!(store.get_float(keys::WINNING_METER, 100.0), 100.0);
        assert_eq!(store.get_int(keys::WINNING_METER, 0), 7);
        assert_eq!(store.get_string(keys::WINNER_NAME, "Unknown"), "Unknown");
    }

    #[test]
    fn bools_are_ints() {
        let mut store = SettingsStore::new();
        assert!(store.get_bool(keys::NAME_ENTRY_ENABLED, true));
        store.set_bool(keys::NAME_ENTRY_ENABLED, false);
        assert_eq!(store.get_int(keys::NAME_ENTRY_ENABLED, 9), 0);
        store.set_int(keys::NAME_ENTRY_ENABLED, 2);
        assert!(!store.get_bool(keys::NAME_ENTRY_ENABLED, true));
    }

    #[test]
    fn delete_and_has_key() {
        let mut store = SettingsStore::new();
        store.set_string(keys::PLAYER1_NAME, "Alice");
        assert!(store.has_key(keys::PLAYER1_NAME));
        store.delete_key(keys::PLAYER1_NAME);
        assert!(!store.has_key(keys::PLAYER1_NAME));
    }

    #[test]
    fn round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("prefs").join("settings.json");

        let mut store = SettingsStore::load(&path).unwrap();
        store.set_float(keys::WINNER_DISTANCE, 123.5);
        store.set_string(keys::WINNER_NAME, "Bob");
        store.set_int(keys::LOGO_POSITION, 2);
        store.save().unwrap();

        let reloaded = SettingsStore::load(&path).unwrap();
        assert_eq!(reloaded.get_float(keys::WINNER_DISTANCE, 0.0), 123.5);
        assert_eq!(reloaded.get_string(keys::WINNER_NAME, ""), "Bob");
        assert_eq!(reloaded.get_int(keys::LOGO_POSITION, 1), 2);
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let err = SettingsStore::load(&path).unwrap_err();
        assert!(format!("{:#}", err).contains("parsing settings"));
    }

    #[test]
    fn corrupt_file_falls_back_to_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        fs::write(&path, "{ not json").unwrap();

        let mut store = SettingsStore::load_or_empty(&path);
        assert!(!store.has_key(keys::WINNING_METER));
        assert_eq!(store.path(), Some(path.as_path()));

        store.set_float(keys::WINNING_METER, 200.0);
        store.save().unwrap();
        let reloaded = SettingsStore::load(&path).unwrap();
        assert_eq!(reloaded.get_float(keys::WINNING_METER, 0.0), 200.0);
    }

    #[test]
    fn memory_store_save_is_noop() {
        assert!(SettingsStore::new().save().is_ok());
    }
}
