//! Per-actor preferences, persisted as a small TOML file that is saved on every
//! change.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use tracing::{debug, warn};

use crate::item::ActorId;


/// Preferences of a single actor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerPrefs {
    #[serde(default = "default_true")]
    pub sounds_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locale: Option<String>,
}

impl Default for PlayerPrefs {
    fn default() -> Self {
        Self { sounds_enabled: true, locale: None }
    }
}

/// On-disk document, actors are keyed by their hex id.
#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    players: BTreeMap<String, PlayerPrefs>,
}


/// Preferences of all known actors.
#[derive(Debug, Default)]
pub struct PlayerSettings {
    /// Where settings are saved, no persistence if absent.
    path: Option<PathBuf>,
    players: BTreeMap<ActorId, PlayerPrefs>,
}

impl PlayerSettings {

    /// Settings that are never persisted.
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Load settings from the given file, a missing file gives empty settings that
    /// will be saved to that path.
    pub fn load(path: &Path) -> Result<Self, SettingsError> {

        let file = match std::fs::read_to_string(path) {
            Ok(text) => toml::from_str::<SettingsFile>(&text)?,
            Err(err) if err.kind() == io::ErrorKind::NotFound => SettingsFile::default(),
            Err(err) => return Err(SettingsError::Io(err)),
        };

        let mut players = BTreeMap::new();
        for (key, prefs) in file.players {
            match key.parse::<ActorId>() {
                Ok(id) => { players.insert(id, prefs); }
                Err(_) => warn!("ignoring settings of invalid actor id '{key}'"),
            }
        }

        debug!("loaded settings of {} actor(s)", players.len());
        Ok(Self { path: Some(path.to_path_buf()), players })

    }

    /// Save the settings to their file, if any.
    pub fn save(&self) -> Result<(), SettingsError> {

        let Some(path) = &self.path else {
            return Ok(());
        };

        let file = SettingsFile {
            players: self.players.iter()
                .map(|(id, prefs)| (id.to_string(), prefs.clone()))
                .collect(),
        };

        std::fs::write(path, toml::to_string_pretty(&file)?)?;
        Ok(())

    }

    /// Save and only log failures, changes are still applied in memory.
    fn save_logged(&self) {
        if let Err(err) = self.save() {
            warn!("could not save player settings: {err}");
        }
    }

    pub fn get(&self, actor: ActorId) -> Option<&PlayerPrefs> {
        self.players.get(&actor)
    }

    pub fn is_sound_enabled(&self, actor: ActorId) -> bool {
        self.players.get(&actor).is_none_or(|prefs| prefs.sounds_enabled)
    }

    pub fn set_sound_enabled(&mut self, actor: ActorId, enabled: bool) {
        self.players.entry(actor).or_default().sounds_enabled = enabled;
        self.save_logged();
    }

    /// Toggle sounds and return the new state.
    pub fn toggle_sound(&mut self, actor: ActorId) -> bool {
        let enabled = !self.is_sound_enabled(actor);
        self.set_sound_enabled(actor, enabled);
        enabled
    }

    /// The locale id chosen by the actor, if any.
    pub fn locale(&self, actor: ActorId) -> Option<&str> {
        self.players.get(&actor).and_then(|prefs| prefs.locale.as_deref())
    }

    pub fn set_locale(&mut self, actor: ActorId, locale: &str) {
        self.players.entry(actor).or_default().locale = Some(locale.to_string());
        self.save_logged();
    }

}

fn default_true() -> bool {
    true
}


/// Error while loading or saving settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("malformed settings: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("cannot serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),
}
