//! The configuration of the simulation, given from environment variables and lazy
//! initialized when needed.

use std::path::{Path, PathBuf};
use std::env;

use once_cell::race::OnceBool;
use once_cell::sync::Lazy;


/// Path of the smelter configuration file.
///
/// Set with `SMELTER_CONFIG`, defaults to `config.toml`.
pub fn config_path() -> &'static Path {
    static ENV: Lazy<PathBuf> = Lazy::new(|| env_path("SMELTER_CONFIG", "config.toml"));
    &ENV
}

/// Path of the locales directory.
///
/// Set with `SMELTER_LOCALES`, defaults to `locales`.
pub fn locales_path() -> &'static Path {
    static ENV: Lazy<PathBuf> = Lazy::new(|| env_path("SMELTER_LOCALES", "locales"));
    &ENV
}

/// Path of the player settings file.
///
/// Set with `SMELTER_SETTINGS`, defaults to `player_settings.toml`.
pub fn settings_path() -> &'static Path {
    static ENV: Lazy<PathBuf> = Lazy::new(|| env_path("SMELTER_SETTINGS", "player_settings.toml"));
    &ENV
}

/// Return true if ticks should run as fast as possible instead of every 50 ms.
///
/// To enable this, set `SMELTER_FAST=1`.
pub fn fast() -> bool {
    static ENV: OnceBool = OnceBool::new();
    ENV.get_or_init(|| {
        env::var_os("SMELTER_FAST")
            .map(|s| s.as_encoded_bytes() == b"1")
            .unwrap_or(false)
    })
}

fn env_path(name: &str, default: &str) -> PathBuf {
    env::var_os(name)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(default))
}
