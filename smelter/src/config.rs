//! Configuration loading. The configuration is a TOML document holding the engine
//! tuning, the sound cues and the smeltable item definitions.
//!
//! Item definitions are parsed one by one, a definition that cannot be parsed or that
//! is invalid is skipped with a warning and the others are still loaded.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::io;

use indexmap::IndexMap;
use serde::Deserialize;
use thiserror::Error;

use tracing::{info, warn};

use crate::definition::{DefinitionError, ItemDefinition, YieldRange, MAX_THRESHOLD};
use crate::item::{DeviceKind, Material};
use crate::registry::Registry;


/// Configuration used when no configuration file exists.
pub const DEFAULT_CONFIG: &str = r#"
language = "en_us"

[engine]
debounce_ms = 150
cleanup_steps = 5
block_during_cleanup = true
reset_fuel_on_failure = false

[sounds]
radius = 16.0
success = { name = "block.smithing_table.use", volume = 1.0, pitch = 1.0 }
failure = { name = "block.fire.extinguish", volume = 1.0, pitch = 0.8 }

[default_items.iron_pickaxe]
material = "IRON_PICKAXE"
smelt_in = "BLAST_FURNACE"
max_durability = 250
output = { material = "IRON_NUGGET" }
durability_ranges."0" = { min = 1, max = 2 }
durability_ranges."25" = { min = 3, max = 5 }
durability_ranges."50" = { min = 6, max = 9 }
durability_ranges."75" = { min = 10, max = 14 }

[default_items.iron_sword]
material = "IRON_SWORD"
smelt_in = "BLAST_FURNACE"
max_durability = 250
output = { material = "IRON_NUGGET" }
durability_ranges."0" = { min = 1, max = 1 }
durability_ranges."50" = { min = 4, max = 6 }
durability_ranges."80" = { min = 7, max = 9 }

[default_items.golden_axe]
material = "GOLDEN_AXE"
smelt_in = "FURNACE"
max_durability = 32
smelt_time_multiplier = 1.5
output = { material = "GOLD_NUGGET" }
durability_ranges."10" = { min = 2, max = 4 }
durability_ranges."60" = { min = 5, max = 9 }

[default_items.minecart]
material = "MINECART"
smelt_in = "BLAST_FURNACE"
durability_based = false
output = { material = "IRON_INGOT" }
durability_ranges."100" = { min = 3, max = 5 }
"#;


/// Engine tuning.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Window in milliseconds in which repeated completion signals for the same
    /// device are ignored.
    pub debounce_ms: u64,
    /// Number of deferred cleanup steps after a failed smelting, one per tick.
    pub cleanup_steps: u8,
    /// If a device is refused new smelting while a cleanup is outstanding.
    pub block_during_cleanup: bool,
    /// If the fuel timer is also reset on failure, stopping the device entirely.
    pub reset_fuel_on_failure: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 150,
            cleanup_steps: 5,
            block_during_cleanup: true,
            reset_fuel_on_failure: false,
        }
    }
}

/// A sound played at a device location.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SoundCue {
    pub name: String,
    #[serde(default = "default_unit")]
    pub volume: f32,
    #[serde(default = "default_unit")]
    pub pitch: f32,
}

/// Sound cues of the engine.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct SoundConfig {
    /// Actors within this distance of a device hear its cues.
    pub radius: f32,
    pub success: SoundCue,
    pub failure: SoundCue,
}

impl Default for SoundConfig {
    fn default() -> Self {
        Self {
            radius: 16.0,
            success: SoundCue { name: "block.smithing_table.use".to_string(), volume: 1.0, pitch: 1.0 },
            failure: SoundCue { name: "block.fire.extinguish".to_string(), volume: 1.0, pitch: 0.8 },
        }
    }
}

/// The whole configuration, except the item definitions which are loaded into a
/// [`Registry`].
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Default locale id.
    pub language: String,
    pub engine: EngineConfig,
    pub sounds: SoundConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            language: default_language(),
            engine: EngineConfig::default(),
            sounds: SoundConfig::default(),
        }
    }
}

impl Config {

    /// Load the configuration file at the given path.
    pub fn load(path: &Path) -> Result<(Self, Registry), ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|err| ConfigError::Io { path: path.to_path_buf(), err })?;
        Self::parse(&text)
    }

    /// Load the configuration file at the given path, or the default configuration
    /// if the file does not exist.
    pub fn load_or_default(path: &Path) -> Result<(Self, Registry), ConfigError> {
        if path.exists() {
            Self::load(path)
        } else {
            info!("no configuration at {}, using defaults", path.display());
            Self::parse(DEFAULT_CONFIG)
        }
    }

    /// Parse the configuration document, building the registry of definitions.
    /// Custom items replace default items with the same input material.
    pub fn parse(text: &str) -> Result<(Self, Registry), ConfigError> {

        let file: ConfigFile = toml::from_str(text)?;

        if file.engine.cleanup_steps == 0 {
            return Err(ConfigError::NoCleanupStep);
        }

        let mut registry = Registry::new();

        for (id, value) in file.default_items {
            if let Some(definition) = load_item(&id, value) {
                registry.insert(definition);
            }
        }

        for (id, value) in file.custom_items {
            if let Some(definition) = load_item(&id, value) {
                if let Some(prev) = registry.insert(definition) {
                    info!("custom item {id} overrides {}", prev.id);
                } else {
                    info!("loaded custom item {id}");
                }
            }
        }

        info!("configuration loaded: {} smeltable items", registry.len());

        Ok((Self {
            language: file.language,
            engine: file.engine,
            sounds: file.sounds,
        }, registry))

    }

}

/// Parse a single item, logging and discarding it if invalid or disabled.
fn load_item(id: &str, value: toml::Value) -> Option<ItemDefinition> {
    match parse_item(id, value) {
        Ok(definition) if definition.enabled => Some(definition),
        Ok(_) => None,
        Err(err) => {
            warn!("skipping item '{id}': {err}");
            None
        }
    }
}

/// Parse and validate a single item definition.
pub fn parse_item(id: &str, value: toml::Value) -> Result<ItemDefinition, ItemError> {

    let data: ItemData = value.try_into()?;

    let material_name = data.material.ok_or(ItemError::MissingMaterial)?;
    let material = Material::parse(&material_name)
        .ok_or(ItemError::UnknownMaterial(material_name))?;

    let output_name = data.output.and_then(|o| o.material).ok_or(ItemError::MissingOutput)?;
    let output = Material::parse(&output_name)
        .ok_or(ItemError::UnknownMaterial(output_name))?;

    let smelt_in = match data.smelt_in {
        Some(name) => name.parse::<DeviceKind>().map_err(|()| ItemError::UnknownDevice(name))?,
        None => DeviceKind::BlastFurnace,
    };

    let max_durability = match data.max_durability {
        Some(max) => max,
        None if data.durability_based => return Err(ItemError::MissingMaxDurability),
        None => 0,
    };

    let mut durability_ranges = BTreeMap::new();
    for (threshold, range) in data.durability_ranges {
        let value = threshold.trim().parse::<u32>()
            .map_err(|_| ItemError::InvalidThreshold(threshold.clone()))?;
        if value > MAX_THRESHOLD as u32 {
            return Err(DefinitionError::ThresholdOutOfRange(value).into());
        }
        durability_ranges.insert(value as u8, YieldRange::new(range.min, range.max)?);
    }

    let definition = ItemDefinition {
        id: id.to_string(),
        material,
        enabled: data.enabled,
        smelt_in,
        ignore_sticks: data.ignore_sticks,
        durability_based: data.durability_based,
        output,
        max_durability,
        smelt_time_multiplier: data.smelt_time_multiplier,
        durability_ranges,
    };

    definition.validate()?;

    if !definition.durability_based && !definition.durability_ranges.contains_key(&MAX_THRESHOLD) {
        warn!("item '{id}' is not durability based and has no range at 100, yielding 1");
    }

    Ok(definition)

}


/// Raw configuration document.
#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(default = "default_language")]
    language: String,
    #[serde(default)]
    engine: EngineConfig,
    #[serde(default)]
    sounds: SoundConfig,
    #[serde(default)]
    default_items: IndexMap<String, toml::Value>,
    #[serde(default)]
    custom_items: IndexMap<String, toml::Value>,
}

/// Raw item definition.
#[derive(Debug, Deserialize)]
struct ItemData {
    material: Option<String>,
    #[serde(default = "default_true")]
    enabled: bool,
    smelt_in: Option<String>,
    #[serde(default = "default_true")]
    ignore_sticks: bool,
    #[serde(default = "default_true")]
    durability_based: bool,
    output: Option<OutputData>,
    max_durability: Option<u32>,
    #[serde(default = "default_multiplier")]
    smelt_time_multiplier: f64,
    #[serde(default)]
    durability_ranges: BTreeMap<String, RangeData>,
}

#[derive(Debug, Deserialize)]
struct OutputData {
    material: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RangeData {
    #[serde(default)]
    min: u16,
    #[serde(default = "default_range_max")]
    max: u16,
}

fn default_language() -> String {
    "en_us".to_string()
}

fn default_true() -> bool {
    true
}

fn default_unit() -> f32 {
    1.0
}

fn default_multiplier() -> f64 {
    2.0
}

fn default_range_max() -> u16 {
    1
}


/// Errors that make the whole configuration unusable.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {}: {err}", .path.display())]
    Io { path: PathBuf, #[source] err: io::Error },
    #[error("malformed configuration: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("engine cleanup_steps must be at least 1")]
    NoCleanupStep,
}

/// Errors that make a single item definition unusable, such item is skipped.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error("{0}")]
    Malformed(#[from] toml::de::Error),
    #[error("no material defined")]
    MissingMaterial,
    #[error("invalid material '{0}'")]
    UnknownMaterial(String),
    #[error("no output material defined")]
    MissingOutput,
    #[error("invalid device '{0}'")]
    UnknownDevice(String),
    #[error("durability based item has no max_durability")]
    MissingMaxDurability,
    #[error("invalid threshold '{0}'")]
    InvalidThreshold(String),
    #[error("{0}")]
    Definition(#[from] DefinitionError),
}


#[cfg(test)]
mod tests {

    use super::*;

    fn mat(name: &str) -> Material {
        Material::parse(name).unwrap()
    }

    #[test]
    fn default_config() {

        let (config, registry) = Config::parse(DEFAULT_CONFIG).unwrap();
        assert_eq!(config, Config::default());
        assert_eq!(registry.len(), 4);

        let pick = registry.lookup(&mat("iron_pickaxe")).unwrap();
        assert_eq!(pick.id, "iron_pickaxe");
        assert_eq!(pick.smelt_in, DeviceKind::BlastFurnace);
        assert_eq!(pick.output, mat("iron_nugget"));
        assert_eq!(pick.max_durability, 250);
        assert_eq!(pick.smelt_time_multiplier, 2.0);
        assert_eq!(pick.durability_ranges.len(), 4);
        assert_eq!(pick.durability_ranges[&25], YieldRange::new(3, 5).unwrap());

        let axe = registry.lookup(&mat("golden_axe")).unwrap();
        assert_eq!(axe.smelt_in, DeviceKind::Furnace);
        assert_eq!(axe.cook_ticks(), 300);

        let cart = registry.lookup(&mat("minecart")).unwrap();
        assert!(!cart.durability_based);
        assert_eq!(cart.max_durability, 0);

    }

    #[test]
    fn empty_document() {
        let (config, registry) = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
        assert!(registry.is_empty());
    }

    #[test]
    fn invalid_items_are_skipped() {

        let text = r#"
            [engine]
            debounce_ms = 200

            [default_items.no_material]
            output = { material = "IRON_NUGGET" }
            max_durability = 10
            durability_ranges."0" = { min = 1, max = 1 }

            [default_items.bad_material]
            material = "not a material"
            output = { material = "IRON_NUGGET" }
            max_durability = 10
            durability_ranges."0" = { min = 1, max = 1 }

            [default_items.bad_threshold]
            material = "IRON_AXE"
            output = { material = "IRON_NUGGET" }
            max_durability = 10
            durability_ranges."half" = { min = 1, max = 1 }

            [default_items.over_threshold]
            material = "IRON_HOE"
            output = { material = "IRON_NUGGET" }
            max_durability = 10
            durability_ranges."150" = { min = 1, max = 1 }

            [default_items.inverted]
            material = "IRON_SHOVEL"
            output = { material = "IRON_NUGGET" }
            max_durability = 10
            durability_ranges."0" = { min = 4, max = 1 }

            [default_items.no_max]
            material = "IRON_SWORD"
            output = { material = "IRON_NUGGET" }
            durability_ranges."0" = { min = 1, max = 1 }

            [default_items.bad_device]
            material = "IRON_HELMET"
            smelt_in = "SMOKER"
            output = { material = "IRON_NUGGET" }
            max_durability = 10
            durability_ranges."0" = { min = 1, max = 1 }

            [default_items.wrong_type]
            material = "IRON_BOOTS"
            max_durability = "ten"

            [default_items.disabled]
            material = "IRON_LEGGINGS"
            enabled = false
            output = { material = "IRON_NUGGET" }
            max_durability = 10
            durability_ranges."0" = { min = 1, max = 1 }

            [default_items.good]
            material = "minecraft:iron_pickaxe"
            output = { material = "IRON_NUGGET" }
            max_durability = 10
            durability_ranges."0" = {}
        "#;

        let (config, registry) = Config::parse(text).unwrap();
        assert_eq!(config.engine.debounce_ms, 200);
        assert_eq!(config.engine.cleanup_steps, 5);
        assert_eq!(registry.len(), 1);

        let good = registry.lookup(&mat("iron_pickaxe")).unwrap();
        assert_eq!(good.id, "good");
        assert_eq!(good.durability_ranges[&0], YieldRange::new(0, 1).unwrap());

    }

    #[test]
    fn custom_items_override() {

        let text = r#"
            [default_items.pick]
            material = "IRON_PICKAXE"
            output = { material = "IRON_NUGGET" }
            max_durability = 250
            durability_ranges."0" = { min = 1, max = 1 }

            [custom_items.better_pick]
            material = "IRON_PICKAXE"
            output = { material = "IRON_INGOT" }
            max_durability = 250
            durability_ranges."0" = { min = 2, max = 2 }
        "#;

        let (_, registry) = Config::parse(text).unwrap();
        assert_eq!(registry.len(), 1);
        let pick = registry.lookup(&mat("iron_pickaxe")).unwrap();
        assert_eq!(pick.id, "better_pick");
        assert_eq!(pick.output, mat("iron_ingot"));

    }

    #[test]
    fn hard_errors() {
        assert!(matches!(Config::parse("language = "), Err(ConfigError::Parse(_))));
        assert!(matches!(Config::parse("[engine]\ncleanup_steps = 0"), Err(ConfigError::NoCleanupStep)));
        assert!(matches!(Config::load(Path::new("/nonexistent/smelter.toml")), Err(ConfigError::Io { .. })));
    }

    #[test]
    fn parse_item_errors() {

        let value: toml::Value = toml::from_str(r#"
            material = "IRON_AXE"
            output = { material = "IRON_NUGGET" }
            max_durability = 10
            durability_based = true
        "#).unwrap();

        assert!(matches!(parse_item("axe", value), Err(ItemError::Definition(DefinitionError::NoThreshold))));

    }

}
