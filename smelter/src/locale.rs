//! Localized messages. Locales are TOML files named after their locale id (such as
//! `en_us.toml`), holding a short `locale_code`, a `locale_name` and message keys.

use std::collections::HashMap;
use std::path::Path;
use std::io;

use indexmap::IndexMap;
use thiserror::Error;

use tracing::{debug, info, warn};


/// The locale always available, used as fallback.
pub const FALLBACK_LOCALE: &str = "en_us";

/// Built-in messages of the fallback locale.
const EN_US: &[(&str, &str)] = &[
    ("no_permission", "&cYou don't have permission to use item smelting!"),
    ("players_only", "&cThis command can only be used by players!"),
    ("unknown_command", "&cUnknown subcommand. Use /itemsmelter help for help."),
    ("reload_success", "&aConfiguration reloaded successfully!"),
    ("reload_error", "&cError reloading configuration!"),
    ("sound_enabled", "&aItem smelting sounds &2ENABLED&a!"),
    ("sound_disabled", "&cItem smelting sounds &4DISABLED&c!"),
    ("sound_status_on", "&aYou have item smelting sounds &2ENABLED"),
    ("sound_status_off", "&cYou have item smelting sounds &4DISABLED"),
    ("sound_usage", "&eUsage: /itemsmelter sound [on|off]"),
    ("lang_changed", "&aLanguage changed to: &f{language}"),
    ("lang_invalid", "&cInvalid language code. Available: &f{languages}"),
    ("lang_usage", "&eUsage: /itemsmelter lang <code>"),
    ("lang_list", "&eAvailable languages: &f{languages}"),
    ("help_header", "&6=== ItemSmelter Commands ==="),
    ("help_reload", "&e/itemsmelter reload &7- Reload configuration"),
    ("help_sound", "&e/itemsmelter sound [on|off] &7- Toggle or set smelting sounds"),
    ("help_lang", "&e/itemsmelter lang <code> &7- Change language"),
    ("help_recipes", "&e/itemsmelter recipes &7- Show loaded recipes (admin)"),
    ("help_info", "&e/itemsmelter info &7- Show plugin information"),
    ("help_help", "&e/itemsmelter help &7- Show this help"),
    ("info_header", "&6=== ItemSmelter Info ==="),
    ("info_version", "&eVersion: &f{version}"),
    ("info_items", "&eLoaded items: &f{items}"),
    ("info_recipes", "&eRegistered recipes: &f{recipes}"),
    ("info_author", "&eAuthor: &f{author}"),
    ("recipes_header", "&6=== Loaded Recipes ({count}) ==="),
    ("recipes_item", "&e{id} &7- &f{material} &7-> &f{output} &7({furnace})"),
];


/// A single locale.
#[derive(Debug, Clone)]
pub struct Locale {
    /// Short code used by players to select the locale, such as `eng`.
    pub code: String,
    /// Human readable name of the locale.
    pub name: String,
    messages: HashMap<String, String>,
}

impl Locale {

    /// Parse a locale document, the id is used as code and name if they are missing.
    pub fn parse(id: &str, text: &str) -> Result<Self, toml::de::Error> {

        let mut messages: HashMap<String, String> = toml::from_str(text)?;
        let code = messages.remove("locale_code").unwrap_or_else(|| id.to_string());
        let name = messages.remove("locale_name").unwrap_or_else(|| id.to_string());

        Ok(Self { code: code.to_ascii_lowercase(), name, messages })

    }

    fn builtin() -> Self {
        Self {
            code: "eng".to_string(),
            name: "English".to_string(),
            messages: EN_US.iter().map(|&(k, v)| (k.to_string(), v.to_string())).collect(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.messages.get(key).map(String::as_str)
    }

}


/// All loaded locales, and the default one.
#[derive(Debug, Clone)]
pub struct Locales {
    /// Locales by id, in load order.
    locales: IndexMap<String, Locale>,
    /// The default locale id, always present in the map.
    default: String,
}

impl Default for Locales {
    fn default() -> Self {
        Self::builtin(FALLBACK_LOCALE)
    }
}

impl Locales {

    /// Only the built-in locale, with the given default if it exists.
    pub fn builtin(default: &str) -> Self {
        let mut locales = IndexMap::new();
        locales.insert(FALLBACK_LOCALE.to_string(), Locale::builtin());
        Self::with_default(locales, default)
    }

    /// Load every `.toml` locale of the given directory, on top of the built-in
    /// one. A locale file that cannot be parsed is skipped, a missing directory
    /// only gives the built-in locale.
    pub fn load(dir: &Path, default: &str) -> Result<Self, LocaleError> {

        let mut locales = IndexMap::new();
        locales.insert(FALLBACK_LOCALE.to_string(), Locale::builtin());

        let entries = match std::fs::read_dir(dir) {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                debug!("no locale directory at {}", dir.display());
                return Ok(Self::with_default(locales, default));
            }
            Err(err) => return Err(LocaleError::Io(err)),
        };

        let mut paths = Vec::new();
        for entry in entries {
            let path = entry?.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                paths.push(path);
            }
        }
        paths.sort();

        for path in paths {

            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let locale = std::fs::read_to_string(&path)
                .map_err(LocaleError::Io)
                .and_then(|text| Locale::parse(id, &text).map_err(LocaleError::Parse));

            match locale {
                Ok(mut locale) => {
                    // Files may only translate a part of the messages.
                    if id == FALLBACK_LOCALE {
                        let mut builtin = Locale::builtin();
                        builtin.messages.extend(locale.messages);
                        locale.messages = builtin.messages;
                    }
                    locales.insert(id.to_string(), locale);
                }
                Err(err) => warn!("skipping locale {}: {err}", path.display()),
            }

        }

        info!("loaded {} locale(s)", locales.len());
        Ok(Self::with_default(locales, default))

    }

    fn with_default(locales: IndexMap<String, Locale>, default: &str) -> Self {
        let default = if locales.contains_key(default) {
            default.to_string()
        } else {
            warn!("default locale '{default}' not found, using {FALLBACK_LOCALE}");
            FALLBACK_LOCALE.to_string()
        };
        Self { locales, default }
    }

    /// Insert or replace a locale.
    pub fn insert(&mut self, id: &str, locale: Locale) {
        self.locales.insert(id.to_string(), locale);
    }

    /// The default locale id.
    pub fn default_id(&self) -> &str {
        &self.default
    }

    pub fn get(&self, id: &str) -> Option<&Locale> {
        self.locales.get(id)
    }

    /// Resolve a locale code or a locale id to the locale id, case insensitive.
    pub fn resolve_code(&self, code: &str) -> Option<&str> {
        let code = code.to_ascii_lowercase();
        self.locales.iter()
            .find(|(_, locale)| locale.code == code)
            .or_else(|| self.locales.get_key_value(code.as_str()))
            .map(|(id, _)| id.as_str())
    }

    /// Name of the locale with the given code, or the code itself.
    pub fn name_of(&self, code: &str) -> String {
        self.resolve_code(code)
            .and_then(|id| self.locales.get(id))
            .map(|locale| locale.name.clone())
            .unwrap_or_else(|| code.to_string())
    }

    /// All locale codes, in load order.
    pub fn available_codes(&self) -> Vec<&str> {
        self.locales.values().map(|locale| locale.code.as_str()).collect()
    }

    /// Get a formatted message in the given locale, falling back to the default
    /// locale and then to the built-in one when the locale or message is missing.
    /// Placeholders `{name}` are replaced by parameters and `&` color codes are
    /// converted.
    pub fn message(&self, locale: Option<&str>, key: &str, params: &[(&str, &str)]) -> String {

        let raw = [locale, Some(self.default.as_str()), Some(FALLBACK_LOCALE)].into_iter()
            .flatten()
            .filter_map(|id| self.locales.get(id))
            .find_map(|l| l.get(key));

        let Some(raw) = raw else {
            return format!("Missing translation: {key}");
        };

        let mut message = raw.replace('&', "§");
        for &(name, value) in params {
            message = message.replace(&format!("{{{name}}}"), value);
        }

        message

    }

}


/// Error while loading locales.
#[derive(Debug, Error)]
pub enum LocaleError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("malformed locale: {0}")]
    Parse(#[from] toml::de::Error),
}


#[cfg(test)]
mod tests {

    use super::*;

    fn with_french() -> Locales {
        let mut locales = Locales::builtin(FALLBACK_LOCALE);
        let fr = Locale::parse("fr_fr", r#"
            locale_code = "FRA"
            locale_name = "Français"
            no_permission = "&cPermission refusée !"
            lang_changed = "&aLangue : &f{language}"
        "#).unwrap();
        locales.insert("fr_fr", fr);
        locales
    }

    #[test]
    fn builtin_messages() {
        let locales = Locales::default();
        assert_eq!(locales.default_id(), "en_us");
        assert_eq!(locales.message(None, "reload_success", &[]), "§aConfiguration reloaded successfully!");
        assert_eq!(locales.message(None, "nope", &[]), "Missing translation: nope");
        assert_eq!(
            locales.message(Some("en_us"), "recipes_header", &[("count", "3")]),
            "§6=== Loaded Recipes (3) ===",
        );
    }

    #[test]
    fn fallback_to_default() {
        let locales = with_french();
        assert_eq!(locales.message(Some("fr_fr"), "no_permission", &[]), "§cPermission refusée !");
        assert_eq!(locales.message(Some("fr_fr"), "lang_changed", &[("language", "Français")]), "§aLangue : §fFrançais");
        // Not translated, and unknown locale.
        assert_eq!(locales.message(Some("fr_fr"), "sound_usage", &[]), "§eUsage: /itemsmelter sound [on|off]");
        assert_eq!(locales.message(Some("xx_xx"), "sound_usage", &[]), "§eUsage: /itemsmelter sound [on|off]");
    }

    #[test]
    fn resolve_codes() {
        let locales = with_french();
        assert_eq!(locales.resolve_code("fra"), Some("fr_fr"));
        assert_eq!(locales.resolve_code("FR_FR"), Some("fr_fr"));
        assert_eq!(locales.resolve_code("eng"), Some("en_us"));
        assert_eq!(locales.resolve_code("deu"), None);
        assert_eq!(locales.available_codes(), ["eng", "fra"]);
        assert_eq!(locales.name_of("fra"), "Français");
        assert_eq!(locales.name_of("deu"), "deu");
    }

    #[test]
    fn unknown_default() {
        let locales = Locales::builtin("de_de");
        assert_eq!(locales.default_id(), FALLBACK_LOCALE);
    }

    #[test]
    fn missing_directory() {
        let locales = Locales::load(Path::new("/nonexistent/locales"), "en_us").unwrap();
        assert_eq!(locales.available_codes(), ["eng"]);
    }

    #[test]
    fn load_directory() {

        let dir = std::env::temp_dir().join(format!("smelter-locales-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("ua_uk.toml"), "locale_code = \"ua\"\nlocale_name = \"Українська\"\n").unwrap();
        std::fs::write(dir.join("en_us.toml"), "reload_success = \"&aDone\"\n").unwrap();
        std::fs::write(dir.join("broken.toml"), "reload_success = [").unwrap();
        std::fs::write(dir.join("notes.txt"), "ignored").unwrap();

        let locales = Locales::load(&dir, "ua_uk").unwrap();
        std::fs::remove_dir_all(&dir).unwrap();

        assert_eq!(locales.default_id(), "ua_uk");
        assert_eq!(locales.resolve_code("ua"), Some("ua_uk"));
        assert!(locales.get("broken").is_none());
        // Partial en_us file keeps built-in messages.
        assert_eq!(locales.message(Some("en_us"), "reload_success", &[]), "§aDone");
        assert_eq!(locales.message(Some("en_us"), "reload_error", &[]), "§cError reloading configuration!");
        // Default locale has no translation, falls back on the built-in locale.
        assert_eq!(locales.message(Some("ua_uk"), "reload_error", &[]), "§cError reloading configuration!");

    }

}
