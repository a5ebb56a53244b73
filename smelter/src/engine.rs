//! The smelter engine, owning the configuration and every component, and exposing
//! the operations used by the host's event listeners and commands.

use std::path::PathBuf;
use std::sync::Arc;

use glam::IVec3;
use thiserror::Error;

use tracing::{info, warn};

use crate::config::{Config, ConfigError};
use crate::definition::ItemDefinition;
use crate::host::{Host, RecipeBook};
use crate::item::{ActorId, ItemStack};
use crate::locale::{LocaleError, Locales};
use crate::reconcile::{Context, Decision, InventoryAction, Reconciler, SmeltDecision};
use crate::recipe::RecipeManager;
use crate::registry::Registry;
use crate::settings::{PlayerSettings, SettingsError};


/// Where the engine files are.
#[derive(Debug, Clone)]
pub struct SmelterPaths {
    /// The configuration file, the default configuration is used if missing.
    pub config: PathBuf,
    /// The directory of locale files.
    pub locales: PathBuf,
    /// The player settings file.
    pub settings: PathBuf,
}


pub struct Smelter {
    /// Files to reload from, if loaded from files.
    paths: Option<SmelterPaths>,
    config: Config,
    /// The registry is shared with processes through their definitions, it is only
    /// replaced on reload.
    registry: Arc<Registry>,
    reconciler: Reconciler,
    locales: Locales,
    settings: PlayerSettings,
    recipes: RecipeManager,
}

impl Smelter {

    /// Create an engine from an already loaded configuration, with only the built-in
    /// locale and settings that are not persisted.
    pub fn new(config: Config, registry: Registry) -> Self {
        let locales = Locales::builtin(&config.language);
        Self {
            paths: None,
            config,
            registry: Arc::new(registry),
            reconciler: Reconciler::new(),
            locales,
            settings: PlayerSettings::in_memory(),
            recipes: RecipeManager::new(),
        }
    }

    /// Load the configuration, locales and player settings from files.
    pub fn load(paths: SmelterPaths) -> Result<Self, LoadError> {

        let (config, registry) = Config::load_or_default(&paths.config)?;
        let locales = Locales::load(&paths.locales, &config.language)?;
        let settings = PlayerSettings::load(&paths.settings)?;

        info!("smelter loaded with {} item(s), {} locale(s)", registry.len(), locales.available_codes().len());

        Ok(Self {
            paths: Some(paths),
            config,
            registry: Arc::new(registry),
            reconciler: Reconciler::new(),
            locales,
            settings,
            recipes: RecipeManager::new(),
        })

    }

    /// Replace the reconciler, used to control the random yields.
    pub fn with_reconciler(mut self, reconciler: Reconciler) -> Self {
        self.reconciler = reconciler;
        self
    }

    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[inline]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    #[inline]
    pub fn reconciler(&self) -> &Reconciler {
        &self.reconciler
    }

    #[inline]
    pub fn locales(&self) -> &Locales {
        &self.locales
    }

    #[inline]
    pub fn settings(&self) -> &PlayerSettings {
        &self.settings
    }

    #[inline]
    pub fn settings_mut(&mut self) -> &mut PlayerSettings {
        &mut self.settings
    }

    #[inline]
    pub fn recipes(&self) -> &RecipeManager {
        &self.recipes
    }

    /// Register the recipes of all smeltable items into the host.
    pub fn register_recipes(&mut self, book: &mut dyn RecipeBook) {
        self.recipes.register(book, &self.registry);
    }

    pub fn is_actively_smelting(&self, pos: IVec3) -> bool {
        self.reconciler.processes().is_active(pos)
    }

    /// Start tracking the smelting of the given stack, returning false if the stack
    /// cannot be smelted or if the device already has a process.
    pub fn start_smelting(&mut self, pos: IVec3, source: ItemStack, owner: Option<ActorId>) -> bool {
        match self.get_smeltable_item(&source) {
            Some(def) if def.enabled => {
                let def = Arc::clone(def);
                self.reconciler.start(pos, source, def, owner)
            }
            _ => false,
        }
    }

    pub fn cancel_smelting(&mut self, pos: IVec3) -> bool {
        self.reconciler.cancel(pos)
    }

    pub fn complete_smelting(&mut self, pos: IVec3) -> bool {
        self.reconciler.complete(pos)
    }

    /// Sample the output amount of smelting one item of the stack.
    pub fn calculate_output_amount(&mut self, stack: &ItemStack, definition: &ItemDefinition) -> u16 {
        self.reconciler.calculate_output(stack, definition)
    }

    pub fn get_smeltable_item(&self, stack: &ItemStack) -> Option<&Arc<ItemDefinition>> {
        self.registry.get_for_stack(stack)
    }

    pub fn can_smelt(&self, stack: &ItemStack) -> bool {
        self.registry.can_smelt(stack)
    }

    /// Reload configuration and locales from their files, cancel every process and
    /// register recipes again. On error nothing is changed.
    pub fn reload(&mut self, book: &mut dyn RecipeBook) -> Result<(), LoadError> {

        if let Some(paths) = &self.paths {
            let (config, registry) = Config::load_or_default(&paths.config)?;
            let locales = Locales::load(&paths.locales, &config.language)?;
            self.config = config;
            self.registry = Arc::new(registry);
            self.locales = locales;
        }

        self.reconciler.cancel_all();
        self.recipes.register(book, &self.registry);

        info!("smelter reloaded with {} item(s)", self.registry.len());
        Ok(())

    }

    /// Cancel every process, remove the registered recipes and save the settings.
    pub fn cleanup(&mut self, book: &mut dyn RecipeBook) {
        self.reconciler.cancel_all();
        self.recipes.remove_all(book);
        if let Err(err) = self.settings.save() {
            warn!("could not save player settings: {err}");
        }
        info!("smelter cleaned up");
    }

    /// Get a message in the locale of the actor, or in the default locale.
    pub fn message(&self, actor: Option<ActorId>, key: &str, params: &[(&str, &str)]) -> String {
        let locale = actor.and_then(|actor| self.settings.locale(actor));
        self.locales.message(locale, key, params)
    }

    pub fn handle_burn(&mut self, host: &mut dyn Host, pos: IVec3) -> Decision {
        self.dispatch(host, |r, ctx| r.handle_burn(ctx, pos))
    }

    pub fn handle_smelt(&mut self, host: &mut dyn Host, pos: IVec3, now_ms: u64, cancelled: bool) -> SmeltDecision {
        self.dispatch(host, |r, ctx| r.handle_smelt(ctx, pos, now_ms, cancelled))
    }

    pub fn handle_inventory_close(&mut self, host: &mut dyn Host, pos: IVec3) {
        self.dispatch(host, |r, ctx| r.handle_inventory_close(ctx, pos))
    }

    pub fn handle_output_extract(&mut self, pos: IVec3) {
        self.reconciler.handle_output_extract(pos)
    }

    pub fn handle_inventory_action(&mut self, host: &mut dyn Host, actor: ActorId, pos: IVec3, action: &InventoryAction) -> Decision {
        self.dispatch(host, |r, ctx| r.handle_inventory_action(ctx, actor, pos, action))
    }

    /// Advance the engine by one host tick. Must be called at the start of the host
    /// tick, before devices are ticked, see [`Reconciler::tick`].
    pub fn tick(&mut self, host: &mut dyn Host) {
        self.dispatch(host, |r, ctx| r.tick(ctx))
    }

    fn dispatch<R>(&mut self, host: &mut dyn Host, func: impl FnOnce(&mut Reconciler, &mut Context) -> R) -> R {
        let mut ctx = Context {
            host,
            registry: &self.registry,
            locales: &self.locales,
            settings: &self.settings,
            engine: &self.config.engine,
            sounds: &self.config.sounds,
        };
        func(&mut self.reconciler, &mut ctx)
    }

}


/// Error while loading the engine files.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    #[error("locales: {0}")]
    Locale(#[from] LocaleError),
    #[error("settings: {0}")]
    Settings(#[from] SettingsError),
}
