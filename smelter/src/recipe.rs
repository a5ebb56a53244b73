//! Registration of smeltable items as host recipes, without them the host devices
//! would never accept worn tools as input.

use indexmap::IndexMap;

use tracing::{debug, info, warn};

use crate::host::{HostRecipe, RecipeBook};
use crate::item::ItemStack;
use crate::registry::Registry;


/// Experience given by the placeholder recipes.
const RECIPE_EXPERIENCE: f32 = 0.1;


/// Keep track of the recipes registered into the host.
#[derive(Debug, Default)]
pub struct RecipeManager {
    /// Registered recipe keys, mapped to their definition id.
    registered: IndexMap<String, String>,
}

impl RecipeManager {

    pub fn new() -> Self {
        Self::default()
    }

    /// Register one recipe per enabled definition of the registry, after removing
    /// the recipes registered previously. Recipes refused by the host are skipped.
    pub fn register(&mut self, book: &mut dyn RecipeBook, registry: &Registry) {

        self.remove_all(book);

        for def in registry.iter().filter(|def| def.enabled) {

            let recipe = HostRecipe {
                key: recipe_key(&def.id),
                input: ItemStack::new_single(def.material.clone()),
                output: ItemStack::new_single(def.output.clone()),
                experience: RECIPE_EXPERIENCE,
                cook_ticks: def.cook_ticks(),
                device: def.smelt_in,
            };

            match book.add_recipe(&recipe) {
                Ok(()) => {
                    debug!("registered recipe {} ({} -> {}, {} ticks)", recipe.key, def.material, def.output, recipe.cook_ticks);
                    self.registered.insert(recipe.key, def.id.clone());
                }
                Err(reason) => warn!("host refused recipe {}: {reason}", recipe.key),
            }

        }

        info!("registered {} smelting recipe(s)", self.registered.len());

    }

    /// Remove every recipe registered by this manager.
    pub fn remove_all(&mut self, book: &mut dyn RecipeBook) {
        for (key, _) in self.registered.drain(..) {
            if !book.remove_recipe(&key) {
                debug!("recipe {key} was already removed");
            }
        }
    }

    pub fn registered_count(&self) -> usize {
        self.registered.len()
    }

    /// Definition ids having a registered recipe, in registration order.
    pub fn registered_items(&self) -> impl Iterator<Item = &str> + '_ {
        self.registered.values().map(String::as_str)
    }

}

fn recipe_key(id: &str) -> String {
    format!("smelt_{}", id.to_ascii_lowercase())
}
