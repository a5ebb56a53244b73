//! Read-only registry of smeltable item definitions, keyed by input material.

use std::sync::Arc;

use indexmap::IndexMap;

use crate::definition::ItemDefinition;
use crate::item::{ItemStack, Material};


/// The registry is built once per configuration load and then only read, a reload
/// builds a new registry and swaps it wholesale.
#[derive(Debug, Clone, Default)]
pub struct Registry {
    /// Definitions in configuration order.
    items: IndexMap<Material, Arc<ItemDefinition>>,
}

impl Registry {

    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a definition, replacing and returning the previous definition for the
    /// same input material, if any. Replacing keeps the original position.
    pub fn insert(&mut self, definition: ItemDefinition) -> Option<Arc<ItemDefinition>> {
        self.items.insert(definition.material.clone(), Arc::new(definition))
    }

    /// Get the definition for the given input material.
    pub fn lookup(&self, material: &Material) -> Option<&Arc<ItemDefinition>> {
        self.items.get(material)
    }

    /// Get the definition matching the given stack, empty stacks have none.
    pub fn get_for_stack(&self, stack: &ItemStack) -> Option<&Arc<ItemDefinition>> {
        if stack.is_empty() {
            None
        } else {
            self.lookup(&stack.material)
        }
    }

    /// Return true if the given stack can be smelted by this engine.
    pub fn can_smelt(&self, stack: &ItemStack) -> bool {
        self.get_for_stack(stack).is_some_and(|def| def.enabled)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<ItemDefinition>> + '_ {
        self.items.values()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

}
