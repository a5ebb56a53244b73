//! In-memory host, holding a few devices and actors, recording every message and cue.

use std::collections::{HashMap, HashSet};

use glam::IVec3;
use indexmap::IndexMap;

use crate::item::{ActorId, DeviceKind, ItemStack, Material};
use crate::config::SoundCue;

use super::{Host, HostRecipe, RecipeBook, Sender};


/// State of a furnace-like device.
#[derive(Debug, Clone, Default)]
pub struct MemoryFurnace {
    pub kind: DeviceKind,
    pub input_stack: ItemStack,
    pub fuel_stack: ItemStack,
    pub output_stack: ItemStack,
    pub burn_time: u32,
    pub cook_time: u32,
    /// Number of state updates requested on this device.
    pub updates: u32,
}

/// A cue that has been played to an actor.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayedCue {
    pub actor: ActorId,
    pub pos: IVec3,
    pub name: String,
}

#[derive(Debug, Default)]
pub struct MemoryHost {
    pub furnaces: HashMap<IVec3, MemoryFurnace>,
    pub permissions: HashMap<ActorId, HashSet<String>>,
    /// Position of every connected actor.
    pub actors: HashMap<ActorId, IVec3>,
    pub messages: Vec<(Sender, String)>,
    pub cues: Vec<PlayedCue>,
    /// Recipe table, with recipes refused when their key is in `refused_keys`.
    pub recipes: IndexMap<String, HostRecipe>,
    pub refused_keys: HashSet<String>,
}

impl MemoryHost {

    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_furnace(&mut self, pos: IVec3, kind: DeviceKind) -> &mut MemoryFurnace {
        self.furnaces.entry(pos).or_insert_with(|| MemoryFurnace { kind, ..Default::default() })
    }

    pub fn furnace(&self, pos: IVec3) -> Option<&MemoryFurnace> {
        self.furnaces.get(&pos)
    }

    pub fn furnace_mut(&mut self, pos: IVec3) -> Option<&mut MemoryFurnace> {
        self.furnaces.get_mut(&pos)
    }

    /// Add an actor at the given position with the given permissions.
    pub fn add_actor(&mut self, actor: ActorId, pos: IVec3, permissions: &[&str]) {
        self.actors.insert(actor, pos);
        self.permissions.insert(actor, permissions.iter().map(|p| p.to_string()).collect());
    }

    /// Find the registered recipe accepting the given input material.
    pub fn recipe_for(&self, material: &Material) -> Option<&HostRecipe> {
        self.recipes.values().find(|recipe| &recipe.input.material == material)
    }

    /// Messages received by the given sender.
    pub fn messages_of(&self, to: Sender) -> impl Iterator<Item = &str> + '_ {
        self.messages.iter()
            .filter(move |(sender, _)| *sender == to)
            .map(|(_, text)| text.as_str())
    }

    /// Names of the cues played at the given position, once per listening actor.
    pub fn cue_names_at(&self, pos: IVec3) -> Vec<&str> {
        self.cues.iter()
            .filter(|cue| cue.pos == pos)
            .map(|cue| cue.name.as_str())
            .collect()
    }

}

impl Host for MemoryHost {

    fn device_kind(&self, pos: IVec3) -> Option<DeviceKind> {
        self.furnaces.get(&pos).map(|furnace| furnace.kind)
    }

    fn input_stack(&self, pos: IVec3) -> ItemStack {
        self.furnaces.get(&pos)
            .map(|furnace| furnace.input_stack.clone())
            .unwrap_or_default()
    }

    fn set_input_stack(&mut self, pos: IVec3, stack: ItemStack) {
        if let Some(furnace) = self.furnaces.get_mut(&pos) {
            furnace.input_stack = stack;
        }
    }

    fn cook_time(&self, pos: IVec3) -> u32 {
        self.furnaces.get(&pos).map_or(0, |furnace| furnace.cook_time)
    }

    fn set_cook_time(&mut self, pos: IVec3, ticks: u32) {
        if let Some(furnace) = self.furnaces.get_mut(&pos) {
            furnace.cook_time = ticks;
        }
    }

    fn burn_time(&self, pos: IVec3) -> u32 {
        self.furnaces.get(&pos).map_or(0, |furnace| furnace.burn_time)
    }

    fn set_burn_time(&mut self, pos: IVec3, ticks: u32) {
        if let Some(furnace) = self.furnaces.get_mut(&pos) {
            furnace.burn_time = ticks;
        }
    }

    fn update_device(&mut self, pos: IVec3) {
        if let Some(furnace) = self.furnaces.get_mut(&pos) {
            furnace.updates += 1;
        }
    }

    fn has_permission(&self, actor: ActorId, permission: &str) -> bool {
        self.permissions.get(&actor).is_some_and(|perms| perms.contains(permission))
    }

    fn send_message(&mut self, to: Sender, text: &str) {
        self.messages.push((to, text.to_string()));
    }

    fn nearby_actors(&self, pos: IVec3, radius: f32) -> Vec<ActorId> {
        let center = pos.as_vec3();
        let mut actors = self.actors.iter()
            .filter(|(_, actor_pos)| actor_pos.as_vec3().distance_squared(center) <= radius * radius)
            .map(|(&actor, _)| actor)
            .collect::<Vec<_>>();
        actors.sort();
        actors
    }

    fn play_cue(&mut self, actor: ActorId, pos: IVec3, cue: &SoundCue) {
        self.cues.push(PlayedCue { actor, pos, name: cue.name.clone() });
    }

}

impl RecipeBook for MemoryHost {

    fn add_recipe(&mut self, recipe: &HostRecipe) -> Result<(), String> {
        if self.refused_keys.contains(&recipe.key) {
            return Err(format!("recipe '{}' refused", recipe.key));
        }
        if self.recipes.contains_key(&recipe.key) {
            return Err(format!("duplicate recipe '{}'", recipe.key));
        }
        self.recipes.insert(recipe.key.clone(), recipe.clone());
        Ok(())
    }

    fn remove_recipe(&mut self, key: &str) -> bool {
        self.recipes.shift_remove(key).is_some()
    }

}
