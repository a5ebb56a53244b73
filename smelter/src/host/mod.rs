//! Interfaces of the host world the engine is plugged into. The engine never owns
//! devices or actors, it reads and commands them through these traits.

use glam::IVec3;

use crate::item::{ActorId, DeviceKind, ItemStack};
use crate::config::SoundCue;

mod memory;
pub use memory::{MemoryHost, MemoryFurnace, PlayedCue};


/// Permission required to put smeltable items in devices.
pub const PERMISSION_USE: &str = "itemsmelter.use";
/// Permission that also authorizes device interactions.
pub const PERMISSION_BYPASS: &str = "itemsmelter.bypass";
/// Permission of administrative commands.
pub const PERMISSION_ADMIN: &str = "itemsmelter.admin";


/// The sender of a command, or the receiver of a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sender {
    /// The host console, it has every permission and gets plain english messages.
    Console,
    Actor(ActorId),
}

impl Sender {

    pub fn actor(self) -> Option<ActorId> {
        match self {
            Sender::Console => None,
            Sender::Actor(id) => Some(id),
        }
    }

}


/// Device and actor access provided by the host world.
pub trait Host {

    /// Get the kind of device at the given position, none if there is no device.
    fn device_kind(&self, pos: IVec3) -> Option<DeviceKind>;

    /// Get the stack in the input slot of the device, empty if there is no device.
    fn input_stack(&self, pos: IVec3) -> ItemStack;

    fn set_input_stack(&mut self, pos: IVec3, stack: ItemStack);

    /// Ticks the current input item has been cooking for.
    fn cook_time(&self, pos: IVec3) -> u32;

    fn set_cook_time(&mut self, pos: IVec3, ticks: u32);

    /// Remaining burn ticks of the current fuel.
    fn burn_time(&self, pos: IVec3) -> u32;

    fn set_burn_time(&mut self, pos: IVec3, ticks: u32);

    /// Request the host to apply previous changes to the device state.
    fn update_device(&mut self, pos: IVec3);

    fn has_permission(&self, actor: ActorId, permission: &str) -> bool;

    fn send_message(&mut self, to: Sender, text: &str);

    /// Actors within the given distance of a position.
    fn nearby_actors(&self, pos: IVec3, radius: f32) -> Vec<ActorId>;

    /// Play a sound cue at a position, only for the given actor.
    fn play_cue(&mut self, actor: ActorId, pos: IVec3, cue: &SoundCue);

}


/// A smelting recipe as registered into the host, so that the host's own device
/// logic accepts smeltable items as input.
#[derive(Debug, Clone, PartialEq)]
pub struct HostRecipe {
    /// Unique key of the recipe in the host.
    pub key: String,
    pub input: ItemStack,
    /// Placeholder output, the real output is decided when smelting completes.
    pub output: ItemStack,
    pub experience: f32,
    pub cook_ticks: u32,
    pub device: DeviceKind,
}

/// Recipe table of the host.
pub trait RecipeBook {

    /// Register a recipe, the error is the host's reason for refusing it.
    fn add_recipe(&mut self, recipe: &HostRecipe) -> Result<(), String>;

    /// Remove a recipe by its key, returning true if it existed.
    fn remove_recipe(&mut self, key: &str) -> bool;

}


/// A host providing both device access and a recipe table, as needed by commands.
pub trait Platform: Host + RecipeBook {

    fn as_host(&mut self) -> &mut dyn Host;

    fn as_recipe_book(&mut self) -> &mut dyn RecipeBook;

}

impl<T: Host + RecipeBook> Platform for T {

    fn as_host(&mut self) -> &mut dyn Host {
        self
    }

    fn as_recipe_book(&mut self) -> &mut dyn RecipeBook {
        self
    }

}
