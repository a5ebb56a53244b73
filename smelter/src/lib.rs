//! Durability based item smelting for furnace-like devices.
//!
//! Worn tools put in a furnace are turned into a quantity of raw material that
//! depends on their remaining durability. The host world (blocks, inventories, event
//! dispatch, sounds) is abstracted behind the traits of the [`host`] module, this crate
//! only decides and reconciles.

pub mod util;

pub mod item;
pub mod definition;
pub mod smelt;
pub mod registry;

pub mod config;
pub mod locale;
pub mod settings;

pub mod host;
pub mod recipe;

pub mod process;
pub mod debounce;
pub mod reconcile;

pub mod engine;
pub mod command;

pub use engine::Smelter;
