//! Materials, item stacks, actors and device kinds as seen by the smelting engine.

use std::fmt;
use std::str::FromStr;

use arcstr::ArcStr;


/// A normalized material key, such as `iron_pickaxe`. Cloning is cheap.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Material(ArcStr);

impl Material {

    /// The air material, an item stack of air represents an empty slot.
    pub const AIR: Self = Self(arcstr::literal!("air"));

    /// Parse and normalize a material name. Upper case names and the `minecraft:`
    /// namespace are accepted, so `IRON_PICKAXE` and `minecraft:iron_pickaxe` are the
    /// same material. Returns `None` if the name cannot be a material.
    pub fn parse(name: &str) -> Option<Self> {

        let name = name.trim();
        let name = name.strip_prefix("minecraft:").unwrap_or(name);
        if name.is_empty() {
            return None;
        }

        let name = name.to_ascii_lowercase();
        if !name.bytes().all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_') {
            return None;
        }

        Some(Self(ArcStr::from(name)))

    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The upper case name used in listings, `IRON_PICKAXE`.
    pub fn display_name(&self) -> String {
        self.0.to_ascii_uppercase()
    }

}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}


/// An item stack defines the actual number of items and their damage value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemStack {
    /// The item material.
    pub material: Material,
    /// The stack size.
    pub size: u16,
    /// Damage taken by the item, `None` when the item has no readable wear metadata,
    /// in which case it is considered at full health.
    pub damage: Option<u16>,
}

impl Default for ItemStack {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl ItemStack {

    pub const EMPTY: Self = Self { material: Material::AIR, size: 0, damage: None };

    /// A single item of the given material, without wear metadata.
    pub fn new_single(material: Material) -> Self {
        Self { material, size: 1, damage: None }
    }

    pub fn with_size(mut self, size: u16) -> ItemStack {
        self.size = size;
        self
    }

    pub fn with_damage(mut self, damage: u16) -> ItemStack {
        self.damage = Some(damage);
        self
    }

    /// Return true if this item stack is air or has no item, which represents an
    /// empty slot.
    pub fn is_empty(&self) -> bool {
        self.material == Material::AIR || self.size == 0
    }

    /// Simplify this item stack by converting it into `None` if empty.
    pub fn to_non_empty(self) -> Option<ItemStack> {
        if self.is_empty() {
            None
        } else {
            Some(self)
        }
    }

}


/// Opaque identifier of an actor (a player) interacting with devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(pub u64);

impl fmt::Display for ActorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

impl FromStr for ActorId {
    type Err = std::num::ParseIntError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        u64::from_str_radix(s, 16).map(ActorId)
    }
}


/// The closed set of smelting devices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DeviceKind {
    /// The basic furnace.
    #[default]
    Furnace,
    /// The blast furnace, smelting twice as fast.
    BlastFurnace,
}

impl DeviceKind {

    /// Ticks needed by this device to smelt an item with a multiplier of 1.
    pub fn base_cook_ticks(self) -> u32 {
        match self {
            DeviceKind::Furnace => 200,
            DeviceKind::BlastFurnace => 100,
        }
    }

    /// The configuration spelling of this device kind.
    pub fn name(self) -> &'static str {
        match self {
            DeviceKind::Furnace => "FURNACE",
            DeviceKind::BlastFurnace => "BLAST_FURNACE",
        }
    }

}

impl FromStr for DeviceKind {
    type Err = ();
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "FURNACE" => Ok(DeviceKind::Furnace),
            "BLAST_FURNACE" => Ok(DeviceKind::BlastFurnace),
            _ => Err(())
        }
    }
}

impl fmt::Display for DeviceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
