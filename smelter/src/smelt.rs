//! Smelting yield computation from the wear state of an item stack.

use crate::definition::ItemDefinition;
use crate::item::ItemStack;
use crate::util::JavaRandom;


/// Remaining durability of the given stack for the definition. A stack without
/// readable damage is considered at full health.
pub fn remaining_durability(definition: &ItemDefinition, stack: &ItemStack) -> u32 {
    match stack.damage {
        Some(damage) => definition.max_durability.saturating_sub(damage as u32),
        None => definition.max_durability,
    }
}

/// Compute how many units of the definition's output are produced by smelting one
/// item of the given stack. Zero means the smelting fails and destroys the item.
pub fn compute_yield(definition: &ItemDefinition, stack: &ItemStack, rand: &mut JavaRandom) -> u16 {
    if !definition.durability_based {
        definition.calculate_output(definition.max_durability, rand)
    } else {
        definition.calculate_output(remaining_durability(definition, stack), rand)
    }
}
