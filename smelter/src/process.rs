//! Tracking of the smelting processes in progress, at most one per device.

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use glam::IVec3;

use crate::definition::ItemDefinition;
use crate::item::{ActorId, ItemStack};


/// A smelting process claimed by the engine on a device.
#[derive(Debug, Clone)]
pub struct ConversionProcess {
    /// Position of the device.
    pub pos: IVec3,
    /// Snapshot of the input stack when the process started.
    pub source: ItemStack,
    pub definition: Arc<ItemDefinition>,
    /// Output amount computed when starting, the final amount is computed again on
    /// completion with the wear of the actual stack.
    pub output_amount: u16,
    pub cook_ticks: u32,
    /// The actor that put the item in the device, if known.
    pub owner: Option<ActorId>,
    pub elapsed_ticks: u32,
}

/// Processes keyed by device position. There are no implicit expiry, a process is
/// only removed by an explicit device lifecycle event or by clearing the store.
#[derive(Debug, Default)]
pub struct ConversionStore {
    processes: HashMap<IVec3, ConversionProcess>,
}

impl ConversionStore {

    pub fn new() -> Self {
        Self::default()
    }

    /// Insert the process only if no process exists at its position, returning true
    /// if inserted. An existing process is left untouched.
    pub fn start_if_absent(&mut self, process: ConversionProcess) -> bool {
        match self.processes.entry(process.pos) {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                v.insert(process);
                true
            }
        }
    }

    pub fn get(&self, pos: IVec3) -> Option<&ConversionProcess> {
        self.processes.get(&pos)
    }

    pub fn get_mut(&mut self, pos: IVec3) -> Option<&mut ConversionProcess> {
        self.processes.get_mut(&pos)
    }

    pub fn remove(&mut self, pos: IVec3) -> Option<ConversionProcess> {
        self.processes.remove(&pos)
    }

    pub fn is_active(&self, pos: IVec3) -> bool {
        self.processes.contains_key(&pos)
    }

    /// Remove every process, returning how many were removed.
    pub fn clear_all(&mut self) -> usize {
        let count = self.processes.len();
        self.processes.clear();
        count
    }

    pub fn iter(&self) -> impl Iterator<Item = &ConversionProcess> + '_ {
        self.processes.values()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut ConversionProcess> + '_ {
        self.processes.values_mut()
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

}


#[cfg(test)]
mod tests {

    use proptest::prelude::*;

    use crate::definition::YieldRange;
    use crate::item::Material;
    use super::*;

    fn process(pos: IVec3, output_amount: u16) -> ConversionProcess {
        let material = Material::parse("iron_pickaxe").unwrap();
        let definition = ItemDefinition::new("iron_pickaxe", material.clone(), Material::parse("iron_nugget").unwrap(), 250)
            .with_range(0, YieldRange::exact(1));
        ConversionProcess {
            pos,
            source: ItemStack::new_single(material),
            cook_ticks: definition.cook_ticks(),
            definition: Arc::new(definition),
            output_amount,
            owner: None,
            elapsed_ticks: 0,
        }
    }

    #[test]
    fn lifecycle() {
        let mut store = ConversionStore::new();
        let pos = IVec3::new(4, 64, -2);
        assert!(!store.is_active(pos));
        assert!(store.start_if_absent(process(pos, 3)));
        assert!(store.is_active(pos));
        store.get_mut(pos).unwrap().elapsed_ticks += 1;
        assert_eq!(store.remove(pos).unwrap().elapsed_ticks, 1);
        assert!(store.remove(pos).is_none());
        assert!(store.start_if_absent(process(pos, 3)));
        assert!(store.start_if_absent(process(IVec3::ZERO, 3)));
        assert_eq!(store.clear_all(), 2);
        assert!(store.is_empty());
    }

    proptest! {

        #[test]
        fn start_never_overwrites(x in -100i32..100, z in -100i32..100, first in 0u16..64, second in 0u16..64) {
            let pos = IVec3::new(x, 64, z);
            let mut store = ConversionStore::new();
            prop_assert!(store.start_if_absent(process(pos, first)));
            prop_assert!(!store.start_if_absent(process(pos, second)));
            prop_assert_eq!(store.get(pos).unwrap().output_amount, first);
            prop_assert_eq!(store.len(), 1);
        }

    }

}
