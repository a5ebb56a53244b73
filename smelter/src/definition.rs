//! Smeltable item definitions, loaded from configuration and read-only afterward.

use std::collections::BTreeMap;

use thiserror::Error;

use crate::item::{DeviceKind, Material};
use crate::util::JavaRandom;


/// Highest durability threshold, in percent.
pub const MAX_THRESHOLD: u8 = 100;

/// Yield of a non durability based item without a range at [`MAX_THRESHOLD`].
pub const DEFAULT_FLAT_YIELD: u16 = 1;


/// An inclusive range of output quantity, uniformly sampled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YieldRange {
    min: u16,
    max: u16,
}

impl YieldRange {

    pub fn new(min: u16, max: u16) -> Result<Self, DefinitionError> {
        if min > max {
            Err(DefinitionError::InvertedRange { min, max })
        } else {
            Ok(Self { min, max })
        }
    }

    /// A range that always yields the given quantity.
    pub const fn exact(amount: u16) -> Self {
        Self { min: amount, max: amount }
    }

    #[inline]
    pub fn min(self) -> u16 {
        self.min
    }

    #[inline]
    pub fn max(self) -> u16 {
        self.max
    }

    #[inline]
    pub fn contains(self, amount: u16) -> bool {
        (self.min..=self.max).contains(&amount)
    }

    /// Return `min` if the range is a single value, else a uniform integer in the
    /// inclusive range.
    pub fn sample(self, rand: &mut JavaRandom) -> u16 {
        rand.next_u16_between(self.min, self.max)
    }

}


/// Describe how an input material is converted when smelted.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemDefinition {
    /// Configuration identifier of the definition, also used for recipe keys.
    pub id: String,
    /// The input material this definition applies to.
    pub material: Material,
    /// Disabled definitions are never registered.
    pub enabled: bool,
    /// The only device kind allowed to smelt this item.
    pub smelt_in: DeviceKind,
    /// Kept for configuration compatibility, informative only.
    pub ignore_sticks: bool,
    /// If the yield depends on the wear of the item.
    pub durability_based: bool,
    /// The material produced.
    pub output: Material,
    /// Durability of a brand new item.
    pub max_durability: u32,
    /// Multiplier applied to the device's base cook time.
    pub smelt_time_multiplier: f64,
    /// Yield ranges keyed by the minimum durability percent they apply from.
    pub durability_ranges: BTreeMap<u8, YieldRange>,
}

impl ItemDefinition {

    /// Create an enabled, durability based definition without any range, mostly
    /// useful for building definitions in code.
    pub fn new(id: impl Into<String>, material: Material, output: Material, max_durability: u32) -> Self {
        Self {
            id: id.into(),
            material,
            enabled: true,
            smelt_in: DeviceKind::BlastFurnace,
            ignore_sticks: true,
            durability_based: true,
            output,
            max_durability,
            smelt_time_multiplier: 2.0,
            durability_ranges: BTreeMap::new(),
        }
    }

    pub fn with_range(mut self, threshold: u8, range: YieldRange) -> Self {
        self.durability_ranges.insert(threshold, range);
        self
    }

    pub fn with_smelt_in(mut self, kind: DeviceKind) -> Self {
        self.smelt_in = kind;
        self
    }

    pub fn with_durability_based(mut self, durability_based: bool) -> Self {
        self.durability_based = durability_based;
        self
    }

    /// Check the invariants of the definition.
    pub fn validate(&self) -> Result<(), DefinitionError> {

        if let Some(&threshold) = self.durability_ranges.keys().next_back() {
            if threshold > MAX_THRESHOLD {
                return Err(DefinitionError::ThresholdOutOfRange(threshold as u32));
            }
        }

        if !self.smelt_time_multiplier.is_finite() || self.smelt_time_multiplier <= 0.0 {
            return Err(DefinitionError::InvalidMultiplier(self.smelt_time_multiplier));
        }

        if self.durability_based {
            if self.durability_ranges.is_empty() {
                return Err(DefinitionError::NoThreshold);
            }
            if self.max_durability == 0 {
                return Err(DefinitionError::NoMaxDurability);
            }
        }

        Ok(())

    }

    /// Number of ticks needed to smelt this item in its device.
    pub fn cook_ticks(&self) -> u32 {
        let ticks = self.smelt_in.base_cook_ticks() as f64 * self.smelt_time_multiplier;
        (ticks as u32).max(1)
    }

    /// Compute the output quantity given the remaining durability of the item. A
    /// result of 0 means that the smelting fails and the item is destroyed.
    pub fn calculate_output(&self, remaining_durability: u32, rand: &mut JavaRandom) -> u16 {

        if !self.durability_based {
            return match self.durability_ranges.get(&MAX_THRESHOLD) {
                Some(range) => range.sample(rand),
                None => DEFAULT_FLAT_YIELD,
            };
        }

        // Thresholds are integers, so a threshold below a fractional percent is also
        // below its floor, and the last range below gives the largest one.
        let floor = wear_percent_floor(remaining_durability, self.max_durability);
        match self.durability_ranges.range(..=floor).next_back() {
            Some((_, range)) => range.sample(rand),
            None => 0,
        }

    }

}

/// Remaining durability as a percentage of the maximum durability, rounded down and
/// capped to 100. An item without max durability is always at 100%.
pub fn wear_percent_floor(remaining_durability: u32, max_durability: u32) -> u8 {
    if max_durability == 0 {
        MAX_THRESHOLD
    } else {
        let percent = remaining_durability as u64 * 100 / max_durability as u64;
        percent.min(MAX_THRESHOLD as u64) as u8
    }
}


/// Invariant violations of a definition.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DefinitionError {
    #[error("yield range min {min} is greater than max {max}")]
    InvertedRange { min: u16, max: u16 },
    #[error("threshold {0} is greater than 100")]
    ThresholdOutOfRange(u32),
    #[error("durability based item needs at least one threshold")]
    NoThreshold,
    #[error("durability based item needs a positive max durability")]
    NoMaxDurability,
    #[error("invalid smelt time multiplier {0}")]
    InvalidMultiplier(f64),
}
