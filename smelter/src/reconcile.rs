//! Reconciliation of the host's own device behavior with the smelting decisions of
//! the engine.
//!
//! The host cooks items on its own, the engine only receives events from it and
//! answers with decisions. When smelting an item gives no output, the host's result
//! is vetoed and the input item is destroyed, but the host may put the item back in
//! the input slot on later ticks, so a bounded sequence of cleanup steps is scheduled
//! to check the slot again, one step per tick.
//!
//! Per device, the state goes from idle to active when the device starts burning a
//! smeltable item, and back to idle when the item is smelted, or after the cleanup
//! sequence when the smelting failed. While cleanup is pending the device may be
//! blocked, in which case new starts and completions are vetoed.

use std::collections::{BTreeSet, HashMap};
use std::cmp::Ordering;
use std::sync::Arc;

use glam::IVec3;

use tracing::{debug, instrument, trace, warn};

use crate::config::{EngineConfig, SoundConfig};
use crate::debounce::DebounceGuard;
use crate::definition::ItemDefinition;
use crate::host::{Host, Sender, PERMISSION_BYPASS, PERMISSION_USE};
use crate::item::{ActorId, ItemStack, Material};
use crate::locale::Locales;
use crate::process::{ConversionProcess, ConversionStore};
use crate::registry::Registry;
use crate::settings::PlayerSettings;
use crate::smelt::compute_yield;
use crate::util::JavaRandom;


/// Index of the input slot in device inventories.
pub const INPUT_SLOT: u8 = 0;


/// Decision on a host event that can only be allowed or vetoed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Veto,
}

/// Decision on the host's completion of a smelting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SmeltDecision {
    /// The host applies its default result.
    Allow,
    /// The host must not produce any output nor consume the input.
    Veto,
    /// The host consumes one input item and produces this stack instead of its
    /// default result.
    Replace(ItemStack),
}

/// An actor interaction with the inventory of a device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InventoryAction {
    /// Direct placement of the cursor stack into the input slot.
    Place(ItemStack),
    /// Shift-click transfer of a stack from the actor's inventory into the device.
    ShiftTransfer(ItemStack),
    /// Drag of the cursor stack over some device slots.
    Drag {
        stack: ItemStack,
        slots: Vec<u8>,
    },
    /// Withdrawal of a stack from any device slot.
    Take(ItemStack),
}

/// Everything the reconciler needs from its surroundings to handle an event.
pub struct Context<'a> {
    pub host: &'a mut dyn Host,
    pub registry: &'a Registry,
    pub locales: &'a Locales,
    pub settings: &'a PlayerSettings,
    pub engine: &'a EngineConfig,
    pub sounds: &'a SoundConfig,
}

/// The flag of a device whose smelting failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureFlag {
    /// The input item has been destroyed but the cleanup steps are still running.
    PendingCleanup,
    /// Same as pending cleanup, but new smelting on the device is refused.
    Blocked,
}

/// Failure state of a device, idle devices have none.
#[derive(Debug, Clone)]
pub struct FailureState {
    pub flag: FailureFlag,
    /// Number of times the item has been found again and cleared.
    pub retries: u8,
    /// The material of the destroyed item.
    material: Material,
    /// Number of the last cleanup step.
    last_step: u8,
    /// Identifier of the cleanup sequence, steps of other sequences are ignored.
    cleanup_id: u64,
    /// If the failed item had a tracked process, only that process is dropped when
    /// the cleanup ends.
    owns_process: bool,
}


/// The state machine of all devices.
#[derive(Debug)]
pub struct Reconciler {
    /// Ticks elapsed since the reconciler creation.
    time: u64,
    rand: JavaRandom,
    processes: ConversionStore,
    debounce: DebounceGuard,
    failures: HashMap<IVec3, FailureState>,
    /// Cleanup steps to run, ordered by time.
    scheduled: BTreeSet<ScheduledStep>,
    /// The last actor allowed to place a smeltable item in each device.
    owners: HashMap<IVec3, ActorId>,
    /// Next unique id for scheduled steps and cleanup sequences.
    uid: u64,
}

impl Default for Reconciler {
    fn default() -> Self {
        Self::with_rand(JavaRandom::new_seeded())
    }
}

impl Reconciler {

    pub fn new() -> Self {
        Self::default()
    }

    /// Create a reconciler sampling yields with the given random generator.
    pub fn with_rand(rand: JavaRandom) -> Self {
        Self {
            time: 0,
            rand,
            processes: ConversionStore::new(),
            debounce: DebounceGuard::new(),
            failures: HashMap::new(),
            scheduled: BTreeSet::new(),
            owners: HashMap::new(),
            uid: 0,
        }
    }

    /// Ticks elapsed since creation.
    #[inline]
    pub fn time(&self) -> u64 {
        self.time
    }

    #[inline]
    pub fn processes(&self) -> &ConversionStore {
        &self.processes
    }

    pub fn failure(&self, pos: IVec3) -> Option<&FailureState> {
        self.failures.get(&pos)
    }

    /// Return true if new smelting is refused on the device until its cleanup ends.
    pub fn is_blocked(&self, pos: IVec3) -> bool {
        self.failures.get(&pos).is_some_and(|failure| failure.flag == FailureFlag::Blocked)
    }

    pub fn owner(&self, pos: IVec3) -> Option<ActorId> {
        self.owners.get(&pos).copied()
    }

    /// Sample the output amount of one item of the stack.
    pub fn calculate_output(&mut self, stack: &ItemStack, definition: &ItemDefinition) -> u16 {
        compute_yield(definition, stack, &mut self.rand)
    }

    /// Start tracking a process on the device, returning false if one already exists.
    pub fn start(&mut self, pos: IVec3, source: ItemStack, definition: Arc<ItemDefinition>, owner: Option<ActorId>) -> bool {

        let output_amount = compute_yield(&definition, &source, &mut self.rand);
        let cook_ticks = definition.cook_ticks();

        let started = self.processes.start_if_absent(ConversionProcess {
            pos,
            source,
            definition,
            output_amount,
            cook_ticks,
            owner,
            elapsed_ticks: 0,
        });

        if started {
            debug!("started smelting at {pos}: {output_amount} expected, {cook_ticks} ticks");
        }

        started

    }

    /// Stop tracking the process on the device after its completion.
    pub fn complete(&mut self, pos: IVec3) -> bool {
        self.processes.remove(pos).is_some()
    }

    /// Abandon the process on the device and forget all its bookkeeping.
    pub fn cancel(&mut self, pos: IVec3) -> bool {
        self.failures.remove(&pos);
        self.debounce.clear(pos);
        self.owners.remove(&pos);
        self.processes.remove(pos).is_some()
    }

    /// Abandon every process and forget all bookkeeping, pending cleanup steps
    /// included.
    pub fn cancel_all(&mut self) {
        let count = self.processes.clear_all();
        self.failures.clear();
        self.debounce.clear_all();
        self.owners.clear();
        self.scheduled.clear();
        debug!("cancelled {count} smelting process(es)");
    }

    /// The device starts burning fuel for its input item.
    #[instrument(skip_all)]
    pub fn handle_burn(&mut self, ctx: &mut Context, pos: IVec3) -> Decision {

        let stack = ctx.host.input_stack(pos);
        let Some(def) = recognized(ctx.registry, &stack) else {
            return Decision::Allow;
        };

        if ctx.host.device_kind(pos) != Some(def.smelt_in) {
            debug!("burn vetoed at {pos}: {} requires {}", def.id, def.smelt_in);
            return Decision::Veto;
        }

        if self.is_blocked(pos) {
            debug!("burn vetoed at {pos}: cleanup pending");
            return Decision::Veto;
        }

        if !self.processes.is_active(pos) {
            let owner = self.owner(pos);
            self.start(pos, stack, def, owner);
        }

        Decision::Allow

    }

    /// The device is about to finish smelting its input item. Events already
    /// cancelled by the host are left as is.
    #[instrument(skip_all)]
    pub fn handle_smelt(&mut self, ctx: &mut Context, pos: IVec3, now_ms: u64, cancelled: bool) -> SmeltDecision {

        if cancelled {
            return SmeltDecision::Allow;
        }

        let stack = ctx.host.input_stack(pos);
        let Some(def) = recognized(ctx.registry, &stack) else {
            return SmeltDecision::Allow;
        };

        if ctx.host.device_kind(pos) != Some(def.smelt_in) {
            debug!("smelt vetoed at {pos}: {} requires {}", def.id, def.smelt_in);
            return SmeltDecision::Veto;
        }

        // The completion has already been resolved by the first signal.
        if !self.debounce.should_process(pos, now_ms, ctx.engine.debounce_ms) {
            trace!("duplicate smelt signal at {pos}");
            return SmeltDecision::Veto;
        }

        if self.is_blocked(pos) {
            debug!("smelt vetoed at {pos}: cleanup pending");
            return SmeltDecision::Veto;
        }

        let amount = compute_yield(&def, &stack, &mut self.rand);
        if amount > 0 {
            self.processes.remove(pos);
            play_cue(ctx, pos, Cue::Success);
            debug!("smelted {} at {pos} into {amount} {}", def.id, def.output);
            SmeltDecision::Replace(ItemStack::new_single(def.output.clone()).with_size(amount))
        } else {
            debug!("smelting of {} failed at {pos}", def.id);
            self.fail(ctx, pos, &def);
            SmeltDecision::Veto
        }

    }

    /// The inventory of the device has been closed.
    pub fn handle_inventory_close(&mut self, ctx: &mut Context, pos: IVec3) {

        let failed = self.failures.remove(&pos).is_some();
        self.debounce.clear(pos);

        let empty = ctx.host.input_stack(pos).is_empty();
        if empty {
            self.owners.remove(&pos);
        }

        if (empty || failed) && self.processes.remove(pos).is_some() {
            debug!("abandoned smelting at {pos}");
        }

    }

    /// An item has been extracted from the output slot of the device.
    pub fn handle_output_extract(&mut self, pos: IVec3) {
        if self.processes.remove(pos).is_some() {
            debug!("smelting at {pos} completed by extraction");
        }
    }

    /// An actor interacts with the inventory of the device. Smeltable items can only
    /// be placed or withdrawn by authorized actors, and only placed into the kind of
    /// device they require.
    pub fn handle_inventory_action(&mut self, ctx: &mut Context, actor: ActorId, pos: IVec3, action: &InventoryAction) -> Decision {

        let (stack, placing) = match action {
            InventoryAction::Place(stack) |
            InventoryAction::ShiftTransfer(stack) => (stack, true),
            InventoryAction::Drag { stack, slots } => {
                if !slots.contains(&INPUT_SLOT) {
                    return Decision::Allow;
                }
                (stack, true)
            }
            InventoryAction::Take(stack) => (stack, false),
        };

        let Some(def) = recognized(ctx.registry, stack) else {
            return Decision::Allow;
        };

        if !ctx.host.has_permission(actor, PERMISSION_USE) && !ctx.host.has_permission(actor, PERMISSION_BYPASS) {
            let text = ctx.locales.message(ctx.settings.locale(actor), "no_permission", &[]);
            ctx.host.send_message(Sender::Actor(actor), &text);
            return Decision::Veto;
        }

        if placing {
            if ctx.host.device_kind(pos) != Some(def.smelt_in) {
                debug!("placement of {} vetoed at {pos}: requires {}", def.id, def.smelt_in);
                return Decision::Veto;
            }
            self.owners.insert(pos, actor);
        }

        Decision::Allow

    }

    /// Advance by one host tick and run the cleanup steps that are due.
    ///
    /// The host must call this at the start of its tick, before its devices are
    /// ticked and after it has applied changes deferred from the previous tick, so
    /// that a cleanup step scheduled by a failure sees the item the host put back.
    #[instrument(skip_all)]
    pub fn tick(&mut self, ctx: &mut Context) {

        self.time += 1;

        for process in self.processes.iter_mut() {
            process.elapsed_ticks += 1;
        }

        while self.scheduled.first().is_some_and(|step| step.time <= self.time) {
            if let Some(step) = self.scheduled.pop_first() {
                self.run_step(ctx, step);
            }
        }

    }

    /// Destroy one input item and schedule the cleanup sequence.
    fn fail(&mut self, ctx: &mut Context, pos: IVec3, def: &ItemDefinition) {

        let stack = ctx.host.input_stack(pos);
        if !stack.is_empty() {
            let size = stack.size - 1;
            ctx.host.set_input_stack(pos, stack.with_size(size).to_non_empty().unwrap_or_default());
        }

        reset_timers(ctx, pos);
        ctx.host.update_device(pos);
        play_cue(ctx, pos, Cue::Failure);

        let last_step = ctx.engine.cleanup_steps;
        if last_step == 0 {
            self.processes.remove(pos);
            return;
        }

        let cleanup_id = self.next_uid();
        let flag = if ctx.engine.block_during_cleanup {
            FailureFlag::Blocked
        } else {
            FailureFlag::PendingCleanup
        };

        let owns_process = self.processes.get(pos)
            .is_some_and(|process| process.definition.material == def.material);

        let prev = self.failures.insert(pos, FailureState {
            flag,
            retries: 0,
            material: def.material.clone(),
            last_step,
            cleanup_id,
            owns_process,
        });

        if prev.is_some() {
            debug!("cleanup at {pos} superseded by a new failure");
        }

        for step in 1..=last_step {
            let uid = self.next_uid();
            self.scheduled.insert(ScheduledStep {
                uid,
                time: self.time + step as u64,
                pos,
                cleanup_id,
                step,
            });
        }

    }

    fn run_step(&mut self, ctx: &mut Context, step: ScheduledStep) {

        let pos = step.pos;
        let Some(failure) = self.failures.get_mut(&pos) else {
            trace!("stale cleanup step at {pos}");
            return;
        };

        if failure.cleanup_id != step.cleanup_id {
            trace!("stale cleanup step at {pos}");
            return;
        }

        // Another item may have been placed meanwhile, it is left untouched.
        let stack = ctx.host.input_stack(pos);
        let reappeared = !stack.is_empty()
            && stack.material == failure.material
            && recognized(ctx.registry, &stack).is_some();

        if reappeared {
            failure.retries += 1;
            ctx.host.set_input_stack(pos, ItemStack::EMPTY);
            reset_timers(ctx, pos);
            ctx.host.update_device(pos);
            debug!("cleanup step {} cleared {} again at {pos}", step.step, stack.material);
        } else {
            trace!("cleanup step {} at {pos}: nothing to clear", step.step);
        }

        if step.step >= failure.last_step {
            if reappeared {
                warn!("item kept reappearing at {pos} after {} cleanup steps", failure.last_step);
            }
            let owns_process = failure.owns_process;
            let material = failure.material.clone();
            self.failures.remove(&pos);
            // A process started while cleaning up is not the failed one.
            if owns_process && self.processes.get(pos).is_some_and(|process| process.definition.material == material) {
                self.processes.remove(pos);
            }
            debug!("cleanup done at {pos}");
        }

    }

    fn next_uid(&mut self) -> u64 {
        let uid = self.uid;
        self.uid += 1;
        uid
    }

}


/// A cleanup step scheduled in the future, ordered by time and then by its unique
/// id so that several steps can be scheduled at the same time.
#[derive(Debug, Clone, Eq)]
struct ScheduledStep {
    uid: u64,
    time: u64,
    pos: IVec3,
    cleanup_id: u64,
    /// The step number, from 1 to the last step.
    step: u8,
}

impl PartialEq for ScheduledStep {
    fn eq(&self, other: &Self) -> bool {
        self.uid == other.uid && self.time == other.time
    }
}

impl PartialOrd for ScheduledStep {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(Ord::cmp(self, other))
    }
}

impl Ord for ScheduledStep {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time.cmp(&other.time)
            .then(self.uid.cmp(&other.uid))
    }
}


#[derive(Debug, Clone, Copy)]
enum Cue {
    Success,
    Failure,
}

/// Play a cue to every nearby actor that has sounds enabled.
fn play_cue(ctx: &mut Context, pos: IVec3, cue: Cue) {
    let cue = match cue {
        Cue::Success => &ctx.sounds.success,
        Cue::Failure => &ctx.sounds.failure,
    };
    for actor in ctx.host.nearby_actors(pos, ctx.sounds.radius) {
        if ctx.settings.is_sound_enabled(actor) {
            ctx.host.play_cue(actor, pos, cue);
        }
    }
}

/// Stop the cooking progress, the fuel keeps burning unless configured otherwise.
fn reset_timers(ctx: &mut Context, pos: IVec3) {
    ctx.host.set_cook_time(pos, 0);
    if ctx.engine.reset_fuel_on_failure {
        ctx.host.set_burn_time(pos, 0);
    }
}

/// The enabled definition of the stack, if any.
fn recognized(registry: &Registry, stack: &ItemStack) -> Option<Arc<ItemDefinition>> {
    registry.get_for_stack(stack)
        .filter(|def| def.enabled)
        .cloned()
}


#[cfg(test)]
mod tests {

    use crate::config::Config;
    use crate::definition::YieldRange;
    use crate::host::MemoryHost;
    use crate::item::DeviceKind;
    use super::*;

    const BLAST: IVec3 = IVec3::new(0, 64, 0);
    const FURNACE: IVec3 = IVec3::new(4, 64, 0);

    const USER: ActorId = ActorId(1);
    const STRANGER: ActorId = ActorId(2);
    const QUIET: ActorId = ActorId(3);

    fn material(name: &str) -> Material {
        Material::parse(name).unwrap()
    }

    fn pickaxe(damage: u16) -> ItemStack {
        ItemStack::new_single(material("iron_pickaxe")).with_damage(damage)
    }

    fn nuggets(size: u16) -> ItemStack {
        ItemStack::new_single(material("iron_nugget")).with_size(size)
    }

    struct Fixture {
        host: MemoryHost,
        registry: Registry,
        locales: Locales,
        settings: PlayerSettings,
        config: Config,
        reconciler: Reconciler,
    }

    impl Fixture {

        fn new() -> Self {

            let mut registry = Registry::new();
            registry.insert(ItemDefinition::new("iron_pickaxe", material("iron_pickaxe"), material("iron_nugget"), 100)
                .with_range(0, YieldRange::exact(1))
                .with_range(50, YieldRange::exact(2))
                .with_range(80, YieldRange::exact(0)));
            registry.insert(ItemDefinition::new("minecart", material("minecart"), material("iron_ingot"), 0)
                .with_durability_based(false)
                .with_range(100, YieldRange::new(3, 5).unwrap()));
            registry.insert(ItemDefinition::new("golden_axe", material("golden_axe"), material("gold_nugget"), 32)
                .with_smelt_in(DeviceKind::Furnace)
                .with_range(0, YieldRange::exact(2)));

            let mut host = MemoryHost::new();
            host.add_furnace(BLAST, DeviceKind::BlastFurnace).burn_time = 1600;
            host.add_furnace(FURNACE, DeviceKind::Furnace);
            host.add_actor(USER, IVec3::new(0, 64, 3), &[crate::host::PERMISSION_USE]);
            host.add_actor(STRANGER, IVec3::new(100, 64, 0), &[]);
            host.add_actor(QUIET, IVec3::new(1, 64, 1), &[crate::host::PERMISSION_BYPASS]);

            let mut settings = PlayerSettings::in_memory();
            settings.set_sound_enabled(QUIET, false);

            Self {
                host,
                registry,
                locales: Locales::default(),
                settings,
                config: Config::default(),
                reconciler: Reconciler::with_rand(JavaRandom::new(0)),
            }

        }

        fn run<R>(&mut self, func: impl FnOnce(&mut Reconciler, &mut Context) -> R) -> R {
            let mut ctx = Context {
                host: &mut self.host,
                registry: &self.registry,
                locales: &self.locales,
                settings: &self.settings,
                engine: &self.config.engine,
                sounds: &self.config.sounds,
            };
            func(&mut self.reconciler, &mut ctx)
        }

        fn set_input(&mut self, pos: IVec3, stack: ItemStack) {
            self.host.furnace_mut(pos).unwrap().input_stack = stack;
        }

        fn input(&self, pos: IVec3) -> ItemStack {
            self.host.furnace(pos).unwrap().input_stack.clone()
        }

        fn burn(&mut self, pos: IVec3) -> Decision {
            self.run(|r, ctx| r.handle_burn(ctx, pos))
        }

        fn smelt(&mut self, pos: IVec3, now_ms: u64) -> SmeltDecision {
            self.run(|r, ctx| r.handle_smelt(ctx, pos, now_ms, false))
        }

        fn tick(&mut self, count: usize) {
            for _ in 0..count {
                self.run(|r, ctx| r.tick(ctx));
            }
        }

    }

    #[test]
    fn failure_cleans_device() {

        let mut fx = Fixture::new();
        fx.set_input(BLAST, pickaxe(10));
        assert_eq!(fx.burn(BLAST), Decision::Allow);
        assert!(fx.reconciler.processes().is_active(BLAST));

        fx.host.furnace_mut(BLAST).unwrap().cook_time = 199;
        assert_eq!(fx.smelt(BLAST, 1000), SmeltDecision::Veto);

        let furnace = fx.host.furnace(BLAST).unwrap();
        assert!(furnace.input_stack.is_empty());
        assert!(furnace.output_stack.is_empty());
        assert_eq!(furnace.cook_time, 0);
        assert_eq!(furnace.burn_time, 1600);
        assert_eq!(furnace.updates, 1);
        assert_eq!(fx.host.cue_names_at(BLAST), ["block.fire.extinguish"]);
        assert_eq!(fx.host.cues[0].actor, USER);
        assert!(fx.reconciler.is_blocked(BLAST));
        assert!(fx.reconciler.processes().is_active(BLAST));

        // The host puts the vetoed item back.
        fx.set_input(BLAST, pickaxe(10));
        fx.host.furnace_mut(BLAST).unwrap().cook_time = 12;
        fx.tick(1);
        assert!(fx.input(BLAST).is_empty());
        assert_eq!(fx.host.cook_time(BLAST), 0);
        assert_eq!(fx.reconciler.failure(BLAST).unwrap().retries, 1);

        // Blocked while cleaning up, even after the debounce window.
        fx.set_input(BLAST, pickaxe(50));
        assert_eq!(fx.burn(BLAST), Decision::Veto);
        assert_eq!(fx.smelt(BLAST, 2000), SmeltDecision::Veto);
        fx.set_input(BLAST, ItemStack::EMPTY);

        fx.tick(3);
        assert!(fx.reconciler.failure(BLAST).is_some());
        fx.tick(1);
        assert!(fx.reconciler.failure(BLAST).is_none());
        assert!(!fx.reconciler.is_blocked(BLAST));
        assert!(!fx.reconciler.processes().is_active(BLAST));
        assert!(fx.input(BLAST).is_empty());

        fx.set_input(BLAST, pickaxe(50));
        assert_eq!(fx.burn(BLAST), Decision::Allow);
        assert!(fx.reconciler.processes().is_active(BLAST));

    }

    #[test]
    fn failure_decrements_stack() {
        let mut fx = Fixture::new();
        fx.set_input(BLAST, pickaxe(10).with_size(3));
        assert_eq!(fx.smelt(BLAST, 0), SmeltDecision::Veto);
        assert_eq!(fx.input(BLAST).size, 2);
    }

    #[test]
    fn unrelated_item_kept() {
        let mut fx = Fixture::new();
        fx.set_input(BLAST, pickaxe(10));
        fx.smelt(BLAST, 0);
        let cart = ItemStack::new_single(material("minecart"));
        fx.set_input(BLAST, cart.clone());
        fx.tick(5);
        assert_eq!(fx.input(BLAST), cart);
        assert!(fx.reconciler.failure(BLAST).is_none());
    }

    #[test]
    fn success_with_wear() {

        let mut fx = Fixture::new();

        fx.set_input(BLAST, pickaxe(40));
        fx.burn(BLAST);
        assert_eq!(fx.smelt(BLAST, 0), SmeltDecision::Replace(nuggets(2)));
        assert!(!fx.reconciler.processes().is_active(BLAST));
        assert_eq!(fx.host.cue_names_at(BLAST), ["block.smithing_table.use"]);

        fx.set_input(BLAST, pickaxe(90));
        fx.burn(BLAST);
        assert_eq!(fx.smelt(BLAST, 1000), SmeltDecision::Replace(nuggets(1)));

        // Unknown damage means full health.
        fx.set_input(BLAST, ItemStack::new_single(material("iron_pickaxe")));
        assert_eq!(fx.smelt(BLAST, 2000), SmeltDecision::Veto);

    }

    #[test]
    fn flat_yield() {
        let mut fx = Fixture::new();
        fx.set_input(BLAST, ItemStack::new_single(material("minecart")));
        for i in 0..50 {
            match fx.smelt(BLAST, i * 1000) {
                SmeltDecision::Replace(stack) => {
                    assert_eq!(stack.material, material("iron_ingot"));
                    assert!((3..=5).contains(&stack.size));
                }
                decision => panic!("unexpected {decision:?}"),
            }
        }
    }

    #[test]
    fn duplicate_signals() {

        let mut fx = Fixture::new();
        fx.set_input(BLAST, pickaxe(40));
        fx.burn(BLAST);
        assert_eq!(fx.smelt(BLAST, 1000), SmeltDecision::Replace(nuggets(2)));
        assert_eq!(fx.smelt(BLAST, 1050), SmeltDecision::Veto);
        assert_eq!(fx.host.cues.len(), 1);

        // Also for failures, the second signal must not destroy another item.
        fx.set_input(BLAST, pickaxe(10).with_size(2));
        assert_eq!(fx.smelt(BLAST, 2000), SmeltDecision::Veto);
        assert_eq!(fx.smelt(BLAST, 2050), SmeltDecision::Veto);
        assert_eq!(fx.input(BLAST).size, 1);

    }

    #[test]
    fn wrong_device() {

        let mut fx = Fixture::new();
        let axe = ItemStack::new_single(material("golden_axe")).with_damage(3);

        fx.set_input(BLAST, axe.clone());
        assert_eq!(fx.burn(BLAST), Decision::Veto);
        assert!(!fx.reconciler.processes().is_active(BLAST));
        assert_eq!(fx.smelt(BLAST, 0), SmeltDecision::Veto);
        assert_eq!(fx.input(BLAST), axe);

        fx.set_input(FURNACE, axe);
        assert_eq!(fx.burn(FURNACE), Decision::Allow);
        assert!(fx.reconciler.processes().is_active(FURNACE));
        assert_eq!(fx.reconciler.processes().get(FURNACE).unwrap().cook_ticks, 400);

    }

    #[test]
    fn unrecognized_untouched() {
        let mut fx = Fixture::new();
        fx.set_input(FURNACE, ItemStack::new_single(material("iron_ore")).with_size(8));
        assert_eq!(fx.burn(FURNACE), Decision::Allow);
        assert_eq!(fx.smelt(FURNACE, 0), SmeltDecision::Allow);
        assert!(fx.reconciler.processes().is_empty());
        assert!(fx.host.cues.is_empty());
    }

    #[test]
    fn cancelled_upstream() {
        let mut fx = Fixture::new();
        fx.set_input(BLAST, pickaxe(10));
        let decision = fx.run(|r, ctx| r.handle_smelt(ctx, BLAST, 0, true));
        assert_eq!(decision, SmeltDecision::Allow);
        assert_eq!(fx.input(BLAST), pickaxe(10));
        // Not recorded by the debounce guard.
        assert_eq!(fx.smelt(BLAST, 10), SmeltDecision::Veto);
        assert!(fx.input(BLAST).is_empty());
    }

    #[test]
    fn inventory_protection() {

        let mut fx = Fixture::new();
        let place = InventoryAction::Place(pickaxe(0));

        let decision = fx.run(|r, ctx| r.handle_inventory_action(ctx, STRANGER, BLAST, &place));
        assert_eq!(decision, Decision::Veto);
        assert_eq!(
            fx.host.messages_of(Sender::Actor(STRANGER)).collect::<Vec<_>>(),
            ["§cYou don't have permission to use item smelting!"],
        );

        let take = InventoryAction::Take(pickaxe(0));
        assert_eq!(fx.run(|r, ctx| r.handle_inventory_action(ctx, STRANGER, BLAST, &take)), Decision::Veto);
        assert_eq!(fx.run(|r, ctx| r.handle_inventory_action(ctx, USER, BLAST, &take)), Decision::Allow);

        let ore = InventoryAction::Place(ItemStack::new_single(material("iron_ore")));
        assert_eq!(fx.run(|r, ctx| r.handle_inventory_action(ctx, STRANGER, BLAST, &ore)), Decision::Allow);

        let drag = InventoryAction::Drag { stack: pickaxe(0), slots: vec![1, 2] };
        assert_eq!(fx.run(|r, ctx| r.handle_inventory_action(ctx, STRANGER, BLAST, &drag)), Decision::Allow);
        let drag = InventoryAction::Drag { stack: pickaxe(0), slots: vec![0, 1] };
        assert_eq!(fx.run(|r, ctx| r.handle_inventory_action(ctx, STRANGER, BLAST, &drag)), Decision::Veto);

        // Authorized, but wrong device.
        let shift = InventoryAction::ShiftTransfer(pickaxe(0));
        assert_eq!(fx.run(|r, ctx| r.handle_inventory_action(ctx, USER, FURNACE, &shift)), Decision::Veto);
        assert_eq!(fx.host.messages.len(), 3);

        assert_eq!(fx.run(|r, ctx| r.handle_inventory_action(ctx, QUIET, BLAST, &shift)), Decision::Allow);
        assert_eq!(fx.run(|r, ctx| r.handle_inventory_action(ctx, USER, BLAST, &place)), Decision::Allow);
        assert_eq!(fx.reconciler.owner(BLAST), Some(USER));

        fx.set_input(BLAST, pickaxe(0));
        fx.burn(BLAST);
        assert_eq!(fx.reconciler.processes().get(BLAST).unwrap().owner, Some(USER));

    }

    #[test]
    fn localized_denial() {
        let mut fx = Fixture::new();
        let fr = crate::locale::Locale::parse("fr_fr", "locale_code = \"fra\"\nno_permission = \"&cNon !\"").unwrap();
        fx.locales.insert("fr_fr", fr);
        fx.settings.set_locale(STRANGER, "fr_fr");
        let place = InventoryAction::Place(pickaxe(0));
        fx.run(|r, ctx| r.handle_inventory_action(ctx, STRANGER, BLAST, &place));
        assert_eq!(fx.host.messages_of(Sender::Actor(STRANGER)).collect::<Vec<_>>(), ["§cNon !"]);
    }

    #[test]
    fn inventory_close() {

        let mut fx = Fixture::new();

        fx.set_input(BLAST, pickaxe(40));
        fx.burn(BLAST);
        fx.run(|r, ctx| r.handle_inventory_close(ctx, BLAST));
        assert!(fx.reconciler.processes().is_active(BLAST));

        fx.set_input(BLAST, ItemStack::EMPTY);
        fx.run(|r, ctx| r.handle_inventory_close(ctx, BLAST));
        assert!(!fx.reconciler.processes().is_active(BLAST));

        // Closing during cleanup forgets it, its remaining steps do nothing.
        fx.set_input(BLAST, pickaxe(10));
        fx.burn(BLAST);
        fx.smelt(BLAST, 0);
        fx.set_input(BLAST, pickaxe(10));
        fx.run(|r, ctx| r.handle_inventory_close(ctx, BLAST));
        assert!(fx.reconciler.failure(BLAST).is_none());
        assert!(!fx.reconciler.processes().is_active(BLAST));
        fx.tick(5);
        assert_eq!(fx.input(BLAST), pickaxe(10));

        // Debounce is cleared too.
        assert_eq!(fx.smelt(BLAST, 10), SmeltDecision::Veto);
        assert!(fx.input(BLAST).is_empty());

    }

    #[test]
    fn output_extract() {
        let mut fx = Fixture::new();
        fx.set_input(BLAST, pickaxe(40));
        fx.burn(BLAST);
        fx.tick(3);
        assert_eq!(fx.reconciler.processes().get(BLAST).unwrap().elapsed_ticks, 3);
        fx.reconciler.handle_output_extract(BLAST);
        assert!(!fx.reconciler.processes().is_active(BLAST));
    }

    #[test]
    fn newer_failure_supersedes() {

        let mut fx = Fixture::new();
        fx.config.engine.block_during_cleanup = false;

        fx.set_input(BLAST, pickaxe(10));
        fx.smelt(BLAST, 1000);
        assert_eq!(fx.reconciler.failure(BLAST).unwrap().flag, FailureFlag::PendingCleanup);
        assert!(!fx.reconciler.is_blocked(BLAST));
        fx.tick(2);

        fx.set_input(BLAST, pickaxe(10).with_size(2));
        assert_eq!(fx.smelt(BLAST, 1200), SmeltDecision::Veto);
        assert_eq!(fx.input(BLAST).size, 1);

        // Steps of the first cleanup are ignored, including its last one.
        fx.tick(3);
        assert!(fx.input(BLAST).is_empty());
        assert!(fx.reconciler.failure(BLAST).is_some());
        fx.tick(2);
        assert!(fx.reconciler.failure(BLAST).is_none());

    }

    #[test]
    fn fuel_reset() {
        let mut fx = Fixture::new();
        fx.config.engine.reset_fuel_on_failure = true;
        fx.set_input(BLAST, pickaxe(10));
        fx.smelt(BLAST, 0);
        assert_eq!(fx.host.burn_time(BLAST), 0);
    }

    #[test]
    fn cancel_all() {

        let mut fx = Fixture::new();
        fx.set_input(FURNACE, ItemStack::new_single(material("golden_axe")));
        fx.burn(FURNACE);
        fx.set_input(BLAST, pickaxe(10));
        fx.burn(BLAST);
        fx.smelt(BLAST, 0);

        fx.reconciler.cancel_all();
        assert!(fx.reconciler.processes().is_empty());
        assert!(fx.reconciler.failure(BLAST).is_none());

        fx.set_input(BLAST, pickaxe(10));
        fx.tick(5);
        assert_eq!(fx.input(BLAST), pickaxe(10));

    }


    #[test]
    fn single_cleanup_step() {

        let mut fx = Fixture::new();
        fx.config.engine.cleanup_steps = 1;
        fx.set_input(BLAST, pickaxe(10));
        fx.burn(BLAST);
        assert_eq!(fx.smelt(BLAST, 0), SmeltDecision::Veto);

        // Next host tick: the host puts the item back, then ticks the engine.
        fx.set_input(BLAST, pickaxe(10));
        fx.tick(1);
        assert!(fx.input(BLAST).is_empty());
        assert!(fx.reconciler.failure(BLAST).is_none());
        assert!(!fx.reconciler.processes().is_active(BLAST));

    }

    #[test]
    fn cleanup_keeps_newer_process() {

        let mut fx = Fixture::new();
        fx.config.engine.block_during_cleanup = false;

        // Failure without any tracked process.
        fx.set_input(BLAST, pickaxe(10));
        assert_eq!(fx.smelt(BLAST, 0), SmeltDecision::Veto);
        assert!(!fx.reconciler.is_blocked(BLAST));
        fx.tick(1);

        fx.set_input(BLAST, ItemStack::new_single(material("minecart")));
        assert_eq!(fx.burn(BLAST), Decision::Allow);
        assert!(fx.reconciler.processes().is_active(BLAST));

        fx.tick(4);
        assert!(fx.reconciler.failure(BLAST).is_none());
        let process = fx.reconciler.processes().get(BLAST).unwrap();
        assert_eq!(process.definition.id, "minecart");
        assert_eq!(fx.input(BLAST), ItemStack::new_single(material("minecart")));

    }

}
