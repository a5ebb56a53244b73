//! A scripted session of two furnaces, emulating the native furnace logic of a host
//! together with its quirks: completion signals emitted twice and vetoed items put
//! back in the input slot on the next tick.

use std::time::{Duration, Instant};

use glam::IVec3;

use tracing::{debug, info, warn};

use smelter::Smelter;
use smelter::command::{self, CommandContext};
use smelter::host::{Host, MemoryHost, Sender, PERMISSION_USE};
use smelter::item::{ActorId, DeviceKind, ItemStack, Material};
use smelter::reconcile::{Decision, InventoryAction, SmeltDecision};

use crate::config;


/// The tick duration.
const TICK_DURATION: Duration = Duration::from_millis(50);
/// Burn ticks given by one fuel item.
const FUEL_TICKS: u32 = 1600;
/// The script ends at this tick.
const END_TICK: u64 = 460;

const BLAST_POS: IVec3 = IVec3::new(0, 64, 0);
const FURNACE_POS: IVec3 = IVec3::new(3, 64, 0);

const SMITH: ActorId = ActorId(0x5eed);
const VISITOR: ActorId = ActorId(0xbeef);


/// The simulation state.
pub struct Simulation {
    host: MemoryHost,
    smelter: Smelter,
    /// Current tick.
    tick: u64,
    /// Devices that will emit their completion signal again on the next tick.
    echoes: Vec<IVec3>,
    /// Vetoed input stacks that the host will put back on the next tick.
    ghosts: Vec<(IVec3, ItemStack)>,
}

impl Simulation {

    pub fn new(mut smelter: Smelter) -> Self {

        let mut host = MemoryHost::new();
        let coal = ItemStack::new_single(material("coal")).with_size(8);
        host.add_furnace(BLAST_POS, DeviceKind::BlastFurnace).fuel_stack = coal.clone();
        host.add_furnace(FURNACE_POS, DeviceKind::Furnace).fuel_stack = coal;
        host.add_actor(SMITH, IVec3::new(1, 64, 2), &[PERMISSION_USE]);
        host.add_actor(VISITOR, IVec3::new(-2, 64, 1), &[]);

        smelter.register_recipes(&mut host);

        Self {
            host,
            smelter,
            tick: 0,
            echoes: Vec::new(),
            ghosts: Vec::new(),
        }

    }

    pub fn is_finished(&self) -> bool {
        self.tick >= END_TICK
    }

    /// Run a tick and then wait for the tick duration to elapse, unless fast mode.
    pub fn tick_padded(&mut self) {

        let start = Instant::now();
        self.tick();
        let elapsed = start.elapsed();

        if config::fast() {
            return;
        }

        if let Some(missing) = TICK_DURATION.checked_sub(elapsed) {
            std::thread::sleep(missing);
        } else {
            warn!("tick too long {:?}, expected {:?}", elapsed, TICK_DURATION);
        }

    }

    /// Run a single tick of the host and of the engine.
    pub fn tick(&mut self) {

        // Changes deferred by the host from the previous tick are applied first.
        for (pos, stack) in std::mem::take(&mut self.ghosts) {
            if self.host.input_stack(pos).is_empty() {
                debug!("host puts {} back at {pos}", stack.material);
                self.host.set_input_stack(pos, stack);
            }
        }

        self.smelter.tick(&mut self.host);

        self.run_script();

        for pos in std::mem::take(&mut self.echoes) {
            let now_ms = self.now_ms();
            let decision = self.smelter.handle_smelt(&mut self.host, pos, now_ms, false);
            debug!("repeated completion at {pos}: {decision:?}");
        }

        self.tick_furnace(BLAST_POS);
        self.tick_furnace(FURNACE_POS);

        self.flush_host();

        self.tick += 1;

    }

    /// Cancel every process, remove recipes and save settings.
    pub fn cleanup(&mut self) {
        self.smelter.cleanup(&mut self.host);
        for pos in [BLAST_POS, FURNACE_POS] {
            if let Some(furnace) = self.host.furnace(pos) {
                info!("{pos}: input {:?}, output {} x{}", furnace.input_stack.material.as_str(), furnace.output_stack.material, furnace.output_stack.size);
            }
        }
    }

    fn now_ms(&self) -> u64 {
        self.tick * TICK_DURATION.as_millis() as u64
    }

    fn run_script(&mut self) {
        match self.tick {
            0 => {
                self.place(SMITH, BLAST_POS, ItemStack::new_single(material("iron_pickaxe")).with_damage(200));
                self.place(VISITOR, BLAST_POS, ItemStack::new_single(material("iron_sword")).with_damage(20));
            }
            1 => {
                let axe = ItemStack::new_single(material("golden_axe")).with_damage(30);
                let shift = InventoryAction::ShiftTransfer(axe.clone());
                let decision = self.smelter.handle_inventory_action(&mut self.host, SMITH, BLAST_POS, &shift);
                info!("smith shift-clicks a worn golden axe into the blast furnace: {decision:?}");
                self.place(SMITH, FURNACE_POS, axe);
            }
            210 => {
                if let Some(furnace) = self.host.furnace_mut(BLAST_POS) {
                    let output = std::mem::take(&mut furnace.output_stack);
                    if !output.is_empty() {
                        self.smelter.handle_output_extract(BLAST_POS);
                        info!("smith takes {} x{}", output.material, output.size);
                    }
                }
                self.place(SMITH, BLAST_POS, ItemStack::new_single(material("minecart")));
            }
            440 => {
                self.command(Sender::Actor(SMITH), "sound off");
                self.command(Sender::Console, "info");
                self.command(Sender::Console, "recipes");
            }
            450 => {
                self.smelter.handle_inventory_close(&mut self.host, BLAST_POS);
                self.smelter.handle_inventory_close(&mut self.host, FURNACE_POS);
            }
            _ => {}
        }
    }

    /// An actor tries to place a stack in the input slot of a device.
    fn place(&mut self, actor: ActorId, pos: IVec3, stack: ItemStack) {
        let action = InventoryAction::Place(stack.clone());
        match self.smelter.handle_inventory_action(&mut self.host, actor, pos, &action) {
            Decision::Allow => {
                info!("{actor} places {} in {pos}", stack.material);
                self.host.set_input_stack(pos, stack);
            }
            Decision::Veto => info!("{actor} cannot place {} in {pos}", stack.material),
        }
    }

    fn command(&mut self, sender: Sender, line: &str) {
        info!("{sender:?} runs /itemsmelter {line}");
        let parts = line.split_whitespace().collect::<Vec<_>>();
        command::handle_command(CommandContext {
            parts: &parts,
            sender,
            smelter: &mut self.smelter,
            host: &mut self.host,
        });
    }

    /// The native furnace logic of the host.
    fn tick_furnace(&mut self, pos: IVec3) {

        let Some(furnace) = self.host.furnace(pos) else {
            return;
        };

        let kind = furnace.kind;
        let input = furnace.input_stack.clone();
        let recipe = self.host.recipe_for(&input.material)
            .filter(|recipe| recipe.device == kind && !input.is_empty())
            .cloned();

        if self.host.burn_time(pos) == 0 {

            let fuel = self.host.furnace(pos).map(|f| f.fuel_stack.clone()).unwrap_or_default();
            if recipe.is_none() || fuel.is_empty() {
                self.host.set_cook_time(pos, 0);
                return;
            }

            if self.smelter.handle_burn(&mut self.host, pos) == Decision::Veto {
                self.host.set_cook_time(pos, 0);
                return;
            }

            let Some(furnace) = self.host.furnace_mut(pos) else {
                return;
            };
            furnace.fuel_stack = fuel.clone().with_size(fuel.size - 1).to_non_empty().unwrap_or_default();
            furnace.burn_time = FUEL_TICKS;

        }

        self.host.set_burn_time(pos, self.host.burn_time(pos) - 1);

        let Some(recipe) = recipe else {
            self.host.set_cook_time(pos, 0);
            return;
        };

        let cook_time = self.host.cook_time(pos) + 1;
        if cook_time < recipe.cook_ticks {
            self.host.set_cook_time(pos, cook_time);
            return;
        }

        self.host.set_cook_time(pos, 0);
        self.echoes.push(pos);

        let now_ms = self.now_ms();
        let result = match self.smelter.handle_smelt(&mut self.host, pos, now_ms, false) {
            SmeltDecision::Allow => recipe.output.clone(),
            SmeltDecision::Replace(stack) => stack,
            SmeltDecision::Veto => {
                info!("smelting of {} vetoed at {pos}", input.material);
                self.ghosts.push((pos, input));
                return;
            }
        };

        info!("{pos} smelted {} into {} x{}", input.material, result.material, result.size);

        let Some(furnace) = self.host.furnace_mut(pos) else {
            return;
        };

        furnace.input_stack = input.clone().with_size(input.size - 1).to_non_empty().unwrap_or_default();
        if furnace.output_stack.is_empty() {
            furnace.output_stack = result;
        } else if furnace.output_stack.material == result.material {
            furnace.output_stack.size += result.size;
        } else {
            warn!("output slot of {pos} is full, result lost");
        }

    }

    /// Log and forget messages and cues recorded by the host.
    fn flush_host(&mut self) {
        for (to, text) in self.host.messages.drain(..) {
            info!("message to {to:?}: {text}");
        }
        for cue in self.host.cues.drain(..) {
            info!("{} hears {} at {}", cue.actor, cue.name, cue.pos);
        }
    }

}

fn material(name: &str) -> Material {
    Material::parse(name).unwrap_or(Material::AIR)
}
