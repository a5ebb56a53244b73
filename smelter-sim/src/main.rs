//! A headless furnace simulation running the smelter engine against an in-memory host.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use smelter::engine::SmelterPaths;
use smelter::Smelter;

mod config;
mod sim;

use sim::Simulation;


pub fn main() {

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let running = Arc::new(AtomicBool::new(true));
    let running0 = Arc::clone(&running);
    if let Err(e) = ctrlc::set_handler(move || running0.store(false, Ordering::Relaxed)) {
        warn!("failed to install interrupt handler: {e}");
    }

    let smelter = match Smelter::load(SmelterPaths {
        config: config::config_path().to_path_buf(),
        locales: config::locales_path().to_path_buf(),
        settings: config::settings_path().to_path_buf(),
    }) {
        Ok(smelter) => smelter,
        Err(e) => {
            error!("failed to load smelter: {e}");
            std::process::exit(1);
        }
    };

    info!("loaded {} smeltable items", smelter.registry().len());

    let mut sim = Simulation::new(smelter);
    while running.load(Ordering::Relaxed) && !sim.is_finished() {
        sim.tick_padded();
    }

    info!("stopping simulation");
    sim.cleanup();

}
