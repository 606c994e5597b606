use crate::cli::parser::Commands;
use crate::config::Config;
use crate::core::{ParkingService, SlotStateTable};
use crate::db::RecordStore;
use crate::errors::{AppError, AppResult};
use crate::hw::{self, GpioLines, create_lines};
use crate::net::CommandServer;
use crate::sensor::evaluator::{OccupancyEvaluator, VehicleLookup};
use crate::sensor::sampler::EchoSampler;
use crate::sensor::scheduler::SensorLoop;
use chrono::Utc;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Handle the `serve` command: run until Ctrl-C.
pub fn handle(cmd: &Commands, cfg: &Config) -> AppResult<()> {
    let Commands::Serve { simulate } = cmd else {
        return Ok(());
    };

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&cfg.log_level))
        .init();

    log::info!("parkmon v{} starting...", env!("CARGO_PKG_VERSION"));
    log::info!("Database: {}", cfg.database);

    let running = Arc::new(AtomicBool::new(true));
    let r = Arc::clone(&running);
    ctrlc::set_handler(move || {
        log::info!("Received shutdown signal");
        r.store(false, Ordering::Relaxed);
    })
    .map_err(|e| AppError::Config(format!("Error setting Ctrl-C handler: {}", e)))?;

    run_daemon(cfg, *simulate, running)
}

/// Start the sensor loop and the command server, block until `running` clears.
pub fn run_daemon(cfg: &Config, simulate: bool, running: Arc<AtomicBool>) -> AppResult<()> {
    let store = Arc::new(RecordStore::open(&cfg.database)?);
    let lines = create_lines(cfg, simulate)?;
    run_with_lines(cfg, store, lines, running)
}

/// Drive `lines` until shutdown. The lines are released on every exit path.
fn run_with_lines(
    cfg: &Config,
    store: Arc<RecordStore>,
    lines: Arc<dyn GpioLines>,
    running: Arc<AtomicBool>,
) -> AppResult<()> {
    let result = drive(cfg, store, Arc::clone(&lines), running);
    if let Err(e) = &result {
        log::error!("Daemon stopped: {}", e);
    }

    log::info!("Shutting down...");
    hw::release_slots(lines.as_ref(), &cfg.slots);
    log::info!("parkmon stopped");
    result
}

fn drive(
    cfg: &Config,
    store: Arc<RecordStore>,
    lines: Arc<dyn GpioLines>,
    running: Arc<AtomicBool>,
) -> AppResult<()> {
    let table = Arc::new(SlotStateTable::new(
        cfg.slots.iter().map(|s| s.id),
        Utc::now(),
    ));
    log::info!("{} slots configured", table.len());

    hw::setup_slots(lines.as_ref(), &cfg.slots)?;

    let sampler = EchoSampler::new(Arc::clone(&lines), cfg.echo_timing());
    let lookup: Arc<dyn VehicleLookup> = store.clone();
    let sensor_loop = SensorLoop::new(
        cfg.slots.clone(),
        sampler,
        Arc::clone(&lines),
        OccupancyEvaluator::new(cfg.threshold_cm),
        Arc::clone(&table),
        lookup,
        cfg.sweep_interval(),
        Arc::clone(&running),
    );

    let service = Arc::new(ParkingService::new(
        Arc::clone(&table),
        Arc::clone(&store),
        cfg.history_limit,
    ));
    let server = CommandServer::bind(&cfg.listen, service, Arc::clone(&running))?;

    let loop_handle = sensor_loop.spawn()?;
    log::info!("parkmon running. Press Ctrl-C to stop.");

    // the accept loop runs on this thread
    server.run();

    running.store(false, Ordering::Relaxed);
    if loop_handle.join().is_err() {
        log::error!("Sensor loop panicked");
    }
    Ok(())
}
