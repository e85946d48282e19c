//! # EVO Controller Manager Binary
//!
//! Loads controllers from a TOML file, runs the update loop on a dedicated
//! thread and activates `autostart` controllers through a STRICT switch.
//!
//! # Usage
//!
//! ```bash
//! evo_controller_manager --config config/controller_manager.toml
//!
//! # Fixed number of cycles, JSON logs
//! evo_controller_manager -c config/controller_manager.toml --cycles 500 --json
//!
//! # Pinned, SCHED_FIFO (built with --features rt)
//! evo_controller_manager -c config/controller_manager.toml --cpu-core 2 --rt-priority 80
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::Ordering;

use clap::Parser;
use evo_common::config::LogLevel;
use evo_common::consts::DEFAULT_CONFIG_PATH;
use evo_common::controller::Strictness;
use evo_controller_manager::cycle::{CycleError, rt_setup};
use evo_controller_manager::{
    ControllerManager, ControllerSummary, CycleRunner, CycleStats, ManagerConfig, SwitchRequest,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// EVO Controller Manager - controller lifecycle and interface arbitration
#[derive(Parser, Debug)]
#[command(name = "evo_controller_manager")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Controller lifecycle and hardware interface arbitration")]
#[command(long_about = None)]
struct Args {
    /// Path to controller_manager.toml
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Stop after this many update cycles (runs until Ctrl+C otherwise)
    #[arg(long)]
    cycles: Option<u64>,

    /// Pin the update loop to this CPU core (rt feature)
    #[arg(long)]
    cpu_core: Option<usize>,

    /// SCHED_FIFO priority of the update loop (rt feature)
    #[arg(long)]
    rt_priority: Option<i32>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long)]
    json: bool,
}

type LoopResult = Result<(CycleStats, Vec<ControllerSummary>), CycleError>;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    if let Err(e) = run() {
        error!("controller manager failed: {}", e);
        std::process::exit(1);
    }
    Ok(())
}

fn run() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = ManagerConfig::from_file(&args.config);
    let log_level = config
        .as_ref()
        .map(|c| c.shared.log_level)
        .unwrap_or_default();
    setup_tracing(&args, log_level);
    let config = config?;

    info!(
        "EVO Controller Manager v{} starting ({})",
        env!("CARGO_PKG_VERSION"),
        config.shared.service_name
    );

    let hardware = config.build_hardware()?;
    let manager = Arc::new(ControllerManager::new(Arc::new(hardware)));
    info!("Available controller types: {:?}", manager.list_controller_types());

    for entry in &config.controllers {
        manager.load_controller(&entry.name, &entry.type_name, &entry.params())?;
        manager.configure_controller(&entry.name)?;
    }
    info!("{} controllers loaded and configured", config.controllers.len());

    let mut runner =
        CycleRunner::new(Arc::clone(&manager), config.period())?.with_max_cycles(args.cycles);

    let running = runner.running_flag();
    ctrlc::set_handler(move || {
        info!("Received shutdown signal");
        running.store(false, Ordering::SeqCst);
    })?;

    let loop_manager = Arc::clone(&manager);
    let (cpu_core, rt_priority) = (args.cpu_core, args.rt_priority);
    let handle = std::thread::Builder::new()
        .name("cm-update".to_string())
        .spawn(move || -> LoopResult {
            if let Err(e) = rt_setup(cpu_core, rt_priority) {
                loop_manager.shutdown_all();
                return Err(e);
            }
            let stats = runner.run().clone();
            let summaries = loop_manager.get_loaded_controllers();
            // Releases any caller still waiting on a queued request.
            loop_manager.shutdown_all();
            Ok((stats, summaries))
        })?;

    let autostart = config.autostart();
    if !autostart.is_empty() {
        let request = SwitchRequest::new(autostart, Vec::<String>::new(), Strictness::Strict)
            .with_timeout(config.switch_timeout());
        match manager.switch_controller(request) {
            Ok(()) => info!("Autostart controllers active"),
            Err(e) => warn!("Autostart switch failed: {e}"),
        }
    }

    let (stats, summaries) = handle
        .join()
        .map_err(|_| "update loop thread panicked")??;

    info!(
        "Update loop finished: {} cycles, avg {} ns, max {} ns, {} overruns, {} errors",
        stats.cycle_count,
        stats.avg_cycle_ns(),
        stats.max_cycle_ns,
        stats.overruns,
        stats.errors
    );
    println!("{}", serde_json::to_string_pretty(&summaries)?);

    info!("EVO Controller Manager shutdown complete");
    Ok(())
}

/// Setup tracing subscriber based on CLI arguments and the configured level.
fn setup_tracing(args: &Args, level: LogLevel) {
    let directive = if args.verbose {
        LogLevel::Debug.as_directive()
    } else {
        level.as_directive()
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive));

    if args.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
