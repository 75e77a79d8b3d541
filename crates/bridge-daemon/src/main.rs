//! Bridge daemon entry point.
//!
//! Runs a bridge against a tick thread and the simulated sensor host, with
//! a logging interpreter in place of the Forth VM.

mod console;
mod signals;
mod ticker;

use anyhow::{Context, Result};
use bridge_common::{BridgeConfig, IsrRegistration, SensorEnable, SensorType, WordId};
use bridge_core::{describe_sensors, Bridge, BridgeBuilder, SensorHost, SimulatedSensorHost};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{error, info, warn};

use crate::console::ConsoleInterpreter;
use crate::signals::SignalHandler;
use crate::ticker::Ticker;

/// Bridge daemon command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "bridge-daemon",
    about = "Forth event bridge daemon - periodic interrupts and sensor samples for an interpreter",
    version,
    long_about = None
)]
struct Args {
    /// Path to a bridge configuration file (TOML).
    #[arg(long, short = 'c', value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum interpreter cycles to run (0 = infinite).
    #[arg(long, default_value = "0")]
    cycles: u64,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, short = 'l', default_value = "info")]
    log_level: String,

    /// Register an interrupt word, e.g. `7:350ms`. Repeatable.
    #[arg(long = "interrupt", short = 'i', value_name = "WORD:PERIOD", value_parser = parse_interrupt)]
    interrupts: Vec<IsrRegistration>,

    /// Enable a sensor, e.g. `accelerometer:50ms`. Repeatable.
    #[arg(long = "sensor", short = 's', value_name = "NAME[:RATE]", value_parser = parse_sensor)]
    sensors: Vec<SensorEnable>,

    /// Print the sensor catalogue and exit.
    #[arg(long)]
    list_sensors: bool,
}

/// Malformed `--interrupt` or `--sensor` argument.
#[derive(Debug, thiserror::Error)]
enum ArgError {
    #[error("expected WORD:PERIOD, got '{0}'")]
    MissingPeriod(String),
    #[error("invalid word id '{0}'")]
    Word(String),
    #[error("invalid period '{value}': {source}")]
    Period {
        value: String,
        #[source]
        source: humantime::DurationError,
    },
    #[error(transparent)]
    Sensor(#[from] bridge_common::BridgeError),
}

fn parse_period(value: &str) -> Result<Duration, ArgError> {
    humantime::parse_duration(value).map_err(|source| ArgError::Period {
        value: value.to_string(),
        source,
    })
}

fn parse_interrupt(s: &str) -> Result<IsrRegistration, ArgError> {
    let (word, period) = s
        .split_once(':')
        .ok_or_else(|| ArgError::MissingPeriod(s.to_string()))?;
    let word = word
        .trim()
        .parse::<u32>()
        .map_err(|_| ArgError::Word(word.to_string()))?;
    Ok(IsrRegistration {
        word: WordId(word),
        period: parse_period(period.trim())?,
    })
}

fn parse_sensor(s: &str) -> Result<SensorEnable, ArgError> {
    let (name, rate) = match s.split_once(':') {
        Some((name, rate)) => (name, Some(parse_period(rate.trim())?)),
        None => (s, None),
    };
    Ok(SensorEnable {
        sensor: name.parse::<SensorType>()?,
        rate,
    })
}

fn main() -> Result<()> {
    let args = Args::parse();

    init_logging(&args.log_level);

    let host = SimulatedSensorHost::new();
    if args.list_sensors {
        print!("{}", describe_sensors(&host.sensors()));
        return Ok(());
    }

    info!(version = env!("CARGO_PKG_VERSION"), "Starting bridge daemon");

    let mut config = load_config(&args)?;
    config.interrupts.register.extend(args.interrupts.iter().cloned());
    config.sensors.enable.extend(args.sensors.iter().cloned());
    config.validate().context("Invalid configuration")?;

    info!(
        base_period_ms = config.interrupts.base_period.as_millis(),
        cycle_period_ms = config.interpreter.cycle_period.as_millis(),
        interrupts = config.interrupts.register.len(),
        sensors = config.sensors.enable.len(),
        "Configuration loaded"
    );

    let signal_handler = SignalHandler::new().context("Failed to set up signal handlers")?;

    let bridge = BridgeBuilder::new(ConsoleInterpreter::new(), host)
        .config(config)
        .build()
        .context("Failed to create bridge")?;

    run_daemon(bridge, &signal_handler, args.cycles)
}

/// Initialize logging with the specified log level.
fn init_logging(level: &str) {
    let filter = format!("bridge_daemon={level},bridge_core={level},bridge_common={level}");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&filter)),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();
}

/// Load configuration from file or use defaults.
///
/// Resolution priority (first existing file wins):
/// 1. Command-line `--config` argument
/// 2. `BRIDGE_CONFIG_PATH` environment variable
/// 3. `config/bridge.toml` (local development)
/// 4. Built-in defaults
fn load_config(args: &Args) -> Result<BridgeConfig> {
    if let Some(config_path) = &args.config {
        info!(?config_path, "Loading config from command-line argument");
        return BridgeConfig::from_file(config_path)
            .with_context(|| format!("Failed to load config from {config_path:?}"));
    }

    if let Ok(env_path) = std::env::var("BRIDGE_CONFIG_PATH") {
        let config_path = PathBuf::from(&env_path);
        if config_path.exists() {
            info!(?config_path, "Loading config from BRIDGE_CONFIG_PATH");
            return BridgeConfig::from_file(&config_path).with_context(|| {
                format!("Failed to load config from BRIDGE_CONFIG_PATH={env_path:?}")
            });
        }
        warn!(
            path = %env_path,
            "BRIDGE_CONFIG_PATH set but file does not exist, checking other locations"
        );
    }

    let local_path = PathBuf::from("config/bridge.toml");
    if local_path.exists() {
        info!(?local_path, "Loading config from local path");
        return BridgeConfig::from_file(&local_path)
            .with_context(|| format!("Failed to load config from {local_path:?}"));
    }

    info!("No config file found, using built-in defaults");
    Ok(BridgeConfig::default())
}

/// Main daemon run loop.
fn run_daemon(
    mut bridge: Bridge<ConsoleInterpreter, SimulatedSensorHost>,
    signal_handler: &SignalHandler,
    max_cycles: u64,
) -> Result<()> {
    bridge.init().context("Failed to initialize bridge")?;

    let base_period = bridge.config().interrupts.base_period;
    let mut ticker =
        Ticker::start(bridge.tick_handle(), base_period).context("Failed to start tick source")?;

    info!(state = %bridge.state(), "Bridge running, entering main loop");

    while !signal_handler.shutdown_requested() {
        let cycles_run = match bridge.run_cycle() {
            Ok(report) => report.cycle,
            Err(e) => {
                error!("Cycle execution failed: {e}");
                signal_handler.request_shutdown();
                break;
            }
        };

        if max_cycles > 0 && cycles_run >= max_cycles {
            info!(cycles = cycles_run, "Maximum cycle count reached");
            break;
        }

        if cycles_run % 1000 == 0 {
            let stats = bridge.stats();
            info!(
                cycles = cycles_run,
                ticks = stats.ticks,
                fired = stats.interrupts_fired,
                samples = stats.samples_drained,
                dropped = stats.samples_dropped,
                "Periodic status"
            );
        }

        bridge.wait_next_cycle();
    }

    info!("Shutting down...");

    ticker.stop();
    if let Err(e) = bridge.teardown() {
        warn!("Bridge teardown failed: {e}");
    }

    let stats = bridge.stats();
    let console = bridge.interpreter();
    info!(
        total_cycles = stats.cycles,
        fired = console.fired(),
        samples = console.samples(),
        latest = ?console.latest(),
        signals = signal_handler.state().signal_count(),
        last_signal = ?signal_handler.state().last_signal(),
        final_state = %bridge.state(),
        "Daemon shutdown complete"
    );
    println!(
        "{}",
        serde_json::to_string_pretty(&stats).context("Failed to serialize statistics")?
    );

    Ok(())
}
