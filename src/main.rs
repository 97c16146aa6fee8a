//! Trafficmeter - doorway foot traffic counter
//!
//! Two VL53L0X time-of-flight sensors mounted side by side watch across the
//! entry pathway; this binary resolves their readings into directioned
//! entry/exit events and appends them to a daily CSV log.
//!
//! Module structure:
//! - `domain/` - Core types (TdtWindow, TrafficEvent, error taxonomy)
//! - `io/` - External interfaces (sensors, daily CSV log)
//! - `services/` - Business logic (CalibrationEngine, DirectionResolver)
//! - `infra/` - Infrastructure (Config, Metrics)

use clap::Parser;
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

use trafficmeter::infra::{Config, Metrics};
use trafficmeter::io::{CsvTrafficLog, RangeSource};
use trafficmeter::services::{CalibrationEngine, DirectionResolver, PromptGate, TrafficMonitor};

/// Trafficmeter - two-sensor doorway entry/exit counter
#[derive(Parser, Debug)]
#[command(name = "trafficmeter", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "config/default.toml")]
    config: String,

    /// Run the guided calibration procedures before counting
    #[arg(long)]
    calibrate: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Structured logging; level via RUST_LOG, default INFO
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false)
        .init();

    info!("trafficmeter starting");

    let args = Args::parse();
    let config = Config::load_from_path(&args.config);

    info!(
        config_file = %config.config_file(),
        site = %config.site_id(),
        i2c_bus = %config.i2c_bus(),
        entry_address = %format_args!("0x{:02x}", config.entry_sensor_address()),
        exit_address = %format_args!("0x{:02x}", config.exit_sensor_address()),
        poll_interval_ms = %config.poll_interval().as_millis(),
        event_timeout_ms = %config.event_timeout().as_millis(),
        reset_time_ms = %config.reset_time().as_millis(),
        min_tdt_mm = config.tdt_window().min_mm,
        max_tdt_mm = config.tdt_window().max_mm,
        "config_loaded"
    );

    let (entry, exit) = open_sensors(&config)?;

    // Handle shutdown on Ctrl+C
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown_signal_received");
        let _ = shutdown_tx.send(true);
    });

    run(config, &args, entry, exit, shutdown_rx).await
}

async fn run(
    config: Config,
    args: &Args,
    mut entry: Box<dyn RangeSource>,
    mut exit: Box<dyn RangeSource>,
    shutdown_rx: watch::Receiver<bool>,
) -> anyhow::Result<()> {
    // Optional guided calibration; accepted results are written back to the
    // config file, interrupted ones fall back to the persisted values
    let tdt = if args.calibrate {
        let engine = CalibrationEngine::new();
        let mut gate = PromptGate;
        let mut cal_shutdown = shutdown_rx.clone();

        let tdt_result = engine
            .calibrate_tdt(&mut *entry, &mut *exit, &mut gate, &mut cal_shutdown)
            .await;
        let baseline_result = engine
            .calibrate_baselines(&mut *entry, &mut *exit, &mut gate, &mut cal_shutdown)
            .await;

        if tdt_result.interrupted || baseline_result.interrupted {
            warn!("calibration_interrupted_keeping_previous_values");
            config.tdt_window()
        } else {
            Config::persist_calibration(
                args.config.as_str(),
                tdt_result.window,
                baseline_result.baseline,
            )?;
            info!(
                min_tdt_mm = tdt_result.window.min_mm,
                max_tdt_mm = tdt_result.window.max_mm,
                entry_baseline_mm = baseline_result.baseline.entry_mm,
                exit_baseline_mm = baseline_result.baseline.exit_mm,
                "calibration_persisted"
            );
            tdt_result.window
        }
    } else {
        config.tdt_window()
    };

    if tdt.min_mm == tdt.max_mm {
        warn!(
            min_tdt_mm = tdt.min_mm,
            "tdt_window_degenerate - run with --calibrate to set a real window"
        );
    }

    let metrics = Arc::new(Metrics::new());

    // Periodic metrics summary
    let report_metrics = metrics.clone();
    let report_interval = config.metrics_interval_secs();
    tokio::spawn(async move {
        let mut interval =
            tokio::time::interval(std::time::Duration::from_secs(report_interval));
        loop {
            interval.tick().await;
            report_metrics.report();
        }
    });

    let sink = CsvTrafficLog::new(config.logs_dir(), config.file_name_format());
    let resolver = DirectionResolver::new(tdt, config.event_timeout(), config.reset_time());
    let monitor =
        TrafficMonitor::new(resolver, entry, exit, sink, config.poll_interval(), metrics);

    let counts = monitor.run(shutdown_rx).await?;
    info!(entries = counts.entries, exits = counts.exits, "trafficmeter shutdown complete");
    Ok(())
}

#[cfg(feature = "hardware")]
fn open_sensors(config: &Config) -> anyhow::Result<(Box<dyn RangeSource>, Box<dyn RangeSource>)> {
    use trafficmeter::domain::SensorId;
    use trafficmeter::io::Vl53l0xRange;

    let entry =
        Vl53l0xRange::open(SensorId::Entry, config.i2c_bus(), config.entry_sensor_address())?;
    let exit =
        Vl53l0xRange::open(SensorId::Exit, config.i2c_bus(), config.exit_sensor_address())?;
    Ok((Box::new(entry), Box::new(exit)))
}

#[cfg(not(feature = "hardware"))]
fn open_sensors(_config: &Config) -> anyhow::Result<(Box<dyn RangeSource>, Box<dyn RangeSource>)> {
    anyhow::bail!(
        "built without the `hardware` feature; rebuild with --features hardware \
         or use the trafficmeter-sim binary"
    )
}
