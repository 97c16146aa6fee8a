//! Trafficmeter simulation - scripted walk-throughs, no hardware
//!
//! Feeds the resolver choreographed sensor tapes covering a clean entry, a
//! clean exit and a hotzone loiterer, then prints the resulting counts and
//! the CSV rows that were written. Useful for eyeballing resolver behavior
//! and log output on a dev machine.
//!
//! Usage:
//!   cargo run --bin trafficmeter-sim

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use trafficmeter::domain::{SensorId, TdtWindow};
use trafficmeter::infra::Metrics;
use trafficmeter::io::{CsvTrafficLog, ScriptedRange};
use trafficmeter::services::{DirectionResolver, TrafficMonitor};

const IDLE_MM: u16 = 8000;

#[derive(Parser, Debug)]
#[command(name = "trafficmeter-sim")]
#[command(about = "Run the resolver against scripted walk-throughs")]
struct Args {
    /// Directory for the simulated daily CSV log
    #[arg(long, default_value = "sim-logs")]
    logs_dir: String,

    /// Poll interval in milliseconds
    #[arg(long, default_value_t = 5)]
    poll_ms: u64,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();

    let args = Args::parse();

    // TDT [100, 200] as if calibrated against a narrow doorway
    let tdt = TdtWindow::new(100, 200);

    // Tick-by-tick tapes. A person entering trips the entry sensor first,
    // then the exit sensor; the loiterer trips only the entry sensor and
    // wanders off; the person leaving trips them in reverse order.
    let entry_tape = [
        IDLE_MM, // settle
        150, 150, IDLE_MM, // entry pass: near sensor first
        IDLE_MM, IDLE_MM, IDLE_MM, IDLE_MM, IDLE_MM, // reset gap
        160, IDLE_MM, IDLE_MM, // loiterer: arms a candidate, never confirmed
        IDLE_MM, IDLE_MM, IDLE_MM, IDLE_MM, IDLE_MM, IDLE_MM, // timeout drains
        IDLE_MM, 170, IDLE_MM, // exit pass: far sensor fired last tick
    ];
    let exit_tape = [
        IDLE_MM, //
        IDLE_MM, 160, IDLE_MM, // entry pass confirmation
        IDLE_MM, IDLE_MM, IDLE_MM, IDLE_MM, IDLE_MM, //
        IDLE_MM, IDLE_MM, IDLE_MM, // loiterer never reaches the far sensor
        IDLE_MM, IDLE_MM, IDLE_MM, IDLE_MM, IDLE_MM, IDLE_MM, //
        180, IDLE_MM, IDLE_MM, // exit pass: far sensor first
    ];

    let entry = ScriptedRange::new(SensorId::Entry).with_readings(&entry_tape).with_idle(IDLE_MM);
    let exit = ScriptedRange::new(SensorId::Exit).with_readings(&exit_tape).with_idle(IDLE_MM);

    let poll = Duration::from_millis(args.poll_ms);
    let resolver = DirectionResolver::new(tdt, poll * 6, poll * 2);
    let sink = CsvTrafficLog::new(&args.logs_dir, "{date}_foot_traffic.csv");
    let metrics = Arc::new(Metrics::new());
    let monitor =
        TrafficMonitor::new(resolver, Box::new(entry), Box::new(exit), sink, poll, metrics.clone());

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let tape_len = entry_tape.len() as u32;
    tokio::spawn(async move {
        // Let the tapes drain plus slack for the timeout path
        tokio::time::sleep(poll * (tape_len + 20)).await;
        let _ = shutdown_tx.send(true);
    });

    let counts = monitor.run(shutdown_rx).await?;
    metrics.report();

    info!(
        entries = counts.entries,
        exits = counts.exits,
        logs_dir = %args.logs_dir,
        "simulation finished (expected: 1 entry, 1 exit, loiterer uncounted)"
    );
    Ok(())
}
