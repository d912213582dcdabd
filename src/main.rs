use anyhow::{anyhow, Context, Result};
use clap::Parser;
use log::{debug, info, warn};

use oscillo_bp::monitor::{Monitor, MonitorConfig};
use oscillo_bp::report;
use oscillo_bp::simulator::{CuffProfile, SimulatedCuff};
use oscillo_bp::types::{AcquisitionPhase, MeasurementEvent};

/// Runs one simulated oscillometric measurement and prints the result.
#[derive(Parser, Debug, Clone)]
#[command(name = "oscillo-bp")]
#[command(version)]
struct Cli {
    /// Systolic pressure of the simulated patient in mmHg (default 120)
    #[arg(long, value_name = "MMHG")]
    sbp: Option<f64>,

    /// Diastolic pressure of the simulated patient in mmHg (default 80)
    #[arg(long, value_name = "MMHG")]
    dbp: Option<f64>,

    /// Pulse rate of the simulated patient (default 72)
    #[arg(long, value_name = "BPM")]
    hr: Option<f64>,

    /// Print the result as JSON instead of a table
    #[arg(long)]
    json: bool,
}

impl Cli {
    /// The default patient with any flags applied on top.
    fn profile(&self) -> CuffProfile {
        let mut profile = CuffProfile::default();
        if let Some(sbp) = self.sbp {
            profile.systolic = sbp;
        }
        if let Some(dbp) = self.dbp {
            profile.diastolic = dbp;
        }
        if let Some(hr) = self.hr {
            profile.heart_rate_bpm = hr;
        }
        profile
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // ── Logging ───────────────────────────────────────────────────────────────
    // Set RUST_LOG=debug for phase changes and per-window readings, e.g.:
    //   RUST_LOG=oscillo_bp=debug cargo run
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    // ── Configuration ─────────────────────────────────────────────────────────
    let cli = Cli::parse();
    let profile = cli.profile();
    let cuff = SimulatedCuff::new(profile.clone()).context("invalid patient profile")?;
    info!(
        "Simulated patient: {:.0}/{:.0} mmHg, {:.0} BPM (expected MAP {:.1} mmHg)",
        profile.systolic,
        profile.diastolic,
        profile.heart_rate_bpm,
        profile.mean_arterial()
    );

    // ── Start the measurement ─────────────────────────────────────────────────
    let (mut rx, handle) = Monitor::new(MonitorConfig::default()).start(cuff);

    // Ctrl-C aborts the cycle; the channel then closes without a result.
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupted; stopping measurement.");
            handle.stop();
        }
    });

    // ── Main event loop ───────────────────────────────────────────────────────
    let mut result = None;
    while let Some(event) = rx.recv().await {
        match event {
            MeasurementEvent::PhaseChanged(phase) => match phase {
                AcquisitionPhase::WaitingForSignal => {}
                AcquisitionPhase::SettlingDelay { entered_ms } => {
                    info!("Threshold reached at {entered_ms} ms; settling …")
                }
                AcquisitionPhase::Sampling { last_sample_ms } => {
                    info!("Sampling started at {last_sample_ms} ms")
                }
                AcquisitionPhase::Done => info!("All readings collected."),
            },
            MeasurementEvent::Reading { index, reading } => {
                info!(
                    "[{index:2}] amplitude={:6.3}  pressure={:6.1} mmHg",
                    reading.amplitude, reading.pressure
                );
            }
            MeasurementEvent::Peak { count, timestamp_ms } => {
                debug!("peak #{count} at {timestamp_ms} ms");
            }
            MeasurementEvent::Sample { .. } => {}
            MeasurementEvent::Completed(bp) => {
                result = Some(bp);
            }
        }
    }

    // ── Report ────────────────────────────────────────────────────────────────
    let bp = result.ok_or_else(|| anyhow!("measurement ended without a result"))?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&bp)?);
    } else {
        println!();
        print!("{}", report::render(&bp));
    }
    Ok(())
}
