//! # oscillo-bp
//!
//! Oscillometric blood-pressure estimation from a cuff-pressure (DC) signal
//! and an oscillation (AC) signal recorded during controlled cuff deflation.
//!
//! ## How a measurement works
//!
//! | Step | Module | What happens |
//! |---|---|---|
//! | 1 | [`acquisition`] | wait for the pump's "threshold reached" signal, then a 1 s settling delay |
//! | 2 | [`acquisition`] | sample (pressure, oscillation) every 33 ms |
//! | 3 | [`peak`] | count oscillation peaks; time stamp peaks 15 and 16 |
//! | 4 | [`window`] | fold every 30 samples into one [`types::Reading`] (amplitude, pressure) |
//! | 5 | [`store`] | keep 30 readings and the running maximum amplitude |
//! | 6 | [`envelope`] | MAP at the maximum, SBP at 55 % before it, DBP at 75 % after it, HR from the peak spacing |
//!
//! Sensor scaling, pump and valve control and the start button live outside
//! this crate; the core only sees a [`acquisition::SampleSource`] and a
//! [`acquisition::ThresholdSignal`].  [`simulator::SimulatedCuff`] provides
//! both for demos and tests.
//!
//! ## Quick start
//!
//! ```no_run
//! use oscillo_bp::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let cuff = SimulatedCuff::new(CuffProfile::default())?;
//!     let (mut rx, _handle) = Monitor::new(MonitorConfig::default()).start(cuff);
//!
//!     while let Some(event) = rx.recv().await {
//!         if let MeasurementEvent::Completed(bp) = event {
//!             println!("{:.0}/{:.0} mmHg", bp.systolic, bp.diastolic);
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Driving a session by hand
//!
//! [`acquisition::MeasurementSession`] does not read a clock and never
//! blocks, so it can be embedded in any polling loop:
//!
//! ```
//! use oscillo_bp::prelude::*;
//!
//! let mut cuff = SimulatedCuff::new(CuffProfile::default()).unwrap();
//! let mut session = MeasurementSession::new();
//! let mut now_ms = 0;
//! while !session.is_done() {
//!     session.poll_cuff(now_ms, &mut cuff);
//!     now_ms += 1;
//! }
//! let bp = session.result().unwrap();
//! assert!(bp.systolic > bp.diastolic);
//! ```
//!
//! ## Module overview
//!
//! | Module | Purpose |
//! |---|---|
//! | [`prelude`] | One-line glob import of the most commonly needed types |
//! | [`constants`] | Sample rate, window sizes, settling delay, envelope ratios, HR peak indices |
//! | [`types`] | Samples, readings, phases, the final result and the event enum |
//! | [`acquisition`] | State machine, collaborator traits and the per-cycle session |
//! | [`peak`] | Slope-based peak counter |
//! | [`window`] | Per-second min/max aggregation |
//! | [`store`] | Fixed-size reading store with the running maximum |
//! | [`envelope`] | SBP / DBP / MAP / HR search |
//! | [`monitor`] | tokio driver that streams [`types::MeasurementEvent`]s |
//! | [`simulator`] | Deterministic cuff model |
//! | [`report`] | Plain-text result rendering |

pub mod acquisition;
pub mod constants;
pub mod envelope;
pub mod monitor;
pub mod peak;
pub mod report;
pub mod simulator;
pub mod store;
pub mod types;
pub mod window;

// ── Prelude ───────────────────────────────────────────────────────────────────

/// Convenience re-exports for downstream crates.
pub mod prelude {
    // ── Acquisition ───────────────────────────────────────────────────────────
    pub use crate::acquisition::{MeasurementSession, SampleSource, ThresholdSignal};
    pub use crate::monitor::{Monitor, MonitorConfig, MonitorHandle};
    pub use crate::simulator::{CuffProfile, SimulatedCuff};

    // ── Events and data types ─────────────────────────────────────────────────
    pub use crate::types::{AcquisitionPhase, BloodPressure, MeasurementEvent, Reading, Sample};

    // ── Constants ─────────────────────────────────────────────────────────────
    pub use crate::constants::{
        SAMPLE_INTERVAL_MS, SAMPLE_RATE_HZ, SETTLING_DELAY_MS, TOTAL_SECONDS, WINDOW_SIZE,
    };
}
