//! Fixed calibration constants for one oscillometric measurement cycle.
//!
//! None of these are runtime-configurable.  The envelope thresholds and the
//! heart-rate peak indices are empirical calibration values, not parameters
//! that can be derived from the signal.

// ── Sampling constants ────────────────────────────────────────────────────────

/// Sample rate of the (pressure, oscillometric) pair in Hz.
pub const SAMPLE_RATE_HZ: u64 = 30;

/// Minimum wall-clock gap between two samples in milliseconds.
///
/// Integer division: 1000 / 30 = 33 ms, so the effective rate is ≈ 30.3 Hz
/// when the poll loop is fast enough.
pub const SAMPLE_INTERVAL_MS: u64 = 1000 / SAMPLE_RATE_HZ;

/// Samples aggregated into one [`crate::types::Reading`] (≈ 1 s of signal).
pub const WINDOW_SIZE: usize = 30;

/// Number of readings collected before the envelope is analysed.
///
/// At one reading per second this is the length of the deflation sweep.
pub const TOTAL_SECONDS: usize = 30;

/// Delay between the threshold signal and the first sample, in milliseconds.
///
/// Lets the cuff pressure stabilise after the pump stops.
pub const SETTLING_DELAY_MS: u64 = 1000;

// ── Envelope thresholds ───────────────────────────────────────────────────────

/// Fraction of the maximum amplitude that marks the systolic edge.
///
/// Searched backward (towards higher cuff pressure) from the maximum.
pub const SYSTOLIC_RATIO: f64 = 0.55;

/// Fraction of the maximum amplitude that marks the diastolic edge.
///
/// Searched forward (towards lower cuff pressure) from the maximum.
pub const DIASTOLIC_RATIO: f64 = 0.75;

// ── Heart rate ────────────────────────────────────────────────────────────────

/// Peak number whose timestamp opens the heart-rate interval.
///
/// The first peaks after the settling delay are unstable; peak 15 is treated
/// as steady state.
pub const HR_FIRST_PEAK: u32 = 15;

/// Peak number whose timestamp closes the heart-rate interval.
pub const HR_SECOND_PEAK: u32 = 16;
