use serde::{Deserialize, Serialize};

/// One instantaneous sensor pair handed to the core by the sample source.
///
/// Both values are already in physical units; raw ADC counts and their
/// scaling never reach this crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    /// Cuff pressure (DC component) in mmHg.
    pub pressure: f64,
    /// Oscillometric (AC) component in mmHg-equivalent units.
    pub oscillometric: f64,
}

impl Sample {
    pub fn new(pressure: f64, oscillometric: f64) -> Self {
        Self {
            pressure,
            oscillometric,
        }
    }
}

/// Aggregate of one completed one-second window.
///
/// Created once per window by [`crate::window::WindowAccumulator`] and owned by
/// [`crate::store::ReadingStore`] for the rest of the cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Peak-to-peak range of the oscillometric signal within the window.
    pub amplitude: f64,
    /// Midpoint of the cuff pressures observed at the window's maximum and
    /// minimum oscillometric samples, in mmHg.
    pub pressure: f64,
}

/// Where a measurement cycle currently is.
///
/// Each timed phase carries the anchor it measures elapsed time from, so the
/// transition function in [`crate::acquisition`] needs no side state.
///
/// | Phase | Leaves when | Samples |
/// |---|---|---|
/// | `WaitingForSignal` | threshold signal is true | no |
/// | `SettlingDelay` | `SETTLING_DELAY_MS` elapsed | no |
/// | `Sampling` | all readings collected | every `SAMPLE_INTERVAL_MS` |
/// | `Done` | never (terminal) | no |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AcquisitionPhase {
    /// Waiting for the external "pressure threshold reached" signal.
    #[default]
    WaitingForSignal,
    /// Cuff pressure is stabilising; nothing is recorded.
    SettlingDelay {
        /// Timestamp (ms) at which the delay started.
        entered_ms: u64,
    },
    /// Samples are taken at the fixed interval.
    Sampling {
        /// Timestamp (ms) of the previous sample, or of entering the phase.
        last_sample_ms: u64,
    },
    /// All readings are collected and the envelope has been analysed.
    Done,
}

impl AcquisitionPhase {
    /// Short label used in logs and the TUI header.
    pub fn label(&self) -> &'static str {
        match self {
            AcquisitionPhase::WaitingForSignal => "waiting for pressure",
            AcquisitionPhase::SettlingDelay { .. } => "settling",
            AcquisitionPhase::Sampling { .. } => "sampling",
            AcquisitionPhase::Done => "done",
        }
    }
}

/// Final result of one measurement cycle.
///
/// Produced exactly once by [`crate::envelope::analyze`] when the session
/// enters [`AcquisitionPhase::Done`].  Pressures are in mmHg.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BloodPressure {
    /// All readings in chronological order; one per second of deflation.
    pub readings: Vec<Reading>,
    /// Largest amplitude seen at an index greater than 0.
    pub max_amplitude: f64,
    /// Index of [`Self::max_amplitude`] in [`Self::readings`].
    pub max_amplitude_index: usize,
    /// `SYSTOLIC_RATIO × max_amplitude`.
    pub systolic_threshold: f64,
    /// `DIASTOLIC_RATIO × max_amplitude`.
    pub diastolic_threshold: f64,
    /// Index of the reading chosen for the systolic estimate (≤ max index).
    pub systolic_index: usize,
    /// Index of the reading chosen for the diastolic estimate (≥ max index).
    pub diastolic_index: usize,
    /// Systolic blood pressure (SBP).
    pub systolic: f64,
    /// Diastolic blood pressure (DBP).
    pub diastolic: f64,
    /// Mean arterial pressure (MAP): cuff pressure at maximum oscillation.
    pub mean_arterial: f64,
    /// Heart rate in beats per minute, `None` when the peak timing is incomplete.
    pub heart_rate_bpm: Option<f64>,
}

/// Everything a running measurement reports to its consumer.
///
/// Delivered through the `mpsc::Receiver` returned by
/// [`crate::monitor::Monitor::start`] and also returned directly by
/// [`crate::acquisition::MeasurementSession::poll`].
#[derive(Debug, Clone)]
pub enum MeasurementEvent {
    /// The acquisition state machine entered a new phase.
    PhaseChanged(AcquisitionPhase),
    /// A sample was fed to the peak detector and the window aggregator.
    Sample {
        timestamp_ms: u64,
        sample: Sample,
    },
    /// The peak detector counted a new oscillation peak.
    Peak {
        /// 1-based running peak count.
        count: u32,
        timestamp_ms: u64,
    },
    /// A one-second window completed and was appended to the store.
    Reading { index: usize, reading: Reading },
    /// The cycle finished; sent once, right after `PhaseChanged(Done)`.
    Completed(BloodPressure),
}
