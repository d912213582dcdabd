//! Slope-based oscillation peak counter used for heart-rate timing.
//!
//! The detector tracks whether the oscillometric signal is rising or falling.
//! A rising-to-falling turn is one peak.  Only the timestamps of peaks
//! [`HR_FIRST_PEAK`] and [`HR_SECOND_PEAK`] are kept; their spacing is one
//! steady-state heartbeat.

use crate::constants::{HR_FIRST_PEAK, HR_SECOND_PEAK};

/// Direction of the last observed change in the signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slope {
    Rising,
    Falling,
}

#[derive(Debug, Clone)]
pub struct PeakDetector {
    slope: Slope,
    prev_value: f64,
    peak_count: u32,
    first_peak_ms: Option<u64>,
    second_peak_ms: Option<u64>,
}

impl PeakDetector {
    /// Start in [`Slope::Falling`] with a previous value of `0.0`.
    pub fn new() -> Self {
        Self {
            slope: Slope::Falling,
            prev_value: 0.0,
            peak_count: 0,
            first_peak_ms: None,
            second_peak_ms: None,
        }
    }

    /// Feed one oscillometric sample taken at `now_ms`.
    ///
    /// Returns the new peak count when this sample completes a peak (the
    /// signal turned from rising to falling), `None` otherwise.  Equal
    /// consecutive values never change the slope.
    pub fn update(&mut self, value: f64, now_ms: u64) -> Option<u32> {
        let mut peak = None;
        match self.slope {
            Slope::Rising if value < self.prev_value => {
                self.slope = Slope::Falling;
                self.peak_count += 1;
                if self.peak_count == HR_FIRST_PEAK {
                    self.first_peak_ms = Some(now_ms);
                } else if self.peak_count == HR_SECOND_PEAK {
                    self.second_peak_ms = Some(now_ms);
                }
                peak = Some(self.peak_count);
            }
            Slope::Falling if value > self.prev_value => {
                self.slope = Slope::Rising;
            }
            _ => {}
        }
        self.prev_value = value;
        peak
    }

    pub fn slope(&self) -> Slope {
        self.slope
    }

    pub fn peak_count(&self) -> u32 {
        self.peak_count
    }

    /// Timestamp of peak [`HR_FIRST_PEAK`], once reached.
    pub fn first_peak_ms(&self) -> Option<u64> {
        self.first_peak_ms
    }

    /// Timestamp of peak [`HR_SECOND_PEAK`], once reached.
    pub fn second_peak_ms(&self) -> Option<u64> {
        self.second_peak_ms
    }
}

impl Default for PeakDetector {
    fn default() -> Self {
        Self::new()
    }
}
