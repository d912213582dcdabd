//! Per-second min/max aggregation of the oscillometric signal.

use crate::constants::WINDOW_SIZE;
use crate::types::{Reading, Sample};

/// Running extrema of the window currently being filled.
///
/// Tracks the largest and smallest oscillometric value together with the cuff
/// pressure observed at each.  After [`WINDOW_SIZE`] samples the window is
/// emitted as a [`Reading`] and the accumulator starts over.
#[derive(Debug, Clone)]
pub struct WindowAccumulator {
    max_val: f64,
    min_val: f64,
    max_pressure: f64,
    min_pressure: f64,
    sample_count: usize,
}

impl WindowAccumulator {
    pub fn new() -> Self {
        Self {
            max_val: f64::NEG_INFINITY,
            min_val: f64::INFINITY,
            max_pressure: 0.0,
            min_pressure: 0.0,
            sample_count: 0,
        }
    }

    /// Add one sample; returns the finished [`Reading`] when this sample
    /// completes the window.
    ///
    /// Ties never replace an extremum, so the pressure recorded for a repeated
    /// maximum (or minimum) is the one seen first.
    pub fn push(&mut self, sample: Sample) -> Option<Reading> {
        if sample.oscillometric > self.max_val {
            self.max_val = sample.oscillometric;
            self.max_pressure = sample.pressure;
        }
        if sample.oscillometric < self.min_val {
            self.min_val = sample.oscillometric;
            self.min_pressure = sample.pressure;
        }
        self.sample_count += 1;

        if self.sample_count < WINDOW_SIZE {
            return None;
        }

        let reading = Reading {
            amplitude: self.max_val - self.min_val,
            pressure: (self.max_pressure + self.min_pressure) / 2.0,
        };
        self.reset();
        Some(reading)
    }

    /// Samples accumulated in the current window.
    pub fn sample_count(&self) -> usize {
        self.sample_count
    }

    fn reset(&mut self) {
        *self = Self::new();
    }
}

impl Default for WindowAccumulator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emits_after_window_size_samples() {
        let mut acc = WindowAccumulator::new();
        for i in 0..WINDOW_SIZE - 1 {
            assert!(acc.push(Sample::new(100.0, i as f64)).is_none());
        }
        assert_eq!(acc.sample_count(), WINDOW_SIZE - 1);
        assert!(acc.push(Sample::new(100.0, 0.0)).is_some());
        assert_eq!(acc.sample_count(), 0);
    }

    #[test]
    fn amplitude_and_pressure_midpoint() {
        let mut acc = WindowAccumulator::new();
        let mut out = None;
        for i in 0..WINDOW_SIZE {
            // Maximum 3.0 at pressure 140, minimum -1.0 at pressure 130.
            let sample = match i {
                5 => Sample::new(140.0, 3.0),
                20 => Sample::new(130.0, -1.0),
                _ => Sample::new(135.0 + i as f64 * 0.01, 0.5),
            };
            out = acc.push(sample);
        }
        let reading = out.expect("window should be complete");
        assert_eq!(reading.amplitude, 4.0);
        assert_eq!(reading.pressure, 135.0);
    }

    #[test]
    fn first_extremum_wins_on_ties() {
        let mut acc = WindowAccumulator::new();
        let mut out = None;
        for i in 0..WINDOW_SIZE {
            let pressure = 100.0 - i as f64;
            out = acc.push(Sample::new(pressure, 1.0));
        }
        // Constant signal: max and min are both the first sample.
        let reading = out.unwrap();
        assert_eq!(reading.amplitude, 0.0);
        assert_eq!(reading.pressure, 100.0);
    }

    #[test]
    fn resets_between_windows() {
        let mut acc = WindowAccumulator::new();
        for _ in 0..WINDOW_SIZE - 1 {
            acc.push(Sample::new(150.0, 10.0));
        }
        acc.push(Sample::new(150.0, -10.0));

        let mut out = None;
        for _ in 0..WINDOW_SIZE {
            out = acc.push(Sample::new(80.0, 0.25));
        }
        let reading = out.unwrap();
        assert_eq!(reading.amplitude, 0.0);
        assert_eq!(reading.pressure, 80.0);
    }
}
