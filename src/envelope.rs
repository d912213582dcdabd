//! Amplitude-envelope search that turns a complete [`ReadingStore`] into
//! systolic, diastolic and mean arterial pressure plus heart rate.
//!
//! | Value | Rule |
//! |---|---|
//! | MAP | pressure of the maximum-amplitude reading |
//! | SBP | backward from the maximum to index 0: amplitude closest to `0.55 × max` |
//! | DBP | forward from the maximum to the last index: amplitude closest to `0.75 × max` |
//! | HR  | `60 / (t16 − t15)` seconds, from the peak detector |
//!
//! The systolic edge of the envelope is shallower than the diastolic edge,
//! which is why the two ratios differ.
//!
//! Everything here is a pure function of its inputs; analysing the same store
//! twice gives the same result.

use crate::constants::{DIASTOLIC_RATIO, SYSTOLIC_RATIO};
use crate::peak::PeakDetector;
use crate::store::ReadingStore;
use crate::types::{BloodPressure, Reading};

/// Analyse a complete store.  Returns `None` while readings are still missing.
pub fn analyze(store: &ReadingStore, peaks: &PeakDetector) -> Option<BloodPressure> {
    if !store.is_complete() {
        return None;
    }
    let readings = store.readings();
    let max_index = store.max_amplitude_index();
    let max_amplitude = store.max_amplitude();

    let systolic_threshold = SYSTOLIC_RATIO * max_amplitude;
    let diastolic_threshold = DIASTOLIC_RATIO * max_amplitude;

    let systolic_index = closest_reading(readings, (0..=max_index).rev(), systolic_threshold)?;
    let diastolic_index = closest_reading(readings, max_index..readings.len(), diastolic_threshold)?;

    Some(BloodPressure {
        readings: readings.to_vec(),
        max_amplitude,
        max_amplitude_index: max_index,
        systolic_threshold,
        diastolic_threshold,
        systolic_index,
        diastolic_index,
        systolic: readings[systolic_index].pressure,
        diastolic: readings[diastolic_index].pressure,
        mean_arterial: readings[max_index].pressure,
        heart_rate_bpm: heart_rate_bpm(peaks.first_peak_ms(), peaks.second_peak_ms()),
    })
}

/// Walk `indices` in order and return the index whose amplitude is closest to
/// `threshold`.
///
/// Only a strictly smaller difference replaces the current best, so on ties
/// the first index visited wins.  Indices outside `readings` are skipped;
/// `None` when no index lands inside it.
pub fn closest_reading(
    readings: &[Reading],
    indices: impl IntoIterator<Item = usize>,
    threshold: f64,
) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for i in indices {
        let Some(reading) = readings.get(i) else {
            continue;
        };
        let diff = (reading.amplitude - threshold).abs();
        if best.map_or(true, |(_, best_diff)| diff < best_diff) {
            best = Some((i, diff));
        }
    }
    best.map(|(i, _)| i)
}

/// Heart rate from the timestamps (ms) of two consecutive steady-state peaks.
///
/// `None` when either timestamp is missing or the interval is not positive.
pub fn heart_rate_bpm(first_peak_ms: Option<u64>, second_peak_ms: Option<u64>) -> Option<f64> {
    let (first, second) = (first_peak_ms?, second_peak_ms?);
    if second <= first {
        return None;
    }
    let interval_s = (second - first) as f64 / 1000.0;
    Some(60.0 / interval_s)
}
