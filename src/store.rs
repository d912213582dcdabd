//! Fixed-capacity, chronological store of per-second readings.

use log::warn;

use crate::constants::TOTAL_SECONDS;
use crate::types::Reading;

/// The [`TOTAL_SECONDS`] readings of one cycle plus the running maximum.
///
/// The running maximum skips index 0: the first window can never become the
/// maximum-amplitude reading, even when it has the largest amplitude of the
/// run.  Before any later window has a positive amplitude the maximum stays
/// at its initial `0.0` / index `0`.
#[derive(Debug, Clone)]
pub struct ReadingStore {
    readings: [Reading; TOTAL_SECONDS],
    len: usize,
    max_amplitude: f64,
    max_amplitude_index: usize,
}

impl ReadingStore {
    pub fn new() -> Self {
        Self {
            readings: [Reading::default(); TOTAL_SECONDS],
            len: 0,
            max_amplitude: 0.0,
            max_amplitude_index: 0,
        }
    }

    /// Append the next reading and update the running maximum.
    ///
    /// Returns the index the reading was stored at, or `None` when the store
    /// is already full (the reading is dropped).
    pub fn push(&mut self, reading: Reading) -> Option<usize> {
        if self.is_complete() {
            warn!("reading store is full; dropping {reading:?}");
            return None;
        }
        let index = self.len;
        self.readings[index] = reading;
        self.len += 1;

        if index > 0 && reading.amplitude > self.max_amplitude {
            self.max_amplitude = reading.amplitude;
            self.max_amplitude_index = index;
        }
        Some(index)
    }

    /// Readings collected so far, oldest first.
    pub fn readings(&self) -> &[Reading] {
        &self.readings[..self.len]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// `true` once all [`TOTAL_SECONDS`] readings are stored.
    pub fn is_complete(&self) -> bool {
        self.len == TOTAL_SECONDS
    }

    pub fn max_amplitude(&self) -> f64 {
        self.max_amplitude
    }

    pub fn max_amplitude_index(&self) -> usize {
        self.max_amplitude_index
    }
}

impl Default for ReadingStore {
    fn default() -> Self {
        Self::new()
    }
}
