//! Acquisition state machine and the per-cycle measurement session.
//!
//! Timing decisions live in the pure [`transition`] function; the
//! [`MeasurementSession`] applies the resulting [`Effect`] to the peak
//! detector, the window accumulator and the reading store.
//!
//! The session never sleeps.  Each [`MeasurementSession::poll`] compares the
//! caller's clock against the phase anchor and returns immediately, so the
//! surrounding loop stays free to run pump and valve safety checks between
//! polls.

use log::{debug, info, trace};

use crate::constants::{SAMPLE_INTERVAL_MS, SETTLING_DELAY_MS};
use crate::envelope;
use crate::peak::PeakDetector;
use crate::store::ReadingStore;
use crate::types::{AcquisitionPhase, BloodPressure, MeasurementEvent, Sample};
use crate::window::WindowAccumulator;

// ── Collaborator interfaces ──────────────────────────────────────────────────

/// Supplies the current (pressure, oscillometric) pair in physical units.
///
/// Implemented for any `FnMut(u64) -> Sample` so tests can pass a closure.
pub trait SampleSource {
    fn sample(&mut self, now_ms: u64) -> Sample;
}

impl<F> SampleSource for F
where
    F: FnMut(u64) -> Sample,
{
    fn sample(&mut self, now_ms: u64) -> Sample {
        self(now_ms)
    }
}

/// The externally computed "cuff pressure threshold reached" condition.
pub trait ThresholdSignal {
    fn threshold_reached(&mut self, now_ms: u64) -> bool;
}

impl ThresholdSignal for bool {
    fn threshold_reached(&mut self, _now_ms: u64) -> bool {
        *self
    }
}

// ── Pure transition ──────────────────────────────────────────────────────────

/// Everything the transition function looks at in one poll step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    pub now_ms: u64,
    pub threshold_reached: bool,
    pub readings_complete: bool,
}

/// Work the session must do after a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    None,
    /// Read one sample and feed it to the detector and the accumulator.
    TakeSample,
    /// Run the envelope analysis; only ever produced on entry to `Done`.
    Analyze,
}

/// Compute the next phase and the effect to perform.
///
/// Elapsed-time checks use saturating subtraction, so a clock that briefly
/// goes backwards just looks like "no time has passed".
pub fn transition(phase: AcquisitionPhase, tick: Tick) -> (AcquisitionPhase, Effect) {
    match phase {
        AcquisitionPhase::WaitingForSignal if tick.threshold_reached => (
            AcquisitionPhase::SettlingDelay {
                entered_ms: tick.now_ms,
            },
            Effect::None,
        ),
        AcquisitionPhase::SettlingDelay { entered_ms }
            if tick.now_ms.saturating_sub(entered_ms) >= SETTLING_DELAY_MS =>
        {
            (
                AcquisitionPhase::Sampling {
                    last_sample_ms: tick.now_ms,
                },
                Effect::None,
            )
        }
        AcquisitionPhase::Sampling { .. } if tick.readings_complete => {
            (AcquisitionPhase::Done, Effect::Analyze)
        }
        AcquisitionPhase::Sampling { last_sample_ms }
            if tick.now_ms.saturating_sub(last_sample_ms) >= SAMPLE_INTERVAL_MS =>
        {
            (
                AcquisitionPhase::Sampling {
                    last_sample_ms: tick.now_ms,
                },
                Effect::TakeSample,
            )
        }
        unchanged => (unchanged, Effect::None),
    }
}

// ── Session ──────────────────────────────────────────────────────────────────

/// All mutable state of one measurement cycle.
///
/// Create a fresh session per cycle; nothing leaks from one cycle into the
/// next.
#[derive(Debug, Clone, Default)]
pub struct MeasurementSession {
    phase: AcquisitionPhase,
    peaks: PeakDetector,
    window: WindowAccumulator,
    store: ReadingStore,
    result: Option<BloodPressure>,
}

impl MeasurementSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run one poll step at `now_ms` and return what happened.
    ///
    /// Polling faster than the sample interval is a no-op.  The threshold
    /// signal is only consulted while waiting for it.  When the sample taken
    /// in this step completes the last window, the session enters `Done` and
    /// analyses the envelope in the same step.
    pub fn poll<S, T>(&mut self, now_ms: u64, source: &mut S, signal: &mut T) -> Vec<MeasurementEvent>
    where
        S: SampleSource + ?Sized,
        T: ThresholdSignal + ?Sized,
    {
        let threshold_reached = self.is_waiting() && signal.threshold_reached(now_ms);
        self.advance(now_ms, threshold_reached, source)
    }

    /// [`Self::poll`] for a single collaborator that provides both inputs,
    /// such as [`crate::simulator::SimulatedCuff`].
    pub fn poll_cuff<C>(&mut self, now_ms: u64, cuff: &mut C) -> Vec<MeasurementEvent>
    where
        C: SampleSource + ThresholdSignal + ?Sized,
    {
        let threshold_reached = self.is_waiting() && cuff.threshold_reached(now_ms);
        self.advance(now_ms, threshold_reached, cuff)
    }

    fn is_waiting(&self) -> bool {
        self.phase == AcquisitionPhase::WaitingForSignal
    }

    fn advance<S>(&mut self, now_ms: u64, threshold_reached: bool, source: &mut S) -> Vec<MeasurementEvent>
    where
        S: SampleSource + ?Sized,
    {
        let mut events = Vec::new();
        let effect = self.step(now_ms, threshold_reached, &mut events);
        match effect {
            Effect::TakeSample => {
                self.take_sample(now_ms, source, &mut events);
                if self.store.is_complete() {
                    let effect = self.step(now_ms, false, &mut events);
                    self.apply_terminal(effect, &mut events);
                }
            }
            other => self.apply_terminal(other, &mut events),
        }
        events
    }

    fn step(&mut self, now_ms: u64, threshold_reached: bool, events: &mut Vec<MeasurementEvent>) -> Effect {
        let tick = Tick {
            now_ms,
            threshold_reached,
            readings_complete: self.store.is_complete(),
        };
        let (next, effect) = transition(self.phase, tick);
        if std::mem::discriminant(&next) != std::mem::discriminant(&self.phase) {
            debug!("phase: {} -> {} at {now_ms} ms", self.phase.label(), next.label());
            events.push(MeasurementEvent::PhaseChanged(next));
        }
        self.phase = next;
        effect
    }

    fn take_sample<S>(&mut self, now_ms: u64, source: &mut S, events: &mut Vec<MeasurementEvent>)
    where
        S: SampleSource + ?Sized,
    {
        let sample = source.sample(now_ms);
        events.push(MeasurementEvent::Sample {
            timestamp_ms: now_ms,
            sample,
        });

        if let Some(count) = self.peaks.update(sample.oscillometric, now_ms) {
            trace!("peak #{count} at {now_ms} ms");
            events.push(MeasurementEvent::Peak {
                count,
                timestamp_ms: now_ms,
            });
        }

        if let Some(reading) = self.window.push(sample) {
            if let Some(index) = self.store.push(reading) {
                debug!(
                    "window {index}: amplitude={:.3} pressure={:.1} mmHg",
                    reading.amplitude, reading.pressure
                );
                events.push(MeasurementEvent::Reading { index, reading });
            }
        }
    }

    fn apply_terminal(&mut self, effect: Effect, events: &mut Vec<MeasurementEvent>) {
        if effect != Effect::Analyze || self.result.is_some() {
            return;
        }
        if let Some(bp) = envelope::analyze(&self.store, &self.peaks) {
            info!(
                "measurement complete: SBP={:.1} DBP={:.1} MAP={:.1} mmHg, HR={}",
                bp.systolic,
                bp.diastolic,
                bp.mean_arterial,
                bp.heart_rate_bpm
                    .map(|hr| format!("{hr:.1} BPM"))
                    .unwrap_or_else(|| "unavailable".into())
            );
            self.result = Some(bp.clone());
            events.push(MeasurementEvent::Completed(bp));
        }
    }

    pub fn phase(&self) -> AcquisitionPhase {
        self.phase
    }

    pub fn is_done(&self) -> bool {
        self.phase == AcquisitionPhase::Done
    }

    pub fn store(&self) -> &ReadingStore {
        &self.store
    }

    pub fn peaks(&self) -> &PeakDetector {
        &self.peaks
    }

    /// The final result, once the session is `Done`.
    pub fn result(&self) -> Option<&BloodPressure> {
        self.result.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{TOTAL_SECONDS, WINDOW_SIZE};

    fn tick(now_ms: u64, threshold_reached: bool, readings_complete: bool) -> Tick {
        Tick {
            now_ms,
            threshold_reached,
            readings_complete,
        }
    }

    #[test]
    fn waits_for_threshold() {
        let phase = AcquisitionPhase::WaitingForSignal;
        assert_eq!(transition(phase, tick(500, false, false)), (phase, Effect::None));
        assert_eq!(
            transition(phase, tick(500, true, false)),
            (AcquisitionPhase::SettlingDelay { entered_ms: 500 }, Effect::None)
        );
    }

    #[test]
    fn settling_lasts_the_full_delay() {
        let phase = AcquisitionPhase::SettlingDelay { entered_ms: 500 };
        assert_eq!(transition(phase, tick(1499, true, false)).0, phase);
        assert_eq!(
            transition(phase, tick(1500, false, false)),
            (AcquisitionPhase::Sampling { last_sample_ms: 1500 }, Effect::None)
        );
    }

    #[test]
    fn sampling_respects_the_interval() {
        let phase = AcquisitionPhase::Sampling { last_sample_ms: 2000 };
        assert_eq!(transition(phase, tick(2000 + SAMPLE_INTERVAL_MS - 1, false, false)).1, Effect::None);
        assert_eq!(
            transition(phase, tick(2000 + SAMPLE_INTERVAL_MS + 7, false, false)),
            (
                AcquisitionPhase::Sampling {
                    last_sample_ms: 2000 + SAMPLE_INTERVAL_MS + 7
                },
                Effect::TakeSample
            )
        );
    }

    #[test]
    fn completion_wins_over_another_sample() {
        let phase = AcquisitionPhase::Sampling { last_sample_ms: 0 };
        assert_eq!(
            transition(phase, tick(10_000, false, true)),
            (AcquisitionPhase::Done, Effect::Analyze)
        );
        assert_eq!(
            transition(AcquisitionPhase::Done, tick(20_000, true, true)),
            (AcquisitionPhase::Done, Effect::None)
        );
    }

    #[test]
    fn clock_going_backwards_is_ignored() {
        let phase = AcquisitionPhase::Sampling { last_sample_ms: 5000 };
        assert_eq!(transition(phase, tick(4000, false, false)), (phase, Effect::None));
    }

    /// Square wave at 5 Hz on a falling pressure ramp.
    fn square_wave(now_ms: u64) -> Sample {
        let high = (now_ms / 100) % 2 == 0;
        Sample::new(180.0 - now_ms as f64 / 1000.0, if high { 1.0 } else { -1.0 })
    }

    #[test]
    fn nothing_is_sampled_before_the_signal() {
        let mut session = MeasurementSession::new();
        let mut source = |_now: u64| -> Sample { panic!("sampled while waiting") };
        for now in 0..5000 {
            let events = session.poll(now, &mut source, &mut false);
            assert!(events.is_empty());
        }
        assert_eq!(session.phase(), AcquisitionPhase::WaitingForSignal);
    }

    #[test]
    fn first_sample_comes_one_interval_after_settling() {
        let mut session = MeasurementSession::new();
        let mut source = square_wave;
        let events = session.poll(100, &mut source, &mut true);
        assert!(matches!(
            events.as_slice(),
            [MeasurementEvent::PhaseChanged(AcquisitionPhase::SettlingDelay { entered_ms: 100 })]
        ));

        for now in 101..1100 {
            assert!(session.poll(now, &mut source, &mut true).is_empty());
        }
        let events = session.poll(1100, &mut source, &mut true);
        assert!(matches!(
            events.as_slice(),
            [MeasurementEvent::PhaseChanged(AcquisitionPhase::Sampling { last_sample_ms: 1100 })]
        ));
        for now in 1101..1100 + SAMPLE_INTERVAL_MS {
            assert!(session.poll(now, &mut source, &mut true).is_empty());
        }
        let events = session.poll(1100 + SAMPLE_INTERVAL_MS, &mut source, &mut true);
        assert!(matches!(events.as_slice(), [MeasurementEvent::Sample { .. }]));
    }

    #[test]
    fn full_cycle_collects_every_reading_then_idles() {
        let mut session = MeasurementSession::new();
        let mut source = square_wave;
        let mut readings = Vec::new();
        let mut completed = 0;
        let mut samples = 0;

        let mut now = 0;
        while now < 60_000 {
            for event in session.poll(now, &mut source, &mut (now >= 250)) {
                match event {
                    MeasurementEvent::Sample { .. } => samples += 1,
                    MeasurementEvent::Reading { index, .. } => readings.push(index),
                    MeasurementEvent::Completed(bp) => {
                        completed += 1;
                        assert_eq!(bp.readings.len(), TOTAL_SECONDS);
                    }
                    _ => {}
                }
            }
            now += 1;
        }

        assert!(session.is_done());
        assert_eq!(completed, 1);
        assert_eq!(samples, WINDOW_SIZE * TOTAL_SECONDS);
        assert_eq!(readings, (0..TOTAL_SECONDS).collect::<Vec<_>>());
        assert_eq!(session.store().len(), TOTAL_SECONDS);
        assert_ne!(session.store().max_amplitude_index(), 0);

        let bp = session.result().expect("result after done");
        // ±1 square wave: every window spans the full 2.0 range.
        assert_eq!(bp.max_amplitude, 2.0);
        // 5 Hz square wave sampled every 33 ms: one peak per 200 ms cycle.
        let hr = bp.heart_rate_bpm.expect("enough peaks");
        assert!((hr - 300.0).abs() < 60.0, "hr = {hr}");
    }

    #[test]
    fn done_is_reached_in_the_step_of_the_last_sample() {
        let mut session = MeasurementSession::new();
        let mut source = square_wave;
        let mut now = 0;
        loop {
            let events = session.poll(now, &mut source, &mut true);
            if events
                .iter()
                .any(|e| matches!(e, MeasurementEvent::Reading { index, .. } if *index == TOTAL_SECONDS - 1))
            {
                assert!(events
                    .iter()
                    .any(|e| matches!(e, MeasurementEvent::PhaseChanged(AcquisitionPhase::Done))));
                assert!(matches!(events.last(), Some(MeasurementEvent::Completed(_))));
                break;
            }
            now += 1;
            assert!(now < 60_000, "never completed");
        }
        assert!(session.poll(now + 10_000, &mut source, &mut true).is_empty());
    }
}
