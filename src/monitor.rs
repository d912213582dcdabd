use std::time::Duration;

use log::{debug, info, warn};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::acquisition::{MeasurementSession, SampleSource, ThresholdSignal};
use crate::types::MeasurementEvent;

// ── MonitorConfig ─────────────────────────────────────────────────────────────

/// Configuration for [`Monitor`].
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Period of the cooperative poll loop in milliseconds.
    ///
    /// Must be well below the 33 ms sample interval; a slower loop simply
    /// lowers the effective sample rate.  Default: `5`.
    pub poll_interval_ms: u64,
    /// Capacity of the event channel.  A full cycle produces roughly
    /// 900 sample events, so the default of `1024` holds a whole cycle.
    ///
    /// When the channel is full, [`MeasurementEvent::Sample`] events are
    /// dropped so polling keeps its cadence.  Every other event waits for
    /// room, so a consumer that stops reading altogether also stops the
    /// measurement at its next phase change, peak or reading.
    pub event_buffer: usize,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5,
            event_buffer: 1024,
        }
    }
}

// ── Monitor ───────────────────────────────────────────────────────────────────

/// Drives one [`MeasurementSession`] from a tokio interval.
///
/// The poll loop runs in its own task and never blocks between ticks; the
/// session's events are forwarded through an `mpsc` channel (see
/// [`MonitorConfig::event_buffer`] for what happens when it fills up).  The
/// clock handed to the session is the number of milliseconds since
/// [`Monitor::start`] was called.
pub struct Monitor {
    config: MonitorConfig,
}

impl Monitor {
    pub fn new(config: MonitorConfig) -> Self {
        Self { config }
    }

    /// Start a measurement cycle against `cuff`.
    ///
    /// Returns the event receiver and a [`MonitorHandle`] for stopping the
    /// cycle early.  The task ends on its own after sending
    /// [`MeasurementEvent::Completed`], or as soon as the receiver is dropped.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<C>(&self, mut cuff: C) -> (mpsc::Receiver<MeasurementEvent>, MonitorHandle)
    where
        C: SampleSource + ThresholdSignal + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<MeasurementEvent>(self.config.event_buffer.max(1));
        let period = Duration::from_millis(self.config.poll_interval_ms.max(1));

        let task = tokio::spawn(async move {
            let mut session = MeasurementSession::new();
            let started = Instant::now();
            let mut ticker = tokio::time::interval(period);
            let mut dropped_samples = 0u64;
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            info!("measurement started; waiting for cuff pressure threshold");

            loop {
                ticker.tick().await;
                let now_ms = started.elapsed().as_millis() as u64;
                for event in session.poll_cuff(now_ms, &mut cuff) {
                    let delivered = match event {
                        MeasurementEvent::Sample { .. } => match tx.try_send(event) {
                            Ok(()) => true,
                            Err(TrySendError::Full(_)) => {
                                dropped_samples += 1;
                                true
                            }
                            Err(TrySendError::Closed(_)) => false,
                        },
                        event => tx.send(event).await.is_ok(),
                    };
                    if !delivered {
                        debug!("event receiver dropped; stopping measurement");
                        return;
                    }
                }
                if session.is_done() {
                    break;
                }
            }
            if dropped_samples > 0 {
                warn!("event channel full: dropped {dropped_samples} sample events");
            }
            debug!("measurement task finished");
        });

        (rx, MonitorHandle { task })
    }
}

// ── MonitorHandle ─────────────────────────────────────────────────────────────

/// A handle to a running measurement.
pub struct MonitorHandle {
    task: JoinHandle<()>,
}

impl MonitorHandle {
    /// Abort the measurement.  The event channel closes without `Completed`.
    pub fn stop(&self) {
        self.task.abort();
    }

    /// `true` once the poll task has ended, for whatever reason.
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
