use oscillo_bp::prelude::*;

#[tokio::test(start_paused = true)]
async fn streams_a_complete_measurement() {
    let cuff = SimulatedCuff::new(CuffProfile::default()).unwrap();
    let (mut rx, handle) = Monitor::new(MonitorConfig::default()).start(cuff);

    let mut readings = 0;
    let mut result = None;
    while let Some(event) = rx.recv().await {
        match event {
            MeasurementEvent::Reading { .. } => readings += 1,
            MeasurementEvent::Completed(bp) => result = Some(bp),
            _ => {}
        }
    }

    assert_eq!(readings, TOTAL_SECONDS);
    let bp = result.expect("completed event");
    assert!(bp.systolic > bp.diastolic);
    tokio::task::yield_now().await;
    assert!(handle.is_finished());
}

#[tokio::test(start_paused = true)]
async fn slow_consumer_loses_samples_but_not_the_result() {
    let cuff = SimulatedCuff::new(CuffProfile::default()).unwrap();
    let config = MonitorConfig {
        event_buffer: 1,
        ..MonitorConfig::default()
    };
    let started = tokio::time::Instant::now();
    let (mut rx, _handle) = Monitor::new(config).start(cuff);

    let mut samples = 0;
    let mut readings = 0;
    let mut completed = false;
    while let Some(event) = rx.recv().await {
        match event {
            MeasurementEvent::Sample { .. } => samples += 1,
            MeasurementEvent::Reading { .. } => readings += 1,
            MeasurementEvent::Completed(_) => completed = true,
            _ => {}
        }
        tokio::time::sleep(std::time::Duration::from_millis(200)).await;
    }

    assert!(completed);
    assert_eq!(readings, TOTAL_SECONDS);
    // A lossless stream would hold the poll loop for 900 x 200 ms.
    assert!(samples < WINDOW_SIZE * TOTAL_SECONDS, "no samples dropped: {samples}");
    assert!(started.elapsed() < std::time::Duration::from_secs(120));
}

#[tokio::test(start_paused = true)]
async fn stop_closes_the_channel_without_a_result() {
    let cuff = SimulatedCuff::new(CuffProfile::default()).unwrap();
    let (mut rx, handle) = Monitor::new(MonitorConfig::default()).start(cuff);

    // Wait for sampling to begin, then abort.
    loop {
        match rx.recv().await {
            Some(MeasurementEvent::PhaseChanged(AcquisitionPhase::Sampling { .. })) => break,
            Some(_) => {}
            None => panic!("channel closed early"),
        }
    }
    handle.stop();

    while let Some(event) = rx.recv().await {
        assert!(!matches!(event, MeasurementEvent::Completed(_)));
    }
}

#[tokio::test(start_paused = true)]
async fn stays_waiting_without_the_threshold_signal() {
    struct NeverInflates;
    impl SampleSource for NeverInflates {
        fn sample(&mut self, _now_ms: u64) -> Sample {
            panic!("sampled without threshold");
        }
    }
    impl ThresholdSignal for NeverInflates {
        fn threshold_reached(&mut self, _now_ms: u64) -> bool {
            false
        }
    }

    let (mut rx, handle) = Monitor::new(MonitorConfig::default()).start(NeverInflates);
    let waited =
        tokio::time::timeout(std::time::Duration::from_secs(60), rx.recv()).await;
    assert!(waited.is_err(), "no event expected while waiting");
    assert!(!handle.is_finished());
    handle.stop();
}
