//! Plain-text rendering of a finished measurement.

use std::fmt::Write as _;

use crate::types::BloodPressure;

/// Heart rate as `"72.0 BPM"`, or `"unavailable"`.
pub fn format_heart_rate(heart_rate_bpm: Option<f64>) -> String {
    match heart_rate_bpm {
        Some(bpm) => format!("{bpm:.1} BPM"),
        None => "unavailable".to_owned(),
    }
}

/// Render the reading table followed by the summary block.
///
/// Rows are marked `MAP`, `SBP` and `DBP` where the envelope search landed;
/// one row can carry several marks.
///
/// ```
/// # use oscillo_bp::report::render;
/// # use oscillo_bp::types::{BloodPressure, Reading};
/// let bp = BloodPressure {
///     readings: vec![Reading { amplitude: 1.0, pressure: 120.0 }],
///     max_amplitude: 1.0,
///     max_amplitude_index: 0,
///     systolic_threshold: 0.55,
///     diastolic_threshold: 0.75,
///     systolic_index: 0,
///     diastolic_index: 0,
///     systolic: 120.0,
///     diastolic: 120.0,
///     mean_arterial: 120.0,
///     heart_rate_bpm: None,
/// };
/// let text = render(&bp);
/// assert!(text.contains("Heart rate:       unavailable"));
/// ```
pub fn render(bp: &BloodPressure) -> String {
    let mut out = String::new();
    let _ = writeln!(out, " idx  amplitude  pressure (mmHg)");
    let _ = writeln!(out, " ---  ---------  ---------------");
    for (i, r) in bp.readings.iter().enumerate() {
        let mut marks = Vec::new();
        if i == bp.systolic_index {
            marks.push("SBP");
        }
        if i == bp.max_amplitude_index {
            marks.push("MAP");
        }
        if i == bp.diastolic_index {
            marks.push("DBP");
        }
        let _ = writeln!(
            out,
            " {i:>3}  {:>9.3}  {:>15.1}  {}",
            r.amplitude,
            r.pressure,
            marks.join(" ")
        );
    }
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "Max amplitude:    {:.3} (reading {})",
        bp.max_amplitude, bp.max_amplitude_index
    );
    let _ = writeln!(
        out,
        "Thresholds:       systolic {:.3}, diastolic {:.3}",
        bp.systolic_threshold, bp.diastolic_threshold
    );
    let _ = writeln!(out, "Systolic (SBP):   {:.1} mmHg", bp.systolic);
    let _ = writeln!(out, "Diastolic (DBP):  {:.1} mmHg", bp.diastolic);
    let _ = writeln!(out, "Mean (MAP):       {:.1} mmHg", bp.mean_arterial);
    let _ = writeln!(out, "Heart rate:       {}", format_heart_rate(bp.heart_rate_bpm));
    out
}
