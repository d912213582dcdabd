//! Deterministic cuff model standing in for the pressure sensor, the
//! oscillation sensor and the pump controller.
//!
//! The cuff inflates linearly to [`CuffProfile::target_pressure`], signals
//! that the threshold is reached, then bleeds down at a constant rate.  The
//! oscillometric signal is a sinusoid at the heart rate whose amplitude
//! follows an asymmetric Gaussian envelope over cuff pressure:
//!
//! ```text
//! MAP = DBP + (SBP − DBP) / 3
//! A(p) = max · exp(−(p − MAP)² / 2σ²)     σ = σ_s above MAP, σ_d below
//! ```
//!
//! The two widths are chosen so that `A(SBP) = 0.55 · max` and
//! `A(DBP) = 0.75 · max`, i.e. the envelope the analyzer is calibrated for.

use std::f64::consts::PI;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::acquisition::{SampleSource, ThresholdSignal};
use crate::constants::{DIASTOLIC_RATIO, SYSTOLIC_RATIO};
use crate::types::Sample;

/// Physiology and pump behaviour of a simulated measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CuffProfile {
    /// True systolic pressure in mmHg.  Default: `120`.
    pub systolic: f64,
    /// True diastolic pressure in mmHg.  Default: `80`.
    pub diastolic: f64,
    /// Pulse rate in beats per minute.  Default: `72`.
    pub heart_rate_bpm: f64,
    /// Pressure at which the pump stops and the threshold signal fires.
    /// Default: `165` mmHg.
    pub target_pressure: f64,
    /// Inflation speed in mmHg/s.  Default: `40`.
    pub inflate_rate: f64,
    /// Deflation speed in mmHg/s.  Default: `3.5`, which sweeps ≈ 105 mmHg
    /// during the 30 s acquisition.
    pub deflate_rate: f64,
    /// Peak oscillation amplitude (at MAP) in mmHg-equivalent units.
    /// Default: `2.0`.
    pub max_oscillation: f64,
}

impl Default for CuffProfile {
    fn default() -> Self {
        Self {
            systolic: 120.0,
            diastolic: 80.0,
            heart_rate_bpm: 72.0,
            target_pressure: 165.0,
            inflate_rate: 40.0,
            deflate_rate: 3.5,
            max_oscillation: 2.0,
        }
    }
}

impl CuffProfile {
    /// Reject profiles the model cannot represent.
    pub fn validate(&self) -> Result<()> {
        let fields = [
            ("systolic", self.systolic),
            ("diastolic", self.diastolic),
            ("heart_rate_bpm", self.heart_rate_bpm),
            ("target_pressure", self.target_pressure),
            ("inflate_rate", self.inflate_rate),
            ("deflate_rate", self.deflate_rate),
            ("max_oscillation", self.max_oscillation),
        ];
        for (name, value) in fields {
            if !value.is_finite() || value <= 0.0 {
                bail!("{name} must be a positive finite number, got {value}");
            }
        }
        if self.systolic <= self.diastolic {
            bail!(
                "systolic ({}) must be above diastolic ({})",
                self.systolic,
                self.diastolic
            );
        }
        if self.target_pressure <= self.systolic {
            bail!(
                "target pressure ({}) must exceed systolic ({})",
                self.target_pressure,
                self.systolic
            );
        }
        Ok(())
    }

    /// Mean arterial pressure implied by the profile.
    pub fn mean_arterial(&self) -> f64 {
        self.diastolic + (self.systolic - self.diastolic) / 3.0
    }

    /// Milliseconds from the start of inflation until the target is reached.
    pub fn inflation_ms(&self) -> u64 {
        (self.target_pressure / self.inflate_rate * 1000.0).round() as u64
    }
}

/// Simulated cuff implementing both core inputs.
#[derive(Debug, Clone)]
pub struct SimulatedCuff {
    profile: CuffProfile,
    sigma_systolic: f64,
    sigma_diastolic: f64,
}

impl SimulatedCuff {
    pub fn new(profile: CuffProfile) -> Result<Self> {
        profile.validate()?;
        let map = profile.mean_arterial();
        // exp(−d² / 2σ²) = r  ⇒  σ = d / √(2 ln(1/r))
        let width = |distance: f64, ratio: f64| distance / (2.0 * (1.0 / ratio).ln()).sqrt();
        Ok(Self {
            sigma_systolic: width(profile.systolic - map, SYSTOLIC_RATIO),
            sigma_diastolic: width(map - profile.diastolic, DIASTOLIC_RATIO),
            profile,
        })
    }

    pub fn profile(&self) -> &CuffProfile {
        &self.profile
    }

    /// Cuff pressure in mmHg at `now_ms` after the start of inflation.
    pub fn pressure_at(&self, now_ms: u64) -> f64 {
        let p = &self.profile;
        let inflation_ms = p.inflation_ms();
        if now_ms < inflation_ms {
            return p.inflate_rate * now_ms as f64 / 1000.0;
        }
        let deflating_s = (now_ms - inflation_ms) as f64 / 1000.0;
        (p.target_pressure - p.deflate_rate * deflating_s).max(0.0)
    }

    /// Oscillation envelope amplitude at cuff pressure `pressure`.
    pub fn envelope_at(&self, pressure: f64) -> f64 {
        let offset = pressure - self.profile.mean_arterial();
        let sigma = if offset >= 0.0 {
            self.sigma_systolic
        } else {
            self.sigma_diastolic
        };
        self.profile.max_oscillation * (-(offset * offset) / (2.0 * sigma * sigma)).exp()
    }
}

impl SampleSource for SimulatedCuff {
    fn sample(&mut self, now_ms: u64) -> Sample {
        let pressure = self.pressure_at(now_ms);
        let t = now_ms as f64 / 1000.0;
        let beat = (2.0 * PI * self.profile.heart_rate_bpm / 60.0 * t).sin();
        Sample::new(pressure, self.envelope_at(pressure) * beat)
    }
}

impl ThresholdSignal for SimulatedCuff {
    fn threshold_reached(&mut self, now_ms: u64) -> bool {
        now_ms >= self.profile.inflation_ms()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_profile_is_valid() {
        assert!(CuffProfile::default().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_pressures() {
        let profile = CuffProfile {
            systolic: 70.0,
            diastolic: 90.0,
            ..Default::default()
        };
        let err = SimulatedCuff::new(profile).unwrap_err();
        assert!(err.to_string().contains("systolic"));
    }

    #[test]
    fn rejects_non_finite_values() {
        let profile = CuffProfile {
            heart_rate_bpm: f64::NAN,
            ..Default::default()
        };
        assert!(profile.validate().is_err());
    }

    #[test]
    fn threshold_fires_when_inflation_ends() {
        let mut cuff = SimulatedCuff::new(CuffProfile::default()).unwrap();
        let inflation_ms = cuff.profile().inflation_ms();
        assert_eq!(inflation_ms, 4125);
        assert!(!cuff.threshold_reached(inflation_ms - 1));
        assert!(cuff.threshold_reached(inflation_ms));
        assert!((cuff.pressure_at(inflation_ms) - 165.0).abs() < 1e-9);
        assert!((cuff.pressure_at(inflation_ms + 2000) - 158.0).abs() < 1e-9);
    }

    #[test]
    fn envelope_matches_calibration_ratios() {
        let cuff = SimulatedCuff::new(CuffProfile::default()).unwrap();
        let p = cuff.profile().clone();
        let max = cuff.envelope_at(p.mean_arterial());
        assert!((max - p.max_oscillation).abs() < 1e-12);
        assert!((cuff.envelope_at(p.systolic) / max - SYSTOLIC_RATIO).abs() < 1e-9);
        assert!((cuff.envelope_at(p.diastolic) / max - DIASTOLIC_RATIO).abs() < 1e-9);
        assert!(cuff.envelope_at(p.target_pressure) < 0.05 * max);
    }

    #[test]
    fn pressure_never_goes_negative() {
        let cuff = SimulatedCuff::new(CuffProfile::default()).unwrap();
        assert_eq!(cuff.pressure_at(10 * 60 * 1000), 0.0);
    }
}
