//! Desired poles from time-domain performance targets.
//!
//! A dominant second-order pair is chosen from settling time and overshoot:
//!
//! - ζ = −ln(OS) / √(π² + ln²(OS)), or 0.7 when no overshoot is requested
//! - ωₙ = 4 / (ζ·Tₛ)
//! - a positive phase margin raises ζ to at least tan(PM/2)
//! - a positive gain margin (dB) scales ωₙ by 1 + GM/20
//!
//! The pair σ ± jω_d with σ = −ζωₙ, ω_d = ωₙ√(1 − ζ²) is completed with real
//! poles σ·(1 + k/2) for k = 2, 3, … up to the system order.

use std::f64::consts::PI;

use csl_core::{Complex64, CoreError, PoleSet};

use crate::error::{LinearError, LinearResult};

const DEFAULT_DAMPING: f64 = 0.7;
const MIN_HORIZON: f64 = 10.0;
const SETTLING_MULTIPLE: f64 = 5.0;

/// Transient-response targets for a state-feedback design.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TransientSpecs {
    /// 2% settling time in seconds.
    pub settling_time: f64,
    /// Peak overshoot in percent; zero or less asks for ζ = 0.7.
    pub overshoot_pct: f64,
    /// Ignored unless positive.
    pub gain_margin_db: f64,
    /// Ignored unless positive.
    pub phase_margin_deg: f64,
}

impl Default for TransientSpecs {
    fn default() -> Self {
        Self {
            settling_time: 2.0,
            overshoot_pct: 10.0,
            gain_margin_db: 0.0,
            phase_margin_deg: 0.0,
        }
    }
}

impl TransientSpecs {
    /// Damping ratio and natural frequency of the dominant pair.
    pub fn damping_and_frequency(&self) -> LinearResult<(f64, f64)> {
        if !(self.settling_time > 0.0 && self.settling_time.is_finite()) {
            return Err(invalid("settling time must be positive"));
        }
        if !(self.overshoot_pct < 100.0) {
            return Err(invalid("overshoot must be below 100%"));
        }
        if !(self.gain_margin_db.is_finite() && self.phase_margin_deg.is_finite()) {
            return Err(invalid("stability margins must be finite"));
        }

        let os = self.overshoot_pct.max(0.0) / 100.0;
        let mut zeta = if os > 0.0 {
            let l = os.ln();
            -l / (PI * PI + l * l).sqrt()
        } else {
            DEFAULT_DAMPING
        };
        let mut wn = 4.0 / (zeta * self.settling_time);

        if self.phase_margin_deg > 0.0 {
            let pm = self.phase_margin_deg.to_radians();
            zeta = zeta.max(pm.sin() / (1.0 + pm.cos()));
        }
        if self.gain_margin_db > 0.0 {
            wn *= 1.0 + self.gain_margin_db / 20.0;
        }
        Ok((zeta, wn))
    }

    /// Desired closed-loop poles for a system of the given order.
    pub fn desired_poles(&self, order: usize) -> LinearResult<PoleSet> {
        let (zeta, wn) = self.damping_and_frequency()?;
        let sigma = -zeta * wn;
        let wd = wn * (1.0 - zeta * zeta).max(0.0).sqrt();

        let mut poles = Vec::with_capacity(order);
        if order == 1 {
            poles.push(Complex64::new(sigma, 0.0));
        } else if order >= 2 {
            poles.push(Complex64::new(sigma, wd));
            poles.push(Complex64::new(sigma, -wd));
        }
        while poles.len() < order {
            let k = poles.len() as f64;
            poles.push(Complex64::new(sigma * (1.0 + 0.5 * k), 0.0));
        }
        Ok(PoleSet::new(poles))
    }

    /// Simulation horizon long enough to show the transient settle.
    pub fn simulation_horizon(&self) -> f64 {
        (SETTLING_MULTIPLE * self.settling_time).max(MIN_HORIZON)
    }
}

fn invalid(what: &'static str) -> LinearError {
    LinearError::InvalidData(CoreError::InvalidArg { what })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ten_percent_overshoot() {
        let specs = TransientSpecs::default();
        let (zeta, wn) = specs.damping_and_frequency().unwrap();
        assert!((zeta - 0.591_155).abs() < 1e-5);
        assert!((wn - 4.0 / (zeta * 2.0)).abs() < 1e-12);

        let poles = specs.desired_poles(2).unwrap();
        assert_eq!(poles.len(), 2);
        // σ = -4/Ts regardless of ζ
        assert!(poles.iter().all(|p| (p.re + 2.0).abs() < 1e-12));
        assert_eq!(poles.as_slice()[0].im, -poles.as_slice()[1].im);
    }

    #[test]
    fn higher_orders_get_faster_real_poles() {
        let poles = TransientSpecs::default().desired_poles(4).unwrap();
        let p = poles.as_slice();
        // 2σ and 2.5σ with σ = -2
        assert!((p[2] - Complex64::new(-4.0, 0.0)).norm() < 1e-12);
        assert!((p[3] - Complex64::new(-5.0, 0.0)).norm() < 1e-12);
        assert_eq!(p[2].im, 0.0);
        assert_eq!(p[3].im, 0.0);
    }

    #[test]
    fn first_order_uses_a_real_pole() {
        let poles = TransientSpecs::default().desired_poles(1).unwrap();
        assert_eq!(poles.len(), 1);
        let p = poles.as_slice()[0];
        assert!((p.re + 2.0).abs() < 1e-12);
        assert_eq!(p.im, 0.0);
    }

    #[test]
    fn margins_adjust_damping_and_bandwidth() {
        let specs = TransientSpecs {
            overshoot_pct: 0.0,
            phase_margin_deg: 90.0,
            gain_margin_db: 20.0,
            ..TransientSpecs::default()
        };
        let (zeta, wn) = specs.damping_and_frequency().unwrap();
        assert!((zeta - 1.0).abs() < 1e-12);
        // ωₙ computed from ζ = 0.7 before the margin adjustments
        assert!((wn - 2.0 * 4.0 / (0.7 * 2.0)).abs() < 1e-12);
    }

    #[test]
    fn rejects_bad_targets() {
        let bad = TransientSpecs {
            settling_time: 0.0,
            ..TransientSpecs::default()
        };
        assert!(bad.desired_poles(2).is_err());
        let bad = TransientSpecs {
            overshoot_pct: 150.0,
            ..TransientSpecs::default()
        };
        assert!(bad.desired_poles(2).is_err());
    }

    #[test]
    fn horizon() {
        assert_eq!(TransientSpecs::default().simulation_horizon(), 10.0);
        let slow = TransientSpecs {
            settling_time: 4.0,
            ..TransientSpecs::default()
        };
        assert_eq!(slow.simulation_horizon(), 20.0);
    }
}
