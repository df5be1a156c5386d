//! PID compensators Kp + Ki/s + Kd·s.

use serde::{Deserialize, Serialize};

use crate::error::{DesignError, DesignResult};
use crate::polynomial::Polynomial;
use crate::transfer_function::TransferFunction;

/// PID gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    /// Proportional gain.
    pub kp: f64,
    /// Integral gain.
    pub ki: f64,
    /// Derivative gain.
    pub kd: f64,
}

/// A PID compensator and its transfer function.
#[derive(Debug, Clone, PartialEq)]
pub struct PidCompensator {
    gains: PidGains,
    tf: TransferFunction,
}

impl PidCompensator {
    pub fn gains(&self) -> PidGains {
        self.gains
    }

    pub fn transfer_function(&self) -> &TransferFunction {
        &self.tf
    }
}

/// Form the compensator (Kd s² + Kp s + Ki) / s.
///
/// Without integral action the common factor s is cancelled, leaving
/// Kd s + Kp.
pub fn compose(kp: f64, ki: f64, kd: f64) -> DesignResult<PidCompensator> {
    if !(kp.is_finite() && ki.is_finite() && kd.is_finite()) {
        return Err(DesignError::NonFinite { what: "PID gains" });
    }
    let tf = if ki == 0.0 {
        TransferFunction::from_polynomials(
            Polynomial::new(vec![kd, kp], "PID numerator")?,
            Polynomial::constant(1.0),
        )?
    } else {
        TransferFunction::from_polynomials(
            Polynomial::new(vec![kd, kp, ki], "PID numerator")?,
            Polynomial::s(),
        )?
    };
    Ok(PidCompensator {
        gains: PidGains { kp, ki, kd },
        tf,
    })
}

impl PidGains {
    pub fn compose(&self) -> DesignResult<PidCompensator> {
        compose(self.kp, self.ki, self.kd)
    }
}

/// Classic Ziegler-Nichols gains from the ultimate gain `ku` and the
/// oscillation period `tu`: Kp = 0.6 Ku, Ki = 2 Kp / Tu, Kd = Kp Tu / 8.
pub fn ziegler_nichols(ku: f64, tu: f64) -> DesignResult<PidGains> {
    if !(ku > 0.0 && ku.is_finite()) {
        return Err(DesignError::InvalidArg {
            what: "ultimate gain must be positive",
        });
    }
    if !(tu > 0.0 && tu.is_finite()) {
        return Err(DesignError::InvalidArg {
            what: "oscillation period must be positive",
        });
    }
    let kp = 0.6 * ku;
    Ok(PidGains {
        kp,
        ki: 2.0 * kp / tu,
        kd: kp * tu / 8.0,
    })
}
