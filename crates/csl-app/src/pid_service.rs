//! PID loop design service.

use csl_pid::{
    DesignError, PidGains, ResponseOptions, TransferFunction, closed_loop, closed_loop_step_response,
    frequency_response, nyquist, open_loop, ziegler_nichols,
};
use csl_sim::SimOptions;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::records::{NyquistRecord, PidRecord, pole_records};
use crate::schema::{PidDef, Study};

/// Explicit gains win over Ziegler-Nichols tuning; `None` when neither is set.
pub fn resolve_gains(def: &PidDef) -> AppResult<Option<PidGains>> {
    match (def.gains, def.ziegler_nichols) {
        (Some(gains), _) => Ok(Some(gains)),
        (None, Some(zn)) => Ok(Some(ziegler_nichols(zn.ku, zn.tu)?)),
        (None, None) => Ok(None),
    }
}

/// Ziegler-Nichols gains from the ultimate gain and period.
pub fn tune(ku: f64, tu: f64) -> AppResult<PidGains> {
    Ok(ziegler_nichols(ku, tu)?)
}

pub fn pid(study: &Study) -> AppResult<PidRecord> {
    let def = study.pid.as_ref().ok_or(AppError::MissingSection("pid"))?;
    let plant = TransferFunction::new(def.num.clone(), def.den.clone())?;
    let compensator = resolve_gains(def)?.map(|g| g.compose()).transpose()?;
    let compensator = compensator.as_ref();

    let opts = ResponseOptions {
        horizon: def.horizon,
        sim: study.simulation.options(SimOptions::default().samples),
    };
    let step = closed_loop_step_response(&plant, compensator, &opts)?;
    let bode = frequency_response(&plant, compensator)?;
    let ny = nyquist(&plant, compensator)?;
    let ol = open_loop(&plant, compensator)?;
    let cl = closed_loop(&plant, compensator)?;
    let cl_poles = cl.poles()?;

    // The step response above already failed if there was no compensator.
    let gains = compensator
        .map(|c| c.gains())
        .ok_or(AppError::Design(DesignError::MissingCompensator))?;
    info!(
        kp = gains.kp,
        ki = gains.ki,
        kd = gains.kd,
        closed_loop = %cl,
        final_output = step.output.last().copied().unwrap_or(f64::NAN),
        "designed PID loop"
    );

    Ok(PidRecord {
        gains,
        tracking_error: step.tracking_error(),
        time: step.time,
        step_response: step.output,
        magnitude: bode.magnitude_db(),
        phase: bode.phase_deg(),
        frequency_grid: bode.omega,
        nyquist: NyquistRecord {
            real: ny.real,
            imag: ny.imag,
        },
        open_loop_poles: pole_records(&ol.poles()?),
        open_loop_zeros: pole_records(&ol.zeros()?),
        closed_loop_poles: pole_records(&cl_poles),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::ZieglerNicholsDef;

    #[test]
    fn example_loop_tracks_unit_step() {
        let record = pid(&Study::default_example()).unwrap();
        assert_eq!(record.time.len(), record.step_response.len());
        let last = *record.step_response.last().unwrap();
        assert!((last - 1.0).abs() < 5e-3);
        assert_eq!(record.frequency_grid.len(), csl_pid::FREQUENCY_POINTS);
        assert_eq!(record.open_loop_poles.len(), 3);
        assert_eq!(record.open_loop_zeros.len(), 2);
        assert!(record.closed_loop_poles.iter().all(|p| p.re < 0.0));
    }

    #[test]
    fn ziegler_nichols_fallback() {
        let def = PidDef {
            num: vec![1.0],
            den: vec![1.0, 3.0, 2.0],
            gains: None,
            ziegler_nichols: Some(ZieglerNicholsDef { ku: 10.0, tu: 2.0 }),
            horizon: None,
        };
        let gains = resolve_gains(&def).unwrap().unwrap();
        assert_eq!((gains.kp, gains.ki, gains.kd), (6.0, 6.0, 1.5));
    }

    #[test]
    fn missing_gains_is_a_design_error() {
        let mut study = Study::default_example();
        if let Some(def) = study.pid.as_mut() {
            def.gains = None;
        }
        assert!(matches!(
            pid(&study),
            Err(AppError::Design(DesignError::MissingCompensator))
        ));
    }

    #[test]
    fn tune_rejects_non_positive_period() {
        assert!(matches!(
            tune(1.0, 0.0),
            Err(AppError::Design(DesignError::InvalidArg { .. }))
        ));
    }
}
