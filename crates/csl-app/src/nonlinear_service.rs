//! Nonlinear simulation, linearization and Lyapunov service.

use csl_core::matrix_to_rows;
use csl_linear::eigenvalues;
use csl_symbolic::{NONLINEAR_SAMPLES, NonlinearSystem};
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::records::{NonlinearRecord, pole_records};
use crate::schema::Study;

pub fn nonlinear(study: &Study) -> AppResult<NonlinearRecord> {
    let def = study
        .nonlinear
        .as_ref()
        .ok_or(AppError::MissingSection("nonlinear"))?;
    let system = NonlinearSystem::from_strings(&def.states, &def.dynamics)?;

    let opts = study.simulation.options(NONLINEAR_SAMPLES);
    let traj = system.simulate(&def.x0, (0.0, def.t_final), &opts)?;

    let equilibrium = def
        .equilibrium
        .clone()
        .unwrap_or_else(|| vec![0.0; system.order()]);
    let jacobian = system.linearize_at(&equilibrium)?;
    let linearized_poles = eigenvalues(&jacobian)?;
    let jacobian_expr = system
        .jacobian()
        .iter()
        .map(|row| row.iter().map(ToString::to_string).collect())
        .collect();

    let (v_expr, dv_dt_expr) = match &def.lyapunov {
        Some(v) => {
            let pair = system.lyapunov_derivative(v)?;
            (Some(pair.v.to_string()), Some(pair.dv_dt.to_string()))
        }
        None => (None, None),
    };

    info!(
        order = system.order(),
        samples = traj.len(),
        linearized = %linearized_poles,
        "analyzed nonlinear system"
    );

    Ok(NonlinearRecord {
        states: traj.to_rows(),
        time: traj.time,
        equilibrium,
        jacobian_expr,
        jacobian: matrix_to_rows(&jacobian),
        linearized_poles: pole_records(&linearized_poles),
        v_expr,
        dv_dt_expr,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn van_der_pol_example() {
        let record = nonlinear(&Study::default_example()).unwrap();
        assert_eq!(record.time.len(), NONLINEAR_SAMPLES);
        assert_eq!(record.states.len(), 2);
        assert_eq!(record.jacobian, vec![vec![0.0, 1.0], vec![-1.0, 1.0]]);
        assert_eq!(record.jacobian_expr[1][0], "-1 - 2*x1*x2");
        assert_eq!(record.jacobian_expr[1][1], "1 - x1^2");
        // Unstable focus at the origin: 0.5 ± j·√3/2
        for p in &record.linearized_poles {
            assert!((p.re - 0.5).abs() < 1e-9);
        }
        assert_eq!(record.v_expr.as_deref(), Some("x1^2 + x2^2"));
        assert!(record.dv_dt_expr.is_some());
    }

    #[test]
    fn lyapunov_is_optional() {
        let mut study = Study::default_example();
        if let Some(nl) = study.nonlinear.as_mut() {
            nl.lyapunov = None;
            nl.equilibrium = None;
        }
        let record = nonlinear(&study).unwrap();
        assert!(record.v_expr.is_none());
        assert_eq!(record.equilibrium, vec![0.0, 0.0]);
    }
}
