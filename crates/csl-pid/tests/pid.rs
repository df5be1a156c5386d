//! Integration tests: PID loop around 1/(s² + 3s + 2).

use csl_pid::{
    FREQUENCY_POINTS, ResponseOptions, TransferFunction, closed_loop, closed_loop_step_response,
    compose, frequency_response, nyquist, open_loop, tracking_error, ziegler_nichols,
};
use proptest::prelude::*;

fn plant() -> TransferFunction {
    TransferFunction::new(vec![1.0], vec![1.0, 3.0, 2.0]).unwrap()
}

#[test]
fn pid_step_response_converges_to_one() {
    let c = compose(2.0, 1.0, 0.5).unwrap();
    let resp = closed_loop_step_response(&plant(), Some(&c), &ResponseOptions::default()).unwrap();

    assert_eq!(resp.time.len(), 500);
    assert_eq!(resp.output[0], 0.0);
    let last = *resp.output.last().unwrap();
    assert!((last - 1.0).abs() < 5e-3, "y(T) = {last}");

    let (_, err) = tracking_error(&plant(), Some(&c), &ResponseOptions::default()).unwrap();
    assert!(err.last().unwrap().abs() < 5e-3);
    assert_eq!(err[0], 1.0);
}

#[test]
fn longer_horizon_tightens_convergence() {
    let c = compose(2.0, 1.0, 0.5).unwrap();
    let opts = ResponseOptions {
        horizon: Some(60.0),
        ..ResponseOptions::default()
    };
    let resp = closed_loop_step_response(&plant(), Some(&c), &opts).unwrap();
    assert!((resp.output.last().unwrap() - 1.0).abs() < 1e-4);
}

#[test]
fn open_and_closed_loop_structure() {
    let c = compose(2.0, 1.0, 0.5).unwrap();
    let ol = open_loop(&plant(), Some(&c)).unwrap();
    assert_eq!(ol.num().coeffs(), &[0.5, 2.0, 1.0]);
    assert_eq!(ol.den().coeffs(), &[1.0, 3.0, 2.0, 0.0]);

    let cl = closed_loop(&plant(), Some(&c)).unwrap();
    assert_eq!(cl.den().coeffs(), &[1.0, 3.5, 4.0, 1.0]);
    assert_eq!(cl.dc_gain(), Some(1.0));

    let poles = ol.poles().unwrap();
    assert_eq!(poles.len(), 3);
    assert!(poles.iter().any(|p| p.norm() < 1e-9));
    assert_eq!(ol.zeros().unwrap().len(), 2);
}

#[test]
fn bode_data_on_log_grid() {
    let c = compose(2.0, 1.0, 0.5).unwrap();
    let fr = frequency_response(&plant(), Some(&c)).unwrap();

    assert_eq!(fr.omega.len(), FREQUENCY_POINTS);
    assert!((fr.omega[0] - 1e-2).abs() < 1e-15);
    assert!((fr.omega[FREQUENCY_POINTS - 1] - 1e2).abs() < 1e-10);
    // Integrator: phase near -90° at low frequency, magnitude ≈ Ki/(2ω).
    assert!((fr.phase_deg()[0] + 90.0).abs() < 5.0);
    assert!((fr.magnitude[0] - 0.5 / 1e-2).abs() / (0.5 / 1e-2) < 0.05);
    for w in fr.phase.windows(2) {
        assert!((w[1] - w[0]).abs() < std::f64::consts::PI);
    }
    // High frequency: Kd s / s² → 0.5/ω.
    let last_db = *fr.magnitude_db().last().unwrap();
    assert!((last_db - 20.0 * (0.5f64 / 100.0).log10()).abs() < 0.5);
}

#[test]
fn nyquist_matches_bode_magnitude() {
    let c = compose(2.0, 1.0, 0.5).unwrap();
    let ny = nyquist(&plant(), Some(&c)).unwrap();
    let fr = frequency_response(&plant(), Some(&c)).unwrap();
    for k in [0, 250, 999] {
        let mag = ny.real[k].hypot(ny.imag[k]);
        assert!((mag - fr.magnitude[k]).abs() <= 1e-12 * (1.0 + mag));
    }
}

#[test]
fn ziegler_nichols_gains_compose() {
    let gains = ziegler_nichols(4.0, 1.5).unwrap();
    let c = gains.compose().unwrap();
    assert_eq!(c.gains(), gains);
}

proptest! {
    #[test]
    fn stable_pi_loops_track_steps(kp in 0.5f64..5.0, ki in 0.2f64..2.0) {
        let c = compose(kp, ki, 0.0).unwrap();
        let cl = closed_loop(&plant(), Some(&c)).unwrap();
        // Routh-Hurwitz for s³ + 3s² + (2 + kp)s + ki
        prop_assume!(3.0 * (2.0 + kp) > ki);
        let max_re = cl.poles().unwrap().max_real_part().unwrap();
        prop_assert!(max_re < 0.0);
        prop_assert_eq!(cl.dc_gain(), Some(1.0));
    }
}
