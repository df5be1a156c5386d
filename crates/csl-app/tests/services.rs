//! End-to-end runs of the built-in example study.

use csl_app::{OutputFormat, StudyReport, render, run_all, schema::Study};

#[test]
fn example_study_runs_every_section() {
    let report = run_all(&Study::default_example()).unwrap();

    let analysis = report.analysis.as_ref().unwrap();
    assert_eq!(analysis.poles.len(), 2);
    assert!(analysis.is_stable);

    let fb = report.state_feedback.as_ref().unwrap();
    assert_eq!(fb.method, "ackermann");
    // A - BK with poles {-2, -5}: K = [8, 4]
    assert!((fb.k[0][0] - 8.0).abs() < 1e-9);
    assert!((fb.k[0][1] - 4.0).abs() < 1e-9);
    assert_eq!(fb.closed_loop.time.len(), 500);
    let last_x1 = *fb.closed_loop.states[0].last().unwrap();
    assert!(last_x1.abs() < 1e-6);

    let obs = report.observer.as_ref().unwrap();
    let final_err: f64 = obs
        .estimation_error
        .iter()
        .map(|row| row.last().unwrap().abs())
        .fold(0.0, f64::max);
    assert!(final_err < 1e-6);

    let nl = report.nonlinear.as_ref().unwrap();
    assert_eq!(nl.jacobian, vec![vec![0.0, 1.0], vec![-1.0, 1.0]]);

    let pid = report.pid.as_ref().unwrap();
    assert!((pid.step_response.last().unwrap() - 1.0).abs() < 5e-3);
}

#[test]
fn partial_study_only_runs_its_sections() {
    let mut study = Study::default_example();
    study.system = None;
    study.state_feedback = None;
    study.observer = None;
    study.nonlinear = None;
    let report = run_all(&study).unwrap();
    assert!(report.analysis.is_none());
    assert!(report.nonlinear.is_none());
    assert!(report.pid.is_some());
}

#[test]
fn reports_render_in_both_formats() {
    let mut study = Study::default_example();
    study.nonlinear = None;
    study.pid = None;
    let report = run_all(&study).unwrap();

    let json = render(&report, OutputFormat::Json).unwrap();
    let back: StudyReport = serde_json::from_str(&json).unwrap();
    assert_eq!(back.name, "example");
    assert_eq!(back.state_feedback.unwrap().k.len(), 1);

    let yaml = render(&report, OutputFormat::Yaml).unwrap();
    assert!(yaml.contains("rank_wc: 2"));
}

#[test]
fn runs_are_deterministic() {
    let study = Study::default_example();
    assert_eq!(run_all(&study).unwrap(), run_all(&study).unwrap());
}
