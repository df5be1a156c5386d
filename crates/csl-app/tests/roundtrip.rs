use csl_app::schema::*;
use csl_app::{load_study, parse_study, save_study, study_to_yaml, validate_study};
use proptest::prelude::*;

#[test]
fn roundtrip_yaml_default_example() {
    let study = Study::default_example();

    let temp_dir = std::env::temp_dir();
    let path = temp_dir.join("csl_app_roundtrip_example.yaml");

    save_study(&path, &study).unwrap();
    let loaded = load_study(&path).unwrap();

    assert_eq!(study, loaded);
}

#[test]
fn roundtrip_yaml_complex_poles_and_specs() {
    let mut study = Study::default_example();
    study.name = "complex".to_string();
    study.simulation = SimulationDef {
        samples: Some(200),
        integrator: IntegratorDef::Rk4,
        ..SimulationDef::default()
    };
    study.state_feedback = Some(StateFeedbackDef {
        poles: vec![],
        specs: Some(TransientSpecsDef {
            settling_time: 3.0,
            overshoot_pct: 4.3,
            gain_margin_db: 6.0,
            phase_margin_deg: 60.0,
        }),
        x0: None,
        t_final: None,
    });
    if let Some(obs) = study.observer.as_mut() {
        obs.poles = vec![
            PoleDef::Complex { re: -6.0, im: 2.0 },
            PoleDef::Complex { re: -6.0, im: -2.0 },
        ];
        obs.k = Some(vec![vec![1.0, 0.5]]);
    }

    let path = std::env::temp_dir().join("csl_app_roundtrip_complex.yaml");
    save_study(&path, &study).unwrap();
    assert_eq!(load_study(&path).unwrap(), study);
}

#[test]
fn hand_written_study() {
    let yaml = r#"
name: hand written
system:
  a: [[0, 1], [-2, -3]]
  b: [[0], [1]]
  c: [[1, 0]]
state_feedback:
  poles: [{re: -2, im: 1}, {re: -2, im: -1}]
pid:
  num: [1]
  den: [1, 1]
  ziegler_nichols: {ku: 4, tu: 2}
"#;
    let study = parse_study(yaml).unwrap();
    validate_study(&study).unwrap();
    assert_eq!(study.name, "hand written");
    assert_eq!(study.state_feedback.unwrap().poles.len(), 2);
    assert!(study.nonlinear.is_none());

    // Absent sections stay absent on the way out.
    let out = study_to_yaml(&parse_study(yaml).unwrap()).unwrap();
    assert!(!out.contains("nonlinear"));
    assert!(!out.contains("observer"));
}

#[test]
fn malformed_yaml_is_a_study_error() {
    let err = parse_study("system: [1, 2").unwrap_err();
    assert!(err.to_string().starts_with("Study error"));
}

proptest! {
    #[test]
    fn wrong_pole_count_never_validates(count in 0usize..6) {
        prop_assume!(count != 2);
        let mut study = Study::default_example();
        if let Some(obs) = study.observer.as_mut() {
            obs.poles = (0..count).map(|i| PoleDef::Real(-1.0 - i as f64)).collect();
        }
        prop_assert!(validate_study(&study).is_err());
    }
}
