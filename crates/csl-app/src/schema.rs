//! Study file schema definitions.

use csl_core::{Complex64, PoleSet};
use csl_linear::TransientSpecs;
use csl_pid::PidGains;
use csl_sim::{IntegratorType, SimOptions};
use serde::{Deserialize, Serialize};

/// One analysis session: a plant plus whichever designs to run on it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Study {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default)]
    pub simulation: SimulationDef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system: Option<SystemDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_feedback: Option<StateFeedbackDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observer: Option<ObserverDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonlinear: Option<NonlinearDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<PidDef>,
}

fn default_name() -> String {
    "untitled".to_string()
}

/// State-space matrices as nested rows. D defaults to zeros.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SystemDef {
    pub a: Vec<Vec<f64>>,
    pub b: Vec<Vec<f64>>,
    pub c: Vec<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Vec<Vec<f64>>>,
}

/// A pole written either as a real number or as `{re, im}`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum PoleDef {
    Real(f64),
    Complex { re: f64, im: f64 },
}

impl PoleDef {
    pub fn to_complex(self) -> Complex64 {
        match self {
            PoleDef::Real(re) => Complex64::new(re, 0.0),
            PoleDef::Complex { re, im } => Complex64::new(re, im),
        }
    }
}

pub fn pole_set(poles: &[PoleDef]) -> PoleSet {
    PoleSet::new(poles.iter().map(|p| p.to_complex()).collect())
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StateFeedbackDef {
    /// Explicit desired poles; takes precedence over `specs`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub poles: Vec<PoleDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub specs: Option<TransientSpecsDef>,
    /// Initial state; defaults to e₁.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x0: Option<Vec<f64>>,
    /// Simulation end time; derived from `specs` or 10 s when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t_final: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TransientSpecsDef {
    #[serde(default = "default_settling_time")]
    pub settling_time: f64,
    #[serde(default = "default_overshoot")]
    pub overshoot_pct: f64,
    #[serde(default)]
    pub gain_margin_db: f64,
    #[serde(default)]
    pub phase_margin_deg: f64,
}

fn default_settling_time() -> f64 {
    2.0
}

fn default_overshoot() -> f64 {
    10.0
}

impl From<TransientSpecsDef> for TransientSpecs {
    fn from(def: TransientSpecsDef) -> Self {
        TransientSpecs {
            settling_time: def.settling_time,
            overshoot_pct: def.overshoot_pct,
            gain_margin_db: def.gain_margin_db,
            phase_margin_deg: def.phase_margin_deg,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ObserverDef {
    pub poles: Vec<PoleDef>,
    /// State-feedback gain applied to the estimate. Falls back to the
    /// `state_feedback` design, then to zero.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub k: Option<Vec<Vec<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x0: Option<Vec<f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub xhat0: Option<Vec<f64>>,
    #[serde(default = "default_linear_t_final")]
    pub t_final: f64,
}

fn default_linear_t_final() -> f64 {
    10.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NonlinearDef {
    pub states: Vec<String>,
    pub dynamics: Vec<String>,
    pub x0: Vec<f64>,
    #[serde(default = "default_nonlinear_t_final")]
    pub t_final: f64,
    /// Linearization point; defaults to the origin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equilibrium: Option<Vec<f64>>,
    /// Lyapunov candidate V(x).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lyapunov: Option<String>,
}

fn default_nonlinear_t_final() -> f64 {
    20.0
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PidDef {
    pub num: Vec<f64>,
    pub den: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gains: Option<PidGains>,
    /// Ziegler-Nichols tuning, used when `gains` is absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ziegler_nichols: Option<ZieglerNicholsDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizon: Option<f64>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ZieglerNicholsDef {
    pub ku: f64,
    pub tu: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum IntegratorDef {
    #[default]
    DormandPrince,
    Rk4,
}

/// Integration settings shared by every simulated section.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimulationDef {
    /// Output samples; 500 for linear runs and 1000 for nonlinear runs
    /// when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub samples: Option<usize>,
    #[serde(default = "default_rtol")]
    pub rtol: f64,
    #[serde(default = "default_atol")]
    pub atol: f64,
    #[serde(default)]
    pub integrator: IntegratorDef,
}

fn default_rtol() -> f64 {
    SimOptions::default().rtol
}

fn default_atol() -> f64 {
    SimOptions::default().atol
}

impl Default for SimulationDef {
    fn default() -> Self {
        Self {
            samples: None,
            rtol: default_rtol(),
            atol: default_atol(),
            integrator: IntegratorDef::default(),
        }
    }
}

impl SimulationDef {
    /// Solver options, with `fallback_samples` when none are configured.
    pub fn options(&self, fallback_samples: usize) -> SimOptions {
        SimOptions {
            samples: self.samples.unwrap_or(fallback_samples),
            rtol: self.rtol,
            atol: self.atol,
            integrator: match self.integrator {
                IntegratorDef::DormandPrince => IntegratorType::DormandPrince,
                IntegratorDef::Rk4 => IntegratorType::Rk4,
            },
            ..SimOptions::default()
        }
    }
}

impl Study {
    /// The built-in example: a damped second-order plant, a Van der Pol
    /// oscillator and a PID loop.
    pub fn default_example() -> Self {
        Study {
            name: "example".to_string(),
            simulation: SimulationDef::default(),
            system: Some(SystemDef {
                a: vec![vec![0.0, 1.0], vec![-2.0, -3.0]],
                b: vec![vec![0.0], vec![1.0]],
                c: vec![vec![1.0, 0.0]],
                d: Some(vec![vec![0.0]]),
            }),
            state_feedback: Some(StateFeedbackDef {
                poles: vec![PoleDef::Real(-2.0), PoleDef::Real(-5.0)],
                specs: None,
                x0: Some(vec![1.0, 0.0]),
                t_final: Some(10.0),
            }),
            observer: Some(ObserverDef {
                poles: vec![PoleDef::Real(-8.0), PoleDef::Real(-9.0)],
                k: None,
                x0: Some(vec![1.0, 0.0]),
                xhat0: Some(vec![0.0, 0.0]),
                t_final: 10.0,
            }),
            nonlinear: Some(NonlinearDef {
                states: vec!["x1".to_string(), "x2".to_string()],
                dynamics: vec!["x2".to_string(), "-x1 + (1 - x1^2)*x2".to_string()],
                x0: vec![1.5, 0.0],
                t_final: 20.0,
                equilibrium: Some(vec![0.0, 0.0]),
                lyapunov: Some("x1^2 + x2^2".to_string()),
            }),
            pid: Some(PidDef {
                num: vec![1.0],
                den: vec![1.0, 3.0, 2.0],
                gains: Some(PidGains {
                    kp: 2.0,
                    ki: 1.0,
                    kd: 0.5,
                }),
                ziegler_nichols: None,
                horizon: None,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn poles_accept_real_or_complex() {
        let poles: Vec<PoleDef> = serde_yaml::from_str("[-2, {re: -1, im: 3}]").unwrap();
        assert_eq!(
            poles,
            vec![PoleDef::Real(-2.0), PoleDef::Complex { re: -1.0, im: 3.0 }]
        );
        let set = pole_set(&poles);
        assert_eq!(set.as_slice()[1], Complex64::new(-1.0, 3.0));
    }

    #[test]
    fn sparse_study_fills_defaults() {
        let yaml = "system:\n  a: [[-1]]\n  b: [[1]]\n  c: [[1]]\n";
        let study: Study = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(study.name, "untitled");
        assert_eq!(study.simulation, SimulationDef::default());
        assert!(study.system.as_ref().unwrap().d.is_none());
        assert!(study.pid.is_none());
    }

    #[test]
    fn simulation_options_fall_back() {
        let sim = SimulationDef {
            integrator: IntegratorDef::Rk4,
            ..SimulationDef::default()
        };
        let opts = sim.options(1000);
        assert_eq!(opts.samples, 1000);
        assert_eq!(opts.integrator, IntegratorType::Rk4);
        let yaml = "integrator: rk4\nsamples: 50\n";
        let parsed: SimulationDef = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(parsed.options(1000).samples, 50);
    }

    #[test]
    fn specs_use_documented_defaults() {
        let def: TransientSpecsDef = serde_yaml::from_str("phase_margin_deg: 45").unwrap();
        let specs = TransientSpecs::from(def);
        assert_eq!(specs.settling_time, 2.0);
        assert_eq!(specs.overshoot_pct, 10.0);
        assert_eq!(specs.phase_margin_deg, 45.0);
    }
}
