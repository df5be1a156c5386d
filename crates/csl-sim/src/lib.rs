//! Trajectory simulation for controlsyslab.
//!
//! Provides:
//! - `Dynamics` trait for ẋ = g(t, x)
//! - Dormand-Prince 5(4) adaptive and fixed-step RK4 integrators
//! - A runner that samples trajectories on an evenly spaced grid
//! - Linear open/closed-loop, observer-augmented and step/impulse simulations

pub mod error;
pub mod integrator;
pub mod linear;
pub mod model;
pub mod sim;
pub mod trajectory;

pub use error::{SimError, SimResult};
pub use integrator::{DormandPrince54, Integrator, Rk4, StepOutcome};
pub use linear::{
    LinearDynamics, ObserverDynamics, impulse_response, simulate_closed_loop, simulate_observer,
    simulate_open_loop, step_response,
};
pub use model::{Dynamics, FnDynamics};
pub use sim::{IntegratorType, SimOptions, run_sim};
pub use trajectory::{ObserverTrajectory, Trajectory};
