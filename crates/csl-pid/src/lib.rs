//! PID compensator design for controlsyslab.
//!
//! Provides:
//! - `Polynomial` and `TransferFunction` (series, unity feedback, poles/zeros,
//!   controllable canonical realization)
//! - PID composition and Ziegler-Nichols tuning
//! - Closed-loop step response, tracking error, Bode and Nyquist data

pub mod compensator;
pub mod error;
pub mod polynomial;
pub mod response;
pub mod transfer_function;

pub use compensator::{PidCompensator, PidGains, compose, ziegler_nichols};
pub use error::{DesignError, DesignResult};
pub use polynomial::Polynomial;
pub use response::{
    FREQUENCY_DECADES, FREQUENCY_POINTS, FrequencyResponse, NyquistData, ResponseOptions,
    StepResponse, closed_loop, closed_loop_step_response, frequency_grid, frequency_response,
    frequency_response_on, nyquist, open_loop, tracking_error, unwrap_phase,
};
pub use transfer_function::TransferFunction;
