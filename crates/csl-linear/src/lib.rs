//! Linear state-space analysis and design for controlsyslab.
//!
//! Provides:
//! - `StateSpaceModel`: validated (A, B, C, D) container
//! - Poles and tolerance-based stability verdicts
//! - Controllability/observability matrices with numerical rank tests
//! - Pole placement for state-feedback (K) and observer (L) gains
//! - Desired poles from settling-time and overshoot targets
//!
//! Every operation is a pure function of its inputs. Gains are returned as
//! values and threaded forward explicitly by the caller.

pub mod error;
pub mod model;
pub mod placement;
pub mod reachability;
pub mod specs;
pub mod stability;

pub use error::{LinearError, LinearResult, PlacementError};
pub use model::StateSpaceModel;
pub use placement::{
    PlacementMethod, PlacementOptions, PlacementResult, characteristic_coefficients,
    place_observer_gain, place_observer_gain_with, place_state_feedback,
    place_state_feedback_with,
};
pub use reachability::{
    ReachabilitySummary, controllability_matrix, controllability_matrix_of, is_controllable,
    is_controllable_pair, is_observable, observability_matrix, observability_matrix_of, rank,
    summary,
};
pub use specs::TransientSpecs;
pub use stability::{DEFAULT_STABILITY_TOL, eigenvalues, is_stable, poles, stability_margin};
