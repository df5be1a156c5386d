//! csl-core: stable foundation for controlsyslab.
//!
//! Contains:
//! - numeric (Real + tolerances + float helpers + sample grids)
//! - matrix (nested-row conversion with shape checks)
//! - poles (PoleSet: ordered complex pole lists with tolerant comparison)
//! - error (shared error types)

pub mod error;
pub mod matrix;
pub mod numeric;
pub mod poles;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use matrix::{matrix_from_rows, matrix_to_rows, vector_from_slice};
pub use numeric::*;
pub use poles::{Complex64, PoleSet};
