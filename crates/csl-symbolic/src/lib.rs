//! Symbolic expressions and nonlinear system analysis for controlsyslab.
//!
//! Provides:
//! - A fixed expression grammar (`+ - * / ^`, unary minus, `sin cos exp ln sqrt`)
//! - Expression trees with simplification, differentiation and substitution
//! - Compilation to a stack program for fast repeated evaluation
//! - `NonlinearSystem`: simulation, Jacobian linearization, Lyapunov derivatives

pub mod compile;
pub mod error;
pub mod expr;
pub mod nonlinear;
pub mod parser;

pub use compile::{Op, Program};
pub use error::{SymbolicError, SymbolicResult};
pub use expr::{Expr, Func};
pub use nonlinear::{LyapunovPair, NONLINEAR_SAMPLES, NonlinearSystem};
pub use parser::{parse, parse_with_symbols};
