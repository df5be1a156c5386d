use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Non-finite numeric value for {what}: {value}")]
    NonFinite { what: &'static str, value: f64 },

    #[error("Invalid argument: {what}")]
    InvalidArg { what: &'static str },

    #[error("Empty matrix: {what}")]
    Empty { what: &'static str },

    #[error("Ragged rows in {what}: row {row} has {found} columns, expected {expected}")]
    Ragged {
        what: &'static str,
        row: usize,
        expected: usize,
        found: usize,
    },
}
