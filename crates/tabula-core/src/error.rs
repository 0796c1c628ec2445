//! Error types for sheet edits.

use tabula_engine::{ParseError, Position};
use thiserror::Error;

/// Errors that abort a sheet operation and leave its logical state intact.
///
/// Evaluation errors are not here: they are values
/// ([`Value::Error`](tabula_engine::Value::Error)) surfaced through reads.
#[derive(Error, Debug)]
pub enum SheetError {
    #[error("Invalid cell position: {0:?}")]
    InvalidPosition(Position),

    #[error("Formula syntax error: {0}")]
    FormulaSyntax(#[from] ParseError),

    #[error("Circular dependency detected")]
    CircularDependency,
}

pub type Result<T> = std::result::Result<T, SheetError>;
