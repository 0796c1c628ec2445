//! Cell values and the evaluation error taxonomy.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// An error produced while evaluating a formula.
///
/// These are values, not control flow: evaluation yields them as the
/// [`Value::Error`] variant and they are cached like any other result. The
/// `Display` form is the rendered error code.
#[derive(Clone, Copy, Debug, Error, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum FormulaError {
    /// Reference to a position outside the sheet bounds.
    #[error("#REF!")]
    Ref,
    /// Operand is non-numeric text or an empty cell.
    #[error("#VALUE!")]
    Value,
    /// Division by zero or a non-finite arithmetic result.
    #[error("#ARITHM!")]
    Arithmetic,
}

/// The value a cell reports when read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Text(String),
    Error(FormulaError),
}

impl Value {
    /// Coerce to a number for use as a formula operand: text that parses as
    /// a number counts, empty text counts as zero, anything else is a value
    /// error. Errors pass through unchanged.
    pub fn as_number(&self) -> Result<f64, FormulaError> {
        match self {
            Value::Number(n) => Ok(*n),
            Value::Text(s) if s.is_empty() => Ok(0.0),
            Value::Text(s) => s.trim().parse::<f64>().map_err(|_| FormulaError::Value),
            Value::Error(err) => Err(*err),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => f.write_str(s),
            Value::Error(err) => write!(f, "{}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(FormulaError::Ref.to_string(), "#REF!");
        assert_eq!(FormulaError::Value.to_string(), "#VALUE!");
        assert_eq!(FormulaError::Arithmetic.to_string(), "#ARITHM!");
    }

    #[test]
    fn test_number_display_uses_shortest_form() {
        assert_eq!(Value::Number(5.0).to_string(), "5");
        assert_eq!(Value::Number(2.5).to_string(), "2.5");
        assert_eq!(Value::Number(-0.25).to_string(), "-0.25");
    }

    #[test]
    fn test_as_number_coercion() {
        assert_eq!(Value::Number(7.0).as_number(), Ok(7.0));
        assert_eq!(Value::Text(String::new()).as_number(), Ok(0.0));
        assert_eq!(Value::Text("42".into()).as_number(), Ok(42.0));
        assert_eq!(Value::Text(" 1.5 ".into()).as_number(), Ok(1.5));
        assert_eq!(Value::Text("abc".into()).as_number(), Err(FormulaError::Value));
        assert_eq!(
            Value::Error(FormulaError::Ref).as_number(),
            Err(FormulaError::Ref)
        );
    }
}
