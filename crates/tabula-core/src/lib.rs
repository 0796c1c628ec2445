//! tabula-core - an in-memory spreadsheet engine.
//!
//! A [`Sheet`] is a sparse grid of cells holding literal text or arithmetic
//! formulas over A1-style references. The sheet keeps a bidirectional
//! dependency index between formula cells and the cells they reference,
//! rejects edits that would create reference cycles, and serves values
//! lazily with per-cell memoization that is invalidated transitively when
//! an upstream cell changes.
//!
//! ```
//! use tabula_core::{Position, Sheet, Value};
//!
//! let mut sheet = Sheet::new();
//! sheet.set_cell("A1".parse().unwrap(), "2").unwrap();
//! sheet.set_cell("A2".parse().unwrap(), "3").unwrap();
//! sheet.set_cell("A3".parse().unwrap(), "=A1+A2").unwrap();
//!
//! let a3: Position = "A3".parse().unwrap();
//! let view = sheet.cell(a3).unwrap().unwrap();
//! assert_eq!(view.value(), Value::Number(5.0));
//! assert_eq!(view.text(), "=A1+A2");
//! ```

mod cell;
mod error;
mod sheet;

pub use cell::{CellView, ESCAPE_MARKER, FORMULA_MARKER};
pub use error::{Result, SheetError};
pub use sheet::{Sheet, Size};

pub use tabula_engine::{Formula, FormulaError, ParseError, Position, Value, MAX_COLS, MAX_ROWS};
