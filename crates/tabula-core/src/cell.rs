//! Cell content variants and per-cell dependency state.
//!
//! A cell's content is one of three variants:
//! - [`CellContent::Empty`] - no content; reads as a value error when
//!   referenced (a position that was never touched at all reads as zero
//!   instead, see [`Sheet::value_at`](crate::Sheet::value_at))
//! - [`CellContent::Text`] - literal text, displayed without a leading
//!   escape marker
//! - [`CellContent::Formula`] - a parsed formula with a memoized value

use std::cell::RefCell;
use std::collections::HashSet;

use tabula_engine::{Formula, FormulaError, Position, Value};

use crate::sheet::Sheet;

/// First character marking formula text (`=A1+1`).
pub const FORMULA_MARKER: char = '=';
/// Leading character that suppresses formula/number interpretation of text.
/// Stripped from the displayed value, retained in the stored text.
pub const ESCAPE_MARKER: char = '\'';

pub(crate) enum CellContent {
    Empty,
    Text(String),
    Formula {
        formula: Formula,
        // Memoized under `&Sheet` during recursive evaluation; the engine
        // is single-threaded, so interior mutability is all it takes.
        cache: RefCell<Option<Value>>,
    },
}

impl CellContent {
    pub(crate) fn formula(formula: Formula) -> CellContent {
        CellContent::Formula { formula, cache: RefCell::new(None) }
    }

    /// The value this content reports. Formula results, errors included,
    /// are computed on demand and cached.
    pub(crate) fn value(&self, sheet: &Sheet) -> Value {
        match self {
            CellContent::Empty => Value::Error(FormulaError::Value),
            CellContent::Text(text) => {
                let display = text.strip_prefix(ESCAPE_MARKER).unwrap_or(text);
                Value::Text(display.to_string())
            }
            CellContent::Formula { formula, cache } => {
                {
                    let cached = cache.borrow();
                    if let Some(value) = cached.as_ref() {
                        return value.clone();
                    }
                }
                let value = match formula.evaluate(&|pos| sheet.value_at(pos)) {
                    Ok(number) => Value::Number(number),
                    Err(err) => Value::Error(err),
                };
                *cache.borrow_mut() = Some(value.clone());
                value
            }
        }
    }

    /// The stored source text: empty, verbatim text, or `=` plus the
    /// canonical formula expression.
    pub(crate) fn text(&self) -> String {
        match self {
            CellContent::Empty => String::new(),
            CellContent::Text(text) => text.clone(),
            CellContent::Formula { formula, .. } => {
                format!("{}{}", FORMULA_MARKER, formula.expression())
            }
        }
    }

    /// Whether there is nothing left to invalidate here. Empty and text
    /// content always answer yes so that invalidation walks through them
    /// to their dependents.
    pub(crate) fn cache_full(&self) -> bool {
        match self {
            CellContent::Empty | CellContent::Text(_) => true,
            CellContent::Formula { cache, .. } => cache.borrow().is_some(),
        }
    }

    pub(crate) fn clear_cache(&self) {
        if let CellContent::Formula { cache, .. } = self {
            cache.borrow_mut().take();
        }
    }

    /// Positions this content references (outgoing dependency edges).
    pub(crate) fn referenced_cells(&self) -> &[Position] {
        match self {
            CellContent::Empty | CellContent::Text(_) => &[],
            CellContent::Formula { formula, .. } => formula.referenced_cells(),
        }
    }
}

/// A cell in the sheet: its content plus the positions of the formula
/// cells that reference it (incoming dependency edges). Back-references
/// are positions, never pointers; the sheet that owns every cell resolves
/// them on demand.
pub(crate) struct Cell {
    pub(crate) content: CellContent,
    pub(crate) dependents: HashSet<Position>,
}

impl Cell {
    pub(crate) fn is_empty(&self) -> bool {
        matches!(self.content, CellContent::Empty)
    }

    pub(crate) fn is_referenced(&self) -> bool {
        !self.dependents.is_empty()
    }
}

impl Default for Cell {
    fn default() -> Cell {
        Cell { content: CellContent::Empty, dependents: HashSet::new() }
    }
}

/// Read-only view of one cell, as returned by
/// [`Sheet::cell`](crate::Sheet::cell).
pub struct CellView<'a> {
    pub(crate) sheet: &'a Sheet,
    pub(crate) cell: &'a Cell,
}

impl CellView<'_> {
    /// The cell's current value. Lazy and memoized for formula cells.
    pub fn value(&self) -> Value {
        self.cell.content.value(self.sheet)
    }

    /// The cell's source text. Formula cells print canonically, with the
    /// `=` prefix.
    pub fn text(&self) -> String {
        self.cell.content.text()
    }

    /// Positions the cell's formula references, sorted and deduplicated.
    /// Empty for text and empty cells.
    pub fn referenced_cells(&self) -> &[Position] {
        self.cell.content.referenced_cells()
    }

    /// Whether the cell holds no content.
    pub fn is_empty(&self) -> bool {
        self.cell.is_empty()
    }

    /// Whether any formula cell references this one.
    pub fn is_referenced(&self) -> bool {
        self.cell.is_referenced()
    }
}
