//! Sparse sheet storage with dependency tracking.
//!
//! The sheet owns every cell and both directions of the reference graph:
//! forward edges live in each formula's referenced-position list, backward
//! edges in each cell's dependent set. Edits go through a single protocol
//! that parses the new content, materializes referenced cells, rejects
//! cycles, rewires edges, and invalidates memoized values downstream -
//! in that order, so a failed edit leaves the sheet's logical state intact.

use log::{debug, trace};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::io::{self, Write};

use tabula_engine::{Formula, FormulaError, Position, Value};

use crate::cell::{Cell, CellContent, CellView, FORMULA_MARKER};
use crate::error::{Result, SheetError};

/// The printable rectangle: the smallest (rows, cols) covering every
/// written cell, anchored at A1.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Size {
    pub rows: usize,
    pub cols: usize,
}

/// A sparse spreadsheet.
#[derive(Default)]
pub struct Sheet {
    cells: HashMap<Position, Cell>,
    // Written coordinates, kept sorted so the printable size is the last
    // key of each map. Cells materialized only as reference placeholders
    // are not recorded here.
    rows_used: BTreeMap<usize, BTreeSet<usize>>,
    cols_used: BTreeMap<usize, BTreeSet<usize>>,
}

impl Sheet {
    pub fn new() -> Sheet {
        Sheet::default()
    }

    /// Set the content of a cell from source text.
    ///
    /// Empty text clears the content, text starting with `=` (and longer
    /// than the marker alone) is parsed as a formula, anything else is
    /// stored as literal text. Setting a cell to its current text is a
    /// no-op that preserves caches and edges.
    ///
    /// On error the sheet is unchanged, except that empty placeholder
    /// cells materialized for a rejected formula's references remain (they
    /// are not recorded as written, so the printable size is unaffected).
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<()> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }

        if let Some(cell) = self.cells.get(&pos) {
            if cell.content.text() == text {
                self.mark_used(pos);
                return Ok(());
            }
        }

        let content = Self::parse_content(text)?;
        if let CellContent::Formula { ref formula, .. } = content {
            for &target in formula.referenced_cells() {
                self.cells.entry(target).or_default();
            }
            self.check_cycle(pos, formula.referenced_cells())?;
        }

        self.install(pos, content);
        self.mark_used(pos);
        trace!("set {} to {:?}", pos, text);
        Ok(())
    }

    /// Look up the cell at `pos`. `None` for positions never materialized.
    pub fn cell(&self, pos: Position) -> Result<Option<CellView<'_>>> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        Ok(self
            .cells
            .get(&pos)
            .map(|cell| CellView { sheet: self, cell }))
    }

    /// Clear the cell at `pos`. A cell nothing references is removed
    /// outright; a referenced one is reset to empty and retained so its
    /// dependents still find it (and read a value error from it). Either
    /// way the position no longer counts as written.
    pub fn clear_cell(&mut self, pos: Position) -> Result<()> {
        if !pos.is_valid() {
            return Err(SheetError::InvalidPosition(pos));
        }
        let Some(cell) = self.cells.get(&pos) else {
            return Ok(());
        };

        if !cell.is_empty() {
            // Unwires the old out-edges and invalidates dependents.
            self.install(pos, CellContent::Empty);
        }
        if !self.cells[&pos].is_referenced() {
            self.cells.remove(&pos);
            trace!("removed {}", pos);
        }
        self.unmark_used(pos);
        Ok(())
    }

    /// The value of the cell at `pos` as a formula operand. Used by the
    /// evaluator as its position resolver.
    ///
    /// A position that was never touched reads as `0.0`; a cell that
    /// exists but is empty reads as a value error. Sparse sheets depend on
    /// this asymmetry.
    pub fn value_at(&self, pos: Position) -> std::result::Result<Value, FormulaError> {
        if !pos.is_valid() {
            return Err(FormulaError::Ref);
        }
        match self.cells.get(&pos) {
            Some(cell) => Ok(cell.content.value(self)),
            None => Ok(Value::Number(0.0)),
        }
    }

    /// The printable rectangle, `(0, 0)` when nothing is written.
    pub fn printable_size(&self) -> Size {
        Size {
            rows: self.rows_used.keys().next_back().map_or(0, |row| row + 1),
            cols: self.cols_used.keys().next_back().map_or(0, |col| col + 1),
        }
    }

    /// Print cell values over the printable rectangle: tab-separated
    /// columns, one line per row, absent cells as empty fields.
    pub fn print_values<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_grid(out, |cell| cell.content.value(self).to_string())
    }

    /// Print cell source texts over the printable rectangle, in the same
    /// layout as [`Sheet::print_values`].
    pub fn print_texts<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_grid(out, |cell| cell.content.text())
    }

    fn print_grid<W: Write>(
        &self,
        out: &mut W,
        render: impl Fn(&Cell) -> String,
    ) -> io::Result<()> {
        let size = self.printable_size();
        for row in 0..size.rows {
            for col in 0..size.cols {
                if col > 0 {
                    out.write_all(b"\t")?;
                }
                if let Some(cell) = self.cells.get(&Position::new(row, col)) {
                    out.write_all(render(cell).as_bytes())?;
                }
            }
            out.write_all(b"\n")?;
        }
        Ok(())
    }

    fn parse_content(text: &str) -> Result<CellContent> {
        if text.is_empty() {
            return Ok(CellContent::Empty);
        }
        match text.strip_prefix(FORMULA_MARKER) {
            // `=` alone is literal text, not an empty formula.
            Some(expression) if !expression.is_empty() => {
                let formula = Formula::parse(expression)?;
                Ok(CellContent::formula(formula))
            }
            _ => Ok(CellContent::Text(text.to_string())),
        }
    }

    /// Reject the proposed out-edges of `start` if installing them would
    /// close a cycle. Walks the current graph from the proposed neighbors;
    /// `start`'s own edges are not installed yet, so any path back to it
    /// is a pre-existing one - exactly the cycle condition.
    fn check_cycle(&self, start: Position, new_refs: &[Position]) -> Result<()> {
        if new_refs.contains(&start) {
            debug!("rejected self-reference at {}", start);
            return Err(SheetError::CircularDependency);
        }

        let mut visited: HashSet<Position> = HashSet::new();
        let mut stack: Vec<Position> = new_refs.to_vec();
        while let Some(pos) = stack.pop() {
            if !visited.insert(pos) {
                continue;
            }
            let Some(cell) = self.cells.get(&pos) else {
                continue;
            };
            for &next in cell.content.referenced_cells() {
                if next == start {
                    debug!("rejected circular dependency through {} at {}", pos, start);
                    return Err(SheetError::CircularDependency);
                }
                stack.push(next);
            }
        }
        Ok(())
    }

    /// Swap in new content at `pos`: rewire dependency edges from the old
    /// out-edges to the new ones, then invalidate memoized values
    /// downstream. Referenced cells are assumed to exist already.
    fn install(&mut self, pos: Position, content: CellContent) {
        let old_refs: Vec<Position> = self
            .cells
            .get(&pos)
            .map(|cell| cell.content.referenced_cells().to_vec())
            .unwrap_or_default();
        for target in old_refs {
            if let Some(cell) = self.cells.get_mut(&target) {
                cell.dependents.remove(&pos);
            }
        }
        for &target in content.referenced_cells() {
            let cell = self.cells.get_mut(&target).expect("referenced cell exists");
            cell.dependents.insert(pos);
        }

        self.cells.entry(pos).or_default().content = content;
        self.invalidate_from(pos);
    }

    /// Clear the memoized value at `start` and transitively at its
    /// dependents, pruning at any cell whose cache is already empty: its
    /// dependents were invalidated when it was, so the walk stays linear
    /// in the dirty set.
    fn invalidate_from(&self, start: Position) {
        let Some(cell) = self.cells.get(&start) else {
            return;
        };
        cell.content.clear_cache();

        let mut stack: Vec<Position> = cell.dependents.iter().copied().collect();
        while let Some(pos) = stack.pop() {
            let Some(cell) = self.cells.get(&pos) else {
                continue;
            };
            if !cell.content.cache_full() {
                continue;
            }
            cell.content.clear_cache();
            stack.extend(cell.dependents.iter().copied());
        }
    }

    fn mark_used(&mut self, pos: Position) {
        self.rows_used.entry(pos.row).or_default().insert(pos.col);
        self.cols_used.entry(pos.col).or_default().insert(pos.row);
    }

    fn unmark_used(&mut self, pos: Position) {
        if let Some(cols) = self.rows_used.get_mut(&pos.row) {
            cols.remove(&pos.col);
            if cols.is_empty() {
                self.rows_used.remove(&pos.row);
            }
        }
        if let Some(rows) = self.cols_used.get_mut(&pos.col) {
            rows.remove(&pos.row);
            if rows.is_empty() {
                self.cols_used.remove(&pos.col);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(s: &str) -> Position {
        s.parse().unwrap()
    }

    fn cache_full(sheet: &Sheet, at: &str) -> bool {
        sheet.cells[&pos(at)].content.cache_full()
    }

    #[test]
    fn test_placeholders_are_not_written() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B5+C7").unwrap();

        // The referenced cells exist, hold empty content, and carry the
        // back-edge - but only A1 counts as written.
        for target in ["B5", "C7"] {
            let view = sheet.cell(pos(target)).unwrap().expect("placeholder exists");
            assert!(view.is_empty());
            assert!(view.is_referenced());
        }
        assert_eq!(sheet.printable_size(), Size { rows: 1, cols: 1 });
    }

    #[test]
    fn test_set_same_text_preserves_cache() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "5").unwrap();
        sheet.set_cell(pos("A2"), "=A1*2").unwrap();

        assert!(!cache_full(&sheet, "A2"));
        assert_eq!(sheet.value_at(pos("A2")), Ok(Value::Number(10.0)));
        assert!(cache_full(&sheet, "A2"));

        sheet.set_cell(pos("A2"), "=A1*2").unwrap();
        assert!(cache_full(&sheet, "A2"), "idempotent set must keep the cache");

        sheet.set_cell(pos("A1"), "5").unwrap();
        assert!(cache_full(&sheet, "A2"), "idempotent upstream set must keep the cache");
    }

    #[test]
    fn test_invalidation_reaches_transitive_dependents() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "1").unwrap();
        sheet.set_cell(pos("B1"), "=A1+1").unwrap();
        sheet.set_cell(pos("C1"), "=B1+1").unwrap();

        assert_eq!(sheet.value_at(pos("C1")), Ok(Value::Number(3.0)));
        assert!(cache_full(&sheet, "B1") && cache_full(&sheet, "C1"));

        sheet.set_cell(pos("A1"), "10").unwrap();
        assert!(!cache_full(&sheet, "B1"));
        assert!(!cache_full(&sheet, "C1"));
        assert_eq!(sheet.value_at(pos("C1")), Ok(Value::Number(12.0)));
    }

    #[test]
    fn test_replacing_with_formula_invalidates_dependents() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "1").unwrap();
        sheet.set_cell(pos("B1"), "=A1+1").unwrap();
        assert_eq!(sheet.value_at(pos("B1")), Ok(Value::Number(2.0)));

        // The new content at A1 is itself a formula with an empty cache;
        // B1's memoized value must still be dropped.
        sheet.set_cell(pos("A1"), "=40+2").unwrap();
        assert!(!cache_full(&sheet, "B1"));
        assert_eq!(sheet.value_at(pos("B1")), Ok(Value::Number(43.0)));
    }

    #[test]
    fn test_repointing_formula_rewires_edges() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("B1"), "1").unwrap();
        sheet.set_cell(pos("C1"), "2").unwrap();
        sheet.set_cell(pos("A1"), "=B1").unwrap();
        sheet.set_cell(pos("A1"), "=C1").unwrap();

        assert!(!sheet.cell(pos("B1")).unwrap().unwrap().is_referenced());
        assert!(sheet.cell(pos("C1")).unwrap().unwrap().is_referenced());

        // B1 is no longer upstream of A1, so editing it must not disturb
        // A1's memoized value.
        assert_eq!(sheet.value_at(pos("A1")), Ok(Value::Number(2.0)));
        sheet.set_cell(pos("B1"), "9").unwrap();
        assert!(cache_full(&sheet, "A1"));
    }

    #[test]
    fn test_cycle_check_leaves_placeholders() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("A1"), "=B1").unwrap();
        sheet.set_cell(pos("B1"), "=C1").unwrap();
        let err = sheet.set_cell(pos("C1"), "=D1+A1").unwrap_err();
        assert!(matches!(err, SheetError::CircularDependency));

        // The rejected edit's resolution step materialized D1; it remains,
        // unwritten, and C1 keeps its previous (empty) content.
        assert!(sheet.cell(pos("D1")).unwrap().is_some());
        assert_eq!(sheet.printable_size(), Size { rows: 1, cols: 2 });
        assert_eq!(
            sheet.cell(pos("C1")).unwrap().unwrap().text(),
            "",
            "C1 was only ever a placeholder"
        );
    }

    #[test]
    fn test_empty_set_is_written() {
        let mut sheet = Sheet::new();
        sheet.set_cell(pos("B2"), "").unwrap();
        let view = sheet.cell(pos("B2")).unwrap().expect("cell materialized");
        assert!(view.is_empty());
        assert_eq!(sheet.printable_size(), Size { rows: 2, cols: 2 });
    }
}
