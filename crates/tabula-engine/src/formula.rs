//! The parsed-formula handle.

use crate::ast::Expr;
use crate::parser::{parse_expression, ParseError};
use crate::position::Position;
use crate::value::{FormulaError, Value};

/// A parsed formula expression.
///
/// Owns the expression tree opaquely and exposes the three operations the
/// sheet needs: evaluation against a position resolver, canonical printing,
/// and the list of referenced positions.
#[derive(Clone, Debug, PartialEq)]
pub struct Formula {
    expr: Expr,
    referenced: Vec<Position>,
}

impl Formula {
    /// Parse an expression (without the leading `=`).
    pub fn parse(expression: &str) -> Result<Formula, ParseError> {
        let expr = parse_expression(expression)?;

        // Out-of-bounds references stay in the tree (they print back and
        // evaluate to a Ref error) but cannot name cells, so they are not
        // part of the dependency surface.
        let mut referenced = Vec::new();
        expr.collect_references(&mut referenced);
        referenced.retain(Position::is_valid);
        referenced.sort();
        referenced.dedup();

        Ok(Formula { expr, referenced })
    }

    /// Evaluate against a resolver that maps positions to cell values.
    pub fn evaluate(
        &self,
        resolve: &dyn Fn(Position) -> Result<Value, FormulaError>,
    ) -> Result<f64, FormulaError> {
        self.expr.evaluate(resolve)
    }

    /// The canonical expression text, without the leading `=`.
    pub fn expression(&self) -> String {
        self.expr.to_string()
    }

    /// Referenced in-bounds positions, sorted and deduplicated.
    pub fn referenced_cells(&self) -> &[Position] {
        &self.referenced
    }
}
