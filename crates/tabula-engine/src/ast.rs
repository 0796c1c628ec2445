//! Formula expression tree: evaluation and canonical printing.

use std::fmt;

use crate::position::Position;
use crate::value::{FormulaError, Value};

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum UnaryOp {
    Plus,
    Minus,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
}

impl BinaryOp {
    fn symbol(self) -> char {
        match self {
            BinaryOp::Add => '+',
            BinaryOp::Sub => '-',
            BinaryOp::Mul => '*',
            BinaryOp::Div => '/',
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub(crate) enum Expr {
    Number(f64),
    Reference(Position),
    Unary(UnaryOp, Box<Expr>),
    Binary(BinaryOp, Box<Expr>, Box<Expr>),
}

// Precedence levels for canonical printing. Atoms never need parentheses.
const PREC_ADD: u8 = 1;
const PREC_MUL: u8 = 2;
const PREC_UNARY: u8 = 3;
const PREC_ATOM: u8 = 4;

impl Expr {
    /// Evaluate against a resolver that maps positions to cell values.
    ///
    /// Reference operands go through [`Value::as_number`]; division by zero
    /// and non-finite results are arithmetic errors.
    pub(crate) fn evaluate(
        &self,
        resolve: &dyn Fn(Position) -> Result<Value, FormulaError>,
    ) -> Result<f64, FormulaError> {
        match self {
            Expr::Number(n) => Ok(*n),
            Expr::Reference(pos) => resolve(*pos)?.as_number(),
            Expr::Unary(op, operand) => {
                let value = operand.evaluate(resolve)?;
                Ok(match op {
                    UnaryOp::Plus => value,
                    UnaryOp::Minus => -value,
                })
            }
            Expr::Binary(op, lhs, rhs) => {
                let lhs = lhs.evaluate(resolve)?;
                let rhs = rhs.evaluate(resolve)?;
                let result = match op {
                    BinaryOp::Add => lhs + rhs,
                    BinaryOp::Sub => lhs - rhs,
                    BinaryOp::Mul => lhs * rhs,
                    BinaryOp::Div => {
                        if rhs == 0.0 {
                            return Err(FormulaError::Arithmetic);
                        }
                        lhs / rhs
                    }
                };
                if result.is_finite() {
                    Ok(result)
                } else {
                    Err(FormulaError::Arithmetic)
                }
            }
        }
    }

    /// Append every referenced position, in occurrence order.
    pub(crate) fn collect_references(&self, out: &mut Vec<Position>) {
        match self {
            Expr::Number(_) => {}
            Expr::Reference(pos) => out.push(*pos),
            Expr::Unary(_, operand) => operand.collect_references(out),
            Expr::Binary(_, lhs, rhs) => {
                lhs.collect_references(out);
                rhs.collect_references(out);
            }
        }
    }

    fn precedence(&self) -> u8 {
        match self {
            Expr::Number(_) | Expr::Reference(_) => PREC_ATOM,
            Expr::Unary(..) => PREC_UNARY,
            Expr::Binary(BinaryOp::Add | BinaryOp::Sub, ..) => PREC_ADD,
            Expr::Binary(BinaryOp::Mul | BinaryOp::Div, ..) => PREC_MUL,
        }
    }

    fn fmt_child(&self, f: &mut fmt::Formatter<'_>, parens: bool) -> fmt::Result {
        if parens {
            write!(f, "({})", self)
        } else {
            write!(f, "{}", self)
        }
    }
}

/// Canonical form: the minimal parenthesization that reparses to the same
/// tree. A subexpression is wrapped when its precedence is below its
/// parent's, or equal on the right of `-`/`/` (left-associativity).
impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Number(n) => write!(f, "{}", n),
            Expr::Reference(pos) => write!(f, "{}", pos),
            Expr::Unary(op, operand) => {
                f.write_str(match op {
                    UnaryOp::Plus => "+",
                    UnaryOp::Minus => "-",
                })?;
                operand.fmt_child(f, operand.precedence() < PREC_UNARY)
            }
            Expr::Binary(op, lhs, rhs) => {
                let prec = self.precedence();
                lhs.fmt_child(f, lhs.precedence() < prec)?;
                write!(f, "{}", op.symbol())?;
                let rhs_parens = rhs.precedence() < prec
                    || (rhs.precedence() == prec
                        && matches!(op, BinaryOp::Sub | BinaryOp::Div));
                rhs.fmt_child(f, rhs_parens)
            }
        }
    }
}
