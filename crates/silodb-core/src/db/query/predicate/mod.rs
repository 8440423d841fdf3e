//! Condition tree: AST, coercion rules and row evaluation.

mod ast;
mod coercion;
mod eval;


pub use ast::{CompareOp, ComparePredicate, Operand, OperandArity, Predicate};
pub use coercion::CoercionId;
pub(crate) use coercion::{compare_eq, compare_order};
pub(crate) use eval::{Row, eval};
