use crate::{
    db::query::predicate::{
        CoercionId, CompareOp, ComparePredicate, Operand, Predicate,
        coercion::{compare_eq, compare_order},
    },
    model::PropertyId,
    traits::EntityKind,
    value::Value,
};
use std::cmp::Ordering;

///
/// Row
///
/// Abstraction over a row-like value that exposes properties by id.
/// This decouples condition evaluation from concrete entity types.
///

pub(crate) trait Row {
    fn value(&self, property: PropertyId) -> Value;
}

impl<E: EntityKind> Row for E {
    fn value(&self, property: PropertyId) -> Value {
        self.get_value(property)
    }
}

///
/// Evaluate a condition tree against a single row.
///
/// Any undefined comparison (null property, mismatched variants) simply
/// evaluates to `false`, for negated operators as well.
///
#[must_use]
pub(crate) fn eval<R: Row + ?Sized>(row: &R, predicate: &Predicate) -> bool {
    match predicate {
        Predicate::True => true,

        Predicate::And(children) => children.iter().all(|child| eval(row, child)),
        Predicate::Or(children) => children.iter().any(|child| eval(row, child)),

        Predicate::Compare(cmp) => eval_compare(&row.value(cmp.property), cmp),
        Predicate::IsNull { property, .. } => row.value(*property).is_null(),
        Predicate::NotNull { property, .. } => !row.value(*property).is_null(),
    }
}

fn eval_compare(actual: &Value, cmp: &ComparePredicate) -> bool {
    if actual.is_null() {
        return false;
    }

    let coercion = cmp.coercion;
    let mode = coercion.text_mode();

    match (cmp.op, &cmp.operand) {
        (CompareOp::Eq, Operand::Single(v)) => compare_eq(actual, v, coercion) == Some(true),
        (CompareOp::Ne, Operand::Single(v)) => compare_eq(actual, v, coercion) == Some(false),
        (CompareOp::Lt, Operand::Single(v)) => {
            compare_order(actual, v, coercion).is_some_and(Ordering::is_lt)
        }
        (CompareOp::Gt, Operand::Single(v)) => {
            compare_order(actual, v, coercion).is_some_and(Ordering::is_gt)
        }
        (CompareOp::Between, Operand::Pair(lo, hi)) => {
            compare_order(actual, lo, coercion).is_some_and(Ordering::is_ge)
                && compare_order(actual, hi, coercion).is_some_and(Ordering::is_le)
        }
        (CompareOp::In, Operand::List(items)) => in_list(actual, items, coercion) == Some(true),
        (CompareOp::NotIn, Operand::List(items)) => {
            in_list(actual, items, coercion) == Some(false)
        }
        (CompareOp::Contains, Operand::Single(v)) => {
            actual.text_contains(v, mode) == Some(true)
        }
        (CompareOp::StartsWith, Operand::Single(v)) => {
            actual.text_starts_with(v, mode) == Some(true)
        }
        (CompareOp::EndsWith, Operand::Single(v)) => {
            actual.text_ends_with(v, mode) == Some(true)
        }

        // Arity is validated on build and rebind; a mismatch never matches.
        _ => false,
    }
}

// `None` when no list element is comparable with the actual value.
fn in_list(actual: &Value, items: &[Value], coercion: CoercionId) -> Option<bool> {
    let mut comparable = items.is_empty();
    for item in items {
        match compare_eq(actual, item, coercion) {
            Some(true) => return Some(true),
            Some(false) => comparable = true,
            None => {}
        }
    }

    comparable.then_some(false)
}
