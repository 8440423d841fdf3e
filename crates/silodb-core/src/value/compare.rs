use crate::value::{TextMode, Value};
use std::cmp::Ordering;

/// Numeric comparison across the Bool/Int/Float family.
///
/// Int/Int compares exactly; any Float side widens both to f64.
/// Returns `None` for non-numeric operands or NaN.
#[must_use]
pub fn numeric_cmp(left: &Value, right: &Value) -> Option<Ordering> {
    match (left, right) {
        (Value::Float(_), _) | (_, Value::Float(_)) => {
            left.as_f64()?.partial_cmp(&right.as_f64()?)
        }
        _ => Some(left.as_int()?.cmp(&right.as_int()?)),
    }
}

/// Total collation used for result ordering.
///
/// Numbers compare numerically. Text compares under `mode`; in
/// case-insensitive mode ties fall back to raw codepoint order so that
/// "BAR" and "bar" sort adjacently but deterministically.
/// Null handling is left to the caller.
#[must_use]
pub fn collate_cmp(left: &Value, right: &Value, mode: TextMode) -> Ordering {
    if let Some(ord) = numeric_cmp(left, right) {
        return ord;
    }

    match (left, right) {
        (Value::Text(a), Value::Text(b)) => match mode {
            TextMode::Cs => a.cmp(b),
            TextMode::Ci => left
                .text_cmp(right, TextMode::Ci)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.cmp(b)),
        },
        _ => rank(left).cmp(&rank(right)),
    }
}

// Mixed-variant fallback: rank-only and deterministic.
const fn rank(value: &Value) -> u8 {
    match value {
        Value::Null => 0,
        Value::Bool(_) | Value::Int(_) | Value::Float(_) => 1,
        Value::Text(_) => 2,
        Value::List(_) => 3,
    }
}
