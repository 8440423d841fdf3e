use crate::value::{TextMode, Value};
use std::cmp::Ordering;

///
/// CoercionId
///
/// How a leaf compares its property value against its operand.
///
/// NumericWiden compares across the Bool/Int/Float family; TextCasefold is
/// the default (case-insensitive) string mode and Strict the case-sensitive
/// one.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CoercionId {
    Strict,
    NumericWiden,
    TextCasefold,
}

impl CoercionId {
    #[must_use]
    pub const fn text_mode(self) -> TextMode {
        match self {
            Self::TextCasefold => TextMode::Ci,
            Self::Strict | Self::NumericWiden => TextMode::Cs,
        }
    }
}

/// Perform equality comparison under an explicit coercion.
///
/// Returns `None` if the comparison is not defined for the given values
/// (including any `Null` side).
#[must_use]
pub(crate) fn compare_eq(left: &Value, right: &Value, coercion: CoercionId) -> Option<bool> {
    if left.is_text() || right.is_text() {
        return left.text_eq(right, coercion.text_mode());
    }

    match coercion {
        CoercionId::NumericWiden => left.cmp_numeric(right).map(Ordering::is_eq),
        CoercionId::Strict | CoercionId::TextCasefold => {
            (left.label() == right.label() && !left.is_null()).then(|| left == right)
        }
    }
}

/// Perform ordering comparison under an explicit coercion.
///
/// Returns `None` if ordering is undefined for the given values.
#[must_use]
pub(crate) fn compare_order(left: &Value, right: &Value, coercion: CoercionId) -> Option<Ordering> {
    if left.is_text() || right.is_text() {
        return left.text_cmp(right, coercion.text_mode());
    }

    left.cmp_numeric(right)
}
