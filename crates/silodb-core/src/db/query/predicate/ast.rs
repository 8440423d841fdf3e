use crate::{db::query::predicate::coercion::CoercionId, model::PropertyId, value::Value};
use std::ops::{BitAnd, BitOr};

///
/// Condition AST
///
/// Schema-agnostic representation of a compiled condition tree. Its shape
/// is fixed once a query is built; only leaf operands are rebound.
///

///
/// CompareOp
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum CompareOp {
    Eq = 0x01,
    Ne = 0x02,
    Lt = 0x03,
    Gt = 0x04,
    Between = 0x05,
    In = 0x06,
    NotIn = 0x07,
    Contains = 0x08,
    StartsWith = 0x09,
    EndsWith = 0x0a,
}

impl CompareOp {
    #[must_use]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Eq => "equal",
            Self::Ne => "not_equal",
            Self::Lt => "less",
            Self::Gt => "greater",
            Self::Between => "between",
            Self::In => "in",
            Self::NotIn => "not_in",
            Self::Contains => "contains",
            Self::StartsWith => "starts_with",
            Self::EndsWith => "ends_with",
        }
    }

    /// Operand shape the operator was declared with; rebinding must match it.
    #[must_use]
    pub const fn arity(self) -> OperandArity {
        match self {
            Self::Between => OperandArity::Pair,
            Self::In | Self::NotIn => OperandArity::List,
            _ => OperandArity::Single,
        }
    }

    /// Operators that are only defined over text properties.
    #[must_use]
    pub const fn is_text_only(self) -> bool {
        matches!(self, Self::Contains | Self::StartsWith | Self::EndsWith)
    }

    /// Operators that are only defined over numeric properties.
    #[must_use]
    pub const fn is_numeric_only(self) -> bool {
        matches!(self, Self::Between)
    }
}

///
/// OperandArity
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum OperandArity {
    Single,
    Pair,
    List,
}

///
/// Operand
/// Bound value(s) of one leaf condition.
///

#[derive(Clone, Debug, PartialEq)]
pub enum Operand {
    Single(Value),
    Pair(Value, Value),
    List(Vec<Value>),
}

impl Operand {
    #[must_use]
    pub const fn arity(&self) -> OperandArity {
        match self {
            Self::Single(_) => OperandArity::Single,
            Self::Pair(..) => OperandArity::Pair,
            Self::List(_) => OperandArity::List,
        }
    }

    /// All scalar values carried by the operand, in declaration order.
    #[must_use]
    pub fn values(&self) -> Vec<&Value> {
        match self {
            Self::Single(v) => vec![v],
            Self::Pair(lo, hi) => vec![lo, hi],
            Self::List(items) => items.iter().collect(),
        }
    }

    #[must_use]
    pub fn has_null(&self) -> bool {
        match self {
            Self::Single(v) => v.is_null(),
            Self::Pair(lo, hi) => lo.is_null() || hi.is_null(),
            Self::List(items) => items.iter().any(Value::is_null),
        }
    }
}

///
/// ComparePredicate
///

#[derive(Clone, Debug, PartialEq)]
pub struct ComparePredicate {
    pub property: PropertyId,
    pub name: &'static str,
    pub op: CompareOp,
    pub operand: Operand,
    pub coercion: CoercionId,
    pub alias: Option<String>,
}

impl ComparePredicate {
    #[must_use]
    pub const fn new(
        property: PropertyId,
        name: &'static str,
        op: CompareOp,
        operand: Operand,
        coercion: CoercionId,
    ) -> Self {
        Self {
            property,
            name,
            op,
            operand,
            coercion,
            alias: None,
        }
    }
}

///
/// Predicate
///

#[derive(Clone, Debug, PartialEq)]
pub enum Predicate {
    True,
    And(Vec<Self>),
    Or(Vec<Self>),
    Compare(ComparePredicate),
    IsNull {
        property: PropertyId,
        name: &'static str,
    },
    NotNull {
        property: PropertyId,
        name: &'static str,
    },
}

impl Predicate {
    #[must_use]
    pub const fn and(preds: Vec<Self>) -> Self {
        Self::And(preds)
    }

    #[must_use]
    pub const fn or(preds: Vec<Self>) -> Self {
        Self::Or(preds)
    }

    /// Visit every comparison leaf in tree order.
    pub fn for_each_compare(&self, f: &mut impl FnMut(&ComparePredicate)) {
        match self {
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.for_each_compare(f);
                }
            }
            Self::Compare(cmp) => f(cmp),
            Self::True | Self::IsNull { .. } | Self::NotNull { .. } => {}
        }
    }

    /// Mutable twin of `for_each_compare`; used to rebind operands in place.
    pub fn for_each_compare_mut(&mut self, f: &mut impl FnMut(&mut ComparePredicate)) {
        match self {
            Self::And(children) | Self::Or(children) => {
                for child in children {
                    child.for_each_compare_mut(f);
                }
            }
            Self::Compare(cmp) => f(cmp),
            Self::True | Self::IsNull { .. } | Self::NotNull { .. } => {}
        }
    }
}

impl BitAnd for Predicate {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::And(vec![self, rhs])
    }
}

impl BitOr for Predicate {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::Or(vec![self, rhs])
    }
}
