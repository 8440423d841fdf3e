use crate::value::Value;
use derive_more::Display;

///
/// PropertyId
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, Ord, PartialEq, PartialOrd)]
#[display("#{_0}")]
pub struct PropertyId(pub u32);

///
/// PropertyKind
///
/// Minimal type surface needed by condition validation and aggregates.
/// Date values are epoch milliseconds and share the integer encoding.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum PropertyKind {
    Bool,
    Int,
    Float,
    Text,
    Date,
}

impl PropertyKind {
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Int => "int",
            Self::Float => "float",
            Self::Text => "text",
            Self::Date => "date",
        }
    }

    #[must_use]
    pub const fn is_text(self) -> bool {
        matches!(self, Self::Text)
    }

    /// Kinds whose values live in the integer family (sum/min/max).
    #[must_use]
    pub const fn is_integral(self) -> bool {
        matches!(self, Self::Bool | Self::Int | Self::Date)
    }

    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float)
    }

    /// Whether an operand of this shape may be compared against the kind.
    ///
    /// Float properties accept integer operands (widened); integral
    /// properties accept bools bound as 0/1.
    #[must_use]
    pub const fn accepts(self, value: &Value) -> bool {
        match (self, value) {
            (Self::Bool | Self::Int | Self::Date, Value::Int(_) | Value::Bool(_))
            | (Self::Float, Value::Float(_) | Value::Int(_))
            | (Self::Text, Value::Text(_)) => true,
            _ => false,
        }
    }
}

///
/// Property
/// Static property descriptor, one per persisted field.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Property {
    pub id: PropertyId,
    pub name: &'static str,
    pub kind: PropertyKind,
}

impl Property {
    #[must_use]
    pub const fn new(id: u32, name: &'static str, kind: PropertyKind) -> Self {
        Self {
            id: PropertyId(id),
            name,
            kind,
        }
    }
}
