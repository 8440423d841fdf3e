use crate::error::{ErrorClass, InternalError};
use thiserror::Error as ThisError;

///
/// QueryError
///

#[derive(Clone, Debug, ThisError)]
pub enum QueryError {
    #[error("{0}")]
    Builder(#[from] BuilderError),
    #[error("{0}")]
    Capability(#[from] CapabilityError),
    #[error("{0}")]
    Parameter(#[from] ParameterError),
    #[error("{0}")]
    Execute(#[from] InternalError),
}

impl QueryError {
    /// Stable classification shared with `InternalError`.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::Builder(err) => err.class(),
            Self::Capability(_) => ErrorClass::Capability,
            Self::Parameter(err) => err.class(),
            Self::Execute(err) => err.class,
        }
    }

    /// The underlying engine/executor error, if this is one.
    #[must_use]
    pub const fn as_internal(&self) -> Option<&InternalError> {
        match self {
            Self::Execute(err) => Some(err),
            _ => None,
        }
    }
}

///
/// BuilderError
/// Condition-builder sequencing and operand errors, raised at the offending call.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum BuilderError {
    #[error("'{combinator}' requires a preceding condition")]
    NoPrecedingCondition { combinator: &'static str },

    #[error("'{attempted}' is not allowed directly after '{pending}'")]
    CombinatorPending {
        pending: &'static str,
        attempted: &'static str,
    },

    #[error("query ends with a dangling '{pending}'")]
    DanglingCombinator { pending: &'static str },

    #[error("parameter alias requires a preceding condition")]
    AliasWithoutCondition,

    #[error("a query {what} is already attached")]
    AlreadyAttached { what: &'static str },

    #[error("property '{property}' does not belong to entity '{entity}'")]
    UnknownProperty {
        entity: &'static str,
        property: &'static str,
    },

    #[error("'{op}' is not supported on {kind} property '{property}'")]
    OperatorMismatch {
        property: &'static str,
        op: &'static str,
        kind: &'static str,
    },

    #[error("'{op}' on {kind} property '{property}' cannot take a {found} operand")]
    OperandMismatch {
        property: &'static str,
        op: &'static str,
        kind: &'static str,
        found: &'static str,
    },

    #[error("'{op}' on property '{property}' requires a non-null operand")]
    NullOperand {
        property: &'static str,
        op: &'static str,
    },
}

impl BuilderError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::OperatorMismatch { .. } | Self::OperandMismatch { .. } => {
                ErrorClass::TypeMismatch
            }
            Self::NullOperand { .. } => ErrorClass::NullArgument,
            _ => ErrorClass::BuilderState,
        }
    }
}

///
/// CapabilityError
/// Terminal operations that cannot honor an attached filter, comparator or ordering.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum CapabilityError {
    #[error("{method} does not support a query filter; use find() or for_each()")]
    Filter { method: &'static str },

    #[error("{method} does not support a query comparator; use find()")]
    Comparator { method: &'static str },

    #[error("{method} is not available for ordered queries")]
    Ordered { method: &'static str },
}

///
/// ParameterError
/// Rebinding failures; the query's bound values are left unchanged.
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ParameterError {
    #[error("no condition found for parameter '{target}'")]
    NotFound { target: String },

    #[error("{count} conditions use property '{target}'; address it by alias")]
    Ambiguous { target: String, count: usize },

    #[error("parameter '{target}' requires a non-null value")]
    NullArgument { target: String },

    #[error("parameter '{target}' of '{op}' expects {expected}, got {found}")]
    TypeMismatch {
        target: String,
        op: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}

impl ParameterError {
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } | Self::Ambiguous { .. } => ErrorClass::InvalidArgument,
            Self::NullArgument { .. } => ErrorClass::NullArgument,
            Self::TypeMismatch { .. } => ErrorClass::TypeMismatch,
        }
    }
}
