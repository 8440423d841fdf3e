use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Not a stable API; intended for internal use and may change without notice.
///

#[derive(Clone, Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,

    /// Optional structured error detail.
    pub detail: Option<ErrorDetail>,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
            detail: None,
        }
    }

    /// Attach structured detail to an existing error.
    #[must_use]
    pub fn with_detail(mut self, detail: ErrorDetail) -> Self {
        self.detail = Some(detail);
        self
    }

    /// Construct a query-origin invariant violation.
    pub(crate) fn query_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Query,
            message.into(),
        )
    }

    /// Construct an executor-origin invariant violation.
    pub(crate) fn executor_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Executor,
            message.into(),
        )
    }

    /// Construct an engine-origin invariant violation.
    pub(crate) fn engine_invariant(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::InvariantViolation,
            ErrorOrigin::Engine,
            message.into(),
        )
    }

    /// Construct an engine-origin fatal storage error.
    pub fn engine_storage(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Storage, ErrorOrigin::Engine, message.into())
    }

    /// Construct an engine-origin transient conflict; the retry executor
    /// treats these as retryable.
    pub fn transient_conflict(message: impl Into<String>) -> Self {
        Self::new(
            ErrorClass::TransientConflict,
            ErrorOrigin::Engine,
            message.into(),
        )
    }

    /// Construct an engine-origin type mismatch.
    pub(crate) fn engine_type_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::TypeMismatch, ErrorOrigin::Engine, message.into())
    }

    /// Construct a uniqueness violation for a query expected to match at most once.
    pub(crate) fn not_unique(matches: usize) -> Self {
        Self::new(
            ErrorClass::NotUnique,
            ErrorOrigin::Engine,
            format!("query expected a unique result but matched {matches} entities"),
        )
    }

    /// Construct a use-after-close error for a released query handle.
    pub(crate) fn use_after_close(what: &str) -> Self {
        Self::new(
            ErrorClass::UseAfterClose,
            ErrorOrigin::Query,
            format!("{what} has already been closed"),
        )
    }

    /// Construct a relation-origin error.
    pub(crate) fn relation(class: ErrorClass, message: impl Into<String>) -> Self {
        Self::new(class, ErrorOrigin::Relation, message.into())
    }

    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self.class, ErrorClass::TransientConflict)
    }

    /// Storage-level failures are the ones forwarded to a store's
    /// exception listener.
    #[must_use]
    pub const fn is_storage_failure(&self) -> bool {
        matches!(
            self.class,
            ErrorClass::NotUnique | ErrorClass::TransientConflict | ErrorClass::Storage
        )
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }
}

///
/// ErrorDetail
///
/// Structured error context carried by [`InternalError`].
///

#[derive(Clone, Debug, Eq, PartialEq, ThisError)]
pub enum ErrorDetail {
    #[error("condition {property} {op}")]
    Condition {
        property: &'static str,
        op: &'static str,
    },

    #[error("gave up after {attempts} attempts")]
    Retry { attempts: u32 },
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorClass {
    BuilderState,
    Capability,
    NotUnique,
    TransientConflict,
    Storage,
    UseAfterClose,
    NullArgument,
    TypeMismatch,
    InvalidArgument,
    InvariantViolation,
    Unsupported,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::BuilderState => "builder_state",
            Self::Capability => "capability",
            Self::NotUnique => "not_unique",
            Self::TransientConflict => "transient_conflict",
            Self::Storage => "storage",
            Self::UseAfterClose => "use_after_close",
            Self::NullArgument => "null_argument",
            Self::TypeMismatch => "type_mismatch",
            Self::InvalidArgument => "invalid_argument",
            Self::InvariantViolation => "invariant_violation",
            Self::Unsupported => "unsupported",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
/// Not a stable API; may change without notice.
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum ErrorOrigin {
    Builder,
    Query,
    Executor,
    Engine,
    Relation,
    Reactive,
    Config,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Builder => "builder",
            Self::Query => "query",
            Self::Executor => "executor",
            Self::Engine => "engine",
            Self::Relation => "relation",
            Self::Reactive => "reactive",
            Self::Config => "config",
        };
        write!(f, "{label}")
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_class_prefixes_origin_and_class() {
        let err = InternalError::transient_conflict("write lock held");

        assert_eq!(
            err.display_with_class(),
            "engine:transient_conflict: write lock held"
        );
    }

    #[test]
    fn storage_failures_cover_uniqueness_and_conflicts() {
        assert!(InternalError::not_unique(2).is_storage_failure());
        assert!(InternalError::transient_conflict("busy").is_storage_failure());
        assert!(InternalError::engine_storage("disk gone").is_storage_failure());
        assert!(!InternalError::use_after_close("query").is_storage_failure());
    }

    #[test]
    fn detail_is_attached_without_touching_message() {
        let err = InternalError::transient_conflict("busy")
            .with_detail(ErrorDetail::Retry { attempts: 3 });

        assert_eq!(err.message, "busy");
        assert_eq!(err.detail, Some(ErrorDetail::Retry { attempts: 3 }));
    }
}
