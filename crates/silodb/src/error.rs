use derive_more::Display;
use serde::{Deserialize, Serialize};
use silodb_core::{
    config::ConfigError,
    db::query::QueryError,
    error::{ErrorClass, ErrorOrigin as CoreErrorOrigin, InternalError},
};
use thiserror::Error as ThisError;

///
/// Error
/// Public error type with a stable kind + origin taxonomy.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize, ThisError)]
#[error("{message}")]
pub struct Error {
    pub kind: ErrorKind,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            kind,
            origin,
            message: message.into(),
        }
    }

    /// Whether retrying the same call later may succeed.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self.kind, ErrorKind::Storage(StorageErrorKind::Conflict))
    }
}

impl From<InternalError> for Error {
    fn from(err: InternalError) -> Self {
        Self::new(ErrorKind::from(err.class), err.origin.into(), err.message)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        let origin = match err {
            QueryError::Builder(_) => ErrorOrigin::Builder,
            QueryError::Capability(_) | QueryError::Parameter(_) => ErrorOrigin::Query,
            QueryError::Execute(err) => return err.into(),
        };

        Self::new(ErrorKind::from(err.class()), origin, err.to_string())
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Self::new(ErrorKind::Config, ErrorOrigin::Config, err.to_string())
    }
}

///
/// ErrorKind
/// Public error taxonomy for callers.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ErrorKind {
    Query(QueryErrorKind),
    Storage(StorageErrorKind),

    /// Store configuration was rejected.
    Config,

    /// The caller cannot remediate this.
    Internal,
}

impl From<ErrorClass> for ErrorKind {
    fn from(class: ErrorClass) -> Self {
        match class {
            ErrorClass::BuilderState => Self::Query(QueryErrorKind::Invalid),
            ErrorClass::NullArgument => Self::Query(QueryErrorKind::NullArgument),
            ErrorClass::TypeMismatch => Self::Query(QueryErrorKind::TypeMismatch),
            ErrorClass::InvalidArgument => Self::Query(QueryErrorKind::InvalidParameter),
            ErrorClass::Capability | ErrorClass::Unsupported => {
                Self::Query(QueryErrorKind::Unsupported)
            }
            ErrorClass::NotUnique => Self::Query(QueryErrorKind::NotUnique),
            ErrorClass::UseAfterClose => Self::Query(QueryErrorKind::Closed),
            ErrorClass::TransientConflict => Self::Storage(StorageErrorKind::Conflict),
            ErrorClass::Storage => Self::Storage(StorageErrorKind::Unavailable),
            ErrorClass::InvariantViolation => Self::Internal,
        }
    }
}

///
/// QueryErrorKind
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum QueryErrorKind {
    /// Condition sequence is invalid.
    Invalid,

    /// A condition or rebind was given a null where a value is required.
    NullArgument,

    /// Operand kind or arity does not fit the property or operator.
    TypeMismatch,

    /// The terminal cannot honor an attached filter, comparator or ordering.
    Unsupported,

    /// A rebind addressed no condition, several conditions, or the wrong shape.
    InvalidParameter,

    /// Query expected at most one row but matched many.
    NotUnique,

    /// The query was used after `close`.
    Closed,
}

///
/// StorageErrorKind
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum StorageErrorKind {
    /// Transient conflict that outlasted the retry budget.
    Conflict,
    Unavailable,
}

///
/// ErrorOrigin
/// Public origin taxonomy for callers.
///

#[derive(Clone, Copy, Debug, Deserialize, Display, Eq, PartialEq, Serialize)]
pub enum ErrorOrigin {
    Builder,
    Query,
    Executor,
    Engine,
    Relation,
    Reactive,
    Config,
}

impl From<CoreErrorOrigin> for ErrorOrigin {
    fn from(origin: CoreErrorOrigin) -> Self {
        match origin {
            CoreErrorOrigin::Builder => Self::Builder,
            CoreErrorOrigin::Query => Self::Query,
            CoreErrorOrigin::Executor => Self::Executor,
            CoreErrorOrigin::Engine => Self::Engine,
            CoreErrorOrigin::Relation => Self::Relation,
            CoreErrorOrigin::Reactive => Self::Reactive,
            CoreErrorOrigin::Config => Self::Config,
        }
    }
}

///
/// TESTS
///
