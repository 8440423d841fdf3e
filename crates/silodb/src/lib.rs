//! ## Crate layout
//! - `core`: entity model, values, condition builder, compiled queries,
//!   retry executor, relations, reactive delivery and the storage engine
//!   contract.
//! - `error`: the stable public error type.
//!
//! The `prelude` module is the surface most application code needs: a
//! store, the builder vocabulary and the reactive handles.

pub use silodb_core as core;

pub mod error;

pub use error::{Error, ErrorKind, ErrorOrigin, QueryErrorKind, StorageErrorKind};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Result alias over the public error type.
pub type Result<T> = std::result::Result<T, Error>;

///
/// Prelude
///

pub mod prelude {
    pub use crate::{
        Error,
        core::{
            config::StoreConfig,
            db::{
                Store,
                engine::MemoryEngine,
                query::{OrderFlags, Query, QueryBuilder, StringOrder},
                reactive::{DataSubscription, DataSubscriptionList},
                relation::{RelationInfo, ToMany, ToOne},
            },
            model::{EntityModel, Property, PropertyId, PropertyKind},
            traits::{EntityId, EntityKind as _},
            value::Value,
        },
    };
}
