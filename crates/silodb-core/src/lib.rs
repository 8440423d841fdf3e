//! Core runtime for SiloDB: entity traits, values, the condition builder,
//! compiled queries, the storage engine contract and reactive delivery.
//! Application code usually goes through the `silodb` facade and its
//! `prelude`.

// public exports are one module level down
pub mod config;
pub mod db;
pub mod error;
pub mod model;
pub mod obs;
pub mod traits;
pub mod value;

// test
#[cfg(test)]
pub(crate) mod test_support;

///
/// Prelude
///
/// Domain vocabulary plus the types needed to build and run a query.
///

pub mod prelude {
    pub use crate::{
        db::{
            Store,
            engine::MemoryEngine,
            query::{OrderFlags, Query, QueryBuilder, StringOrder},
            reactive::{DataSubscription, DataSubscriptionList},
            relation::{RelationInfo, ToMany, ToOne},
        },
        model::{EntityModel, Property, PropertyId, PropertyKind},
        traits::{EntityId, EntityKind},
        value::Value,
    };
}
