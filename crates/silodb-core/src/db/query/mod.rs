//! Query modules.
//!
//! `QueryBuilder` assembles a condition tree, `Query` owns the compiled
//! engine handle and runs terminals against it.

pub mod builder;
mod compiled;
pub mod error;
mod lazy;
pub mod order;
pub mod param;
pub mod predicate;

#[cfg(test)]
mod tests;

pub use builder::{QueryBuilder, StringOrder};
pub use compiled::Query;
pub use error::{BuilderError, CapabilityError, ParameterError, QueryError};
pub use lazy::LazyResultList;
pub use order::{OrderFlags, OrderSpec};
pub use param::ParameterSlot;
