//! Reactive delivery of query results.
//!
//! Subscribing replays the current results to the new observer only;
//! `Query::publish` re-runs the query and fans the result out to every
//! live observer. Each delivery is a separate job on the store's worker
//! pool, so ordering across observers is best effort. One observer only
//! ever moves forward: a result computed before one it already received
//! is dropped.

mod publisher;
mod subscription;

#[cfg(test)]
mod tests;

pub(crate) use publisher::{ObserverEntry, Publisher, deliver};
pub use subscription::{
    DataObserver, DataSubscription, DataSubscriptionList, ErrorObserver, SubscriptionBuilder,
};
