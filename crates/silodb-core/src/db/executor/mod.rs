//! Transactional execution with bounded retry.
//!
//! Retried reads (`first`, `unique`, `find`) go through `read_with_retry`;
//! counts, aggregates, id scans and removals take a single transaction.
//! Every storage failure leaving this module is reported to the store's
//! exception listener first.

mod retry;
mod tx;

#[cfg(test)]
mod tests;

pub use retry::{BackoffStrategy, RetryPolicy};
pub(crate) use tx::Tx;

use crate::{
    db::Store,
    error::{ErrorDetail, ErrorOrigin, InternalError},
    obs::sink::{self, MetricsEvent},
    traits::EntityKind,
};
use std::thread;

///
/// Executor
///

pub(crate) struct Executor<'a, E: EntityKind> {
    store: &'a Store<E>,
}

impl<'a, E: EntityKind> Executor<'a, E> {
    pub(crate) const fn new(store: &'a Store<E>) -> Self {
        Self { store }
    }

    /// Run `f` inside one read transaction, without retry.
    pub(crate) fn read<T>(
        &self,
        f: impl FnOnce(&Tx<'_, E>) -> Result<T, InternalError>,
    ) -> Result<T, InternalError> {
        let result = Tx::begin_read(self.store.engine()).and_then(|tx| f(&tx));

        self.store.observe(result)
    }

    /// Run `f` inside a read transaction, retrying transient conflicts
    /// according to `policy`. Other failures propagate immediately.
    pub(crate) fn read_with_retry<T>(
        &self,
        policy: &RetryPolicy,
        mut f: impl FnMut(&Tx<'_, E>) -> Result<T, InternalError>,
    ) -> Result<T, InternalError> {
        let attempts = policy.attempts();
        let mut attempt = 1;

        let result = loop {
            match Tx::begin_read(self.store.engine()).and_then(|tx| f(&tx)) {
                Ok(value) => break Ok(value),
                Err(err) if err.is_transient() && attempt < attempts => {
                    let backoff = policy.backoff_after(attempt);
                    tracing::warn!(
                        attempt,
                        attempts,
                        backoff_ms = u64::try_from(backoff.as_millis()).unwrap_or(u64::MAX),
                        error = %err,
                        "read transaction failed; retrying"
                    );
                    sink::record(MetricsEvent::TxRetry { attempt });

                    thread::sleep(backoff);
                    attempt += 1;
                }
                Err(err) if err.is_transient() => {
                    sink::record(MetricsEvent::TxRetryExhausted { attempts });
                    let err = InternalError::new(
                        err.class,
                        ErrorOrigin::Executor,
                        format!(
                            "read transaction failed after {attempts} attempt(s): {}",
                            err.message
                        ),
                    )
                    .with_detail(ErrorDetail::Retry { attempts });
                    self.store.notify_tx_failure(&err);

                    break Err(err);
                }
                Err(err) => break Err(err),
            }
        };

        self.store.observe(result)
    }

    /// Run `f` inside a write transaction; commits on `Ok`, aborts otherwise.
    pub(crate) fn write<T>(
        &self,
        f: impl FnOnce(&Tx<'_, E>) -> Result<T, InternalError>,
    ) -> Result<T, InternalError> {
        let result = Tx::begin_write(self.store.engine()).and_then(|tx| {
            let out = f(&tx)?;
            tx.commit()?;

            Ok(out)
        });

        self.store.observe(result)
    }
}
