//! Shared helpers for chain tests.
//!
//! Step closures must be `Send + 'static`, so all instrumentation goes
//! through `Arc`ed atomics and locks rather than plain captures.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::{ChainError, Outcome};

/// A shared invocation counter for step functions.
pub fn counter() -> Arc<AtomicUsize> {
    Arc::new(AtomicUsize::new(0))
}

/// Read a counter.
pub fn count(calls: &Arc<AtomicUsize>) -> usize {
    calls.load(Ordering::SeqCst)
}

/// The error used for failures worth retrying.
pub fn transient() -> ChainError {
    ChainError::msg("transient")
}

/// The error used for failures that should not be retried.
pub fn permanent() -> ChainError {
    ChainError::msg("permanent")
}

/// A root step producing `value`, failing with a transient error for the
/// first `failures` invocations. Every invocation bumps `calls`.
pub fn flaky_root<T: Clone + Send + 'static>(
    value: T,
    failures: usize,
    calls: Arc<AtomicUsize>,
) -> Box<dyn FnMut() -> Outcome<T> + Send> {
    let mut remaining = failures;
    Box::new(move || {
        calls.fetch_add(1, Ordering::SeqCst);
        if remaining > 0 {
            remaining -= 1;
            Outcome::Failure(transient())
        } else {
            Outcome::Success(value.clone())
        }
    })
}

/// A mapping step that appends `" Hello."`, failing with a transient error
/// for the first `failures` invocations. Every invocation bumps `calls`.
pub fn add_hello(
    failures: usize,
    calls: Arc<AtomicUsize>,
) -> Box<dyn FnMut(String) -> Outcome<String> + Send> {
    let mut remaining = failures;
    Box::new(move |name| {
        calls.fetch_add(1, Ordering::SeqCst);
        if remaining > 0 {
            remaining -= 1;
            Outcome::Failure(transient())
        } else {
            Outcome::Success(format!("{name} Hello."))
        }
    })
}

/// Shared log for observing the order of compensating actions.
pub fn recorder() -> Arc<Mutex<Vec<&'static str>>> {
    Arc::new(Mutex::new(Vec::new()))
}
