//! Bounded and predicate-gated retry loops over [`Chain::retry`].

use crate::chain::Chain;
use crate::outcome::{ChainError, Outcome};

impl<T: Clone + Send + Sync + 'static> Chain<T> {
    /// Retry the failed suffix until success or `max_attempts` retries have
    /// been spent, returning the last attempt. Never panics.
    ///
    /// A chain that is already succeeded is returned unchanged without
    /// consuming an attempt.
    pub fn retry_up_to(&self, max_attempts: u8) -> Chain<T> {
        let mut current = self.clone();
        for attempt in 0..max_attempts {
            if current.succeeded() {
                return current;
            }

            #[cfg(feature = "tracing")]
            tracing::info!(chain = %current.id(), attempt, "retry.attempt");
            #[cfg(not(feature = "tracing"))]
            let _ = attempt;

            current = current.retry();
        }
        current
    }

    /// As [`Chain::retry_up_to`], but stops immediately, without consuming an
    /// attempt, once the current error no longer satisfies `predicate`.
    ///
    /// Lets a caller retry only transient-looking failures while giving up at
    /// once on permanent ones.
    pub fn retry_if(
        &self,
        max_attempts: u8,
        predicate: impl Fn(&ChainError) -> bool,
    ) -> Chain<T> {
        let mut current = self.clone();
        for _ in 0..max_attempts {
            let error = match current.outcome() {
                Outcome::Success(_) => return current,
                Outcome::Failure(e) => e,
            };
            if !predicate(&error) {
                #[cfg(feature = "tracing")]
                tracing::warn!(chain = %current.id(), error = %error, "retry.rejected");
                return current;
            }
            current = current.retry();
        }
        current
    }
}
