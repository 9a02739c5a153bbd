//! Forward notification channel between a node and its continuations.
//!
//! Each chain node owns an [`Emitter`]; every continuation built from it
//! captures a [`Subscriber`]. When a retry recomputes the node's value, the
//! emitter overwrites every subscriber slot so downstream step generators
//! read the fresh value without the node history being mutated.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::outcome::Outcome;

/// A passive one-slot mailbox holding the latest outcome of an upstream node.
///
/// Cloning yields another handle to the same slot. The slot is read
/// synchronously by the step generator that captured it.
pub struct Subscriber<T> {
    slot: Arc<RwLock<Outcome<T>>>,
}

impl<T> Clone for Subscriber<T> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T: Clone> Subscriber<T> {
    fn seeded(outcome: Outcome<T>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(outcome)),
        }
    }

    /// Read the currently held outcome.
    pub fn current(&self) -> Outcome<T> {
        self.slot.read().clone()
    }

    fn store(&self, outcome: &Outcome<T>) {
        *self.slot.write() = outcome.clone();
    }
}

/// Owns the subscribers fed by one chain node.
///
/// Created fresh per node and shared with the node's retried replacements,
/// so a recomputed value reaches every continuation built from the original.
pub struct Emitter<T> {
    subscribers: RwLock<Vec<Subscriber<T>>>,
}

impl<T: Clone> Emitter<T> {
    /// Create an emitter with no subscribers.
    pub fn new() -> Self {
        Self {
            subscribers: RwLock::new(Vec::new()),
        }
    }

    /// Register a new subscriber seeded with a snapshot outcome.
    pub fn subscribe(&self, seed: Outcome<T>) -> Subscriber<T> {
        let subscriber = Subscriber::seeded(seed);
        self.subscribers.write().push(subscriber.clone());
        subscriber
    }

    /// Overwrite every registered subscriber's held value.
    pub fn emit(&self, outcome: &Outcome<T>) {
        for subscriber in self.subscribers.read().iter() {
            subscriber.store(outcome);
        }
    }

    /// Number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }
}

impl<T: Clone> Default for Emitter<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::ChainError;

    #[test]
    fn subscriber_holds_seed_until_emit() {
        let emitter = Emitter::new();
        let sub = emitter.subscribe(Outcome::Success(1));
        assert_eq!(sub.current(), Outcome::Success(1));

        emitter.emit(&Outcome::Success(2));
        assert_eq!(sub.current(), Outcome::Success(2));
    }

    #[test]
    fn emit_reaches_every_subscriber() {
        let emitter = Emitter::new();
        let a = emitter.subscribe(Outcome::Failure(ChainError::msg("stale")));
        let b = emitter.subscribe(Outcome::Failure(ChainError::msg("stale")));
        assert_eq!(emitter.subscriber_count(), 2);

        emitter.emit(&Outcome::Success("fresh"));
        assert_eq!(a.current(), Outcome::Success("fresh"));
        assert_eq!(b.current(), Outcome::Success("fresh"));
    }

    #[test]
    fn cloned_subscriber_shares_the_slot() {
        let emitter = Emitter::new();
        let a = emitter.subscribe(Outcome::Success(1));
        let b = a.clone();

        emitter.emit(&Outcome::Success(9));
        assert_eq!(b.current(), Outcome::Success(9));
        // Cloning does not register a second slot.
        assert_eq!(emitter.subscriber_count(), 1);
    }
}
