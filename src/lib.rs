#![deny(missing_docs)]

//! Retrace — retryable operation chains with compensation.
//!
//! # Design Goals
//!
//! Retrace is focused on **re-running only what actually failed**:
//!
//! - **Immutable nodes**: every step produces a new snapshot; retry never
//!   mutates history
//! - **No redundant side effects**: a step whose input is already failed, or
//!   that already committed, is never re-invoked
//! - **Reverse-order undo**: compensating actions run last-committed-first
//!
//! # Core Concepts
//!
//! - [`Outcome`]: strict success/failure container with short-circuiting
//!   combinators
//! - [`Chain`]: one immutable node of a pipeline of fallible steps, with
//!   `map`, `then`, `retry` and `undo`
//! - [`Command`]: a step generator paired with an optional compensating
//!   action; regenerated on retry so it reads the freshest upstream value
//! - [`Emitter`]/[`Subscriber`]: the forward channel that hands a recomputed
//!   value to every continuation built from a node
//!
//! # Example
//!
//! ```rust
//! use retrace::{Chain, ChainError, Outcome};
//!
//! let mut attempts = 0;
//! let chain = Chain::run(|| Outcome::Success("Name".to_string())).try_map(move |name| {
//!     attempts += 1;
//!     if attempts == 1 {
//!         Outcome::Failure(ChainError::msg("transient"))
//!     } else {
//!         Outcome::Success(format!("{name} Hello."))
//!     }
//! });
//!
//! assert!(chain.failed());
//! assert_eq!(chain.retry().data(), "Name Hello.");
//! ```

// Modules
pub mod chain;
pub mod channel;
pub mod command;
pub mod outcome;
mod retry;

// Re-exports for convenience
pub use chain::{Chain, ChainId};
pub use channel::{Emitter, Subscriber};
pub use command::{Callable, Command, DerivedCommand, RootCommand};
pub use outcome::{collect, ChainError, Outcome};

#[cfg(test)]
mod tests;
