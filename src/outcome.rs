//! Strict success/failure container and the chain error taxonomy.
//!
//! [`Outcome`] is the value every step produces. All combinators short-circuit
//! on failure without invoking the mapper and forward the original error
//! unchanged; that propagation law is what the rest of the crate is built on.

use serde::{Deserialize, Serialize};

/// Errors produced by or carried through a chain.
///
/// The chain machinery never inspects error content except through the
/// caller-supplied retry predicate; it only moves errors around.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ChainError {
    /// Unspecified failure carrying a human-readable message.
    #[error("{0}")]
    Failure(String),

    /// Several independent failures merged when fanning in results.
    #[error("aggregate failure ({} underlying errors)", .0.len())]
    Aggregate(Vec<ChainError>),

    /// The context was invalidated by `undo`; its data is gone.
    #[error("context has been undone")]
    Undone,
}

impl ChainError {
    /// Create an unspecified failure from a message.
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Failure(message.into())
    }
}

/// Outcome of a fallible step: a value or an error, never both.
///
/// Accessing the wrong side through [`Outcome::data`] or [`Outcome::error`]
/// is a programming error and panics; use the combinators or
/// [`Outcome::into_result`] for recoverable access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome<T> {
    /// The step produced a value.
    Success(T),
    /// The step failed.
    Failure(ChainError),
}

impl<T> Outcome<T> {
    /// Returns `true` if this is a success.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Returns `true` if this is a failure.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failure(_))
    }

    /// Get the success value.
    ///
    /// # Panics
    ///
    /// Panics if this outcome is a failure.
    pub fn data(&self) -> &T {
        match self {
            Self::Success(data) => data,
            Self::Failure(e) => panic!("read data of a failed outcome: {e}"),
        }
    }

    /// Get the error.
    ///
    /// # Panics
    ///
    /// Panics if this outcome is a success.
    pub fn error(&self) -> &ChainError {
        match self {
            Self::Success(_) => panic!("read error of a successful outcome"),
            Self::Failure(e) => e,
        }
    }

    /// Apply a pure transform to the success value.
    pub fn map<U>(self, op: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Success(data) => Outcome::Success(op(data)),
            Self::Failure(e) => Outcome::Failure(e),
        }
    }

    /// Apply a transform that itself can fail (flattening mapper).
    pub fn and_then<U>(self, op: impl FnOnce(T) -> Outcome<U>) -> Outcome<U> {
        match self {
            Self::Success(data) => op(data),
            Self::Failure(e) => Outcome::Failure(e),
        }
    }

    /// Run a side effect on the success value, preserving the outcome.
    pub fn inspect(self, op: impl FnOnce(&T)) -> Self {
        if let Self::Success(data) = &self {
            op(data);
        }
        self
    }

    /// Substitute a default value for a failure.
    pub fn unwrap_or(self, default: T) -> T {
        match self {
            Self::Success(data) => data,
            Self::Failure(_) => default,
        }
    }

    /// Recover from a failure with an alternative outcome.
    pub fn or_else(self, op: impl FnOnce(ChainError) -> Outcome<T>) -> Outcome<T> {
        match self {
            Self::Success(data) => Outcome::Success(data),
            Self::Failure(e) => op(e),
        }
    }

    /// Drop the payload, keeping only success or failure.
    pub fn to_unit(&self) -> Outcome<()> {
        match self {
            Self::Success(_) => Outcome::Success(()),
            Self::Failure(e) => Outcome::Failure(e.clone()),
        }
    }

    /// The success value, if any.
    pub fn ok(self) -> Option<T> {
        match self {
            Self::Success(data) => Some(data),
            Self::Failure(_) => None,
        }
    }

    /// The error, if any.
    pub fn err(self) -> Option<ChainError> {
        match self {
            Self::Success(_) => None,
            Self::Failure(e) => Some(e),
        }
    }

    /// Convert into a standard `Result` for use with `?`.
    pub fn into_result(self) -> Result<T, ChainError> {
        match self {
            Self::Success(data) => Ok(data),
            Self::Failure(e) => Err(e),
        }
    }

    /// Combine two outcomes, merging failures into an aggregate.
    ///
    /// A single failure is forwarded unchanged; two failures become
    /// [`ChainError::Aggregate`].
    pub fn zip<U>(self, other: Outcome<U>) -> Outcome<(T, U)> {
        match (self, other) {
            (Self::Success(a), Outcome::Success(b)) => Outcome::Success((a, b)),
            (Self::Failure(a), Outcome::Failure(b)) => {
                Outcome::Failure(ChainError::Aggregate(vec![a, b]))
            }
            (Self::Failure(e), _) | (_, Outcome::Failure(e)) => Outcome::Failure(e),
        }
    }
}

impl<T> From<Result<T, ChainError>> for Outcome<T> {
    fn from(result: Result<T, ChainError>) -> Self {
        match result {
            Ok(data) => Self::Success(data),
            Err(e) => Self::Failure(e),
        }
    }
}

impl<T> From<Outcome<T>> for Result<T, ChainError> {
    fn from(outcome: Outcome<T>) -> Self {
        outcome.into_result()
    }
}

/// Collect many outcomes into one, merging all failures.
///
/// Zero failures yields the collected values, exactly one failure is
/// forwarded unchanged, and two or more become [`ChainError::Aggregate`].
pub fn collect<T>(outcomes: impl IntoIterator<Item = Outcome<T>>) -> Outcome<Vec<T>> {
    let mut values = Vec::new();
    let mut errors = Vec::new();
    for outcome in outcomes {
        match outcome {
            Outcome::Success(data) => values.push(data),
            Outcome::Failure(e) => errors.push(e),
        }
    }
    match errors.len() {
        0 => Outcome::Success(values),
        1 => Outcome::Failure(errors.pop().unwrap_or(ChainError::msg("unreachable"))),
        _ => Outcome::Failure(ChainError::Aggregate(errors)),
    }
}
