//! Tests for retryable operation chains.
//!
//! ## Test Organization
//!
//! - `common`: Shared error constructors, counting/flaky step factories, and
//!   the undo recorder
//! - `basic`: Construction, mapping, short-circuit and error transparency
//! - `retry`: Single-attempt, bounded and predicate-gated retry
//! - `undo`: Compensation ordering and context invalidation
//!
//! All step counters use atomics so the same factories work across the
//! `Send` closure boundary of chain steps.

mod common;
