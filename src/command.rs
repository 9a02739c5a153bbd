//! Deferred steps and the commands that (re)generate them.
//!
//! A [`Callable`] is a zero-argument deferred computation producing an
//! [`Outcome`]. A [`Command`] produces a fresh callable at the moment one is
//! asked for, reading *current* upstream state, and optionally carries a
//! compensating action. The indirection is what lets a retry re-invoke a step
//! with a just-recomputed input instead of the input captured at build time.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::channel::Subscriber;
use crate::outcome::Outcome;

/// A zero-argument deferred computation producing an [`Outcome`] when invoked.
pub struct Callable<T> {
    run: Box<dyn FnOnce() -> Outcome<T> + Send>,
}

impl<T: Send + 'static> Callable<T> {
    /// Wrap a deferred computation.
    pub fn new(run: impl FnOnce() -> Outcome<T> + Send + 'static) -> Self {
        Self { run: Box::new(run) }
    }

    /// A callable that short-circuits to a known outcome without running
    /// any user code.
    pub fn ready(outcome: Outcome<T>) -> Self {
        Self::new(move || outcome)
    }

    /// Run the computation.
    pub fn invoke(self) -> Outcome<T> {
        (self.run)()
    }
}

/// The capability a chain node stores: generate a fresh deferred step, and
/// optionally compensate a committed one.
///
/// `generate` must read upstream state at call time, not capture it; a node
/// calls it again on every retry. `compensate` is only ever called with the
/// output of a step that ran successfully.
pub trait Command<T>: Send + Sync {
    /// Produce a fresh callable reading current upstream state.
    fn generate(&self) -> Callable<T>;

    /// Undo the effect of a successful invocation. Default: nothing to undo.
    fn compensate(&self, _output: &T) {}

    /// Whether this command carries a compensating action.
    fn has_compensation(&self) -> bool {
        false
    }
}

type ExecuteFn<In, Out> = Arc<Mutex<Box<dyn FnMut(In) -> Outcome<Out> + Send>>>;
type UndoFn<Out> = Mutex<Box<dyn FnMut(&Out) + Send>>;

/// Command for a chain root: a fallible zero-argument function, no upstream
/// input and no compensation.
pub struct RootCommand<T> {
    run: Arc<Mutex<Box<dyn FnMut() -> Outcome<T> + Send>>>,
}

impl<T> RootCommand<T> {
    /// Wrap a fallible zero-argument function.
    pub fn new(run: impl FnMut() -> Outcome<T> + Send + 'static) -> Self {
        Self {
            run: Arc::new(Mutex::new(Box::new(run))),
        }
    }
}

impl<T: Send + Sync + 'static> Command<T> for RootCommand<T> {
    fn generate(&self) -> Callable<T> {
        let run = Arc::clone(&self.run);
        Callable::new(move || {
            let mut run = run.lock();
            (*run)()
        })
    }
}

/// Command for a derived node: reads its input from a [`Subscriber`] at
/// generation time and feeds it to the user step function.
///
/// If the subscriber currently holds a failure, `generate` returns a ready
/// callable forwarding that failure; the step function is never invoked with
/// failed input.
pub struct DerivedCommand<In, Out> {
    input: Subscriber<In>,
    execute: ExecuteFn<In, Out>,
    undo: Option<UndoFn<Out>>,
}

impl<In, Out> DerivedCommand<In, Out> {
    /// A command with no compensating action.
    pub fn new(
        input: Subscriber<In>,
        execute: impl FnMut(In) -> Outcome<Out> + Send + 'static,
    ) -> Self {
        Self {
            input,
            execute: Arc::new(Mutex::new(Box::new(execute))),
            undo: None,
        }
    }

    /// A command paired with a compensating action, run with the step's
    /// output during an undo cascade.
    pub fn with_undo(
        input: Subscriber<In>,
        execute: impl FnMut(In) -> Outcome<Out> + Send + 'static,
        undo: impl FnMut(&Out) + Send + 'static,
    ) -> Self {
        Self {
            input,
            execute: Arc::new(Mutex::new(Box::new(execute))),
            undo: Some(Mutex::new(Box::new(undo))),
        }
    }
}

impl<In, Out> Command<Out> for DerivedCommand<In, Out>
where
    In: Clone + Send + Sync + 'static,
    Out: Send + Sync + 'static,
{
    fn generate(&self) -> Callable<Out> {
        match self.input.current() {
            Outcome::Failure(e) => Callable::ready(Outcome::Failure(e)),
            Outcome::Success(value) => {
                let execute = Arc::clone(&self.execute);
                Callable::new(move || {
                    let mut execute = execute.lock();
                    (*execute)(value)
                })
            }
        }
    }

    fn compensate(&self, output: &Out) {
        if let Some(undo) = &self.undo {
            let mut undo = undo.lock();
            (*undo)(output);
        }
    }

    fn has_compensation(&self) -> bool {
        self.undo.is_some()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::channel::Emitter;
    use crate::outcome::ChainError;

    #[test]
    fn ready_callable_short_circuits() {
        let callable = Callable::ready(Outcome::Failure(ChainError::msg("known")));
        assert_eq!(callable.invoke(), Outcome::<i32>::Failure(ChainError::msg("known")));
    }

    #[test]
    fn derived_command_skips_step_on_failed_input() {
        let emitter = Emitter::new();
        let sub = emitter.subscribe(Outcome::<i32>::Failure(ChainError::msg("upstream")));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let command = DerivedCommand::new(sub, move |n: i32| {
            counter.fetch_add(1, Ordering::SeqCst);
            Outcome::Success(n + 1)
        });

        let outcome = command.generate().invoke();
        assert_eq!(outcome.error(), &ChainError::msg("upstream"));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn derived_command_reads_fresh_input_per_generation() {
        let emitter = Emitter::new();
        let sub = emitter.subscribe(Outcome::Success(1));
        let command = DerivedCommand::new(sub, |n: i32| Outcome::Success(n * 10));

        assert_eq!(command.generate().invoke(), Outcome::Success(10));

        emitter.emit(&Outcome::Success(5));
        assert_eq!(command.generate().invoke(), Outcome::Success(50));
    }

    #[test]
    fn compensation_is_optional() {
        let emitter = Emitter::new();
        let sub = emitter.subscribe(Outcome::Success(1));

        let plain = DerivedCommand::new(sub.clone(), |n: i32| Outcome::Success(n));
        assert!(!plain.has_compensation());
        plain.compensate(&1); // no-op

        let undone = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&undone);
        let with_undo = DerivedCommand::with_undo(
            sub,
            |n: i32| Outcome::Success(n),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
            },
        );
        assert!(with_undo.has_compensation());
        with_undo.compensate(&1);
        assert_eq!(undone.load(Ordering::SeqCst), 1);
    }
}
