//! Chain nodes: immutable snapshots of a multi-step fallible computation.
//!
//! A chain is a singly linked list of nodes pointing backward (a tree when
//! siblings share a prefix), while subscribers form the forward channel used
//! only during retry. Every operation returns a *new* node; the only
//! post-construction mutation is the `undone` flag set by [`Chain::undo`].

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::channel::{Emitter, Subscriber};
use crate::command::{Command, DerivedCommand, RootCommand};
use crate::outcome::{ChainError, Outcome};

/// Unique identifier for a chain, shared by every node derived from one root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChainId(pub Uuid);

impl ChainId {
    /// Create a new random chain ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ChainId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChainId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Type-erased view of a node, so a node can hold its differently-typed
/// predecessor. Retry and undo recurse through this.
trait Link: Send + Sync {
    /// Retry this node, returning its replacement (or itself if nothing to do).
    fn retry_link(self: Arc<Self>) -> Arc<dyn Link>;

    /// The node's current error: its failure, or `Undone` after invalidation.
    fn failure(&self) -> Option<ChainError>;

    /// Run this node's compensation, then cascade to its predecessor.
    fn undo_link(&self);
}

/// One immutable snapshot in a chain.
struct Node<T> {
    outcome: Outcome<T>,
    command: Arc<dyn Command<T>>,
    previous: Option<Arc<dyn Link>>,
    emitter: Arc<Emitter<T>>,
    id: ChainId,
    depth: usize,
    undone: AtomicBool,
}

impl<T: Clone + Send + Sync + 'static> Node<T> {
    fn is_undone(&self) -> bool {
        self.undone.load(Ordering::SeqCst)
    }

    /// Current outcome, accounting for invalidation.
    fn snapshot(&self) -> Outcome<T> {
        if self.is_undone() {
            Outcome::Failure(ChainError::Undone)
        } else {
            self.outcome.clone()
        }
    }

    fn current_failure(&self) -> Option<ChainError> {
        if self.is_undone() {
            return Some(ChainError::Undone);
        }
        match &self.outcome {
            Outcome::Failure(e) => Some(e.clone()),
            Outcome::Success(_) => None,
        }
    }

    /// Single-attempt retry of the failed suffix ending at this node.
    fn retry_node(node: &Arc<Self>) -> Arc<Self> {
        // An undone context is terminal; a succeeded node has nothing to do.
        if node.is_undone() || node.outcome.is_success() {
            return Arc::clone(node);
        }

        #[cfg(feature = "tracing")]
        tracing::info!(chain = %node.id, depth = node.depth, "step.retry");

        let retried = match &node.previous {
            None => {
                let outcome = node.command.generate().invoke();
                Arc::new(node.replacement(outcome, None))
            }
            Some(previous) => {
                let previous = Arc::clone(previous).retry_link();
                match previous.failure() {
                    // Predecessor still failing: this node's step must not run.
                    Some(error) => Arc::new(node.replacement(Outcome::Failure(error), Some(previous))),
                    None => {
                        let outcome = node.command.generate().invoke();
                        Arc::new(node.replacement(outcome, Some(previous)))
                    }
                }
            }
        };

        #[cfg(feature = "tracing")]
        match &retried.outcome {
            Outcome::Success(_) => {
                tracing::info!(chain = %retried.id, depth = retried.depth, outcome = "succeeded", "step.end");
            }
            Outcome::Failure(e) => {
                tracing::warn!(chain = %retried.id, depth = retried.depth, error = %e, "step.end");
            }
        }

        // Hand the recomputed value to every sibling continuation.
        retried.emitter.emit(&retried.outcome);
        retried
    }

    fn replacement(&self, outcome: Outcome<T>, previous: Option<Arc<dyn Link>>) -> Self {
        Self {
            outcome,
            command: Arc::clone(&self.command),
            previous,
            emitter: Arc::clone(&self.emitter),
            id: self.id,
            depth: self.depth,
            undone: AtomicBool::new(false),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Link for Node<T> {
    fn retry_link(self: Arc<Self>) -> Arc<dyn Link> {
        Node::retry_node(&self)
    }

    fn failure(&self) -> Option<ChainError> {
        self.current_failure()
    }

    fn undo_link(&self) {
        // First undo wins; a prefix shared with an already-undone sibling is
        // not compensated twice.
        if self.undone.swap(true, Ordering::SeqCst) {
            return;
        }

        if let Outcome::Success(data) = &self.outcome {
            #[cfg(feature = "tracing")]
            if self.command.has_compensation() {
                tracing::info!(chain = %self.id, depth = self.depth, "compensate.run");
            }
            self.command.compensate(data);
        }

        if let Some(previous) = &self.previous {
            previous.undo_link();
        }
    }
}

/// A handle to one node of a retryable operation chain.
///
/// Cloning is cheap and refers to the same node. Nodes are immutable after
/// construction; [`Chain::map`], [`Chain::then`] and [`Chain::retry`] always
/// return a new node.
///
/// # Example
///
/// ```rust
/// use retrace::{Chain, Outcome};
///
/// let chain = Chain::run(|| Outcome::Success(2)).map(|n| n * 21);
/// assert_eq!(chain.data(), 42);
/// ```
pub struct Chain<T> {
    node: Arc<Node<T>>,
}

impl<T> Clone for Chain<T> {
    fn clone(&self) -> Self {
        Self {
            node: Arc::clone(&self.node),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Chain<T> {
    /// Start a chain from a fallible zero-argument function.
    ///
    /// The function is invoked immediately; the returned root node is either
    /// Succeeded or Failed.
    pub fn run(step: impl FnMut() -> Outcome<T> + Send + 'static) -> Self {
        let command: Arc<dyn Command<T>> = Arc::new(RootCommand::new(step));
        let outcome = command.generate().invoke();
        let id = ChainId::new();

        #[cfg(feature = "tracing")]
        tracing::info!(chain = %id, succeeded = outcome.is_success(), "chain.start");

        Self {
            node: Arc::new(Node {
                outcome,
                command,
                previous: None,
                emitter: Arc::new(Emitter::new()),
                id,
                depth: 0,
                undone: AtomicBool::new(false),
            }),
        }
    }

    /// Start a chain from a function returning an ordinary `Result`.
    pub fn run_result(mut step: impl FnMut() -> Result<T, ChainError> + Send + 'static) -> Self {
        Self::run(move || step().into())
    }

    /// Build a continuation from a caller-supplied command.
    ///
    /// The closure receives a subscriber already registered against this
    /// node's emitter and seeded with its current outcome; the command it
    /// returns must read that subscriber in `generate`. This is the seam the
    /// `map`/`then` conveniences are built on.
    pub fn step<U: Clone + Send + Sync + 'static>(
        &self,
        build: impl FnOnce(Subscriber<T>) -> Arc<dyn Command<U>>,
    ) -> Chain<U> {
        let subscriber = self.node.emitter.subscribe(self.node.snapshot());
        self.derive(build(subscriber))
    }

    /// Apply a pure transform to this node's value.
    pub fn map<U: Clone + Send + Sync + 'static>(
        &self,
        mut op: impl FnMut(T) -> U + Send + 'static,
    ) -> Chain<U> {
        self.step(|input| Arc::new(DerivedCommand::new(input, move |value| Outcome::Success(op(value)))))
    }

    /// Apply a transform that itself can fail.
    pub fn try_map<U: Clone + Send + Sync + 'static>(
        &self,
        op: impl FnMut(T) -> Outcome<U> + Send + 'static,
    ) -> Chain<U> {
        self.step(|input| Arc::new(DerivedCommand::new(input, op)))
    }

    /// Run a side-effecting step with a compensating action.
    ///
    /// `execute` commits the effect; `compensate` reverses it during an undo
    /// cascade and only ever runs after a successful `execute`.
    pub fn then<U: Clone + Send + Sync + 'static>(
        &self,
        execute: impl FnMut(T) -> Outcome<U> + Send + 'static,
        compensate: impl FnMut(&U) + Send + 'static,
    ) -> Chain<U> {
        self.step(|input| Arc::new(DerivedCommand::with_undo(input, execute, compensate)))
    }

    /// Run a side effect on this node's value, preserving it.
    pub fn inspect(&self, mut op: impl FnMut(&T) + Send + 'static) -> Chain<T> {
        self.step(|input| {
            Arc::new(DerivedCommand::new(input, move |value: T| {
                op(&value);
                Outcome::Success(value)
            }))
        })
    }

    fn derive<U: Clone + Send + Sync + 'static>(&self, command: Arc<dyn Command<U>>) -> Chain<U> {
        // A step whose input is already known to be failed must not run.
        let outcome = match self.node.current_failure() {
            Some(error) => Outcome::Failure(error),
            None => command.generate().invoke(),
        };

        #[cfg(feature = "tracing")]
        tracing::info!(
            chain = %self.node.id,
            depth = self.node.depth + 1,
            succeeded = outcome.is_success(),
            "step.end"
        );

        Chain {
            node: Arc::new(Node {
                outcome,
                command,
                previous: Some(Arc::clone(&self.node) as Arc<dyn Link>),
                emitter: Arc::new(Emitter::new()),
                id: self.node.id,
                depth: self.node.depth + 1,
                undone: AtomicBool::new(false),
            }),
        }
    }

    /// Re-execute exactly the failed suffix of the chain, once.
    ///
    /// Succeeded nodes are returned unchanged and their side effects are not
    /// re-run. A node whose predecessor is still failing after its own retry
    /// does not run its step either. After recomputing, the new value is
    /// emitted to every sibling continuation of the original node.
    pub fn retry(&self) -> Chain<T> {
        Chain {
            node: Node::retry_node(&self.node),
        }
    }

    /// Run compensating actions for every committed step, this node first,
    /// then its predecessors (last-committed-first-undone).
    ///
    /// Afterwards every visited node is invalidated: reads fail with
    /// [`ChainError::Undone`]. Undoing twice, or undoing siblings sharing a
    /// prefix, compensates each step at most once.
    pub fn undo(&self) {
        self.node.undo_link();
    }

    /// The plain outcome, stripped of all chain metadata.
    pub fn outcome(&self) -> Outcome<T> {
        self.node.snapshot()
    }

    /// Returns `true` if this node holds a value.
    pub fn succeeded(&self) -> bool {
        self.outcome().is_success()
    }

    /// Returns `true` if this node holds an error.
    pub fn failed(&self) -> bool {
        self.outcome().is_failure()
    }

    /// The node's value.
    ///
    /// # Panics
    ///
    /// Panics if the node is failed or has been undone.
    pub fn data(&self) -> T {
        match self.outcome() {
            Outcome::Success(data) => data,
            Outcome::Failure(e) => panic!("read data of a failed chain node: {e}"),
        }
    }

    /// The node's error.
    ///
    /// # Panics
    ///
    /// Panics if the node succeeded.
    pub fn error(&self) -> ChainError {
        match self.outcome() {
            Outcome::Success(_) => panic!("read error of a succeeded chain node"),
            Outcome::Failure(e) => e,
        }
    }

    /// The identifier shared by every node of this chain.
    pub fn id(&self) -> ChainId {
        self.node.id
    }

    /// Distance from the root node (root is 0).
    pub fn depth(&self) -> usize {
        self.node.depth
    }
}

impl<T: Clone + Send + Sync + 'static> fmt::Debug for Chain<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("id", &self.node.id)
            .field("depth", &self.node.depth)
            .field("succeeded", &self.succeeded())
            .field("undone", &self.node.is_undone())
            .finish()
    }
}
