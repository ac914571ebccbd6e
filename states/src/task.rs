//! Task management types for structured concurrency.
//!
//! This module provides `TaskId`, `TaskHandle` and `TaskSet` for managing async
//! tasks with cooperative cancellation via `CancellationToken` from `tokio_util`.
//!
//! # Overview
//!
//! - `TaskId`: identifies a spawned task by a static label and a generation counter
//! - `TaskHandle`: wraps a task with its `CancellationToken`
//! - `TaskSet`: owns every handle a controller has spawned and cancels them all on drop
//!
//! # Usage
//!
//! ```ignore
//! use storefront_states::TaskSet;
//!
//! let mut tasks = TaskSet::default();
//! let handle = tasks.issue("verify-otp");
//! let token = handle.cancellation_token();
//! tokio::spawn(async move {
//!     tokio::select! {
//!         _ = token.cancelled() => {}
//!         _ = do_request() => {}
//!     }
//! });
//!
//! // Dropping the set cancels the request above.
//! drop(tasks);
//! ```

use std::collections::HashMap;

use tokio_util::sync::CancellationToken;

/// Unique identifier for a spawned task.
///
/// Combines a static label (what kind of work the task performs) with a
/// generation counter, so two tasks of the same kind can be told apart and a
/// finished task can retire exactly its own handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TaskId {
    label: &'static str,
    generation: u64,
}

impl TaskId {
    /// Creates a new `TaskId` with the given label and generation.
    pub fn new(label: &'static str, generation: u64) -> Self {
        Self { label, generation }
    }

    /// Returns the label component of this task identifier.
    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Returns the generation counter of this task identifier.
    ///
    /// Higher generation values indicate more recently spawned tasks.
    pub fn generation(&self) -> u64 {
        self.generation
    }
}

/// Handle to a spawned async task with cooperative cancellation support.
///
/// Tasks should use `tokio::select!` with `token.cancelled()` to respond to
/// cancellation requests. Cancelling does not forcibly abort the task.
#[derive(Debug, Clone)]
pub struct TaskHandle {
    id: TaskId,
    cancel_token: CancellationToken,
}

impl TaskHandle {
    /// Creates a new `TaskHandle` with the given ID and cancellation token.
    pub fn new(id: TaskId, cancel_token: CancellationToken) -> Self {
        Self { id, cancel_token }
    }

    /// Returns the `TaskId` of this task.
    pub fn id(&self) -> TaskId {
        self.id
    }

    /// Returns a clone of the cancellation token.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Requests cooperative cancellation of this task.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Returns `true` if cancellation has been requested for this task.
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}

/// The set of tasks a controller currently has in flight.
///
/// Every handle issued by the set is cancelled when the set is dropped, which
/// ties background work to the lifetime of its owner.
#[derive(Debug, Default)]
pub struct TaskSet {
    next_generation: u64,
    handles: HashMap<TaskId, TaskHandle>,
}

impl TaskSet {
    /// Issues a handle for a new task and tracks it until it is retired.
    pub fn issue(&mut self, label: &'static str) -> TaskHandle {
        self.next_generation += 1;
        let id = TaskId::new(label, self.next_generation);
        let handle = TaskHandle::new(id, CancellationToken::new());
        self.handles.insert(id, handle.clone());
        handle
    }

    /// Stops tracking a task that has finished. Unknown ids are ignored.
    pub fn retire(&mut self, id: TaskId) {
        self.handles.remove(&id);
    }

    /// Generation of the most recently issued task, or 0 before the first.
    ///
    /// A task whose generation is at most this value was issued before now,
    /// which lets owners tell stale results from fresh ones.
    pub fn generation(&self) -> u64 {
        self.next_generation
    }

    /// Number of tasks still tracked.
    pub fn len(&self) -> usize {
        self.handles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.handles.is_empty()
    }

    /// Returns `true` if any tracked task carries `label`.
    pub fn contains_label(&self, label: &str) -> bool {
        self.handles.keys().any(|id| id.label == label)
    }

    pub fn handles(&self) -> impl Iterator<Item = &TaskHandle> {
        self.handles.values()
    }

    /// Cancels and forgets every tracked task.
    pub fn cancel_all(&mut self) {
        for (_, handle) in self.handles.drain() {
            handle.cancel();
        }
    }
}

impl Drop for TaskSet {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
