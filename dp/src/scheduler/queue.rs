//! Queue types for the scheduler

use std::collections::BinaryHeap;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::sync::Notify;
use tokio::time::Instant;

/// Dispatch class of an operation; lower runs first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationPriority {
    Blocking = 0,
    Normal = 1,
}

/// What an operation yields on success
pub type OperationResult = eyre::Result<serde_json::Value>;

type OperationFn = Box<dyn FnOnce() -> BoxFuture<'static, OperationResult> + Send>;

/// A unit of deferred work
pub struct Operation {
    pub operation_type: String,
    pub priority: OperationPriority,
    pub queued_at: Instant,
    callback: OperationFn,
}

impl Operation {
    pub fn new<F, Fut>(operation_type: impl Into<String>, priority: OperationPriority, callback: F) -> Self
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = OperationResult> + Send + 'static,
    {
        Self {
            operation_type: operation_type.into(),
            priority,
            queued_at: Instant::now(),
            callback: Box::new(move || callback().boxed()),
        }
    }

    /// Consume the operation, producing its future
    pub fn run(self) -> BoxFuture<'static, OperationResult> {
        (self.callback)()
    }
}

impl std::fmt::Debug for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Operation")
            .field("operation_type", &self.operation_type)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}

struct QueuedOperation {
    seq: u64,
    operation: Operation,
}

impl Eq for QueuedOperation {}

impl PartialEq for QueuedOperation {
    fn eq(&self, other: &Self) -> bool {
        self.seq == other.seq
    }
}

impl Ord for QueuedOperation {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Max-heap: Blocking before Normal, then earlier submission
        other
            .operation
            .priority
            .cmp(&self.operation.priority)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

impl PartialOrd for QueuedOperation {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Unbounded priority queue with async wakeup
#[derive(Default)]
pub struct OperationQueue {
    heap: Mutex<BinaryHeap<QueuedOperation>>,
    next_seq: AtomicU64,
    notify: Notify,
}

impl OperationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue without blocking
    pub fn push(&self, operation: Operation) {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
        self.lock().push(QueuedOperation { seq, operation });
        self.notify.notify_one();
    }

    pub fn try_pop(&self) -> Option<Operation> {
        self.lock().pop().map(|queued| queued.operation)
    }

    /// Wait up to `timeout` for the next operation
    pub async fn pop_timeout(&self, timeout: Duration) -> Option<Operation> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(operation) = self.try_pop() {
                return Some(operation);
            }
            if tokio::time::timeout_at(deadline, self.notify.notified()).await.is_err() {
                return self.try_pop();
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BinaryHeap<QueuedOperation>> {
        self.heap.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Outcome of one executed operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Completed,
    Failed,
}

/// Report handed to the notification callback after each operation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationReport {
    pub operation_type: String,
    pub status: OperationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationReport {
    pub fn completed(operation_type: impl Into<String>, result: serde_json::Value) -> Self {
        Self {
            operation_type: operation_type.into(),
            status: OperationStatus::Completed,
            result: Some(result),
            error: None,
        }
    }

    pub fn failed(operation_type: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            operation_type: operation_type.into(),
            status: OperationStatus::Failed,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == OperationStatus::Completed
    }
}
