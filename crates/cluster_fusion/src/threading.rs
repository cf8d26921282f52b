//! Task scheduler primitive built on rayon.
//!
//! Tasks run on rayon's global pool via `rayon::spawn`.
//!
//! Work is submitted without blocking; completion is observed by polling.
//! [`TaskBatch`] groups the tasks of one compiler phase so the phase barrier
//! reduces to a single `is_complete` check.
//!
//! # Usage
//!
//! ```ignore
//! let executor = TaskExecutor::default();
//! let mut batch = TaskBatch::new();
//!
//! for chunk in work {
//!     batch.spawn(&executor, move || scanner(chunk));
//! }
//!
//! // Poll each tick
//! if batch.is_complete(&executor) {
//!     let results = batch.take();
//! }
//! ```

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

/// Unique identifier for a spawned task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TaskId(u64);

impl TaskId {
  fn next() -> Self {
    static COUNTER: AtomicU64 = AtomicU64::new(0);
    Self(COUNTER.fetch_add(1, Ordering::Relaxed))
  }
}

/// Type-erased result container.
struct TaskResult {
  data: Box<dyn std::any::Any + Send>,
}

/// Cross-platform task executor using rayon.
///
/// Uses `rayon::spawn` for fire-and-forget work submission. Results are
/// parked in a shared map until polled.
pub struct TaskExecutor {
  /// Completed results waiting to be polled.
  results: Arc<Mutex<HashMap<TaskId, TaskResult>>>,
  /// Currently pending task IDs.
  pending: Arc<Mutex<HashSet<TaskId>>>,
}

impl TaskExecutor {
  /// Create a new executor on rayon's global pool.
  pub fn new() -> Self {
    Self {
      results: Arc::new(Mutex::new(HashMap::new())),
      pending: Arc::new(Mutex::new(HashSet::new())),
    }
  }

  /// Spawn a task on rayon's thread pool (non-blocking).
  ///
  /// Returns a TaskId that can be used to poll for the result.
  pub fn spawn<F, T>(&self, work: F) -> TaskId
  where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
  {
    let task_id = TaskId::next();
    self.pending.lock().insert(task_id);

    let results = Arc::clone(&self.results);
    let pending = Arc::clone(&self.pending);

    rayon::spawn(move || {
      let result = work();

      results.lock().insert(
        task_id,
        TaskResult {
          data: Box::new(result),
        },
      );
      pending.lock().remove(&task_id);
    });

    task_id
  }

  /// Poll for a task's result (non-blocking).
  ///
  /// Returns `Some(result)` if the task completed, `None` if still running.
  /// Returns `None` if the task ID is invalid or already consumed.
  pub fn poll<T: 'static>(&self, task_id: TaskId) -> Option<T> {
    let mut results = self.results.lock();
    results
      .remove(&task_id)
      .and_then(|result| result.data.downcast::<T>().ok().map(|b| *b))
  }

  /// Check if a task is still pending.
  pub fn is_pending(&self, task_id: TaskId) -> bool {
    self.pending.lock().contains(&task_id)
  }

  /// Get the number of worker threads in rayon's pool.
  pub fn num_threads(&self) -> usize {
    rayon::current_num_threads()
  }

  /// Get the number of tasks currently queued or running.
  pub fn pending_count(&self) -> usize {
    self.pending.lock().len()
  }
}

impl Default for TaskExecutor {
  fn default() -> Self {
    Self::new()
  }
}

impl Clone for TaskExecutor {
  fn clone(&self) -> Self {
    Self {
      results: Arc::clone(&self.results),
      pending: Arc::clone(&self.pending),
    }
  }
}

// =============================================================================
// TaskBatch - fork/join barrier over a group of tasks
// =============================================================================

/// A group of tasks whose results are collected together.
///
/// Results come back in spawn order regardless of completion order.
pub struct TaskBatch<T> {
  tasks: Vec<TaskId>,
  results: Vec<Option<T>>,
  remaining: usize,
}

impl<T: Send + 'static> TaskBatch<T> {
  pub fn new() -> Self {
    Self {
      tasks: Vec::new(),
      results: Vec::new(),
      remaining: 0,
    }
  }

  /// Schedule one work item into this batch.
  pub fn spawn<F>(&mut self, executor: &TaskExecutor, work: F)
  where
    F: FnOnce() -> T + Send + 'static,
  {
    self.tasks.push(executor.spawn(work));
    self.results.push(None);
    self.remaining += 1;
  }

  /// Collect finished results; true once every task has reported.
  pub fn is_complete(&mut self, executor: &TaskExecutor) -> bool {
    if self.remaining == 0 {
      return true;
    }
    for (slot, &task_id) in self.tasks.iter().enumerate() {
      if self.results[slot].is_some() {
        continue;
      }
      if let Some(result) = executor.poll::<T>(task_id) {
        self.results[slot] = Some(result);
        self.remaining -= 1;
      }
    }
    self.remaining == 0
  }

  /// Take every collected result in spawn order, leaving the batch empty.
  ///
  /// Only meaningful after `is_complete` returned true; unfinished slots
  /// are skipped.
  pub fn take(&mut self) -> Vec<T> {
    self.tasks.clear();
    self.remaining = 0;
    std::mem::take(&mut self.results).into_iter().flatten().collect()
  }

  /// Number of tasks scheduled in this batch.
  pub fn len(&self) -> usize {
    self.tasks.len()
  }

  pub fn is_empty(&self) -> bool {
    self.tasks.is_empty()
  }
}

impl<T: Send + 'static> Default for TaskBatch<T> {
  fn default() -> Self {
    Self::new()
  }
}

// =============================================================================
// Tests
// =============================================================================
