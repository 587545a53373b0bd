//! # Bounded Task Pool
//!
//! Runs a CPU-bound [`Task`] over many inputs concurrently. This is the
//! fan-out half of a fan-out / fan-in pipeline: every input is handed to a
//! clone of the same task, work runs on tokio's blocking pool, and the
//! outcomes come back in input order.
//!
//! ## Key Concepts
//!
//! - **Task**: a synchronous computation that polls a [`CancelFlag`]
//! - **TaskPool**: limits how many tasks run at once and enforces a deadline
//! - **TaskOutcome**: completed, timed out, or failed (the task panicked)
//!
//! ```text
//!    input 0 ──┐                     ┌── outcome 0
//!    input 1 ──┼── [semaphore: N] ───┼── outcome 1
//!    input 2 ──┘   spawn_blocking    └── outcome 2
//!                  + timeout
//! ```
//!
//! A timed-out task is not killed. Its flag is raised and the task is
//! expected to notice at its next checkpoint and return early; the pool
//! has already reported [`TaskOutcome::TimedOut`] for it by then. The
//! worker slot stays taken until the task actually returns, so abandoned
//! work never pushes the pool past its worker count.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A unit of CPU-bound work run by a [`TaskPool`].
///
/// # Example
///
/// ```rust
/// use semparse_core::parallel::{CancelFlag, Task, TaskPool};
///
/// #[derive(Clone)]
/// struct Double;
///
/// impl Task for Double {
///     type Input = i32;
///     type Output = i32;
///
///     fn run(&self, input: i32, _cancel: &CancelFlag) -> i32 {
///         input * 2
///     }
/// }
///
/// # #[tokio::main]
/// # async fn main() {
/// let pool = TaskPool::new(Double).with_workers(2);
/// let outcomes = pool.run_all(vec![1, 2, 3]).await;
/// let values: Vec<i32> = outcomes.into_iter().filter_map(|o| o.completed()).collect();
/// assert_eq!(values, vec![2, 4, 6]);
/// # }
/// ```
pub trait Task: Clone + Send + Sync + 'static {
    /// The input type for this task.
    type Input: Send + 'static;

    /// The output type produced by this task.
    type Output: Send + 'static;

    /// Execute the task. Long-running work should check `cancel` regularly.
    fn run(&self, input: Self::Input, cancel: &CancelFlag) -> Self::Output;
}

/// Cooperative cancellation signal shared between the pool and a task.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Acquire)
    }
}

/// Result of running one input through the pool.
#[derive(Debug, Clone, PartialEq)]
pub enum TaskOutcome<T> {
    /// The task returned normally.
    Completed(T),
    /// The deadline elapsed before the task returned.
    TimedOut,
    /// The task panicked or was aborted.
    Failed(String),
}

impl<T> TaskOutcome<T> {
    /// The output if the task completed.
    pub fn completed(self) -> Option<T> {
        match self {
            TaskOutcome::Completed(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_timed_out(&self) -> bool {
        matches!(self, TaskOutcome::TimedOut)
    }
}

/// Executes a [`Task`] over many inputs with bounded concurrency. Clones
/// share one set of worker slots.
#[derive(Debug, Clone)]
pub struct TaskPool<T> {
    task: T,
    workers: usize,
    permits: Arc<Semaphore>,
    timeout: Option<Duration>,
}

impl<T: Task> TaskPool<T> {
    /// A pool sized to the available parallelism, with no deadline.
    pub fn new(task: T) -> Self {
        let workers = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        Self {
            task,
            workers,
            permits: Arc::new(Semaphore::new(workers)),
            timeout: None,
        }
    }

    /// Limit the number of concurrently running tasks (at least one).
    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self.permits = Arc::new(Semaphore::new(self.workers));
        self
    }

    /// Per-input deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn task(&self) -> &T {
        &self.task
    }

    /// Run every input; outcomes are returned in input order.
    pub async fn run_all(&self, inputs: Vec<T::Input>) -> Vec<TaskOutcome<T::Output>> {
        let mut handles = Vec::with_capacity(inputs.len());

        for (index, input) in inputs.into_iter().enumerate() {
            let task = self.task.clone();
            let permits = Arc::clone(&self.permits);
            let timeout = self.timeout;
            handles.push(tokio::spawn(async move {
                let permit = match permits.acquire_owned().await {
                    Ok(permit) => permit,
                    Err(err) => return TaskOutcome::Failed(err.to_string()),
                };
                execute(task, input, permit, timeout, index).await
            }));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for handle in handles {
            outcomes.push(match handle.await {
                Ok(outcome) => outcome,
                Err(err) => TaskOutcome::Failed(err.to_string()),
            });
        }
        outcomes
    }

    /// Run a single input under the pool's deadline.
    pub async fn run_one(&self, input: T::Input) -> TaskOutcome<T::Output> {
        let permit = match Arc::clone(&self.permits).acquire_owned().await {
            Ok(permit) => permit,
            Err(err) => return TaskOutcome::Failed(err.to_string()),
        };
        execute(self.task.clone(), input, permit, self.timeout, 0).await
    }
}

/// The permit moves into the blocking closure and is released when the task
/// returns, not when the caller stops waiting for it.
async fn execute<T: Task>(
    task: T,
    input: T::Input,
    permit: OwnedSemaphorePermit,
    timeout: Option<Duration>,
    index: usize,
) -> TaskOutcome<T::Output> {
    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    let mut handle = tokio::task::spawn_blocking(move || {
        let _permit = permit;
        task.run(input, &flag)
    });

    let joined = match timeout {
        None => (&mut handle).await,
        Some(limit) => match tokio::time::timeout(limit, &mut handle).await {
            Ok(joined) => joined,
            Err(_) => {
                cancel.cancel();
                tracing::warn!(index, timeout_ms = limit.as_millis() as u64, "task timed out");
                return TaskOutcome::TimedOut;
            }
        },
    };

    match joined {
        Ok(output) => TaskOutcome::Completed(output),
        Err(err) => {
            tracing::warn!(index, error = %err, "task failed");
            TaskOutcome::Failed(err.to_string())
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
