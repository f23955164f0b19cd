//! Fixed-size worker pool for background storage tasks.
//!
//! Tasks are futures that resolve to `Result<(), StoreError>`. A failing task is
//! reported once to the error sink (a dedicated logging task) and never retried;
//! the submitter does not observe the outcome.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::error::StoreError;

/// A unit of background work.
pub type Task = Pin<Box<dyn Future<Output = Result<(), StoreError>> + Send + 'static>>;

type TaskQueue = Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Task>>>;

#[derive(Debug, Default)]
struct PoolStats {
    completed: AtomicU64,
    failed: AtomicU64,
}

/// Bounded pool of tokio workers sharing one unbounded task queue.
///
/// Each worker runs its tasks one at a time, so execution is ordered per worker
/// but not globally. Errors go to a single logging task.
///
/// # Shutdown
///
/// [`TaskPool::stop`] closes the queue: tasks already queued still run, and
/// later [`TaskPool::add_task`] calls fail with [`StoreError::Unavailable`].
/// [`TaskPool::wait`] resolves once every submitted task has finished.
pub struct TaskPool {
    sender: Mutex<Option<mpsc::UnboundedSender<Task>>>,
    pending: Arc<watch::Sender<usize>>,
    stats: Arc<PoolStats>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    error_sink: Mutex<Option<JoinHandle<()>>>,
    size: usize,
}

impl TaskPool {
    /// Spawns `workers` workers (at least one) and the error-logging task.
    ///
    /// Must be called from within a tokio runtime.
    pub fn start(workers: usize) -> Self {
        let size = workers.max(1);
        let (task_tx, task_rx) = mpsc::unbounded_channel::<Task>();
        let (error_tx, error_rx) = mpsc::unbounded_channel::<StoreError>();
        let (pending, _) = watch::channel(0usize);

        let queue: TaskQueue = Arc::new(tokio::sync::Mutex::new(task_rx));
        let pending = Arc::new(pending);
        let stats = Arc::new(PoolStats::default());

        let handles = (0..size)
            .map(|id| {
                tokio::spawn(run_worker(
                    id,
                    queue.clone(),
                    error_tx.clone(),
                    pending.clone(),
                    stats.clone(),
                ))
            })
            .collect();

        // Workers own the only senders, so the sink ends when the last worker exits.
        drop(error_tx);
        let error_sink = tokio::spawn(log_task_errors(error_rx));

        info!(workers = size, "Task pool started");

        Self {
            sender: Mutex::new(Some(task_tx)),
            pending,
            stats,
            workers: Mutex::new(handles),
            error_sink: Mutex::new(Some(error_sink)),
            size,
        }
    }

    /// Number of workers.
    pub fn size(&self) -> usize {
        self.size
    }

    /// Queues a task for execution.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Unavailable`] if the pool has been stopped.
    pub fn add_task<F>(&self, task: F) -> Result<(), StoreError>
    where
        F: Future<Output = Result<(), StoreError>> + Send + 'static,
    {
        let guard = self
            .sender
            .lock()
            .map_err(|_| StoreError::unavailable("task pool lock poisoned"))?;
        let Some(sender) = guard.as_ref() else {
            return Err(StoreError::unavailable("task pool is stopped"));
        };

        self.pending.send_modify(|n| *n += 1);
        if sender.send(Box::pin(task)).is_err() {
            self.pending.send_modify(|n| *n -= 1);
            return Err(StoreError::unavailable("task pool is stopped"));
        }

        Ok(())
    }

    /// Closes the task queue. Already queued tasks still run.
    pub fn stop(&self) {
        if let Ok(mut guard) = self.sender.lock()
            && guard.take().is_some()
        {
            debug!("Task pool queue closed");
        }
    }

    /// Waits until every submitted task has finished.
    pub async fn wait(&self) {
        let mut rx = self.pending.subscribe();
        let _ = rx.wait_for(|pending| *pending == 0).await;
    }

    /// Stops the pool, drains the queue and joins all workers and the error sink.
    pub async fn shutdown(&self) {
        self.stop();
        self.wait().await;

        let workers = self
            .workers
            .lock()
            .map(|mut handles| std::mem::take(&mut *handles))
            .unwrap_or_default();
        for handle in workers {
            let _ = handle.await;
        }

        let sink = self.error_sink.lock().ok().and_then(|mut s| s.take());
        if let Some(sink) = sink {
            let _ = sink.await;
        }

        info!(
            completed = self.completed(),
            failed = self.failed(),
            "Task pool stopped"
        );
    }

    /// Number of tasks that finished successfully.
    pub fn completed(&self) -> u64 {
        self.stats.completed.load(Ordering::Acquire)
    }

    /// Number of tasks that returned an error or panicked.
    pub fn failed(&self) -> u64 {
        self.stats.failed.load(Ordering::Acquire)
    }

    /// Number of tasks queued or running.
    pub fn pending(&self) -> usize {
        *self.pending.borrow()
    }
}

async fn run_worker(
    id: usize,
    queue: TaskQueue,
    errors: mpsc::UnboundedSender<StoreError>,
    pending: Arc<watch::Sender<usize>>,
    stats: Arc<PoolStats>,
) {
    loop {
        let task = queue.lock().await.recv().await;
        let Some(task) = task else {
            break;
        };

        // A panic inside the task surfaces as a JoinError instead of killing the worker.
        let outcome = match tokio::spawn(task).await {
            Ok(result) => result,
            Err(e) => Err(StoreError::unavailable(format!("task panicked: {e}"))),
        };

        match outcome {
            Ok(()) => {
                stats.completed.fetch_add(1, Ordering::AcqRel);
            }
            Err(e) => {
                stats.failed.fetch_add(1, Ordering::AcqRel);
                metrics::counter!("linkstore_tasks_failed_total").increment(1);
                let _ = errors.send(e);
            }
        }

        pending.send_modify(|n| *n = n.saturating_sub(1));
    }

    debug!(worker = id, "Task pool worker exited");
}

async fn log_task_errors(mut errors: mpsc::UnboundedReceiver<StoreError>) {
    while let Some(err) = errors.recv().await {
        error!(error = %err, "Task pool task failed");
    }
}
