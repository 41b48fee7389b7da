//! Work queues connecting the pipeline stages.
//!
//! Each queue is an unbounded tokio mpsc channel whose receiving half is
//! shared by every worker of the consuming stage. Shutdown is an explicit
//! [`WorkItem::Shutdown`] marker, enqueued once per consuming worker by the
//! orchestrator after the producing stage has fully exited.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

/// An item travelling through a work queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkItem<T> {
    /// A unit of work
    Data(T),
    /// No more work will arrive for the worker that receives this
    Shutdown,
}

/// Returned when a send finds every receiver gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueClosed;

impl std::fmt::Display for QueueClosed {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("work queue closed")
    }
}

impl std::error::Error for QueueClosed {}

/// Create a connected sender / shared-receiver pair.
pub fn work_queue<T>() -> (WorkSender<T>, WorkQueue<T>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        WorkSender { tx },
        WorkQueue {
            rx: Arc::new(Mutex::new(rx)),
        },
    )
}

/// Producer handle. Cheap to clone; every producing worker gets one.
pub struct WorkSender<T> {
    tx: mpsc::UnboundedSender<WorkItem<T>>,
}

impl<T> Clone for WorkSender<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T> WorkSender<T> {
    /// Enqueue one unit of work.
    pub fn send(&self, item: T) -> Result<(), QueueClosed> {
        self.tx.send(WorkItem::Data(item)).map_err(|_| QueueClosed)
    }

    /// Enqueue `workers` shutdown markers, one per consuming worker.
    pub fn shutdown(&self, workers: usize) -> Result<(), QueueClosed> {
        for _ in 0..workers {
            self.tx.send(WorkItem::Shutdown).map_err(|_| QueueClosed)?;
        }
        Ok(())
    }
}

/// Consumer handle shared by all workers of one stage.
pub struct WorkQueue<T> {
    rx: Arc<Mutex<mpsc::UnboundedReceiver<WorkItem<T>>>>,
}

impl<T> Clone for WorkQueue<T> {
    fn clone(&self) -> Self {
        Self {
            rx: Arc::clone(&self.rx),
        }
    }
}

impl<T> WorkQueue<T> {
    /// Receive the next item. `None` means every sender is gone.
    pub async fn recv(&self) -> Option<WorkItem<T>> {
        self.rx.lock().await.recv().await
    }

    /// Receive the next unit of work.
    ///
    /// Returns `None` on a shutdown marker, on a closed queue, or once
    /// `cancel` fires.
    pub async fn next(&self, cancel: &CancellationToken) -> Option<T> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            item = self.recv() => match item {
                Some(WorkItem::Data(item)) => Some(item),
                Some(WorkItem::Shutdown) | None => None,
            },
        }
    }
}

/// Per-worker tally of a fallible stage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StageTally {
    pub succeeded: u64,
    pub failed: u64,
}

/// One worker of a pipeline stage that maps each input to at most one output.
pub struct PipelineStage<I, O> {
    input: WorkQueue<I>,
    output: WorkSender<O>,
    cancel: CancellationToken,
}

impl<I, O> PipelineStage<I, O> {
    /// Create a new stage worker.
    pub fn new(input: WorkQueue<I>, output: WorkSender<O>, cancel: CancellationToken) -> Self {
        Self {
            input,
            output,
            cancel,
        }
    }

    /// Run the worker with a fallible processing function.
    ///
    /// `Ok` outputs are forwarded downstream. `Err` is handed to `on_error`
    /// and the item is dropped. Runs until this worker's shutdown marker,
    /// cancellation, or a closed downstream queue.
    pub async fn run_fallible<F, Fut, E, H>(self, f: F, on_error: H) -> StageTally
    where
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<O, E>>,
        H: Fn(&E),
    {
        let mut tally = StageTally::default();
        while let Some(item) = self.input.next(&self.cancel).await {
            match f(item).await {
                Ok(result) => {
                    tally.succeeded += 1;
                    if self.output.send(result).is_err() {
                        // Downstream closed, stop processing
                        break;
                    }
                }
                Err(e) => {
                    tally.failed += 1;
                    on_error(&e);
                }
            }
        }
        tally
    }
}
