//! Bounded worker pool for deferred pipeline runs
//!
//! Jobs go through a bounded `mpsc` queue to a single dispatcher task. The dispatcher
//! takes a job off the queue only once one of `workers` slots is free and runs it on
//! tokio's blocking pool, since the pipeline is CPU-bound with no suspension points.
//! Submission is two-step: [`WorkerPool::reserve`] claims queue space without waiting
//! and fails with [`IngestError::QueueSaturated`] when there is none.

use crate::{IngestError, Result, WorkerConfig};
use std::sync::{Arc, Mutex};
use tokio::sync::Semaphore;
use tokio::sync::mpsc::{self, OwnedPermit, error::TrySendError};
use tokio::task::{JoinHandle, JoinSet};

pub struct WorkerPool<J: Send + 'static> {
    sender: Mutex<Option<mpsc::Sender<J>>>,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    queue_capacity: usize,
}

impl<J: Send + 'static> WorkerPool<J> {
    /// Spawn the dispatcher on the current tokio runtime
    ///
    /// # Errors
    /// [`IngestError::NoRuntime`] outside a runtime context,
    /// [`IngestError::InvalidConfig`] for zero workers or queue capacity.
    pub fn start<H>(config: &WorkerConfig, handler: H) -> Result<Self>
    where
        H: Fn(J) + Send + Sync + 'static,
    {
        if config.workers == 0 || config.queue_capacity == 0 {
            return Err(IngestError::InvalidConfig(
                "worker pool needs at least one worker and one queue slot".to_string(),
            ));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| IngestError::NoRuntime)?;

        let (sender, receiver) = mpsc::channel(config.queue_capacity);
        let slots = Arc::new(Semaphore::new(config.workers));
        let dispatcher = runtime.spawn(dispatch(receiver, slots, Arc::new(handler)));

        tracing::debug!(
            workers = config.workers,
            queue_capacity = config.queue_capacity,
            "Worker pool started"
        );

        Ok(Self {
            sender: Mutex::new(Some(sender)),
            dispatcher: Mutex::new(Some(dispatcher)),
            queue_capacity: config.queue_capacity,
        })
    }

    /// Claim a queue slot without waiting. Send the job through the returned permit.
    pub fn reserve(&self) -> Result<OwnedPermit<J>> {
        let sender = self
            .sender
            .lock()
            .map_err(|_| IngestError::ShuttingDown)?
            .clone()
            .ok_or(IngestError::ShuttingDown)?;

        sender.try_reserve_owned().map_err(|err| match err {
            TrySendError::Full(_) => IngestError::QueueSaturated {
                capacity: self.queue_capacity,
            },
            TrySendError::Closed(_) => IngestError::ShuttingDown,
        })
    }

    /// Stop accepting jobs, then wait for queued and running jobs to finish
    pub async fn shutdown(&self) {
        if let Ok(mut sender) = self.sender.lock() {
            sender.take();
        }
        let dispatcher = match self.dispatcher.lock() {
            Ok(mut dispatcher) => dispatcher.take(),
            Err(_) => None,
        };
        if let Some(dispatcher) = dispatcher
            && let Err(e) = dispatcher.await
        {
            tracing::error!("Worker pool dispatcher failed: {e}");
        }
        tracing::debug!("Worker pool stopped");
    }
}

async fn dispatch<J, H>(mut receiver: mpsc::Receiver<J>, slots: Arc<Semaphore>, handler: Arc<H>)
where
    J: Send + 'static,
    H: Fn(J) + Send + Sync + 'static,
{
    let mut running = JoinSet::new();
    loop {
        let Ok(slot) = Arc::clone(&slots).acquire_owned().await else {
            break;
        };
        let Some(job) = receiver.recv().await else {
            break;
        };
        let handler = Arc::clone(&handler);
        running.spawn_blocking(move || {
            let _slot = slot;
            handler(job);
        });
        while let Some(finished) = running.try_join_next() {
            log_join(finished);
        }
    }
    while let Some(finished) = running.join_next().await {
        log_join(finished);
    }
}

fn log_join(result: std::result::Result<(), tokio::task::JoinError>) {
    if let Err(e) = result {
        tracing::error!("Worker job aborted: {e}");
    }
}
