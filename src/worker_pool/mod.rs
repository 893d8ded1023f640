//! Fixed-size pool of worker tasks consuming a bounded submission queue.
//!
//! Mirrors the shape of the teacher crate's session pool (a shared handle
//! owning the work, `Arc`-cloned into every task) but the unit of work here
//! is a whole connection lifetime rather than a single PDU round-trip.

// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

use std::{future::Future, pin::Pin, sync::Arc};

use thiserror::Error;
use tokio::{
    sync::{Mutex, mpsc},
    task::JoinHandle,
};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

pub type Task = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("pool is shutting down")]
    ShuttingDown,
    #[error("submission queue is closed")]
    Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownMode {
    /// Stop accepting new work, then wait for the queue to drain naturally.
    Wait,
    /// Stop accepting new work and cancel the shared token so in-flight
    /// sessions unwind at their next cancellation checkpoint.
    Immediate,
}

/// N fixed worker tasks pulling from one bounded MPSC channel.
pub struct WorkerPool {
    tx: mpsc::Sender<Task>,
    handles: Vec<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl WorkerPool {
    pub fn new(worker_count: usize, queue_capacity: usize, cancel: CancellationToken) -> Self {
        let (tx, rx) = mpsc::channel::<Task>(queue_capacity);
        let rx = Arc::new(Mutex::new(rx));

        let handles = (0..worker_count)
            .map(|id| {
                let rx = Arc::clone(&rx);
                tokio::spawn(async move {
                    loop {
                        let task = {
                            let mut rx = rx.lock().await;
                            rx.recv().await
                        };
                        match task {
                            // Run each unit of work on its own spawned task so a
                            // panic inside it doesn't unwind this worker's loop;
                            // the worker just logs and goes back to `recv`.
                            Some(task) => {
                                if let Err(e) = tokio::spawn(task).await {
                                    warn!(worker = id, "session task panicked: {e}");
                                }
                            },
                            None => break,
                        }
                    }
                    debug!(worker = id, "worker exiting, queue drained");
                })
            })
            .collect();

        Self { tx, handles, cancel }
    }

    /// Submits a unit of work. Fails without panicking if the pool has
    /// already begun shutting down or its receivers are gone.
    pub async fn submit(&self, task: Task) -> Result<(), SubmitError> {
        if self.cancel.is_cancelled() {
            return Err(SubmitError::ShuttingDown);
        }
        self.tx.send(task).await.map_err(|_| SubmitError::Closed)
    }

    /// Closes the submission queue and waits for every worker to exit.
    pub async fn shutdown(self, mode: ShutdownMode) {
        if mode == ShutdownMode::Immediate {
            self.cancel.cancel();
        }
        drop(self.tx);
        for handle in self.handles {
            if let Err(e) = handle.await {
                warn!("worker task panicked: {e}");
            }
        }
    }
}
