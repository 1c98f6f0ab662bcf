// Copyright 2026 Dropbox (created by Andrew Yates <ayates@dropbox.com>)
// Driftwatch Core - Ingest Buffer

//! # Ingest Buffer
//!
//! Bounded queue between any number of producers and the single ingestion
//! consumer. Enqueue is non-blocking by contract: a full buffer rejects with
//! [`Error::BufferFull`] rather than making the producer wait, which is the
//! backpressure signal the transport surfaces as a retryable condition.
//!
//! `close()` stops new enqueues; samples already queued are still delivered
//! to the consumer before the drain terminates (graceful shutdown).
//!
//! A single consumer is assumed. [`SampleDrain`] is owned by value and not
//! cloneable, so FIFO consumption order is enforced by construction.

use crate::error::Error;
use crate::sample::Sample;
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Default ingest buffer capacity.
/// 1000 samples absorbs multi-second producer bursts at typical rates before
/// backpressure kicks in.
pub const DEFAULT_INGEST_BUFFER_SIZE: usize = 1000;

/// Producer-side handle to the bounded ingest queue.
///
/// Cheap to clone; all clones share the same queue and close state.
#[derive(Clone)]
pub struct IngestBuffer {
    // `None` after close. The mutex is held only for the O(1) try_send.
    tx: Arc<Mutex<Option<mpsc::Sender<Sample>>>>,
    capacity: usize,
}

/// Consumer-side drain of the ingest queue. Single consumer, FIFO order.
pub struct SampleDrain {
    rx: mpsc::Receiver<Sample>,
}

impl IngestBuffer {
    /// Create a buffer with the given capacity, returning the producer
    /// handle and the single consumer drain.
    ///
    /// A capacity of zero falls back to [`DEFAULT_INGEST_BUFFER_SIZE`].
    #[must_use]
    pub fn new(capacity: usize) -> (Self, SampleDrain) {
        let capacity = if capacity == 0 {
            tracing::warn!(
                fallback = DEFAULT_INGEST_BUFFER_SIZE,
                "ingest buffer capacity must be > 0, using default"
            );
            DEFAULT_INGEST_BUFFER_SIZE
        } else {
            capacity
        };
        let (tx, rx) = mpsc::channel(capacity);
        (
            Self {
                tx: Arc::new(Mutex::new(Some(tx))),
                capacity,
            },
            SampleDrain { rx },
        )
    }

    /// Configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Non-blocking enqueue.
    ///
    /// # Errors
    ///
    /// [`Error::BufferFull`] when the queue holds `capacity` unconsumed
    /// samples, [`Error::BufferClosed`] after [`Self::close`] or once the
    /// consumer has gone away.
    pub fn try_enqueue(&self, sample: Sample) -> Result<(), Error> {
        let guard = self.tx.lock();
        match guard.as_ref() {
            Some(tx) => tx.try_send(sample).map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => Error::BufferFull,
                mpsc::error::TrySendError::Closed(_) => Error::BufferClosed,
            }),
            None => Err(Error::BufferClosed),
        }
    }

    /// Stop accepting new enqueues.
    ///
    /// Queued samples remain deliverable; the drain yields them and then
    /// terminates. Idempotent, and effective across all clones of this
    /// handle.
    pub fn close(&self) {
        if self.tx.lock().take().is_some() {
            tracing::debug!("ingest buffer closed");
        }
    }

    /// Whether the buffer has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.lock().is_none()
    }
}

impl SampleDrain {
    /// Receive the next sample in FIFO order.
    ///
    /// Returns `None` once the buffer is closed and all queued samples have
    /// been delivered.
    pub async fn recv(&mut self) -> Option<Sample> {
        self.rx.recv().await
    }
}
