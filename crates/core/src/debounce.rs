//! Generation-based input debouncer.
//!
//! Every [`Debouncer::push`] bumps a generation counter and schedules a
//! delayed emission. When the delay elapses the value is only emitted if no
//! newer push happened in between, so a burst of keystrokes yields exactly one
//! value: the last one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

pub struct Debouncer {
    delay: Duration,
    generation: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
    tx: mpsc::UnboundedSender<String>,
}

impl Debouncer {
    /// Create a debouncer and the receiver its stabilized values arrive on.
    pub fn new(delay: Duration) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let debouncer = Self {
            delay,
            generation: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
            tx,
        };
        (debouncer, rx)
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Record a new raw value, superseding any pending emission.
    ///
    /// Must be called from within a tokio runtime.
    pub fn push(&self, value: impl Into<String>) {
        let value = value.into();
        // Generation bump and handle swap happen under one lock, so the
        // stored handle always belongs to the newest generation.
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        let gen = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        trace!(generation = gen, value = value.as_str(), "Debounce restart");

        let current = Arc::clone(&self.generation);
        let tx = self.tx.clone();
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if current.load(Ordering::SeqCst) == gen {
                // Receiver gone means nobody is listening any more.
                let _ = tx.send(value);
            }
        });

        if let Some(previous) = pending.replace(handle) {
            previous.abort();
        }
    }

    /// Drop any pending emission without emitting it.
    pub fn cancel(&self) {
        let mut pending = self.pending.lock().unwrap_or_else(|e| e.into_inner());
        self.generation.fetch_add(1, Ordering::SeqCst);
        if let Some(previous) = pending.take() {
            previous.abort();
        }
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        if let Ok(mut pending) = self.pending.lock() {
            if let Some(handle) = pending.take() {
                handle.abort();
            }
        }
    }
}
