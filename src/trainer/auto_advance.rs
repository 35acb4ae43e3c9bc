//! Single-shot auto-advance timer.
//!
//! At most one pending timer exists. Scheduling replaces (aborts) whatever
//! was pending; a timer that fires clears itself before running its action,
//! so the action may schedule the next one.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

pub struct AutoAdvanceTimer {
    dwell: Duration,
    pending: Arc<Mutex<Option<Pending>>>,
    generation: AtomicU64,
}

impl AutoAdvanceTimer {
    pub fn new(dwell: Duration) -> Self {
        Self {
            dwell,
            pending: Arc::new(Mutex::new(None)),
            generation: AtomicU64::new(0),
        }
    }

    pub fn dwell(&self) -> Duration {
        self.dwell
    }

    #[cfg(test)]
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Run `action` after the dwell time, cancelling any timer still pending.
    pub fn schedule<F>(&self, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let dwell = self.dwell;
        let pending = self.pending.clone();

        let mut slot = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.handle.abort();
        }

        let handle = tokio::spawn(async move {
            tokio::time::sleep(dwell).await;
            {
                let mut slot = pending.lock().unwrap_or_else(PoisonError::into_inner);
                match slot.as_ref() {
                    Some(p) if p.generation == generation => {
                        slot.take();
                    }
                    _ => return,
                }
            }
            debug!("Auto-advance timer fired");
            action();
        });

        *slot = Some(Pending { generation, handle });
    }

    /// Drop any pending timer without firing it.
    pub fn cancel(&self) {
        if let Some(previous) = self
            .pending
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            previous.handle.abort();
        }
    }
}

impl Drop for AutoAdvanceTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
