//! Per-key debouncing on the tokio timer.
//!
//! Each key owns at most one pending task. Scheduling a new task for a key
//! aborts the previous one, so a task only runs once its key has been quiet
//! for the whole delay.

use dashmap::{mapref::entry::Entry, DashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::debug;

struct Pending {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Table of pending per-key tasks
pub struct Debouncer {
    delay: Duration,
    pending: Arc<DashMap<String, Pending>>,
    next_generation: AtomicU64,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            pending: Arc::new(DashMap::new()),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Schedule `task` for `key`, replacing any task still waiting for it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, key: &str, task: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let delay = self.delay;
        let pending = self.pending.clone();
        let task_key = key.to_string();

        // The entry guard is held until the new handle is stored, so the task
        // cannot observe the table before its own registration.
        let entry = self.pending.entry(key.to_string());

        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let still_current = pending
                .remove_if(&task_key, |_, p| p.generation == generation)
                .is_some();
            if still_current {
                task();
            }
        });

        match entry {
            Entry::Occupied(mut occupied) => {
                let previous = occupied.insert(Pending { generation, handle });
                previous.handle.abort();
                debug!("Rescheduled pending task for {}", key);
            }
            Entry::Vacant(vacant) => {
                vacant.insert(Pending { generation, handle });
            }
        }
    }

    /// Drop the pending task for `key`. Returns whether one was waiting.
    pub fn cancel(&self, key: &str) -> bool {
        match self.pending.remove(key) {
            Some((_, pending)) => {
                pending.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Number of keys with a waiting task
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Abort every waiting task
    pub fn cancel_all(&self) {
        self.pending.retain(|_, pending| {
            pending.handle.abort();
            false
        });
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
