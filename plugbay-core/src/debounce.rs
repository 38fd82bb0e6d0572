//! Coalesces bursty filesystem events per path key

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::error::HostError;

/// Per-key debounce timer.
///
/// `schedule` starts a timer for the key; another `schedule` for the same key
/// before the delay elapses cancels the earlier pending action and replaces
/// it. When the delay elapses without replacement the latest action runs
/// exactly once. Errors from the action are logged and swallowed.
pub struct Debouncer {
    delay: Duration,
    entries: Arc<Mutex<HashMap<String, Pending>>>,
    next_generation: AtomicU64,
}

struct Pending {
    generation: u64,
    cancel: CancellationToken,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            entries: Arc::new(Mutex::new(HashMap::new())),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Schedule `action` to run after the debounce delay unless replaced.
    pub fn schedule<F, Fut>(&self, key: &str, action: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = Result<(), HostError>> + Send + 'static,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::SeqCst) + 1;
        let cancel = CancellationToken::new();

        let replaced = {
            let mut entries = self.entries.lock().unwrap();
            entries.insert(
                key.to_string(),
                Pending {
                    generation,
                    cancel: cancel.clone(),
                },
            )
        };
        // The replaced task owns its token clone and drops it itself; we only
        // signal it here.
        if let Some(prior) = replaced {
            prior.cancel.cancel();
        }

        let entries = Arc::clone(&self.entries);
        let delay = self.delay;
        let key = key.to_string();
        tokio::spawn(async move {
            let fired = tokio::select! {
                _ = cancel.cancelled() => false,
                _ = tokio::time::sleep(delay) => true,
            };

            {
                let mut entries = entries.lock().unwrap();
                // A successor may already sit under this key; only remove our
                // own entry.
                if entries
                    .get(&key)
                    .is_some_and(|p| p.generation == generation)
                {
                    entries.remove(&key);
                }
            }

            if fired
                && let Err(e) = action().await
            {
                tracing::warn!(key = %key, error = %e, "debounced action failed");
            }
        });
    }

    /// Number of keys with an uncancelled pending action.
    pub fn pending_len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    /// Cancel every pending action. Used on host shutdown.
    pub fn clear(&self) {
        let drained: Vec<Pending> = {
            let mut entries = self.entries.lock().unwrap();
            entries.drain().map(|(_, pending)| pending).collect()
        };
        for pending in drained {
            pending.cancel.cancel();
        }
    }
}
