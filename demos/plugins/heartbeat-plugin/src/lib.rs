//! Heartbeat Plugin - A simple example plugin for the plugbay console host
//!
//! This plugin demonstrates:
//! - Basic plugin structure with the `export_feature!` macro
//! - Implementing the `Feature` trait
//! - Owning a background resource and releasing it in `dispose`
//!
//! ## Building
//!
//! ```bash
//! cargo build --release -p heartbeat-plugin
//! ```
//!
//! ## Installing
//!
//! Copy the built library into the watched plugin directory:
//!
//! ```bash
//! cp target/release/libheartbeat_plugin.so plugins/heartbeat.so
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread;
use std::time::Duration;

use plugbay_api::{Feature, PluginError, export_feature};

/// Counts heartbeats on a background thread until disposed.
#[derive(Default)]
pub struct HeartbeatPlugin {
    stop: Arc<AtomicBool>,
    beats: Arc<AtomicU64>,
    worker: Option<thread::JoinHandle<()>>,
}

impl Feature for HeartbeatPlugin {
    fn name(&self) -> &str {
        "heartbeat"
    }

    fn start(&mut self) -> Result<(), PluginError> {
        let stop = Arc::clone(&self.stop);
        let beats = Arc::clone(&self.beats);
        self.worker = Some(thread::spawn(move || {
            while !stop.load(Ordering::SeqCst) {
                beats.fetch_add(1, Ordering::SeqCst);
                thread::sleep(Duration::from_secs(1));
            }
        }));
        Ok(())
    }

    fn dispose(&mut self) -> Result<(), PluginError> {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(worker) = self.worker.take() {
            worker
                .join()
                .map_err(|_| PluginError::custom("heartbeat worker panicked"))?;
        }
        Ok(())
    }
}

export_feature!(HeartbeatPlugin);
