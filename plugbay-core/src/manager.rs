//! Plugin lifecycle orchestration: load, unload, hot-swap
//!
//! The manager owns the debouncer and the watcher, drives the isolated
//! domains, and (in web mode) pushes route entries into the registry. Per
//! artifact there is at most one loaded handle, keyed by canonical path.
//!
//! Lock order: the loaded-plugin lock is taken before the pending-disposal
//! lock, never the reverse.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};
use std::time::Instant;

use plugbay_api::{EndpointModule, Feature};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;

use crate::config::HostConfig;
use crate::debounce::Debouncer;
use crate::domain::{HostMode, PluginDomain, PluginInstance};
use crate::error::HostError;
use crate::routes::{RouteCollector, RouteRegistry};
use crate::watcher::{ArtifactEvent, PluginWatcher, is_artifact};

/// Stable key for one artifact path. Case-folded on platforms whose
/// filesystems are case-insensitive.
fn artifact_key(path: &Path) -> String {
    let canonical = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
    let key = canonical.to_string_lossy().into_owned();
    if cfg!(any(windows, target_os = "macos")) {
        key.to_lowercase()
    } else {
        key
    }
}

/// A successfully loaded plugin.
///
/// `instance` is declared before `domain` so plugin code is dropped before
/// its library mapping.
struct PluginHandle {
    plugin_name: String,
    version: Option<String>,
    instance: PluginInstance,
    domain: PluginDomain,
    source_path: PathBuf,
    route_owners: Vec<String>,
}

/// An instance retired by a hot-swap. Routes were already removed; the
/// instance and its library stay alive until the grace deadline so in-flight
/// requests that captured a handler can finish.
struct RetiredPlugin {
    plugin_name: String,
    instance: PluginInstance,
    domain: PluginDomain,
}

/// Deadline-ordered holding area for retired items.
struct DisposalQueue<T> {
    items: Vec<(Instant, T)>,
}

impl<T> DisposalQueue<T> {
    fn new() -> Self {
        Self { items: Vec::new() }
    }

    fn push(&mut self, deadline: Instant, item: T) {
        self.items.push((deadline, item));
    }

    /// Remove and return every item whose deadline is at or before `now`.
    fn take_expired(&mut self, now: Instant) -> Vec<T> {
        let mut expired = Vec::new();
        let mut keep = Vec::with_capacity(self.items.len());
        for (deadline, item) in self.items.drain(..) {
            if deadline <= now {
                expired.push(item);
            } else {
                keep.push((deadline, item));
            }
        }
        self.items = keep;
        expired
    }

    /// Remove and return everything regardless of deadline.
    fn drain_all(&mut self) -> Vec<T> {
        self.items.drain(..).map(|(_, item)| item).collect()
    }

    fn len(&self) -> usize {
        self.items.len()
    }
}

/// Snapshot row for host introspection
#[derive(Debug, Clone)]
pub struct PluginSummary {
    pub name: String,
    pub version: Option<String>,
    pub file: String,
}

/// Orchestrates discovery, isolated loading, hot-swap and disposal of
/// plugins in the configured directory.
pub struct LifecycleManager {
    config: HostConfig,
    mode: HostMode,
    routes: Arc<RouteRegistry>,
    loaded: Mutex<HashMap<String, PluginHandle>>,
    pending: StdMutex<DisposalQueue<RetiredPlugin>>,
    debouncer: Debouncer,
    watcher: StdMutex<Option<PluginWatcher>>,
    pump: StdMutex<Option<JoinHandle<()>>>,
    started: AtomicBool,
    disposed: AtomicBool,
}

impl LifecycleManager {
    pub fn new(config: HostConfig, mode: HostMode) -> Arc<Self> {
        let debouncer = Debouncer::new(config.debounce);
        Arc::new(Self {
            config,
            mode,
            routes: Arc::new(RouteRegistry::new()),
            loaded: Mutex::new(HashMap::new()),
            pending: StdMutex::new(DisposalQueue::new()),
            debouncer,
            watcher: StdMutex::new(None),
            pump: StdMutex::new(None),
            started: AtomicBool::new(false),
            disposed: AtomicBool::new(false),
        })
    }

    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    pub fn mode(&self) -> HostMode {
        self.mode
    }

    /// The endpoint data source consumed by the router (web mode).
    pub fn routes(&self) -> Arc<RouteRegistry> {
        Arc::clone(&self.routes)
    }

    /// Start watching the plugin directory and schedule a load for every
    /// artifact already present. Idempotent.
    pub async fn start(self: &Arc<Self>) -> Result<(), HostError> {
        self.ensure_live()?;
        if self.started.swap(true, Ordering::SeqCst) {
            return Ok(());
        }
        match self.start_inner().await {
            Ok(()) => Ok(()),
            Err(e) => {
                // A failed start may be retried.
                self.started.store(false, Ordering::SeqCst);
                Err(e)
            }
        }
    }

    async fn start_inner(self: &Arc<Self>) -> Result<(), HostError> {
        let dir = self.config.plugins_dir.clone();
        std::fs::create_dir_all(&dir).map_err(|source| HostError::PluginsDirUnavailable {
            path: dir.clone(),
            source,
        })?;

        for entry in std::fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_file() && is_artifact(&path) {
                self.schedule_reload(path);
            }
        }

        let (tx, rx) = mpsc::channel(256);
        let watcher = PluginWatcher::start(&dir, tx)?;
        *self.watcher.lock().unwrap() = Some(watcher);
        let pump = tokio::spawn(Self::pump_events(Arc::downgrade(self), rx));
        *self.pump.lock().unwrap() = Some(pump);

        tracing::info!(dir = %dir.display(), mode = ?self.mode, "plugin host started");
        Ok(())
    }

    async fn pump_events(manager: Weak<Self>, mut rx: mpsc::Receiver<ArtifactEvent>) {
        while let Some(event) = rx.recv().await {
            let Some(manager) = manager.upgrade() else {
                break;
            };
            match event {
                ArtifactEvent::Reload(path) => manager.schedule_reload(path),
                ArtifactEvent::Unload(path) => {
                    if let Err(e) = manager.unload(&path).await {
                        tracing::warn!(path = %path.display(), error = %e, "unload failed");
                    }
                }
            }
        }
    }

    /// Debounced reload entry point used by the watcher and by `start`.
    fn schedule_reload(self: &Arc<Self>, path: PathBuf) {
        let key = artifact_key(&path);
        let manager = Arc::downgrade(self);
        self.debouncer.schedule(&key, move || async move {
            match manager.upgrade() {
                Some(manager) => manager.reload(&path).await,
                None => Ok(()),
            }
        });
    }

    /// Load `path`, hot-swapping any previously loaded version.
    ///
    /// Routing is swapped before the old instance is disposed: the retired
    /// instance sits in the pending-disposal queue for the grace period so
    /// requests that already captured a handler keep working. Requests longer
    /// than the grace period are outside the safe-swap contract.
    pub async fn reload(&self, path: &Path) -> Result<(), HostError> {
        self.ensure_live()?;
        let key = artifact_key(path);

        let result = {
            let mut loaded = self.loaded.lock().await;
            if let Some(previous) = loaded.remove(&key) {
                self.retire(previous);
            }
            self.try_load(&mut loaded, &key, path).await
        };

        self.process_pending_disposals();
        result
    }

    /// Take a replaced handle out of service. Its routes disappear
    /// immediately; the instance is disposed now or after the grace period
    /// depending on the host shape.
    fn retire(&self, handle: PluginHandle) {
        self.routes.remove_owners(&handle.route_owners);
        if self.mode == HostMode::Web && self.config.enable_hot_swap {
            let PluginHandle {
                plugin_name,
                instance,
                domain,
                ..
            } = handle;
            tracing::info!(
                plugin = %plugin_name,
                grace = ?self.config.grace_period,
                "previous version retired, disposal deferred"
            );
            let deadline = Instant::now() + self.config.grace_period;
            self.pending.lock().unwrap().push(
                deadline,
                RetiredPlugin {
                    plugin_name,
                    instance,
                    domain,
                },
            );
        } else {
            self.dispose_handle(handle);
        }
    }

    /// Load algorithm: isolated domain, capability lookup, instantiate,
    /// start/register, then install the handle. Any failure before the
    /// install leaves no side effects behind.
    async fn try_load(
        &self,
        loaded: &mut HashMap<String, PluginHandle>,
        key: &str,
        path: &Path,
    ) -> Result<(), HostError> {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let domain = PluginDomain::load(path, &self.config.retry_policy()).await?;
        let version = domain.plugin_version();

        let mut instance = match domain.instantiate(self.mode) {
            Ok(instance) => instance,
            Err(e) => {
                if matches!(e, HostError::NoCompatibleType { .. }) {
                    tracing::warn!(file = %file_name, "artifact exposes no compatible plugin type");
                }
                domain.unload();
                return Err(e);
            }
        };

        let plugin_name = {
            let declared = instance.name();
            if declared.is_empty() {
                path.file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| file_name.clone())
            } else {
                declared.to_string()
            }
        };

        let dispatched = match &mut instance {
            PluginInstance::Feature(feature) => Self::start_feature(&plugin_name, feature.as_mut()),
            PluginInstance::Endpoints(module) => {
                self.register_endpoints(&plugin_name, module.as_mut())
            }
        };
        let route_owners = match dispatched {
            Ok(owners) => owners,
            Err(e) => {
                drop(instance);
                domain.unload();
                return Err(e);
            }
        };

        tracing::info!(
            plugin = %plugin_name,
            version = version.as_deref().unwrap_or("unknown"),
            file = %file_name,
            "plugin loaded"
        );
        loaded.insert(
            key.to_string(),
            PluginHandle {
                plugin_name,
                version,
                instance,
                domain,
                source_path: path.to_path_buf(),
                route_owners,
            },
        );
        Ok(())
    }

    fn start_feature(plugin: &str, feature: &mut dyn Feature) -> Result<Vec<String>, HostError> {
        match catch_unwind(AssertUnwindSafe(|| feature.start())) {
            Ok(Ok(())) => Ok(Vec::new()),
            Ok(Err(e)) => Err(HostError::Construction {
                plugin: plugin.to_string(),
                stage: "start",
                message: e.to_string(),
            }),
            Err(_) => Err(HostError::Construction {
                plugin: plugin.to_string(),
                stage: "start",
                message: "panicked".to_string(),
            }),
        }
    }

    /// Run `register` against a collector, then commit all collected entries
    /// to the registry as one snapshot change.
    fn register_endpoints(
        &self,
        plugin: &str,
        module: &mut dyn EndpointModule,
    ) -> Result<Vec<String>, HostError> {
        let mut collector = RouteCollector::new(module.name());
        match catch_unwind(AssertUnwindSafe(|| module.register(&mut collector))) {
            Ok(Ok(())) => {
                if collector.is_empty() {
                    tracing::warn!(plugin, "endpoint module registered no routes");
                }
                let owners = collector.owners();
                self.routes.add_batch(collector.into_entries());
                Ok(owners)
            }
            Ok(Err(e)) => Err(HostError::Construction {
                plugin: plugin.to_string(),
                stage: "register",
                message: e.to_string(),
            }),
            Err(_) => Err(HostError::Construction {
                plugin: plugin.to_string(),
                stage: "register",
                message: "panicked".to_string(),
            }),
        }
    }

    /// Immediate unload. A no-op when nothing is loaded under the path's key.
    pub async fn unload(&self, path: &Path) -> Result<(), HostError> {
        self.ensure_live()?;
        let key = artifact_key(path);

        let mut loaded = self.loaded.lock().await;
        if let Some(handle) = loaded.remove(&key) {
            self.routes.remove_owners(&handle.route_owners);
            tracing::info!(plugin = %handle.plugin_name, "plugin unloaded");
            self.dispose_handle(handle);
        }
        Ok(())
    }

    /// Dispose an instance and drop its domain. Dispose errors are logged,
    /// never propagated; an uncooperative plugin must not block others.
    fn dispose_handle(&self, handle: PluginHandle) {
        let PluginHandle {
            plugin_name,
            mut instance,
            domain,
            ..
        } = handle;
        Self::dispose_instance(&plugin_name, &mut instance);
        drop(instance);
        domain.unload();
    }

    fn dispose_instance(plugin: &str, instance: &mut PluginInstance) {
        match catch_unwind(AssertUnwindSafe(|| instance.dispose())) {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                tracing::warn!(plugin, error = %e, "plugin dispose returned error");
            }
            Err(_) => {
                tracing::warn!(plugin, "plugin panicked in dispose");
            }
        }
    }

    /// Dispose every retired instance whose grace deadline has passed.
    pub fn process_pending_disposals(&self) {
        let expired = {
            let mut pending = self.pending.lock().unwrap();
            pending.take_expired(Instant::now())
        };
        for retired in expired {
            tracing::info!(
                plugin = %retired.plugin_name,
                "grace period elapsed, disposing retired instance"
            );
            let RetiredPlugin {
                plugin_name,
                mut instance,
                domain,
            } = retired;
            Self::dispose_instance(&plugin_name, &mut instance);
            drop(instance);
            domain.unload();
        }
    }

    /// Number of retired instances still inside their grace period.
    pub fn pending_disposal_len(&self) -> usize {
        self.pending.lock().unwrap().len()
    }

    /// Snapshot of loaded plugins: name to artifact file name.
    pub async fn loaded_plugins(&self) -> Result<HashMap<String, String>, HostError> {
        self.ensure_live()?;
        let loaded = self.loaded.lock().await;
        Ok(loaded
            .values()
            .map(|handle| {
                let file = handle
                    .source_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default();
                (handle.plugin_name.clone(), file)
            })
            .collect())
    }

    /// Richer snapshot used by introspection endpoints.
    pub async fn plugin_summaries(&self) -> Result<Vec<PluginSummary>, HostError> {
        self.ensure_live()?;
        let loaded = self.loaded.lock().await;
        let mut summaries: Vec<PluginSummary> = loaded
            .values()
            .map(|handle| PluginSummary {
                name: handle.plugin_name.clone(),
                version: handle.version.clone(),
                file: handle
                    .source_path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default(),
            })
            .collect();
        summaries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summaries)
    }

    /// Irreversible shutdown. Idempotent; the second call is a no-op.
    ///
    /// Order: stop the watcher, dispose every loaded instance, then dispose
    /// every queued instance regardless of deadline.
    pub async fn dispose(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }

        drop(self.watcher.lock().unwrap().take());
        if let Some(pump) = self.pump.lock().unwrap().take() {
            pump.abort();
        }
        self.debouncer.clear();

        let drained: Vec<PluginHandle> = {
            let mut loaded = self.loaded.lock().await;
            loaded.drain().map(|(_, handle)| handle).collect()
        };
        for handle in drained {
            self.routes.remove_owners(&handle.route_owners);
            self.dispose_handle(handle);
        }

        let retired = {
            let mut pending = self.pending.lock().unwrap();
            pending.drain_all()
        };
        for item in retired {
            let RetiredPlugin {
                plugin_name,
                mut instance,
                domain,
            } = item;
            Self::dispose_instance(&plugin_name, &mut instance);
            drop(instance);
            domain.unload();
        }

        tracing::info!("plugin host disposed");
    }

    fn ensure_live(&self) -> Result<(), HostError> {
        if self.disposed.load(Ordering::SeqCst) {
            Err(HostError::AlreadyDisposed)
        } else {
            Ok(())
        }
    }
}
