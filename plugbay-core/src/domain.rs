//! Isolated per-plugin loading container
//!
//! A [`PluginDomain`] owns the dynamic library mapping for exactly one
//! artifact. The platform loader resolves the plugin's private transitive
//! dependencies from the artifact's directory; contract types stay identical
//! across the boundary because both sides were built against the same
//! `plugbay-api` ABI, which the host verifies through the exported version
//! tag before constructing anything.

use std::ffi::CStr;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::time::Duration;

use libloading::{Library, Symbol};
use plugbay_api::{API_VERSION, EndpointModule, Feature, PluginError};

use crate::error::HostError;

/// Which capability interface the host expects from an artifact
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostMode {
    /// Console host: plugins are [`Feature`] lifecycle objects
    Console,
    /// Web host: plugins are [`EndpointModule`]s publishing routes
    Web,
}

/// Pacing for the load path: library mapping attempts plus the readability
/// probe that rides out transient write locks during builds and copies.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub delay: Duration,
    pub readable_budget: Duration,
    pub readable_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 5,
            delay: Duration::from_millis(100),
            readable_budget: Duration::from_secs(5),
            readable_interval: Duration::from_millis(100),
        }
    }
}

/// A constructed plugin instance of either capability
pub enum PluginInstance {
    Feature(Box<dyn Feature>),
    Endpoints(Box<dyn EndpointModule>),
}

impl PluginInstance {
    /// The plugin's self-declared name; may be empty.
    pub fn name(&self) -> &str {
        match self {
            PluginInstance::Feature(p) => p.name(),
            PluginInstance::Endpoints(p) => p.name(),
        }
    }

    pub fn dispose(&mut self) -> Result<(), PluginError> {
        match self {
            PluginInstance::Feature(p) => p.dispose(),
            PluginInstance::Endpoints(p) => p.dispose(),
        }
    }
}

/// Execution-scoped container for one plugin artifact.
///
/// Dropping the domain unmaps the library, so anything that still references
/// code inside it (instances, route handlers) must be dropped first. Holders
/// declare their instance fields before the domain field to get that order.
pub struct PluginDomain {
    library: Library,
    source_path: PathBuf,
}

impl PluginDomain {
    /// Map the artifact at `path` into a new domain.
    ///
    /// The file is probed for readability first (bounded retries, so a build
    /// still copying the file does not fail the load), then mapped with up to
    /// `retry.attempts` attempts. A missing file aborts immediately.
    pub async fn load(path: &Path, retry: &RetryPolicy) -> Result<Self, HostError> {
        wait_until_readable(path, retry).await?;

        let mut attempt = 0;
        let library = loop {
            attempt += 1;
            // SAFETY: the artifact comes from the operator-controlled plugin
            // directory and is expected to follow the plugbay ABI contract.
            match unsafe { Library::new(path) } {
                Ok(library) => break library,
                Err(e) if attempt < retry.attempts => {
                    tracing::debug!(
                        path = %path.display(),
                        attempt,
                        error = %e,
                        "library mapping failed, retrying"
                    );
                    tokio::time::sleep(retry.delay).await;
                }
                Err(e) => return Err(e.into()),
            }
        };

        let domain = Self {
            library,
            source_path: path.to_path_buf(),
        };
        domain.check_api_version()?;
        Ok(domain)
    }

    /// Verify the library was built against the host's contracts version.
    ///
    /// A library without the version symbol is not a plugbay plugin at all
    /// and surfaces as a symbol resolution error.
    fn check_api_version(&self) -> Result<(), HostError> {
        let version_fn: Symbol<extern "C" fn() -> u32> =
            unsafe { self.library.get(b"_plugbay_api_version") }?;
        let found = version_fn();
        if found != API_VERSION {
            return Err(HostError::ApiVersionMismatch {
                expected: API_VERSION,
                found,
            });
        }
        Ok(())
    }

    /// The plugin crate's self-declared version, when exported.
    pub fn plugin_version(&self) -> Option<String> {
        let version_fn: Symbol<extern "C" fn() -> *const std::os::raw::c_char> =
            unsafe { self.library.get(b"_plugbay_plugin_version") }.ok()?;
        let ptr = version_fn();
        if ptr.is_null() {
            return None;
        }
        // SAFETY: the export macro emits a NUL-terminated static string.
        Some(unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned())
    }

    /// Construct the plugin instance through the capability entry point the
    /// current host shape expects.
    pub fn instantiate(&self, mode: HostMode) -> Result<PluginInstance, HostError> {
        match mode {
            HostMode::Console => {
                let create: Symbol<extern "C" fn() -> *mut dyn Feature> =
                    unsafe { self.library.get(b"_plugbay_feature_create") }.map_err(|_| {
                        HostError::NoCompatibleType {
                            path: self.source_path.clone(),
                        }
                    })?;
                let boxed = catch_unwind(AssertUnwindSafe(|| {
                    // SAFETY: the create symbol hands ownership of a freshly
                    // boxed instance across the boundary.
                    unsafe { Box::from_raw(create()) }
                }))
                .map_err(|_| self.constructor_panic())?;
                Ok(PluginInstance::Feature(boxed))
            }
            HostMode::Web => {
                let create: Symbol<extern "C" fn() -> *mut dyn EndpointModule> =
                    unsafe { self.library.get(b"_plugbay_endpoints_create") }.map_err(|_| {
                        HostError::NoCompatibleType {
                            path: self.source_path.clone(),
                        }
                    })?;
                let boxed = catch_unwind(AssertUnwindSafe(|| {
                    // SAFETY: as above.
                    unsafe { Box::from_raw(create()) }
                }))
                .map_err(|_| self.constructor_panic())?;
                Ok(PluginInstance::Endpoints(boxed))
            }
        }
    }

    fn constructor_panic(&self) -> HostError {
        HostError::Construction {
            plugin: self
                .source_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            stage: "constructor",
            message: "panicked".to_string(),
        }
    }

    pub fn source_path(&self) -> &Path {
        &self.source_path
    }

    /// Unmap the library. Consuming the domain means no handle to it can
    /// survive the unload request.
    pub fn unload(self) {}
}

async fn wait_until_readable(path: &Path, retry: &RetryPolicy) -> Result<(), HostError> {
    let deadline = tokio::time::Instant::now() + retry.readable_budget;
    loop {
        match std::fs::File::open(path) {
            Ok(_) => return Ok(()),
            // Deleted while a reload was pending: abort cleanly, no retry.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(e.into()),
            Err(_) if tokio::time::Instant::now() < deadline => {
                tokio::time::sleep(retry.readable_interval).await;
            }
            Err(_) => {
                return Err(HostError::Unreadable {
                    path: path.to_path_buf(),
                    budget: retry.readable_budget,
                });
            }
        }
    }
}
