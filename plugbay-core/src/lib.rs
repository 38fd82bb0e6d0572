//! plugbay-core: the plugin lifecycle engine
//!
//! This crate provides the moving parts of the plugbay host:
//!
//! - [`PluginDomain`]: per-plugin isolated loading container around one
//!   dynamic library
//! - [`Debouncer`]: coalesces bursty filesystem events per path
//! - [`watcher`]: observes the plugin directory and normalizes change events
//! - [`LifecycleManager`]: orchestrates load, unload and hot-swap; owns the
//!   loaded-plugin registry and the pending-disposal queue
//! - [`RouteRegistry`]: mutable endpoint data source with per-plugin grouping
//!   and change-token notification (web host)
//!
//! # Example
//!
//! ```ignore
//! use plugbay_core::{HostConfig, HostMode, LifecycleManager};
//!
//! let manager = LifecycleManager::new(HostConfig::default(), HostMode::Web);
//! manager.start().await?;
//!
//! // The router consumes the registry through the change-token contract.
//! let routes = manager.routes();
//! let token = routes.change_token();
//! let endpoints = routes.endpoints();
//!
//! manager.dispose().await;
//! ```

pub mod config;
pub mod debounce;
pub mod domain;
pub mod error;
pub mod manager;
pub mod routes;
pub mod watcher;

pub use config::HostConfig;
pub use debounce::Debouncer;
pub use domain::{HostMode, PluginDomain, PluginInstance, RetryPolicy};
pub use error::HostError;
pub use manager::{LifecycleManager, PluginSummary};
pub use routes::{DISPLAY_PREFIX, RouteCollector, RouteEntry, RoutePattern, RouteRegistry};
pub use watcher::{ArtifactEvent, PluginWatcher};
