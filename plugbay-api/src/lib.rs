//! plugbay-api - Capability contracts for plugbay plugins
//!
//! Plugins are native Rust dynamic libraries dropped into the host's plugin
//! directory. A plugin implements exactly one of two capability traits:
//!
//! - [`Feature`] for the console host: a lifecycle object with `start` and
//!   `dispose`.
//! - [`EndpointModule`] for the web host: publishes HTTP route handlers
//!   through an [`EndpointRegistry`] and is torn down with `dispose`.
//!
//! This crate is linked into the host exactly once; plugins are built against
//! the same version and the host checks the exported ABI tag before
//! constructing any instance, so trait objects crossing the boundary keep
//! their identity.
//!
//! # Example
//!
//! ```ignore
//! use plugbay_api::{
//!     EndpointModule, EndpointRegistry, PluginError, RouteResponse, export_endpoints, handler,
//! };
//!
//! #[derive(Default)]
//! pub struct EchoPlugin;
//!
//! impl EndpointModule for EchoPlugin {
//!     fn name(&self) -> &str {
//!         "echo"
//!     }
//!
//!     fn register(&mut self, registry: &mut dyn EndpointRegistry) -> Result<(), PluginError> {
//!         registry.add_get(
//!             "/echo/{word}",
//!             handler(|req| {
//!                 let word = req.params.raw("word").unwrap_or_default().to_string();
//!                 RouteResponse::json(200, &serde_json::json!({ "word": word }))
//!             }),
//!         );
//!         Ok(())
//!     }
//!
//!     fn dispose(&mut self) -> Result<(), PluginError> {
//!         Ok(())
//!     }
//! }
//!
//! export_endpoints!(EchoPlugin);
//! ```

pub mod error;
pub mod http;
pub mod registry;

pub use error::PluginError;
pub use http::{HttpMethod, PathParams, RouteRequest, RouteResponse};
pub use registry::{EndpointRegistry, RouteHandler, handler};

/// Plugin ABI version. The host refuses to construct an instance from a
/// library whose exported `_plugbay_api_version` does not match exactly.
pub const API_VERSION: u32 = 1;

/// Lifecycle capability used by the console host.
///
/// Implementations own their resources (threads, timers, caches, clients)
/// and must release all of them in [`Feature::dispose`], including detaching
/// any event subscriptions. After `dispose` returns, the host unmaps the
/// plugin's library.
pub trait Feature: Send + Sync {
    /// Self-declared plugin name, used in logs and host introspection.
    fn name(&self) -> &str;

    /// Called once after the plugin has been loaded.
    fn start(&mut self) -> Result<(), PluginError>;

    /// Called exactly once when the plugin is unloaded or the host shuts
    /// down.
    fn dispose(&mut self) -> Result<(), PluginError>;
}

/// Endpoint capability used by the web host.
pub trait EndpointModule: Send + Sync {
    /// Self-declared plugin name. May be empty; route grouping then falls
    /// back to the first path segment of each registered pattern.
    fn name(&self) -> &str;

    /// Publish route handlers into the host's registry.
    ///
    /// Handlers and anything they capture live inside the plugin library.
    /// Do not hand out references that the host could stash in long-lived
    /// statics; that would pin the library forever.
    fn register(&mut self, registry: &mut dyn EndpointRegistry) -> Result<(), PluginError>;

    /// Called exactly once when the plugin is unloaded, hot-swapped out (after
    /// the grace period), or the host shuts down.
    fn dispose(&mut self) -> Result<(), PluginError>;
}

/// Export a [`Feature`] plugin for dynamic loading.
///
/// Generates the C ABI entry points the host looks up:
/// `_plugbay_api_version`, `_plugbay_plugin_version`,
/// `_plugbay_feature_create` and `_plugbay_feature_destroy`.
#[macro_export]
macro_rules! export_feature {
    ($plugin_type:ty) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn _plugbay_api_version() -> u32 {
            $crate::API_VERSION
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn _plugbay_plugin_version() -> *const std::os::raw::c_char {
            concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const std::os::raw::c_char
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn _plugbay_feature_create() -> *mut dyn $crate::Feature {
            let plugin: Box<dyn $crate::Feature> = Box::new(<$plugin_type>::default());
            Box::into_raw(plugin)
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn _plugbay_feature_destroy(ptr: *mut dyn $crate::Feature) {
            if !ptr.is_null() {
                unsafe {
                    drop(Box::from_raw(ptr));
                }
            }
        }
    };
}

/// Export an [`EndpointModule`] plugin for dynamic loading.
///
/// Generates `_plugbay_api_version`, `_plugbay_plugin_version`,
/// `_plugbay_endpoints_create` and `_plugbay_endpoints_destroy`.
#[macro_export]
macro_rules! export_endpoints {
    ($plugin_type:ty) => {
        #[unsafe(no_mangle)]
        pub extern "C" fn _plugbay_api_version() -> u32 {
            $crate::API_VERSION
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn _plugbay_plugin_version() -> *const std::os::raw::c_char {
            concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const std::os::raw::c_char
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn _plugbay_endpoints_create() -> *mut dyn $crate::EndpointModule {
            let plugin: Box<dyn $crate::EndpointModule> = Box::new(<$plugin_type>::default());
            Box::into_raw(plugin)
        }

        #[unsafe(no_mangle)]
        pub extern "C" fn _plugbay_endpoints_destroy(ptr: *mut dyn $crate::EndpointModule) {
            if !ptr.is_null() {
                unsafe {
                    drop(Box::from_raw(ptr));
                }
            }
        }
    };
}
