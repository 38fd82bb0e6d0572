//! plugbay-server - web host for endpoint plugins
//!
//! Serves every route published into the [`RouteRegistry`] by loaded
//! plugins, plus the `/_plugins` introspection endpoint and `/healthz`. The
//! route table follows the registry through the change-token contract, so a
//! hot-swap becomes visible to new requests as soon as the token rotates
//! while in-flight requests keep the handler they already captured.
//!
//! [`RouteRegistry`]: plugbay_core::RouteRegistry

mod error;
pub mod http;
mod state;

use std::future::Future;
use std::sync::Arc;

use plugbay_core::LifecycleManager;
use tokio::net::TcpListener;

pub use error::ServerError;
pub use http::create_router;
pub use state::AppState;

/// The plugbay web server
pub struct PluginServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl PluginServer {
    /// Create a server over an already constructed lifecycle manager.
    pub fn new(config: ServerConfig, manager: Arc<LifecycleManager>) -> Self {
        Self {
            config,
            state: AppState::new(manager),
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Run until `shutdown` resolves. The caller disposes the lifecycle
    /// manager afterwards.
    pub async fn run<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                source: e,
            })?;

        tracing::info!("plugbay server listening on {}", addr);

        let refresh = self.state.spawn_route_refresh();
        let router = create_router(Arc::clone(&self.state), &self.config.allowed_origins);
        let result = axum::serve(listener, router)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Internal(e.to_string()));
        refresh.abort();
        result
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
    /// CORS origins allowed to call plugin routes
    pub allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 7931,
            allowed_origins: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            allowed_origins: Vec::new(),
        }
    }

    /// The socket address string, e.g. "127.0.0.1:7931"
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
