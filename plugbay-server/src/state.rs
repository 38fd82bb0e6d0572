//! Shared application state for the web host

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use plugbay_core::{LifecycleManager, RouteEntry, RouteRegistry};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Shared state accessible by all handlers.
///
/// Request dispatch reads a compiled snapshot of the route table; a
/// background task rebuilds the snapshot whenever the registry's change
/// token expires. The consumption order is token first, endpoints second, so
/// a rotation between the two reads only causes one extra rebuild, never a
/// missed update.
pub struct AppState {
    manager: Arc<LifecycleManager>,
    routes: Arc<RouteRegistry>,
    table: RwLock<Arc<Vec<Arc<RouteEntry>>>>,
    started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(manager: Arc<LifecycleManager>) -> Arc<Self> {
        let routes = manager.routes();
        let table = RwLock::new(Arc::new(routes.endpoints()));
        Arc::new(Self {
            manager,
            routes,
            table,
            started_at: Utc::now(),
        })
    }

    pub fn manager(&self) -> &Arc<LifecycleManager> {
        &self.manager
    }

    pub fn routes(&self) -> &Arc<RouteRegistry> {
        &self.routes
    }

    /// Current compiled route snapshot.
    pub fn route_table(&self) -> Arc<Vec<Arc<RouteEntry>>> {
        self.table.read().unwrap().clone()
    }

    /// Take the change token, then re-read the endpoint set into the
    /// snapshot. Returns the token to wait on for the next change.
    pub(crate) fn refresh_routes(&self) -> CancellationToken {
        let token = self.routes.change_token();
        let snapshot = Arc::new(self.routes.endpoints());
        *self.table.write().unwrap() = snapshot;
        token
    }

    /// Spawn the router-side rebuild loop: wake on token expiry, rebuild,
    /// re-subscribe.
    pub fn spawn_route_refresh(self: &Arc<Self>) -> JoinHandle<()> {
        let state = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let token = state.refresh_routes();
                token.cancelled().await;
                tracing::debug!("route change token expired, rebuilding route table");
            }
        })
    }

    /// Seconds since the server started
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use plugbay_api::{HttpMethod, RouteResponse, handler};
    use plugbay_core::{HostConfig, HostMode, RouteCollector};
    use std::time::Duration;

    fn test_manager() -> Arc<LifecycleManager> {
        let config = HostConfig {
            plugins_dir: std::env::temp_dir().join("plugbay-state-tests"),
            ..HostConfig::default()
        };
        LifecycleManager::new(config, HostMode::Web)
    }

    fn sample_entries(plugin: &str, pattern: &str) -> Vec<plugbay_core::RouteEntry> {
        let mut collector = RouteCollector::new(plugin);
        use plugbay_api::EndpointRegistry;
        collector.add_get(pattern, handler(|_req| Ok(RouteResponse::empty(200))));
        collector.into_entries()
    }

    #[tokio::test]
    async fn test_state_starts_with_current_snapshot() {
        let manager = test_manager();
        manager
            .routes()
            .add_batch(sample_entries("ping", "/a/ping"));

        let state = AppState::new(manager);
        assert_eq!(state.route_table().len(), 1);
        assert_eq!(state.route_table()[0].method, HttpMethod::Get);
    }

    #[tokio::test]
    async fn test_refresh_loop_picks_up_mutations() {
        let manager = test_manager();
        let state = AppState::new(Arc::clone(&manager));
        let refresh = state.spawn_route_refresh();

        assert!(state.route_table().is_empty());
        manager
            .routes()
            .add_batch(sample_entries("ping", "/a/ping"));

        // Give the rebuild loop a moment to wake and swap the snapshot.
        let deadline = tokio::time::Instant::now() + Duration::from_secs(1);
        while state.route_table().is_empty() && tokio::time::Instant::now() < deadline {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(state.route_table().len(), 1);

        refresh.abort();
    }

    #[tokio::test]
    async fn test_uptime_is_non_negative() {
        let state = AppState::new(test_manager());
        assert!(state.uptime_seconds() >= 0);
    }
}
