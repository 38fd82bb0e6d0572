//! Ping Plugin - minimal endpoint plugin for the plugbay web host
//!
//! Publishes `GET /a/ping` returning `{"pong":true}`.
//!
//! ## Installing
//!
//! ```bash
//! cargo build --release -p ping-plugin
//! cp target/release/libping_plugin.so plugins/ping.so
//! ```

use plugbay_api::{
    EndpointModule, EndpointRegistry, PluginError, RouteResponse, export_endpoints, handler,
};
use serde_json::json;

#[derive(Default)]
pub struct PingPlugin;

impl EndpointModule for PingPlugin {
    fn name(&self) -> &str {
        "ping"
    }

    fn register(&mut self, registry: &mut dyn EndpointRegistry) -> Result<(), PluginError> {
        registry.add_get(
            "/a/ping",
            handler(|_req| RouteResponse::json(200, &json!({ "pong": true }))),
        );
        Ok(())
    }

    fn dispose(&mut self) -> Result<(), PluginError> {
        Ok(())
    }
}

export_endpoints!(PingPlugin);
