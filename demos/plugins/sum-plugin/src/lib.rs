//! Sum Plugin - endpoint plugin demonstrating typed path parameters
//!
//! Publishes `GET /b/sum/{x:int}/{y:int}` returning `{"sum": x + y}`. The
//! `:int` constraint means non-numeric values never reach the handler.
//!
//! ## Installing
//!
//! ```bash
//! cargo build --release -p sum-plugin
//! cp target/release/libsum_plugin.so plugins/sum.so
//! ```

use plugbay_api::{
    EndpointModule, EndpointRegistry, PluginError, RouteResponse, export_endpoints, handler,
};
use serde_json::json;

#[derive(Default)]
pub struct SumPlugin;

impl EndpointModule for SumPlugin {
    fn name(&self) -> &str {
        "sum"
    }

    fn register(&mut self, registry: &mut dyn EndpointRegistry) -> Result<(), PluginError> {
        registry.add_get(
            "/b/sum/{x:int}/{y:int}",
            handler(|req| {
                let x = req.params.int("x")?;
                let y = req.params.int("y")?;
                RouteResponse::json(200, &json!({ "sum": x + y }))
            }),
        );
        Ok(())
    }

    fn dispose(&mut self) -> Result<(), PluginError> {
        Ok(())
    }
}

export_endpoints!(SumPlugin);
