//! Route registration interface handed to endpoint plugins

use std::sync::Arc;

use crate::error::PluginError;
use crate::http::{RouteRequest, RouteResponse};

/// Handler invoked by the host router.
///
/// The closure and everything it captures live inside the plugin library; the
/// host keeps the library mapped for as long as any clone of the handler may
/// still run.
pub type RouteHandler =
    Arc<dyn Fn(RouteRequest) -> Result<RouteResponse, PluginError> + Send + Sync>;

/// Wrap a closure as a [`RouteHandler`].
pub fn handler<F>(f: F) -> RouteHandler
where
    F: Fn(RouteRequest) -> Result<RouteResponse, PluginError> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Registry handed to [`EndpointModule::register`](crate::EndpointModule::register).
///
/// Patterns are absolute paths with `{name}` segments, optionally typed:
/// `/b/sum/{x:int}/{y:int}`, `/flags/{enabled:bool}`. A typed segment only
/// matches when the value parses as the declared type. The handler's return
/// value is serialized as JSON via [`RouteResponse::json`].
pub trait EndpointRegistry {
    /// Register a GET route.
    fn add_get(&mut self, pattern: &str, handler: RouteHandler);

    /// Register a POST route.
    fn add_post(&mut self, pattern: &str, handler: RouteHandler);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handler_wraps_closure() {
        let h = handler(|_req| Ok(RouteResponse::empty(200)));
        let resp = h(RouteRequest {
            params: Default::default(),
            query: Default::default(),
            headers: Default::default(),
            body: vec![],
        })
        .unwrap();
        assert_eq!(resp.status, 200);
    }

    #[test]
    fn test_registry_trait_is_object_safe() {
        fn _takes_registry(_: &mut dyn EndpointRegistry) {}
    }
}
