//! Plugin introspection endpoint and dynamic route dispatch

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use plugbay_api::{HttpMethod, RouteRequest};
use serde::Serialize;
use serde_json::json;

use crate::AppState;

/// Cap on plugin request bodies
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Response shape of `GET /_plugins`
#[derive(Debug, Serialize)]
pub struct PluginsResponse {
    pub count: usize,
    pub plugins: Vec<PluginEntry>,
}

#[derive(Debug, Serialize)]
pub struct PluginEntry {
    pub name: String,
    pub route: String,
    pub metadata: Vec<String>,
}

/// `GET /_plugins`: loaded plugins with their route display labels.
pub async fn list_plugins(State(state): State<Arc<AppState>>) -> Response {
    let summaries = match state.manager().plugin_summaries().await {
        Ok(summaries) => summaries,
        Err(e) => {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                json!({ "error": e.to_string() }).to_string(),
            )
                .into_response();
        }
    };

    let plugins: Vec<PluginEntry> = summaries
        .into_iter()
        .map(|summary| {
            let entries = state.routes().entries_for(&summary.name);
            let route = entries
                .first()
                .map(|entry| entry.pattern.raw().to_string())
                .unwrap_or_default();
            let metadata = entries
                .iter()
                .map(|entry| entry.display_label.clone())
                .collect();
            PluginEntry {
                name: summary.name,
                route,
                metadata,
            }
        })
        .collect();

    let body = PluginsResponse {
        count: plugins.len(),
        plugins,
    };
    (
        StatusCode::OK,
        [("Content-Type", "application/json")],
        serde_json::to_string(&body).unwrap_or_else(|_| "{}".to_string()),
    )
        .into_response()
}

fn to_http_method(method: &axum::http::Method) -> Option<HttpMethod> {
    match *method {
        axum::http::Method::GET => Some(HttpMethod::Get),
        axum::http::Method::POST => Some(HttpMethod::Post),
        _ => None,
    }
}

/// Fallback handler: match the request against the current route snapshot
/// and invoke the owning plugin's handler.
pub async fn dispatch_plugin_route(
    State(state): State<Arc<AppState>>,
    request: Request,
) -> Response {
    let Some(method) = to_http_method(request.method()) else {
        return (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response();
    };

    let path = request.uri().path().to_string();
    let query = parse_query(request.uri().query());
    let headers = extract_headers(request.headers());

    // The snapshot pins the matched entry (and with it the plugin library)
    // for the duration of this request, even across a hot-swap.
    let table = state.route_table();
    let matched = table.iter().find_map(|entry| {
        if entry.method != method {
            return None;
        }
        entry
            .pattern
            .match_path(&path)
            .map(|params| (Arc::clone(entry), params))
    });
    let Some((entry, params)) = matched else {
        return (StatusCode::NOT_FOUND, r#"{"error":"Not found"}"#).into_response();
    };

    let body = match axum::body::to_bytes(request.into_body(), MAX_BODY_BYTES).await {
        Ok(bytes) => bytes.to_vec(),
        Err(_) => {
            return (StatusCode::BAD_REQUEST, "Failed to read body").into_response();
        }
    };

    let route_request = RouteRequest {
        params,
        query,
        headers,
        body,
    };

    match catch_unwind(AssertUnwindSafe(|| (entry.handler)(route_request))) {
        Ok(Ok(resp)) => {
            let mut builder = Response::builder().status(resp.status);
            // An empty content type means the plugin sent a header-less body.
            if !resp.content_type.is_empty() {
                builder = builder.header("Content-Type", resp.content_type);
            }
            builder.body(Body::from(resp.body)).unwrap_or_else(|e| {
                tracing::error!("Failed to build HTTP response: {e}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
            })
        }
        Ok(Err(e)) => {
            let error_json = json!({ "error": e.to_string() });
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                [("Content-Type", "application/json")],
                error_json.to_string(),
            )
                .into_response()
        }
        Err(_) => {
            tracing::error!(plugin = %entry.plugin_name, "plugin handler panicked");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error").into_response()
        }
    }
}

fn parse_query(query: Option<&str>) -> HashMap<String, String> {
    query
        .map(|q| {
            url::form_urlencoded::parse(q.as_bytes())
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn extract_headers(headers: &axum::http::HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .filter_map(|(k, v)| v.to_str().ok().map(|val| (k.to_string(), val.to_string())))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_query() {
        let parsed = parse_query(Some("a=1&b=two"));
        assert_eq!(parsed.get("a"), Some(&"1".to_string()));
        assert_eq!(parsed.get("b"), Some(&"two".to_string()));
        assert!(parse_query(None).is_empty());
    }

    #[test]
    fn test_to_http_method() {
        assert_eq!(
            to_http_method(&axum::http::Method::GET),
            Some(HttpMethod::Get)
        );
        assert_eq!(
            to_http_method(&axum::http::Method::POST),
            Some(HttpMethod::Post)
        );
        assert_eq!(to_http_method(&axum::http::Method::DELETE), None);
    }
}
