//! HTTP types crossing the host/plugin boundary

use std::collections::HashMap;

use serde::Serialize;

use crate::error::PluginError;

/// HTTP method a plugin route responds to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpMethod {
    Get,
    Post,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

/// Path parameters bound from a route pattern.
///
/// Typed accessors correspond to the `{name:int}` / `{name:bool}` pattern
/// syntax; the router only matches a typed segment when the value parses, so
/// a handler's typed lookup on a matched request cannot fail for shape
/// reasons, only for a name the pattern never declared.
#[derive(Debug, Default, Clone)]
pub struct PathParams {
    values: HashMap<String, String>,
}

impl PathParams {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    /// The raw string captured for `name`, if the pattern bound one.
    pub fn raw(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    /// Value of an `{name:int}` segment.
    pub fn int(&self, name: &str) -> Result<i64, PluginError> {
        let raw = self.values.get(name).ok_or_else(|| PluginError::MissingParam {
            name: name.to_string(),
        })?;
        raw.parse().map_err(|_| PluginError::InvalidParam {
            name: name.to_string(),
            expected: "int",
        })
    }

    /// Value of a `{name:bool}` segment.
    pub fn bool(&self, name: &str) -> Result<bool, PluginError> {
        let raw = self.values.get(name).ok_or_else(|| PluginError::MissingParam {
            name: name.to_string(),
        })?;
        match raw.to_ascii_lowercase().as_str() {
            "true" => Ok(true),
            "false" => Ok(false),
            _ => Err(PluginError::InvalidParam {
                name: name.to_string(),
                expected: "bool",
            }),
        }
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Incoming HTTP request passed to a plugin handler
#[derive(Debug)]
pub struct RouteRequest {
    /// Path parameters extracted from the route pattern
    pub params: PathParams,
    /// Query parameters
    pub query: HashMap<String, String>,
    /// Request headers
    pub headers: HashMap<String, String>,
    /// Request body as bytes
    pub body: Vec<u8>,
}

/// HTTP response returned by a plugin handler.
///
/// The host forwards status, body and content type to the client untouched;
/// handlers normally build one through [`RouteResponse::json`].
#[derive(Debug)]
pub struct RouteResponse {
    pub status: u16,
    pub body: Vec<u8>,
    /// MIME type for the `Content-Type` header. An empty string means the
    /// host sends no such header.
    pub content_type: String,
}

impl RouteResponse {
    fn with_body(status: u16, body: Vec<u8>, content_type: &str) -> Self {
        Self {
            status,
            body,
            content_type: content_type.to_string(),
        }
    }

    /// Serialize `data` as the JSON body of a response.
    pub fn json<T: Serialize>(status: u16, data: &T) -> Result<Self, PluginError> {
        let body = serde_json::to_vec(data).map_err(|e| PluginError::Json(e.to_string()))?;
        Ok(Self::with_body(status, body, "application/json"))
    }

    /// Respond with a plain-text body.
    pub fn text(status: u16, text: impl Into<String>) -> Self {
        Self::with_body(status, text.into().into_bytes(), "text/plain")
    }

    /// Status-only response: no body, no content type.
    pub fn empty(status: u16) -> Self {
        Self::with_body(status, Vec::new(), "")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> PathParams {
        PathParams::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_http_method_display() {
        assert_eq!(HttpMethod::Get.to_string(), "GET");
        assert_eq!(HttpMethod::Post.to_string(), "POST");
    }

    #[test]
    fn test_params_raw() {
        let p = params(&[("id", "123")]);
        assert_eq!(p.raw("id"), Some("123"));
        assert_eq!(p.raw("missing"), None);
    }

    #[test]
    fn test_params_int() {
        let p = params(&[("x", "42"), ("neg", "-7"), ("word", "abc")]);
        assert_eq!(p.int("x").unwrap(), 42);
        assert_eq!(p.int("neg").unwrap(), -7);
        assert!(matches!(
            p.int("word"),
            Err(PluginError::InvalidParam { .. })
        ));
        assert!(matches!(
            p.int("missing"),
            Err(PluginError::MissingParam { .. })
        ));
    }

    #[test]
    fn test_params_bool() {
        let p = params(&[("a", "true"), ("b", "False"), ("c", "yes")]);
        assert!(p.bool("a").unwrap());
        assert!(!p.bool("b").unwrap());
        assert!(matches!(
            p.bool("c"),
            Err(PluginError::InvalidParam { .. })
        ));
    }

    #[test]
    fn test_route_response_json() {
        #[derive(Serialize)]
        struct Data {
            value: i32,
        }

        let resp = RouteResponse::json(200, &Data { value: 42 }).unwrap();
        assert_eq!(resp.status, 200);
        assert_eq!(resp.content_type, "application/json");
        assert!(String::from_utf8_lossy(&resp.body).contains("42"));
    }

    #[test]
    fn test_route_response_text() {
        let resp = RouteResponse::text(404, "not here");
        assert_eq!(resp.status, 404);
        assert_eq!(resp.content_type, "text/plain");
        assert_eq!(resp.body, b"not here");
    }

    #[test]
    fn test_route_response_empty_has_no_content_type() {
        let resp = RouteResponse::empty(204);
        assert_eq!(resp.status, 204);
        assert!(resp.body.is_empty());
        assert!(resp.content_type.is_empty());
    }
}
