//! Mutable endpoint data source shared between the lifecycle manager and the
//! router
//!
//! The registry groups route entries per plugin and carries a change token.
//! Every mutation rotates the token: the new endpoint set is made visible
//! first, then the captured old token is expired so observers wake and
//! re-read. Observers must take the token before reading the endpoint list.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use plugbay_api::{EndpointRegistry, HttpMethod, PathParams, RouteHandler};
use tokio_util::sync::CancellationToken;

/// Prefix carried by every plugin route's display label, so external tooling
/// can tell plugin routes apart from host routes.
pub const DISPLAY_PREFIX: &str = "Plugin:";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param { name: String, kind: ParamKind },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ParamKind {
    Str,
    Int,
    Bool,
}

impl ParamKind {
    fn accepts(self, part: &str) -> bool {
        match self {
            ParamKind::Str => true,
            ParamKind::Int => part.parse::<i64>().is_ok(),
            ParamKind::Bool => part.eq_ignore_ascii_case("true") || part.eq_ignore_ascii_case("false"),
        }
    }
}

/// Compiled `{name}` / `{name:int}` / `{name:bool}` path pattern
#[derive(Debug, Clone)]
pub struct RoutePattern {
    raw: String,
    segments: Vec<Segment>,
}

impl RoutePattern {
    pub fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| {
                if let Some(inner) = s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                    let (name, kind) = match inner.split_once(':') {
                        Some((name, "int")) => (name, ParamKind::Int),
                        Some((name, "bool")) => (name, ParamKind::Bool),
                        Some((name, _)) => (name, ParamKind::Str),
                        None => (inner, ParamKind::Str),
                    };
                    Segment::Param {
                        name: name.to_string(),
                        kind,
                    }
                } else {
                    Segment::Literal(s.to_string())
                }
            })
            .collect();

        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// First non-empty segment, used as the default grouping name.
    pub fn first_segment(&self) -> Option<&str> {
        self.segments.first().map(|segment| match segment {
            Segment::Literal(text) => text.as_str(),
            Segment::Param { name, .. } => name.as_str(),
        })
    }

    /// Match a concrete request path, binding typed parameters.
    pub fn match_path(&self, path: &str) -> Option<PathParams> {
        let parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if parts.len() != self.segments.len() {
            return None;
        }

        let mut values = HashMap::new();
        for (segment, part) in self.segments.iter().zip(&parts) {
            match segment {
                Segment::Literal(expected) => {
                    if expected != part {
                        return None;
                    }
                }
                Segment::Param { name, kind } => {
                    if !kind.accepts(part) {
                        return None;
                    }
                    values.insert(name.clone(), (*part).to_string());
                }
            }
        }

        Some(PathParams::new(values))
    }
}

/// One route published by a plugin
#[derive(Clone)]
pub struct RouteEntry {
    /// Grouping name: the plugin's self-declared name, or the pattern's first
    /// segment when the plugin declares none
    pub plugin_name: String,
    pub method: HttpMethod,
    pub pattern: RoutePattern,
    pub handler: RouteHandler,
    /// Always starts with [`DISPLAY_PREFIX`]
    pub display_label: String,
}

/// Collects the entries of a single `register` call before they are committed
/// to the registry as one snapshot change.
pub struct RouteCollector {
    plugin_name: String,
    entries: Vec<RouteEntry>,
}

impl RouteCollector {
    pub fn new(plugin_name: &str) -> Self {
        Self {
            plugin_name: plugin_name.to_string(),
            entries: Vec::new(),
        }
    }

    fn push(&mut self, method: HttpMethod, pattern: &str, handler: RouteHandler) {
        let pattern = RoutePattern::parse(pattern);
        let owner = if self.plugin_name.is_empty() {
            pattern.first_segment().unwrap_or("plugin").to_string()
        } else {
            self.plugin_name.clone()
        };
        let display_label = format!("{DISPLAY_PREFIX}{}", pattern.raw());
        self.entries.push(RouteEntry {
            plugin_name: owner,
            method,
            pattern,
            handler,
            display_label,
        });
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Distinct grouping names in registration order.
    pub fn owners(&self) -> Vec<String> {
        let mut owners: Vec<String> = Vec::new();
        for entry in &self.entries {
            if !owners.contains(&entry.plugin_name) {
                owners.push(entry.plugin_name.clone());
            }
        }
        owners
    }

    pub fn into_entries(self) -> Vec<RouteEntry> {
        self.entries
    }
}

impl EndpointRegistry for RouteCollector {
    fn add_get(&mut self, pattern: &str, handler: RouteHandler) {
        self.push(HttpMethod::Get, pattern, handler);
    }

    fn add_post(&mut self, pattern: &str, handler: RouteHandler) {
        self.push(HttpMethod::Post, pattern, handler);
    }
}

struct Inner {
    by_plugin: HashMap<String, Vec<Arc<RouteEntry>>>,
    token: CancellationToken,
}

/// Endpoint data source with change notification
pub struct RouteRegistry {
    inner: Mutex<Inner>,
}

impl RouteRegistry {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                by_plugin: HashMap::new(),
                token: CancellationToken::new(),
            }),
        }
    }

    /// Flat snapshot of all registered entries.
    pub fn endpoints(&self) -> Vec<Arc<RouteEntry>> {
        let inner = self.inner.lock().unwrap();
        inner.by_plugin.values().flatten().cloned().collect()
    }

    /// Token whose expiry signals that the endpoint set changed. Take the
    /// token before reading [`endpoints`](Self::endpoints); on expiry take a
    /// fresh token and re-read.
    pub fn change_token(&self) -> CancellationToken {
        self.inner.lock().unwrap().token.clone()
    }

    /// Commit one `register` call's entries (possibly spanning several
    /// grouping names) as a single snapshot change.
    pub fn add_batch(&self, entries: Vec<RouteEntry>) {
        if entries.is_empty() {
            return;
        }
        let expired = {
            let mut inner = self.inner.lock().unwrap();
            for entry in entries {
                inner
                    .by_plugin
                    .entry(entry.plugin_name.clone())
                    .or_default()
                    .push(Arc::new(entry));
            }
            std::mem::replace(&mut inner.token, CancellationToken::new())
        };
        // Expire only after the new state is visible.
        expired.cancel();
    }

    /// Register entries under an explicit plugin name.
    pub fn add_for_plugin(&self, plugin_name: &str, entries: Vec<RouteEntry>) {
        let entries = entries
            .into_iter()
            .map(|mut entry| {
                entry.plugin_name = plugin_name.to_string();
                entry
            })
            .collect();
        self.add_batch(entries);
    }

    /// Remove every entry grouped under `plugin_name`. Returns the number of
    /// removed entries; the token rotates only when something was removed.
    pub fn remove_plugin(&self, plugin_name: &str) -> usize {
        self.remove_owners(&[plugin_name.to_string()])
    }

    /// Remove several groups as a single snapshot change.
    pub fn remove_owners(&self, owners: &[String]) -> usize {
        let (removed, expired) = {
            let mut inner = self.inner.lock().unwrap();
            let removed: usize = owners
                .iter()
                .filter_map(|owner| inner.by_plugin.remove(owner))
                .map(|entries| entries.len())
                .sum();
            let expired = (removed > 0)
                .then(|| std::mem::replace(&mut inner.token, CancellationToken::new()));
            (removed, expired)
        };
        if let Some(token) = expired {
            token.cancel();
        }
        removed
    }

    /// Names of plugins with at least one registered entry.
    pub fn plugin_names(&self) -> Vec<String> {
        let inner = self.inner.lock().unwrap();
        inner.by_plugin.keys().cloned().collect()
    }

    /// Entries grouped under one plugin name.
    pub fn entries_for(&self, plugin_name: &str) -> Vec<Arc<RouteEntry>> {
        let inner = self.inner.lock().unwrap();
        inner
            .by_plugin
            .get(plugin_name)
            .map(|entries| entries.to_vec())
            .unwrap_or_default()
    }
}

impl Default for RouteRegistry {
    fn default() -> Self {
        Self::new()
    }
}
