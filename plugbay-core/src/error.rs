//! Error types for the plugin host core

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors that can occur in the plugin host
#[derive(Error, Debug)]
pub enum HostError {
    /// The plugin directory could not be created or opened
    #[error("Plugins directory unavailable: {path}")]
    PluginsDirUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The artifact stayed locked by another process past the retry budget
    #[error("Artifact not readable within {budget:?}: {path}")]
    Unreadable { path: PathBuf, budget: Duration },

    /// Failed to map the artifact as a dynamic library
    #[error("Failed to load plugin library: {0}")]
    LibraryLoad(#[from] libloading::Error),

    /// The library was built against a different contracts version
    #[error("Plugin ABI version mismatch: host expects {expected}, library has {found}")]
    ApiVersionMismatch { expected: u32, found: u32 },

    /// The library exports none of the expected capability entry points
    #[error("No compatible plugin entry point in {path}")]
    NoCompatibleType { path: PathBuf },

    /// The plugin's constructor, `start` or `register` failed
    #[error("Plugin '{plugin}' failed during {stage}: {message}")]
    Construction {
        plugin: String,
        stage: &'static str,
        message: String,
    },

    /// Configuration file could not be parsed
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem watcher error
    #[error("Watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// Operation on a host after `dispose`
    #[error("Host already disposed")]
    AlreadyDisposed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugins_dir_unavailable_display() {
        let err = HostError::PluginsDirUnavailable {
            path: PathBuf::from("/some/path"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.to_string().contains("/some/path"));
    }

    #[test]
    fn test_api_version_mismatch_display() {
        let err = HostError::ApiVersionMismatch {
            expected: 1,
            found: 2,
        };
        let msg = err.to_string();
        assert!(msg.contains("1"));
        assert!(msg.contains("2"));
    }

    #[test]
    fn test_construction_display() {
        let err = HostError::Construction {
            plugin: "bad".to_string(),
            stage: "start",
            message: "boom".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("bad"));
        assert!(msg.contains("start"));
        assert!(msg.contains("boom"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: HostError = io_err.into();
        assert!(matches!(err, HostError::Io(_)));
    }

    #[test]
    fn test_unreadable_display() {
        let err = HostError::Unreadable {
            path: PathBuf::from("a.so"),
            budget: Duration::from_secs(5),
        };
        assert!(err.to_string().contains("a.so"));
    }
}
