//! Error types for the web host

use thiserror::Error;

/// Errors from the plugbay web server
#[derive(Error, Debug)]
pub enum ServerError {
    /// Failed to bind the listen address
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Plugin host error during startup or shutdown
    #[error("Host error: {0}")]
    Host(#[from] plugbay_core::HostError),

    /// Internal server error
    #[error("Internal server error: {0}")]
    Internal(String),
}
