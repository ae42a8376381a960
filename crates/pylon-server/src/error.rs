//! Server errors.

use std::net::{AddrParseError, SocketAddr};

use thiserror::Error;

/// Errors that stop the server from running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured address is not a socket address.
    #[error("invalid bind address '{addr}': {source}")]
    InvalidAddress {
        /// The configured address.
        addr: String,
        /// Parse failure.
        #[source]
        source: AddrParseError,
    },

    /// The listener could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// The address that was tried.
        addr: SocketAddr,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// I/O error on a bound listener.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
