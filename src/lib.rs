use std::net::SocketAddr;
use thiserror::Error;

/// Error types for the postecho library
#[derive(Error, Debug)]
pub enum ListenerError {
    /// Socket errors (accept, read, write)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The listening socket could not be acquired
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// The request head could not be parsed as HTTP/1.x
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// `Content-Length` present but not a single non-negative integer
    #[error("Invalid Content-Length header: {0:?}")]
    InvalidLengthHeader(String),

    /// Declared body length exceeds the configured limit
    #[error("Body of {declared} bytes exceeds the {limit} byte limit")]
    BodyTooLarge { declared: usize, limit: usize },

    /// Body bytes are not valid UTF-8
    #[error("Request body is not valid UTF-8: {0}")]
    InvalidEncoding(#[from] std::str::Utf8Error),

    /// Peer closed the connection before a full request arrived
    #[error("Incomplete request")]
    IncompleteRequest,

    /// A reply read by the client could not be parsed
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Timeout errors
    #[error("Timeout error: {0}")]
    Timeout(String),
}

/// Result type for the postecho library
pub type Result<T> = std::result::Result<T, ListenerError>;

pub mod client;
pub mod config;
pub mod console;
pub mod handler;
pub mod http;
pub mod server;

// Re-export main types for convenience
pub use client::{ClientConfig, ClientResponse, PostClient};
pub use config::{BodyFormat, ListenerConfig};
pub use console::Console;
pub use self::http::{HttpCodec, RequestRecord, Response};
pub use server::EchoListener;
