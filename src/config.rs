use crate::ListenerError;
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

/// Host the listener binds to when none is configured
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
/// Port the listener binds to when none is configured
pub const DEFAULT_PORT: u16 = 8000;

/// How POST bodies are written to the console
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyFormat {
    /// Print the decoded text exactly as received
    Raw,
    /// Pretty-print with 4-space indentation when the text is JSON,
    /// otherwise fall back to the raw text
    #[default]
    Json,
}

impl fmt::Display for BodyFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyFormat::Raw => f.write_str("raw"),
            BodyFormat::Json => f.write_str("json"),
        }
    }
}

impl FromStr for BodyFormat {
    type Err = ListenerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "raw" | "text" => Ok(BodyFormat::Raw),
            "json" => Ok(BodyFormat::Json),
            other => Err(ListenerError::Config(format!(
                "unknown body format '{other}', expected 'raw' or 'json'"
            ))),
        }
    }
}

/// Configuration for the echo listener
///
/// # Examples
///
/// ```
/// use postecho::{BodyFormat, ListenerConfig};
///
/// let config = ListenerConfig::default();
/// assert_eq!(config.bind_addr.to_string(), "0.0.0.0:8000");
/// assert_eq!(config.body_format, BodyFormat::Json);
///
/// let local = ListenerConfig {
///     bind_addr: "127.0.0.1:0".parse().unwrap(),
///     body_format: BodyFormat::Raw,
///     ..ListenerConfig::default()
/// };
/// assert!(local.read_timeout.is_none());
/// ```
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Address to bind the listener to
    pub bind_addr: SocketAddr,
    /// Console rendering of POST bodies
    pub body_format: BodyFormat,
    /// Maximum number of connections handled at once
    pub max_connections: usize,
    /// Largest `Content-Length` accepted
    pub max_body_size: usize,
    /// Read timeout per connection; `None` waits on a slow client forever
    pub read_timeout: Option<Duration>,
    /// Value of the `Server` response header
    pub server_name: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(DEFAULT_HOST, DEFAULT_PORT),
            body_format: BodyFormat::default(),
            max_connections: 100,
            max_body_size: 10 * 1024 * 1024, // 10MB
            read_timeout: None,
            server_name: concat!("postecho/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl ListenerConfig {
    /// Checks the values that would make the listener unusable
    pub fn validate(&self) -> crate::Result<()> {
        if self.max_connections == 0 {
            return Err(ListenerError::Config(
                "max_connections must be at least 1".to_string(),
            ));
        }
        if self.read_timeout == Some(Duration::ZERO) {
            return Err(ListenerError::Config(
                "read_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
