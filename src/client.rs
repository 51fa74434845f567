use crate::{ListenerError, Result};
use bytes::{Bytes, BytesMut};
use http::{Method, StatusCode};
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Configuration for [`PostClient`]
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Timeout for writing the request and reading the whole reply
    pub io_timeout: Duration,
    /// Maximum response size to prevent memory exhaustion
    pub max_response_size: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(10),
            io_timeout: Duration::from_secs(30),
            max_response_size: 10 * 1024 * 1024, // 10MB
        }
    }
}

/// A reply read back from the listener
#[derive(Debug, Clone)]
pub struct ClientResponse {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ClientResponse {
    /// First header with the given name, compared case-insensitively
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// One-request-per-connection HTTP/1.1 client
///
/// Every call opens a fresh connection, sends `Connection: close`, and reads
/// until the server closes.
#[derive(Debug, Clone)]
pub struct PostClient {
    addr: SocketAddr,
    host: String,
    config: ClientConfig,
}

impl PostClient {
    pub fn new(addr: SocketAddr) -> Self {
        Self::with_config(addr, ClientConfig::default())
    }

    pub fn with_config(addr: SocketAddr, config: ClientConfig) -> Self {
        Self {
            addr,
            host: addr.to_string(),
            config,
        }
    }

    /// Overrides the `Host` header, e.g. with the name from a URL
    pub fn with_host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sends a POST with the given body
    pub async fn post(&self, path: &str, body: &[u8]) -> Result<ClientResponse> {
        self.request(&Method::POST, path, body).await
    }

    /// Sends a GET without a body
    pub async fn get(&self, path: &str) -> Result<ClientResponse> {
        self.request(&Method::GET, path, &[]).await
    }

    /// Sends a request with any method; `Content-Length` is set when a body is
    /// given or the method is POST
    pub async fn request(
        &self,
        method: &Method,
        path: &str,
        body: &[u8],
    ) -> Result<ClientResponse> {
        let mut request = format!(
            "{method} {path} HTTP/1.1\r\nHost: {}\r\nUser-Agent: postecho/{}\r\n\
             Connection: close\r\n",
            self.host,
            env!("CARGO_PKG_VERSION"),
        );
        if !body.is_empty() || method == Method::POST {
            request.push_str(&format!("Content-Length: {}\r\n", body.len()));
        }
        request.push_str("\r\n");

        let mut raw = request.into_bytes();
        raw.extend_from_slice(body);
        self.send_raw(&raw).await
    }

    /// Writes `raw` verbatim and parses whatever reply comes back
    ///
    /// The listener may answer and close before reading the whole request,
    /// e.g. with a 413. A write or read cut short by the peer still returns
    /// that reply when its head arrived.
    pub async fn send_raw(&self, raw: &[u8]) -> Result<ClientResponse> {
        let mut stream = timeout(self.config.connect_timeout, TcpStream::connect(self.addr))
            .await
            .map_err(|_| ListenerError::Timeout("Connection timeout".to_string()))??;

        let write_result = timeout(self.config.io_timeout, async {
            stream.write_all(raw).await?;
            stream.flush().await
        })
        .await
        .map_err(|_| ListenerError::Timeout("Write timeout".to_string()))?;

        let write_err = match write_result {
            Ok(()) => None,
            Err(e) if closed_by_peer(&e) => Some(e),
            Err(e) => return Err(e.into()),
        };

        let mut response = BytesMut::with_capacity(1024);
        let read_result = timeout(self.config.io_timeout, async {
            loop {
                if stream.read_buf(&mut response).await? == 0 {
                    return Ok::<(), ListenerError>(());
                }
                if response.len() > self.config.max_response_size {
                    return Err(ListenerError::MalformedResponse(format!(
                        "response exceeds {} bytes",
                        self.config.max_response_size
                    )));
                }
            }
        })
        .await
        .map_err(|_| ListenerError::Timeout("Read timeout".to_string()))
        .and_then(|read| read);

        let failure = match (write_err, read_result) {
            (None, Ok(())) => return parse_response(response.freeze()),
            (Some(e), _) => ListenerError::Io(e),
            (None, Err(ListenerError::Io(e))) if closed_by_peer(&e) => ListenerError::Io(e),
            (None, Err(e)) => return Err(e),
        };

        parse_response(response.freeze()).map_err(|_| failure)
    }
}

fn closed_by_peer(err: &std::io::Error) -> bool {
    matches!(
        err.kind(),
        ErrorKind::BrokenPipe | ErrorKind::ConnectionReset | ErrorKind::ConnectionAborted
    )
}

fn parse_response(raw: Bytes) -> Result<ClientResponse> {
    let mut headers = [httparse::EMPTY_HEADER; 32];
    let mut parsed = httparse::Response::new(&mut headers);

    let head_len = match parsed.parse(&raw) {
        Ok(httparse::Status::Complete(len)) => len,
        Ok(httparse::Status::Partial) => {
            return Err(ListenerError::MalformedResponse(
                "connection closed before the response head was complete".to_string(),
            ));
        }
        Err(e) => return Err(ListenerError::MalformedResponse(e.to_string())),
    };

    let status = parsed
        .code
        .and_then(|code| StatusCode::from_u16(code).ok())
        .ok_or_else(|| ListenerError::MalformedResponse("missing status code".to_string()))?;
    let headers = parsed
        .headers
        .iter()
        .map(|h| {
            (
                h.name.to_string(),
                String::from_utf8_lossy(h.value).into_owned(),
            )
        })
        .collect();

    Ok(ClientResponse {
        status,
        headers,
        body: raw.slice(head_len..),
    })
}
