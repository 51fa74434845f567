use crate::{ListenerError, Result};
use bytes::Bytes;
use http::Method;

/// A single in-flight request, dropped once its response is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestRecord {
    /// Request method as sent by the client
    pub method: Method,
    /// Request target; informational only, every path is handled the same way
    pub path: String,
    /// Declared body length, `0` when the header is absent
    pub content_length: usize,
    /// Exactly `content_length` bytes of body
    pub body: Bytes,
}

impl RequestRecord {
    /// Decodes the body as UTF-8
    pub fn body_text(&self) -> Result<&str> {
        std::str::from_utf8(&self.body).map_err(ListenerError::InvalidEncoding)
    }
}

/// Reads the declared body length out of the parsed request headers.
///
/// A missing header means no body. Repeated headers are accepted only when
/// they all carry the same value.
pub fn content_length(headers: &[httparse::Header<'_>]) -> Result<usize> {
    let mut length: Option<usize> = None;

    for header in headers
        .iter()
        .filter(|h| h.name.eq_ignore_ascii_case("content-length"))
    {
        let raw = String::from_utf8_lossy(header.value);
        let value = raw.trim();
        if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
            return Err(ListenerError::InvalidLengthHeader(raw.into_owned()));
        }
        let parsed: usize = value
            .parse()
            .map_err(|_| ListenerError::InvalidLengthHeader(raw.to_string()))?;

        match length {
            Some(previous) if previous != parsed => {
                return Err(ListenerError::InvalidLengthHeader(format!(
                    "conflicting values {previous} and {parsed}"
                )));
            }
            _ => length = Some(parsed),
        }
    }

    Ok(length.unwrap_or(0))
}
