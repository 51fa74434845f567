use super::request::{content_length, RequestRecord};
use super::response::Response;
use crate::ListenerError;
use bytes::BytesMut;
use http::Method;
use tokio_util::codec::{Decoder, Encoder};

/// Maximum number of headers accepted in a request head
pub const MAX_HEADERS: usize = 64;
/// Maximum size of a request head before the request is rejected
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// Head of a request whose body has not fully arrived yet
#[derive(Debug)]
struct PendingHead {
    method: Method,
    path: String,
    content_length: usize,
}

/// HTTP/1.x framing for one request and one response per connection
///
/// Decodes a request head with `httparse`, then waits for exactly
/// `Content-Length` body bytes. Encodes [`Response`] values with the
/// configured `Server` header.
#[derive(Debug)]
pub struct HttpCodec {
    max_body_size: usize,
    server_name: String,
    pending: Option<PendingHead>,
}

impl HttpCodec {
    pub fn new(max_body_size: usize, server_name: impl Into<String>) -> Self {
        Self {
            max_body_size,
            server_name: server_name.into(),
            pending: None,
        }
    }

    fn parse_head(&self, src: &[u8]) -> Result<Option<(PendingHead, usize)>, ListenerError> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADERS];
        let mut req = httparse::Request::new(&mut headers);

        let parsed_len = match req.parse(src) {
            Ok(httparse::Status::Complete(len)) => len,
            Ok(httparse::Status::Partial) => {
                if src.len() > MAX_HEAD_SIZE {
                    return Err(ListenerError::MalformedRequest(format!(
                        "request head exceeds {MAX_HEAD_SIZE} bytes"
                    )));
                }
                return Ok(None);
            }
            Err(e) => {
                return Err(ListenerError::MalformedRequest(format!(
                    "Failed to parse headers: {e}"
                )));
            }
        };

        let method_name = req.method.unwrap_or_default();
        let method = Method::from_bytes(method_name.as_bytes()).map_err(|_| {
            ListenerError::MalformedRequest(format!("invalid method {method_name:?}"))
        })?;
        let path = req.path.unwrap_or("/").to_string();

        // only POST reads a body; other methods are answered from the head alone
        let content_length = if method == Method::POST {
            let declared = content_length(req.headers)?;
            if declared > self.max_body_size {
                return Err(ListenerError::BodyTooLarge {
                    declared,
                    limit: self.max_body_size,
                });
            }
            declared
        } else {
            0
        };

        Ok(Some((
            PendingHead {
                method,
                path,
                content_length,
            },
            parsed_len,
        )))
    }
}

impl Decoder for HttpCodec {
    type Item = RequestRecord;
    type Error = ListenerError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if self.pending.is_none() {
            match self.parse_head(src)? {
                Some((head, parsed_len)) => {
                    let _ = src.split_to(parsed_len);
                    self.pending = Some(head);
                }
                None => return Ok(None),
            }
        }

        let needed = match &self.pending {
            Some(head) => head.content_length,
            None => return Ok(None),
        };

        if src.len() < needed {
            src.reserve(needed - src.len());
            return Ok(None);
        }

        let body = src.split_to(needed).freeze();
        Ok(self.pending.take().map(|head| RequestRecord {
            method: head.method,
            path: head.path,
            content_length: head.content_length,
            body,
        }))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(record) => Ok(Some(record)),
            None if src.is_empty() && self.pending.is_none() => Ok(None),
            None => Err(ListenerError::IncompleteRequest),
        }
    }
}

impl Encoder<Response> for HttpCodec {
    type Error = ListenerError;

    fn encode(&mut self, item: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.encode_into(&self.server_name, dst);
        Ok(())
    }
}
