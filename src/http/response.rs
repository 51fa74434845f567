use bytes::{BufMut, Bytes, BytesMut};
use http::{Method, StatusCode};

/// Confirmation sent back for every accepted POST
pub const POST_RECEIVED_BODY: &str = "POST request successfully received!";

/// Page served for GET requests
pub const STATUS_PAGE_BODY: &str = "<html><body><h1>Server is running!</h1><p>Send a POST request to this endpoint to see it in the console.</p></body></html>";

/// An HTTP response ready to be encoded onto the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: StatusCode,
    pub content_type: &'static str,
    pub body: Bytes,
    /// Headers only; `Content-Length` still describes `body`
    pub head_only: bool,
}

impl Response {
    pub fn new(status: StatusCode, content_type: &'static str, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            content_type,
            body: body.into(),
            head_only: false,
        }
    }

    /// Same reply without the body on the wire, as answers to HEAD must be
    pub fn head_only(mut self) -> Self {
        self.head_only = true;
        self
    }

    /// 200 reply to a POST
    pub fn post_received() -> Self {
        Self::new(StatusCode::OK, "text/plain", POST_RECEIVED_BODY)
    }

    /// 200 reply to a GET
    pub fn status_page() -> Self {
        Self::new(StatusCode::OK, "text/html", STATUS_PAGE_BODY)
    }

    /// 501 reply for any method other than GET and POST
    pub fn not_implemented(method: &Method) -> Self {
        Self::error(
            StatusCode::NOT_IMPLEMENTED,
            &format!("Unsupported method ('{method}')"),
        )
    }

    /// HTML error page in the shape of a stock `send_error` reply
    pub fn error(status: StatusCode, message: &str) -> Self {
        let reason = status.canonical_reason().unwrap_or("Unknown");
        let body = format!(
            "<!DOCTYPE HTML>\n\
             <html lang=\"en\">\n\
             \x20   <head>\n\
             \x20       <meta charset=\"utf-8\">\n\
             \x20       <title>Error response</title>\n\
             \x20   </head>\n\
             \x20   <body>\n\
             \x20       <h1>Error response</h1>\n\
             \x20       <p>Error code: {code}</p>\n\
             \x20       <p>Message: {message}.</p>\n\
             \x20       <p>Error code explanation: {code} - {reason}.</p>\n\
             \x20   </body>\n\
             </html>\n",
            code = status.as_u16(),
            message = escape_html(message),
        );
        Self::new(status, "text/html;charset=utf-8", body)
    }

    /// Writes status line, headers and body into `dst`
    pub fn encode_into(&self, server_name: &str, dst: &mut BytesMut) {
        let head = format!(
            "HTTP/1.0 {} {}\r\nServer: {}\r\nContent-type: {}\r\n\
             Content-Length: {}\r\nConnection: close\r\n\r\n",
            self.status.as_u16(),
            self.status.canonical_reason().unwrap_or("Unknown"),
            server_name,
            self.content_type,
            self.body.len(),
        );
        dst.reserve(head.len() + self.body.len());
        dst.put_slice(head.as_bytes());
        if !self.head_only {
            dst.put_slice(&self.body);
        }
    }
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}
