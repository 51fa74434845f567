//! HTTP/1.x request framing and response encoding
//!
//! Just enough HTTP for the listener: a request head parsed with `httparse`,
//! a body framed by `Content-Length`, and a `Connection: close` response.

pub mod codec;
pub mod request;
pub mod response;


pub use codec::HttpCodec;
pub use request::RequestRecord;
pub use response::{Response, POST_RECEIVED_BODY, STATUS_PAGE_BODY};
