use crate::config::BodyFormat;
use crate::console::Console;
use crate::http::{RequestRecord, Response};
use crate::{ListenerError, Result};
use http::{Method, StatusCode};
use tracing::{debug, warn};

/// Prints the POST body to the console and confirms receipt
///
/// Fails only when the body is not UTF-8. A console that cannot be written
/// to is logged and does not change the reply.
pub fn handle_post(
    request: &RequestRecord,
    console: &Console,
    format: BodyFormat,
) -> Result<Response> {
    let text = request.body_text()?;

    if let Err(e) = console.print_post(text, format) {
        warn!(error = %e, "Failed to write POST data to console");
    }
    debug!(size = request.content_length, path = %request.path, "Logged POST body");

    Ok(Response::post_received())
}

/// Serves the static status page; the request content is ignored
pub fn handle_get(_request: &RequestRecord) -> Response {
    Response::status_page()
}

/// Dispatches on method. Anything but GET and POST gets a 501, sent without
/// a body when the request was HEAD.
pub fn handle_request(
    request: &RequestRecord,
    console: &Console,
    format: BodyFormat,
) -> Result<Response> {
    match request.method {
        Method::POST => handle_post(request, console, format),
        Method::GET => Ok(handle_get(request)),
        Method::HEAD => Ok(Response::not_implemented(&request.method).head_only()),
        ref other => Ok(Response::not_implemented(other)),
    }
}

/// Reply sent for a request-level failure, if the peer can still receive one
pub fn error_response(err: &ListenerError) -> Option<Response> {
    let status = match err {
        ListenerError::MalformedRequest(_)
        | ListenerError::InvalidLengthHeader(_)
        | ListenerError::InvalidEncoding(_) => StatusCode::BAD_REQUEST,
        ListenerError::BodyTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
        ListenerError::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
        ListenerError::Io(_)
        | ListenerError::Bind { .. }
        | ListenerError::Config(_)
        | ListenerError::MalformedResponse(_)
        | ListenerError::IncompleteRequest => return None,
    };
    Some(Response::error(status, &err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::{POST_RECEIVED_BODY, STATUS_PAGE_BODY};
    use bytes::Bytes;

    fn record(method: Method, body: &'static [u8]) -> RequestRecord {
        RequestRecord {
            method,
            path: "/".to_string(),
            content_length: body.len(),
            body: Bytes::from_static(body),
        }
    }

    #[test]
    fn post_prints_pretty_json_and_confirms() {
        let (console, captured) = Console::capture();
        let request = record(Method::POST, br#"{"a":1}"#);
        let response = handle_request(&request, &console, BodyFormat::Json).unwrap();

        assert_eq!(response.status, StatusCode::OK);
        assert_eq!(response.content_type, "text/plain");
        assert_eq!(&response.body[..], POST_RECEIVED_BODY.as_bytes());
        assert!(captured.contents().contains("{\n    \"a\": 1\n}"));
    }

    #[test]
    fn post_with_invalid_utf8_is_an_encoding_error() {
        let (console, captured) = Console::capture();
        let err = handle_post(&record(Method::POST, b"\xff\xfe"), &console, BodyFormat::Json)
            .unwrap_err();

        assert!(matches!(err, ListenerError::InvalidEncoding(_)));
        assert!(captured.contents().is_empty());
        assert_eq!(error_response(&err).unwrap().status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn get_ignores_body() {
        let (console, captured) = Console::capture();
        let response =
            handle_request(&record(Method::GET, b"ignored"), &console, BodyFormat::Json).unwrap();

        assert_eq!(response.content_type, "text/html");
        assert_eq!(&response.body[..], STATUS_PAGE_BODY.as_bytes());
        assert!(captured.contents().is_empty());
    }

    #[test]
    fn other_methods_are_not_implemented() {
        let (console, _) = Console::capture();
        for method in [Method::PUT, Method::DELETE, Method::HEAD, Method::PATCH] {
            let response =
                handle_request(&record(method, b""), &console, BodyFormat::Json).unwrap();
            assert_eq!(response.status, StatusCode::NOT_IMPLEMENTED);
        }
    }

    #[test]
    fn head_gets_a_bodiless_not_implemented() {
        let (console, _) = Console::capture();
        let head = handle_request(&record(Method::HEAD, b""), &console, BodyFormat::Json).unwrap();
        let put = handle_request(&record(Method::PUT, b""), &console, BodyFormat::Json).unwrap();

        assert_eq!(head.status, StatusCode::NOT_IMPLEMENTED);
        assert!(head.head_only);
        assert!(!head.body.is_empty());
        assert!(!put.head_only);
    }

    #[test]
    fn lost_connections_get_no_reply() {
        assert!(error_response(&ListenerError::IncompleteRequest).is_none());
        assert_eq!(
            error_response(&ListenerError::BodyTooLarge { declared: 10, limit: 1 })
                .unwrap()
                .status,
            StatusCode::PAYLOAD_TOO_LARGE
        );
    }
}
