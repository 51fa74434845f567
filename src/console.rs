//! Console output: POST data blocks and startup/shutdown notices
//!
//! This is the listener's user-facing output and goes to stdout. Diagnostic
//! logging goes through `tracing` instead.

use crate::config::BodyFormat;
use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};
use std::borrow::Cow;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// First line of every POST data block
pub const BLOCK_HEADER: &str = "----- POST DATA RECEIVED -----";
/// Last line of every POST data block
pub const BLOCK_FOOTER: &str = "----------------------------";

/// Pretty-prints `text` with 4-space indentation if it parses as JSON
///
/// Returns `None` when the text is not JSON (including the empty string).
pub fn pretty_json(text: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(text).ok()?;

    let mut out = Vec::with_capacity(text.len() * 2);
    let formatter = PrettyFormatter::with_indent(b"    ");
    let mut serializer = Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer).ok()?;
    String::from_utf8(out).ok()
}

/// Text printed for a POST body under the given format
pub fn render_body(text: &str, format: BodyFormat) -> Cow<'_, str> {
    match format {
        BodyFormat::Raw => Cow::Borrowed(text),
        BodyFormat::Json => match pretty_json(text) {
            Some(pretty) => Cow::Owned(pretty),
            None => Cow::Borrowed(text),
        },
    }
}

/// Full bordered block written for one POST
pub fn post_block(text: &str, format: BodyFormat) -> String {
    format!(
        "\n{BLOCK_HEADER}\n{}\n{BLOCK_FOOTER}\n\n",
        render_body(text, format)
    )
}

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Cloneable handle to the output the listener prints to
#[derive(Clone)]
pub struct Console {
    out: SharedWriter,
}

impl std::fmt::Debug for Console {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Console").finish_non_exhaustive()
    }
}

impl Default for Console {
    fn default() -> Self {
        Self::stdout()
    }
}

impl Console {
    /// Console writing to the process stdout
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }

    /// Console writing to any writer
    pub fn new<W: Write + Send + 'static>(writer: W) -> Self {
        Self {
            out: Arc::new(Mutex::new(Box::new(writer))),
        }
    }

    /// Console writing into memory, with a handle to read back what was printed
    pub fn capture() -> (Self, CapturedOutput) {
        let captured = CapturedOutput::default();
        (Self::new(captured.clone()), captured)
    }

    fn write_str(&self, text: &str) -> io::Result<()> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| io::Error::other("console writer poisoned"))?;
        out.write_all(text.as_bytes())?;
        out.flush()
    }

    /// Prints one POST data block
    pub fn print_post(&self, text: &str, format: BodyFormat) -> io::Result<()> {
        self.write_str(&post_block(text, format))
    }

    /// Prints the bind URL and the interrupt hint
    pub fn announce_start(&self, url: &str) -> io::Result<()> {
        self.write_str(&format!(
            "Server started at {url}\nPress Ctrl+C to stop the server.\n"
        ))
    }

    /// Prints the shutdown notice
    pub fn announce_stop(&self) -> io::Result<()> {
        self.write_str("\nServer stopped.\n")
    }
}

/// In-memory sink filled by a [`Console::capture`] console
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    /// Everything printed so far, lossily decoded
    pub fn contents(&self) -> String {
        match self.buf.lock() {
            Ok(buf) => String::from_utf8_lossy(&buf).into_owned(),
            Err(poisoned) => String::from_utf8_lossy(&poisoned.into_inner()).into_owned(),
        }
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self
            .buf
            .lock()
            .map_err(|_| io::Error::other("capture buffer poisoned"))?;
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_reindented_with_four_spaces() {
        let rendered = render_body(r#"{"a":1,"b":[2,3]}"#, BodyFormat::Json);
        assert_eq!(
            rendered,
            "{\n    \"a\": 1,\n    \"b\": [\n        2,\n        3\n    ]\n}"
        );
    }

    #[test]
    fn json_key_order_is_preserved() {
        let rendered = render_body(r#"{"zeta":true,"alpha":null}"#, BodyFormat::Json);
        assert_eq!(rendered, "{\n    \"zeta\": true,\n    \"alpha\": null\n}");
    }

    #[test]
    fn json_numbers_keep_their_text() {
        let rendered = render_body("[12345678901234567890, 1.50]", BodyFormat::Json);
        assert_eq!(rendered, "[\n    12345678901234567890,\n    1.50\n]");
    }

    #[test]
    fn non_json_falls_back_to_raw_text() {
        assert_eq!(render_body("hello world", BodyFormat::Json), "hello world");
        assert_eq!(render_body("{broken", BodyFormat::Json), "{broken");
    }

    #[test]
    fn empty_body_falls_back_to_empty_text() {
        assert!(pretty_json("").is_none());
        assert_eq!(render_body("", BodyFormat::Json), "");
        assert_eq!(
            post_block("", BodyFormat::Json),
            format!("\n{BLOCK_HEADER}\n\n{BLOCK_FOOTER}\n\n")
        );
    }

    #[test]
    fn raw_format_never_reformats() {
        let body = r#"{"a":1}"#;
        assert_eq!(render_body(body, BodyFormat::Raw), body);
    }

    #[test]
    fn captured_console_records_blocks_and_notices() {
        let (console, captured) = Console::capture();

        console.announce_start("http://127.0.0.1:8000").unwrap();
        console.print_post("hello world", BodyFormat::Json).unwrap();
        console.announce_stop().unwrap();

        assert_eq!(
            captured.contents(),
            "Server started at http://127.0.0.1:8000\n\
             Press Ctrl+C to stop the server.\n\
             \n----- POST DATA RECEIVED -----\nhello world\n----------------------------\n\n\
             \nServer stopped.\n"
        );
    }
}
