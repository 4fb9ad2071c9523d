//! Status message and the decoding of guest diagnostics.
//!
//! The status message is the single user-visible line of feedback. It is
//! overwritten by whichever event happened last: a successful assemble, a
//! message the guest sent through `env.err`, or a failure synthesized by the
//! host.

use tracing::{info, warn};

/// Status shown after a successful assemble call.
pub const ASSEMBLED: &str = "Assembled";

/// Status shown when `run` is requested with no assembled artifact.
pub const NOT_ASSEMBLED: &str = "You must assemble something first";

/// Status shown when assembly fails and the guest gave no reason.
pub const ASSEMBLY_FAILED: &str = "Assembly failed";

/// Decode a guest message.
///
/// Malformed UTF-8 sequences are replaced with U+FFFD; well-formed text,
/// multi-byte sequences included, is reproduced exactly.
pub fn decode_message(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

/// Format a host-side failure the way it is shown to the user.
pub fn host_error(detail: impl std::fmt::Display) -> String {
    format!("[ERROR]: {detail}")
}

/// Where the current status text came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusSource {
    /// Nothing has been reported yet.
    Empty,
    /// The host reported success.
    Notice,
    /// The guest called `env.err`.
    Guest,
    /// The host synthesized a failure.
    Host,
}

/// The current user-visible status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    text: String,
    source: StatusSource,
}

impl Default for StatusMessage {
    fn default() -> Self {
        Self {
            text: String::new(),
            source: StatusSource::Empty,
        }
    }
}

impl StatusMessage {
    /// Create an empty status.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the status with a success notice.
    pub fn notice(&mut self, text: &str) {
        info!(status = text, "Status updated");
        self.set(text.to_string(), StatusSource::Notice);
    }

    /// Replace the status with a message decoded from guest memory.
    pub fn guest(&mut self, message: String) {
        warn!(guest_err = true, "{}", message);
        self.set(message, StatusSource::Guest);
    }

    /// Replace the status with a host-side failure, prefixed with `[ERROR]: `.
    pub fn host_error(&mut self, detail: impl std::fmt::Display) {
        let text = host_error(detail);
        warn!(status = %text, "Host error reported");
        self.set(text, StatusSource::Host);
    }

    fn set(&mut self, text: String, source: StatusSource) {
        self.text = text;
        self.source = source;
    }

    /// The current text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Where the current text came from.
    pub fn source(&self) -> StatusSource {
        self.source
    }
}

impl std::fmt::Display for StatusMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ascii() {
        assert_eq!(decode_message(b"bad operand"), "bad operand");
    }

    #[test]
    fn test_decode_multibyte() {
        let text = "ligne 3: opérande ✗ 😀";
        assert_eq!(decode_message(text.as_bytes()), text);
    }

    #[test]
    fn test_decode_malformed_is_replaced() {
        assert_eq!(decode_message(b"ab\xFFcd"), "ab\u{FFFD}cd");
        // Truncated three-byte sequence
        assert_eq!(decode_message(b"x\xE2\x9C"), "x\u{FFFD}");
    }

    #[test]
    fn test_decode_empty() {
        assert_eq!(decode_message(b""), "");
    }

    #[test]
    fn test_status_overwrites() {
        let mut status = StatusMessage::new();
        assert_eq!(status.source(), StatusSource::Empty);

        status.notice(ASSEMBLED);
        assert_eq!(status.as_str(), "Assembled");
        assert_eq!(status.source(), StatusSource::Notice);

        status.guest("unknown mnemonic".into());
        assert_eq!(status.as_str(), "unknown mnemonic");
        assert_eq!(status.source(), StatusSource::Guest);

        status.host_error(NOT_ASSEMBLED);
        assert_eq!(status.to_string(), "[ERROR]: You must assemble something first");
        assert_eq!(status.source(), StatusSource::Host);
    }
}
