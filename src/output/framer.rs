//! Line framing for raw subprocess output.
//!
//! Reads from a pipe return arbitrary byte counts, so a line (or a single
//! UTF-8 character) may be split across any number of chunks. [`LineFramer`]
//! accumulates chunks and hands back every completed line plus the current
//! unterminated tail.

use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;

/// ANSI cursor movement / erase sequences: `ESC [ n ; m <letter>`.
static ANSI_CURSOR_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\x1b\[[0-9]*;?[0-9]*[A-KST]").expect("ANSI cursor pattern is valid")
});

/// Remove ANSI cursor/erase escape sequences from `text`.
///
/// Removal is repeated until no sequence is left, so deleting one sequence
/// cannot expose another and the result is stable under re-stripping.
pub fn strip_ansi(text: &str) -> Cow<'_, str> {
    if !text.contains('\x1b') {
        return Cow::Borrowed(text);
    }

    let mut stripped = ANSI_CURSOR_PATTERN.replace_all(text, "").into_owned();
    while ANSI_CURSOR_PATTERN.is_match(&stripped) {
        stripped = ANSI_CURSOR_PATTERN.replace_all(&stripped, "").into_owned();
    }
    Cow::Owned(stripped)
}

/// Result of feeding one chunk to a [`LineFramer`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Framed {
    /// Lines completed by this chunk, without their newline.
    pub lines: Vec<String>,
    /// The unterminated tail after this chunk, if any is displayable.
    pub remainder: Option<String>,
}

/// Incremental splitter from byte chunks to text lines.
///
/// Framing is deterministic: any split of the same byte stream into chunks
/// yields the same lines and the same final remainder.
#[derive(Debug, Default)]
pub struct LineFramer {
    pending: Vec<u8>,
}

impl LineFramer {
    /// Create an empty framer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `chunk` and extract every line it completes.
    pub fn push(&mut self, chunk: &[u8]) -> Framed {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        if let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') {
            let tail = self.pending.split_off(last_newline + 1);
            let complete = std::mem::replace(&mut self.pending, tail);
            lines = complete[..complete.len() - 1]
                .split(|&b| b == b'\n')
                .map(decode_line)
                .collect();
        }

        Framed {
            lines,
            remainder: self.remainder(),
        }
    }

    /// The current unterminated tail, stripped and decoded.
    ///
    /// Bytes of a character that is still incomplete are left out until the
    /// rest of the character arrives.
    pub fn remainder(&self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let text = decode_partial(&self.pending);
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }

    /// Whether any unterminated bytes are buffered.
    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Take the unterminated tail as a final complete line.
    ///
    /// Used once the stream has ended; the framer is empty afterwards.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let tail = std::mem::take(&mut self.pending);
        Some(decode_line(&tail))
    }
}

fn decode_line(bytes: &[u8]) -> String {
    strip_ansi(&String::from_utf8_lossy(bytes)).into_owned()
}

fn decode_partial(bytes: &[u8]) -> String {
    let text = match std::str::from_utf8(bytes) {
        Ok(text) => Cow::Borrowed(text),
        // Incomplete trailing character: show only the decodable prefix.
        Err(e) if e.error_len().is_none() => String::from_utf8_lossy(&bytes[..e.valid_up_to()]),
        Err(_) => String::from_utf8_lossy(bytes),
    };
    strip_ansi(&text).into_owned()
}
