//! Per-process output buffer shared between a worker and its consumers.

use parking_lot::Mutex;
use serde::Serialize;

/// Output handed to a consumer by [`OutputBuffer::drain`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Drained {
    /// `lines` holds only the current unterminated line.
    pub remainder_active: bool,
    /// A remainder shown by an earlier drain is stale and should be replaced.
    pub remainder_changed: bool,
    /// Lines in production order.
    pub lines: Vec<String>,
}

#[derive(Debug, Default)]
struct BufferState {
    lines: Vec<String>,
    remainder_active: bool,
    remainder_changed: bool,
    remainder: String,
    has_new_data: bool,
}

/// Buffered output of one process.
///
/// Holds complete lines that have not been drained yet, or, when
/// `remainder_active` is set, a single entry with the current incomplete last
/// line (for example a prompt waiting for input). A later batch of complete
/// lines replaces that placeholder instead of being appended after it, so a
/// consumer never sees partial and complete data interleaved.
///
/// Every method takes the internal lock once and is atomic with respect to
/// every other method.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    state: Mutex<BufferState>,
}

impl OutputBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append complete lines, discarding an undrained remainder placeholder.
    pub fn append_lines(&self, lines: impl IntoIterator<Item = String>) {
        let mut state = self.state.lock();
        state.has_new_data = true;
        if state.remainder_active {
            state.lines.clear();
            state.remainder_changed = true;
        }
        state.remainder_active = false;
        state.remainder.clear();
        state.lines.extend(lines);
    }

    /// Publish `text` as the current incomplete last line.
    ///
    /// The text is always recorded (see [`remainder`](Self::remainder)), but
    /// while undrained lines are present they are left untouched: the first
    /// writer wins until a drain empties the buffer.
    pub fn set_remainder(&self, text: &str) {
        let mut state = self.state.lock();
        state.remainder.clear();
        state.remainder.push_str(text);
        if !state.lines.is_empty() {
            return;
        }
        state.remainder_changed = !state.remainder_active;
        state.remainder_active = true;
        state.lines.push(text.to_string());
    }

    /// Take everything pending.
    ///
    /// Returns `None` when there is nothing to hand out. Clears the
    /// new-data flag either way.
    pub fn drain(&self) -> Option<Drained> {
        let mut state = self.state.lock();
        state.has_new_data = false;
        if state.lines.is_empty() {
            return None;
        }
        let drained = Drained {
            remainder_active: state.remainder_active,
            remainder_changed: state.remainder_changed,
            lines: std::mem::take(&mut state.lines),
        };
        state.remainder_changed = false;
        Some(drained)
    }

    /// Whether a drain would return anything.
    pub fn has_pending(&self) -> bool {
        !self.state.lock().lines.is_empty()
    }

    /// Whether complete lines arrived since the last drain.
    pub fn has_new_data(&self) -> bool {
        self.state.lock().has_new_data
    }

    /// Whether the buffer currently represents an incomplete line.
    pub fn remainder_active(&self) -> bool {
        self.state.lock().remainder_active
    }

    /// The most recently published incomplete line, empty if none.
    pub fn remainder(&self) -> String {
        self.state.lock().remainder.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn drain_empty_is_none() {
        let buffer = OutputBuffer::new();
        assert!(buffer.drain().is_none());
        assert!(!buffer.has_pending());
        assert!(!buffer.has_new_data());
    }

    #[test]
    fn append_then_drain() {
        let buffer = OutputBuffer::new();
        buffer.append_lines(lines(&["a", "b"]));
        buffer.append_lines(lines(&["c"]));
        assert!(buffer.has_pending());
        assert!(buffer.has_new_data());

        let drained = buffer.drain().unwrap();
        assert_eq!(drained.lines, lines(&["a", "b", "c"]));
        assert!(!drained.remainder_active);
        assert!(!drained.remainder_changed);
        assert!(!buffer.has_new_data());
    }

    #[test]
    fn second_drain_is_none() {
        let buffer = OutputBuffer::new();
        buffer.append_lines(lines(&["x"]));
        assert!(buffer.drain().is_some());
        assert!(buffer.drain().is_none());
    }

    #[test]
    fn remainder_on_empty_buffer() {
        let buffer = OutputBuffer::new();
        buffer.set_remainder("prompt> ");
        assert!(!buffer.has_new_data());

        let drained = buffer.drain().unwrap();
        assert!(drained.remainder_active);
        assert!(drained.remainder_changed);
        assert_eq!(drained.lines, lines(&["prompt> "]));
        assert_eq!(buffer.remainder(), "prompt> ");
    }

    #[test]
    fn remainder_ignored_while_lines_undrained() {
        let buffer = OutputBuffer::new();
        buffer.append_lines(lines(&["a"]));
        buffer.set_remainder("partial");

        let drained = buffer.drain().unwrap();
        assert!(!drained.remainder_active);
        assert_eq!(drained.lines, lines(&["a"]));
        // The text is still recorded for remainder queries
        assert_eq!(buffer.remainder(), "partial");

        // After the drain the remainder takes effect
        buffer.set_remainder("partial");
        let drained = buffer.drain().unwrap();
        assert!(drained.remainder_active);
        assert_eq!(drained.lines, lines(&["partial"]));
    }

    #[test]
    fn first_remainder_wins_until_drained() {
        let buffer = OutputBuffer::new();
        buffer.set_remainder("a");
        buffer.set_remainder("ab");
        assert_eq!(buffer.drain().unwrap().lines, lines(&["a"]));
        assert_eq!(buffer.remainder(), "ab");
    }

    #[test]
    fn reoffered_remainder_is_not_marked_changed() {
        let buffer = OutputBuffer::new();
        buffer.set_remainder("$ ");
        assert!(buffer.drain().unwrap().remainder_changed);

        buffer.set_remainder("$ ");
        let drained = buffer.drain().unwrap();
        assert!(drained.remainder_active);
        assert!(!drained.remainder_changed);
    }

    #[test]
    fn append_replaces_remainder_placeholder() {
        let buffer = OutputBuffer::new();
        buffer.set_remainder("hel");
        buffer.append_lines(lines(&["hello", "world"]));
        assert!(!buffer.remainder_active());
        assert_eq!(buffer.remainder(), "");

        let drained = buffer.drain().unwrap();
        assert!(!drained.remainder_active);
        assert!(drained.remainder_changed);
        assert_eq!(drained.lines, lines(&["hello", "world"]));
    }

    #[test]
    fn drained_remainder_change_is_reported_once() {
        let buffer = OutputBuffer::new();
        buffer.set_remainder("> ");
        buffer.drain();
        // The consumer has shown "> ", now real lines supersede it
        buffer.append_lines(lines(&["> ok"]));
        let drained = buffer.drain().unwrap();
        assert!(drained.remainder_changed);

        buffer.append_lines(lines(&["more"]));
        let drained = buffer.drain().unwrap();
        assert!(!drained.remainder_changed);
    }

    #[test]
    fn append_always_deactivates_remainder() {
        let buffer = OutputBuffer::new();
        buffer.set_remainder("x");
        buffer.append_lines(Vec::new());
        assert!(!buffer.remainder_active());
    }
}
