//! Queue of input waiting to be written to a subprocess.

use std::collections::VecDeque;

use parking_lot::Mutex;

/// Raw entry that closes the subprocess input instead of being written.
pub const END_OF_INPUT: &str = "\u{4}";

/// One queued input entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingInput {
    /// Text written verbatim.
    Text(String),
    /// Close the subprocess stdin (Ctrl-D).
    EndOfInput,
}

impl From<String> for PendingInput {
    fn from(text: String) -> Self {
        if text == END_OF_INPUT {
            PendingInput::EndOfInput
        } else {
            PendingInput::Text(text)
        }
    }
}

impl From<&str> for PendingInput {
    fn from(text: &str) -> Self {
        PendingInput::from(text.to_string())
    }
}

/// Thread-safe FIFO of [`PendingInput`] entries.
///
/// Consumers enqueue from any thread; the owning worker dequeues one entry
/// per loop iteration in which it can write.
#[derive(Debug, Default)]
pub struct InputQueue {
    entries: Mutex<VecDeque<PendingInput>>,
}

impl InputQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue one entry.
    pub fn push(&self, input: impl Into<PendingInput>) {
        self.entries.lock().push_back(input.into());
    }

    /// Enqueue several entries, keeping their order.
    pub fn extend<I>(&self, inputs: I)
    where
        I: IntoIterator,
        I::Item: Into<PendingInput>,
    {
        self.entries
            .lock()
            .extend(inputs.into_iter().map(Into::into));
    }

    /// Dequeue the oldest entry.
    pub fn pop(&self) -> Option<PendingInput> {
        self.entries.lock().pop_front()
    }

    /// Whether nothing is waiting.
    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Number of waiting entries.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }
}
