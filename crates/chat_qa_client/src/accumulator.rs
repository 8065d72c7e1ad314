//! Reassembles a streamed response from its fragments.

/// Per-response state: the text received so far and whether the stream ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamState {
    pub buffer: String,
    pub done: bool,
}

/// Concatenates fragments in arrival order, with no separators.
#[derive(Debug, Default)]
pub struct StreamAccumulator {
    state: StreamState,
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `fragment` and return the buffer after the append.
    pub fn append(&mut self, fragment: &str) -> &str {
        self.state.buffer.push_str(fragment);
        &self.state.buffer
    }

    pub fn current(&self) -> &str {
        &self.state.buffer
    }

    pub fn is_empty(&self) -> bool {
        self.state.buffer.is_empty()
    }

    /// Close the stream. Whatever arrived, complete or not, is the result.
    pub fn finish(mut self) -> StreamState {
        self.state.done = true;
        self.state
    }
}
