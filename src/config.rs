//! Stream configuration and per-server tolerances.

/// Default number of consecutive empty events tolerated before the stream is
/// considered faulty.
pub const DEFAULT_EMPTY_MESSAGES_LIMIT: u32 = 300;

/// How `data:` lines are grouped into frames.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Framing {
    /// Standard SSE: consecutive `data:` lines accumulate until a blank line.
    #[default]
    EventBoundary,
    /// Every `data:` line is its own frame. For servers that never send blank
    /// lines between events.
    PerLine,
}

/// Configuration for a [`CompletionStream`](crate::CompletionStream).
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Maximum consecutive empty events before failing with
    /// [`StreamError::TooManyEmptyMessages`](crate::StreamError::TooManyEmptyMessages).
    pub empty_messages_limit: u32,

    /// Accept `data: done` as a terminal marker in addition to `data: [DONE]`.
    pub alternate_done: bool,

    /// Treat bare JSON lines containing `"error":` as error payloads.
    pub raw_json_errors: bool,

    /// How consecutive `data:` lines are grouped into frames.
    pub framing: Framing,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            empty_messages_limit: DEFAULT_EMPTY_MESSAGES_LIMIT,
            alternate_done: true,
            raw_json_errors: true,
            framing: Framing::EventBoundary,
        }
    }
}

impl StreamConfig {
    /// Only the standard framing: `[DONE]` terminator, `error:` events.
    pub fn strict() -> Self {
        Self {
            alternate_done: false,
            raw_json_errors: false,
            ..Self::default()
        }
    }

    pub fn with_empty_messages_limit(mut self, limit: u32) -> Self {
        self.empty_messages_limit = limit;
        self
    }

    pub fn with_alternate_done(mut self, enabled: bool) -> Self {
        self.alternate_done = enabled;
        self
    }

    pub fn with_raw_json_errors(mut self, enabled: bool) -> Self {
        self.raw_json_errors = enabled;
        self
    }

    pub fn with_framing(mut self, framing: Framing) -> Self {
        self.framing = framing;
        self
    }
}
