//! Stream diagnostics and telemetry.
//!
//! [`StreamDiagnostics`] records what the frame assembler saw on the wire:
//! how many frames it produced, how many heartbeats and ignored lines it
//! skipped, and how the stream ended.

/// Counters describing one stream's traffic.
///
/// # Example
///
/// ```
/// use sse_completion_stream::diagnostics::StreamDiagnostics;
///
/// let diag = StreamDiagnostics::default();
/// assert!(!diag.ended_cleanly());
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamDiagnostics {
    /// Physical lines read from the source.
    pub lines: u64,

    /// Frames handed to the decoder.
    pub frames: u64,

    /// Data lines with an empty payload.
    pub heartbeats: u64,

    /// `event:`, `id:`, `retry:` and comment lines.
    pub ignored_lines: u64,

    /// Lines matching no known prefix.
    pub unknown_lines: u64,

    /// Event boundaries reached with no data buffered.
    pub empty_boundaries: u64,

    /// Error payloads decoded and surfaced as [`ApiError`](crate::ApiError)s.
    pub api_errors: u64,

    /// Error payloads that could not be decoded and were dropped.
    pub dropped_error_payloads: u64,

    /// Whether a terminal marker (`[DONE]` or an accepted alternate) was seen.
    pub received_done: bool,

    /// Whether the final frame was flushed at end of stream rather than at a
    /// blank line.
    pub flushed_at_eof: bool,
}

impl StreamDiagnostics {
    /// Quick check: did the server finish the protocol properly?
    pub fn ended_cleanly(&self) -> bool {
        self.received_done
    }
}
