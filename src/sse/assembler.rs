//! Frame assembly state machine.
//!
//! [`FrameAssembler`] is fed one physical line at a time and decides when a
//! frame is complete. It performs no I/O, so the same state machine serves
//! every byte source.

use tracing::{debug, trace, warn};

use super::accumulator::{BufferErrorAccumulator, ErrorAccumulator};
use super::classify::{classify, is_done_marker, LineKind};
use crate::config::{Framing, StreamConfig};
use crate::diagnostics::StreamDiagnostics;
use crate::error::{Result, StreamError};
use crate::types::{ApiError, ErrorResponse};

/// What a line (or end of stream) produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Assembled {
    /// One complete, non-empty frame ready for decoding.
    Frame(Vec<u8>),
    /// The stream is over. Returned for every call once finished.
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssemblerState {
    Accumulating,
    /// Terminal marker seen or source exhausted cleanly.
    Done,
    /// A fatal error was reported.
    Failed,
}

/// Turns classified lines into frames.
#[derive(Debug)]
pub struct FrameAssembler<A = BufferErrorAccumulator> {
    config: StreamConfig,
    state: AssemblerState,
    received_done: bool,
    data: Vec<u8>,
    errors: A,
    /// Consecutive empty boundaries since the last frame.
    empty_messages: u32,
    /// Unknown lines not yet charged to `empty_messages`.
    pending_noise: u32,
    diagnostics: StreamDiagnostics,
}

impl FrameAssembler<BufferErrorAccumulator> {
    pub fn new(config: StreamConfig) -> Self {
        Self::with_accumulator(config, BufferErrorAccumulator::new())
    }
}

impl<A: ErrorAccumulator> FrameAssembler<A> {
    /// Create an assembler that collects error payloads in `errors`.
    pub fn with_accumulator(config: StreamConfig, errors: A) -> Self {
        Self {
            config,
            state: AssemblerState::Accumulating,
            received_done: false,
            data: Vec::new(),
            errors,
            empty_messages: 0,
            pending_noise: 0,
            diagnostics: StreamDiagnostics::default(),
        }
    }

    pub fn state(&self) -> AssemblerState {
        self.state
    }

    /// True once the stream is done or failed; no more lines are consumed.
    pub fn is_finished(&self) -> bool {
        self.state != AssemblerState::Accumulating
    }

    pub fn received_done(&self) -> bool {
        self.received_done
    }

    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    pub fn diagnostics(&self) -> &StreamDiagnostics {
        &self.diagnostics
    }

    /// Feed one physical line.
    ///
    /// Returns `Ok(None)` when more lines are needed. Any error is fatal: the
    /// assembler moves to [`AssemblerState::Failed`] and reports
    /// [`Assembled::Done`] from then on.
    pub fn push_line(&mut self, line: &[u8]) -> Result<Option<Assembled>> {
        if self.is_finished() {
            return Ok(Some(Assembled::Done));
        }
        self.diagnostics.lines += 1;
        let result = self.step(line);
        if result.is_err() {
            self.state = AssemblerState::Failed;
        }
        result
    }

    /// Handle end of stream.
    ///
    /// Buffered data is flushed as a final frame first; the next call then
    /// finishes. A pending error payload with no data means the connection was
    /// cut mid-error and yields [`StreamError::Truncated`].
    pub fn finish(&mut self) -> Result<Assembled> {
        if self.is_finished() {
            return Ok(Assembled::Done);
        }
        if !self.data.is_empty() {
            debug!(bytes = self.data.len(), "flushing unterminated frame at end of stream");
            self.diagnostics.flushed_at_eof = true;
            return Ok(Assembled::Frame(self.take_frame()));
        }
        if !self.errors.is_empty() {
            warn!(
                bytes = self.errors.bytes().len(),
                "stream ended with partial error data"
            );
            self.errors.reset();
            self.state = AssemblerState::Failed;
            return Err(StreamError::Truncated);
        }
        self.state = AssemblerState::Done;
        Ok(Assembled::Done)
    }

    /// Mark the stream failed for a reason outside the assembler (transport error).
    pub fn fail(&mut self) {
        self.state = AssemblerState::Failed;
    }

    fn step(&mut self, line: &[u8]) -> Result<Option<Assembled>> {
        match classify(line, self.config.raw_json_errors) {
            LineKind::Blank => self.on_boundary(),
            LineKind::Data(payload) => self.on_data(payload),
            LineKind::Error(payload) => {
                self.errors.write(payload);
                Ok(None)
            }
            LineKind::RawJsonError(json) => {
                self.errors.write(json);
                self.errors.write(b"\n");
                Ok(None)
            }
            LineKind::Ignored => {
                self.diagnostics.ignored_lines += 1;
                Ok(None)
            }
            LineKind::Unknown => {
                let text = String::from_utf8_lossy(line);
                trace!(line = %text.trim_end(), "unrecognized stream line");
                self.diagnostics.unknown_lines += 1;
                self.pending_noise = self.pending_noise.saturating_add(1);
                Ok(None)
            }
        }
    }

    fn on_boundary(&mut self) -> Result<Option<Assembled>> {
        if !self.errors.is_empty() {
            if let Some(api) = self.take_error() {
                return Err(StreamError::Api(api));
            }
        }

        if !self.data.is_empty() {
            return Ok(Some(Assembled::Frame(self.take_frame())));
        }

        self.diagnostics.empty_boundaries += 1;
        let noise = std::mem::take(&mut self.pending_noise);
        self.empty_messages = self.empty_messages.saturating_add(1).saturating_add(noise);
        if self.empty_messages > self.config.empty_messages_limit {
            let limit = self.config.empty_messages_limit;
            warn!(limit, "too many empty stream messages");
            return Err(StreamError::TooManyEmptyMessages { limit });
        }
        Ok(None)
    }

    fn on_data(&mut self, payload: &[u8]) -> Result<Option<Assembled>> {
        if is_done_marker(payload, self.config.alternate_done) {
            debug!(marker = %String::from_utf8_lossy(payload), "stream terminal marker received");
            // An error sent right before the marker outranks the clean finish.
            if !self.errors.is_empty() {
                if let Some(api) = self.take_error() {
                    return Err(StreamError::Api(api));
                }
            }
            self.state = AssemblerState::Done;
            self.received_done = true;
            self.diagnostics.received_done = true;
            // Data sent right before the marker without a blank line is still a frame.
            if !self.data.is_empty() {
                return Ok(Some(Assembled::Frame(self.take_frame())));
            }
            return Ok(Some(Assembled::Done));
        }

        if payload.is_empty() {
            self.diagnostics.heartbeats += 1;
            return Ok(None);
        }

        match self.config.framing {
            Framing::PerLine => {
                self.data.extend_from_slice(payload);
                Ok(Some(Assembled::Frame(self.take_frame())))
            }
            Framing::EventBoundary => {
                if !self.data.is_empty() {
                    self.data.push(b'\n');
                }
                self.data.extend_from_slice(payload);
                Ok(None)
            }
        }
    }

    fn take_frame(&mut self) -> Vec<u8> {
        self.empty_messages = 0;
        self.pending_noise = 0;
        self.diagnostics.frames += 1;
        std::mem::take(&mut self.data)
    }

    /// Decode and clear the pending error payload.
    ///
    /// Accepts the `{"error": {...}}` envelope or a bare error object; either
    /// way the message must be non-empty.
    fn take_error(&mut self) -> Option<ApiError> {
        let decoded = match serde_json::from_slice::<ErrorResponse>(self.errors.bytes()) {
            Ok(ErrorResponse { error: Some(api) }) => Ok(Some(api).filter(|a| !a.message.is_empty())),
            Ok(ErrorResponse { error: None }) => serde_json::from_slice::<ApiError>(self.errors.bytes())
                .map(|api| Some(api).filter(|a| !a.message.is_empty())),
            Err(e) => Err(e),
        };
        self.errors.reset();

        match decoded {
            Ok(Some(api)) => {
                self.diagnostics.api_errors += 1;
                Some(api)
            }
            Ok(None) => {
                warn!("error payload carried no error detail, ignoring");
                self.diagnostics.dropped_error_payloads += 1;
                None
            }
            Err(e) => {
                warn!(error = %e, "undecodable error payload, ignoring");
                self.diagnostics.dropped_error_payloads += 1;
                None
            }
        }
    }
}
