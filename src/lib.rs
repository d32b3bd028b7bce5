//! # SSE Completion Stream
//!
//! Client-side decoder for the Server-Sent-Events framing used by streaming
//! LLM completion APIs (OpenAI and the many servers that imitate it).
//!
//! A streaming response body is a sequence of `data:` lines separated by
//! blank lines and closed by `data: [DONE]`. Real servers bend the rules:
//! they send heartbeats, split JSON over several `data:` lines, report errors
//! as `error:` events or bare JSON objects, end with `done` instead of
//! `[DONE]`, or drop the connection without a trailing blank line. This crate
//! turns such a byte stream into one decoded message per pull and makes
//! every way the stream can end distinguishable.
//!
//! ## Core Concepts
//!
//! - **[`CompletionStream`]** — the handle. Owns the response body; each
//!   `next().await` yields `Ok(Some(message))`, `Ok(None)` at end of stream,
//!   or a [`StreamError`].
//! - **[`MessageDecoder`]** — strategy turning one frame into a message.
//!   [`JsonDecoder`] parses serde types and recognizes embedded API errors.
//! - **[`FrameAssembler`]** — sans-IO state machine that groups lines into
//!   frames; usable on its own.
//! - **[`StreamConfig`]** — empty-message limit and per-server tolerances.
//!
//! ## Quick Start
//!
//! ```no_run
//! use sse_completion_stream::{
//!     ChatCompletionStreamResponse, CompletionStream, JsonDecoder, StreamConfig,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let response = reqwest::Client::new()
//!         .post("http://localhost:8000/v1/chat/completions")
//!         .json(&serde_json::json!({
//!             "model": "llama3",
//!             "stream": true,
//!             "messages": [{"role": "user", "content": "Hi"}],
//!         }))
//!         .send()
//!         .await?;
//!
//!     let mut stream = CompletionStream::from_response(
//!         response,
//!         JsonDecoder::<ChatCompletionStreamResponse>::new(),
//!         StreamConfig::default(),
//!     )
//!     .await?;
//!
//!     while let Some(chunk) = stream.next().await? {
//!         print!("{}", chunk.content().unwrap_or(""));
//!     }
//!     if !stream.is_complete() {
//!         eprintln!("\n(connection closed before [DONE])");
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod decoder;
pub mod diagnostics;
pub mod error;
pub mod mock;
pub mod sse;
pub mod stream;
pub mod types;

pub use config::{Framing, StreamConfig, DEFAULT_EMPTY_MESSAGES_LIMIT};
pub use decoder::{FnDecoder, JsonDecoder, MessageDecoder, RawDecoder};
pub use diagnostics::StreamDiagnostics;
pub use error::{Result, StreamError};
pub use sse::{BufferErrorAccumulator, ErrorAccumulator, FrameAssembler};
pub use stream::{CompletionStream, ResponseByteStream};
pub use types::{
    ApiError, ChatCompletionStreamResponse, CompletionStreamResponse, ErrorCode, ErrorResponse,
    Usage,
};
