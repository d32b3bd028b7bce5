//! Pull-based handle over a streaming completion response.
//!
//! [`CompletionStream`] owns the response body, drives the
//! [`FrameAssembler`] one line at a time and hands finished frames to a
//! [`MessageDecoder`]. Nothing is read ahead: all I/O happens inside
//! [`next`](CompletionStream::next).

use std::pin::Pin;
use std::time::Duration;

use bytes::Bytes;
use futures::Stream;
use reqwest::header::HeaderMap;
use tracing::debug;

use crate::config::StreamConfig;
use crate::decoder::MessageDecoder;
use crate::diagnostics::StreamDiagnostics;
use crate::error::{BoxError, Result, StreamError};
use crate::sse::{Assembled, BufferErrorAccumulator, ErrorAccumulator, FrameAssembler, Line, LineSource};

/// Body of an attached `reqwest::Response`.
pub type ResponseByteStream = Pin<Box<dyn Stream<Item = reqwest::Result<Bytes>> + Send>>;

/// Decoded view of a streaming completion.
///
/// `next()` returns `Ok(Some(message))` per event and `Ok(None)` once the
/// stream is over, whether the server sent `[DONE]` or just closed the
/// connection; [`is_complete`](Self::is_complete) tells the two apart.
///
/// # Example
///
/// ```
/// use sse_completion_stream::{ChatCompletionStreamResponse, CompletionStream, JsonDecoder, StreamConfig};
/// use sse_completion_stream::mock::MockSource;
///
/// # tokio_test::block_on(async {
/// let source = MockSource::from_text(
///     "data: {\"choices\":[{\"delta\":{\"content\":\"Hi\"}}]}\n\ndata: [DONE]\n\n",
/// );
/// let mut stream = CompletionStream::new(
///     source,
///     JsonDecoder::<ChatCompletionStreamResponse>::new(),
///     StreamConfig::default(),
/// );
///
/// let chunk = stream.next().await.unwrap().unwrap();
/// assert_eq!(chunk.content(), Some("Hi"));
/// assert!(stream.next().await.unwrap().is_none());
/// assert!(stream.is_complete());
/// # });
/// ```
pub struct CompletionStream<S, D, A = BufferErrorAccumulator> {
    source: Option<LineSource<S>>,
    assembler: FrameAssembler<A>,
    decoder: D,
    headers: HeaderMap,
}

impl<S, B, E, D> CompletionStream<S, D>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<BoxError>,
    D: MessageDecoder,
{
    /// Wrap an already-flowing byte stream.
    pub fn new(source: S, decoder: D, config: StreamConfig) -> Self {
        Self::with_accumulator(source, decoder, config, BufferErrorAccumulator::new())
    }
}

impl<D: MessageDecoder> CompletionStream<ResponseByteStream, D> {
    /// Attach to a streaming HTTP response.
    ///
    /// Non-success statuses are rejected with [`StreamError::HttpError`]
    /// carrying the body text and any `Retry-After` hint. Response headers
    /// are kept and available through [`headers`](Self::headers).
    pub async fn from_response(
        response: reqwest::Response,
        decoder: D,
        config: StreamConfig,
    ) -> Result<Self> {
        let status = response.status();
        if !status.is_success() {
            let retry_after = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(parse_retry_after);
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::HttpError {
                status: status.as_u16(),
                body,
                retry_after,
            });
        }

        debug!(status = status.as_u16(), url = %response.url(), "attached completion stream");
        let headers = response.headers().clone();
        let body: ResponseByteStream = Box::pin(response.bytes_stream());
        Ok(Self::new(body, decoder, config).with_headers(headers))
    }
}

impl<S, B, E, D, A> CompletionStream<S, D, A>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<BoxError>,
    D: MessageDecoder,
    A: ErrorAccumulator,
{
    /// Wrap a byte stream, collecting error payloads in `errors`.
    pub fn with_accumulator(source: S, decoder: D, config: StreamConfig, errors: A) -> Self {
        Self {
            source: Some(LineSource::new(source)),
            assembler: FrameAssembler::with_accumulator(config, errors),
            decoder,
            headers: HeaderMap::new(),
        }
    }

    pub fn with_headers(mut self, headers: HeaderMap) -> Self {
        self.headers = headers;
        self
    }

    /// Pull and decode the next message.
    ///
    /// `Ok(None)` is the only end-of-stream signal. A decode failure leaves
    /// the stream usable; every other error is fatal and later calls return
    /// `Ok(None)`.
    pub async fn next(&mut self) -> Result<Option<D::Message>> {
        match self.next_raw().await? {
            Some(frame) => self.decoder.decode(&frame).map(Some),
            None => Ok(None),
        }
    }

    /// Pull the next frame without decoding it.
    pub async fn next_raw(&mut self) -> Result<Option<Vec<u8>>> {
        if self.assembler.is_finished() {
            return Ok(None);
        }
        let Some(source) = self.source.as_mut() else {
            return Err(StreamError::Closed);
        };

        loop {
            let assembled = match source.next_line().await {
                Ok(Line::Complete(line)) => self.assembler.push_line(&line)?,
                Ok(Line::Eof(partial)) => {
                    let from_partial = if partial.is_empty() {
                        None
                    } else {
                        self.assembler.push_line(&partial)?
                    };
                    match from_partial {
                        Some(assembled) => Some(assembled),
                        None => Some(self.assembler.finish()?),
                    }
                }
                Err(e) if e.is_unexpected_eof() => {
                    debug!(error = %e, "connection closed mid-message, treating as end of stream");
                    source.mark_exhausted();
                    None
                }
                Err(e) => {
                    self.assembler.fail();
                    return Err(e);
                }
            };

            match assembled {
                Some(Assembled::Frame(frame)) => return Ok(Some(frame)),
                Some(Assembled::Done) => return Ok(None),
                None => continue,
            }
        }
    }

    /// Adapt into a [`Stream`] of messages. The stream ends where
    /// [`next`](Self::next) would return `Ok(None)`.
    pub fn into_stream(self) -> impl Stream<Item = Result<D::Message>> {
        futures::stream::unfold(self, |mut stream| async move {
            match stream.next().await {
                Ok(Some(message)) => Some((Ok(message), stream)),
                Ok(None) => None,
                Err(e) => Some((Err(e), stream)),
            }
        })
    }
}

impl<S, D, A: ErrorAccumulator> CompletionStream<S, D, A> {
    /// True only if the terminal marker was observed, as opposed to the
    /// connection simply running out of bytes.
    pub fn is_complete(&self) -> bool {
        self.assembler.received_done()
    }

    /// True once no more messages will be produced.
    pub fn is_finished(&self) -> bool {
        self.assembler.is_finished()
    }

    /// Release the underlying byte source, terminating the connection.
    ///
    /// Returns [`StreamError::Closed`] if already closed.
    pub fn close(&mut self) -> Result<()> {
        match self.source.take() {
            Some(source) => {
                drop(source);
                debug!(complete = self.is_complete(), "completion stream closed");
                Ok(())
            }
            None => Err(StreamError::Closed),
        }
    }

    /// Response headers captured by [`from_response`](CompletionStream::from_response).
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn config(&self) -> &StreamConfig {
        self.assembler.config()
    }

    pub fn diagnostics(&self) -> &StreamDiagnostics {
        self.assembler.diagnostics()
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }
}

/// Parse a `Retry-After` header value as seconds.
fn parse_retry_after(value: &str) -> Option<Duration> {
    value.trim().parse::<u64>().ok().map(Duration::from_secs)
}
