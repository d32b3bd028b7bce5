//! Incremental line reader over a chunked byte stream.
//!
//! Network chunks arrive at arbitrary boundaries; [`LineSource`] buffers them
//! and hands out one `\n`-terminated physical line at a time.

use futures::{Stream, StreamExt};

use crate::error::{BoxError, Result, StreamError};

/// One physical line read from the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// A line including its trailing `\n`.
    Complete(Vec<u8>),
    /// The source is exhausted. Carries the trailing unterminated bytes the
    /// first time, and is empty on every call after that.
    Eof(Vec<u8>),
}

/// Buffered line reader over any stream of byte chunks, such as
/// `reqwest::Response::bytes_stream()`.
#[derive(Debug)]
pub struct LineSource<S> {
    inner: S,
    buffer: Vec<u8>,
    /// Bytes before this offset have already been searched for `\n`.
    scanned: usize,
    exhausted: bool,
}

impl<S, B, E> LineSource<S>
where
    S: Stream<Item = std::result::Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    E: Into<BoxError>,
{
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
            scanned: 0,
            exhausted: false,
        }
    }

    /// Read up to and including the next `\n`.
    ///
    /// Once the source is exhausted it is never polled again. Any error from
    /// the source is returned as [`StreamError::Transport`].
    pub async fn next_line(&mut self) -> Result<Line> {
        loop {
            if let Some(pos) = self.buffer[self.scanned..].iter().position(|&b| b == b'\n') {
                let end = self.scanned + pos + 1;
                let line: Vec<u8> = self.buffer.drain(..end).collect();
                self.scanned = 0;
                return Ok(Line::Complete(line));
            }
            self.scanned = self.buffer.len();

            if self.exhausted {
                self.scanned = 0;
                return Ok(Line::Eof(std::mem::take(&mut self.buffer)));
            }

            match self.inner.next().await {
                Some(Ok(chunk)) => self.buffer.extend_from_slice(chunk.as_ref()),
                Some(Err(e)) => return Err(StreamError::Transport(e.into())),
                None => self.exhausted = true,
            }
        }
    }

    /// Stop polling the source. Bytes already buffered are still handed out,
    /// followed by [`Line::Eof`].
    pub fn mark_exhausted(&mut self) {
        self.exhausted = true;
    }

    /// Consume the reader, returning the underlying stream.
    pub fn into_inner(self) -> S {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockSource;
    use std::io;

    async fn collect_lines(source: MockSource) -> Vec<Line> {
        let mut lines = LineSource::new(source);
        let mut out = Vec::new();
        loop {
            let line = lines.next_line().await.expect("line");
            let eof = matches!(line, Line::Eof(_));
            out.push(line);
            if eof {
                break;
            }
        }
        out
    }

    #[tokio::test]
    async fn test_lines_across_chunks() {
        let source = MockSource::from_chunks(vec!["data: {\"a\"", ":1}\n\nda", "ta: x\n"]);
        let lines = collect_lines(source).await;
        assert_eq!(
            lines,
            vec![
                Line::Complete(b"data: {\"a\":1}\n".to_vec()),
                Line::Complete(b"\n".to_vec()),
                Line::Complete(b"data: x\n".to_vec()),
                Line::Eof(Vec::new()),
            ]
        );
    }

    #[tokio::test]
    async fn test_trailing_partial_line_returned_once() {
        let mut lines = LineSource::new(MockSource::from_text("data: a\ndata: b"));
        assert_eq!(
            lines.next_line().await.expect("line"),
            Line::Complete(b"data: a\n".to_vec())
        );
        assert_eq!(lines.next_line().await.expect("eof"), Line::Eof(b"data: b".to_vec()));
        assert_eq!(lines.next_line().await.expect("eof"), Line::Eof(Vec::new()));
        assert_eq!(lines.next_line().await.expect("eof"), Line::Eof(Vec::new()));
    }

    #[tokio::test]
    async fn test_crlf_kept_in_line() {
        let lines = collect_lines(MockSource::from_text("data: a\r\n\r\n")).await;
        assert_eq!(lines[0], Line::Complete(b"data: a\r\n".to_vec()));
        assert_eq!(lines[1], Line::Complete(b"\r\n".to_vec()));
    }

    #[tokio::test]
    async fn test_random_splits_yield_same_lines() {
        let text = "data: {\"id\":\"1\"}\n\nevent: ping\ndata: {\"id\":\"2\"}\n\ndata: [DONE]\n\n";
        let expected = collect_lines(MockSource::from_text(text)).await;
        for seed in 0..20 {
            let got = collect_lines(MockSource::random_splits(text, seed)).await;
            assert_eq!(got, expected, "seed {}", seed);
        }
    }

    #[tokio::test]
    async fn test_transport_error_surfaces() {
        let source = MockSource::from_text("data: a\n").fail_with(io::ErrorKind::ConnectionReset);
        let mut lines = LineSource::new(source);
        assert!(matches!(lines.next_line().await, Ok(Line::Complete(_))));
        let err = lines.next_line().await.expect_err("transport error");
        assert!(matches!(err, StreamError::Transport(_)));
        assert!(!err.is_unexpected_eof());
    }
}
