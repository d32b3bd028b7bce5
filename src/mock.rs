//! Scripted byte source for testing without a live server.
//!
//! [`MockSource`] replays pre-configured chunks in order, optionally ending
//! with an injected I/O error, so downstream consumers can write
//! deterministic tests against [`CompletionStream`](crate::CompletionStream).
//!
//! # Example
//!
//! ```
//! use sse_completion_stream::mock::MockSource;
//!
//! let source = MockSource::from_text("data: {\"id\":\"1\"}\n\ndata: [DONE]\n\n");
//! ```

use std::collections::VecDeque;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use bytes::Bytes;
use futures::Stream;

/// A byte stream that yields canned chunks in order, then ends.
#[derive(Debug, Default)]
pub struct MockSource {
    items: VecDeque<io::Result<Bytes>>,
}

impl MockSource {
    /// Replay the given chunks exactly as split.
    pub fn from_chunks<I, C>(chunks: I) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<Vec<u8>>,
    {
        Self {
            items: chunks
                .into_iter()
                .map(|c| Ok(Bytes::from(c.into())))
                .collect(),
        }
    }

    /// Deliver the whole text as a single chunk.
    pub fn from_text(text: impl Into<Vec<u8>>) -> Self {
        Self::from_chunks([text.into()])
    }

    /// Split the text into chunks of 1 to 8 bytes at positions chosen by a
    /// seeded RNG. The same seed always gives the same split.
    pub fn random_splits(text: impl AsRef<[u8]>, seed: u64) -> Self {
        let mut rng = fastrand::Rng::with_seed(seed);
        let mut rest = text.as_ref();
        let mut chunks = Vec::new();
        while !rest.is_empty() {
            let n = rng.usize(1..=8).min(rest.len());
            let (head, tail) = rest.split_at(n);
            chunks.push(head.to_vec());
            rest = tail;
        }
        Self::from_chunks(chunks)
    }

    /// Fail with an I/O error of the given kind after all chunks are consumed.
    pub fn fail_with(mut self, kind: io::ErrorKind) -> Self {
        self.items
            .push_back(Err(io::Error::new(kind, "mock source failure")));
        self
    }

    /// Number of items not yet yielded.
    pub fn remaining(&self) -> usize {
        self.items.len()
    }
}

impl Stream for MockSource {
    type Item = io::Result<Bytes>;

    fn poll_next(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Poll::Ready(self.items.pop_front())
    }
}
