use std::time::Duration;
use thiserror::Error;

use crate::types::ApiError;

/// Boxed error produced by the underlying byte source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors produced while reading and decoding a completion stream.
///
/// Clean end of stream is not an error: [`CompletionStream::next`] returns
/// `Ok(None)` for it.
///
/// [`CompletionStream::next`]: crate::stream::CompletionStream::next
#[derive(Error, Debug)]
pub enum StreamError {
    /// HTTP failure while attaching to the response (connection refused, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Frame bytes could not be parsed into the expected message shape.
    ///
    /// Frame assembly is unaffected; the next pull continues with the next event.
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    /// The server reported a structured error, either through an `error:` event
    /// or an error-shaped data frame.
    #[error("API error: {0}")]
    Api(ApiError),

    /// The byte source closed while an error payload was still being accumulated.
    #[error("stream ended unexpectedly with partial error data")]
    Truncated,

    /// Too many consecutive event boundaries arrived without any data.
    #[error("stream has sent too many empty messages (limit {limit})")]
    TooManyEmptyMessages { limit: u32 },

    /// The byte source failed with an I/O error other than end of stream.
    #[error("stream read failed: {0}")]
    Transport(#[source] BoxError),

    /// The response had a non-success status code and never became a stream.
    #[error("HTTP {status}: {body}")]
    HttpError {
        /// HTTP status code (e.g. 401, 429, 500).
        status: u16,
        /// Response body text.
        body: String,
        /// Parsed `Retry-After` header value, if present.
        retry_after: Option<Duration>,
    },

    /// The stream was used after [`close`](crate::stream::CompletionStream::close).
    #[error("stream is closed")]
    Closed,
}

impl StreamError {
    /// Returns the structured API error, if this is one.
    pub fn api_error(&self) -> Option<&ApiError> {
        match self {
            StreamError::Api(err) => Some(err),
            _ => None,
        }
    }

    /// Whether this transport failure is really the connection running out of
    /// bytes mid-message.
    ///
    /// Walks the source chain looking for an [`std::io::ErrorKind::UnexpectedEof`].
    pub fn is_unexpected_eof(&self) -> bool {
        let StreamError::Transport(inner) = self else {
            return false;
        };
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(inner.as_ref());
        while let Some(err) = current {
            if let Some(io) = err.downcast_ref::<std::io::Error>() {
                if io.kind() == std::io::ErrorKind::UnexpectedEof {
                    return true;
                }
            }
            current = err.source();
        }
        false
    }
}

impl From<ApiError> for StreamError {
    fn from(err: ApiError) -> Self {
        StreamError::Api(err)
    }
}

pub type Result<T> = std::result::Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[derive(Debug, Error)]
    #[error("body read failed")]
    struct Wrapper(#[source] io::Error);

    #[test]
    fn test_unexpected_eof_detected_directly() {
        let err = StreamError::Transport(Box::new(io::Error::from(io::ErrorKind::UnexpectedEof)));
        assert!(err.is_unexpected_eof());
    }

    #[test]
    fn test_unexpected_eof_detected_through_source_chain() {
        let inner = io::Error::from(io::ErrorKind::UnexpectedEof);
        let err = StreamError::Transport(Box::new(Wrapper(inner)));
        assert!(err.is_unexpected_eof());
    }

    #[test]
    fn test_other_io_errors_are_not_eof() {
        let err = StreamError::Transport(Box::new(io::Error::from(io::ErrorKind::ConnectionReset)));
        assert!(!err.is_unexpected_eof());
        assert!(!StreamError::Truncated.is_unexpected_eof());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            StreamError::TooManyEmptyMessages { limit: 3 }.to_string(),
            "stream has sent too many empty messages (limit 3)"
        );
        assert_eq!(
            StreamError::Truncated.to_string(),
            "stream ended unexpectedly with partial error data"
        );
    }
}
