//! Pluggable frame decoders.
//!
//! A [`CompletionStream`](crate::CompletionStream) is constructed with a
//! [`MessageDecoder`] that turns one frame's bytes into a typed message.
//! [`JsonDecoder`] covers the usual serde case; [`FnDecoder`] wraps a closure.

use std::fmt;
use std::marker::PhantomData;

use serde::de::DeserializeOwned;
use tracing::warn;

use crate::error::{Result, StreamError};
use crate::sse::classify::{contains, ERROR_MARKER};
use crate::types::ErrorResponse;

/// Marker used by [`JsonDecoder::lenient`]: frames mentioning `"choices"` are
/// completion chunks even when they fail to parse.
pub const CHOICES_MARKER: &str = "\"choices\"";

/// Converts one frame into a message. Must not depend on earlier frames.
pub trait MessageDecoder {
    type Message;

    fn decode(&self, frame: &[u8]) -> Result<Self::Message>;
}

/// Serde decoder for JSON frames.
///
/// Frames containing `"error":` that parse as an error envelope with a
/// non-empty message are reported as [`StreamError::Api`] instead of being
/// decoded as `T`.
pub struct JsonDecoder<T> {
    tolerance: Option<PartialTolerance<T>>,
}

/// Narrow fallback for servers that stream partial JSON for structured
/// output: a frame that fails to parse but contains `marker` decodes to
/// `fallback()` instead of an error.
struct PartialTolerance<T> {
    marker: Vec<u8>,
    fallback: fn() -> T,
}

impl<T: DeserializeOwned> JsonDecoder<T> {
    /// Strict decoder: every parse failure is an error.
    pub fn new() -> Self {
        Self { tolerance: None }
    }

    pub fn tolerates_partial_json(&self) -> bool {
        self.tolerance.is_some()
    }
}

impl<T: DeserializeOwned + Default> JsonDecoder<T> {
    /// Decoder that returns `T::default()` for unparseable frames containing
    /// [`CHOICES_MARKER`]. Each such frame is logged at warn level.
    pub fn lenient() -> Self {
        Self::new().with_partial_tolerance(CHOICES_MARKER)
    }

    /// Return `T::default()` for unparseable frames containing `marker`.
    pub fn with_partial_tolerance(mut self, marker: impl Into<String>) -> Self {
        self.tolerance = Some(PartialTolerance {
            marker: marker.into().into_bytes(),
            fallback: T::default,
        });
        self
    }
}

impl<T: DeserializeOwned> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Clone for JsonDecoder<T> {
    fn clone(&self) -> Self {
        Self {
            tolerance: self.tolerance.as_ref().map(|t| PartialTolerance {
                marker: t.marker.clone(),
                fallback: t.fallback,
            }),
        }
    }
}

impl<T> fmt::Debug for JsonDecoder<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonDecoder")
            .field(
                "partial_tolerance",
                &self
                    .tolerance
                    .as_ref()
                    .map(|t| String::from_utf8_lossy(&t.marker).into_owned()),
            )
            .finish()
    }
}

impl<T: DeserializeOwned> MessageDecoder for JsonDecoder<T> {
    type Message = T;

    fn decode(&self, frame: &[u8]) -> Result<T> {
        if contains(frame, ERROR_MARKER) {
            if let Ok(ErrorResponse { error: Some(api) }) = serde_json::from_slice(frame) {
                if !api.message.is_empty() {
                    return Err(StreamError::Api(api));
                }
            }
        }

        match serde_json::from_slice(frame) {
            Ok(message) => Ok(message),
            Err(e) => match &self.tolerance {
                Some(t) if contains(frame, &t.marker) => {
                    warn!(
                        error = %e,
                        frame = %String::from_utf8_lossy(frame),
                        "tolerating unparseable completion frame"
                    );
                    Ok((t.fallback)())
                }
                _ => Err(StreamError::Json(e)),
            },
        }
    }
}

/// Decoder backed by a closure.
///
/// # Example
///
/// ```
/// use sse_completion_stream::decoder::{FnDecoder, MessageDecoder};
///
/// let decoder = FnDecoder::new(|frame: &[u8]| Ok(frame.len()));
/// assert_eq!(decoder.decode(b"abc").unwrap(), 3);
/// ```
pub struct FnDecoder<F, T> {
    decode: F,
    _message: PhantomData<fn() -> T>,
}

impl<F, T> FnDecoder<F, T>
where
    F: Fn(&[u8]) -> Result<T>,
{
    pub fn new(decode: F) -> Self {
        Self {
            decode,
            _message: PhantomData,
        }
    }
}

impl<F, T> MessageDecoder for FnDecoder<F, T>
where
    F: Fn(&[u8]) -> Result<T>,
{
    type Message = T;

    fn decode(&self, frame: &[u8]) -> Result<T> {
        (self.decode)(frame)
    }
}

/// Passes frames through untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct RawDecoder;

impl MessageDecoder for RawDecoder {
    type Message = Vec<u8>;

    fn decode(&self, frame: &[u8]) -> Result<Vec<u8>> {
        Ok(frame.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatCompletionStreamResponse;
    use serde::Deserialize;

    #[derive(Debug, Default, Deserialize, PartialEq)]
    struct Chunk {
        id: String,
    }

    #[test]
    fn test_decodes_message() {
        let decoder = JsonDecoder::<Chunk>::new();
        let chunk = decoder.decode(br#"{"id":"1"}"#).expect("decode");
        assert_eq!(chunk, Chunk { id: "1".into() });
    }

    #[test]
    fn test_error_frame_becomes_api_error() {
        let decoder = JsonDecoder::<Chunk>::new();
        let err = decoder
            .decode(br#"{"error":{"message":"context too long","code":"context_length_exceeded"}}"#)
            .expect_err("api error");
        let api = err.api_error().expect("api");
        assert_eq!(api.message, "context too long");
    }

    #[test]
    fn test_error_frame_with_empty_message_is_decoded_normally() {
        #[derive(Debug, Deserialize)]
        struct WithError {
            error: serde_json::Value,
        }
        let decoder = JsonDecoder::<WithError>::new();
        let msg = decoder
            .decode(br#"{"error":{"message":""}}"#)
            .expect("not an api error");
        assert!(msg.error.is_object());
    }

    #[test]
    fn test_strict_decode_failure() {
        let decoder = JsonDecoder::<ChatCompletionStreamResponse>::new();
        let err = decoder
            .decode(br#"{"choices":[{"delta":{"content":"#)
            .expect_err("partial json");
        assert!(matches!(err, StreamError::Json(_)));
    }

    #[test]
    fn test_lenient_tolerates_partial_choices() {
        let decoder = JsonDecoder::<ChatCompletionStreamResponse>::lenient();
        assert!(decoder.tolerates_partial_json());
        let msg = decoder
            .decode(br#"{"choices":[{"delta":{"content":"#)
            .expect("tolerated");
        assert_eq!(msg, ChatCompletionStreamResponse::default());
    }

    #[test]
    fn test_lenient_still_rejects_unmarked_garbage() {
        let decoder = JsonDecoder::<ChatCompletionStreamResponse>::lenient();
        assert!(decoder.decode(b"{not json").is_err());
    }

    #[test]
    fn test_custom_tolerance_marker() {
        let decoder = JsonDecoder::<Chunk>::new().with_partial_tolerance("\"partial\"");
        assert_eq!(
            decoder.decode(br#"{"partial": tru"#).expect("tolerated"),
            Chunk::default()
        );
        assert!(decoder.decode(br#"{"choices": tru"#).is_err());
    }

    #[test]
    fn test_fn_decoder() {
        let decoder = FnDecoder::new(|frame: &[u8]| {
            Ok(String::from_utf8_lossy(frame).to_uppercase())
        });
        assert_eq!(decoder.decode(b"hi").expect("decode"), "HI");
    }

    #[test]
    fn test_raw_decoder() {
        assert_eq!(RawDecoder.decode(b"x\ny").expect("decode"), b"x\ny".to_vec());
    }

    #[test]
    fn test_debug_shows_marker() {
        let decoder = JsonDecoder::<Chunk>::lenient();
        assert!(format!("{:?}", decoder).contains("choices"));
    }
}
