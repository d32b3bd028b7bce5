//! Side buffer for error payloads.

/// Collects bytes that belong to an error payload rather than a data frame.
///
/// At most one error payload is outstanding per stream; the assembler calls
/// [`reset`](ErrorAccumulator::reset) once it has been decoded.
pub trait ErrorAccumulator {
    fn write(&mut self, bytes: &[u8]);

    /// Everything written since the last reset.
    fn bytes(&self) -> &[u8];

    fn reset(&mut self);

    fn is_empty(&self) -> bool {
        self.bytes().is_empty()
    }
}

/// Default in-memory accumulator.
#[derive(Debug, Default, Clone)]
pub struct BufferErrorAccumulator {
    buffer: Vec<u8>,
}

impl BufferErrorAccumulator {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ErrorAccumulator for BufferErrorAccumulator {
    fn write(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    fn bytes(&self) -> &[u8] {
        &self.buffer
    }

    fn reset(&mut self) {
        self.buffer.clear();
    }
}
