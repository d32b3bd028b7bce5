//! SSE wire handling: line reading, prefix classification and frame assembly.
//!
//! ```text
//! byte chunks ──► LineSource ──► classify ──► FrameAssembler ──► frame bytes
//!                                                  │
//!                                           ErrorAccumulator
//! ```

pub mod accumulator;
pub mod assembler;
pub mod classify;
pub mod line_source;

pub use accumulator::{BufferErrorAccumulator, ErrorAccumulator};
pub use assembler::{Assembled, AssemblerState, FrameAssembler};
pub use classify::{classify, LineKind};
pub use line_source::{Line, LineSource};
