// Pipeline execution and monitoring module
// Orchestrates detection, selection, and note encoding for one activation matrix

pub mod trace;
pub mod transcriber;

pub use trace::{Trace, TraceClock, TraceEntry, TraceError};
pub use transcriber::{Transcriber, Transcription, TranscriptionConfig};
