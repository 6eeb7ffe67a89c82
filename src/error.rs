// Error types for onset transcription
// Every variant is raised before selection starts, so a failed call never yields partial output

use thiserror::Error;

use crate::arranger::midi::MidiExportError;
use crate::instruments::Instrument;

/// Errors that can occur while building a transcription
#[derive(Debug, Error)]
pub enum TranscriptionError {
    /// Malformed activation matrix or beat grid
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Activation column with zero variance, rejected by policy
    #[error("Degenerate activation channel for {instrument}: column has zero variance")]
    DegenerateChannel { instrument: Instrument },

    /// Instrument name outside the registry
    #[error("Unknown instrument: {0}")]
    UnknownInstrument(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("MIDI export failed: {0}")]
    MidiExport(#[from] MidiExportError),
}

impl From<serde_json::Error> for TranscriptionError {
    fn from(e: serde_json::Error) -> Self {
        TranscriptionError::InvalidConfig(e.to_string())
    }
}
