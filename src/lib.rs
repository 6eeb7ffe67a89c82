// drumgrid - Beat-synchronous drum onset selection
// Module declarations and top-level entry points

pub mod activations;
pub mod arranger;
pub mod error;
pub mod groove;
pub mod instruments;
pub mod pipeline;

pub use activations::{ActivationMatrix, DegenerateChannelPolicy, OnsetMap, PeakDetector};
pub use arranger::{export_midi, MidiExportOptions, NoteEncoding, NoteEvent};
pub use error::TranscriptionError;
pub use groove::{BeatGrid, BeatSelector, SelectorConfig, UnclassifiedPolicy};
pub use instruments::{Instrument, SoundClass, ThresholdConfig, ThresholdSet};
pub use pipeline::{Transcriber, Transcription, TranscriptionConfig};

/// Detected and beat-capped onsets with default selection settings
pub fn transcribe_onsets(
    matrix: &ActivationMatrix,
    grid: &BeatGrid,
    thresholds: &ThresholdConfig,
) -> Result<OnsetMap, TranscriptionError> {
    let config = TranscriptionConfig {
        thresholds: thresholds.clone(),
        ..Default::default()
    };
    Transcriber::new(config)?.onsets(matrix, grid)
}

/// Full transcription to MIDI bytes from the three named thresholds
pub fn transcribe_to_midi(
    matrix: &ActivationMatrix,
    grid: &BeatGrid,
    kick: f64,
    snare: f64,
    hihat: f64,
) -> Result<Vec<u8>, TranscriptionError> {
    let transcriber = Transcriber::new(TranscriptionConfig::with_thresholds(kick, snare, hihat))?;
    transcriber
        .transcribe(matrix, grid)?
        .to_midi(&MidiExportOptions::default())
}
