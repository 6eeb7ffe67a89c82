// Transcription pipeline
// Validation -> peak detection -> beat-synchronous selection -> note encoding

use serde::{Deserialize, Serialize};

use super::trace::{Trace, TraceClock};
use crate::activations::{ActivationMatrix, DegenerateChannelPolicy, OnsetMap, PeakDetector};
use crate::arranger::{encode_notes, export_midi, MidiExportOptions, NoteEncoding, NoteEvent};
use crate::error::TranscriptionError;
use crate::groove::{BeatGrid, BeatSelector, SelectorConfig};
use crate::instruments::{ThresholdConfig, ThresholdSet};

/// Complete transcription settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionConfig {
    pub thresholds: ThresholdConfig,
    pub selector: SelectorConfig,
    pub degenerate: DegenerateChannelPolicy,
    pub encoding: NoteEncoding,
}

impl TranscriptionConfig {
    /// Config with the three named thresholds and defaults elsewhere
    pub fn with_thresholds(kick: f64, snare: f64, hihat: f64) -> Self {
        TranscriptionConfig {
            thresholds: ThresholdConfig::new(kick, snare, hihat),
            ..Default::default()
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, TranscriptionError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_string(&self) -> Result<String, TranscriptionError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Result of one transcription call
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Transcription {
    /// Peaks before beat capping
    pub detected: OnsetMap,

    /// Onsets that survived beat capping
    pub selected: OnsetMap,

    /// Encoded notes for the selected onsets
    pub notes: Vec<NoteEvent>,

    pub trace: Trace,
}

impl Transcription {
    /// Encode the notes as a drum-kit MIDI file
    pub fn to_midi(&self, options: &MidiExportOptions) -> Result<Vec<u8>, TranscriptionError> {
        Ok(export_midi(&self.notes, options)?)
    }
}

/// Stateless transcriber; one instance can serve any number of calls
#[derive(Debug, Clone)]
pub struct Transcriber {
    detector: PeakDetector,
    selector: BeatSelector,
    encoding: NoteEncoding,
    clock: TraceClock,
}

impl Transcriber {
    /// Build a transcriber, rejecting invalid configuration up front
    pub fn new(config: TranscriptionConfig) -> Result<Self, TranscriptionError> {
        let thresholds = ThresholdSet::from_config(&config.thresholds)?;
        config.encoding.validate()?;

        Ok(Transcriber {
            detector: PeakDetector::new(thresholds, config.degenerate),
            selector: BeatSelector::new(config.selector),
            encoding: config.encoding,
            clock: TraceClock::default(),
        })
    }

    /// Stamp trace entries from `clock` instead of the wall clock
    pub fn with_trace_clock(mut self, clock: TraceClock) -> Self {
        self.clock = clock;
        self
    }

    /// Peak detection only
    pub fn detect(&self, matrix: &ActivationMatrix) -> Result<OnsetMap, TranscriptionError> {
        self.detector.detect(matrix)
    }

    /// Detected and beat-capped onsets per instrument
    pub fn onsets(
        &self,
        matrix: &ActivationMatrix,
        grid: &BeatGrid,
    ) -> Result<OnsetMap, TranscriptionError> {
        validate_inputs(matrix, grid)?;
        let detected = self.detector.detect(matrix)?;
        self.selector.select(&detected, matrix, grid)
    }

    /// Full pipeline with notes and a stage trace
    pub fn transcribe(
        &self,
        matrix: &ActivationMatrix,
        grid: &BeatGrid,
    ) -> Result<Transcription, TranscriptionError> {
        log::info!(
            "Transcribing {} frames x {} channels",
            matrix.num_frames(),
            matrix.num_channels()
        );

        let mut trace = Trace::with_clock(self.clock);

        trace.start("validation", "Checking activation matrix and beat grid");
        validate_inputs(matrix, grid)?;
        trace.record(
            "validation",
            1.0,
            "Inputs valid",
            Some(serde_json::json!({
                "frames": matrix.num_frames(),
                "channels": matrix.num_channels(),
                "beats": grid.distinct_beats().len(),
            })),
        );

        let detected = self.detector.detect(matrix)?;
        trace.record(
            "peak_detection",
            1.0,
            format!("Detected {} peaks", detected.total()),
            Some(detected.counts()),
        );

        let selected = self.selector.select(&detected, matrix, grid)?;
        trace.record(
            "selection",
            1.0,
            format!("Kept {} of {} peaks", selected.total(), detected.total()),
            Some(selected.counts()),
        );

        let notes = encode_notes(&selected, grid, &self.encoding)?;
        trace.complete("encoding", format!("Encoded {} notes", notes.len()));

        log::info!(
            "Transcription complete: {} peaks detected, {} notes",
            detected.total(),
            notes.len()
        );

        Ok(Transcription {
            detected,
            selected,
            notes,
            trace,
        })
    }
}

impl Default for Transcriber {
    fn default() -> Self {
        Transcriber {
            detector: PeakDetector::default(),
            selector: BeatSelector::default(),
            encoding: NoteEncoding::default(),
            clock: TraceClock::default(),
        }
    }
}

fn validate_inputs(matrix: &ActivationMatrix, grid: &BeatGrid) -> Result<(), TranscriptionError> {
    grid.ensure_frames(matrix.num_frames())?;
    matrix.ensure_registry_columns()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instruments::Instrument;

    const CHANNELS: usize = 8;
    const FRAMES: usize = 12;

    /// Three beats of four frames each
    fn grid() -> BeatGrid {
        BeatGrid::new((0..FRAMES).map(|f| (f / 4) as f64 * 0.5).collect()).unwrap()
    }

    fn matrix(values: &[(usize, Instrument, f32)]) -> ActivationMatrix {
        let mut data = vec![0.0; FRAMES * CHANNELS];
        for &(frame, instrument, value) in values {
            data[frame * CHANNELS + instrument.column().unwrap()] = value;
        }
        ActivationMatrix::from_flat(data, FRAMES, CHANNELS).unwrap()
    }

    fn groove() -> ActivationMatrix {
        matrix(&[
            (1, Instrument::Kick, 0.8),
            (3, Instrument::Kick, 0.9),
            (9, Instrument::Kick, 0.7),
            (6, Instrument::Snare, 0.7),
            (5, Instrument::ClosedHat, 0.6),
            (7, Instrument::ClosedHat, 0.5),
        ])
    }

    fn transcriber(degenerate: DegenerateChannelPolicy) -> Transcriber {
        let config = TranscriptionConfig {
            thresholds: ThresholdConfig::new(0.5, 0.5, 0.55).with_fallback(0.5),
            degenerate,
            ..Default::default()
        };
        Transcriber::new(config).unwrap()
    }

    #[test]
    fn test_full_transcription() {
        let _ = env_logger::builder().is_test(true).try_init();

        let result = transcriber(DegenerateChannelPolicy::Silent)
            .transcribe(&groove(), &grid())
            .unwrap();

        assert_eq!(result.detected.get(Instrument::Kick), &[1, 3, 9]);
        assert_eq!(result.detected.get(Instrument::ClosedHat), &[5, 7]);

        assert_eq!(result.selected.get(Instrument::Kick), &[3, 9]);
        assert_eq!(result.selected.get(Instrument::Snare), &[6]);
        assert_eq!(result.selected.get(Instrument::ClosedHat), &[5]);
        assert!(result.selected.get(Instrument::OpenHat).is_empty());
        assert!(result.selected.get(Instrument::LowTom).is_empty());
        assert!(result.selected.get(Instrument::Rim).is_empty());

        let summary: Vec<(Instrument, usize, f64)> = result
            .notes
            .iter()
            .map(|n| (n.instrument, n.frame, n.onset_s))
            .collect();
        assert_eq!(
            summary,
            vec![
                (Instrument::Kick, 3, 0.0),
                (Instrument::ClosedHat, 5, 0.5),
                (Instrument::Snare, 6, 0.5),
                (Instrument::Kick, 9, 1.0),
            ]
        );
        assert!(result.notes.iter().all(|n| n.velocity == 100 && n.duration_s == 0.1));
    }

    #[test]
    fn test_onsets_matches_transcribe() {
        let t = transcriber(DegenerateChannelPolicy::Silent);
        let onsets = t.onsets(&groove(), &grid()).unwrap();
        let full = t.transcribe(&groove(), &grid()).unwrap();
        assert_eq!(onsets, full.selected);
    }

    #[test]
    fn test_trace_stages() {
        let result = transcriber(DegenerateChannelPolicy::Silent)
            .transcribe(&groove(), &grid())
            .unwrap();

        let stages: Vec<&str> = result
            .trace
            .entries()
            .iter()
            .map(|e| e.stage.as_str())
            .collect();
        assert_eq!(
            stages,
            vec!["validation", "validation", "peak_detection", "selection", "encoding"]
        );

        let selection = result.trace.stage("selection").next().unwrap();
        assert_eq!(selection.data.as_ref().unwrap()["Kick"], 2);
    }

    #[test]
    fn test_degenerate_rejected_aborts_call() {
        // Open hat, tom and rim columns are all zero
        let result = transcriber(DegenerateChannelPolicy::Reject).transcribe(&groove(), &grid());
        match result {
            Err(TranscriptionError::DegenerateChannel { instrument }) => {
                assert_eq!(instrument, Instrument::OpenHat);
            }
            other => panic!("expected DegenerateChannel, got {:?}", other),
        }
    }

    #[test]
    fn test_all_zero_matrix_is_empty() {
        let result = Transcriber::default()
            .transcribe(&matrix(&[]), &grid())
            .unwrap();
        assert!(result.detected.is_empty());
        assert!(result.notes.is_empty());
        assert_eq!(result.selected.iter().count(), Instrument::SCORED.len());
    }

    #[test]
    fn test_fixed_clock_makes_result_repeatable() {
        let at = chrono::DateTime::parse_from_rfc3339("2024-03-01T12:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        let t = transcriber(DegenerateChannelPolicy::Silent).with_trace_clock(TraceClock::Fixed(at));

        let first = t.transcribe(&groove(), &grid()).unwrap();
        let second = t.transcribe(&groove(), &grid()).unwrap();
        assert_eq!(first, second);
        assert!(first.trace.entries().iter().all(|e| e.timestamp == at));
    }

    #[test]
    fn test_zero_frame_input_is_empty() {
        let empty = ActivationMatrix::from_rows(&[]).unwrap();
        let grid = BeatGrid::new(Vec::new()).unwrap();

        let result = Transcriber::default().transcribe(&empty, &grid).unwrap();
        assert!(result.selected.is_empty());
        assert!(result.notes.is_empty());

        // No frames means no columns are read, whatever the width
        let narrow = ActivationMatrix::from_flat(Vec::new(), 0, 2).unwrap();
        assert!(Transcriber::default().onsets(&narrow, &grid).unwrap().is_empty());
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let short = BeatGrid::new(vec![0.0; FRAMES - 1]).unwrap();
        assert!(matches!(
            Transcriber::default().transcribe(&groove(), &short),
            Err(TranscriptionError::InvalidInput(_))
        ));
        assert!(Transcriber::default().onsets(&groove(), &short).is_err());
    }

    #[test]
    fn test_unknown_instrument_rejected_at_construction() {
        let config = TranscriptionConfig::from_json_str(
            r#"{"thresholds": {"overrides": {"Cowbell": 1.0}}}"#,
        )
        .unwrap();
        assert!(matches!(
            Transcriber::new(config),
            Err(TranscriptionError::UnknownInstrument(_))
        ));
    }

    #[test]
    fn test_config_json_round_trip() {
        let config = TranscriptionConfig::with_thresholds(1.0, 0.8, 0.6);
        let json = config.to_json_string().unwrap();
        let parsed = TranscriptionConfig::from_json_str(&json).unwrap();
        assert_eq!(parsed, config);

        assert!(matches!(
            TranscriptionConfig::from_json_str("{"),
            Err(TranscriptionError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_to_midi() {
        let result = transcriber(DegenerateChannelPolicy::Silent)
            .transcribe(&groove(), &grid())
            .unwrap();
        let bytes = result.to_midi(&MidiExportOptions::default()).unwrap();
        let smf = midly::Smf::parse(&bytes).unwrap();
        assert_eq!(smf.tracks.len(), 2);
    }
}
