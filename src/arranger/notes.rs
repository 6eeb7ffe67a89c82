// Note encoding
// Turns selected onsets into fixed-velocity, fixed-length percussion notes

use serde::{Deserialize, Serialize};

use crate::activations::OnsetMap;
use crate::error::TranscriptionError;
use crate::groove::BeatGrid;
use crate::instruments::Instrument;

/// Velocity and length given to every note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NoteEncoding {
    /// MIDI velocity (1-127)
    pub velocity: u8,

    /// Note length in seconds
    pub duration_s: f64,
}

impl Default for NoteEncoding {
    fn default() -> Self {
        NoteEncoding {
            velocity: 100,
            duration_s: 0.1,
        }
    }
}

impl NoteEncoding {
    pub fn validate(&self) -> Result<(), TranscriptionError> {
        if !(1..=127).contains(&self.velocity) {
            return Err(TranscriptionError::InvalidConfig(format!(
                "velocity must be in 1..=127, got {}",
                self.velocity
            )));
        }
        if !self.duration_s.is_finite() || self.duration_s <= 0.0 {
            return Err(TranscriptionError::InvalidConfig(format!(
                "note duration must be positive, got {}",
                self.duration_s
            )));
        }
        Ok(())
    }
}

/// A percussion note derived from one selected onset
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteEvent {
    pub instrument: Instrument,

    /// Activation frame the onset was selected at
    pub frame: usize,

    /// Beat time of the frame in seconds
    pub onset_s: f64,

    pub duration_s: f64,

    /// GM percussion pitch
    pub pitch: u8,

    pub velocity: u8,
}

impl NoteEvent {
    pub fn end_s(&self) -> f64 {
        self.onset_s + self.duration_s
    }
}

/// Encode onsets as notes
///
/// Notes are ordered by frame, then by scoring order, so each instrument's
/// notes stay ascending.
pub fn encode_notes(
    onsets: &OnsetMap,
    grid: &BeatGrid,
    encoding: &NoteEncoding,
) -> Result<Vec<NoteEvent>, TranscriptionError> {
    encoding.validate()?;

    let mut notes = Vec::with_capacity(onsets.total());
    for (instrument, frames) in onsets.iter() {
        for &frame in frames {
            let onset_s = grid.time(frame).ok_or_else(|| {
                TranscriptionError::InvalidInput(format!(
                    "{} onset at frame {} outside beat grid of {} frames",
                    instrument,
                    frame,
                    grid.len()
                ))
            })?;

            notes.push(NoteEvent {
                instrument,
                frame,
                onset_s,
                duration_s: encoding.duration_s,
                pitch: instrument.midi_pitch(),
                velocity: encoding.velocity,
            });
        }
    }

    notes.sort_by_key(|n| (n.frame, n.instrument.scored_index()));
    Ok(notes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_defaults() {
        let grid = BeatGrid::new(vec![0.0, 0.0, 0.5, 0.5]).unwrap();
        let mut onsets = OnsetMap::new();
        onsets.set(Instrument::Kick, vec![0]);
        onsets.set(Instrument::ClosedHat, vec![0, 3]);

        let notes = encode_notes(&onsets, &grid, &NoteEncoding::default()).unwrap();
        assert_eq!(notes.len(), 3);

        assert_eq!(notes[0].instrument, Instrument::Kick);
        assert_eq!(notes[0].pitch, 36);
        assert_eq!(notes[0].velocity, 100);
        assert_eq!(notes[0].onset_s, 0.0);
        assert!((notes[0].end_s() - 0.1).abs() < 1e-12);

        assert_eq!(notes[1].instrument, Instrument::ClosedHat);
        assert_eq!(notes[1].pitch, 42);

        assert_eq!(notes[2].frame, 3);
        assert_eq!(notes[2].onset_s, 0.5);
    }

    #[test]
    fn test_out_of_range_frame() {
        let grid = BeatGrid::new(vec![0.0, 0.5]).unwrap();
        let mut onsets = OnsetMap::new();
        onsets.set(Instrument::Snare, vec![2]);

        assert!(matches!(
            encode_notes(&onsets, &grid, &NoteEncoding::default()),
            Err(TranscriptionError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_invalid_encoding() {
        let grid = BeatGrid::new(vec![0.0]).unwrap();
        let onsets = OnsetMap::new();

        let silent = NoteEncoding {
            velocity: 0,
            ..Default::default()
        };
        assert!(encode_notes(&onsets, &grid, &silent).is_err());

        let instant = NoteEncoding {
            duration_s: 0.0,
            ..Default::default()
        };
        assert!(encode_notes(&onsets, &grid, &instant).is_err());
    }
}
