// Beat grid
// Maps every activation frame to the timestamp of the beat window it falls in

use serde::{Deserialize, Serialize};

use crate::error::TranscriptionError;

/// Per-frame beat timestamps in seconds
///
/// Adjacent frames inside the same beat window repeat the same value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct BeatGrid {
    beat_times: Vec<f64>,
}

impl BeatGrid {
    /// Create a grid from per-frame beat times
    ///
    /// Every value must be finite. A decreasing step is accepted, since
    /// grouping only compares timestamps for equality, but is logged.
    pub fn new(beat_times: Vec<f64>) -> Result<Self, TranscriptionError> {
        if let Some(frame) = beat_times.iter().position(|t| !t.is_finite()) {
            return Err(TranscriptionError::InvalidInput(format!(
                "non-finite beat time at frame {}",
                frame
            )));
        }

        if let Some(frame) = beat_times.windows(2).position(|w| w[1] < w[0]) {
            log::warn!(
                "Beat grid decreases at frame {} ({:.3}s -> {:.3}s)",
                frame + 1,
                beat_times[frame],
                beat_times[frame + 1]
            );
        }

        Ok(BeatGrid { beat_times })
    }

    /// Number of frames covered
    pub fn len(&self) -> usize {
        self.beat_times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.beat_times.is_empty()
    }

    /// Beat time of a frame
    pub fn time(&self, frame: usize) -> Option<f64> {
        self.beat_times.get(frame).copied()
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.beat_times
    }

    /// Hashable identity of the frame's beat; `-0.0` and `0.0` are one beat
    pub fn beat_key(&self, frame: usize) -> Option<u64> {
        self.time(frame).map(beat_key)
    }

    /// Distinct beat timestamps in first-appearance order
    pub fn distinct_beats(&self) -> Vec<f64> {
        let mut seen = std::collections::HashSet::new();
        self.beat_times
            .iter()
            .copied()
            .filter(|&t| seen.insert(beat_key(t)))
            .collect()
    }

    /// Fail unless the grid covers exactly `num_frames` frames
    pub fn ensure_frames(&self, num_frames: usize) -> Result<(), TranscriptionError> {
        if self.len() != num_frames {
            return Err(TranscriptionError::InvalidInput(format!(
                "beat grid has {} frames, activation matrix has {}",
                self.len(),
                num_frames
            )));
        }
        Ok(())
    }
}

impl TryFrom<Vec<f64>> for BeatGrid {
    type Error = TranscriptionError;

    fn try_from(beat_times: Vec<f64>) -> Result<Self, Self::Error> {
        BeatGrid::new(beat_times)
    }
}

impl From<BeatGrid> for Vec<f64> {
    fn from(grid: BeatGrid) -> Self {
        grid.beat_times
    }
}

fn beat_key(time: f64) -> u64 {
    // Adding 0.0 turns -0.0 into 0.0
    (time + 0.0).to_bits()
}
