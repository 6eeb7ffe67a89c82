// Peak detection on normalized activation curves
// Global z-score per instrument column, then local maxima above a height threshold

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

use super::matrix::ActivationMatrix;
use super::onsets::OnsetMap;
use crate::error::TranscriptionError;
use crate::instruments::{Instrument, ThresholdSet};

/// What to do with a column whose values are all identical
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DegenerateChannelPolicy {
    /// Treat as no activation: empty onset list, logged at warn level
    #[default]
    Silent,

    /// Abort the whole call with `DegenerateChannel`
    Reject,
}

/// Per-instrument peak detector
#[derive(Debug, Clone, Default)]
pub struct PeakDetector {
    thresholds: ThresholdSet,
    degenerate: DegenerateChannelPolicy,
}

impl PeakDetector {
    pub fn new(thresholds: ThresholdSet, degenerate: DegenerateChannelPolicy) -> Self {
        PeakDetector {
            thresholds,
            degenerate,
        }
    }

    pub fn thresholds(&self) -> &ThresholdSet {
        &self.thresholds
    }

    /// Detect peaks for every scored instrument
    ///
    /// Fails without partial output if the matrix lacks registry columns or a
    /// degenerate column is rejected by policy.
    pub fn detect(&self, matrix: &ActivationMatrix) -> Result<OnsetMap, TranscriptionError> {
        matrix.ensure_registry_columns()?;

        let mut onsets = OnsetMap::new();
        for instrument in Instrument::SCORED {
            let peaks = self.detect_instrument(matrix, instrument)?;
            log::debug!(
                "{}: {} peaks (threshold {:.3})",
                instrument,
                peaks.len(),
                self.thresholds.get(instrument)
            );
            onsets.set(instrument, peaks);
        }

        Ok(onsets)
    }

    /// Detect peaks for one instrument; unscored instruments yield nothing
    pub fn detect_instrument(
        &self,
        matrix: &ActivationMatrix,
        instrument: Instrument,
    ) -> Result<Vec<usize>, TranscriptionError> {
        let column = match instrument.column() {
            Some(column) => column,
            None => return Ok(Vec::new()),
        };

        if matrix.is_empty() {
            return Ok(Vec::new());
        }

        let curve = matrix.column(column).ok_or_else(|| {
            TranscriptionError::InvalidInput(format!(
                "{} reads column {} but matrix has {} channels",
                instrument,
                column,
                matrix.num_channels()
            ))
        })?;

        let normalized = match zscore(curve) {
            Some(normalized) => normalized,
            None => match self.degenerate {
                DegenerateChannelPolicy::Silent => {
                    log::warn!(
                        "{} activation column is constant ({} frames), no onsets detected",
                        instrument,
                        curve.len()
                    );
                    return Ok(Vec::new());
                }
                DegenerateChannelPolicy::Reject => {
                    return Err(TranscriptionError::DegenerateChannel { instrument });
                }
            },
        };

        Ok(find_peaks(&normalized, self.thresholds.get(instrument)))
    }
}

/// Normalize to zero mean and unit (population) variance
///
/// Returns `None` for an empty curve or one whose values are all identical.
/// Constancy is checked exactly rather than via the computed deviation, which
/// rounding can leave slightly above zero.
pub fn zscore(curve: ArrayView1<'_, f32>) -> Option<Vec<f64>> {
    let first = *curve.get(0)?;
    if curve.iter().all(|&v| v == first) {
        return None;
    }

    let values = curve.mapv(f64::from);
    let mean = values.mean()?;
    let std = values.std(0.0);

    if !std.is_normal() {
        return None;
    }

    Some(values.iter().map(|&v| (v - mean) / std).collect())
}

/// Local maxima of a signal
///
/// A sample is a peak when its left neighbour is strictly lower and the next
/// differing sample to its right is strictly lower. A flat plateau yields one
/// peak at its midpoint, rounded down. The first and last samples are never
/// peaks.
pub fn local_maxima(signal: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if signal.len() < 3 {
        return peaks;
    }

    let last = signal.len() - 1;
    let mut i = 1;
    while i < last {
        if signal[i - 1] < signal[i] {
            let mut ahead = i + 1;
            while ahead < last && signal[ahead] == signal[i] {
                ahead += 1;
            }

            if signal[ahead] < signal[i] {
                let left_edge = i;
                let right_edge = ahead - 1;
                peaks.push((left_edge + right_edge) / 2);
                // Nothing inside the plateau can be another maximum
                i = ahead;
            }
        }
        i += 1;
    }

    peaks
}

/// Local maxima whose height is at least `min_height`, ascending
pub fn find_peaks(signal: &[f64], min_height: f64) -> Vec<usize> {
    local_maxima(signal)
        .into_iter()
        .filter(|&i| signal[i] >= min_height)
        .collect()
}
