// Activation matrix
// Frame-major per-instrument confidence curves produced by the transcription model

use ndarray::{Array2, ArrayView1};

use crate::error::TranscriptionError;
use crate::instruments::REQUIRED_CHANNELS;

/// Immutable 2D activation array, shape (num_frames, num_channels)
#[derive(Debug, Clone, PartialEq)]
pub struct ActivationMatrix {
    values: Array2<f32>,
}

impl ActivationMatrix {
    /// Wrap an existing array; every value must be finite
    pub fn from_array(values: Array2<f32>) -> Result<Self, TranscriptionError> {
        if let Some(((frame, channel), _)) = values.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(TranscriptionError::InvalidInput(format!(
                "non-finite activation at frame {}, channel {}",
                frame, channel
            )));
        }

        Ok(ActivationMatrix { values })
    }

    /// Build from a flat frame-major buffer
    pub fn from_flat(
        data: Vec<f32>,
        num_frames: usize,
        num_channels: usize,
    ) -> Result<Self, TranscriptionError> {
        let len = data.len();
        let values = Array2::from_shape_vec((num_frames, num_channels), data).map_err(|e| {
            TranscriptionError::InvalidInput(format!(
                "activation buffer has {} values, expected {} frames x {} channels: {}",
                len, num_frames, num_channels, e
            ))
        })?;

        Self::from_array(values)
    }

    /// Build from one row per frame; every row must have the same width
    ///
    /// With no rows the matrix is empty and any width is accepted.
    pub fn from_rows(rows: &[Vec<f32>]) -> Result<Self, TranscriptionError> {
        let num_channels = rows.first().map(|r| r.len()).unwrap_or(REQUIRED_CHANNELS);

        let mut data = Vec::with_capacity(rows.len() * num_channels);
        for (frame, row) in rows.iter().enumerate() {
            if row.len() != num_channels {
                return Err(TranscriptionError::InvalidInput(format!(
                    "frame {} has {} channels, expected {}",
                    frame,
                    row.len(),
                    num_channels
                )));
            }
            data.extend_from_slice(row);
        }

        Self::from_flat(data, rows.len(), num_channels)
    }

    pub fn num_frames(&self) -> usize {
        self.values.nrows()
    }

    pub fn num_channels(&self) -> usize {
        self.values.ncols()
    }

    pub fn is_empty(&self) -> bool {
        self.num_frames() == 0
    }

    /// Raw value at (frame, column)
    pub fn value(&self, frame: usize, column: usize) -> Option<f32> {
        self.values.get((frame, column)).copied()
    }

    /// One column as a curve over frames
    pub fn column(&self, column: usize) -> Option<ArrayView1<'_, f32>> {
        if column < self.num_channels() {
            Some(self.values.column(column))
        } else {
            None
        }
    }

    /// Check the matrix carries every column the instrument registry reads
    ///
    /// A matrix without frames has nothing to read and passes at any width.
    pub fn ensure_registry_columns(&self) -> Result<(), TranscriptionError> {
        if !self.is_empty() && self.num_channels() < REQUIRED_CHANNELS {
            return Err(TranscriptionError::InvalidInput(format!(
                "activation matrix has {} channels, instrument registry needs {}",
                self.num_channels(),
                REQUIRED_CHANNELS
            )));
        }
        Ok(())
    }
}
