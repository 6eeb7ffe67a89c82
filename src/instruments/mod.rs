// Instrument registry and detection thresholds
// Fixed drum kit layout shared by detection, selection, and note encoding

pub mod registry;
pub mod thresholds;

pub use registry::{Instrument, SoundClass, REQUIRED_CHANNELS, SCORED_COUNT};
pub use thresholds::{ThresholdConfig, ThresholdSet, DEFAULT_THRESHOLD, HIHAT_OFFSET};
