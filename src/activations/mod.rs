// Activation handling
// Model output matrix, per-instrument onset maps, and peak detection

pub mod matrix;
pub mod onsets;
pub mod peaks;

pub use matrix::ActivationMatrix;
pub use onsets::OnsetMap;
pub use peaks::{find_peaks, local_maxima, zscore, DegenerateChannelPolicy, PeakDetector};
