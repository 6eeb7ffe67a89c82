// Groove - Beat grid and beat-synchronous selection
// Limits how many drum hits can land on one beat

pub mod beat_grid;
pub mod selector;

pub use beat_grid::BeatGrid;
pub use selector::{select_onsets, BeatSelector, SelectorConfig, UnclassifiedPolicy};
