// Beat-synchronous onset selection
// Caps simultaneous hits per beat and sound class, keeping the strongest raw activations

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};

use super::beat_grid::BeatGrid;
use crate::activations::{ActivationMatrix, OnsetMap};
use crate::error::TranscriptionError;
use crate::instruments::{Instrument, SoundClass};

/// Handling of instruments whose sound class is `Unclassified`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnclassifiedPolicy {
    /// Never selected
    #[default]
    Drop,

    /// Every detected peak is kept, exempt from beat capping
    PassThrough,
}

/// Selection settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    /// Maximum LOW-class onsets per beat
    pub low_cap: usize,

    /// Maximum HIGH-class onsets per beat
    pub high_cap: usize,

    /// What happens to unclassified instruments
    pub unclassified: UnclassifiedPolicy,

    /// Replaces the registry's sound class for specific instruments
    pub class_overrides: BTreeMap<Instrument, SoundClass>,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        SelectorConfig {
            low_cap: 1,
            high_cap: 2,
            unclassified: UnclassifiedPolicy::Drop,
            class_overrides: BTreeMap::new(),
        }
    }
}

impl SelectorConfig {
    /// Effective sound class of an instrument
    pub fn sound_class(&self, instrument: Instrument) -> SoundClass {
        self.class_overrides
            .get(&instrument)
            .copied()
            .unwrap_or_else(|| instrument.sound_class())
    }

    /// Per-beat cap for a class; unclassified instruments are never capped
    pub fn cap(&self, class: SoundClass) -> Option<usize> {
        match class {
            SoundClass::Low => Some(self.low_cap),
            SoundClass::High => Some(self.high_cap),
            SoundClass::Unclassified => None,
        }
    }
}

/// A detected peak competing for a slot in its beat
#[derive(Debug, Clone, Copy)]
struct Candidate {
    instrument: Instrument,
    frame: usize,
    class: SoundClass,

    /// Raw (unnormalized) model activation
    score: f32,
}

/// Beat-synchronous selector
#[derive(Debug, Clone, Default)]
pub struct BeatSelector {
    config: SelectorConfig,
}

impl BeatSelector {
    pub fn new(config: SelectorConfig) -> Self {
        BeatSelector { config }
    }

    pub fn config(&self) -> &SelectorConfig {
        &self.config
    }

    /// Select onsets from detected peaks
    ///
    /// Algorithm:
    /// 1. Group peaks by the exact beat timestamp of their frame
    /// 2. Split each beat's candidates into LOW and HIGH
    /// 3. Rank each class by raw activation, highest first; equal scores keep
    ///    scoring order (earlier registry instrument, then earlier frame)
    /// 4. Keep the top `low_cap` / `high_cap` per beat
    /// 5. Dedup by (instrument, frame) and sort each instrument ascending
    pub fn select(
        &self,
        detected: &OnsetMap,
        matrix: &ActivationMatrix,
        grid: &BeatGrid,
    ) -> Result<OnsetMap, TranscriptionError> {
        grid.ensure_frames(matrix.num_frames())?;
        if let Some(frame) = detected.max_frame() {
            if frame >= grid.len() {
                return Err(TranscriptionError::InvalidInput(format!(
                    "onset frame {} outside beat grid of {} frames",
                    frame,
                    grid.len()
                )));
            }
        }

        let mut selected = OnsetMap::new();
        // Repeated frames in a hand-built map compete only once
        let mut seen: HashSet<(Instrument, usize)> = HashSet::new();

        let mut beats: Vec<Vec<Candidate>> = Vec::new();
        let mut beat_index: HashMap<u64, usize> = HashMap::new();

        for (instrument, frames) in detected.iter() {
            let class = self.config.sound_class(instrument);
            let column = match instrument.column() {
                Some(column) => column,
                None => continue,
            };

            for &frame in frames {
                if !seen.insert((instrument, frame)) {
                    continue;
                }

                if class == SoundClass::Unclassified {
                    if self.config.unclassified == UnclassifiedPolicy::PassThrough {
                        selected.push(instrument, frame);
                    }
                    continue;
                }

                let key = match grid.beat_key(frame) {
                    Some(key) => key,
                    None => continue,
                };
                let score = matrix.value(frame, column).ok_or_else(|| {
                    TranscriptionError::InvalidInput(format!(
                        "{} reads column {} but matrix has {} channels",
                        instrument,
                        column,
                        matrix.num_channels()
                    ))
                })?;
                let slot = *beat_index.entry(key).or_insert_with(|| {
                    beats.push(Vec::new());
                    beats.len() - 1
                });
                beats[slot].push(Candidate {
                    instrument,
                    frame,
                    class,
                    score,
                });
            }
        }

        for candidates in &beats {
            for class in [SoundClass::Low, SoundClass::High] {
                let cap = self.config.cap(class).unwrap_or(usize::MAX);
                for candidate in rank(candidates, class).into_iter().take(cap) {
                    selected.push(candidate.instrument, candidate.frame);
                }
            }
        }

        selected.sort();

        log::debug!(
            "Selected {} of {} onsets across {} beats",
            selected.total(),
            detected.total(),
            beats.len()
        );

        Ok(selected)
    }
}

/// Candidates of one class, strongest first. The sort is stable, so ties keep
/// insertion order.
fn rank(candidates: &[Candidate], class: SoundClass) -> Vec<&Candidate> {
    let mut ranked: Vec<&Candidate> = candidates.iter().filter(|c| c.class == class).collect();
    ranked.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));
    ranked
}

/// Select onsets with the default caps (1 LOW, 2 HIGH per beat)
pub fn select_onsets(
    detected: &OnsetMap,
    matrix: &ActivationMatrix,
    grid: &BeatGrid,
) -> Result<OnsetMap, TranscriptionError> {
    BeatSelector::default().select(detected, matrix, grid)
}
