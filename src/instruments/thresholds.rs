// Detection thresholds
// Per-call z-score height thresholds for each registered instrument

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::registry::{Instrument, INSTRUMENT_COUNT};
use crate::error::TranscriptionError;

/// Threshold applied to instruments without an explicit value
pub const DEFAULT_THRESHOLD: f64 = 0.95;

/// Subtracted from the supplied hi-hat threshold before use
pub const HIHAT_OFFSET: f64 = 0.05;

/// Caller-facing threshold configuration
///
/// Values are in z-score units of the normalized activation curve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThresholdConfig {
    /// Kick threshold
    pub kick: f64,

    /// Snare threshold
    pub snare: f64,

    /// Hi-hat threshold, applied to the closed hat after `HIHAT_OFFSET`
    pub hihat: f64,

    /// Threshold for every other instrument
    pub fallback: f64,

    /// Per-instrument values by name, used verbatim
    pub overrides: BTreeMap<String, f64>,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        ThresholdConfig {
            kick: DEFAULT_THRESHOLD,
            snare: DEFAULT_THRESHOLD,
            hihat: DEFAULT_THRESHOLD,
            fallback: DEFAULT_THRESHOLD,
            overrides: BTreeMap::new(),
        }
    }
}

impl ThresholdConfig {
    /// Create a config from the three named thresholds with the default fallback
    pub fn new(kick: f64, snare: f64, hihat: f64) -> Self {
        ThresholdConfig {
            kick,
            snare,
            hihat,
            ..Default::default()
        }
    }

    /// Set the fallback threshold
    pub fn with_fallback(mut self, fallback: f64) -> Self {
        self.fallback = fallback;
        self
    }

    /// Add a per-instrument override
    pub fn with_override(mut self, instrument: impl Into<String>, threshold: f64) -> Self {
        self.overrides.insert(instrument.into(), threshold);
        self
    }
}

/// Resolved thresholds for every registered instrument
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdSet {
    values: [f64; INSTRUMENT_COUNT],
}

impl ThresholdSet {
    /// Resolve a config, rejecting unknown names and non-finite values
    pub fn from_config(config: &ThresholdConfig) -> Result<Self, TranscriptionError> {
        let named = [
            ("kick", config.kick),
            ("snare", config.snare),
            ("hihat", config.hihat),
            ("fallback", config.fallback),
        ];
        for (name, value) in named {
            check_finite(name, value)?;
        }

        let mut values = [config.fallback; INSTRUMENT_COUNT];
        values[Instrument::Kick as usize] = config.kick;
        values[Instrument::Snare as usize] = config.snare;
        values[Instrument::ClosedHat as usize] = config.hihat - HIHAT_OFFSET;

        for (name, &value) in &config.overrides {
            let instrument: Instrument = name.parse()?;
            check_finite(name, value)?;
            values[instrument as usize] = value;
        }

        Ok(ThresholdSet { values })
    }

    /// Effective threshold for an instrument
    pub fn get(&self, instrument: Instrument) -> f64 {
        self.values[instrument as usize]
    }
}

impl Default for ThresholdSet {
    fn default() -> Self {
        // The default config only holds finite constants
        let mut values = [DEFAULT_THRESHOLD; INSTRUMENT_COUNT];
        values[Instrument::ClosedHat as usize] = DEFAULT_THRESHOLD - HIHAT_OFFSET;
        ThresholdSet { values }
    }
}

fn check_finite(name: &str, value: f64) -> Result<(), TranscriptionError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(TranscriptionError::InvalidConfig(format!(
            "threshold for {} must be finite, got {}",
            name, value
        )))
    }
}
