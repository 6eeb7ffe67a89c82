// Instrument registry
// Closed drum instrument set with model output columns, GM pitches, and sound classes

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::TranscriptionError;

/// General MIDI percussion note numbers
pub const MIDI_KICK: u8 = 36; // C1
pub const MIDI_RIM: u8 = 37; // C#1
pub const MIDI_SNARE: u8 = 38; // D1
pub const MIDI_CLAP: u8 = 39; // D#1
pub const MIDI_CLOSED_HIHAT: u8 = 42; // F#1
pub const MIDI_LOW_TOM: u8 = 45; // A1
pub const MIDI_OPEN_HIHAT: u8 = 46; // A#1

/// Number of registered instruments
pub const INSTRUMENT_COUNT: usize = 7;

/// Number of scored instruments
pub const SCORED_COUNT: usize = 6;

/// Number of activation columns the registry reads from (highest column + 1)
pub const REQUIRED_CHANNELS: usize = 8;

/// Drum instruments known to the transcriber
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Instrument {
    #[serde(alias = "kick")]
    Kick,

    #[serde(alias = "snare")]
    Snare,

    #[serde(rename = "Closed_Hat", alias = "closed_hat", alias = "ClosedHat")]
    ClosedHat,

    #[serde(rename = "Open_Hat", alias = "open_hat", alias = "OpenHat")]
    OpenHat,

    #[serde(rename = "Low_Tom", alias = "low_tom", alias = "LowTom")]
    LowTom,

    #[serde(alias = "rim")]
    Rim,

    /// Registered for threshold lookup only; the model has no clap output
    #[serde(alias = "clap")]
    Clap,
}

/// Sound class used to cap simultaneous hits per beat
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SoundClass {
    /// Kick and tom - at most one per beat by default
    Low,

    /// Snare, hats, and rim - at most two per beat by default
    High,

    /// Not part of beat capping
    Unclassified,
}

impl Instrument {
    /// Every registered instrument
    pub const ALL: [Instrument; INSTRUMENT_COUNT] = [
        Instrument::Kick,
        Instrument::Snare,
        Instrument::ClosedHat,
        Instrument::OpenHat,
        Instrument::LowTom,
        Instrument::Rim,
        Instrument::Clap,
    ];

    /// Instruments with an activation column, in scoring order.
    /// This order is also the tie-break order during selection.
    pub const SCORED: [Instrument; SCORED_COUNT] = [
        Instrument::Kick,
        Instrument::Snare,
        Instrument::ClosedHat,
        Instrument::OpenHat,
        Instrument::LowTom,
        Instrument::Rim,
    ];

    /// Column of this instrument in the activation matrix
    pub fn column(&self) -> Option<usize> {
        match self {
            Instrument::Kick => Some(0),
            Instrument::Snare => Some(1),
            Instrument::Rim => Some(2),
            Instrument::ClosedHat => Some(4),
            Instrument::OpenHat => Some(6),
            Instrument::LowTom => Some(7),
            Instrument::Clap => None,
        }
    }

    /// Position in `SCORED`, `None` for unscored instruments
    pub fn scored_index(&self) -> Option<usize> {
        match self {
            Instrument::Kick => Some(0),
            Instrument::Snare => Some(1),
            Instrument::ClosedHat => Some(2),
            Instrument::OpenHat => Some(3),
            Instrument::LowTom => Some(4),
            Instrument::Rim => Some(5),
            Instrument::Clap => None,
        }
    }

    /// GM percussion pitch
    pub fn midi_pitch(&self) -> u8 {
        match self {
            Instrument::Kick => MIDI_KICK,
            Instrument::Snare => MIDI_SNARE,
            Instrument::ClosedHat => MIDI_CLOSED_HIHAT,
            Instrument::OpenHat => MIDI_OPEN_HIHAT,
            Instrument::LowTom => MIDI_LOW_TOM,
            Instrument::Rim => MIDI_RIM,
            Instrument::Clap => MIDI_CLAP,
        }
    }

    /// Default sound class
    pub fn sound_class(&self) -> SoundClass {
        match self {
            Instrument::Kick | Instrument::LowTom => SoundClass::Low,
            Instrument::Snare | Instrument::ClosedHat | Instrument::OpenHat | Instrument::Rim => {
                SoundClass::High
            }
            Instrument::Clap => SoundClass::Unclassified,
        }
    }

    /// Canonical name as used by the transcription model
    pub fn name(&self) -> &'static str {
        match self {
            Instrument::Kick => "Kick",
            Instrument::Snare => "Snare",
            Instrument::ClosedHat => "Closed_Hat",
            Instrument::OpenHat => "Open_Hat",
            Instrument::LowTom => "Low_Tom",
            Instrument::Rim => "Rim",
            Instrument::Clap => "Clap",
        }
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Instrument {
    type Err = TranscriptionError;

    /// Accepts canonical, snake_case, and PascalCase spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Kick" | "kick" => Ok(Instrument::Kick),
            "Snare" | "snare" => Ok(Instrument::Snare),
            "Closed_Hat" | "closed_hat" | "ClosedHat" => Ok(Instrument::ClosedHat),
            "Open_Hat" | "open_hat" | "OpenHat" => Ok(Instrument::OpenHat),
            "Low_Tom" | "low_tom" | "LowTom" => Ok(Instrument::LowTom),
            "Rim" | "rim" => Ok(Instrument::Rim),
            "Clap" | "clap" => Ok(Instrument::Clap),
            other => Err(TranscriptionError::UnknownInstrument(other.to_string())),
        }
    }
}
