// MIDI Export - Convert note events to a Standard MIDI File using midly crate
// One drum track on channel 10 plus a tempo/meta track

use midly::{Header, MetaMessage, MidiMessage, Smf, Timing, Track, TrackEvent, TrackEventKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::notes::NoteEvent;

/// Channel 10 (0-indexed = 9) is drums
const DRUM_CHANNEL: u8 = 9;

const DRUM_TRACK_NAME: &str = "Drum Set";

/// Errors that can occur during MIDI export
#[derive(Debug, Error)]
pub enum MidiExportError {
    #[error("Invalid export options: {0}")]
    InvalidOptions(String),

    #[error("Failed to write MIDI: {0}")]
    Write(String),
}

/// MIDI export options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MidiExportOptions {
    /// Pulses per quarter note (PPQ) - typically 480 or 960
    pub ppq: u16,

    /// Tempo used to convert seconds to ticks
    pub bpm: f64,

    /// Include tempo metadata
    pub include_tempo: bool,

    /// Include 4/4 time signature metadata
    pub include_time_signature: bool,

    /// Include track names
    pub track_names: bool,
}

impl Default for MidiExportOptions {
    fn default() -> Self {
        MidiExportOptions {
            ppq: 480,
            bpm: 120.0,
            include_tempo: true,
            include_time_signature: true,
            track_names: true,
        }
    }
}

impl MidiExportOptions {
    fn validate(&self) -> Result<(), MidiExportError> {
        // Metrical timing holds 15 bits
        if self.ppq == 0 || self.ppq >= 0x8000 {
            return Err(MidiExportError::InvalidOptions(format!(
                "ppq must be in 1..32768, got {}",
                self.ppq
            )));
        }
        if !self.bpm.is_finite() || self.bpm <= 0.0 {
            return Err(MidiExportError::InvalidOptions(format!(
                "bpm must be positive, got {}",
                self.bpm
            )));
        }
        Ok(())
    }

    fn ticks_per_second(&self) -> f64 {
        self.ppq as f64 * self.bpm / 60.0
    }
}

/// Export notes to MIDI file bytes
///
/// Returns a format-1 file: track 0 carries tempo and time signature, track 1
/// carries every note on the drum channel.
pub fn export_midi(
    notes: &[NoteEvent],
    options: &MidiExportOptions,
) -> Result<Vec<u8>, MidiExportError> {
    options.validate()?;

    let header = Header {
        format: midly::Format::Parallel,
        timing: Timing::Metrical(options.ppq.into()),
    };

    let mut meta_track = Track::new();
    if options.track_names {
        add_track_name(&mut meta_track, 0, "META");
    }
    if options.include_tempo {
        add_tempo(&mut meta_track, 0, options.bpm);
    }
    if options.include_time_signature {
        add_time_signature(&mut meta_track, 0);
    }
    add_end_of_track(&mut meta_track, 0);

    let drum_track = create_drum_track(notes, options);

    let smf = Smf {
        header,
        tracks: vec![meta_track, drum_track],
    };

    let mut bytes = Vec::new();
    smf.write(&mut bytes)
        .map_err(|e| MidiExportError::Write(e.to_string()))?;

    log::debug!("Exported {} notes as {} MIDI bytes", notes.len(), bytes.len());
    Ok(bytes)
}

/// Build the drum track with note on/off pairs in time order
fn create_drum_track<'a>(notes: &[NoteEvent], options: &MidiExportOptions) -> Track<'a> {
    let ticks_per_second = options.ticks_per_second();

    // (tick, note-off first, event)
    let mut events: Vec<(u32, u8, TrackEventKind<'a>)> = Vec::with_capacity(notes.len() * 2 + 1);

    if options.track_names {
        events.push((
            0,
            0,
            TrackEventKind::Meta(MetaMessage::TrackName(DRUM_TRACK_NAME.as_bytes())),
        ));
    }

    for note in notes {
        let tick_on = seconds_to_ticks(note.onset_s, ticks_per_second);
        let tick_off = seconds_to_ticks(note.end_s(), ticks_per_second).max(tick_on + 1);

        events.push((
            tick_on,
            2,
            TrackEventKind::Midi {
                channel: DRUM_CHANNEL.into(),
                message: MidiMessage::NoteOn {
                    key: note.pitch.into(),
                    vel: note.velocity.into(),
                },
            },
        ));

        events.push((
            tick_off,
            1,
            TrackEventKind::Midi {
                channel: DRUM_CHANNEL.into(),
                message: MidiMessage::NoteOff {
                    key: note.pitch.into(),
                    vel: 0.into(),
                },
            },
        ));
    }

    // Stable, so simultaneous notes keep their input order
    events.sort_by_key(|(tick, order, _)| (*tick, *order));

    // Convert to delta times
    let mut track = Track::new();
    let mut last_tick = 0;
    for (tick, _, kind) in events {
        track.push(TrackEvent {
            delta: tick.saturating_sub(last_tick).into(),
            kind,
        });
        last_tick = tick;
    }

    add_end_of_track(&mut track, 0);
    track
}

fn seconds_to_ticks(seconds: f64, ticks_per_second: f64) -> u32 {
    // Delta times are 28-bit
    (seconds.max(0.0) * ticks_per_second)
        .round()
        .min(0x0FFF_FFFF as f64) as u32
}

fn add_track_name<'a>(track: &mut Track<'a>, delta: u32, name: &'a str) {
    track.push(TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Meta(MetaMessage::TrackName(name.as_bytes())),
    });
}

/// Add tempo meta message (microseconds per quarter note)
fn add_tempo(track: &mut Track<'_>, delta: u32, bpm: f64) {
    let us_per_quarter = ((60_000_000.0 / bpm).round() as u32).min(0x00FF_FFFF);

    track.push(TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Meta(MetaMessage::Tempo(us_per_quarter.into())),
    });
}

/// Add 4/4 time signature meta message
fn add_time_signature(track: &mut Track<'_>, delta: u32) {
    let numerator = 4u8;
    let denominator = 2u8; // 2^2 = 4 (quarter note)

    // MIDI clocks per metronome click (24 for quarter note)
    let clocks_per_click = 24u8;

    // 32nd notes per quarter note (8)
    let thirty_seconds_per_quarter = 8u8;

    track.push(TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Meta(MetaMessage::TimeSignature(
            numerator,
            denominator,
            clocks_per_click,
            thirty_seconds_per_quarter,
        )),
    });
}

fn add_end_of_track(track: &mut Track<'_>, delta: u32) {
    track.push(TrackEvent {
        delta: delta.into(),
        kind: TrackEventKind::Meta(MetaMessage::EndOfTrack),
    });
}
