// Arranger - Note encoding and MIDI export
// Converts selected onsets into percussion notes and drum-kit MIDI files

pub mod midi;
pub mod notes;

// Re-export main types
pub use midi::{export_midi, MidiExportError, MidiExportOptions};
pub use notes::{encode_notes, NoteEncoding, NoteEvent};
