// Onset map
// Fixed-size instrument -> frame index lists, one slot per scored instrument

use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::instruments::{Instrument, SCORED_COUNT};

/// Per-instrument onset frame indices
///
/// Every scored instrument always has a slot, so the output shape does not
/// depend on whether anything was detected. Unscored instruments have no slot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OnsetMap {
    slots: [Vec<usize>; SCORED_COUNT],
}

impl OnsetMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frames for an instrument; empty for unscored instruments
    pub fn get(&self, instrument: Instrument) -> &[usize] {
        match instrument.scored_index() {
            Some(i) => &self.slots[i],
            None => &[],
        }
    }

    /// Replace an instrument's frames, stored ascending without repeats.
    /// Unscored instruments are ignored.
    pub fn set(&mut self, instrument: Instrument, mut frames: Vec<usize>) {
        if let Some(i) = instrument.scored_index() {
            frames.sort_unstable();
            frames.dedup();
            self.slots[i] = frames;
        }
    }

    /// Append a frame. Returns false for unscored instruments.
    pub fn push(&mut self, instrument: Instrument, frame: usize) -> bool {
        match instrument.scored_index() {
            Some(i) => {
                self.slots[i].push(frame);
                true
            }
            None => false,
        }
    }

    /// Sort every slot ascending and drop repeated frames
    pub fn sort(&mut self) {
        for slot in self.slots.iter_mut() {
            slot.sort_unstable();
            slot.dedup();
        }
    }

    /// (instrument, frames) pairs in scoring order
    pub fn iter(&self) -> impl Iterator<Item = (Instrument, &[usize])> + '_ {
        Instrument::SCORED
            .iter()
            .zip(self.slots.iter())
            .map(|(instrument, frames)| (*instrument, frames.as_slice()))
    }

    /// Total number of onsets across instruments
    pub fn total(&self) -> usize {
        self.slots.iter().map(|s| s.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    /// Largest frame index present, if any
    pub fn max_frame(&self) -> Option<usize> {
        self.slots.iter().flat_map(|s| s.iter().copied()).max()
    }

    /// Per-instrument counts keyed by canonical name
    pub fn counts(&self) -> serde_json::Value {
        let counts: serde_json::Map<String, serde_json::Value> = self
            .iter()
            .map(|(instrument, frames)| (instrument.name().to_string(), frames.len().into()))
            .collect();
        serde_json::Value::Object(counts)
    }
}

impl Serialize for OnsetMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(SCORED_COUNT))?;
        for (instrument, frames) in self.iter() {
            map.serialize_entry(instrument.name(), frames)?;
        }
        map.end()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_map_has_every_scored_instrument() {
        let map = OnsetMap::new();
        let instruments: Vec<Instrument> = map.iter().map(|(i, _)| i).collect();
        assert_eq!(instruments, Instrument::SCORED.to_vec());
        assert!(map.is_empty());
    }

    #[test]
    fn test_clap_has_no_slot() {
        let mut map = OnsetMap::new();
        assert!(!map.push(Instrument::Clap, 3));
        map.set(Instrument::Clap, vec![1, 2]);
        assert!(map.get(Instrument::Clap).is_empty());
        assert!(map.is_empty());
    }

    #[test]
    fn test_push_and_sort() {
        let mut map = OnsetMap::new();
        map.push(Instrument::Snare, 9);
        map.push(Instrument::Snare, 2);
        map.push(Instrument::Kick, 4);
        map.sort();

        assert_eq!(map.get(Instrument::Snare), &[2, 9]);
        assert_eq!(map.get(Instrument::Kick), &[4]);
        assert_eq!(map.total(), 3);
        assert_eq!(map.max_frame(), Some(9));
    }

    #[test]
    fn test_set_sorts_and_drops_repeats() {
        let mut map = OnsetMap::new();
        map.set(Instrument::Snare, vec![7, 1, 1, 3, 7]);
        assert_eq!(map.get(Instrument::Snare), &[1, 3, 7]);

        map.push(Instrument::Snare, 3);
        map.sort();
        assert_eq!(map.get(Instrument::Snare), &[1, 3, 7]);
    }

    #[test]
    fn test_serialize_keeps_empty_keys() {
        let mut map = OnsetMap::new();
        map.set(Instrument::Rim, vec![1, 5]);

        let json = serde_json::to_value(&map).unwrap();
        assert_eq!(json["Rim"], serde_json::json!([1, 5]));
        assert_eq!(json["Kick"], serde_json::json!([]));
        assert!(json.get("Clap").is_none());
        assert_eq!(json.as_object().unwrap().len(), 6);
    }

    #[test]
    fn test_counts() {
        let mut map = OnsetMap::new();
        map.set(Instrument::ClosedHat, vec![0, 2, 4]);
        let counts = map.counts();
        assert_eq!(counts["Closed_Hat"], 3);
        assert_eq!(counts["Kick"], 0);
    }
}
