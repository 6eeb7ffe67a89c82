// Pipeline progress tracing
// In-memory stage log, rendered as JSON lines for callers that persist it

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur during trace operations
#[derive(Debug, Error)]
pub enum TraceError {
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Where entry timestamps come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TraceClock {
    /// Current wall-clock time
    #[default]
    Wall,

    /// Every entry gets the same instant, so repeated calls produce equal traces
    Fixed(DateTime<Utc>),
}

impl TraceClock {
    pub fn now(&self) -> DateTime<Utc> {
        match self {
            TraceClock::Wall => Utc::now(),
            TraceClock::Fixed(at) => *at,
        }
    }
}

/// A single trace entry in the pipeline execution log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEntry {
    /// RFC 3339 on the wire
    pub timestamp: DateTime<Utc>,

    /// Pipeline stage name (e.g., "validation", "peak_detection", "selection")
    pub stage: String,

    /// Stage progress in [0.0, 1.0]
    pub progress: f32,

    pub message: String,

    /// Optional structured data (e.g., per-instrument onset counts)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl TraceEntry {
    pub fn to_json_line(&self) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(self)?;
        Ok(format!("{}\n", json))
    }
}

/// Ordered trace of one transcription call
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Trace {
    #[serde(skip)]
    clock: TraceClock,

    entries: Vec<TraceEntry>,
}

impl Trace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_clock(clock: TraceClock) -> Self {
        Trace {
            clock,
            entries: Vec::new(),
        }
    }

    /// Append an entry stamped by the trace clock
    pub fn record(
        &mut self,
        stage: impl Into<String>,
        progress: f32,
        message: impl Into<String>,
        data: Option<serde_json::Value>,
    ) {
        self.entries.push(TraceEntry {
            timestamp: self.clock.now(),
            stage: stage.into(),
            progress: progress.clamp(0.0, 1.0),
            message: message.into(),
            data,
        });
    }

    pub fn start(&mut self, stage: impl Into<String>, message: impl Into<String>) {
        self.record(stage, 0.0, message, None);
    }

    pub fn complete(&mut self, stage: impl Into<String>, message: impl Into<String>) {
        self.record(stage, 1.0, message, None);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    /// Entries for one stage, in order
    pub fn stage<'a>(&'a self, stage: &'a str) -> impl Iterator<Item = &'a TraceEntry> + 'a {
        self.entries.iter().filter(move |e| e.stage == stage)
    }

    /// Render every entry as one JSON object per line
    pub fn to_jsonl(&self) -> Result<String, TraceError> {
        let mut out = String::new();
        for entry in &self.entries {
            out.push_str(&entry.to_json_line()?);
        }
        Ok(out)
    }

    /// Parse JSON lines, skipping blank lines
    pub fn from_jsonl(contents: &str) -> Result<Self, TraceError> {
        let mut entries = Vec::new();

        for line in contents.lines() {
            if line.trim().is_empty() {
                continue;
            }

            let entry: TraceEntry = serde_json::from_str(line)?;
            entries.push(entry);
        }

        Ok(Trace {
            clock: TraceClock::default(),
            entries,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed() -> TraceClock {
        TraceClock::Fixed(Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap())
    }

    #[test]
    fn test_fixed_clock_stamps_every_entry() {
        let mut trace = Trace::with_clock(fixed());
        trace.start("validation", "Checking inputs");
        trace.complete("encoding", "Encoded 4 notes");

        assert!(trace.entries().iter().all(|e| e.timestamp == fixed().now()));
        assert_eq!(trace.entries()[0].progress, 0.0);
        assert_eq!(trace.entries()[1].progress, 1.0);
    }

    #[test]
    fn test_progress_clamped() {
        let mut trace = Trace::with_clock(fixed());
        trace.record("selection", 1.5, "over", None);
        trace.record("selection", -0.5, "under", None);

        let progress: Vec<f32> = trace.stage("selection").map(|e| e.progress).collect();
        assert_eq!(progress, vec![1.0, 0.0]);
    }

    #[test]
    fn test_jsonl_round_trip() {
        let mut trace = Trace::with_clock(fixed());
        trace.start("validation", "Checking inputs");
        trace.complete("validation", "Inputs ok");
        trace.record(
            "selection",
            1.0,
            "Selected",
            Some(serde_json::json!({"total": 3})),
        );

        let jsonl = trace.to_jsonl().unwrap();
        assert_eq!(jsonl.lines().count(), 3);
        assert!(jsonl.ends_with('\n'));
        assert!(jsonl.contains("2024-03-01T12:00:00"));

        let parsed = Trace::from_jsonl(&format!("{}\n\n", jsonl)).unwrap();
        assert_eq!(parsed.entries(), trace.entries());
        assert_eq!(parsed.stage("validation").count(), 2);
        assert_eq!(parsed.entries()[2].data.as_ref().unwrap()["total"], 3);
    }

    #[test]
    fn test_malformed_jsonl() {
        assert!(matches!(
            Trace::from_jsonl("{not json}"),
            Err(TraceError::SerializationError(_))
        ));
    }
}
