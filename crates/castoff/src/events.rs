//! Append-only JSONL event log for publish runs.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::types::{ChannelEvent, EventKind};

/// Default events file name.
pub const EVENTS_FILE: &str = "events.jsonl";

/// Events file path for a state directory.
pub fn events_path(state_dir: &Path) -> PathBuf {
    state_dir.join(EVENTS_FILE)
}

/// In-memory event buffer, flushed to JSONL.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Vec<ChannelEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: EventKind) {
        self.events.push(ChannelEvent::now(kind));
    }

    pub fn events(&self) -> &[ChannelEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Append all buffered events to `path`, one JSON document per line.
    pub fn write_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create events dir {}", parent.display()))?;
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open events file {}", path.display()))?;

        let mut writer = std::io::BufWriter::new(file);
        for event in &self.events {
            let line = serde_json::to_string(event).context("failed to serialize event")?;
            writeln!(writer, "{line}").context("failed to write event line")?;
        }
        writer.flush().context("failed to flush events file")?;

        Ok(())
    }

    /// Read a previously written log. A missing file is an empty log.
    pub fn read_from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let file = File::open(path)
            .with_context(|| format!("failed to open events file {}", path.display()))?;
        let reader = BufReader::new(file);

        let mut events = Vec::new();
        for line in reader.lines() {
            let line = line.context("failed to read event line")?;
            if line.trim().is_empty() {
                continue;
            }
            let event: ChannelEvent = serde_json::from_str(&line)
                .with_context(|| format!("failed to parse event line: {line}"))?;
            events.push(event);
        }

        Ok(Self { events })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use crate::types::{PublishDecision, PublishTarget};

    use super::*;

    #[test]
    fn events_append_and_read_back() {
        let dir = tempdir().expect("tempdir");
        let path = events_path(dir.path());

        let mut log = EventLog::new();
        log.record(EventKind::RunStarted {
            decision: PublishDecision::from_targets([PublishTarget::SnapshotRepository]),
        });
        log.record(EventKind::TargetStarted {
            target: PublishTarget::SnapshotRepository,
        });
        log.write_to_file(&path).expect("write");

        // A second run appends rather than truncating.
        let mut second = EventLog::new();
        second.record(EventKind::RunCompleted { succeeded: true });
        second.write_to_file(&path).expect("append");

        let read = EventLog::read_from_file(&path).expect("read");
        assert_eq!(read.len(), 3);
        assert!(matches!(
            read.events()[2].kind,
            EventKind::RunCompleted { succeeded: true }
        ));
    }

    #[test]
    fn missing_file_reads_as_empty_log() {
        let dir = tempdir().expect("tempdir");
        let log = EventLog::read_from_file(&events_path(dir.path())).expect("read");
        assert!(log.is_empty());
    }
}
