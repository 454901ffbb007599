//! Event Logger - persists events to a JSONL file
//!
//! The EventLogger is an ordinary bus handler: subscribe it to every event
//! type worth keeping and each event is appended as one JSON line.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::bus::{EventBus, EventHandler, SubscriptionId};
use super::types::{Event, EventType};

/// Handler appending events to a JSONL file
pub struct EventLogger {
    path: PathBuf,
    writer: Mutex<BufWriter<File>>,
}

impl EventLogger {
    /// Open (or create) the log file in append mode
    pub fn open(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref().to_path_buf();
        debug!(?path, "EventLogger::open: called");
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            writer: Mutex::new(BufWriter::new(file)),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write one event as a JSON line
    pub fn write_event(&self, event: &Event) -> eyre::Result<()> {
        let json = serde_json::to_string(event)?;
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(writer, "{}", json)?;
        writer.flush()?;
        Ok(())
    }

    /// Subscribe one shared logger to each of the given event types
    pub fn attach(self: Arc<Self>, bus: &EventBus, event_types: &[EventType]) -> Vec<SubscriptionId> {
        event_types
            .iter()
            .map(|event_type| bus.subscribe(event_type.clone(), Arc::clone(&self) as Arc<dyn EventHandler>))
            .collect()
    }
}

#[async_trait]
impl EventHandler for EventLogger {
    fn name(&self) -> &str {
        "event_logger"
    }

    async fn handle(&self, event: &Event) -> eyre::Result<()> {
        self.write_event(event)
    }
}

/// Read events back from a JSONL log, skipping unparseable lines
pub fn read_events(path: impl AsRef<Path>) -> eyre::Result<Vec<Event>> {
    let path = path.as_ref();
    debug!(?path, "read_events: reading log file");

    if !path.exists() {
        return Ok(Vec::new());
    }

    let content = fs::read_to_string(path)?;
    let mut events = Vec::new();

    for line in content.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Event>(line) {
            Ok(event) => events.push(event),
            Err(e) => {
                warn!(line, error = %e, "read_events: failed to parse line");
            }
        }
    }

    debug!(count = events.len(), "read_events: loaded events");
    Ok(events)
}
