//! Playing back a recorded build.
//!
//! A recording is a JSON-lines file, one [`RecordedEvent`] per line:
//!
//! ```text
//! {"delay_ms": 0, "event": {"event": "build_started"}}
//! {"delay_ms": 15, "event": {"event": "project_started", "context": {...}, "project_file": "app.proj"}}
//! ```
//!
//! [`Replay`] is an [`EventSource`] that hands those events to its
//! subscribers in order, sleeping for each event's delay first.

use std::io::BufRead;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ReplayError;
use crate::logger::{BuildEvent, EventHandler, EventSource};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedEvent {
    /// Pause before the event is delivered.
    #[serde(default)]
    pub delay_ms: u64,
    pub event: BuildEvent,
}

#[derive(Debug, Clone, Default)]
pub struct Recording {
    events: Vec<RecordedEvent>,
}

impl Recording {
    /// Parses JSON lines, skipping blank ones.
    pub fn from_reader(reader: impl BufRead) -> Result<Self, ReplayError> {
        let mut events = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let event = serde_json::from_str(&line).map_err(|source| ReplayError::Parse {
                line: index + 1,
                source,
            })?;
            events.push(event);
        }

        Ok(Self { events })
    }

    pub fn events(&self) -> &[RecordedEvent] {
        &self.events
    }

    /// The highest node id any event mentions, which is how many nodes the
    /// recorded build ran with.
    pub fn node_count(&self) -> usize {
        self.events
            .iter()
            .filter_map(|recorded| recorded.event.context())
            .filter_map(|context| usize::try_from(context.node_id).ok())
            .max()
            .unwrap_or(0)
    }
}

#[derive(Default)]
pub struct Replay {
    handlers: Vec<EventHandler>,
}

impl Replay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers one event to every subscriber on the calling thread.
    pub fn dispatch(&self, event: &BuildEvent) {
        for handler in &self.handlers {
            handler(event);
        }
    }

    pub fn play(&self, recording: &Recording) {
        tracing::debug!(events = recording.events.len(), "replaying build");

        for recorded in &recording.events {
            if recorded.delay_ms > 0 {
                thread::sleep(Duration::from_millis(recorded.delay_ms));
            }
            self.dispatch(&recorded.event);
        }
    }
}

impl EventSource for Replay {
    fn subscribe(&mut self, handler: EventHandler) {
        self.handlers.push(handler);
    }
}
