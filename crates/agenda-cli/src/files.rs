//! File-backed collaborators for running the engine without external services.
//!
//! - calendar: a JSON array of feed records, re-read on every listing so hand
//!   edits (deleting a meeting) are picked up by the next cycle
//! - inbox: a JSON array of messages, each with a `state` of `unread`,
//!   `processed` or `discarded`
//! - outbox: JSON lines, one object per notification

use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use agenda_engine::collaborators::CollabResult;
use agenda_engine::{
    Attendee, CalendarStore, CollaboratorError, EventTime, InboundMessage, MessageSource, NewEvent,
    Notifier, RawEvent,
};
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

fn read_json<T: DeserializeOwned>(path: &Path) -> CollabResult<Option<T>> {
    let data = match fs::read_to_string(path) {
        Ok(data) => data,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(CollaboratorError::Transient(format!(
                "cannot read {}: {}",
                path.display(),
                e
            )))
        }
    };
    serde_json::from_str(&data)
        .map(Some)
        .map_err(|e| CollaboratorError::Malformed(format!("{}: {}", path.display(), e)))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> CollabResult<()> {
    let json = serde_json::to_string_pretty(value)
        .map_err(|e| CollaboratorError::Malformed(e.to_string()))?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json)
        .and_then(|_| fs::rename(&tmp, path))
        .map_err(|e| CollaboratorError::Transient(format!("cannot write {}: {}", path.display(), e)))
}

// ── Calendar ────────────────────────────────────────────────────────────────

pub struct FileCalendar {
    path: PathBuf,
}

impl FileCalendar {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// All records in the file. A missing file is an outage, not an empty calendar.
    pub fn events(&self) -> CollabResult<Vec<RawEvent>> {
        read_json(&self.path)?.ok_or_else(|| {
            CollaboratorError::Transient(format!("calendar {} not found", self.path.display()))
        })
    }
}

impl CalendarStore for FileCalendar {
    fn list_events(&mut self, _from: DateTime<Utc>, _to: DateTime<Utc>) -> CollabResult<Vec<RawEvent>> {
        // The engine filters to its horizon.
        self.events()
    }

    fn insert(&mut self, event: NewEvent) -> CollabResult<String> {
        let mut events = self.events()?;
        let id = next_id(&events);
        events.push(RawEvent {
            id: id.clone(),
            summary: Some(event.summary),
            start: EventTime::at(event.start),
            end: EventTime::at(event.end),
            transparency: None,
            attendees: event
                .attendees
                .into_iter()
                .map(|email| Attendee {
                    email,
                    is_self: false,
                })
                .collect(),
        });
        write_json(&self.path, &events)?;
        Ok(id)
    }

    fn delete(&mut self, id: &str) -> CollabResult<()> {
        let mut events = self.events()?;
        events.retain(|event| event.id != id);
        write_json(&self.path, &events)
    }
}

fn next_id(events: &[RawEvent]) -> String {
    let highest = events
        .iter()
        .filter_map(|event| event.id.strip_prefix("agenda-")?.parse::<u64>().ok())
        .max()
        .unwrap_or(0);
    format!("agenda-{}", highest + 1)
}

// ── Inbox ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageState {
    #[default]
    Unread,
    Processed,
    Discarded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboxEntry {
    #[serde(flatten)]
    pub message: InboundMessage,
    #[serde(default)]
    pub state: MessageState,
}

pub struct FileInbox {
    path: PathBuf,
}

impl FileInbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn entries(&self) -> CollabResult<Vec<InboxEntry>> {
        Ok(read_json(&self.path)?.unwrap_or_default())
    }

    fn set_state(&mut self, id: &str, state: MessageState) -> CollabResult<()> {
        let mut entries = self.entries()?;
        let entry = entries
            .iter_mut()
            .find(|entry| entry.message.id == id)
            .ok_or_else(|| CollaboratorError::Malformed(format!("no message {}", id)))?;
        entry.state = state;
        write_json(&self.path, &entries)
    }
}

impl MessageSource for FileInbox {
    fn unread(&mut self, limit: usize) -> CollabResult<Vec<InboundMessage>> {
        Ok(self
            .entries()?
            .into_iter()
            .filter(|entry| entry.state == MessageState::Unread)
            .take(limit)
            .map(|entry| entry.message)
            .collect())
    }

    fn mark_processed(&mut self, id: &str) -> CollabResult<()> {
        self.set_state(id, MessageState::Processed)
    }

    fn discard(&mut self, id: &str) -> CollabResult<()> {
        self.set_state(id, MessageState::Discarded)
    }
}

// ── Outbox ──────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct Outgoing<'a> {
    to: &'a str,
    subject: &'a str,
    body: &'a str,
}

pub struct JsonLinesOutbox {
    path: PathBuf,
}

impl JsonLinesOutbox {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Notifier for JsonLinesOutbox {
    fn send(&mut self, counterpart: &str, subject: &str, body: &str) -> CollabResult<()> {
        let line = serde_json::to_string(&Outgoing {
            to: counterpart,
            subject,
            body,
        })
        .map_err(|e| CollaboratorError::Malformed(e.to_string()))?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| CollaboratorError::Transient(e.to_string()))?;
        writeln!(file, "{}", line).map_err(|e| CollaboratorError::Transient(e.to_string()))
    }
}
