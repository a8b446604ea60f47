//! Contracts for the external systems the engine talks to.
//!
//! Transport, calendar storage, language-model extraction and delivery all
//! live outside the engine. Each collaborator reports failures as
//! [`CollaboratorError`] so the engine can tell a retryable outage from a
//! single bad record.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::calendar::{NewEvent, RawEvent};
use crate::decision::Intent;
use crate::error::EngineError;
use crate::slots::MeetingCategory;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CollaboratorError {
    /// The call failed; retrying on a later cycle may succeed.
    #[error("transient: {0}")]
    Transient(String),

    /// The call succeeded but returned something unusable.
    #[error("malformed: {0}")]
    Malformed(String),
}

pub type CollabResult<T> = std::result::Result<T, CollaboratorError>;

impl CollaboratorError {
    /// Attach the collaborator name for engine-level reporting.
    pub fn into_engine(self, collaborator: &'static str) -> EngineError {
        match self {
            CollaboratorError::Transient(message) => EngineError::Transient {
                collaborator,
                message,
            },
            CollaboratorError::Malformed(message) => {
                EngineError::Malformed(format!("{}: {}", collaborator, message))
            }
        }
    }
}

/// An unread inbound message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InboundMessage {
    pub id: String,
    /// Sender as presented by the transport, e.g. `Ada <ada@example.com>`.
    pub sender: String,
    pub body: String,
}

impl InboundMessage {
    /// The bare address used to identify the counterpart.
    pub fn counterpart(&self) -> &str {
        counterpart_address(&self.sender)
    }
}

/// Reduce `Name <addr>` to `addr`; other forms are returned trimmed.
pub fn counterpart_address(sender: &str) -> &str {
    let sender = sender.trim();
    match (sender.rfind('<'), sender.rfind('>')) {
        (Some(open), Some(close)) if open < close => sender[open + 1..close].trim(),
        _ => sender,
    }
}

/// What the extraction collaborator understood from a message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extraction {
    pub intent: Intent,
    /// Natural-language time phrase, parsed by the engine itself.
    #[serde(default)]
    pub time_phrase: Option<String>,
    #[serde(default)]
    pub duration_minutes: Option<u32>,
    #[serde(default)]
    pub category: Option<MeetingCategory>,
}

pub trait MessageSource {
    fn unread(&mut self, limit: usize) -> CollabResult<Vec<InboundMessage>>;
    fn mark_processed(&mut self, id: &str) -> CollabResult<()>;
    fn discard(&mut self, id: &str) -> CollabResult<()>;
}

pub trait CalendarStore {
    fn list_events(&mut self, from: DateTime<Utc>, to: DateTime<Utc>) -> CollabResult<Vec<RawEvent>>;
    /// Returns the id of the created item.
    fn insert(&mut self, event: NewEvent) -> CollabResult<String>;
    fn delete(&mut self, id: &str) -> CollabResult<()>;
}

pub trait RequestExtractor {
    fn extract(&self, body: &str, now: DateTime<Utc>) -> CollabResult<Extraction>;
}

pub trait Notifier {
    fn send(&mut self, counterpart: &str, subject: &str, body: &str) -> CollabResult<()>;
}
