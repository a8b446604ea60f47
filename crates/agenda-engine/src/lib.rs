//! # agenda-engine
//!
//! Availability and reconciliation engine for a personal scheduling assistant.
//!
//! The engine decides how to answer meeting requests against a calendar and
//! notices when a human deletes a meeting it is tracking. Message transport,
//! language-model extraction, calendar storage and delivery stay behind the
//! traits in [`collaborators`].
//!
//! ## Modules
//!
//! - [`interval`] — Busy intervals and the half-open overlap test
//! - [`calendar`] — Raw calendar feed records and timestamp parsing
//! - [`availability`] — Per-cycle index of busy intervals, `is_free`
//! - [`slots`] — Alternative slot search inside category windows
//! - [`reconcile`] — Snapshot diffing to detect vanished meetings
//! - [`decision`] — Intent + availability → typed [`Action`]
//! - [`timephrase`] — Natural-language time phrase → instant
//! - [`dst`] — DST policies for local wall-clock times
//! - [`reply`] — Notification subjects and bodies
//! - [`engine`] — Poll cycle and loop
//! - [`config`] — Engine configuration
//! - [`error`] — Error types

pub mod availability;
pub mod calendar;
pub mod collaborators;
pub mod config;
pub mod decision;
pub mod dst;
pub mod engine;
pub mod error;
pub mod interval;
pub mod reconcile;
pub mod reply;
pub mod slots;
pub mod timephrase;

pub use availability::{AvailabilityIndex, Horizon};
pub use calendar::{Attendee, EventTime, NewEvent, RawEvent};
pub use collaborators::{
    CalendarStore, CollaboratorError, Extraction, InboundMessage, MessageSource, Notifier,
    RequestExtractor,
};
pub use config::EngineConfig;
pub use decision::{choose_action, Action, AvailabilityStatus, Intent, MeetingRequest, Orchestrator};
pub use dst::DstPolicy;
pub use engine::{CycleReport, Engine};
pub use error::EngineError;
pub use interval::{overlaps, BusyInterval};
pub use reconcile::{reconcile, JsonFileSnapshotStore, Snapshot, SnapshotStore, TrackedItem};
pub use slots::{find_slots, MeetingCategory};
pub use timephrase::parse_time_phrase;
