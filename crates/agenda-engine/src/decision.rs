//! Decision orchestrator: availability status plus intent to a typed action.
//!
//! The mapping from (intent, status) to action is a fixed lookup table in
//! [`choose_action`]; no free-form text is ever parsed to pick an action.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::availability::AvailabilityIndex;
use crate::dst::DstPolicy;
use crate::reconcile::TrackedItem;
use crate::slots::{find_slots_with_policy, MeetingCategory};

/// What the sender wants, as classified upstream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    Create,
    Reschedule,
    Cancel,
    Spam,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingRequest {
    pub category: MeetingCategory,
    pub duration_minutes: u32,
    /// Absent when no time could be extracted or parsed.
    pub candidate_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "conflict", rename_all = "snake_case")]
pub enum AvailabilityStatus {
    Available,
    Busy(String),
    Unresolved,
}

/// An action for the actuator layer to execute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    /// Insert a meeting. With `replace_prior`, the counterpart's existing
    /// item on the target day is deleted first.
    Book {
        counterpart: String,
        start: DateTime<Utc>,
        duration_minutes: u32,
        replace_prior: bool,
    },
    Decline {
        counterpart: String,
        conflict: String,
        alternatives: Vec<DateTime<Utc>>,
    },
    UnresolvedDecline {
        counterpart: String,
        alternatives: Vec<DateTime<Utc>>,
    },
    Cancel {
        counterpart: String,
    },
    Ignore {
        discard: bool,
    },
    Notify {
        counterpart: String,
        item: TrackedItem,
        alternatives: Vec<DateTime<Utc>>,
    },
}

impl Action {
    pub fn kind(&self) -> &'static str {
        match self {
            Action::Book { .. } => "book",
            Action::Decline { .. } => "decline",
            Action::UnresolvedDecline { .. } => "unresolved_decline",
            Action::Cancel { .. } => "cancel",
            Action::Ignore { .. } => "ignore",
            Action::Notify { .. } => "notify",
        }
    }
}

/// The (intent, status) lookup table.
///
/// `alternatives` is only carried by declines; callers pass an empty list
/// when the requested time is available.
pub fn choose_action(
    intent: Intent,
    request: &MeetingRequest,
    status: AvailabilityStatus,
    alternatives: Vec<DateTime<Utc>>,
    counterpart: &str,
) -> Action {
    let counterpart = counterpart.to_string();
    match (intent, status, request.candidate_time) {
        (Intent::Spam, _, _) => Action::Ignore { discard: true },
        (Intent::Cancel, _, _) => Action::Cancel { counterpart },
        (Intent::Create | Intent::Reschedule, AvailabilityStatus::Available, Some(start)) => {
            Action::Book {
                counterpart,
                start,
                duration_minutes: request.duration_minutes,
                replace_prior: intent == Intent::Reschedule,
            }
        }
        (Intent::Create | Intent::Reschedule, AvailabilityStatus::Busy(conflict), _) => {
            Action::Decline {
                counterpart,
                conflict,
                alternatives,
            }
        }
        // Unresolved, or an inconsistent "available" with no time.
        (Intent::Create | Intent::Reschedule, _, _) => Action::UnresolvedDecline {
            counterpart,
            alternatives,
        },
    }
}

/// Sequences availability testing and slot search for each request.
#[derive(Debug, Clone, Copy)]
pub struct Orchestrator {
    pub alternatives_limit: usize,
    pub lookahead_days: u32,
    /// Duration assumed for vanished items when searching replacements.
    pub default_duration_minutes: u32,
    pub dst_policy: DstPolicy,
}

impl Orchestrator {
    /// Status of the requested time against the index.
    pub fn status(&self, request: &MeetingRequest, index: &AvailabilityIndex) -> AvailabilityStatus {
        let Some(candidate) = request.candidate_time else {
            return AvailabilityStatus::Unresolved;
        };
        match index.is_free(candidate, i64::from(request.duration_minutes)) {
            (true, _) => AvailabilityStatus::Available,
            (false, label) => AvailabilityStatus::Busy(label.unwrap_or_else(|| "Busy".to_string())),
        }
    }

    pub fn alternatives(
        &self,
        category: MeetingCategory,
        duration_minutes: u32,
        index: &AvailabilityIndex,
    ) -> Vec<DateTime<Utc>> {
        find_slots_with_policy(
            index,
            category,
            duration_minutes,
            self.alternatives_limit,
            self.lookahead_days,
            self.dst_policy,
        )
    }

    /// Decide how to answer one inbound request.
    pub fn decide(
        &self,
        intent: Intent,
        request: &MeetingRequest,
        counterpart: &str,
        index: &AvailabilityIndex,
    ) -> Action {
        if matches!(intent, Intent::Spam | Intent::Cancel) {
            return choose_action(
                intent,
                request,
                AvailabilityStatus::Unresolved,
                Vec::new(),
                counterpart,
            );
        }

        let status = self.status(request, index);
        let alternatives = if status == AvailabilityStatus::Available {
            Vec::new()
        } else {
            self.alternatives(request.category, request.duration_minutes, index)
        };

        tracing::debug!(?intent, ?status, alternatives = alternatives.len(), "request assessed");
        choose_action(intent, request, status, alternatives, counterpart)
    }

    /// Offer replacement times to the counterpart of a vanished item.
    pub fn on_vanished(&self, item: &TrackedItem, index: &AvailabilityIndex) -> Action {
        let category = MeetingCategory::from_label(&item.label);
        let alternatives = self.alternatives(category, self.default_duration_minutes, index);
        Action::Notify {
            counterpart: item.counterpart.clone(),
            item: item.clone(),
            alternatives,
        }
    }
}
