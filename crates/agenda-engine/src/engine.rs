//! The poll cycle and the loop that drives it.
//!
//! An [`Engine`] owns its collaborators and the per-process seen-message set.
//! One cycle rebuilds the availability index, reconciles the snapshot, then
//! handles a bounded batch of inbound messages. Reconciliation always runs
//! before message handling so a freed slot is offered back to the original
//! counterpart first.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration as StdDuration, Instant};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::availability::{AvailabilityIndex, Horizon};
use crate::calendar::{NewEvent, RawEvent};
use crate::collaborators::{
    CalendarStore, CollaboratorError, InboundMessage, MessageSource, Notifier, RequestExtractor,
};
use crate::config::EngineConfig;
use crate::decision::{Action, MeetingRequest, Orchestrator};
use crate::error::Result;
use crate::reconcile::{observe, reconcile, Snapshot, SnapshotStore};
use crate::reply::{self, Reply};
use crate::timephrase::parse_time_phrase;

/// Summary of one poll cycle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// The snapshot had to be primed (first run or unusable snapshot).
    pub primed: bool,
    pub vanished: usize,
    pub processed: usize,
    pub actions: Vec<Action>,
}

pub struct Engine<C, M, X, N, S> {
    pub calendar: C,
    pub inbox: M,
    pub extractor: X,
    pub notifier: N,
    pub snapshots: S,
    config: EngineConfig,
    tz: Tz,
    orchestrator: Orchestrator,
    seen: HashSet<String>,
    /// The snapshot persisted by this cycle's reconciliation.
    tracked: Snapshot,
}

impl<C, M, X, N, S> Engine<C, M, X, N, S>
where
    C: CalendarStore,
    M: MessageSource,
    X: RequestExtractor,
    N: Notifier,
    S: SnapshotStore,
{
    pub fn new(
        config: EngineConfig,
        calendar: C,
        inbox: M,
        extractor: X,
        notifier: N,
        snapshots: S,
    ) -> Result<Self> {
        config.validate()?;
        let tz = config.timezone()?;
        let orchestrator = config.orchestrator();
        Ok(Self {
            calendar,
            inbox,
            extractor,
            notifier,
            snapshots,
            config,
            tz,
            orchestrator,
            seen: HashSet::new(),
            tracked: Snapshot::new(),
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether a message id was already handled by this engine.
    pub fn has_seen(&self, id: &str) -> bool {
        self.seen.contains(id)
    }

    /// Run one poll cycle as of `now`.
    ///
    /// A transient collaborator failure aborts the cycle; messages not yet
    /// marked processed are picked up again next time.
    pub fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleReport> {
        let policy = self.config.dst_policy;
        let horizon = Horizon::from_now(now, self.config.horizon_days);
        let events = self
            .calendar
            .list_events(horizon.start, horizon.end)
            .map_err(|e| e.into_engine("calendar"))?;
        let index = AvailabilityIndex::build(&events, horizon, self.tz, policy);

        let observed = observe(&events, now, self.tz, policy);
        let reconciliation = reconcile(&mut self.snapshots, observed, now)?;
        self.tracked = reconciliation.snapshot.clone();

        let mut report = CycleReport {
            primed: reconciliation.primed,
            vanished: reconciliation.vanished.len(),
            ..CycleReport::default()
        };

        for item in &reconciliation.vanished {
            let action = self.orchestrator.on_vanished(item, &index);
            self.execute(&action, None, &events, now)?;
            report.actions.push(action);
        }

        let messages = self
            .inbox
            .unread(self.config.message_batch)
            .map_err(|e| e.into_engine("inbox"))?;

        for message in messages {
            if self.seen.contains(&message.id) {
                continue;
            }
            let action = self.handle_message(&message, &events, &index, now)?;

            // Seen before marked: a failed mark must not repeat the action in this run.
            self.seen.insert(message.id.clone());
            let discarded = matches!(action, Some(Action::Ignore { discard: true }));
            if !discarded {
                self.inbox
                    .mark_processed(&message.id)
                    .map_err(|e| e.into_engine("inbox"))?;
            }
            report.processed += 1;
            report.actions.extend(action);
        }

        tracing::debug!(
            primed = report.primed,
            vanished = report.vanished,
            processed = report.processed,
            busy = index.len(),
            "cycle complete"
        );
        Ok(report)
    }

    /// Poll until `stop` is set or `max_cycles` cycles have run.
    ///
    /// A failed cycle is logged and followed by the backoff pause; it never
    /// ends the loop. Returns the number of cycles run.
    pub fn run(&mut self, stop: &AtomicBool, max_cycles: Option<u64>) -> u64 {
        let mut cycles = 0u64;
        while !stop.load(Ordering::SeqCst) {
            cycles += 1;
            let pause = match self.run_cycle(Utc::now()) {
                Ok(report) => {
                    tracing::info!(
                        cycle = cycles,
                        vanished = report.vanished,
                        processed = report.processed,
                        "scan finished"
                    );
                    self.config.poll_interval_secs
                }
                Err(e) => {
                    tracing::error!(
                        cycle = cycles,
                        error = %e,
                        backoff_secs = self.config.backoff_secs,
                        "cycle failed, backing off"
                    );
                    self.config.backoff_secs
                }
            };
            if max_cycles.is_some_and(|max| cycles >= max) {
                break;
            }
            sleep_unless_stopped(stop, StdDuration::from_secs(pause));
        }
        cycles
    }

    fn handle_message(
        &mut self,
        message: &InboundMessage,
        events: &[RawEvent],
        index: &AvailabilityIndex,
        now: DateTime<Utc>,
    ) -> Result<Option<Action>> {
        if self.config.is_ignored_sender(&message.sender) {
            tracing::debug!(message_id = %message.id, sender = %message.sender, "ignored sender");
            return Ok(None);
        }

        let extraction = match self.extractor.extract(&message.body, now) {
            Ok(extraction) => extraction,
            Err(CollaboratorError::Malformed(reason)) => {
                tracing::warn!(message_id = %message.id, %reason, "extraction unusable, leaving message as is");
                return Ok(None);
            }
            Err(e) => return Err(e.into_engine("extractor")),
        };

        let candidate_time = extraction
            .time_phrase
            .as_deref()
            .and_then(|phrase| parse_time_phrase(phrase, now, self.tz, self.config.dst_policy));
        let request = MeetingRequest {
            category: extraction.category.unwrap_or_default(),
            duration_minutes: extraction
                .duration_minutes
                .filter(|d| *d > 0)
                .unwrap_or(self.config.default_duration_minutes),
            candidate_time,
        };

        let action = self
            .orchestrator
            .decide(extraction.intent, &request, message.counterpart(), index);
        tracing::info!(
            message_id = %message.id,
            counterpart = %message.counterpart(),
            action = action.kind(),
            "request decided"
        );
        self.execute(&action, Some(&message.id), events, now)?;
        Ok(Some(action))
    }

    fn execute(
        &mut self,
        action: &Action,
        message_id: Option<&str>,
        events: &[RawEvent],
        now: DateTime<Utc>,
    ) -> Result<()> {
        match action {
            Action::Book {
                counterpart,
                start,
                duration_minutes,
                replace_prior,
            } => {
                if *replace_prior {
                    let day = start.with_timezone(&self.tz).date_naive();
                    let prior = self.items_for(counterpart, events, |s| {
                        s.with_timezone(&self.tz).date_naive() == day
                    });
                    for (id, _) in prior {
                        tracing::info!(event_id = %id, %counterpart, "removing prior meeting");
                        self.calendar.delete(&id).map_err(|e| e.into_engine("calendar"))?;
                        self.retract(&id)?;
                    }
                }
                let event = NewEvent::meeting(
                    format!("Meeting with {}", counterpart),
                    *start,
                    *duration_minutes,
                    counterpart.clone(),
                );
                let id = self
                    .calendar
                    .insert(event)
                    .map_err(|e| e.into_engine("calendar"))?;
                tracing::info!(event_id = %id, start = %start, "meeting booked");
                self.notify(counterpart, reply::booked(*start, self.tz, *replace_prior));
            }
            Action::Decline {
                counterpart,
                conflict,
                alternatives,
            } => {
                self.notify(counterpart, reply::declined(conflict, alternatives, self.tz));
            }
            Action::UnresolvedDecline {
                counterpart,
                alternatives,
            } => {
                self.notify(counterpart, reply::unresolved(alternatives, self.tz));
            }
            Action::Cancel { counterpart } => {
                let target = self
                    .items_for(counterpart, events, |s| s > now)
                    .into_iter()
                    .min_by_key(|(_, start)| *start);
                match target {
                    Some((id, _)) => {
                        self.calendar.delete(&id).map_err(|e| e.into_engine("calendar"))?;
                        self.retract(&id)?;
                        tracing::info!(event_id = %id, %counterpart, "meeting cancelled");
                        self.notify(counterpart, reply::cancelled());
                    }
                    None => {
                        tracing::info!(%counterpart, "no meeting found to cancel");
                    }
                }
            }
            Action::Ignore { discard } => {
                if let (true, Some(id)) = (*discard, message_id) {
                    self.inbox.discard(id).map_err(|e| e.into_engine("inbox"))?;
                }
            }
            Action::Notify {
                counterpart,
                item,
                alternatives,
            } => {
                self.notify(counterpart, reply::vanished(item, alternatives, self.tz));
            }
        }
        Ok(())
    }

    /// Ids and starts of listed items with `counterpart` as attendee whose start passes `keep`.
    fn items_for<F>(
        &self,
        counterpart: &str,
        events: &[RawEvent],
        keep: F,
    ) -> Vec<(String, DateTime<Utc>)>
    where
        F: Fn(DateTime<Utc>) -> bool,
    {
        events
            .iter()
            .filter(|event| event.has_counterpart(counterpart))
            .filter_map(|event| {
                let start = event.start_instant(self.tz, self.config.dst_policy).ok()?;
                keep(start).then(|| (event.id.clone(), start))
            })
            .collect()
    }

    /// Remove an item this engine deleted from the persisted snapshot immediately.
    fn retract(&mut self, id: &str) -> Result<()> {
        if self.tracked.remove(id).is_some() {
            self.snapshots.save(&self.tracked)?;
        }
        Ok(())
    }

    /// Delivery is best effort.
    fn notify(&mut self, counterpart: &str, reply: Reply) {
        if let Err(e) = self.notifier.send(counterpart, &reply.subject, &reply.body) {
            tracing::warn!(%counterpart, error = %e, "notification not delivered");
        }
    }
}

fn sleep_unless_stopped(stop: &AtomicBool, pause: StdDuration) {
    let deadline = Instant::now() + pause;
    while !stop.load(Ordering::SeqCst) {
        let now = Instant::now();
        if now >= deadline {
            break;
        }
        thread::sleep((deadline - now).min(StdDuration::from_millis(200)));
    }
}
