//! Engine configuration.
//!
//! ## Loading Strategy
//! 1. Start from defaults (every field has one)
//! 2. If a JSON file is given, fields present in it replace the defaults
//! 3. `AGENDA_*` environment variables override both
//! 4. The result is validated
//!
//! ## Environment Variables
//! - `AGENDA_TIMEZONE`: reference IANA timezone
//! - `AGENDA_HORIZON_DAYS`: availability lookahead in days
//! - `AGENDA_SLOT_LOOKAHEAD_DAYS`: days searched for alternatives
//! - `AGENDA_ALTERNATIVES_LIMIT`: alternatives offered per reply
//! - `AGENDA_DEFAULT_DURATION`: meeting length when none is given (minutes)
//! - `AGENDA_MESSAGE_BATCH`: inbound messages handled per cycle
//! - `AGENDA_POLL_INTERVAL_SECS`: pause between cycles
//! - `AGENDA_BACKOFF_SECS`: pause after a failed cycle
//! - `AGENDA_SNAPSHOT_PATH`: reconciliation snapshot file
//! - `AGENDA_IGNORED_SENDERS`: comma-separated sender substrings to skip

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::decision::Orchestrator;
use crate::dst::DstPolicy;
use crate::error::{EngineError, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub reference_timezone: String,
    pub horizon_days: u32,
    pub slot_lookahead_days: u32,
    pub alternatives_limit: usize,
    pub default_duration_minutes: u32,
    pub message_batch: usize,
    pub poll_interval_secs: u64,
    pub backoff_secs: u64,
    pub snapshot_path: PathBuf,
    pub ignored_senders: Vec<String>,
    pub dst_policy: DstPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            reference_timezone: "UTC".to_string(),
            horizon_days: 7,
            slot_lookahead_days: 5,
            alternatives_limit: 3,
            default_duration_minutes: 30,
            message_batch: 3,
            poll_interval_secs: 60,
            backoff_secs: 300,
            snapshot_path: PathBuf::from("calendar_state.json"),
            ignored_senders: vec![
                "calendar-notification@google.com".to_string(),
                "no-reply@google.com".to_string(),
                "mailer-daemon@googlemail.com".to_string(),
            ],
            dst_policy: DstPolicy::ShiftForward,
        }
    }
}

impl EngineConfig {
    /// Load from an optional file, apply process environment overrides, validate.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        tracing::debug!(?config, "configuration loaded");
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let data = fs::read_to_string(path).map_err(|e| {
            EngineError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        serde_json::from_str(&data)
            .map_err(|e| EngineError::Config(format!("invalid {}: {}", path.display(), e)))
    }

    /// Apply `AGENDA_*` overrides from `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(tz) = lookup("AGENDA_TIMEZONE") {
            self.reference_timezone = tz;
        }
        override_parsed(&lookup, "AGENDA_HORIZON_DAYS", &mut self.horizon_days)?;
        override_parsed(&lookup, "AGENDA_SLOT_LOOKAHEAD_DAYS", &mut self.slot_lookahead_days)?;
        override_parsed(&lookup, "AGENDA_ALTERNATIVES_LIMIT", &mut self.alternatives_limit)?;
        override_parsed(&lookup, "AGENDA_DEFAULT_DURATION", &mut self.default_duration_minutes)?;
        override_parsed(&lookup, "AGENDA_MESSAGE_BATCH", &mut self.message_batch)?;
        override_parsed(&lookup, "AGENDA_POLL_INTERVAL_SECS", &mut self.poll_interval_secs)?;
        override_parsed(&lookup, "AGENDA_BACKOFF_SECS", &mut self.backoff_secs)?;
        if let Some(path) = lookup("AGENDA_SNAPSHOT_PATH") {
            self.snapshot_path = PathBuf::from(path);
        }
        if let Some(list) = lookup("AGENDA_IGNORED_SENDERS") {
            self.ignored_senders = list
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.timezone()?;
        if self.default_duration_minutes == 0 {
            return Err(EngineError::Config("default duration must be positive".to_string()));
        }
        if self.message_batch == 0 {
            return Err(EngineError::Config("message batch must be positive".to_string()));
        }
        // Slots on the last lookahead day must still be inside the index.
        if self.horizon_days <= self.slot_lookahead_days {
            return Err(EngineError::Config(format!(
                "horizon ({} days) must exceed slot lookahead ({} days)",
                self.horizon_days, self.slot_lookahead_days
            )));
        }
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        self.reference_timezone
            .parse()
            .map_err(|_| EngineError::InvalidTimezone(self.reference_timezone.clone()))
    }

    pub fn orchestrator(&self) -> Orchestrator {
        Orchestrator {
            alternatives_limit: self.alternatives_limit,
            lookahead_days: self.slot_lookahead_days,
            default_duration_minutes: self.default_duration_minutes,
            dst_policy: self.dst_policy,
        }
    }

    pub fn is_ignored_sender(&self, sender: &str) -> bool {
        let sender = sender.to_lowercase();
        self.ignored_senders
            .iter()
            .any(|ignored| sender.contains(&ignored.to_lowercase()))
    }
}

fn override_parsed<F, T>(lookup: &F, key: &str, target: &mut T) -> Result<()>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    if let Some(raw) = lookup(key) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e| EngineError::Config(format!("invalid {}: {}", key, e)))?;
    }
    Ok(())
}
