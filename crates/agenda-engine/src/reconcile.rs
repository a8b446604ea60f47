//! Detect manually deleted meetings by diffing successive snapshots.
//!
//! Every poll observes the future scheduled items that have an external
//! counterpart. Ids present in the previous snapshot but missing from the
//! current observation have vanished. The observation is then persisted as
//! the next snapshot, whether or not anything vanished.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::calendar::RawEvent;
use crate::dst::DstPolicy;
use crate::error::{EngineError, Result};

/// A scheduled item worth reconciling against its counterpart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedItem {
    pub id: String,
    pub label: String,
    pub start: DateTime<Utc>,
    pub counterpart: String,
}

/// Previously observed items keyed by id.
pub type Snapshot = BTreeMap<String, TrackedItem>;

/// Durable storage for the previous cycle's snapshot (read whole, write whole).
pub trait SnapshotStore {
    /// `Ok(None)` means no snapshot was ever written.
    fn load(&self) -> Result<Option<Snapshot>>;
    fn save(&mut self, snapshot: &Snapshot) -> Result<()>;
}

/// JSON snapshot on disk, replaced atomically via a temp file and rename.
#[derive(Debug, Clone)]
pub struct JsonFileSnapshotStore {
    path: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SnapshotStore for JsonFileSnapshotStore {
    fn load(&self) -> Result<Option<Snapshot>> {
        let data = match fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(EngineError::Snapshot(format!(
                    "failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        serde_json::from_str(&data).map(Some).map_err(|e| {
            EngineError::Snapshot(format!("failed to parse {}: {}", self.path.display(), e))
        })
    }

    fn save(&mut self, snapshot: &Snapshot) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| EngineError::Snapshot(format!("failed to encode snapshot: {}", e)))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

/// Result of diffing one observation against the stored snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reconciliation {
    /// Items present last cycle but gone now, in id order.
    pub vanished: Vec<TrackedItem>,
    /// True when there was no usable previous snapshot.
    pub primed: bool,
    /// The snapshot that was persisted for the next cycle.
    pub snapshot: Snapshot,
}

/// Build the observed set: future items with a resolvable counterpart.
pub fn observe(
    events: &[RawEvent],
    now: DateTime<Utc>,
    tz: Tz,
    policy: DstPolicy,
) -> Snapshot {
    let mut observed = Snapshot::new();
    for event in events {
        let Some(counterpart) = event.counterpart() else {
            continue;
        };
        let start = match event.start_instant(tz, policy) {
            Ok(start) => start,
            Err(e) => {
                tracing::warn!(event_id = %event.id, error = %e, "not tracking unparseable item");
                continue;
            }
        };
        if start <= now {
            continue;
        }
        observed.insert(
            event.id.clone(),
            TrackedItem {
                id: event.id.clone(),
                label: event.label().to_string(),
                start,
                counterpart: counterpart.to_string(),
            },
        );
    }
    observed
}

/// Items in `previous` whose id is absent from `observed`.
///
/// Items whose start is no longer after `now` left the observed set because
/// they began, not because anyone deleted them; they drop out silently.
pub fn diff(previous: &Snapshot, observed: &Snapshot, now: DateTime<Utc>) -> Vec<TrackedItem> {
    previous
        .values()
        .filter(|item| item.start > now)
        .filter(|item| !observed.contains_key(&item.id))
        .cloned()
        .collect()
}

/// Run one reconciliation pass: load, diff, persist.
///
/// A missing snapshot primes silently. An unreadable one is logged and
/// treated as empty. The new snapshot is always written.
pub fn reconcile(
    store: &mut dyn SnapshotStore,
    observed: Snapshot,
    now: DateTime<Utc>,
) -> Result<Reconciliation> {
    let previous = match store.load() {
        Ok(previous) => previous,
        Err(e) => {
            tracing::warn!(error = %e, "previous snapshot unusable, treating as empty");
            None
        }
    };

    let (vanished, primed) = match &previous {
        Some(previous) => (diff(previous, &observed, now), false),
        None => (Vec::new(), true),
    };

    for item in &vanished {
        tracing::info!(
            event_id = %item.id,
            label = %item.label,
            counterpart = %item.counterpart,
            "tracked item vanished from calendar"
        );
    }

    store.save(&observed)?;

    Ok(Reconciliation {
        vanished,
        primed,
        snapshot: observed,
    })
}
