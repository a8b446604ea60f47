//! `agenda` CLI: run the scheduling engine over local files and query availability.
//!
//! ## Usage
//!
//! ```sh
//! # Poll forever against file-backed collaborators
//! agenda run --calendar calendar.json --inbox inbox.json --outbox outbox.jsonl
//!
//! # One deterministic cycle, report printed as JSON
//! agenda --now 2026-03-16T10:00:00Z run --calendar calendar.json \
//!     --inbox inbox.json --outbox outbox.jsonl --cycles 1
//!
//! # Is 13:00 tomorrow free for an hour?
//! agenda check --calendar calendar.json --at "2026-03-17 13:00" --duration 60
//!
//! # Three lunch alternatives
//! agenda slots --calendar calendar.json --category lunch
//!
//! # Merged busy blocks inside the horizon
//! agenda busy --calendar calendar.json
//!
//! # Which tracked meetings disappeared since the last snapshot?
//! agenda diff --calendar calendar.json --snapshot calendar_state.json
//! ```
//!
//! Logs go to stderr; `RUST_LOG` controls the level (default `info`).
//! Ctrl+C stops `run` after the cycle in progress.

mod extract;
mod files;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

use agenda_engine::calendar::parse_timestamp;
use agenda_engine::reconcile::observe;
use agenda_engine::slots::find_slots_with_policy;
use agenda_engine::{
    reconcile, AvailabilityIndex, Engine, EngineConfig, Horizon, JsonFileSnapshotStore,
    MeetingCategory, RawEvent,
};
use anyhow::{Context, Result};
use chrono::{DateTime, SecondsFormat, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::extract::KeywordExtractor;
use crate::files::{FileCalendar, FileInbox, JsonLinesOutbox};

#[derive(Parser)]
#[command(
    name = "agenda",
    version,
    about = "Availability and reconciliation engine for a personal scheduling assistant"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Engine configuration file (JSON); AGENDA_* variables override it
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Evaluate as of this instant instead of the system clock (RFC 3339)
    #[arg(long, global = true, value_parser = parse_instant)]
    now: Option<DateTime<Utc>>,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Poll the inbox and calendar, answering requests and watching for deletions
    Run {
        /// Calendar file (JSON array of events)
        #[arg(long)]
        calendar: PathBuf,
        /// Inbox file (JSON array of messages)
        #[arg(long)]
        inbox: PathBuf,
        /// Outbox file notifications are appended to (JSON lines)
        #[arg(long)]
        outbox: PathBuf,
        /// Snapshot file (defaults to the configured path)
        #[arg(long)]
        snapshot: Option<PathBuf>,
        /// Stop after this many cycles
        #[arg(long)]
        cycles: Option<u64>,
    },
    /// Check whether a time is free
    Check {
        #[arg(long)]
        calendar: PathBuf,
        /// Start time (RFC 3339, or local "YYYY-MM-DD HH:MM" in the reference timezone)
        #[arg(long)]
        at: String,
        /// Meeting length in minutes
        #[arg(long)]
        duration: Option<u32>,
    },
    /// List free slots for a meeting category
    Slots {
        #[arg(long)]
        calendar: PathBuf,
        /// breakfast, lunch, dinner or general
        #[arg(long, default_value = "general")]
        category: String,
        /// Meeting length in minutes
        #[arg(long)]
        duration: Option<u32>,
        /// Maximum number of slots
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Print merged busy blocks
    Busy {
        #[arg(long)]
        calendar: PathBuf,
    },
    /// Reconcile the calendar against a snapshot and print vanished meetings
    Diff {
        #[arg(long)]
        calendar: PathBuf,
        /// Snapshot file (defaults to the configured path)
        #[arg(long)]
        snapshot: Option<PathBuf>,
    },
}

fn parse_instant(raw: &str) -> std::result::Result<DateTime<Utc>, String> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| format!("expected an RFC 3339 timestamp: {}", e))
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.log_json);

    let config = EngineConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    let now = cli.now.unwrap_or_else(Utc::now);

    match cli.command {
        Commands::Run {
            calendar,
            inbox,
            outbox,
            snapshot,
            cycles,
        } => {
            let snapshot = snapshot.unwrap_or_else(|| config.snapshot_path.clone());
            let mut engine = Engine::new(
                config,
                FileCalendar::new(calendar),
                FileInbox::new(inbox),
                KeywordExtractor,
                JsonLinesOutbox::new(outbox),
                JsonFileSnapshotStore::new(snapshot),
            )?;

            match cli.now {
                // A pinned clock runs cycles back to back and reports each one.
                Some(now) => {
                    for _ in 0..cycles.unwrap_or(1) {
                        let report = engine.run_cycle(now).context("Cycle failed")?;
                        println!("{}", serde_json::to_string(&report)?);
                    }
                }
                None => {
                    let stop = Arc::new(AtomicBool::new(false));
                    stop_on_ctrl_c(Arc::clone(&stop))?;
                    tracing::info!("agenda engine started, press Ctrl+C to stop");
                    let ran = engine.run(&stop, cycles);
                    tracing::info!(cycles = ran, "agenda engine stopped");
                }
            }
        }
        Commands::Check {
            calendar,
            at,
            duration,
        } => {
            let tz = config.timezone()?;
            let at = parse_timestamp(&at, tz, config.dst_policy)
                .with_context(|| format!("Invalid --at value: {}", at))?;
            let duration = duration.unwrap_or(config.default_duration_minutes);
            let index = load_index(&calendar, &config, now)?;
            match index.is_free(at, i64::from(duration)) {
                (true, _) => println!("free"),
                (false, label) => println!("busy: {}", label.unwrap_or_default()),
            }
        }
        Commands::Slots {
            calendar,
            category,
            duration,
            limit,
        } => {
            let category = MeetingCategory::from(category);
            let index = load_index(&calendar, &config, now)?;
            let slots = find_slots_with_policy(
                &index,
                category,
                duration.unwrap_or(config.default_duration_minutes),
                limit.unwrap_or(config.alternatives_limit),
                config.slot_lookahead_days,
                config.dst_policy,
            );
            for slot in slots {
                println!("{}", slot.to_rfc3339_opts(SecondsFormat::Secs, true));
            }
        }
        Commands::Busy { calendar } => {
            let index = load_index(&calendar, &config, now)?;
            for (start, end) in index.merged() {
                println!(
                    "{} {}",
                    start.to_rfc3339_opts(SecondsFormat::Secs, true),
                    end.to_rfc3339_opts(SecondsFormat::Secs, true)
                );
            }
        }
        Commands::Diff { calendar, snapshot } => {
            let tz = config.timezone()?;
            let events = read_calendar(&calendar)?;
            let mut store =
                JsonFileSnapshotStore::new(snapshot.unwrap_or_else(|| config.snapshot_path.clone()));
            let observed = observe(&events, now, tz, config.dst_policy);
            let outcome = reconcile(&mut store, observed, now)?;
            let out = serde_json::json!({
                "primed": outcome.primed,
                "tracked": outcome.snapshot.len(),
                "vanished": outcome.vanished,
            });
            println!("{}", serde_json::to_string_pretty(&out)?);
        }
    }

    Ok(())
}

/// Set `stop` when the process receives Ctrl+C.
fn stop_on_ctrl_c(stop: Arc<AtomicBool>) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to start signal runtime")?;
    thread::Builder::new()
        .name("agenda-signal".to_string())
        .spawn(move || {
            match runtime.block_on(tokio::signal::ctrl_c()) {
                Ok(()) => {
                    tracing::info!("interrupt received, stopping after this cycle");
                    stop.store(true, Ordering::SeqCst);
                }
                Err(e) => tracing::warn!(error = %e, "cannot listen for Ctrl+C"),
            }
        })
        .context("Failed to spawn signal thread")?;
    Ok(())
}

fn read_calendar(path: &Path) -> Result<Vec<RawEvent>> {
    FileCalendar::new(path)
        .events()
        .with_context(|| format!("Failed to read calendar: {}", path.display()))
}

fn load_index(path: &Path, config: &EngineConfig, now: DateTime<Utc>) -> Result<AvailabilityIndex> {
    let events = read_calendar(path)?;
    let horizon = Horizon::from_now(now, config.horizon_days);
    Ok(AvailabilityIndex::build(
        &events,
        horizon,
        config.timezone()?,
        config.dst_policy,
    ))
}
