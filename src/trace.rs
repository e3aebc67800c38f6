//! Structured trace sink for git operations.
//!
//! Credential exchanges report activities (start/stop with metadata) and
//! warnings through a [`Tracer`]. Two sinks are provided:
//!
//! - [`LogTracer`] forwards every record to the `tracing` facade.
//! - [`EventLogTracer`] appends one JSON object per record to an NDJSON file,
//!   for audit trails that outlive the process.
//!
//! # Record Format
//!
//! Each NDJSON record has:
//! - `ts`: RFC3339 timestamp
//! - `level`: `info` or `warning`
//! - `kind`: `activity_start`, `activity_stop`, or `message`
//! - `name`: activity name or message area
//! - `message`: optional free text
//! - `actor`: `user@HOST`
//! - `metadata`: freeform object
//!
//! Passwords are never placed in metadata by this crate.

use crate::error::{GitBridgeError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Instant;

/// Key/value metadata attached to a trace record.
pub type EventMetadata = Map<String, Value>;

/// Severity of a trace record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceLevel {
    Info,
    Warning,
}

/// What a trace record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    ActivityStart,
    ActivityStop,
    Message,
}

/// A single record handed to a [`Tracer`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceEvent {
    pub level: TraceLevel,
    pub kind: TraceKind,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub metadata: EventMetadata,
}

/// Sink for structured trace records.
pub trait Tracer: Send + Sync {
    /// Record one event.
    fn record(&self, event: TraceEvent);

    /// Begin a named activity; call [`Activity::stop`] to close it.
    fn start_activity(&self, name: &str) -> Activity<'_>
    where
        Self: Sized,
    {
        Activity::start(self, name)
    }

    /// Record a warning related to the current operation.
    fn related_warning(&self, metadata: EventMetadata, message: &str) {
        self.record(TraceEvent {
            level: TraceLevel::Warning,
            kind: TraceKind::Message,
            name: "warning".to_string(),
            message: Some(message.to_string()),
            metadata,
        });
    }

    /// Record an informational message related to the current operation.
    fn related_info(&self, metadata: EventMetadata, message: &str) {
        self.record(TraceEvent {
            level: TraceLevel::Info,
            kind: TraceKind::Message,
            name: "info".to_string(),
            message: Some(message.to_string()),
            metadata,
        });
    }
}

/// An open activity span. Stopping it records the elapsed time.
///
/// Dropping an activity without stopping it records a stop with empty
/// metadata, so every start has a matching stop.
pub struct Activity<'a> {
    tracer: &'a dyn Tracer,
    name: String,
    started: Instant,
    stopped: bool,
}

impl<'a> Activity<'a> {
    /// Start an activity on any tracer, including trait objects.
    pub fn start(tracer: &'a dyn Tracer, name: &str) -> Self {
        tracer.record(TraceEvent {
            level: TraceLevel::Info,
            kind: TraceKind::ActivityStart,
            name: name.to_string(),
            message: None,
            metadata: EventMetadata::new(),
        });
        Self {
            tracer,
            name: name.to_string(),
            started: Instant::now(),
            stopped: false,
        }
    }

    /// Close the activity with the given metadata.
    pub fn stop(mut self, metadata: EventMetadata) {
        self.finish(metadata);
    }

    fn finish(&mut self, mut metadata: EventMetadata) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        metadata.insert(
            "DurationMs".to_string(),
            Value::from(self.started.elapsed().as_millis() as u64),
        );
        self.tracer.record(TraceEvent {
            level: TraceLevel::Info,
            kind: TraceKind::ActivityStop,
            name: self.name.clone(),
            message: None,
            metadata,
        });
    }
}

impl Drop for Activity<'_> {
    fn drop(&mut self) {
        self.finish(EventMetadata::new());
    }
}

/// [`Tracer`] that forwards records to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogTracer;

impl Tracer for LogTracer {
    fn record(&self, event: TraceEvent) {
        let metadata = Value::Object(event.metadata);
        let message = event.message.as_deref().unwrap_or("");
        match (event.level, event.kind) {
            (TraceLevel::Warning, _) => {
                tracing::warn!(name = %event.name, %metadata, "{}", message);
            }
            (TraceLevel::Info, TraceKind::ActivityStart) => {
                tracing::debug!(activity = %event.name, "activity started");
            }
            (TraceLevel::Info, TraceKind::ActivityStop) => {
                tracing::info!(activity = %event.name, %metadata, "activity stopped");
            }
            (TraceLevel::Info, TraceKind::Message) => {
                tracing::info!(name = %event.name, %metadata, "{}", message);
            }
        }
    }
}

/// One line of the NDJSON event log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRecord {
    pub ts: DateTime<Utc>,
    pub actor: String,
    #[serde(flatten)]
    pub event: TraceEvent,
}

/// [`Tracer`] that appends NDJSON records to a file.
///
/// Write failures are reported through `tracing` and otherwise ignored: a
/// broken audit log must not fail a git operation.
#[derive(Debug)]
pub struct EventLogTracer {
    path: PathBuf,
    actor: String,
    write_lock: Mutex<()>,
}

impl EventLogTracer {
    /// Create a tracer appending to `path`, creating parent directories.
    pub fn new(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| {
                GitBridgeError::UserError(format!(
                    "failed to create event log directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        Ok(Self {
            path,
            actor: get_actor_string(),
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the NDJSON file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, record: &EventRecord) -> std::io::Result<()> {
        let line = serde_json::to_string(record)?;
        let _guard = self
            .write_lock
            .lock()
            .unwrap_or_else(|poison| poison.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)
    }
}

impl Tracer for EventLogTracer {
    fn record(&self, event: TraceEvent) {
        let record = EventRecord {
            ts: Utc::now(),
            actor: self.actor.clone(),
            event,
        };
        if let Err(e) = self.append(&record) {
            tracing::warn!(path = %self.path.display(), error = %e, "failed to append event record");
        }
    }
}

/// Get the actor string for event metadata.
fn get_actor_string() -> String {
    let user = std::env::var("USER")
        .or_else(|_| std::env::var("USERNAME"))
        .unwrap_or_else(|_| "unknown".to_string());

    let host = hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string());

    format!("{}@{}", user, host)
}
