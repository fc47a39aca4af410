// crates/query-gate-mcp/src/audit.rs
// ============================================================================
// Module: Audit Sinks and Emitter
// Description: JSON-line audit sinks and the buffered, lossless emitter.
// Purpose: Deliver every lifecycle event without blocking database calls.
// Dependencies: query-gate-core, serde_json, tokio
// ============================================================================

//! ## Overview
//! Audit events arrive as values from the dispatcher and are written as one
//! JSON object per line. The buffered emitter decouples request handling from
//! sink latency through a bounded channel; when the buffer is full the
//! emitter back-pressures the caller instead of dropping, so audit loss is
//! impossible. Deployments route events to stderr or an append-only file.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs::File;
use std::fs::OpenOptions;
use std::io;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::sync::Mutex;

use query_gate_core::AuditEvent;
use tokio::sync::mpsc;

use crate::config::AuditConfig;
use crate::config::AuditSinkKind;

// ============================================================================
// SECTION: Sink Trait
// ============================================================================

/// Audit sink consuming gateway lifecycle events.
pub trait AuditSink: Send + Sync {
    /// Records one event.
    fn record(&self, event: &AuditEvent);
}

/// Audit sink that writes JSON lines to stderr.
pub struct StderrAuditSink;

impl AuditSink for StderrAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(line) = serde_json::to_string(event) {
            #[allow(clippy::print_stderr, reason = "stderr is this sink's destination")]
            {
                let _ = writeln!(io::stderr(), "{line}");
            }
        }
    }
}

/// Audit sink that appends JSON lines to a file.
pub struct FileAuditSink {
    /// File handle used for append-only logging.
    file: Mutex<File>,
}

impl FileAuditSink {
    /// Opens the audit log file in append mode.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened.
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            file: Mutex::new(file),
        })
    }
}

impl AuditSink for FileAuditSink {
    fn record(&self, event: &AuditEvent) {
        if let Ok(line) = serde_json::to_string(event)
            && let Ok(mut file) = self.file.lock()
        {
            let _ = writeln!(file, "{line}");
            let _ = file.flush();
        }
    }
}

/// No-op audit sink for embeddings that consume events elsewhere.
pub struct NoopAuditSink;

impl AuditSink for NoopAuditSink {
    fn record(&self, _event: &AuditEvent) {}
}

/// Builds the configured sink.
///
/// # Errors
///
/// Returns an error when the file sink is selected and its path cannot be
/// opened.
pub fn sink_from_config(config: &AuditConfig) -> io::Result<Arc<dyn AuditSink>> {
    match config.sink {
        AuditSinkKind::Stderr => Ok(Arc::new(StderrAuditSink)),
        AuditSinkKind::Noop => Ok(Arc::new(NoopAuditSink)),
        AuditSinkKind::File => {
            let path = config.path.as_deref().ok_or_else(|| {
                io::Error::new(io::ErrorKind::InvalidInput, "audit.path is required")
            })?;
            Ok(Arc::new(FileAuditSink::new(path)?))
        }
    }
}

// ============================================================================
// SECTION: Buffered Emitter
// ============================================================================

/// Buffered audit emitter over a bounded channel.
///
/// # Invariants
/// - Events are delivered to the sink in emission order.
/// - A full buffer back-pressures the emitting caller; events are never
///   dropped or coalesced.
#[derive(Clone)]
pub struct BufferedAuditEmitter {
    /// Channel into the drain task.
    sender: mpsc::Sender<AuditEvent>,
    /// Sink handle used for direct delivery if the drain task is gone.
    sink: Arc<dyn AuditSink>,
}

impl BufferedAuditEmitter {
    /// Starts the drain task and returns the emitter handle.
    #[must_use]
    pub fn spawn(sink: Arc<dyn AuditSink>, capacity: usize) -> Self {
        let (sender, mut receiver) = mpsc::channel::<AuditEvent>(capacity.max(1));
        let drain_sink = Arc::clone(&sink);
        tokio::spawn(async move {
            while let Some(event) = receiver.recv().await {
                drain_sink.record(&event);
            }
        });
        Self {
            sender,
            sink,
        }
    }

    /// Emits one event, waiting when the buffer is full.
    pub async fn emit(&self, event: AuditEvent) {
        if let Err(returned) = self.sender.send(event).await {
            // Drain task is gone; deliver directly so the event survives.
            self.sink.record(&returned.0);
        }
    }
}
