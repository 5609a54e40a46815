//! # Audit Sinks
//!
//! A sink owns the chain head. `append` assigns the next sequence number
//! and seals the entry under the sink's lock, so concurrent appends never
//! fork the chain.

use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use geoscope_core::{ActorId, ContentDigest};
use parking_lot::{Mutex, RwLock};

use crate::error::AuditError;
use crate::event::{AuditEntry, AuditEvent};

/// Append-only destination for audit events.
pub trait AuditSink: Send + Sync {
    /// Seal and persist one entry. The returned event is durable when this
    /// returns `Ok`.
    fn append(&self, entry: AuditEntry) -> Result<AuditEvent, AuditError>;

    /// Number of events appended so far.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Debug, Clone, Copy)]
struct Head {
    sequence: u64,
    digest: ContentDigest,
}

impl Head {
    fn genesis() -> Self {
        Self {
            sequence: 0,
            digest: ContentDigest::zero(),
        }
    }

    fn advance(&mut self, event: &AuditEvent) {
        self.sequence = event.sequence;
        self.digest = event.digest;
    }
}

/// In-memory sink. Clones share the same log.
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditLog {
    events: Arc<RwLock<Vec<AuditEvent>>>,
}

impl MemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every event, oldest first.
    pub fn events(&self) -> Vec<AuditEvent> {
        self.events.read().clone()
    }

    pub fn by_actor(&self, actor_id: ActorId) -> Vec<AuditEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.actor_id == actor_id)
            .cloned()
            .collect()
    }

    pub fn by_action(&self, action: &str) -> Vec<AuditEvent> {
        self.events
            .read()
            .iter()
            .filter(|e| e.action == action)
            .cloned()
            .collect()
    }

    /// The most recent `n` events, oldest first.
    pub fn last_n(&self, n: usize) -> Vec<AuditEvent> {
        let events = self.events.read();
        let start = events.len().saturating_sub(n);
        events[start..].to_vec()
    }
}

impl AuditSink for MemoryAuditLog {
    fn append(&self, entry: AuditEntry) -> Result<AuditEvent, AuditError> {
        let mut events = self.events.write();
        let (sequence, previous) = match events.last() {
            Some(last) => (last.sequence + 1, last.digest),
            None => (1, ContentDigest::zero()),
        };
        let event = entry.seal(sequence, previous)?;
        events.push(event.clone());
        Ok(event)
    }

    fn len(&self) -> u64 {
        self.events.read().len() as u64
    }
}

/// JSON-lines file sink: one sealed event per line, synced to disk before
/// `append` returns.
///
/// A failed append truncates the file back to its length before the
/// write, so the chain head and the file stay in step. If that truncation
/// also fails the sink is poisoned and refuses further appends.
#[derive(Debug)]
pub struct JsonlAuditLog {
    path: PathBuf,
    state: Mutex<FileState>,
}

#[derive(Debug)]
struct FileState {
    file: File,
    head: Head,
    poisoned: Option<String>,
}

impl JsonlAuditLog {
    /// Open or create the log at `path`, recovering the chain head from the
    /// last stored event.
    ///
    /// # Errors
    ///
    /// I/O failures and undecodable lines. A trailing line without a
    /// newline is a partial write and is truncated away first. The existing
    /// chain is not verified here; use [`crate::verify_chain`] on
    /// [`Self::read_all`].
    pub fn open(path: impl AsRef<Path>) -> Result<Self, AuditError> {
        let path = path.as_ref().to_path_buf();
        let mut head = Head::genesis();
        if path.exists() {
            discard_torn_tail(&path)?;
            if let Some(last) = read_events(&path)?.last() {
                head.advance(last);
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        tracing::debug!(path = %path.display(), sequence = head.sequence, "audit log opened");
        Ok(Self {
            path,
            state: Mutex::new(FileState {
                file,
                head,
                poisoned: None,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every stored event, oldest first.
    pub fn read_all(&self) -> Result<Vec<AuditEvent>, AuditError> {
        let _guard = self.state.lock();
        read_events(&self.path)
    }
}

impl AuditSink for JsonlAuditLog {
    fn append(&self, entry: AuditEntry) -> Result<AuditEvent, AuditError> {
        let mut state = self.state.lock();
        if let Some(reason) = &state.poisoned {
            return Err(AuditError::Unavailable(reason.clone()));
        }
        let event = entry.seal(state.head.sequence + 1, state.head.digest)?;
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');

        let start = state.file.metadata()?.len();
        if let Err(e) = write_line(&mut state.file, &line) {
            if let Err(undo) = rollback(&state.file, start) {
                tracing::error!(
                    path = %self.path.display(),
                    error = %undo,
                    "audit log rollback failed, refusing further appends"
                );
                state.poisoned = Some(format!("audit log rollback failed: {undo}"));
            }
            return Err(e.into());
        }
        state.head.advance(&event);
        Ok(event)
    }

    fn len(&self) -> u64 {
        self.state.lock().head.sequence
    }
}

fn write_line(file: &mut File, line: &[u8]) -> std::io::Result<()> {
    file.write_all(line)?;
    file.flush()?;
    file.sync_data()
}

fn rollback(file: &File, len: u64) -> std::io::Result<()> {
    file.set_len(len)?;
    file.sync_data()
}

/// Truncate a final line that never got its newline.
fn discard_torn_tail(path: &Path) -> Result<(), AuditError> {
    let bytes = std::fs::read(path)?;
    if bytes.last().map_or(true, |&b| b == b'\n') {
        return Ok(());
    }
    let keep = bytes.iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1);
    tracing::warn!(
        path = %path.display(),
        dropped_bytes = bytes.len() - keep,
        "discarding partial audit line"
    );
    let file = OpenOptions::new().write(true).open(path)?;
    rollback(&file, keep as u64)?;
    Ok(())
}

/// Read every event from a JSON-lines log. Blank lines are skipped.
pub fn read_events(path: &Path) -> Result<Vec<AuditEvent>, AuditError> {
    let reader = BufReader::new(File::open(path)?);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        events.push(serde_json::from_str(&line)?);
    }
    Ok(events)
}
