// SPDX-License-Identifier: MIT OR Apache-2.0
//! Bounded, priority-aware job queue for the OrderFlow worker plane (spec
//! §5): extraction, embedding, export, ack-poll, and retention jobs all
//! flow through one `RunQueue` per process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

/// Priority levels for queued jobs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobPriority {
    /// Lowest priority.
    Low,
    /// Default priority.
    Normal,
    /// Elevated priority.
    High,
    /// Highest priority — processed before all others.
    Critical,
}

/// The kind of background work a [`QueuedJob`] represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobKind {
    /// Run the extraction orchestrator (C5) against a document.
    Extraction,
    /// Compute/refresh an embedding (feedback loop, C10).
    Embedding,
    /// Push a draft order to the configured ERP dropzone (C9).
    Export,
    /// Poll the ack dropzone for terminal export status (spec §4.8).
    AckPoll,
    /// Run the retention sweep for an org (C11).
    Retention,
}

/// A unit of work waiting in the queue.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueuedJob {
    /// Unique queue entry identifier.
    pub id: Uuid,
    /// Tenant the job runs under.
    pub org_id: Uuid,
    /// What kind of work this is.
    pub kind: JobKind,
    /// Priority level for scheduling.
    pub priority: JobPriority,
    /// When the job was enqueued.
    pub queued_at: DateTime<Utc>,
    /// The entity the job operates on (document id, draft id, export id),
    /// where the job kind has one. `Retention`/`AckPoll` jobs are
    /// org-scoped only and leave this `None`.
    pub target_id: Option<Uuid>,
    /// Arbitrary key-value metadata.
    pub metadata: BTreeMap<String, String>,
}

/// Errors returned by [`RunQueue`] operations.
#[derive(Debug)]
pub enum QueueError {
    /// The queue has reached its maximum capacity.
    Full {
        /// Maximum number of items the queue can hold.
        max: usize,
    },
    /// A job with the given ID is already enqueued.
    DuplicateId(Uuid),
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::Full { max } => write!(f, "queue is full (max {max})"),
            QueueError::DuplicateId(id) => write!(f, "duplicate queue entry: {id}"),
        }
    }
}

impl std::error::Error for QueueError {}

/// Snapshot statistics for a [`RunQueue`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct QueueStats {
    /// Number of items currently in the queue.
    pub total: usize,
    /// Maximum queue capacity.
    pub max: usize,
    /// Breakdown of items per job kind.
    pub by_kind: BTreeMap<String, usize>,
}

/// A bounded, priority-aware job queue.
///
/// [`dequeue`](RunQueue::dequeue) returns the highest-priority item first;
/// among items of equal priority the oldest (FIFO) item is returned.
pub struct RunQueue {
    entries: Vec<QueuedJob>,
    max_size: usize,
}

impl RunQueue {
    /// Create a new queue with the given maximum capacity.
    pub fn new(max_size: usize) -> Self {
        Self {
            entries: Vec::new(),
            max_size,
        }
    }

    /// Add a job to the queue. Returns an error if the queue is full or the
    /// ID already exists.
    pub fn enqueue(&mut self, job: QueuedJob) -> Result<(), QueueError> {
        if self.entries.len() >= self.max_size {
            return Err(QueueError::Full { max: self.max_size });
        }
        if self.entries.iter().any(|j| j.id == job.id) {
            return Err(QueueError::DuplicateId(job.id));
        }
        self.entries.push(job);
        Ok(())
    }

    /// Remove and return the highest-priority job (FIFO within the same
    /// priority level).
    pub fn dequeue(&mut self) -> Option<QueuedJob> {
        if self.entries.is_empty() {
            return None;
        }
        let max_pri = self.entries.iter().map(|j| j.priority).max().unwrap();
        let idx = self.entries.iter().position(|j| j.priority == max_pri).unwrap();
        Some(self.entries.remove(idx))
    }

    /// Peek at the next job that would be dequeued without removing it.
    pub fn peek(&self) -> Option<&QueuedJob> {
        let max_pri = self.entries.iter().map(|j| j.priority).max()?;
        self.entries.iter().find(|j| j.priority == max_pri)
    }

    /// Return the number of queued jobs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return `true` if the queue contains no jobs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return `true` if the queue has reached its maximum capacity.
    pub fn is_full(&self) -> bool {
        self.entries.len() >= self.max_size
    }

    /// Remove a specific job by ID, returning it if found.
    pub fn remove(&mut self, id: Uuid) -> Option<QueuedJob> {
        let pos = self.entries.iter().position(|j| j.id == id)?;
        Some(self.entries.remove(pos))
    }

    /// Remove all entries from the queue.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Return references to all jobs of the given org, oldest first (the
    /// vector is not priority-ordered; callers that need dispatch order
    /// should use [`dequeue`](Self::dequeue)).
    pub fn by_org(&self, org_id: Uuid) -> Vec<&QueuedJob> {
        self.entries.iter().filter(|j| j.org_id == org_id).collect()
    }

    /// Return references to all jobs matching the given kind.
    pub fn by_kind(&self, kind: JobKind) -> Vec<&QueuedJob> {
        self.entries.iter().filter(|j| j.kind == kind).collect()
    }

    /// Return a snapshot of queue statistics.
    pub fn stats(&self) -> QueueStats {
        let mut by_kind = BTreeMap::new();
        for entry in &self.entries {
            let key = kind_label(entry.kind);
            *by_kind.entry(key.to_string()).or_insert(0usize) += 1;
        }
        QueueStats {
            total: self.entries.len(),
            max: self.max_size,
            by_kind,
        }
    }
}

fn kind_label(kind: JobKind) -> &'static str {
    match kind {
        JobKind::Extraction => "extraction",
        JobKind::Embedding => "embedding",
        JobKind::Export => "export",
        JobKind::AckPoll => "ack_poll",
        JobKind::Retention => "retention",
    }
}
