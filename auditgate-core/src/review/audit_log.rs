use std::fmt;

use async_trait::async_trait;
use auditgate_model::{AuditLogEntry, EntryId, RecordId, ReviewAction};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;

use crate::error::Result;

/// Entry contents supplied by the workflow; the log assigns id and time.
#[derive(Clone, Debug, PartialEq)]
pub struct NewAuditEntry {
    pub record_id: RecordId,
    pub action: ReviewAction,
    pub actor_id: String,
    pub details: serde_json::Value,
}

/// Append-only store of review decisions.
///
/// Implementations hand out strictly increasing entry ids and non-decreasing
/// timestamps in append order. Entries are never updated or removed.
#[async_trait]
pub trait AuditLog: Send + Sync {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry>;

    /// Entries for one record in append order.
    async fn entries_for(&self, record_id: RecordId)
    -> Result<Vec<AuditLogEntry>>;

    async fn count(&self) -> Result<usize>;
}

#[derive(Default)]
struct LogState {
    entries: Vec<AuditLogEntry>,
    next_id: u64,
    last_timestamp: Option<DateTime<Utc>>,
}

#[derive(Default)]
pub struct InMemoryAuditLog {
    state: Mutex<LogState>,
}

impl fmt::Debug for InMemoryAuditLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemoryAuditLog")
            .field("entries", &self.state.lock().entries.len())
            .finish()
    }
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every entry in append order.
    pub fn snapshot(&self) -> Vec<AuditLogEntry> {
        self.state.lock().entries.clone()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, entry: NewAuditEntry) -> Result<AuditLogEntry> {
        let mut state = self.state.lock();

        state.next_id += 1;
        // Wall clocks can step backwards; the log never does.
        let now = Utc::now();
        let timestamp = match state.last_timestamp {
            Some(last) if last > now => last,
            _ => now,
        };
        state.last_timestamp = Some(timestamp);

        let stored = AuditLogEntry {
            entry_id: EntryId(state.next_id),
            review_record_ref: entry.record_id,
            action: entry.action,
            actor_id: entry.actor_id,
            timestamp,
            details: entry.details,
        };
        state.entries.push(stored.clone());
        Ok(stored)
    }

    async fn entries_for(
        &self,
        record_id: RecordId,
    ) -> Result<Vec<AuditLogEntry>> {
        Ok(self
            .state
            .lock()
            .entries
            .iter()
            .filter(|entry| entry.review_record_ref == record_id)
            .cloned()
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.state.lock().entries.len())
    }
}
