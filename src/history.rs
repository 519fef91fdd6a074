use crate::error::Result;
use crate::schema::InvoiceStatus;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Last-seen state of an invoice id, as retained across runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    pub amount_minor: i64,
    pub status: InvoiceStatus,
    pub source_run_id: String,
}

/// The deduplicator's append-only store of previously accepted invoice ids.
///
/// Modeled as an explicit dependency so tests run against the in-memory
/// implementation and production can plug in a persistent one without
/// touching matching logic. Implementations signal unavailability through
/// `ReconciliationError::HistoryStoreUnavailable`, which aborts the run.
pub trait InvoiceHistory {
    fn lookup(&self, invoice_id: &str) -> Result<Option<HistorySnapshot>>;
    fn upsert(&mut self, invoice_id: &str, snapshot: HistorySnapshot) -> Result<()>;
}

/// Insertion-ordered in-memory store; the default for tests and single-shot
/// runs. Iteration order is deterministic, which keeps assertions stable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InMemoryHistory {
    entries: IndexMap<String, HistorySnapshot>,
}

impl InMemoryHistory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &HistorySnapshot)> {
        self.entries.iter()
    }
}

impl InvoiceHistory for InMemoryHistory {
    fn lookup(&self, invoice_id: &str) -> Result<Option<HistorySnapshot>> {
        Ok(self.entries.get(invoice_id).cloned())
    }

    fn upsert(&mut self, invoice_id: &str, snapshot: HistorySnapshot) -> Result<()> {
        self.entries.insert(invoice_id.to_string(), snapshot);
        Ok(())
    }
}
