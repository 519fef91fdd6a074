use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Which input stream a raw row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecordKind {
    Invoice,
    Document,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordKind::Invoice => write!(f, "invoice"),
            RecordKind::Document => write!(f, "document"),
        }
    }
}

/// The constraint a rejected row violated.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RowConstraint {
    #[error("missing required field '{0}'")]
    MissingField(String),

    #[error("unparseable amount '{0}'")]
    UnparseableAmount(String),

    #[error("unparseable date '{value}' in field '{field}'")]
    UnparseableDate { field: String, value: String },

    #[error("unrecognized document type '{0}'")]
    UnrecognizedDocumentType(String),

    #[error("negative amount {0}")]
    NegativeAmount(i64),

    #[error("due date {due} precedes issue date {issue}")]
    DueBeforeIssue { issue: String, due: String },
}

/// A row-level failure. Non-fatal: the row is skipped, the batch continues.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[error("{kind} row {row_index}: {constraint}")]
pub struct MalformedRow {
    pub kind: RecordKind,
    pub row_index: usize,
    pub constraint: RowConstraint,
}

/// Non-fatal conditions surfaced to the dashboard's data-quality panel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "warning", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Warning {
    /// Two documents scored identically against the same invoice; the pair
    /// was formed by the tie-break rules but deserves review.
    AmbiguousMatch {
        invoice_id: String,
        chosen_document_id: String,
        runner_up_document_id: String,
    },

    /// An invoice passed the open-for-payment filter without a matched
    /// billing document.
    UnmatchedOpenInvoice { invoice_id: String },
}

/// Side-channel collector for everything that must not be silently lost.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub malformed_rows: Vec<MalformedRow>,
    pub warnings: Vec<Warning>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_malformed(&mut self, kind: RecordKind, row_index: usize, constraint: RowConstraint) {
        let entry = MalformedRow {
            kind,
            row_index,
            constraint,
        };
        log::warn!("Skipping {}", entry);
        self.malformed_rows.push(entry);
    }

    pub fn push_warning(&mut self, warning: Warning) {
        self.warnings.push(warning);
    }

    pub fn is_empty(&self) -> bool {
        self.malformed_rows.is_empty() && self.warnings.is_empty()
    }
}
