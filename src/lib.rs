//! # Payables Reconciler
//!
//! A library for reconciling invoice data exported from an ERP client with
//! billing documents (boletos / notas fiscais) retrieved from email,
//! producing a consolidated, deduplicated payables dataset for reporting.
//!
//! ## Core Concepts
//!
//! - **Normalization**: loosely typed export rows become strongly typed
//!   canonical records at the boundary; everything downstream is type-checked
//! - **Deduplication**: overlapping export windows and re-imported runs are
//!   collapsed against an append-only history of seen invoice ids
//! - **Matching**: each invoice pairs with at most one document, by exact
//!   reference or by a scored vendor/amount/date comparison, assigned
//!   greedily over a globally sorted candidate list
//! - **Filtering**: configurable business rules select the invoices open
//!   for payment
//! - **Aggregation**: per-vendor totals and due-date aging buckets feed the
//!   reporting dashboard, alongside the consolidated artifact
//!
//! ## Example
//!
//! ```rust,ignore
//! use payables_reconciler::*;
//! use chrono::NaiveDate;
//!
//! let batch = RawBatch {
//!     invoice_rows: load_erp_export(),
//!     document_rows: load_extracted_documents(),
//!     run_id: "2024-07-31".to_string(),
//!     run_date: NaiveDate::from_ymd_opt(2024, 7, 31).unwrap(),
//! };
//!
//! let mut history = InMemoryHistory::new();
//! let config = ReconcilerConfig::default();
//!
//! let outcome = reconcile_batch(&batch, &mut history, &config)?;
//! println!("{}", outcome.artifact.to_json()?);
//! ```

pub mod dedup;
pub mod diagnostics;
pub mod error;
pub mod export;
pub mod filter;
pub mod history;
pub mod matcher;
pub mod metrics;
pub mod normalizer;
pub mod schema;
pub mod utils;

pub use diagnostics::{Diagnostics, MalformedRow, RecordKind, RowConstraint, Warning};
pub use error::{ReconciliationError, Result};
pub use export::{ArtifactRow, ConsolidatedArtifact};
pub use history::{HistorySnapshot, InMemoryHistory, InvoiceHistory};
pub use metrics::{AgingSummary, PayablesMetrics};
pub use schema::*;

use log::info;

/// Everything a single pipeline run produces.
#[derive(Debug)]
pub struct ReconciliationOutcome {
    pub artifact: ConsolidatedArtifact,
    pub entries: Vec<ConsolidatedEntry>,
    pub metrics: PayablesMetrics,
    pub diagnostics: Diagnostics,
}

pub struct ReconciliationProcessor;

impl ReconciliationProcessor {
    /// Runs the full pipeline over one raw batch:
    /// normalize -> deduplicate -> match -> consolidate -> filter ->
    /// aggregate -> artifact.
    ///
    /// Row-level problems are collected into the outcome's diagnostics;
    /// only structural failures, an invalid configuration, or an
    /// unavailable history store abort the run.
    pub fn process(
        batch: &RawBatch,
        history: &mut dyn InvoiceHistory,
        config: &ReconcilerConfig,
    ) -> Result<ReconciliationOutcome> {
        validate_config(config)?;

        info!(
            "Reconciling batch {} ({} invoice rows, {} document rows)",
            batch.run_id,
            batch.invoice_rows.len(),
            batch.document_rows.len()
        );

        let mut diagnostics = Diagnostics::new();

        let invoices = normalizer::normalize_invoice_rows(
            &batch.invoice_rows,
            &batch.run_id,
            config,
            &mut diagnostics,
        )?;
        let documents =
            normalizer::normalize_document_rows(&batch.document_rows, config, &mut diagnostics)?;

        let deduplicated = dedup::deduplicate(invoices, history)?;
        let pairs = matcher::match_invoices(deduplicated, documents, config, &mut diagnostics);
        let entries = filter::consolidate(pairs, batch.run_date, config);

        let open = filter::open_entries(&entries);
        let metrics = PayablesMetrics::compute(&open, &mut diagnostics);

        let artifact =
            ConsolidatedArtifact::build(&entries, metrics.clone(), &batch.run_id, batch.run_date);

        Ok(ReconciliationOutcome {
            artifact,
            entries,
            metrics,
            diagnostics,
        })
    }
}

/// Convenience wrapper around [`ReconciliationProcessor::process`].
pub fn reconcile_batch(
    batch: &RawBatch,
    history: &mut dyn InvoiceHistory,
    config: &ReconcilerConfig,
) -> Result<ReconciliationOutcome> {
    ReconciliationProcessor::process(batch, history, config)
}

fn validate_config(config: &ReconcilerConfig) -> Result<()> {
    if !(0.0..=1.0).contains(&config.vendor_similarity_threshold) {
        return Err(ReconciliationError::InvalidConfig(format!(
            "vendor_similarity_threshold {} must be between 0.0 and 1.0",
            config.vendor_similarity_threshold
        )));
    }
    if config.amount_tolerance_minor_units < 0 {
        return Err(ReconciliationError::InvalidConfig(format!(
            "amount_tolerance_minor_units {} must not be negative",
            config.amount_tolerance_minor_units
        )));
    }
    if config.date_window_days < 0 {
        return Err(ReconciliationError::InvalidConfig(format!(
            "date_window_days {} must not be negative",
            config.date_window_days
        )));
    }
    if config.lookahead_days < 0 {
        return Err(ReconciliationError::InvalidConfig(format!(
            "lookahead_days {} must not be negative",
            config.lookahead_days
        )));
    }
    if config.min_days_overdue < 0 {
        return Err(ReconciliationError::InvalidConfig(format!(
            "min_days_overdue {} must not be negative",
            config.min_days_overdue
        )));
    }
    if config.date_formats.is_empty() {
        return Err(ReconciliationError::InvalidConfig(
            "date_formats must contain at least one format".to_string(),
        ));
    }
    Ok(())
}
