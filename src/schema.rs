use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

use crate::utils::fold_text;

/// A loosely typed export row: column name -> raw cell value.
/// This representation never crosses the normalizer boundary.
pub type RawRow = HashMap<String, String>;

/// One run's worth of raw input, as handed over by the surrounding
/// orchestration (ERP export driver and email retrieval service).
#[derive(Debug, Clone)]
pub struct RawBatch {
    pub invoice_rows: Vec<RawRow>,
    pub document_rows: Vec<RawRow>,
    /// Default `source_run_id` for invoice rows that do not carry their own.
    pub run_id: String,
    /// The "today" used for aging and the due-date filter.
    pub run_date: NaiveDate,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    Open,
    Paid,
    Cancelled,
    Unknown,
}

impl InvoiceStatus {
    /// Maps raw ERP status spellings (including the Portuguese ones the
    /// export uses) onto the canonical enum. Unrecognized values become
    /// `Unknown` rather than failing the row.
    pub fn parse(raw: &str) -> Self {
        match fold_text(raw).as_str() {
            "open" | "aberto" | "em aberto" => InvoiceStatus::Open,
            "paid" | "pago" | "paga" => InvoiceStatus::Paid,
            "cancelled" | "canceled" | "cancelado" | "cancelada" => InvoiceStatus::Cancelled,
            _ => InvoiceStatus::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Open => "OPEN",
            InvoiceStatus::Paid => "PAID",
            InvoiceStatus::Cancelled => "CANCELLED",
            InvoiceStatus::Unknown => "UNKNOWN",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentType {
    Boleto,
    NotaFiscal,
}

impl DocumentType {
    pub fn parse(raw: &str) -> Option<Self> {
        match fold_text(raw).as_str() {
            "boleto" => Some(DocumentType::Boleto),
            "nota_fiscal" | "nota fiscal" | "nf" | "nfe" | "nf-e" => Some(DocumentType::NotaFiscal),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchBasis {
    ExactId,
    AmountVendorDate,
    Unmatched,
}

impl MatchBasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchBasis::ExactId => "EXACT_ID",
            MatchBasis::AmountVendorDate => "AMOUNT_VENDOR_DATE",
            MatchBasis::Unmatched => "UNMATCHED",
        }
    }
}

/// One ERP-exported payable line, in canonical form.
///
/// Amounts are integer minor units (centavos) to avoid float error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceRecord {
    /// Unique per vendor + invoice-number combination.
    pub invoice_id: String,
    pub vendor_id: String,
    pub vendor_name: String,
    pub amount_minor: i64,
    pub issue_date: NaiveDate,
    pub due_date: Option<NaiveDate>,
    pub status: InvoiceStatus,
    /// Identifies which export run produced this record.
    pub source_run_id: String,
    /// Ledger account the payable is posted against, when exported.
    pub account_code: Option<String>,
}

/// One billing document (boleto / nota fiscal) extracted from email.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub document_id: String,
    pub vendor_name_raw: String,
    pub amount_minor: i64,
    pub reference_date: NaiveDate,
    pub document_type: DocumentType,
    pub source_message_id: String,
}

/// Association between an invoice and at most one billing document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchedPair {
    pub invoice: InvoiceRecord,
    pub document: Option<DocumentRecord>,
    pub match_score: f64,
    pub match_basis: MatchBasis,
}

/// Final reporting row: a matched pair plus the derived payment fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsolidatedEntry {
    pub pair: MatchedPair,
    pub is_open: bool,
    pub days_overdue: i64,
}

impl ConsolidatedEntry {
    pub fn invoice(&self) -> &InvoiceRecord {
        &self.pair.invoice
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReconcilerConfig {
    #[schemars(
        description = "Maximum difference in minor units for a document amount to count as matching an invoice amount. 0 means the amounts must be identical."
    )]
    pub amount_tolerance_minor_units: i64,

    #[schemars(
        description = "Half-width in days of the window within which date proximity improves a fuzzy match score. Proximity never gates eligibility."
    )]
    pub date_window_days: i64,

    #[schemars(
        description = "Minimum Jaro-Winkler similarity (after case/diacritic folding) between vendor names for a fuzzy candidate to be eligible. Range 0.0 to 1.0."
    )]
    pub vendor_similarity_threshold: f64,

    #[schemars(description = "Statuses considered open for payment.")]
    pub include_statuses: BTreeSet<InvoiceStatus>,

    #[schemars(
        description = "Invoices due up to this many days in the future still qualify as open. 0 restricts the filter to invoices already due."
    )]
    pub lookahead_days: i64,

    #[schemars(description = "Minimum days overdue for an invoice to pass the filter.")]
    pub min_days_overdue: i64,

    #[schemars(description = "Drop cancelled invoices from the open set regardless of include_statuses.")]
    pub exclude_cancelled: bool,

    #[schemars(
        description = "When set, only invoices posted against this ledger account pass the filter."
    )]
    pub account_code: Option<String>,

    #[schemars(
        description = "Accepted date formats (chrono strftime syntax), tried in order; first successful parse wins."
    )]
    pub date_formats: Vec<String>,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            amount_tolerance_minor_units: 0,
            date_window_days: 5,
            vendor_similarity_threshold: 0.8,
            include_statuses: BTreeSet::from([InvoiceStatus::Open]),
            lookahead_days: 0,
            min_days_overdue: 0,
            exclude_cancelled: true,
            account_code: None,
            date_formats: vec![
                "%d/%m/%Y".to_string(),
                "%Y-%m-%d".to_string(),
                "%d.%m.%Y".to_string(),
            ],
        }
    }
}
