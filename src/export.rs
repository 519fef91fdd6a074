use crate::error::Result;
use crate::metrics::PayablesMetrics;
use crate::schema::{ConsolidatedEntry, InvoiceStatus, MatchBasis};
use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::io::Write;

/// One artifact row per deduplicated invoice, matched or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ArtifactRow {
    pub invoice_id: String,
    pub vendor_name: String,
    #[schemars(description = "Invoice amount in minor units (centavos).")]
    pub amount_minor: i64,
    pub due_date: Option<NaiveDate>,
    pub status: InvoiceStatus,
    #[schemars(description = "Null when the invoice went unmatched.")]
    pub matched_document_id: Option<String>,
    pub match_basis: MatchBasis,
    pub match_score: f64,
    pub is_open: bool,
    pub days_overdue: i64,
}

/// The per-run hand-off to the dashboard and the file organizer: the full
/// consolidated dataset plus the aggregated metrics.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConsolidatedArtifact {
    pub run_id: String,
    pub run_date: NaiveDate,
    pub rows: Vec<ArtifactRow>,
    pub metrics: PayablesMetrics,
}

impl ConsolidatedArtifact {
    pub fn build(
        entries: &[ConsolidatedEntry],
        metrics: PayablesMetrics,
        run_id: &str,
        run_date: NaiveDate,
    ) -> Self {
        let rows = entries
            .iter()
            .map(|entry| {
                let invoice = entry.invoice();
                ArtifactRow {
                    invoice_id: invoice.invoice_id.clone(),
                    vendor_name: invoice.vendor_name.clone(),
                    amount_minor: invoice.amount_minor,
                    due_date: invoice.due_date,
                    status: invoice.status,
                    matched_document_id: entry
                        .pair
                        .document
                        .as_ref()
                        .map(|d| d.document_id.clone()),
                    match_basis: entry.pair.match_basis,
                    match_score: entry.pair.match_score,
                    is_open: entry.is_open,
                    days_overdue: entry.days_overdue,
                }
            })
            .collect();

        Self {
            run_id: run_id.to_string(),
            run_date,
            rows,
            metrics,
        }
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Writes the dataset rows as CSV. Dates are rendered DD/MM/YYYY and
    /// amounts in two-decimal major units, the layout the review
    /// spreadsheets use; the metrics block travels in the JSON form only.
    pub fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record([
            "invoice_id",
            "vendor_name",
            "amount",
            "due_date",
            "status",
            "matched_document_id",
            "match_basis",
            "match_score",
            "is_open",
            "days_overdue",
        ])?;

        for row in &self.rows {
            let amount = crate::utils::format_amount_major(row.amount_minor);
            let due_date = row
                .due_date
                .map(|d| d.format("%d/%m/%Y").to_string())
                .unwrap_or_default();
            let score = format!("{:.4}", row.match_score);
            let days_overdue = row.days_overdue.to_string();
            csv_writer.write_record([
                row.invoice_id.as_str(),
                row.vendor_name.as_str(),
                amount.as_str(),
                due_date.as_str(),
                row.status.as_str(),
                row.matched_document_id.as_deref().unwrap_or(""),
                row.match_basis.as_str(),
                score.as_str(),
                if row.is_open { "true" } else { "false" },
                days_overdue.as_str(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(ConsolidatedArtifact)
    }

    pub fn schema_as_json() -> Result<String> {
        Ok(serde_json::to_string_pretty(&Self::generate_json_schema())?)
    }
}
