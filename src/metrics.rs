use crate::diagnostics::{Diagnostics, Warning};
use crate::schema::ConsolidatedEntry;
use log::info;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Open amounts grouped by days overdue. Lower bounds are inclusive: an
/// entry exactly 30 days overdue lands in the first bucket, 31 in the
/// second.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AgingSummary {
    pub days_0_to_30: i64,
    pub days_31_to_60: i64,
    pub days_61_to_90: i64,
    pub over_90: i64,
}

impl AgingSummary {
    fn add(&mut self, days_overdue: i64, amount_minor: i64) {
        match days_overdue {
            0..=30 => self.days_0_to_30 += amount_minor,
            31..=60 => self.days_31_to_60 += amount_minor,
            61..=90 => self.days_61_to_90 += amount_minor,
            _ => self.over_90 += amount_minor,
        }
    }
}

/// Aggregated reporting metrics over the open-for-payment set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PayablesMetrics {
    #[schemars(description = "Sum of all open invoice amounts, in minor units.")]
    pub total_open_minor: i64,

    #[schemars(description = "Number of invoices open for payment.")]
    pub open_invoice_count: usize,

    #[schemars(description = "Open amount per vendor name, in minor units.")]
    pub by_vendor: BTreeMap<String, i64>,

    #[schemars(description = "Open amount per aging bucket.")]
    pub aging: AgingSummary,

    #[schemars(
        description = "Open invoices with no matched billing document; a data-quality signal for the dashboard."
    )]
    pub unmatched_open_count: usize,
}

impl PayablesMetrics {
    /// Computes the metrics over the filtered set. Deterministic for a given
    /// input: grouping uses ordered maps and no aggregation depends on the
    /// permutation of equal keys. Each unmatched open invoice also raises a
    /// diagnostics warning.
    pub fn compute(open: &[&ConsolidatedEntry], diagnostics: &mut Diagnostics) -> Self {
        let mut metrics = PayablesMetrics {
            open_invoice_count: open.len(),
            ..Default::default()
        };

        for entry in open {
            let invoice = entry.invoice();
            metrics.total_open_minor += invoice.amount_minor;
            *metrics
                .by_vendor
                .entry(invoice.vendor_name.clone())
                .or_insert(0) += invoice.amount_minor;
            metrics.aging.add(entry.days_overdue, invoice.amount_minor);

            if entry.pair.document.is_none() {
                metrics.unmatched_open_count += 1;
                diagnostics.push_warning(Warning::UnmatchedOpenInvoice {
                    invoice_id: invoice.invoice_id.clone(),
                });
            }
        }

        info!(
            "Aggregated {} open invoices totalling {} minor units ({} unmatched)",
            metrics.open_invoice_count, metrics.total_open_minor, metrics.unmatched_open_count
        );
        metrics
    }
}
