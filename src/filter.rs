use crate::schema::{ConsolidatedEntry, InvoiceRecord, InvoiceStatus, MatchedPair, ReconcilerConfig};
use crate::utils::days_between;
use chrono::NaiveDate;
use log::info;

/// Derives the reporting fields for every matched pair.
///
/// All pairs are consolidated — open or not — so the output artifact keeps
/// one row per deduplicated invoice; `is_open` records the filter outcome.
pub fn consolidate(
    pairs: Vec<MatchedPair>,
    run_date: NaiveDate,
    config: &ReconcilerConfig,
) -> Vec<ConsolidatedEntry> {
    let entries: Vec<ConsolidatedEntry> = pairs
        .into_iter()
        .map(|pair| {
            let days_overdue = pair
                .invoice
                .due_date
                .map(|due| days_between(due, run_date).max(0))
                .unwrap_or(0);
            let is_open = qualifies_as_open(&pair.invoice, days_overdue, run_date, config);
            ConsolidatedEntry {
                pair,
                is_open,
                days_overdue,
            }
        })
        .collect();

    info!(
        "Consolidated {} entries, {} open for payment",
        entries.len(),
        entries.iter().filter(|e| e.is_open).count()
    );
    entries
}

/// The open-for-payment subset, for the aggregator.
pub fn open_entries(entries: &[ConsolidatedEntry]) -> Vec<&ConsolidatedEntry> {
    entries.iter().filter(|entry| entry.is_open).collect()
}

fn qualifies_as_open(
    invoice: &InvoiceRecord,
    days_overdue: i64,
    run_date: NaiveDate,
    config: &ReconcilerConfig,
) -> bool {
    if !config.include_statuses.contains(&invoice.status) {
        return false;
    }
    if config.exclude_cancelled && invoice.status == InvoiceStatus::Cancelled {
        return false;
    }
    if let Some(required_account) = &config.account_code {
        if invoice.account_code.as_deref() != Some(required_account.as_str()) {
            return false;
        }
    }

    // Invoices with no due date are never ripe for payment.
    let due = match invoice.due_date {
        Some(due) => due,
        None => return false,
    };
    if days_between(run_date, due) > config.lookahead_days {
        return false;
    }

    days_overdue >= config.min_days_overdue
}
