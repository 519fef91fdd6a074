use crate::error::Result;
use crate::history::{HistorySnapshot, InvoiceHistory};
use crate::schema::InvoiceRecord;
use indexmap::IndexMap;
use log::{debug, info};

/// Removes duplicate invoice records arising from overlapping export
/// windows and from re-imported runs.
///
/// Two passes:
/// 1. In-batch collapse: records sharing an `invoice_id` reduce to one.
///    The later `source_run_id` wins; equal run ids are broken by later
///    batch position.
/// 2. History comparison: a record survives iff it is new to the history
///    or its mutable fields (`status`, `amount_minor`) changed since last
///    seen. Unchanged records are dropped silently, which makes re-running
///    the pipeline on identical input idempotent.
///
/// Every surviving record is upserted into the history.
pub fn deduplicate(
    records: Vec<InvoiceRecord>,
    history: &mut dyn InvoiceHistory,
) -> Result<Vec<InvoiceRecord>> {
    let input_count = records.len();

    let mut collapsed: IndexMap<String, InvoiceRecord> = IndexMap::new();
    for record in records {
        match collapsed.get(&record.invoice_id) {
            Some(existing) if record.source_run_id < existing.source_run_id => {
                debug!(
                    "Dropping in-batch duplicate of {} from earlier run {}",
                    record.invoice_id, record.source_run_id
                );
            }
            _ => {
                // IndexMap keeps the first-seen position on replace, so the
                // output order stays the batch order.
                collapsed.insert(record.invoice_id.clone(), record);
            }
        }
    }

    let mut accepted = Vec::with_capacity(collapsed.len());
    for (invoice_id, record) in collapsed {
        let previous = history.lookup(&invoice_id)?;
        let changed = match &previous {
            None => true,
            Some(snapshot) => {
                snapshot.amount_minor != record.amount_minor || snapshot.status != record.status
            }
        };

        if !changed {
            debug!("Dropping {} — unchanged since last seen", invoice_id);
            continue;
        }

        history.upsert(
            &invoice_id,
            HistorySnapshot {
                amount_minor: record.amount_minor,
                status: record.status,
                source_run_id: record.source_run_id.clone(),
            },
        )?;
        accepted.push(record);
    }

    info!(
        "Deduplicated {} invoice records down to {}",
        input_count,
        accepted.len()
    );
    Ok(accepted)
}
