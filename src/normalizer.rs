use crate::diagnostics::{Diagnostics, RecordKind, RowConstraint};
use crate::error::{ReconciliationError, Result};
use crate::schema::{
    DocumentRecord, DocumentType, InvoiceRecord, InvoiceStatus, RawRow, ReconcilerConfig,
};
use crate::utils::{fold_text, parse_amount_minor, parse_date_any};
use chrono::NaiveDate;
use log::{debug, info};

const REQUIRED_INVOICE_COLUMNS: [&str; 6] = [
    "invoice_number",
    "vendor",
    "amount",
    "issue_date",
    "due_date",
    "status",
];

const REQUIRED_DOCUMENT_COLUMNS: [&str; 5] = [
    "document_id_or_reference",
    "vendor",
    "amount",
    "reference_date",
    "type",
];

/// Converts raw ERP export rows into canonical invoice records.
///
/// Row-level failures are recorded in `diagnostics` and the row skipped;
/// structural failures (no rows at all, a required column absent from every
/// row) abort with a top-level error.
pub fn normalize_invoice_rows(
    rows: &[RawRow],
    batch_run_id: &str,
    config: &ReconcilerConfig,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<InvoiceRecord>> {
    if rows.is_empty() {
        return Err(ReconciliationError::EmptyBatch("invoice rows"));
    }
    check_columns(rows, &REQUIRED_INVOICE_COLUMNS, "invoice")?;

    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        match normalize_invoice_row(row, index, batch_run_id, config, diagnostics) {
            Some(record) => records.push(record),
            None => continue,
        }
    }

    info!(
        "Normalized {} of {} invoice rows ({} rejected)",
        records.len(),
        rows.len(),
        rows.len() - records.len()
    );
    Ok(records)
}

/// Converts raw extracted-document rows into canonical document records.
///
/// An empty document set is legal (every invoice simply goes unmatched), so
/// only the column structure is enforced when rows are present.
pub fn normalize_document_rows(
    rows: &[RawRow],
    config: &ReconcilerConfig,
    diagnostics: &mut Diagnostics,
) -> Result<Vec<DocumentRecord>> {
    if rows.is_empty() {
        debug!("No document rows in batch; all invoices will be unmatched");
        return Ok(Vec::new());
    }
    check_columns(rows, &REQUIRED_DOCUMENT_COLUMNS, "document")?;

    let mut records = Vec::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        match normalize_document_row(row, index, config, diagnostics) {
            Some(record) => records.push(record),
            None => continue,
        }
    }

    info!(
        "Normalized {} of {} document rows ({} rejected)",
        records.len(),
        rows.len(),
        rows.len() - records.len()
    );
    Ok(records)
}

fn check_columns(rows: &[RawRow], required: &[&'static str], kind: &'static str) -> Result<()> {
    for column in required {
        if !rows.iter().any(|row| row.contains_key(*column)) {
            return Err(ReconciliationError::MissingColumn { kind, column });
        }
    }
    Ok(())
}

/// A trimmed, non-empty cell value, or `None`.
fn field<'a>(row: &'a RawRow, column: &str) -> Option<&'a str> {
    row.get(column).map(|v| v.trim()).filter(|v| !v.is_empty())
}

fn normalize_invoice_row(
    row: &RawRow,
    index: usize,
    batch_run_id: &str,
    config: &ReconcilerConfig,
    diagnostics: &mut Diagnostics,
) -> Option<InvoiceRecord> {
    let invoice_number = match field(row, "invoice_number") {
        Some(v) => v,
        None => {
            diagnostics.push_malformed(
                RecordKind::Invoice,
                index,
                RowConstraint::MissingField("invoice_number".to_string()),
            );
            return None;
        }
    };
    let vendor = match field(row, "vendor") {
        Some(v) => v,
        None => {
            diagnostics.push_malformed(
                RecordKind::Invoice,
                index,
                RowConstraint::MissingField("vendor".to_string()),
            );
            return None;
        }
    };
    let status = match field(row, "status") {
        Some(v) => InvoiceStatus::parse(v),
        None => {
            diagnostics.push_malformed(
                RecordKind::Invoice,
                index,
                RowConstraint::MissingField("status".to_string()),
            );
            return None;
        }
    };

    let amount_minor = parse_field_amount(row, "amount", index, RecordKind::Invoice, diagnostics)?;
    if amount_minor < 0 {
        diagnostics.push_malformed(
            RecordKind::Invoice,
            index,
            RowConstraint::NegativeAmount(amount_minor),
        );
        return None;
    }

    let issue_date =
        parse_field_date(row, "issue_date", true, config, index, RecordKind::Invoice, diagnostics)?;
    let due_date = match field(row, "due_date") {
        None => None,
        Some(raw) => match parse_date_any(raw, &config.date_formats) {
            Some(date) => Some(date),
            None => {
                diagnostics.push_malformed(
                    RecordKind::Invoice,
                    index,
                    RowConstraint::UnparseableDate {
                        field: "due_date".to_string(),
                        value: raw.to_string(),
                    },
                );
                return None;
            }
        },
    };

    if let Some(due) = due_date {
        if due < issue_date {
            diagnostics.push_malformed(
                RecordKind::Invoice,
                index,
                RowConstraint::DueBeforeIssue {
                    issue: issue_date.to_string(),
                    due: due.to_string(),
                },
            );
            return None;
        }
    }

    Some(InvoiceRecord {
        invoice_id: invoice_number.to_string(),
        vendor_id: field(row, "vendor_id")
            .map(str::to_string)
            .unwrap_or_else(|| fold_text(vendor)),
        vendor_name: vendor.to_string(),
        amount_minor,
        issue_date,
        due_date,
        status,
        source_run_id: field(row, "source_run_id")
            .map(str::to_string)
            .unwrap_or_else(|| batch_run_id.to_string()),
        account_code: field(row, "account_code").map(str::to_string),
    })
}

fn normalize_document_row(
    row: &RawRow,
    index: usize,
    config: &ReconcilerConfig,
    diagnostics: &mut Diagnostics,
) -> Option<DocumentRecord> {
    let document_id = match field(row, "document_id_or_reference") {
        Some(v) => v,
        None => {
            diagnostics.push_malformed(
                RecordKind::Document,
                index,
                RowConstraint::MissingField("document_id_or_reference".to_string()),
            );
            return None;
        }
    };
    let vendor = match field(row, "vendor") {
        Some(v) => v,
        None => {
            diagnostics.push_malformed(
                RecordKind::Document,
                index,
                RowConstraint::MissingField("vendor".to_string()),
            );
            return None;
        }
    };
    let document_type = match field(row, "type") {
        Some(raw) => match DocumentType::parse(raw) {
            Some(t) => t,
            None => {
                diagnostics.push_malformed(
                    RecordKind::Document,
                    index,
                    RowConstraint::UnrecognizedDocumentType(raw.to_string()),
                );
                return None;
            }
        },
        None => {
            diagnostics.push_malformed(
                RecordKind::Document,
                index,
                RowConstraint::MissingField("type".to_string()),
            );
            return None;
        }
    };

    let amount_minor = parse_field_amount(row, "amount", index, RecordKind::Document, diagnostics)?;
    if amount_minor < 0 {
        diagnostics.push_malformed(
            RecordKind::Document,
            index,
            RowConstraint::NegativeAmount(amount_minor),
        );
        return None;
    }

    let reference_date =
        parse_field_date(row, "reference_date", true, config, index, RecordKind::Document, diagnostics)?;

    Some(DocumentRecord {
        document_id: document_id.to_string(),
        vendor_name_raw: vendor.to_string(),
        amount_minor,
        reference_date,
        document_type,
        source_message_id: field(row, "source_message_id")
            .map(str::to_string)
            .unwrap_or_else(|| format!("row-{}", index)),
    })
}

fn parse_field_amount(
    row: &RawRow,
    column: &str,
    index: usize,
    kind: RecordKind,
    diagnostics: &mut Diagnostics,
) -> Option<i64> {
    let raw = match field(row, column) {
        Some(v) => v,
        None => {
            diagnostics.push_malformed(kind, index, RowConstraint::MissingField(column.to_string()));
            return None;
        }
    };
    match parse_amount_minor(raw) {
        Some(amount) => Some(amount),
        None => {
            diagnostics.push_malformed(kind, index, RowConstraint::UnparseableAmount(raw.to_string()));
            None
        }
    }
}

fn parse_field_date(
    row: &RawRow,
    column: &str,
    required: bool,
    config: &ReconcilerConfig,
    index: usize,
    kind: RecordKind,
    diagnostics: &mut Diagnostics,
) -> Option<NaiveDate> {
    let raw = match field(row, column) {
        Some(v) => v,
        None => {
            if required {
                diagnostics.push_malformed(kind, index, RowConstraint::MissingField(column.to_string()));
            }
            return None;
        }
    };
    match parse_date_any(raw, &config.date_formats) {
        Some(date) => Some(date),
        None => {
            diagnostics.push_malformed(
                kind,
                index,
                RowConstraint::UnparseableDate {
                    field: column.to_string(),
                    value: raw.to_string(),
                },
            );
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invoice_row(pairs: &[(&str, &str)]) -> RawRow {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn base_invoice_row() -> RawRow {
        invoice_row(&[
            ("invoice_number", "INV-100"),
            ("vendor", "Acme Ltda"),
            ("amount", "1.500,00"),
            ("issue_date", "02/01/2024"),
            ("due_date", "10/01/2024"),
            ("status", "Aberto"),
        ])
    }

    #[test]
    fn test_normalize_invoice_row_happy_path() {
        let config = ReconcilerConfig::default();
        let mut diagnostics = Diagnostics::new();
        let records =
            normalize_invoice_rows(&[base_invoice_row()], "run-1", &config, &mut diagnostics)
                .unwrap();

        assert_eq!(records.len(), 1);
        let record = &records[0];
        assert_eq!(record.invoice_id, "INV-100");
        assert_eq!(record.amount_minor, 150_000);
        assert_eq!(record.status, InvoiceStatus::Open);
        assert_eq!(record.source_run_id, "run-1");
        assert_eq!(record.vendor_id, "acme ltda");
        assert!(diagnostics.is_empty());
    }

    #[test]
    fn test_bad_rows_are_skipped_not_fatal() {
        let config = ReconcilerConfig::default();
        let mut diagnostics = Diagnostics::new();

        let mut bad_amount = base_invoice_row();
        bad_amount.insert("amount".to_string(), "garbage".to_string());
        let mut bad_date = base_invoice_row();
        bad_date.insert("issue_date".to_string(), "31/31/2024".to_string());

        let rows = vec![base_invoice_row(), bad_amount, bad_date];
        let records = normalize_invoice_rows(&rows, "run-1", &config, &mut diagnostics).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(diagnostics.malformed_rows.len(), 2);
        assert_eq!(diagnostics.malformed_rows[0].row_index, 1);
        assert_eq!(diagnostics.malformed_rows[1].row_index, 2);
    }

    #[test]
    fn test_due_before_issue_rejected() {
        let config = ReconcilerConfig::default();
        let mut diagnostics = Diagnostics::new();
        let mut row = base_invoice_row();
        row.insert("due_date".to_string(), "01/01/2024".to_string());

        let records = normalize_invoice_rows(&[row], "run-1", &config, &mut diagnostics).unwrap();
        assert!(records.is_empty());
        assert!(matches!(
            diagnostics.malformed_rows[0].constraint,
            RowConstraint::DueBeforeIssue { .. }
        ));
    }

    #[test]
    fn test_absent_due_date_is_allowed() {
        let config = ReconcilerConfig::default();
        let mut diagnostics = Diagnostics::new();
        let mut row = base_invoice_row();
        row.insert("due_date".to_string(), "".to_string());

        let records = normalize_invoice_rows(&[row], "run-1", &config, &mut diagnostics).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].due_date, None);
    }

    #[test]
    fn test_empty_invoice_batch_is_fatal() {
        let config = ReconcilerConfig::default();
        let mut diagnostics = Diagnostics::new();
        let err = normalize_invoice_rows(&[], "run-1", &config, &mut diagnostics).unwrap_err();
        assert!(matches!(err, ReconciliationError::EmptyBatch(_)));
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let config = ReconcilerConfig::default();
        let mut diagnostics = Diagnostics::new();
        let row = invoice_row(&[("invoice_number", "INV-1"), ("vendor", "Acme")]);
        let err = normalize_invoice_rows(&[row], "run-1", &config, &mut diagnostics).unwrap_err();
        assert!(matches!(
            err,
            ReconciliationError::MissingColumn { kind: "invoice", .. }
        ));
    }

    #[test]
    fn test_extra_columns_ignored() {
        let config = ReconcilerConfig::default();
        let mut diagnostics = Diagnostics::new();
        let mut row = base_invoice_row();
        row.insert("unrelated".to_string(), "whatever".to_string());

        let records = normalize_invoice_rows(&[row], "run-1", &config, &mut diagnostics).unwrap();
        assert_eq!(records.len(), 1);
    }

    #[test]
    fn test_normalize_document_row() {
        let config = ReconcilerConfig::default();
        let mut diagnostics = Diagnostics::new();
        let row = invoice_row(&[
            ("document_id_or_reference", "INV-100"),
            ("vendor", "ACME LTDA"),
            ("amount", "1500,00"),
            ("reference_date", "09/01/2024"),
            ("type", "boleto"),
            ("source_message_id", "msg-001"),
        ]);

        let records = normalize_document_rows(&[row], &config, &mut diagnostics).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].amount_minor, 150_000);
        assert_eq!(records[0].document_type, DocumentType::Boleto);
        assert_eq!(records[0].source_message_id, "msg-001");
    }

    #[test]
    fn test_empty_document_set_is_legal() {
        let config = ReconcilerConfig::default();
        let mut diagnostics = Diagnostics::new();
        let records = normalize_document_rows(&[], &config, &mut diagnostics).unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_unrecognized_document_type_rejected() {
        let config = ReconcilerConfig::default();
        let mut diagnostics = Diagnostics::new();
        let row = invoice_row(&[
            ("document_id_or_reference", "X-1"),
            ("vendor", "Acme"),
            ("amount", "10,00"),
            ("reference_date", "09/01/2024"),
            ("type", "recibo"),
        ]);

        let records = normalize_document_rows(&[row], &config, &mut diagnostics).unwrap();
        assert!(records.is_empty());
        assert!(matches!(
            diagnostics.malformed_rows[0].constraint,
            RowConstraint::UnrecognizedDocumentType(_)
        ));
    }
}
