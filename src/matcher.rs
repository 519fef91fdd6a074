use crate::diagnostics::{Diagnostics, Warning};
use crate::schema::{DocumentRecord, InvoiceRecord, MatchBasis, MatchedPair, ReconcilerConfig};
use crate::utils::{days_between, vendor_similarity};
use log::info;

// Fuzzy score composition. Amount equality is a hard eligibility gate, so
// its weight is a constant contribution once a candidate exists; vendor
// similarity dominates the variable part and date proximity only nudges
// ranking inside the window.
const VENDOR_WEIGHT: f64 = 0.60;
const AMOUNT_WEIGHT: f64 = 0.25;
const DATE_WEIGHT: f64 = 0.15;

#[derive(Debug, Clone, Copy)]
struct Candidate {
    invoice_idx: usize,
    document_idx: usize,
    basis: MatchBasis,
    score: f64,
    date_distance: i64,
}

/// Pairs each invoice with zero or one billing document.
///
/// Candidates are generated in two forms — exact reference matches
/// (score 1.0) and fuzzy vendor/amount/date matches — then assigned in a
/// single greedy pass over the globally sorted candidate list. Global
/// ordering prevents a lower-quality invoice from claiming a document a
/// better-matching invoice needs; no document is ever claimed twice, and
/// every invoice yields a pair even when unmatched.
pub fn match_invoices(
    invoices: Vec<InvoiceRecord>,
    documents: Vec<DocumentRecord>,
    config: &ReconcilerConfig,
    diagnostics: &mut Diagnostics,
) -> Vec<MatchedPair> {
    let mut candidates = generate_candidates(&invoices, &documents, config);

    candidates.sort_by(|a, b| {
        basis_rank(a.basis)
            .cmp(&basis_rank(b.basis))
            .then_with(|| b.score.total_cmp(&a.score))
            .then_with(|| a.date_distance.cmp(&b.date_distance))
            .then_with(|| {
                documents[a.document_idx]
                    .source_message_id
                    .cmp(&documents[b.document_idx].source_message_id)
            })
            .then_with(|| a.invoice_idx.cmp(&b.invoice_idx))
            .then_with(|| a.document_idx.cmp(&b.document_idx))
    });

    let mut claimed_invoice = vec![false; invoices.len()];
    let mut claimed_document = vec![false; documents.len()];
    let mut chosen: Vec<Option<Candidate>> = vec![None; invoices.len()];

    for idx in 0..candidates.len() {
        let candidate = candidates[idx];
        if claimed_invoice[candidate.invoice_idx] || claimed_document[candidate.document_idx] {
            continue;
        }
        claimed_invoice[candidate.invoice_idx] = true;
        claimed_document[candidate.document_idx] = true;

        // A same-score runner-up that was still claimable means the
        // tie-break rules, not the score, decided this pair.
        if let Some(runner_up) = candidates[idx + 1..].iter().find(|other| {
            other.invoice_idx == candidate.invoice_idx
                && other.score == candidate.score
                && !claimed_document[other.document_idx]
        }) {
            diagnostics.push_warning(Warning::AmbiguousMatch {
                invoice_id: invoices[candidate.invoice_idx].invoice_id.clone(),
                chosen_document_id: documents[candidate.document_idx].document_id.clone(),
                runner_up_document_id: documents[runner_up.document_idx].document_id.clone(),
            });
        }

        chosen[candidate.invoice_idx] = Some(candidate);
    }

    let mut remaining: Vec<Option<DocumentRecord>> = documents.into_iter().map(Some).collect();
    let pairs: Vec<MatchedPair> = invoices
        .into_iter()
        .enumerate()
        .map(|(idx, invoice)| match chosen[idx] {
            Some(candidate) => MatchedPair {
                invoice,
                document: remaining[candidate.document_idx].take(),
                match_score: candidate.score,
                match_basis: candidate.basis,
            },
            None => MatchedPair {
                invoice,
                document: None,
                match_score: 0.0,
                match_basis: MatchBasis::Unmatched,
            },
        })
        .collect();

    let exact = pairs
        .iter()
        .filter(|p| p.match_basis == MatchBasis::ExactId)
        .count();
    let fuzzy = pairs
        .iter()
        .filter(|p| p.match_basis == MatchBasis::AmountVendorDate)
        .count();
    info!(
        "Matched {} invoices: {} exact, {} fuzzy, {} unmatched",
        pairs.len(),
        exact,
        fuzzy,
        pairs.len() - exact - fuzzy
    );

    pairs
}

fn generate_candidates(
    invoices: &[InvoiceRecord],
    documents: &[DocumentRecord],
    config: &ReconcilerConfig,
) -> Vec<Candidate> {
    let mut candidates = Vec::new();

    for (invoice_idx, invoice) in invoices.iter().enumerate() {
        // Date proximity is measured against the due date, falling back to
        // the issue date when the invoice has none.
        let anchor_date = invoice.due_date.unwrap_or(invoice.issue_date);

        for (document_idx, document) in documents.iter().enumerate() {
            let date_distance = days_between(anchor_date, document.reference_date).abs();

            if reference_matches(&document.document_id, &invoice.invoice_id) {
                candidates.push(Candidate {
                    invoice_idx,
                    document_idx,
                    basis: MatchBasis::ExactId,
                    score: 1.0,
                    date_distance,
                });
                continue;
            }

            let similarity = vendor_similarity(&invoice.vendor_name, &document.vendor_name_raw);
            if similarity < config.vendor_similarity_threshold {
                continue;
            }
            let amount_gap = (invoice.amount_minor - document.amount_minor).abs();
            if amount_gap > config.amount_tolerance_minor_units {
                continue;
            }

            // Proximity adjusts the score but never gates eligibility.
            let date_component = if config.date_window_days > 0 {
                (1.0 - date_distance as f64 / config.date_window_days as f64).max(0.0)
            } else {
                0.0
            };
            let score =
                VENDOR_WEIGHT * similarity + AMOUNT_WEIGHT + DATE_WEIGHT * date_component;

            candidates.push(Candidate {
                invoice_idx,
                document_idx,
                basis: MatchBasis::AmountVendorDate,
                score,
                date_distance,
            });
        }
    }

    candidates
}

fn basis_rank(basis: MatchBasis) -> u8 {
    match basis {
        MatchBasis::ExactId => 0,
        MatchBasis::AmountVendorDate => 1,
        MatchBasis::Unmatched => 2,
    }
}

/// True when the document reference equals the invoice id, or carries it as
/// a boundary-delimited token ("PAG/INV-100" references "INV-100", while
/// "INV-1001" does not).
fn reference_matches(document_id: &str, invoice_id: &str) -> bool {
    let document = document_id.trim().to_uppercase();
    let invoice = invoice_id.trim().to_uppercase();
    if invoice.is_empty() {
        return false;
    }
    if document == invoice {
        return true;
    }

    let bytes = document.as_bytes();
    let mut search_from = 0;
    while let Some(offset) = document[search_from..].find(&invoice) {
        let begin = search_from + offset;
        let end = begin + invoice.len();
        let left_boundary = begin == 0 || !bytes[begin - 1].is_ascii_alphanumeric();
        let right_boundary = end == document.len() || !bytes[end].is_ascii_alphanumeric();
        if left_boundary && right_boundary {
            return true;
        }
        search_from = begin + 1;
    }
    false
}
