//! The four mandatory hallucination guards of spec §4.3. Any failure
//! discards the whole LLM output; there is no partial acceptance.

use orderflow_error::{OrderflowError, Result};
use orderflow_model::{CanonicalOrderOutput, Uom};

/// Lines the returned line count may exceed the heuristic candidate count
/// by, before the line-count guard rejects the output.
const LINE_COUNT_FACTOR: usize = 2;
/// Absolute cap on returned lines regardless of the candidate count.
const MAX_LINE_COUNT: usize = 500;

fn normalize_for_anchor(s: &str) -> String {
    s.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Every non-null `customer_sku_raw` must be a substring of the document
/// text after case-folding and whitespace collapse.
pub fn anchor_guard(output: &CanonicalOrderOutput, document_text: &str) -> Result<()> {
    let haystack = normalize_for_anchor(document_text);
    for line in &output.lines {
        if let Some(sku) = &line.customer_sku_raw {
            if !haystack.contains(&normalize_for_anchor(sku)) {
                return Err(OrderflowError::validation(format!(
                    "anchor guard failed: customer_sku_raw {sku:?} is not present in the source document"
                )));
            }
        }
    }
    Ok(())
}

/// `qty ∈ (0, 10^6]`, `price >= 0` for every line.
pub fn range_guard(output: &CanonicalOrderOutput) -> Result<()> {
    for line in &output.lines {
        if !line.qty_in_range() {
            return Err(OrderflowError::validation(format!(
                "range guard failed: line {} has qty {} out of range",
                line.line_no, line.qty
            )));
        }
        if let Some(price) = line.unit_price {
            if price < 0.0 {
                return Err(OrderflowError::validation(format!(
                    "range guard failed: line {} has negative unit_price {}",
                    line.line_no, price
                )));
            }
        }
    }
    Ok(())
}

/// The returned line count must not exceed `candidate_line_count * 2` nor
/// 500, whichever is smaller in effect (both bounds apply).
///
/// `candidate_line_count` is `None` when no source text was available to
/// count heuristic candidates from at all (the vision path on a scanned
/// document with no text layer) — in that case the ratio check has no
/// basis to apply and only the absolute cap is enforced. This is distinct
/// from a text source that was available but yielded zero candidate rows,
/// which is `Some(0)` and does apply the ratio check (rejecting any
/// fabricated line).
pub fn line_count_guard(line_count: usize, candidate_line_count: Option<usize>) -> Result<()> {
    if line_count > MAX_LINE_COUNT {
        return Err(OrderflowError::validation(format!(
            "line-count guard failed: {line_count} lines exceeds the absolute cap of {MAX_LINE_COUNT}"
        )));
    }
    if let Some(candidate_line_count) = candidate_line_count {
        if line_count > candidate_line_count * LINE_COUNT_FACTOR {
            return Err(OrderflowError::validation(format!(
                "line-count guard failed: {line_count} lines exceeds {LINE_COUNT_FACTOR}x the {candidate_line_count} heuristic candidate rows"
            )));
        }
    }
    Ok(())
}

/// Every non-null UoM must map to the canonical vocabulary. Uses the same
/// bilingual `FromStr` as the rule extractors rather than exact string
/// matching, so the guard rejects genuine hallucinations without being
/// stricter than the rest of the pipeline.
pub fn parse_uom(raw: Option<&str>) -> Result<Option<Uom>> {
    match raw {
        None => Ok(None),
        Some(s) if s.trim().is_empty() => Ok(None),
        Some(s) => s.parse::<Uom>().map(Some).map_err(|_| {
            OrderflowError::validation(format!("UoM guard failed: {s:?} is not in the canonical vocabulary"))
        }),
    }
}
