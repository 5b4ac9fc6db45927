//! PDF-text extraction (spec §4.2): text-coverage ratio, plus a
//! best-effort table-structure heuristic for line extraction.

use std::sync::OnceLock;

use orderflow_error::{OrderflowError, Result};
use orderflow_model::{
    CanonicalOrderHeader, CanonicalOrderLine, CanonicalOrderOutput, Confidence, HeaderConfidence,
    LineConfidence, Uom,
};
use regex::Regex;

use crate::csv_extractor::parse_flexible_date;
use crate::decimal::{parse_decimal, DecimalFormat};
use crate::headers::scan_header_region;

pub const EXTRACTOR_VERSION: &str = "rule_pdf_text_v1";

/// Denominator of `text_coverage_ratio` per page (spec §4.2).
const CHARS_PER_PAGE_BASELINE: f64 = 3000.0;

/// The extraction output plus the raw page text, which the LLM path (spec
/// §4.3) reuses instead of re-extracting the PDF.
#[derive(Debug, Clone)]
pub struct PdfTextResult {
    pub output: CanonicalOrderOutput,
    pub raw_text: String,
    pub page_count: u32,
    pub text_coverage_ratio: f64,
}

pub fn extract_pdf_text(bytes: &[u8]) -> Result<PdfTextResult> {
    let pages = pdf_extract::extract_text_by_pages(bytes)
        .map_err(|e| OrderflowError::validation(format!("failed to extract PDF text: {e}")))?;
    let page_count = pages.len().max(1) as u32;
    let raw_text = pages.join("\n");
    let text_chars_total = raw_text.chars().count() as f64;
    let text_coverage_ratio =
        (text_chars_total / (page_count as f64 * CHARS_PER_PAGE_BASELINE)).min(1.0);

    let lines: Vec<&str> = raw_text.lines().collect();
    let header_region = scan_header_region(&lines);

    let mut output = CanonicalOrderOutput::new(EXTRACTOR_VERSION);
    output.order = CanonicalOrderHeader {
        external_order_number: header_region.external_order_number,
        order_date: header_region.order_date_raw.as_deref().and_then(parse_flexible_date),
        ..Default::default()
    };
    output.confidence.header = HeaderConfidence {
        external_order_number: Confidence::new(if output.order.external_order_number.is_some() {
            0.75
        } else {
            0.0
        }),
        order_date: Confidence::new(if output.order.order_date.is_some() { 0.75 } else { 0.0 }),
        ..Default::default()
    };

    let mut warnings = Vec::new();
    let mut line_no = 1u32;
    for line in &lines {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        if let Some(parsed) = parse_table_line(trimmed) {
            output.lines.push(CanonicalOrderLine {
                line_no,
                customer_sku_raw: Some(parsed.sku),
                product_description: Some(parsed.description),
                qty: parsed.qty,
                uom: parsed.uom,
                unit_price: parsed.unit_price,
                currency: None,
                delivery_date: None,
            });
            output.confidence.lines.push(LineConfidence {
                customer_sku_raw: Confidence::new(0.75),
                qty: Confidence::new(0.9),
                uom: Confidence::new(if parsed.uom.is_some() { 0.75 } else { 0.0 }),
                unit_price: Confidence::new(if parsed.unit_price.is_some() { 0.9 } else { 0.0 }),
            });
            line_no += 1;
        }
    }

    if output.lines.is_empty() {
        warnings.push("table structure not cleanly recognized in PDF text".to_string());
    }

    let any_out_of_range = output.has_out_of_range_qty();
    output.confidence.compute_overall(any_out_of_range);
    output.warnings = warnings;
    output.metadata = serde_json::json!({
        "page_count": page_count,
        "text_coverage_ratio": text_coverage_ratio,
    })
    .as_object()
    .cloned()
    .unwrap_or_default();

    Ok(PdfTextResult {
        output,
        raw_text,
        page_count,
        text_coverage_ratio,
    })
}

struct ParsedTableLine {
    sku: String,
    description: String,
    qty: f64,
    uom: Option<Uom>,
    unit_price: Option<f64>,
}

/// `SKU   Description...   Qty   UOM   Price`, columns separated by >= 2
/// spaces — the common shape of a monospace-rendered PDF table row.
fn table_line_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?P<sku>\S+)\s{2,}(?P<desc>.+?)\s{2,}(?P<qty>\d+[.,]?\d*)\s+(?P<uom>\S+)\s+(?P<price>\d+[.,]?\d*)\s*$",
        )
        .unwrap()
    })
}

fn parse_table_line(line: &str) -> Option<ParsedTableLine> {
    let caps = table_line_re().captures(line)?;
    let qty = parse_decimal(&caps["qty"], DecimalFormat::Comma)
        .or_else(|| parse_decimal(&caps["qty"], DecimalFormat::Dot))?;
    let unit_price = parse_decimal(&caps["price"], DecimalFormat::Comma)
        .or_else(|| parse_decimal(&caps["price"], DecimalFormat::Dot));
    let uom = caps["uom"].parse::<Uom>().ok();
    Some(ParsedTableLine {
        sku: caps["sku"].to_string(),
        description: caps["desc"].to_string(),
        qty,
        uom,
        unit_price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_clean_table_line() {
        let parsed = parse_table_line("AB-1  Schraube M4 10x50  10  ST  0,15").unwrap();
        assert_eq!(parsed.sku, "AB-1");
        assert_eq!(parsed.qty, 10.0);
        assert_eq!(parsed.uom, Some(Uom::St));
        assert_eq!(parsed.unit_price, Some(0.15));
    }

    #[test]
    fn non_table_prose_does_not_match() {
        assert!(parse_table_line("Thank you for your order, please find attached.").is_none());
    }
}
