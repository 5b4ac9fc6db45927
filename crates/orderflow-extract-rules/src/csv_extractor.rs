//! CSV extraction pipeline (spec §4.2): encoding, separator and decimal
//! detection, header-region scan, fuzzy column mapping, and line assembly.

use chrono::NaiveDate;
use orderflow_error::{OrderflowError, Result};
use orderflow_model::{
    CanonicalOrderHeader, CanonicalOrderLine, CanonicalOrderOutput, Confidence, HeaderConfidence,
    LineConfidence, Uom,
};

use crate::decimal::{detect_decimal_format, parse_decimal};
use crate::encoding::decode_bytes;
use crate::headers::{find_header_row, map_headers, scan_header_region, CanonicalField};

pub const EXTRACTOR_VERSION: &str = "rule_csv_v1";

const NUMERIC_VALID_CONFIDENCE: f64 = 0.9;
const ALPHANUMERIC_IN_NUMERIC_CONFIDENCE: f64 = 0.6;

const DATE_FORMATS: [&str; 3] = ["%d.%m.%Y", "%Y-%m-%d", "%m/%d/%Y"];

pub(crate) fn parse_flexible_date(s: &str) -> Option<NaiveDate> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

fn parse_rows(text: &str, separator: char) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(separator as u8)
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());
    reader
        .records()
        .filter_map(|r| r.ok())
        .map(|record| record.iter().map(|f| f.to_string()).collect())
        .collect()
}

/// Extract a Canonical Order Output from a CSV file's raw bytes.
pub fn extract_csv(bytes: &[u8]) -> Result<CanonicalOrderOutput> {
    let decoded = decode_bytes(bytes);
    let separator = crate::separator::detect_separator(&decoded.text);
    let rows = parse_rows(&decoded.text, separator);

    if rows.is_empty() {
        return Err(OrderflowError::validation("CSV file contains no rows"));
    }

    let text_lines: Vec<&str> = decoded.text.lines().collect();
    let header_region = scan_header_region(&text_lines);

    let header_row_idx = find_header_row(&rows)
        .ok_or_else(|| OrderflowError::validation("no header row detected in CSV"))?;
    let headers = &rows[header_row_idx];
    let mappings = map_headers(headers);
    let data_rows = &rows[header_row_idx + 1..];

    tracing::debug!(
        encoding = decoded.encoding,
        separator = %separator,
        header_row_idx,
        row_count = rows.len(),
        "csv extraction started"
    );

    assemble(
        EXTRACTOR_VERSION,
        headers,
        &mappings,
        data_rows,
        header_region.external_order_number,
        header_region.order_date_raw.as_deref().and_then(parse_flexible_date),
        serde_json::json!({
            "encoding": decoded.encoding,
            "separator": separator.to_string(),
            "header_row_index": header_row_idx,
        }),
    )
}

/// Shared between the CSV and XLSX extractors: given a mapped header row
/// and the data rows beneath it, assign canonical fields, warnings, and
/// per-field confidences.
pub(crate) fn assemble(
    extractor_version: &str,
    headers: &[String],
    mappings: &[crate::headers::FieldMapping],
    data_rows: &[Vec<String>],
    external_order_number: Option<String>,
    order_date: Option<NaiveDate>,
    metadata: serde_json::Value,
) -> Result<CanonicalOrderOutput> {
    let mut warnings = Vec::new();

    let mapped_columns: std::collections::HashSet<usize> =
        mappings.iter().map(|m| m.column_index).collect();
    for (col, name) in headers.iter().enumerate() {
        if !mapped_columns.contains(&col) {
            warnings.push(format!("unmapped column {col} ({name:?})"));
        }
    }

    let find = |field: CanonicalField| mappings.iter().find(|m| m.field == field);
    let sku_col = find(CanonicalField::CustomerSkuRaw);
    let desc_col = find(CanonicalField::ProductDescription);
    let qty_col = find(CanonicalField::Qty);
    let uom_col = find(CanonicalField::Uom);
    let price_col = find(CanonicalField::UnitPrice);

    let numeric_samples: Vec<&str> = data_rows
        .iter()
        .filter_map(|row| qty_col.or(price_col).and_then(|m| row.get(m.column_index)))
        .map(|s| s.as_str())
        .collect();
    let decimal_format = detect_decimal_format(&numeric_samples);

    let mut output = CanonicalOrderOutput::new(extractor_version);
    output.order = CanonicalOrderHeader {
        external_order_number,
        order_date,
        ..Default::default()
    };
    output.confidence.header = HeaderConfidence {
        external_order_number: Confidence::new(if output.order.external_order_number.is_some() {
            0.9
        } else {
            0.0
        }),
        order_date: Confidence::new(if output.order.order_date.is_some() { 0.9 } else { 0.0 }),
        ..Default::default()
    };

    let mut line_no = 1u32;
    for row in data_rows {
        if row.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }

        let sku = sku_col
            .and_then(|m| row.get(m.column_index))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());
        let description = desc_col
            .and_then(|m| row.get(m.column_index))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        if sku.is_none() && description.is_none() {
            warnings.push(format!("line {line_no} has neither SKU nor description"));
        }

        let qty_raw = qty_col.and_then(|m| row.get(m.column_index)).map(|s| s.trim());
        let (qty, qty_confidence) = match qty_raw {
            Some(raw) if !raw.is_empty() => match parse_decimal(raw, decimal_format) {
                Some(value) => (value, NUMERIC_VALID_CONFIDENCE),
                None => {
                    warnings.push(format!("line {line_no} has unparseable qty {raw:?}"));
                    (0.0, ALPHANUMERIC_IN_NUMERIC_CONFIDENCE)
                }
            },
            _ => (0.0, 0.0),
        };

        let price_raw = price_col.and_then(|m| row.get(m.column_index)).map(|s| s.trim());
        let (unit_price, price_confidence) = match price_raw {
            Some(raw) if !raw.is_empty() => match parse_decimal(raw, decimal_format) {
                Some(value) => (Some(value), NUMERIC_VALID_CONFIDENCE),
                None => {
                    warnings.push(format!("line {line_no} has unparseable unit_price {raw:?}"));
                    (None, ALPHANUMERIC_IN_NUMERIC_CONFIDENCE)
                }
            },
            _ => (None, 0.0),
        };

        let uom_raw = uom_col.and_then(|m| row.get(m.column_index)).map(|s| s.trim());
        let (uom, uom_confidence) = match uom_raw {
            Some(raw) if !raw.is_empty() => match raw.parse::<Uom>() {
                Ok(uom) => (Some(uom), uom_col.map(|m| m.confidence).unwrap_or(0.0)),
                Err(_) => {
                    warnings.push(format!("line {line_no} has unrecognized UoM {raw:?}"));
                    (None, ALPHANUMERIC_IN_NUMERIC_CONFIDENCE)
                }
            },
            _ => (None, 0.0),
        };

        output.lines.push(CanonicalOrderLine {
            line_no,
            customer_sku_raw: sku,
            product_description: description,
            qty,
            uom,
            unit_price,
            currency: None,
            delivery_date: None,
        });
        output.confidence.lines.push(LineConfidence {
            customer_sku_raw: Confidence::new(sku_col.map(|m| m.confidence).unwrap_or(0.0)),
            qty: Confidence::new(qty_confidence),
            uom: Confidence::new(uom_confidence),
            unit_price: Confidence::new(price_confidence),
        });
        line_no += 1;
    }

    let any_out_of_range = output.has_out_of_range_qty();
    output.confidence.compute_overall(any_out_of_range);
    output.warnings = warnings;
    output.metadata = metadata.as_object().cloned().unwrap_or_default();
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_dach_csv_with_semicolons_and_comma_decimal() {
        let csv = "Bestellnummer: PO-1000\n\
                   Artikelnummer;Bezeichnung;Menge;Einheit;Einzelpreis\n\
                   AB-1;Schraube M4;10;ST;0,15\n\
                   AB-2;Mutter M4;20;ST;0,05\n";
        let output = extract_csv(csv.as_bytes()).unwrap();
        assert_eq!(output.order.external_order_number.as_deref(), Some("PO-1000"));
        assert_eq!(output.lines.len(), 2);
        assert_eq!(output.lines[0].customer_sku_raw.as_deref(), Some("AB-1"));
        assert_eq!(output.lines[0].qty, 10.0);
        assert_eq!(output.lines[0].unit_price, Some(0.15));
        assert_eq!(output.lines[0].uom, Some(Uom::St));
    }

    #[test]
    fn extracts_us_csv_with_commas_and_dot_decimal() {
        let csv = "SKU,Description,Qty,Unit Price\nAB-1,Bolt,5,1.25\nAB-2,Nut,3,0.50\n";
        let output = extract_csv(csv.as_bytes()).unwrap();
        assert_eq!(output.lines.len(), 2);
        assert_eq!(output.lines[1].unit_price, Some(0.50));
    }

    #[test]
    fn warns_on_unparseable_qty_without_failing() {
        let csv = "SKU,Description,Qty\nAB-1,Bolt,five\n";
        let output = extract_csv(csv.as_bytes()).unwrap();
        assert_eq!(output.lines.len(), 1);
        assert!(output.warnings.iter().any(|w| w.contains("unparseable qty")));
    }

    #[test]
    fn rejects_file_with_no_header_row() {
        let csv = "just,some,junk\nno,header,here\n";
        let result = extract_csv(csv.as_bytes());
        assert!(result.is_err());
    }

    #[test]
    fn line_missing_sku_and_description_warns() {
        let csv = "SKU,Description,Qty\n,,5\n";
        let output = extract_csv(csv.as_bytes()).unwrap();
        assert!(output
            .warnings
            .iter()
            .any(|w| w.contains("neither SKU nor description")));
    }
}
