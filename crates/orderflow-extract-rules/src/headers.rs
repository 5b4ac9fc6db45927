//! Bilingual DE/EN header dictionary, fuzzy column mapping, and the
//! header-region scan for order-level metadata (spec §4.2(d)-(e)).

use regex::Regex;
use std::sync::OnceLock;

/// The canonical line fields a rule extractor maps raw columns onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    CustomerSkuRaw,
    ProductDescription,
    Qty,
    Uom,
    UnitPrice,
}

/// Confidence thresholds of spec §4.2, last paragraph.
pub const EXACT_MATCH_CONFIDENCE: f64 = 0.95;
pub const FUZZY_MATCH_CONFIDENCE: f64 = 0.75;

const FUZZY_THRESHOLD: f64 = 0.82;

fn dictionary() -> &'static [(CanonicalField, &'static [&'static str])] {
    &[
        (
            CanonicalField::CustomerSkuRaw,
            &[
                "sku",
                "artikelnummer",
                "artikel-nr",
                "artikelnr",
                "item no",
                "item number",
                "article number",
                "product code",
                "bestellnummer artikel",
            ],
        ),
        (
            CanonicalField::ProductDescription,
            &[
                "description",
                "bezeichnung",
                "beschreibung",
                "artikelbezeichnung",
                "item description",
                "product",
            ],
        ),
        (
            CanonicalField::Qty,
            &["qty", "quantity", "menge", "anzahl", "stueckzahl", "stückzahl"],
        ),
        (
            CanonicalField::Uom,
            &["uom", "unit", "einheit", "me", "mengeneinheit"],
        ),
        (
            CanonicalField::UnitPrice,
            &[
                "price",
                "unit price",
                "preis",
                "einzelpreis",
                "stueckpreis",
                "stückpreis",
                "va price",
            ],
        ),
    ]
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

/// One resolved `raw column -> canonical field` assignment.
#[derive(Debug, Clone)]
pub struct FieldMapping {
    pub field: CanonicalField,
    pub column_index: usize,
    pub confidence: f64,
}

/// Greedily assign the best-scoring `(field, column)` pairs first, so two
/// fields never claim the same column and a field is left unmapped (and
/// later warned on) rather than stolen from a better match.
pub fn map_headers(headers: &[String]) -> Vec<FieldMapping> {
    let mut candidates: Vec<(CanonicalField, usize, f64)> = Vec::new();
    for (col, raw) in headers.iter().enumerate() {
        let normalized = normalize(raw);
        for (field, aliases) in dictionary() {
            if aliases.iter().any(|alias| *alias == normalized) {
                candidates.push((*field, col, EXACT_MATCH_CONFIDENCE));
                continue;
            }
            let best = aliases
                .iter()
                .map(|alias| strsim::jaro_winkler(&normalized, alias))
                .fold(0.0_f64, f64::max);
            if best >= FUZZY_THRESHOLD {
                candidates.push((*field, col, FUZZY_MATCH_CONFIDENCE));
            }
        }
    }
    candidates.sort_by(|a, b| b.2.partial_cmp(&a.2).unwrap());

    let mut used_fields = std::collections::HashSet::new();
    let mut used_columns = std::collections::HashSet::new();
    let mut mappings = Vec::new();
    for (field, col, confidence) in candidates {
        if used_fields.contains(&field) || used_columns.contains(&col) {
            continue;
        }
        used_fields.insert(field);
        used_columns.insert(col);
        mappings.push(FieldMapping {
            field,
            column_index: col,
            confidence,
        });
    }
    mappings
}

/// Order-level metadata pulled from free text above or around the header
/// row (spec §4.2(d)): `Bestellnummer:`, `Order No:`, `PO#`,
/// `Bestelldatum:`, `Order Date:`, `Datum:`.
#[derive(Debug, Clone, Default)]
pub struct HeaderRegionFields {
    pub external_order_number: Option<String>,
    pub order_date_raw: Option<String>,
}

fn order_number_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(Bestellnummer|Order\s*No|PO#)\s*:?\s*(\S+)").unwrap()
    })
}

fn order_date_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(Bestelldatum|Order\s*Date|Datum)\s*:?\s*(\S+)").unwrap()
    })
}

/// Scan the first 20 lines for the patterns above; the first match of each
/// kind wins.
pub fn scan_header_region(lines: &[&str]) -> HeaderRegionFields {
    let mut fields = HeaderRegionFields::default();
    for line in lines.iter().take(20) {
        if fields.external_order_number.is_none() {
            if let Some(caps) = order_number_re().captures(line) {
                fields.external_order_number = Some(caps[2].to_string());
            }
        }
        if fields.order_date_raw.is_none() {
            if let Some(caps) = order_date_re().captures(line) {
                fields.order_date_raw = Some(caps[2].to_string());
            }
        }
    }
    fields
}

/// Score `row` as a candidate header row: the fraction of cells that map to
/// a canonical field (exactly or fuzzily).
pub fn header_row_score(row: &[String]) -> f64 {
    if row.is_empty() {
        return 0.0;
    }
    let mapped = map_headers(row).len();
    mapped as f64 / row.len() as f64
}

/// Find the best-scoring candidate header row among the first 20, if any
/// scores above a minimal bar.
pub fn find_header_row(rows: &[Vec<String>]) -> Option<usize> {
    rows.iter()
        .take(20)
        .enumerate()
        .map(|(i, row)| (i, header_row_score(row)))
        .filter(|(_, score)| *score >= 0.4)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
        .map(|(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_english_headers_map_at_high_confidence() {
        let headers = vec!["SKU".to_string(), "Description".to_string(), "Qty".to_string()];
        let mapped = map_headers(&headers);
        assert_eq!(mapped.len(), 3);
        assert!(mapped.iter().all(|m| m.confidence == EXACT_MATCH_CONFIDENCE));
    }

    #[test]
    fn german_headers_map_too() {
        let headers = vec![
            "Artikelnummer".to_string(),
            "Bezeichnung".to_string(),
            "Menge".to_string(),
            "Einheit".to_string(),
            "Einzelpreis".to_string(),
        ];
        let mapped = map_headers(&headers);
        assert_eq!(mapped.len(), 5);
    }

    #[test]
    fn fuzzy_typo_still_maps() {
        let headers = vec!["Qauntity".to_string()];
        let mapped = map_headers(&headers);
        assert_eq!(mapped.len(), 1);
        assert_eq!(mapped[0].field, CanonicalField::Qty);
        assert_eq!(mapped[0].confidence, FUZZY_MATCH_CONFIDENCE);
    }

    #[test]
    fn unrelated_header_is_unmapped() {
        let headers = vec!["Internal Notes Column".to_string()];
        assert!(map_headers(&headers).is_empty());
    }

    #[test]
    fn header_region_extracts_german_order_number_and_date() {
        let lines = vec!["Bestellnummer: PO-12345", "Bestelldatum: 15.03.2026"];
        let fields = scan_header_region(&lines);
        assert_eq!(fields.external_order_number.as_deref(), Some("PO-12345"));
        assert_eq!(fields.order_date_raw.as_deref(), Some("15.03.2026"));
    }

    #[test]
    fn finds_header_row_after_preamble() {
        let rows = vec![
            vec!["Acme GmbH".to_string()],
            vec!["Bestellnummer: PO-1".to_string()],
            vec!["SKU".to_string(), "Qty".to_string(), "Price".to_string()],
            vec!["AB-1".to_string(), "5".to_string(), "12.50".to_string()],
        ];
        assert_eq!(find_header_row(&rows), Some(2));
    }
}
