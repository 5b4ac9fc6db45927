//! The Canonical Order Output (spec §3) — the pipeline's lingua franca.

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::confidence::ConfidenceEnvelope;
use crate::uom::Uom;

/// `ship_to`/`bill_to` free-form address object. The source spec leaves the
/// shape unconstrained beyond "object"; we model the common subset used by
/// validation and export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Address {
    pub name: Option<String>,
    pub street: Option<String>,
    pub city: Option<String>,
    pub postal_code: Option<String>,
    pub country: Option<String>,
}

/// The order header of a Canonical Order Output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct CanonicalOrderHeader {
    pub external_order_number: Option<String>,
    pub order_date: Option<NaiveDate>,
    /// ISO-4217 currency code, e.g. "EUR".
    pub currency: Option<String>,
    pub customer_hint: Option<String>,
    pub requested_delivery_date: Option<NaiveDate>,
    pub ship_to: Option<Address>,
    pub bill_to: Option<Address>,
    pub notes: Option<String>,
}

/// One line of a Canonical Order Output.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CanonicalOrderLine {
    /// Must be `>= 1`.
    pub line_no: u32,
    pub customer_sku_raw: Option<String>,
    pub product_description: Option<String>,
    /// Must be `> 0` and `<= 10^6`.
    pub qty: f64,
    pub uom: Option<Uom>,
    pub unit_price: Option<f64>,
    pub currency: Option<String>,
    pub delivery_date: Option<NaiveDate>,
}

impl CanonicalOrderLine {
    pub fn qty_in_range(&self) -> bool {
        self.qty > 0.0 && self.qty <= 1_000_000.0
    }
}

/// Extractor-specific metadata (separator, decimal format, row count, etc.).
/// Kept as a loose JSON object since its shape varies per extractor.
pub type ExtractionMetadata = serde_json::Map<String, serde_json::Value>;

/// The full Canonical Order Output produced by any extractor (spec §3).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CanonicalOrderOutput {
    pub extractor_version: String,
    pub order: CanonicalOrderHeader,
    pub lines: Vec<CanonicalOrderLine>,
    pub confidence: ConfidenceEnvelope,
    pub warnings: Vec<String>,
    #[schemars(with = "serde_json::Value")]
    pub metadata: ExtractionMetadata,
}

impl CanonicalOrderOutput {
    pub fn new(extractor_version: impl Into<String>) -> Self {
        Self {
            extractor_version: extractor_version.into(),
            order: CanonicalOrderHeader::default(),
            lines: Vec::new(),
            confidence: ConfidenceEnvelope::default(),
            warnings: Vec::new(),
            metadata: ExtractionMetadata::new(),
        }
    }

    /// Any line whose qty is non-positive or exceeds 10^6 (spec §4.5.3,
    /// §4.3 range guard).
    pub fn has_out_of_range_qty(&self) -> bool {
        self.lines.iter().any(|l| !l.qty_in_range())
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}
