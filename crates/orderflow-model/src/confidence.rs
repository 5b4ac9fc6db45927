//! Clamped confidence scalar shared by extraction and matching.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// A confidence value clamped to `[0,1]` at construction, per the invariant
/// in spec §3 ("Confidences are clamped to [0,1] before persistence").
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct Confidence(f64);

impl Confidence {
    pub fn new(value: f64) -> Self {
        Self(value.clamp(0.0, 1.0))
    }

    pub fn zero() -> Self {
        Self(0.0)
    }

    pub fn get(self) -> f64 {
        self.0
    }

    /// Equality to six decimal places, as required by the tie-break rule in
    /// spec §4.5.4 ("equal confidence to six decimals").
    pub fn eq_six_decimals(self, other: Confidence) -> bool {
        round6(self.0) == round6(other.0)
    }
}

fn round6(v: f64) -> i64 {
    (v * 1_000_000.0).round() as i64
}

impl From<f64> for Confidence {
    fn from(value: f64) -> Self {
        Self::new(value)
    }
}

impl Default for Confidence {
    fn default() -> Self {
        Self::zero()
    }
}

/// Per-field confidences for the canonical order header (spec §4.5.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct HeaderConfidence {
    pub external_order_number: Confidence,
    pub order_date: Confidence,
    pub currency: Confidence,
    pub customer_hint: Confidence,
    pub requested_delivery_date: Confidence,
    pub ship_to: Confidence,
}

impl HeaderConfidence {
    /// Weighted dot product per spec §4.5.3.
    pub fn weighted(&self) -> f64 {
        self.external_order_number.get() * 0.20
            + self.order_date.get() * 0.15
            + self.currency.get() * 0.20
            + self.customer_hint.get() * 0.25
            + self.requested_delivery_date.get() * 0.10
            + self.ship_to.get() * 0.10
    }
}

/// Per-field confidences for one canonical order line (spec §4.5.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct LineConfidence {
    pub customer_sku_raw: Confidence,
    pub qty: Confidence,
    pub uom: Confidence,
    pub unit_price: Confidence,
}

impl LineConfidence {
    pub fn weighted(&self) -> f64 {
        self.customer_sku_raw.get() * 0.30
            + self.qty.get() * 0.30
            + self.uom.get() * 0.20
            + self.unit_price.get() * 0.20
    }
}

/// Overall + per-field confidence envelope attached to a Canonical Order
/// Output (spec §3, §4.5.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct ConfidenceEnvelope {
    pub overall: Confidence,
    pub header: HeaderConfidence,
    pub lines: Vec<LineConfidence>,
}

impl ConfidenceEnvelope {
    /// Compute `overall` from `header`/`lines` per the formula in §4.5.3,
    /// applying the sanity penalties for implausible or absent lines.
    /// `any_line_qty_out_of_range` covers `qty <= 0 || qty > 10^6`.
    pub fn compute_overall(&mut self, any_line_qty_out_of_range: bool) {
        if self.lines.is_empty() {
            self.overall = Confidence::zero();
            return;
        }
        let mean_line = self.lines.iter().map(|l| l.weighted()).sum::<f64>() / self.lines.len() as f64;
        let mut overall = 0.4 * self.header.weighted() + 0.6 * mean_line;
        if any_line_qty_out_of_range {
            overall *= 0.8;
        }
        self.overall = Confidence::new(overall);
    }
}
