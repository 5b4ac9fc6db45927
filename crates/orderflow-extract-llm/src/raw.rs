//! Loosely-typed mirror of the Canonical Order Output (spec §3), used to
//! deserialize whatever JSON the provider returns before the UoM guard gets
//! a chance to reject an out-of-vocabulary value explicitly rather than
//! failing deserialization outright.

use chrono::NaiveDate;
use serde::Deserialize;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawOrder {
    pub external_order_number: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub currency: Option<String>,
    pub customer_hint: Option<String>,
    pub requested_delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RawLine {
    pub line_no: Option<u32>,
    #[serde(default)]
    pub customer_sku_raw: Option<String>,
    #[serde(default)]
    pub product_description: Option<String>,
    pub qty: f64,
    #[serde(default)]
    pub uom: Option<String>,
    #[serde(default)]
    pub unit_price: Option<f64>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawExtraction {
    pub order: RawOrder,
    pub lines: Vec<RawLine>,
}
