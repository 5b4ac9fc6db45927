//! Canonical export JSON v1 (spec §6). Nullable fields are always present
//! with `null`, never omitted — every field below is either non-`Option`
//! or an `Option` serialized with serde's default (present-as-null)
//! behavior; none carry `skip_serializing_if`.

use chrono::{DateTime, NaiveDate, Utc};
use orderflow_error::{OrderflowError, Result};
use orderflow_model::{DraftOrder, DraftOrderLine, Uom};
use serde::Serialize;
use uuid::Uuid;

pub const EXPORT_VERSION: &str = "orderflow_export_json_v1";

#[derive(Debug, Clone, Serialize)]
pub struct ExportCustomer {
    pub id: Uuid,
    pub erp_customer_number: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportHeader {
    pub external_order_number: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub currency: String,
    pub requested_delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportLine {
    pub line_no: u32,
    pub internal_sku: String,
    pub qty: f64,
    pub uom: Uom,
    pub unit_price: Option<f64>,
    pub currency: String,
    pub customer_sku_raw: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SourceDocument {
    pub document_id: Uuid,
    pub file_name: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportMeta {
    pub created_by: String,
    pub source_document: Option<SourceDocument>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportDocument {
    pub export_version: &'static str,
    pub org_slug: String,
    pub draft_order_id: Uuid,
    pub approved_at: DateTime<Utc>,
    pub customer: ExportCustomer,
    pub header: ExportHeader,
    pub lines: Vec<ExportLine>,
    pub meta: ExportMeta,
}

/// Build the wire document for an approved draft. Fails with a validation
/// error if the draft was never approved, has no currency, or carries a
/// line without a resolved `internal_sku`/`uom` — all of which READY
/// already guarantees, so this is a defense against calling push out of
/// order rather than an expected runtime path.
pub fn build_export_document(
    draft: &DraftOrder,
    lines: &[DraftOrderLine],
    customer: ExportCustomer,
    org_slug: impl Into<String>,
    created_by: impl Into<String>,
    source_document: Option<SourceDocument>,
) -> Result<ExportDocument> {
    let approved_at = draft
        .approved_at
        .ok_or_else(|| OrderflowError::validation("draft has not been approved"))?;
    let currency = draft
        .currency
        .clone()
        .ok_or_else(|| OrderflowError::validation("draft has no currency"))?;

    let mut export_lines = Vec::with_capacity(lines.len());
    for line in lines {
        let internal_sku = line
            .internal_sku
            .clone()
            .ok_or_else(|| OrderflowError::validation(format!("line {} has no internal_sku", line.line_no)))?;
        let uom = line
            .uom
            .ok_or_else(|| OrderflowError::validation(format!("line {} has no uom", line.line_no)))?;
        export_lines.push(ExportLine {
            line_no: line.line_no,
            internal_sku,
            qty: line.qty,
            uom,
            unit_price: line.unit_price,
            currency: line.currency.clone().unwrap_or_else(|| currency.clone()),
            customer_sku_raw: line.customer_sku_raw.clone(),
            description: line.description.clone(),
        });
    }

    Ok(ExportDocument {
        export_version: EXPORT_VERSION,
        org_slug: org_slug.into(),
        draft_order_id: draft.id,
        approved_at,
        customer,
        header: ExportHeader {
            external_order_number: draft.external_order_number.clone(),
            order_date: draft.order_date,
            currency,
            requested_delivery_date: draft.requested_delivery_date,
            notes: draft.notes.clone(),
        },
        lines: export_lines,
        meta: ExportMeta {
            created_by: created_by.into(),
            source_document,
        },
    })
}
