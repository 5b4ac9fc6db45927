//! Persisted entities (spec §3), independent of any particular storage
//! engine. These are plain records; ownership/relation semantics are
//! documented on each field rather than encoded via ORM associations
//! (spec §9 — "duck-typed ORM entities").

use chrono::{DateTime, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::order::CanonicalOrderOutput;
use crate::uom::Uom;

/// The tenant boundary. Every other entity carries `org_id`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Org {
    pub id: Uuid,
    pub slug: String,
    pub created_at: DateTime<Utc>,
}

/// A buyer the org sells to. Referenced by `DraftOrder.customer_id` and
/// `CustomerPrice.customer_id`; carries the identifier the ERP connector
/// expects on export (spec §6 canonical export JSON `customer` object).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Customer {
    pub id: Uuid,
    pub org_id: Uuid,
    pub name: String,
    pub erp_customer_number: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum InboundSource {
    Email,
    Upload,
}

/// A record of one incoming artifact.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InboundMessage {
    pub id: Uuid,
    pub org_id: Uuid,
    pub source: InboundSource,
    pub received_at: DateTime<Utc>,
    pub dedup_key: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum DocumentStatus {
    Uploaded,
    Stored,
    Processing,
    Extracted,
    Failed,
    Deleted,
}

impl DocumentStatus {
    /// The allowed-transition DAG of spec §3:
    /// `∅ → UPLOADED → STORED → PROCESSING → {EXTRACTED | FAILED}`,
    /// `FAILED → PROCESSING` for retry, `EXTRACTED` terminal,
    /// plus the retention soft-delete `* → DELETED`.
    pub fn can_transition_to(self, next: DocumentStatus) -> bool {
        use DocumentStatus::*;
        match (self, next) {
            (Uploaded, Stored) => true,
            (Stored, Processing) => true,
            (Processing, Extracted) => true,
            (Processing, Failed) => true,
            (Failed, Processing) => true,
            (_, Deleted) => self != Deleted,
            _ => false,
        }
    }
}

/// A stored file (spec §3). PDFs additionally carry coverage/fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Document {
    pub id: Uuid,
    pub org_id: Uuid,
    pub inbound_message_id: Option<Uuid>,
    pub storage_key: Option<String>,
    pub mime_type: String,
    pub size_bytes: u64,
    /// Cryptographic content hash; cross-source dedup key within an org.
    pub sha256: String,
    pub filename: String,
    pub status: DocumentStatus,
    pub text_coverage_ratio: Option<f64>,
    pub page_count: Option<u32>,
    pub layout_fingerprint: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ExtractionRunStatus {
    New,
    Running,
    Succeeded,
    Failed,
}

/// One execution of an extractor on a document.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractionRun {
    pub id: Uuid,
    pub org_id: Uuid,
    pub document_id: Uuid,
    /// e.g. "rule_v1", "llm_v1".
    pub extractor: String,
    pub status: ExtractionRunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub line_count: u32,
    pub overall_confidence: f64,
    pub output: Option<CanonicalOrderOutput>,
    pub error_json: Option<serde_json::Value>,
}

/// Catalog entry scoped to an org.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Product {
    pub id: Uuid,
    pub org_id: Uuid,
    /// Unique per org.
    pub internal_sku: String,
    pub name: String,
    pub description: String,
    pub base_uom: Uom,
    /// Alternate UoM -> factor to base.
    pub uom_conversions: std::collections::BTreeMap<String, f64>,
    pub active: bool,
    pub attributes: serde_json::Map<String, serde_json::Value>,
}

impl Product {
    pub fn name_and_description(&self) -> String {
        format!("{} {}", self.name, self.description)
    }
}

/// A vector plus model identity and dedup hash.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProductEmbedding {
    pub product_id: Uuid,
    pub model: String,
    pub vector: Vec<f32>,
    pub source_text_hash: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum SkuMappingStatus {
    Suggested,
    Confirmed,
    Rejected,
    Deprecated,
}

/// The learned store: `(org, customer, customer_sku_normalized) ->
/// internal_sku`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SkuMapping {
    pub id: Uuid,
    pub org_id: Uuid,
    pub customer_id: Uuid,
    pub customer_sku_normalized: String,
    pub internal_sku: String,
    pub status: SkuMappingStatus,
    pub confidence: f64,
    pub support_count: u32,
    pub reject_count: u32,
    pub last_used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum DraftOrderStatus {
    NeedsReview,
    Ready,
    Approved,
    Pushing,
    Pushed,
    Error,
}

/// The editable, human-reviewed representation of a canonical order.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DraftOrder {
    pub id: Uuid,
    pub org_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub document_id: Uuid,
    pub extraction_run_id: Uuid,
    pub status: DraftOrderStatus,
    pub approver: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub ready_check_json: Option<serde_json::Value>,
    pub external_order_number: Option<String>,
    pub order_date: Option<NaiveDate>,
    pub currency: Option<String>,
    pub requested_delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum MatchMethod {
    ExactMapping,
    Hybrid,
    Trigram,
    Embedding,
    Null,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum MatchStatus {
    Matched,
    Suggested,
    Unmatched,
    Overridden,
}

/// Per-line fields plus matching outputs.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DraftOrderLine {
    pub id: Uuid,
    pub draft_order_id: Uuid,
    pub line_no: u32,
    pub qty: f64,
    pub uom: Option<Uom>,
    pub unit_price: Option<f64>,
    pub currency: Option<String>,
    pub description: Option<String>,
    pub customer_sku_raw: Option<String>,
    pub internal_sku: Option<String>,
    pub match_confidence: f64,
    pub match_method: MatchMethod,
    pub match_status: MatchStatus,
    pub match_debug: serde_json::Value,
}

/// Tiered pricing: `(org, customer, internal_sku, currency, uom, min_qty,
/// valid_from, valid_to) -> unit_price`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct CustomerPrice {
    pub id: Uuid,
    pub org_id: Uuid,
    pub customer_id: Uuid,
    pub internal_sku: String,
    pub currency: String,
    pub uom: Uom,
    pub min_qty: f64,
    pub valid_from: Option<NaiveDate>,
    pub valid_to: Option<NaiveDate>,
    pub unit_price: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ValidationIssueKind {
    MissingCustomer,
    AmbiguousCustomer,
    MissingSku,
    LowConfidenceMatch,
    PriceMismatch,
    MissingPrice,
    UomIncompatible,
    DuplicateOrder,
    LineCountMismatch,
    ExtractionWarningsPropagated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum IssueSeverity {
    Warning,
    Error,
}

/// A validation finding attached to a draft or a line.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ValidationIssue {
    pub id: Uuid,
    pub draft_order_id: Uuid,
    pub draft_order_line_id: Option<Uuid>,
    pub kind: ValidationIssueKind,
    pub severity: IssueSeverity,
    pub details: serde_json::Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum ErpExportStatus {
    Pending,
    Sent,
    Acked,
    Failed,
}

/// One export attempt.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErpExport {
    pub id: Uuid,
    pub org_id: Uuid,
    pub draft_order_id: Uuid,
    pub erp_connection_id: Uuid,
    pub status: ErpExportStatus,
    pub export_storage_key: Option<String>,
    pub dropzone_path: Option<String>,
    pub erp_order_id: Option<String>,
    pub error_json: Option<serde_json::Value>,
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FeedbackEventType {
    MappingConfirmed,
    MappingRejected,
    ExtractionLineCorrected,
    ExtractionFieldCorrected,
    CustomerSelected,
}

/// Append-only operator/system correction record.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct FeedbackEvent {
    pub id: Uuid,
    pub org_id: Uuid,
    pub event_type: FeedbackEventType,
    pub before_json: serde_json::Value,
    pub after_json: serde_json::Value,
    pub layout_fingerprint: Option<String>,
    /// At most 1500 chars of surrounding document text.
    pub input_snippet: Option<String>,
    pub actor: String,
    pub created_at: DateTime<Utc>,
}

/// Maximum payload size (bytes) for `before_json`/`after_json`, per spec §9
/// open-question resolution.
pub const FEEDBACK_JSON_MAX_BYTES: usize = 10 * 1024;
/// Maximum length of `input_snippet`.
pub const FEEDBACK_SNIPPET_MAX_CHARS: usize = 1500;

/// Aggregate keyed on `(org, layout_fingerprint)`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct DocLayoutProfile {
    pub org_id: Uuid,
    pub layout_fingerprint: String,
    pub seen_count: u64,
    pub example_count: u64,
    pub last_seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum AiCallStatus {
    Succeeded,
    Failed,
}

/// Append-only audit of every provider call.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AiCallLog {
    pub id: Uuid,
    pub org_id: Uuid,
    pub document_id: Option<Uuid>,
    pub call_type: String,
    pub provider: String,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub latency_ms: u64,
    /// Integer micro-currency units (1 micro = 10^-6 USD).
    pub cost_micros: u64,
    pub status: AiCallStatus,
    pub input_hash: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Append-only record of operator/system actions.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct AuditLog {
    pub id: Uuid,
    pub org_id: Uuid,
    pub subject_type: String,
    pub subject_id: Uuid,
    pub action: String,
    pub actor: String,
    pub details: serde_json::Value,
    pub created_at: DateTime<Utc>,
}
