// SPDX-License-Identifier: MIT OR Apache-2.0
//! External port contracts (spec §6). The core never talks to a database,
//! object store, or LLM API directly — it calls one of these traits, which
//! an external implementation (or, in tests, `orderflow-persistence-mock`)
//! satisfies. Implementations are stateless per call unless documented
//! otherwise.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orderflow_error::Result;
use orderflow_model::{
    AiCallLog, Customer, CustomerPrice, Document, DraftOrder, DraftOrderLine, ErpExport,
    ExtractionRun, FeedbackEvent, FeedbackEventType, Product, ProductEmbedding, SkuMapping,
};
use uuid::Uuid;

/// Supplies the current `org_id` and actor identity. Never read from
/// request parameters — the only legitimate source of tenant scope.
pub trait AuthContext: Send + Sync {
    fn org_id(&self) -> Uuid;
    fn actor(&self) -> &str;
}

/// A trigram match against the catalog, ranked by similarity.
#[derive(Debug, Clone)]
pub struct TrigramMatch {
    pub product: Product,
    pub similarity: f64,
}

/// A vector match against product embeddings, ranked by cosine similarity.
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub product: Product,
    pub cosine_similarity: f64,
}

/// Transactional reads/writes over the entities of spec §3. Must support
/// row-level locking, `ON CONFLICT DO UPDATE`-style upserts, trigram
/// similarity search, and a vector column with cosine distance / ANN index
/// — this trait exposes those capabilities as methods rather than as raw
/// SQL, so in-memory test doubles can satisfy the same contract.
#[async_trait]
pub trait PersistencePort: Send + Sync {
    async fn get_product_by_sku(&self, org_id: Uuid, internal_sku: &str) -> Result<Option<Product>>;

    async fn get_customer(&self, org_id: Uuid, customer_id: Uuid) -> Result<Option<Customer>>;

    /// Trigram similarity search on `internal_sku` and `name || ' ' ||
    /// description`, threshold > 0.30, top 30 of the union (spec §4.5.1).
    async fn trigram_search_products(
        &self,
        org_id: Uuid,
        sku_query: &str,
        text_query: &str,
    ) -> Result<Vec<TrigramMatch>>;

    /// Cosine similarity search over product embeddings, top 30 (spec
    /// §4.5.1). Returns an empty vec if embeddings are disabled for the org.
    async fn vector_search_products(
        &self,
        org_id: Uuid,
        query_embedding: &[f32],
    ) -> Result<Vec<VectorMatch>>;

    async fn get_embedding(&self, product_id: Uuid) -> Result<Option<ProductEmbedding>>;

    async fn get_confirmed_mapping(
        &self,
        org_id: Uuid,
        customer_id: Uuid,
        customer_sku_normalized: &str,
    ) -> Result<Option<SkuMapping>>;

    /// Look up the active (SUGGESTED or CONFIRMED) mapping row for a key,
    /// regardless of status, for the confirm/reject upsert path (spec
    /// §4.9). At most one such row exists per key.
    async fn get_active_mapping(
        &self,
        org_id: Uuid,
        customer_id: Uuid,
        customer_sku_normalized: &str,
    ) -> Result<Option<SkuMapping>>;

    /// Upsert semantics of spec §4.9 confirm/reject; the implementation is
    /// responsible for enforcing the unique-active constraint.
    async fn upsert_sku_mapping(&self, mapping: SkuMapping) -> Result<SkuMapping>;

    async fn find_customer_prices(
        &self,
        org_id: Uuid,
        customer_id: Uuid,
        internal_sku: &str,
    ) -> Result<Vec<CustomerPrice>>;

    async fn get_draft(&self, org_id: Uuid, draft_id: Uuid) -> Result<Option<DraftOrder>>;
    async fn save_draft(&self, draft: DraftOrder) -> Result<DraftOrder>;
    async fn get_draft_lines(&self, draft_id: Uuid) -> Result<Vec<DraftOrderLine>>;
    async fn save_draft_line(&self, line: DraftOrderLine) -> Result<DraftOrderLine>;

    async fn get_erp_export(&self, org_id: Uuid, export_id: Uuid) -> Result<Option<ErpExport>>;
    async fn save_erp_export(&self, export: ErpExport) -> Result<ErpExport>;

    /// The most recent, still-non-terminal (`PENDING`/`SENT`) export for a
    /// draft, used by the push-idempotency fallback of spec §4.8/§5 when no
    /// `Idempotency-Key` was supplied.
    async fn find_active_export_for_draft(&self, org_id: Uuid, draft_order_id: Uuid) -> Result<Option<ErpExport>>;

    /// The most recent export for a draft regardless of status, used by ack
    /// reconciliation to locate the row a `ack_*`/`error_*` file applies to.
    async fn find_latest_export_for_draft(&self, org_id: Uuid, draft_order_id: Uuid) -> Result<Option<ErpExport>>;

    /// Another draft (not `exclude_draft_id`) sharing `external_order_number`
    /// for this org/customer within the trailing dedup window (spec §4.6
    /// `DUPLICATE_ORDER`).
    async fn find_duplicate_order(
        &self,
        org_id: Uuid,
        customer_id: Uuid,
        external_order_number: &str,
        since: DateTime<Utc>,
        exclude_draft_id: Uuid,
    ) -> Result<Option<Uuid>>;

    /// Dedup check of spec §4.4: a `SUCCEEDED` call of this type for this
    /// org within the trailing window identified by `since`.
    async fn find_recent_successful_ai_call(
        &self,
        org_id: Uuid,
        document_id: Uuid,
        call_type: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<AiCallLog>>;

    /// Sum of `cost_micros` for `SUCCEEDED` calls today (UTC), used by the
    /// budget gate. May be served from a cache with TTL <= 60s (spec §5).
    async fn sum_ai_cost_today(&self, org_id: Uuid) -> Result<u64>;

    async fn insert_ai_call_log(&self, log: AiCallLog) -> Result<AiCallLog>;

    async fn insert_feedback_event(&self, event: FeedbackEvent) -> Result<FeedbackEvent>;

    /// Up to 3 events for few-shot retrieval (spec §4.10), ordered by
    /// `created_at desc`, org-isolated and layout-scoped.
    async fn recent_feedback_for_layout(
        &self,
        org_id: Uuid,
        layout_fingerprint: &str,
        event_types: &[FeedbackEventType],
        limit: usize,
    ) -> Result<Vec<FeedbackEvent>>;

    async fn touch_doc_layout_profile(&self, org_id: Uuid, layout_fingerprint: &str) -> Result<()>;

    async fn get_document(&self, org_id: Uuid, document_id: Uuid) -> Result<Option<Document>>;

    async fn save_document(&self, document: Document) -> Result<Document>;

    /// Documents (by id) older than the retention cutoff for soft-delete,
    /// at most `batch_size` at a time (spec §4.11).
    async fn find_documents_older_than(
        &self,
        org_id: Uuid,
        cutoff: DateTime<Utc>,
        batch_size: usize,
    ) -> Result<Vec<Uuid>>;

    async fn soft_delete_document(&self, org_id: Uuid, document_id: Uuid) -> Result<()>;

    async fn hard_delete_ai_call_logs_older_than(&self, org_id: Uuid, cutoff: DateTime<Utc>) -> Result<u64>;

    /// One row per `(org, document, extractor)` invocation of C5 (spec §4.4).
    async fn insert_extraction_run(&self, run: ExtractionRun) -> Result<ExtractionRun>;

    async fn get_extraction_run(&self, org_id: Uuid, run_id: Uuid) -> Result<Option<ExtractionRun>>;

    /// All extraction runs recorded against one document, across every
    /// extractor that ran (rule-based and LLM), newest first. Used to
    /// compare the LLM run's `line_count` against the heuristic run's for
    /// the `LINE_COUNT_MISMATCH` validation check (spec §4.6).
    async fn list_extraction_runs_for_document(&self, org_id: Uuid, document_id: Uuid) -> Result<Vec<ExtractionRun>>;
}

/// Opaque blob storage. Keys are opaque strings of <= 512 chars.
#[async_trait]
pub trait ObjectStoragePort: Send + Sync {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String>;
    async fn get(&self, key: &str) -> Result<Vec<u8>>;
    async fn delete(&self, key: &str) -> Result<()>;
}

/// An entry returned by [`DropzonePort::list`].
#[derive(Debug, Clone)]
pub struct DropzoneEntry {
    pub path: String,
    pub size_bytes: u64,
}

/// SFTP or filesystem dropzone access. Operations are synchronous (from the
/// caller's perspective) with per-op deadlines; spec §6 specifies a single
/// contract shared by SFTP and plain-filesystem implementations.
#[async_trait]
pub trait DropzonePort: Send + Sync {
    async fn write(&self, path: &str, bytes: Vec<u8>) -> Result<()>;
    async fn rename(&self, src: &str, dst: &str) -> Result<()>;
    async fn list(&self, dir: &str) -> Result<Vec<DropzoneEntry>>;
    async fn move_entry(&self, src: &str, dst: &str) -> Result<()>;
    async fn delete(&self, path: &str) -> Result<()>;
    async fn read(&self, path: &str) -> Result<Vec<u8>>;
}

/// Raw result of an LLM extraction or repair call (spec §4.3).
#[derive(Debug, Clone)]
pub struct LlmCallResult {
    pub raw_text: String,
    pub parsed: Option<serde_json::Value>,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub latency_ms: u64,
    pub cost_micros: u64,
    pub warnings: Vec<String>,
}

/// Distinguishes a provider rate-limit from a bare timeout so the
/// orchestrator can back off without charging it against the budget gate
/// (spec §5).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFailure {
    RateLimited,
    Timeout,
    Other,
}

#[async_trait]
pub trait LlmProviderPort: Send + Sync {
    async fn extract_from_text(&self, text: &str, hint_examples: &[FewShotExample]) -> Result<LlmCallResult>;
    async fn extract_from_images(
        &self,
        images_base64: &[String],
        hint_examples: &[FewShotExample],
    ) -> Result<LlmCallResult>;
    async fn repair_malformed_json(&self, malformed: &str) -> Result<LlmCallResult>;
}

/// One few-shot example embedded in an LLM extraction prompt (spec §4.3).
#[derive(Debug, Clone)]
pub struct FewShotExample {
    pub input_snippet: String,
    pub output: serde_json::Value,
}

/// Deterministic given `(text, model)`.
#[async_trait]
pub trait EmbeddingProviderPort: Send + Sync {
    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>>;
}

/// A single-key TTL store, used for push idempotency (spec §4.8, §5).
#[async_trait]
pub trait IdempotencyCachePort: Send + Sync {
    async fn setex(&self, key: &str, value: &str, ttl: std::time::Duration) -> Result<()>;
    async fn get(&self, key: &str) -> Result<Option<String>>;
}

/// One logical leader per periodic task per org (spec §5 scheduler plane).
/// A single-instance deployment's trivial implementation always returns
/// `true`; multi-instance deployments plug in real leader election here.
#[async_trait]
pub trait LeaderElectionPort: Send + Sync {
    async fn is_leader(&self, task_name: &str) -> Result<bool>;
}
