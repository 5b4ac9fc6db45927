// SPDX-License-Identifier: MIT OR Apache-2.0
//! Deterministic in-memory implementations of the OrderFlow ports, for unit
//! tests and local development. Mirrors the shape of a real persistence
//! layer closely enough that tests written against this crate exercise the
//! same contracts a Postgres-backed implementation would.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orderflow_error::{OrderflowError, Result};
use orderflow_model::{
    trigram_similarity, AiCallLog, Customer, CustomerPrice, Document, DocumentStatus, DraftOrder,
    DraftOrderLine, ErpExport, ErpExportStatus, ExtractionRun, FeedbackEvent, FeedbackEventType,
    Product, ProductEmbedding, SkuMapping,
};
use orderflow_ports::{
    AuthContext, DropzoneEntry, DropzonePort, EmbeddingProviderPort, FewShotExample,
    IdempotencyCachePort, LeaderElectionPort, LlmCallResult, LlmProviderPort, ObjectStoragePort,
    PersistencePort, TrigramMatch, VectorMatch,
};
use uuid::Uuid;

/// A fixed-identity auth context for tests: always the same org and actor.
#[derive(Debug, Clone)]
pub struct FixedAuthContext {
    pub org_id: Uuid,
    pub actor: String,
}

impl AuthContext for FixedAuthContext {
    fn org_id(&self) -> Uuid {
        self.org_id
    }

    fn actor(&self) -> &str {
        &self.actor
    }
}

#[derive(Default)]
struct Store {
    products: HashMap<Uuid, Product>,
    customers: HashMap<Uuid, Customer>,
    documents: HashMap<Uuid, Document>,
    embeddings: HashMap<Uuid, ProductEmbedding>,
    mappings: HashMap<Uuid, SkuMapping>,
    customer_prices: Vec<CustomerPrice>,
    drafts: HashMap<Uuid, DraftOrder>,
    draft_lines: HashMap<Uuid, DraftOrderLine>,
    erp_exports: HashMap<Uuid, ErpExport>,
    ai_call_logs: Vec<AiCallLog>,
    feedback_events: Vec<FeedbackEvent>,
    layout_profiles: HashMap<(Uuid, String), (u64, u64)>,
    extraction_runs: HashMap<Uuid, ExtractionRun>,
}

/// In-memory [`PersistencePort`]. Cheap to clone (an `Arc`-free `Mutex` over
/// plain collections is fine here since this crate is test/dev-only).
pub struct MockPersistence {
    store: Mutex<Store>,
}

impl Default for MockPersistence {
    fn default() -> Self {
        Self::new()
    }
}

impl MockPersistence {
    pub fn new() -> Self {
        Self {
            store: Mutex::new(Store::default()),
        }
    }

    pub fn seed_product(&self, product: Product) {
        self.store.lock().unwrap().products.insert(product.id, product);
    }

    pub fn seed_customer(&self, customer: Customer) {
        self.store.lock().unwrap().customers.insert(customer.id, customer);
    }

    pub fn seed_embedding(&self, embedding: ProductEmbedding) {
        self.store
            .lock()
            .unwrap()
            .embeddings
            .insert(embedding.product_id, embedding);
    }

    pub fn seed_mapping(&self, mapping: SkuMapping) {
        self.store.lock().unwrap().mappings.insert(mapping.id, mapping);
    }

    pub fn seed_customer_price(&self, price: CustomerPrice) {
        self.store.lock().unwrap().customer_prices.push(price);
    }

    pub fn seed_document(&self, document: Document) {
        self.store.lock().unwrap().documents.insert(document.id, document);
    }

    /// Test-only introspection: every `AiCallLog` row recorded for `org_id`,
    /// regardless of status (the port surface only exposes
    /// succeeded-and-recent or bulk-delete queries).
    pub fn ai_call_logs_for_org(&self, org_id: Uuid) -> Vec<AiCallLog> {
        self.store
            .lock()
            .unwrap()
            .ai_call_logs
            .iter()
            .filter(|l| l.org_id == org_id)
            .cloned()
            .collect()
    }
}

fn mapping_key(org_id: Uuid, customer_id: Uuid, sku: &str) -> (Uuid, Uuid, String) {
    (org_id, customer_id, sku.to_string())
}

#[async_trait]
impl PersistencePort for MockPersistence {
    async fn get_product_by_sku(&self, org_id: Uuid, internal_sku: &str) -> Result<Option<Product>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .products
            .values()
            .find(|p| p.org_id == org_id && p.internal_sku == internal_sku)
            .cloned())
    }

    async fn get_customer(&self, org_id: Uuid, customer_id: Uuid) -> Result<Option<Customer>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .customers
            .get(&customer_id)
            .filter(|c| c.org_id == org_id)
            .cloned())
    }

    async fn trigram_search_products(
        &self,
        org_id: Uuid,
        sku_query: &str,
        text_query: &str,
    ) -> Result<Vec<TrigramMatch>> {
        let store = self.store.lock().unwrap();
        let mut matches: Vec<TrigramMatch> = store
            .products
            .values()
            .filter(|p| p.org_id == org_id && p.active)
            .filter_map(|p| {
                let sku_sim = trigram_similarity(sku_query, &p.internal_sku);
                let text_sim = trigram_similarity(text_query, &p.name_and_description());
                let sim = sku_sim.max(text_sim);
                if sim > 0.30 {
                    Some(TrigramMatch {
                        product: p.clone(),
                        similarity: sim,
                    })
                } else {
                    None
                }
            })
            .collect();
        matches.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap()
                .then_with(|| a.product.internal_sku.cmp(&b.product.internal_sku))
        });
        matches.truncate(30);
        Ok(matches)
    }

    async fn vector_search_products(
        &self,
        org_id: Uuid,
        query_embedding: &[f32],
    ) -> Result<Vec<VectorMatch>> {
        let store = self.store.lock().unwrap();
        let mut matches: Vec<VectorMatch> = store
            .products
            .values()
            .filter(|p| p.org_id == org_id && p.active)
            .filter_map(|p| {
                let embedding = store.embeddings.get(&p.id)?;
                let sim = cosine_similarity(query_embedding, &embedding.vector);
                Some(VectorMatch {
                    product: p.clone(),
                    cosine_similarity: sim,
                })
            })
            .collect();
        matches.sort_by(|a, b| b.cosine_similarity.partial_cmp(&a.cosine_similarity).unwrap());
        matches.truncate(30);
        Ok(matches)
    }

    async fn get_embedding(&self, product_id: Uuid) -> Result<Option<ProductEmbedding>> {
        Ok(self.store.lock().unwrap().embeddings.get(&product_id).cloned())
    }

    async fn get_confirmed_mapping(
        &self,
        org_id: Uuid,
        customer_id: Uuid,
        customer_sku_normalized: &str,
    ) -> Result<Option<SkuMapping>> {
        use orderflow_model::SkuMappingStatus;
        let store = self.store.lock().unwrap();
        Ok(store
            .mappings
            .values()
            .find(|m| {
                m.org_id == org_id
                    && m.customer_id == customer_id
                    && m.customer_sku_normalized == customer_sku_normalized
                    && m.status == SkuMappingStatus::Confirmed
            })
            .cloned())
    }

    async fn get_active_mapping(
        &self,
        org_id: Uuid,
        customer_id: Uuid,
        customer_sku_normalized: &str,
    ) -> Result<Option<SkuMapping>> {
        use orderflow_model::SkuMappingStatus;
        let store = self.store.lock().unwrap();
        Ok(store
            .mappings
            .values()
            .find(|m| {
                m.org_id == org_id
                    && m.customer_id == customer_id
                    && m.customer_sku_normalized == customer_sku_normalized
                    && matches!(m.status, SkuMappingStatus::Confirmed | SkuMappingStatus::Suggested)
            })
            .cloned())
    }

    async fn upsert_sku_mapping(&self, mapping: SkuMapping) -> Result<SkuMapping> {
        let mut store = self.store.lock().unwrap();
        let key = mapping_key(mapping.org_id, mapping.customer_id, &mapping.customer_sku_normalized);
        // Enforce the unique-active constraint: any existing active row for
        // this key is replaced in place (keyed by its own id), never
        // duplicated.
        let existing_id = store
            .mappings
            .values()
            .find(|m| {
                mapping_key(m.org_id, m.customer_id, &m.customer_sku_normalized) == key && m.id != mapping.id
            })
            .map(|m| m.id);
        if let Some(existing_id) = existing_id {
            store.mappings.remove(&existing_id);
        }
        store.mappings.insert(mapping.id, mapping.clone());
        Ok(mapping)
    }

    async fn find_customer_prices(
        &self,
        org_id: Uuid,
        customer_id: Uuid,
        internal_sku: &str,
    ) -> Result<Vec<CustomerPrice>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .customer_prices
            .iter()
            .filter(|p| p.org_id == org_id && p.customer_id == customer_id && p.internal_sku == internal_sku)
            .cloned()
            .collect())
    }

    async fn get_draft(&self, org_id: Uuid, draft_id: Uuid) -> Result<Option<DraftOrder>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .drafts
            .get(&draft_id)
            .filter(|d| d.org_id == org_id)
            .cloned())
    }

    async fn save_draft(&self, draft: DraftOrder) -> Result<DraftOrder> {
        let mut store = self.store.lock().unwrap();
        store.drafts.insert(draft.id, draft.clone());
        Ok(draft)
    }

    async fn get_draft_lines(&self, draft_id: Uuid) -> Result<Vec<DraftOrderLine>> {
        let store = self.store.lock().unwrap();
        let mut lines: Vec<DraftOrderLine> = store
            .draft_lines
            .values()
            .filter(|l| l.draft_order_id == draft_id)
            .cloned()
            .collect();
        lines.sort_by_key(|l| l.line_no);
        Ok(lines)
    }

    async fn save_draft_line(&self, line: DraftOrderLine) -> Result<DraftOrderLine> {
        let mut store = self.store.lock().unwrap();
        store.draft_lines.insert(line.id, line.clone());
        Ok(line)
    }

    async fn get_erp_export(&self, org_id: Uuid, export_id: Uuid) -> Result<Option<ErpExport>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .erp_exports
            .get(&export_id)
            .filter(|e| e.org_id == org_id)
            .cloned())
    }

    async fn save_erp_export(&self, export: ErpExport) -> Result<ErpExport> {
        let mut store = self.store.lock().unwrap();
        store.erp_exports.insert(export.id, export.clone());
        Ok(export)
    }

    async fn find_active_export_for_draft(&self, org_id: Uuid, draft_order_id: Uuid) -> Result<Option<ErpExport>> {
        let store = self.store.lock().unwrap();
        let mut candidates: Vec<&ErpExport> = store
            .erp_exports
            .values()
            .filter(|e| {
                e.org_id == org_id
                    && e.draft_order_id == draft_order_id
                    && matches!(e.status, ErpExportStatus::Pending | ErpExportStatus::Sent)
            })
            .collect();
        candidates.sort_by_key(|e| e.created_at);
        Ok(candidates.last().map(|e| (*e).clone()))
    }

    async fn find_latest_export_for_draft(&self, org_id: Uuid, draft_order_id: Uuid) -> Result<Option<ErpExport>> {
        let store = self.store.lock().unwrap();
        let mut candidates: Vec<&ErpExport> = store
            .erp_exports
            .values()
            .filter(|e| e.org_id == org_id && e.draft_order_id == draft_order_id)
            .collect();
        candidates.sort_by_key(|e| e.created_at);
        Ok(candidates.last().map(|e| (*e).clone()))
    }

    async fn find_duplicate_order(
        &self,
        org_id: Uuid,
        customer_id: Uuid,
        external_order_number: &str,
        since: DateTime<Utc>,
        exclude_draft_id: Uuid,
    ) -> Result<Option<Uuid>> {
        let store = self.store.lock().unwrap();
        let since_date = since.date_naive();
        Ok(store
            .drafts
            .values()
            .find(|d| {
                d.org_id == org_id
                    && d.id != exclude_draft_id
                    && d.customer_id == Some(customer_id)
                    && d.external_order_number.as_deref() == Some(external_order_number)
                    && d.order_date.map(|od| od >= since_date).unwrap_or(true)
            })
            .map(|d| d.id))
    }

    async fn find_recent_successful_ai_call(
        &self,
        org_id: Uuid,
        document_id: Uuid,
        call_type: &str,
        since: DateTime<Utc>,
    ) -> Result<Option<AiCallLog>> {
        use orderflow_model::AiCallStatus;
        let store = self.store.lock().unwrap();
        Ok(store
            .ai_call_logs
            .iter()
            .find(|l| {
                l.org_id == org_id
                    && l.document_id == Some(document_id)
                    && l.call_type == call_type
                    && l.status == AiCallStatus::Succeeded
                    && l.created_at >= since
            })
            .cloned())
    }

    async fn sum_ai_cost_today(&self, org_id: Uuid) -> Result<u64> {
        use orderflow_model::AiCallStatus;
        let today = Utc::now().date_naive();
        let store = self.store.lock().unwrap();
        Ok(store
            .ai_call_logs
            .iter()
            .filter(|l| l.org_id == org_id && l.status == AiCallStatus::Succeeded && l.created_at.date_naive() == today)
            .map(|l| l.cost_micros)
            .sum())
    }

    async fn insert_ai_call_log(&self, log: AiCallLog) -> Result<AiCallLog> {
        let mut store = self.store.lock().unwrap();
        store.ai_call_logs.push(log.clone());
        Ok(log)
    }

    async fn insert_feedback_event(&self, event: FeedbackEvent) -> Result<FeedbackEvent> {
        let mut store = self.store.lock().unwrap();
        store.feedback_events.push(event.clone());
        Ok(event)
    }

    async fn recent_feedback_for_layout(
        &self,
        org_id: Uuid,
        layout_fingerprint: &str,
        event_types: &[FeedbackEventType],
        limit: usize,
    ) -> Result<Vec<FeedbackEvent>> {
        let store = self.store.lock().unwrap();
        let mut events: Vec<FeedbackEvent> = store
            .feedback_events
            .iter()
            .filter(|e| {
                e.org_id == org_id
                    && e.layout_fingerprint.as_deref() == Some(layout_fingerprint)
                    && event_types.contains(&e.event_type)
            })
            .cloned()
            .collect();
        events.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        events.truncate(limit);
        Ok(events)
    }

    async fn touch_doc_layout_profile(&self, org_id: Uuid, layout_fingerprint: &str) -> Result<()> {
        let mut store = self.store.lock().unwrap();
        let entry = store
            .layout_profiles
            .entry((org_id, layout_fingerprint.to_string()))
            .or_insert((0, 0));
        entry.0 += 1;
        Ok(())
    }

    async fn get_document(&self, org_id: Uuid, document_id: Uuid) -> Result<Option<Document>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .documents
            .get(&document_id)
            .filter(|d| d.org_id == org_id)
            .cloned())
    }

    async fn save_document(&self, document: Document) -> Result<Document> {
        let mut store = self.store.lock().unwrap();
        store.documents.insert(document.id, document.clone());
        Ok(document)
    }

    async fn find_documents_older_than(
        &self,
        org_id: Uuid,
        cutoff: DateTime<Utc>,
        batch_size: usize,
    ) -> Result<Vec<Uuid>> {
        let store = self.store.lock().unwrap();
        let mut ids: Vec<Uuid> = store
            .documents
            .values()
            .filter(|d| d.org_id == org_id && d.status != DocumentStatus::Deleted && d.created_at < cutoff)
            .map(|d| d.id)
            .collect();
        ids.sort();
        ids.truncate(batch_size);
        Ok(ids)
    }

    async fn soft_delete_document(&self, org_id: Uuid, document_id: Uuid) -> Result<()> {
        let mut store = self.store.lock().unwrap();
        if let Some(document) = store.documents.get_mut(&document_id) {
            if document.org_id == org_id {
                document.status = DocumentStatus::Deleted;
                document.storage_key = None;
            }
        }
        Ok(())
    }

    async fn hard_delete_ai_call_logs_older_than(&self, org_id: Uuid, cutoff: DateTime<Utc>) -> Result<u64> {
        let mut store = self.store.lock().unwrap();
        let before = store.ai_call_logs.len();
        store
            .ai_call_logs
            .retain(|l| !(l.org_id == org_id && l.created_at < cutoff));
        Ok((before - store.ai_call_logs.len()) as u64)
    }

    async fn insert_extraction_run(&self, run: ExtractionRun) -> Result<ExtractionRun> {
        let mut store = self.store.lock().unwrap();
        store.extraction_runs.insert(run.id, run.clone());
        Ok(run)
    }

    async fn get_extraction_run(&self, org_id: Uuid, run_id: Uuid) -> Result<Option<ExtractionRun>> {
        let store = self.store.lock().unwrap();
        Ok(store
            .extraction_runs
            .get(&run_id)
            .filter(|r| r.org_id == org_id)
            .cloned())
    }

    async fn list_extraction_runs_for_document(&self, org_id: Uuid, document_id: Uuid) -> Result<Vec<ExtractionRun>> {
        let store = self.store.lock().unwrap();
        let mut runs: Vec<ExtractionRun> = store
            .extraction_runs
            .values()
            .filter(|r| r.org_id == org_id && r.document_id == document_id)
            .cloned()
            .collect();
        runs.sort_by(|a, b| b.started_at.cmp(&a.started_at));
        Ok(runs)
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        (dot / (norm_a * norm_b)) as f64
    }
}

/// In-memory object store, keyed by opaque string.
#[derive(Default)]
pub struct MockObjectStorage {
    objects: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl ObjectStoragePort for MockObjectStorage {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String> {
        if key.len() > 512 {
            return Err(OrderflowError::validation("object key exceeds 512 chars"));
        }
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
        Ok(key.to_string())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .get(key)
            .cloned()
            .ok_or_else(|| OrderflowError::not_found(format!("object not found: {key}")))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

/// In-memory dropzone, simulating a filesystem directory tree with plain
/// string paths as keys.
#[derive(Default)]
pub struct MockDropzone {
    files: Mutex<HashMap<String, Vec<u8>>>,
}

#[async_trait]
impl DropzonePort for MockDropzone {
    async fn write(&self, path: &str, bytes: Vec<u8>) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        if files.contains_key(path) {
            return Err(OrderflowError::new(
                orderflow_error::ErrorCode::NameCollision,
                format!("path already exists: {path}"),
            ));
        }
        files.insert(path.to_string(), bytes);
        Ok(())
    }

    async fn rename(&self, src: &str, dst: &str) -> Result<()> {
        let mut files = self.files.lock().unwrap();
        if files.contains_key(dst) {
            return Err(OrderflowError::new(
                orderflow_error::ErrorCode::NameCollision,
                format!("rename destination exists: {dst}"),
            ));
        }
        let bytes = files
            .remove(src)
            .ok_or_else(|| OrderflowError::not_found(format!("rename source missing: {src}")))?;
        files.insert(dst.to_string(), bytes);
        Ok(())
    }

    async fn list(&self, dir: &str) -> Result<Vec<DropzoneEntry>> {
        let prefix = if dir.ends_with('/') { dir.to_string() } else { format!("{dir}/") };
        let files = self.files.lock().unwrap();
        Ok(files
            .iter()
            .filter(|(path, _)| path.starts_with(&prefix) && !path[prefix.len()..].contains('/'))
            .map(|(path, bytes)| DropzoneEntry {
                path: path.clone(),
                size_bytes: bytes.len() as u64,
            })
            .collect())
    }

    async fn move_entry(&self, src: &str, dst: &str) -> Result<()> {
        self.rename(src, dst).await
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .cloned()
            .ok_or_else(|| OrderflowError::not_found(format!("file not found: {path}")))
    }
}

/// In-memory TTL cache for push idempotency keys.
#[derive(Default)]
pub struct MockIdempotencyCache {
    entries: Mutex<HashMap<String, (String, Instant, Duration)>>,
}

#[async_trait]
impl IdempotencyCachePort for MockIdempotencyCache {
    async fn setex(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), Instant::now(), ttl));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((value, set_at, ttl)) if set_at.elapsed() < *ttl => Ok(Some(value.clone())),
            Some(_) => {
                entries.remove(key);
                Ok(None)
            }
            None => Ok(None),
        }
    }
}

/// A leader election mock that is always the leader — correct for any
/// single-instance deployment, which is all that is exercised in tests.
#[derive(Default)]
pub struct AlwaysLeader;

#[async_trait]
impl LeaderElectionPort for AlwaysLeader {
    async fn is_leader(&self, _task_name: &str) -> Result<bool> {
        Ok(true)
    }
}

/// A scripted [`LlmProviderPort`]: tests queue up responses per operation
/// and they're handed out in FIFO order, so a test can script a malformed
/// first response followed by a clean repair.
#[derive(Default)]
pub struct MockLlmProvider {
    text_responses: Mutex<VecDeque<Result<LlmCallResult>>>,
    image_responses: Mutex<VecDeque<Result<LlmCallResult>>>,
    repair_responses: Mutex<VecDeque<Result<LlmCallResult>>>,
}

impl MockLlmProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_text_response(&self, response: Result<LlmCallResult>) {
        self.text_responses.lock().unwrap().push_back(response);
    }

    pub fn push_image_response(&self, response: Result<LlmCallResult>) {
        self.image_responses.lock().unwrap().push_back(response);
    }

    pub fn push_repair_response(&self, response: Result<LlmCallResult>) {
        self.repair_responses.lock().unwrap().push_back(response);
    }
}

fn pop_scripted(queue: &Mutex<VecDeque<Result<LlmCallResult>>>, op: &str) -> Result<LlmCallResult> {
    queue
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| Err(OrderflowError::fatal(format!("no scripted {op} response queued"))))
}

#[async_trait]
impl LlmProviderPort for MockLlmProvider {
    async fn extract_from_text(&self, _text: &str, _hint_examples: &[FewShotExample]) -> Result<LlmCallResult> {
        pop_scripted(&self.text_responses, "extract_from_text")
    }

    async fn extract_from_images(
        &self,
        _images_base64: &[String],
        _hint_examples: &[FewShotExample],
    ) -> Result<LlmCallResult> {
        pop_scripted(&self.image_responses, "extract_from_images")
    }

    async fn repair_malformed_json(&self, _malformed: &str) -> Result<LlmCallResult> {
        pop_scripted(&self.repair_responses, "repair_malformed_json")
    }
}

/// A deterministic [`EmbeddingProviderPort`]: the embedding is a hash of
/// `(text, model)` expanded into a fixed-width unit vector, so repeated
/// calls with the same input are reproducible across a test run.
#[derive(Default)]
pub struct MockEmbeddingProvider;

#[async_trait]
impl EmbeddingProviderPort for MockEmbeddingProvider {
    async fn embed(&self, text: &str, model: &str) -> Result<Vec<f32>> {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        const DIMS: usize = 8;
        let mut vector = Vec::with_capacity(DIMS);
        for i in 0..DIMS {
            let mut hasher = DefaultHasher::new();
            (text, model, i).hash(&mut hasher);
            let bits = hasher.finish();
            vector.push(((bits % 2000) as f32 / 1000.0) - 1.0);
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }
}
