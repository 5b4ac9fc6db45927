// SPDX-License-Identifier: MIT OR Apache-2.0
//! Age-based purge of documents and AI call logs (spec §4.11). Runs once
//! per org per invocation; the daily 02:00 UTC schedule and per-org leader
//! election live in the daemon, not here.

use chrono::{DateTime, Duration, Utc};
use orderflow_config::OrgSettings;
use orderflow_error::Result;
use orderflow_model::AuditLog;
use orderflow_ports::PersistencePort;
use uuid::Uuid;

/// Rows touched per `find_documents_older_than` call (spec §4.11).
const BATCH_SIZE: usize = 1000;

/// What one retention run for one org did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetentionSummary {
    pub documents_soft_deleted: u64,
    pub ai_call_logs_hard_deleted: u64,
}

/// Soft-delete documents older than `settings.raw_document_retention_days`
/// and hard-delete AI call logs older than
/// `settings.ai_call_log_retention_days`, both scoped to `org_id`.
///
/// Idempotent: running this twice against an unchanged corpus deletes
/// nothing on the second call, since `find_documents_older_than` only
/// returns non-`DELETED` documents.
pub async fn run(
    persistence: &dyn PersistencePort,
    org_id: Uuid,
    settings: &OrgSettings,
    now: DateTime<Utc>,
) -> Result<RetentionSummary> {
    let document_cutoff = now - Duration::days(settings.raw_document_retention_days as i64);
    let mut documents_soft_deleted = 0u64;
    loop {
        let batch = persistence
            .find_documents_older_than(org_id, document_cutoff, BATCH_SIZE)
            .await?;
        let batch_len = batch.len();
        for document_id in batch {
            persistence.soft_delete_document(org_id, document_id).await?;
            documents_soft_deleted += 1;
        }
        if batch_len < BATCH_SIZE {
            break;
        }
    }

    let ai_call_log_cutoff = now - Duration::days(settings.ai_call_log_retention_days as i64);
    let ai_call_logs_hard_deleted = persistence
        .hard_delete_ai_call_logs_older_than(org_id, ai_call_log_cutoff)
        .await?;

    tracing::info!(
        %org_id,
        documents_soft_deleted,
        ai_call_logs_hard_deleted,
        "retention run complete"
    );

    Ok(RetentionSummary {
        documents_soft_deleted,
        ai_call_logs_hard_deleted,
    })
}

/// Immediate, operator-initiated deletion of a single document, bypassing
/// the age cutoff. Emits `MANUAL_DELETE` (spec §4.11); authorization to
/// ADMIN is the caller's responsibility, not this function's.
pub async fn manual_delete(
    persistence: &dyn PersistencePort,
    org_id: Uuid,
    document_id: Uuid,
    actor: &str,
) -> Result<AuditLog> {
    persistence.soft_delete_document(org_id, document_id).await?;
    Ok(AuditLog {
        id: Uuid::new_v4(),
        org_id,
        subject_type: "document".to_string(),
        subject_id: document_id,
        action: "MANUAL_DELETE".to_string(),
        actor: actor.to_string(),
        details: serde_json::json!({}),
        created_at: Utc::now(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderflow_model::{Document, DocumentStatus};
    use orderflow_persistence_mock::MockPersistence;

    fn document(org_id: Uuid, created_at: DateTime<Utc>) -> Document {
        Document {
            id: Uuid::new_v4(),
            org_id,
            inbound_message_id: None,
            storage_key: Some("raw/doc.pdf".to_string()),
            mime_type: "application/pdf".to_string(),
            size_bytes: 1024,
            sha256: "deadbeef".to_string(),
            filename: "doc.pdf".to_string(),
            status: DocumentStatus::Extracted,
            text_coverage_ratio: Some(0.9),
            page_count: Some(1),
            layout_fingerprint: Some("fp1".to_string()),
            created_at,
        }
    }

    #[tokio::test]
    async fn soft_deletes_documents_past_cutoff_and_clears_storage_key() {
        let persistence = MockPersistence::default();
        let org_id = Uuid::new_v4();
        let now = Utc::now();
        let old = document(org_id, now - Duration::days(400));
        let recent = document(org_id, now - Duration::days(5));
        persistence.seed_document(old.clone());
        persistence.seed_document(recent.clone());

        let settings = OrgSettings::default();
        let summary = run(&persistence, org_id, &settings, now).await.unwrap();
        assert_eq!(summary.documents_soft_deleted, 1);

        let remaining = persistence
            .find_documents_older_than(org_id, now - Duration::days(1), 10)
            .await
            .unwrap();
        assert_eq!(remaining, vec![recent.id]);
    }

    #[tokio::test]
    async fn second_run_on_unchanged_corpus_deletes_nothing() {
        let persistence = MockPersistence::default();
        let org_id = Uuid::new_v4();
        let now = Utc::now();
        persistence.seed_document(document(org_id, now - Duration::days(400)));

        let settings = OrgSettings::default();
        let first = run(&persistence, org_id, &settings, now).await.unwrap();
        let second = run(&persistence, org_id, &settings, now).await.unwrap();
        assert_eq!(first.documents_soft_deleted, 1);
        assert_eq!(second.documents_soft_deleted, 0);
    }

    #[tokio::test]
    async fn manual_delete_emits_audit_log_immediately() {
        let persistence = MockPersistence::default();
        let org_id = Uuid::new_v4();
        let doc = document(org_id, Utc::now());
        persistence.seed_document(doc.clone());

        let log = manual_delete(&persistence, org_id, doc.id, "admin@example.com")
            .await
            .unwrap();
        assert_eq!(log.action, "MANUAL_DELETE");
        assert_eq!(log.subject_id, doc.id);

        let remaining = persistence
            .find_documents_older_than(org_id, Utc::now() + Duration::days(1), 10)
            .await
            .unwrap();
        assert!(remaining.is_empty());
    }

    #[tokio::test]
    async fn hard_deletes_ai_call_logs_past_their_own_cutoff() {
        use orderflow_model::{AiCallLog, AiCallStatus};
        let persistence = MockPersistence::default();
        let org_id = Uuid::new_v4();
        let now = Utc::now();
        persistence
            .insert_ai_call_log(AiCallLog {
                id: Uuid::new_v4(),
                org_id,
                document_id: None,
                call_type: "extract".to_string(),
                provider: "openai".to_string(),
                model: "gpt".to_string(),
                input_tokens: 500,
                output_tokens: 200,
                latency_ms: 850,
                cost_micros: 100,
                status: AiCallStatus::Succeeded,
                input_hash: None,
                created_at: now - Duration::days(120),
            })
            .await
            .unwrap();

        let settings = OrgSettings::default();
        let summary = run(&persistence, org_id, &settings, now).await.unwrap();
        assert_eq!(summary.ai_call_logs_hard_deleted, 1);
    }
}
