//! Push idempotency (spec §4.8): an `Idempotency-Key` scoped to
//! `(org, draft)` maps to an `ErpExport` id for 24h; in its absence, a draft
//! already `PUSHING`/`PUSHED` rejects with `CONFLICT`.

use chrono::Utc;
use orderflow_error::{ErrorCode, OrderflowError, Result};
use orderflow_model::{ErpExport, ErpExportStatus};
use orderflow_ports::{IdempotencyCachePort, PersistencePort};
use std::time::Duration;
use uuid::Uuid;

pub const IDEMPOTENCY_CACHE_TTL_HOURS: u64 = 24;

fn cache_key(org_id: Uuid, draft_order_id: Uuid) -> String {
    format!("orderflow:push:{org_id}:{draft_order_id}")
}

/// Resolve (or create) the `ErpExport` row a push should proceed against.
/// Returns `Ok(existing)` when a duplicate request is recognized — either
/// via the idempotency cache or, lacking a key, via an already-active
/// export for the draft — in which case the caller must not attempt
/// delivery again.
pub enum PushResolution {
    /// Proceed with delivery against this freshly-created row.
    New(ErpExport),
    /// A duplicate request; the caller returns this row as-is.
    Existing(ErpExport),
}

pub async fn resolve_push(
    persistence: &dyn PersistencePort,
    idempotency_cache: &dyn IdempotencyCachePort,
    org_id: Uuid,
    draft_order_id: Uuid,
    erp_connection_id: Uuid,
    idempotency_key: Option<&str>,
) -> Result<PushResolution> {
    if let Some(key) = idempotency_key {
        let full_key = cache_key(org_id, draft_order_id);
        if let Some(cached_export_id) = idempotency_cache.get(&full_key).await? {
            let export_id: Uuid = cached_export_id
                .parse()
                .map_err(|_| OrderflowError::fatal("corrupt idempotency cache value"))?;
            if let Some(existing) = persistence.get_erp_export(org_id, export_id).await? {
                return Ok(PushResolution::Existing(existing));
            }
        }
        let export = new_export(org_id, draft_order_id, erp_connection_id, Some(key.to_string()));
        let saved = persistence.save_erp_export(export).await?;
        idempotency_cache
            .setex(
                &full_key,
                &saved.id.to_string(),
                Duration::from_secs(IDEMPOTENCY_CACHE_TTL_HOURS * 3600),
            )
            .await?;
        return Ok(PushResolution::New(saved));
    }

    if persistence.find_active_export_for_draft(org_id, draft_order_id).await?.is_some() {
        return Err(OrderflowError::new(
            ErrorCode::AlreadyPushing,
            format!("draft {draft_order_id} already has an active export"),
        ));
    }

    let export = new_export(org_id, draft_order_id, erp_connection_id, None);
    let saved = persistence.save_erp_export(export).await?;
    Ok(PushResolution::New(saved))
}

fn new_export(org_id: Uuid, draft_order_id: Uuid, erp_connection_id: Uuid, idempotency_key: Option<String>) -> ErpExport {
    ErpExport {
        id: Uuid::new_v4(),
        org_id,
        draft_order_id,
        erp_connection_id,
        status: ErpExportStatus::Pending,
        export_storage_key: None,
        dropzone_path: None,
        erp_order_id: None,
        error_json: None,
        idempotency_key,
        created_at: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderflow_persistence_mock::{MockIdempotencyCache, MockPersistence};

    #[tokio::test]
    async fn duplicate_key_returns_same_export() {
        let persistence = MockPersistence::default();
        let cache = MockIdempotencyCache::default();
        let org_id = Uuid::new_v4();
        let draft_id = Uuid::new_v4();
        let connection_id = Uuid::new_v4();

        let first = resolve_push(&persistence, &cache, org_id, draft_id, connection_id, Some("key-1"))
            .await
            .unwrap();
        let first_id = match first {
            PushResolution::New(e) => e.id,
            PushResolution::Existing(_) => panic!("expected new export"),
        };

        let second = resolve_push(&persistence, &cache, org_id, draft_id, connection_id, Some("key-1"))
            .await
            .unwrap();
        match second {
            PushResolution::Existing(e) => assert_eq!(e.id, first_id),
            PushResolution::New(_) => panic!("expected duplicate resolution"),
        }
    }

    #[tokio::test]
    async fn no_key_rejects_when_already_active() {
        let persistence = MockPersistence::default();
        let cache = MockIdempotencyCache::default();
        let org_id = Uuid::new_v4();
        let draft_id = Uuid::new_v4();
        let connection_id = Uuid::new_v4();

        resolve_push(&persistence, &cache, org_id, draft_id, connection_id, None)
            .await
            .unwrap();
        let second = resolve_push(&persistence, &cache, org_id, draft_id, connection_id, None).await;
        assert!(second.is_err());
    }

    #[tokio::test]
    async fn no_key_allows_retry_after_terminal_failure() {
        let persistence = MockPersistence::default();
        let cache = MockIdempotencyCache::default();
        let org_id = Uuid::new_v4();
        let draft_id = Uuid::new_v4();
        let connection_id = Uuid::new_v4();

        let first = resolve_push(&persistence, &cache, org_id, draft_id, connection_id, None)
            .await
            .unwrap();
        let mut export = match first {
            PushResolution::New(e) => e,
            _ => unreachable!(),
        };
        export.status = ErpExportStatus::Failed;
        persistence.save_erp_export(export).await.unwrap();

        let second = resolve_push(&persistence, &cache, org_id, draft_id, connection_id, None).await;
        assert!(second.is_ok());
    }
}
