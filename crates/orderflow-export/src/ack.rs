//! Ack reconciliation (spec §4.8): a scheduled worker polls the dropzone's
//! `ack_path` for `ack_*.json` / `error_*.json` files, applies each to the
//! matching `ErpExport`, and moves the file to `processed/` or `error/`.
//! Move-after-commit makes the worker at-least-once safe: a crash between
//! persisting the new status and moving the file just means the file is
//! reprocessed, which is a no-op against an already-terminal export.

use chrono::{DateTime, Utc};
use orderflow_error::{OrderflowError, Result};
use orderflow_model::{ErpExport, ErpExportStatus};
use orderflow_ports::{DropzoneEntry, DropzonePort, PersistencePort};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
#[serde(tag = "status")]
enum AckFile {
    #[serde(rename = "ACKED")]
    Acked {
        erp_order_id: String,
        #[allow(dead_code)]
        processed_at: DateTime<Utc>,
    },
    #[serde(rename = "FAILED")]
    Failed {
        error_code: String,
        message: String,
        #[allow(dead_code)]
        processed_at: DateTime<Utc>,
    },
}

/// Tally of one reconciliation sweep, surfaced to the caller for logging.
#[derive(Debug, Default, Clone)]
pub struct AckReconciliationSummary {
    pub acked: u32,
    pub failed: u32,
    pub malformed: u32,
    pub ignored_duplicate: u32,
    pub unmatched: u32,
}

/// Extract the draft order id embedded in an export/ack filename:
/// `sales_order_{draft_id}_...` preceded by an optional `ack_`/`error_`
/// prefix (spec §4.8 filename pattern).
fn extract_draft_id(filename: &str) -> Option<Uuid> {
    let stripped = filename
        .strip_prefix("ack_")
        .or_else(|| filename.strip_prefix("error_"))
        .unwrap_or(filename);
    let rest = stripped.strip_prefix("sales_order_")?;
    let draft_id_str = rest.get(..36)?;
    Uuid::parse_str(draft_id_str).ok()
}

/// One sweep of the ack directory for one org.
pub async fn reconcile(
    persistence: &dyn PersistencePort,
    dropzone: &dyn DropzonePort,
    org_id: Uuid,
    ack_dir: &str,
) -> Result<AckReconciliationSummary> {
    let mut summary = AckReconciliationSummary::default();
    let entries: Vec<DropzoneEntry> = dropzone.list(ack_dir).await?;

    for entry in entries {
        let filename = entry
            .path
            .rsplit('/')
            .next()
            .unwrap_or(&entry.path)
            .to_string();
        let is_ack = filename.starts_with("ack_");
        let is_error = filename.starts_with("error_");
        if !is_ack && !is_error {
            continue;
        }

        let bytes = dropzone.read(&entry.path).await?;
        let parsed: std::result::Result<AckFile, _> = serde_json::from_slice(&bytes);
        let Ok(ack_file) = parsed else {
            summary.malformed += 1;
            move_to(dropzone, &entry.path, ack_dir, "error", &filename).await?;
            continue;
        };

        let Some(draft_id) = extract_draft_id(&filename) else {
            summary.malformed += 1;
            move_to(dropzone, &entry.path, ack_dir, "error", &filename).await?;
            continue;
        };

        let Some(export) = persistence.find_latest_export_for_draft(org_id, draft_id).await? else {
            summary.unmatched += 1;
            move_to(dropzone, &entry.path, ack_dir, "error", &filename).await?;
            continue;
        };

        if matches!(export.status, ErpExportStatus::Acked | ErpExportStatus::Failed) {
            summary.ignored_duplicate += 1;
            warn!(export_id = %export.id, "duplicate ack for already-terminal export, ignoring");
            move_to(dropzone, &entry.path, ack_dir, "processed", &filename).await?;
            continue;
        }

        match ack_file {
            AckFile::Acked { erp_order_id, .. } => {
                let updated = ErpExport {
                    status: ErpExportStatus::Acked,
                    erp_order_id: Some(erp_order_id),
                    ..export
                };
                persistence.save_erp_export(updated).await?;
                summary.acked += 1;
                info!(draft_id = %draft_id, "export acked");
            }
            AckFile::Failed { error_code, message, .. } => {
                let updated = ErpExport {
                    status: ErpExportStatus::Failed,
                    error_json: Some(serde_json::json!({"error_code": error_code, "message": message})),
                    ..export
                };
                persistence.save_erp_export(updated).await?;
                summary.failed += 1;
            }
        }

        move_to(dropzone, &entry.path, ack_dir, "processed", &filename).await?;
    }

    Ok(summary)
}

async fn move_to(
    dropzone: &dyn DropzonePort,
    src: &str,
    ack_dir: &str,
    subdir: &str,
    filename: &str,
) -> Result<()> {
    let dst = format!("{}/{}/{}", ack_dir.trim_end_matches('/'), subdir, filename);
    dropzone.move_entry(src, &dst).await.map_err(|e| {
        OrderflowError::fatal(format!("failed to move {src} to {dst}: {e}"))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderflow_persistence_mock::MockDropzone;
    use orderflow_persistence_mock::MockPersistence;

    fn sample_export(org_id: Uuid, draft_id: Uuid) -> ErpExport {
        ErpExport {
            id: Uuid::new_v4(),
            org_id,
            draft_order_id: draft_id,
            erp_connection_id: Uuid::new_v4(),
            status: ErpExportStatus::Sent,
            export_storage_key: None,
            dropzone_path: None,
            erp_order_id: None,
            error_json: None,
            idempotency_key: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn extracts_draft_id_from_ack_filename() {
        let draft_id = Uuid::new_v4();
        let filename = format!("ack_sales_order_{draft_id}_20260727_120000Z_abcd1234.json");
        assert_eq!(extract_draft_id(&filename), Some(draft_id));
    }

    #[test]
    fn extracts_draft_id_from_error_filename() {
        let draft_id = Uuid::new_v4();
        let filename = format!("error_sales_order_{draft_id}_20260727_120000Z_abcd1234.json");
        assert_eq!(extract_draft_id(&filename), Some(draft_id));
    }

    #[tokio::test]
    async fn applies_acked_status_and_moves_to_processed() {
        let persistence = MockPersistence::default();
        let dropzone = MockDropzone::default();
        let org_id = Uuid::new_v4();
        let draft_id = Uuid::new_v4();
        let export = sample_export(org_id, draft_id);
        let export_id = export.id;
        persistence.save_erp_export(export).await.unwrap();

        let filename = format!("ack_sales_order_{draft_id}_20260727_120000Z_abcd1234.json");
        let path = format!("acks/{filename}");
        dropzone
            .write(
                &path,
                serde_json::json!({
                    "status": "ACKED",
                    "erp_order_id": "ERP-9",
                    "processed_at": Utc::now().to_rfc3339(),
                })
                .to_string()
                .into_bytes(),
            )
            .await
            .unwrap();

        let summary = reconcile(&persistence, &dropzone, org_id, "acks").await.unwrap();
        assert_eq!(summary.acked, 1);

        let updated = persistence.get_erp_export(org_id, export_id).await.unwrap().unwrap();
        assert_eq!(updated.status, ErpExportStatus::Acked);
        assert_eq!(updated.erp_order_id.as_deref(), Some("ERP-9"));
    }

    #[tokio::test]
    async fn malformed_json_moves_to_error_dir() {
        let persistence = MockPersistence::default();
        let dropzone = MockDropzone::default();
        let org_id = Uuid::new_v4();

        let path = "acks/ack_not_even_json.json".to_string();
        dropzone.write(&path, b"{not json".to_vec()).await.unwrap();

        let summary = reconcile(&persistence, &dropzone, org_id, "acks").await.unwrap();
        assert_eq!(summary.malformed, 1);
    }

    #[tokio::test]
    async fn duplicate_ack_on_terminal_export_is_ignored() {
        let persistence = MockPersistence::default();
        let dropzone = MockDropzone::default();
        let org_id = Uuid::new_v4();
        let draft_id = Uuid::new_v4();
        let mut export = sample_export(org_id, draft_id);
        export.status = ErpExportStatus::Acked;
        persistence.save_erp_export(export).await.unwrap();

        let filename = format!("ack_sales_order_{draft_id}_20260727_120000Z_abcd1234.json");
        dropzone
            .write(
                &format!("acks/{filename}"),
                serde_json::json!({
                    "status": "ACKED",
                    "erp_order_id": "ERP-9",
                    "processed_at": Utc::now().to_rfc3339(),
                })
                .to_string()
                .into_bytes(),
            )
            .await
            .unwrap();

        let summary = reconcile(&persistence, &dropzone, org_id, "acks").await.unwrap();
        assert_eq!(summary.ignored_duplicate, 1);
        assert_eq!(summary.acked, 0);
    }
}
