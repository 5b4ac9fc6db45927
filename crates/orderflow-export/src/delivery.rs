//! Filename generation and the atomic tmp+rename delivery of spec §4.8.

use chrono::{DateTime, Utc};
use orderflow_error::{ErrorCode, Result};
use orderflow_ports::{DropzonePort, ObjectStoragePort};
use uuid::Uuid;

/// `sales_order_{draft_id}_{YYYYMMDD_HHMMSSZ}_{uuid4_short}.json`.
pub fn export_filename(draft_id: Uuid, timestamp: DateTime<Utc>, short_id: &str) -> String {
    format!(
        "sales_order_{draft_id}_{}_{short_id}.json",
        timestamp.format("%Y%m%d_%H%M%SZ"),
    )
}

fn new_short_id() -> String {
    Uuid::new_v4().simple().to_string()[..8].to_string()
}

/// What delivering one export produced.
#[derive(Debug, Clone)]
pub struct ExportResult {
    pub success: bool,
    pub storage_key: Option<String>,
    pub dropzone_path: Option<String>,
    pub connector_metadata: serde_json::Value,
    pub error: Option<String>,
}

/// Write `bytes` to object storage at `exports/{org_id}/{filename}` and to
/// the dropzone via tmp+rename, retrying the rename once with a fresh
/// `uuid4_short` on a name collision (spec §4.8).
pub async fn deliver(
    object_storage: &dyn ObjectStoragePort,
    dropzone: &dyn DropzonePort,
    org_id: Uuid,
    draft_id: Uuid,
    bytes: Vec<u8>,
    now: DateTime<Utc>,
) -> Result<ExportResult> {
    let first_short = new_short_id();
    match try_deliver(object_storage, dropzone, org_id, draft_id, &bytes, now, &first_short).await {
        Ok(result) => Ok(result),
        Err(err) if err.code() == ErrorCode::NameCollision => {
            let second_short = new_short_id();
            match try_deliver(object_storage, dropzone, org_id, draft_id, &bytes, now, &second_short).await {
                Ok(result) => Ok(result),
                Err(_) => Ok(ExportResult {
                    success: false,
                    storage_key: None,
                    dropzone_path: None,
                    connector_metadata: serde_json::json!({}),
                    error: Some("NAME_COLLISION".to_string()),
                }),
            }
        }
        Err(err) => Ok(ExportResult {
            success: false,
            storage_key: None,
            dropzone_path: None,
            connector_metadata: serde_json::json!({}),
            error: Some(err.message().to_string()),
        }),
    }
}

async fn try_deliver(
    object_storage: &dyn ObjectStoragePort,
    dropzone: &dyn DropzonePort,
    org_id: Uuid,
    draft_id: Uuid,
    bytes: &[u8],
    now: DateTime<Utc>,
    short_id: &str,
) -> Result<ExportResult> {
    let filename = export_filename(draft_id, now, short_id);
    let storage_key = format!("exports/{org_id}/{filename}");
    let stored_key = object_storage.put(&storage_key, bytes.to_vec()).await?;

    let tmp_path = format!("{filename}.tmp");
    dropzone.write(&tmp_path, bytes.to_vec()).await?;
    match dropzone.rename(&tmp_path, &filename).await {
        Ok(()) => Ok(ExportResult {
            success: true,
            storage_key: Some(stored_key),
            dropzone_path: Some(filename),
            connector_metadata: serde_json::json!({}),
            error: None,
        }),
        Err(err) => {
            let _ = dropzone.delete(&tmp_path).await;
            Err(err)
        }
    }
}
