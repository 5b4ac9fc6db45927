// SPDX-License-Identifier: MIT OR Apache-2.0
//! Feedback capture, confirm/reject mapping mutations (spec §4.9), and
//! layout-scoped few-shot retrieval (spec §4.10).

use chrono::Utc;
use orderflow_error::{OrderflowError, Result};
use orderflow_model::{
    FeedbackEvent, FeedbackEventType, SkuMapping, SkuMappingStatus, FEEDBACK_JSON_MAX_BYTES,
    FEEDBACK_SNIPPET_MAX_CHARS,
};
use orderflow_ports::{FewShotExample, PersistencePort};
use uuid::Uuid;

/// Record one correction/confirmation. `before_json` and `after_json` must
/// **each** stay within [`FEEDBACK_JSON_MAX_BYTES`] and `input_snippet`
/// within [`FEEDBACK_SNIPPET_MAX_CHARS`] (spec §4.10).
#[allow(clippy::too_many_arguments)]
pub async fn capture(
    persistence: &dyn PersistencePort,
    org_id: Uuid,
    event_type: FeedbackEventType,
    before_json: serde_json::Value,
    after_json: serde_json::Value,
    layout_fingerprint: Option<String>,
    input_snippet: Option<String>,
    actor: &str,
) -> Result<FeedbackEvent> {
    let before_bytes = serde_json::to_vec(&before_json).unwrap_or_default().len();
    if before_bytes > FEEDBACK_JSON_MAX_BYTES {
        return Err(OrderflowError::validation(format!(
            "feedback before_json is {before_bytes} bytes, exceeds {FEEDBACK_JSON_MAX_BYTES}"
        )));
    }
    let after_bytes = serde_json::to_vec(&after_json).unwrap_or_default().len();
    if after_bytes > FEEDBACK_JSON_MAX_BYTES {
        return Err(OrderflowError::validation(format!(
            "feedback after_json is {after_bytes} bytes, exceeds {FEEDBACK_JSON_MAX_BYTES}"
        )));
    }
    if let Some(snippet) = &input_snippet {
        if snippet.chars().count() > FEEDBACK_SNIPPET_MAX_CHARS {
            return Err(OrderflowError::validation(format!(
                "input_snippet exceeds {FEEDBACK_SNIPPET_MAX_CHARS} chars"
            )));
        }
    }

    let event = FeedbackEvent {
        id: Uuid::new_v4(),
        org_id,
        event_type,
        before_json,
        after_json,
        layout_fingerprint,
        input_snippet,
        actor: actor.to_string(),
        created_at: Utc::now(),
    };
    persistence.insert_feedback_event(event).await
}

/// Upsert `(org, customer, customer_sku_norm)` to `CONFIRMED` and emit the
/// matching `MAPPING_CONFIRMED` feedback event (spec §4.9).
pub async fn confirm_mapping(
    persistence: &dyn PersistencePort,
    org_id: Uuid,
    customer_id: Uuid,
    customer_sku_normalized: &str,
    internal_sku: &str,
    candidates_json: serde_json::Value,
    actor: &str,
) -> Result<SkuMapping> {
    let existing = persistence
        .get_active_mapping(org_id, customer_id, customer_sku_normalized)
        .await?;

    let mapping = match existing {
        Some(row) if row.status != SkuMappingStatus::Deprecated => SkuMapping {
            status: SkuMappingStatus::Confirmed,
            confidence: 1.0,
            last_used_at: Some(Utc::now()),
            support_count: row.support_count + 1,
            internal_sku: internal_sku.to_string(),
            ..row
        },
        _ => SkuMapping {
            id: Uuid::new_v4(),
            org_id,
            customer_id,
            customer_sku_normalized: customer_sku_normalized.to_string(),
            internal_sku: internal_sku.to_string(),
            status: SkuMappingStatus::Confirmed,
            confidence: 1.0,
            support_count: 1,
            reject_count: 0,
            last_used_at: Some(Utc::now()),
        },
    };

    let saved = persistence.upsert_sku_mapping(mapping).await?;

    capture(
        persistence,
        org_id,
        FeedbackEventType::MappingConfirmed,
        candidates_json,
        serde_json::json!({"internal_sku": internal_sku}),
        None,
        None,
        actor,
    )
    .await?;

    Ok(saved)
}

/// Increment `reject_count` on a `SUGGESTED` row, auto-deprecating it once
/// `reject_count >= reject_threshold`, and emit `MAPPING_REJECTED` (spec
/// §4.9). A no-op (returns `Ok(None)`) if no `SUGGESTED` row exists.
pub async fn reject_mapping(
    persistence: &dyn PersistencePort,
    org_id: Uuid,
    customer_id: Uuid,
    customer_sku_normalized: &str,
    reject_threshold: u32,
    actor: &str,
) -> Result<Option<SkuMapping>> {
    let Some(existing) = persistence
        .get_active_mapping(org_id, customer_id, customer_sku_normalized)
        .await?
    else {
        return Ok(None);
    };
    if existing.status != SkuMappingStatus::Suggested {
        return Ok(None);
    }

    let reject_count = existing.reject_count + 1;
    let status = if reject_count >= reject_threshold {
        SkuMappingStatus::Deprecated
    } else {
        SkuMappingStatus::Suggested
    };
    let mapping = SkuMapping {
        reject_count,
        status,
        ..existing
    };
    let saved = persistence.upsert_sku_mapping(mapping).await?;

    capture(
        persistence,
        org_id,
        FeedbackEventType::MappingRejected,
        serde_json::json!({"customer_sku_normalized": customer_sku_normalized}),
        serde_json::json!({"reject_count": saved.reject_count, "status": saved.status}),
        None,
        None,
        actor,
    )
    .await?;

    Ok(Some(saved))
}

/// Up to 3 correction examples for layout fingerprint `f` in org `o`,
/// budgeted at <= 10 ms by the caller's deadline (spec §4.10).
pub async fn few_shot_examples(
    persistence: &dyn PersistencePort,
    org_id: Uuid,
    layout_fingerprint: &str,
) -> Result<Vec<FewShotExample>> {
    let events = persistence
        .recent_feedback_for_layout(
            org_id,
            layout_fingerprint,
            &[
                FeedbackEventType::ExtractionLineCorrected,
                FeedbackEventType::ExtractionFieldCorrected,
            ],
            3,
        )
        .await?;

    Ok(events
        .into_iter()
        .map(|e| FewShotExample {
            input_snippet: e.input_snippet.unwrap_or_default(),
            output: e.after_json,
        })
        .collect())
}
