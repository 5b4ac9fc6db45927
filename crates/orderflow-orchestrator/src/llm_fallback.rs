//! The LLM-fallback leg of spec §4.4 step 4-5: dedup, budget gate, the
//! provider call itself (via `orderflow-extract-llm`'s guards), and the
//! unconditional `AiCallLog` row for any call actually attempted.

use chrono::{DateTime, Duration, Utc};
use orderflow_error::Result;
use orderflow_extract_llm::{extract_from_images, extract_from_text};
use orderflow_model::{AiCallLog, AiCallStatus, ExtractionRun};
use orderflow_ports::{FewShotExample, LlmProviderPort, PersistencePort};
use uuid::Uuid;

pub const EXTRACT_TEXT_CALL_TYPE: &str = "llm_extract_text";
pub const EXTRACT_VISION_CALL_TYPE: &str = "llm_extract_vision";

/// Trailing window the dedup check of spec §4.4 step 4 looks back over.
const DEDUP_WINDOW_DAYS: i64 = 7;

#[allow(clippy::too_many_arguments)]
pub async fn attempt(
    persistence: &dyn PersistencePort,
    llm: &dyn LlmProviderPort,
    org_id: Uuid,
    document_id: Uuid,
    call_type: &str,
    provider_name: &str,
    daily_budget_micros: u64,
    hint_examples: &[FewShotExample],
    source_text: Option<&str>,
    images_base64: &[String],
    now: DateTime<Utc>,
) -> Result<ExtractionRun> {
    let since = now - Duration::days(DEDUP_WINDOW_DAYS);
    if let Some(prior) = persistence
        .find_recent_successful_ai_call(org_id, document_id, call_type, since)
        .await?
    {
        tracing::debug!(
            %org_id, %document_id, call_type, prior_call_id = %prior.id,
            "reusing recent successful LLM call, skipping re-issue"
        );
        return Ok(crate::run::skipped(
            org_id,
            document_id,
            call_type,
            "DEDUP_SKIPPED",
            serde_json::json!({"prior_ai_call_log_id": prior.id}),
            now,
        ));
    }

    let spent_today = persistence.sum_ai_cost_today(org_id).await?;
    if daily_budget_micros > 0 && spent_today >= daily_budget_micros {
        tracing::info!(%org_id, spent_today, daily_budget_micros, "daily AI budget exceeded, skipping LLM fallback");
        return Ok(crate::run::skipped(
            org_id,
            document_id,
            call_type,
            "BUDGET_EXCEEDED",
            serde_json::json!({}),
            now,
        ));
    }

    if call_type == EXTRACT_VISION_CALL_TYPE && images_base64.is_empty() {
        return Ok(crate::run::failed(
            org_id,
            document_id,
            call_type,
            &orderflow_error::OrderflowError::validation(
                "vision extraction requested but no page images were supplied",
            ),
            now,
            now,
        ));
    }

    let extraction = if call_type == EXTRACT_VISION_CALL_TYPE {
        extract_from_images(llm, images_base64, hint_examples, source_text.unwrap_or_default()).await
    } else {
        extract_from_text(llm, source_text.unwrap_or_default(), hint_examples).await
    };

    match extraction {
        Ok(result) => {
            persistence
                .insert_ai_call_log(AiCallLog {
                    id: Uuid::new_v4(),
                    org_id,
                    document_id: Some(document_id),
                    call_type: call_type.to_string(),
                    provider: provider_name.to_string(),
                    model: result.model.clone(),
                    input_tokens: result.input_tokens,
                    output_tokens: result.output_tokens,
                    latency_ms: result.latency_ms,
                    cost_micros: result.cost_micros,
                    status: AiCallStatus::Succeeded,
                    input_hash: None,
                    created_at: now,
                })
                .await?;
            let extractor_version = result.output.extractor_version.clone();
            Ok(crate::run::succeeded(org_id, document_id, &extractor_version, result.output, now, now))
        }
        Err(err) => {
            // A guard rejection carries the call's billed metrics in the
            // error context (see `orderflow_extract_llm::extractor`); a hard
            // provider failure (rate limit, timeout) does not, because no
            // call metrics were ever returned to bill against. Either way an
            // AICallLog row is written (spec §4.4 step 5: persist
            // unconditionally), with zeroed metrics and `model: "unknown"`
            // when the provider never responded.
            let model = err.context().get("model").and_then(|v| v.as_str()).map(str::to_string);
            let tokens = |key: &str| err.context().get(key).and_then(|v| v.as_u64()).unwrap_or(0);
            persistence
                .insert_ai_call_log(AiCallLog {
                    id: Uuid::new_v4(),
                    org_id,
                    document_id: Some(document_id),
                    call_type: call_type.to_string(),
                    provider: provider_name.to_string(),
                    model: model.clone().unwrap_or_else(|| "unknown".to_string()),
                    input_tokens: tokens("input_tokens"),
                    output_tokens: tokens("output_tokens"),
                    latency_ms: tokens("latency_ms"),
                    cost_micros: tokens("cost_micros"),
                    status: AiCallStatus::Failed,
                    input_hash: None,
                    created_at: now,
                })
                .await?;
            match model {
                Some(_) => Ok(crate::run::failed(org_id, document_id, call_type, &err, now, now)),
                None => Err(err),
            }
        }
    }
}
