//! Builds [`ExtractionRun`] rows from a rule or LLM extraction attempt.

use chrono::{DateTime, Utc};
use orderflow_error::OrderflowError;
use orderflow_model::{CanonicalOrderOutput, ExtractionRun, ExtractionRunStatus};
use uuid::Uuid;

pub fn succeeded(
    org_id: Uuid,
    document_id: Uuid,
    extractor: &str,
    output: CanonicalOrderOutput,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
) -> ExtractionRun {
    ExtractionRun {
        id: Uuid::new_v4(),
        org_id,
        document_id,
        extractor: extractor.to_string(),
        status: ExtractionRunStatus::Succeeded,
        started_at,
        finished_at: Some(finished_at),
        line_count: output.line_count() as u32,
        overall_confidence: output.confidence.overall.get(),
        output: Some(output),
        error_json: None,
    }
}

pub fn failed(
    org_id: Uuid,
    document_id: Uuid,
    extractor: &str,
    error: &OrderflowError,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
) -> ExtractionRun {
    ExtractionRun {
        id: Uuid::new_v4(),
        org_id,
        document_id,
        extractor: extractor.to_string(),
        status: ExtractionRunStatus::Failed,
        started_at,
        finished_at: Some(finished_at),
        line_count: 0,
        overall_confidence: 0.0,
        output: None,
        error_json: Some(serde_json::json!({
            "code": error.code().as_str(),
            "message": error.message(),
        })),
    }
}

/// A run that was never attempted: deduped against a recent successful
/// call, or blocked by the daily budget gate (spec §4.4 step 4). Modeled as
/// FAILED since no output was produced, with `code` distinguishing the
/// reason from an actual extraction failure.
pub fn skipped(
    org_id: Uuid,
    document_id: Uuid,
    extractor: &str,
    code: &str,
    mut extra: serde_json::Value,
    at: DateTime<Utc>,
) -> ExtractionRun {
    if let serde_json::Value::Object(map) = &mut extra {
        map.insert("code".to_string(), serde_json::Value::String(code.to_string()));
    }
    ExtractionRun {
        id: Uuid::new_v4(),
        org_id,
        document_id,
        extractor: extractor.to_string(),
        status: ExtractionRunStatus::Failed,
        started_at: at,
        finished_at: Some(at),
        line_count: 0,
        overall_confidence: 0.0,
        output: None,
        error_json: Some(extra),
    }
}

/// Whether a completed run should trigger the LLM fallback of spec §4.4
/// step 3(a)-(c). Step 3(d) (low-coverage scanned PDF) is decided by the
/// caller before a rule run is even attempted.
pub fn needs_llm_fallback(run: &ExtractionRun) -> bool {
    const CONFIDENCE_FALLBACK_THRESHOLD: f64 = 0.60;
    run.status == ExtractionRunStatus::Failed
        || run.overall_confidence < CONFIDENCE_FALLBACK_THRESHOLD
        || run.line_count == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderflow_model::{CanonicalOrderLine, Uom};

    #[test]
    fn zero_lines_triggers_fallback() {
        let output = CanonicalOrderOutput::new("rule_csv_v1");
        let run = succeeded(Uuid::new_v4(), Uuid::new_v4(), "rule_csv_v1", output, Utc::now(), Utc::now());
        assert!(needs_llm_fallback(&run));
    }

    #[test]
    fn confident_nonempty_run_does_not_trigger_fallback() {
        let mut output = CanonicalOrderOutput::new("rule_csv_v1");
        output.lines.push(CanonicalOrderLine {
            line_no: 1,
            customer_sku_raw: Some("AB-1".into()),
            product_description: Some("Bolt".into()),
            qty: 10.0,
            uom: Some(Uom::St),
            unit_price: Some(1.5),
            currency: Some("EUR".into()),
            delivery_date: None,
        });
        output.confidence.overall = orderflow_model::Confidence::new(0.95);
        let run = succeeded(Uuid::new_v4(), Uuid::new_v4(), "rule_csv_v1", output, Utc::now(), Utc::now());
        assert!(!needs_llm_fallback(&run));
    }

    #[test]
    fn failed_run_triggers_fallback() {
        let run = failed(
            Uuid::new_v4(),
            Uuid::new_v4(),
            "rule_csv_v1",
            &OrderflowError::validation("no rows"),
            Utc::now(),
            Utc::now(),
        );
        assert!(needs_llm_fallback(&run));
    }
}
