// SPDX-License-Identifier: MIT OR Apache-2.0
//! Extraction orchestration (spec §4.4): rule extractor dispatch by mime
//! type, the PDF text-coverage gate, LLM-fallback trigger evaluation, and
//! the dedup/budget checks that guard every LLM call.

mod llm_fallback;
mod mime;
mod run;

use chrono::{DateTime, Utc};
use orderflow_config::OrgSettings;
use orderflow_error::{ErrorCode, OrderflowError, Result};
use orderflow_model::{CanonicalOrderOutput, Document, ExtractionRun};
use orderflow_ports::{FewShotExample, LlmProviderPort, PersistencePort};
use uuid::Uuid;

use mime::DocumentKind;

pub use llm_fallback::{EXTRACT_TEXT_CALL_TYPE, EXTRACT_VISION_CALL_TYPE};
pub use mime::classify as classify_mime;
pub use run::needs_llm_fallback;

/// Below this, a PDF is presumed scanned and routed straight to the vision
/// path (spec §4.4 step 3(d)) without a rule-extractor attempt.
const PDF_TEXT_COVERAGE_THRESHOLD: f64 = 0.15;

/// The one or two [`ExtractionRun`] rows spec §4.4 says one orchestration
/// pass produces.
#[derive(Debug, Clone)]
pub struct OrchestrationOutcome {
    pub primary_run: ExtractionRun,
    pub fallback_run: Option<ExtractionRun>,
}

/// Run the full decision tree of spec §4.4 for one document and persist
/// every `ExtractionRun`/`AiCallLog` row it produces.
///
/// `images_base64` is only consulted on the vision path; PDF rasterization
/// happens upstream of this crate (the orchestrator is pure decision logic,
/// never an I/O port consumer beyond the ports it's given). `provider_name`
/// identifies the configured LLM provider for `AiCallLog.provider`.
#[allow(clippy::too_many_arguments)]
pub async fn orchestrate(
    persistence: &dyn PersistencePort,
    llm: &dyn LlmProviderPort,
    org_id: Uuid,
    document: &Document,
    bytes: &[u8],
    images_base64: &[String],
    settings: &OrgSettings,
    provider_name: &str,
    now: DateTime<Utc>,
) -> Result<OrchestrationOutcome> {
    let kind = mime::classify(&document.mime_type);

    if kind == DocumentKind::Unsupported {
        let run = run::failed(
            org_id,
            document.id,
            "rule_unsupported_v1",
            &OrderflowError::new(
                ErrorCode::UnsupportedMimeType,
                format!("unsupported mime type: {}", document.mime_type),
            ),
            now,
            now,
        );
        let run = persistence.insert_extraction_run(run).await?;
        return Ok(OrchestrationOutcome {
            primary_run: run,
            fallback_run: None,
        });
    }

    let is_scanned_pdf =
        kind == DocumentKind::Pdf && document.text_coverage_ratio.unwrap_or(0.0) < PDF_TEXT_COVERAGE_THRESHOLD;

    if is_scanned_pdf {
        let hint_examples = layout_hint_examples(persistence, org_id, document).await?;
        let run = llm_fallback::attempt(
            persistence,
            llm,
            org_id,
            document.id,
            EXTRACT_VISION_CALL_TYPE,
            provider_name,
            settings.daily_budget_micros,
            &hint_examples,
            None,
            images_base64,
            now,
        )
        .await?;
        let run = persistence.insert_extraction_run(run).await?;
        return Ok(OrchestrationOutcome {
            primary_run: run,
            fallback_run: None,
        });
    }

    let (primary_run, source_text) = run_rule_extractor(kind, org_id, document.id, bytes, now);

    if !run::needs_llm_fallback(&primary_run) {
        let primary_run = persistence.insert_extraction_run(primary_run).await?;
        return Ok(OrchestrationOutcome {
            primary_run,
            fallback_run: None,
        });
    }

    tracing::debug!(
        document_id = %document.id,
        overall_confidence = primary_run.overall_confidence,
        line_count = primary_run.line_count,
        status = ?primary_run.status,
        "rule extraction weak or failed, attempting LLM fallback"
    );

    let hint_examples = layout_hint_examples(persistence, org_id, document).await?;
    let fallback_run = llm_fallback::attempt(
        persistence,
        llm,
        org_id,
        document.id,
        EXTRACT_TEXT_CALL_TYPE,
        provider_name,
        settings.daily_budget_micros,
        &hint_examples,
        source_text.as_deref(),
        &[],
        now,
    )
    .await?;

    let primary_run = persistence.insert_extraction_run(primary_run).await?;
    let fallback_run = persistence.insert_extraction_run(fallback_run).await?;

    Ok(OrchestrationOutcome {
        primary_run,
        fallback_run: Some(fallback_run),
    })
}

/// Invoke the rule extractor matching `kind` and return its `ExtractionRun`
/// plus, where available, the document text later stages need for the LLM
/// guards (spec §4.3) and candidate-line heuristic. XLSX has no reliable
/// plain-text rendering available to this crate, so its fallback text is
/// `None`; a guard-bearing LLM fallback for XLSX then has no text to anchor
/// or count candidates against, same as the vision path.
fn run_rule_extractor(
    kind: DocumentKind,
    org_id: Uuid,
    document_id: Uuid,
    bytes: &[u8],
    now: DateTime<Utc>,
) -> (ExtractionRun, Option<String>) {
    match kind {
        DocumentKind::Csv => {
            let decoded = orderflow_extract_rules::encoding::decode_bytes(bytes);
            let result = orderflow_extract_rules::extract_csv(bytes);
            let run = to_run(
                org_id,
                document_id,
                orderflow_extract_rules::csv_extractor::EXTRACTOR_VERSION,
                result,
                now,
            );
            (run, Some(decoded.text))
        }
        DocumentKind::Xlsx => {
            let result = orderflow_extract_rules::extract_xlsx(bytes);
            let run = to_run(
                org_id,
                document_id,
                orderflow_extract_rules::xlsx_extractor::EXTRACTOR_VERSION,
                result,
                now,
            );
            (run, None)
        }
        DocumentKind::Pdf => match orderflow_extract_rules::extract_pdf_text(bytes) {
            Ok(pdf_result) => {
                let run = run::succeeded(
                    org_id,
                    document_id,
                    orderflow_extract_rules::pdf_extractor::EXTRACTOR_VERSION,
                    pdf_result.output,
                    now,
                    now,
                );
                (run, Some(pdf_result.raw_text))
            }
            Err(e) => {
                let run = run::failed(
                    org_id,
                    document_id,
                    orderflow_extract_rules::pdf_extractor::EXTRACTOR_VERSION,
                    &e,
                    now,
                    now,
                );
                (run, None)
            }
        },
        DocumentKind::Unsupported => unreachable!("caller routes unsupported mime types before dispatch"),
    }
}

fn to_run(
    org_id: Uuid,
    document_id: Uuid,
    extractor: &str,
    result: Result<CanonicalOrderOutput>,
    now: DateTime<Utc>,
) -> ExtractionRun {
    match result {
        Ok(output) => run::succeeded(org_id, document_id, extractor, output, now, now),
        Err(e) => run::failed(org_id, document_id, extractor, &e, now, now),
    }
}

async fn layout_hint_examples(
    persistence: &dyn PersistencePort,
    org_id: Uuid,
    document: &Document,
) -> Result<Vec<FewShotExample>> {
    match &document.layout_fingerprint {
        Some(fingerprint) => orderflow_feedback::few_shot_examples(persistence, org_id, fingerprint).await,
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderflow_model::{DocumentStatus, ExtractionRunStatus};
    use orderflow_persistence_mock::{MockLlmProvider, MockPersistence};

    fn document(org_id: Uuid, mime_type: &str, text_coverage_ratio: Option<f64>) -> Document {
        Document {
            id: Uuid::new_v4(),
            org_id,
            inbound_message_id: None,
            storage_key: Some("raw/doc".to_string()),
            mime_type: mime_type.to_string(),
            size_bytes: 100,
            sha256: "deadbeef".to_string(),
            filename: "doc".to_string(),
            status: DocumentStatus::Processing,
            text_coverage_ratio,
            page_count: Some(1),
            layout_fingerprint: None,
            created_at: Utc::now(),
        }
    }

    const CSV_BODY: &str = "Bestellnummer: PO-1\nSKU;Beschreibung;Menge;Einheit;Preis\nAB-1;Bolt;10;Stk;1,50\n";

    #[tokio::test]
    async fn confident_csv_extraction_produces_a_single_succeeded_run() {
        let persistence = MockPersistence::default();
        let llm = MockLlmProvider::new();
        let org_id = Uuid::new_v4();
        let document = document(org_id, "text/csv", None);
        let settings = OrgSettings::default();

        let outcome = orchestrate(
            &persistence, &llm, org_id, &document, CSV_BODY.as_bytes(), &[], &settings, "openai", Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.primary_run.status, ExtractionRunStatus::Succeeded);
        assert!(outcome.fallback_run.is_none());
        assert_eq!(outcome.primary_run.extractor, orderflow_extract_rules::csv_extractor::EXTRACTOR_VERSION);
    }

    #[tokio::test]
    async fn empty_csv_triggers_llm_fallback_and_persists_both_runs() {
        let persistence = MockPersistence::default();
        let llm = MockLlmProvider::new();
        llm.push_text_response(Ok(orderflow_ports::LlmCallResult {
            raw_text: "{}".to_string(),
            parsed: Some(serde_json::json!({"order": {}, "lines": []})),
            model: "gpt".to_string(),
            input_tokens: 5,
            output_tokens: 5,
            latency_ms: 10,
            cost_micros: 1,
            warnings: vec![],
        }));
        let org_id = Uuid::new_v4();
        let document = document(org_id, "text/csv", None);
        let settings = OrgSettings::default();

        let outcome = orchestrate(
            &persistence, &llm, org_id, &document, b"", &[], &settings, "openai", Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.primary_run.status, ExtractionRunStatus::Failed);
        assert!(outcome.fallback_run.is_some());
        let runs_in_store = persistence.get_extraction_run(org_id, outcome.primary_run.id).await.unwrap();
        assert!(runs_in_store.is_some());
    }

    #[tokio::test]
    async fn low_coverage_pdf_skips_rule_extraction_and_goes_straight_to_vision() {
        let persistence = MockPersistence::default();
        let llm = MockLlmProvider::new();
        llm.push_image_response(Ok(orderflow_ports::LlmCallResult {
            raw_text: "{}".to_string(),
            parsed: Some(serde_json::json!({
                "order": {}, "lines": [{"line_no": 1, "qty": 1.0}],
            })),
            model: "gpt-vision".to_string(),
            input_tokens: 5,
            output_tokens: 5,
            latency_ms: 10,
            cost_micros: 1,
            warnings: vec![],
        }));
        let org_id = Uuid::new_v4();
        let document = document(org_id, "application/pdf", Some(0.05));
        let settings = OrgSettings::default();

        let outcome = orchestrate(
            &persistence, &llm, org_id, &document, b"%PDF-1.4 scanned", &["base64page".to_string()], &settings,
            "openai", Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.primary_run.extractor, orderflow_extract_llm::EXTRACTOR_VERSION_VISION);
        assert_eq!(outcome.primary_run.status, ExtractionRunStatus::Succeeded);
        assert!(outcome.fallback_run.is_none());
    }

    #[tokio::test]
    async fn unsupported_mime_type_fails_without_touching_the_llm() {
        let persistence = MockPersistence::default();
        let llm = MockLlmProvider::new();
        let org_id = Uuid::new_v4();
        let document = document(org_id, "image/png", None);
        let settings = OrgSettings::default();

        let outcome = orchestrate(
            &persistence, &llm, org_id, &document, b"\x89PNG", &[], &settings, "openai", Utc::now(),
        )
        .await
        .unwrap();

        assert_eq!(outcome.primary_run.status, ExtractionRunStatus::Failed);
        assert_eq!(
            outcome.primary_run.error_json.unwrap()["code"],
            ErrorCode::UnsupportedMimeType.as_str()
        );
    }
}
