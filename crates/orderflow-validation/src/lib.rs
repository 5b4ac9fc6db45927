// SPDX-License-Identifier: MIT OR Apache-2.0
//! Rule-based validation pass over a [`DraftOrder`] (spec §4.6): each rule
//! reads the draft and its lines and emits zero or more [`ValidationIssue`]s.
//! Re-running validation on an unchanged draft yields the identical set of
//! issues modulo timestamps/ids.

use chrono::{Duration, Utc};
use orderflow_config::OrgSettings;
use orderflow_error::Result;
use orderflow_model::{
    DraftOrder, DraftOrderLine, IssueSeverity, MatchStatus, ValidationIssue, ValidationIssueKind,
};
use orderflow_ports::PersistencePort;
use uuid::Uuid;

/// Duplicate-order detection looks back this far for a matching
/// `external_order_number` (spec §4.6).
pub const DUPLICATE_ORDER_WINDOW_DAYS: i64 = 30;

/// The outcome of a validation pass: the issues found plus the derived
/// READY verdict (spec §4.6).
#[derive(Debug, Clone)]
pub struct ValidationReport {
    pub issues: Vec<ValidationIssue>,
    pub ready: bool,
}

impl ValidationReport {
    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == IssueSeverity::Error)
    }
}

fn issue(
    draft_order_id: Uuid,
    draft_order_line_id: Option<Uuid>,
    kind: ValidationIssueKind,
    severity: IssueSeverity,
    details: serde_json::Value,
) -> ValidationIssue {
    ValidationIssue {
        id: Uuid::new_v4(),
        draft_order_id,
        draft_order_line_id,
        kind,
        severity,
        details,
    }
}

/// Run every rule over `draft`/`lines` and compute the READY verdict.
///
/// `extraction_warnings` carries forward any warnings attached to the
/// canonical extraction output (spec §4.1's `warnings` array), surfaced
/// here as `EXTRACTION_WARNINGS_PROPAGATED`.
pub async fn validate(
    persistence: &dyn PersistencePort,
    settings: &OrgSettings,
    draft: &DraftOrder,
    lines: &[DraftOrderLine],
    extraction_warnings: &[String],
) -> Result<ValidationReport> {
    let mut issues = Vec::new();

    if draft.customer_id.is_none() {
        issues.push(issue(
            draft.id,
            None,
            ValidationIssueKind::MissingCustomer,
            IssueSeverity::Error,
            serde_json::json!({}),
        ));
    }

    if lines.is_empty() {
        // Not a LINE_COUNT_MISMATCH (that compares the LLM run's line count
        // against the heuristic run's, below) — an empty draft has nothing
        // to resolve, same family as an unmatched line.
        issues.push(issue(
            draft.id,
            None,
            ValidationIssueKind::MissingSku,
            IssueSeverity::Error,
            serde_json::json!({"reason": "no lines extracted"}),
        ));
    }

    for line in lines {
        validate_line(draft, line, settings, &mut issues);
    }

    let extraction_runs = persistence
        .list_extraction_runs_for_document(draft.org_id, draft.document_id)
        .await?;
    let latest_rule_run = extraction_runs.iter().find(|r| r.extractor.starts_with("rule_"));
    let latest_llm_run = extraction_runs.iter().find(|r| r.extractor.starts_with("llm"));
    if let (Some(rule_run), Some(llm_run)) = (latest_rule_run, latest_llm_run) {
        if rule_run.line_count != llm_run.line_count {
            issues.push(issue(
                draft.id,
                None,
                ValidationIssueKind::LineCountMismatch,
                IssueSeverity::Warning,
                serde_json::json!({
                    "heuristic_line_count": rule_run.line_count,
                    "llm_line_count": llm_run.line_count,
                }),
            ));
        }
    }

    if let (Some(customer_id), Some(external_order_number)) =
        (draft.customer_id, draft.external_order_number.as_deref())
    {
        let since = Utc::now() - Duration::days(DUPLICATE_ORDER_WINDOW_DAYS);
        if let Some(_other) = persistence
            .find_duplicate_order(draft.org_id, customer_id, external_order_number, since, draft.id)
            .await?
        {
            issues.push(issue(
                draft.id,
                None,
                ValidationIssueKind::DuplicateOrder,
                IssueSeverity::Warning,
                serde_json::json!({"external_order_number": external_order_number}),
            ));
        }
    }

    for warning in extraction_warnings {
        issues.push(issue(
            draft.id,
            None,
            ValidationIssueKind::ExtractionWarningsPropagated,
            IssueSeverity::Warning,
            serde_json::json!({"warning": warning}),
        ));
    }

    let has_errors = issues.iter().any(|i| i.severity == IssueSeverity::Error);
    let all_lines_resolvable = !lines.is_empty()
        && lines.iter().all(|l| {
            l.internal_sku.is_some()
                && matches!(
                    l.match_status,
                    MatchStatus::Matched | MatchStatus::Suggested | MatchStatus::Overridden
                )
        });
    let ready = draft.customer_id.is_some() && all_lines_resolvable && !has_errors;

    Ok(ValidationReport { issues, ready })
}

fn validate_line(
    draft: &DraftOrder,
    line: &DraftOrderLine,
    settings: &OrgSettings,
    issues: &mut Vec<ValidationIssue>,
) {
    match line.match_status {
        MatchStatus::Unmatched => {
            issues.push(issue(
                draft.id,
                Some(line.id),
                ValidationIssueKind::MissingSku,
                IssueSeverity::Error,
                serde_json::json!({"line_no": line.line_no}),
            ));
        }
        MatchStatus::Suggested if line.match_confidence < 0.75 => {
            issues.push(issue(
                draft.id,
                Some(line.id),
                ValidationIssueKind::LowConfidenceMatch,
                IssueSeverity::Warning,
                serde_json::json!({"line_no": line.line_no, "confidence": line.match_confidence}),
            ));
        }
        _ => {}
    }

    if line.internal_sku.is_some() && line.unit_price.is_none() {
        issues.push(issue(
            draft.id,
            Some(line.id),
            ValidationIssueKind::MissingPrice,
            IssueSeverity::Warning,
            serde_json::json!({"line_no": line.line_no}),
        ));
    }

    // match_debug carries the scoring engine's P_uom/P_price breakdown
    // (orderflow-matching::ScoredCandidate) for the chosen candidate, if any.
    if let Some(p_uom) = line.match_debug.get("p_uom").and_then(|v| v.as_f64()) {
        if p_uom <= 0.2 {
            issues.push(issue(
                draft.id,
                Some(line.id),
                ValidationIssueKind::UomIncompatible,
                IssueSeverity::Error,
                serde_json::json!({"line_no": line.line_no}),
            ));
        }
    }
    if let Some(p_price) = line.match_debug.get("p_price").and_then(|v| v.as_f64()) {
        if p_price < 1.0 {
            let tolerance = settings.price_tolerance_percent;
            issues.push(issue(
                draft.id,
                Some(line.id),
                ValidationIssueKind::PriceMismatch,
                IssueSeverity::Warning,
                serde_json::json!({"line_no": line.line_no, "p_price": p_price, "tolerance_percent": tolerance}),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use orderflow_model::{DraftOrderStatus, ExtractionRun, ExtractionRunStatus, MatchMethod};
    use orderflow_persistence_mock::MockPersistence;

    fn base_draft(org_id: Uuid) -> DraftOrder {
        DraftOrder {
            id: Uuid::new_v4(),
            org_id,
            customer_id: Some(Uuid::new_v4()),
            document_id: Uuid::new_v4(),
            extraction_run_id: Uuid::new_v4(),
            status: DraftOrderStatus::NeedsReview,
            approver: None,
            approved_at: None,
            ready_check_json: None,
            external_order_number: Some("PO-1001".into()),
            order_date: None,
            currency: Some("EUR".into()),
            requested_delivery_date: None,
            notes: None,
        }
    }

    fn matched_line(draft_id: Uuid) -> DraftOrderLine {
        DraftOrderLine {
            id: Uuid::new_v4(),
            draft_order_id: draft_id,
            line_no: 1,
            qty: 10.0,
            uom: None,
            unit_price: Some(5.0),
            currency: Some("EUR".into()),
            description: Some("Widget".into()),
            customer_sku_raw: Some("W-1".into()),
            internal_sku: Some("PROD-1".into()),
            match_confidence: 0.97,
            match_method: MatchMethod::Hybrid,
            match_status: MatchStatus::Matched,
            match_debug: serde_json::json!({"p_uom": 1.0, "p_price": 1.0}),
        }
    }

    #[tokio::test]
    async fn ready_when_customer_and_lines_resolved() {
        let mock = MockPersistence::default();
        let settings = OrgSettings::default();
        let draft = base_draft(Uuid::new_v4());
        let lines = vec![matched_line(draft.id)];
        let report = validate(&mock, &settings, &draft, &lines, &[]).await.unwrap();
        assert!(report.ready);
        assert!(!report.has_errors());
    }

    #[tokio::test]
    async fn missing_customer_blocks_ready() {
        let mock = MockPersistence::default();
        let settings = OrgSettings::default();
        let mut draft = base_draft(Uuid::new_v4());
        draft.customer_id = None;
        let lines = vec![matched_line(draft.id)];
        let report = validate(&mock, &settings, &draft, &lines, &[]).await.unwrap();
        assert!(!report.ready);
        assert!(report
            .issues
            .iter()
            .any(|i| i.kind == ValidationIssueKind::MissingCustomer));
    }

    #[tokio::test]
    async fn unmatched_line_blocks_ready() {
        let mock = MockPersistence::default();
        let settings = OrgSettings::default();
        let draft = base_draft(Uuid::new_v4());
        let mut line = matched_line(draft.id);
        line.internal_sku = None;
        line.match_status = MatchStatus::Unmatched;
        let report = validate(&mock, &settings, &draft, &[line], &[]).await.unwrap();
        assert!(!report.ready);
        assert!(report.has_errors());
    }

    #[tokio::test]
    async fn warnings_do_not_block_ready() {
        let mock = MockPersistence::default();
        let settings = OrgSettings::default();
        let draft = base_draft(Uuid::new_v4());
        let mut line = matched_line(draft.id);
        line.match_status = MatchStatus::Suggested;
        line.match_confidence = 0.80;
        line.unit_price = None;
        let report = validate(&mock, &settings, &draft, &[line], &[]).await.unwrap();
        assert!(report.ready);
        assert!(report.issues.iter().any(|i| i.kind == ValidationIssueKind::MissingPrice));
    }

    #[tokio::test]
    async fn idempotent_on_unchanged_draft() {
        let mock = MockPersistence::default();
        let settings = OrgSettings::default();
        let draft = base_draft(Uuid::new_v4());
        let lines = vec![matched_line(draft.id)];
        let first = validate(&mock, &settings, &draft, &lines, &[]).await.unwrap();
        let second = validate(&mock, &settings, &draft, &lines, &[]).await.unwrap();
        assert_eq!(first.issues.len(), second.issues.len());
        assert_eq!(
            first.issues.iter().map(|i| i.kind).collect::<Vec<_>>(),
            second.issues.iter().map(|i| i.kind).collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn uom_incompatible_is_an_error() {
        let mock = MockPersistence::default();
        let settings = OrgSettings::default();
        let draft = base_draft(Uuid::new_v4());
        let mut line = matched_line(draft.id);
        line.match_debug = serde_json::json!({"p_uom": 0.2, "p_price": 1.0});
        let report = validate(&mock, &settings, &draft, &[line], &[]).await.unwrap();
        assert!(report.has_errors());
        assert!(report
            .issues
            .iter()
            .any(|i| i.kind == ValidationIssueKind::UomIncompatible));
    }

    #[tokio::test]
    async fn empty_draft_is_missing_sku_not_line_count_mismatch() {
        let mock = MockPersistence::default();
        let settings = OrgSettings::default();
        let draft = base_draft(Uuid::new_v4());
        let report = validate(&mock, &settings, &draft, &[], &[]).await.unwrap();
        assert!(!report.ready);
        assert!(report.issues.iter().any(|i| i.kind == ValidationIssueKind::MissingSku));
        assert!(!report
            .issues
            .iter()
            .any(|i| i.kind == ValidationIssueKind::LineCountMismatch));
    }

    fn extraction_run(org_id: Uuid, document_id: Uuid, extractor: &str, line_count: u32) -> ExtractionRun {
        ExtractionRun {
            id: Uuid::new_v4(),
            org_id,
            document_id,
            extractor: extractor.to_string(),
            status: ExtractionRunStatus::Succeeded,
            started_at: Utc::now(),
            finished_at: Some(Utc::now()),
            line_count,
            overall_confidence: 0.9,
            output: None,
            error_json: None,
        }
    }

    #[tokio::test]
    async fn line_count_mismatch_between_llm_and_heuristic_runs() {
        let mock = MockPersistence::default();
        let settings = OrgSettings::default();
        let draft = base_draft(Uuid::new_v4());
        let lines = vec![matched_line(draft.id)];
        mock.insert_extraction_run(extraction_run(draft.org_id, draft.document_id, "rule_csv_v1", 3))
            .await
            .unwrap();
        mock.insert_extraction_run(extraction_run(draft.org_id, draft.document_id, "llm_v1", 5))
            .await
            .unwrap();

        let report = validate(&mock, &settings, &draft, &lines, &[]).await.unwrap();
        assert!(report
            .issues
            .iter()
            .any(|i| i.kind == ValidationIssueKind::LineCountMismatch));
    }

    #[tokio::test]
    async fn matching_line_counts_do_not_raise_mismatch() {
        let mock = MockPersistence::default();
        let settings = OrgSettings::default();
        let draft = base_draft(Uuid::new_v4());
        let lines = vec![matched_line(draft.id)];
        mock.insert_extraction_run(extraction_run(draft.org_id, draft.document_id, "rule_csv_v1", 4))
            .await
            .unwrap();
        mock.insert_extraction_run(extraction_run(draft.org_id, draft.document_id, "llm_v1", 4))
            .await
            .unwrap();

        let report = validate(&mock, &settings, &draft, &lines, &[]).await.unwrap();
        assert!(!report
            .issues
            .iter()
            .any(|i| i.kind == ValidationIssueKind::LineCountMismatch));
    }
}
