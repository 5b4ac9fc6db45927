// SPDX-License-Identifier: MIT OR Apache-2.0
//! The draft order state machine of spec §4.7. Every transition produces
//! an [`AuditLog`] entry; transitions outside the allowed set fail with
//! `INVALID_TRANSITION`.

use chrono::Utc;
use orderflow_error::{OrderflowError, Result};
use orderflow_model::{AuditLog, DraftOrder, DraftOrderStatus};
use uuid::Uuid;

/// Triggers that move a draft between states (spec §4.7).
#[derive(Debug, Clone)]
pub enum DraftTransition {
    /// `NEEDS_REVIEW -> READY`: validation ran with no ERROR-severity issue.
    ValidationPassed,
    /// `READY -> NEEDS_REVIEW`: validation ran and found an ERROR.
    ValidationFailed,
    /// `READY -> NEEDS_REVIEW` or `APPROVED -> NEEDS_REVIEW`: any field edit.
    Edited,
    /// `READY -> APPROVED`.
    Approved { approver: String },
    /// `APPROVED -> PUSHING`.
    PushInitiated,
    /// `PUSHING -> PUSHED`.
    ExportSent,
    /// `PUSHING -> ERROR`.
    ExportFailed,
    /// `ERROR -> PUSHING`.
    Retry,
}

impl DraftTransition {
    fn action_name(&self) -> &'static str {
        match self {
            DraftTransition::ValidationPassed => "VALIDATION_PASSED",
            DraftTransition::ValidationFailed => "VALIDATION_FAILED",
            DraftTransition::Edited => "EDITED",
            DraftTransition::Approved { .. } => "APPROVED",
            DraftTransition::PushInitiated => "PUSH_INITIATED",
            DraftTransition::ExportSent => "EXPORT_SENT",
            DraftTransition::ExportFailed => "EXPORT_FAILED",
            DraftTransition::Retry => "RETRY",
        }
    }
}

/// Apply `transition` to `draft` in place, returning the [`AuditLog`] entry
/// for the move. On an out-of-set transition, `draft` is left unchanged and
/// `INVALID_TRANSITION` is returned.
pub fn apply(draft: &mut DraftOrder, transition: DraftTransition, actor: &str) -> Result<AuditLog> {
    use DraftOrderStatus::*;

    let from = draft.status;
    let to = match (from, &transition) {
        (NeedsReview, DraftTransition::ValidationPassed) => Ready,
        (Ready, DraftTransition::ValidationFailed) => NeedsReview,
        (Ready, DraftTransition::Edited) => NeedsReview,
        (Approved, DraftTransition::Edited) => NeedsReview,
        (Ready, DraftTransition::Approved { .. }) => Approved,
        (Approved, DraftTransition::PushInitiated) => Pushing,
        (Pushing, DraftTransition::ExportSent) => Pushed,
        (Pushing, DraftTransition::ExportFailed) => Error,
        (Error, DraftTransition::Retry) => Pushing,
        _ => {
            return Err(OrderflowError::invalid_transition(
                status_name(from),
                transition.action_name(),
            ))
        }
    };

    let action = transition.action_name().to_string();
    if let DraftTransition::Approved { approver } = transition {
        draft.approver = Some(approver);
        draft.approved_at = Some(Utc::now());
    }
    if matches!(to, NeedsReview) {
        draft.approver = None;
        draft.approved_at = None;
    }
    draft.status = to;

    Ok(AuditLog {
        id: Uuid::new_v4(),
        org_id: draft.org_id,
        subject_type: "draft_order".to_string(),
        subject_id: draft.id,
        action,
        actor: actor.to_string(),
        details: serde_json::json!({"from": status_name(from), "to": status_name(to)}),
        created_at: Utc::now(),
    })
}

fn status_name(status: DraftOrderStatus) -> &'static str {
    match status {
        DraftOrderStatus::NeedsReview => "NEEDS_REVIEW",
        DraftOrderStatus::Ready => "READY",
        DraftOrderStatus::Approved => "APPROVED",
        DraftOrderStatus::Pushing => "PUSHING",
        DraftOrderStatus::Pushed => "PUSHED",
        DraftOrderStatus::Error => "ERROR",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(status: DraftOrderStatus) -> DraftOrder {
        DraftOrder {
            id: Uuid::new_v4(),
            org_id: Uuid::new_v4(),
            customer_id: Some(Uuid::new_v4()),
            document_id: Uuid::new_v4(),
            extraction_run_id: Uuid::new_v4(),
            status,
            approver: None,
            approved_at: None,
            ready_check_json: None,
            external_order_number: None,
            order_date: None,
            currency: None,
            requested_delivery_date: None,
            notes: None,
        }
    }

    #[test]
    fn needs_review_to_ready_on_validation_pass() {
        let mut d = draft(DraftOrderStatus::NeedsReview);
        let log = apply(&mut d, DraftTransition::ValidationPassed, "validator").unwrap();
        assert_eq!(d.status, DraftOrderStatus::Ready);
        assert_eq!(log.action, "VALIDATION_PASSED");
    }

    #[test]
    fn approve_sets_approver_and_timestamp() {
        let mut d = draft(DraftOrderStatus::Ready);
        apply(
            &mut d,
            DraftTransition::Approved {
                approver: "alice".into(),
            },
            "alice",
        )
        .unwrap();
        assert_eq!(d.status, DraftOrderStatus::Approved);
        assert_eq!(d.approver.as_deref(), Some("alice"));
        assert!(d.approved_at.is_some());
    }

    #[test]
    fn edit_after_approval_clears_approval() {
        let mut d = draft(DraftOrderStatus::Approved);
        d.approver = Some("alice".into());
        d.approved_at = Some(Utc::now());
        apply(&mut d, DraftTransition::Edited, "bob").unwrap();
        assert_eq!(d.status, DraftOrderStatus::NeedsReview);
        assert_eq!(d.approver, None);
        assert_eq!(d.approved_at, None);
    }

    #[test]
    fn full_push_pipeline() {
        let mut d = draft(DraftOrderStatus::Approved);
        apply(&mut d, DraftTransition::PushInitiated, "scheduler").unwrap();
        assert_eq!(d.status, DraftOrderStatus::Pushing);
        apply(&mut d, DraftTransition::ExportSent, "scheduler").unwrap();
        assert_eq!(d.status, DraftOrderStatus::Pushed);
    }

    #[test]
    fn error_retries_to_pushing() {
        let mut d = draft(DraftOrderStatus::Pushing);
        apply(&mut d, DraftTransition::ExportFailed, "scheduler").unwrap();
        assert_eq!(d.status, DraftOrderStatus::Error);
        apply(&mut d, DraftTransition::Retry, "scheduler").unwrap();
        assert_eq!(d.status, DraftOrderStatus::Pushing);
    }

    #[test]
    fn invalid_transition_is_rejected_and_state_unchanged() {
        let mut d = draft(DraftOrderStatus::NeedsReview);
        let result = apply(&mut d, DraftTransition::PushInitiated, "scheduler");
        assert!(result.is_err());
        assert_eq!(d.status, DraftOrderStatus::NeedsReview);
    }

    #[test]
    fn pushed_is_terminal_for_further_pushes() {
        let mut d = draft(DraftOrderStatus::Pushed);
        let result = apply(&mut d, DraftTransition::PushInitiated, "scheduler");
        assert!(result.is_err());
    }
}
