// SPDX-License-Identifier: MIT OR Apache-2.0
use chrono::Utc;
use orderflow_queue::{JobKind, JobPriority, QueueError, QueuedJob, RunQueue};
use std::collections::BTreeMap;
use uuid::Uuid;

fn make_job(id: Uuid, org_id: Uuid, kind: JobKind, priority: JobPriority) -> QueuedJob {
    QueuedJob {
        id,
        org_id,
        kind,
        priority,
        queued_at: Utc::now(),
        target_id: None,
        metadata: BTreeMap::new(),
    }
}

#[test]
fn new_queue_is_empty() {
    let q = RunQueue::new(10);
    assert!(q.is_empty());
    assert_eq!(q.len(), 0);
}

#[test]
fn enqueue_increments_len() {
    let mut q = RunQueue::new(10);
    let org = Uuid::new_v4();
    q.enqueue(make_job(Uuid::new_v4(), org, JobKind::Extraction, JobPriority::Normal))
        .unwrap();
    assert_eq!(q.len(), 1);
    assert!(!q.is_empty());
}

#[test]
fn dequeue_returns_none_when_empty() {
    let mut q = RunQueue::new(10);
    assert!(q.dequeue().is_none());
}

#[test]
fn dequeue_returns_highest_priority() {
    let mut q = RunQueue::new(10);
    let org = Uuid::new_v4();
    let low = Uuid::new_v4();
    let crit = Uuid::new_v4();
    let norm = Uuid::new_v4();
    q.enqueue(make_job(low, org, JobKind::Retention, JobPriority::Low)).unwrap();
    q.enqueue(make_job(crit, org, JobKind::Export, JobPriority::Critical)).unwrap();
    q.enqueue(make_job(norm, org, JobKind::Extraction, JobPriority::Normal))
        .unwrap();
    let got = q.dequeue().unwrap();
    assert_eq!(got.id, crit);
}

#[test]
fn dequeue_fifo_within_same_priority() {
    let mut q = RunQueue::new(10);
    let org = Uuid::new_v4();
    let first = Uuid::new_v4();
    let second = Uuid::new_v4();
    q.enqueue(make_job(first, org, JobKind::Extraction, JobPriority::High))
        .unwrap();
    q.enqueue(make_job(second, org, JobKind::Extraction, JobPriority::High))
        .unwrap();
    let got = q.dequeue().unwrap();
    assert_eq!(got.id, first);
}

#[test]
fn peek_does_not_remove() {
    let mut q = RunQueue::new(10);
    q.enqueue(make_job(Uuid::new_v4(), Uuid::new_v4(), JobKind::AckPoll, JobPriority::Normal))
        .unwrap();
    assert!(q.peek().is_some());
    assert_eq!(q.len(), 1);
}

#[test]
fn is_full_when_at_capacity() {
    let mut q = RunQueue::new(2);
    let org = Uuid::new_v4();
    q.enqueue(make_job(Uuid::new_v4(), org, JobKind::Export, JobPriority::Normal))
        .unwrap();
    q.enqueue(make_job(Uuid::new_v4(), org, JobKind::Export, JobPriority::Normal))
        .unwrap();
    assert!(q.is_full());
}

#[test]
fn enqueue_full_returns_error() {
    let mut q = RunQueue::new(1);
    let org = Uuid::new_v4();
    q.enqueue(make_job(Uuid::new_v4(), org, JobKind::Export, JobPriority::Normal))
        .unwrap();
    let err = q
        .enqueue(make_job(Uuid::new_v4(), org, JobKind::Export, JobPriority::Normal))
        .unwrap_err();
    match err {
        QueueError::Full { max } => assert_eq!(max, 1),
        other => panic!("expected Full, got {other:?}"),
    }
}

#[test]
fn enqueue_duplicate_id_returns_error() {
    let mut q = RunQueue::new(10);
    let org = Uuid::new_v4();
    let id = Uuid::new_v4();
    q.enqueue(make_job(id, org, JobKind::Extraction, JobPriority::Normal))
        .unwrap();
    let err = q
        .enqueue(make_job(id, org, JobKind::Extraction, JobPriority::High))
        .unwrap_err();
    match err {
        QueueError::DuplicateId(dup) => assert_eq!(dup, id),
        other => panic!("expected DuplicateId, got {other:?}"),
    }
}

#[test]
fn remove_by_id() {
    let mut q = RunQueue::new(10);
    let org = Uuid::new_v4();
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    q.enqueue(make_job(a, org, JobKind::Extraction, JobPriority::Normal)).unwrap();
    q.enqueue(make_job(b, org, JobKind::Export, JobPriority::High)).unwrap();
    let removed = q.remove(a).unwrap();
    assert_eq!(removed.id, a);
    assert_eq!(q.len(), 1);
}

#[test]
fn remove_missing_returns_none() {
    let mut q = RunQueue::new(10);
    assert!(q.remove(Uuid::new_v4()).is_none());
}

#[test]
fn clear_empties_the_queue() {
    let mut q = RunQueue::new(10);
    let org = Uuid::new_v4();
    q.enqueue(make_job(Uuid::new_v4(), org, JobKind::Extraction, JobPriority::Normal))
        .unwrap();
    q.enqueue(make_job(Uuid::new_v4(), org, JobKind::Export, JobPriority::High))
        .unwrap();
    q.clear();
    assert!(q.is_empty());
}

#[test]
fn by_kind_filters_correctly() {
    let mut q = RunQueue::new(10);
    let org = Uuid::new_v4();
    q.enqueue(make_job(Uuid::new_v4(), org, JobKind::Retention, JobPriority::Low))
        .unwrap();
    q.enqueue(make_job(Uuid::new_v4(), org, JobKind::Export, JobPriority::High))
        .unwrap();
    q.enqueue(make_job(Uuid::new_v4(), org, JobKind::Retention, JobPriority::Low))
        .unwrap();
    let retentions = q.by_kind(JobKind::Retention);
    assert_eq!(retentions.len(), 2);
    assert!(retentions.iter().all(|j| j.kind == JobKind::Retention));
}

#[test]
fn by_org_filters_correctly() {
    let mut q = RunQueue::new(10);
    let org_a = Uuid::new_v4();
    let org_b = Uuid::new_v4();
    q.enqueue(make_job(Uuid::new_v4(), org_a, JobKind::Extraction, JobPriority::Normal))
        .unwrap();
    q.enqueue(make_job(Uuid::new_v4(), org_b, JobKind::Extraction, JobPriority::Normal))
        .unwrap();
    assert_eq!(q.by_org(org_a).len(), 1);
}

#[test]
fn stats_reports_counts() {
    let mut q = RunQueue::new(10);
    let org = Uuid::new_v4();
    q.enqueue(make_job(Uuid::new_v4(), org, JobKind::Retention, JobPriority::Low))
        .unwrap();
    q.enqueue(make_job(Uuid::new_v4(), org, JobKind::Retention, JobPriority::Low))
        .unwrap();
    q.enqueue(make_job(Uuid::new_v4(), org, JobKind::Export, JobPriority::High))
        .unwrap();
    let stats = q.stats();
    assert_eq!(stats.total, 3);
    assert_eq!(stats.max, 10);
    assert_eq!(stats.by_kind.get("retention"), Some(&2));
    assert_eq!(stats.by_kind.get("export"), Some(&1));
    assert_eq!(stats.by_kind.get("ack_poll"), None);
}

#[test]
fn full_drain_order() {
    let mut q = RunQueue::new(10);
    let org = Uuid::new_v4();
    let lo = Uuid::new_v4();
    let norm = Uuid::new_v4();
    let hi = Uuid::new_v4();
    let crit = Uuid::new_v4();
    q.enqueue(make_job(lo, org, JobKind::Retention, JobPriority::Low)).unwrap();
    q.enqueue(make_job(norm, org, JobKind::Extraction, JobPriority::Normal)).unwrap();
    q.enqueue(make_job(hi, org, JobKind::Export, JobPriority::High)).unwrap();
    q.enqueue(make_job(crit, org, JobKind::AckPoll, JobPriority::Critical)).unwrap();
    let order: Vec<Uuid> = std::iter::from_fn(|| q.dequeue()).map(|j| j.id).collect();
    assert_eq!(order, vec![crit, hi, norm, lo]);
}

#[test]
fn queue_error_display_full() {
    let err = QueueError::Full { max: 5 };
    assert_eq!(err.to_string(), "queue is full (max 5)");
}

#[test]
fn job_priority_ordering() {
    assert!(JobPriority::Low < JobPriority::Normal);
    assert!(JobPriority::Normal < JobPriority::High);
    assert!(JobPriority::High < JobPriority::Critical);
}

#[test]
fn queued_job_serialization_roundtrip() {
    let job = make_job(Uuid::new_v4(), Uuid::new_v4(), JobKind::Export, JobPriority::High);
    let json = serde_json::to_string(&job).unwrap();
    let back: QueuedJob = serde_json::from_str(&json).unwrap();
    assert_eq!(back.id, job.id);
    assert_eq!(back.priority, JobPriority::High);
}

#[test]
fn enqueue_after_dequeue_respects_capacity() {
    let mut q = RunQueue::new(1);
    let org = Uuid::new_v4();
    q.enqueue(make_job(Uuid::new_v4(), org, JobKind::Extraction, JobPriority::Normal))
        .unwrap();
    assert!(q.is_full());
    q.dequeue();
    assert!(!q.is_full());
    q.enqueue(make_job(Uuid::new_v4(), org, JobKind::Extraction, JobPriority::Normal))
        .unwrap();
    assert_eq!(q.len(), 1);
}

#[test]
fn target_id_and_metadata_preserved() {
    let mut job = make_job(Uuid::new_v4(), Uuid::new_v4(), JobKind::Extraction, JobPriority::Normal);
    let document_id = Uuid::new_v4();
    job.target_id = Some(document_id);
    job.metadata.insert("mime_type".to_string(), "text/csv".to_string());
    let mut q = RunQueue::new(10);
    q.enqueue(job).unwrap();
    let got = q.dequeue().unwrap();
    assert_eq!(got.target_id, Some(document_id));
    assert_eq!(got.metadata.get("mime_type").map(|s| s.as_str()), Some("text/csv"));
}
