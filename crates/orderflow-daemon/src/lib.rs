// SPDX-License-Identifier: MIT OR Apache-2.0
//! Worker/scheduler process for OrderFlow (spec §5, SPEC §10.5).
//!
//! Assembles the background loops the spec places in-scope for an
//! always-on process — ack reconciliation (spec §4.8) and the retention
//! sweep (spec §4.11) — behind a minimal `axum` health/metrics surface.
//! The full upload/draft/push HTTP surface is explicitly out of scope; this
//! binary is the worker plane only.

use axum::{Json, Router, extract::State, routing::get};
use chrono::{NaiveDate, Timelike, Utc};
use orderflow_config::OrgSettings;
use orderflow_error::Result;
use orderflow_ports::{DropzonePort, LeaderElectionPort, PersistencePort};
use orderflow_telemetry::{MetricsCollector, RunMetrics};
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{error, info};
use uuid::Uuid;

/// Shared state handed to every route and background loop.
pub struct AppState {
    pub persistence: Arc<dyn PersistencePort>,
    pub dropzone: Arc<dyn DropzonePort>,
    pub leader: Arc<dyn LeaderElectionPort>,
    pub metrics: MetricsCollector,
    /// Tenants this process services. There is no "list all orgs" port
    /// (multi-instance org discovery is a deployment concern); the set
    /// serviced by one process is supplied at startup.
    pub orgs: Vec<Uuid>,
    pub settings: OrgSettings,
    last_retention_run: Mutex<HashMap<Uuid, NaiveDate>>,
}

impl AppState {
    pub fn new(
        persistence: Arc<dyn PersistencePort>,
        dropzone: Arc<dyn DropzonePort>,
        leader: Arc<dyn LeaderElectionPort>,
        orgs: Vec<Uuid>,
        settings: OrgSettings,
    ) -> Self {
        Self {
            persistence,
            dropzone,
            leader,
            metrics: MetricsCollector::new(),
            orgs,
            settings,
            last_retention_run: Mutex::new(HashMap::new()),
        }
    }
}

/// Convention for an org's ack dropzone directory. The dropzone root and
/// per-org layout are an operator/deployment concern upstream of this
/// process; this is the one convention the ack poller needs to agree on.
fn ack_dir(org_id: Uuid) -> String {
    format!("{org_id}/ack")
}

/// Build the `axum` router: `/health` liveness and `/metrics` telemetry
/// snapshot, in the style of the teacher's `abp-daemon::build_app`.
pub fn build_app(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/metrics", get(metrics))
        .layer(tower_http::cors::CorsLayer::permissive())
        .with_state(state)
}

async fn health() -> impl axum::response::IntoResponse {
    Json(json!({
        "status": "ok",
        "time": Utc::now().to_rfc3339(),
    }))
}

async fn metrics(State(state): State<Arc<AppState>>) -> impl axum::response::IntoResponse {
    Json(state.metrics.summary())
}

/// Poll every serviced org's ack dropzone once per
/// `settings.ack_poll_interval_seconds`, for as long as this process holds
/// the `"ack_poll"` leader lock.
pub async fn run_ack_poll_loop(state: Arc<AppState>) {
    let mut ticker = tokio::time::interval(Duration::from_secs(state.settings.ack_poll_interval_seconds.max(1)));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(err) = ack_poll_once(&state).await {
            error!(error = ?err, "ack poll sweep failed");
        }
    }
}

/// One sweep across all serviced orgs; exposed separately from the loop so
/// `--ack-poll --once` in the CLI can drive it without a ticker.
pub async fn ack_poll_once(state: &AppState) -> Result<()> {
    if !state.leader.is_leader("ack_poll").await? {
        return Ok(());
    }
    for &org_id in &state.orgs {
        let started = Utc::now();
        let dir = ack_dir(org_id);
        match orderflow_export::reconcile(state.persistence.as_ref(), state.dropzone.as_ref(), org_id, &dir).await {
            Ok(summary) => {
                info!(
                    %org_id,
                    acked = summary.acked,
                    failed = summary.failed,
                    malformed = summary.malformed,
                    unmatched = summary.unmatched,
                    "ack poll sweep complete"
                );
                state.metrics.record(RunMetrics {
                    org_id,
                    stage: "ack_poll".to_string(),
                    duration_ms: (Utc::now() - started).num_milliseconds().max(0) as u64,
                    lines_count: (summary.acked + summary.failed) as u64,
                    overall_confidence: 0.0,
                    errors_count: (summary.malformed + summary.unmatched) as u64,
                    ai_calls_count: 0,
                });
            }
            Err(err) => error!(%org_id, error = ?err, "ack poll sweep failed for org"),
        }
    }
    Ok(())
}

/// Run the retention sweep for every serviced org once per UTC day, at
/// `settings.retention_run_hour_utc`. Checks hourly; a per-org last-run date
/// guard keeps a missed or restarted process from double-running within the
/// same day once the hour has passed.
pub async fn run_retention_loop(state: Arc<AppState>) {
    let mut ticker = tokio::time::interval(Duration::from_secs(3600));
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        if let Err(err) = retention_tick(&state).await {
            error!(error = ?err, "retention sweep failed");
        }
    }
}

async fn retention_tick(state: &AppState) -> Result<()> {
    let now = Utc::now();
    if now.hour() != state.settings.retention_run_hour_utc as u32 {
        return Ok(());
    }
    if !state.leader.is_leader("retention").await? {
        return Ok(());
    }
    let today = now.date_naive();
    for &org_id in &state.orgs {
        {
            let mut last_run = state.last_retention_run.lock().expect("retention lock poisoned");
            if last_run.get(&org_id) == Some(&today) {
                continue;
            }
            last_run.insert(org_id, today);
        }
        let started = Utc::now();
        match orderflow_retention::run(state.persistence.as_ref(), org_id, &state.settings, now).await {
            Ok(summary) => {
                info!(
                    %org_id,
                    documents_soft_deleted = summary.documents_soft_deleted,
                    ai_call_logs_hard_deleted = summary.ai_call_logs_hard_deleted,
                    "retention sweep complete"
                );
                state.metrics.record(RunMetrics {
                    org_id,
                    stage: "retention".to_string(),
                    duration_ms: (Utc::now() - started).num_milliseconds().max(0) as u64,
                    lines_count: summary.documents_soft_deleted + summary.ai_call_logs_hard_deleted,
                    overall_confidence: 0.0,
                    errors_count: 0,
                    ai_calls_count: 0,
                });
            }
            Err(err) => error!(%org_id, error = ?err, "retention sweep failed for org"),
        }
    }
    Ok(())
}
