// SPDX-License-Identifier: MIT OR Apache-2.0
//! Structured telemetry and run metrics collection for the OrderFlow
//! pipeline (extraction, matching, validation, export, retention).

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::info;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RunMetrics
// ---------------------------------------------------------------------------

/// Metrics captured for a single pipeline stage run (one `ExtractionRun`,
/// one matching pass, one export attempt, one retention sweep, ...).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunMetrics {
    /// Tenant the run belongs to.
    pub org_id: Uuid,
    /// Pipeline stage name, e.g. `"extraction_rule_csv"`, `"extraction_llm_vision"`,
    /// `"matching"`, `"validation"`, `"export_push"`, `"retention"`.
    pub stage: String,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Lines processed (order lines, matched lines, exported lines, as fits the stage).
    pub lines_count: u64,
    /// Overall confidence of the stage's output, where applicable (0.0 otherwise).
    pub overall_confidence: f64,
    /// Number of errors encountered during the run.
    pub errors_count: u64,
    /// Number of LLM calls actually issued during the run (0 outside extraction).
    pub ai_calls_count: u64,
}

// ---------------------------------------------------------------------------
// MetricsSummary
// ---------------------------------------------------------------------------

/// Aggregated statistics across multiple recorded runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricsSummary {
    /// Number of runs recorded.
    pub count: usize,
    /// Mean duration in milliseconds.
    pub mean_duration_ms: f64,
    /// Median (p50) duration in milliseconds.
    pub p50_duration_ms: f64,
    /// 99th-percentile duration in milliseconds.
    pub p99_duration_ms: f64,
    /// Total lines processed across all runs.
    pub total_lines: u64,
    /// Total LLM calls issued across all runs.
    pub total_ai_calls: u64,
    /// Error rate (errors / total runs).
    pub error_rate: f64,
    /// Per-stage run counts (deterministic ordering).
    pub stage_counts: BTreeMap<String, usize>,
}

impl Default for MetricsSummary {
    fn default() -> Self {
        Self {
            count: 0,
            mean_duration_ms: 0.0,
            p50_duration_ms: 0.0,
            p99_duration_ms: 0.0,
            total_lines: 0,
            total_ai_calls: 0,
            error_rate: 0.0,
            stage_counts: BTreeMap::new(),
        }
    }
}

/// Compute a percentile value from a **sorted** slice.
fn percentile(sorted: &[u64], pct: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    if sorted.len() == 1 {
        return sorted[0] as f64;
    }
    let rank = pct / 100.0 * (sorted.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let frac = rank - lower as f64;
    sorted[lower] as f64 * (1.0 - frac) + sorted[upper] as f64 * frac
}

// ---------------------------------------------------------------------------
// MetricsCollector
// ---------------------------------------------------------------------------

/// Thread-safe collector for pipeline run metrics.
///
/// Wrap in an `Arc` to share across async tasks (the inner storage is
/// already behind a `Mutex`).
#[derive(Debug, Clone)]
pub struct MetricsCollector {
    inner: Arc<Mutex<Vec<RunMetrics>>>,
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricsCollector {
    /// Create a new, empty collector.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Record a completed run's metrics.
    pub fn record(&self, metrics: RunMetrics) {
        let mut data = self.inner.lock().expect("metrics lock poisoned");
        data.push(metrics);
    }

    /// Return all recorded run metrics.
    pub fn runs(&self) -> Vec<RunMetrics> {
        let data = self.inner.lock().expect("metrics lock poisoned");
        data.clone()
    }

    /// Number of runs recorded so far.
    pub fn len(&self) -> usize {
        let data = self.inner.lock().expect("metrics lock poisoned");
        data.len()
    }

    /// Whether the collector has no recorded runs.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs recorded for one tenant, in recording order.
    pub fn runs_for_org(&self, org_id: Uuid) -> Vec<RunMetrics> {
        let data = self.inner.lock().expect("metrics lock poisoned");
        data.iter().filter(|r| r.org_id == org_id).cloned().collect()
    }

    /// Compute an aggregated summary of all recorded runs.
    pub fn summary(&self) -> MetricsSummary {
        let data = self.inner.lock().expect("metrics lock poisoned");
        Self::summarize(&data)
    }

    /// Compute an aggregated summary restricted to one tenant.
    pub fn summary_for_org(&self, org_id: Uuid) -> MetricsSummary {
        let data = self.inner.lock().expect("metrics lock poisoned");
        let filtered: Vec<RunMetrics> = data.iter().filter(|r| r.org_id == org_id).cloned().collect();
        Self::summarize(&filtered)
    }

    fn summarize(data: &[RunMetrics]) -> MetricsSummary {
        if data.is_empty() {
            return MetricsSummary::default();
        }

        let count = data.len();
        let mut durations: Vec<u64> = data.iter().map(|r| r.duration_ms).collect();
        durations.sort_unstable();

        let total_duration: u64 = durations.iter().sum();
        let mean_duration_ms = total_duration as f64 / count as f64;
        let p50_duration_ms = percentile(&durations, 50.0);
        let p99_duration_ms = percentile(&durations, 99.0);

        let total_lines: u64 = data.iter().map(|r| r.lines_count).sum();
        let total_ai_calls: u64 = data.iter().map(|r| r.ai_calls_count).sum();

        let errors: u64 = data.iter().map(|r| r.errors_count).sum();
        let error_rate = errors as f64 / count as f64;

        let mut stage_counts: BTreeMap<String, usize> = BTreeMap::new();
        for r in data.iter() {
            *stage_counts.entry(r.stage.clone()).or_insert(0) += 1;
        }

        MetricsSummary {
            count,
            mean_duration_ms,
            p50_duration_ms,
            p99_duration_ms,
            total_lines,
            total_ai_calls,
            error_rate,
            stage_counts,
        }
    }

    /// Clear all recorded metrics.
    pub fn clear(&self) {
        let mut data = self.inner.lock().expect("metrics lock poisoned");
        data.clear();
    }
}

// ---------------------------------------------------------------------------
// TelemetrySpan
// ---------------------------------------------------------------------------

/// A structured span emitted into the `tracing` pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetrySpan {
    /// Span name / operation.
    pub name: String,
    /// Arbitrary key-value attributes (deterministic ordering).
    pub attributes: BTreeMap<String, String>,
}

impl TelemetrySpan {
    /// Create a new span with the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: BTreeMap::new(),
        }
    }

    /// Insert an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    /// Emit the span via `tracing::info!`.
    pub fn emit(&self) {
        info!(
            span_name = %self.name,
            attributes = ?self.attributes,
            "telemetry_span"
        );
    }
}

// ---------------------------------------------------------------------------
// TelemetryExporter
// ---------------------------------------------------------------------------

/// Exports a [`MetricsSummary`] to some sink.
pub trait TelemetryExporter: Send + Sync {
    /// Export the given summary. Returns the serialized output on success.
    fn export(&self, summary: &MetricsSummary) -> Result<String, String>;
}

/// Exports metrics as pretty-printed JSON to a string, for `/metrics`-style
/// endpoints and CLI output.
#[derive(Debug, Default)]
pub struct JsonExporter;

impl TelemetryExporter for JsonExporter {
    fn export(&self, summary: &MetricsSummary) -> Result<String, String> {
        serde_json::to_string_pretty(summary).map_err(|e| e.to_string())
    }
}
