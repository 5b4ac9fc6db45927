// SPDX-License-Identifier: MIT OR Apache-2.0
//! Shared command implementations for the OrderFlow CLI.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use orderflow_config::{ConfigWarning, OrgSettings};
use orderflow_export::AckReconciliationSummary;
use orderflow_ports::{DropzonePort, PersistencePort};
use orderflow_retention::RetentionSummary;
use std::path::Path;
use uuid::Uuid;

/// Load and validate a config file, returning any soft warnings.
/// Hard validation failures (unknown keys, out-of-range values) surface as
/// an `Err`.
pub fn validate_config_file(path: &Path) -> Result<Vec<ConfigWarning>> {
    let content = std::fs::read_to_string(path).with_context(|| format!("read config file '{}'", path.display()))?;
    let settings = orderflow_config::parse_toml(&content).with_context(|| "parse config")?;
    orderflow_config::validate_settings(&settings).map_err(Into::into)
}

/// Run the retention sweep for one org (spec §4.11).
pub async fn run_retention(
    persistence: &dyn PersistencePort,
    org_id: Uuid,
    settings: &OrgSettings,
    now: DateTime<Utc>,
) -> Result<RetentionSummary> {
    orderflow_retention::run(persistence, org_id, settings, now)
        .await
        .with_context(|| format!("retention run for org {org_id}"))
}

/// Run one ack-dropzone reconciliation sweep for one org (spec §4.8).
pub async fn ack_poll(
    persistence: &dyn PersistencePort,
    dropzone: &dyn DropzonePort,
    org_id: Uuid,
    ack_dir: &str,
) -> Result<AckReconciliationSummary> {
    orderflow_export::reconcile(persistence, dropzone, org_id, ack_dir)
        .await
        .with_context(|| format!("ack poll for org {org_id}"))
}
