// SPDX-License-Identifier: MIT OR Apache-2.0
//! Typed per-org settings and process-wide environment tunables.
//!
//! Replaces the free-form `settings_json` blob called out in spec §9 with a
//! typed record: recognized fields only, unknown TOML keys are a hard
//! [`ConfigError`] rather than silently ignored.

use std::collections::BTreeSet;
use std::path::Path;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Hard failures while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: String },
    #[error("failed to parse config: {reason}")]
    ParseError { reason: String },
    #[error("config validation failed: {}", .reasons.join("; "))]
    ValidationError { reasons: Vec<String> },
    #[error("unknown config key(s): {}", .keys.join(", "))]
    UnknownKeys { keys: Vec<String> },
}

/// Soft warnings surfaced but not rejected.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigWarning {
    LargeRetention { days: u32 },
    LowAutoApplyThreshold { value: f64 },
}

impl std::fmt::Display for ConfigWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigWarning::LargeRetention { days } => {
                write!(f, "raw_document_retention_days={days} is unusually large")
            }
            ConfigWarning::LowAutoApplyThreshold { value } => {
                write!(f, "auto_apply_threshold={value} is below the recommended 0.80")
            }
        }
    }
}

/// Per-org tunables (spec §3, §6). All fields have spec-mandated defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct OrgSettings {
    #[serde(default = "default_retention_days")]
    pub raw_document_retention_days: u32,
    #[serde(default = "default_ai_call_log_retention_days")]
    pub ai_call_log_retention_days: u32,
    #[serde(default = "default_auto_apply_threshold")]
    pub auto_apply_threshold: f64,
    #[serde(default = "default_auto_apply_gap")]
    pub auto_apply_gap: f64,
    #[serde(default = "default_price_tolerance_percent")]
    pub price_tolerance_percent: f64,
    #[serde(default)]
    pub daily_budget_micros: u64,
    #[serde(default = "default_reject_threshold")]
    pub reject_threshold: u32,
    #[serde(default = "default_ack_poll_interval_seconds")]
    pub ack_poll_interval_seconds: u64,
    #[serde(default = "default_retention_run_hour_utc")]
    pub retention_run_hour_utc: u8,
    #[serde(default = "default_idempotency_ttl_hours")]
    pub idempotency_ttl_hours: u64,
    #[serde(default = "default_max_upload_size_bytes")]
    pub max_upload_size_bytes: u64,
    #[serde(default = "default_max_batch_upload_files")]
    pub max_batch_upload_files: u32,
    #[serde(default)]
    pub embeddings_enabled: bool,
}

fn default_retention_days() -> u32 {
    365
}
fn default_ai_call_log_retention_days() -> u32 {
    90
}
fn default_auto_apply_threshold() -> f64 {
    0.92
}
fn default_auto_apply_gap() -> f64 {
    0.10
}
fn default_price_tolerance_percent() -> f64 {
    5.0
}
fn default_reject_threshold() -> u32 {
    5
}
fn default_ack_poll_interval_seconds() -> u64 {
    60
}
fn default_retention_run_hour_utc() -> u8 {
    2
}
fn default_idempotency_ttl_hours() -> u64 {
    24
}
fn default_max_upload_size_bytes() -> u64 {
    104_857_600
}
fn default_max_batch_upload_files() -> u32 {
    10
}

impl Default for OrgSettings {
    fn default() -> Self {
        Self {
            raw_document_retention_days: default_retention_days(),
            ai_call_log_retention_days: default_ai_call_log_retention_days(),
            auto_apply_threshold: default_auto_apply_threshold(),
            auto_apply_gap: default_auto_apply_gap(),
            price_tolerance_percent: default_price_tolerance_percent(),
            daily_budget_micros: 0,
            reject_threshold: default_reject_threshold(),
            ack_poll_interval_seconds: default_ack_poll_interval_seconds(),
            retention_run_hour_utc: default_retention_run_hour_utc(),
            idempotency_ttl_hours: default_idempotency_ttl_hours(),
            max_upload_size_bytes: default_max_upload_size_bytes(),
            max_batch_upload_files: default_max_batch_upload_files(),
            embeddings_enabled: false,
        }
    }
}

const VALID_RETENTION_HOURS: std::ops::Range<u8> = 0..24;

/// Parse a TOML document into [`OrgSettings`]. Unknown keys are rejected
/// (`deny_unknown_fields`), surfacing as [`ConfigError::ParseError`].
pub fn parse_toml(content: &str) -> Result<OrgSettings, ConfigError> {
    toml::from_str(content).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })
}

/// Load settings from a file, or the spec defaults if `path` is `None`.
pub fn load_settings(path: Option<&Path>) -> Result<OrgSettings, ConfigError> {
    let Some(path) = path else {
        return Ok(OrgSettings::default());
    };
    if !path.exists() {
        return Err(ConfigError::FileNotFound {
            path: path.display().to_string(),
        });
    }
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
        reason: e.to_string(),
    })?;
    parse_toml(&content)
}

/// Validate settings, returning soft warnings. Hard errors (out-of-range
/// values that would make the matching/export logic ill-defined) are
/// returned as `Err`.
pub fn validate_settings(settings: &OrgSettings) -> Result<Vec<ConfigWarning>, ConfigError> {
    let mut reasons = Vec::new();
    let mut warnings = Vec::new();

    if !(0.0..=1.0).contains(&settings.auto_apply_threshold) {
        reasons.push(format!(
            "auto_apply_threshold must be in [0,1], got {}",
            settings.auto_apply_threshold
        ));
    } else if settings.auto_apply_threshold < 0.80 {
        warnings.push(ConfigWarning::LowAutoApplyThreshold {
            value: settings.auto_apply_threshold,
        });
    }

    if !(0.0..=1.0).contains(&settings.auto_apply_gap) {
        reasons.push(format!(
            "auto_apply_gap must be in [0,1], got {}",
            settings.auto_apply_gap
        ));
    }

    if settings.price_tolerance_percent < 0.0 {
        reasons.push("price_tolerance_percent must be non-negative".to_string());
    }

    if !VALID_RETENTION_HOURS.contains(&settings.retention_run_hour_utc) {
        reasons.push(format!(
            "retention_run_hour_utc must be in 0..24, got {}",
            settings.retention_run_hour_utc
        ));
    }

    if settings.raw_document_retention_days == 0 {
        reasons.push("raw_document_retention_days must be positive".to_string());
    } else if settings.raw_document_retention_days > 3650 {
        warnings.push(ConfigWarning::LargeRetention {
            days: settings.raw_document_retention_days,
        });
    }

    if settings.max_batch_upload_files == 0 {
        reasons.push("max_batch_upload_files must be positive".to_string());
    }

    if !reasons.is_empty() {
        return Err(ConfigError::ValidationError { reasons });
    }
    Ok(warnings)
}

/// Overlay wins; fields on `base` are used only when `overlay` is the
/// default. Mirrors the teacher's `merge_configs` overlay-wins semantics.
pub fn merge_settings(base: &OrgSettings, overlay: &OrgSettings) -> OrgSettings {
    let default = OrgSettings::default();
    let pick = |overlay_val: u32, base_val: u32, default_val: u32| -> u32 {
        if overlay_val != default_val {
            overlay_val
        } else {
            base_val
        }
    };
    OrgSettings {
        raw_document_retention_days: pick(
            overlay.raw_document_retention_days,
            base.raw_document_retention_days,
            default.raw_document_retention_days,
        ),
        ai_call_log_retention_days: pick(
            overlay.ai_call_log_retention_days,
            base.ai_call_log_retention_days,
            default.ai_call_log_retention_days,
        ),
        auto_apply_threshold: if (overlay.auto_apply_threshold - default.auto_apply_threshold).abs() > f64::EPSILON {
            overlay.auto_apply_threshold
        } else {
            base.auto_apply_threshold
        },
        auto_apply_gap: if (overlay.auto_apply_gap - default.auto_apply_gap).abs() > f64::EPSILON {
            overlay.auto_apply_gap
        } else {
            base.auto_apply_gap
        },
        price_tolerance_percent: if (overlay.price_tolerance_percent - default.price_tolerance_percent).abs()
            > f64::EPSILON
        {
            overlay.price_tolerance_percent
        } else {
            base.price_tolerance_percent
        },
        daily_budget_micros: if overlay.daily_budget_micros != 0 {
            overlay.daily_budget_micros
        } else {
            base.daily_budget_micros
        },
        reject_threshold: pick(overlay.reject_threshold, base.reject_threshold, default.reject_threshold),
        ack_poll_interval_seconds: if overlay.ack_poll_interval_seconds != default.ack_poll_interval_seconds {
            overlay.ack_poll_interval_seconds
        } else {
            base.ack_poll_interval_seconds
        },
        retention_run_hour_utc: if overlay.retention_run_hour_utc != default.retention_run_hour_utc {
            overlay.retention_run_hour_utc
        } else {
            base.retention_run_hour_utc
        },
        idempotency_ttl_hours: if overlay.idempotency_ttl_hours != default.idempotency_ttl_hours {
            overlay.idempotency_ttl_hours
        } else {
            base.idempotency_ttl_hours
        },
        max_upload_size_bytes: if overlay.max_upload_size_bytes != default.max_upload_size_bytes {
            overlay.max_upload_size_bytes
        } else {
            base.max_upload_size_bytes
        },
        max_batch_upload_files: pick(
            overlay.max_batch_upload_files,
            base.max_batch_upload_files,
            default.max_batch_upload_files,
        ),
        embeddings_enabled: overlay.embeddings_enabled || base.embeddings_enabled,
    }
}

/// Process-wide environment tunables (spec §6), applied over an
/// [`OrgSettings`] baseline. Unlike `merge_settings`, every variable present
/// in the environment wins unconditionally.
pub fn apply_env_overrides(settings: &mut OrgSettings) {
    if let Ok(v) = std::env::var("DAILY_BUDGET_MICROS") {
        if let Ok(parsed) = v.parse() {
            settings.daily_budget_micros = parsed;
        }
    }
    if let Ok(v) = std::env::var("MAX_UPLOAD_SIZE_BYTES") {
        if let Ok(parsed) = v.parse() {
            settings.max_upload_size_bytes = parsed;
        }
    }
    if let Ok(v) = std::env::var("MAX_BATCH_UPLOAD_FILES") {
        if let Ok(parsed) = v.parse() {
            settings.max_batch_upload_files = parsed;
        }
    }
    if let Ok(v) = std::env::var("PRICE_TOLERANCE_PERCENT") {
        if let Ok(parsed) = v.parse() {
            settings.price_tolerance_percent = parsed;
        }
    }
    if let Ok(v) = std::env::var("AUTO_APPLY_THRESHOLD") {
        if let Ok(parsed) = v.parse() {
            settings.auto_apply_threshold = parsed;
        }
    }
    if let Ok(v) = std::env::var("AUTO_APPLY_GAP") {
        if let Ok(parsed) = v.parse() {
            settings.auto_apply_gap = parsed;
        }
    }
    if let Ok(v) = std::env::var("REJECT_THRESHOLD") {
        if let Ok(parsed) = v.parse() {
            settings.reject_threshold = parsed;
        }
    }
    if let Ok(v) = std::env::var("ACK_POLL_INTERVAL_SECONDS") {
        if let Ok(parsed) = v.parse() {
            settings.ack_poll_interval_seconds = parsed;
        }
    }
    if let Ok(v) = std::env::var("RETENTION_RUN_HOUR_UTC") {
        if let Ok(parsed) = v.parse() {
            settings.retention_run_hour_utc = parsed;
        }
    }
    if let Ok(v) = std::env::var("RAW_DOCUMENT_RETENTION_DAYS") {
        if let Ok(parsed) = v.parse() {
            settings.raw_document_retention_days = parsed;
        }
    }
    if let Ok(v) = std::env::var("AI_CALL_LOG_RETENTION_DAYS") {
        if let Ok(parsed) = v.parse() {
            settings.ai_call_log_retention_days = parsed;
        }
    }
    if let Ok(v) = std::env::var("IDEMPOTENCY_TTL_HOURS") {
        if let Ok(parsed) = v.parse() {
            settings.idempotency_ttl_hours = parsed;
        }
    }
}

/// Validate a set of raw TOML keys against the recognized field names,
/// independent of `serde`'s `deny_unknown_fields` (used by the CLI's
/// `validate-config` subcommand to report *which* keys are unrecognized
/// rather than a generic parse failure).
pub fn recognized_keys() -> BTreeSet<&'static str> {
    [
        "raw_document_retention_days",
        "ai_call_log_retention_days",
        "auto_apply_threshold",
        "auto_apply_gap",
        "price_tolerance_percent",
        "daily_budget_micros",
        "reject_threshold",
        "ack_poll_interval_seconds",
        "retention_run_hour_utc",
        "idempotency_ttl_hours",
        "max_upload_size_bytes",
        "max_batch_upload_files",
        "embeddings_enabled",
    ]
    .into_iter()
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let s = OrgSettings::default();
        assert_eq!(s.raw_document_retention_days, 365);
        assert_eq!(s.ai_call_log_retention_days, 90);
        assert_eq!(s.auto_apply_threshold, 0.92);
        assert_eq!(s.auto_apply_gap, 0.10);
        assert_eq!(s.price_tolerance_percent, 5.0);
        assert_eq!(s.reject_threshold, 5);
        assert_eq!(s.ack_poll_interval_seconds, 60);
        assert_eq!(s.retention_run_hour_utc, 2);
        assert_eq!(s.idempotency_ttl_hours, 24);
        assert_eq!(s.max_upload_size_bytes, 104_857_600);
        assert_eq!(s.max_batch_upload_files, 10);
    }

    #[test]
    fn parse_toml_overrides_selected_fields() {
        let toml_str = r#"
            auto_apply_threshold = 0.95
            daily_budget_micros = 50000
        "#;
        let s = parse_toml(toml_str).expect("parse");
        assert_eq!(s.auto_apply_threshold, 0.95);
        assert_eq!(s.daily_budget_micros, 50000);
        assert_eq!(s.reject_threshold, 5); // default preserved
    }

    #[test]
    fn unknown_key_is_rejected() {
        let toml_str = "bogus_field = 1";
        let result = parse_toml(toml_str);
        assert!(result.is_err());
    }

    #[test]
    fn validation_rejects_out_of_range_threshold() {
        let mut s = OrgSettings::default();
        s.auto_apply_threshold = 1.5;
        let result = validate_settings(&s);
        assert!(matches!(result, Err(ConfigError::ValidationError { .. })));
    }

    #[test]
    fn validation_warns_on_low_threshold() {
        let mut s = OrgSettings::default();
        s.auto_apply_threshold = 0.5;
        let warnings = validate_settings(&s).expect("valid");
        assert!(matches!(warnings[0], ConfigWarning::LowAutoApplyThreshold { .. }));
    }

    #[test]
    fn validation_rejects_bad_retention_hour() {
        let mut s = OrgSettings::default();
        s.retention_run_hour_utc = 25;
        assert!(validate_settings(&s).is_err());
    }

    #[test]
    fn merge_overlay_wins_over_base() {
        let base = OrgSettings {
            auto_apply_threshold: 0.88,
            ..OrgSettings::default()
        };
        let overlay = OrgSettings {
            auto_apply_threshold: 0.95,
            ..OrgSettings::default()
        };
        let merged = merge_settings(&base, &overlay);
        assert_eq!(merged.auto_apply_threshold, 0.95);
    }

    #[test]
    fn merge_falls_back_to_base_when_overlay_is_default() {
        let base = OrgSettings {
            reject_threshold: 8,
            ..OrgSettings::default()
        };
        let overlay = OrgSettings::default();
        let merged = merge_settings(&base, &overlay);
        assert_eq!(merged.reject_threshold, 8);
    }

    #[test]
    fn env_overrides_apply() {
        std::env::set_var("REJECT_THRESHOLD", "12");
        let mut s = OrgSettings::default();
        apply_env_overrides(&mut s);
        assert_eq!(s.reject_threshold, 12);
        std::env::remove_var("REJECT_THRESHOLD");
    }

    #[test]
    fn load_settings_missing_file_errors() {
        let path = Path::new("/nonexistent/orderflow-config-test.toml");
        let result = load_settings(Some(path));
        assert!(matches!(result, Err(ConfigError::FileNotFound { .. })));
    }

    #[test]
    fn load_settings_none_path_returns_default() {
        let s = load_settings(None).expect("default");
        assert_eq!(s, OrgSettings::default());
    }

    #[test]
    fn recognized_keys_cover_struct_fields() {
        let keys = recognized_keys();
        assert!(keys.contains("auto_apply_threshold"));
        assert_eq!(keys.len(), 13);
    }
}
