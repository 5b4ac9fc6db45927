// SPDX-License-Identifier: MIT OR Apache-2.0
//! Unified error taxonomy for OrderFlow.
//!
//! Every fallible operation in the core returns an [`OrderflowError`]. The
//! taxonomy mirrors the seven kinds of spec §7: components never throw or
//! long-jump across a boundary, they return one of these.

use std::collections::BTreeMap;
use std::error::Error as StdError;
use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// The seven error kinds of the OrderFlow error handling design.
///
/// Propagation rules (spec §7):
/// - `Validation`, `Authorization`, `Conflict`, `NotFound` are never retried.
/// - `Transient` is retried by workers with exponential backoff.
/// - `Budget` is not retried until the next UTC day.
/// - `Fatal` terminates the current job and raises an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    Authorization,
    Conflict,
    NotFound,
    Transient,
    Budget,
    Fatal,
}

impl ErrorKind {
    /// The HTTP status code this kind surfaces as, per spec §7.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Authorization => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::NotFound => 404,
            ErrorKind::Transient => 503,
            ErrorKind::Budget => 409,
            ErrorKind::Fatal => 500,
        }
    }

    /// Whether a worker should reschedule a job that failed with this kind.
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::Transient)
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ErrorKind::Validation => "validation",
            ErrorKind::Authorization => "authorization",
            ErrorKind::Conflict => "conflict",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Transient => "transient",
            ErrorKind::Budget => "budget",
            ErrorKind::Fatal => "fatal",
        };
        f.write_str(s)
    }
}

/// Stable, machine-readable error codes. Each maps to exactly one
/// [`ErrorKind`]; new codes should be added here rather than inventing
/// ad-hoc strings at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    SchemaInvalid,
    PreconditionFailed,
    UnsupportedMimeType,
    CrossOrgAccess,
    MissingRole,
    InvalidTransition,
    AlreadyPushing,
    IdempotencyKeyConflict,
    NotFound,
    ProviderRateLimited,
    ProviderTimeout,
    NetworkTimeout,
    SftpDisconnected,
    BudgetExceeded,
    InvariantViolation,
    NameCollision,
    Internal,
}

impl ErrorCode {
    /// The [`ErrorKind`] this code belongs to.
    pub fn kind(self) -> ErrorKind {
        use ErrorCode::*;
        match self {
            SchemaInvalid | PreconditionFailed | UnsupportedMimeType => ErrorKind::Validation,
            CrossOrgAccess | MissingRole => ErrorKind::Authorization,
            InvalidTransition | AlreadyPushing | IdempotencyKeyConflict => ErrorKind::Conflict,
            NotFound => ErrorKind::NotFound,
            ProviderRateLimited | ProviderTimeout | NetworkTimeout | SftpDisconnected => {
                ErrorKind::Transient
            }
            BudgetExceeded => ErrorKind::Budget,
            InvariantViolation | NameCollision | Internal => ErrorKind::Fatal,
        }
    }

    pub fn as_str(self) -> &'static str {
        use ErrorCode::*;
        match self {
            SchemaInvalid => "SCHEMA_INVALID",
            PreconditionFailed => "PRECONDITION_FAILED",
            UnsupportedMimeType => "UNSUPPORTED_MIME_TYPE",
            CrossOrgAccess => "CROSS_ORG_ACCESS",
            MissingRole => "MISSING_ROLE",
            InvalidTransition => "INVALID_TRANSITION",
            AlreadyPushing => "ALREADY_PUSHING",
            IdempotencyKeyConflict => "IDEMPOTENCY_KEY_CONFLICT",
            NotFound => "NOT_FOUND",
            ProviderRateLimited => "PROVIDER_RATE_LIMITED",
            ProviderTimeout => "PROVIDER_TIMEOUT",
            NetworkTimeout => "NETWORK_TIMEOUT",
            SftpDisconnected => "SFTP_DISCONNECTED",
            BudgetExceeded => "BUDGET_EXCEEDED",
            InvariantViolation => "INVARIANT_VIOLATION",
            NameCollision => "NAME_COLLISION",
            Internal => "INTERNAL",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The core error type. Carries a stable code, a human message, optional
/// structured context (for logs, never for user-facing display), and an
/// optional source error for the chain.
pub struct OrderflowError {
    code: ErrorCode,
    message: String,
    source: Option<Box<dyn StdError + Send + Sync>>,
    context: BTreeMap<String, serde_json::Value>,
}

impl OrderflowError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            source: None,
            context: BTreeMap::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(serde_json::Value::Null);
        self.context.insert(key.into(), value);
        self
    }

    pub fn with_source(mut self, source: impl StdError + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    pub fn kind(&self) -> ErrorKind {
        self.code.kind()
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn context(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.context
    }

    pub fn http_status(&self) -> u16 {
        self.code.kind().http_status()
    }

    pub fn is_retryable(&self) -> bool {
        self.code.kind().is_retryable()
    }

    // Convenience constructors for the common call sites.

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::SchemaInvalid, message)
    }

    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(ErrorCode::NotFound, resource)
    }

    pub fn cross_org(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::CrossOrgAccess, message)
    }

    pub fn invalid_transition(from: impl fmt::Display, to: impl fmt::Display) -> Self {
        Self::new(
            ErrorCode::InvalidTransition,
            format!("invalid transition from {from} to {to}"),
        )
    }

    pub fn budget_exceeded(org_id: impl Into<String>) -> Self {
        Self::new(ErrorCode::BudgetExceeded, "daily AI budget exceeded")
            .with_context("org_id", org_id.into())
    }

    pub fn fatal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Internal, message)
    }
}

impl fmt::Display for OrderflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl fmt::Debug for OrderflowError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dbg = f.debug_struct("OrderflowError");
        dbg.field("code", &self.code)
            .field("kind", &self.code.kind())
            .field("message", &self.message);
        if !self.context.is_empty() {
            dbg.field("context", &self.context);
        }
        if let Some(source) = &self.source {
            dbg.field("source", &source.to_string());
        }
        dbg.finish()
    }
}

impl StdError for OrderflowError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as &(dyn StdError + 'static))
    }
}

/// A serializable snapshot of an [`OrderflowError`], suitable for API
/// responses or `error_json` persistence columns. Does not carry the
/// `source` chain (which may not be serializable).
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct OrderflowErrorDto {
    pub code: ErrorCode,
    pub kind: ErrorKind,
    pub message: String,
    pub http_status: u16,
    pub context: BTreeMap<String, serde_json::Value>,
}

impl From<&OrderflowError> for OrderflowErrorDto {
    fn from(err: &OrderflowError) -> Self {
        Self {
            code: err.code,
            kind: err.code.kind(),
            message: err.message.clone(),
            http_status: err.http_status(),
            context: err.context.clone(),
        }
    }
}

impl From<OrderflowError> for OrderflowErrorDto {
    fn from(err: OrderflowError) -> Self {
        Self::from(&err)
    }
}

pub type Result<T> = std::result::Result<T, OrderflowError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn construction_sets_fields() {
        let err = OrderflowError::new(ErrorCode::SchemaInvalid, "bad qty");
        assert_eq!(err.code(), ErrorCode::SchemaInvalid);
        assert_eq!(err.message(), "bad qty");
        assert!(err.context().is_empty());
    }

    #[test]
    fn display_includes_code_and_message() {
        let err = OrderflowError::new(ErrorCode::NotFound, "draft missing");
        assert_eq!(err.to_string(), "[NOT_FOUND] draft missing");
    }

    #[test]
    fn builder_chaining() {
        let err = OrderflowError::new(ErrorCode::BudgetExceeded, "over budget")
            .with_context("org_id", "org_1")
            .with_context("cost_micros", 42_000_000i64);
        assert_eq!(err.context().len(), 2);
        assert_eq!(err.context()["org_id"], serde_json::json!("org_1"));
    }

    #[test]
    fn source_chain_preserved() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "disk full");
        let err = OrderflowError::new(ErrorCode::Internal, "write failed").with_source(io_err);
        let source = StdError::source(&err).expect("source present");
        assert_eq!(source.to_string(), "disk full");
    }

    #[test]
    fn every_code_maps_to_exactly_one_kind() {
        let codes = [
            ErrorCode::SchemaInvalid,
            ErrorCode::PreconditionFailed,
            ErrorCode::UnsupportedMimeType,
            ErrorCode::CrossOrgAccess,
            ErrorCode::MissingRole,
            ErrorCode::InvalidTransition,
            ErrorCode::AlreadyPushing,
            ErrorCode::IdempotencyKeyConflict,
            ErrorCode::NotFound,
            ErrorCode::ProviderRateLimited,
            ErrorCode::ProviderTimeout,
            ErrorCode::NetworkTimeout,
            ErrorCode::SftpDisconnected,
            ErrorCode::BudgetExceeded,
            ErrorCode::InvariantViolation,
            ErrorCode::NameCollision,
            ErrorCode::Internal,
        ];
        for code in codes {
            let _ = code.kind(); // exhaustive match above; panics at compile time otherwise
        }
    }

    #[test]
    fn transient_kinds_are_retryable() {
        assert!(ErrorCode::ProviderRateLimited.kind().is_retryable());
        assert!(ErrorCode::NetworkTimeout.kind().is_retryable());
        assert!(!ErrorCode::SchemaInvalid.kind().is_retryable());
        assert!(!ErrorCode::BudgetExceeded.kind().is_retryable());
    }

    #[test]
    fn http_status_mapping() {
        assert_eq!(ErrorCode::SchemaInvalid.kind().http_status(), 400);
        assert_eq!(ErrorCode::CrossOrgAccess.kind().http_status(), 404);
        assert_eq!(ErrorCode::InvalidTransition.kind().http_status(), 409);
        assert_eq!(ErrorCode::NotFound.kind().http_status(), 404);
        assert_eq!(ErrorCode::NetworkTimeout.kind().http_status(), 503);
    }

    #[test]
    fn dto_serde_roundtrip() {
        let err = OrderflowError::new(ErrorCode::AlreadyPushing, "already pushing")
            .with_context("draft_id", "d1");
        let dto = OrderflowErrorDto::from(&err);
        let json = serde_json::to_string(&dto).unwrap();
        let back: OrderflowErrorDto = serde_json::from_str(&json).unwrap();
        assert_eq!(back.code, ErrorCode::AlreadyPushing);
        assert_eq!(back.kind, ErrorKind::Conflict);
    }

    #[test]
    fn convenience_constructors() {
        assert_eq!(OrderflowError::validation("x").code(), ErrorCode::SchemaInvalid);
        assert_eq!(OrderflowError::not_found("x").code(), ErrorCode::NotFound);
        assert_eq!(OrderflowError::cross_org("x").code(), ErrorCode::CrossOrgAccess);
        assert_eq!(
            OrderflowError::invalid_transition("READY", "PUSHED").code(),
            ErrorCode::InvalidTransition
        );
        assert_eq!(OrderflowError::budget_exceeded("org_1").code(), ErrorCode::BudgetExceeded);
        assert_eq!(OrderflowError::fatal("x").code(), ErrorCode::Internal);
    }
}
