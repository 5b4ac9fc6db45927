// SPDX-License-Identifier: MIT OR Apache-2.0
//! The export pipeline (spec §4.8): canonical export JSON wire format,
//! atomic dropzone delivery, push idempotency, and ack reconciliation.

pub mod ack;
pub mod delivery;
pub mod push;
pub mod wire;

pub use ack::{reconcile, AckReconciliationSummary};
pub use delivery::{deliver, export_filename, ExportResult};
pub use push::{resolve_push, PushResolution};
pub use wire::{build_export_document, ExportCustomer, ExportDocument, ExportHeader, ExportLine, ExportMeta};

/// Retry backoff for transient export failures (spec §4.8): `base * 2^attempt`.
pub fn retry_backoff(attempt: u32) -> std::time::Duration {
    const BASE_SECONDS: u64 = 60;
    std::time::Duration::from_secs(BASE_SECONDS.saturating_mul(1u64 << attempt.min(16)))
}
