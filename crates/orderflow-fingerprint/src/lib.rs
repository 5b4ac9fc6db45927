// SPDX-License-Identifier: MIT OR Apache-2.0
//! Deterministic layout fingerprint (C2).
//!
//! Groups documents of "the same shape" so that operator corrections for
//! one instance generalize to the next (spec §4.1). The hash is pure: byte
//! equal input metadata always yields the same hex string, and inputs are
//! never hashed in a "maybe sorted" way — canonicalization happens before
//! serialization, not as a hope about map iteration order.

use serde::Serialize;
use sha2::{Digest, Sha256};

/// Structural metadata of a document, already normalized at the caller's
/// discretion (e.g. PDF page geometry). Dimensions are integer points.
///
/// Per the spec §9 open question, `page_dimensions` is treated as
/// order-sensitive: `[{600,800},{800,600}]` and its reverse fingerprint
/// differently. This is a deliberate default, not an oversight.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LayoutMeta {
    pub page_count: u32,
    pub page_dimensions: Vec<PageDimension>,
    pub table_count: u32,
    pub text_coverage_ratio: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PageDimension {
    pub width_pt: u32,
    pub height_pt: u32,
}

impl LayoutMeta {
    /// Round `text_coverage_ratio` to two decimals, as required for
    /// canonicalization before hashing.
    pub fn normalized(mut self) -> Self {
        self.text_coverage_ratio = (self.text_coverage_ratio * 100.0).round() / 100.0;
        self
    }
}

/// Canonical JSON with sorted keys. `serde_json::Map` is BTreeMap-backed
/// unless the `preserve_order` feature is enabled (it is not, here), so a
/// plain `to_value` + `to_string` already yields key-sorted output; we
/// still go through an explicit canonical-value step so the guarantee is
/// visible at the call site rather than implicit in a crate feature flag.
fn canonical_json(meta: &LayoutMeta) -> String {
    let value = serde_json::to_value(meta).expect("LayoutMeta always serializes");
    serde_json::to_string(&value).expect("Value always serializes")
}

/// Produce the 256-bit hex fingerprint for normalized structural metadata.
/// Collisions are treated as astronomically improbable (spec §4.1); there
/// is no second-chance/rehash algorithm.
pub fn fingerprint(meta: &LayoutMeta) -> String {
    let canonical = canonical_json(&meta.clone().normalized());
    let digest = Sha256::digest(canonical.as_bytes());
    hex(&digest)
}

/// Fingerprint for a document that may lack structural metadata (non-PDF).
/// Returns `None` — the document participates only in non-layout-scoped
/// paths (spec §4.1 failure semantics).
pub fn fingerprint_opt(meta: Option<&LayoutMeta>) -> Option<String> {
    meta.map(fingerprint)
}

fn hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        s.push_str(&format!("{b:02x}"));
    }
    s
}
