// SPDX-License-Identifier: MIT OR Apache-2.0
//! Canonical entities, the order schema, and the UoM vocabulary (C1).
//!
//! This crate has no I/O and no port dependencies; it is the shared
//! vocabulary every other OrderFlow crate builds on.

pub mod confidence;
pub mod entities;
pub mod order;
pub mod textsim;
pub mod uom;

pub use confidence::{Confidence, ConfidenceEnvelope, HeaderConfidence, LineConfidence};
pub use entities::*;
pub use order::{Address, CanonicalOrderHeader, CanonicalOrderLine, CanonicalOrderOutput, ExtractionMetadata};
pub use textsim::trigram_similarity;
pub use uom::{UnknownUom, Uom};
