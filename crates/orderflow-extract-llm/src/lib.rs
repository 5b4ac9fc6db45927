// SPDX-License-Identifier: MIT OR Apache-2.0
//! LLM extraction (spec §4.3): prompt-driven extraction via a provider port,
//! one-shot JSON repair, and the four mandatory hallucination guards.

pub mod candidate;
pub mod extractor;
pub mod guards;
pub mod raw;

pub use extractor::{
    extract_from_images, extract_from_text, LlmExtractionResult, EXTRACTOR_VERSION_TEXT,
    EXTRACTOR_VERSION_VISION,
};
