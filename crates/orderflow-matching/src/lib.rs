// SPDX-License-Identifier: MIT OR Apache-2.0
//! Confirmed-mapping-first, trigram/embedding-hybrid SKU matching engine
//! (spec §4.5).

pub mod candidate;
pub mod engine;
pub mod scoring;

pub use candidate::{decide, sort_candidates, MatchResult, ScoredCandidate};
pub use engine::{match_line, LineMatchInput};
