//! Scored candidates, tie-breaking, and the final [`MatchResult`].

use orderflow_model::{MatchMethod, MatchStatus, Product};
use serde::Serialize;

/// A `(product, features, confidence)` triple (spec GLOSSARY "Scored
/// candidate").
#[derive(Debug, Clone, Serialize)]
pub struct ScoredCandidate {
    pub internal_sku: String,
    pub s_tri: f64,
    pub s_emb: f64,
    pub s_hybrid: f64,
    pub p_uom: f64,
    pub p_price: f64,
    pub confidence: f64,
}

impl ScoredCandidate {
    pub fn from_product(product: &Product, s_tri: f64, s_emb: f64, p_uom: f64, p_price: f64) -> Self {
        let s_hybrid = crate::scoring::hybrid_score(s_tri, s_emb);
        let confidence = crate::scoring::confidence(s_hybrid, p_uom, p_price);
        Self {
            internal_sku: product.internal_sku.clone(),
            s_tri,
            s_emb,
            s_hybrid,
            p_uom,
            p_price,
            confidence,
        }
    }
}

/// Sort by `(confidence desc, internal_sku asc)`, comparing confidence to
/// six decimal places so near-equal floats tie-break deterministically
/// (spec §4.5.4).
pub fn sort_candidates(candidates: &mut [ScoredCandidate]) {
    candidates.sort_by(|a, b| {
        let a_round = round6(a.confidence);
        let b_round = round6(b.confidence);
        b_round
            .cmp(&a_round)
            .then_with(|| a.internal_sku.cmp(&b.internal_sku))
    });
}

fn round6(v: f64) -> i64 {
    (v * 1_000_000.0).round() as i64
}

/// The matching engine's verdict for one line (spec §4.5, `MatchResult`).
#[derive(Debug, Clone, Serialize)]
pub struct MatchResult {
    pub internal_sku: Option<String>,
    pub confidence: f64,
    pub method: MatchMethod,
    pub status: MatchStatus,
    pub candidates: Vec<ScoredCandidate>,
    /// Set when `top1.confidence < 0.75` (spec §4.5.1 step 6): the caller
    /// should additionally record a `LOW_CONFIDENCE_MATCH` issue.
    pub low_confidence_warning: bool,
}

/// Decide auto-apply per spec §4.5.1 step 5, given already-sorted top
/// candidates (highest confidence first) and the org's threshold/gap.
pub fn decide(mut candidates: Vec<ScoredCandidate>, theta: f64, gamma: f64) -> MatchResult {
    sort_candidates(&mut candidates);
    let top5: Vec<ScoredCandidate> = candidates.iter().take(5).cloned().collect();
    let top1 = candidates.first();
    let top2 = candidates.get(1);

    let low_confidence_warning = top1.map(|c| c.confidence < 0.75).unwrap_or(false);

    let auto_apply = match (top1, top2) {
        (Some(t1), Some(t2)) => t1.confidence >= theta && (t1.confidence - t2.confidence) >= gamma,
        (Some(t1), None) => t1.confidence >= theta,
        (None, _) => false,
    };

    if auto_apply {
        let t1 = top1.unwrap();
        MatchResult {
            internal_sku: Some(t1.internal_sku.clone()),
            confidence: t1.confidence,
            method: MatchMethod::Hybrid,
            status: MatchStatus::Suggested,
            candidates: top5,
            low_confidence_warning,
        }
    } else {
        MatchResult {
            internal_sku: None,
            confidence: top1.map(|c| c.confidence).unwrap_or(0.0),
            method: MatchMethod::Null,
            status: MatchStatus::Unmatched,
            candidates: top5,
            low_confidence_warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(sku: &str, confidence: f64) -> ScoredCandidate {
        ScoredCandidate {
            internal_sku: sku.to_string(),
            s_tri: 0.0,
            s_emb: 0.0,
            s_hybrid: 0.0,
            p_uom: 1.0,
            p_price: 1.0,
            confidence,
        }
    }

    #[test]
    fn scenario_boundary_suggested() {
        let candidates = vec![candidate("B", 0.82), candidate("A", 0.92)];
        let result = decide(candidates, 0.92, 0.10);
        assert_eq!(result.status, MatchStatus::Suggested);
        assert_eq!(result.internal_sku.as_deref(), Some("A"));
    }

    #[test]
    fn scenario_boundary_unmatched_gap_too_small() {
        let candidates = vec![candidate("B", 0.83), candidate("A", 0.92)];
        let result = decide(candidates, 0.92, 0.10);
        assert_eq!(result.status, MatchStatus::Unmatched);
        assert_eq!(result.internal_sku, None);
    }

    #[test]
    fn scenario_3_gap_rejects_ambiguity() {
        let candidates = vec![candidate("A", 0.94), candidate("B", 0.88)];
        let result = decide(candidates, 0.92, 0.10);
        assert_eq!(result.status, MatchStatus::Unmatched);
        assert_eq!(result.candidates.len(), 2);
    }

    #[test]
    fn tie_break_by_sku_ascending_within_six_decimals() {
        let mut candidates = vec![candidate("B-SKU", 0.500_0001), candidate("A-SKU", 0.500_0004)];
        sort_candidates(&mut candidates);
        assert_eq!(candidates[0].internal_sku, "A-SKU");
    }

    #[test]
    fn low_confidence_flag_below_point_seven_five() {
        let result = decide(vec![candidate("A", 0.5)], 0.92, 0.10);
        assert!(result.low_confidence_warning);
    }

    #[test]
    fn no_candidates_yields_unmatched_zero_confidence() {
        let result = decide(vec![], 0.92, 0.10);
        assert_eq!(result.status, MatchStatus::Unmatched);
        assert_eq!(result.confidence, 0.0);
        assert!(!result.low_confidence_warning);
    }

    #[test]
    fn single_high_confidence_candidate_auto_applies() {
        let result = decide(vec![candidate("A", 0.99)], 0.92, 0.10);
        assert_eq!(result.status, MatchStatus::Suggested);
    }
}
