//! The matching pipeline of spec §4.5.1: confirmed mapping short-circuit,
//! trigram + optional vector candidate search, per-candidate scoring, and
//! the auto-apply decision.

use chrono::NaiveDate;
use orderflow_error::Result;
use orderflow_model::{MatchMethod, MatchStatus, SkuMappingStatus, Uom};
use orderflow_ports::{PersistencePort, TrigramMatch, VectorMatch};
use std::collections::HashMap;
use uuid::Uuid;

use crate::candidate::{decide, MatchResult, ScoredCandidate};
use crate::scoring::{embedding_score, price_penalty, trigram_score, uom_penalty, PriceContext};

/// Everything the engine needs about one purchase-order line to match it
/// against the catalog. `customer_sku_normalized` and `embedding` are
/// produced upstream by extraction/normalization; the engine only scores.
pub struct LineMatchInput<'a> {
    pub customer_id: Uuid,
    pub customer_sku_normalized: &'a str,
    pub description: &'a str,
    pub line_uom: Option<Uom>,
    pub line_qty: f64,
    pub line_unit_price: Option<f64>,
    pub line_currency: Option<&'a str>,
    pub order_date: Option<NaiveDate>,
    pub query_embedding: Option<&'a [f32]>,
    pub embeddings_enabled: bool,
}

/// Match one order line against the org's catalog (spec §4.5.1).
///
/// Step order: (1) confirmed-mapping short-circuit, (2) trigram search,
/// (3) optional vector search merged in by SKU, (4) score every union
/// member, (5) auto-apply decision, (6) top-5 ordering with low-confidence
/// flagging. A rejected or deprecated mapping is never treated as
/// confirmed and falls through to steps 2-6.
pub async fn match_line(
    persistence: &dyn PersistencePort,
    org_id: Uuid,
    input: &LineMatchInput<'_>,
    auto_apply_threshold: f64,
    auto_apply_gap: f64,
    price_tolerance_percent: f64,
) -> Result<MatchResult> {
    if let Some(mapping) = persistence
        .get_confirmed_mapping(org_id, input.customer_id, input.customer_sku_normalized)
        .await?
    {
        if mapping.status == SkuMappingStatus::Confirmed {
            return Ok(MatchResult {
                internal_sku: Some(mapping.internal_sku.clone()),
                confidence: 0.99,
                method: MatchMethod::ExactMapping,
                status: MatchStatus::Matched,
                candidates: vec![ScoredCandidate {
                    internal_sku: mapping.internal_sku,
                    s_tri: 1.0,
                    s_emb: 0.0,
                    s_hybrid: 1.0,
                    p_uom: 1.0,
                    p_price: 1.0,
                    confidence: 0.99,
                }],
                low_confidence_warning: false,
            });
        }
    }

    let trigram_matches: Vec<TrigramMatch> = persistence
        .trigram_search_products(org_id, input.customer_sku_normalized, input.description)
        .await?;

    let vector_matches: Vec<VectorMatch> = if input.embeddings_enabled {
        match input.query_embedding {
            Some(q) => persistence.vector_search_products(org_id, q).await?,
            None => Vec::new(),
        }
    } else {
        Vec::new()
    };

    let mut cosine_by_sku: HashMap<String, f64> = HashMap::new();
    for v in &vector_matches {
        cosine_by_sku.insert(v.product.internal_sku.clone(), v.cosine_similarity);
    }

    let mut by_sku: HashMap<String, &orderflow_model::Product> = HashMap::new();
    for t in &trigram_matches {
        by_sku.insert(t.product.internal_sku.clone(), &t.product);
    }
    for v in &vector_matches {
        by_sku.entry(v.product.internal_sku.clone()).or_insert(&v.product);
    }

    let mut scored = Vec::with_capacity(by_sku.len());
    for (sku, product) in &by_sku {
        let s_tri = trigram_score(input.customer_sku_normalized, input.description, product);
        let s_emb = embedding_score(cosine_by_sku.get(sku).copied());
        let p_uom = uom_penalty(input.line_uom, product);

        let tiers = persistence
            .find_customer_prices(org_id, input.customer_id, sku)
            .await?;
        let price_ctx = PriceContext {
            line_unit_price: input.line_unit_price,
            line_currency: input.line_currency,
            line_uom: input.line_uom,
            line_qty: input.line_qty,
            order_date: input.order_date,
            product,
        };
        let p_price = price_penalty(&price_ctx, &tiers, price_tolerance_percent);

        scored.push(ScoredCandidate::from_product(product, s_tri, s_emb, p_uom, p_price));
    }

    Ok(decide(scored, auto_apply_threshold, auto_apply_gap))
}
