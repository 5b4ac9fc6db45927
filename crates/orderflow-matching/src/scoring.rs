//! The scoring formula of spec §4.5.2, kept as pure functions over plain
//! values so the boundary behaviors of spec §8 are directly testable
//! without a port or an async runtime.

use chrono::NaiveDate;
use orderflow_model::{trigram_similarity, CustomerPrice, Product, Uom};

/// `S_tri = max(S_tri_sku, 0.7 * S_tri_desc)`.
pub fn trigram_score(customer_sku_norm: &str, line_description: &str, product: &Product) -> f64 {
    let s_tri_sku = trigram_similarity(customer_sku_norm, &product.internal_sku);
    let s_tri_desc = trigram_similarity(line_description, &product.name_and_description());
    s_tri_sku.max(0.7 * s_tri_desc)
}

/// `S_emb = clamp((cosine + 1) / 2, 0, 1)`, or `0.0` if unavailable.
pub fn embedding_score(cosine: Option<f64>) -> f64 {
    match cosine {
        Some(c) => ((c + 1.0) / 2.0).clamp(0.0, 1.0),
        None => 0.0,
    }
}

/// `S_hybrid = max(0, 0.62 * S_tri + 0.38 * S_emb)`.
pub fn hybrid_score(s_tri: f64, s_emb: f64) -> f64 {
    (0.62 * s_tri + 0.38 * s_emb).max(0.0)
}

/// The UoM penalty `P_uom` (spec §4.5.2).
pub fn uom_penalty(line_uom: Option<Uom>, product: &Product) -> f64 {
    match line_uom {
        None => 0.9,
        Some(uom) => {
            if uom == product.base_uom {
                1.0
            } else if product.uom_conversions.contains_key(uom.as_str()) {
                1.0
            } else {
                0.2
            }
        }
    }
}

/// Inputs needed to compute the price penalty for one line.
pub struct PriceContext<'a> {
    pub line_unit_price: Option<f64>,
    pub line_currency: Option<&'a str>,
    pub line_uom: Option<Uom>,
    pub line_qty: f64,
    pub order_date: Option<NaiveDate>,
    /// Carries `base_uom`/`uom_conversions` so tiers quoted in a
    /// compatible-but-different UoM (e.g. price per carton vs. a line
    /// quoted per piece) can be converted rather than skipped.
    pub product: &'a Product,
}

/// Units of `product.base_uom` per one `uom`, or `None` if `uom` is
/// neither the base UoM nor in `product.uom_conversions`.
fn base_units_factor(uom: Uom, product: &Product) -> Option<f64> {
    if uom == product.base_uom {
        Some(1.0)
    } else {
        product.uom_conversions.get(uom.as_str()).copied()
    }
}

/// Select the applicable tier by `argmax(min_qty)` subject to
/// `min_qty <= line.qty`, restricted to matching currency and a UoM that is
/// either identical to the line's or convertible to/from it via
/// `product.uom_conversions`, within an inclusive valid-from/valid-to
/// window (spec §4.5.2). Quantities are compared in base-UoM units so a
/// tier priced per carton and a line quoted per piece are still ordered
/// correctly against each other.
pub fn select_price_tier<'a>(ctx: &PriceContext, tiers: &'a [CustomerPrice]) -> Option<&'a CustomerPrice> {
    let line_currency = ctx.line_currency?;
    let line_uom = ctx.line_uom?;
    let line_factor = base_units_factor(line_uom, ctx.product)?;
    let line_qty_base = ctx.line_qty * line_factor;
    let candidates = tiers.iter().filter_map(|t| {
        if t.currency != line_currency {
            return None;
        }
        let tier_factor = base_units_factor(t.uom, ctx.product)?;
        if t.min_qty * tier_factor > line_qty_base {
            return None;
        }
        if let Some(d) = ctx.order_date {
            if t.valid_from.is_some_and(|f| d < f) {
                return None;
            }
            if t.valid_to.is_some_and(|u| d > u) {
                return None;
            }
        }
        Some((t, t.min_qty * tier_factor))
    });
    candidates.max_by(|a, b| a.1.partial_cmp(&b.1).unwrap()).map(|(t, _)| t)
}

/// `P_price` (spec §4.5.2). Returns `1.0` whenever no tier applies, the
/// line has no price, or the line currency is unknown (spec §9 open
/// question resolution: null line currency -> `P_price = 1.0`). When the
/// selected tier's UoM differs from the line's, both are converted to
/// base-UoM units before the tolerance comparison.
pub fn price_penalty(ctx: &PriceContext, tiers: &[CustomerPrice], tolerance_percent: f64) -> f64 {
    let Some(line_price) = ctx.line_unit_price else {
        return 1.0;
    };
    if ctx.line_currency.is_none() {
        return 1.0;
    }
    let Some(line_uom) = ctx.line_uom else {
        return 1.0;
    };
    let Some(line_factor) = base_units_factor(line_uom, ctx.product) else {
        return 1.0;
    };
    let Some(tier) = select_price_tier(ctx, tiers) else {
        return 1.0;
    };
    let Some(tier_factor) = base_units_factor(tier.uom, ctx.product) else {
        return 1.0;
    };
    if tier.unit_price <= 0.0 {
        return 1.0;
    }
    let line_price_per_base = line_price / line_factor;
    let tier_price_per_base = tier.unit_price / tier_factor;
    if tier_price_per_base <= 0.0 {
        return 1.0;
    }
    let delta_percent = (line_price_per_base - tier_price_per_base).abs() / tier_price_per_base * 100.0;
    if delta_percent <= tolerance_percent {
        1.0
    } else if delta_percent <= 2.0 * tolerance_percent {
        0.85
    } else {
        0.65
    }
}

/// `confidence = clamp(S_hybrid * P_uom * P_price, 0, 1)`.
pub fn confidence(s_hybrid: f64, p_uom: f64, p_price: f64) -> f64 {
    (s_hybrid * p_uom * p_price).clamp(0.0, 1.0)
}
