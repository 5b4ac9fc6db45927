//! Orchestrates one LLM extraction call: one-shot JSON repair, then the
//! hallucination guards of spec §4.3. A guard failure discards the whole
//! output and surfaces as an error — there is no partial acceptance.

use orderflow_error::{OrderflowError, Result};
use orderflow_model::{
    CanonicalOrderHeader, CanonicalOrderLine, CanonicalOrderOutput, Confidence, HeaderConfidence,
    LineConfidence,
};
use orderflow_ports::{FewShotExample, LlmCallResult, LlmProviderPort};

use crate::candidate::count_candidate_lines;
use crate::guards::{anchor_guard, line_count_guard, parse_uom, range_guard};
use crate::raw::RawExtraction;

pub const EXTRACTOR_VERSION_TEXT: &str = "llm_text_v1";
pub const EXTRACTOR_VERSION_VISION: &str = "llm_vision_v1";

/// Baseline per-field confidence for a present field. The rule extractors
/// distinguish exact/fuzzy header matches (spec §4.2); an LLM call doesn't
/// expose that distinction, so a single flat value stands in for "present".
const LLM_FIELD_CONFIDENCE: f64 = 0.8;

/// A guard-passing extraction plus the billing/observability metrics of the
/// provider call(s) behind it, so a caller (the orchestrator) can persist an
/// `AiCallLog` without re-deriving cost and latency.
#[derive(Debug, Clone)]
pub struct LlmExtractionResult {
    pub output: CanonicalOrderOutput,
    pub model: String,
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub latency_ms: u64,
    pub cost_micros: u64,
}

/// Extract from already-OCR'd/native document text. On failure (parse
/// failure, schema mismatch, or guard rejection) the returned error still
/// carries the call's `model`/`*_tokens`/`latency_ms`/`cost_micros` in its
/// context when a provider response was received, so the caller can log the
/// spent cost even though the extraction was discarded.
pub async fn extract_from_text(
    provider: &dyn LlmProviderPort,
    document_text: &str,
    hint_examples: &[FewShotExample],
) -> Result<LlmExtractionResult> {
    let call = provider.extract_from_text(document_text, hint_examples).await?;
    finish(provider, call, document_text, EXTRACTOR_VERSION_TEXT).await
}

/// Extract from page images (the scanned-PDF vision path, spec §4.4 step 3d).
/// `source_text_for_guards` is whatever text the rule pipeline could scrape
/// from the same document, if any; when empty the anchor guard is skipped
/// since there is nothing to anchor against.
pub async fn extract_from_images(
    provider: &dyn LlmProviderPort,
    images_base64: &[String],
    hint_examples: &[FewShotExample],
    source_text_for_guards: &str,
) -> Result<LlmExtractionResult> {
    let call = provider.extract_from_images(images_base64, hint_examples).await?;
    finish(provider, call, source_text_for_guards, EXTRACTOR_VERSION_VISION).await
}

fn with_call_metrics(err: OrderflowError, call: &LlmCallResult) -> OrderflowError {
    err.with_context("model", call.model.clone())
        .with_context("input_tokens", call.input_tokens)
        .with_context("output_tokens", call.output_tokens)
        .with_context("latency_ms", call.latency_ms)
        .with_context("cost_micros", call.cost_micros)
}

async fn finish(
    provider: &dyn LlmProviderPort,
    mut call: LlmCallResult,
    source_text_for_guards: &str,
    extractor_version: &str,
) -> Result<LlmExtractionResult> {
    if call.parsed.is_none() {
        tracing::debug!(extractor_version, "llm output did not parse as JSON, attempting one repair");
        call = provider.repair_malformed_json(&call.raw_text).await?;
    }

    let accepted = accept(&call, source_text_for_guards, extractor_version);
    match accepted {
        Ok(output) => {
            tracing::debug!(
                extractor_version,
                line_count = output.line_count(),
                overall_confidence = output.confidence.overall.get(),
                "llm extraction accepted"
            );
            Ok(LlmExtractionResult {
                output,
                model: call.model,
                input_tokens: call.input_tokens,
                output_tokens: call.output_tokens,
                latency_ms: call.latency_ms,
                cost_micros: call.cost_micros,
            })
        }
        Err(e) => Err(with_call_metrics(e, &call)),
    }
}

fn accept(
    call: &LlmCallResult,
    source_text_for_guards: &str,
    extractor_version: &str,
) -> Result<CanonicalOrderOutput> {
    let parsed = call
        .parsed
        .clone()
        .ok_or_else(|| OrderflowError::validation("LLM output did not parse as JSON even after repair"))?;
    let raw: RawExtraction = serde_json::from_value(parsed)
        .map_err(|e| OrderflowError::validation(format!("LLM output failed schema validation: {e}")))?;

    let output = build_canonical_output(extractor_version, raw, call.warnings.clone())?;

    // An empty source (the vision path with no text layer to fall back on)
    // has no heuristic basis to count candidate rows from at all, so the
    // line-count guard's ratio check is skipped entirely rather than
    // computed against zero candidates (which would reject any non-empty
    // vision extraction outright). Non-empty source text with zero
    // candidate rows is a genuine red flag and still applies the ratio
    // check (see `line_count_guard`).
    let candidate_line_count = if source_text_for_guards.trim().is_empty() {
        None
    } else {
        Some(count_candidate_lines(source_text_for_guards))
    };
    line_count_guard(output.line_count(), candidate_line_count)?;
    range_guard(&output)?;
    if !source_text_for_guards.trim().is_empty() {
        anchor_guard(&output, source_text_for_guards)?;
    }

    Ok(output)
}

fn present_confidence(is_present: bool) -> Confidence {
    Confidence::new(if is_present { LLM_FIELD_CONFIDENCE } else { 0.0 })
}

fn build_canonical_output(
    extractor_version: &str,
    raw: RawExtraction,
    mut warnings: Vec<String>,
) -> Result<CanonicalOrderOutput> {
    let mut output = CanonicalOrderOutput::new(extractor_version);
    output.order = CanonicalOrderHeader {
        external_order_number: raw.order.external_order_number,
        order_date: raw.order.order_date,
        currency: raw.order.currency,
        customer_hint: raw.order.customer_hint,
        requested_delivery_date: raw.order.requested_delivery_date,
        ship_to: None,
        bill_to: None,
        notes: raw.order.notes,
    };
    output.confidence.header = HeaderConfidence {
        external_order_number: present_confidence(output.order.external_order_number.is_some()),
        order_date: present_confidence(output.order.order_date.is_some()),
        currency: present_confidence(output.order.currency.is_some()),
        customer_hint: present_confidence(output.order.customer_hint.is_some()),
        requested_delivery_date: present_confidence(output.order.requested_delivery_date.is_some()),
        ship_to: Confidence::zero(),
    };

    for (idx, raw_line) in raw.lines.into_iter().enumerate() {
        let line_no = raw_line.line_no.unwrap_or(idx as u32 + 1);
        let uom = parse_uom(raw_line.uom.as_deref())?;

        if raw_line.customer_sku_raw.is_none() && raw_line.product_description.is_none() {
            warnings.push(format!("line {line_no} has neither SKU nor description"));
        }

        output.confidence.lines.push(LineConfidence {
            customer_sku_raw: present_confidence(raw_line.customer_sku_raw.is_some()),
            qty: Confidence::new(LLM_FIELD_CONFIDENCE),
            uom: present_confidence(uom.is_some()),
            unit_price: present_confidence(raw_line.unit_price.is_some()),
        });
        output.lines.push(CanonicalOrderLine {
            line_no,
            customer_sku_raw: raw_line.customer_sku_raw,
            product_description: raw_line.product_description,
            qty: raw_line.qty,
            uom,
            unit_price: raw_line.unit_price,
            currency: raw_line.currency,
            delivery_date: None,
        });
    }

    let any_out_of_range = output.has_out_of_range_qty();
    output.confidence.compute_overall(any_out_of_range);
    output.warnings = warnings;
    Ok(output)
}
