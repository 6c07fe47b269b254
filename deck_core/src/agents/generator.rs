use crate::auto_repair::repair_slide_payload;
use crate::config::ModelTier;
use crate::contracts::{PipelineErrorKind, StageResult};
use crate::data_models::outline::{Outline, SlideStub};
use crate::data_models::slide::{
    BackgroundPlan, BackgroundType, ChartSpec, CompositionPlan, ContentPlan, LayoutPlan,
    NarrativeTrailEntry, ReadabilityCheck, RouterDecision, SlideComponent, SlideNode,
    TemplateComponent, VisualDesignSpec,
};
use crate::llm_gateway::{CallOptions, LlmGateway};
use crate::prompts;
use crate::schema_validation::validate_layout_plan;
use crate::utils::logger::log_agent_event;
use itertools::Itertools;
use serde::Deserialize;
use serde_json::json;

pub const AGENT_NAME: &str = "generator";
pub const FALLBACK_TEXT: &str = "Generation failed — placeholder content";

pub struct GenerationContext<'a> {
    pub stub: &'a SlideStub,
    pub decision: &'a RouterDecision,
    pub content: &'a ContentPlan,
    pub composition: &'a CompositionPlan,
    pub design: &'a VisualDesignSpec,
    pub trail: &'a [NarrativeTrailEntry],
    pub outline: &'a Outline,
}

/// Wire shape of a generated slide before assembly into `SlideNode`.
#[derive(Debug, Deserialize)]
struct GeneratedSlide {
    #[serde(default)]
    title: Option<String>,
    components: Vec<SlideComponent>,
    #[serde(default)]
    citations: Vec<String>,
    #[serde(default)]
    speaker_notes_lines: Vec<String>,
    #[serde(default)]
    visual_reasoning: Option<String>,
    #[serde(default)]
    visual_prompt: Option<String>,
    #[serde(default)]
    chart_spec: Option<ChartSpec>,
    #[serde(default)]
    background: Option<BackgroundPlan>,
}

fn slide_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "title": {"type": "string"},
            "components": {"type": "array", "minItems": 1, "maxItems": 3},
            "citations": {"type": "array", "items": {"type": "string"}},
            "speaker_notes_lines": {"type": "array", "items": {"type": "string"}},
            "visual_reasoning": {"type": "string"},
            "visual_prompt": {"type": "string"},
            "chart_spec": {"type": "object"}
        },
        "required": ["title", "components", "speaker_notes_lines", "visual_prompt"]
    })
}

fn trail_digest(trail: &[NarrativeTrailEntry]) -> String {
    if trail.is_empty() {
        return "this is the first slide".to_string();
    }
    trail
        .iter()
        .map(|e| {
            format!(
                "- \"{}\": {}{}",
                e.title,
                e.main_point,
                e.layout_variant
                    .map(|v| format!(" [{}]", v.as_str()))
                    .unwrap_or_default()
            )
        })
        .join("\n")
}

/// # NDOC
/// component: `agents::generator`
/// purpose: Emit the final typed slide node for one stub.
/// invariants:
///   - Runs on the AGENTIC tier, never SMART (truncation risk).
///   - Unrecoverable failures yield the deterministic fallback slide; the
///     deck never loses a slide. Only `ServiceUnavailable` propagates.
///
/// Returns the node and whether it is a fallback.
pub async fn generate_slide(
    gateway: &LlmGateway,
    ctx: &GenerationContext<'_>,
) -> StageResult<(SlideNode, bool)> {
    let facts = ctx.outline.facts_for_clusters(&ctx.stub.relevant_cluster_ids);
    let fact_digest = facts
        .iter()
        .map(|f| format!("- {} (source: {})", f.claim, f.source))
        .collect::<Vec<_>>()
        .join("\n");
    let visual_direction = format!(
        "negative space {}, background {}, harmony {}",
        ctx.design.negative_space_allocation,
        ctx.design.background_treatment,
        ctx.design
            .color_harmony
            .as_ref()
            .map(|h| format!("#{} / #{}", h.primary, h.accent))
            .unwrap_or_else(|| "deck palette".to_string())
    );
    let prompt = prompts::render(
        prompts::prompt_for(AGENT_NAME),
        &[
            ("title", &ctx.stub.title),
            ("slide_type", &format!("{:?}", ctx.stub.slide_type)),
            ("purpose", &ctx.stub.purpose),
            ("layout_variant", ctx.decision.layout_variant.as_str()),
            ("render_mode", &format!("{:?}", ctx.decision.render_mode)),
            (
                "content_plan",
                &serde_json::to_string(ctx.content).unwrap_or_default(),
            ),
            ("visual_direction", &visual_direction),
            ("narrative_trail", &trail_digest(ctx.trail)),
            ("facts", &fact_digest),
        ],
    );
    let opts = CallOptions {
        temperature: Some(0.6),
        max_output_tokens: Some(4_096),
        ..CallOptions::default()
    };
    let (raw, auto_closed) = match gateway
        .typed_json_call_reporting(AGENT_NAME, ModelTier::Agentic, &prompt, slide_schema(), opts)
        .await
    {
        Ok(raw) => raw,
        Err(err) if err.kind == PipelineErrorKind::ServiceUnavailable => return Err(err),
        Err(err) => {
            log::warn!(
                target: AGENT_NAME,
                error = err.message.as_str();
                "generation unrecoverable, emitting fallback slide"
            );
            return Ok((fallback_slide(ctx.stub, ctx.decision), true));
        }
    };

    let repaired = repair_slide_payload(raw);
    let mut warnings = repaired.warnings;
    if auto_closed {
        warnings.push("truncation repaired".to_string());
    }
    let generated: GeneratedSlide = match serde_json::from_value(repaired.value) {
        Ok(g) => g,
        Err(err) => {
            log::warn!(
                target: AGENT_NAME,
                error = err.to_string().as_str();
                "repaired payload does not match slide schema"
            );
            return Ok((fallback_slide(ctx.stub, ctx.decision), true));
        }
    };

    let layout_plan = LayoutPlan {
        title: generated
            .title
            .filter(|t| !t.trim().is_empty())
            .unwrap_or_else(|| ctx.stub.title.clone()),
        components: generated.components,
        background: generated
            .background
            .unwrap_or_else(|| ctx.composition.background.clone()),
    };
    match validate_layout_plan(&layout_plan) {
        Ok(mut schema_warnings) => warnings.append(&mut schema_warnings),
        Err(err) => {
            log::warn!(
                target: AGENT_NAME,
                error = err.message.as_str();
                "schema validation escalated to fallback"
            );
            return Ok((fallback_slide(ctx.stub, ctx.decision), true));
        }
    }

    let mut speaker_notes_lines = generated.speaker_notes_lines;
    if speaker_notes_lines.is_empty() {
        speaker_notes_lines.push(ctx.stub.purpose.clone());
    }
    let mut citations = generated.citations;
    if citations.is_empty() {
        citations = facts.iter().map(|f| f.source.clone()).collect();
        citations.dedup();
    }

    let readability_check = if warnings.is_empty() {
        ReadabilityCheck::Pass
    } else {
        ReadabilityCheck::Warning
    };

    let node = SlideNode {
        order: ctx.stub.order,
        slide_type: ctx.stub.slide_type,
        title: layout_plan.title.clone(),
        purpose: ctx.stub.purpose.clone(),
        router_config: ctx.decision.clone(),
        layout_plan,
        visual_design_spec: Some(ctx.design.clone()),
        composition_plan: Some(ctx.composition.clone()),
        citations,
        speaker_notes_lines,
        chart_spec: generated.chart_spec.or_else(|| ctx.content.chart_spec.clone()),
        visual_reasoning: generated
            .visual_reasoning
            .unwrap_or_else(|| ctx.decision.layout_intent.clone()),
        visual_prompt: generated.visual_prompt.unwrap_or_else(|| {
            format!(
                "abstract {} background, no text, mood: {}",
                ctx.composition.background.suggestion, ctx.stub.purpose
            )
        }),
        background_image_url: None,
        readability_check,
        warnings,
        environment_snapshot: None,
    };
    log_agent_event(
        AGENT_NAME,
        "slide_generated",
        &json!({
            "slide": ctx.stub.order,
            "components": node.layout_plan.components.len(),
            "warnings": node.warnings.len(),
        }),
    );
    Ok((node, false))
}

/// Deterministic placeholder preserving deck length when generation fails.
pub fn fallback_slide(stub: &SlideStub, decision: &RouterDecision) -> SlideNode {
    SlideNode {
        order: stub.order,
        slide_type: stub.slide_type,
        title: stub.title.clone(),
        purpose: stub.purpose.clone(),
        router_config: decision.clone(),
        layout_plan: LayoutPlan {
            title: stub.title.clone(),
            components: vec![SlideComponent::from(TemplateComponent::TextBullets {
                title: Some(stub.title.clone()),
                content: vec![FALLBACK_TEXT.to_string()],
                style: None,
            })],
            background: BackgroundPlan {
                background_type: BackgroundType::Solid,
                suggestion: "neutral placeholder background".to_string(),
            },
        },
        visual_design_spec: None,
        composition_plan: None,
        citations: Vec::new(),
        speaker_notes_lines: vec!["Slide content could not be generated.".to_string()],
        chart_spec: None,
        visual_reasoning: "fallback placeholder".to_string(),
        visual_prompt: "plain dark gradient, no text".to_string(),
        background_image_url: None,
        readability_check: ReadabilityCheck::Fail,
        warnings: vec!["critical: generation failed, placeholder emitted".to_string()],
        environment_snapshot: None,
    }
}
