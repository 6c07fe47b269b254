use crate::config::ModelTier;
use crate::data_models::outline::StyleGuide;
use crate::data_models::slide::{
    CompositionPlan, ContentPlan, RouterDecision, SpatialStrategy, VisualDesignSpec,
};
use crate::llm_gateway::{CallOptions, LlmGateway};
use crate::prompts;
use crate::spatial::color::normalize_color;
use crate::spatial::templates::template_for;
use crate::utils::logger::log_agent_event;
use serde_json::json;

pub const AGENT_NAME: &str = "visual_designer";

fn design_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "spatial_strategy": {"type": "object"},
            "color_harmony": {"type": "object"},
            "negative_space_allocation": {"type": "string"},
            "background_treatment": {"type": "string"},
            "foreground_elements": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["spatial_strategy", "negative_space_allocation", "background_treatment"]
    })
}

/// Spec derived straight from the style guide; harmony stays `None` so the
/// renderer falls back to the guide's colors unchanged.
pub fn default_spec(decision: &RouterDecision) -> VisualDesignSpec {
    let template = template_for(decision.layout_variant);
    VisualDesignSpec {
        spatial_strategy: SpatialStrategy {
            zones: template.zones.iter().map(|z| z.id.to_string()).collect(),
            hierarchy: "title first, content second, decoration last".to_string(),
            negative_space_plan: "keep outer margins clear".to_string(),
        },
        color_harmony: None,
        negative_space_allocation: "25%".to_string(),
        background_treatment: "quiet field matching the deck palette".to_string(),
        foreground_elements: Vec::new(),
    }
}

fn normalize_harmony(spec: &mut VisualDesignSpec, style: &StyleGuide) {
    if let Some(harmony) = &mut spec.color_harmony {
        let p = &style.color_palette;
        harmony.primary = normalize_color(&harmony.primary, &p.primary);
        harmony.accent = normalize_color(&harmony.accent, &p.accent_high_contrast);
        harmony.background_tone = normalize_color(&harmony.background_tone, &p.background);
    }
}

/// # NDOC
/// component: `agents::visual_designer`
/// purpose: Produce the visual design spec with one internal
/// critique-revise pass.
/// invariants:
///   - At most two generation calls per slide (initial + one revision).
///   - Any failure falls back to the style-guide-derived default spec.
///
/// Returns the spec and the number of design attempts made.
pub async fn design_visuals(
    gateway: &LlmGateway,
    decision: &RouterDecision,
    content: &ContentPlan,
    composition: &CompositionPlan,
    style: &StyleGuide,
) -> (VisualDesignSpec, u32) {
    let content_summary = summarize_content(content);
    let composition_summary = format!(
        "{:?} background, {} decorations, pattern {:?}",
        composition.background.background_type,
        composition.decorative_elements.len(),
        composition.content_structure.pattern
    );
    let palette = format!(
        "primary #{} secondary #{} background #{} text #{} accent #{}",
        style.color_palette.primary,
        style.color_palette.secondary,
        style.color_palette.background,
        style.color_palette.text,
        style.color_palette.accent_high_contrast
    );
    let prompt = prompts::render(
        prompts::prompt_for(AGENT_NAME),
        &[
            ("title", &content.title),
            ("layout_variant", decision.layout_variant.as_str()),
            ("content_summary", &content_summary),
            ("composition_summary", &composition_summary),
            ("palette", &palette),
        ],
    );
    let opts = CallOptions {
        temperature: Some(0.6),
        max_output_tokens: Some(1_024),
        ..CallOptions::default()
    };

    let mut attempts = 1u32;
    let first = gateway
        .typed_json_call_as::<VisualDesignSpec>(
            AGENT_NAME,
            ModelTier::Agentic,
            &prompt,
            design_schema(),
            opts.clone(),
        )
        .await;
    let mut spec = match first {
        Ok(spec) => spec,
        Err(err) => {
            log::warn!(
                target: AGENT_NAME,
                error = err.message.as_str();
                "initial design failed, using default spec"
            );
            log_agent_event(
                AGENT_NAME,
                "default_spec_fallback",
                &json!({"attempts": attempts}),
            );
            return (default_spec(decision), attempts);
        }
    };

    // Recursive loop, bounded at one revision: self-critique, then revise
    // only when the critic asks for it.
    let critique_prompt = prompts::render(
        prompts::prompt_for("visual_designer_critique"),
        &[
            ("spec", &serde_json::to_string(&spec).unwrap_or_default()),
            ("content_summary", &content_summary),
        ],
    );
    let critique = gateway
        .text_call(
            AGENT_NAME,
            ModelTier::Simple,
            &critique_prompt,
            CallOptions {
                temperature: Some(0.0),
                max_output_tokens: Some(128),
                ..CallOptions::default()
            },
        )
        .await;

    if let Ok(verdict) = critique {
        let verdict = verdict.trim();
        if let Some(problem) = verdict.strip_prefix("REVISE") {
            attempts += 1;
            let revise_prompt = format!(
                "{prompt}\n\nYour previous spec was rejected: {}.\nEmit a corrected JSON spec.",
                problem.trim()
            );
            if let Ok(revised) = gateway
                .typed_json_call_as::<VisualDesignSpec>(
                    AGENT_NAME,
                    ModelTier::Agentic,
                    &revise_prompt,
                    design_schema(),
                    opts,
                )
                .await
            {
                spec = revised;
            }
        }
    }

    normalize_harmony(&mut spec, style);
    log_agent_event(AGENT_NAME, "design_ready", &json!({"attempts": attempts}));
    (spec, attempts)
}

fn summarize_content(content: &ContentPlan) -> String {
    format!(
        "{} key points, {} data points{}",
        content.key_points.len(),
        content.data_points.len(),
        if content.chart_spec.is_some() {
            ", includes a chart"
        } else {
            ""
        }
    )
}
