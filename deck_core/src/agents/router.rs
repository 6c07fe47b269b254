use crate::config::ModelTier;
use crate::contracts::{PipelineErrorKind, StageResult};
use crate::data_models::outline::{SlideStub, SlideType};
use crate::data_models::slide::{DensityBudget, LayoutVariant, RenderMode, RouterDecision};
use crate::llm_gateway::{CallOptions, LlmGateway};
use crate::prompts;
use crate::utils::logger::log_agent_event;
use serde_json::json;

pub const AGENT_NAME: &str = "router";

fn router_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "render_mode": {"enum": ["statement", "infographic", "data-viz", "standard"]},
            "layout_variant": {"type": "string"},
            "layout_intent": {"type": "string"},
            "density_budget": {
                "type": "object",
                "properties": {
                    "max_chars": {"type": "integer"},
                    "max_items": {"type": "integer"},
                    "min_visuals": {"type": "integer"}
                }
            },
            "visual_focus": {"type": "string"}
        },
        "required": ["render_mode", "layout_variant", "layout_intent", "density_budget", "visual_focus"]
    })
}

/// Deterministic decision protocol; also the fallback when the model reply
/// is unusable.
pub fn protocol_decision(
    stub: &SlideStub,
    fact_count: usize,
    avoid: &[LayoutVariant],
) -> RouterDecision {
    let preferred = match stub.slide_type {
        SlideType::TitleSlide | SlideType::Conclusion => LayoutVariant::HeroCentered,
        SlideType::SectionHeader => LayoutVariant::HeroCentered,
        SlideType::DataViz => LayoutVariant::SplitLeftText,
        SlideType::ContentMain => {
            let lowered = format!("{} {}", stub.title, stub.purpose).to_ascii_lowercase();
            if lowered.contains("versus") || lowered.contains(" vs") || lowered.contains("compar") {
                LayoutVariant::SplitLeftText
            } else if lowered.contains("step") || lowered.contains("journey") || lowered.contains("timeline") {
                LayoutVariant::TimelineHorizontal
            } else if fact_count >= 3 {
                LayoutVariant::BentoGrid
            } else {
                LayoutVariant::StandardVertical
            }
        }
    };
    let layout_variant = if avoid.contains(&preferred) {
        // Walk the closed set in declared order for the first allowed variant.
        LayoutVariant::ALL
            .into_iter()
            .find(|v| !avoid.contains(v) && *v != LayoutVariant::BentoGrid)
            .unwrap_or(LayoutVariant::StandardVertical)
    } else {
        preferred
    };

    let render_mode = match stub.slide_type {
        SlideType::TitleSlide | SlideType::SectionHeader => RenderMode::Statement,
        SlideType::DataViz => RenderMode::DataViz,
        SlideType::Conclusion => RenderMode::Statement,
        SlideType::ContentMain => RenderMode::Standard,
    };
    let density_budget = match layout_variant {
        LayoutVariant::HeroCentered => DensityBudget {
            max_chars: 200,
            max_items: 3,
            min_visuals: 0,
        },
        LayoutVariant::BentoGrid | LayoutVariant::DashboardTiles => DensityBudget {
            max_chars: 320,
            max_items: 6,
            min_visuals: 1,
        },
        _ => DensityBudget {
            max_chars: 420,
            max_items: 5,
            min_visuals: 0,
        },
    };
    RouterDecision {
        render_mode,
        layout_variant,
        layout_intent: format!(
            "{} rendered as {} for its {} role",
            stub.title,
            layout_variant.as_str(),
            slide_type_name(stub.slide_type)
        ),
        density_budget,
        visual_focus: stub.purpose.clone(),
    }
}

fn slide_type_name(slide_type: SlideType) -> &'static str {
    match slide_type {
        SlideType::TitleSlide => "title",
        SlideType::SectionHeader => "section header",
        SlideType::ContentMain => "content",
        SlideType::DataViz => "data",
        SlideType::Conclusion => "conclusion",
    }
}

/// # NDOC
/// component: `agents::router`
/// purpose: Pick layout, render mode, and density budget for one slide.
/// invariants:
///   - A variant in `avoid` is never returned, whatever the model says.
///   - Contract failures fall back to the deterministic protocol; only
///     `ServiceUnavailable` propagates.
pub async fn route_slide(
    gateway: &LlmGateway,
    stub: &SlideStub,
    fact_count: usize,
    avoid: &[LayoutVariant],
) -> StageResult<RouterDecision> {
    let avoid_list = if avoid.is_empty() {
        "none".to_string()
    } else {
        avoid.iter().map(|v| v.as_str()).collect::<Vec<_>>().join(", ")
    };
    let prompt = prompts::render(
        prompts::prompt_for(AGENT_NAME),
        &[
            ("title", &stub.title),
            ("slide_type", slide_type_name(stub.slide_type)),
            ("purpose", &stub.purpose),
            ("fact_count", &fact_count.to_string()),
            ("avoid", &avoid_list),
        ],
    );
    let opts = CallOptions {
        temperature: Some(0.2),
        max_output_tokens: Some(512),
        ..CallOptions::default()
    };
    let outcome = gateway
        .typed_json_call_as::<RouterDecision>(
            AGENT_NAME,
            ModelTier::Simple,
            &prompt,
            router_schema(),
            opts,
        )
        .await;

    match outcome {
        Ok(mut decision) => {
            if avoid.contains(&decision.layout_variant) {
                log::info!(
                    target: AGENT_NAME,
                    variant = decision.layout_variant.as_str();
                    "model picked a forbidden variant, applying protocol"
                );
                decision = protocol_decision(stub, fact_count, avoid);
            }
            decision.density_budget.max_chars = decision.density_budget.max_chars.clamp(80, 800);
            decision.density_budget.max_items = decision.density_budget.max_items.clamp(1, 8);
            log_agent_event(
                AGENT_NAME,
                "layout_chosen",
                &json!({
                    "slide": stub.order,
                    "layout_variant": decision.layout_variant.as_str(),
                }),
            );
            Ok(decision)
        }
        Err(err) if err.kind == PipelineErrorKind::ServiceUnavailable => Err(err),
        Err(_) => {
            let decision = protocol_decision(stub, fact_count, avoid);
            log_agent_event(
                AGENT_NAME,
                "protocol_fallback",
                &json!({
                    "slide": stub.order,
                    "layout_variant": decision.layout_variant.as_str(),
                }),
            );
            Ok(decision)
        }
    }
}
