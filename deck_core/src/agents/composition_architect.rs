use crate::config::ModelTier;
use crate::data_models::outline::StyleGuide;
use crate::data_models::slide::{
    BackgroundPlan, BackgroundType, CompositionPlan, ContentPattern, ContentPlan,
    ContentStructure, DecorativeElement, LayoutVariant, RouterDecision, SerendipityPlan,
    StyleMode,
};
use crate::invariants::clamp01;
use crate::llm_gateway::{CallOptions, LlmGateway};
use crate::prompts;
use crate::utils::logger::log_agent_event;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde_json::json;
use std::collections::HashSet;

pub const AGENT_NAME: &str = "composition_architect";
pub const MAX_DECORATIVE_ELEMENTS: usize = 4;
pub const MAX_SURPRISES: usize = 2;

/// The full surprise palette; style modes filter it down.
const SURPRISE_PALETTE: [&str; 8] = [
    "accent-tilt",
    "oversized-numeral",
    "duotone-photo",
    "gradient-wash",
    "floating-chips",
    "outlined-typography",
    "asymmetric-crop",
    "pattern-field",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcStage {
    Opening,
    Climax,
    Resolution,
}

impl ArcStage {
    pub fn for_position(index: usize, total: usize) -> Self {
        if index == 0 || total <= 2 {
            ArcStage::Opening
        } else if index + 1 == total {
            ArcStage::Resolution
        } else {
            ArcStage::Climax
        }
    }

    fn base_budget(self) -> f64 {
        match self {
            ArcStage::Opening => 0.35,
            ArcStage::Climax => 0.75,
            ArcStage::Resolution => 0.45,
        }
    }

    fn name(self) -> &'static str {
        match self {
            ArcStage::Opening => "opening, stay subtle",
            ArcStage::Climax => "middle, may climax",
            ArcStage::Resolution => "closing, resolve",
        }
    }
}

pub struct CompositionContext<'a> {
    pub slide_title: &'a str,
    pub decision: &'a RouterDecision,
    pub content: &'a ContentPlan,
    pub style_guide: &'a StyleGuide,
    pub style_mode: StyleMode,
    pub used_surprises: &'a HashSet<String>,
    pub slide_index: usize,
    pub total_slides: usize,
    pub deck_seed: u64,
}

/// Surprise decorations a style mode is allowed to draw from.
pub fn allowed_surprises(mode: StyleMode) -> &'static [&'static str] {
    match mode {
        StyleMode::Corporate => &[],
        StyleMode::Professional => &SURPRISE_PALETTE[..4],
        StyleMode::Serendipitous => &SURPRISE_PALETTE,
    }
}

/// Variation budget after the style-mode multiplier, clamped to the unit
/// interval. `corporate` always lands at a usable but never-spent budget.
pub fn variation_budget(ctx: &CompositionContext<'_>) -> f64 {
    let stage = ArcStage::for_position(ctx.slide_index, ctx.total_slides);
    clamp01(stage.base_budget() * ctx.style_mode.variation_multiplier())
}

/// Deterministic surprise draw seeded from the deck seed and slide index.
fn draw_surprises(ctx: &CompositionContext<'_>, budget: f64) -> Vec<String> {
    if ctx.style_mode == StyleMode::Corporate {
        return Vec::new();
    }
    let count = if budget >= 0.6 {
        MAX_SURPRISES
    } else if budget >= 0.3 {
        1
    } else {
        0
    };
    if count == 0 {
        return Vec::new();
    }
    let mut candidates: Vec<&str> = allowed_surprises(ctx.style_mode)
        .iter()
        .copied()
        .filter(|s| !ctx.used_surprises.contains(*s))
        .collect();
    let mut rng = ChaCha8Rng::seed_from_u64(
        ctx.deck_seed ^ (ctx.slide_index as u64).wrapping_mul(0x9E37_79B9),
    );
    candidates.shuffle(&mut rng);
    candidates
        .into_iter()
        .take(count)
        .map(|s| s.to_string())
        .collect()
}

fn pattern_for(variant: LayoutVariant, content: &ContentPlan) -> ContentPattern {
    match variant {
        LayoutVariant::BentoGrid | LayoutVariant::DashboardTiles => ContentPattern::CardGrid,
        LayoutVariant::MetricsRail => ContentPattern::MetricsRail,
        LayoutVariant::SplitLeftText | LayoutVariant::SplitRightText => ContentPattern::SplitContent,
        LayoutVariant::HeroCentered => ContentPattern::SingleHero,
        LayoutVariant::AsymmetricGrid => ContentPattern::CardRow,
        _ => {
            if content.data_points.len() >= 2 {
                ContentPattern::CardRow
            } else {
                ContentPattern::NarrativeFlow
            }
        }
    }
}

/// Safe plan used when the model output is unusable for any reason.
pub fn conservative_plan(ctx: &CompositionContext<'_>) -> CompositionPlan {
    let budget = variation_budget(ctx);
    CompositionPlan {
        background: BackgroundPlan {
            background_type: BackgroundType::Solid,
            suggestion: format!(
                "flat {} field with generous margins",
                ctx.style_guide.color_palette.background
            ),
        },
        decorative_elements: vec![DecorativeElement {
            element_type: "accent-line".to_string(),
            placement: "under title".to_string(),
            purpose: "anchor the heading".to_string(),
        }],
        content_structure: ContentStructure {
            pattern: pattern_for(ctx.decision.layout_variant, ctx.content),
            card_count: None,
            card_style: None,
            text_block_count: Some(1),
        },
        serendipity_plan: SerendipityPlan {
            variation_budget: budget,
            allocated_surprises: Vec::new(),
        },
        reasoning: "conservative fallback composition".to_string(),
    }
}

fn composition_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "background": {"type": "object"},
            "decorative_elements": {"type": "array"},
            "content_structure": {"type": "object"},
            "serendipity_plan": {"type": "object"},
            "reasoning": {"type": "string"}
        },
        "required": ["background", "content_structure", "serendipity_plan", "reasoning"]
    })
}

/// # NDOC
/// component: `agents::composition_architect`
/// purpose: Plan background, decoration, structure, and surprise allocation.
/// invariants:
///   - Never fails: any error produces the conservative plan.
///   - `corporate` mode deterministically emits an empty surprise list.
///   - A surprise already used in this deck is never allocated again.
pub async fn plan_composition(
    gateway: &LlmGateway,
    ctx: &CompositionContext<'_>,
) -> CompositionPlan {
    let budget = variation_budget(ctx);
    let stage = ArcStage::for_position(ctx.slide_index, ctx.total_slides);
    let style_dna = format!(
        "{} / title {} / body {} / primary #{}",
        ctx.style_guide.theme_name,
        ctx.style_guide.font_family_title,
        ctx.style_guide.font_family_body,
        ctx.style_guide.color_palette.primary
    );
    let used: Vec<&str> = ctx.used_surprises.iter().map(|s| s.as_str()).collect();
    let prompt = prompts::render(
        prompts::prompt_for(AGENT_NAME),
        &[
            ("title", ctx.slide_title),
            ("render_mode", &format!("{:?}", ctx.decision.render_mode)),
            ("layout_variant", ctx.decision.layout_variant.as_str()),
            ("style_dna", &style_dna),
            ("variation_budget", &format!("{budget:.2}")),
            ("used_surprises", &used.join(", ")),
            ("position", &(ctx.slide_index + 1).to_string()),
            ("total", &ctx.total_slides.to_string()),
            ("arc_stage", stage.name()),
            ("allowed_surprises", &allowed_surprises(ctx.style_mode).join(", ")),
        ],
    );
    let opts = CallOptions {
        temperature: Some(0.7),
        max_output_tokens: Some(1_024),
        ..CallOptions::default()
    };
    let outcome = gateway
        .typed_json_call_as::<CompositionPlan>(
            AGENT_NAME,
            ModelTier::Agentic,
            &prompt,
            composition_schema(),
            opts,
        )
        .await;

    match outcome {
        Ok(mut plan) => {
            plan.decorative_elements.truncate(MAX_DECORATIVE_ELEMENTS);
            plan.serendipity_plan.variation_budget = budget;
            if ctx.style_mode == StyleMode::Corporate {
                plan.serendipity_plan.allocated_surprises.clear();
            } else {
                let allowed = allowed_surprises(ctx.style_mode);
                plan.serendipity_plan.allocated_surprises.retain(|s| {
                    allowed.contains(&s.as_str()) && !ctx.used_surprises.contains(s)
                });
                plan.serendipity_plan
                    .allocated_surprises
                    .truncate(MAX_SURPRISES);
                if plan.serendipity_plan.allocated_surprises.is_empty() {
                    plan.serendipity_plan.allocated_surprises = draw_surprises(ctx, budget);
                }
            }
            log_agent_event(
                AGENT_NAME,
                "composition_planned",
                &json!({
                    "slide": ctx.slide_index,
                    "surprises": plan.serendipity_plan.allocated_surprises.len(),
                    "variation_budget": plan.serendipity_plan.variation_budget,
                }),
            );
            plan
        }
        Err(err) => {
            log::warn!(
                target: AGENT_NAME,
                error = err.message.as_str();
                "composition failed, using conservative plan"
            );
            conservative_plan(ctx)
        }
    }
}
