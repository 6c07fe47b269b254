use crate::config::ModelTier;
use crate::contracts::{PipelineErrorKind, StageResult};
use crate::data_models::outline::{Outline, SlideStub};
use crate::data_models::slide::{ContentPlan, DataPoint, RouterDecision};
use crate::llm_gateway::{CallOptions, LlmGateway};
use crate::prompts;
use crate::utils::logger::log_agent_event;
use serde_json::json;

pub const AGENT_NAME: &str = "content_planner";

/// Hard caps pre-emitted to the prompt to prevent truncation.
pub const MAX_KEY_POINTS: usize = 5;
pub const MAX_DATA_POINTS: usize = 4;

fn content_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "title": {"type": "string"},
            "key_points": {"type": "array", "items": {"type": "string"}},
            "data_points": {"type": "array"},
            "narrative": {"type": "string"},
            "chart_spec": {"type": "object"}
        },
        "required": ["title", "key_points"]
    })
}

/// Deterministic plan straight from the scoped facts; used when the model
/// output cannot be recovered.
fn plan_from_facts(stub: &SlideStub, outline: &Outline) -> ContentPlan {
    let facts = outline.facts_for_clusters(&stub.relevant_cluster_ids);
    let key_points: Vec<String> = facts
        .iter()
        .take(MAX_KEY_POINTS)
        .map(|f| f.claim.clone())
        .collect();
    let data_points: Vec<DataPoint> = facts
        .iter()
        .filter_map(|f| {
            f.value.as_ref().map(|v| DataPoint {
                label: f.category.chars().take(40).collect(),
                value: v.clone(),
            })
        })
        .take(MAX_DATA_POINTS)
        .collect();
    ContentPlan {
        title: stub.title.clone(),
        key_points,
        data_points,
        narrative: None,
        chart_spec: None,
    }
}

/// # NDOC
/// component: `agents::content_planner`
/// purpose: Extract the slide's substance, scoped to its cluster ids.
/// invariants:
///   - Never draws on facts outside the slide's clusters.
///   - Key points cap at 5 and data points at 4, whatever the model emits.
pub async fn plan_content(
    gateway: &LlmGateway,
    stub: &SlideStub,
    outline: &Outline,
    decision: &RouterDecision,
) -> StageResult<ContentPlan> {
    let facts = outline.facts_for_clusters(&stub.relevant_cluster_ids);
    let digest = facts
        .iter()
        .map(|f| format!("- {}: {} (source: {})", f.id, f.claim, f.source))
        .collect::<Vec<_>>()
        .join("\n");
    let prompt = prompts::render(
        prompts::prompt_for(AGENT_NAME),
        &[
            ("title", &stub.title),
            ("purpose", &stub.purpose),
            ("layout_variant", decision.layout_variant.as_str()),
            ("max_chars", &decision.density_budget.max_chars.to_string()),
            ("max_items", &decision.density_budget.max_items.to_string()),
            ("facts", &digest),
        ],
    );
    let opts = CallOptions {
        temperature: Some(0.4),
        max_output_tokens: Some(1_024),
        ..CallOptions::default()
    };
    let outcome = gateway
        .typed_json_call_as::<ContentPlan>(
            AGENT_NAME,
            ModelTier::Agentic,
            &prompt,
            content_schema(),
            opts,
        )
        .await;

    match outcome {
        Ok(mut plan) => {
            plan.key_points.truncate(MAX_KEY_POINTS);
            plan.data_points.truncate(MAX_DATA_POINTS);
            if plan.title.trim().is_empty() {
                plan.title = stub.title.clone();
            }
            if plan.key_points.is_empty() {
                plan.key_points = plan_from_facts(stub, outline).key_points;
            }
            log_agent_event(
                AGENT_NAME,
                "content_planned",
                &json!({
                    "slide": stub.order,
                    "key_points": plan.key_points.len(),
                    "data_points": plan.data_points.len(),
                }),
            );
            Ok(plan)
        }
        Err(err) if err.kind == PipelineErrorKind::ServiceUnavailable => Err(err),
        Err(_) => {
            log_agent_event(
                AGENT_NAME,
                "deterministic_fallback",
                &json!({"slide": stub.order}),
            );
            Ok(plan_from_facts(stub, outline))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::outline::{ColorPalette, SlideType, StyleGuide};
    use crate::data_models::research::{Confidence, FactCluster, ResearchFact};

    fn outline() -> Outline {
        Outline {
            narrative_goal: "g".to_string(),
            title: "T".to_string(),
            facts: (0..6)
                .map(|i| ResearchFact {
                    id: format!("f{i}"),
                    category: "stat".to_string(),
                    claim: format!("claim {i}"),
                    value: Some(serde_json::json!(i * 10)),
                    source: "https://example.org".to_string(),
                    confidence: Confidence::Medium,
                })
                .collect(),
            clusters: vec![
                FactCluster {
                    id: "c1".to_string(),
                    theme: "first".to_string(),
                    fact_ids: vec!["f0".to_string(), "f1".to_string()],
                },
                FactCluster {
                    id: "c2".to_string(),
                    theme: "second".to_string(),
                    fact_ids: vec!["f2".to_string(), "f3".to_string(), "f4".to_string(), "f5".to_string()],
                },
            ],
            style_guide: StyleGuide {
                theme_name: "t".to_string(),
                font_family_title: "Inter".to_string(),
                font_family_body: "Inter".to_string(),
                color_palette: ColorPalette {
                    primary: "1D4ED8".to_string(),
                    secondary: "60A5FA".to_string(),
                    background: "0B1120".to_string(),
                    text: "E2E8F0".to_string(),
                    accent_high_contrast: "F59E0B".to_string(),
                },
                theme_tokens: None,
            },
            slides: vec![],
        }
    }

    fn stub(cluster_ids: &[&str]) -> SlideStub {
        SlideStub {
            order: 1,
            slide_type: SlideType::ContentMain,
            title: "Scoped".to_string(),
            purpose: "test scoping".to_string(),
            relevant_cluster_ids: cluster_ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn fallback_plan_is_scoped_to_clusters() {
        let outline = outline();
        let plan = plan_from_facts(&stub(&["c1"]), &outline);
        assert_eq!(plan.key_points.len(), 2);
        assert!(plan.key_points.iter().all(|p| p.contains("claim")));
        assert!(plan.key_points.iter().any(|p| p.contains("claim 0")));
        assert!(!plan.key_points.iter().any(|p| p.contains("claim 3")));
    }

    #[test]
    fn fallback_plan_respects_caps() {
        let outline = outline();
        let plan = plan_from_facts(&stub(&["c1", "c2"]), &outline);
        assert!(plan.key_points.len() <= MAX_KEY_POINTS);
        assert!(plan.data_points.len() <= MAX_DATA_POINTS);
    }
}
