use crate::config::ModelTier;
use crate::contracts::{PipelineError, StageResult};
use crate::data_models::outline::{
    ColorPalette, Outline, SlideStub, SlideType, StyleGuide, ThemeTokens, MAX_DECK_SLIDES,
    MIN_DECK_SLIDES,
};
use crate::data_models::research::{FactCluster, ResearchFact};
use crate::llm_gateway::{CallOptions, LlmGateway, ThinkingLevel};
use crate::prompts;
use crate::spatial::color::normalize_color;
use crate::utils::logger::log_agent_event;
use itertools::Itertools;
use serde::Deserialize;
use serde_json::json;

pub const AGENT_NAME: &str = "architect";

/// Wire shape of the architect reply; everything optional fills from
/// deterministic defaults so one weak field never sinks the outline.
#[derive(Debug, Deserialize)]
struct ArchitectReply {
    #[serde(default)]
    narrative_goal: Option<String>,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    clusters: Vec<ClusterReply>,
    #[serde(default)]
    style_guide: Option<StyleReply>,
    #[serde(default)]
    slides: Vec<StubReply>,
}

#[derive(Debug, Deserialize)]
struct ClusterReply {
    #[serde(default)]
    id: String,
    #[serde(default)]
    theme: String,
    #[serde(default)]
    fact_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct StyleReply {
    #[serde(default)]
    theme_name: Option<String>,
    #[serde(default)]
    font_family_title: Option<String>,
    #[serde(default)]
    font_family_body: Option<String>,
    #[serde(default)]
    color_palette: Option<PaletteReply>,
    #[serde(default)]
    theme_tokens: Option<ThemeTokens>,
}

#[derive(Debug, Default, Deserialize)]
struct PaletteReply {
    #[serde(default)]
    primary: Option<String>,
    #[serde(default)]
    secondary: Option<String>,
    #[serde(default)]
    background: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    accent_high_contrast: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StubReply {
    #[serde(default)]
    order: Option<u32>,
    #[serde(rename = "type", default)]
    slide_type: Option<SlideType>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    purpose: String,
    #[serde(default)]
    relevant_cluster_ids: Vec<String>,
}

fn outline_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "narrative_goal": {"type": "string"},
            "title": {"type": "string"},
            "clusters": {"type": "array"},
            "style_guide": {"type": "object"},
            "slides": {"type": "array"}
        },
        "required": ["title", "clusters", "style_guide", "slides"]
    })
}

fn fact_digest(facts: &[ResearchFact]) -> String {
    facts
        .iter()
        .map(|f| format!("- {} [{}]: {} (source: {})", f.id, f.category, f.claim, f.source))
        .join("\n")
}

/// # NDOC
/// component: `agents::architect`
/// purpose: Cluster facts, author the style guide, and plan the slide arc.
/// invariants:
///   - The returned outline always satisfies `Outline::validate`.
///   - Broken references are dropped, never invented; missing structure is
///     synthesized deterministically.
pub async fn plan_outline(
    gateway: &LlmGateway,
    topic: &str,
    facts: Vec<ResearchFact>,
) -> StageResult<Outline> {
    let prompt = prompts::render(
        prompts::prompt_for(AGENT_NAME),
        &[("topic", topic), ("facts", &fact_digest(&facts))],
    );
    let opts = CallOptions {
        temperature: Some(0.5),
        max_output_tokens: Some(4_096),
        thinking_level: Some(ThinkingLevel::Medium),
        ..CallOptions::default()
    };
    let value = gateway
        .typed_json_call(AGENT_NAME, ModelTier::Smart, &prompt, outline_schema(), opts)
        .await?;
    let reply: ArchitectReply = serde_json::from_value(value)
        .map_err(|e| PipelineError::contract(format!("outline schema mismatch: {e}")))?;

    let outline = assemble_outline(topic, facts, reply)?;
    outline.validate()?;
    log_agent_event(
        AGENT_NAME,
        "outline_ready",
        &json!({
            "slides": outline.slides.len(),
            "clusters": outline.clusters.len(),
            "theme": outline.style_guide.theme_name.as_str(),
        }),
    );
    Ok(outline)
}

fn assemble_outline(
    topic: &str,
    facts: Vec<ResearchFact>,
    reply: ArchitectReply,
) -> Result<Outline, PipelineError> {
    let mut clusters = Vec::new();
    let mut seen_ids = std::collections::HashSet::new();
    for (idx, cluster) in reply.clusters.into_iter().enumerate() {
        let mut id = cluster.id.trim().to_string();
        if id.is_empty() || !seen_ids.insert(id.clone()) {
            id = format!("cluster-{:02}", idx + 1);
            seen_ids.insert(id.clone());
        }
        let theme = if cluster.theme.trim().is_empty() {
            format!("Theme {}", idx + 1)
        } else {
            cluster.theme.trim().to_string()
        };
        let fact_ids: Vec<String> = cluster
            .fact_ids
            .into_iter()
            .filter(|fid| facts.iter().any(|f| &f.id == fid))
            .collect();
        if fact_ids.is_empty() {
            continue;
        }
        clusters.push(FactCluster {
            id,
            theme,
            fact_ids,
        });
    }
    if clusters.is_empty() {
        // One cluster over the whole sheet still yields a valid outline.
        clusters.push(FactCluster {
            id: "cluster-01".to_string(),
            theme: topic.to_string(),
            fact_ids: facts.iter().map(|f| f.id.clone()).collect(),
        });
    }
    clusters.truncate(4);

    let style_guide = resolve_style(reply.style_guide);

    let known_cluster = |cid: &String| clusters.iter().any(|c| &c.id == cid);
    let default_cluster_ids = vec![clusters[0].id.clone()];
    let mut slides: Vec<SlideStub> = reply
        .slides
        .into_iter()
        .filter(|s| !s.title.trim().is_empty())
        .map(|s| {
            let mut cluster_ids: Vec<String> = s
                .relevant_cluster_ids
                .into_iter()
                .filter(|cid| known_cluster(cid))
                .collect();
            if cluster_ids.is_empty() {
                cluster_ids = default_cluster_ids.clone();
            }
            SlideStub {
                order: s.order.unwrap_or(0),
                slide_type: s.slide_type.unwrap_or(SlideType::ContentMain),
                title: s.title.trim().to_string(),
                purpose: s.purpose.trim().to_string(),
                relevant_cluster_ids: cluster_ids,
            }
        })
        .collect();

    slides.truncate(MAX_DECK_SLIDES);
    // A too-short plan gets deterministic bookends instead of failing the deck.
    if slides.is_empty() {
        slides.push(SlideStub {
            order: 0,
            slide_type: SlideType::TitleSlide,
            title: reply.title.clone().unwrap_or_else(|| topic.to_string()),
            purpose: "introduce the topic".to_string(),
            relevant_cluster_ids: default_cluster_ids.clone(),
        });
    }
    while slides.len() < MIN_DECK_SLIDES {
        let missing = MIN_DECK_SLIDES - slides.len();
        let stub = if missing == 1 {
            SlideStub {
                order: 0,
                slide_type: SlideType::Conclusion,
                title: "Key Takeaways".to_string(),
                purpose: "close the narrative".to_string(),
                relevant_cluster_ids: default_cluster_ids.clone(),
            }
        } else {
            SlideStub {
                order: 0,
                slide_type: SlideType::ContentMain,
                title: format!("{} in Context", topic),
                purpose: "expand the supporting evidence".to_string(),
                relevant_cluster_ids: default_cluster_ids.clone(),
            }
        };
        slides.push(stub);
    }
    for (idx, stub) in slides.iter_mut().enumerate() {
        stub.order = idx as u32;
        if stub.purpose.is_empty() {
            stub.purpose = "support the narrative".to_string();
        }
    }

    Ok(Outline {
        narrative_goal: reply
            .narrative_goal
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| format!("explain {topic} with evidence")),
        title: reply
            .title
            .filter(|s| !s.trim().is_empty())
            .unwrap_or_else(|| topic.to_string()),
        facts,
        clusters,
        style_guide,
        slides,
    })
}

fn resolve_style(reply: Option<StyleReply>) -> StyleGuide {
    let reply = reply.unwrap_or(StyleReply {
        theme_name: None,
        font_family_title: None,
        font_family_body: None,
        color_palette: None,
        theme_tokens: None,
    });
    let palette = reply.color_palette.unwrap_or_default();
    let color = |v: Option<String>, default: &str| {
        v.map(|c| normalize_color(&c, default))
            .unwrap_or_else(|| default.to_string())
    };
    StyleGuide {
        theme_name: reply.theme_name.unwrap_or_else(|| "Slate Horizon".to_string()),
        font_family_title: reply.font_family_title.unwrap_or_else(|| "Inter".to_string()),
        font_family_body: reply.font_family_body.unwrap_or_else(|| "Inter".to_string()),
        color_palette: ColorPalette {
            primary: color(palette.primary, "1D4ED8"),
            secondary: color(palette.secondary, "60A5FA"),
            background: color(palette.background, "0B1120"),
            text: color(palette.text, "E2E8F0"),
            accent_high_contrast: color(palette.accent_high_contrast, "F59E0B"),
        },
        theme_tokens: reply.theme_tokens,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::research::Confidence;

    fn facts() -> Vec<ResearchFact> {
        (0..8)
            .map(|i| ResearchFact {
                id: format!("f{i}"),
                category: "milestone".to_string(),
                claim: format!("claim number {i}"),
                value: None,
                source: "https://example.org".to_string(),
                confidence: Confidence::High,
            })
            .collect()
    }

    fn reply(clusters: Vec<ClusterReply>, slides: Vec<StubReply>) -> ArchitectReply {
        ArchitectReply {
            narrative_goal: Some("tell the story".to_string()),
            title: Some("The Story".to_string()),
            clusters,
            style_guide: None,
            slides,
        }
    }

    fn stub(title: &str, cluster_ids: &[&str]) -> StubReply {
        StubReply {
            order: None,
            slide_type: Some(SlideType::ContentMain),
            title: title.to_string(),
            purpose: "p".to_string(),
            relevant_cluster_ids: cluster_ids.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn single_cluster_reply_still_produces_valid_outline() {
        let clusters = vec![ClusterReply {
            id: "c1".to_string(),
            theme: "Everything".to_string(),
            fact_ids: vec!["f0".to_string(), "f1".to_string()],
        }];
        let slides = (0..5).map(|i| stub(&format!("S{i}"), &["c1"])).collect();
        let outline = assemble_outline("topic", facts(), reply(clusters, slides)).expect("outline");
        assert!(outline.validate().is_ok());
        assert_eq!(outline.clusters.len(), 1);
    }

    #[test]
    fn ghost_references_are_dropped_not_fatal() {
        let clusters = vec![ClusterReply {
            id: "c1".to_string(),
            theme: "Real".to_string(),
            fact_ids: vec!["f0".to_string(), "ghost-fact".to_string()],
        }];
        let slides = (0..4)
            .map(|i| stub(&format!("S{i}"), &["c1", "ghost-cluster"]))
            .collect();
        let outline = assemble_outline("topic", facts(), reply(clusters, slides)).expect("outline");
        assert!(outline.validate().is_ok());
        assert_eq!(outline.clusters[0].fact_ids, vec!["f0".to_string()]);
        for slide in &outline.slides {
            assert_eq!(slide.relevant_cluster_ids, vec!["c1".to_string()]);
        }
    }

    #[test]
    fn short_plan_is_padded_to_minimum() {
        let clusters = vec![ClusterReply {
            id: "c1".to_string(),
            theme: "Only".to_string(),
            fact_ids: vec!["f0".to_string()],
        }];
        let slides = vec![stub("Opener", &["c1"])];
        let outline = assemble_outline("topic", facts(), reply(clusters, slides)).expect("outline");
        assert_eq!(outline.slides.len(), MIN_DECK_SLIDES);
        assert!(outline.validate().is_ok());
        let orders: Vec<u32> = outline.slides.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3]);
    }

    #[test]
    fn creative_palette_strings_are_normalized() {
        let style = resolve_style(Some(StyleReply {
            theme_name: Some("Dusk".to_string()),
            font_family_title: None,
            font_family_body: None,
            color_palette: Some(PaletteReply {
                primary: Some("electric violet".to_string()),
                secondary: Some("#60a5fa".to_string()),
                background: Some("rgb(11, 17, 32)".to_string()),
                text: Some("not a color at all".to_string()),
                accent_high_contrast: None,
            }),
            theme_tokens: None,
        }));
        assert_eq!(style.color_palette.primary, "8F00FF");
        assert_eq!(style.color_palette.secondary, "60A5FA");
        assert_eq!(style.color_palette.background, "0B1120");
        assert_eq!(style.color_palette.text, "E2E8F0");
        assert_eq!(style.color_palette.accent_high_contrast, "F59E0B");
    }
}
