// src/integration_tests.rs

#[cfg(test)]
mod integration_tests {
    use crate::config::{EngineConfig, ModelCatalog, PricingTable, TuningTable};
    use crate::contracts::{PipelineError, StageResult};
    use crate::data_models::environment::HealthLevel;
    use crate::data_models::metrics::DeckResult;
    use crate::data_models::slide::{LayoutVariant, ReadabilityCheck, StyleMode};
    use crate::image_service::ImageClient;
    use crate::llm_gateway::{ChatClient, ChatRequest, ChatResponse, UsageMetadata};
    use crate::orchestrator::{DeckEngine, DeckRequest};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use serde_json::json;
    use std::collections::{HashMap, HashSet, VecDeque};
    use std::sync::{Arc, Mutex};
    use url::Url;

    // --- Scripted chat transport routed by agent prompt headers ---

    struct StageClient {
        overrides: Mutex<HashMap<&'static str, VecDeque<StageResult<String>>>>,
        requests: Mutex<Vec<ChatRequest>>,
    }

    impl StageClient {
        fn new() -> Self {
            Self {
                overrides: Mutex::new(HashMap::new()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn push_override(&self, stage: &'static str, reply: StageResult<String>) {
            self.overrides
                .lock()
                .unwrap()
                .entry(stage)
                .or_default()
                .push_back(reply);
        }

        fn requests(&self) -> Vec<ChatRequest> {
            self.requests.lock().unwrap().clone()
        }

        fn stage_of(prompt: &str) -> &'static str {
            if prompt.starts_with("You are a research analyst") {
                "researcher"
            } else if prompt.starts_with("You are a presentation architect") {
                "architect"
            } else if prompt.starts_with("You are a layout router") {
                "router"
            } else if prompt.starts_with("You are a content planner") {
                "content_planner"
            } else if prompt.starts_with("You are a composition architect") {
                "composition_architect"
            } else if prompt.starts_with("You are a visual designer") {
                "visual_designer"
            } else if prompt.starts_with("Review this visual design spec") {
                "visual_designer_critique"
            } else if prompt.starts_with("You are a slide generator") {
                "generator"
            } else if prompt.starts_with("The following model output") {
                "json_repair"
            } else {
                "unknown"
            }
        }

        fn line_value(prompt: &str, prefix: &str) -> String {
            prompt
                .lines()
                .find_map(|l| l.strip_prefix(prefix))
                .unwrap_or_default()
                .trim()
                .to_string()
        }

        fn default_reply(stage: &str, prompt: &str) -> String {
            match stage {
                "researcher" => default_facts().to_string(),
                "architect" => default_outline().to_string(),
                "router" => router_reply(prompt),
                "content_planner" => content_reply(prompt),
                "composition_architect" => composition_reply(),
                "visual_designer" => design_reply(),
                "visual_designer_critique" => "ACCEPT".to_string(),
                "generator" => generator_reply(prompt),
                "json_repair" => "{}".to_string(),
                _ => "{}".to_string(),
            }
        }
    }

    #[async_trait]
    impl ChatClient for StageClient {
        async fn complete(&self, request: &ChatRequest) -> StageResult<ChatResponse> {
            self.requests.lock().unwrap().push(request.clone());
            let stage = Self::stage_of(&request.prompt);
            let scripted = self
                .overrides
                .lock()
                .unwrap()
                .get_mut(stage)
                .and_then(|queue| queue.pop_front());
            let text = match scripted {
                Some(Ok(text)) => text,
                Some(Err(err)) => return Err(err),
                None => Self::default_reply(stage, &request.prompt),
            };
            Ok(ChatResponse {
                text,
                usage_metadata: UsageMetadata {
                    prompt_token_count: 120,
                    candidates_token_count: 80,
                },
            })
        }
    }

    fn default_facts() -> serde_json::Value {
        let facts: Vec<serde_json::Value> = [
            ("fact-01", "milestone", "The first powered flight lasted 12 seconds"),
            ("fact-02", "milestone", "Commercial jet service began in 1952"),
            ("fact-03", "market", "Over 4.5 billion passengers flew in 2019"),
            ("fact-04", "market", "Air freight carries 35 percent of world trade by value"),
            ("fact-05", "technology", "Modern engines are 70 percent quieter than early jets"),
            ("fact-06", "technology", "Composite airframes cut fuel burn by a fifth"),
            ("fact-07", "safety", "Fatal accident rates fell tenfold since 1970"),
            ("fact-08", "safety", "Redundant systems allow safe single-engine flight"),
            ("fact-09", "market", "Low-cost carriers hold a third of global seats"),
            ("fact-10", "milestone", "Nonstop range now exceeds nine thousand miles"),
        ]
        .iter()
        .enumerate()
        .map(|(i, (id, category, claim))| {
            json!({
                "id": id,
                "category": category,
                "claim": claim,
                "value": (i as i64 + 1) * 7,
                "source": format!("https://example.org/aviation/{id}"),
                "confidence": "high"
            })
        })
        .collect();
        json!({ "facts": facts })
    }

    fn default_outline() -> serde_json::Value {
        json!({
            "narrative_goal": "trace aviation from first flight to global network",
            "title": "History of Aviation",
            "clusters": [
                {"id": "c-milestones", "theme": "Milestones", "fact_ids": ["fact-01", "fact-02", "fact-10"]},
                {"id": "c-market", "theme": "Market scale", "fact_ids": ["fact-03", "fact-04", "fact-09"]},
                {"id": "c-tech", "theme": "Technology and safety", "fact_ids": ["fact-05", "fact-06", "fact-07", "fact-08"]}
            ],
            "style_guide": {
                "theme_name": "Jetstream",
                "font_family_title": "Inter",
                "font_family_body": "Inter",
                "color_palette": {
                    "primary": "1D4ED8",
                    "secondary": "60A5FA",
                    "background": "0B1120",
                    "text": "E2E8F0",
                    "accent_high_contrast": "F59E0B"
                }
            },
            "slides": [
                {"order": 0, "type": "title-slide", "title": "The Story of Flight", "purpose": "open the arc", "relevant_cluster_ids": ["c-milestones"]},
                {"order": 1, "type": "content-main", "title": "Pioneers and First Flights", "purpose": "ground the origins", "relevant_cluster_ids": ["c-milestones"]},
                {"order": 2, "type": "content-main", "title": "Key Metrics at a Glance", "purpose": "show market scale", "relevant_cluster_ids": ["c-market"]},
                {"order": 3, "type": "data-viz", "title": "Growth of Air Travel", "purpose": "plot passenger growth", "relevant_cluster_ids": ["c-market"]},
                {"order": 4, "type": "content-main", "title": "From Steps to Scale", "purpose": "walk the technology steps", "relevant_cluster_ids": ["c-tech"]},
                {"order": 5, "type": "conclusion", "title": "The Road Ahead", "purpose": "close the story", "relevant_cluster_ids": ["c-tech"]}
            ]
        })
    }

    /// Mirrors the router decision protocol so scripted decks spread across
    /// several layout variants.
    fn router_reply(prompt: &str) -> String {
        let slide_type = StageClient::line_value(prompt, "Slide type: ");
        let title = StageClient::line_value(prompt, "Slide title: ").to_ascii_lowercase();
        let avoid = StageClient::line_value(prompt, "Forbidden layout variants: ");
        let mut variant = if slide_type == "title" || slide_type == "conclusion" {
            "hero-centered"
        } else if slide_type == "data" {
            "split-left-text"
        } else if title.contains("step") {
            "timeline-horizontal"
        } else if title.contains("metric") {
            "bento-grid"
        } else {
            "standard-vertical"
        };
        if avoid.contains(variant) {
            variant = "standard-vertical";
        }
        json!({
            "render_mode": if slide_type == "data" { "data-viz" } else { "standard" },
            "layout_variant": variant,
            "layout_intent": "scripted decision",
            "density_budget": {"max_chars": 400, "max_items": 5, "min_visuals": 0},
            "visual_focus": "scripted focus"
        })
        .to_string()
    }

    fn content_reply(prompt: &str) -> String {
        let title = StageClient::line_value(prompt, "Slide title: ");
        json!({
            "title": title,
            "key_points": [
                "Adoption accelerated each decade",
                "Costs fell as networks expanded",
                "Safety improved alongside scale"
            ],
            "data_points": [
                {"label": "passengers", "value": 4.5},
                {"label": "trade share", "value": 35}
            ],
            "narrative": "Scale and safety rose together."
        })
        .to_string()
    }

    fn composition_reply() -> String {
        json!({
            "background": {"type": "solid", "suggestion": "deep navy field"},
            "decorative_elements": [
                {"type": "accent-line", "placement": "under title", "purpose": "anchor heading"}
            ],
            "content_structure": {"pattern": "narrative-flow", "text_block_count": 1},
            "serendipity_plan": {"variation_budget": 0.5, "allocated_surprises": []},
            "reasoning": "keep the composition calm and legible"
        })
        .to_string()
    }

    fn design_reply() -> String {
        json!({
            "spatial_strategy": {
                "zones": ["title", "content-top"],
                "hierarchy": "title dominates, content supports",
                "negative_space_plan": "wide outer margins"
            },
            "color_harmony": {"primary": "1D4ED8", "accent": "F59E0B", "background_tone": "0B1120"},
            "negative_space_allocation": "25%",
            "background_treatment": "quiet gradient wash",
            "foreground_elements": ["headline", "bullet stack"]
        })
        .to_string()
    }

    fn generator_reply(prompt: &str) -> String {
        let variant = StageClient::line_value(prompt, "Layout variant: ");
        let components = match variant.as_str() {
            "bento-grid" | "dashboard-tiles" => json!([{
                "type": "metric-cards",
                "metrics": [
                    {"value": "4.5B", "label": "passengers", "trend": "up"},
                    {"value": "35%", "label": "trade by value", "trend": "up"},
                    {"value": "10x", "label": "safety gain", "trend": "up"},
                    {"value": "9k mi", "label": "nonstop range", "trend": "up"}
                ]
            }]),
            "timeline-horizontal" => json!([{
                "type": "process-flow",
                "steps": [
                    {"number": 1, "title": "First flight", "description": "Twelve seconds aloft"},
                    {"number": 2, "title": "Jet age", "description": "Commercial jets arrive"},
                    {"number": 3, "title": "Mass travel", "description": "Billions fly yearly"},
                    {"number": 4, "title": "Quiet efficiency", "description": "Composites cut fuel burn"}
                ]
            }]),
            "split-left-text" | "split-right-text" => json!([
                {"type": "text-bullets", "content": [
                    "Passenger volume compounds yearly",
                    "Freight value share keeps rising",
                    "Networks reach every continent"
                ]},
                {"type": "chart-frame", "title": "Passengers per decade", "chart_type": "bar", "data": [
                    {"label": "1980", "value": 0.6},
                    {"label": "2000", "value": 1.7},
                    {"label": "2019", "value": 4.5}
                ]}
            ]),
            "hero-centered" => json!([{
                "type": "text-bullets",
                "content": ["A century from twelve seconds to nonstop oceans", "The network now touches every economy"]
            }]),
            _ => json!([{
                "type": "text-bullets",
                "content": [
                    "Pioneers proved powered flight",
                    "Jets made distance routine",
                    "Safety climbed with every decade"
                ]
            }]),
        };
        json!({
            "title": StageClient::line_value(prompt, "Slide title: "),
            "components": components,
            "citations": ["https://example.org/aviation/fact-01"],
            "speaker_notes_lines": [
                "Open with the arc of the story.",
                "Tie each point back to the data."
            ],
            "visual_reasoning": "content mirrors the layout intent",
            "visual_prompt": "abstract contrails over a deep navy sky, no text"
        })
        .to_string()
    }

    // --- Scripted image transport ---

    struct StaticImageClient {
        reply: StageResult<Option<Vec<u8>>>,
    }

    #[async_trait]
    impl ImageClient for StaticImageClient {
        async fn generate(
            &self,
            _model: &str,
            _prompt: &str,
            _aspect: &str,
        ) -> StageResult<Option<Vec<u8>>> {
            self.reply.clone()
        }
    }

    fn test_config() -> EngineConfig {
        EngineConfig {
            api_key: "test-key".to_string(),
            api_base: Url::parse("https://chat.invalid").expect("url"),
            models: ModelCatalog::from_env(),
            pricing: PricingTable::builtin(),
            tuning: TuningTable {
                retry_base_ms: 1,
                ..TuningTable::default()
            },
        }
    }

    fn engine_with(
        chat: Arc<StageClient>,
        image_reply: StageResult<Option<Vec<u8>>>,
    ) -> DeckEngine {
        DeckEngine::new(
            test_config(),
            chat,
            Arc::new(StaticImageClient { reply: image_reply }),
        )
    }

    async fn generate(
        chat: Arc<StageClient>,
        image_reply: StageResult<Option<Vec<u8>>>,
    ) -> StageResult<DeckResult> {
        let engine = engine_with(chat, image_reply);
        engine
            .generate_deck(
                DeckRequest {
                    topic: "history of aviation".to_string(),
                    style_mode: StyleMode::Professional,
                },
                None,
            )
            .await
    }

    fn png_bytes() -> Vec<u8> {
        vec![0x89, b'P', b'N', b'G', 0, 1, 2, 3]
    }

    #[tokio::test]
    async fn happy_path_produces_varied_healthy_deck() {
        let chat = Arc::new(StageClient::new());
        let deck = generate(Arc::clone(&chat), Ok(Some(png_bytes())))
            .await
            .expect("deck");

        assert_eq!(deck.slides.len(), 6);
        assert_eq!(deck.slides.len(), deck.outline.slides.len());
        assert!(!deck.partial);
        assert_eq!(deck.metrics.fallback_slides, 0);
        assert!(deck.metrics.total_cost > Decimal::ZERO);

        let variants: HashSet<LayoutVariant> = deck
            .slides
            .iter()
            .map(|s| s.router_config.layout_variant)
            .collect();
        assert!(variants.len() >= 3, "expected variety, got {variants:?}");

        for slide in &deck.slides {
            assert!(matches!(
                slide.readability_check,
                ReadabilityCheck::Pass | ReadabilityCheck::Warning
            ));
            assert!(!slide.speaker_notes_lines.is_empty());
            let env = slide.environment_snapshot.as_ref().expect("snapshot");
            assert!(env.fit_score >= 0.6, "slide {} unhealthy", slide.order);
        }
        // Slides arrive strictly in outline order.
        let orders: Vec<u32> = deck.slides.iter().map(|s| s.order).collect();
        assert_eq!(orders, vec![0, 1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn truncated_generator_output_is_repaired_in_place() {
        let chat = Arc::new(StageClient::new());
        // A long, valid payload cut 200 chars short of its end.
        let filler = "The arc of this slide continues with supporting context. ".repeat(8);
        let full = json!({
            "components": [{
                "type": "text-bullets",
                "content": [
                    "Pioneers proved powered flight",
                    "Jets made distance routine",
                    "Safety climbed with every decade"
                ]
            }],
            "speaker_notes_lines": ["Open with the arc."],
            "title": "The Story of Flight",
            "visual_prompt": "abstract contrails, no text",
            "visual_reasoning": filler
        })
        .to_string();
        let truncated = full[..full.len() - 200].to_string();
        chat.push_override("generator", Ok(truncated));

        let deck = generate(Arc::clone(&chat), Ok(Some(png_bytes())))
            .await
            .expect("deck");
        assert_eq!(deck.slides.len(), 6);
        assert_eq!(deck.metrics.fallback_slides, 0);
        let repaired = &deck.slides[0];
        assert!(
            repaired.warnings.iter().any(|w| w == "truncation repaired"),
            "warnings were {:?}",
            repaired.warnings
        );
        assert!(!repaired.layout_plan.components.is_empty());
    }

    #[tokio::test]
    async fn repetition_hallucination_becomes_fallback_slide() {
        let chat = Arc::new(StageClient::new());
        let bullet = "The market keeps growing and growing strongly";
        let bullets: Vec<&str> = vec![bullet; 40];
        let reply = json!({
            "title": "Broken",
            "components": [{"type": "text-bullets", "content": bullets}],
            "speaker_notes_lines": ["note"],
            "visual_prompt": "abstract"
        })
        .to_string();
        chat.push_override("generator", Ok(reply));

        let deck = generate(Arc::clone(&chat), Ok(Some(png_bytes())))
            .await
            .expect("deck");
        assert_eq!(deck.slides.len(), 6, "deck stays complete");
        assert_eq!(deck.metrics.fallback_slides, 1);
        let fallback = &deck.slides[0];
        assert_eq!(fallback.readability_check, ReadabilityCheck::Fail);
        assert!(fallback
            .warnings
            .iter()
            .any(|w| w.contains("placeholder")));
    }

    #[tokio::test]
    async fn sparse_bento_triggers_single_reroute() {
        let chat = Arc::new(StageClient::new());
        // Force the first slide onto bento-grid with two thin bullets: the
        // render comes back critical and the router must avoid bento next.
        chat.push_override(
            "router",
            Ok(json!({
                "render_mode": "standard",
                "layout_variant": "bento-grid",
                "layout_intent": "forced for test",
                "density_budget": {"max_chars": 200, "max_items": 3, "min_visuals": 0},
                "visual_focus": "sparse"
            })
            .to_string()),
        );
        chat.push_override(
            "generator",
            Ok(json!({
                "title": "The Story of Flight",
                "components": [{"type": "text-bullets", "content": [
                    "A short opening point",
                    "A second short point"
                ]}],
                "speaker_notes_lines": ["note line"],
                "visual_prompt": "abstract"
            })
            .to_string()),
        );

        let deck = generate(Arc::clone(&chat), Ok(Some(png_bytes())))
            .await
            .expect("deck");
        assert_eq!(deck.metrics.reroute_count, 1);
        let rerouted = &deck.slides[0];
        assert_ne!(
            rerouted.router_config.layout_variant,
            LayoutVariant::BentoGrid
        );
        let env = rerouted.environment_snapshot.as_ref().expect("snapshot");
        assert!(matches!(
            env.health_level,
            HealthLevel::Perfect | HealthLevel::Good | HealthLevel::Tight
        ));
        // The avoid list reached the second router call.
        let router_prompts: Vec<String> = chat
            .requests()
            .iter()
            .filter(|r| StageClient::stage_of(&r.prompt) == "router")
            .map(|r| r.prompt.clone())
            .collect();
        assert!(router_prompts
            .iter()
            .any(|p| p.contains("Forbidden layout variants: bento-grid")));
    }

    #[tokio::test]
    async fn three_rate_limits_trip_the_breaker_and_downgrade() {
        let chat = Arc::new(StageClient::new());
        for _ in 0..3 {
            chat.push_override("researcher", Err(PipelineError::rate_limit("429")));
        }

        let deck = generate(Arc::clone(&chat), Ok(Some(png_bytes())))
            .await
            .expect("deck");
        assert_eq!(deck.slides.len(), 6);
        assert_eq!(deck.metrics.retries, 2);

        let catalog = ModelCatalog::from_env();
        let requests = chat.requests();
        // The researcher exhausted the smart model; the architect call (also
        // smart tier) silently routed to the fast model while cooling down.
        let architect_models: Vec<&str> = requests
            .iter()
            .filter(|r| StageClient::stage_of(&r.prompt) == "architect")
            .map(|r| r.model.as_str())
            .collect();
        assert!(!architect_models.is_empty());
        assert!(architect_models.iter().all(|m| *m == catalog.fast.id));
    }

    #[tokio::test]
    async fn breaker_trip_is_visible_in_activity_log() {
        let chat = Arc::new(StageClient::new());
        for _ in 0..3 {
            chat.push_override("researcher", Err(PipelineError::rate_limit("429")));
        }
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink_seen = Arc::clone(&seen);
        let sink: Arc<crate::utils::logger::ProgressSink> =
            Arc::new(move |item: &crate::data_models::metrics::ActivityLogItem| {
                sink_seen.lock().unwrap().push(item.message.clone());
            });

        let engine = engine_with(Arc::clone(&chat), Ok(Some(png_bytes())));
        engine
            .generate_deck(
                DeckRequest {
                    topic: "history of aviation".to_string(),
                    style_mode: StyleMode::Professional,
                },
                Some(sink),
            )
            .await
            .expect("deck");
        let messages = seen.lock().unwrap();
        assert!(
            messages
                .iter()
                .any(|m| m.contains("CIRCUIT BREAKER") && m.contains("TRIPPED")),
            "activity log missing breaker trip"
        );
    }

    #[tokio::test]
    async fn null_images_degrade_gracefully() {
        let chat = Arc::new(StageClient::new());
        let deck = generate(Arc::clone(&chat), Ok(None)).await.expect("deck");
        assert_eq!(deck.slides.len(), 6);
        for slide in &deck.slides {
            assert!(slide.background_image_url.is_none());
            assert!(
                slide
                    .warnings
                    .iter()
                    .any(|w| w.contains("without background")),
                "slide {} missing degrade note",
                slide.order
            );
        }
    }

    #[tokio::test]
    async fn images_attach_when_the_service_delivers() {
        let chat = Arc::new(StageClient::new());
        let deck = generate(Arc::clone(&chat), Ok(Some(png_bytes())))
            .await
            .expect("deck");
        for slide in &deck.slides {
            let url = slide.background_image_url.as_ref().expect("image url");
            assert!(url.starts_with("data:image/png;base64,"));
        }
    }

    #[tokio::test]
    async fn corporate_mode_yields_no_surprises_across_the_deck() {
        let chat = Arc::new(StageClient::new());
        let engine = engine_with(Arc::clone(&chat), Ok(Some(png_bytes())));
        let deck = engine
            .generate_deck(
                DeckRequest {
                    topic: "history of aviation".to_string(),
                    style_mode: StyleMode::Corporate,
                },
                None,
            )
            .await
            .expect("deck");
        for slide in &deck.slides {
            if let Some(plan) = &slide.composition_plan {
                assert!(plan.serendipity_plan.allocated_surprises.is_empty());
            }
        }
    }
}
