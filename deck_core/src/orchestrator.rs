use crate::agents::{
    composition_architect::{self, CompositionContext},
    content_planner, generator,
    generator::GenerationContext,
    researcher, router, visual_designer,
};
use crate::config::EngineConfig;
use crate::contracts::{PipelineError, StageResult};
use crate::cost_tracker::CostTracker;
use crate::data_models::metrics::{ActivityKind, DeckMetrics, DeckResult};
use crate::data_models::outline::{Outline, SlideStub};
use crate::data_models::slide::{
    LayoutVariant, NarrativeTrailEntry, ReadabilityCheck, SlideNode, StyleMode,
};
use crate::image_service::{HttpImageClient, ImageClient, ImageService};
use crate::llm_gateway::{ChatClient, HttpChatClient, LlmGateway};
use crate::spatial::allocator::allocate;
use crate::spatial::renderer::render_slide;
use crate::utils::logger::{ActivityLog, ProgressSink};
use crate::visual_validation::{self, CritiqueAction};
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use validator::Validate;

/// # NDOC
/// component: `orchestrator`
/// purpose: Public request for one deck generation.
#[derive(Debug, Clone, Validate)]
pub struct DeckRequest {
    #[validate(length(min = 3, max = 300))]
    pub topic: String,
    pub style_mode: StyleMode,
}

/// # NDOC
/// component: `orchestrator`
/// purpose: Deck generation engine owning the transport seams. All per-deck
/// state (tracker, breakers, trail, surprises) is created per run.
pub struct DeckEngine {
    config: EngineConfig,
    chat_client: Arc<dyn ChatClient>,
    image_client: Arc<dyn ImageClient>,
}

/// Result of one slide's production, before metrics folding.
struct SlideOutcome {
    node: SlideNode,
    fallback: bool,
    reroutes: u32,
    design_attempts: u32,
    first_pass_clean: bool,
    findings_count: u32,
    vision_ran: bool,
    vision_failed: bool,
}

impl DeckEngine {
    pub fn new(
        config: EngineConfig,
        chat_client: Arc<dyn ChatClient>,
        image_client: Arc<dyn ImageClient>,
    ) -> Self {
        Self {
            config,
            chat_client,
            image_client,
        }
    }

    /// Build the engine from the environment; missing credentials are fatal.
    pub fn from_env() -> StageResult<Self> {
        let config = EngineConfig::from_env()?;
        let chat_client = Arc::new(HttpChatClient::new(
            config.api_base.clone(),
            config.api_key.clone(),
        ));
        let image_client = Arc::new(HttpImageClient::new(
            config.api_base.clone(),
            config.api_key.clone(),
        ));
        Ok(Self::new(config, chat_client, image_client))
    }

    /// # NDOC
    /// component: `orchestrator::generate_deck`
    /// purpose: Run the full pipeline for one topic.
    /// invariants:
    ///   - Returns exactly `outline.slides.len()` slides unless the deadline
    ///     expired (`partial = true`); failures become fallback slides.
    ///   - Only config errors and chain exhaustion propagate as `Err`.
    pub async fn generate_deck(
        &self,
        request: DeckRequest,
        progress: Option<Arc<ProgressSink>>,
    ) -> StageResult<DeckResult> {
        request
            .validate()
            .map_err(|e| PipelineError::config(format!("invalid request: {e}")))?;

        let started = Instant::now();
        let deadline = Duration::from_secs(self.config.tuning.deck_deadline_secs);
        let activity = Arc::new(ActivityLog::new(progress));
        let tracker = Arc::new(Mutex::new(CostTracker::new(self.config.pricing.clone())));
        let gateway = LlmGateway::new(
            Arc::clone(&self.chat_client),
            self.config.models.clone(),
            Arc::clone(&tracker),
            Arc::clone(&activity),
            &self.config.tuning,
        );
        let images = Arc::new(ImageService::new(
            Arc::clone(&self.image_client),
            self.config.models.image_fast.clone(),
            self.config.models.image_pro.clone(),
            Arc::clone(&tracker),
        ));

        let deck_id = deck_id_for(&request.topic);
        let deck_seed = deck_seed_for(&request.topic);
        log::info!(
            target: "orchestrator",
            deck_id = deck_id.as_str();
            "deck generation started"
        );
        activity.push(
            ActivityKind::Info,
            None,
            format!("starting deck generation for \"{}\"", request.topic),
        );

        activity.push(ActivityKind::Agent, Some(researcher::AGENT_NAME), "researching the topic");
        let facts = run_with_deadline(
            started,
            deadline,
            researcher::research_topic(&gateway, &request.topic),
        )
        .await?;
        activity.push(
            ActivityKind::Success,
            Some(researcher::AGENT_NAME),
            format!("verified {} facts", facts.len()),
        );

        activity.push(ActivityKind::Agent, Some("architect"), "planning the narrative and style");
        let outline = run_with_deadline(
            started,
            deadline,
            crate::agents::architect::plan_outline(&gateway, &request.topic, facts),
        )
        .await?;
        activity.push(
            ActivityKind::Success,
            Some("architect"),
            format!(
                "outline ready: {} slides across {} clusters",
                outline.slides.len(),
                outline.clusters.len()
            ),
        );

        let mut metrics = DeckMetrics::default();
        let mut slides: Vec<SlideNode> = Vec::with_capacity(outline.slides.len());
        let mut trail: Vec<NarrativeTrailEntry> = Vec::new();
        let mut used_surprises: HashSet<String> = HashSet::new();
        let mut image_tasks: Vec<(usize, tokio::task::JoinHandle<Option<String>>)> = Vec::new();
        let mut partial = false;
        let total_slides = outline.slides.len();

        for (index, stub) in outline.slides.iter().enumerate() {
            let remaining = deadline.saturating_sub(started.elapsed());
            if remaining.is_zero() {
                partial = true;
                activity.push(
                    ActivityKind::Error,
                    None,
                    "deck deadline reached; emitting partial deck",
                );
                break;
            }
            let produced = tokio::time::timeout(
                remaining,
                self.produce_slide(
                    &gateway,
                    &outline,
                    stub,
                    index,
                    total_slides,
                    request.style_mode,
                    &used_surprises,
                    &trail,
                    deck_seed,
                    &deck_id,
                    &activity,
                ),
            )
            .await;

            let outcome = match produced {
                Err(_) => {
                    partial = true;
                    activity.push(
                        ActivityKind::Error,
                        None,
                        format!("deadline expired during slide {}; emitting partial deck", index + 1),
                    );
                    break;
                }
                Ok(Err(err)) => return Err(err),
                Ok(Ok(outcome)) => outcome,
            };

            if outcome.fallback {
                metrics.fallback_slides += 1;
            }
            metrics.reroute_count += outcome.reroutes;
            metrics.total_visual_design_attempts += outcome.design_attempts;
            if outcome.first_pass_clean {
                metrics.visual_alignment_first_pass_success += 1;
            }
            metrics.coherence_issues += outcome.findings_count;
            if outcome.vision_ran {
                metrics.vision_critique_runs += 1;
            }
            if outcome.vision_failed {
                metrics.vision_critique_failures += 1;
            }

            // Background image generation proceeds concurrently with the
            // remaining slides; joined before assembly.
            let image_service = Arc::clone(&images);
            let visual_prompt = outcome.node.visual_prompt.clone();
            image_tasks.push((
                slides.len(),
                tokio::spawn(async move {
                    image_service.generate_background(&visual_prompt, "16:9").await
                }),
            ));

            if let Some(plan) = &outcome.node.composition_plan {
                for surprise in &plan.serendipity_plan.allocated_surprises {
                    used_surprises.insert(surprise.clone());
                }
            }
            trail.push(trail_entry(&outcome.node));
            activity.push(
                ActivityKind::Success,
                None,
                format!(
                    "slide {}/{} \"{}\" accepted ({})",
                    index + 1,
                    total_slides,
                    outcome.node.title,
                    outcome.node.router_config.layout_variant.as_str()
                ),
            );
            slides.push(outcome.node);
        }

        // Join outstanding image generations; a null image never drops a slide.
        for (slide_idx, handle) in image_tasks {
            let remaining = deadline.saturating_sub(started.elapsed());
            match tokio::time::timeout(remaining, handle).await {
                Ok(Ok(Some(url))) => {
                    if let Some(slide) = slides.get_mut(slide_idx) {
                        slide.background_image_url = Some(url);
                    }
                }
                Ok(Ok(None)) => {
                    if let Some(slide) = slides.get_mut(slide_idx) {
                        slide
                            .warnings
                            .push("background image unavailable; exported without background".to_string());
                    }
                }
                Ok(Err(join_err)) => {
                    log::warn!(target: "orchestrator", error = join_err.to_string().as_str(); "image task failed");
                }
                Err(_) => {
                    // Deadline reached: abandon the in-flight generation.
                    if let Some(slide) = slides.get_mut(slide_idx) {
                        slide
                            .warnings
                            .push("background image abandoned at deadline".to_string());
                    }
                }
            }
        }

        metrics.retries = gateway.stats().retries;
        metrics.total_duration_ms = started.elapsed().as_millis() as u64;
        metrics.total_cost = tracker.lock().expect("tracker lock poisoned").total_cost();

        activity.push(
            ActivityKind::Success,
            None,
            format!(
                "deck complete: {} slides, {} fallbacks, {} reroutes, ${} total",
                slides.len(),
                metrics.fallback_slides,
                metrics.reroute_count,
                metrics.total_cost
            ),
        );

        Ok(DeckResult {
            id: deck_id,
            topic: request.topic,
            outline,
            slides,
            metrics,
            partial,
        })
    }

    /// One slide through planners, generator, repair, allocation, render,
    /// and validation, with the bounded reroute loop.
    #[allow(clippy::too_many_arguments)]
    async fn produce_slide(
        &self,
        gateway: &LlmGateway,
        outline: &Outline,
        stub: &SlideStub,
        index: usize,
        total_slides: usize,
        style_mode: StyleMode,
        used_surprises: &HashSet<String>,
        trail: &[NarrativeTrailEntry],
        deck_seed: u64,
        deck_id: &str,
        activity: &ActivityLog,
    ) -> StageResult<SlideOutcome> {
        let tuning = &self.config.tuning;
        let slide_id = format!("{deck_id}-s{}", stub.order);
        let fact_count = outline.facts_for_clusters(&stub.relevant_cluster_ids).len();

        let mut avoid: Vec<LayoutVariant> = Vec::new();
        let mut reroutes = 0u32;
        let mut design_attempts_total = 0u32;

        loop {
            activity.push(
                ActivityKind::Agent,
                Some(router::AGENT_NAME),
                format!("routing slide {} \"{}\"", index + 1, stub.title),
            );
            let decision = router::route_slide(gateway, stub, fact_count, &avoid).await?;
            let content = content_planner::plan_content(gateway, stub, outline, &decision).await?;
            let composition = composition_architect::plan_composition(
                gateway,
                &CompositionContext {
                    slide_title: &stub.title,
                    decision: &decision,
                    content: &content,
                    style_guide: &outline.style_guide,
                    style_mode,
                    used_surprises,
                    slide_index: index,
                    total_slides,
                    deck_seed,
                },
            )
            .await;
            let (design, design_attempts) =
                visual_designer::design_visuals(gateway, &decision, &content, &composition, &outline.style_guide)
                    .await;
            design_attempts_total += design_attempts;

            activity.push(
                ActivityKind::Agent,
                Some(generator::AGENT_NAME),
                format!("generating slide {} content", index + 1),
            );
            let (mut node, fallback) = generator::generate_slide(
                gateway,
                &GenerationContext {
                    stub,
                    decision: &decision,
                    content: &content,
                    composition: &composition,
                    design: &design,
                    trail,
                    outline,
                },
            )
            .await?;

            let placement = allocate(
                decision.layout_variant,
                &node.layout_plan.title,
                &node.layout_plan.components,
            );
            let output = render_slide(
                &slide_id,
                &placement,
                &outline.style_guide,
                None,
                tuning,
            );
            let environment = output.environment;

            let verdict = visual_validation::validate_slide(
                gateway,
                &slide_id,
                &node.layout_plan,
                decision.layout_variant,
                None,
                tuning,
            )
            .await;

            // Spatial warnings are replaced per render attempt, never merged
            // across reroutes.
            let mut warnings = node.warnings.clone();
            warnings.extend(placement.warnings.clone());
            for zone in &environment.zones {
                warnings.extend(zone.warnings.clone());
            }
            for finding in &verdict.findings {
                warnings.push(finding.message.clone());
            }
            node.warnings = warnings;
            if node.readability_check == ReadabilityCheck::Pass && !node.warnings.is_empty() {
                node.readability_check = ReadabilityCheck::Warning;
            }
            node.environment_snapshot = Some(environment.clone());

            let wants_reroute = environment.needs_reroute
                || verdict.action == Some(CritiqueAction::ChangeLayout);
            if wants_reroute && reroutes < tuning.reroute_bound && !fallback {
                activity.push(
                    ActivityKind::Validation,
                    None,
                    format!(
                        "slide {} failed spatial validation on {}; rerouting",
                        index + 1,
                        decision.layout_variant.as_str()
                    ),
                );
                avoid.push(decision.layout_variant);
                reroutes += 1;
                continue;
            }

            let first_pass_clean =
                reroutes == 0 && !fallback && verdict.passed && !environment.needs_reroute;
            return Ok(SlideOutcome {
                node,
                fallback,
                reroutes,
                design_attempts: design_attempts_total,
                first_pass_clean,
                findings_count: verdict.findings.len() as u32,
                vision_ran: verdict.vision_ran,
                vision_failed: verdict.vision_failed,
            });
        }
    }
}

async fn run_with_deadline<T>(
    started: Instant,
    deadline: Duration,
    future: impl std::future::Future<Output = StageResult<T>>,
) -> StageResult<T> {
    let remaining = deadline.saturating_sub(started.elapsed());
    if remaining.is_zero() {
        return Err(PipelineError::timeout("deck deadline reached"));
    }
    tokio::time::timeout(remaining, future)
        .await
        .unwrap_or_else(|_| Err(PipelineError::timeout("deck deadline reached")))
}

fn deck_id_for(topic: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(topic.as_bytes());
    hasher.update(chrono::Utc::now().to_rfc3339().as_bytes());
    let digest = hasher.finalize();
    let hex: String = digest.iter().take(6).map(|b| format!("{b:02x}")).collect();
    format!("deck-{hex}")
}

/// Seed for deterministic serendipity selection; stable per topic.
fn deck_seed_for(topic: &str) -> u64 {
    let mut hasher = Sha256::new();
    hasher.update(topic.as_bytes());
    let digest = hasher.finalize();
    u64::from_be_bytes(digest[..8].try_into().expect("sha256 is 32 bytes"))
}

fn trail_entry(node: &SlideNode) -> NarrativeTrailEntry {
    let main_point: String = node
        .speaker_notes_lines
        .join(" ")
        .chars()
        .take(100)
        .collect();
    NarrativeTrailEntry {
        title: node.title.clone(),
        main_point,
        layout_variant: Some(node.router_config.layout_variant),
        render_mode: Some(node.router_config.render_mode),
        component_types: node
            .layout_plan
            .components
            .iter()
            .map(|c| c.spec.type_name().to_string())
            .collect(),
        visual_theme: node
            .visual_design_spec
            .as_ref()
            .and_then(|d| d.color_harmony.as_ref())
            .map(|h| h.primary.clone()),
        design_decisions: node
            .composition_plan
            .as_ref()
            .map(|c| c.serendipity_plan.allocated_surprises.clone())
            .unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deck_seed_is_stable_per_topic() {
        assert_eq!(deck_seed_for("aviation"), deck_seed_for("aviation"));
        assert_ne!(deck_seed_for("aviation"), deck_seed_for("railways"));
    }

    #[test]
    fn deck_ids_are_distinct_across_runs() {
        // Timestamped hash; two calls may share a timestamp string only in
        // pathological clock cases.
        let a = deck_id_for("topic");
        assert!(a.starts_with("deck-"));
        assert_eq!(a.len(), "deck-".len() + 12);
    }

    #[test]
    fn request_validation_rejects_short_topics() {
        let request = DeckRequest {
            topic: "ab".to_string(),
            style_mode: StyleMode::Professional,
        };
        assert!(request.validate().is_err());
    }
}
