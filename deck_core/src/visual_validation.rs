use crate::config::{ModelTier, TuningTable};
use crate::data_models::slide::{LayoutPlan, LayoutVariant, TemplateComponent};
use crate::llm_gateway::{CallOptions, LlmGateway, MediaPart};
use crate::prompts;
use crate::utils::logger::log_validation_event;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};
use serde_json::json;

/// Structured failure codes shared by the logic gate and the vision critique.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureCode {
    BulletTooLong,
    TotalCharsOverflow,
    BulletCountOverflow,
    ElementDensityHigh,
    ContrastLow,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CritiqueAction {
    Prune,
    Summarize,
    ChangeLayout,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FitFinding {
    pub code: FailureCode,
    pub message: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<CritiqueAction>,
}

/// # NDOC
/// component: `visual_validation`
/// purpose: Combined verdict of the three-tier fit stack for one slide.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValidationVerdict {
    pub passed: bool,
    pub tier_reached: u8,
    pub findings: Vec<FitFinding>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aesthetic_score: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<CritiqueAction>,
    pub vision_ran: bool,
    pub vision_failed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LayoutRisk {
    Low,
    Medium,
    High,
}

/// Multi-cell layouts carry the highest spatial risk.
pub fn layout_risk(variant: LayoutVariant) -> LayoutRisk {
    match variant {
        LayoutVariant::BentoGrid | LayoutVariant::DashboardTiles => LayoutRisk::High,
        LayoutVariant::AsymmetricGrid | LayoutVariant::MetricsRail => LayoutRisk::Medium,
        _ => LayoutRisk::Low,
    }
}

/// # NDOC
/// component: `visual_validation`
/// purpose: Tier 1 deterministic logic gate; always runs, never suspends.
pub fn quick_fit_check(
    plan: &LayoutPlan,
    variant: LayoutVariant,
    tuning: &TuningTable,
) -> Vec<FitFinding> {
    let maxima = tuning.maxima_for(variant);
    let mut findings = Vec::new();

    let mut bullet_count = 0usize;
    let mut total_chars = 0usize;
    let mut item_count = 0usize;

    for component in &plan.components {
        match &component.spec {
            TemplateComponent::TextBullets { content, .. } => {
                bullet_count += content.len();
                item_count += content.len();
                for bullet in content {
                    let chars = bullet.chars().count();
                    total_chars += chars;
                    if chars > tuning.max_bullet_chars {
                        findings.push(FitFinding {
                            code: FailureCode::BulletTooLong,
                            message: format!(
                                "bullet of {chars} chars exceeds {} on {}",
                                tuning.max_bullet_chars,
                                variant.as_str()
                            ),
                            confidence: 1.0,
                            region: None,
                            action: Some(CritiqueAction::Summarize),
                        });
                    }
                }
            }
            TemplateComponent::MetricCards { metrics, .. } => {
                item_count += metrics.len();
                total_chars += metrics
                    .iter()
                    .map(|m| m.label.chars().count() + m.value.chars().count())
                    .sum::<usize>();
            }
            TemplateComponent::ProcessFlow { steps, .. } => {
                item_count += steps.len();
                total_chars += steps
                    .iter()
                    .map(|s| s.title.chars().count() + s.description.chars().count())
                    .sum::<usize>();
            }
            TemplateComponent::IconGrid { items, .. } => {
                item_count += items.len();
                total_chars += items.iter().map(|i| i.label.chars().count()).sum::<usize>();
            }
            TemplateComponent::TitleSection { title, subtitle } => {
                total_chars += title.chars().count();
                total_chars += subtitle.as_ref().map(|s| s.chars().count()).unwrap_or(0);
            }
            TemplateComponent::ChartFrame { data, .. } => {
                item_count += data.len();
            }
            TemplateComponent::DiagramSvg { elements, .. } => {
                item_count += elements.len();
            }
        }
    }

    if bullet_count > maxima.max_bullets {
        findings.push(FitFinding {
            code: FailureCode::BulletCountOverflow,
            message: format!(
                "{bullet_count} bullets exceed {} allowed on {}",
                maxima.max_bullets,
                variant.as_str()
            ),
            confidence: 1.0,
            region: None,
            action: Some(CritiqueAction::Prune),
        });
    }
    if total_chars > maxima.max_total_chars {
        findings.push(FitFinding {
            code: FailureCode::TotalCharsOverflow,
            message: format!(
                "{total_chars} chars exceed {} allowed on {}",
                maxima.max_total_chars,
                variant.as_str()
            ),
            confidence: 1.0,
            region: None,
            action: Some(CritiqueAction::Summarize),
        });
    }
    if item_count > maxima.max_bullets + 8 {
        findings.push(FitFinding {
            code: FailureCode::ElementDensityHigh,
            message: format!("{item_count} items crowd {}", variant.as_str()),
            confidence: 0.9,
            region: None,
            action: Some(CritiqueAction::ChangeLayout),
        });
    }
    findings
}

/// Wire shape of the vision critique reply.
#[derive(Debug, Clone, Deserialize)]
struct VisionReport {
    #[serde(default)]
    findings: Vec<FitFinding>,
    #[serde(default)]
    aesthetic_score: Option<u8>,
    #[serde(default)]
    overflow_regions: Vec<[f64; 4]>,
}

/// Action mapping from the failure mix. High-confidence density problems
/// force a layout change; explicit prunes win over summarization.
pub fn decide_action(findings: &[FitFinding]) -> Option<CritiqueAction> {
    if findings.is_empty() {
        return None;
    }
    if findings
        .iter()
        .any(|f| f.code == FailureCode::ElementDensityHigh && f.confidence >= 0.8)
    {
        return Some(CritiqueAction::ChangeLayout);
    }
    if findings
        .iter()
        .any(|f| f.action == Some(CritiqueAction::Prune))
    {
        return Some(CritiqueAction::Prune);
    }
    Some(CritiqueAction::Summarize)
}

/// # NDOC
/// component: `visual_validation`
/// purpose: Run the fit stack for one slide, cheapest tier first.
///
/// Tier 2 runs only for medium/high-risk layouts when a rendered image is
/// available; its failures degrade gracefully to the tier-1 verdict.
/// Tier 3 (code execution) is reserved for custom diagram validation and is
/// not invoked for standard slides.
pub async fn validate_slide(
    gateway: &LlmGateway,
    slide_id: &str,
    plan: &LayoutPlan,
    variant: LayoutVariant,
    rendered_image: Option<&[u8]>,
    tuning: &TuningTable,
) -> ValidationVerdict {
    let mut findings = quick_fit_check(plan, variant, tuning);
    log_validation_event(slide_id, "logic_gate", findings.is_empty(), "deterministic fit check");

    let mut tier_reached = 1;
    let mut aesthetic_score = None;
    let mut vision_ran = false;
    let mut vision_failed = false;

    if layout_risk(variant) >= LayoutRisk::Medium {
        if let Some(image) = rendered_image {
            vision_ran = true;
            tier_reached = 2;
            match vision_critique(gateway, variant, image).await {
                Ok(report) => {
                    aesthetic_score = report.aesthetic_score;
                    log_validation_event(
                        slide_id,
                        "vision_critique",
                        report.findings.is_empty(),
                        &format!("{} overflow regions", report.overflow_regions.len()),
                    );
                    findings.extend(report.findings);
                }
                Err(err) => {
                    vision_failed = true;
                    log_validation_event(slide_id, "vision_critique", false, &err.message);
                }
            }
        }
    }

    let action = decide_action(&findings);
    ValidationVerdict {
        passed: findings.is_empty(),
        tier_reached,
        findings,
        aesthetic_score,
        action,
        vision_ran,
        vision_failed,
    }
}

async fn vision_critique(
    gateway: &LlmGateway,
    variant: LayoutVariant,
    image: &[u8],
) -> Result<VisionReport, crate::contracts::PipelineError> {
    let template = crate::spatial::templates::template_for(variant);
    let zones: Vec<&str> = template.zones.iter().map(|z| z.id).collect();
    let prompt = prompts::render(
        prompts::prompt_for("vision_critique"),
        &[
            ("layout_variant", variant.as_str()),
            ("zones", &zones.join(", ")),
        ],
    );
    let schema = json!({
        "type": "object",
        "properties": {
            "findings": {"type": "array"},
            "aesthetic_score": {"type": "integer"},
            "overflow_regions": {"type": "array"},
            "density_hotspots": {"type": "array"}
        }
    });
    let opts = CallOptions {
        temperature: Some(0.1),
        media: Some(MediaPart {
            mime_type: "image/png".to_string(),
            data_base64: BASE64.encode(image),
        }),
        ..CallOptions::default()
    };
    let value = gateway
        .typed_json_call("vision_critic", ModelTier::Agentic, &prompt, schema, opts)
        .await?;
    serde_json::from_value(value)
        .map_err(|e| crate::contracts::PipelineError::contract(format!("vision report: {e}")))
}
