use super::environment::EnvironmentState;
use super::outline::SlideType;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// # NDOC
/// component: `data_models::slide`
/// purpose: High-level rendering intent chosen by the router.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum RenderMode {
    Statement,
    Infographic,
    DataViz,
    Standard,
}

/// # NDOC
/// component: `data_models::slide`
/// purpose: Closed set of spatial layout templates.
/// invariants:
///   - Variants map one-to-one onto the allocator's zone templates.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutVariant {
    StandardVertical,
    SplitLeftText,
    SplitRightText,
    HeroCentered,
    BentoGrid,
    TimelineHorizontal,
    DashboardTiles,
    MetricsRail,
    AsymmetricGrid,
}

impl LayoutVariant {
    pub const ALL: [LayoutVariant; 9] = [
        LayoutVariant::StandardVertical,
        LayoutVariant::SplitLeftText,
        LayoutVariant::SplitRightText,
        LayoutVariant::HeroCentered,
        LayoutVariant::BentoGrid,
        LayoutVariant::TimelineHorizontal,
        LayoutVariant::DashboardTiles,
        LayoutVariant::MetricsRail,
        LayoutVariant::AsymmetricGrid,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LayoutVariant::StandardVertical => "standard-vertical",
            LayoutVariant::SplitLeftText => "split-left-text",
            LayoutVariant::SplitRightText => "split-right-text",
            LayoutVariant::HeroCentered => "hero-centered",
            LayoutVariant::BentoGrid => "bento-grid",
            LayoutVariant::TimelineHorizontal => "timeline-horizontal",
            LayoutVariant::DashboardTiles => "dashboard-tiles",
            LayoutVariant::MetricsRail => "metrics-rail",
            LayoutVariant::AsymmetricGrid => "asymmetric-grid",
        }
    }
}

/// Budget the router hands downstream to keep content inside the canvas.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DensityBudget {
    pub max_chars: u32,
    pub max_items: u32,
    pub min_visuals: u32,
}

/// # NDOC
/// component: `data_models::slide`
/// purpose: Router output: layout, mode, and density envelope for one slide.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RouterDecision {
    pub render_mode: RenderMode,
    pub layout_variant: LayoutVariant,
    pub layout_intent: String,
    pub density_budget: DensityBudget,
    pub visual_focus: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ChartType {
    Bar,
    Pie,
    Line,
    Doughnut,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartDatum {
    pub label: String,
    pub value: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChartSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub chart_type: ChartType,
    pub data: Vec<ChartDatum>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DataPoint {
    pub label: String,
    pub value: Value,
}

/// # NDOC
/// component: `data_models::slide`
/// purpose: Content planner output scoped to the slide's clusters.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentPlan {
    pub title: String,
    #[serde(default)]
    pub key_points: Vec<String>,
    #[serde(default)]
    pub data_points: Vec<DataPoint>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_spec: Option<ChartSpec>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundType {
    Solid,
    Gradient,
    Image,
    Mesh,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackgroundPlan {
    #[serde(rename = "type")]
    pub background_type: BackgroundType,
    pub suggestion: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DecorativeElement {
    #[serde(rename = "type")]
    pub element_type: String,
    pub placement: String,
    pub purpose: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ContentPattern {
    SingleHero,
    CardRow,
    CardGrid,
    SplitContent,
    MetricsRail,
    NarrativeFlow,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContentStructure {
    pub pattern: ContentPattern,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_count: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_style: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_block_count: Option<u8>,
}

/// Deck-wide variation accounting. `variation_budget` is already multiplied
/// by the style-mode factor and clamped to the unit interval.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SerendipityPlan {
    pub variation_budget: f64,
    #[serde(default)]
    pub allocated_surprises: Vec<String>,
}

/// # NDOC
/// component: `data_models::slide`
/// purpose: Composition architect output: background, decor, structure, surprises.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CompositionPlan {
    pub background: BackgroundPlan,
    #[serde(default)]
    pub decorative_elements: Vec<DecorativeElement>,
    pub content_structure: ContentStructure,
    pub serendipity_plan: SerendipityPlan,
    pub reasoning: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColorHarmony {
    pub primary: String,
    pub accent: String,
    pub background_tone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SpatialStrategy {
    #[serde(default)]
    pub zones: Vec<String>,
    pub hierarchy: String,
    pub negative_space_plan: String,
}

/// # NDOC
/// component: `data_models::slide`
/// purpose: Visual designer output; color harmony may be absent, in which case
/// the style guide colors are used unchanged.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VisualDesignSpec {
    pub spatial_strategy: SpatialStrategy,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color_harmony: Option<ColorHarmony>,
    pub negative_space_allocation: String,
    pub background_treatment: String,
    #[serde(default)]
    pub foreground_elements: Vec<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BulletStyle {
    Standard,
    Highlight,
    Quote,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Metric {
    pub value: String,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<Trend>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProcessStep {
    pub number: u8,
    pub title: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IconItem {
    pub label: String,
    pub icon: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// # NDOC
/// component: `data_models::slide`
/// purpose: The canonical tagged component union; 1..=3 per slide.
/// invariants:
///   - `type` tags are the kebab-case canonical set; synonyms are normalized
///     by auto-repair before deserialization.
///   - Per-variant cardinalities are enforced by `schema_validation`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum TemplateComponent {
    TitleSection {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        subtitle: Option<String>,
    },
    TextBullets {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        content: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<BulletStyle>,
    },
    MetricCards {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        intro: Option<String>,
        metrics: Vec<Metric>,
    },
    ProcessFlow {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        intro: Option<String>,
        steps: Vec<ProcessStep>,
    },
    IconGrid {
        cols: u8,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        intro: Option<String>,
        items: Vec<IconItem>,
    },
    ChartFrame {
        title: String,
        chart_type: ChartType,
        data: Vec<ChartDatum>,
    },
    DiagramSvg {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        diagram_type: String,
        elements: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        central_theme: Option<String>,
    },
}

impl TemplateComponent {
    pub fn type_name(&self) -> &'static str {
        match self {
            TemplateComponent::TitleSection { .. } => "title-section",
            TemplateComponent::TextBullets { .. } => "text-bullets",
            TemplateComponent::MetricCards { .. } => "metric-cards",
            TemplateComponent::ProcessFlow { .. } => "process-flow",
            TemplateComponent::IconGrid { .. } => "icon-grid",
            TemplateComponent::ChartFrame { .. } => "chart-frame",
            TemplateComponent::DiagramSvg { .. } => "diagram-svg",
        }
    }

    /// Visual components prefer secondary zones in affinity scoring.
    pub fn is_visual(&self) -> bool {
        matches!(
            self,
            TemplateComponent::MetricCards { .. }
                | TemplateComponent::IconGrid { .. }
                | TemplateComponent::ChartFrame { .. }
                | TemplateComponent::DiagramSvg { .. }
        )
    }
}

/// Repair hints lifted off raw `_hint*` fields by auto-repair. Factors above
/// 1.0 are clamped during fit calculation but honored for visual output.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RepairHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_height_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_spacing_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub padding_factor: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub w: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub h: Option<f64>,
}

impl RepairHints {
    pub fn is_empty(&self) -> bool {
        *self == RepairHints::default()
    }
}

/// One placed component: canonical spec plus optional repair hints.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlideComponent {
    #[serde(flatten)]
    pub spec: TemplateComponent,
    #[serde(default, skip_serializing_if = "RepairHints::is_empty")]
    pub hints: RepairHints,
}

impl From<TemplateComponent> for SlideComponent {
    fn from(spec: TemplateComponent) -> Self {
        Self {
            spec,
            hints: RepairHints::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutPlan {
    pub title: String,
    pub components: Vec<SlideComponent>,
    pub background: BackgroundPlan,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReadabilityCheck {
    Pass,
    Warning,
    Fail,
}

/// # NDOC
/// component: `data_models::slide`
/// purpose: The final typed slide node flowing out of the generator and
/// through allocation, rendering, and validation.
/// invariants:
///   - `speaker_notes_lines` is an array of short lines, never one long
///     string; this survives JSON newline corruption.
///   - `warnings` is replaced, not appended, on re-render.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlideNode {
    pub order: u32,
    #[serde(rename = "type")]
    pub slide_type: SlideType,
    pub title: String,
    pub purpose: String,
    pub router_config: RouterDecision,
    pub layout_plan: LayoutPlan,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_design_spec: Option<VisualDesignSpec>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub composition_plan: Option<CompositionPlan>,
    #[serde(default)]
    pub citations: Vec<String>,
    pub speaker_notes_lines: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chart_spec: Option<ChartSpec>,
    pub visual_reasoning: String,
    pub visual_prompt: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_image_url: Option<String>,
    pub readability_check: ReadabilityCheck,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub environment_snapshot: Option<EnvironmentState>,
}

/// Folded memory of one produced slide, passed forward so the generator sees
/// the narrative arc without re-reading the fact sheet.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NarrativeTrailEntry {
    pub title: String,
    pub main_point: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub layout_variant: Option<LayoutVariant>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub render_mode: Option<RenderMode>,
    #[serde(default)]
    pub component_types: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visual_theme: Option<String>,
    #[serde(default)]
    pub design_decisions: Vec<String>,
}

/// User-selected variation scalar for the composition architect.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StyleMode {
    Corporate,
    Professional,
    Serendipitous,
}

impl StyleMode {
    pub fn variation_multiplier(&self) -> f64 {
        match self {
            StyleMode::Corporate => 0.4,
            StyleMode::Professional => 1.0,
            StyleMode::Serendipitous => 1.6,
        }
    }
}

impl std::str::FromStr for StyleMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "corporate" => Ok(StyleMode::Corporate),
            "professional" => Ok(StyleMode::Professional),
            "serendipitous" => Ok(StyleMode::Serendipitous),
            other => Err(format!(
                "unknown style mode '{other}'; expected corporate, professional, or serendipitous"
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn component_union_round_trips_with_kebab_tags() {
        let component = SlideComponent::from(TemplateComponent::TextBullets {
            title: Some("Key takeaways".to_string()),
            content: vec!["First".to_string(), "Second".to_string()],
            style: Some(BulletStyle::Highlight),
        });
        let value = serde_json::to_value(&component).expect("serialize");
        assert_eq!(value["type"], "text-bullets");
        assert_eq!(value["style"], "highlight");
        let back: SlideComponent = serde_json::from_value(value).expect("deserialize");
        assert_eq!(back, component);
    }

    #[test]
    fn hints_survive_round_trip_next_to_flattened_spec() {
        let raw = json!({
            "type": "text-bullets",
            "content": ["one"],
            "hints": {"line_height_factor": 0.9}
        });
        let component: SlideComponent = serde_json::from_value(raw).expect("deserialize");
        assert_eq!(component.hints.line_height_factor, Some(0.9));
        assert_eq!(component.spec.type_name(), "text-bullets");
    }

    #[test]
    fn layout_variant_serializes_kebab_case() {
        let v = serde_json::to_value(LayoutVariant::BentoGrid).expect("serialize");
        assert_eq!(v, "bento-grid");
        assert_eq!(LayoutVariant::BentoGrid.as_str(), "bento-grid");
    }

    #[test]
    fn style_mode_parses_and_scales() {
        let mode: StyleMode = "serendipitous".parse().expect("parse");
        assert_eq!(mode, StyleMode::Serendipitous);
        assert!(mode.variation_multiplier() > 1.0);
        assert!("festive".parse::<StyleMode>().is_err());
    }

    #[test]
    fn visual_classification_covers_chart_and_grid() {
        let chart = TemplateComponent::ChartFrame {
            title: "Growth".to_string(),
            chart_type: ChartType::Bar,
            data: vec![],
        };
        assert!(chart.is_visual());
        let bullets = TemplateComponent::TextBullets {
            title: None,
            content: vec![],
            style: None,
        };
        assert!(!bullets.is_visual());
    }
}
