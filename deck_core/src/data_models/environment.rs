use serde::{Deserialize, Serialize};

/// # NDOC
/// component: `data_models::environment`
/// purpose: Coarse health bucket derived from the fit score.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum HealthLevel {
    Perfect,
    Good,
    Tight,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SuggestedAction {
    Keep,
    ScaleDown,
    RerouteLayout,
    SimplifyContent,
}

/// Per-zone utilization estimate produced while rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ZoneReport {
    pub id: String,
    pub capacity_used: f64,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_type: Option<String>,
    pub is_critical_overflow: bool,
}

/// # NDOC
/// component: `data_models::environment`
/// purpose: Snapshot of spatial health after rendering one slide.
/// invariants:
///   - `fit_score`, `text_density`, `visual_utilization` live in [0, 1].
///   - Re-rendering replaces this snapshot wholesale; warnings never accumulate.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnvironmentState {
    pub slide_id: String,
    pub fit_score: f64,
    pub text_density: f64,
    pub visual_utilization: f64,
    pub zones: Vec<ZoneReport>,
    pub health_level: HealthLevel,
    pub needs_reroute: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reroute_reason: Option<String>,
    pub suggested_action: SuggestedAction,
    pub render_timestamp: String,
    pub render_duration_ms: u64,
    pub warnings_count: u32,
    pub errors_count: u32,
}
