use super::outline::Outline;
use super::slide::SlideNode;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// # NDOC
/// component: `data_models::metrics`
/// purpose: Deck-wide counters assembled by the orchestrator at the end.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct DeckMetrics {
    pub total_duration_ms: u64,
    pub retries: u32,
    pub total_cost: Decimal,
    pub fallback_slides: u32,
    pub reroute_count: u32,
    pub visual_alignment_first_pass_success: u32,
    pub total_visual_design_attempts: u32,
    pub vision_critique_runs: u32,
    pub vision_critique_failures: u32,
    pub coherence_issues: u32,
}

/// # NDOC
/// component: `data_models::metrics`
/// purpose: Final deliverable of a deck generation run.
/// invariants:
///   - `slides.len() == outline.slides.len()` unless `partial` is set.
///   - Every field serializes to JSON.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DeckResult {
    pub id: String,
    pub topic: String,
    pub outline: Outline,
    pub slides: Vec<SlideNode>,
    pub metrics: DeckMetrics,
    pub partial: bool,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    Info,
    Agent,
    Success,
    Error,
    Validation,
}

/// One human-readable progress event streamed to the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ActivityLogItem {
    pub id: u64,
    pub message: String,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_name: Option<String>,
}
