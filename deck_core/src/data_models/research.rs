use serde::{Deserialize, Serialize};

/// # NDOC
/// component: `data_models::research`
/// purpose: Self-rated confidence attached to each researched claim.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

/// # NDOC
/// component: `data_models::research`
/// purpose: One verified fact with source grounding, produced by the researcher.
/// invariants:
///   - `id` is stable for the lifetime of the deck; clusters reference it by value.
///   - Entities are immutable once emitted; downstream stages copy-with-modification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResearchFact {
    pub id: String,
    pub category: String,
    pub claim: String,
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    pub source: String,
    pub confidence: Confidence,
}

/// # NDOC
/// component: `data_models::research`
/// purpose: Thematic grouping over the fact sheet.
/// invariants:
///   - Every `fact_id` resolves against the deck's fact sheet.
///   - Clusters partition the sheet but need not cover every fact.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FactCluster {
    pub id: String,
    pub theme: String,
    pub fact_ids: Vec<String>,
}
