use super::research::{FactCluster, ResearchFact};
use crate::contracts::PipelineError;
use crate::invariants::{ensure_non_empty_trimmed, ensure_range_usize};
use serde::{Deserialize, Serialize};

pub const MIN_DECK_SLIDES: usize = 4;
pub const MAX_DECK_SLIDES: usize = 12;

/// # NDOC
/// component: `data_models::outline`
/// purpose: Narrative role of one planned slide.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum SlideType {
    TitleSlide,
    SectionHeader,
    ContentMain,
    DataViz,
    Conclusion,
}

/// Deck color palette; every field is canonical 6-hex uppercase without `#`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ColorPalette {
    pub primary: String,
    pub secondary: String,
    pub background: String,
    pub text: String,
    pub accent_high_contrast: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceStyle {
    Solid,
    Outline,
    Glass,
}

/// Optional typography/spacing tokens layered on top of the palette.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ThemeTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub font_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_weight: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_weight: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spacing_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub corner_radius: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub surface_style: Option<SurfaceStyle>,
}

/// # NDOC
/// component: `data_models::outline`
/// purpose: Deck-global visual identity authored by the architect.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StyleGuide {
    pub theme_name: String,
    pub font_family_title: String,
    pub font_family_body: String,
    pub color_palette: ColorPalette,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_tokens: Option<ThemeTokens>,
}

/// One planned slide before any per-slide agent has run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlideStub {
    pub order: u32,
    #[serde(rename = "type")]
    pub slide_type: SlideType,
    pub title: String,
    pub purpose: String,
    #[serde(default)]
    pub relevant_cluster_ids: Vec<String>,
}

/// # NDOC
/// component: `data_models::outline`
/// purpose: Full deck plan: fact sheet, clusters, style guide, ordered stubs.
/// invariants:
///   - `4 <= slides.len() <= 12`.
///   - Every referenced cluster id exists; every cluster fact id resolves.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Outline {
    pub narrative_goal: String,
    pub title: String,
    pub facts: Vec<ResearchFact>,
    pub clusters: Vec<FactCluster>,
    pub style_guide: StyleGuide,
    pub slides: Vec<SlideStub>,
}

impl Outline {
    pub fn cluster(&self, id: &str) -> Option<&FactCluster> {
        self.clusters.iter().find(|c| c.id == id)
    }

    pub fn fact(&self, id: &str) -> Option<&ResearchFact> {
        self.facts.iter().find(|f| f.id == id)
    }

    /// Facts reachable through the given cluster ids, in sheet order.
    pub fn facts_for_clusters(&self, cluster_ids: &[String]) -> Vec<&ResearchFact> {
        let mut wanted: Vec<&str> = Vec::new();
        for cid in cluster_ids {
            if let Some(cluster) = self.cluster(cid) {
                for fid in &cluster.fact_ids {
                    if !wanted.contains(&fid.as_str()) {
                        wanted.push(fid);
                    }
                }
            }
        }
        self.facts
            .iter()
            .filter(|f| wanted.contains(&f.id.as_str()))
            .collect()
    }

    /// Referential and cardinality checks run after the architect call.
    pub fn validate(&self) -> Result<(), PipelineError> {
        ensure_non_empty_trimmed(&self.title, "outline.title")?;
        ensure_non_empty_trimmed(&self.narrative_goal, "outline.narrative_goal")?;
        ensure_range_usize(self.slides.len(), MIN_DECK_SLIDES, MAX_DECK_SLIDES, "slides.len")?;
        for (idx, cluster) in self.clusters.iter().enumerate() {
            ensure_non_empty_trimmed(&cluster.theme, &format!("clusters[{idx}].theme"))?;
            for fid in &cluster.fact_ids {
                if self.fact(fid).is_none() {
                    return Err(PipelineError::validation(format!(
                        "cluster '{}' references unknown fact '{}'",
                        cluster.id, fid
                    )));
                }
            }
        }
        for stub in &self.slides {
            for cid in &stub.relevant_cluster_ids {
                if self.cluster(cid).is_none() {
                    return Err(PipelineError::validation(format!(
                        "slide {} references unknown cluster '{}'",
                        stub.order, cid
                    )));
                }
            }
        }
        Ok(())
    }
}
