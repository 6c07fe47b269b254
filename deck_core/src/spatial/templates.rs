use crate::data_models::slide::LayoutVariant;
use once_cell::sync::Lazy;
use serde::Serialize;

/// Normalized 16:9 canvas. All zones and primitives speak these units;
/// consumers multiply by device-specific factors.
pub const CANVAS_W: f64 = 10.0;
pub const CANVAS_H: f64 = 5.625;

/// Overshoot tolerance for accent bars that bleed to the canvas edge.
pub const CANVAS_EPSILON: f64 = 0.1;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum ZonePurpose {
    Hero,
    Secondary,
    Accent,
    NegativeSpace,
}

/// # NDOC
/// component: `spatial::templates`
/// purpose: One rectangle of a layout template with its semantic purpose.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Zone {
    pub id: &'static str,
    pub x: f64,
    pub y: f64,
    pub w: f64,
    pub h: f64,
    pub purpose: ZonePurpose,
    pub content_suggestion: &'static str,
}

impl Zone {
    pub fn area(&self) -> f64 {
        self.w * self.h
    }
}

/// # NDOC
/// component: `spatial::templates`
/// purpose: Closed set of layout templates keyed by `LayoutVariant`.
/// invariants:
///   - Zone order is the allocator's tie-break order; do not reorder casually.
///   - Every zone rectangle fits the canvas within `CANVAS_EPSILON`.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct LayoutTemplate {
    pub variant: LayoutVariant,
    pub zones: Vec<Zone>,
}

fn zone(
    id: &'static str,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    purpose: ZonePurpose,
    content_suggestion: &'static str,
) -> Zone {
    Zone {
        id,
        x,
        y,
        w,
        h,
        purpose,
        content_suggestion,
    }
}

static TEMPLATES: Lazy<Vec<LayoutTemplate>> = Lazy::new(|| {
    use ZonePurpose::*;
    vec![
        LayoutTemplate {
            variant: LayoutVariant::StandardVertical,
            zones: vec![
                zone("title", 0.5, 0.3, 9.0, 0.9, Hero, "slide title"),
                zone("divider", 0.5, 1.35, 9.0, 0.08, Accent, "divider line"),
                zone("content-top", 0.5, 1.6, 9.0, 1.9, Secondary, "primary content"),
                zone("content-bottom", 0.5, 3.6, 9.0, 1.7, Secondary, "supporting content"),
            ],
        },
        LayoutTemplate {
            variant: LayoutVariant::SplitLeftText,
            zones: vec![
                zone("title", 0.5, 0.3, 9.0, 0.9, Hero, "slide title"),
                zone("text-main", 0.5, 1.4, 4.6, 3.9, Hero, "main text block"),
                zone("visual-right", 5.4, 1.4, 4.1, 3.9, Secondary, "chart or diagram"),
                zone("accent-bar", 0.2, 1.4, 0.15, 3.9, Accent, "vertical accent bar"),
            ],
        },
        LayoutTemplate {
            variant: LayoutVariant::SplitRightText,
            zones: vec![
                zone("visual-left", 0.5, 1.4, 4.1, 3.9, Secondary, "chart or diagram"),
                zone("title", 0.5, 0.3, 9.0, 0.9, Hero, "slide title"),
                zone("text-main", 4.9, 1.4, 4.6, 3.9, Hero, "main text block"),
            ],
        },
        LayoutTemplate {
            variant: LayoutVariant::HeroCentered,
            zones: vec![
                zone("hero-title", 1.0, 1.6, 8.0, 1.2, Hero, "oversized statement"),
                zone("hero-content", 1.5, 3.0, 7.0, 1.4, Secondary, "supporting line"),
                zone("accent-bottom", 3.5, 4.7, 3.0, 0.12, Accent, "centered underline"),
            ],
        },
        LayoutTemplate {
            variant: LayoutVariant::BentoGrid,
            zones: vec![
                zone("title", 0.5, 0.3, 9.0, 0.8, Hero, "slide title"),
                zone("grid-1", 0.5, 1.3, 4.4, 2.0, Secondary, "cell"),
                zone("grid-2", 5.1, 1.3, 4.4, 2.0, Secondary, "cell"),
                zone("grid-3", 0.5, 3.45, 4.4, 2.0, Secondary, "cell"),
                zone("grid-4", 5.1, 3.45, 4.4, 2.0, Secondary, "cell"),
            ],
        },
        LayoutTemplate {
            variant: LayoutVariant::TimelineHorizontal,
            zones: vec![
                zone("title", 0.5, 0.3, 9.0, 0.9, Hero, "slide title"),
                zone("timeline-track", 0.5, 2.5, 9.0, 0.3, Accent, "horizontal track"),
                zone("content-area", 0.5, 3.0, 9.0, 2.3, Hero, "step content"),
            ],
        },
        LayoutTemplate {
            variant: LayoutVariant::DashboardTiles,
            zones: vec![
                zone("title", 0.5, 0.3, 9.0, 0.8, Hero, "slide title"),
                zone("card-1", 0.5, 1.25, 2.9, 1.3, Secondary, "stat card"),
                zone("card-2", 3.55, 1.25, 2.9, 1.3, Secondary, "stat card"),
                zone("card-3", 6.6, 1.25, 2.9, 1.3, Secondary, "stat card"),
                zone("left-panel", 0.5, 2.75, 4.4, 2.5, Secondary, "detail panel"),
                zone("right-panel", 5.1, 2.75, 4.4, 2.5, Secondary, "detail panel"),
            ],
        },
        LayoutTemplate {
            variant: LayoutVariant::MetricsRail,
            zones: vec![
                zone("title", 0.5, 0.3, 9.0, 0.8, Hero, "slide title"),
                zone("rail", 0.5, 1.3, 2.6, 4.0, Secondary, "stacked metrics"),
                zone("rail-divider", 3.3, 1.3, 0.08, 4.0, Accent, "vertical divider"),
                zone("main", 3.6, 1.3, 5.9, 4.0, Hero, "main content"),
            ],
        },
        LayoutTemplate {
            variant: LayoutVariant::AsymmetricGrid,
            zones: vec![
                zone("title", 0.5, 0.3, 9.0, 0.8, Hero, "slide title"),
                zone("panel-large", 0.5, 1.3, 5.6, 4.0, Hero, "dominant panel"),
                zone("panel-top", 6.3, 1.3, 3.2, 1.9, Secondary, "upper panel"),
                zone("panel-bottom", 6.3, 3.4, 3.2, 1.9, Secondary, "lower panel"),
            ],
        },
    ]
});

pub fn template_for(variant: LayoutVariant) -> &'static LayoutTemplate {
    TEMPLATES
        .iter()
        .find(|t| t.variant == variant)
        .expect("every layout variant has a template")
}

pub fn all_templates() -> &'static [LayoutTemplate] {
    &TEMPLATES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_variant_has_a_template() {
        for variant in LayoutVariant::ALL {
            let template = template_for(variant);
            assert!(!template.zones.is_empty());
        }
    }

    #[test]
    fn zones_fit_inside_the_canvas() {
        for template in all_templates() {
            for zone in &template.zones {
                assert!(zone.x >= 0.0 && zone.y >= 0.0, "{}", zone.id);
                assert!(
                    zone.x + zone.w <= CANVAS_W + CANVAS_EPSILON,
                    "{} overflows x",
                    zone.id
                );
                assert!(
                    zone.y + zone.h <= CANVAS_H + CANVAS_EPSILON,
                    "{} overflows y",
                    zone.id
                );
            }
        }
    }

    #[test]
    fn every_template_has_a_title_zone() {
        for template in all_templates() {
            assert!(
                template
                    .zones
                    .iter()
                    .any(|z| z.id == "title" || z.id == "hero-title"),
                "{:?} lacks a title zone",
                template.variant
            );
        }
    }

    #[test]
    fn bento_grid_has_four_cells() {
        let template = template_for(LayoutVariant::BentoGrid);
        let cells = template
            .zones
            .iter()
            .filter(|z| z.id.starts_with("grid-"))
            .count();
        assert_eq!(cells, 4);
    }
}
