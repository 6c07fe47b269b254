use super::templates::{template_for, LayoutTemplate, Zone, ZonePurpose};
use crate::data_models::slide::{LayoutVariant, Metric, SlideComponent, TemplateComponent};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Content assigned to one zone. `component_idx` is the position in the
/// original `layout_plan.components` and is stamped on every primitive
/// produced from it (downstream id-mapping relies on it).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ZoneSlot {
    Title {
        text: String,
    },
    ComponentFull {
        component_idx: usize,
        component: SlideComponent,
    },
    ComponentPart {
        component_idx: usize,
        part_idx: usize,
        metric: Metric,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        intro: Option<String>,
    },
}

/// # NDOC
/// component: `spatial::allocator`
/// purpose: Result of mapping components onto a template's zones.
/// invariants:
///   - Unmatched components land in `unplaced` with a warning; they are
///     never silently dropped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SlidePlacement {
    pub variant: LayoutVariant,
    pub slots: BTreeMap<String, ZoneSlot>,
    pub unplaced: Vec<usize>,
    pub warnings: Vec<String>,
}

/// Ordered zone preferences per component type. Scoring is
/// `len(preferred) - index`, zero when absent.
fn preferred_zones(component: &TemplateComponent) -> &'static [&'static str] {
    match component {
        TemplateComponent::TitleSection { .. } => &["title", "hero-title", "content-top"],
        TemplateComponent::TextBullets { .. } => &[
            "text-main",
            "content-top",
            "content-bottom",
            "hero-content",
            "content-area",
            "panel-large",
            "left-panel",
            "main",
            "grid-1",
            "grid-2",
        ],
        TemplateComponent::MetricCards { .. } => &[
            "rail",
            "content-top",
            "content-bottom",
            "hero-content",
            "panel-top",
            "left-panel",
            "right-panel",
            "content-area",
        ],
        TemplateComponent::ProcessFlow { .. } => &[
            "content-area",
            "content-top",
            "content-bottom",
            "panel-large",
            "text-main",
            "main",
        ],
        TemplateComponent::IconGrid { .. } => &[
            "content-bottom",
            "content-top",
            "panel-large",
            "content-area",
            "main",
            "hero-content",
        ],
        TemplateComponent::ChartFrame { .. } => &[
            "visual-right",
            "visual-left",
            "right-panel",
            "panel-large",
            "main",
            "content-bottom",
            "content-top",
            "grid-2",
        ],
        TemplateComponent::DiagramSvg { .. } => &[
            "visual-right",
            "visual-left",
            "panel-large",
            "main",
            "content-area",
            "content-top",
        ],
    }
}

/// Affinity score for one (component, zone) pair.
fn affinity(component: &TemplateComponent, zone: &Zone) -> i32 {
    let preferred = preferred_zones(component);
    let base = preferred
        .iter()
        .position(|id| *id == zone.id)
        .map(|idx| (preferred.len() - idx) as i32)
        .unwrap_or(0);
    let bonus = match (component, zone.purpose) {
        (TemplateComponent::TextBullets { .. }, ZonePurpose::Hero) => 2,
        (c, ZonePurpose::Secondary) if c.is_visual() => 2,
        _ => 0,
    };
    base + bonus
}

fn title_zone_id(template: &LayoutTemplate) -> Option<&'static str> {
    template
        .zones
        .iter()
        .find(|z| z.id == "title" || z.id == "hero-title")
        .map(|z| z.id)
}

/// # NDOC
/// component: `spatial::allocator`
/// purpose: Map a slide's components onto the zones of its layout template.
///
/// The title goes to the first title zone. Bento and dashboard layouts
/// explode metric cards into one cell per metric; everything else runs
/// affinity-aware greedy matching with first-come-first-served ties.
pub fn allocate(
    variant: LayoutVariant,
    title: &str,
    components: &[SlideComponent],
) -> SlidePlacement {
    let template = template_for(variant);
    let mut slots: BTreeMap<String, ZoneSlot> = BTreeMap::new();
    let mut warnings = Vec::new();
    let mut unplaced = Vec::new();

    if let Some(zone_id) = title_zone_id(template) {
        slots.insert(
            zone_id.to_string(),
            ZoneSlot::Title {
                text: title.to_string(),
            },
        );
    }

    let celled = matches!(
        variant,
        LayoutVariant::BentoGrid | LayoutVariant::DashboardTiles
    );
    if celled {
        allocate_celled(template, components, &mut slots, &mut warnings, &mut unplaced);
    } else {
        allocate_by_affinity(template, components, &mut slots, &mut unplaced);
    }

    for idx in &unplaced {
        warnings.push(format!(
            "component {} ({}) could not be placed in {}",
            idx,
            components[*idx].spec.type_name(),
            variant.as_str()
        ));
    }

    SlidePlacement {
        variant,
        slots,
        unplaced,
        warnings,
    }
}

/// Bento/dashboard path: metric cards explode into one cell per metric,
/// remaining components fill remaining content zones sequentially.
fn allocate_celled(
    template: &LayoutTemplate,
    components: &[SlideComponent],
    slots: &mut BTreeMap<String, ZoneSlot>,
    warnings: &mut Vec<String>,
    unplaced: &mut Vec<usize>,
) {
    let cell_ids: Vec<&'static str> = template
        .zones
        .iter()
        .filter(|z| z.id.starts_with("grid-") || z.id.starts_with("card-"))
        .map(|z| z.id)
        .collect();

    for (idx, component) in components.iter().enumerate() {
        if let TemplateComponent::MetricCards { intro, metrics } = &component.spec {
            let free: Vec<&'static str> = cell_ids
                .iter()
                .copied()
                .filter(|id| !slots.contains_key(*id))
                .collect();
            if free.is_empty() {
                unplaced.push(idx);
                continue;
            }
            if metrics.len() > free.len() {
                warnings.push(format!(
                    "metric-cards has {} metrics but only {} cells; extra metrics dropped",
                    metrics.len(),
                    free.len()
                ));
            }
            for (part_idx, (metric, cell)) in metrics.iter().zip(free.iter()).enumerate() {
                slots.insert(
                    cell.to_string(),
                    ZoneSlot::ComponentPart {
                        component_idx: idx,
                        part_idx,
                        metric: metric.clone(),
                        intro: if part_idx == 0 { intro.clone() } else { None },
                    },
                );
            }
        }
    }

    // Remaining components take remaining content zones in declared order.
    for (idx, component) in components.iter().enumerate() {
        if matches!(component.spec, TemplateComponent::MetricCards { .. }) {
            continue;
        }
        let target = template.zones.iter().find(|z| {
            z.purpose != ZonePurpose::Accent
                && z.id != "title"
                && z.id != "hero-title"
                && !slots.contains_key(z.id)
        });
        match target {
            Some(zone) => {
                slots.insert(
                    zone.id.to_string(),
                    ZoneSlot::ComponentFull {
                        component_idx: idx,
                        component: component.clone(),
                    },
                );
            }
            None => unplaced.push(idx),
        }
    }
}

/// Greedy affinity matching: each component takes its highest-scoring
/// unoccupied zone; ties resolve first-come-first-served by zone order.
fn allocate_by_affinity(
    template: &LayoutTemplate,
    components: &[SlideComponent],
    slots: &mut BTreeMap<String, ZoneSlot>,
    unplaced: &mut Vec<usize>,
) {
    for (idx, component) in components.iter().enumerate() {
        let mut best: Option<(&Zone, i32)> = None;
        for zone in &template.zones {
            if zone.purpose == ZonePurpose::Accent
                || zone.id == "title"
                || zone.id == "hero-title"
                || slots.contains_key(zone.id)
            {
                continue;
            }
            let score = affinity(&component.spec, zone);
            if score <= 0 {
                continue;
            }
            match best {
                Some((_, best_score)) if best_score >= score => {}
                _ => best = Some((zone, score)),
            }
        }
        match best {
            Some((zone, _)) => {
                slots.insert(
                    zone.id.to_string(),
                    ZoneSlot::ComponentFull {
                        component_idx: idx,
                        component: component.clone(),
                    },
                );
            }
            None => unplaced.push(idx),
        }
    }
}
