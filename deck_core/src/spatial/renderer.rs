use super::allocator::{SlidePlacement, ZoneSlot};
use super::color::{contrast_safe_text, normalize_color};
use super::templates::{template_for, Zone, ZonePurpose, CANVAS_H, CANVAS_W};
use crate::config::TuningTable;
use crate::data_models::environment::{
    EnvironmentState, HealthLevel, SuggestedAction, ZoneReport,
};
use crate::data_models::outline::{StyleGuide, SurfaceStyle};
use crate::data_models::slide::{
    ChartDatum, ChartType, IconItem, Metric, ProcessStep, RepairHints, SlideComponent,
    TemplateComponent, Trend,
};
use crate::invariants::clamp01;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// 1 canvas unit corresponds to 96 typographic points (13.33in / 10 units).
const PT_PER_UNIT: f64 = 96.0;
const BASE_LINE_FACTOR: f64 = 1.25;
/// Font-aware wrap estimation at 14pt.
const PROPORTIONAL_CHARS_PER_UNIT: f64 = 12.5;
const MONO_CHARS_PER_UNIT: f64 = 8.3;
const MIN_FONT_SCALE: f64 = 0.4;
/// Pre-emptive bullet caps for small zones, in canvas units squared.
const SMALL_ZONE_AREA: f64 = 0.3;
const MEDIUM_ZONE_AREA: f64 = 0.5;
/// Sparse-layout detection on area-weighted content-zone usage.
const SPARSE_UTILIZATION: f64 = 0.3;
const LOW_UTILIZATION: f64 = 0.5;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    Rect,
    RoundedRect,
    Line,
    Circle,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    Left,
    Center,
    Right,
}

/// # NDOC
/// component: `spatial::renderer`
/// purpose: Flat visual primitive consumed by the preview canvas and the
/// PPTX exporter. Coordinates are normalized canvas units.
/// invariants:
///   - `component_idx` traces every primitive back to its source component.
///   - Emission is deterministic for identical input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Primitive {
    Shape {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        z_index: u32,
        shape: ShapeKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        fill: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        stroke: Option<String>,
        corner_radius: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        component_idx: Option<usize>,
    },
    Text {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        z_index: u32,
        text: String,
        font_family: String,
        font_size: f64,
        weight: u16,
        color: String,
        align: TextAlign,
        line_height: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        component_idx: Option<usize>,
    },
    Image {
        x: f64,
        y: f64,
        w: f64,
        h: f64,
        z_index: u32,
        url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        component_idx: Option<usize>,
    },
}

impl Primitive {
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        match self {
            Primitive::Shape { x, y, w, h, .. }
            | Primitive::Text { x, y, w, h, .. }
            | Primitive::Image { x, y, w, h, .. } => (*x, *y, *w, *h),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderOutput {
    pub primitives: Vec<Primitive>,
    pub environment: EnvironmentState,
}

/// Resolved palette with canonical colors, derived once per render.
struct Palette {
    primary: String,
    secondary: String,
    background: String,
    text: String,
    accent: String,
}

impl Palette {
    fn from_style(style: &StyleGuide) -> Self {
        let p = &style.color_palette;
        Self {
            primary: normalize_color(&p.primary, "1D4ED8"),
            secondary: normalize_color(&p.secondary, "60A5FA"),
            background: normalize_color(&p.background, "0B1120"),
            text: normalize_color(&p.text, "E2E8F0"),
            accent: normalize_color(&p.accent_high_contrast, "F59E0B"),
        }
    }
}

struct Frame {
    primitives: Vec<Primitive>,
    warnings: Vec<String>,
    zone_reports: Vec<ZoneReport>,
    z: u32,
    text_chars: f64,
    text_capacity: f64,
}

impl Frame {
    fn next_z(&mut self) -> u32 {
        self.z += 1;
        self.z
    }
}

fn line_height_units(font_size: f64, factor: f64) -> f64 {
    font_size * BASE_LINE_FACTOR * factor / PT_PER_UNIT
}

fn chars_per_unit(font_size: f64, mono: bool) -> f64 {
    let base = if mono {
        MONO_CHARS_PER_UNIT
    } else {
        PROPORTIONAL_CHARS_PER_UNIT
    };
    base * 14.0 / font_size
}

fn estimate_wrapped_lines(text: &str, width: f64, font_size: f64, mono: bool) -> usize {
    let per_line = (width * chars_per_unit(font_size, mono)).max(1.0);
    ((text.chars().count() as f64) / per_line).ceil().max(1.0) as usize
}

fn is_mono(family: &str) -> bool {
    family.to_ascii_lowercase().contains("mono")
}

fn truncate_with_ellipsis(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let kept: String = text.chars().take(max_chars.saturating_sub(1)).collect();
    format!("{}…", kept.trim_end())
}

/// Effective rectangle for a component: explicit `_hint` coordinates win
/// over the zone's declared rectangle.
fn effective_rect(zone: &Zone, hints: &RepairHints) -> (f64, f64, f64, f64) {
    (
        hints.x.unwrap_or(zone.x),
        hints.y.unwrap_or(zone.y),
        hints.w.unwrap_or(zone.w),
        hints.h.unwrap_or(zone.h),
    )
}

/// Factor hints above 1.0 would make overflow detection falsely worse, so
/// fit math clamps them; visual output applies them verbatim.
fn fit_factor(hint: Option<f64>) -> f64 {
    hint.map(|v| v.min(1.0)).unwrap_or(1.0).max(0.1)
}

fn out_factor(hint: Option<f64>) -> f64 {
    hint.unwrap_or(1.0).max(0.1)
}

/// # NDOC
/// component: `spatial::renderer`
/// purpose: Produce the flat primitive list plus the environment snapshot
/// for one allocated slide.
/// invariants:
///   - Warnings are replaced, never accumulated, on re-render.
///   - Every primitive stays inside the canvas within the accent tolerance.
pub fn render_slide(
    slide_id: &str,
    placement: &SlidePlacement,
    style: &StyleGuide,
    background_image_url: Option<&str>,
    tuning: &TuningTable,
) -> RenderOutput {
    let started = Instant::now();
    let template = template_for(placement.variant);
    let palette = Palette::from_style(style);
    let corner_radius = style
        .theme_tokens
        .as_ref()
        .and_then(|t| t.corner_radius)
        .unwrap_or(0.08);
    let surface = style
        .theme_tokens
        .as_ref()
        .and_then(|t| t.surface_style)
        .unwrap_or(SurfaceStyle::Solid);

    let mut frame = Frame {
        primitives: Vec::new(),
        warnings: placement.warnings.clone(),
        zone_reports: Vec::new(),
        z: 0,
        text_chars: 0.0,
        text_capacity: 0.0,
    };

    // Canvas background, then the optional generated image above it.
    frame.primitives.push(Primitive::Shape {
        x: 0.0,
        y: 0.0,
        w: CANVAS_W,
        h: CANVAS_H,
        z_index: 0,
        shape: ShapeKind::Rect,
        fill: Some(palette.background.clone()),
        stroke: None,
        corner_radius: 0.0,
        component_idx: None,
    });
    if let Some(url) = background_image_url {
        let z = frame.next_z();
        frame.primitives.push(Primitive::Image {
            x: 0.0,
            y: 0.0,
            w: CANVAS_W,
            h: CANVAS_H,
            z_index: z,
            url: url.to_string(),
            component_idx: None,
        });
    }

    for zone in &template.zones {
        match placement.slots.get(zone.id) {
            Some(ZoneSlot::Title { text }) => {
                render_title(&mut frame, zone, text, style, &palette);
            }
            Some(ZoneSlot::ComponentFull {
                component_idx,
                component,
            }) => {
                render_component(
                    &mut frame,
                    zone,
                    *component_idx,
                    component,
                    style,
                    &palette,
                    surface,
                    corner_radius,
                );
            }
            Some(ZoneSlot::ComponentPart {
                component_idx,
                metric,
                intro,
                ..
            }) => {
                render_metric_card(
                    &mut frame,
                    zone,
                    *component_idx,
                    metric,
                    intro.as_deref(),
                    style,
                    &palette,
                    surface,
                    corner_radius,
                );
            }
            None => {
                if zone.purpose == ZonePurpose::Accent {
                    render_accent(&mut frame, zone, &palette);
                } else {
                    frame.zone_reports.push(ZoneReport {
                        id: zone.id.to_string(),
                        capacity_used: 0.0,
                        warnings: Vec::new(),
                        content_type: None,
                        is_critical_overflow: false,
                    });
                }
            }
        }
    }

    let environment = build_environment(slide_id, template, &mut frame, tuning, started);
    RenderOutput {
        primitives: frame.primitives,
        environment,
    }
}

fn render_title(frame: &mut Frame, zone: &Zone, text: &str, style: &StyleGuide, palette: &Palette) {
    let hero = zone.id == "hero-title";
    let mut font_size = if hero { 32.0 } else { 24.0 };
    let mono = is_mono(&style.font_family_title);
    // Shrink until the title fits its zone height.
    loop {
        let lines = estimate_wrapped_lines(text, zone.w, font_size, mono);
        let needed = lines as f64 * line_height_units(font_size, 1.0);
        if needed <= zone.h || font_size <= 14.0 {
            break;
        }
        font_size -= 2.0;
    }
    let color = contrast_safe_text(&palette.text, &palette.background);
    let z = frame.next_z();
    frame.primitives.push(Primitive::Text {
        x: zone.x,
        y: zone.y,
        w: zone.w,
        h: zone.h,
        z_index: z,
        text: text.to_string(),
        font_family: style.font_family_title.clone(),
        font_size,
        weight: style
            .theme_tokens
            .as_ref()
            .and_then(|t| t.heading_weight)
            .unwrap_or(700),
        color,
        align: if hero { TextAlign::Center } else { TextAlign::Left },
        line_height: BASE_LINE_FACTOR,
        component_idx: None,
    });
    track_text(frame, text, zone, font_size, mono);
    frame.zone_reports.push(ZoneReport {
        id: zone.id.to_string(),
        capacity_used: clamp01(
            estimate_wrapped_lines(text, zone.w, font_size, mono) as f64
                * line_height_units(font_size, 1.0)
                / zone.h,
        ),
        warnings: Vec::new(),
        content_type: Some("title".to_string()),
        is_critical_overflow: false,
    });
}

fn render_accent(frame: &mut Frame, zone: &Zone, palette: &Palette) {
    let shape = if zone.h <= 0.2 || zone.w <= 0.2 {
        ShapeKind::Line
    } else {
        ShapeKind::Rect
    };
    let z = frame.next_z();
    frame.primitives.push(Primitive::Shape {
        x: zone.x,
        y: zone.y,
        w: zone.w,
        h: zone.h,
        z_index: z,
        shape,
        fill: Some(palette.accent.clone()),
        stroke: None,
        corner_radius: 0.0,
        component_idx: None,
    });
    frame.zone_reports.push(ZoneReport {
        id: zone.id.to_string(),
        capacity_used: 0.0,
        warnings: Vec::new(),
        content_type: Some("decoration".to_string()),
        is_critical_overflow: false,
    });
}

#[allow(clippy::too_many_arguments)]
fn render_component(
    frame: &mut Frame,
    zone: &Zone,
    component_idx: usize,
    component: &SlideComponent,
    style: &StyleGuide,
    palette: &Palette,
    surface: SurfaceStyle,
    corner_radius: f64,
) {
    match &component.spec {
        TemplateComponent::TitleSection { title, subtitle } => {
            let mut lines = vec![title.clone()];
            if let Some(sub) = subtitle {
                lines.push(sub.clone());
            }
            render_text_lines(
                frame, zone, component_idx, &lines, 20.0, style, palette, &component.hints,
                TextAlign::Left, "title-section",
            );
        }
        TemplateComponent::TextBullets { title, content, .. } => {
            render_bullets(
                frame,
                zone,
                component_idx,
                title.as_deref(),
                content,
                style,
                palette,
                &component.hints,
            );
        }
        TemplateComponent::MetricCards { intro, metrics } => {
            render_metric_row(
                frame,
                zone,
                component_idx,
                intro.as_deref(),
                metrics,
                style,
                palette,
                surface,
                corner_radius,
                &component.hints,
            );
        }
        TemplateComponent::ProcessFlow { intro, steps } => {
            render_process_flow(
                frame,
                zone,
                component_idx,
                intro.as_deref(),
                steps,
                style,
                palette,
                corner_radius,
            );
        }
        TemplateComponent::IconGrid { cols, intro, items } => {
            render_icon_grid(
                frame,
                zone,
                component_idx,
                *cols,
                intro.as_deref(),
                items,
                style,
                palette,
                corner_radius,
            );
        }
        TemplateComponent::ChartFrame {
            title,
            chart_type,
            data,
        } => {
            render_chart(
                frame,
                zone,
                component_idx,
                title,
                *chart_type,
                data,
                style,
                palette,
                corner_radius,
            );
        }
        TemplateComponent::DiagramSvg {
            title,
            elements,
            central_theme,
            ..
        } => {
            render_diagram(
                frame,
                zone,
                component_idx,
                title.as_deref(),
                elements,
                central_theme.as_deref(),
                style,
                palette,
                corner_radius,
            );
        }
    }
}

/// Shared text-block ladder: scale, then ellipsis, then render-what-fits.
#[allow(clippy::too_many_arguments)]
fn render_text_lines(
    frame: &mut Frame,
    zone: &Zone,
    component_idx: usize,
    lines: &[String],
    base_font: f64,
    style: &StyleGuide,
    palette: &Palette,
    hints: &RepairHints,
    align: TextAlign,
    content_type: &str,
) {
    let (x, y, w, h) = effective_rect(zone, hints);
    let mono = is_mono(&style.font_family_body);
    let fit_lh = fit_factor(hints.line_height_factor);
    let out_lh = out_factor(hints.line_height_factor);
    let max_y = y + h;

    let mut zone_warnings = Vec::new();
    let mut font_size = base_font;
    let required = |size: f64, factor: f64| -> f64 {
        lines
            .iter()
            .map(|l| estimate_wrapped_lines(l, w, size, mono) as f64)
            .sum::<f64>()
            * line_height_units(size, factor)
    };

    // (a) auto-scale down to 0.4x base.
    while required(font_size, fit_lh) > h && font_size > base_font * MIN_FONT_SCALE {
        font_size -= 1.0;
    }

    let mut rendered: Vec<String> = lines.to_vec();
    let needed = required(font_size, fit_lh);
    if needed > h {
        let overflow_ratio = needed / h.max(0.01);
        if overflow_ratio < 2.0 && rendered.len() <= 4 {
            // (b) per-line ellipsis to the width the zone can carry.
            let target = (w * chars_per_unit(font_size, mono)) as usize;
            rendered = rendered
                .iter()
                .map(|l| truncate_with_ellipsis(l, target.max(8)))
                .collect();
            zone_warnings.push(format!("text shortened with ellipsis in zone {}", zone.id));
        } else {
            zone_warnings.push(format!("text truncated to fit zone {}", zone.id));
        }
    }

    let color = hints
        .color
        .as_ref()
        .map(|c| normalize_color(c, &palette.text))
        .unwrap_or_else(|| contrast_safe_text(&palette.text, &palette.background));
    let line_height = line_height_units(font_size, out_lh);
    let mut cur_y = y;
    for line in &rendered {
        let wrapped = estimate_wrapped_lines(line, w, font_size, mono) as f64;
        let block_h = wrapped * line_height;
        // (c) hard stop at the zone boundary.
        if cur_y + line_height > max_y {
            zone_warnings.push(format!("text truncated to fit zone {}", zone.id));
            break;
        }
        let z = frame.next_z();
        frame.primitives.push(Primitive::Text {
            x,
            y: cur_y,
            w,
            h: block_h.min(max_y - cur_y),
            z_index: z,
            text: line.clone(),
            font_family: style.font_family_body.clone(),
            font_size,
            weight: style
                .theme_tokens
                .as_ref()
                .and_then(|t| t.body_weight)
                .unwrap_or(400),
            color: color.clone(),
            align,
            line_height: BASE_LINE_FACTOR * out_lh,
            component_idx: Some(component_idx),
        });
        track_text(frame, line, zone, font_size, mono);
        cur_y += block_h;
    }

    zone_warnings.dedup();
    let capacity_used = clamp01((cur_y - y) / h.max(0.01));
    frame.warnings.extend(zone_warnings.clone());
    frame.zone_reports.push(ZoneReport {
        id: zone.id.to_string(),
        capacity_used,
        warnings: zone_warnings,
        content_type: Some(content_type.to_string()),
        is_critical_overflow: needed > h * 1.5,
    });
}

#[allow(clippy::too_many_arguments)]
fn render_bullets(
    frame: &mut Frame,
    zone: &Zone,
    component_idx: usize,
    title: Option<&str>,
    content: &[String],
    style: &StyleGuide,
    palette: &Palette,
    hints: &RepairHints,
) {
    // Pre-emptive density check: fewer complete bullets beat mid-render
    // truncation in cramped zones.
    let area = zone.area();
    let cap = if area < SMALL_ZONE_AREA {
        2
    } else if area < MEDIUM_ZONE_AREA {
        3
    } else {
        usize::MAX
    };
    let mut bullets: Vec<String> = content.to_vec();
    if bullets.len() > cap && bullets.len() > 2 {
        frame.warnings.push(format!(
            "zone {} too small for {} bullets; kept {}",
            zone.id,
            bullets.len(),
            cap
        ));
        bullets.truncate(cap);
    }

    let mut lines = Vec::new();
    if let Some(t) = title {
        lines.push(t.to_string());
    }
    for bullet in &bullets {
        lines.push(format!("• {bullet}"));
    }
    render_text_lines(
        frame,
        zone,
        component_idx,
        &lines,
        14.0,
        style,
        palette,
        hints,
        TextAlign::Left,
        "text-bullets",
    );
}

#[allow(clippy::too_many_arguments)]
fn render_metric_row(
    frame: &mut Frame,
    zone: &Zone,
    component_idx: usize,
    intro: Option<&str>,
    metrics: &[Metric],
    style: &StyleGuide,
    palette: &Palette,
    surface: SurfaceStyle,
    corner_radius: f64,
    hints: &RepairHints,
) {
    let gap = 0.2 * out_factor(hints.item_spacing_factor);
    let intro_h = if intro.is_some() { 0.4 } else { 0.0 };
    if let Some(text) = intro {
        let z = frame.next_z();
        frame.primitives.push(Primitive::Text {
            x: zone.x,
            y: zone.y,
            w: zone.w,
            h: intro_h,
            z_index: z,
            text: text.to_string(),
            font_family: style.font_family_body.clone(),
            font_size: 13.0,
            weight: 400,
            color: contrast_safe_text(&palette.text, &palette.background),
            align: TextAlign::Left,
            line_height: BASE_LINE_FACTOR,
            component_idx: Some(component_idx),
        });
        track_text(frame, text, zone, 13.0, false);
    }

    let count = metrics.len().max(1) as f64;
    // Vertical stack for rail-shaped zones, horizontal row otherwise.
    let vertical = zone.h > zone.w;
    let (card_w, card_h) = if vertical {
        (zone.w, (zone.h - intro_h - gap * (count - 1.0)) / count)
    } else {
        ((zone.w - gap * (count - 1.0)) / count, zone.h - intro_h)
    };

    for (i, metric) in metrics.iter().enumerate() {
        let (cx, cy) = if vertical {
            (zone.x, zone.y + intro_h + i as f64 * (card_h + gap))
        } else {
            (zone.x + i as f64 * (card_w + gap), zone.y + intro_h)
        };
        emit_metric_card(
            frame,
            component_idx,
            metric,
            cx,
            cy,
            card_w,
            card_h,
            0.15 * out_factor(hints.padding_factor),
            style,
            palette,
            surface,
            corner_radius,
        );
    }

    frame.zone_reports.push(ZoneReport {
        id: zone.id.to_string(),
        capacity_used: clamp01(metrics.len() as f64 / 6.0 + 0.3),
        warnings: Vec::new(),
        content_type: Some("metric-cards".to_string()),
        is_critical_overflow: false,
    });
}

#[allow(clippy::too_many_arguments)]
fn render_metric_card(
    frame: &mut Frame,
    zone: &Zone,
    component_idx: usize,
    metric: &Metric,
    intro: Option<&str>,
    style: &StyleGuide,
    palette: &Palette,
    surface: SurfaceStyle,
    corner_radius: f64,
) {
    let _ = intro; // Cell layouts carry the intro inside the first card zone title.
    emit_metric_card(
        frame,
        component_idx,
        metric,
        zone.x,
        zone.y,
        zone.w,
        zone.h,
        0.15,
        style,
        palette,
        surface,
        corner_radius,
    );
    frame.zone_reports.push(ZoneReport {
        id: zone.id.to_string(),
        capacity_used: 0.8,
        warnings: Vec::new(),
        content_type: Some("metric-cards".to_string()),
        is_critical_overflow: false,
    });
}

#[allow(clippy::too_many_arguments)]
fn emit_metric_card(
    frame: &mut Frame,
    component_idx: usize,
    metric: &Metric,
    x: f64,
    y: f64,
    w: f64,
    h: f64,
    padding: f64,
    style: &StyleGuide,
    palette: &Palette,
    surface: SurfaceStyle,
    corner_radius: f64,
) {
    let (fill, stroke) = match surface {
        SurfaceStyle::Solid => (Some(palette.primary.clone()), None),
        SurfaceStyle::Outline => (Some(palette.background.clone()), Some(palette.primary.clone())),
        SurfaceStyle::Glass => (Some(palette.background.clone()), Some(palette.secondary.clone())),
    };
    let card_bg = fill.clone().unwrap_or_else(|| palette.background.clone());
    let z = frame.next_z();
    frame.primitives.push(Primitive::Shape {
        x,
        y,
        w,
        h,
        z_index: z,
        shape: ShapeKind::RoundedRect,
        fill,
        stroke,
        corner_radius,
        component_idx: Some(component_idx),
    });

    let value_color = contrast_safe_text(&palette.accent, &card_bg);
    let pad = padding.min(w / 4.0);
    let z = frame.next_z();
    frame.primitives.push(Primitive::Text {
        x: x + pad,
        y: y + h * 0.15,
        w: w - pad * 2.0,
        h: h * 0.45,
        z_index: z,
        text: metric.value.clone(),
        font_family: style.font_family_title.clone(),
        font_size: 22.0,
        weight: 700,
        color: value_color,
        align: TextAlign::Center,
        line_height: 1.1,
        component_idx: Some(component_idx),
    });

    let label = match metric.trend {
        Some(Trend::Up) => format!("▲ {}", metric.label),
        Some(Trend::Down) => format!("▼ {}", metric.label),
        _ => metric.label.clone(),
    };
    let z = frame.next_z();
    frame.primitives.push(Primitive::Text {
        x: x + pad,
        y: y + h * 0.62,
        w: w - pad * 2.0,
        h: h * 0.3,
        z_index: z,
        text: label.clone(),
        font_family: style.font_family_body.clone(),
        font_size: 12.0,
        weight: 400,
        color: contrast_safe_text(&palette.text, &card_bg),
        align: TextAlign::Center,
        line_height: 1.1,
        component_idx: Some(component_idx),
    });
    track_text(frame, &label, &Zone { x, y, w, h, ..DUMMY_ZONE }, 12.0, false);
}

const DUMMY_ZONE: Zone = Zone {
    id: "synthetic",
    x: 0.0,
    y: 0.0,
    w: 1.0,
    h: 1.0,
    purpose: ZonePurpose::Secondary,
    content_suggestion: "",
};

#[allow(clippy::too_many_arguments)]
fn render_process_flow(
    frame: &mut Frame,
    zone: &Zone,
    component_idx: usize,
    intro: Option<&str>,
    steps: &[ProcessStep],
    style: &StyleGuide,
    palette: &Palette,
    corner_radius: f64,
) {
    let intro_h = if intro.is_some() { 0.35 } else { 0.0 };
    if let Some(text) = intro {
        let z = frame.next_z();
        frame.primitives.push(Primitive::Text {
            x: zone.x,
            y: zone.y,
            w: zone.w,
            h: intro_h,
            z_index: z,
            text: text.to_string(),
            font_family: style.font_family_body.clone(),
            font_size: 13.0,
            weight: 400,
            color: contrast_safe_text(&palette.text, &palette.background),
            align: TextAlign::Left,
            line_height: BASE_LINE_FACTOR,
            component_idx: Some(component_idx),
        });
        track_text(frame, text, zone, 13.0, false);
    }

    let count = steps.len().max(1) as f64;
    let gap = 0.25;
    let step_w = (zone.w - gap * (count - 1.0)) / count;
    let badge = 0.45;
    let top = zone.y + intro_h;

    for (i, step) in steps.iter().enumerate() {
        let sx = zone.x + i as f64 * (step_w + gap);
        // Connector to the next step.
        if i + 1 < steps.len() {
            let z = frame.next_z();
            frame.primitives.push(Primitive::Shape {
                x: sx + step_w,
                y: top + badge / 2.0,
                w: gap,
                h: 0.03,
                z_index: z,
                shape: ShapeKind::Line,
                fill: Some(palette.secondary.clone()),
                stroke: None,
                corner_radius: 0.0,
                component_idx: Some(component_idx),
            });
        }
        let z = frame.next_z();
        frame.primitives.push(Primitive::Shape {
            x: sx,
            y: top,
            w: badge,
            h: badge,
            z_index: z,
            shape: ShapeKind::Circle,
            fill: Some(palette.primary.clone()),
            stroke: None,
            corner_radius,
            component_idx: Some(component_idx),
        });
        let z = frame.next_z();
        frame.primitives.push(Primitive::Text {
            x: sx,
            y: top,
            w: badge,
            h: badge,
            z_index: z,
            text: step.number.to_string(),
            font_family: style.font_family_title.clone(),
            font_size: 14.0,
            weight: 700,
            color: contrast_safe_text(&palette.text, &palette.primary),
            align: TextAlign::Center,
            line_height: 1.0,
            component_idx: Some(component_idx),
        });
        let z = frame.next_z();
        frame.primitives.push(Primitive::Text {
            x: sx,
            y: top + badge + 0.1,
            w: step_w,
            h: 0.35,
            z_index: z,
            text: truncate_with_ellipsis(&step.title, 30),
            font_family: style.font_family_title.clone(),
            font_size: 13.0,
            weight: 600,
            color: contrast_safe_text(&palette.text, &palette.background),
            align: TextAlign::Left,
            line_height: 1.15,
            component_idx: Some(component_idx),
        });
        let desc = truncate_with_ellipsis(&step.description, 80);
        let z = frame.next_z();
        frame.primitives.push(Primitive::Text {
            x: sx,
            y: top + badge + 0.5,
            w: step_w,
            h: (zone.y + zone.h - (top + badge + 0.5)).max(0.2),
            z_index: z,
            text: desc.clone(),
            font_family: style.font_family_body.clone(),
            font_size: 11.0,
            weight: 400,
            color: contrast_safe_text(&palette.text, &palette.background),
            align: TextAlign::Left,
            line_height: 1.2,
            component_idx: Some(component_idx),
        });
        track_text(frame, &desc, zone, 11.0, false);
    }

    frame.zone_reports.push(ZoneReport {
        id: zone.id.to_string(),
        capacity_used: clamp01(steps.len() as f64 / 5.0 + 0.3),
        warnings: Vec::new(),
        content_type: Some("process-flow".to_string()),
        is_critical_overflow: false,
    });
}

#[allow(clippy::too_many_arguments)]
fn render_icon_grid(
    frame: &mut Frame,
    zone: &Zone,
    component_idx: usize,
    cols: u8,
    intro: Option<&str>,
    items: &[IconItem],
    style: &StyleGuide,
    palette: &Palette,
    corner_radius: f64,
) {
    let cols = cols.clamp(2, 4) as usize;
    let intro_h = if intro.is_some() { 0.35 } else { 0.0 };
    if let Some(text) = intro {
        let z = frame.next_z();
        frame.primitives.push(Primitive::Text {
            x: zone.x,
            y: zone.y,
            w: zone.w,
            h: intro_h,
            z_index: z,
            text: text.to_string(),
            font_family: style.font_family_body.clone(),
            font_size: 13.0,
            weight: 400,
            color: contrast_safe_text(&palette.text, &palette.background),
            align: TextAlign::Left,
            line_height: BASE_LINE_FACTOR,
            component_idx: Some(component_idx),
        });
        track_text(frame, text, zone, 13.0, false);
    }

    let rows = items.len().div_ceil(cols).max(1);
    let gap = 0.15;
    let cell_w = (zone.w - gap * (cols as f64 - 1.0)) / cols as f64;
    let cell_h = ((zone.h - intro_h) - gap * (rows as f64 - 1.0)) / rows as f64;

    for (i, item) in items.iter().enumerate() {
        let row = i / cols;
        let col = i % cols;
        let cx = zone.x + col as f64 * (cell_w + gap);
        let cy = zone.y + intro_h + row as f64 * (cell_h + gap);
        let z = frame.next_z();
        frame.primitives.push(Primitive::Shape {
            x: cx,
            y: cy,
            w: cell_w,
            h: cell_h,
            z_index: z,
            shape: ShapeKind::RoundedRect,
            fill: None,
            stroke: Some(palette.secondary.clone()),
            corner_radius,
            component_idx: Some(component_idx),
        });
        let z = frame.next_z();
        frame.primitives.push(Primitive::Text {
            x: cx,
            y: cy + 0.08,
            w: cell_w,
            h: cell_h * 0.4,
            z_index: z,
            text: item.icon.clone(),
            font_family: style.font_family_body.clone(),
            font_size: 18.0,
            weight: 400,
            color: palette.accent.clone(),
            align: TextAlign::Center,
            line_height: 1.0,
            component_idx: Some(component_idx),
        });
        let label = truncate_with_ellipsis(&item.label, 40);
        let z = frame.next_z();
        frame.primitives.push(Primitive::Text {
            x: cx + 0.05,
            y: cy + cell_h * 0.5,
            w: cell_w - 0.1,
            h: cell_h * 0.45,
            z_index: z,
            text: label.clone(),
            font_family: style.font_family_body.clone(),
            font_size: 12.0,
            weight: 500,
            color: contrast_safe_text(&palette.text, &palette.background),
            align: TextAlign::Center,
            line_height: 1.15,
            component_idx: Some(component_idx),
        });
        track_text(frame, &label, zone, 12.0, false);
    }

    frame.zone_reports.push(ZoneReport {
        id: zone.id.to_string(),
        capacity_used: clamp01(items.len() as f64 / 8.0 + 0.3),
        warnings: Vec::new(),
        content_type: Some("icon-grid".to_string()),
        is_critical_overflow: false,
    });
}

#[allow(clippy::too_many_arguments)]
fn render_chart(
    frame: &mut Frame,
    zone: &Zone,
    component_idx: usize,
    title: &str,
    chart_type: ChartType,
    data: &[ChartDatum],
    style: &StyleGuide,
    palette: &Palette,
    corner_radius: f64,
) {
    let z = frame.next_z();
    frame.primitives.push(Primitive::Shape {
        x: zone.x,
        y: zone.y,
        w: zone.w,
        h: zone.h,
        z_index: z,
        shape: ShapeKind::RoundedRect,
        fill: None,
        stroke: Some(palette.secondary.clone()),
        corner_radius,
        component_idx: Some(component_idx),
    });
    let title_text = truncate_with_ellipsis(title, 80);
    let z = frame.next_z();
    frame.primitives.push(Primitive::Text {
        x: zone.x + 0.1,
        y: zone.y + 0.1,
        w: zone.w - 0.2,
        h: 0.35,
        z_index: z,
        text: title_text.clone(),
        font_family: style.font_family_title.clone(),
        font_size: 14.0,
        weight: 600,
        color: contrast_safe_text(&palette.text, &palette.background),
        align: TextAlign::Left,
        line_height: 1.15,
        component_idx: Some(component_idx),
    });
    track_text(frame, &title_text, zone, 14.0, false);

    let plot_x = zone.x + 0.2;
    let plot_y = zone.y + 0.55;
    let plot_w = zone.w - 0.4;
    let plot_h = zone.h - 0.85;

    match chart_type {
        ChartType::Bar | ChartType::Line => {
            let max_value = data.iter().map(|d| d.value).fold(0.0_f64, f64::max).max(1.0);
            let count = data.len().max(1) as f64;
            let gap = 0.1;
            let bar_w = (plot_w - gap * (count - 1.0)) / count;
            for (i, datum) in data.iter().enumerate() {
                let frac = (datum.value / max_value).clamp(0.0, 1.0);
                let bar_h = (plot_h * frac).max(0.04);
                let bx = plot_x + i as f64 * (bar_w + gap);
                let z = frame.next_z();
                frame.primitives.push(Primitive::Shape {
                    x: bx,
                    y: plot_y + (plot_h - bar_h),
                    w: if chart_type == ChartType::Line {
                        bar_w * 0.3
                    } else {
                        bar_w
                    },
                    h: bar_h,
                    z_index: z,
                    shape: if chart_type == ChartType::Line {
                        ShapeKind::Circle
                    } else {
                        ShapeKind::Rect
                    },
                    fill: Some(palette.primary.clone()),
                    stroke: None,
                    corner_radius: 0.02,
                    component_idx: Some(component_idx),
                });
                let z = frame.next_z();
                frame.primitives.push(Primitive::Text {
                    x: bx,
                    y: plot_y + plot_h + 0.05,
                    w: bar_w,
                    h: 0.25,
                    z_index: z,
                    text: truncate_with_ellipsis(&datum.label, 12),
                    font_family: style.font_family_body.clone(),
                    font_size: 10.0,
                    weight: 400,
                    color: contrast_safe_text(&palette.text, &palette.background),
                    align: TextAlign::Center,
                    line_height: 1.0,
                    component_idx: Some(component_idx),
                });
            }
        }
        ChartType::Pie | ChartType::Doughnut => {
            let diameter = plot_h.min(plot_w * 0.45);
            let z = frame.next_z();
            frame.primitives.push(Primitive::Shape {
                x: plot_x,
                y: plot_y,
                w: diameter,
                h: diameter,
                z_index: z,
                shape: ShapeKind::Circle,
                fill: Some(palette.primary.clone()),
                stroke: Some(palette.accent.clone()),
                corner_radius: 0.0,
                component_idx: Some(component_idx),
            });
            let legend_x = plot_x + diameter + 0.3;
            let mut ly = plot_y;
            for datum in data.iter().take(6) {
                let z = frame.next_z();
                frame.primitives.push(Primitive::Text {
                    x: legend_x,
                    y: ly,
                    w: (zone.x + zone.w - legend_x - 0.1).max(0.5),
                    h: 0.28,
                    z_index: z,
                    text: format!("{}: {}", truncate_with_ellipsis(&datum.label, 20), datum.value),
                    font_family: style.font_family_body.clone(),
                    font_size: 11.0,
                    weight: 400,
                    color: contrast_safe_text(&palette.text, &palette.background),
                    align: TextAlign::Left,
                    line_height: 1.1,
                    component_idx: Some(component_idx),
                });
                ly += 0.32;
            }
        }
    }

    frame.zone_reports.push(ZoneReport {
        id: zone.id.to_string(),
        capacity_used: clamp01(data.len() as f64 / 8.0 + 0.4),
        warnings: Vec::new(),
        content_type: Some("chart-frame".to_string()),
        is_critical_overflow: false,
    });
}

#[allow(clippy::too_many_arguments)]
fn render_diagram(
    frame: &mut Frame,
    zone: &Zone,
    component_idx: usize,
    title: Option<&str>,
    elements: &[String],
    central_theme: Option<&str>,
    style: &StyleGuide,
    palette: &Palette,
    corner_radius: f64,
) {
    let mut top = zone.y;
    if let Some(t) = title {
        let z = frame.next_z();
        frame.primitives.push(Primitive::Text {
            x: zone.x,
            y: top,
            w: zone.w,
            h: 0.3,
            z_index: z,
            text: t.to_string(),
            font_family: style.font_family_title.clone(),
            font_size: 13.0,
            weight: 600,
            color: contrast_safe_text(&palette.text, &palette.background),
            align: TextAlign::Left,
            line_height: 1.1,
            component_idx: Some(component_idx),
        });
        track_text(frame, t, zone, 13.0, false);
        top += 0.4;
    }

    let center_d = 1.1_f64.min(zone.h * 0.4);
    let cx = zone.x + zone.w / 2.0 - center_d / 2.0;
    let cy = top + 0.1;
    let z = frame.next_z();
    frame.primitives.push(Primitive::Shape {
        x: cx,
        y: cy,
        w: center_d,
        h: center_d,
        z_index: z,
        shape: ShapeKind::Circle,
        fill: Some(palette.primary.clone()),
        stroke: None,
        corner_radius: 0.0,
        component_idx: Some(component_idx),
    });
    if let Some(theme) = central_theme {
        let z = frame.next_z();
        frame.primitives.push(Primitive::Text {
            x: cx - 0.2,
            y: cy,
            w: center_d + 0.4,
            h: center_d,
            z_index: z,
            text: truncate_with_ellipsis(theme, 18),
            font_family: style.font_family_body.clone(),
            font_size: 11.0,
            weight: 600,
            color: contrast_safe_text(&palette.text, &palette.primary),
            align: TextAlign::Center,
            line_height: 1.1,
            component_idx: Some(component_idx),
        });
    }

    // Element chips in a row under the hub.
    let count = elements.len().clamp(1, 8) as f64;
    let gap = 0.12;
    let chip_w = (zone.w - gap * (count - 1.0)) / count;
    let chip_y = cy + center_d + 0.25;
    let chip_h = (zone.y + zone.h - chip_y - 0.05).clamp(0.25, 0.6);
    for (i, element) in elements.iter().take(8).enumerate() {
        let ex = zone.x + i as f64 * (chip_w + gap);
        let z = frame.next_z();
        frame.primitives.push(Primitive::Shape {
            x: ex,
            y: chip_y,
            w: chip_w,
            h: chip_h,
            z_index: z,
            shape: ShapeKind::RoundedRect,
            fill: None,
            stroke: Some(palette.secondary.clone()),
            corner_radius,
            component_idx: Some(component_idx),
        });
        let label = truncate_with_ellipsis(element, 16);
        let z = frame.next_z();
        frame.primitives.push(Primitive::Text {
            x: ex + 0.03,
            y: chip_y + 0.03,
            w: chip_w - 0.06,
            h: chip_h - 0.06,
            z_index: z,
            text: label.clone(),
            font_family: style.font_family_body.clone(),
            font_size: 10.0,
            weight: 400,
            color: contrast_safe_text(&palette.text, &palette.background),
            align: TextAlign::Center,
            line_height: 1.1,
            component_idx: Some(component_idx),
        });
        track_text(frame, &label, zone, 10.0, false);
    }

    frame.zone_reports.push(ZoneReport {
        id: zone.id.to_string(),
        capacity_used: clamp01(elements.len() as f64 / 8.0 + 0.35),
        warnings: Vec::new(),
        content_type: Some("diagram-svg".to_string()),
        is_critical_overflow: false,
    });
}

/// Text accounting for the deck-level density estimate.
fn track_text(frame: &mut Frame, text: &str, zone: &Zone, font_size: f64, mono: bool) {
    frame.text_chars += text.chars().count() as f64;
    let lines_capacity = (zone.h / line_height_units(font_size, 1.0)).max(1.0);
    frame.text_capacity += zone.w * chars_per_unit(font_size, mono) * lines_capacity;
}

fn build_environment(
    slide_id: &str,
    template: &super::templates::LayoutTemplate,
    frame: &mut Frame,
    tuning: &TuningTable,
    started: Instant,
) -> EnvironmentState {
    let content_zones: Vec<&Zone> = template
        .zones
        .iter()
        .filter(|z| {
            z.purpose != ZonePurpose::Accent && z.id != "title" && z.id != "hero-title"
        })
        .collect();
    let total_area: f64 = content_zones.iter().map(|z| z.area()).sum();
    let used_area: f64 = content_zones
        .iter()
        .filter(|z| {
            frame
                .zone_reports
                .iter()
                .any(|r| r.id == z.id && r.content_type.is_some())
        })
        .map(|z| z.area())
        .sum();
    let visual_utilization = if total_area > 0.0 {
        clamp01(used_area / total_area)
    } else {
        1.0
    };

    let content_reports: Vec<&ZoneReport> = frame
        .zone_reports
        .iter()
        .filter(|r| r.content_type.as_deref() != Some("decoration"))
        .collect();
    let avg_utilization = if content_reports.is_empty() {
        0.0
    } else {
        content_reports.iter().map(|r| r.capacity_used).sum::<f64>() / content_reports.len() as f64
    };
    let text_density = if frame.text_capacity > 0.0 {
        clamp01(frame.text_chars / frame.text_capacity)
    } else {
        0.0
    };

    // Sparse multi-zone layouts read as broken decks; flag them for reroute.
    let mut sparse_penalty = 0.0;
    if content_zones.len() > 1 {
        if visual_utilization < SPARSE_UTILIZATION {
            frame
                .warnings
                .push("layout is mostly empty for this content".to_string());
            sparse_penalty = 0.4;
        } else if visual_utilization < LOW_UTILIZATION {
            sparse_penalty = 0.15;
        }
    }

    let mut fit_score = 1.0 - 0.05 * frame.warnings.len() as f64 - sparse_penalty;
    if avg_utilization > 0.95 {
        fit_score -= 0.15;
    }
    if text_density > 0.9 {
        fit_score -= 0.1;
    }
    let fit_score = clamp01(fit_score);

    let health_level = if fit_score >= tuning.fit_perfect {
        HealthLevel::Perfect
    } else if fit_score >= tuning.fit_good {
        HealthLevel::Good
    } else if fit_score >= tuning.fit_tight {
        HealthLevel::Tight
    } else {
        HealthLevel::Critical
    };
    let needs_reroute = fit_score < tuning.fit_tight;
    let suggested_action = if fit_score >= tuning.action_keep {
        SuggestedAction::Keep
    } else if fit_score >= tuning.action_scale_down {
        SuggestedAction::ScaleDown
    } else if fit_score >= tuning.action_reroute {
        SuggestedAction::RerouteLayout
    } else {
        SuggestedAction::SimplifyContent
    };
    let reroute_reason = needs_reroute.then(|| {
        if sparse_penalty >= 0.4 {
            format!("layout {} left most zones empty", template.variant.as_str())
        } else {
            format!(
                "fit score {:.2} below threshold on {}",
                fit_score,
                template.variant.as_str()
            )
        }
    });

    let errors_count = frame
        .zone_reports
        .iter()
        .filter(|r| r.is_critical_overflow)
        .count() as u32;

    EnvironmentState {
        slide_id: slide_id.to_string(),
        fit_score,
        text_density,
        visual_utilization,
        zones: frame.zone_reports.clone(),
        health_level,
        needs_reroute,
        reroute_reason,
        suggested_action,
        render_timestamp: Utc::now().to_rfc3339(),
        render_duration_ms: started.elapsed().as_millis() as u64,
        warnings_count: frame.warnings.len() as u32,
        errors_count,
    }
}

/// Warnings produced by the most recent render, exposed for the orchestrator.
/// Re-rendering replaces them; they are never merged with prior runs.
pub fn render_warnings(output: &RenderOutput) -> Vec<String> {
    output
        .environment
        .zones
        .iter()
        .flat_map(|z| z.warnings.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::outline::{ColorPalette, StyleGuide};
    use crate::data_models::slide::{LayoutVariant, SlideComponent, TemplateComponent};
    use crate::spatial::allocator::allocate;
    use crate::spatial::templates::CANVAS_EPSILON;
    use approx::assert_relative_eq;

    fn style() -> StyleGuide {
        StyleGuide {
            theme_name: "Slate".to_string(),
            font_family_title: "Inter".to_string(),
            font_family_body: "Inter".to_string(),
            color_palette: ColorPalette {
                primary: "1D4ED8".to_string(),
                secondary: "60A5FA".to_string(),
                background: "0B1120".to_string(),
                text: "E2E8F0".to_string(),
                accent_high_contrast: "F59E0B".to_string(),
            },
            theme_tokens: None,
        }
    }

    fn bullets(n: usize) -> SlideComponent {
        SlideComponent::from(TemplateComponent::TextBullets {
            title: None,
            content: (0..n)
                .map(|i| format!("Point number {i} with a bit of text"))
                .collect(),
            style: None,
        })
    }

    fn render(variant: LayoutVariant, components: &[SlideComponent]) -> RenderOutput {
        let placement = allocate(variant, "Test Slide", components);
        render_slide("slide-1", &placement, &style(), None, &TuningTable::default())
    }

    #[test]
    fn primitives_stay_inside_the_canvas() {
        for variant in LayoutVariant::ALL {
            let output = render(variant, &[bullets(3)]);
            for primitive in &output.primitives {
                let (x, y, w, h) = primitive.bounds();
                assert!(x >= 0.0 && y >= 0.0, "{variant:?}: negative origin");
                assert!(
                    x + w <= CANVAS_W + CANVAS_EPSILON,
                    "{variant:?}: x overflow at {x}+{w}"
                );
                assert!(
                    y + h <= CANVAS_H + CANVAS_EPSILON,
                    "{variant:?}: y overflow at {y}+{h}"
                );
            }
        }
    }

    #[test]
    fn rendering_is_deterministic_and_warnings_do_not_accumulate() {
        let placement = allocate(LayoutVariant::StandardVertical, "T", &[bullets(4)]);
        let tuning = TuningTable::default();
        let a = render_slide("s", &placement, &style(), None, &tuning);
        let b = render_slide("s", &placement, &style(), None, &tuning);
        assert_eq!(a.primitives, b.primitives);
        assert_eq!(a.environment.warnings_count, b.environment.warnings_count);
        assert_eq!(
            render_warnings(&a),
            render_warnings(&b),
        );
    }

    #[test]
    fn background_is_the_lowest_primitive() {
        let output = render(LayoutVariant::HeroCentered, &[]);
        let Primitive::Shape { z_index, fill, .. } = &output.primitives[0] else {
            panic!("first primitive must be the background shape");
        };
        assert_eq!(*z_index, 0);
        assert_eq!(fill.as_deref(), Some("0B1120"));
    }

    #[test]
    fn background_image_is_emitted_when_present() {
        let placement = allocate(LayoutVariant::HeroCentered, "T", &[]);
        let output = render_slide(
            "s",
            &placement,
            &style(),
            Some("data:image/png;base64,AAAA"),
            &TuningTable::default(),
        );
        assert!(output
            .primitives
            .iter()
            .any(|p| matches!(p, Primitive::Image { .. })));
    }

    #[test]
    fn sparse_bento_is_flagged_for_reroute() {
        let output = render(LayoutVariant::BentoGrid, &[bullets(2)]);
        assert!(output.environment.visual_utilization < 0.5);
        assert_eq!(output.environment.health_level, HealthLevel::Critical);
        assert!(output.environment.needs_reroute);
        assert!(output.environment.reroute_reason.is_some());
    }

    #[test]
    fn filled_bento_is_healthy() {
        let metrics = SlideComponent::from(TemplateComponent::MetricCards {
            intro: None,
            metrics: (0..4)
                .map(|i| crate::data_models::slide::Metric {
                    value: format!("{i}0%"),
                    label: format!("share {i}"),
                    icon: None,
                    trend: None,
                })
                .collect(),
        });
        let output = render(LayoutVariant::BentoGrid, &[metrics]);
        assert!(!output.environment.needs_reroute);
        assert!(matches!(
            output.environment.health_level,
            HealthLevel::Perfect | HealthLevel::Good
        ));
    }

    #[test]
    fn accent_zones_render_decorations() {
        let output = render(LayoutVariant::SplitLeftText, &[bullets(3)]);
        let accent_report = output
            .environment
            .zones
            .iter()
            .find(|z| z.id == "accent-bar")
            .expect("accent report");
        assert_eq!(accent_report.content_type.as_deref(), Some("decoration"));
    }

    #[test]
    fn oversize_factor_hints_are_clamped_for_fit_only() {
        let mut component = bullets(3);
        component.hints.line_height_factor = Some(1.8);
        let inflated = render(LayoutVariant::SplitLeftText, &[component]);
        let baseline = render(LayoutVariant::SplitLeftText, &[bullets(3)]);
        // Visual output honors the hint...
        let hinted_line = inflated.primitives.iter().find_map(|p| match p {
            Primitive::Text { line_height, component_idx: Some(0), .. } => Some(*line_height),
            _ => None,
        });
        assert_relative_eq!(hinted_line.unwrap(), BASE_LINE_FACTOR * 1.8);
        // ...but fit scoring does not get worse than the clamped baseline.
        assert!(inflated.environment.fit_score >= baseline.environment.fit_score - 1e-9);
    }

    #[test]
    fn component_idx_is_stamped_on_component_primitives() {
        let output = render(LayoutVariant::SplitLeftText, &[bullets(2)]);
        let stamped = output
            .primitives
            .iter()
            .filter(|p| match p {
                Primitive::Text { component_idx, .. } => *component_idx == Some(0),
                _ => false,
            })
            .count();
        assert!(stamped >= 2, "each bullet line carries its component_idx");
    }

    #[test]
    fn long_text_in_tiny_zone_warns_instead_of_overflowing() {
        let filler = "and the story keeps going with ever more detail ".repeat(20);
        let component = SlideComponent::from(TemplateComponent::TextBullets {
            title: None,
            content: (0..6)
                .map(|i| format!("Bullet {i}: {filler}"))
                .collect(),
            style: None,
        });
        let output = render(LayoutVariant::HeroCentered, &[component]);
        assert!(output.environment.warnings_count > 0);
        for primitive in &output.primitives {
            let (_, y, _, h) = primitive.bounds();
            assert!(y + h <= CANVAS_H + CANVAS_EPSILON);
        }
    }

    #[test]
    fn contrast_swap_keeps_text_readable_on_light_background() {
        let mut light = style();
        light.color_palette.background = "FFFFFF".to_string();
        light.color_palette.text = "EEEEEE".to_string(); // unreadable on white
        let placement = allocate(LayoutVariant::StandardVertical, "T", &[bullets(2)]);
        let output = render_slide("s", &placement, &light, None, &TuningTable::default());
        let title_color = output.primitives.iter().find_map(|p| match p {
            Primitive::Text { text, color, .. } if text == "T" => Some(color.clone()),
            _ => None,
        });
        assert_eq!(title_color.as_deref(), Some("1A1A1A"));
    }
}
