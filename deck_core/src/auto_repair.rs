//! Deterministic repair of raw generator output, run before schema
//! validation. Handles doubly-encoded payloads, synonym component types,
//! garbage list items, cardinality overshoot, bare string-array components,
//! and `_hint*` field lifting.

use serde_json::{json, Map, Value};

pub const MAX_COMPONENTS: usize = 3;
pub const MAX_BULLETS: usize = 6;
pub const MAX_METRICS: usize = 6;
pub const MIN_METRICS: usize = 2;
pub const MAX_STEPS: usize = 5;
pub const MIN_STEPS: usize = 3;
pub const MAX_GRID_ITEMS: usize = 8;
pub const MIN_GRID_ITEMS: usize = 3;
pub const MAX_DIAGRAM_ELEMENTS: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct RepairOutcome {
    pub value: Value,
    pub warnings: Vec<String>,
}

/// # NDOC
/// component: `auto_repair`
/// purpose: Normalize a raw generator payload into the canonical slide shape.
/// invariants:
///   - Pure and deterministic; never suspends, never calls a model.
///   - Content is repaired or dropped with a warning, never silently lost.
pub fn repair_slide_payload(raw: Value) -> RepairOutcome {
    let mut warnings = Vec::new();
    let mut value = raw;
    deep_parse(&mut value);

    let Value::Object(ref mut obj) = value else {
        // A bare array of strings is a slide that is all bullets.
        if let Value::Array(items) = &value {
            if items.iter().all(|i| i.is_string()) {
                warnings.push("payload was a bare string array; wrapped as text-bullets".to_string());
                let rescued = json!({
                    "title": "",
                    "components": [
                        {"type": "text-bullets", "content": items}
                    ]
                });
                return finish(rescued, warnings);
            }
        }
        warnings.push("payload was not an object".to_string());
        return RepairOutcome { value, warnings };
    };

    normalize_top_level_keys(obj);
    rescue_notes(obj, &mut warnings);

    let raw_components = obj
        .remove("components")
        .and_then(|v| match v {
            Value::Array(items) => Some(items),
            other => Some(vec![other]),
        })
        .unwrap_or_default();

    let mut components = Vec::new();
    for raw_component in raw_components {
        if components.len() >= MAX_COMPONENTS {
            warnings.push(format!(
                "component count exceeded {MAX_COMPONENTS}; extras dropped"
            ));
            break;
        }
        match repair_component(raw_component, &mut warnings) {
            Some(component) => components.push(component),
            None => warnings.push("unrepairable component dropped".to_string()),
        }
    }
    obj.insert("components".to_string(), Value::Array(components));

    finish(value, warnings)
}

fn finish(value: Value, warnings: Vec<String>) -> RepairOutcome {
    RepairOutcome { value, warnings }
}

/// Recursively parse any string field that itself looks like JSON. Models
/// double-encode nested objects under pressure.
pub fn deep_parse(value: &mut Value) {
    match value {
        Value::String(s) => {
            let trimmed = s.trim();
            if (trimmed.starts_with('{') && trimmed.ends_with('}'))
                || (trimmed.starts_with('[') && trimmed.ends_with(']'))
            {
                if let Ok(mut parsed) = serde_json::from_str::<Value>(trimmed) {
                    deep_parse(&mut parsed);
                    *value = parsed;
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                deep_parse(item);
            }
        }
        Value::Object(map) => {
            for (_, v) in map.iter_mut() {
                deep_parse(v);
            }
        }
        _ => {}
    }
}

fn normalize_top_level_keys(obj: &mut Map<String, Value>) {
    for (from, to) in [
        ("slide_title", "title"),
        ("slideTitle", "title"),
        ("speakerNotes", "speaker_notes_lines"),
        ("speaker_notes", "speaker_notes_lines"),
        ("notes", "speaker_notes_lines"),
        ("visualPrompt", "visual_prompt"),
        ("visualReasoning", "visual_reasoning"),
        ("chartSpec", "chart_spec"),
        ("sources", "citations"),
    ] {
        if let Some(v) = obj.remove(from) {
            obj.entry(to.to_string()).or_insert(v);
        }
    }
    if !obj.contains_key("components") {
        if let Some(v) = obj.remove("layout_plan").or_else(|| obj.remove("sections")) {
            if let Value::Object(mut inner) = v {
                if let Some(components) = inner.remove("components") {
                    obj.insert("components".to_string(), components);
                }
            } else {
                obj.insert("components".to_string(), v);
            }
        }
    }
}

/// Speaker notes must be an array of lines. A single long string is split;
/// anything else becomes an empty list.
fn rescue_notes(obj: &mut Map<String, Value>, warnings: &mut Vec<String>) {
    match obj.get("speaker_notes_lines") {
        Some(Value::Array(_)) => {}
        Some(Value::String(s)) => {
            let lines: Vec<Value> = s
                .split('\n')
                .map(|l| l.trim())
                .filter(|l| !l.is_empty())
                .map(|l| Value::String(l.to_string()))
                .collect();
            warnings.push("speaker notes arrived as one string; split into lines".to_string());
            obj.insert("speaker_notes_lines".to_string(), Value::Array(lines));
        }
        Some(_) => {
            warnings.push("speaker notes had an unusable shape; cleared".to_string());
            obj.insert("speaker_notes_lines".to_string(), Value::Array(Vec::new()));
        }
        None => {
            obj.insert("speaker_notes_lines".to_string(), Value::Array(Vec::new()));
        }
    }
}

/// Map the dozens of type names models invent onto the canonical set.
pub fn canonical_type(raw: &str) -> Option<&'static str> {
    let key = raw.trim().to_ascii_lowercase().replace([' ', '_'], "-");
    let canonical = match key.as_str() {
        "title-section" | "title" | "header" | "heading" | "section-title" => "title-section",
        "text-bullets" | "text-block" | "bullets" | "list" | "points" | "bullet-list"
        | "text" | "body-text" | "paragraph" | "bullet-points" | "key-points" => "text-bullets",
        "metric-cards" | "stats" | "kpis" | "numbers" | "metrics" | "stat-cards"
        | "kpi-cards" | "metric" | "big-numbers" => "metric-cards",
        "process-flow" | "steps" | "timeline" | "flow" | "process" | "workflow"
        | "sequence" => "process-flow",
        "icon-grid" | "icons" | "features" | "feature-grid" | "icon-list" => "icon-grid",
        "chart-frame" | "chart" | "graph" | "bar-chart" | "pie-chart" | "line-chart"
        | "data-viz" | "visualization" => "chart-frame",
        "diagram-svg" | "diagram" | "svg" | "mindmap" | "concept-map" => "diagram-svg",
        _ => return None,
    };
    Some(canonical)
}

fn repair_component(raw: Value, warnings: &mut Vec<String>) -> Option<Value> {
    // String-array rescue: a bare list of strings was meant as bullets.
    if let Value::Array(items) = &raw {
        if items.iter().all(|i| i.is_string()) {
            warnings.push("string array rescued into text-bullets".to_string());
            return repair_component(
                json!({"type": "text-bullets", "content": items}),
                warnings,
            );
        }
        return None;
    }
    let Value::Object(mut obj) = raw else {
        return None;
    };

    lift_hints(&mut obj);

    let declared = obj
        .get("type")
        .and_then(|v| v.as_str())
        .unwrap_or_default()
        .to_string();
    let canonical = match canonical_type(&declared) {
        Some(c) => c,
        None => {
            // No usable tag: infer from shape before giving up.
            if obj.contains_key("content") || obj.contains_key("bullets") {
                warnings.push(format!(
                    "unknown component type '{declared}' inferred as text-bullets"
                ));
                "text-bullets"
            } else if obj.contains_key("metrics") {
                warnings.push(format!(
                    "unknown component type '{declared}' inferred as metric-cards"
                ));
                "metric-cards"
            } else {
                return None;
            }
        }
    };
    if canonical != declared {
        obj.insert("type".to_string(), json!(canonical));
    }

    match canonical {
        "title-section" => repair_title_section(&mut obj),
        "text-bullets" => repair_text_bullets(&mut obj, warnings)?,
        "metric-cards" => return repair_metric_cards(obj, warnings),
        "process-flow" => return repair_process_flow(obj, warnings),
        "icon-grid" => return repair_icon_grid(obj, warnings),
        "chart-frame" => repair_chart_frame(&mut obj, warnings),
        "diagram-svg" => repair_diagram(&mut obj, warnings),
        _ => {}
    }
    Some(Value::Object(obj))
}

/// Move `_hint*` keys into the typed `hints` object.
fn lift_hints(obj: &mut Map<String, Value>) {
    let hint_keys: Vec<String> = obj
        .keys()
        .filter(|k| k.starts_with("_hint"))
        .cloned()
        .collect();
    if hint_keys.is_empty() {
        return;
    }
    let mut hints = match obj.remove("hints") {
        Some(Value::Object(m)) => m,
        _ => Map::new(),
    };
    for key in hint_keys {
        let value = obj.remove(&key).unwrap_or(Value::Null);
        let suffix = key
            .trim_start_matches("_hint")
            .trim_start_matches(['_', '-']);
        let field = match suffix.to_ascii_lowercase().replace('-', "_").as_str() {
            "line_height" | "lineheight" | "line_height_factor" => "line_height_factor",
            "item_spacing" | "itemspacing" | "item_spacing_factor" => "item_spacing_factor",
            "padding" | "padding_factor" => "padding_factor",
            "color" => "color",
            "x" => "x",
            "y" => "y",
            "w" | "width" => "w",
            "h" | "height" => "h",
            _ => continue,
        };
        hints.insert(field.to_string(), value);
    }
    if !hints.is_empty() {
        obj.insert("hints".to_string(), Value::Object(hints));
    }
}

/// Drop list entries shorter than 2 chars after trim, and purely numeric
/// strings that were meant as prose.
fn clean_string_list(items: &[Value], warnings: &mut Vec<String>, context: &str) -> Vec<Value> {
    let mut cleaned = Vec::new();
    for item in items {
        let Some(text) = item.as_str() else {
            continue;
        };
        let trimmed = text.trim();
        if trimmed.chars().count() < 2 {
            warnings.push(format!("dropped garbage item in {context}"));
            continue;
        }
        if trimmed.parse::<f64>().is_ok() {
            warnings.push(format!("dropped bare numeric item in {context}"));
            continue;
        }
        cleaned.push(Value::String(trimmed.to_string()));
    }
    cleaned
}

fn clamp_list(obj: &mut Map<String, Value>, key: &str, max: usize, warnings: &mut Vec<String>) {
    if let Some(Value::Array(items)) = obj.get_mut(key) {
        if items.len() > max {
            warnings.push(format!("{key} clamped from {} to {max}", items.len()));
            items.truncate(max);
        }
    }
}

fn truncate_string(obj: &mut Map<String, Value>, key: &str, max_chars: usize) {
    if let Some(Value::String(s)) = obj.get_mut(key) {
        if s.chars().count() > max_chars {
            *s = s.chars().take(max_chars).collect();
        }
    }
}

fn repair_title_section(obj: &mut Map<String, Value>) {
    for (from, to) in [("text", "title"), ("heading", "title"), ("sub", "subtitle")] {
        if let Some(v) = obj.remove(from) {
            obj.entry(to.to_string()).or_insert(v);
        }
    }
    truncate_string(obj, "title", 100);
}

fn repair_text_bullets(obj: &mut Map<String, Value>, warnings: &mut Vec<String>) -> Option<()> {
    for synonym in ["bullets", "points", "items", "lines"] {
        if !obj.contains_key("content") {
            if let Some(v) = obj.remove(synonym) {
                obj.insert("content".to_string(), v);
            }
        }
    }
    let Some(Value::Array(items)) = obj.get("content") else {
        return None;
    };
    let cleaned = clean_string_list(items, warnings, "text-bullets");
    if cleaned.is_empty() {
        return None;
    }
    obj.insert("content".to_string(), Value::Array(cleaned));
    clamp_list(obj, "content", MAX_BULLETS, warnings);
    Some(())
}

fn repair_metric_cards(mut obj: Map<String, Value>, warnings: &mut Vec<String>) -> Option<Value> {
    for synonym in ["stats", "cards", "kpis", "values", "items"] {
        if !obj.contains_key("metrics") {
            if let Some(v) = obj.remove(synonym) {
                obj.insert("metrics".to_string(), v);
            }
        }
    }
    let Some(Value::Array(raw_metrics)) = obj.remove("metrics") else {
        return None;
    };
    let mut metrics = Vec::new();
    for raw in raw_metrics {
        let Value::Object(mut metric) = raw else {
            continue;
        };
        for (from, to) in [("number", "value"), ("stat", "value"), ("name", "label"), ("title", "label")] {
            if let Some(v) = metric.remove(from) {
                metric.entry(to.to_string()).or_insert(v);
            }
        }
        // Values arrive as numbers half the time.
        if let Some(v) = metric.get("value") {
            if !v.is_string() {
                let rendered = v.to_string();
                metric.insert("value".to_string(), Value::String(rendered));
            }
        }
        let has_value = metric.get("value").map(|v| !v.as_str().unwrap_or("").trim().is_empty()).unwrap_or(false);
        let has_label = metric.get("label").and_then(|v| v.as_str()).map(|s| s.trim().chars().count() >= 2).unwrap_or(false);
        if !has_value || !has_label {
            warnings.push("dropped incomplete metric".to_string());
            continue;
        }
        truncate_string(&mut metric, "label", 40);
        metrics.push(Value::Object(metric));
    }
    if metrics.len() > MAX_METRICS {
        warnings.push(format!(
            "metrics clamped from {} to {MAX_METRICS}",
            metrics.len()
        ));
        metrics.truncate(MAX_METRICS);
    }
    if metrics.len() < MIN_METRICS {
        // Too few cards to read as a rail; degrade to bullets.
        warnings.push("metric-cards below minimum cardinality; converted to text-bullets".to_string());
        let bullets: Vec<Value> = metrics
            .iter()
            .filter_map(|m| {
                let value = m.get("value")?.as_str()?;
                let label = m.get("label")?.as_str()?;
                Some(Value::String(format!("{label}: {value}")))
            })
            .collect();
        if bullets.is_empty() {
            return None;
        }
        return Some(json!({"type": "text-bullets", "content": bullets}));
    }
    obj.insert("metrics".to_string(), Value::Array(metrics));
    Some(Value::Object(obj))
}

fn repair_process_flow(mut obj: Map<String, Value>, warnings: &mut Vec<String>) -> Option<Value> {
    for synonym in ["stages", "phases", "items"] {
        if !obj.contains_key("steps") {
            if let Some(v) = obj.remove(synonym) {
                obj.insert("steps".to_string(), v);
            }
        }
    }
    let Some(Value::Array(raw_steps)) = obj.remove("steps") else {
        return None;
    };
    let mut steps = Vec::new();
    for (idx, raw) in raw_steps.into_iter().enumerate() {
        let mut step = match raw {
            Value::Object(m) => m,
            Value::String(s) => {
                let mut m = Map::new();
                m.insert("title".to_string(), Value::String(s));
                m
            }
            _ => continue,
        };
        for (from, to) in [("name", "title"), ("label", "title"), ("detail", "description"), ("text", "description")] {
            if let Some(v) = step.remove(from) {
                step.entry(to.to_string()).or_insert(v);
            }
        }
        step.entry("number".to_string())
            .or_insert(json!(idx as u64 + 1));
        step.entry("description".to_string())
            .or_insert(Value::String(String::new()));
        let usable = step
            .get("title")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().chars().count() >= 2)
            .unwrap_or(false);
        if !usable {
            warnings.push("dropped incomplete process step".to_string());
            continue;
        }
        truncate_string(&mut step, "title", 30);
        truncate_string(&mut step, "description", 80);
        steps.push(Value::Object(step));
        if steps.len() == MAX_STEPS {
            break;
        }
    }
    if steps.len() < MIN_STEPS {
        warnings.push("process-flow below minimum cardinality; converted to text-bullets".to_string());
        let bullets: Vec<Value> = steps
            .iter()
            .filter_map(|s| s.get("title")?.as_str().map(|t| Value::String(t.to_string())))
            .collect();
        if bullets.is_empty() {
            return None;
        }
        return Some(json!({"type": "text-bullets", "content": bullets}));
    }
    obj.insert("steps".to_string(), Value::Array(steps));
    Some(Value::Object(obj))
}

fn repair_icon_grid(mut obj: Map<String, Value>, warnings: &mut Vec<String>) -> Option<Value> {
    for synonym in ["icons", "features", "entries"] {
        if !obj.contains_key("items") {
            if let Some(v) = obj.remove(synonym) {
                obj.insert("items".to_string(), v);
            }
        }
    }
    let Some(Value::Array(raw_items)) = obj.remove("items") else {
        return None;
    };
    let mut items = Vec::new();
    for raw in raw_items {
        let mut item = match raw {
            Value::Object(m) => m,
            Value::String(s) => {
                let mut m = Map::new();
                m.insert("label".to_string(), Value::String(s));
                m
            }
            _ => continue,
        };
        for (from, to) in [("name", "label"), ("title", "label"), ("text", "description")] {
            if let Some(v) = item.remove(from) {
                item.entry(to.to_string()).or_insert(v);
            }
        }
        item.entry("icon".to_string())
            .or_insert(Value::String("●".to_string()));
        let usable = item
            .get("label")
            .and_then(|v| v.as_str())
            .map(|s| s.trim().chars().count() >= 2)
            .unwrap_or(false);
        if !usable {
            warnings.push("dropped incomplete icon item".to_string());
            continue;
        }
        truncate_string(&mut item, "label", 40);
        items.push(Value::Object(item));
        if items.len() == MAX_GRID_ITEMS {
            break;
        }
    }
    if items.len() < MIN_GRID_ITEMS {
        warnings.push("icon-grid below minimum cardinality; converted to text-bullets".to_string());
        let bullets: Vec<Value> = items
            .iter()
            .filter_map(|i| i.get("label")?.as_str().map(|l| Value::String(l.to_string())))
            .collect();
        if bullets.is_empty() {
            return None;
        }
        return Some(json!({"type": "text-bullets", "content": bullets}));
    }
    let cols = obj
        .get("cols")
        .and_then(|v| v.as_u64())
        .unwrap_or_else(|| (items.len() as u64 + 1) / 2)
        .clamp(2, 4);
    obj.insert("cols".to_string(), json!(cols));
    obj.insert("items".to_string(), Value::Array(items));
    Some(Value::Object(obj))
}

fn repair_chart_frame(obj: &mut Map<String, Value>, warnings: &mut Vec<String>) {
    for synonym in ["values", "series", "points"] {
        if !obj.contains_key("data") {
            if let Some(v) = obj.remove(synonym) {
                obj.insert("data".to_string(), v);
            }
        }
    }
    let chart_type = obj
        .get("chart_type")
        .or_else(|| obj.get("chartType"))
        .and_then(|v| v.as_str())
        .unwrap_or("bar")
        .to_ascii_lowercase();
    let canonical = match chart_type.as_str() {
        "bar" | "column" => "bar",
        "pie" => "pie",
        "line" | "area" => "line",
        "doughnut" | "donut" => "doughnut",
        _ => "bar",
    };
    obj.remove("chartType");
    obj.insert("chart_type".to_string(), json!(canonical));
    obj.entry("title".to_string())
        .or_insert(Value::String("Data".to_string()));
    truncate_string(obj, "title", 80);

    if let Some(Value::Array(data)) = obj.get_mut("data") {
        let mut cleaned = Vec::new();
        for datum in data.iter() {
            let Value::Object(point) = datum else { continue };
            let label = point.get("label").and_then(|v| v.as_str());
            let value = point.get("value").and_then(|v| {
                v.as_f64()
                    .or_else(|| v.as_str().and_then(|s| s.trim_end_matches('%').parse().ok()))
            });
            if let (Some(label), Some(value)) = (label, value) {
                cleaned.push(json!({"label": label, "value": value}));
            } else {
                warnings.push("dropped unplottable chart datum".to_string());
            }
        }
        *data = cleaned;
    } else {
        obj.insert("data".to_string(), Value::Array(Vec::new()));
    }
}

fn repair_diagram(obj: &mut Map<String, Value>, warnings: &mut Vec<String>) {
    for synonym in ["nodes", "items", "parts"] {
        if !obj.contains_key("elements") {
            if let Some(v) = obj.remove(synonym) {
                obj.insert("elements".to_string(), v);
            }
        }
    }
    obj.entry("diagram_type".to_string())
        .or_insert(Value::String("concept".to_string()));
    if let Some(Value::Array(elements)) = obj.get("elements") {
        let cleaned = clean_string_list(elements, warnings, "diagram-svg");
        obj.insert("elements".to_string(), Value::Array(cleaned));
    } else {
        obj.insert("elements".to_string(), Value::Array(Vec::new()));
    }
    clamp_list(obj, "elements", MAX_DIAGRAM_ELEMENTS, warnings);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::slide::SlideComponent;

    fn components_of(outcome: &RepairOutcome) -> &Vec<Value> {
        outcome.value["components"].as_array().expect("components")
    }

    #[test]
    fn synonym_types_are_normalized() {
        let raw = json!({
            "title": "S",
            "components": [
                {"type": "bullet_list", "content": ["first point", "second point"]},
                {"type": "kpis", "metrics": [
                    {"value": "42%", "label": "share"},
                    {"value": "7", "label": "years"}
                ]}
            ]
        });
        let outcome = repair_slide_payload(raw);
        let components = components_of(&outcome);
        assert_eq!(components[0]["type"], "text-bullets");
        assert_eq!(components[1]["type"], "metric-cards");
        // Everything deserializes into the typed union afterwards.
        for c in components {
            serde_json::from_value::<SlideComponent>(c.clone()).expect("typed component");
        }
    }

    #[test]
    fn doubly_encoded_component_is_deep_parsed() {
        let inner = r#"{"type": "text-bullets", "content": ["alpha point", "beta point"]}"#;
        let raw = json!({"title": "S", "components": [inner]});
        let outcome = repair_slide_payload(raw);
        assert_eq!(components_of(&outcome)[0]["type"], "text-bullets");
    }

    #[test]
    fn garbage_items_are_dropped_with_warnings() {
        let raw = json!({
            "title": "S",
            "components": [
                {"type": "text-bullets", "content": ["ok point here", "x", "12345", "  "]}
            ]
        });
        let outcome = repair_slide_payload(raw);
        let content = components_of(&outcome)[0]["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert!(outcome.warnings.iter().any(|w| w.contains("garbage")));
        assert!(outcome.warnings.iter().any(|w| w.contains("numeric")));
    }

    #[test]
    fn cardinalities_are_clamped_to_schema_maxima() {
        let bullets: Vec<String> = (0..10).map(|i| format!("point number {i}")).collect();
        let metrics: Vec<Value> = (0..9)
            .map(|i| json!({"value": format!("{i}%"), "label": format!("metric {i}")}))
            .collect();
        let raw = json!({
            "title": "S",
            "components": [
                {"type": "text-bullets", "content": bullets},
                {"type": "metric-cards", "metrics": metrics},
                {"type": "text-bullets", "content": ["a real point", "another point"]},
                {"type": "text-bullets", "content": ["overflow component"]}
            ]
        });
        let outcome = repair_slide_payload(raw);
        let components = components_of(&outcome);
        assert_eq!(components.len(), MAX_COMPONENTS);
        assert_eq!(
            components[0]["content"].as_array().unwrap().len(),
            MAX_BULLETS
        );
        assert_eq!(
            components[1]["metrics"].as_array().unwrap().len(),
            MAX_METRICS
        );
    }

    #[test]
    fn string_array_component_is_rescued_as_bullets() {
        let raw = json!({
            "title": "S",
            "components": [["first rescued point", "second rescued point"]]
        });
        let outcome = repair_slide_payload(raw);
        let components = components_of(&outcome);
        assert_eq!(components[0]["type"], "text-bullets");
        assert_eq!(components[0]["content"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn bare_string_payload_notes_are_split_into_lines() {
        let raw = json!({
            "title": "S",
            "components": [{"type": "text-bullets", "content": ["a solid point"]}],
            "speaker_notes_lines": "line one\nline two\n\nline three"
        });
        let outcome = repair_slide_payload(raw);
        let notes = outcome.value["speaker_notes_lines"].as_array().unwrap();
        assert_eq!(notes.len(), 3);
    }

    #[test]
    fn hints_are_lifted_from_underscore_fields() {
        let raw = json!({
            "title": "S",
            "components": [{
                "type": "text-bullets",
                "content": ["pointed content"],
                "_hint_line_height": 0.9,
                "_hint_color": "#FF0000",
                "_hint_w": 4.5
            }]
        });
        let outcome = repair_slide_payload(raw);
        let hints = &components_of(&outcome)[0]["hints"];
        assert_eq!(hints["line_height_factor"], json!(0.9));
        assert_eq!(hints["color"], json!("#FF0000"));
        assert_eq!(hints["w"], json!(4.5));
    }

    #[test]
    fn two_step_flow_degrades_to_bullets() {
        let raw = json!({
            "title": "S",
            "components": [{
                "type": "process-flow",
                "steps": [
                    {"title": "Gather input"},
                    {"title": "Ship result"}
                ]
            }]
        });
        let outcome = repair_slide_payload(raw);
        assert_eq!(components_of(&outcome)[0]["type"], "text-bullets");
        assert!(outcome
            .warnings
            .iter()
            .any(|w| w.contains("minimum cardinality")));
    }

    #[test]
    fn chart_type_synonyms_resolve() {
        let raw = json!({
            "title": "S",
            "components": [{
                "type": "chart",
                "chartType": "donut",
                "values": [
                    {"label": "a", "value": "40%"},
                    {"label": "b", "value": 60}
                ]
            }]
        });
        let outcome = repair_slide_payload(raw);
        let chart = &components_of(&outcome)[0];
        assert_eq!(chart["type"], "chart-frame");
        assert_eq!(chart["chart_type"], "doughnut");
        assert_eq!(chart["data"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn repair_is_idempotent() {
        let raw = json!({
            "title": "S",
            "components": [
                {"type": "points", "content": ["alpha point", "beta point"]}
            ],
            "speaker_notes_lines": "one line\nanother line"
        });
        let first = repair_slide_payload(raw);
        let second = repair_slide_payload(first.value.clone());
        assert_eq!(first.value, second.value);
    }
}
