//! Prompt registry for every agent in the pipeline.
//!
//! All long-form instructions live here, keyed by agent name; agents inject
//! dynamic context through `render`. This keeps the orchestrator skinny and
//! makes prompt drift reviewable in one place.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static REGISTRY: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut m = HashMap::new();
    m.insert("researcher", RESEARCHER);
    m.insert("architect", ARCHITECT);
    m.insert("router", ROUTER);
    m.insert("content_planner", CONTENT_PLANNER);
    m.insert("composition_architect", COMPOSITION_ARCHITECT);
    m.insert("visual_designer", VISUAL_DESIGNER);
    m.insert("visual_designer_critique", VISUAL_DESIGNER_CRITIQUE);
    m.insert("generator", GENERATOR);
    m.insert("json_repair", JSON_REPAIR);
    m.insert("vision_critique", VISION_CRITIQUE);
    m
});

/// Look up the instruction template for an agent. Unknown names are a
/// programming error, not a runtime condition.
pub fn prompt_for(agent: &str) -> &'static str {
    REGISTRY
        .get(agent)
        .copied()
        .unwrap_or_else(|| panic!("no prompt registered for agent '{agent}'"))
}

/// Replace `{{key}}` placeholders with provided values. Unmatched
/// placeholders are left intact so missing context is visible in logs.
pub fn render(template: &str, context: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (key, value) in context {
        out = out.replace(&format!("{{{{{key}}}}}"), value);
    }
    out
}

const RESEARCHER: &str = r#"You are a research analyst preparing source material for a slide deck.

Topic: {{topic}}

Produce 8 to 12 verified, high-signal facts about the topic. Prefer
statistics with concrete numeric values. For each fact emit:
- id: short stable identifier (e.g. "fact-01")
- category: one-word grouping (e.g. "milestone", "market", "technology")
- claim: one clear prose sentence
- value: the numeric or short string value when applicable, else null
- source: the URL or citation the claim is grounded on
- confidence: "high", "medium", or "low" as your own rating

Rules: no speculation presented as fact, no duplicate claims, no marketing
language. Return only the JSON object with a "facts" array."#;

const ARCHITECT: &str = r#"You are a presentation architect designing the narrative structure of a deck.

Topic: {{topic}}

Fact sheet:
{{facts}}

Tasks, all required:
1. Group the facts into 2 to 4 clusters with unique ids and a short theme each.
2. Author a narrative arc: intro, problem, solution, data, conclusion.
3. Design one coherent style guide: theme name, title and body font
   families, and a five-color palette (primary, secondary, background,
   text, accent_high_contrast) as hex strings.
4. Plan 5 to 8 slides. For each slide give order, type (one of
   title-slide, section-header, content-main, data-viz, conclusion),
   title, purpose, and relevant_cluster_ids scoping what the slide may use.

Every relevant_cluster_id must reference a cluster you defined. Return only
the JSON object."#;

const ROUTER: &str = r#"You are a layout router deciding how one slide should be rendered.

Slide title: {{title}}
Slide type: {{slide_type}}
Slide purpose: {{purpose}}
Available facts: {{fact_count}}
Forbidden layout variants: {{avoid}}

Decision protocol:
- title or conclusion slides: hero-centered
- comparison or feature framing: split-left-text or split-right-text
- a list of 3 or more parallel items: bento-grid
- step-by-step or chronological content: timeline-horizontal
- otherwise: standard-vertical

Never pick a forbidden variant. Also choose render_mode (statement,
infographic, data-viz, standard), a one-sentence layout_intent, a
density_budget (max_chars, max_items, min_visuals), and visual_focus.
Return only the JSON object."#;

const CONTENT_PLANNER: &str = r#"You are a content planner extracting the substance for one slide.

Slide title: {{title}}
Slide purpose: {{purpose}}
Layout variant: {{layout_variant}}
Density budget: at most {{max_chars}} characters, at most {{max_items}} items.

Facts in scope (use nothing else):
{{facts}}

Emit at most 5 key_points (short declarative lines) and at most 4
data_points ({label, value}, label 40 chars max). Include a narrative
sentence when the slide benefits from one, and a chart_spec (chart_type one
of bar, pie, line, doughnut) only when the data is genuinely plottable.
Return only the JSON object."#;

const COMPOSITION_ARCHITECT: &str = r#"You are a composition architect planning the visual anatomy of one slide.

Slide title: {{title}}
Render mode: {{render_mode}}
Layout variant: {{layout_variant}}
Style DNA: {{style_dna}}
Variation budget (already scaled): {{variation_budget}}
Surprises already used in this deck: {{used_surprises}}
Position in deck: slide {{position}} of {{total}} ({{arc_stage}})

Plan:
- background: type (solid, gradient, image, mesh) and one-line suggestion
- up to 4 decorative_elements with type, placement, purpose
- content_structure: pattern (single-hero, card-row, card-grid,
  split-content, metrics-rail, narrative-flow) plus card/text counts
- serendipity_plan: the variation_budget you were given and up to 2
  allocated_surprises drawn from: {{allowed_surprises}}

Respect the narrative arc: opening slides stay subtle, the middle may
climax, the close resolves. Never repeat a used surprise. Return only the
JSON object."#;

const VISUAL_DESIGNER: &str = r#"You are a visual designer producing the spatial and color direction for one slide.

Slide title: {{title}}
Layout variant: {{layout_variant}}
Content summary: {{content_summary}}
Composition: {{composition_summary}}
Deck palette: {{palette}}

Produce:
- spatial_strategy: ordered zone emphasis, hierarchy statement, and a
  negative-space plan
- color_harmony: primary, accent, background_tone (hex or CSS color)
- negative_space_allocation: a percentage string such as "25%"
- background_treatment: one sentence
- foreground_elements: up to 5 short element descriptions

Return only the JSON object."#;

const VISUAL_DESIGNER_CRITIQUE: &str = r#"Review this visual design spec against the slide content. Reply with the
single word ACCEPT if it is coherent, balanced, and inside the layout's
capacity; otherwise reply REVISE followed by one sentence naming the
biggest problem.

Spec: {{spec}}
Content summary: {{content_summary}}"#;

const GENERATOR: &str = r#"You are a slide generator emitting the final typed slide node.

Slide title: {{title}}
Slide type: {{slide_type}}
Purpose: {{purpose}}
Layout variant: {{layout_variant}}
Render mode: {{render_mode}}
Content plan: {{content_plan}}
Visual direction: {{visual_direction}}
Narrative so far:
{{narrative_trail}}

Facts in scope with sources:
{{facts}}

Hard constraints, apply before emitting:
- 1 to 3 components, chosen from: title-section, text-bullets,
  metric-cards, process-flow, icon-grid, chart-frame, diagram-svg
- max 4 items in any component list
- max 15 words in any description string
- no repeated sentences, no filler
- speaker_notes_lines is an ARRAY of short lines, never one long string
- cite sources for every factual claim in the citations array
- stop immediately once the required fields are filled

Also emit visual_reasoning (one sentence) and visual_prompt (an image
prompt describing an abstract background matching the mood, no text in the
image). Return only the JSON object."#;

const JSON_REPAIR: &str = r#"The following model output should conform to the JSON schema but does not
parse. Re-emit it as strictly valid JSON matching the schema. Preserve all
salvageable content, drop anything irreparable, invent nothing new.

Schema:
{{schema}}

Broken output:
{{broken_payload}}

Return only the corrected JSON."#;

const VISION_CRITIQUE: &str = r#"You are reviewing a rendered slide image for spatial problems.

Layout variant: {{layout_variant}}
Declared zones: {{zones}}

Identify:
- overflow_regions: normalized bounding boxes [x, y, w, h] in 0..1 where
  text or shapes escape their zone
- density_hotspots: boxes where elements crowd together
- aesthetic_score: 0 to 100
- findings: list of {code, message, confidence, action} where code is one
  of BULLET_TOO_LONG, TOTAL_CHARS_OVERFLOW, BULLET_COUNT_OVERFLOW,
  ELEMENT_DENSITY_HIGH, CONTRAST_LOW and action is one of prune,
  summarize, change_layout

Return only the JSON object."#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_registered_prompt_is_nonempty() {
        for agent in [
            "researcher",
            "architect",
            "router",
            "content_planner",
            "composition_architect",
            "visual_designer",
            "visual_designer_critique",
            "generator",
            "json_repair",
            "vision_critique",
        ] {
            assert!(!prompt_for(agent).trim().is_empty(), "{agent} empty");
        }
    }

    #[test]
    fn render_replaces_placeholders() {
        let out = render("Topic: {{topic}} ({{topic}})", &[("topic", "flight")]);
        assert_eq!(out, "Topic: flight (flight)");
    }

    #[test]
    fn render_leaves_unknown_placeholders_visible() {
        let out = render("{{missing}}", &[("topic", "flight")]);
        assert_eq!(out, "{{missing}}");
    }
}
