use crate::auto_repair::{
    MAX_BULLETS, MAX_COMPONENTS, MAX_DIAGRAM_ELEMENTS, MAX_GRID_ITEMS, MAX_METRICS, MAX_STEPS,
    MIN_GRID_ITEMS, MIN_METRICS, MIN_STEPS,
};
use crate::contracts::PipelineError;
use crate::data_models::slide::{LayoutPlan, TemplateComponent};

/// # NDOC
/// component: `schema_validation`
/// purpose: Enforce per-variant cardinalities on the repaired layout plan.
/// invariants:
///   - Soft violations become warnings on the slide.
///   - Critical violations (no usable components) escalate to a fallback slide.
pub fn validate_layout_plan(plan: &LayoutPlan) -> Result<Vec<String>, PipelineError> {
    if plan.components.is_empty() {
        return Err(PipelineError::validation(
            "slide has no usable components after repair",
        ));
    }
    if plan.components.len() > MAX_COMPONENTS {
        return Err(PipelineError::validation(format!(
            "slide has {} components; maximum is {MAX_COMPONENTS}",
            plan.components.len()
        )));
    }

    let mut warnings = Vec::new();
    for (idx, component) in plan.components.iter().enumerate() {
        validate_component(idx, &component.spec, &mut warnings)?;
    }
    Ok(warnings)
}

fn validate_component(
    idx: usize,
    component: &TemplateComponent,
    warnings: &mut Vec<String>,
) -> Result<(), PipelineError> {
    match component {
        TemplateComponent::TitleSection { title, .. } => {
            if title.trim().is_empty() {
                return Err(PipelineError::validation(format!(
                    "component {idx}: title-section with empty title"
                )));
            }
            if title.chars().count() > 100 {
                warnings.push(format!("component {idx}: title exceeds 100 chars"));
            }
        }
        TemplateComponent::TextBullets { content, .. } => {
            if content.is_empty() {
                return Err(PipelineError::validation(format!(
                    "component {idx}: text-bullets with no content"
                )));
            }
            if content.len() > MAX_BULLETS {
                warnings.push(format!(
                    "component {idx}: {} bullets exceed maximum {MAX_BULLETS}",
                    content.len()
                ));
            }
        }
        TemplateComponent::MetricCards { metrics, .. } => {
            if !(MIN_METRICS..=MAX_METRICS).contains(&metrics.len()) {
                warnings.push(format!(
                    "component {idx}: metric count {} outside {MIN_METRICS}..={MAX_METRICS}",
                    metrics.len()
                ));
            }
            for metric in metrics {
                if metric.label.chars().count() > 40 {
                    warnings.push(format!("component {idx}: metric label exceeds 40 chars"));
                }
            }
        }
        TemplateComponent::ProcessFlow { steps, .. } => {
            if !(MIN_STEPS..=MAX_STEPS).contains(&steps.len()) {
                warnings.push(format!(
                    "component {idx}: step count {} outside {MIN_STEPS}..={MAX_STEPS}",
                    steps.len()
                ));
            }
            for step in steps {
                if step.title.chars().count() > 30 {
                    warnings.push(format!("component {idx}: step title exceeds 30 chars"));
                }
                if step.description.chars().count() > 80 {
                    warnings.push(format!(
                        "component {idx}: step description exceeds 80 chars"
                    ));
                }
            }
        }
        TemplateComponent::IconGrid { cols, items, .. } => {
            if !(2..=4).contains(cols) {
                warnings.push(format!("component {idx}: cols {} outside 2..=4", cols));
            }
            if !(MIN_GRID_ITEMS..=MAX_GRID_ITEMS).contains(&items.len()) {
                warnings.push(format!(
                    "component {idx}: item count {} outside {MIN_GRID_ITEMS}..={MAX_GRID_ITEMS}",
                    items.len()
                ));
            }
        }
        TemplateComponent::ChartFrame { title, data, .. } => {
            if title.chars().count() > 80 {
                warnings.push(format!("component {idx}: chart title exceeds 80 chars"));
            }
            if data.is_empty() {
                warnings.push(format!("component {idx}: chart-frame has no data"));
            }
        }
        TemplateComponent::DiagramSvg { elements, .. } => {
            if elements.len() > MAX_DIAGRAM_ELEMENTS || elements.len() < 3 {
                warnings.push(format!(
                    "component {idx}: diagram element count {} outside 3..={MAX_DIAGRAM_ELEMENTS}",
                    elements.len()
                ));
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data_models::slide::{
        BackgroundPlan, BackgroundType, Metric, SlideComponent,
    };

    fn plan_with(components: Vec<SlideComponent>) -> LayoutPlan {
        LayoutPlan {
            title: "T".to_string(),
            components,
            background: BackgroundPlan {
                background_type: BackgroundType::Solid,
                suggestion: "flat".to_string(),
            },
        }
    }

    #[test]
    fn empty_component_list_is_critical() {
        let err = validate_layout_plan(&plan_with(vec![])).expect_err("must fail");
        assert!(err.message.contains("no usable components"));
    }

    #[test]
    fn valid_plan_produces_no_warnings() {
        let plan = plan_with(vec![SlideComponent::from(TemplateComponent::TextBullets {
            title: None,
            content: vec!["alpha".to_string(), "beta".to_string()],
            style: None,
        })]);
        let warnings = validate_layout_plan(&plan).expect("valid");
        assert!(warnings.is_empty());
    }

    #[test]
    fn single_metric_yields_warning_not_error() {
        let plan = plan_with(vec![SlideComponent::from(TemplateComponent::MetricCards {
            intro: None,
            metrics: vec![Metric {
                value: "1".to_string(),
                label: "lonely".to_string(),
                icon: None,
                trend: None,
            }],
        })]);
        let warnings = validate_layout_plan(&plan).expect("soft failure only");
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].contains("metric count"));
    }

    #[test]
    fn empty_bullets_are_critical() {
        let plan = plan_with(vec![SlideComponent::from(TemplateComponent::TextBullets {
            title: None,
            content: vec![],
            style: None,
        })]);
        assert!(validate_layout_plan(&plan).is_err());
    }
}
