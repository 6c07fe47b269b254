use crate::contracts::PipelineError;

/// # NDOC
/// component: `invariants`
/// purpose: Shared invariant checks used by multiple pipeline stages.
/// invariants:
///   - Validation helpers must return `PipelineError::validation` for caller-safe failures.
///   - Helpers must not perform I/O or mutate external state.
pub fn ensure_non_empty_trimmed(value: &str, field: &str) -> Result<(), PipelineError> {
    if value.trim().is_empty() {
        return Err(PipelineError::validation(format!(
            "'{}' cannot be empty",
            field
        )));
    }
    Ok(())
}

/// # NDOC
/// component: `invariants`
/// purpose: Enforce an inclusive numeric bound with a user-safe error.
pub fn ensure_range_usize(
    value: usize,
    min: usize,
    max: usize,
    name: &str,
) -> Result<(), PipelineError> {
    if value < min || value > max {
        return Err(PipelineError::validation(format!(
            "'{}' must be in range {}..={}",
            name, min, max
        )));
    }
    Ok(())
}

/// # NDOC
/// component: `invariants`
/// purpose: Enforce a finite unit-interval value for scores and budgets.
pub fn ensure_unit_f64(value: f64, name: &str) -> Result<(), PipelineError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(PipelineError::validation(format!(
            "'{}' must be finite and in [0.0, 1.0]",
            name
        )));
    }
    Ok(())
}

/// # NDOC
/// component: `invariants`
/// purpose: Ensure a color field is already in canonical 6-hex uppercase form.
/// invariants:
///   - Canonical form carries no `#` prefix; normalization happens upstream.
pub fn ensure_canonical_hex(value: &str, field: &str) -> Result<(), PipelineError> {
    let ok = value.len() == 6
        && value
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c));
    if !ok {
        return Err(PipelineError::validation(format!(
            "'{}' must be 6 uppercase hex digits without '#', got '{}'",
            field, value
        )));
    }
    Ok(())
}

pub fn clamp01(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}
