use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

/// Per-model breaker record.
#[derive(Debug, Clone)]
struct BreakerState {
    failure_count: u32,
    cooldown_until: Option<DateTime<Utc>>,
}

/// # NDOC
/// component: `circuit_breaker`
/// purpose: Short-circuit calls to a degraded model for a cooldown window
/// after repeated transient failures.
/// invariants:
///   - While `now < cooldown_until`, the gateway silently downgrades to the
///     next model in the fallback chain.
///   - A success resets the failure count but never an active cooldown.
#[derive(Debug)]
pub struct CircuitBreakerSet {
    states: HashMap<String, BreakerState>,
    threshold: u32,
    cooldown: Duration,
}

impl CircuitBreakerSet {
    pub fn new(threshold: u32, cooldown_secs: i64) -> Self {
        Self {
            states: HashMap::new(),
            threshold,
            cooldown: Duration::seconds(cooldown_secs),
        }
    }

    pub fn is_open(&self, model_id: &str, now: DateTime<Utc>) -> bool {
        self.states
            .get(model_id)
            .and_then(|s| s.cooldown_until)
            .map(|until| now < until)
            .unwrap_or(false)
    }

    /// Returns `true` when this failure trips the breaker.
    pub fn record_failure(&mut self, model_id: &str, now: DateTime<Utc>) -> bool {
        let state = self
            .states
            .entry(model_id.to_string())
            .or_insert(BreakerState {
                failure_count: 0,
                cooldown_until: None,
            });
        state.failure_count += 1;
        if state.failure_count >= self.threshold {
            state.cooldown_until = Some(now + self.cooldown);
            state.failure_count = 0;
            return true;
        }
        false
    }

    pub fn record_success(&mut self, model_id: &str) {
        if let Some(state) = self.states.get_mut(model_id) {
            state.failure_count = 0;
        }
    }

    pub fn cooldown_secs(&self) -> i64 {
        self.cooldown.num_seconds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trips_after_threshold_failures() {
        let mut breakers = CircuitBreakerSet::new(3, 60);
        let now = Utc::now();
        assert!(!breakers.record_failure("m", now));
        assert!(!breakers.record_failure("m", now));
        assert!(breakers.record_failure("m", now));
        assert!(breakers.is_open("m", now));
    }

    #[test]
    fn cooldown_expires() {
        let mut breakers = CircuitBreakerSet::new(1, 60);
        let now = Utc::now();
        breakers.record_failure("m", now);
        assert!(breakers.is_open("m", now));
        assert!(!breakers.is_open("m", now + Duration::seconds(61)));
    }

    #[test]
    fn success_resets_failure_count() {
        let mut breakers = CircuitBreakerSet::new(3, 60);
        let now = Utc::now();
        breakers.record_failure("m", now);
        breakers.record_failure("m", now);
        breakers.record_success("m");
        assert!(!breakers.record_failure("m", now));
        assert!(!breakers.is_open("m", now));
    }

    #[test]
    fn models_are_tracked_independently() {
        let mut breakers = CircuitBreakerSet::new(1, 60);
        let now = Utc::now();
        breakers.record_failure("a", now);
        assert!(breakers.is_open("a", now));
        assert!(!breakers.is_open("b", now));
    }
}
