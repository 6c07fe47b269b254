use crate::config::PricingTable;
use chrono::Utc;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One accounted LLM call or image generation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageRecord {
    pub timestamp: String,
    pub model_id: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub images: u32,
    pub cost_usd: Decimal,
}

/// # NDOC
/// component: `cost_tracker`
/// purpose: Per-deck spend ledger keyed by the immutable pricing table.
/// invariants:
///   - `total_cost` is non-decreasing; records are append-only.
///   - Accumulation is commutative; callers rely on no ordering.
#[derive(Debug, Clone)]
pub struct CostTracker {
    pricing: PricingTable,
    records: Vec<UsageRecord>,
    total: Decimal,
}

impl CostTracker {
    pub fn new(pricing: PricingTable) -> Self {
        Self {
            pricing,
            records: Vec::new(),
            total: Decimal::ZERO,
        }
    }

    /// Record token usage from a successful chat call and return its cost.
    pub fn record_usage(&mut self, model_id: &str, input_tokens: u32, output_tokens: u32) -> Decimal {
        let cost = self.pricing.token_cost(model_id, input_tokens, output_tokens);
        self.records.push(UsageRecord {
            timestamp: Utc::now().to_rfc3339(),
            model_id: model_id.to_string(),
            input_tokens,
            output_tokens,
            images: 0,
            cost_usd: cost,
        });
        self.total += cost;
        cost
    }

    /// Record one generated image against the per-image price.
    pub fn record_image(&mut self, model_id: &str) -> Decimal {
        let cost = self.pricing.image_cost(model_id);
        self.records.push(UsageRecord {
            timestamp: Utc::now().to_rfc3339(),
            model_id: model_id.to_string(),
            input_tokens: 0,
            output_tokens: 0,
            images: 1,
            cost_usd: cost,
        });
        self.total += cost;
        cost
    }

    pub fn total_cost(&self) -> Decimal {
        self.total
    }

    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PricingTable;

    #[test]
    fn total_is_non_decreasing_across_records() {
        let mut tracker = CostTracker::new(PricingTable::builtin());
        let mut previous = tracker.total_cost();
        for _ in 0..5 {
            tracker.record_usage("gemini-2.5-flash", 500, 200);
            assert!(tracker.total_cost() >= previous);
            previous = tracker.total_cost();
        }
        tracker.record_image("imagen-3.0-fast");
        assert!(tracker.total_cost() > previous);
    }

    #[test]
    fn image_cost_comes_from_per_image_price() {
        let mut tracker = CostTracker::new(PricingTable::builtin());
        let cost = tracker.record_image("imagen-3.0-fast");
        assert_eq!(cost, Decimal::new(2, 2));
    }

    #[test]
    fn cheaper_model_accrues_less() {
        let table = PricingTable::builtin();
        let mut a = CostTracker::new(table.clone());
        let mut b = CostTracker::new(table);
        a.record_usage("gemini-2.5-pro", 1000, 1000);
        b.record_usage("gemini-2.5-flash-lite", 1000, 1000);
        assert!(a.total_cost() > b.total_cost());
    }
}
