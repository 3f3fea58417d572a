//! Estimated token usage and cost, shared across searches

use crate::config::PricingConfig;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

/// Cumulative usage estimate
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageStats {
    pub total_input_tokens: u64,
    pub total_output_tokens: u64,
    /// Estimated cost in USD
    pub total_cost: f64,
}

/// Estimated token count for `text`: characters divided by `chars_per_token`, rounded up
pub fn estimate_tokens(text: &str, chars_per_token: f64) -> u64 {
    if chars_per_token <= 0.0 {
        return 0;
    }
    (text.chars().count() as f64 / chars_per_token).ceil() as u64
}

/// Cloneable handle to one usage accumulator.
///
/// Clones share state. Each update is applied under a single lock, so a
/// snapshot never observes tokens without their cost.
#[derive(Debug, Clone, Default)]
pub struct UsageTracker {
    stats: Arc<Mutex<UsageStats>>,
}

impl UsageTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one call's estimated usage, priced with `pricing`
    pub fn record(&self, input_tokens: u64, output_tokens: u64, pricing: &PricingConfig) -> UsageStats {
        let cost = (input_tokens as f64 / 1_000_000.0) * pricing.input_per_million
            + (output_tokens as f64 / 1_000_000.0) * pricing.output_per_million;
        let mut stats = self.stats.lock().unwrap();
        stats.total_input_tokens += input_tokens;
        stats.total_output_tokens += output_tokens;
        stats.total_cost += cost;
        *stats
    }

    /// Estimate and record usage from the raw input and output text
    pub fn record_text(&self, input: &str, output: &str, pricing: &PricingConfig) -> UsageStats {
        self.record(
            estimate_tokens(input, pricing.chars_per_token),
            estimate_tokens(output, pricing.chars_per_token),
            pricing,
        )
    }

    pub fn snapshot(&self) -> UsageStats {
        *self.stats.lock().unwrap()
    }

    pub fn reset(&self) {
        *self.stats.lock().unwrap() = UsageStats::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_estimate_rounds_up() {
        assert_eq!(estimate_tokens("", 3.5), 0);
        assert_eq!(estimate_tokens("abc", 3.5), 1);
        assert_eq!(estimate_tokens("abcdefg", 3.5), 2);
        assert_eq!(estimate_tokens("abcdefgh", 3.5), 3);
    }

    #[test]
    fn cost_uses_per_million_rates() {
        let tracker = UsageTracker::new();
        let stats = tracker.record(1_000_000, 2_000_000, &PricingConfig::default());
        assert_eq!(stats.total_input_tokens, 1_000_000);
        assert!((stats.total_cost - (0.35 + 1.40)).abs() < 1e-9);
    }

    #[test]
    fn clones_share_state_until_reset() {
        let tracker = UsageTracker::new();
        let handle = tracker.clone();
        handle.record_text("abcdefg", "abc", &PricingConfig::default());
        handle.record_text("abcdefg", "abc", &PricingConfig::default());
        assert_eq!(tracker.snapshot().total_input_tokens, 4);
        assert_eq!(tracker.snapshot().total_output_tokens, 2);

        tracker.reset();
        assert_eq!(handle.snapshot(), UsageStats::default());
    }
}
