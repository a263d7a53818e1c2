//! Token usage and cost accounting for one review run.

use std::time::Instant;

use serde_json::{Value, json};

use crate::ai::models::{Pricing, UsageReport};

/// Accumulates usage across the API calls of a single review.
pub struct ReviewMetrics {
    start: Instant,
    input_tokens: u64,
    output_tokens: u64,
    total_tokens: u64,
    api_calls: u32,
    model_name: String,
    pricing: Pricing,
}

impl ReviewMetrics {
    pub fn new(model_name: impl Into<String>, pricing: Pricing) -> Self {
        Self {
            start: Instant::now(),
            input_tokens: 0,
            output_tokens: 0,
            total_tokens: 0,
            api_calls: 0,
            model_name: model_name.into(),
            pricing,
        }
    }

    /// Record one model call. The usage report is already provider
    /// tagged, so no shape sniffing happens here.
    pub fn add_api_call(&mut self, usage: Option<&UsageReport>) {
        self.api_calls += 1;
        if let Some(usage) = usage {
            self.input_tokens += usage.input_tokens;
            self.output_tokens += usage.output_tokens;
            self.total_tokens += usage.total_tokens;
            tracing::debug!(
                provider = %usage.provider,
                input = usage.input_tokens,
                output = usage.output_tokens,
                total = usage.total_tokens,
                "recorded model usage"
            );
        }
    }

    pub fn duration_secs(&self) -> f64 {
        (self.start.elapsed().as_millis() as f64 / 10.0).round() / 100.0
    }

    fn input_cost(&self) -> f64 {
        self.input_tokens as f64 / 1_000_000.0 * self.pricing.input_per_million
    }

    fn output_cost(&self) -> f64 {
        self.output_tokens as f64 / 1_000_000.0 * self.pricing.output_per_million
    }

    /// Estimated total cost in USD.
    pub fn estimated_cost(&self) -> f64 {
        self.input_cost() + self.output_cost()
    }

    /// Structured form for the summary comment footer and server responses.
    pub fn to_value(&self) -> Value {
        json!({
            "duration_seconds": self.duration_secs(),
            "api_calls": self.api_calls,
            "model": self.model_name,
            "tokens": {
                "input": self.input_tokens,
                "output": self.output_tokens,
                "total": self.total_tokens,
            },
            "cost": {
                "input_cost_usd": round6(self.input_cost()),
                "output_cost_usd": round6(self.output_cost()),
                "total_cost_usd": round6(self.estimated_cost()),
            },
            "timestamp": chrono::Utc::now().to_rfc3339(),
        })
    }

    pub fn log(&self) {
        tracing::info!(
            model = %self.model_name,
            duration_secs = self.duration_secs(),
            api_calls = self.api_calls,
            input_tokens = self.input_tokens,
            output_tokens = self.output_tokens,
            total_tokens = self.total_tokens,
            cost_usd = round6(self.estimated_cost()),
            "review metrics"
        );
    }

    pub fn total_tokens(&self) -> u64 {
        self.total_tokens
    }
}

fn round6(v: f64) -> f64 {
    (v * 1_000_000.0).round() / 1_000_000.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::models::Provider;

    fn pricing() -> Pricing {
        Pricing {
            input_per_million: 3.0,
            output_per_million: 15.0,
        }
    }

    #[test]
    fn test_accumulates_usage_across_calls() {
        let mut metrics = ReviewMetrics::new("test-model", pricing());
        metrics.add_api_call(Some(&UsageReport::from_in_out(Provider::Claude, 1000, 500)));
        metrics.add_api_call(Some(&UsageReport::from_in_out(Provider::Claude, 2000, 100)));
        metrics.add_api_call(None);

        let value = metrics.to_value();
        assert_eq!(value["api_calls"], 3);
        assert_eq!(value["tokens"]["input"], 3000);
        assert_eq!(value["tokens"]["output"], 600);
        assert_eq!(value["tokens"]["total"], 3600);
    }

    #[test]
    fn test_cost_calculation() {
        let mut metrics = ReviewMetrics::new("test-model", pricing());
        metrics.add_api_call(Some(&UsageReport::from_in_out(
            Provider::Claude,
            1_000_000,
            1_000_000,
        )));
        // 1M in at $3 + 1M out at $15.
        assert!((metrics.estimated_cost() - 18.0).abs() < 1e-9);
    }

    #[test]
    fn test_gemini_total_trusted_over_sum() {
        // Gemini's total includes thinking tokens not in input + output.
        let usage = UsageReport {
            provider: Provider::Gemini,
            input_tokens: 100,
            output_tokens: 50,
            total_tokens: 400,
        };
        let mut metrics = ReviewMetrics::new("gemini-2.5-flash", pricing());
        metrics.add_api_call(Some(&usage));
        assert_eq!(metrics.total_tokens(), 400);
    }
}
