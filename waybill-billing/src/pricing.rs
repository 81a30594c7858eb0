use serde::{Deserialize, Serialize};

/// Markup configuration for suggested customer pricing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkupConfig {
    /// Ratio applied when staff asks for a single suggestion.
    pub default_ratio: f64,
    /// Preset ratios offered in the billing form.
    pub presets: Vec<f64>,
}

impl Default for MarkupConfig {
    fn default() -> Self {
        Self {
            default_ratio: 0.30,
            presets: vec![0.20, 0.30, 0.50],
        }
    }
}

/// One preset suggestion for the billing form.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MarkupQuote {
    pub ratio: f64,
    pub suggested: i64,
}

/// Suggests a billed amount from total expenses. Stateless beyond its
/// configuration; zero expenses yields a zero suggestion, never an error.
pub struct PricingAdvisor {
    config: MarkupConfig,
}

impl PricingAdvisor {
    pub fn new(config: MarkupConfig) -> Self {
        Self { config }
    }

    pub fn suggest(&self, total_expenses: i64, markup_ratio: f64) -> i64 {
        (total_expenses as f64 * (1.0 + markup_ratio)).round() as i64
    }

    pub fn suggest_default(&self, total_expenses: i64) -> i64 {
        self.suggest(total_expenses, self.config.default_ratio)
    }

    /// One quote per configured preset, in configuration order.
    pub fn quotes(&self, total_expenses: i64) -> Vec<MarkupQuote> {
        self.config
            .presets
            .iter()
            .map(|&ratio| MarkupQuote {
                ratio,
                suggested: self.suggest(total_expenses, ratio),
            })
            .collect()
    }
}

impl Default for PricingAdvisor {
    fn default() -> Self {
        Self::new(MarkupConfig::default())
    }
}
