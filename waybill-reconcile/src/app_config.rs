use serde::Deserialize;
use std::env;
use waybill_billing::MarkupConfig;

#[derive(Debug, Deserialize, Clone)]
pub struct EngineConfig {
    #[serde(default)]
    pub billing_rules: BillingRules,
}

/// Business rules for the billing engine. Defaults mirror the back
/// office's standard terms; deployments override via config files or
/// `WAYBILL__`-prefixed environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct BillingRules {
    #[serde(default = "default_markup_ratio")]
    pub default_markup_ratio: f64,
    #[serde(default = "default_markup_presets")]
    pub markup_presets: Vec<f64>,
    /// Fallback payment terms when a booking carries none.
    #[serde(default = "default_terms_days")]
    pub default_terms_days: i64,
}

fn default_markup_ratio() -> f64 {
    0.30
}

fn default_markup_presets() -> Vec<f64> {
    vec![0.20, 0.30, 0.50]
}

fn default_terms_days() -> i64 {
    30
}

impl Default for BillingRules {
    fn default() -> Self {
        Self {
            default_markup_ratio: default_markup_ratio(),
            markup_presets: default_markup_presets(),
            default_terms_days: default_terms_days(),
        }
    }
}

impl BillingRules {
    pub fn markup_config(&self) -> MarkupConfig {
        MarkupConfig {
            default_ratio: self.default_markup_ratio,
            presets: self.markup_presets.clone(),
        }
    }
}

impl EngineConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in to git
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(config::Environment::with_prefix("WAYBILL").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}
