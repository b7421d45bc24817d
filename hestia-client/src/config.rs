use hestia_checkout::orchestrator::CheckoutRules;
use serde::Deserialize;
use std::env;
use tokio::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub backend: BackendConfig,
    pub checkout: CheckoutConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_fan_out")]
    pub max_parallel_availability_checks: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct CheckoutConfig {
    #[serde(default = "default_poll_initial_delay_secs")]
    pub deadline_poll_initial_delay_secs: u64,
    #[serde(default = "default_poll_interval_secs")]
    pub deadline_poll_interval_secs: u64,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_fan_out() -> usize {
    4
}

fn default_poll_initial_delay_secs() -> u64 {
    5
}

fn default_poll_interval_secs() -> u64 {
    30
}

impl CheckoutConfig {
    pub fn rules(&self) -> CheckoutRules {
        CheckoutRules {
            poll_initial_delay: Duration::from_secs(self.deadline_poll_initial_delay_secs),
            poll_interval: Duration::from_secs(self.deadline_poll_interval_secs),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self, config::ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let s = config::Config::builder()
            .add_source(config::File::with_name("config/default"))
            // Environment-specific file, optional
            .add_source(config::File::with_name(&format!("config/{}", run_mode)).required(false))
            // Local overrides, not checked in
            .add_source(config::File::with_name("config/local").required(false))
            // E.g. HESTIA_BACKEND__BASE_URL
            .add_source(config::Environment::with_prefix("HESTIA").separator("__"))
            .build()?;

        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fill_missing_fields() {
        let config: Config = serde_json::from_str(
            r#"{"backend": {"base_url": "https://api.example.test"}, "checkout": {}}"#,
        )
        .unwrap();

        assert_eq!(config.backend.request_timeout_secs, 10);
        assert_eq!(config.backend.max_parallel_availability_checks, 4);

        let rules = config.checkout.rules();
        assert_eq!(rules.poll_initial_delay, Duration::from_secs(5));
        assert_eq!(rules.poll_interval, Duration::from_secs(30));
    }
}
