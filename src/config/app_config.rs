use serde::Deserialize;

use crate::domain::selection::ConfigurationSource;

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub logging: LoggingConfig,
    pub dispatch: DispatchConfig,
    pub autostop: AutoStopConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Settings for the built-in decorators
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Per-attempt limit; no timeout decorator when absent
    pub timeout_ms: Option<u64>,
    /// Consecutive failures before a trial's circuit opens
    pub circuit_breaker_threshold: u32,
    pub circuit_breaker_reset_ms: u64,
    /// Fraction of exposures logged, 0.0 to 1.0
    pub exposure_sample_rate: f64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AutoStopConfig {
    pub minimum_sample_size: u64,
    pub confidence_level: f64,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            timeout_ms: None,
            circuit_breaker_threshold: 5,
            circuit_breaker_reset_ms: 30_000,
            exposure_sample_rate: 1.0,
        }
    }
}

impl Default for AutoStopConfig {
    fn default() -> Self {
        Self {
            minimum_sample_size: 100,
            confidence_level: 0.95,
        }
    }
}

impl AppConfig {
    /// Load from `config/default`, `config/local` and `TRIALS__*` variables
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::builder().build()?.try_deserialize()
    }

    /// The layered sources `load` reads, for callers that also want the raw
    /// `config::Config` as a selection source
    pub fn builder() -> config::ConfigBuilder<config::builder::DefaultState> {
        config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("TRIALS")
                    .separator("__")
                    .try_parsing(true),
            )
    }
}

/// Selector values read straight out of loaded configuration
impl ConfigurationSource for config::Config {
    fn get(&self, key: &str) -> Option<String> {
        self.get_string(key).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.dispatch.timeout_ms, None);
        assert_eq!(config.dispatch.circuit_breaker_threshold, 5);
        assert_eq!(config.autostop.minimum_sample_size, 100);
        assert!((config.autostop.confidence_level - 0.95).abs() < f64::EPSILON);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let raw = r#"
            [logging]
            format = "json"

            [dispatch]
            timeout_ms = 250

            [experiments]
            payment_service = "adyen"
        "#;

        let config = config::Config::builder()
            .add_source(config::File::from_str(raw, config::FileFormat::Toml))
            .build()
            .unwrap();

        let app: AppConfig = config.clone().try_deserialize().unwrap();

        assert_eq!(app.logging.format, LogFormat::Json);
        assert_eq!(app.logging.level, "info");
        assert_eq!(app.dispatch.timeout_ms, Some(250));
        assert!((app.dispatch.exposure_sample_rate - 1.0).abs() < f64::EPSILON);

        assert_eq!(
            ConfigurationSource::get(&config, "experiments.payment_service").as_deref(),
            Some("adyen")
        );
        assert_eq!(ConfigurationSource::get(&config, "experiments.missing"), None);
    }
}
