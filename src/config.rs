use std::time::Duration;

use crate::error::ConfigError;

pub const ENV_LABEL: &str = "STOPWATCHES_LABEL";
pub const ENV_TICK_MS: &str = "STOPWATCHES_TICK_MS";

const DEFAULT_LABEL: &str = "Stopwatch";
const DEFAULT_TICK_MS: u64 = 10;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EngineConfig {
    /// Generic label used for "<label> <n>" names and blank renames.
    pub default_label: String,
    /// How often a running stopwatch refreshes its elapsed time.
    pub tick_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_label: DEFAULT_LABEL.to_string(),
            tick_interval: Duration::from_millis(DEFAULT_TICK_MS),
        }
    }
}

impl EngineConfig {
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.default_label = label.into();
        self
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Applies overrides from `lookup` on top of the defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(label) = lookup(ENV_LABEL) {
            let label = label.trim();
            if label.is_empty() {
                return Err(ConfigError::BlankLabel { var: ENV_LABEL });
            }
            config.default_label = label.to_string();
        }

        if let Some(raw) = lookup(ENV_TICK_MS) {
            let ms: u64 = raw.trim().parse().map_err(|_| ConfigError::InvalidTickInterval {
                var: ENV_TICK_MS,
                value: raw.clone(),
            })?;
            if ms == 0 {
                return Err(ConfigError::ZeroTickInterval { var: ENV_TICK_MS });
            }
            config.tick_interval = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = EngineConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.tick_interval, Duration::from_millis(10));
        assert_eq!(config.default_label, "Stopwatch");
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig::from_lookup(lookup(&[
            (ENV_LABEL, " Cronómetro "),
            (ENV_TICK_MS, "25"),
        ]))
        .unwrap();
        assert_eq!(config.default_label, "Cronómetro");
        assert_eq!(config.tick_interval, Duration::from_millis(25));
    }

    #[test]
    fn test_bad_values() {
        assert_eq!(
            EngineConfig::from_lookup(lookup(&[(ENV_TICK_MS, "fast")])),
            Err(ConfigError::InvalidTickInterval {
                var: ENV_TICK_MS,
                value: "fast".to_string()
            })
        );
        assert_eq!(
            EngineConfig::from_lookup(lookup(&[(ENV_TICK_MS, "0")])),
            Err(ConfigError::ZeroTickInterval { var: ENV_TICK_MS })
        );
        assert_eq!(
            EngineConfig::from_lookup(lookup(&[(ENV_LABEL, "  ")])),
            Err(ConfigError::BlankLabel { var: ENV_LABEL })
        );
    }
}
