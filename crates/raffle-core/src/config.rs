//! Configuration loading and validation.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RaffleError, Result};

const DEFAULT_TICK_INTERVAL_MS: u64 = 60;
const DEFAULT_TICK_COUNT: u32 = 168;
const DEFAULT_FEEDBACK_CLEAR_MS: u64 = 3_000;

/// Animations longer than this get a validation warning.
const LONG_DRAW_WARNING: Duration = Duration::from_secs(60);

/// Top-level raffle machine configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RaffleConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub draw: Option<DrawConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub import: Option<ImportConfig>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

/// Draw animation timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawConfig {
    /// Milliseconds between flicker ticks (default: 60).
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,

    /// Ticks per draw, the last one resolves the winner (default: 168).
    #[serde(default = "default_tick_count")]
    pub tick_count: u32,
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

fn default_tick_count() -> u32 {
    DEFAULT_TICK_COUNT
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// How long upload feedback stays visible, in ms (default: 3000).
    #[serde(default = "default_feedback_clear_ms")]
    pub feedback_clear_ms: u64,
}

fn default_feedback_clear_ms() -> u64 {
    DEFAULT_FEEDBACK_CLEAR_MS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log format: "plain" (default) or "json".
    #[serde(default = "default_log_format")]
    pub format: String,

    /// Log level override (trace/debug/info/warn/error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Per-crate log level overrides (e.g. "raffle_engine=debug").
    #[serde(default)]
    pub filters: Vec<String>,
}

fn default_log_format() -> String {
    "plain".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: default_log_format(),
            level: None,
            filters: Vec::new(),
        }
    }
}

/// Substitute `${ENV_VAR}` patterns in a string with their environment variable values.
fn substitute_env_vars(input: &str) -> String {
    let Ok(re) = regex::Regex::new(r"\$\{([^}]+)\}") else {
        return input.to_string();
    };
    re.replace_all(input, |caps: &regex::Captures| {
        std::env::var(&caps[1]).unwrap_or_default()
    })
    .into_owned()
}

impl RaffleConfig {
    /// Load config from a JSON5 file. A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = std::fs::read_to_string(path)?;
        let substituted = substitute_env_vars(&raw);

        let config: RaffleConfig =
            json5::from_str(&substituted).map_err(|e| RaffleError::Config(e.to_string()))?;
        tracing::debug!(path = %path.display(), "Loaded config");
        Ok(config)
    }

    /// Default config file location.
    pub fn config_path() -> PathBuf {
        data_dir().join("config.json")
    }

    /// Period between flicker ticks.
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(
            self.draw
                .as_ref()
                .map(|d| d.tick_interval_ms)
                .unwrap_or(DEFAULT_TICK_INTERVAL_MS),
        )
    }

    /// Number of ticks in one draw.
    pub fn tick_count(&self) -> u32 {
        self.draw
            .as_ref()
            .map(|d| d.tick_count)
            .unwrap_or(DEFAULT_TICK_COUNT)
    }

    /// Total animation length of one draw, or `None` if it overflows.
    pub fn checked_draw_duration(&self) -> Option<Duration> {
        self.tick_interval().checked_mul(self.tick_count())
    }

    /// Total animation length of one draw, saturating at `Duration::MAX`.
    pub fn draw_duration(&self) -> Duration {
        self.checked_draw_duration().unwrap_or(Duration::MAX)
    }

    /// How long upload feedback stays before it is cleared.
    pub fn feedback_ttl(&self) -> Duration {
        Duration::from_millis(
            self.import
                .as_ref()
                .map(|i| i.feedback_clear_ms)
                .unwrap_or(DEFAULT_FEEDBACK_CLEAR_MS),
        )
    }

    pub fn log_format(&self) -> &str {
        self.logging
            .as_ref()
            .map(|l| l.format.as_str())
            .unwrap_or("plain")
    }

    /// Get a config value by dotted path (e.g. "draw.tick_count").
    pub fn get_path(&self, path: &str) -> Option<serde_json::Value> {
        let json = serde_json::to_value(self).ok()?;
        let mut current = &json;
        for segment in path.split('.') {
            current = current.get(segment)?;
        }
        Some(current.clone())
    }

    /// Set a config value by dotted path, creating missing sections.
    pub fn set_path(&mut self, path: &str, value: serde_json::Value) -> anyhow::Result<()> {
        let mut json = serde_json::to_value(&*self)
            .map_err(|e| anyhow::anyhow!("Config serialization error: {e}"))?;

        let segments: Vec<&str> = path.split('.').collect();
        let Some((last, parents)) = segments.split_last() else {
            anyhow::bail!("Empty path");
        };
        if segments.iter().any(|s| s.is_empty()) {
            anyhow::bail!("Invalid config key '{path}'");
        }

        let mut current = &mut json;
        for segment in parents {
            let serde_json::Value::Object(map) = current else {
                anyhow::bail!("'{segment}' in '{path}' is not a config section");
            };
            current = map
                .entry(segment.to_string())
                .or_insert_with(|| serde_json::json!({}));
        }
        let serde_json::Value::Object(map) = current else {
            anyhow::bail!("'{path}' is not inside a config section");
        };
        map.insert(last.to_string(), value);

        let updated: RaffleConfig = serde_json::from_value(json)
            .map_err(|e| anyhow::anyhow!("Config deserialization error: {e}"))?;
        if updated.get_path(path).is_none() {
            anyhow::bail!("Unknown config key '{path}'");
        }
        *self = updated;
        Ok(())
    }

    /// Validate config, returning (warnings, errors).
    pub fn validate(&self) -> (Vec<String>, Vec<String>) {
        let mut warnings = Vec::new();
        let mut errors = Vec::new();

        if let Some(draw) = &self.draw {
            if draw.tick_interval_ms == 0 {
                errors.push("draw.tick_interval_ms cannot be 0".to_string());
            }
            if draw.tick_count == 0 {
                errors.push("draw.tick_count cannot be 0".to_string());
            }
        }

        match self.checked_draw_duration() {
            None => errors.push(
                "draw.tick_interval_ms * draw.tick_count overflows the draw duration".to_string(),
            ),
            Some(duration) if duration > LONG_DRAW_WARNING => {
                warnings.push(format!("Draw animation lasts {}s", duration.as_secs()));
            }
            Some(_) => {}
        }

        if let Some(logging) = &self.logging {
            if logging.format != "plain" && logging.format != "json" {
                warnings.push(format!(
                    "Unknown logging.format '{}', using plain",
                    logging.format
                ));
            }
        }

        (warnings, errors)
    }

    /// Save config to a file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }
}

/// Base directory for raffle machine data: `~/.raffle_machine/`
pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".raffle_machine")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RaffleConfig::default();
        assert_eq!(config.tick_interval(), Duration::from_millis(60));
        assert_eq!(config.tick_count(), 168);
        assert_eq!(config.feedback_ttl(), Duration::from_secs(3));
        assert_eq!(config.draw_duration(), Duration::from_millis(10_080));
        assert_eq!(config.log_format(), "plain");
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = RaffleConfig::load(&dir.path().join("nope.json")).unwrap();
        assert!(config.draw.is_none());
    }

    #[test]
    fn test_load_json5_with_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(
            &path,
            r#"{
                // faster draws for demos
                draw: { tick_count: 20 },
                import: { feedback_clear_ms: 500 },
            }"#,
        )
        .unwrap();

        let config = RaffleConfig::load(&path).unwrap();
        assert_eq!(config.tick_count(), 20);
        assert_eq!(config.tick_interval(), Duration::from_millis(60));
        assert_eq!(config.feedback_ttl(), Duration::from_millis(500));
    }

    #[test]
    fn test_env_var_substitution() {
        // SAFETY: test-only, single-threaded test runner
        unsafe { std::env::set_var("TEST_RAFFLE_FORMAT", "json") };
        let input = r#"{"format": "${TEST_RAFFLE_FORMAT}", "other": "plain"}"#;
        let result = substitute_env_vars(input);
        assert!(result.contains(r#""format": "json""#));
        assert!(result.contains("plain"));
        unsafe { std::env::remove_var("TEST_RAFFLE_FORMAT") };
    }

    #[test]
    fn test_env_var_missing() {
        let input = r#"{"key": "${NONEXISTENT_VAR_RAFFLE_TEST}"}"#;
        let result = substitute_env_vars(input);
        assert!(result.contains(r#""""#));
    }

    #[test]
    fn test_invalid_file_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ draw: ").unwrap();
        assert!(matches!(RaffleConfig::load(&path), Err(RaffleError::Config(_))));
    }

    #[test]
    fn test_validate() {
        let config = RaffleConfig {
            draw: Some(DrawConfig {
                tick_interval_ms: 0,
                tick_count: 0,
            }),
            ..Default::default()
        };
        let (_, errors) = config.validate();
        assert_eq!(errors.len(), 2);

        let slow = RaffleConfig {
            draw: Some(DrawConfig {
                tick_interval_ms: 1_000,
                tick_count: 120,
            }),
            ..Default::default()
        };
        let (warnings, errors) = slow.validate();
        assert!(errors.is_empty());
        assert_eq!(warnings.len(), 1);

        let (warnings, errors) = RaffleConfig::default().validate();
        assert!(warnings.is_empty());
        assert!(errors.is_empty());
    }

    #[test]
    fn test_get_path_and_save() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.json");
        let config = RaffleConfig {
            draw: Some(DrawConfig {
                tick_interval_ms: 55,
                tick_count: 10,
            }),
            ..Default::default()
        };
        assert_eq!(config.get_path("draw.tick_count"), Some(serde_json::json!(10)));
        assert!(config.get_path("import.feedback_clear_ms").is_none());

        config.save(&path).unwrap();
        let loaded = RaffleConfig::load(&path).unwrap();
        assert_eq!(loaded.tick_interval(), Duration::from_millis(55));
    }

    #[test]
    fn test_validate_overflowing_draw_duration() {
        let config = RaffleConfig {
            draw: Some(DrawConfig {
                tick_interval_ms: u64::MAX,
                tick_count: 5_000,
            }),
            ..Default::default()
        };
        assert!(config.checked_draw_duration().is_none());
        assert_eq!(config.draw_duration(), Duration::MAX);

        let (_, errors) = config.validate();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("overflows"));
    }

    #[test]
    fn test_logging_default_is_plain() {
        let logging = LoggingConfig::default();
        assert_eq!(logging.format, "plain");
        assert!(logging.level.is_none());

        let config = RaffleConfig {
            logging: Some(LoggingConfig::default()),
            ..Default::default()
        };
        assert_eq!(config.log_format(), "plain");
        let (warnings, _) = config.validate();
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_set_path() {
        let mut config = RaffleConfig::default();
        config
            .set_path("draw.tick_count", serde_json::json!(12))
            .unwrap();
        assert_eq!(config.tick_count(), 12);
        assert_eq!(config.tick_interval(), Duration::from_millis(60));

        config
            .set_path("logging.level", serde_json::json!("debug"))
            .unwrap();
        let logging = config.logging.as_ref().unwrap();
        assert_eq!(logging.level.as_deref(), Some("debug"));
        assert_eq!(logging.format, "plain");

        assert!(config.set_path("draw.bogus", serde_json::json!(1)).is_err());
        assert!(config.set_path("draw.tick_count", serde_json::json!("many")).is_err());
        assert!(config.set_path("", serde_json::json!(1)).is_err());
        assert_eq!(config.tick_count(), 12);
    }
}
