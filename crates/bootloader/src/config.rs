//! Configuration of the bootloader, loaded from a TOML file.

use crate::cli::CliArgs;
use anyhow::Context;
use core_server::{CoreConfig, FailurePolicy};
use module_greeter::GreeterLoader;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Application configuration loaded from TOML file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Core server behavior
    #[serde(default)]
    pub core: CoreConfig,
    /// Bundled greeter loader
    #[serde(default)]
    pub greeter: GreeterSettings,
    /// Logging configuration settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Settings of the bundled [`GreeterLoader`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GreeterSettings {
    /// Whether the greeter loader is registered at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    pub greeting: String,
    pub audience: String,
}

fn default_true() -> bool {
    true
}

impl Default for GreeterSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            greeting: "Hello".to_string(),
            audience: "world".to_string(),
        }
    }
}

impl GreeterSettings {
    pub fn to_loader(&self) -> GreeterLoader {
        GreeterLoader::new()
            .with_greeting(self.greeting.clone())
            .with_audience(self.audience.clone())
    }
}

/// Logging system configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Log level filter (trace, debug, info, warn, error)
    pub level: String,
    /// Whether to output logs in JSON format
    #[serde(default)]
    pub json_format: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

const VALID_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

impl AppConfig {
    /// Loads configuration from a TOML file.
    ///
    /// If the file doesn't exist, a default configuration file is written at
    /// `path` and the defaults are returned.
    pub async fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let content = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            let config: AppConfig = toml::from_str(&content)
                .with_context(|| format!("Failed to parse {}", path.display()))?;
            Ok(config)
        } else {
            let default_config = AppConfig::default();
            let toml_content = toml::to_string_pretty(&default_config)?;
            tokio::fs::write(path, toml_content)
                .await
                .with_context(|| format!("Failed to create {}", path.display()))?;
            info!("Created default configuration file: {}", path.display());
            Ok(default_config)
        }
    }

    /// Applies command line overrides on top of the file settings.
    pub fn apply_overrides(&mut self, args: &CliArgs) -> anyhow::Result<()> {
        if let Some(level) = &args.log_level {
            self.logging.level = level.clone();
        }
        if args.json_logs {
            self.logging.json_format = true;
        }
        if let Some(policy) = &args.failure_policy {
            self.core.failure_policy = policy
                .parse::<FailurePolicy>()
                .map_err(anyhow::Error::msg)?;
        }
        Ok(())
    }

    /// Checks the configuration for values the server cannot work with.
    pub fn validate(&self) -> Result<(), String> {
        if !VALID_LEVELS.contains(&self.logging.level.as_str()) {
            return Err(format!(
                "Invalid log level: {}. Must be one of: {VALID_LEVELS:?}",
                &self.logging.level
            ));
        }

        if self.greeter.enabled && self.greeter.greeting.trim().is_empty() {
            return Err("Greeting cannot be empty".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::{tempdir, NamedTempFile};

    fn args(extra: &[&str]) -> CliArgs {
        let mut argv = vec!["bootloader"];
        argv.extend_from_slice(extra);
        CliArgs::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_app_config_default() {
        let config = AppConfig::default();

        assert_eq!(config.core.failure_policy, FailurePolicy::BestEffort);
        assert!(config.core.enter_running);
        assert!(config.greeter.enabled);
        assert_eq!(config.greeter.greeting, "Hello");
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json_format);
        assert!(config.validate().is_ok());
    }

    #[tokio::test]
    async fn test_load_from_nonexistent_file() {
        let dir = tempdir().unwrap();
        let path: PathBuf = dir.path().join("bootloader.toml");

        let config = AppConfig::load_from_file(&path).await.unwrap();

        assert_eq!(config, AppConfig::default());
        assert!(path.exists());

        // The written file loads back to the same settings.
        let reloaded = AppConfig::load_from_file(&path).await.unwrap();
        assert_eq!(reloaded, config);
    }

    #[tokio::test]
    async fn test_load_from_existing_file() {
        let toml_content = r#"
[core]
failure_policy = "quarantine"
enter_running = false

[greeter]
greeting = "Howdy"
audience = "partner"

[logging]
level = "debug"
json_format = true
"#;

        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), toml_content).await.unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).await.unwrap();

        assert_eq!(config.core.failure_policy, FailurePolicy::Quarantine);
        assert!(!config.core.enter_running);
        assert!(config.greeter.enabled);
        assert_eq!(config.greeter.greeting, "Howdy");
        assert_eq!(config.greeter.audience, "partner");
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json_format);
    }

    #[tokio::test]
    async fn test_missing_sections_use_defaults() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "[logging]\nlevel = \"warn\"\n").await.unwrap();

        let config = AppConfig::load_from_file(temp_file.path()).await.unwrap();

        assert_eq!(config.core, CoreConfig::default());
        assert_eq!(config.greeter, GreeterSettings::default());
        assert_eq!(config.logging.level, "warn");
    }

    #[tokio::test]
    async fn test_invalid_toml_is_reported() {
        let temp_file = NamedTempFile::new().unwrap();
        tokio::fs::write(temp_file.path(), "[core\nfailure_policy = ").await.unwrap();

        let err = AppConfig::load_from_file(temp_file.path()).await.unwrap_err();

        assert!(err.to_string().starts_with("Failed to parse"));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = AppConfig::default();

        config
            .apply_overrides(&args(&["-l", "trace", "--json-logs", "-f", "quarantine"]))
            .unwrap();

        assert_eq!(config.logging.level, "trace");
        assert!(config.logging.json_format);
        assert_eq!(config.core.failure_policy, FailurePolicy::Quarantine);
    }

    #[test]
    fn test_unknown_failure_policy_override() {
        let mut config = AppConfig::default();

        let err = config.apply_overrides(&args(&["-f", "ignore"])).unwrap_err();

        assert!(err.to_string().contains("Invalid failure policy"));
    }

    #[test]
    fn test_config_validation() {
        let mut config = AppConfig::default();

        config.logging.level = "verbose".to_string();
        assert!(config.validate().is_err());

        config.logging.level = "info".to_string();
        config.greeter.greeting = " ".to_string();
        assert!(config.validate().is_err());

        config.greeter.enabled = false;
        assert!(config.validate().is_ok());
    }
}
