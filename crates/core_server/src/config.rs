//! Tunables of the core server.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// What happens to a module once one of its phase changes failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Keep requesting every phase from every module.
    ///
    /// A module left behind rejects later targets as illegal transitions and
    /// each rejection is recorded as another failure.
    #[default]
    BestEffort,
    /// Stop requesting phases from a module after its first failure.
    Quarantine,
}

impl FailurePolicy {
    pub const fn as_str(self) -> &'static str {
        match self {
            FailurePolicy::BestEffort => "best_effort",
            FailurePolicy::Quarantine => "quarantine",
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "best_effort" => Ok(FailurePolicy::BestEffort),
            "quarantine" => Ok(FailurePolicy::Quarantine),
            other => Err(format!(
                "Invalid failure policy: {}. Must be one of: best_effort, quarantine",
                other
            )),
        }
    }
}

/// Default for enter_running
fn default_enter_running() -> bool {
    true
}

/// Core server configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoreConfig {
    /// How modules that failed a phase are treated in later phases
    #[serde(default)]
    pub failure_policy: FailurePolicy,
    /// Whether `start()` publishes `RUNNING` once every phase has been applied
    #[serde(default = "default_enter_running")]
    pub enter_running: bool,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            failure_policy: FailurePolicy::default(),
            enter_running: default_enter_running(),
        }
    }
}

impl CoreConfig {
    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_enter_running(mut self, enter_running: bool) -> Self {
        self.enter_running = enter_running;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CoreConfig::default();
        assert_eq!(config.failure_policy, FailurePolicy::BestEffort);
        assert!(config.enter_running);
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("quarantine".parse::<FailurePolicy>(), Ok(FailurePolicy::Quarantine));
        assert_eq!("Best-Effort".parse::<FailurePolicy>(), Ok(FailurePolicy::BestEffort));
        assert!("retry".parse::<FailurePolicy>().unwrap_err().contains("Invalid failure policy"));
    }

    #[test]
    fn test_serde_with_defaults() {
        let config: CoreConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, CoreConfig::default());

        let config: CoreConfig =
            serde_json::from_str(r#"{"failure_policy":"quarantine","enter_running":false}"#).unwrap();
        assert_eq!(config.failure_policy, FailurePolicy::Quarantine);
        assert!(!config.enter_running);
    }
}
