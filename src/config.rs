//! Scheduler configuration.
//!
//! Queue priorities and loop settings are plain data loaded from TOML:
//!
//! ```toml
//! history_size = 4096
//! tick_interval_ms = 50
//!
//! [queues.Priority]
//! priority = 10
//!
//! [queues.Move]
//! priority = 40
//! ```
//!
//! Admission predicates depend on live game state and cannot be expressed in
//! a file; attach them to the queues returned by
//! [`SchedulerConfig::build_queues`] with [`TaskQueue::with_insert_check`].

use crate::env::defaults;
use crate::error::ConfigError;
use crate::task::TaskQueue;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Number of dispatched commands kept in history
    pub history_size: usize,
    /// Cadence of the live session loop
    pub tick_interval_ms: u64,
    pub queues: BTreeMap<String, QueueConfig>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueConfig {
    pub priority: i32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        let queues = [
            ("Priority", 10),
            ("Combat", 20),
            ("Heal", 30),
            ("Move", 40),
            (defaults::QUEUE_NAME, defaults::PRIORITY),
        ]
        .into_iter()
        .map(|(name, priority)| (name.to_string(), QueueConfig { priority }))
        .collect();

        Self {
            history_size: defaults::HISTORY_SIZE,
            tick_interval_ms: defaults::TICK_INTERVAL_MS,
            queues,
        }
    }
}

impl SchedulerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: SchedulerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn to_toml_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let content = self.to_toml_string()?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.history_size == 0 {
            return Err(ConfigError::Invalid(
                "history_size must be greater than zero".to_string(),
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "tick_interval_ms must be greater than zero".to_string(),
            ));
        }
        if let Some(name) = self.queues.keys().find(|name| name.trim().is_empty()) {
            return Err(ConfigError::Invalid(format!(
                "queue name '{}' must not be blank",
                name
            )));
        }
        Ok(())
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Queue definitions with no admission predicates attached
    pub fn build_queues(&self) -> HashMap<String, TaskQueue> {
        self.queues
            .iter()
            .map(|(name, queue)| (name.clone(), TaskQueue::new(queue.priority)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_queues() {
        let config = SchedulerConfig::default();
        let queues = config.build_queues();

        assert_eq!(queues.len(), 5);
        assert_eq!(queues["Priority"].priority, 10);
        assert_eq!(queues["any"].priority, 50);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = SchedulerConfig::from_toml_str(
            r#"
            tick_interval_ms = 20

            [queues.Move]
            priority = 5
            "#,
        )
        .unwrap();

        assert_eq!(config.tick_interval(), Duration::from_millis(20));
        assert_eq!(config.history_size, defaults::HISTORY_SIZE);
        assert_eq!(config.queues.len(), 1);
        assert_eq!(config.queues["Move"].priority, 5);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let err = SchedulerConfig::from_toml_str("history_size = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = SchedulerConfig::from_toml_str("tick_interval_ms = \"fast\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = SchedulerConfig::from_toml_file("/nonexistent/mudcq.toml").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/mudcq.toml"));
    }
}
