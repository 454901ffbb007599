//! Scheduler configuration

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Background scheduler configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Seconds between blocking-issue polls
    #[serde(rename = "poll-interval-secs", default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,

    /// Local time of day ("HH:MM") after which the daily plan is generated
    #[serde(rename = "daily-plan-time", default)]
    pub daily_plan_time: Option<String>,

    /// Pause after a failed poll cycle
    #[serde(rename = "error-backoff-secs", default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,

    /// How long the worker waits on an empty queue before rechecking for stop
    #[serde(rename = "dequeue-timeout-ms", default = "default_dequeue_timeout_ms")]
    pub dequeue_timeout_ms: u64,

    /// Upper bound on waiting for each loop during stop
    #[serde(rename = "join-timeout-secs", default = "default_join_timeout_secs")]
    pub join_timeout_secs: u64,
}

fn default_poll_interval_secs() -> u64 {
    300
}

fn default_error_backoff_secs() -> u64 {
    60
}

fn default_dequeue_timeout_ms() -> u64 {
    1000
}

fn default_join_timeout_secs() -> u64 {
    5
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            daily_plan_time: None,
            error_backoff_secs: 60,
            dequeue_timeout_ms: 1000,
            join_timeout_secs: 5,
        }
    }
}

impl SchedulerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_secs(self.error_backoff_secs)
    }

    pub fn dequeue_timeout(&self) -> Duration {
        Duration::from_millis(self.dequeue_timeout_ms)
    }

    pub fn join_timeout(&self) -> Duration {
        Duration::from_secs(self.join_timeout_secs)
    }

    /// Parsed daily plan trigger time; `None` when unset or malformed
    pub fn daily_plan_time(&self) -> Option<NaiveTime> {
        self.daily_plan_time
            .as_deref()
            .and_then(|s| NaiveTime::parse_from_str(s.trim(), "%H:%M").ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SchedulerConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(300));
        assert_eq!(config.error_backoff(), Duration::from_secs(60));
        assert_eq!(config.dequeue_timeout(), Duration::from_millis(1000));
        assert_eq!(config.join_timeout(), Duration::from_secs(5));
        assert!(config.daily_plan_time().is_none());
    }

    #[test]
    fn test_daily_plan_time_parse() {
        let config = SchedulerConfig {
            daily_plan_time: Some("08:30".to_string()),
            ..Default::default()
        };
        assert_eq!(config.daily_plan_time(), NaiveTime::from_hms_opt(8, 30, 0));

        let bad = SchedulerConfig {
            daily_plan_time: Some("half past eight".to_string()),
            ..Default::default()
        };
        assert!(bad.daily_plan_time().is_none());
    }

    #[test]
    fn test_deserialize_kebab_keys() {
        let yaml = "poll-interval-secs: 30\ndaily-plan-time: \"09:00\"\n";
        let config: SchedulerConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.poll_interval_secs, 30);
        assert_eq!(config.daily_plan_time.as_deref(), Some("09:00"));
        assert_eq!(config.join_timeout_secs, 5);
    }
}
