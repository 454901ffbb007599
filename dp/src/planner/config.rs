//! Plan generator configuration

use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

/// Hard ceiling on focus tasks per day
pub const MAX_PRIORITIES: usize = 3;

/// Hard ceiling on the admin block in minutes
pub const MAX_ADMIN_CAPACITY_MINUTES: u32 = 90;

/// Limits and display settings for daily plans
///
/// Configured limits can only tighten the ceilings above.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlannerConfig {
    /// Maximum focus tasks per day
    #[serde(rename = "max-priorities", default = "default_max_priorities")]
    pub max_priorities: usize,

    /// Time box for the administrative block in minutes
    #[serde(rename = "admin-capacity-minutes", default = "default_admin_capacity_minutes")]
    pub admin_capacity_minutes: u32,

    /// Start of the admin block window ("HH:MM")
    #[serde(rename = "admin-window-start", default = "default_admin_window_start")]
    pub admin_window_start: String,
}

fn default_max_priorities() -> usize {
    MAX_PRIORITIES
}

fn default_admin_capacity_minutes() -> u32 {
    MAX_ADMIN_CAPACITY_MINUTES
}

fn default_admin_window_start() -> String {
    "14:00".to_string()
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            max_priorities: MAX_PRIORITIES,
            admin_capacity_minutes: MAX_ADMIN_CAPACITY_MINUTES,
            admin_window_start: "14:00".to_string(),
        }
    }
}

impl PlannerConfig {
    /// Focus slots actually used, never above [`MAX_PRIORITIES`]
    pub fn priority_limit(&self) -> usize {
        self.max_priorities.min(MAX_PRIORITIES)
    }

    /// Admin minutes actually used, never above [`MAX_ADMIN_CAPACITY_MINUTES`]
    pub fn admin_capacity(&self) -> u32 {
        self.admin_capacity_minutes.min(MAX_ADMIN_CAPACITY_MINUTES)
    }

    /// Display window for an admin block of `minutes`, e.g. "14:00-15:30"
    ///
    /// An unparseable start time falls back to 14:00.
    pub fn admin_window(&self, minutes: u32) -> String {
        let start = NaiveTime::parse_from_str(&self.admin_window_start, "%H:%M")
            .unwrap_or_else(|_| NaiveTime::from_hms_opt(14, 0, 0).unwrap_or_default());
        let end = start + Duration::minutes(i64::from(minutes));
        format!("{}-{}", start.format("%H:%M"), end.format("%H:%M"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = PlannerConfig::default();
        assert_eq!(config.max_priorities, 3);
        assert_eq!(config.admin_capacity_minutes, 90);
        assert_eq!(config.admin_window_start, "14:00");
    }

    #[test]
    fn test_admin_window() {
        let config = PlannerConfig::default();
        assert_eq!(config.admin_window(90), "14:00-15:30");
        assert_eq!(config.admin_window(0), "14:00-14:00");

        let morning = PlannerConfig {
            admin_window_start: "09:15".to_string(),
            ..Default::default()
        };
        assert_eq!(morning.admin_window(45), "09:15-10:00");
    }

    #[test]
    fn test_bad_window_start_falls_back() {
        let config = PlannerConfig {
            admin_window_start: "after lunch".to_string(),
            ..Default::default()
        };
        assert_eq!(config.admin_window(30), "14:00-14:30");
    }

    #[test]
    fn test_limits_only_tighten() {
        let loose: PlannerConfig =
            serde_yaml::from_str("max-priorities: 5\nadmin-capacity-minutes: 600\n").unwrap();
        assert_eq!(loose.priority_limit(), 3);
        assert_eq!(loose.admin_capacity(), 90);

        let tight = PlannerConfig {
            max_priorities: 1,
            admin_capacity_minutes: 30,
            ..Default::default()
        };
        assert_eq!(tight.priority_limit(), 1);
        assert_eq!(tight.admin_capacity(), 30);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: PlannerConfig = serde_yaml::from_str("admin-capacity-minutes: 60\n").unwrap();
        assert_eq!(config.admin_capacity_minutes, 60);
        assert_eq!(config.max_priorities, 3);
    }
}
