use serde::{Deserialize, Serialize};

use super::recurrence::MonthMode;

/// Configuration from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub project: ProjectInfo,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    #[serde(default)]
    pub ids: IdConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectInfo {
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// How monthly and custom-month recurrences are stepped
    #[serde(default)]
    pub month_mode: MonthMode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IdConfig {
    /// Prefix for new task IDs, e.g. `T` gives `T-001`
    #[serde(default = "default_prefix")]
    pub prefix: String,
}

impl Default for IdConfig {
    fn default() -> Self {
        IdConfig {
            prefix: default_prefix(),
        }
    }
}

fn default_prefix() -> String {
    "T".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: ProjectConfig = toml::from_str("[project]\nname = \"Home\"\n").unwrap();
        assert_eq!(config.project.name, "Home");
        assert_eq!(config.schedule.month_mode, MonthMode::ThirtyDays);
        assert_eq!(config.ids.prefix, "T");
    }

    #[test]
    fn test_full_config() {
        let config: ProjectConfig = toml::from_str(
            r#"
[project]
name = "Work"

[schedule]
month_mode = "calendar"

[ids]
prefix = "W"
"#,
        )
        .unwrap();
        assert_eq!(config.schedule.month_mode, MonthMode::Calendar);
        assert_eq!(config.ids.prefix, "W");
    }

    #[test]
    fn test_missing_project_section_is_an_error() {
        assert!(toml::from_str::<ProjectConfig>("[ids]\nprefix = \"X\"\n").is_err());
    }
}
