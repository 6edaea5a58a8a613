use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::recurrence::{CustomUnit, Interval, Recurrence};

/// Calendar date format used everywhere a date is written as text
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Parse a `YYYY-MM-DD` date
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).ok()
}

/// A task, either one-off or recurring.
///
/// For recurring tasks `due_date` is the anchor of the series (its first
/// occurrence). Completion state does not live here; see
/// [`CompletionLog`](super::completion::CompletionLog).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "TaskRecord", into = "TaskRecord")]
pub struct Task {
    /// Task ID like `T-007`
    pub id: String,
    pub title: String,
    /// Missing or malformed due dates make the task never applicable
    pub due_date: Option<NaiveDate>,
    pub recurrence: Recurrence,
    /// Date the task was added
    pub created: Option<NaiveDate>,
}

impl Task {
    pub fn new(id: String, title: String, due_date: Option<NaiveDate>, recurrence: Recurrence) -> Self {
        Task {
            id,
            title,
            due_date,
            recurrence,
            created: None,
        }
    }

    pub fn is_recurring(&self) -> bool {
        self.recurrence.is_recurring()
    }
}

/// Flat on-disk shape of a task in `tasks.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
struct TaskRecord {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    due_date: Option<String>,
    #[serde(default = "default_recurrence")]
    recurrence: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_interval: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    custom_unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created: Option<String>,
}

fn default_recurrence() -> String {
    "none".to_string()
}

/// Parse a stored date, dropping it with a warning if malformed
fn stored_date(task: &str, field: &str, value: Option<&str>) -> Option<NaiveDate> {
    let s = value?;
    let parsed = parse_date(s);
    if parsed.is_none() {
        log::warn!("task {}: ignoring malformed {} {:?}", task, field, s);
    }
    parsed
}

impl From<TaskRecord> for Task {
    fn from(rec: TaskRecord) -> Self {
        let due_date = stored_date(&rec.id, "due date", rec.due_date.as_deref());
        let created = stored_date(&rec.id, "created date", rec.created.as_deref());

        let recurrence = match rec.recurrence.as_str() {
            "none" | "" => Recurrence::None,
            "daily" => Recurrence::Daily,
            "weekly" => Recurrence::Weekly,
            "monthly" => Recurrence::Monthly,
            "custom" => {
                let interval = rec.custom_interval.and_then(Interval::new);
                let unit = rec.custom_unit.as_deref().and_then(CustomUnit::parse_unit);
                match (interval, unit) {
                    (Some(interval), Some(unit)) => Recurrence::Custom { interval, unit },
                    _ => {
                        log::warn!(
                            "task {}: custom recurrence needs a positive interval and a unit (got {:?} {:?})",
                            rec.id,
                            rec.custom_interval,
                            rec.custom_unit
                        );
                        Recurrence::Unrecognized(rec.recurrence.clone())
                    }
                }
            }
            other => {
                log::warn!("task {}: unrecognized recurrence {:?}", rec.id, other);
                Recurrence::Unrecognized(other.to_string())
            }
        };

        Task {
            id: rec.id,
            title: rec.title,
            due_date,
            recurrence,
            created,
        }
    }
}

impl From<Task> for TaskRecord {
    fn from(task: Task) -> Self {
        let (custom_interval, custom_unit) = match &task.recurrence {
            Recurrence::Custom { interval, unit } => {
                (Some(interval.get()), Some(unit.as_str().to_string()))
            }
            _ => (None, None),
        };
        TaskRecord {
            recurrence: task.recurrence.kind().to_string(),
            id: task.id,
            title: task.title,
            due_date: task.due_date.map(|d| d.format(DATE_FORMAT).to_string()),
            custom_interval,
            custom_unit,
            created: task.created.map(|d| d.format(DATE_FORMAT).to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    #[test]
    fn test_parses_custom_task() {
        let task: Task = serde_json::from_str(
            r#"{"id":"T-001","title":"Stretch","due_date":"2024-03-01","recurrence":"custom","custom_interval":3,"custom_unit":"days"}"#,
        )
        .unwrap();
        assert_eq!(task.due_date, Some(date("2024-03-01")));
        assert_eq!(
            task.recurrence,
            Recurrence::Custom {
                interval: Interval::new(3).unwrap(),
                unit: CustomUnit::Days,
            }
        );
    }

    #[test]
    fn test_malformed_due_date_loads_as_none() {
        let task: Task =
            serde_json::from_str(r#"{"id":"T-002","due_date":"03/01/2024","recurrence":"daily"}"#).unwrap();
        assert_eq!(task.due_date, None);
        assert_eq!(task.recurrence, Recurrence::Daily);
    }

    #[test]
    fn test_malformed_created_date_loads_as_none() {
        let task: Task = serde_json::from_str(
            r#"{"id":"T-006","due_date":"2024-03-01","recurrence":"weekly","created":"yesterday"}"#,
        )
        .unwrap();
        assert_eq!(task.created, None);
        assert_eq!(task.due_date, Some(date("2024-03-01")));

        let task: Task = serde_json::from_str(r#"{"id":"T-007","created":"2024-02-28"}"#).unwrap();
        assert_eq!(task.created, Some(date("2024-02-28")));
        assert_eq!(serde_json::to_value(&task).unwrap()["created"], "2024-02-28");
    }

    #[test]
    fn test_zero_interval_loads_as_unrecognized() {
        let task: Task = serde_json::from_str(
            r#"{"id":"T-003","due_date":"2024-03-01","recurrence":"custom","custom_interval":0,"custom_unit":"days"}"#,
        )
        .unwrap();
        assert_eq!(task.recurrence, Recurrence::Unrecognized("custom".into()));
    }

    #[test]
    fn test_unknown_recurrence_survives_round_trip() {
        let task: Task =
            serde_json::from_str(r#"{"id":"T-004","due_date":"2024-03-01","recurrence":"hourly"}"#).unwrap();
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["recurrence"], "hourly");
        assert_eq!(json["due_date"], "2024-03-01");
        assert!(json.get("custom_interval").is_none());
    }

    #[test]
    fn test_missing_recurrence_defaults_to_none() {
        let task: Task = serde_json::from_str(r#"{"id":"T-005","title":"Call mum"}"#).unwrap();
        assert_eq!(task.recurrence, Recurrence::None);
        assert_eq!(task.due_date, None);
        assert!(!task.is_recurring());
    }
}
