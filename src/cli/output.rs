use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::completion::{CompletionEvent, CompletionLog};
use crate::model::recurrence::Recurrence;
use crate::model::task::Task;
use crate::ops::completion;
use crate::ops::schedule::Schedule;
use crate::util::unicode::fit_to_width;

/// Title column width in listings
const TITLE_WIDTH: usize = 32;

/// Everything the listings show about a task as of `today`
#[derive(Debug, Clone)]
pub struct TaskView<'a> {
    pub task: &'a Task,
    /// One-off: the completed flag. Recurring: today's occurrence.
    pub completed: bool,
    pub completed_date: Option<NaiveDate>,
    pub next_due: Option<NaiveDate>,
    pub overdue: bool,
}

pub fn task_view<'a>(task: &'a Task, log: &CompletionLog, schedule: &Schedule, today: NaiveDate) -> TaskView<'a> {
    TaskView {
        task,
        completed: completion::get_completed_for_date(task, log, today),
        completed_date: completion::completed_date(task, log),
        next_due: completion::next_due(schedule, task, log, today),
        overdue: completion::is_overdue(task, log, today),
    }
}

// ---------------------------------------------------------------------------
// JSON output structs
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct TaskJson {
    pub id: String,
    pub title: String,
    pub recurrence: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_interval: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_unit: Option<String>,
    pub due_date: Option<NaiveDate>,
    pub next_due: Option<NaiveDate>,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_date: Option<NaiveDate>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub overdue: bool,
}

#[derive(Serialize)]
pub struct TaskDetailJson {
    #[serde(flatten)]
    pub task: TaskJson,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub created: Option<NaiveDate>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub completions: BTreeMap<NaiveDate, bool>,
    pub history: Vec<CompletionEvent>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub upcoming: Vec<NaiveDate>,
}

#[derive(Serialize)]
pub struct AgendaJson {
    pub date: NaiveDate,
    pub due: Vec<AgendaItemJson>,
    pub overdue: Vec<TaskJson>,
}

#[derive(Serialize)]
pub struct AgendaItemJson {
    pub id: String,
    pub title: String,
    pub recurrence: String,
    pub completed: bool,
}

#[derive(Serialize)]
pub struct NextJson {
    pub id: String,
    pub next_due: Option<NaiveDate>,
}

#[derive(Serialize)]
pub struct ToggleJson {
    pub id: String,
    pub date: NaiveDate,
    pub completed: bool,
}

// ---------------------------------------------------------------------------
// Conversions
// ---------------------------------------------------------------------------

pub fn task_to_json(view: &TaskView) -> TaskJson {
    let task = view.task;
    let (custom_interval, custom_unit) = match &task.recurrence {
        Recurrence::Custom { interval, unit } => (Some(interval.get()), Some(unit.to_string())),
        _ => (None, None),
    };
    TaskJson {
        id: task.id.clone(),
        title: task.title.clone(),
        recurrence: task.recurrence.kind().to_string(),
        custom_interval,
        custom_unit,
        due_date: task.due_date,
        next_due: view.next_due,
        completed: view.completed,
        completed_date: view.completed_date,
        overdue: view.overdue,
    }
}

// ---------------------------------------------------------------------------
// Human-readable formatting
// ---------------------------------------------------------------------------

/// Short description of how a task repeats
pub fn describe_recurrence(recurrence: &Recurrence) -> String {
    match recurrence {
        Recurrence::None => "once".to_string(),
        other => other.to_string(),
    }
}

fn checkbox(completed: bool) -> char {
    if completed { 'x' } else { ' ' }
}

fn describe_due(view: &TaskView) -> String {
    if let Some(done) = view.completed_date {
        return format!("done {}", done);
    }
    match view.next_due {
        Some(d) if view.overdue => format!("overdue {}", d),
        Some(d) if view.task.is_recurring() => format!("next {}", d),
        Some(d) => format!("due {}", d),
        None if view.task.due_date.is_none() => "no date".to_string(),
        None => "-".to_string(),
    }
}

/// Format a task as a one-line summary
pub fn format_task_line(view: &TaskView) -> String {
    format!(
        "[{}] {}  {}  {:<14} {}",
        checkbox(view.completed),
        view.task.id,
        fit_to_width(&view.task.title, TITLE_WIDTH),
        describe_recurrence(&view.task.recurrence),
        describe_due(view)
    )
    .trim_end()
    .to_string()
}

/// Format detailed task view
pub fn format_task_detail(
    view: &TaskView,
    history: &[&CompletionEvent],
    upcoming: &[NaiveDate],
) -> Vec<String> {
    let task = view.task;
    let mut lines = Vec::new();

    lines.push(format!("[{}] {} {}", checkbox(view.completed), task.id, task.title));
    lines.push(format!("repeat: {}", describe_recurrence(&task.recurrence)));
    match task.due_date {
        Some(d) if task.is_recurring() => lines.push(format!("starts: {}", d)),
        Some(d) => lines.push(format!("due: {}", d)),
        None => lines.push("due: none".to_string()),
    }
    if let Some(created) = task.created {
        lines.push(format!("created: {}", created));
    }
    if let Some(done) = view.completed_date {
        lines.push(format!("completed: {}", done));
    } else if let Some(next) = view.next_due {
        lines.push(format!("next due: {}", next));
    }

    if !history.is_empty() {
        lines.push(String::new());
        lines.push("history:".to_string());
        for e in history {
            let what = if e.completed { "done" } else { "undone" };
            match e.occurrence {
                Some(occ) => lines.push(format!("  {} {} (on {})", occ, what, e.recorded)),
                None => lines.push(format!("  {} {}", e.recorded, what)),
            }
        }
    }

    if !upcoming.is_empty() {
        lines.push(String::new());
        lines.push("upcoming:".to_string());
        for d in upcoming {
            lines.push(format!("  {}", d));
        }
    }

    lines
}

/// Parse a user-supplied date
pub fn parse_date_arg(s: &str) -> Result<NaiveDate, String> {
    crate::model::task::parse_date(s).ok_or_else(|| format!("invalid date '{}' (expected YYYY-MM-DD)", s))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::recurrence::{CustomUnit, Interval};
    use pretty_assertions::assert_eq;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn view<'a>(task: &'a Task, next: Option<&str>) -> TaskView<'a> {
        TaskView {
            task,
            completed: false,
            completed_date: None,
            next_due: next.map(date),
            overdue: false,
        }
    }

    #[test]
    fn test_task_line_recurring() {
        let task = Task::new("T-001".into(), "Water plants".into(), Some(date("2024-03-01")), Recurrence::Weekly);
        let line = format_task_line(&view(&task, Some("2024-03-15")));
        assert_eq!(
            line,
            format!("[ ] T-001  Water plants{}  weekly         next 2024-03-15", " ".repeat(20))
        );
    }

    #[test]
    fn test_task_line_without_date() {
        let task = Task::new("T-002".into(), "Someday".into(), None, Recurrence::None);
        let line = format_task_line(&view(&task, None));
        assert!(line.ends_with("once           no date"));
    }

    #[test]
    fn test_describe_custom() {
        let r = Recurrence::Custom {
            interval: Interval::new(3).unwrap(),
            unit: CustomUnit::Days,
        };
        assert_eq!(describe_recurrence(&r), "every 3 days");
        assert_eq!(describe_recurrence(&Recurrence::None), "once");
    }

    #[test]
    fn test_detail_lists_history_and_upcoming() {
        let task = Task::new("T-001".into(), "Stretch".into(), Some(date("2024-03-01")), Recurrence::Daily);
        let event = CompletionEvent {
            task: "T-001".into(),
            occurrence: Some(date("2024-03-09")),
            completed: true,
            recorded: date("2024-03-10"),
        };
        let lines = format_task_detail(&view(&task, Some("2024-03-10")), &[&event], &[date("2024-03-10")]);
        assert_eq!(
            lines,
            vec![
                "[ ] T-001 Stretch",
                "repeat: daily",
                "starts: 2024-03-01",
                "next due: 2024-03-10",
                "",
                "history:",
                "  2024-03-09 done (on 2024-03-10)",
                "",
                "upcoming:",
                "  2024-03-10",
            ]
        );
    }

    #[test]
    fn test_json_marks_custom_fields() {
        let task = Task::new(
            "T-003".into(),
            "Backup".into(),
            Some(date("2024-03-01")),
            Recurrence::Custom {
                interval: Interval::new(2).unwrap(),
                unit: CustomUnit::Weeks,
            },
        );
        let json = serde_json::to_value(task_to_json(&view(&task, Some("2024-03-15")))).unwrap();
        assert_eq!(json["recurrence"], "custom");
        assert_eq!(json["custom_interval"], 2);
        assert_eq!(json["custom_unit"], "weeks");
        assert_eq!(json["next_due"], "2024-03-15");
        assert!(json.get("overdue").is_none());
    }

    #[test]
    fn test_parse_date_arg_errors() {
        assert_eq!(parse_date_arg("2024-03-10").unwrap(), date("2024-03-10"));
        assert!(parse_date_arg("10/03/2024").is_err());
    }
}
