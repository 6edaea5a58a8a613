use chrono::NaiveDate;

use crate::model::book::TaskBook;
use crate::model::recurrence::{CustomUnit, Interval, Recurrence};
use crate::model::task::Task;

/// Error type for task operations
#[derive(Debug, thiserror::Error)]
pub enum TaskError {
    #[error("task not found: {0}")]
    NotFound(String),
    #[error("title cannot be empty")]
    EmptyTitle,
    #[error("custom interval must be at least 1 (got {0})")]
    InvalidInterval(u32),
    #[error("unknown recurrence '{0}' (expected: none, daily, weekly, monthly, custom)")]
    UnknownRecurrence(String),
    #[error("unknown interval unit '{0}' (expected: days, weeks, months)")]
    UnknownUnit(String),
    #[error("custom recurrence needs an {0}")]
    MissingCustomField(&'static str),
    #[error("interval and unit only apply to custom recurrence")]
    UnexpectedCustomField,
    #[error("recurring tasks need a due date")]
    MissingDueDate,
    #[error("task {0} has no upcoming occurrence")]
    NoUpcomingOccurrence(String),
    #[error("no task ids left for prefix {0}")]
    IdsExhausted(String),
}

/// Build a recurrence rule from user input, rejecting anything the engine
/// could not schedule.
pub fn parse_recurrence(
    kind: &str,
    interval: Option<u32>,
    unit: Option<&str>,
) -> Result<Recurrence, TaskError> {
    let kind = kind.trim().to_ascii_lowercase();
    if kind != "custom" && (interval.is_some() || unit.is_some()) {
        return Err(TaskError::UnexpectedCustomField);
    }
    match kind.as_str() {
        "none" | "once" => Ok(Recurrence::None),
        "daily" => Ok(Recurrence::Daily),
        "weekly" => Ok(Recurrence::Weekly),
        "monthly" => Ok(Recurrence::Monthly),
        "custom" => {
            let n = interval.ok_or(TaskError::MissingCustomField("interval"))?;
            let interval = Interval::new(n).ok_or(TaskError::InvalidInterval(n))?;
            let unit = unit.ok_or(TaskError::MissingCustomField("interval unit"))?;
            let unit = CustomUnit::parse_unit(unit).ok_or_else(|| TaskError::UnknownUnit(unit.to_string()))?;
            Ok(Recurrence::Custom { interval, unit })
        }
        _ => Err(TaskError::UnknownRecurrence(kind)),
    }
}

/// Fields supplied when creating a task
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub due_date: Option<NaiveDate>,
    pub recurrence: Recurrence,
}

fn check_schedulable(due_date: Option<NaiveDate>, recurrence: &Recurrence) -> Result<(), TaskError> {
    if let Recurrence::Unrecognized(kind) = recurrence {
        return Err(TaskError::UnknownRecurrence(kind.clone()));
    }
    if recurrence.is_recurring() && due_date.is_none() {
        return Err(TaskError::MissingDueDate);
    }
    Ok(())
}

/// Add a task to the book. Returns the assigned ID.
pub fn add_task(book: &mut TaskBook, new: NewTask, prefix: &str, today: NaiveDate) -> Result<String, TaskError> {
    let title = new.title.trim().to_string();
    if title.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    check_schedulable(new.due_date, &new.recurrence)?;

    let id = book
        .allocate_id(prefix)
        .ok_or_else(|| TaskError::IdsExhausted(prefix.to_string()))?;
    let mut task = Task::new(id.clone(), title, new.due_date, new.recurrence);
    task.created = Some(today);
    book.insert(task);
    Ok(id)
}

pub fn find_task<'a>(book: &'a TaskBook, id: &str) -> Result<&'a Task, TaskError> {
    book.get(id).ok_or_else(|| TaskError::NotFound(id.to_string()))
}

pub fn edit_title(book: &mut TaskBook, id: &str, title: String) -> Result<(), TaskError> {
    let title = title.trim().to_string();
    if title.is_empty() {
        return Err(TaskError::EmptyTitle);
    }
    book.update(id, |t| t.title = title)
        .ok_or_else(|| TaskError::NotFound(id.to_string()))
}

/// Replace the due date and recurrence together, validating the result as a whole
pub fn edit_schedule(
    book: &mut TaskBook,
    id: &str,
    due_date: Option<NaiveDate>,
    recurrence: Recurrence,
) -> Result<(), TaskError> {
    find_task(book, id)?;
    check_schedulable(due_date, &recurrence)?;
    book.update(id, |t| {
        t.due_date = due_date;
        t.recurrence = recurrence;
    })
    .ok_or_else(|| TaskError::NotFound(id.to_string()))
}

/// Delete a task, ending its series. Completion history stays in the log.
pub fn delete_task(book: &mut TaskBook, id: &str) -> Result<Task, TaskError> {
    book.remove(id).ok_or_else(|| TaskError::NotFound(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn new_task(title: &str, due: Option<&str>, recurrence: Recurrence) -> NewTask {
        NewTask {
            title: title.into(),
            due_date: due.map(date),
            recurrence,
        }
    }

    #[test]
    fn test_parse_recurrence_simple() {
        assert_eq!(parse_recurrence("Weekly", None, None).unwrap(), Recurrence::Weekly);
        assert_eq!(parse_recurrence("once", None, None).unwrap(), Recurrence::None);
    }

    #[test]
    fn test_parse_recurrence_custom() {
        let r = parse_recurrence("custom", Some(3), Some("days")).unwrap();
        assert_eq!(
            r,
            Recurrence::Custom {
                interval: Interval::new(3).unwrap(),
                unit: CustomUnit::Days,
            }
        );
    }

    #[test]
    fn test_parse_recurrence_rejects_zero_interval() {
        let err = parse_recurrence("custom", Some(0), Some("days")).unwrap_err();
        assert!(matches!(err, TaskError::InvalidInterval(0)));
    }

    #[test]
    fn test_parse_recurrence_errors() {
        assert!(matches!(
            parse_recurrence("custom", None, Some("days")),
            Err(TaskError::MissingCustomField(_))
        ));
        assert!(matches!(
            parse_recurrence("custom", Some(2), None),
            Err(TaskError::MissingCustomField(_))
        ));
        assert!(matches!(
            parse_recurrence("custom", Some(2), Some("years")),
            Err(TaskError::UnknownUnit(_))
        ));
        assert!(matches!(
            parse_recurrence("weekly", Some(2), None),
            Err(TaskError::UnexpectedCustomField)
        ));
        assert!(matches!(
            parse_recurrence("hourly", None, None),
            Err(TaskError::UnknownRecurrence(_))
        ));
    }

    #[test]
    fn test_add_task() {
        let mut book = TaskBook::new();
        let id = add_task(
            &mut book,
            new_task("  Water plants ", Some("2024-03-01"), Recurrence::Weekly),
            "T",
            date("2024-02-28"),
        )
        .unwrap();
        assert_eq!(id, "T-001");
        let task = book.get(&id).unwrap();
        assert_eq!(task.title, "Water plants");
        assert_eq!(task.created, Some(date("2024-02-28")));
    }

    #[test]
    fn test_add_recurring_without_due_date() {
        let mut book = TaskBook::new();
        let err = add_task(&mut book, new_task("Gym", None, Recurrence::Daily), "T", date("2024-03-01"));
        assert!(matches!(err, Err(TaskError::MissingDueDate)));
        assert!(book.is_empty());
    }

    #[test]
    fn test_add_one_off_without_due_date() {
        let mut book = TaskBook::new();
        let id = add_task(&mut book, new_task("Someday", None, Recurrence::None), "X", date("2024-03-01")).unwrap();
        assert_eq!(id, "X-001");
    }

    #[test]
    fn test_add_empty_title() {
        let mut book = TaskBook::new();
        let err = add_task(&mut book, new_task("   ", None, Recurrence::None), "T", date("2024-03-01"));
        assert!(matches!(err, Err(TaskError::EmptyTitle)));
    }

    #[test]
    fn test_edit_due_date_on_recurring_requires_date() {
        let mut book = TaskBook::new();
        let id = add_task(&mut book, new_task("Gym", Some("2024-03-01"), Recurrence::Daily), "T", date("2024-03-01"))
            .unwrap();
        assert!(matches!(
            edit_schedule(&mut book, &id, None, Recurrence::Daily),
            Err(TaskError::MissingDueDate)
        ));
        edit_schedule(&mut book, &id, Some(date("2024-03-05")), Recurrence::Daily).unwrap();
        assert_eq!(book.get(&id).unwrap().due_date, Some(date("2024-03-05")));
    }

    #[test]
    fn test_edit_recurrence_and_title() {
        let mut book = TaskBook::new();
        let id = add_task(&mut book, new_task("Pay rent", Some("2024-03-01"), Recurrence::None), "T", date("2024-03-01"))
            .unwrap();
        edit_schedule(&mut book, &id, Some(date("2024-03-01")), Recurrence::Monthly).unwrap();
        edit_title(&mut book, &id, "Pay the rent".into()).unwrap();
        let task = book.get(&id).unwrap();
        assert_eq!(task.recurrence, Recurrence::Monthly);
        assert_eq!(task.title, "Pay the rent");
    }

    #[test]
    fn test_edit_schedule_switches_to_one_off_without_date() {
        let mut book = TaskBook::new();
        let id = add_task(&mut book, new_task("Gym", Some("2024-03-01"), Recurrence::Daily), "T", date("2024-03-01"))
            .unwrap();
        // Clearing the date alone is rejected, but together with dropping the recurrence it is fine
        assert!(edit_schedule(&mut book, &id, None, Recurrence::Daily).is_err());
        edit_schedule(&mut book, &id, None, Recurrence::None).unwrap();
        let task = book.get(&id).unwrap();
        assert_eq!(task.due_date, None);
        assert!(!task.is_recurring());
    }

    #[test]
    fn test_add_task_when_ids_exhausted() {
        let file: crate::model::book::BookFile = serde_json::from_str(r#"{"next_id":4294967295}"#).unwrap();
        let mut book = TaskBook::from_file(file);
        let err = add_task(&mut book, new_task("One more", None, Recurrence::None), "T", date("2024-03-01"));
        assert!(matches!(err, Err(TaskError::IdsExhausted(ref p)) if p == "T"));
        assert!(book.is_empty());
    }

    #[test]
    fn test_delete_task() {
        let mut book = TaskBook::new();
        let id = add_task(&mut book, new_task("Gym", Some("2024-03-01"), Recurrence::Daily), "T", date("2024-03-01"))
            .unwrap();
        let removed = delete_task(&mut book, &id).unwrap();
        assert_eq!(removed.title, "Gym");
        assert!(matches!(delete_task(&mut book, &id), Err(TaskError::NotFound(_))));
    }
}
