use chrono::NaiveDate;
use regex::Regex;

use crate::model::book::TaskBook;
use crate::model::task::Task;
use crate::ops::completion::{get_completed_for_date, is_overdue};
use crate::ops::schedule::Schedule;

/// A task due on the agenda date, with its completion state for that date
#[derive(Debug, Clone, Copy)]
pub struct AgendaEntry<'a> {
    pub task: &'a Task,
    pub completed: bool,
}

/// Tasks applicable on `date`, in book order
pub fn agenda<'a>(book: &'a TaskBook, schedule: &Schedule, date: NaiveDate) -> Vec<AgendaEntry<'a>> {
    book.tasks()
        .filter(|t| schedule.is_applicable(t, date))
        .map(|task| AgendaEntry {
            task,
            completed: get_completed_for_date(task, book.log(), date),
        })
        .collect()
}

/// Open one-off tasks due before `today`
pub fn overdue(book: &TaskBook, today: NaiveDate) -> Vec<&Task> {
    book.tasks()
        .filter(|t| is_overdue(t, book.log(), today))
        .collect()
}

/// Filters for the task listing
#[derive(Debug, Default)]
pub struct TaskFilter {
    /// Recurrence keyword (`none`, `daily`, ..., or `recurring` for any repeating task)
    pub repeat: Option<String>,
    /// Regex matched against the title
    pub pattern: Option<Regex>,
}

pub fn filter_tasks<'a>(book: &'a TaskBook, filter: &TaskFilter) -> Vec<&'a Task> {
    book.tasks()
        .filter(|t| match filter.repeat.as_deref() {
            None => true,
            Some("recurring") => t.is_recurring(),
            Some(kind) => t.recurrence.kind() == kind,
        })
        .filter(|t| filter.pattern.as_ref().is_none_or(|re| re.is_match(&t.title)))
        .collect()
}
