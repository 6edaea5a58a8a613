use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::Serialize;

use crate::model::book::TaskBook;
use crate::model::completion::{CompletionEvent, CompletionLog};
use crate::model::task::Task;
use crate::ops::schedule::Schedule;
use crate::ops::task_ops::{TaskError, find_task};

/// Log key for a task's occurrence on `date`. One-off tasks have a single
/// occurrence regardless of date.
fn occurrence_key(task: &Task, date: NaiveDate) -> Option<NaiveDate> {
    task.is_recurring().then_some(date)
}

/// Completion state of `task` as seen from `date`
pub fn get_completed_for_date(task: &Task, log: &CompletionLog, date: NaiveDate) -> bool {
    log.is_completed(&task.id, occurrence_key(task, date))
}

/// Whether a one-off task is done. Always false for recurring tasks.
pub fn is_completed(task: &Task, log: &CompletionLog) -> bool {
    !task.is_recurring() && log.is_completed(&task.id, None)
}

/// Date a one-off task was completed
pub fn completed_date(task: &Task, log: &CompletionLog) -> Option<NaiveDate> {
    if task.is_recurring() {
        return None;
    }
    log.latest(&task.id, None)
        .filter(|e| e.completed)
        .map(|e| e.recorded)
}

/// Per-occurrence completion map of a recurring task (empty for one-off tasks)
pub fn completions(task: &Task, log: &CompletionLog) -> BTreeMap<NaiveDate, bool> {
    if task.is_recurring() {
        log.completions(&task.id)
    } else {
        BTreeMap::new()
    }
}

/// Flip today's completion state. Returns the new state.
///
/// For one-off tasks this flips the single completed flag. For recurring
/// tasks it flips the occurrence dated `today` only; the series is untouched.
pub fn toggle_completion(book: &mut TaskBook, id: &str, today: NaiveDate) -> Result<bool, TaskError> {
    let task = find_task(book, id)?;
    let occurrence = occurrence_key(task, today);
    let completed = !book.log().is_completed(id, occurrence);
    book.record_completion(CompletionEvent {
        task: id.to_string(),
        occurrence,
        completed,
        recorded: today,
    });
    log::info!("{} {} for {:?}", id, if completed { "completed" } else { "reopened" }, occurrence);
    Ok(completed)
}

/// First occurrence on or after `today` not marked completed.
///
/// One-off tasks return their due date until completed, even when it is in
/// the past.
pub fn next_due(schedule: &Schedule, task: &Task, log: &CompletionLog, today: NaiveDate) -> Option<NaiveDate> {
    if !task.is_recurring() {
        return task.due_date.filter(|_| !log.is_completed(&task.id, None));
    }
    // Completed future occurrences are bounded by the log size
    schedule
        .upcoming(task, today)
        .take(log.len() + 1)
        .find(|d| !log.is_completed(&task.id, Some(*d)))
}

/// One-off task past its due date and not completed
pub fn is_overdue(task: &Task, log: &CompletionLog, today: NaiveDate) -> bool {
    !task.is_recurring() && task.due_date.is_some_and(|d| d < today) && !log.is_completed(&task.id, None)
}

/// Result of [`complete_and_advance`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Advance {
    pub task: String,
    /// Occurrence that was marked completed
    pub completed: Option<NaiveDate>,
    /// Next pending occurrence, `None` for one-off tasks
    pub next_due: Option<NaiveDate>,
}

/// Complete the pending occurrence and roll the task forward.
///
/// Recurring tasks complete their next due occurrence (skipping any missed
/// ones before `today`) and report the following one, which is always
/// strictly later. One-off tasks are simply marked completed.
pub fn complete_and_advance(
    book: &mut TaskBook,
    schedule: &Schedule,
    id: &str,
    today: NaiveDate,
) -> Result<Advance, TaskError> {
    let task = find_task(book, id)?.clone();

    if !task.is_recurring() {
        if !is_completed(&task, book.log()) {
            book.record_completion(CompletionEvent {
                task: task.id.clone(),
                occurrence: None,
                completed: true,
                recorded: today,
            });
        }
        return Ok(Advance {
            task: task.id,
            completed: task.due_date,
            next_due: None,
        });
    }

    let pending = next_due(schedule, &task, book.log(), today)
        .ok_or_else(|| TaskError::NoUpcomingOccurrence(id.to_string()))?;
    book.record_completion(CompletionEvent {
        task: task.id.clone(),
        occurrence: Some(pending),
        completed: true,
        recorded: today,
    });
    let next = next_due(schedule, &task, book.log(), today);
    log::info!("{} completed {}, next due {:?}", id, pending, next);

    Ok(Advance {
        task: task.id,
        completed: Some(pending),
        next_due: next,
    })
}
