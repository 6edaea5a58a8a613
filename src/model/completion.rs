use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One entry in the completion log.
///
/// `occurrence` is `None` for the single occurrence of a non-recurring task
/// and the occurrence date for a recurring one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub task: String,
    #[serde(default)]
    pub occurrence: Option<NaiveDate>,
    pub completed: bool,
    /// Date the event was recorded
    pub recorded: NaiveDate,
}

/// Append-only record of completion changes.
///
/// The state of an occurrence is the last event logged for it; an occurrence
/// with no events is not completed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CompletionLog {
    events: Vec<CompletionEvent>,
}

impl CompletionLog {
    pub fn new() -> Self {
        CompletionLog::default()
    }

    pub(crate) fn push(&mut self, event: CompletionEvent) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Latest event for `(task, occurrence)`
    pub fn latest(&self, task: &str, occurrence: Option<NaiveDate>) -> Option<&CompletionEvent> {
        self.events
            .iter()
            .rev()
            .find(|e| e.task == task && e.occurrence == occurrence)
    }

    pub fn is_completed(&self, task: &str, occurrence: Option<NaiveDate>) -> bool {
        self.latest(task, occurrence).is_some_and(|e| e.completed)
    }

    /// Per-date completion map of a recurring task, latest event winning
    pub fn completions(&self, task: &str) -> BTreeMap<NaiveDate, bool> {
        let mut map = BTreeMap::new();
        for e in self.history(task) {
            if let Some(date) = e.occurrence {
                map.insert(date, e.completed);
            }
        }
        map
    }

    /// All events for a task, oldest first
    pub fn history<'a>(&'a self, task: &'a str) -> impl Iterator<Item = &'a CompletionEvent> + 'a {
        self.events.iter().filter(move |e| e.task == task)
    }
}
