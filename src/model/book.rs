use std::fmt;

use chrono::NaiveDate;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use super::completion::{CompletionEvent, CompletionLog};
use super::task::Task;

/// A write made to a [`TaskBook`], delivered to subscribers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Added(String),
    Updated(String),
    Removed(String),
    Completion {
        task: String,
        occurrence: Option<NaiveDate>,
        completed: bool,
    },
}

impl Change {
    pub fn task_id(&self) -> &str {
        match self {
            Change::Added(id) | Change::Updated(id) | Change::Removed(id) => id,
            Change::Completion { task, .. } => task,
        }
    }
}

type Subscriber = Box<dyn FnMut(&Change)>;

/// The task collection plus its completion log.
///
/// Every write goes through a method here and is announced synchronously to
/// all subscribers before the method returns.
#[derive(Default)]
pub struct TaskBook {
    tasks: IndexMap<String, Task>,
    log: CompletionLog,
    next_id: u32,
    subscribers: Vec<Subscriber>,
}

impl fmt::Debug for TaskBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskBook")
            .field("tasks", &self.tasks)
            .field("log", &self.log)
            .field("next_id", &self.next_id)
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}

impl TaskBook {
    pub fn new() -> Self {
        TaskBook {
            next_id: 1,
            ..Default::default()
        }
    }

    /// Register a callback invoked after every write
    pub fn subscribe(&mut self, callback: impl FnMut(&Change) + 'static) {
        self.subscribers.push(Box::new(callback));
    }

    fn notify(&mut self, change: Change) {
        for sub in self.subscribers.iter_mut() {
            sub(&change);
        }
    }

    pub fn tasks(&self) -> impl Iterator<Item = &Task> {
        self.tasks.values()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.get(id)
    }

    pub fn log(&self) -> &CompletionLog {
        &self.log
    }

    /// Hand out the next task number. Numbers are never reused, so `None`
    /// once the counter is exhausted.
    pub fn allocate_id(&mut self, prefix: &str) -> Option<String> {
        let mut n = self.next_id.max(1);
        loop {
            let id = format!("{}-{:03}", prefix, n);
            let next = n.checked_add(1)?;
            if !self.tasks.contains_key(&id) {
                self.next_id = next;
                return Some(id);
            }
            n = next;
        }
    }

    pub fn insert(&mut self, task: Task) {
        let id = task.id.clone();
        let existed = self.tasks.insert(id.clone(), task).is_some();
        self.notify(if existed {
            Change::Updated(id)
        } else {
            Change::Added(id)
        });
    }

    /// Apply `edit` to a task. Returns `None` if the task does not exist.
    pub fn update<R>(&mut self, id: &str, edit: impl FnOnce(&mut Task) -> R) -> Option<R> {
        let task = self.tasks.get_mut(id)?;
        let result = edit(task);
        self.notify(Change::Updated(id.to_string()));
        Some(result)
    }

    /// Remove a task, keeping its completion history in the log
    pub fn remove(&mut self, id: &str) -> Option<Task> {
        let task = self.tasks.shift_remove(id)?;
        self.notify(Change::Removed(id.to_string()));
        Some(task)
    }

    pub fn record_completion(&mut self, event: CompletionEvent) {
        let change = Change::Completion {
            task: event.task.clone(),
            occurrence: event.occurrence,
            completed: event.completed,
        };
        self.log.push(event);
        self.notify(change);
    }
}

/// On-disk shape of `tasks.json`
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct BookFile {
    #[serde(default = "default_next_id")]
    pub next_id: u32,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub completions: CompletionLog,
}

fn default_next_id() -> u32 {
    1
}

impl TaskBook {
    pub(crate) fn from_file(file: BookFile) -> Self {
        let mut tasks = IndexMap::new();
        for task in file.tasks {
            if tasks.contains_key(&task.id) {
                log::warn!("duplicate task id {} in book, keeping the first", task.id);
                continue;
            }
            tasks.insert(task.id.clone(), task);
        }
        TaskBook {
            tasks,
            log: file.completions,
            next_id: file.next_id.max(1),
            subscribers: Vec::new(),
        }
    }

    pub(crate) fn to_file(&self) -> BookFile {
        BookFile {
            next_id: self.next_id,
            tasks: self.tasks.values().cloned().collect(),
            completions: self.log.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::recurrence::Recurrence;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn task(id: &str) -> Task {
        Task::new(id.into(), "Something".into(), Some(date("2024-03-01")), Recurrence::Daily)
    }

    #[test]
    fn test_allocate_id_never_reuses() {
        let mut book = TaskBook::new();
        let a = book.allocate_id("T").unwrap();
        book.insert(task(&a));
        let b = book.allocate_id("T").unwrap();
        assert_eq!(a, "T-001");
        assert_eq!(b, "T-002");
        book.remove(&a);
        assert_eq!(book.allocate_id("T").unwrap(), "T-003");
    }

    #[test]
    fn test_allocate_id_skips_taken() {
        let mut book = TaskBook::new();
        book.insert(task("T-001"));
        assert_eq!(book.allocate_id("T").unwrap(), "T-002");
    }

    #[test]
    fn test_allocate_id_stops_at_counter_limit() {
        let file: BookFile = serde_json::from_str(r#"{"next_id":4294967294}"#).unwrap();
        let mut book = TaskBook::from_file(file);
        assert_eq!(book.allocate_id("T").unwrap(), "T-4294967294");
        assert_eq!(book.allocate_id("T"), None);
        assert_eq!(book.allocate_id("T"), None);
        assert_eq!(book.to_file().next_id, u32::MAX);
    }

    #[test]
    fn test_subscribers_see_every_write_in_order() {
        let seen: Rc<RefCell<Vec<Change>>> = Rc::new(RefCell::new(Vec::new()));
        let mut book = TaskBook::new();
        let sink = Rc::clone(&seen);
        book.subscribe(move |c| sink.borrow_mut().push(c.clone()));

        book.insert(task("T-001"));
        book.update("T-001", |t| t.title = "Renamed".into());
        book.record_completion(CompletionEvent {
            task: "T-001".into(),
            occurrence: Some(date("2024-03-02")),
            completed: true,
            recorded: date("2024-03-02"),
        });
        book.remove("T-001");

        let seen = seen.borrow();
        assert_eq!(
            *seen,
            vec![
                Change::Added("T-001".into()),
                Change::Updated("T-001".into()),
                Change::Completion {
                    task: "T-001".into(),
                    occurrence: Some(date("2024-03-02")),
                    completed: true,
                },
                Change::Removed("T-001".into()),
            ]
        );
    }

    #[test]
    fn test_update_missing_task_is_silent() {
        let seen = Rc::new(RefCell::new(0));
        let mut book = TaskBook::new();
        let counter = Rc::clone(&seen);
        book.subscribe(move |_| *counter.borrow_mut() += 1);
        assert!(book.update("T-404", |_| ()).is_none());
        assert!(book.remove("T-404").is_none());
        assert_eq!(*seen.borrow(), 0);
    }

    #[test]
    fn test_file_round_trip_keeps_order_and_history() {
        let mut book = TaskBook::new();
        book.insert(task("T-002"));
        book.insert(task("T-001"));
        book.record_completion(CompletionEvent {
            task: "T-001".into(),
            occurrence: None,
            completed: true,
            recorded: date("2024-03-02"),
        });
        let json = serde_json::to_string(&book.to_file()).unwrap();
        let back = TaskBook::from_file(serde_json::from_str(&json).unwrap());
        let ids: Vec<_> = back.tasks().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["T-002", "T-001"]);
        assert_eq!(back.log().len(), 1);
    }

    #[test]
    fn test_from_file_tolerates_bad_created_date() {
        let file: BookFile = serde_json::from_str(
            r#"{"tasks":[{"id":"T-001","title":"a","created":"not a date"},{"id":"T-002","title":"b"}]}"#,
        )
        .unwrap();
        let book = TaskBook::from_file(file);
        assert_eq!(book.len(), 2);
        assert_eq!(book.get("T-001").unwrap().created, None);
    }

    #[test]
    fn test_from_file_drops_duplicate_ids() {
        let file: BookFile = serde_json::from_str(
            r#"{"tasks":[{"id":"T-001","title":"a"},{"id":"T-001","title":"b"}]}"#,
        )
        .unwrap();
        let book = TaskBook::from_file(file);
        assert_eq!(book.len(), 1);
        assert_eq!(book.get("T-001").unwrap().title, "a");
    }
}
