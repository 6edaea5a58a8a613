//! The recurrence engine.
//!
//! A recurring task is a series anchored at its due date. Occurrence `k` is
//! the anchor plus `k` steps, always measured from the anchor so calendar
//! months never drift. The anchor itself is never moved here; "next due" is
//! derived from the anchor, the current date and the completion log.

use chrono::{Datelike, Days, Months, NaiveDate};

use crate::model::recurrence::{CustomUnit, MonthMode, Recurrence};
use crate::model::task::Task;

/// Distance between two occurrences of a series
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Days(u64),
    Months(u32),
}

/// Recurrence engine configured with a month-stepping strategy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Schedule {
    months: MonthMode,
}

impl Schedule {
    pub fn new(months: MonthMode) -> Self {
        Schedule { months }
    }

    pub fn month_mode(&self) -> MonthMode {
        self.months
    }

    /// Step of a recurrence, or `None` for rules that never advance
    pub fn step(&self, recurrence: &Recurrence) -> Option<Step> {
        let month = |n: u32| match self.months {
            MonthMode::ThirtyDays => Step::Days(30 * n as u64),
            MonthMode::Calendar => Step::Months(n),
        };
        match recurrence {
            Recurrence::Daily => Some(Step::Days(1)),
            Recurrence::Weekly => Some(Step::Days(7)),
            Recurrence::Monthly => Some(month(1)),
            Recurrence::Custom { interval, unit } => {
                let n = interval.get();
                Some(match unit {
                    CustomUnit::Days => Step::Days(n as u64),
                    CustomUnit::Weeks => Step::Days(7 * n as u64),
                    CustomUnit::Months => month(n),
                })
            }
            Recurrence::None | Recurrence::Unrecognized(_) => None,
        }
    }

    /// Occurrence `k` of a series starting at `anchor`
    pub fn occurrence(&self, anchor: NaiveDate, step: Step, k: u64) -> Option<NaiveDate> {
        match step {
            Step::Days(n) => anchor.checked_add_days(Days::new(n.checked_mul(k)?)),
            Step::Months(n) => {
                let months = n.checked_mul(u32::try_from(k).ok()?)?;
                anchor.checked_add_months(Months::new(months))
            }
        }
    }

    /// Smallest `k >= min_k` whose occurrence is on or after `from`
    fn first_index_on_or_after(&self, anchor: NaiveDate, step: Step, from: NaiveDate, min_k: u64) -> Option<u64> {
        let estimate = if from <= anchor {
            0
        } else {
            match step {
                Step::Days(n) => {
                    let diff = (from - anchor).num_days() as u64;
                    diff.div_ceil(n)
                }
                Step::Months(n) => months_between(anchor, from) / n as u64,
            }
        };
        let mut k = estimate.max(min_k);
        // Month clamping can leave the estimate one or two steps short
        while self.occurrence(anchor, step, k)? < from {
            k += 1;
        }
        Some(k)
    }

    fn is_occurrence(&self, anchor: NaiveDate, step: Step, date: NaiveDate) -> bool {
        if date < anchor {
            return false;
        }
        match step {
            Step::Days(n) => (date - anchor).num_days() as u64 % n == 0,
            Step::Months(n) => {
                let m = months_between(anchor, date);
                m % n as u64 == 0 && self.occurrence(anchor, step, m / n as u64) == Some(date)
            }
        }
    }

    /// Whether `task` belongs in the "due on `date`" view.
    ///
    /// One-off tasks match only their due date. Recurring tasks match every
    /// occurrence from the anchor onward. Tasks without a due date, or with
    /// an unrecognized rule, never match.
    pub fn is_applicable(&self, task: &Task, date: NaiveDate) -> bool {
        let Some(anchor) = task.due_date else {
            return false;
        };
        match &task.recurrence {
            Recurrence::None => date == anchor,
            other => self
                .step(other)
                .is_some_and(|step| self.is_occurrence(anchor, step, date)),
        }
    }

    /// Next due date of a series anchored at `current`.
    ///
    /// With `always_advance` the result is strictly after `current`. Either
    /// way every occurrence before `today` is skipped, so the result is never
    /// in the past. Returns `None` for rules that never advance.
    pub fn calculate_next_due(
        &self,
        current: NaiveDate,
        recurrence: &Recurrence,
        today: NaiveDate,
        always_advance: bool,
    ) -> Option<NaiveDate> {
        let step = self.step(recurrence)?;
        let k = self.first_index_on_or_after(current, step, today, u64::from(always_advance))?;
        self.occurrence(current, step, k)
    }

    /// Occurrences of a task starting with the first one on or after `from`
    pub fn upcoming<'a>(&'a self, task: &'a Task, from: NaiveDate) -> Upcoming<'a> {
        let series = task.due_date.and_then(|anchor| match task.recurrence {
            Recurrence::None => None,
            ref other => {
                let step = self.step(other)?;
                let k = self.first_index_on_or_after(anchor, step, from, 0)?;
                Some((anchor, step, k))
            }
        });
        let single = match task.recurrence {
            Recurrence::None => task.due_date.filter(|d| *d >= from),
            _ => None,
        };
        Upcoming {
            schedule: self,
            series,
            single,
        }
    }

    /// Occurrences within `from..=to`
    pub fn occurrences_between(&self, task: &Task, from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
        self.upcoming(task, from).take_while(|d| *d <= to).collect()
    }
}

/// Iterator returned by [`Schedule::upcoming`]
pub struct Upcoming<'a> {
    schedule: &'a Schedule,
    series: Option<(NaiveDate, Step, u64)>,
    single: Option<NaiveDate>,
}

impl Iterator for Upcoming<'_> {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<NaiveDate> {
        if let Some(date) = self.single.take() {
            return Some(date);
        }
        let (anchor, step, k) = self.series.as_mut()?;
        let date = self.schedule.occurrence(*anchor, *step, *k);
        *k += 1;
        if date.is_none() {
            self.series = None;
        }
        date
    }
}

/// Whole calendar months from `from` to `to`, by month number only
fn months_between(from: NaiveDate, to: NaiveDate) -> u64 {
    let months = (to.year() as i64 - from.year() as i64) * 12 + to.month0() as i64 - from.month0() as i64;
    months.max(0) as u64
}
