//! Temporal activity checks -- decides which dated and recurring items are active on a day.
//!
//! Two shapes of validity are supported: an inclusive [`DateRange`] (specials,
//! events) and a [`RecurringSchedule`] made of a validity window plus an optional
//! recurrence rule (promotions). Nothing here reads the wall clock; the query
//! date is always an argument.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::calendar::SiteCalendar;
use crate::error::{ActivityError, Result};
use crate::recurrence::{Recurrence, RecurrenceRule};

/// An inclusive range of calendar dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl DateRange {
    pub fn new(start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            start_date,
            end_date,
        }
    }

    /// True iff `start_date <= on <= end_date`. A range that ends before it
    /// starts is never active.
    pub fn is_active(&self, on: NaiveDate) -> bool {
        self.start_date <= on && on <= self.end_date
    }

    pub fn is_well_formed(&self) -> bool {
        self.start_date <= self.end_date
    }

    /// Number of days covered, or 0 for a malformed range.
    pub fn len_days(&self) -> i64 {
        if self.is_well_formed() {
            (self.end_date - self.start_date).num_days() + 1
        } else {
            0
        }
    }

    /// # Errors
    /// Returns `ActivityError::InvalidRange` if the range ends before it starts.
    pub fn validate(&self) -> Result<()> {
        if self.is_well_formed() {
            Ok(())
        } else {
            Err(ActivityError::InvalidRange(format!(
                "end date {} is before start date {}",
                self.end_date, self.start_date
            )))
        }
    }
}

/// A validity window with an optional recurrence pattern.
///
/// `start_time` and `end_time` are display hints only and never affect whether
/// the schedule is active.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecurringSchedule<R = RecurrenceRule> {
    pub valid_from: NaiveDate,
    #[serde(default)]
    pub valid_until: Option<NaiveDate>,
    #[serde(default = "Option::default")]
    pub recurrence: Option<R>,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
}

impl<R> RecurringSchedule<R> {
    /// A schedule active every day from `valid_from` onwards.
    pub fn ongoing(valid_from: NaiveDate) -> Self {
        Self {
            valid_from,
            valid_until: None,
            recurrence: None,
            start_time: None,
            end_time: None,
        }
    }

    pub fn until(mut self, valid_until: NaiveDate) -> Self {
        self.valid_until = Some(valid_until);
        self
    }

    pub fn with_recurrence(mut self, recurrence: R) -> Self {
        self.recurrence = Some(recurrence);
        self
    }

    pub fn with_hours(mut self, start_time: NaiveTime, end_time: NaiveTime) -> Self {
        self.start_time = Some(start_time);
        self.end_time = Some(end_time);
        self
    }

    /// Whether `on` lies inside `[valid_from, valid_until]` (open-ended when
    /// `valid_until` is absent).
    pub fn in_window(&self, on: NaiveDate) -> bool {
        on >= self.valid_from && self.valid_until.is_none_or(|until| on <= until)
    }

    /// # Errors
    /// Returns `ActivityError::InvalidRange` if `valid_until` precedes `valid_from`.
    pub fn validate_window(&self) -> Result<()> {
        match self.valid_until {
            Some(until) if until < self.valid_from => Err(ActivityError::InvalidRange(format!(
                "valid until {} is before valid from {}",
                until, self.valid_from
            ))),
            _ => Ok(()),
        }
    }
}

impl<R: Recurrence> RecurringSchedule<R> {
    /// Whether the schedule is active on `on`.
    ///
    /// The validity window is checked first and always takes precedence. Inside
    /// the window, a schedule without a rule is active every day; with a rule it
    /// is active iff the rule includes the day starting at local midnight of `on`
    /// in the site timezone.
    ///
    /// # Errors
    /// Returns `ActivityError::RuleEvaluation` if the recurrence rule is malformed.
    pub fn is_active_on(&self, on: NaiveDate, calendar: &SiteCalendar) -> Result<bool> {
        self.view().is_active_on(on, calendar)
    }

    /// Borrow the schedule with its rule type erased.
    pub fn view(&self) -> ScheduleView<'_> {
        ScheduleView {
            valid_from: self.valid_from,
            valid_until: self.valid_until,
            recurrence: self.recurrence.as_ref().map(|rule| rule as &dyn Recurrence),
        }
    }
}

/// A borrowed recurring schedule whose rule may be any [`Recurrence`].
#[derive(Clone, Copy)]
pub struct ScheduleView<'a> {
    pub valid_from: NaiveDate,
    pub valid_until: Option<NaiveDate>,
    pub recurrence: Option<&'a dyn Recurrence>,
}

impl ScheduleView<'_> {
    /// # Errors
    /// Returns `ActivityError::RuleEvaluation` if the recurrence rule is malformed.
    pub fn is_active_on(&self, on: NaiveDate, calendar: &SiteCalendar) -> Result<bool> {
        if on < self.valid_from {
            return Ok(false);
        }
        if let Some(until) = self.valid_until {
            if on > until {
                return Ok(false);
            }
        }

        match self.recurrence {
            Some(rule) => rule.includes(&calendar.start_of_day(on)),
            None => Ok(true),
        }
    }
}

impl fmt::Debug for ScheduleView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleView")
            .field("valid_from", &self.valid_from)
            .field("valid_until", &self.valid_until)
            .field("has_recurrence", &self.recurrence.is_some())
            .finish()
    }
}

/// Date-range predicate as a free function.
pub fn is_date_range_active(item: &DateRange, on: NaiveDate) -> bool {
    item.is_active(on)
}

/// Recurring-schedule predicate as a free function.
///
/// # Errors
/// Returns `ActivityError::RuleEvaluation` if the recurrence rule is malformed.
pub fn is_recurring_active<R: Recurrence>(
    item: &RecurringSchedule<R>,
    on: NaiveDate,
    calendar: &SiteCalendar,
) -> Result<bool> {
    item.is_active_on(on, calendar)
}

/// The temporal shape of an entity.
#[derive(Debug, Clone, Copy)]
pub enum Validity<'a> {
    DateRange(&'a DateRange),
    Recurring(ScheduleView<'a>),
}

impl Validity<'_> {
    /// # Errors
    /// Returns `ActivityError::RuleEvaluation` if a recurrence rule is malformed.
    pub fn is_active_on(&self, on: NaiveDate, calendar: &SiteCalendar) -> Result<bool> {
        match self {
            Validity::DateRange(range) => Ok(range.is_active(on)),
            Validity::Recurring(schedule) => schedule.is_active_on(on, calendar),
        }
    }
}

/// Anything with a date range or a recurring schedule.
pub trait Scheduled {
    fn validity(&self) -> Validity<'_>;
}

impl Scheduled for DateRange {
    fn validity(&self) -> Validity<'_> {
        Validity::DateRange(self)
    }
}

impl<R: Recurrence> Scheduled for RecurringSchedule<R> {
    fn validity(&self) -> Validity<'_> {
        Validity::Recurring(self.view())
    }
}

impl<T: Scheduled + ?Sized> Scheduled for &T {
    fn validity(&self) -> Validity<'_> {
        (**self).validity()
    }
}

/// Whether a single scheduled entity is active on `on`.
///
/// # Errors
/// Returns `ActivityError::RuleEvaluation` if the entity's recurrence rule is malformed.
pub fn is_active<T: Scheduled + ?Sized>(
    item: &T,
    on: NaiveDate,
    calendar: &SiteCalendar,
) -> Result<bool> {
    item.validity().is_active_on(on, calendar)
}

/// A candidate whose rule could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuleFailure {
    /// Position of the candidate in the input slice.
    pub index: usize,
    pub error: ActivityError,
}

/// Result of splitting candidates into active items and evaluation failures.
#[derive(Debug, Clone, PartialEq)]
pub struct Partitioned<T> {
    /// Active candidates in input order.
    pub active: Vec<T>,
    pub failures: Vec<RuleFailure>,
}

/// Split candidates into the active subset and the ones whose rules failed.
///
/// Inactive candidates appear in neither list.
pub fn partition_active<T: Scheduled + Clone>(
    candidates: &[T],
    on: NaiveDate,
    calendar: &SiteCalendar,
) -> Partitioned<T> {
    let mut active = Vec::new();
    let mut failures = Vec::new();

    for (index, item) in candidates.iter().enumerate() {
        match is_active(item, on, calendar) {
            Ok(true) => active.push(item.clone()),
            Ok(false) => {}
            Err(error) => failures.push(RuleFailure { index, error }),
        }
    }

    debug!(
        date = %on,
        timezone = %calendar,
        candidates = candidates.len(),
        active = active.len(),
        failed = failures.len(),
        "filtered candidates"
    );

    Partitioned { active, failures }
}

/// Keep the candidates active on `on`, preserving input order.
///
/// Candidates whose recurrence rule fails to evaluate are left out and logged
/// at `warn` level.
pub fn filter_active<T: Scheduled + Clone>(
    candidates: &[T],
    on: NaiveDate,
    calendar: &SiteCalendar,
) -> Vec<T> {
    let Partitioned { active, failures } = partition_active(candidates, on, calendar);
    for failure in &failures {
        warn!(
            index = failure.index,
            date = %on,
            error = %failure.error,
            "excluding candidate with unevaluable recurrence rule"
        );
    }
    active
}
