//! Recurrence rules -- predicates over calendar days describing repeating patterns.
//!
//! A rule answers one question: is the day beginning at a given instant part of
//! the pattern? Built-in frequencies (daily, weekly, biweekly, monthly) are pure
//! date arithmetic. Custom patterns are RFC 5545 RRULE bodies evaluated with the
//! `rrule` crate on the site's calendar dates: the rule is expanded on a floating
//! timeline (written as UTC) and the query day is the local date of `day_start`,
//! so DST transitions in the site zone never move or drop an occurrence.

use std::fmt;

use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveTime, Weekday};
use chrono_tz::Tz;
use rrule::RRuleSet;
use serde::{Deserialize, Serialize};

use crate::error::{ActivityError, Result};

/// Upper bound on occurrences pulled from a single day's window.
const MAX_OCCURRENCES_PER_DAY: u16 = 32;

/// Capability to decide whether a day belongs to a recurrence pattern.
///
/// `day_start` is local midnight of the day under test in the site timezone.
/// Closures `Fn(&DateTime<Tz>) -> bool` implement this trait, which covers
/// arbitrary custom predicates.
pub trait Recurrence {
    /// # Errors
    /// Returns `ActivityError::RuleEvaluation` if the pattern itself is malformed.
    fn includes(&self, day_start: &DateTime<Tz>) -> Result<bool>;
}

impl<F> Recurrence for F
where
    F: Fn(&DateTime<Tz>) -> bool,
{
    fn includes(&self, day_start: &DateTime<Tz>) -> Result<bool> {
        Ok(self(day_start))
    }
}

/// Display classification of a rule, as shown next to a promotion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceKind {
    Daily,
    Weekly,
    Biweekly,
    Monthly,
    Custom,
}

impl fmt::Display for RecurrenceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Daily => "Daily",
            Self::Weekly => "Weekly",
            Self::Biweekly => "Bi-weekly",
            Self::Monthly => "Monthly",
            Self::Custom => "Custom Pattern",
        };
        f.write_str(label)
    }
}

/// A structured recurrence pattern.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RecurrenceRule {
    /// Every day.
    Daily,
    /// The listed weekdays of every week.
    Weekly { days: Vec<Weekday> },
    /// The listed weekdays of every other week, counting Monday-based weeks
    /// from the week that contains `anchor`.
    Biweekly { anchor: NaiveDate, days: Vec<Weekday> },
    /// The listed days of every month. Negative days count back from the end
    /// of the month (`-1` is the last day). Days missing from a month are skipped.
    Monthly { days: Vec<i32> },
    /// An RFC 5545 RRULE body such as `FREQ=MONTHLY;BYDAY=2TU,4TU`.
    ///
    /// Times in the rule are local wall-clock times. `UNTIL`, if present, is
    /// written in UTC form (`UNTIL=20241231T235959Z`) and read as local time.
    ///
    /// Evaluation walks the rule forward from `dtstart`, so high-frequency
    /// rules (`FREQ=HOURLY` and finer) with an old `dtstart` get slower as
    /// the query date moves away from it.
    Custom {
        rrule: String,
        dtstart: NaiveDate,
        #[serde(default)]
        exdates: Vec<NaiveDate>,
    },
}

impl RecurrenceRule {
    pub fn kind(&self) -> RecurrenceKind {
        match self {
            Self::Daily => RecurrenceKind::Daily,
            Self::Weekly { .. } => RecurrenceKind::Weekly,
            Self::Biweekly { .. } => RecurrenceKind::Biweekly,
            Self::Monthly { .. } => RecurrenceKind::Monthly,
            Self::Custom { .. } => RecurrenceKind::Custom,
        }
    }

    /// Check that the rule can be evaluated.
    ///
    /// # Errors
    /// Returns `ActivityError::InvalidRule` describing the first problem found.
    pub fn validate(&self) -> Result<()> {
        self.check_shape().map_err(ActivityError::InvalidRule)?;
        if let Self::Custom {
            rrule,
            dtstart,
            exdates,
        } = self
        {
            build_rrule_set(rrule, *dtstart, exdates).map_err(ActivityError::InvalidRule)?;
        }
        Ok(())
    }

    fn check_shape(&self) -> std::result::Result<(), String> {
        match self {
            Self::Daily | Self::Custom { .. } => Ok(()),
            Self::Weekly { days } | Self::Biweekly { days, .. } => {
                if days.is_empty() {
                    Err(format!("{} rule lists no weekdays", self.kind()))
                } else {
                    Ok(())
                }
            }
            Self::Monthly { days } => {
                if days.is_empty() {
                    return Err("Monthly rule lists no days".to_string());
                }
                match days.iter().find(|d| !(1..=31).contains(&d.abs())) {
                    Some(bad) => Err(format!("day of month out of range: {}", bad)),
                    None => Ok(()),
                }
            }
        }
    }
}

impl Recurrence for RecurrenceRule {
    fn includes(&self, day_start: &DateTime<Tz>) -> Result<bool> {
        self.check_shape().map_err(ActivityError::RuleEvaluation)?;
        let date = day_start.date_naive();

        match self {
            Self::Daily => Ok(true),
            Self::Weekly { days } => Ok(days.contains(&date.weekday())),
            Self::Biweekly { anchor, days } => {
                Ok(days.contains(&date.weekday()) && weeks_between(*anchor, date).rem_euclid(2) == 0)
            }
            Self::Monthly { days } => Ok(days.iter().any(|&d| month_day_matches(d, date))),
            Self::Custom {
                rrule,
                dtstart,
                exdates,
            } => custom_includes(rrule, *dtstart, exdates, day_start),
        }
    }
}

impl fmt::Display for RecurrenceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Daily => f.write_str("Daily"),
            Self::Weekly { days } => write!(f, "Weekly on {}", join_weekdays(days)),
            Self::Biweekly { anchor, days } => write!(
                f,
                "Every other week on {} (from {})",
                join_weekdays(days),
                anchor
            ),
            Self::Monthly { days } => {
                let list: Vec<String> = days.iter().map(|d| d.to_string()).collect();
                write!(f, "Monthly on day {}", list.join(", "))
            }
            Self::Custom { rrule, dtstart, .. } => write!(f, "{} from {}", rrule, dtstart),
        }
    }
}

fn join_weekdays(days: &[Weekday]) -> String {
    let names: Vec<String> = days.iter().map(|d| d.to_string()).collect();
    names.join(", ")
}

fn week_start(date: NaiveDate) -> NaiveDate {
    date - Duration::days(i64::from(date.weekday().num_days_from_monday()))
}

/// Whole Monday-based weeks from the week of `from` to the week of `to` (may be negative).
fn weeks_between(from: NaiveDate, to: NaiveDate) -> i64 {
    (week_start(to) - week_start(from)).num_days() / 7
}

fn days_in_month(date: NaiveDate) -> u32 {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(31)
}

fn month_day_matches(day: i32, date: NaiveDate) -> bool {
    let dom = date.day() as i32;
    if day > 0 {
        dom == day
    } else {
        days_in_month(date) as i32 + 1 + day == dom
    }
}

fn ical_date(date: NaiveDate) -> String {
    format!("{}T000000Z", date.format("%Y%m%d"))
}

/// Midnight of `date` on the floating timeline custom rules are expanded on.
fn floating_midnight(date: NaiveDate) -> DateTime<rrule::Tz> {
    date.and_time(NaiveTime::MIN)
        .and_utc()
        .with_timezone(&rrule::Tz::UTC)
}

/// Build an `RRuleSet` anchored at midnight of `dtstart` on the floating timeline.
fn build_rrule_set(
    rrule: &str,
    dtstart: NaiveDate,
    exdates: &[NaiveDate],
) -> std::result::Result<RRuleSet, String> {
    let trimmed = rrule.trim();
    let body = trimmed
        .strip_prefix("RRULE:")
        .or_else(|| trimmed.strip_prefix("rrule:"))
        .unwrap_or(trimmed);
    if body.is_empty() {
        return Err("empty RRULE string".to_string());
    }

    let mut text = format!("DTSTART:{}\nRRULE:{}", ical_date(dtstart), body);
    if !exdates.is_empty() {
        let list: Vec<String> = exdates.iter().map(|d| ical_date(*d)).collect();
        text.push_str(&format!("\nEXDATE:{}", list.join(",")));
    }

    text.parse::<RRuleSet>().map_err(|e| format!("{}", e))
}

fn custom_includes(
    rrule: &str,
    dtstart: NaiveDate,
    exdates: &[NaiveDate],
    day_start: &DateTime<Tz>,
) -> Result<bool> {
    let set = build_rrule_set(rrule, dtstart, exdates).map_err(ActivityError::RuleEvaluation)?;

    let date = day_start.date_naive();
    let window_start = floating_midnight(date);
    let window_end = match date.succ_opt() {
        Some(next) => floating_midnight(next),
        None => return Ok(false),
    };

    // Widen the query by a second on the left so the result does not depend on
    // whether the crate treats `after` as inclusive; the day bounds are
    // re-applied below.
    let occurrences = set
        .after(window_start - Duration::seconds(1))
        .before(window_end)
        .all(MAX_OCCURRENCES_PER_DAY);

    Ok(occurrences
        .dates
        .iter()
        .any(|dt| *dt >= window_start && *dt < window_end))
}
