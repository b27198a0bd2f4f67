//! The site calendar: a fixed IANA timezone used to turn calendar dates into instants.
//!
//! Every recurrence check happens at local midnight of the query date in the
//! site's configured zone, never the zone of the machine running the check. The
//! zone is chosen once at configuration time and a `SiteCalendar` is immutable.

use std::fmt;
use std::str::FromStr;

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, NaiveTime, Offset, TimeZone, Utc,
};
use chrono_tz::Tz;

use crate::error::{ActivityError, Result};

/// Timezone context shared by every evaluation in a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteCalendar {
    tz: Tz,
}

impl Default for SiteCalendar {
    fn default() -> Self {
        Self { tz: Tz::UTC }
    }
}

impl SiteCalendar {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    /// Resolve an IANA timezone name (e.g. "America/Chicago").
    ///
    /// # Errors
    /// Returns `ActivityError::InvalidTimezone` if the name is not a known zone.
    pub fn from_name(name: &str) -> Result<Self> {
        name.trim()
            .parse::<Tz>()
            .map(Self::new)
            .map_err(|_| ActivityError::InvalidTimezone(name.to_string()))
    }

    pub fn timezone(&self) -> Tz {
        self.tz
    }

    /// The instant at which `date` begins in the site timezone.
    ///
    /// When local midnight is skipped by a DST transition, the first instant
    /// after the gap is used. When midnight occurs twice, the earlier one wins.
    pub fn start_of_day(&self, date: NaiveDate) -> DateTime<Tz> {
        let midnight = date.and_time(NaiveTime::MIN);
        match self.tz.from_local_datetime(&midnight) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(earliest, _) => earliest,
            LocalResult::None => self.end_of_gap(midnight),
        }
    }

    /// The instant at which the day after `date` begins (exclusive end of `date`).
    pub fn end_of_day(&self, date: NaiveDate) -> DateTime<Tz> {
        match date.succ_opt() {
            Some(next) => self.start_of_day(next),
            None => self.start_of_day(date),
        }
    }

    /// The calendar date an instant falls on in the site timezone.
    pub fn date_of(&self, instant: DateTime<Utc>) -> NaiveDate {
        instant.with_timezone(&self.tz).date_naive()
    }

    /// Today's date in the site timezone, read from the wall clock.
    ///
    /// Only the application boundary should call this; every predicate in this
    /// crate takes the query date as an explicit argument.
    pub fn today(&self) -> NaiveDate {
        self.date_of(Utc::now())
    }

    // A local time inside a gap is interpreted with the offset in force just
    // before the gap, which lands exactly on the transition instant.
    fn end_of_gap(&self, local: NaiveDateTime) -> DateTime<Tz> {
        let before = local - Duration::hours(3);
        let offset_secs = self
            .tz
            .from_local_datetime(&before)
            .earliest()
            .map(|dt| dt.offset().fix().local_minus_utc())
            .unwrap_or(0);
        let utc = local - Duration::seconds(i64::from(offset_secs));
        self.tz.from_utc_datetime(&utc)
    }
}

impl FromStr for SiteCalendar {
    type Err = ActivityError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_name(s)
    }
}

impl fmt::Display for SiteCalendar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tz.name())
    }
}
