//! Bulletin listings: specials, events and promotions.
//!
//! These are read-only snapshots handed over by the storage layer. Only the
//! fields the activity checks and the digest need are modelled; everything
//! else (images, authorship, contact details) stays with the store.

use std::fmt;

use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::activity::{DateRange, RecurringSchedule, Scheduled, Validity};
use crate::error::{ActivityError, Result};
use crate::recurrence::RecurrenceKind;

fn published_default() -> bool {
    true
}

/// A limited-time offering from an organization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Special {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(flatten)]
    pub dates: DateRange,
    #[serde(default = "published_default")]
    pub published: bool,
}

impl Special {
    /// # Errors
    /// Returns `ActivityError::InvalidRange` if the special ends before it starts.
    pub fn validate(&self) -> Result<()> {
        self.dates.validate()
    }

    /// Validation for a special being created on `today`: on top of
    /// [`Special::validate`], it may not start in the past.
    ///
    /// # Errors
    /// Returns `ActivityError::InvalidRange` describing the first problem found.
    pub fn validate_new(&self, today: NaiveDate) -> Result<()> {
        self.validate()?;
        if self.dates.start_date < today {
            return Err(ActivityError::InvalidRange(format!(
                "start date {} is in the past",
                self.dates.start_date
            )));
        }
        Ok(())
    }
}

impl Scheduled for Special {
    fn validity(&self) -> Validity<'_> {
        Validity::DateRange(&self.dates)
    }
}

/// A one-off or multi-day happening such as a market or festival.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(flatten)]
    pub dates: DateRange,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    #[serde(default)]
    pub venue: Option<String>,
    #[serde(default)]
    pub cost: Option<String>,
    #[serde(default = "published_default")]
    pub published: bool,
}

impl Event {
    /// Still happening or yet to happen on `on`.
    pub fn is_upcoming(&self, on: NaiveDate) -> bool {
        self.dates.end_date >= on
    }

    pub fn is_past(&self, on: NaiveDate) -> bool {
        self.dates.end_date < on
    }

    pub fn is_multiday(&self) -> bool {
        self.dates.end_date > self.dates.start_date
    }

    /// # Errors
    /// Returns `ActivityError::InvalidRange` if the event ends before it starts.
    pub fn validate(&self) -> Result<()> {
        self.dates.validate()
    }
}

impl Scheduled for Event {
    fn validity(&self) -> Validity<'_> {
        Validity::DateRange(&self.dates)
    }
}

/// A recurring or open-ended deal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Promotion {
    pub slug: String,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(flatten)]
    pub schedule: RecurringSchedule,
    #[serde(default = "published_default")]
    pub published: bool,
}

impl Promotion {
    /// The recurrence classification, or `None` for an every-day promotion.
    pub fn recurrence_kind(&self) -> Option<RecurrenceKind> {
        self.schedule.recurrence.as_ref().map(|rule| rule.kind())
    }

    /// # Errors
    /// Returns `ActivityError::InvalidRange` for a window that ends before it
    /// starts, or `ActivityError::InvalidRule` for a malformed recurrence rule.
    pub fn validate(&self) -> Result<()> {
        self.schedule.validate_window()?;
        if let Some(rule) = &self.schedule.recurrence {
            rule.validate()?;
        }
        Ok(())
    }
}

impl Scheduled for Promotion {
    fn validity(&self) -> Validity<'_> {
        Validity::Recurring(self.schedule.view())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingKind {
    Special,
    Event,
    Promotion,
}

impl fmt::Display for ListingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Special => "special",
            Self::Event => "event",
            Self::Promotion => "promotion",
        };
        f.write_str(label)
    }
}

/// Any dated listing, for filtering mixed collections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Listing {
    Special(Special),
    Event(Event),
    Promotion(Promotion),
}

impl Listing {
    pub fn kind(&self) -> ListingKind {
        match self {
            Self::Special(_) => ListingKind::Special,
            Self::Event(_) => ListingKind::Event,
            Self::Promotion(_) => ListingKind::Promotion,
        }
    }

    pub fn slug(&self) -> &str {
        match self {
            Self::Special(s) => &s.slug,
            Self::Event(e) => &e.slug,
            Self::Promotion(p) => &p.slug,
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Special(s) => &s.title,
            Self::Event(e) => &e.title,
            Self::Promotion(p) => &p.title,
        }
    }

    pub fn is_published(&self) -> bool {
        match self {
            Self::Special(s) => s.published,
            Self::Event(e) => e.published,
            Self::Promotion(p) => p.published,
        }
    }

    /// # Errors
    /// Returns the first validation error of the underlying listing.
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Special(s) => s.validate(),
            Self::Event(e) => e.validate(),
            Self::Promotion(p) => p.validate(),
        }
    }
}

impl Scheduled for Listing {
    fn validity(&self) -> Validity<'_> {
        match self {
            Self::Special(s) => s.validity(),
            Self::Event(e) => e.validity(),
            Self::Promotion(p) => p.validity(),
        }
    }
}

impl From<Special> for Listing {
    fn from(special: Special) -> Self {
        Self::Special(special)
    }
}

impl From<Event> for Listing {
    fn from(event: Event) -> Self {
        Self::Event(event)
    }
}

impl From<Promotion> for Listing {
    fn from(promotion: Promotion) -> Self {
        Self::Promotion(promotion)
    }
}
