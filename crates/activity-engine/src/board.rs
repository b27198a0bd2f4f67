//! Board snapshots and the home-page digest.
//!
//! A [`Board`] is everything the store hands over for one request: specials,
//! events and promotions. The digest picks the first few upcoming events,
//! active specials and active promotions for a given day.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::activity::{filter_active, partition_active};
use crate::calendar::SiteCalendar;
use crate::error::{ActivityError, Result};
use crate::listing::{Event, Listing, Promotion, Special};

/// Default number of items per digest section.
pub const DEFAULT_DIGEST_LIMIT: usize = 5;

/// A snapshot of the listings known to the store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board {
    #[serde(default)]
    pub specials: Vec<Special>,
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub promotions: Vec<Promotion>,
}

/// Home-page preview for a single day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Digest {
    pub date: NaiveDate,
    pub upcoming_events: Vec<Event>,
    pub active_specials: Vec<Special>,
    pub active_promotions: Vec<Promotion>,
    /// Published promotions left out because their rule could not be evaluated.
    pub rule_failures: usize,
}

/// A listing that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingProblem {
    pub listing: Listing,
    pub error: ActivityError,
}

impl Board {
    /// Parse a JSON snapshot.
    ///
    /// # Errors
    /// Returns `ActivityError::Snapshot` if the JSON does not describe a board.
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ActivityError::Snapshot(e.to_string()))
    }

    /// A copy holding only published listings.
    pub fn published(&self) -> Self {
        Self {
            specials: self
                .specials
                .iter()
                .filter(|s| s.published)
                .cloned()
                .collect(),
            events: self.events.iter().filter(|e| e.published).cloned().collect(),
            promotions: self
                .promotions
                .iter()
                .filter(|p| p.published)
                .cloned()
                .collect(),
        }
    }

    /// Every listing as a mixed collection: specials, then events, then promotions.
    pub fn listings(&self) -> Vec<Listing> {
        self.specials
            .iter()
            .cloned()
            .map(Listing::from)
            .chain(self.events.iter().cloned().map(Listing::from))
            .chain(self.promotions.iter().cloned().map(Listing::from))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.specials.len() + self.events.len() + self.promotions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Build the home-page digest from published listings.
    pub fn digest(&self, on: NaiveDate, calendar: &SiteCalendar, limit: usize) -> Digest {
        let board = self.published();

        let mut upcoming = upcoming_events(&board.events, on);
        upcoming.truncate(limit);

        let mut specials = active_specials(&board.specials, on, calendar);
        specials.truncate(limit);

        let promotions = partition_active(&board.promotions, on, calendar);
        for failure in &promotions.failures {
            let slug = board
                .promotions
                .get(failure.index)
                .map(|p| p.slug.as_str())
                .unwrap_or_default();
            warn!(
                promotion = slug,
                date = %on,
                error = %failure.error,
                "promotion left out of digest"
            );
        }
        let mut active_promotions = promotions.active;
        active_promotions.truncate(limit);

        Digest {
            date: on,
            upcoming_events: upcoming,
            active_specials: specials,
            active_promotions,
            rule_failures: promotions.failures.len(),
        }
    }

    /// Validate every listing, returning the ones with problems.
    pub fn problems(&self) -> Vec<ListingProblem> {
        self.listings()
            .into_iter()
            .filter_map(|listing| match listing.validate() {
                Ok(()) => None,
                Err(error) => Some(ListingProblem { listing, error }),
            })
            .collect()
    }
}

/// Events that have not ended by `on`, in start order.
///
/// Ordered by start date, then start time with untimed events first. The sort
/// is stable so ties keep their input order.
pub fn upcoming_events(events: &[Event], on: NaiveDate) -> Vec<Event> {
    let mut upcoming: Vec<Event> = events
        .iter()
        .filter(|e| e.is_upcoming(on))
        .cloned()
        .collect();
    upcoming.sort_by_key(|e| (e.dates.start_date, e.start_time));
    upcoming
}

/// Specials running on `on`, in input order.
pub fn active_specials(specials: &[Special], on: NaiveDate, calendar: &SiteCalendar) -> Vec<Special> {
    filter_active(specials, on, calendar)
}

/// Promotions running on `on`, in input order. Promotions with broken rules are
/// left out and logged.
pub fn active_promotions(
    promotions: &[Promotion],
    on: NaiveDate,
    calendar: &SiteCalendar,
) -> Vec<Promotion> {
    filter_active(promotions, on, calendar)
}

