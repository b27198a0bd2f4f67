//! # activity-engine
//!
//! Deterministic activity checks for community bulletin listings.
//!
//! Given a query date, the engine decides which specials, events and recurring
//! promotions are active. Recurrence rules are evaluated at local midnight in a
//! fixed site timezone (via `chrono-tz`), and custom patterns are RFC 5545
//! RRULEs evaluated with the `rrule` crate. No function here reads the wall
//! clock except [`SiteCalendar::today`], which is meant for the application
//! boundary.
//!
//! ## Modules
//!
//! - [`activity`] — date-range and recurring-schedule predicates, bulk filtering
//! - [`recurrence`] — recurrence rules (daily, weekly, biweekly, monthly, custom)
//! - [`calendar`] — site timezone and date → instant conversion
//! - [`listing`] — specials, events, promotions and the mixed `Listing` type
//! - [`board`] — board snapshots and the home-page digest
//! - [`error`] — Error types

pub mod activity;
pub mod board;
pub mod calendar;
pub mod error;
pub mod listing;
pub mod recurrence;

pub use activity::{
    filter_active, is_active, is_date_range_active, is_recurring_active, partition_active,
    DateRange, Partitioned, RecurringSchedule, RuleFailure, ScheduleView, Scheduled, Validity,
};
pub use board::{Board, Digest, ListingProblem, DEFAULT_DIGEST_LIMIT};
pub use calendar::SiteCalendar;
pub use error::ActivityError;
pub use listing::{Event, Listing, ListingKind, Promotion, Special};
pub use recurrence::{Recurrence, RecurrenceKind, RecurrenceRule};
