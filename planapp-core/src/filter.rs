//! Pure view filtering over the latest snapshot.
//!
//! Filtering never mutates the snapshot and imposes no ordering of its own;
//! the displayed list keeps whatever order the store delivered.

use crate::event::{Event, EventState};
use crate::error::{PlanError, PlanResult};
use chrono::{Local, NaiveDate};
use std::str::FromStr;

/// Status filter for the list view. `All` matches every state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    All,
    Only(EventState),
}

impl StatusFilter {
    pub fn matches(&self, state: EventState) -> bool {
        match self {
            StatusFilter::All => true,
            StatusFilter::Only(wanted) => state == *wanted,
        }
    }
}

impl FromStr for StatusFilter {
    type Err = PlanError;

    fn from_str(s: &str) -> PlanResult<Self> {
        if s == "all" {
            return Ok(StatusFilter::All);
        }
        Ok(StatusFilter::Only(s.parse()?))
    }
}

/// View parameters for deriving the displayed subset of a snapshot.
///
/// With a selected day, only the calendar-day match applies; title and
/// status filters are for the flat list view.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub day: Option<NaiveDate>,
    pub title: Option<String>,
    pub status: StatusFilter,
}

impl EventFilter {
    pub fn for_day(day: NaiveDate) -> Self {
        EventFilter {
            day: Some(day),
            ..Default::default()
        }
    }

    /// Derive the displayed subset from a snapshot.
    pub fn apply(&self, events: &[Event]) -> Vec<Event> {
        match self.day {
            Some(day) => events
                .iter()
                .filter(|e| falls_on_day(e, day))
                .cloned()
                .collect(),
            None => events
                .iter()
                .filter(|e| self.matches_title(e) && self.status.matches(e.state))
                .cloned()
                .collect(),
        }
    }

    fn matches_title(&self, event: &Event) -> bool {
        match &self.title {
            Some(wanted) => event
                .title
                .to_lowercase()
                .contains(&wanted.to_lowercase()),
            None => true,
        }
    }
}

/// Whether an event falls on the given calendar day in local time
/// (year, month and day-of-month all match).
pub fn falls_on_day(event: &Event, day: NaiveDate) -> bool {
    event.datetime.with_timezone(&Local).date_naive() == day
}

// =============================================================================
// Tests
// =============================================================================
