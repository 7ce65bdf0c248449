use std::mem;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeDelta, Utc};

use crate::error::Result;
use crate::event::Event;

pub mod almanac;
pub mod holiday;

pub use almanac::AlmanacSubscriber;
pub use holiday::HolidaySubscriber;

/// A source of calendar events that can be published as a feed.
///
/// One instance may serve concurrent rebuilds, so implementations must not
/// keep unsynchronized state between calls.
#[async_trait]
pub trait Subscriber: Send + Sync {
    fn name(&self) -> &str;

    fn description(&self) -> &str;

    /// Produces every event falling inside `[start, end)`.
    async fn events(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Event>>;

    /// Window to publish when the caller does not pick one.
    fn window(&self) -> Option<TimeDelta> {
        None
    }
}

/// Iterates every calendar day whose span intersects `[start, end)`.
pub struct DayRange {
    next: NaiveDate,
    end: DateTime<Utc>,
}

impl DayRange {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let next = start.date_naive();
        let end = if end > start {
            end
        } else {
            next.and_time(NaiveTime::MIN).and_utc()
        };

        Self { next, end }
    }
}

impl Iterator for DayRange {
    type Item = NaiveDate;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next.and_time(NaiveTime::MIN).and_utc() < self.end {
            let following = self.next.succ_opt()?;
            Some(mem::replace(&mut self.next, following))
        } else {
            None
        }
    }
}
