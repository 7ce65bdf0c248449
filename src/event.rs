use chrono::{DateTime, Days, NaiveDate, Utc};
use uuid::Uuid;

/// A single calendar entry produced by a [`Subscriber`](crate::Subscriber).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    pub id: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub summary: String,
    pub description: String,
    pub location: Option<String>,
    pub all_day: bool,
}

impl Event {
    /// Creates an event covering the whole of `date`.
    ///
    /// The id is derived from `prefix` and the date, so rebuilding a feed
    /// yields the same id for the same day.
    pub fn all_day<S, D>(prefix: &str, date: NaiveDate, summary: S, description: D) -> Self
    where
        S: Into<String>,
        D: Into<String>,
    {
        let start = date.and_time(chrono::NaiveTime::MIN).and_utc();
        let next = date.checked_add_days(Days::new(1)).unwrap_or(date);
        let end = next.and_time(chrono::NaiveTime::MIN).and_utc();

        Self {
            id: event_id(prefix, date),
            start,
            end,
            summary: summary.into(),
            description: description.into(),
            location: None,
            all_day: true,
        }
    }

    #[must_use]
    pub fn with_location<S: Into<String>>(mut self, location: S) -> Self {
        self.location = Some(location.into());
        self
    }
}

fn event_id(prefix: &str, date: NaiveDate) -> String {
    let name = format!("{prefix}/{}", date.format("%Y-%m-%d"));
    Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string()
}
