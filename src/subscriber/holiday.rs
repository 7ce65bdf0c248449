use async_trait::async_trait;
use chrono::{DateTime, Datelike, NaiveDate, Utc};

use super::{DayRange, Subscriber};
use crate::error::Result;
use crate::event::Event;

const ID_PREFIX: &str = "holiday";
const DESCRIPTION: &str = "法定节假日";

struct Holiday {
    name: &'static str,
    month: u32,
    first: u32,
    last: u32,
}

const HOLIDAYS: &[Holiday] = &[
    Holiday { name: "元旦", month: 1, first: 1, last: 1 },
    Holiday { name: "春节", month: 2, first: 9, last: 15 },
    Holiday { name: "清明节", month: 4, first: 4, last: 6 },
    Holiday { name: "劳动节", month: 5, first: 1, last: 3 },
    Holiday { name: "端午节", month: 6, first: 8, last: 10 },
    Holiday { name: "国庆节", month: 10, first: 1, last: 7 },
];

/// Public holidays, derived from a fixed table of dates.
pub struct HolidaySubscriber {
    name: String,
    description: String,
}

impl Default for HolidaySubscriber {
    fn default() -> Self {
        Self {
            name: "节假日提醒".to_string(),
            description: "国家法定节假日提醒".to_string(),
        }
    }
}

impl HolidaySubscriber {
    pub fn new() -> Self {
        Self::default()
    }

    fn holiday_on(date: NaiveDate) -> Option<&'static str> {
        HOLIDAYS
            .iter()
            .find(|h| h.month == date.month() && (h.first..=h.last).contains(&date.day()))
            .map(|h| h.name)
    }
}

#[async_trait]
impl Subscriber for HolidaySubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn events(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Event>> {
        Ok(DayRange::new(start, end)
            .filter_map(|date| {
                Self::holiday_on(date).map(|name| Event::all_day(ID_PREFIX, date, name, DESCRIPTION))
            })
            .collect())
    }
}
