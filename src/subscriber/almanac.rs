use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use tracing::debug;

use super::{DayRange, Subscriber};
use crate::error::{Error, Result};
use crate::event::Event;
use crate::juhe::{Almanac, JuheClient};

const ID_PREFIX: &str = "almanac";

/// Daily almanac entries fetched from the juhe.cn API, one request per day.
pub struct AlmanacSubscriber {
    name: String,
    description: String,
    client: JuheClient,
    window: TimeDelta,
}

impl AlmanacSubscriber {
    pub fn new(client: JuheClient, window: TimeDelta) -> Self {
        Self {
            name: "黄历·农历宜忌".to_string(),
            description: "每日干支、冲煞、宜、忌、农历日期".to_string(),
            client,
            window,
        }
    }
}

fn summary(almanac: &Almanac) -> String {
    format!("宜：{}｜忌：{}", almanac.yi, almanac.ji)
}

fn description(almanac: &Almanac) -> String {
    [
        ("阳历", &almanac.yangli),
        ("冲煞", &almanac.chongsha),
        ("农历", &almanac.yinli),
        ("五行", &almanac.wuxing),
        ("吉神宜趋", &almanac.jishen),
        ("凶神宜忌", &almanac.xiongshen),
        ("百忌", &almanac.baiji),
    ]
    .iter()
    .map(|(label, value)| format!("{label}：{value}"))
    .collect::<Vec<_>>()
    .join("\n")
}

#[async_trait]
impl Subscriber for AlmanacSubscriber {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn events(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Vec<Event>> {
        let mut events = Vec::new();

        for day in DayRange::new(start, end) {
            let almanac = self.client.almanac(day).await.map_err(|source| {
                if source.is_decode() {
                    Error::MalformedResponse { day, source }
                } else {
                    Error::Upstream { day, source }
                }
            })?;

            events.push(Event::all_day(
                ID_PREFIX,
                day,
                summary(&almanac),
                description(&almanac),
            ));
        }

        debug!(count = events.len(), "Fetched almanac days");
        Ok(events)
    }

    fn window(&self) -> Option<TimeDelta> {
        Some(self.window)
    }
}
