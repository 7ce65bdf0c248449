//! iCalendar rendering of a feed.

use std::borrow::Cow;

use chrono::{DateTime, Utc};
use ics::{
    components::{Parameter, Property},
    escape_text,
    properties::{Description, DtEnd, DtStart, Location, Summary},
    ICalendar,
};

use crate::error::{Error, Result};
use crate::event::Event;

const PRODID: &str = concat!("-//", env!("CARGO_PKG_NAME"), "//", env!("CARGO_PKG_VERSION"), "//ZH");

pub const CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// Renders a feed into iCalendar text.
///
/// Output only depends on the arguments, so identical inputs produce
/// byte-identical documents.
pub fn render(
    name: &str,
    description: &str,
    events: &[Event],
    generated_at: DateTime<Utc>,
) -> Result<String> {
    let mut icalendar = ICalendar::new("2.0", PRODID);
    icalendar.push(Property::new("CALSCALE", "GREGORIAN"));
    icalendar.push(Property::new("METHOD", "PUBLISH"));
    icalendar.push(Property::new("X-WR-CALNAME", text(name)));
    icalendar.push(Property::new("X-WR-CALDESC", text(description)));

    let dtstamp = format_utc(generated_at);

    for event in events {
        icalendar.add_event(to_ics(event, &dtstamp)?);
    }

    let mut buf = Vec::new();
    icalendar
        .write(&mut buf)
        .map_err(|err| Error::Render(err.to_string()))?;

    String::from_utf8(buf).map_err(|err| Error::Render(err.to_string()))
}

fn to_ics<'a>(event: &'a Event, dtstamp: &str) -> Result<ics::Event<'a>> {
    if event.end <= event.start {
        return Err(Error::Render(format!(
            "event {} ends at {} before it starts at {}",
            event.id, event.end, event.start
        )));
    }

    let mut ics_event = ics::Event::new(event.id.as_str(), dtstamp.to_string());

    if event.all_day {
        let mut start = DtStart::new(event.start.format("%Y%m%d").to_string());
        start.add(Parameter::new("VALUE", "DATE"));
        let mut end = DtEnd::new(event.end.format("%Y%m%d").to_string());
        end.add(Parameter::new("VALUE", "DATE"));

        ics_event.push(start);
        ics_event.push(end);
    } else {
        ics_event.push(DtStart::new(format_utc(event.start)));
        ics_event.push(DtEnd::new(format_utc(event.end)));
    }

    ics_event.push(Summary::new(text(&event.summary)));
    ics_event.push(Description::new(text(&event.description)));

    if let Some(location) = &event.location {
        ics_event.push(Location::new(text(location)));
    }

    Ok(ics_event)
}

fn format_utc(time: DateTime<Utc>) -> String {
    time.format("%Y%m%dT%H%M%SZ").to_string()
}

/// Escapes a TEXT value. Line breaks become `\n`, other control
/// characters are dropped.
fn text(value: &str) -> Cow<'static, str> {
    let normalized: String = value
        .replace("\r\n", "\n")
        .replace('\r', "\n")
        .chars()
        .filter(|c| matches!(c, '\n' | '\t') || !c.is_control())
        .collect();

    Cow::Owned(escape_text(normalized).into_owned())
}
