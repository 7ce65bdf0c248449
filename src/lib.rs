//! Calendar subscriptions published as iCalendar feeds.
//!
//! A [`Subscriber`] produces events for an interval, [`FeedService`] renders
//! them through [`ics::render`](crate::ics::render) and keeps the result until
//! its TTL runs out or the periodic refresh clears it.

pub mod cache;
pub mod error;
pub mod event;
pub mod ics;
pub mod juhe;
pub mod refresh;
pub mod registry;
pub mod server;
pub mod service;
pub mod subscriber;

pub use error::{Error, Result};
pub use event::Event;
pub use registry::Subscriptions;
pub use service::{Config, FeedService};
pub use subscriber::{AlmanacSubscriber, HolidaySubscriber, Subscriber};
