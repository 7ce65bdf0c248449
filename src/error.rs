//! Errors raised while building a feed.

use std::error::Error as StdError;

use chrono::NaiveDate;
use thiserror::Error;

use crate::juhe::JuheError;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Subscription not found: {0}")]
    NotFound(String),

    #[error("Failed to fetch almanac for {day}")]
    Upstream {
        day: NaiveDate,
        #[source]
        source: JuheError,
    },

    #[error("Malformed almanac response for {day}")]
    MalformedResponse {
        day: NaiveDate,
        #[source]
        source: JuheError,
    },

    #[error("Failed to render calendar: {0}")]
    Render(String),

    #[error("Failed to build feed `{key}`")]
    Build {
        key: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// The innermost error, skipping the per-feed [`Error::Build`] context.
    pub fn root(&self) -> &Error {
        match self {
            Self::Build { source, .. } => source.root(),
            other => other,
        }
    }

    /// Whether the error originates from the remote almanac service.
    pub fn is_upstream(&self) -> bool {
        matches!(
            self.root(),
            Self::Upstream { .. } | Self::MalformedResponse { .. }
        )
    }

    /// Formats the error together with all of its sources.
    pub fn chain(&self) -> String {
        let mut message = self.to_string();
        let mut source = StdError::source(self);
        while let Some(err) = source {
            message.push_str(": ");
            message.push_str(&err.to_string());
            source = err.source();
        }
        message
    }
}
