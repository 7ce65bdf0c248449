//! Client for the juhe.cn almanac ("laohuangli") API.

use std::time::Duration;

use chrono::NaiveDate;
use serde::{de::DeserializeOwned, Deserialize};
use thiserror::Error;
use tracing::instrument;

pub const JUHE_API_BASE: &str = "http://v.juhe.cn";
const ALMANAC_PATH: &str = "/laohuangli/d";

#[derive(Error, Debug)]
pub enum JuheError {
    #[error("Request timed out")]
    Timeout(#[source] reqwest::Error),

    #[error("Failed to connect to almanac service")]
    Connect(#[source] reqwest::Error),

    #[error("Almanac request failed")]
    Transport(#[source] reqwest::Error),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("API error {code}: {reason}")]
    Api { code: i64, reason: String },

    #[error("Failed to decode almanac response")]
    Decode(#[from] serde_json::Error),
}

impl JuheError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    pub fn is_decode(&self) -> bool {
        matches!(self, Self::Decode(_))
    }
}

impl From<reqwest::Error> for JuheError {
    /// The request URL carries the API key, so it is stripped here.
    fn from(err: reqwest::Error) -> Self {
        let err = err.without_url();
        if err.is_timeout() {
            Self::Timeout(err)
        } else if err.is_connect() {
            Self::Connect(err)
        } else {
            Self::Transport(err)
        }
    }
}

/// One day of the traditional almanac.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Almanac {
    pub id: String,
    /// Solar (Gregorian) date.
    pub yangli: String,
    /// Lunar date.
    pub yinli: String,
    /// Five-element label.
    pub wuxing: String,
    /// Clash / evil direction.
    pub chongsha: String,
    /// Peng Zu's taboos.
    pub baiji: String,
    /// Auspicious gods.
    pub jishen: String,
    /// Auspicious activities.
    pub yi: String,
    /// Inauspicious gods.
    pub xiongshen: String,
    /// Inauspicious activities.
    pub ji: String,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    reason: String,
    error_code: i64,
    #[serde(default)]
    result: serde_json::Value,
}

#[derive(Debug, Clone)]
pub struct JuheClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl JuheClient {
    pub fn new(api_key: &str, timeout: Duration) -> Result<Self, JuheError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: JUHE_API_BASE.to_string(),
            api_key: api_key.to_string(),
        })
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Fetches the almanac entry for a single day.
    #[instrument(skip(self), level = "debug", err)]
    pub async fn almanac(&self, date: NaiveDate) -> Result<Almanac, JuheError> {
        let date = date.format("%Y-%m-%d").to_string();
        self.request(ALMANAC_PATH, &[("key", self.api_key.as_str()), ("date", date.as_str())])
            .await
    }

    async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, JuheError> {
        let url = format!("{}{path}", self.base_url);

        let response = self.client.get(&url).query(query).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(JuheError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        let envelope: Envelope = serde_json::from_slice(&body)?;

        if envelope.error_code != 0 {
            return Err(JuheError::Api {
                code: envelope.error_code,
                reason: envelope.reason,
            });
        }

        Ok(serde_json::from_value(envelope.result)?)
    }
}
