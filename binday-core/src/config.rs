//! Settings the host supplies at setup time.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::model::PropertyRef;
use crate::ports::BindayError;

/// Endpoint serving Canterbury collection dates.
pub const DEFAULT_ENDPOINT: &str =
    "https://zbr7r13ke2.execute-api.eu-west-2.amazonaws.com/Beta/get-bin-dates";
/// Refresh once an hour.
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 60 * 60;
/// Upper bound for a single upstream request.
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone, Deserialize)]
/// Configuration for one tracked property.
pub struct BindayConfig {
    /// Unique property reference number.
    #[serde(default, deserialize_with = "reference")]
    pub uprn: String,
    /// Unique street reference number.
    #[serde(default, deserialize_with = "reference")]
    pub usrn: String,
    /// Seconds between scheduled refreshes.
    #[serde(default = "default_update_interval")]
    pub update_interval_secs: u64,
    /// Seconds before an upstream request is abandoned.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    /// Upstream URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

/// References are numeric, so config files and env vars often carry them as numbers.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawReference {
    Text(String),
    Number(u64),
}

fn reference<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    Ok(match RawReference::deserialize(deserializer)? {
        RawReference::Text(text) => text,
        RawReference::Number(number) => number.to_string(),
    })
}

fn default_update_interval() -> u64 {
    DEFAULT_UPDATE_INTERVAL_SECS
}

fn default_request_timeout() -> u64 {
    DEFAULT_REQUEST_TIMEOUT_SECS
}

fn default_endpoint() -> String {
    DEFAULT_ENDPOINT.to_owned()
}

impl BindayConfig {
    /// Configuration for the given references with default timings.
    #[must_use]
    pub fn new<P: Into<String>, S: Into<String>>(uprn: P, usrn: S) -> Self {
        Self {
            uprn: uprn.into(),
            usrn: usrn.into(),
            update_interval_secs: DEFAULT_UPDATE_INTERVAL_SECS,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            endpoint: default_endpoint(),
        }
    }

    /// References as a validated pair.
    ///
    /// # Errors
    ///
    /// Returns [`BindayError::InvalidInput`] when a reference is blank or a
    /// timing is zero.
    pub fn validate(&self) -> Result<PropertyRef, BindayError> {
        let property = PropertyRef::new(self.uprn.trim(), self.usrn.trim());
        property.validate()?;
        if self.update_interval_secs == 0 {
            return Err(BindayError::InvalidInput(
                "update interval must be positive".to_owned(),
            ));
        }
        if self.request_timeout_secs == 0 {
            return Err(BindayError::InvalidInput(
                "request timeout must be positive".to_owned(),
            ));
        }
        if self.endpoint.trim().is_empty() {
            return Err(BindayError::InvalidInput("endpoint must not be empty".to_owned()));
        }
        Ok(property)
    }

    /// Interval between scheduled refreshes.
    #[must_use]
    pub fn update_interval(&self) -> Duration {
        Duration::from_secs(self.update_interval_secs)
    }

    /// Timeout applied to each upstream request.
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
