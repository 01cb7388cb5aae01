//! Traits describing the upstream collection API and shared error types.

use async_trait::async_trait;
use reqwest::Error as ReqwestError;
use serde_json::Value;

use crate::model::PropertyRef;

#[derive(thiserror::Error, Debug)]
/// Failures while talking to the upstream collection API.
pub enum CommunicationError {
    /// Upstream answered with something other than 200 OK.
    #[error("Error communicating with API: {0}")]
    Status(u16),
    /// Request did not complete within the timeout.
    #[error("Error communicating with API: request timed out")]
    Timeout,
    /// Network layer or body decoding failed.
    #[error("Error communicating with API: {0}")]
    Transport(ReqwestError),
}

impl From<ReqwestError> for CommunicationError {
    fn from(err: ReqwestError) -> Self {
        if err.is_timeout() {
            CommunicationError::Timeout
        } else if let Some(status) = err.status() {
            CommunicationError::Status(status.as_u16())
        } else {
            CommunicationError::Transport(err)
        }
    }
}

#[derive(thiserror::Error, Debug)]
/// Errors surfaced by setup and the refresh coordinator.
pub enum BindayError {
    /// Configuration rejected before any network activity.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
    /// Fetching from upstream failed.
    #[error(transparent)]
    Communication(#[from] CommunicationError),
    /// No entity is registered under the identifier.
    #[error("Unknown entity: {0}")]
    UnknownEntity(String),
}

#[async_trait]
/// Source of raw collection documents for one property.
pub trait CollectionPort: Send + Sync {
    /// Name of the council backend, used in log events.
    fn name(&self) -> &str;

    /// Property the backend requests data for.
    fn property(&self) -> &PropertyRef;

    /// Perform one request and return the decoded JSON body.
    ///
    /// # Errors
    ///
    /// Returns a [`CommunicationError`] on a non-200 status, timeout, or transport failure.
    async fn fetch(&self) -> Result<Value, CommunicationError>;
}
