//! Provider implementation for Canterbury City Council's bin dates API.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, ORIGIN};
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use binday_core::{
    config::BindayConfig,
    coordinator::Coordinator,
    model::PropertyRef,
    ports::{BindayError, CollectionPort, CommunicationError},
};

// The endpoint rejects requests that do not look like they come from the council website.
const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:137.0) Gecko/20100101 Firefox/137.0";
const COUNCIL_ORIGIN: &str = "https://www.canterbury.gov.uk";

/// Body of the bin dates request.
#[derive(Debug, Serialize)]
struct BinDatesRequest<'a> {
    uprn: &'a str,
    usrn: &'a str,
}

/// Bin dates backend for a single Canterbury property.
///
/// Owns one HTTP client, and with it the connection pool, for its lifetime.
pub struct CanterburyCollectionPort {
    client: Client,
    endpoint: String,
    property: PropertyRef,
}

impl CanterburyCollectionPort {
    /// Validate the configuration and build the HTTP client.
    ///
    /// # Errors
    ///
    /// Returns [`BindayError::InvalidInput`] for a bad configuration and
    /// [`BindayError::Communication`] if the client cannot be built.
    pub fn new(config: &BindayConfig) -> Result<Self, BindayError> {
        let property = config.validate()?;

        let client = Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .default_headers(browser_headers())
            .timeout(config.request_timeout())
            .build()
            .map_err(CommunicationError::from)?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            property,
        })
    }
}

#[async_trait]
impl CollectionPort for CanterburyCollectionPort {
    fn name(&self) -> &str {
        "canterbury"
    }

    fn property(&self) -> &PropertyRef {
        &self.property
    }

    async fn fetch(&self) -> Result<Value, CommunicationError> {
        debug!(endpoint = %self.endpoint, uprn = %self.property.uprn, usrn = %self.property.usrn, "requesting bin dates");

        let req = self.client.post(&self.endpoint).json(&BinDatesRequest {
            uprn: &self.property.uprn,
            usrn: &self.property.usrn,
        });

        fetch_json(req).await
    }
}

/// Set up a coordinator tracking the configured Canterbury property.
///
/// The configuration is validated before the client is built, so a rejected
/// configuration never reaches the network.
///
/// # Errors
///
/// Returns [`BindayError::InvalidInput`] for a bad configuration and
/// [`BindayError::Communication`] if the first fetch fails.
pub async fn initialize(config: &BindayConfig) -> Result<Coordinator, BindayError> {
    let port = CanterburyCollectionPort::new(config)?;
    Coordinator::initialize(config, Arc::new(port)).await
}

fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("*/*"));
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-GB,en;q=0.5"));
    headers.insert(ORIGIN, HeaderValue::from_static(COUNCIL_ORIGIN));
    headers
}

// Small helper to send a request and decode the JSON body. Only 200 counts as success.
async fn fetch_json(req: RequestBuilder) -> Result<Value, CommunicationError> {
    let response = req.send().await.map_err(CommunicationError::from)?;

    let status = response.status();
    if status != StatusCode::OK {
        return Err(CommunicationError::Status(status.as_u16()));
    }

    response.json().await.map_err(CommunicationError::from)
}
