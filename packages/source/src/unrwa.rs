//! UNRWA registered-refugee adapter.
//!
//! Served from the same host as the UNHCR population API under the
//! `/unrwa` path, with the origin fixed to Palestine. The response may
//! report success with an empty item list — that is a confirmed "no
//! records" result, not an error. Transport errors propagate like UNHCR's.

use displacement_globe_flow_models::MigrationFlow;
use displacement_globe_source_models::{UnrwaApiResponse, UnrwaItem};

use crate::{SourceError, normalize};

/// Production base URL for the UNRWA endpoint.
const DEFAULT_BASE_URL: &str = "https://api.unhcr.org/population/v1/unrwa";

/// Records requested per response.
const PAGE_LIMIT: u64 = 1000;

/// Countries hosting UNRWA-registered Palestine refugees. Queries for any
/// other asylum country short-circuit to an empty result without touching
/// the network.
pub const UNRWA_HOST_COUNTRIES: &[&str] = &["JOR", "LBN", "SYR", "PSE", "EGY"];

/// Client for the UNRWA registered-refugee endpoint.
#[derive(Debug, Clone)]
pub struct UnrwaClient {
    client: reqwest::Client,
    base_url: String,
}

impl UnrwaClient {
    /// Creates a client for the production API.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            base_url: DEFAULT_BASE_URL.to_owned(),
        })
    }

    /// Overrides the base URL (used by tests against a local server).
    #[must_use]
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_owned();
        self
    }

    /// Fetches the raw UNRWA items for one year.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on any transport or decode failure. A
    /// success response without items yields `Ok` with an empty vec.
    pub async fn fetch_items(&self, year: i32) -> Result<Vec<UnrwaItem>, SourceError> {
        let response: UnrwaApiResponse = self
            .client
            .get(format!("{}/", self.base_url))
            .query(&[("cf_type", "ISO"), ("coo", "PSE"), ("coa_all", "true")])
            .query(&[("year[]", year.to_string()), ("limit", PAGE_LIMIT.to_string())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        if response.items.is_empty() {
            log::warn!("UNRWA {year}: success response with no items");
        }

        Ok(response.items)
    }

    /// Fetches all Palestine-origin refugee flows for one year, aggregated
    /// by destination country.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on any transport or decode failure.
    pub async fn fetch_palestine_refugees(
        &self,
        year: i32,
    ) -> Result<Vec<MigrationFlow>, SourceError> {
        let items = self.fetch_items(year).await?;
        let flows = normalize::flows_from_unrwa_items(&items, year);
        log::info!("UNRWA {year}: {} destination flows", flows.len());
        Ok(flows)
    }

    /// Fetches UNRWA flows into one asylum country for one year.
    ///
    /// Only the five UNRWA host countries can have results; anything else
    /// returns empty without a request.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on any transport or decode failure.
    pub async fn fetch_incoming_flows(
        &self,
        asylum_iso3: &str,
        year: i32,
    ) -> Result<Vec<MigrationFlow>, SourceError> {
        if !UNRWA_HOST_COUNTRIES.contains(&asylum_iso3) {
            return Ok(Vec::new());
        }

        let flows = self.fetch_palestine_refugees(year).await?;
        Ok(flows
            .into_iter()
            .filter(|flow| flow.asylum_iso == asylum_iso3)
            .collect())
    }

    /// Fetches all flows out of Palestine for one year.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] on any transport or decode failure.
    pub async fn fetch_outgoing_flows(&self, year: i32) -> Result<Vec<MigrationFlow>, SourceError> {
        self.fetch_palestine_refugees(year).await
    }
}
