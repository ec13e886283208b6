//! UNHCR population API adapter.
//!
//! The population endpoint pages its results and reports the total page
//! count in the first response. The global fetch requests page one, then
//! issues the remaining pages concurrently and concatenates. Any non-2xx
//! response aborts the whole fetch — a partially fetched year is never
//! returned or cached.

use displacement_globe_flow_models::MigrationFlow;
use displacement_globe_source_models::{UnhcrApiResponse, UnhcrPopulationItem};

use crate::{SourceError, normalize};

/// Production base URL for the UNHCR population API.
const DEFAULT_BASE_URL: &str = "https://api.unhcr.org/population/v1";

/// Records requested per page.
const PAGE_LIMIT: u64 = 1000;

/// Upper bound on pages fetched for one year, matching the API's own
/// practical maximum. Guards against a bogus `maxPages` value.
const MAX_PAGES: u64 = 100;

/// Client for the UNHCR population API.
#[derive(Debug, Clone)]
pub struct UnhcrClient {
    client: reqwest::Client,
    base_url: String,
}

impl UnhcrClient {
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

    /// Fetches every raw population item for one year across all origin and
    /// asylum countries.
    ///
    /// Page one is fetched first to learn `maxPages`; the remaining pages
    /// are issued concurrently and concatenated. Flow order is irrelevant
    /// downstream (all aggregation is by key), so completion order does not
    /// matter.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if any page request fails — the whole fetch
    /// aborts rather than returning a partial year.
    pub async fn fetch_global_items(
        &self,
        year: i32,
    ) -> Result<Vec<UnhcrPopulationItem>, SourceError> {
        let first = self.fetch_page(year, 1).await?;
        let max_pages = first.max_pages.clamp(1, MAX_PAGES);

        log::debug!("UNHCR global {year}: {max_pages} page(s)");

        let mut items = first.items;
        let remaining =
            futures::future::try_join_all((2..=max_pages).map(|page| self.fetch_page(year, page)))
                .await?;
        for page in remaining {
            items.extend(page.items);
        }

        log::info!("UNHCR global {year}: {} items", items.len());
        Ok(items)
    }

    /// Fetches all global flows for one year, normalized.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if any page request fails.
    pub async fn fetch_global_flows(&self, year: i32) -> Result<Vec<MigrationFlow>, SourceError> {
        let items = self.fetch_global_items(year).await?;
        Ok(normalize::flows_from_unhcr_items(&items))
    }

    /// Fetches flows into one asylum country from all origins for one year.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails.
    pub async fn fetch_incoming_flows(
        &self,
        asylum_iso3: &str,
        year: i32,
    ) -> Result<Vec<MigrationFlow>, SourceError> {
        let response: UnhcrApiResponse = self
            .client
            .get(self.population_url())
            .query(&[("cf_type", "ISO"), ("coa", asylum_iso3), ("coo_all", "true")])
            .query(&[("year[]", year.to_string()), ("limit", PAGE_LIMIT.to_string())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(normalize::flows_from_unhcr_items(&response.items))
    }

    /// Fetches flows out of one origin country to all destinations for one
    /// year.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails.
    pub async fn fetch_outgoing_flows(
        &self,
        origin_iso3: &str,
        year: i32,
    ) -> Result<Vec<MigrationFlow>, SourceError> {
        let response: UnhcrApiResponse = self
            .client
            .get(self.population_url())
            .query(&[("cf_type", "ISO"), ("coo", origin_iso3), ("coa_all", "true")])
            .query(&[("year[]", year.to_string()), ("limit", PAGE_LIMIT.to_string())])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Ok(normalize::flows_from_unhcr_items(&response.items))
    }

    async fn fetch_page(&self, year: i32, page: u64) -> Result<UnhcrApiResponse, SourceError> {
        log::debug!("UNHCR global {year}: fetching page {page}");
        let response = self
            .client
            .get(self.population_url())
            .query(&[
                ("cf_type", "ISO"),
                ("coo_all", "true"),
                ("coa_all", "true"),
            ])
            .query(&[
                ("year[]", year.to_string()),
                ("limit", PAGE_LIMIT.to_string()),
                ("page", page.to_string()),
            ])
            .send()
            .await?
            .error_for_status()?;

        Ok(response.json().await?)
    }

    fn population_url(&self) -> String {
        format!("{}/population/", self.base_url)
    }
}
