//! IOM Displacement Tracking Matrix (DTM) adapter.
//!
//! The DTM API is keyed by country display name, not ISO3, and wraps every
//! response in a success/error envelope. Data is fetched for all
//! observation operations (not just the primary one) over a wide date
//! window; picking a single figure per year happens later in the
//! aggregator.
//!
//! Failure isolation: when fetching the full batch, one country's failure
//! is logged and skipped so it can never abort the remaining countries.
//! Every request carries a fixed timeout to avoid indefinite hangs.

use std::collections::HashMap;
use std::time::Duration;

use displacement_globe_geography::resolve_iso3;
use displacement_globe_source_models::{IomCountry, IomDataPoint, IomEnvelope};

use crate::SourceError;

/// Production base URL for the IOM DTM API.
const DEFAULT_BASE_URL: &str = "https://dtmapi.iom.int/api";

/// Hard timeout per request. The DTM API occasionally stalls without
/// closing the connection.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Politeness delay between per-country requests in the batch fetch.
const COUNTRY_DELAY: Duration = Duration::from_millis(100);

/// Start of the reporting-date window for all queries.
const FROM_DATE: &str = "2000-01-01";

/// Client for the IOM DTM API.
#[derive(Debug, Clone)]
pub struct IomClient {
    client: reqwest::Client,
    base_url: String,
}

impl IomClient {
    /// Creates a client for the production API.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new() -> Result<Self, SourceError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            base_url: DEFAULT_BASE_URL.to_owned(),
        })
    }

    /// Overrides the base URL (used by tests against a local server).
    #[must_use]
    pub fn with_base_url(mut self, url: &str) -> Self {
        self.base_url = url.trim_end_matches('/').to_owned();
        self
    }

    /// Fetches the list of all countries known to DTM.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails or the envelope
    /// reports an error.
    pub async fn fetch_country_list(&self) -> Result<Vec<IomCountry>, SourceError> {
        let envelope: IomEnvelope<IomCountry> = self
            .client
            .get(format!("{}/Common/GetAllCountryList", self.base_url))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Self::unwrap_envelope(envelope)
    }

    /// Fetches all raw IDP observations for one country across all
    /// operations since [`FROM_DATE`].
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the request fails, times out, or the
    /// envelope reports an error.
    pub async fn fetch_idp_data(
        &self,
        country_name: &str,
    ) -> Result<Vec<IomDataPoint>, SourceError> {
        let today = chrono::Utc::now().date_naive().to_string();

        let envelope: IomEnvelope<IomDataPoint> = self
            .client
            .get(format!("{}/IdpAdmin0Data/GetAdmin0Datav2", self.base_url))
            .query(&[
                ("CountryName", country_name),
                // Empty operation = all operations, not just the primary one.
                ("Operation", ""),
                ("FromReportingDate", FROM_DATE),
                ("ToReportingDate", today.as_str()),
                ("FromRoundNumber", ""),
                ("ToRoundNumber", ""),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        Self::unwrap_envelope(envelope)
    }

    /// Fetches IDP observations for every DTM country, keyed by ISO3.
    ///
    /// One country failing (transport, timeout, or envelope error) is
    /// logged and contributes nothing; the batch continues. Countries whose
    /// data carries no pcode are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] only if the initial country list cannot be
    /// fetched.
    pub async fn fetch_all(&self) -> Result<HashMap<String, Vec<IomDataPoint>>, SourceError> {
        let countries = self.fetch_country_list().await?;
        log::info!("IOM: fetching IDP data for {} countries", countries.len());

        let mut by_iso3 = HashMap::new();

        for country in &countries {
            match self.fetch_idp_data(&country.admin0_name).await {
                Ok(points) => {
                    if let Some(first) = points.first() {
                        let iso3 = resolve_iso3(&first.admin0_pcode);
                        log::info!(
                            "IOM: {} data points for {} ({iso3})",
                            points.len(),
                            country.admin0_name
                        );
                        by_iso3.insert(iso3, points);
                    }
                }
                Err(e) => {
                    log::warn!("IOM: skipping {}: {e}", country.admin0_name);
                }
            }

            tokio::time::sleep(COUNTRY_DELAY).await;
        }

        log::info!("IOM: fetched data for {} countries", by_iso3.len());
        Ok(by_iso3)
    }

    fn unwrap_envelope<T>(envelope: IomEnvelope<T>) -> Result<Vec<T>, SourceError> {
        if !envelope.is_success {
            return Err(SourceError::Api {
                message: format!("IOM API error: {}", envelope.error_messages.join(", ")),
            });
        }
        Ok(envelope.result.unwrap_or_default())
    }
}
