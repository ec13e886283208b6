#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Source adapters for the four displacement data APIs.
//!
//! Each adapter owns its source's query parameters, pagination contract,
//! authentication scheme, and raw response shape, and exposes fetch
//! operations that return the canonical records from
//! [`displacement_globe_flow_models`]. Pure raw-to-canonical transforms
//! live in [`normalize`] so they can be tested without a network.
//!
//! Failure contracts differ per source and are part of the adapter's API:
//!
//! - **UNHCR / UNRWA**: any transport error aborts the whole multi-page
//!   fetch and propagates.
//! - **IOM**: one country's failure is isolated; the batch continues.
//! - **ACLED**: one token-refresh-and-retry per page, then the pages
//!   accumulated so far are returned as a partial result.

pub mod acled;
pub mod iom;
pub mod normalize;
pub mod parsing;
pub mod unhcr;
pub mod unrwa;

/// Errors that can occur during data source operations.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// HTTP request failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// The API answered with a non-success status or error envelope.
    #[error("API error: {message}")]
    Api {
        /// Description of what the API reported.
        message: String,
    },

    /// Authentication failed and could not be recovered by one refresh.
    #[error("Authentication failed: {message}")]
    Auth {
        /// Description of the failed auth step.
        message: String,
    },

    /// The API signalled rate limiting (ACLED uses 403 for this).
    #[error("Rate limited by the API")]
    RateLimited,

    /// No query-name mapping exists for the requested country.
    #[error("No country mapping for ISO3 code {iso3}")]
    CountryMapping {
        /// The unmapped ISO3 code.
        iso3: String,
    },
}
