//! Cache key model.
//!
//! Persisted keys follow the `<source>_<scope>_<year>` form with a fixed
//! prefix, so an on-disk store can be inspected (and selectively cleared)
//! with ordinary file tools.

use std::fmt;
use std::time::Duration;

use strum_macros::{AsRefStr, Display};

/// Prefix on every persisted cache entry.
pub const KEY_PREFIX: &str = "dg_cache_";

/// Which dataset a cache entry belongs to. Drives the TTL and the key
/// namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, AsRefStr, Display)]
#[strum(serialize_all = "lowercase")]
pub enum DataSource {
    /// Merged UNHCR + UNRWA migration flows.
    Displacement,
    /// ACLED conflict events.
    Conflict,
    /// IOM internal-displacement records.
    Idp,
}

impl DataSource {
    /// How long a persisted entry of this source stays fresh.
    ///
    /// Conflict data updates weekly upstream so it expires daily;
    /// displacement statistics are yearly publications and keep for a
    /// month.
    #[must_use]
    pub const fn ttl(self) -> Duration {
        match self {
            Self::Conflict => Duration::from_secs(24 * 60 * 60),
            Self::Displacement | Self::Idp => Duration::from_secs(30 * 24 * 60 * 60),
        }
    }
}

/// What a cache entry covers: the whole world or one country, for one
/// year.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ScopeKey {
    /// All countries for one year.
    Global {
        /// Reporting year.
        year: i32,
    },
    /// One country for one year.
    Country {
        /// ISO3 country code, already canonical.
        iso3: String,
        /// Reporting year.
        year: i32,
    },
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Global { year } => write!(f, "global_{year}"),
            Self::Country { iso3, year } => write!(f, "{iso3}_{year}"),
        }
    }
}

/// Full cache key: source namespace plus scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Dataset namespace.
    pub source: DataSource,
    /// Covered scope.
    pub scope: ScopeKey,
}

impl CacheKey {
    /// Builds a key for one country-year.
    #[must_use]
    pub fn country(source: DataSource, iso3: &str, year: i32) -> Self {
        Self {
            source,
            scope: ScopeKey::Country {
                iso3: iso3.to_owned(),
                year,
            },
        }
    }

    /// Builds a key for a global year.
    #[must_use]
    pub const fn global(source: DataSource, year: i32) -> Self {
        Self {
            source,
            scope: ScopeKey::Global { year },
        }
    }

    /// The persisted form, including the fixed prefix.
    #[must_use]
    pub fn storage_key(&self) -> String {
        format!("{KEY_PREFIX}{self}")
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.source, self.scope)
    }
}
