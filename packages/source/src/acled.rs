//! ACLED conflict-event adapter.
//!
//! ACLED requires OAuth2 password-grant authentication and rate-limits
//! aggressively. The client holds a shared token state behind a mutex so
//! concurrent fetches reuse one access token. Pagination is sequential
//! with a politeness delay; a rate-limit response or a repeated failure
//! ends the fetch with whatever pages were already collected rather than
//! discarding them.

use std::time::Duration;

use chrono::{DateTime, Utc};
use displacement_globe_flow_models::ConflictEvent;
use displacement_globe_source_models::{AcledApiResponse, AcledRow, AcledTokenResponse};
use tokio::sync::Mutex;

use crate::{SourceError, normalize};

/// Production base URL for the ACLED read API.
const DEFAULT_BASE_URL: &str = "https://acleddata.com/api/acled/read";

/// OAuth token endpoint.
const DEFAULT_TOKEN_URL: &str = "https://acleddata.com/oauth/token";

/// OAuth client id for the public API.
const OAUTH_CLIENT_ID: &str = "acled";

/// Rows requested per page.
const PAGE_SIZE: usize = 5000;

/// Politeness delay between page requests.
const PAGE_DELAY: Duration = Duration::from_millis(200);

/// Hard timeout per page request.
const PAGE_TIMEOUT: Duration = Duration::from_secs(15);

/// Fixed pause after a rate-limit response before the fetch gives up, so
/// the next country in a batch does not hit the limiter immediately.
const RATE_LIMIT_BACKOFF: Duration = Duration::from_secs(5);

/// Refresh the access token when less than this much lifetime remains.
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(3600);

/// The columns requested from the read endpoint, pipe-delimited as the API
/// expects. Keep in sync with `AcledRow`.
const FIELDS: &str = "event_id_cnty|event_date|year|event_type|sub_event_type|actor1|actor2|admin1|admin2|admin3|location|latitude|longitude|fatalities|civilian_targeting";

#[derive(Debug, Clone)]
struct TokenState {
    access_token: String,
    refresh_token: String,
    expires_at: DateTime<Utc>,
}

/// Client for the ACLED conflict-event API.
pub struct AcledClient {
    client: reqwest::Client,
    base_url: String,
    token_url: String,
    username: String,
    password: String,
    token: Mutex<Option<TokenState>>,
}

impl AcledClient {
    /// Creates a client with explicit credentials.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if the underlying HTTP client cannot be
    /// constructed.
    pub fn new(username: &str, password: &str) -> Result<Self, SourceError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(PAGE_TIMEOUT).build()?,
            base_url: DEFAULT_BASE_URL.to_owned(),
            token_url: DEFAULT_TOKEN_URL.to_owned(),
            username: username.to_owned(),
            password: password.to_owned(),
            token: Mutex::new(None),
        })
    }

    /// Creates a client reading credentials from `ACLED_USERNAME` and
    /// `ACLED_PASSWORD`.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::Auth`] if either variable is unset.
    pub fn from_env() -> Result<Self, SourceError> {
        let username = std::env::var("ACLED_USERNAME").map_err(|_| SourceError::Auth {
            message: "ACLED_USERNAME is not set".to_owned(),
        })?;
        let password = std::env::var("ACLED_PASSWORD").map_err(|_| SourceError::Auth {
            message: "ACLED_PASSWORD is not set".to_owned(),
        })?;
        Self::new(&username, &password)
    }

    /// Overrides the API and token base URLs (used by tests against a
    /// local server).
    #[must_use]
    pub fn with_base_urls(mut self, base_url: &str, token_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_owned();
        self.token_url = token_url.to_owned();
        self
    }

    /// Fetches all conflict events for one country and year, normalized.
    ///
    /// Pages are fetched sequentially until a page comes back shorter than
    /// the page size. A rate-limit response sleeps for a fixed backoff and
    /// then ends the fetch; a page that fails even after a token refresh
    /// ends it immediately. Either way the pages already collected are
    /// returned, so a long-running batch degrades instead of losing
    /// everything.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError::CountryMapping`] if the ISO3 code has no
    /// known ACLED country name, or [`SourceError::Auth`] if credentials
    /// are rejected outright.
    pub async fn fetch_country_events(
        &self,
        iso3: &str,
        year: i32,
    ) -> Result<Vec<ConflictEvent>, SourceError> {
        let country =
            displacement_globe_geography::acled_country_name(iso3).ok_or_else(|| {
                SourceError::CountryMapping {
                    iso3: iso3.to_owned(),
                }
            })?;

        let mut rows: Vec<AcledRow> = Vec::new();
        let mut page: usize = 1;

        loop {
            match self.fetch_page(country, year, page).await {
                Ok(page_rows) => {
                    let page_len = page_rows.len();
                    rows.extend(page_rows);
                    log::debug!("ACLED {iso3} {year}: page {page}, {page_len} rows");
                    if page_len < PAGE_SIZE {
                        break;
                    }
                    page += 1;
                    tokio::time::sleep(PAGE_DELAY).await;
                }
                Err(SourceError::RateLimited) => {
                    log::warn!(
                        "ACLED {iso3} {year}: rate limited on page {page}, backing off and keeping {} rows",
                        rows.len()
                    );
                    tokio::time::sleep(RATE_LIMIT_BACKOFF).await;
                    break;
                }
                Err(e) if page > 1 => {
                    // Later pages degrade to a partial result; page one
                    // failing means the fetch produced nothing.
                    log::warn!(
                        "ACLED {iso3} {year}: page {page} failed ({e}), keeping {} rows",
                        rows.len()
                    );
                    break;
                }
                Err(e) => return Err(e),
            }
        }

        let events = normalize::events_from_acled_rows(&rows);
        log::info!("ACLED {iso3} {year}: {} events", events.len());
        Ok(events)
    }

    /// Fetches one page, retrying exactly once after a forced token
    /// refresh if the API returns 401.
    async fn fetch_page(
        &self,
        country: &str,
        year: i32,
        page: usize,
    ) -> Result<Vec<AcledRow>, SourceError> {
        for attempt in 0..=1 {
            let token = self.ensure_token(attempt > 0).await?;

            let response = self
                .client
                .get(&self.base_url)
                .bearer_auth(&token)
                .query(&[
                    ("country", country),
                    ("year", &year.to_string()),
                    ("limit", &PAGE_SIZE.to_string()),
                    ("page", &page.to_string()),
                    ("fields", FIELDS),
                ])
                .send()
                .await?;

            match response.status() {
                status if status.is_success() => {
                    let body: AcledApiResponse = response.json().await?;
                    return Ok(body.data);
                }
                reqwest::StatusCode::UNAUTHORIZED if attempt == 0 => {
                    log::debug!("ACLED: 401 on page {page}, refreshing token");
                }
                reqwest::StatusCode::UNAUTHORIZED => {
                    return Err(SourceError::Auth {
                        message: "ACLED rejected credentials after token refresh".to_owned(),
                    });
                }
                reqwest::StatusCode::FORBIDDEN => return Err(SourceError::RateLimited),
                status => {
                    return Err(SourceError::Api {
                        message: format!("ACLED returned {status} for page {page}"),
                    });
                }
            }
        }

        unreachable!("page fetch loop always returns within two attempts")
    }

    /// Returns a valid access token, logging in or refreshing as needed.
    ///
    /// With `force` set the cached token is discarded first, which is how
    /// a 401 response recovers from server-side token invalidation.
    async fn ensure_token(&self, force: bool) -> Result<String, SourceError> {
        let mut guard = self.token.lock().await;

        if force {
            if let Some(state) = guard.take() {
                // Try the refresh grant first; fall back to a full login.
                match self.refresh(&state.refresh_token).await {
                    Ok(fresh) => {
                        let token = fresh.access_token.clone();
                        *guard = Some(fresh);
                        return Ok(token);
                    }
                    Err(e) => log::debug!("ACLED: token refresh failed ({e}), logging in"),
                }
            }
        } else if let Some(state) = guard.as_ref() {
            let margin = chrono::Duration::from_std(TOKEN_REFRESH_MARGIN)
                .unwrap_or_else(|_| chrono::Duration::hours(1));
            if state.expires_at - Utc::now() > margin {
                return Ok(state.access_token.clone());
            }
            log::debug!("ACLED: access token near expiry, refreshing");
            if let Ok(fresh) = self.refresh(&state.refresh_token).await {
                let token = fresh.access_token.clone();
                *guard = Some(fresh);
                return Ok(token);
            }
            log::debug!("ACLED: token refresh failed, logging in");
        }

        let fresh = self.login().await?;
        let token = fresh.access_token.clone();
        *guard = Some(fresh);
        Ok(token)
    }

    async fn login(&self) -> Result<TokenState, SourceError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
                ("grant_type", "password"),
                ("client_id", OAUTH_CLIENT_ID),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Auth {
                message: format!("ACLED login failed with {}", response.status()),
            });
        }

        Ok(Self::token_state(response.json().await?))
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenState, SourceError> {
        let response = self
            .client
            .post(&self.token_url)
            .form(&[
                ("refresh_token", refresh_token),
                ("grant_type", "refresh_token"),
                ("client_id", OAUTH_CLIENT_ID),
            ])
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(SourceError::Auth {
                message: format!("ACLED token refresh failed with {}", response.status()),
            });
        }

        Ok(Self::token_state(response.json().await?))
    }

    fn token_state(response: AcledTokenResponse) -> TokenState {
        TokenState {
            access_token: response.access_token,
            refresh_token: response.refresh_token,
            expires_at: Utc::now()
                + chrono::Duration::seconds(i64::try_from(response.expires_in).unwrap_or(0)),
        }
    }
}

#[cfg(test)]
mod tests {
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    use super::*;

    const TOKEN_BODY: &str =
        r#"{"access_token":"token","refresh_token":"refresh","expires_in":3600}"#;

    /// Minimal HTTP server that grants tokens and rate-limits every read
    /// request.
    async fn spawn_rate_limited_server() -> std::net::SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            loop {
                let Ok((mut stream, _)) = listener.accept().await else {
                    break;
                };
                let mut request = Vec::new();
                let mut chunk = [0u8; 1024];
                loop {
                    let read = stream.read(&mut chunk).await.unwrap_or(0);
                    if read == 0 {
                        break;
                    }
                    request.extend_from_slice(&chunk[..read]);
                    if request_complete(&request) {
                        break;
                    }
                }
                let response = if request.starts_with(b"POST /oauth/token") {
                    format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{TOKEN_BODY}",
                        TOKEN_BODY.len()
                    )
                } else {
                    "HTTP/1.1 403 Forbidden\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
                        .to_owned()
                };
                let _ = stream.write_all(response.as_bytes()).await;
            }
        });
        addr
    }

    fn request_complete(request: &[u8]) -> bool {
        let Some(head_end) = request.windows(4).position(|w| w == b"\r\n\r\n") else {
            return false;
        };
        let head = String::from_utf8_lossy(&request[..head_end]);
        let content_length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                if name.eq_ignore_ascii_case("content-length") {
                    value.trim().parse::<usize>().ok()
                } else {
                    None
                }
            })
            .unwrap_or(0);
        request.len() >= head_end + 4 + content_length
    }

    #[tokio::test]
    async fn rate_limit_backs_off_then_returns_partial() {
        let addr = spawn_rate_limited_server().await;
        let client = AcledClient::new("user", "pass").unwrap().with_base_urls(
            &format!("http://{addr}/api/acled/read"),
            &format!("http://{addr}/oauth/token"),
        );

        let started = std::time::Instant::now();
        let events = client.fetch_country_events("SYR", 2023).await.unwrap();

        assert!(events.is_empty());
        assert!(started.elapsed() >= RATE_LIMIT_BACKOFF);
    }
}
