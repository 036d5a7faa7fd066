//! HTTP transport seam and the redirect-aware page fetcher.

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use reqwest::redirect::Policy;
use tracing::info;
use url::Url;

use crate::error::ScrapeError;

/// Default User-Agent header, a desktop Chrome string. Some sites serve
/// stripped-down markup to unknown agents.
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/45.0.2454.101 Safari/537.36";

/// One raw HTTP exchange. Redirect handling happens above the transport.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl TransportResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Performs a single request without following redirects.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<TransportResponse, ScrapeError>;
}

/// Production transport backed by reqwest.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(user_agent: &str) -> Result<ReqwestTransport, ScrapeError> {
        let client = reqwest::Client::builder()
            .redirect(Policy::none())
            .user_agent(user_agent)
            .build()
            .map_err(|err| ScrapeError::Transport {
                url: String::new(),
                message: err.to_string(),
            })?;
        Ok(ReqwestTransport { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn fetch(&self, url: &Url) -> Result<TransportResponse, ScrapeError> {
        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|err| ScrapeError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            })?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();
        let body = response
            .text()
            .await
            .map_err(|err| ScrapeError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            })?;

        Ok(TransportResponse {
            status,
            headers,
            body,
        })
    }
}

/// Prefix bare host names so `Url` can parse them. Empty urls and
/// rooted paths are left alone to fail as what they are.
pub(crate) fn ensure_scheme(url: &str) -> String {
    if url.is_empty() || url.starts_with('/') || url.contains("://") {
        url.to_string()
    } else {
        format!("http://{url}")
    }
}

/// Statuses whose `Location` header we follow. Anything else non-2xx is
/// a hard failure.
const REDIRECT_STATUSES: [u16; 4] = [300, 301, 307, 410];

/// Fetches pages through a [`Transport`], resolving redirects manually
/// so each hop can be validated.
#[derive(Clone)]
pub struct HttpClient {
    transport: Arc<dyn Transport>,
}

impl HttpClient {
    pub fn new(user_agent: &str) -> Result<HttpClient, ScrapeError> {
        Ok(HttpClient {
            transport: Arc::new(ReqwestTransport::new(user_agent)?),
        })
    }

    pub fn with_transport(transport: Arc<dyn Transport>) -> HttpClient {
        HttpClient { transport }
    }

    /// Fetch a page body, following redirects. Every hop must name a
    /// strictly new location or the redirect status is surfaced as an
    /// error. Returns the final url alongside the body.
    pub async fn get(&self, url: &Url) -> Result<(Url, String), ScrapeError> {
        let started = Instant::now();
        let mut current = url.clone();
        loop {
            let response = self.transport.fetch(&current).await?;
            let status = response.status;

            if (200..300).contains(&status) {
                info!(url = %current, elapsed = ?started.elapsed(), "loaded url");
                return Ok((current, response.body));
            }

            if !REDIRECT_STATUSES.contains(&status) {
                return Err(ScrapeError::HttpStatus {
                    status,
                    url: current.to_string(),
                });
            }

            let Some(location) = response.header("location") else {
                return Err(ScrapeError::HttpStatus {
                    status,
                    url: current.to_string(),
                });
            };
            let next = current
                .join(location)
                .map_err(|source| ScrapeError::Url {
                    url: location.to_string(),
                    source,
                })?;
            if next == current {
                return Err(ScrapeError::HttpStatus {
                    status,
                    url: current.to_string(),
                });
            }
            info!(from = %current, to = %next, status, "following redirect");
            current = next;
        }
    }
}
