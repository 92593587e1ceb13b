//! HTTP fetcher with proxy fallback and randomized pacing
//!
//! Upstreams rate-limit per IP, so proxied requests go out through a
//! rotating-proxy endpoint after a random pause. When the proxy path fails
//! the fetcher pauses again and tries once more without the proxy. There is
//! no further retry.
//!
//! Sources that are not proxied (flight tracker, tide and air-quality APIs)
//! use the plain `get_*` methods, optionally staggered with
//! [`DelayedFetcher::delay_then`].

use crate::utils::error::FetchError;
use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use rand::seq::SliceRandom;
use rand::Rng;
use reqwest::{
    header::{
        HeaderMap, HeaderName, HeaderValue, ACCEPT, ACCEPT_ENCODING, ACCEPT_LANGUAGE,
        CONTENT_TYPE, USER_AGENT,
    },
    Client, Proxy,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;

/// Pool of realistic User-Agent strings for rotation
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
];

/// Rotating-proxy endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProxyConfig {
    /// Proxy URL, e.g. `http://proxy-server.scraperapi.com:8001`
    pub url: String,
    pub username: String,
    /// API key used as the proxy password
    pub password: String,
    /// The proxy re-signs TLS with its own certificate
    pub accept_invalid_certs: bool,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            url: "http://proxy-server.scraperapi.com:8001".to_string(),
            username: "scraperapi".to_string(),
            password: String::new(),
            accept_invalid_certs: true,
        }
    }
}

/// Fetcher configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Proxy for `secure_get_*`; both attempts go direct when absent
    pub proxy: Option<ProxyConfig>,

    /// Pause before each `secure_get_*` attempt, lower bound
    pub proxy_delay_min_ms: u64,
    /// Pause before each `secure_get_*` attempt, upper bound
    pub proxy_delay_max_ms: u64,

    /// Stagger for unproxied requests, lower bound
    pub stagger_min_ms: u64,
    /// Stagger for unproxied requests, upper bound
    pub stagger_max_ms: u64,

    /// Per-request timeout in seconds
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            proxy: None,
            proxy_delay_min_ms: 10_000,
            proxy_delay_max_ms: 20_000,
            stagger_min_ms: 500,
            stagger_max_ms: 2_500,
            timeout_secs: 30,
        }
    }
}

impl FetchConfig {
    /// No pauses at all; used by tests against mock servers
    pub fn without_delays() -> Self {
        Self {
            proxy_delay_min_ms: 0,
            proxy_delay_max_ms: 0,
            stagger_min_ms: 0,
            stagger_max_ms: 0,
            ..Self::default()
        }
    }
}

/// Fetcher holding a proxied and a direct client
pub struct DelayedFetcher {
    proxied: Client,
    direct: Client,
    config: FetchConfig,
}

impl DelayedFetcher {
    /// Build both clients
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if a client or the proxy cannot be created
    pub fn new(config: &FetchConfig) -> Result<Self, FetchError> {
        let timeout = Duration::from_secs(config.timeout_secs);

        let direct = Client::builder()
            .timeout(timeout)
            .gzip(true)
            .cookie_store(true)
            .build()?;

        let proxied = match &config.proxy {
            Some(proxy) => {
                let proxy_conf =
                    Proxy::all(&proxy.url)?.basic_auth(&proxy.username, &proxy.password);
                Client::builder()
                    .timeout(timeout)
                    .gzip(true)
                    .proxy(proxy_conf)
                    .danger_accept_invalid_certs(proxy.accept_invalid_certs)
                    .build()?
            }
            None => direct.clone(),
        };

        Ok(Self {
            proxied,
            direct,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    /// Fetch through the proxy, falling back to a direct request once
    ///
    /// # Errors
    ///
    /// Returns `FetchError::EmptyUrl` for an empty URL, and
    /// `FetchError::UpstreamUnavailable` when both attempts fail
    pub async fn secure_get_text(&self, url: &str) -> Result<String, FetchError> {
        if url.is_empty() {
            return Err(FetchError::EmptyUrl);
        }

        tokio::time::sleep(self.proxy_delay()).await;
        let proxied_err = match self.fetch_text(&self.proxied, url, &[]).await {
            Ok(body) => return Ok(body),
            Err(e) => e,
        };

        tracing::warn!(url = %url, error = %proxied_err, "Proxied request failed, retrying direct");

        tokio::time::sleep(self.proxy_delay()).await;
        match self.fetch_text(&self.direct, url, &[]).await {
            Ok(body) => Ok(body),
            Err(direct_err) => {
                tracing::error!(url = %url, error = %direct_err, "Direct request failed");
                Err(FetchError::UpstreamUnavailable {
                    url: url.to_string(),
                    proxied: proxied_err.to_string(),
                    direct: direct_err.to_string(),
                })
            }
        }
    }

    /// [`Self::secure_get_text`] and parse the body as JSON
    pub async fn secure_get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        let body = self.secure_get_text(url).await?;
        parse_json(&body, url)
    }

    /// Single direct GET
    pub async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        if url.is_empty() {
            return Err(FetchError::EmptyUrl);
        }
        self.fetch_text(&self.direct, url, &[]).await
    }

    /// Single direct GET parsed as JSON
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, FetchError> {
        self.get_json_with_headers(url, &[]).await
    }

    /// Single direct GET with extra headers, parsed as JSON
    pub async fn get_json_with_headers<T: DeserializeOwned>(
        &self,
        url: &str,
        headers: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        if url.is_empty() {
            return Err(FetchError::EmptyUrl);
        }
        let body = self.fetch_text(&self.direct, url, headers).await?;
        parse_json(&body, url)
    }

    /// Suspend for `delay`, then run `f`
    pub async fn delay_then<F, Fut, T>(delay: Duration, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        tokio::time::sleep(delay).await;
        f().await
    }

    /// Random pause before a `secure_get_*` attempt
    pub fn proxy_delay(&self) -> Duration {
        random_between(self.config.proxy_delay_min_ms, self.config.proxy_delay_max_ms)
    }

    /// Random stagger for unproxied requests
    pub fn stagger_delay(&self) -> Duration {
        random_between(self.config.stagger_min_ms, self.config.stagger_max_ms)
    }

    async fn fetch_text(
        &self,
        client: &Client,
        url: &str,
        extra: &[(&str, &str)],
    ) -> Result<String, FetchError> {
        let headers = build_headers(extra);

        let response = client
            .get(url)
            .headers(headers)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string())
            .unwrap_or_default();

        let bytes = response.bytes().await.map_err(FetchError::from_reqwest)?;

        tracing::debug!(url = %url, status = status.as_u16(), bytes = bytes.len(), "Fetched");
        Ok(decode_bytes(&bytes, &content_type))
    }
}

fn parse_json<T: DeserializeOwned>(body: &str, url: &str) -> Result<T, FetchError> {
    serde_json::from_str(body).map_err(|e| FetchError::Decode(format!("{url}: invalid JSON: {e}")))
}

fn random_between(min_ms: u64, max_ms: u64) -> Duration {
    if max_ms <= min_ms {
        return Duration::from_millis(min_ms);
    }
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
}

/// Decode a body to text
///
/// Order: declared charset, strict UTF-8, then Windows-1252, which the
/// regional statistics portals serve without declaring it.
pub fn decode_bytes(bytes: &[u8], content_type: &str) -> String {
    if let Some(encoding) = charset_of(content_type) {
        let (text, _, had_errors) = encoding.decode(bytes);
        if !had_errors {
            return text.into_owned();
        }
        tracing::debug!(charset = encoding.name(), "Declared charset did not decode cleanly");
    }

    let (text, _, had_errors) = UTF_8.decode(bytes);
    if !had_errors {
        return text.into_owned();
    }

    let (text, _, _) = WINDOWS_1252.decode(bytes);
    text.into_owned()
}

fn charset_of(content_type: &str) -> Option<&'static Encoding> {
    content_type
        .split(';')
        .filter_map(|part| part.trim().split_once('='))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("charset"))
        .and_then(|(_, label)| Encoding::for_label(label.trim().trim_matches('"').as_bytes()))
}

/// Browser-like headers with a random User-Agent
fn build_headers(extra: &[(&str, &str)]) -> HeaderMap {
    let mut headers = HeaderMap::new();

    headers.insert(USER_AGENT, HeaderValue::from_static(random_user_agent()));
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/json;q=0.9,*/*;q=0.8",
        ),
    );
    headers.insert(
        ACCEPT_LANGUAGE,
        HeaderValue::from_static("it-IT,it;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(ACCEPT_ENCODING, HeaderValue::from_static("gzip"));

    for (name, value) in extra {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Skipping invalid header"),
        }
    }

    headers
}

fn random_user_agent() -> &'static str {
    let mut rng = rand::thread_rng();
    USER_AGENTS.choose(&mut rng).copied().unwrap_or(USER_AGENTS[0])
}
