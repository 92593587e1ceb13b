//! Key-tree database over its REST interface
//!
//! Each node is addressed as `{base}/{path}.json`. `PUT` replaces a node,
//! `POST` appends a child and answers `{"name": "<generated id>"}`, `DELETE`
//! drops a node.

use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::Deserialize;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use url::Url;

use super::{path_segments, RecordSink, SinkConfig};
use crate::error::{Error, Result};

#[derive(Debug, Deserialize)]
struct PushResponse {
    name: String,
}

/// REST-backed [`RecordSink`]
pub struct RestTreeSink {
    client: Client,
    base: Url,
    auth: Option<String>,
    closed: AtomicBool,
}

impl RestTreeSink {
    /// # Errors
    ///
    /// Returns a config error if no URL is configured or it does not parse
    pub fn new(config: &SinkConfig) -> Result<Self> {
        let raw = config
            .url
            .as_deref()
            .ok_or_else(|| Error::config("sink URL is not set"))?;
        let base = Url::parse(raw).map_err(|e| Error::config(format!("invalid sink URL {raw:?}: {e}")))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .gzip(true)
            .build()?;

        Ok(Self {
            client,
            base,
            auth: config.auth.clone().filter(|a| !a.is_empty()),
            closed: AtomicBool::new(false),
        })
    }

    /// Address of the node at `path`
    pub fn node_url(&self, path: &str) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::config(format!("sink URL {} cannot be a base", self.base)))?;
            segments.pop_if_empty();

            let parts = path_segments(path);
            match parts.split_last() {
                Some((leaf, parents)) => {
                    segments.extend(parents);
                    segments.push(&format!("{leaf}.json"));
                }
                None => {
                    segments.push(".json");
                }
            }
        }

        if let Some(auth) = &self.auth {
            url.query_pairs_mut().append_pair("auth", auth);
        }
        Ok(url)
    }

    async fn send(&self, method: Method, path: &str, body: Option<&Value>) -> Result<reqwest::Response> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(Error::sink("sink is closed"));
        }

        let url = self.node_url(path)?;
        let mut request = self.client.request(method.clone(), url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::sink(format!("{method} {path} returned status {}", status.as_u16())));
        }

        tracing::debug!(method = %method, path = %path, "Sink write");
        Ok(response)
    }
}

#[async_trait]
impl RecordSink for RestTreeSink {
    async fn remove(&self, path: &str) -> Result<()> {
        self.send(Method::DELETE, path, None).await?;
        Ok(())
    }

    async fn set(&self, path: &str, value: Value) -> Result<()> {
        self.send(Method::PUT, path, Some(&value)).await?;
        Ok(())
    }

    async fn push(&self, path: &str, record: Value) -> Result<String> {
        let response = self.send(Method::POST, path, Some(&record)).await?;
        let pushed: PushResponse = response.json().await?;
        Ok(pushed.name)
    }

    async fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::info!(base = %self.base, "Sink closed");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sink(url: &str, auth: Option<&str>) -> RestTreeSink {
        RestTreeSink::new(&SinkConfig {
            url: Some(url.to_string()),
            auth: auth.map(String::from),
            ..SinkConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_node_url() {
        let sink = sink("https://venice-dashboard.example.com/", None);
        assert_eq!(
            sink.node_url("dashboard/data/Tides/2026-05-04_to_2026-05-05").unwrap().as_str(),
            "https://venice-dashboard.example.com/dashboard/data/Tides/2026-05-04_to_2026-05-05.json"
        );
        assert_eq!(
            sink.node_url("busData/").unwrap().as_str(),
            "https://venice-dashboard.example.com/busData.json"
        );
    }

    #[test]
    fn test_node_url_with_auth() {
        let sink = sink("https://venice-dashboard.example.com", Some("tok"));
        assert_eq!(
            sink.node_url("boatData").unwrap().as_str(),
            "https://venice-dashboard.example.com/boatData.json?auth=tok"
        );
    }

    #[test]
    fn test_missing_url_is_config_error() {
        let err = RestTreeSink::new(&SinkConfig::default()).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_closed_sink_fails_without_network() {
        let sink = sink("http://127.0.0.1:1", None);
        sink.close().await.unwrap();
        let err = sink.set("a", Value::Null).await.unwrap_err();
        assert!(matches!(err, Error::Sink(_)));
    }
}
