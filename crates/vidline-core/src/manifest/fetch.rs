//! Manifest fetching
//!
//! A timeout-bounded, cancellable GET. Any failure, including a non-success
//! status, means "no segments" to the caller of [`ManifestFetcher::fetch_timeline`].

use super::{parse, ManifestFormat};
use crate::{Error, PlayerConfig, Result, SegmentTimeline};
use reqwest::header::ACCEPT;
use reqwest::Client;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

const HLS_ACCEPT: &str = "application/vnd.apple.mpegurl, application/x-mpegURL";
const DASH_ACCEPT: &str = "application/dash+xml, */*";

/// Fetches manifest documents as text
#[derive(Debug, Clone)]
pub struct ManifestFetcher {
    client: Client,
    timeout: Duration,
    proxy_prefix: Option<String>,
}

impl ManifestFetcher {
    pub fn new(config: &PlayerConfig) -> Result<Self> {
        let client = Client::builder().build()?;
        Ok(Self::with_client(client, config))
    }

    pub fn with_client(client: Client, config: &PlayerConfig) -> Self {
        Self {
            client,
            timeout: Duration::from_millis(config.manifest_timeout_ms),
            proxy_prefix: config.proxy_prefix.clone(),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// URL actually requested, routed through the proxy for absolute URLs
    pub fn request_url(&self, url: &str) -> String {
        match &self.proxy_prefix {
            Some(prefix) if url.starts_with("http") => {
                let encoded: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
                format!("{}/{}", prefix.trim_end_matches('/'), encoded)
            }
            _ => url.to_string(),
        }
    }

    /// Fetch the manifest body as text, whatever its declared content type
    #[instrument(skip(self, cancel))]
    pub async fn fetch_text(
        &self,
        url: &str,
        format: ManifestFormat,
        cancel: &CancellationToken,
    ) -> Result<String> {
        let target = self.request_url(url);
        debug!(target = %target, "Fetching manifest");

        let accept = match format {
            ManifestFormat::Hls => HLS_ACCEPT,
            ManifestFormat::Dash => DASH_ACCEPT,
        };

        let request = async {
            let target = url::Url::parse(&target)?;
            let response = self
                .client
                .get(target)
                .header(ACCEPT, accept)
                .send()
                .await
                .map_err(|e| Error::ManifestFetch(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                return Err(Error::ManifestStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            response.text().await.map_err(|e| Error::ManifestFetch(e.to_string()))
        };

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = tokio::time::timeout(self.timeout, request) => match result {
                Ok(result) => result,
                Err(_) => Err(Error::ManifestTimeout {
                    url: url.to_string(),
                    timeout_ms: self.timeout.as_millis() as u64,
                }),
            },
        }
    }

    /// Fetch and parse; every failure becomes an empty timeline
    #[instrument(skip(self, cancel))]
    pub async fn fetch_timeline(
        &self,
        url: &str,
        format: ManifestFormat,
        cancel: &CancellationToken,
    ) -> SegmentTimeline {
        match self.fetch_text(url, format, cancel).await {
            Ok(content) => {
                let timeline = parse(&content, format);
                if timeline.is_empty() {
                    warn!(
                        code = Error::ManifestMalformed.error_code(),
                        "Segment visualization unavailable: no segments in manifest"
                    );
                }
                timeline
            }
            Err(Error::Cancelled) => {
                debug!("Manifest fetch cancelled");
                SegmentTimeline::empty()
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Segment visualization unavailable");
                SegmentTimeline::empty()
            }
        }
    }
}
