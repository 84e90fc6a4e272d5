/*============================================================
  Synavera Project: Syn-Syu
  Module: synsyu_aur::aur
  Etiquette: Synavera Script Etiquette — Rust Profile v1.1.1
  ------------------------------------------------------------
  Purpose:
    Query the Arch User Repository RPC API for metadata of
    foreign packages.

  Security / Safety Notes:
    Performs read-only HTTPS requests to the public AUR API.
    No credentials are transmitted.

  Dependencies:
    reqwest for HTTP, serde for response parsing, async-trait
    for the metadata source contract.

  Operational Scope:
    Supplies remote versions for packages absent from the
    sync repositories. Batching is left to the caller.

  Revision History:
    2024-11-04 COD  Implemented asynchronous AUR client.
    2026-10-16 COD  Exposed metadata source trait; one request per call.
  ------------------------------------------------------------
  SSE Principles Observed:
    - Retry with exponential backoff on non-success status
    - Structured response parsing with explicit error paths
    - Configurable timeouts and throttling
============================================================*/

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tokio::time::sleep;
use urlencoding::encode;

use crate::config::AurConfig;
use crate::error::{Result, SynsyuError};
use crate::package_info::ForeignRecord;

/// Source of foreign package metadata.
#[async_trait]
pub trait ForeignMetadata: Send + Sync {
    /// Look up `names` in a single request. Records come back in the
    /// server's order, which may omit unknown names.
    async fn info(&self, names: &[String]) -> Result<Vec<ForeignRecord>>;
}

/// Client for interacting with the AUR RPC API.
#[derive(Clone)]
pub struct AurClient {
    client: reqwest::Client,
    base_url: String,
    max_retries: usize,
    max_kib_per_sec: u64,
}

impl AurClient {
    /// Construct a new client from configuration.
    pub fn new(config: &AurConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .user_agent(concat!("Syn-Syu-AUR/", env!("CARGO_PKG_VERSION"), " (linux)"))
            .build()
            .map_err(|err| SynsyuError::Network(format!("Failed to build HTTP client: {err}")))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_retries: config.max_retries.max(1),
            max_kib_per_sec: config.max_kib_per_sec,
        })
    }

    fn compose_url(&self, packages: &[String]) -> String {
        let mut url = format!("{}?v=5&type=info", self.base_url);
        for pkg in packages {
            url.push_str("&arg[]=");
            url.push_str(&encode(pkg));
        }
        url
    }

    async fn fetch(&self, names: &[String]) -> Result<Vec<ForeignRecord>> {
        let mut attempt = 0;
        let url = self.compose_url(names);
        loop {
            let response = self.client.get(&url).send().await.map_err(|err| {
                SynsyuError::Network(format!("AUR request to {url} failed: {err}"))
            })?;
            let content_len = response.content_length();

            if response.status() == StatusCode::OK {
                let payload = response.json::<AurResponse>().await.map_err(|err| {
                    SynsyuError::Serialization(format!("Failed to decode AUR response: {err}"))
                })?;

                if let Some(error) = payload.error {
                    return Err(SynsyuError::Network(format!(
                        "AUR responded with error for {url}: {error}"
                    )));
                }

                self.enforce_rate_limit(content_len).await;

                return Ok(payload
                    .results
                    .into_iter()
                    .map(|entry| ForeignRecord {
                        package_base: entry.package_base.unwrap_or_else(|| entry.name.clone()),
                        name: entry.name,
                        version: entry.version,
                        last_modified: entry.last_modified.unwrap_or(0),
                    })
                    .collect());
            }

            attempt += 1;
            if attempt >= self.max_retries {
                return Err(SynsyuError::Network(format!(
                    "AUR request {url} failed with status {} after {attempt} attempt(s)",
                    response.status()
                )));
            }
            let exponent = (attempt as u32).min(8);
            let backoff = Duration::from_millis(200_u64.saturating_mul(1_u64 << exponent));
            sleep(backoff).await;
        }
    }

    async fn enforce_rate_limit(&self, content_length: Option<u64>) {
        if let Some(delay) = content_length.and_then(|bytes| throttle_delay(bytes, self.max_kib_per_sec)) {
            sleep(delay).await;
        }
    }
}

#[async_trait]
impl ForeignMetadata for AurClient {
    async fn info(&self, names: &[String]) -> Result<Vec<ForeignRecord>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        self.fetch(names).await
    }
}

#[derive(Debug, Deserialize)]
struct AurResponse {
    #[serde(default)]
    results: Vec<AurEntry>,
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AurEntry {
    #[serde(rename = "Name")]
    name: String,
    #[serde(rename = "PackageBase")]
    package_base: Option<String>,
    #[serde(rename = "Version")]
    version: String,
    #[serde(rename = "LastModified")]
    last_modified: Option<i64>,
}

fn throttle_delay(bytes: u64, kib_per_sec: u64) -> Option<Duration> {
    let denominator = kib_per_sec.saturating_mul(1024);
    if denominator == 0 {
        return None;
    }
    // Ceil division to avoid exceeding the requested rate.
    let millis = bytes.saturating_mul(1000).saturating_add(denominator - 1) / denominator;
    if millis == 0 {
        None
    } else {
        Some(Duration::from_millis(millis))
    }
}
