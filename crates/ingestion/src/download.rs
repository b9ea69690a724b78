//! HTTP access to the upstream services.
//!
//! Pipelines fetch through the [`Fetch`] trait so they can be driven by
//! canned responses. Large archives are streamed to a temporary file with
//! [`HttpClient::download`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, Response, StatusCode};
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, instrument};

use crate::error::{IngestionError, Result};

/// Request a remote resource as text or probe for its existence.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// GET `url` as text. Non-success responses are [`IngestionError::Http`].
    async fn get_text(&self, url: &str) -> Result<String>;

    /// HEAD `url`. `Ok(false)` on 404.
    async fn exists(&self, url: &str) -> Result<bool>;
}

/// HTTP client settings.
#[derive(Debug, Clone)]
pub struct HttpOptions {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            user_agent: format!("weather-ingest/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// reqwest-backed client.
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl HttpClient {
    pub fn new(options: &HttpOptions) -> Result<Self> {
        let client = Client::builder()
            .timeout(options.timeout)
            .connect_timeout(Duration::from_secs(30))
            .user_agent(options.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }

    /// Stream `url` into a new temporary file.
    ///
    /// The file is removed when the returned handle is dropped.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn download(&self, url: &str, prefix: &str, suffix: &str) -> Result<NamedTempFile> {
        let temporary = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .tempfile()?;
        info!(path = %temporary.path().display(), "Downloading");

        let response = check_status(url, self.client.get(url).send().await?)?;
        let mut file = tokio::fs::File::from_std(temporary.as_file().try_clone()?);
        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;

        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            file.write_all(&chunk).await?;
            downloaded += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;

        info!(bytes = downloaded, "Download completed");
        Ok(temporary)
    }

    /// Fetch a JSON list of station ids from a roster service.
    #[instrument(skip(self, api_key), fields(url = %url))]
    pub async fn roster(&self, url: &str, api_key: &str) -> Result<Vec<String>> {
        let response = self
            .client
            .get(url)
            .header("X-API-Key", api_key)
            .send()
            .await?;
        let ids: Vec<String> = check_status(url, response)?.json().await?;

        info!(stations = ids.len(), "Fetched station roster");
        Ok(ids)
    }
}

#[async_trait]
impl Fetch for HttpClient {
    async fn get_text(&self, url: &str) -> Result<String> {
        debug!(url = %url, "GET");
        let response = check_status(url, self.client.get(url).send().await?)?;
        Ok(response.text().await?)
    }

    async fn exists(&self, url: &str) -> Result<bool> {
        debug!(url = %url, "HEAD");
        let response = self.client.head(url).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(false);
        }
        check_status(url, response)?;
        Ok(true)
    }
}

fn check_status(url: &str, response: Response) -> Result<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(IngestionError::Http {
            url: url.to_string(),
            status: response.status().as_u16(),
        })
    }
}

/// Serves fixed bodies by URL; anything else is a 404.
#[derive(Debug, Clone, Default)]
pub struct StaticSource {
    bodies: HashMap<String, String>,
}

impl StaticSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: impl Into<String>, body: impl Into<String>) -> Self {
        self.insert(url, body);
        self
    }

    pub fn insert(&mut self, url: impl Into<String>, body: impl Into<String>) {
        self.bodies.insert(url.into(), body.into());
    }
}

#[async_trait]
impl Fetch for StaticSource {
    async fn get_text(&self, url: &str) -> Result<String> {
        self.bodies.get(url).cloned().ok_or_else(|| IngestionError::Http {
            url: url.to_string(),
            status: 404,
        })
    }

    async fn exists(&self, url: &str) -> Result<bool> {
        Ok(self.bodies.contains_key(url))
    }
}
