use async_trait::async_trait;
use reqwest::{Client, Url};
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("http error while fetching {url}: {source}")]
    HttpError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unsupported feed url '{0}'; expected http(s):// or webcal://")]
    UnsupportedUrl(String),
}

/// Where raw calendar feeds come from.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FeedSource: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

pub struct IcsClient {
    client: Client,
}

impl IcsClient {
    pub fn new() -> Self {
        IcsClient {
            client: Client::new(),
        }
    }
}

#[async_trait]
impl FeedSource for IcsClient {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let url = normalize_feed_url(url)?;
        debug!(%url, "fetching feed");

        let http_error = |source| FetchError::HttpError {
            url: url.to_string(),
            source,
        };

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(http_error)?
            .error_for_status()
            .map_err(http_error)?;

        response.text().await.map_err(http_error)
    }
}

/// Accepts http(s) urls as is and rewrites `webcal://` to `https://`.
pub fn normalize_feed_url(raw: &str) -> Result<Url, FetchError> {
    let trimmed = raw.trim();
    let rewritten = match trimmed.strip_prefix("webcal://") {
        Some(rest) => format!("https://{rest}"),
        None => trimmed.to_string(),
    };

    match Url::parse(&rewritten) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url),
        _ => Err(FetchError::UnsupportedUrl(raw.to_string())),
    }
}
