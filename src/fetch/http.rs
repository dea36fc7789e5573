// src/fetch/http.rs

use std::future::Future;
use std::pin::Pin;

use anyhow::{anyhow, Context, Result};
use futures_util::StreamExt;
use reqwest::header::HeaderName;
use tracing::debug;

use super::{Download, Fetcher};

/// Default header consulted when the body does not declare its length.
pub const DEFAULT_LENGTH_HEADER: &str = "content-length";

/// `reqwest`-backed fetcher used in production.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    length_header: HeaderName,
}

impl HttpFetcher {
    pub fn new(length_header: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("binvisor/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("building HTTP client")?;
        let length_header = HeaderName::from_bytes(length_header.trim().as_bytes())
            .with_context(|| format!("invalid length header name '{length_header}'"))?;
        Ok(Self {
            client,
            length_header,
        })
    }
}

impl Fetcher for HttpFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Download>> + Send + 'a>> {
        Box::pin(async move {
            let response = self
                .client
                .get(url)
                .send()
                .await
                .with_context(|| format!("GET {url}"))?;

            let status = response.status();
            if !status.is_success() {
                return Err(anyhow!("GET {url} returned {status}"));
            }

            let content_length = response.content_length();
            let advertised_length = response
                .headers()
                .get(&self.length_header)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.trim().parse::<u64>().ok());

            debug!(
                url = %url,
                ?content_length,
                ?advertised_length,
                "remote artifact opened"
            );

            let body = response
                .bytes_stream()
                .map(|chunk| {
                    chunk
                        .map(|bytes| bytes.to_vec())
                        .map_err(|e| anyhow!("response stream error: {e}"))
                })
                .boxed();

            Ok(Download {
                content_length,
                advertised_length,
                body,
            })
        })
    }
}
