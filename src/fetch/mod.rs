// src/fetch/mod.rs

//! Remote fetch layer.
//!
//! The provisioner talks to a [`Fetcher`] instead of an HTTP client directly.
//! Production uses [`HttpFetcher`]; tests can swap in a fake that counts
//! requests or serves canned bytes.
//!
//! - [`http`] contains the `reqwest`-based implementation.

pub mod http;

use std::future::Future;
use std::pin::Pin;

use anyhow::Result;
use futures_util::stream::BoxStream;

pub use http::HttpFetcher;

/// An opened remote resource whose body has not been consumed yet.
pub struct Download {
    /// Length declared by the response body itself, if any.
    pub content_length: Option<u64>,
    /// Length advertised through a fallback response header.
    pub advertised_length: Option<u64>,
    /// Body chunks in arrival order.
    pub body: BoxStream<'static, Result<Vec<u8>>>,
}

impl Download {
    /// Best known total size for progress reporting.
    ///
    /// Prefers the declared content length; falls back to the advertised
    /// header when the primary value is absent or zero. `0` means unknown.
    pub fn total(&self) -> u64 {
        match self.content_length {
            Some(len) if len > 0 => len,
            _ => self.advertised_length.unwrap_or(0),
        }
    }
}

/// Trait abstracting how the artifact is fetched.
pub trait Fetcher: Send + Sync {
    /// Open `url` for streaming. Non-success responses must be reported as
    /// errors here, before any body is consumed.
    fn fetch<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Download>> + Send + 'a>>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    fn download(content_length: Option<u64>, advertised_length: Option<u64>) -> Download {
        Download {
            content_length,
            advertised_length,
            body: Box::pin(stream::empty()),
        }
    }

    #[test]
    fn total_prefers_declared_length() {
        assert_eq!(download(Some(10), Some(20)).total(), 10);
    }

    #[test]
    fn total_falls_back_when_declared_is_zero_or_missing() {
        assert_eq!(download(Some(0), Some(20)).total(), 20);
        assert_eq!(download(None, Some(20)).total(), 20);
        assert_eq!(download(None, None).total(), 0);
    }
}
