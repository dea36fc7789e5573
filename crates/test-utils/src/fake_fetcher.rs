use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use binvisor::fetch::{Download, Fetcher};
use futures_util::stream;

/// A fake fetcher that:
/// - records every URL it was asked for
/// - serves a fixed body (or fails like a 404)
/// - can hold the response back to widen race windows.
#[derive(Clone)]
pub struct FakeFetcher {
    body: Arc<Vec<u8>>,
    fail: bool,
    delay: Duration,
    requested: Arc<Mutex<Vec<String>>>,
    calls: Arc<AtomicUsize>,
}

impl FakeFetcher {
    pub fn serving(body: impl Into<Vec<u8>>) -> Self {
        Self {
            body: Arc::new(body.into()),
            fail: false,
            delay: Duration::ZERO,
            requested: Arc::new(Mutex::new(Vec::new())),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn not_found() -> Self {
        Self {
            fail: true,
            ..Self::serving(Vec::new())
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Fetcher for FakeFetcher {
    fn fetch<'a>(
        &'a self,
        url: &'a str,
    ) -> Pin<Box<dyn Future<Output = anyhow::Result<Download>> + Send + 'a>> {
        Box::pin(async move {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.requested.lock().unwrap().push(url.to_string());

            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(anyhow::anyhow!("GET {url} returned 404 Not Found"));
            }

            let pieces: Vec<anyhow::Result<Vec<u8>>> = self
                .body
                .chunks(1024)
                .map(|c| Ok(c.to_vec()))
                .collect();
            Ok(Download {
                content_length: Some(self.body.len() as u64),
                advertised_length: None,
                body: Box::pin(stream::iter(pieces)),
            })
        })
    }
}
