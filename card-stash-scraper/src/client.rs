use std::sync::Arc;

use rand::seq::IndexedRandom;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, REFERER, USER_AGENT};
use tokio::sync::Mutex;
use tokio::time::{Duration, Instant};

use crate::error::ScrapeError;

/// Browser identities rotated across requests.
pub const USER_AGENTS: [&str; 4] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36",
];

const ACCEPT_IMAGES: &str = "image/webp,image/apng,image/*,*/*;q=0.8";
const ACCEPT_LANGUAGES: &str = "en-US,en;q=0.9";

/// Global minimum spacing between requests, shared by every worker.
#[derive(Debug)]
pub struct RequestGate {
    interval: Duration,
    last_request: Mutex<Option<Instant>>,
}

impl RequestGate {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_request: Mutex::new(None),
        }
    }

    /// Wait until at least `interval` has passed since the previous request
    /// that went through this gate.
    pub async fn wait(&self) {
        let mut last = self.last_request.lock().await;
        if let Some(previous) = *last {
            let elapsed = previous.elapsed();
            if elapsed < self.interval {
                tokio::time::sleep(self.interval - elapsed).await;
            }
        }
        *last = Some(Instant::now());
    }
}

/// HTTP client for image downloads with identity rotation and request pacing.
#[derive(Clone)]
pub struct ImageClient {
    http: reqwest::Client,
    gate: Arc<RequestGate>,
    referer: String,
}

impl ImageClient {
    pub fn new(
        timeout: Duration,
        gate: Arc<RequestGate>,
        referer: impl Into<String>,
    ) -> Result<Self, ScrapeError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            gate,
            referer: referer.into(),
        })
    }

    /// Issue a GET once the gate allows it. `referer` overrides the default
    /// referer for this request.
    pub async fn get(
        &self,
        url: &str,
        referer: Option<&str>,
    ) -> Result<reqwest::Response, reqwest::Error> {
        self.gate.wait().await;

        self.http
            .get(url)
            .header(USER_AGENT, pick_user_agent())
            .header(ACCEPT, ACCEPT_IMAGES)
            .header(ACCEPT_LANGUAGE, ACCEPT_LANGUAGES)
            .header(REFERER, referer.unwrap_or(self.referer.as_str()))
            .send()
            .await
    }
}

fn pick_user_agent() -> &'static str {
    USER_AGENTS
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(USER_AGENTS[0])
}
