use std::ops::Range;
use std::time::Duration;

use scraper::Html;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::CrawlConfig;
use crate::error::FetchError;

/// Browser user agents; one is picked per fetcher so consecutive runs don't
/// present an identical fingerprint.
const USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.2 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:90.0) Gecko/20100101 Firefox/90.0",
];

/// Retry schedule for page loads: exponential backoff plus uniform jitter.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts before giving up.
    pub max_retries: u32,
    pub base_backoff: Duration,
    pub max_jitter: Duration,
}

impl RetryPolicy {
    /// Delay before retrying after the given zero-based attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_backoff.as_millis() as u64 * 2u64.pow(attempt);
        let jitter = match self.max_jitter.as_millis() as u64 {
            0 => 0,
            cap => fastrand::u64(..cap),
        };
        Duration::from_millis(base + jitter)
    }
}

/// A fetched page. The body is kept raw; extractors parse the element tree
/// on demand, so the non-`Send` document never lives across an await.
#[derive(Debug, Clone)]
pub struct LoadedPage {
    pub url: String,
    pub body: String,
}

impl LoadedPage {
    pub fn document(&self) -> Html {
        Html::parse_document(&self.body)
    }
}

/// Anything that can load a page by URL. The crawler is generic over this so
/// tests feed canned fixtures instead of the network.
pub trait PageSource {
    async fn fetch(&self, url: &str) -> Result<LoadedPage, FetchError>;
}

pub struct Fetcher {
    client: reqwest::Client,
    retry: RetryPolicy,
    settle_ms: Range<u64>,
}

impl Fetcher {
    pub fn new(config: &CrawlConfig) -> anyhow::Result<Self> {
        let agent = USER_AGENTS[fastrand::usize(..USER_AGENTS.len())];
        let client = reqwest::Client::builder()
            .user_agent(agent)
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            client,
            retry: RetryPolicy {
                max_retries: config.max_retries,
                base_backoff: config.base_backoff,
                max_jitter: Duration::from_millis(1_000),
            },
            settle_ms: config.settle_ms.clone(),
        })
    }

    async fn attempt(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await.map_err(|source| {
            FetchError::Request { url: url.to_string(), source }
        })?;
        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { url: url.to_string(), status });
        }
        response.text().await.map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })
    }
}

impl PageSource for Fetcher {
    async fn fetch(&self, url: &str) -> Result<LoadedPage, FetchError> {
        let attempts = self.retry.max_retries.max(1);
        let mut last_error = String::new();
        for attempt in 0..attempts {
            match self.attempt(url).await {
                Ok(body) => {
                    // Required content can arrive after load completion;
                    // settle before anyone reads the page.
                    sleep(delay_in(&self.settle_ms)).await;
                    debug!(url, bytes = body.len(), "page loaded");
                    return Ok(LoadedPage { url: url.to_string(), body });
                }
                Err(err) => {
                    last_error = err.to_string();
                    warn!(
                        "load failed for {} (attempt {}/{}): {}",
                        url,
                        attempt + 1,
                        attempts,
                        last_error
                    );
                    if attempt + 1 < attempts {
                        sleep(self.retry.backoff(attempt)).await;
                    }
                }
            }
        }
        Err(FetchError::RetriesExhausted {
            url: url.to_string(),
            attempts,
            last_error,
        })
    }
}

/// Uniform random delay from a millisecond range. An empty range means no
/// delay, which is what test configs use.
pub(crate) fn delay_in(range: &Range<u64>) -> Duration {
    if range.is_empty() {
        return Duration::ZERO;
    }
    Duration::from_millis(fastrand::u64(range.start..range.end))
}

// ── Tests ──
