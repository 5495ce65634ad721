use thiserror::Error;

/// A page load that could not be completed.
///
/// `Request` and `Status` describe a single attempt; the fetcher retries
/// those internally and only ever surfaces `RetriesExhausted` to callers.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} failed: {source}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} returned HTTP {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("giving up on {url} after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        url: String,
        attempts: u32,
        last_error: String,
    },
}

/// Errors that abort the crawl outright.
///
/// Per-song failures are logged and skipped; the one thing the crawler must
/// never do is keep going believing the checkpoint advanced when it did not.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("failed to persist checkpoint for page {page}: {source}")]
    Checkpoint {
        page: u32,
        #[source]
        source: std::io::Error,
    },
}
