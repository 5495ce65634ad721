//! The crawl loop: listing pages in, per-song records out, checkpoint
//! advanced only once every song of a page has been driven through the
//! detail pipeline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indicatif::{ProgressBar, ProgressStyle};
use tokio::time::sleep;
use tracing::warn;

use crate::checkpoint::CheckpointStore;
use crate::config::{listing_url, CrawlConfig};
use crate::error::CrawlError;
use crate::extract::{detail, listing, SongRef};
use crate::fetch::{delay_in, LoadedPage, PageSource};
use crate::sink::{RunLog, Sink};

/// Why the crawl loop ended. Per-song failures never end it; these do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// Every listing strategy came up empty; the next run retries this page.
    ListingExhausted { page: u32 },
    /// The listing page itself would not load.
    ListingFetchFailed { page: u32 },
    /// Cooperative cancellation observed between steps.
    Cancelled { page: u32 },
    /// The `--max-pages` bound was reached.
    PageLimit { pages: u32 },
}

/// Per-run counters.
#[derive(Debug, Default)]
pub struct CrawlReport {
    pub pages: u32,
    pub songs: usize,
    pub saved: usize,
    pub failed: usize,
}

enum ItemLoop {
    Completed,
    Cancelled,
}

pub struct Crawler<S> {
    source: S,
    sink: Sink,
    log: RunLog,
    checkpoint: CheckpointStore,
    config: CrawlConfig,
    cancel: Arc<AtomicBool>,
    pub report: CrawlReport,
}

impl<S: PageSource> Crawler<S> {
    pub fn new(
        source: S,
        sink: Sink,
        log: RunLog,
        checkpoint: CheckpointStore,
        config: CrawlConfig,
        cancel: Arc<AtomicBool>,
    ) -> Self {
        Self {
            source,
            sink,
            log,
            checkpoint,
            config,
            cancel,
            report: CrawlReport::default(),
        }
    }

    /// Drive the pagination loop until a stop condition. `start` overrides
    /// the checkpoint-derived resume page.
    pub async fn run(&mut self, start: Option<u32>) -> Result<StopReason, CrawlError> {
        let start = start.unwrap_or_else(|| self.checkpoint.resume_page());
        self.log.append(&format!("crawl started at page {start}"));
        let mut page_no = start;
        loop {
            if self.cancelled() {
                return Ok(self.stop_cancelled(page_no));
            }
            if let Some(max) = self.config.max_pages {
                if page_no - start >= max {
                    self.log.append(&format!("page limit of {max} reached"));
                    return Ok(StopReason::PageLimit { pages: max });
                }
            }

            let url = listing_url(&self.config.base_url, page_no);
            self.log.append(&format!("processing page {page_no}"));
            let page = match self.source.fetch(&url).await {
                Ok(page) => page,
                Err(err) => {
                    self.log
                        .append(&format!("failed to load listing page {page_no}: {err}"));
                    return Ok(StopReason::ListingFetchFailed { page: page_no });
                }
            };

            let songs = listing::extract_songs(&page);
            if songs.is_empty() {
                self.dump_page_source(page_no, &page);
                self.log.append(&format!(
                    "no songs found on page {page_no}, stopping; the next run retries it"
                ));
                return Ok(StopReason::ListingExhausted { page: page_no });
            }

            let saved_before = self.report.saved;
            let outcome = self.process_songs(&songs).await;
            if matches!(outcome, ItemLoop::Cancelled) {
                return Ok(self.stop_cancelled(page_no));
            }
            self.report.pages += 1;
            self.log.append(&format!(
                "page {page_no}: saved {}/{} songs",
                self.report.saved - saved_before,
                songs.len()
            ));

            self.checkpoint
                .advance(page_no)
                .map_err(|source| CrawlError::Checkpoint { page: page_no, source })?;

            sleep(delay_in(&self.config.page_delay_ms)).await;
            page_no += 1;
        }
    }

    /// Seed-list mode: the per-song pipeline without pagination or the
    /// checkpoint.
    pub async fn run_seeds(&mut self, songs: &[SongRef]) {
        self.log
            .append(&format!("processing {} seeded songs", songs.len()));
        self.process_songs(songs).await;
    }

    async fn process_songs(&mut self, songs: &[SongRef]) -> ItemLoop {
        let bar = ProgressBar::new(songs.len() as u64);
        bar.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40} {pos}/{len} ({per_sec}, eta {eta})")
                .unwrap()
                .progress_chars("=> "),
        );
        for song in songs {
            if self.cancelled() {
                bar.finish_and_clear();
                return ItemLoop::Cancelled;
            }
            self.report.songs += 1;
            if let Err(err) = self.sink.record_reference(&song.artist, &song.title) {
                self.log.append(&format!(
                    "reference write failed for {} - {}: {err}",
                    song.artist, song.title
                ));
            }
            sleep(delay_in(&self.config.item_delay_ms)).await;
            self.process_item(song).await;
            bar.inc(1);
        }
        bar.finish_and_clear();
        ItemLoop::Completed
    }

    /// Fetch one detail page, extract, persist. Failures here are logged
    /// and skipped, never fatal.
    async fn process_item(&mut self, song: &SongRef) {
        let page = match self.source.fetch(&song.detail_url).await {
            Ok(page) => page,
            Err(err) => {
                self.report.failed += 1;
                self.log.append(&format!(
                    "failed to load song page for {} - {}: {err}",
                    song.artist, song.title
                ));
                return;
            }
        };

        let content = detail::extract_content(&page, &song.artist, &song.title);
        let Some(strategy) = content.strategy.filter(|_| content.succeeded) else {
            self.report.failed += 1;
            self.log.append(&format!(
                "no chords or lyrics found for {} - {} at {}",
                song.artist, song.title, song.detail_url
            ));
            return;
        };

        match self
            .sink
            .record_content(&song.artist, &song.title, &content.raw_text)
        {
            Ok(path) => {
                self.report.saved += 1;
                self.log.append(&format!(
                    "saved chords and lyrics ({}): {}",
                    strategy.name(),
                    path.display()
                ));
            }
            Err(err) => {
                self.report.failed += 1;
                self.log.append(&format!(
                    "record write failed for {} - {}: {err}",
                    song.artist, song.title
                ));
            }
        }
    }

    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Relaxed)
    }

    fn stop_cancelled(&self, page: u32) -> StopReason {
        self.log
            .append(&format!("crawl cancelled while on page {page}"));
        StopReason::Cancelled { page }
    }

    /// Keep the raw page around when no strategy matched; the markup has
    /// probably shifted again and someone will want to look at it.
    fn dump_page_source(&self, page_no: u32, page: &LoadedPage) {
        let path = self.sink.page_dump_path(page_no);
        match std::fs::write(&path, &page.body) {
            Ok(()) => self
                .log
                .append(&format!("saved page source for inspection: {}", path.display())),
            Err(err) => warn!("page dump failed: {err}"),
        }
    }
}

// ── Tests ──
