mod checkpoint;
mod config;
mod crawler;
mod error;
mod extract;
mod fetch;
mod sink;

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use clap::{Parser, Subcommand};

use crate::checkpoint::CheckpointStore;
use crate::config::CrawlConfig;
use crate::crawler::{Crawler, StopReason};
use crate::extract::SongRef;
use crate::fetch::Fetcher;
use crate::sink::{RunLog, Sink};

#[derive(Parser)]
#[command(name = "chord_scraper", about = "Chord/lyric scraper for paginated tab listings")]
struct Cli {
    /// Listing URL the page number is appended to
    #[arg(long, default_value = config::BASE_URL)]
    base_url: String,
    /// Directory for per-song content records
    #[arg(long, default_value = "input")]
    records_dir: PathBuf,
    /// Append-only "artist - title" reference log
    #[arg(long, default_value = "scraped_songs.txt")]
    references_file: PathBuf,
    /// Append-only process log
    #[arg(long, default_value = "scraper_log.txt")]
    log_file: PathBuf,
    /// Checkpoint file holding the last completed page
    #[arg(long, default_value = "last_page.txt")]
    checkpoint_file: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Crawl listing pages from the checkpoint, saving every song's chords
    Crawl {
        /// Start page, overriding the checkpoint
        #[arg(short, long)]
        start: Option<u32>,
        /// Max listing pages this run (default: until the site runs dry)
        #[arg(short = 'n', long)]
        max_pages: Option<u32>,
    },
    /// Scrape one song page
    Song {
        url: String,
        #[arg(long)]
        artist: String,
        #[arg(long)]
        title: String,
    },
    /// Scrape a fixed list of songs from a JSON seed file
    Seeds {
        /// JSON array of { "artist", "title" (or "song"), "url" }
        file: PathBuf,
    },
    /// Show sink and checkpoint counters
    Stats,
}

#[derive(serde::Deserialize)]
struct Seed {
    artist: String,
    #[serde(alias = "song")]
    title: String,
    url: String,
}

impl From<Seed> for SongRef {
    fn from(seed: Seed) -> Self {
        SongRef {
            artist: seed.artist,
            title: seed.title,
            detail_url: seed.url,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let t0 = Instant::now();
    let cli = Cli::parse();
    let config = CrawlConfig {
        base_url: cli.base_url,
        records_dir: cli.records_dir,
        references_file: cli.references_file,
        log_file: cli.log_file,
        checkpoint_file: cli.checkpoint_file,
        ..CrawlConfig::default()
    };

    let result = match cli.command {
        Commands::Crawl { start, max_pages } => {
            let mut crawler = build_crawler(CrawlConfig { max_pages, ..config })?;
            let reason = crawler.run(start).await?;
            print_stop_reason(&reason);
            print_report(&crawler.report);
            Ok(())
        }
        Commands::Song { url, artist, title } => {
            let mut crawler = build_crawler(config)?;
            crawler
                .run_seeds(&[SongRef {
                    artist,
                    title,
                    detail_url: url,
                }])
                .await;
            print_report(&crawler.report);
            Ok(())
        }
        Commands::Seeds { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("failed to read seed file {}", file.display()))?;
            let seeds: Vec<Seed> = serde_json::from_str(&raw)
                .with_context(|| format!("invalid seed file {}", file.display()))?;
            if seeds.is_empty() {
                println!("Seed file is empty, nothing to do.");
                return Ok(());
            }
            let songs: Vec<SongRef> = seeds.into_iter().map(SongRef::from).collect();
            let mut crawler = build_crawler(config)?;
            crawler.run_seeds(&songs).await;
            print_report(&crawler.report);
            Ok(())
        }
        Commands::Stats => {
            let sink = Sink::new(&config.records_dir, &config.references_file)?;
            let stats = sink.stats();
            let checkpoint = CheckpointStore::new(&config.checkpoint_file);
            println!("References: {}", stats.references);
            println!("Records:    {}", stats.records);
            match checkpoint.last_completed() {
                Some(page) => println!("Last page:  {page}"),
                None => println!("Last page:  none (fresh crawl)"),
            }
            Ok(())
        }
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

fn build_crawler(config: CrawlConfig) -> anyhow::Result<Crawler<Fetcher>> {
    let fetcher = Fetcher::new(&config)?;
    let sink = Sink::new(&config.records_dir, &config.references_file)
        .with_context(|| format!("failed to prepare {}", config.records_dir.display()))?;
    let log = RunLog::new(&config.log_file);
    let checkpoint = CheckpointStore::new(&config.checkpoint_file);

    let cancel = Arc::new(AtomicBool::new(false));
    {
        let cancel = Arc::clone(&cancel);
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.store(true, Ordering::Relaxed);
            }
        });
    }

    Ok(Crawler::new(fetcher, sink, log, checkpoint, config, cancel))
}

fn print_stop_reason(reason: &StopReason) {
    match reason {
        StopReason::ListingExhausted { page } => {
            println!("Stopped: no songs found on page {page}. The next run retries it.");
        }
        StopReason::ListingFetchFailed { page } => {
            println!("Stopped: listing page {page} would not load. The next run retries it.");
        }
        StopReason::Cancelled { page } => {
            println!("Interrupted on page {page}; only completed pages are checkpointed.");
        }
        StopReason::PageLimit { pages } => {
            println!("Stopped after {pages} pages (--max-pages).");
        }
    }
}

fn print_report(report: &crawler::CrawlReport) {
    println!(
        "Pages: {} | songs: {} | saved: {} | failed: {}",
        report.pages, report.songs, report.saved, report.failed
    );
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}
