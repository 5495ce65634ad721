//! Append-only artifact writers: the "artist - title" reference log,
//! per-song content records, and the timestamped process log.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::{info, warn};

/// Characters that cannot appear in a record file name.
const ILLEGAL_FILENAME_CHARS: &[char] = &['\\', '/', '*', '?', ':', '"', '<', '>', '|'];

/// Strip characters that are illegal in file names on common platforms.
pub fn sanitize_filename(name: &str) -> String {
    name.chars()
        .filter(|c| !ILLEGAL_FILENAME_CHARS.contains(c))
        .collect()
}

/// Counters for the `stats` command.
#[derive(Debug, Default)]
pub struct SinkStats {
    pub references: usize,
    pub records: usize,
}

pub struct Sink {
    records_dir: PathBuf,
    references_path: PathBuf,
}

impl Sink {
    pub fn new(records_dir: impl Into<PathBuf>, references_path: impl Into<PathBuf>) -> io::Result<Self> {
        let records_dir = records_dir.into();
        fs::create_dir_all(&records_dir)?;
        Ok(Self {
            records_dir,
            references_path: references_path.into(),
        })
    }

    /// Append one "artist - title" line to the reference log. Never
    /// deduplicated against prior runs; downstream cleanup owns that.
    pub fn record_reference(&self, artist: &str, title: &str) -> io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.references_path)?;
        writeln!(file, "{artist} - {title}")
    }

    /// Write the raw block as this song's record, replacing any previous one.
    pub fn record_content(&self, artist: &str, title: &str, raw_text: &str) -> io::Result<PathBuf> {
        let name = sanitize_filename(&format!("{artist} - {title}.txt"));
        let path = self.records_dir.join(name);
        fs::write(&path, raw_text)?;
        Ok(path)
    }

    /// Where the diagnostic dump of a listing page that produced nothing goes.
    pub fn page_dump_path(&self, page: u32) -> PathBuf {
        self.records_dir.join(format!("page_{page}_source.html"))
    }

    pub fn stats(&self) -> SinkStats {
        let references = fs::read_to_string(&self.references_path)
            .map(|raw| raw.lines().count())
            .unwrap_or(0);
        let records = fs::read_dir(&self.records_dir)
            .map(|entries| {
                entries
                    .flatten()
                    .filter(|entry| {
                        entry.path().extension().is_some_and(|ext| ext == "txt")
                    })
                    .count()
            })
            .unwrap_or(0);
        SinkStats { references, records }
    }
}

/// Append-only process log: one `[timestamp] message` line per event,
/// mirrored to the tracing subscriber. Write failures are reported but
/// never stop a crawl.
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn append(&self, message: &str) {
        info!("{message}");
        let stamp = Local::now().format("%Y-%m-%d %H:%M:%S");
        if let Err(err) = append_line(&self.path, &format!("[{stamp}] {message}\n")) {
            warn!("process log write failed: {err}");
        }
    }
}

fn append_line(path: &Path, line: &str) -> io::Result<()> {
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(line.as_bytes())
}

// ── Tests ──
