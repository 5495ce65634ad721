use std::fs;
use std::io;
use std::path::PathBuf;

use tracing::warn;

use crate::config::DEFAULT_START_PAGE;

/// File-backed record of the last fully completed listing page.
///
/// The file holds a single ASCII integer. A missing or malformed file is
/// treated as "never ran", never as an error. Single-threaded access only;
/// the crawler is the sole writer.
pub struct CheckpointStore {
    path: PathBuf,
}

impl CheckpointStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Last fully completed page, or `None` when the file is absent or
    /// unreadable.
    pub fn last_completed(&self) -> Option<u32> {
        let raw = fs::read_to_string(&self.path).ok()?;
        match raw.trim().parse() {
            Ok(page) => Some(page),
            Err(_) => {
                warn!("ignoring malformed checkpoint in {}", self.path.display());
                None
            }
        }
    }

    /// Page the next crawl should start from: one past the last completed
    /// page, or the default start page on a fresh run.
    pub fn resume_page(&self) -> u32 {
        self.last_completed()
            .map_or(DEFAULT_START_PAGE, |page| page + 1)
    }

    /// Overwrite the checkpoint with a newly completed page.
    pub fn advance(&self, page: u32) -> io::Result<()> {
        fs::write(&self.path, page.to_string())
    }
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> CheckpointStore {
        CheckpointStore::new(dir.path().join("last_page.txt"))
    }

    #[test]
    fn fresh_run_starts_at_page_one() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        assert_eq!(store.last_completed(), None);
        assert_eq!(store.resume_page(), 1);
    }

    #[test]
    fn resumes_one_past_last_completed() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.advance(4).unwrap();
        assert_eq!(store.last_completed(), Some(4));
        assert_eq!(store.resume_page(), 5);
    }

    #[test]
    fn malformed_checkpoint_is_swallowed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_page.txt");
        fs::write(&path, "not a page").unwrap();
        let store = CheckpointStore::new(path);
        assert_eq!(store.last_completed(), None);
        assert_eq!(store.resume_page(), 1);
    }

    #[test]
    fn advance_overwrites_unconditionally() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(&dir);
        store.advance(9).unwrap();
        store.advance(10).unwrap();
        assert_eq!(store.last_completed(), Some(10));
    }

    #[test]
    fn trailing_whitespace_is_tolerated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("last_page.txt");
        fs::write(&path, "12\n").unwrap();
        assert_eq!(CheckpointStore::new(path).last_completed(), Some(12));
    }
}
