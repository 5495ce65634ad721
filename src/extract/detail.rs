//! Detail-page extraction: known containers first, then a scan of
//! preformatted blocks, then the heuristic text window. First hit wins.

use std::sync::LazyLock;

use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::chords;
use super::text::visible_text;
use super::{DetailStrategy, ExtractedContent};
use crate::fetch::LoadedPage;

/// Known tab/chord containers, most specific first. The site renames these
/// classes routinely, hence substring matches and the long tail.
const CONTENT_SELECTORS: &[&str] = &[
    r#"div[class*="Tablature"] pre"#,
    r#"div[data-content="tab"] pre"#,
    r#"div[class*="Tablature"] code"#,
    r#"pre[class*="chord"]"#,
    r#"div[class*="chord"]"#,
    r#"div[class*="lyrics"]"#,
    r#"div[class*="ugm-tab-content"]"#,
    r#"div[class*="js-tab-content"]"#,
];

static CONTENT: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    CONTENT_SELECTORS
        .iter()
        .map(|selector| Selector::parse(selector).unwrap())
        .collect()
});
static CODE_BLOCKS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("pre, code").unwrap());
static TRANSPOSE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Transpose\s*\+\d+\s*-\d+").unwrap());

/// Page-action affordances that leak into extracted text.
const ACTION_LABELS: &[&str] = &["Print", "Report", "Favorite"];

type Attempt = fn(&Html) -> Option<String>;

const CHAIN: &[(DetailStrategy, Attempt)] = &[
    (DetailStrategy::TabContainer, from_known_containers),
    (DetailStrategy::ChordBlockScan, from_chord_blocks),
    (DetailStrategy::TextWindow, from_text_window),
];

/// Raw chord/lyric text for one song page. Never fails hard: a page where
/// every strategy comes up empty yields `succeeded = false` and the caller
/// decides what to log and skip.
pub fn extract_content(page: &LoadedPage, artist: &str, title: &str) -> ExtractedContent {
    let document = page.document();
    for (strategy, attempt) in CHAIN {
        let Some(raw) = attempt(&document) else {
            continue;
        };
        let cleaned = strip_boilerplate(&raw);
        if cleaned.trim().is_empty() {
            continue;
        }
        debug!(strategy = strategy.name(), chars = cleaned.len(), "detail strategy matched");
        return ExtractedContent {
            artist: artist.to_string(),
            title: title.to_string(),
            raw_text: cleaned,
            source_url: page.url.clone(),
            strategy: Some(*strategy),
            succeeded: true,
        };
    }
    ExtractedContent {
        artist: artist.to_string(),
        title: title.to_string(),
        raw_text: String::new(),
        source_url: page.url.clone(),
        strategy: None,
        succeeded: false,
    }
}

/// First known selector whose first match has non-empty text.
fn from_known_containers(document: &Html) -> Option<String> {
    CONTENT.iter().find_map(|selector| {
        let element = document.select(selector).next()?;
        let text = element_text(element);
        (!text.trim().is_empty()).then_some(text)
    })
}

/// First pre/code block whose text carries at least one chord token.
fn from_chord_blocks(document: &Html) -> Option<String> {
    document
        .select(&CODE_BLOCKS)
        .map(element_text)
        .find(|text| chords::has_chord_token(text))
}

/// Heuristic fallback over the whole visible page text.
fn from_text_window(document: &Html) -> Option<String> {
    chords::window_around_first_chord_line(&visible_text(document))
}

/// Strip transpose controls and page-action labels. Cosmetic only; runs
/// after strategy selection so classification never sees the difference.
fn strip_boilerplate(raw: &str) -> String {
    let mut cleaned = TRANSPOSE_RE.replace_all(raw.trim(), "").into_owned();
    for label in ACTION_LABELS {
        cleaned = cleaned.replace(label, "");
    }
    cleaned
}

fn element_text(element: ElementRef) -> String {
    element.text().collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn page(fixture: &str) -> LoadedPage {
        let body =
            std::fs::read_to_string(format!("tests/fixtures/{fixture}.html")).unwrap();
        LoadedPage {
            url: format!("https://tabs.ultimate-guitar.com/tab/test/{fixture}"),
            body,
        }
    }

    fn extract(fixture: &str) -> ExtractedContent {
        extract_content(&page(fixture), "Oasis", "Wonderwall")
    }

    #[test]
    fn dedicated_container_wins_and_is_verbatim() {
        let content = extract("detail_container");
        assert!(content.succeeded);
        assert_eq!(content.strategy, Some(DetailStrategy::TabContainer));
        // The container's text, untouched apart from trimming; the heuristic
        // never ran, so the decoy lyrics outside the container are absent.
        assert_eq!(
            content.raw_text,
            "[Verse 1]\nEm7        G\nToday is gonna be the day\nDsus4             A7sus4\nThat they're gonna throw it back to you"
        );
        assert!(!content.raw_text.contains("decoy"));
    }

    #[test]
    fn boilerplate_is_stripped_from_container_text() {
        let content = extract("detail_boilerplate");
        assert!(content.succeeded);
        assert_eq!(content.strategy, Some(DetailStrategy::TabContainer));
        assert!(!content.raw_text.contains("Transpose"));
        assert!(!content.raw_text.contains("Print"));
        assert!(!content.raw_text.contains("Report"));
        assert!(!content.raw_text.contains("Favorite"));
        assert!(content.raw_text.contains("Em7        G"));
    }

    #[test]
    fn bare_pre_blocks_are_scanned_for_chord_tokens() {
        let content = extract("detail_pre_scan");
        assert!(content.succeeded);
        assert_eq!(content.strategy, Some(DetailStrategy::ChordBlockScan));
        assert!(content.raw_text.contains("Am F C G"));
        // The chordless legal blurb in the first pre was passed over.
        assert!(!content.raw_text.contains("all rights reserved"));
    }

    #[test]
    fn text_window_brackets_the_first_chord_line() {
        let content = extract("detail_heuristic");
        assert!(content.succeeded);
        assert_eq!(content.strategy, Some(DetailStrategy::TextWindow));
        let lines: Vec<&str> = content.raw_text.lines().collect();
        // The anchor "C  G  Am" is visible line 10, so the window is clipped
        // to the top of the page and runs 100 lines past the anchor.
        assert_eq!(lines[0], "nav item 0");
        assert_eq!(lines[10], "C  G  Am");
        assert_eq!(lines.len(), 110);
        assert_eq!(*lines.last().unwrap(), "verse line 98");
        assert!(!content.raw_text.contains("verse line 99"));
    }

    #[test]
    fn chordless_page_fails_cleanly() {
        let content = extract("detail_none");
        assert!(!content.succeeded);
        assert_eq!(content.strategy, None);
        assert!(content.raw_text.is_empty());
        assert_eq!(content.artist, "Oasis");
        assert_eq!(content.title, "Wonderwall");
        assert!(content.source_url.ends_with("detail_none"));
    }

    #[test]
    fn success_implies_nonempty_trimmed_text() {
        for fixture in [
            "detail_container",
            "detail_boilerplate",
            "detail_pre_scan",
            "detail_heuristic",
        ] {
            let content = extract(fixture);
            assert!(content.succeeded);
            assert!(!content.raw_text.trim().is_empty());
        }
    }
}
