//! Listing-page extraction: an ordered fallback chain over the element tree.
//! The first strategy returning anything wins; later ones are never consulted.

use std::collections::HashSet;
use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};
use tracing::debug;
use url::Url;

use super::SongRef;
use crate::fetch::LoadedPage;

static ROW: LazyLock<Selector> = LazyLock::new(|| Selector::parse("table tr").unwrap());
static CELL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("td").unwrap());
static ANCHOR: LazyLock<Selector> = LazyLock::new(|| Selector::parse("a").unwrap());
static ARTIST_ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href*="/artist/"]"#).unwrap());
static DETAIL_ANCHOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"a[href*="/tab"]"#).unwrap());

type Strategy = fn(&Html, &str) -> Vec<SongRef>;

/// Tried in priority order.
const STRATEGIES: &[(&str, Strategy)] = &[
    ("results-table", from_results_table),
    ("paired-anchors", from_paired_anchors),
    ("loose-anchors", from_loose_anchors),
];

/// Song references from a loaded listing page, deduplicated by detail URL.
/// Empty output means every strategy came up dry; the page-level failure
/// policy belongs to the caller.
pub fn extract_songs(page: &LoadedPage) -> Vec<SongRef> {
    let document = page.document();
    for (name, strategy) in STRATEGIES {
        let found = strategy(&document, &page.url);
        if !found.is_empty() {
            debug!(strategy = name, count = found.len(), "listing strategy matched");
            return dedup_by_url(found);
        }
    }
    Vec::new()
}

/// Primary results table: artist link in column 1, song link in column 2.
/// Rows missing either anchor are skipped; header rows have no `<td>` cells.
fn from_results_table(document: &Html, base: &str) -> Vec<SongRef> {
    let mut songs = Vec::new();
    for row in document.select(&ROW) {
        let cells: Vec<ElementRef> = row.select(&CELL).collect();
        if cells.len() < 2 {
            continue;
        }
        let Some(artist_link) = cells[0].select(&ANCHOR).next() else {
            continue;
        };
        let Some(song_link) = cells[1].select(&ANCHOR).next() else {
            continue;
        };
        let Some(href) = song_link.value().attr("href") else {
            continue;
        };
        let artist = text_of(artist_link);
        let title = text_of(song_link);
        if artist.is_empty() || title.is_empty() {
            continue;
        }
        songs.push(SongRef {
            artist,
            title,
            detail_url: absolute(base, href),
        });
    }
    songs
}

/// Artist-path anchors paired positionally with detail-path anchors. Only
/// trustworthy when the two sets line up one-to-one, so equal non-zero
/// counts are required.
fn from_paired_anchors(document: &Html, base: &str) -> Vec<SongRef> {
    let artists: Vec<ElementRef> = document.select(&ARTIST_ANCHOR).collect();
    let details: Vec<ElementRef> = document.select(&DETAIL_ANCHOR).collect();
    if artists.is_empty() || artists.len() != details.len() {
        return Vec::new();
    }
    artists
        .iter()
        .zip(&details)
        .filter_map(|(artist_link, song_link)| {
            let href = song_link.value().attr("href")?;
            let artist = text_of(*artist_link);
            let title = text_of(*song_link);
            if artist.is_empty() || title.is_empty() {
                return None;
            }
            Some(SongRef {
                artist,
                title,
                detail_url: absolute(base, href),
            })
        })
        .collect()
}

/// Maximally permissive pass: every detail anchor counts, with the artist
/// resolved from the nearest enclosing row, or "Unknown".
fn from_loose_anchors(document: &Html, base: &str) -> Vec<SongRef> {
    document
        .select(&DETAIL_ANCHOR)
        .filter_map(|song_link| {
            let href = song_link.value().attr("href")?;
            let title = text_of(song_link);
            if title.is_empty() {
                return None;
            }
            let artist = artist_near(song_link).unwrap_or_else(|| "Unknown".to_string());
            Some(SongRef {
                artist,
                title,
                detail_url: absolute(base, href),
            })
        })
        .collect()
}

/// Artist anchor adjacent to a song link: the direct parent first, then the
/// nearest row-like ancestor.
fn artist_near(song_link: ElementRef) -> Option<String> {
    let parent = song_link.parent().and_then(ElementRef::wrap);
    let row = song_link
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| matches!(el.value().name(), "tr" | "li"));
    for scope in [parent, row].into_iter().flatten() {
        if let Some(artist_link) = scope.select(&ARTIST_ANCHOR).next() {
            let artist = text_of(artist_link);
            if !artist.is_empty() {
                return Some(artist);
            }
        }
    }
    None
}

fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn absolute(base: &str, href: &str) -> String {
    if href.starts_with("http") {
        return href.to_string();
    }
    Url::parse(base)
        .and_then(|base| base.join(href))
        .map(|url| url.to_string())
        .unwrap_or_else(|_| href.to_string())
}

/// First occurrence wins; order is otherwise preserved.
fn dedup_by_url(songs: Vec<SongRef>) -> Vec<SongRef> {
    let mut seen = HashSet::new();
    songs
        .into_iter()
        .filter(|song| seen.insert(song.detail_url.clone()))
        .collect()
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    fn page(fixture: &str) -> LoadedPage {
        let body =
            std::fs::read_to_string(format!("tests/fixtures/{fixture}.html")).unwrap();
        LoadedPage {
            url: "https://www.ultimate-guitar.com/explore?difficulty[]=2&page=1".to_string(),
            body,
        }
    }

    #[test]
    fn well_formed_table_uses_the_table_strategy() {
        let songs = extract_songs(&page("listing_table"));
        assert_eq!(songs.len(), 10);
        assert_eq!(songs[0].artist, "Oasis");
        assert_eq!(songs[0].title, "Wonderwall");
        assert_eq!(
            songs[0].detail_url,
            "https://tabs.ultimate-guitar.com/tab/oasis/wonderwall-chords-27596"
        );
        // Table order preserved.
        assert_eq!(songs[9].artist, "John Legend");
        assert_eq!(songs[9].title, "All Of Me");
    }

    #[test]
    fn table_rows_missing_an_anchor_are_skipped() {
        let songs = extract_songs(&page("listing_table"));
        assert!(songs.iter().all(|s| s.artist != "No Song Link"));
    }

    #[test]
    fn anchor_pairing_kicks_in_without_a_table() {
        let songs = extract_songs(&page("listing_anchors"));
        assert_eq!(songs.len(), 8);
        // Positional pairing: artist i goes with song i.
        assert_eq!(songs[0].artist, "Radiohead");
        assert_eq!(songs[0].title, "Creep");
        assert_eq!(songs[7].artist, "Dolly Parton");
        assert_eq!(songs[7].title, "Jolene");
        // Nothing from the loose pass leaks in.
        assert!(songs.iter().all(|s| s.artist != "Unknown"));
    }

    #[test]
    fn loose_pass_resolves_artists_per_row_or_defaults() {
        let songs = extract_songs(&page("listing_loose"));
        assert_eq!(songs.len(), 3);
        assert_eq!(songs[0].artist, "Nirvana");
        assert_eq!(songs[0].title, "Come As You Are");
        assert_eq!(songs[1].artist, "Unknown");
        assert_eq!(songs[1].title, "Mystery Song");
        assert_eq!(songs[2].artist, "Eagles");
        assert_eq!(songs[2].title, "Hotel California");
    }

    #[test]
    fn duplicate_detail_urls_collapse() {
        let songs = extract_songs(&page("listing_duplicates"));
        assert_eq!(songs.len(), 1);
        assert_eq!(songs[0].title, "Creep");
    }

    #[test]
    fn relative_hrefs_resolve_against_the_page_url() {
        let songs = extract_songs(&page("listing_relative"));
        assert_eq!(songs.len(), 1);
        assert_eq!(
            songs[0].detail_url,
            "https://www.ultimate-guitar.com/tab/radiohead/creep-chords-1086983"
        );
    }

    #[test]
    fn empty_page_yields_no_songs() {
        assert!(extract_songs(&page("listing_empty")).is_empty());
    }
}
