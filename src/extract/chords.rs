//! Chord-token grammar and the chord-line classifier.

use std::sync::LazyLock;

use regex::Regex;

/// Guitar chord name: root A–G, optional accidental, optional minor marker,
/// optional quality, optional numeral, optional slash bass. Deliberately
/// loose; the two-token rule below does the real filtering.
static CHORD_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-G][#b]?m?(?:maj|min|aug|dim|sus|add)?[0-9]?(?:/[A-G][#b]?)?").unwrap()
});

/// Lines kept before the anchoring chord line by the heuristic window.
pub const WINDOW_BEFORE: usize = 20;
/// Lines kept after it. One section's chords plus lyrics fit comfortably.
pub const WINDOW_AFTER: usize = 100;

/// Non-overlapping chord-token matches in one line.
pub fn chord_token_count(line: &str) -> usize {
    CHORD_RE.find_iter(line).count()
}

/// A chord line carries at least two non-overlapping chord tokens.
pub fn is_chord_line(line: &str) -> bool {
    chord_token_count(line) >= 2
}

pub fn has_chord_token(text: &str) -> bool {
    CHORD_RE.is_match(text)
}

/// Window of lines assumed to bracket one section's chords and lyrics:
/// `[i - WINDOW_BEFORE, i + WINDOW_AFTER)` clipped to the text, where `i`
/// indexes the first chord line. `None` when no line classifies as chords.
pub fn window_around_first_chord_line(full_text: &str) -> Option<String> {
    let lines: Vec<&str> = full_text.lines().collect();
    let anchor = lines.iter().position(|line| is_chord_line(line))?;
    let start = anchor.saturating_sub(WINDOW_BEFORE);
    let end = (anchor + WINDOW_AFTER).min(lines.len());
    Some(lines[start..end].join("\n"))
}

// ── Tests ──

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classic_progressions_are_chord_lines() {
        assert!(is_chord_line("C  G  Am"));
        assert!(is_chord_line("Em G C"));
        assert!(is_chord_line("    Am   F   C   G"));
        assert!(is_chord_line("Cmaj7 G/B Am7"));
        assert!(is_chord_line("F#m D A E"));
    }

    #[test]
    fn lyrics_are_not_chord_lines() {
        assert!(!is_chord_line("Today is gonna be the day"));
        assert!(!is_chord_line("that they're gonna throw it back to you"));
        assert!(!is_chord_line("la la la la"));
        assert!(!is_chord_line(""));
    }

    #[test]
    fn single_token_is_not_enough() {
        // One chord alone, or a lyric line with one stray capital.
        assert!(!is_chord_line("C"));
        assert!(!is_chord_line("Darling hold my hand"));
        assert!(!is_chord_line("Baby one more time"));
        assert_eq!(chord_token_count("C"), 1);
        assert_eq!(chord_token_count("C G"), 2);
    }

    #[test]
    fn token_detection_in_blocks() {
        assert!(has_chord_token("verse:\nEm G\nwords"));
        assert!(!has_chord_token("plain words only"));
    }

    #[test]
    fn window_is_clipped_at_the_start() {
        // Anchor at line 5: window starts at 0, not -15.
        let mut lines: Vec<String> = (0..5).map(|i| format!("intro {i}")).collect();
        lines.push("C  G  Am".to_string());
        for i in 0..150 {
            lines.push(format!("word {i}"));
        }
        let text = lines.join("\n");
        let window = window_around_first_chord_line(&text).unwrap();
        let window_lines: Vec<&str> = window.lines().collect();
        assert_eq!(window_lines[0], "intro 0");
        // [0, 5 + 100) → 105 lines; the anchor plus 99 words follow the intro.
        assert_eq!(window_lines.len(), 105);
        assert_eq!(*window_lines.last().unwrap(), "word 98");
    }

    #[test]
    fn window_is_clipped_at_the_end() {
        // Anchor at line 30 of 40: [10, 40).
        let mut lines: Vec<String> = (0..30).map(|i| format!("intro {i}")).collect();
        lines.push("Em  Am".to_string());
        for i in 0..9 {
            lines.push(format!("word {i}"));
        }
        let text = lines.join("\n");
        let window = window_around_first_chord_line(&text).unwrap();
        let window_lines: Vec<&str> = window.lines().collect();
        assert_eq!(window_lines[0], "intro 10");
        assert_eq!(window_lines.len(), 30);
        assert_eq!(*window_lines.last().unwrap(), "word 8");
    }

    #[test]
    fn window_anchors_on_the_first_chord_line_only() {
        let text = "lyric opening\nC G Am\nmiddle words\nD A E\nclosing";
        let window = window_around_first_chord_line(text).unwrap();
        // Small text: the whole thing, anchored at line 1.
        assert_eq!(window, text);
    }

    #[test]
    fn no_chord_line_means_no_window() {
        assert_eq!(window_around_first_chord_line("just\nplain\nwords"), None);
    }
}
