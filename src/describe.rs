//! Description picking: reduce raw extracted text to one bounded paragraph.
//!
//! Extraction backends hand back whatever the document contains: page
//! headers, tables of contents, body text, sometimes line noise. The picker
//! applies three strategies in order and returns the first hit:
//!
//! 1. A section introduced by a `Description` heading (case-insensitive,
//!    optional trailing `:` or `-`), collected until the next heading-like
//!    line, paragraphs joined with a blank line.
//! 2. The first paragraph of at least [`MIN_PARAGRAPH_LEN`] characters.
//! 3. The first [`RAW_FALLBACK_LEN`] characters of the text, regardless of
//!    quality.
//!
//! Results are capped at [`MAX_DESCRIPTION_LEN`] characters so they fit on a
//! poster. Everything here is pure string work: same input, same output.

use once_cell::sync::Lazy;
use regex::Regex;

/// Upper bound on a picked description, in characters.
pub const MAX_DESCRIPTION_LEN: usize = 1200;

/// A paragraph shorter than this is treated as boilerplate by strategy 2.
pub const MIN_PARAGRAPH_LEN: usize = 40;

/// Length of the strategy-3 last-resort prefix, in characters.
pub const RAW_FALLBACK_LEN: usize = 300;

static RE_SPACE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[ \t]+").unwrap());
static RE_NEWLINE_RUNS: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());
static RE_DESCRIPTION_HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*description\s*[:\-]?\s*$").unwrap());
static RE_TITLE_CASE_LINE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Z][A-Za-z0-9 ]{0,60}$").unwrap());
static RE_PARAGRAPH_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n\s*\n").unwrap());

/// Normalize whitespace in raw extracted text.
///
/// Carriage returns become newlines, runs of spaces and tabs collapse to one
/// space, runs of three or more newlines collapse to two, and the result is
/// trimmed. Applied to every extraction backend's output before acceptance,
/// so "usable" always means usable after normalization.
pub fn normalize_whitespace(raw: &str) -> String {
    let text = raw.replace('\r', "\n");
    let text = RE_SPACE_RUNS.replace_all(&text, " ");
    let text = RE_NEWLINE_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Pick a description from (normalized) extracted text.
///
/// Returns an empty string when the text is empty or whitespace-only; the
/// caller treats that as a validation failure.
pub fn pick_description(text: &str) -> String {
    if text.trim().is_empty() {
        return String::new();
    }

    let lines: Vec<&str> = text.split('\n').map(str::trim).collect();

    // Strategy 1: a 'Description' heading followed by its section. Blank
    // lines inside the section mark paragraph breaks; the section ends at
    // the next heading-like line. A heading whose section turns out empty
    // does not stop the scan.
    for (idx, line) in lines.iter().enumerate() {
        if RE_DESCRIPTION_HEADING.is_match(line) {
            let mut block = Vec::new();
            for later in &lines[idx + 1..] {
                if looks_like_heading(later) {
                    break;
                }
                block.push(*later);
            }
            let candidate = join_paragraphs(&block);
            if !candidate.trim().is_empty() {
                return truncate_chars(candidate.trim(), MAX_DESCRIPTION_LEN)
                    .trim()
                    .to_string();
            }
        }
    }

    // Strategy 2: first paragraph long enough to be body text.
    for paragraph in RE_PARAGRAPH_SPLIT.split(text) {
        let paragraph = paragraph.trim();
        if paragraph.chars().count() >= MIN_PARAGRAPH_LEN {
            return truncate_chars(paragraph, MAX_DESCRIPTION_LEN)
                .trim()
                .to_string();
        }
    }

    // Strategy 3: whatever the document starts with.
    truncate_chars(text, RAW_FALLBACK_LEN).trim().to_string()
}

/// Heuristic for lines that end a description section.
///
/// Short lines, all-uppercase lines up to 60 chars, and Title-Case phrases
/// of up to 8 words are all treated as headings. Empty lines are not: they
/// separate paragraphs within the section.
fn looks_like_heading(line: &str) -> bool {
    if line.is_empty() {
        return false;
    }
    if line.chars().count() <= 4 {
        return true;
    }
    if is_all_uppercase(line) && line.chars().count() <= 60 {
        return true;
    }
    if RE_TITLE_CASE_LINE.is_match(line) && line.split_whitespace().count() <= 8 {
        return true;
    }
    false
}

/// True when the line has at least one cased character and none lowercase.
fn is_all_uppercase(line: &str) -> bool {
    let mut has_cased = false;
    for c in line.chars() {
        if c.is_lowercase() {
            return false;
        }
        if c.is_uppercase() {
            has_cased = true;
        }
    }
    has_cased
}

/// Group consecutive non-empty lines into paragraphs, join lines within a
/// paragraph with a space and paragraphs with a blank line.
fn join_paragraphs(lines: &[&str]) -> String {
    let mut paragraphs: Vec<String> = Vec::new();
    let mut current: Vec<&str> = Vec::new();
    for line in lines {
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(current.join(" "));
                current.clear();
            }
            continue;
        }
        current.push(line);
    }
    if !current.is_empty() {
        paragraphs.push(current.join(" "));
    }
    paragraphs.join("\n\n")
}

/// Truncate to at most `max` characters without splitting a code point.
fn truncate_chars(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_space_and_newline_runs() {
        let raw = "a  \t b\n\n\n\nc\rd";
        assert_eq!(normalize_whitespace(raw), "a b\n\nc\nd");
    }

    #[test]
    fn normalize_of_blank_input_is_empty() {
        assert_eq!(normalize_whitespace(""), "");
        assert_eq!(normalize_whitespace("   \n\t  \n"), "");
    }

    #[test]
    fn empty_text_picks_nothing() {
        assert_eq!(pick_description(""), "");
        assert_eq!(pick_description("  \n  "), "");
    }

    #[test]
    fn description_heading_section_is_joined_with_blank_line() {
        let text = "Title Page\n\nDescription\nFirst paragraph of the product,\nspanning two lines.\n\nSecond paragraph here with more words.\n\nNEXT SECTION HEADING\nIgnored tail.";
        let picked = pick_description(text);
        assert_eq!(
            picked,
            "First paragraph of the product, spanning two lines.\n\nSecond paragraph here with more words."
        );
    }

    #[test]
    fn description_heading_accepts_colon_and_mixed_case() {
        let text = "DESCRIPTION:\nA compact overview of the system under test.\nAnother Heading";
        assert_eq!(
            pick_description(text),
            "A compact overview of the system under test."
        );
    }

    #[test]
    fn empty_description_section_falls_through_to_next_match() {
        // First heading is immediately followed by another heading, so its
        // section is empty; the second occurrence holds the real text.
        let text = "Description\nIntro\nmore context follows in a long paragraph that would otherwise win strategy two easily\n\nDescription:\nThe actual description body lives here.\nSUMMARY";
        assert_eq!(
            pick_description(text),
            "The actual description body lives here."
        );
    }

    #[test]
    fn first_long_paragraph_wins_without_heading() {
        let text = "Short.\n\nTiny line\n\nThis paragraph runs to forty-five characters!\n\nLater text.";
        assert_eq!(
            pick_description(text),
            "This paragraph runs to forty-five characters!"
        );
    }

    #[test]
    fn last_resort_returns_prefix_of_raw_text() {
        let text = "abc\n\ndef\n\nghi";
        assert_eq!(pick_description(text), "abc\n\ndef\n\nghi");
    }

    #[test]
    fn heading_section_is_capped_at_1200_chars() {
        let body = "x".repeat(3000);
        let text = format!("Description\n{body}");
        let picked = pick_description(&text);
        assert_eq!(picked.chars().count(), MAX_DESCRIPTION_LEN);
    }

    #[test]
    fn long_paragraph_is_capped_at_1200_chars() {
        let text = format!("{}\n\ntail", "y".repeat(2000));
        let picked = pick_description(&text);
        assert_eq!(picked.chars().count(), MAX_DESCRIPTION_LEN);
    }

    #[test]
    fn heading_heuristics() {
        assert!(looks_like_heading("Intro"));
        assert!(looks_like_heading("ab"));
        assert!(looks_like_heading("TABLE OF CONTENTS"));
        assert!(looks_like_heading("Product Overview And Scope"));
        assert!(!looks_like_heading(""));
        assert!(!looks_like_heading(
            "This sentence is far too long and wordy to ever pass for a heading of any kind."
        ));
        assert!(!looks_like_heading("lowercase start but quite long"));
        // Nine Title-Case words: one past the heading cutoff.
        assert!(!looks_like_heading("One Two Three Four Five Six Seven Eight Nine"));
    }

    #[test]
    fn all_uppercase_requires_a_cased_character() {
        assert!(is_all_uppercase("ABC 123"));
        assert!(!is_all_uppercase("123 456"));
        assert!(!is_all_uppercase("ABc"));
    }

    #[test]
    fn truncate_respects_char_boundaries() {
        let s = "héllo wörld";
        assert_eq!(truncate_chars(s, 4), "héll");
        assert_eq!(truncate_chars(s, 100), s);
    }
}
