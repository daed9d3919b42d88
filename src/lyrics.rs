//! Lyrics templating: shape a transcript into a fixed song structure.
//!
//! The templater is deliberately mechanical. It sentence-splits the
//! transcript, wraps long sentences at [`WRAP_WIDTH`] characters, derives a
//! short motif phrase from the earliest distinctive words, and pours the
//! lines into `[Verse 1] / [Chorus] / [Verse 2] / [Bridge] / [Chorus]`.
//! The bridge appears only when the transcript is long enough to feed it.
//!
//! Same transcript + same style always produce byte-identical output; an
//! unrecognized style renders exactly like `pop`.

use once_cell::sync::Lazy;
use regex::Regex;

/// Styles with a dedicated hook token. Anything else falls back to `pop`.
pub const SUPPORTED_STYLES: [&str; 6] = ["pop", "hiphop", "rock", "ballad", "country", "electronic"];

/// Maximum rendered line width, in characters.
pub const WRAP_WIDTH: usize = 70;

/// Line used when the transcript yields no sentences at all.
const FALLBACK_LINE: &str = "We wander through the echoes, searching for a sign.";

/// Motif used when no distinctive words can be found.
const DEFAULT_MOTIF: &str = "Hold on, let the daylight find our way";

/// Common words that never make the motif.
const STOP_WORDS: [&str; 8] = [
    "this", "that", "with", "have", "from", "your", "their", "about",
];

static RE_SENTENCE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"([.!?])\s+").unwrap());
static RE_WORD: Lazy<Regex> = Lazy::new(|| Regex::new(r"[A-Za-z']+").unwrap());

/// Render a transcript as structured lyrics.
///
/// Pure and deterministic. An empty transcript still renders (from the
/// fallback line); callers that consider emptiness an error validate before
/// calling.
pub fn render_lyrics(transcript: &str, style: &str) -> String {
    let style = canonical_style(style);
    let lines = to_lines(transcript);
    let motif = derive_motif(&lines);

    let verse1 = verse_section(slice(&lines, 0, 8), style, 1);
    let chorus = chorus_section(&motif, style);
    let verse2 = verse_section(slice(&lines, 8, 16), style, 2);
    let bridge = bridge_section(slice(&lines, 16, 22), &motif);

    let mut sections: Vec<String> = Vec::new();
    sections.push(header("Verse 1"));
    sections.extend(verse1);
    sections.push(String::new());
    sections.push(header("Chorus"));
    sections.extend(chorus.iter().cloned());
    sections.push(String::new());
    sections.push(header("Verse 2"));
    sections.extend(verse2);
    if !bridge.is_empty() {
        sections.push(String::new());
        sections.push(header("Bridge"));
        sections.extend(bridge);
    }
    sections.push(String::new());
    sections.push(header("Chorus"));
    sections.extend(chorus);

    sections.join("\n").trim().to_string()
}

/// Map a style label to its canonical supported form.
///
/// Case-insensitive, whitespace-tolerant; unknown labels become `pop`.
pub fn canonical_style(style: &str) -> &'static str {
    let wanted = style.trim().to_lowercase();
    SUPPORTED_STYLES
        .iter()
        .find(|s| **s == wanted)
        .copied()
        .unwrap_or("pop")
}

/// Split the transcript into wrapped lines.
fn to_lines(transcript: &str) -> Vec<String> {
    let flat = transcript.replace('\n', " ");
    // Mark sentence boundaries, then split on the marker. The newline is a
    // safe marker because every original newline was just flattened away.
    let marked = RE_SENTENCE_BREAK.replace_all(&flat, "$1\n");

    let mut lines: Vec<String> = Vec::new();
    for chunk in marked.split('\n') {
        let chunk = chunk.trim();
        if chunk.is_empty() {
            continue;
        }
        if chunk.chars().count() <= WRAP_WIDTH {
            lines.push(chunk.to_string());
        } else {
            lines.extend(wrap_words(chunk, WRAP_WIDTH));
        }
    }

    if lines.is_empty() {
        lines.push(FALLBACK_LINE.to_string());
    }
    lines
}

/// Greedy word wrap. A single word longer than `width` stays on its own
/// line rather than being split.
fn wrap_words(sentence: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut buf: Vec<&str> = Vec::new();
    let mut used = 0usize;
    for word in sentence.split_whitespace() {
        let len = word.chars().count();
        if used + len + 1 > width && !buf.is_empty() {
            lines.push(buf.join(" "));
            buf = vec![word];
            used = len;
        } else {
            buf.push(word);
            used += len + 1;
        }
    }
    if !buf.is_empty() {
        lines.push(buf.join(" "));
    }
    lines
}

/// Build the motif phrase from the earliest distinctive words.
///
/// Scans the first six lines for words longer than three characters that are
/// not stop-words, takes the first five, and title-cases them.
fn derive_motif(lines: &[String]) -> String {
    let mut words: Vec<String> = Vec::new();
    for line in lines.iter().take(6) {
        for token in RE_WORD.find_iter(line) {
            let t = token.as_str().to_lowercase();
            if t.chars().count() > 3 && !STOP_WORDS.contains(&t.as_str()) {
                words.push(t);
            }
        }
    }
    if words.is_empty() {
        return DEFAULT_MOTIF.to_string();
    }
    words
        .iter()
        .take(5)
        .map(|w| capitalize(w))
        .collect::<Vec<_>>()
        .join(" ")
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn verse_section(lines: &[String], style: &str, verse_number: usize) -> Vec<String> {
    if lines.is_empty() {
        return vec![format!(
            "In the {style} rhythm, we tell the tale {verse_number}."
        )];
    }
    lines.iter().take(8).cloned().collect()
}

fn chorus_section(motif: &str, style: &str) -> Vec<String> {
    let hook = style_hook(style);
    vec![
        format!("{hook} {motif}"),
        format!("{hook} We sing it loud, we sing it true"),
        format!("{hook} {motif}"),
        format!("{hook} Let the night turn into blue"),
    ]
}

fn bridge_section(lines: &[String], motif: &str) -> Vec<String> {
    if lines.is_empty() {
        return Vec::new();
    }
    let mut bridge: Vec<String> = lines.iter().take(4).cloned().collect();
    bridge.push(format!("{} fades then rises new", motif.to_lowercase()));
    bridge
}

fn header(title: &str) -> String {
    format!("[{title}]")
}

fn style_hook(style: &str) -> &'static str {
    match style {
        "pop" => "Oh",
        "hiphop" => "Yeah",
        "rock" => "Hey",
        "ballad" => "Ooh",
        "country" => "Whoa",
        "electronic" => "Ah",
        _ => "Oh",
    }
}

fn slice(lines: &[String], start: usize, end: usize) -> &[String] {
    let s = start.min(lines.len());
    let e = end.min(lines.len());
    &lines[s..e]
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSCRIPT: &str = "Today we explore the hidden rivers beneath the city. \
        Engineers mapped them for decades. Some tunnels still carry water to the old mills. \
        Few people ever see them. The maps are kept in the basement archive.";

    #[test]
    fn output_is_deterministic() {
        let a = render_lyrics(TRANSCRIPT, "rock");
        let b = render_lyrics(TRANSCRIPT, "rock");
        assert_eq!(a, b);
    }

    #[test]
    fn unknown_style_renders_like_pop() {
        assert_eq!(
            render_lyrics(TRANSCRIPT, "polka"),
            render_lyrics(TRANSCRIPT, "pop")
        );
        assert_eq!(render_lyrics(TRANSCRIPT, ""), render_lyrics(TRANSCRIPT, "pop"));
    }

    #[test]
    fn canonical_style_is_tolerant() {
        assert_eq!(canonical_style("  HipHop "), "hiphop");
        assert_eq!(canonical_style("ROCK"), "rock");
        assert_eq!(canonical_style("jazz"), "pop");
    }

    #[test]
    fn sections_appear_in_order() {
        let lyrics = render_lyrics(TRANSCRIPT, "pop");
        let v1 = lyrics.find("[Verse 1]").expect("verse 1");
        let c1 = lyrics.find("[Chorus]").expect("chorus");
        let v2 = lyrics.find("[Verse 2]").expect("verse 2");
        let c2 = lyrics.rfind("[Chorus]").expect("closing chorus");
        assert!(v1 < c1 && c1 < v2 && v2 < c2);
        assert_eq!(lyrics.matches("[Chorus]").count(), 2);
    }

    #[test]
    fn short_transcript_has_no_bridge() {
        let lyrics = render_lyrics("One sentence only.", "pop");
        assert!(!lyrics.contains("[Bridge]"));
    }

    #[test]
    fn long_transcript_gets_a_bridge_with_motif_line() {
        let long: String = (0..20)
            .map(|i| format!("Sentence number {i} talks about wandering lights. "))
            .collect();
        let lyrics = render_lyrics(&long, "ballad");
        assert!(lyrics.contains("[Bridge]"));
        assert!(lyrics.contains("fades then rises new"));
    }

    #[test]
    fn chorus_uses_style_hook() {
        let pop = render_lyrics(TRANSCRIPT, "pop");
        assert!(pop.contains("Oh We sing it loud, we sing it true"));
        let hiphop = render_lyrics(TRANSCRIPT, "hiphop");
        assert!(hiphop.contains("Yeah We sing it loud, we sing it true"));
        assert!(hiphop.contains("Yeah Let the night turn into blue"));
    }

    #[test]
    fn motif_skips_stop_words_and_short_words() {
        let lines = vec!["This is that day with your great shining harbor lights".to_string()];
        let motif = derive_motif(&lines);
        assert_eq!(motif, "Great Shining Harbor Lights");
    }

    #[test]
    fn motif_defaults_when_nothing_qualifies() {
        let lines = vec!["a at it to or so".to_string()];
        assert_eq!(derive_motif(&lines), DEFAULT_MOTIF);
    }

    #[test]
    fn empty_transcript_uses_fallback_line() {
        let lyrics = render_lyrics("", "pop");
        assert!(lyrics.contains(FALLBACK_LINE));
    }

    #[test]
    fn long_sentences_wrap_at_width() {
        let sentence = "word ".repeat(40);
        let lyrics = render_lyrics(&sentence, "pop");
        for line in lyrics.lines() {
            if line.starts_with('[') || line.is_empty() {
                continue;
            }
            assert!(
                line.chars().count() <= WRAP_WIDTH,
                "line too long: {line:?}"
            );
        }
    }

    #[test]
    fn wrap_keeps_oversized_word_whole() {
        let huge = "x".repeat(90);
        let wrapped = wrap_words(&format!("{huge} tail"), WRAP_WIDTH);
        assert_eq!(wrapped[0], huge);
        assert_eq!(wrapped[1], "tail");
    }
}
