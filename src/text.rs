//! Text preparation for synthesis.
//!
//! Synthesis input often arrives as chat or markdown output; the cleaner
//! strips markup down to speakable text. A small heuristic guesses the
//! language when the caller does not provide one, and `text_stats` summarizes
//! what is about to be spoken for the synthesis metadata sidecar.

use serde::{Deserialize, Serialize};

/// Prepares raw text for a synthesis engine.
///
/// Contract: idempotent on already-clean text, and never produces output
/// longer than its input.
pub trait TextCleaner: Send + Sync {
    fn clean(&self, text: &str) -> String;
}

/// Default cleaner: drops fenced code blocks, bracketed asides, bare URLs
/// and markup punctuation, then collapses whitespace.
#[derive(Debug, Default, Clone)]
pub struct MarkupCleaner;

/// Characters that carry markup rather than speech.
const MARKUP_CHARS: &[char] = &['*', '_', '`', '#', '~', '>', '|'];

impl TextCleaner for MarkupCleaner {
    fn clean(&self, text: &str) -> String {
        let without_code = strip_fenced_code(text);
        let mut out = String::with_capacity(without_code.len());

        let mut chars = without_code.chars().peekable();
        let mut last_was_space = true;

        while let Some(c) = chars.next() {
            // An aside needs a closing bracket; an unmatched `[` is kept as
            // ordinary text rather than swallowing the rest of the input.
            if c == '[' {
                if let Some(close) = chars.clone().position(|x| x == ']') {
                    for _ in 0..=close {
                        chars.next();
                    }
                    continue;
                }
                out.push(c);
                last_was_space = false;
                continue;
            }

            // URL token: skip until whitespace.
            if (c == 'h' && consume_prefix(&mut chars, &["ttp://", "ttps://"]))
                || (c == 'w' && consume_prefix(&mut chars, &["ww."]))
            {
                for next in chars.by_ref() {
                    if next.is_whitespace() {
                        break;
                    }
                }
                if !last_was_space {
                    out.push(' ');
                    last_was_space = true;
                }
                continue;
            }

            if MARKUP_CHARS.contains(&c) {
                continue;
            }

            if c.is_whitespace() {
                if !last_was_space {
                    out.push(' ');
                    last_was_space = true;
                }
            } else {
                out.push(c);
                last_was_space = false;
            }
        }

        out.trim().to_string()
    }
}

/// True when the iterator continues with one of the given prefixes; consumes
/// the matched prefix on success.
fn consume_prefix(
    chars: &mut std::iter::Peekable<std::str::Chars>,
    prefixes: &[&str],
) -> bool {
    let longest = prefixes.iter().map(|p| p.len()).max().unwrap_or(0);
    let remaining: String = chars.clone().take(longest).collect();
    for prefix in prefixes {
        if remaining.starts_with(prefix) {
            for _ in 0..prefix.chars().count() {
                chars.next();
            }
            return true;
        }
    }
    false
}

/// Remove ``` fenced blocks, including the fences.
fn strip_fenced_code(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_fence = false;
    for line in text.lines() {
        if line.trim_start().starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if !in_fence {
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Summary of a piece of text about to be synthesized.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextStats {
    pub characters: usize,
    pub words: usize,
    pub sentences: usize,
    /// Rough speaking time at 150 words per minute, at least one second.
    pub estimated_duration_secs: u64,
}

/// Compute character/word/sentence counts and an estimated speaking time.
pub fn text_stats(text: &str) -> TextStats {
    let characters = text.chars().count();
    let words = text.split_whitespace().count();
    let sentences = text
        .split(|c: char| matches!(c, '.' | '!' | '?'))
        .filter(|s| !s.trim().is_empty())
        .count();
    let estimated_duration_secs = (((words as f64 / 150.0) * 60.0) as u64).max(1);

    TextStats {
        characters,
        words,
        sentences,
        estimated_duration_secs,
    }
}

/// Languages the service distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Vi,
    En,
    Fr,
    Unknown,
}

impl Language {
    pub fn code(&self) -> &'static str {
        match self {
            Language::Vi => "vi",
            Language::En => "en",
            Language::Fr => "fr",
            Language::Unknown => "unknown",
        }
    }
}

const VI_MARKS: &str = "ăâđêôơưàáảãạằắẳẵặầấẩẫậèéẻẽẹềếểễệìíỉĩịòóỏõọồốổỗộờớởỡợùúủũụừứửữựỳýỷỹỵ";
const FR_MARKS: &str = "éèêëàâîïôûùüçœ";

const VI_STOPWORDS: &[&str] = &["và", "của", "là", "không", "có", "được", "cho", "với"];
const FR_STOPWORDS: &[&str] = &["le", "la", "les", "de", "et", "un", "une", "est", "je", "vous"];
const EN_STOPWORDS: &[&str] = &["the", "and", "is", "of", "to", "in", "that", "it", "you"];

/// Guess the language of a short text from diacritics and stop words.
pub fn detect_language(text: &str) -> Language {
    let lower = text.to_lowercase();

    let vi_marks = lower.chars().filter(|c| VI_MARKS.contains(*c)).count();
    if vi_marks >= 2 {
        return Language::Vi;
    }

    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric() && !FR_MARKS.contains(c) && !VI_MARKS.contains(c))
        .filter(|w| !w.is_empty())
        .collect();

    let count = |stopwords: &[&str]| words.iter().filter(|w| stopwords.contains(*w)).count();
    let vi = count(VI_STOPWORDS);
    let fr = count(FR_STOPWORDS);
    let en = count(EN_STOPWORDS);

    let fr_marks = lower.chars().filter(|c| FR_MARKS.contains(*c)).count();

    if vi > fr && vi > en {
        Language::Vi
    } else if (fr > en && fr > 0) || (fr_marks >= 2 && en == 0) {
        Language::Fr
    } else if en > 0 {
        Language::En
    } else {
        Language::Unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clean(text: &str) -> String {
        MarkupCleaner.clean(text)
    }

    #[test]
    fn test_plain_text_unchanged() {
        assert_eq!(clean("Hello there, how are you?"), "Hello there, how are you?");
    }

    #[test]
    fn test_markup_stripped() {
        assert_eq!(clean("**bold** and _italic_ and `code`"), "bold and italic and code");
        assert_eq!(clean("# Heading\nBody text"), "Heading Body text");
    }

    #[test]
    fn test_bracketed_asides_removed() {
        assert_eq!(clean("Hello [aside noise] world"), "Hello world");
    }

    #[test]
    fn test_unmatched_bracket_kept() {
        assert_eq!(clean("see [this"), "see [this");
        assert_eq!(clean("stray ] bracket"), "stray ] bracket");
        // First pair is an aside, the trailing close bracket is literal.
        assert_eq!(clean("[a [b] c]"), "c]");
    }

    #[test]
    fn test_urls_removed() {
        assert_eq!(clean("See https://example.com/page for details"), "See for details");
        assert_eq!(clean("visit www.example.com today"), "visit today");
    }

    #[test]
    fn test_fenced_code_removed() {
        let text = "Before\n```rust\nlet x = 1;\n```\nAfter";
        assert_eq!(clean(text), "Before After");
    }

    #[test]
    fn test_whitespace_collapsed() {
        assert_eq!(clean("a   b\t\tc\n\nd"), "a b c d");
    }

    #[test]
    fn test_idempotent_and_never_longer() {
        let inputs = [
            "**Hello** [world] https://x.y z",
            "plain sentence with no markup",
            "  leading and trailing   ",
        ];
        for input in inputs {
            let once = clean(input);
            let twice = clean(&once);
            assert_eq!(once, twice, "not idempotent on {:?}", input);
            assert!(once.len() <= input.len(), "grew {:?} -> {:?}", input, once);
        }
    }

    #[test]
    fn test_text_stats_counts() {
        let stats = text_stats("Hello world. How are you today? Fine!");
        assert_eq!(stats.characters, 37);
        assert_eq!(stats.words, 7);
        assert_eq!(stats.sentences, 3);
        // Short text still estimates at least a second of speech.
        assert_eq!(stats.estimated_duration_secs, 1);
    }

    #[test]
    fn test_text_stats_duration_scales_with_words() {
        let text = "word ".repeat(300);
        let stats = text_stats(&text);
        assert_eq!(stats.words, 300);
        // 300 words at 150 wpm is two minutes.
        assert_eq!(stats.estimated_duration_secs, 120);
    }

    #[test]
    fn test_detect_vietnamese() {
        assert_eq!(detect_language("Xin chào, tôi là trợ lý của bạn"), Language::Vi);
    }

    #[test]
    fn test_detect_french() {
        assert_eq!(detect_language("Le chat est sur la table et il dort"), Language::Fr);
    }

    #[test]
    fn test_detect_english() {
        assert_eq!(detect_language("The quick brown fox jumps over the lazy dog"), Language::En);
    }

    #[test]
    fn test_detect_unknown() {
        assert_eq!(detect_language("12345 67890"), Language::Unknown);
    }
}
