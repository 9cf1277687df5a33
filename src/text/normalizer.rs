//! Text normalization
//!
//! Per-language punctuation handling applied before and after sentence
//! splitting:
//! - Typographic punctuation folded to ASCII and emphasis markers dropped
//! - `|` and `.` rewritten to the purna viram for danda languages; decimal
//!   points stay and a run of dots becomes a single purna viram
//! - Hindi sentences mapped back to `.` for the synthesis models
//! - Whitespace normalization

use super::language::{uses_purna_viram, DANDA};
use super::numbers::digit_value;

/// Normalize a paragraph before sentence splitting
pub fn normalize_text(text: &str, lang: &str) -> String {
    let mut result = normalize_punctuation(text);

    if uses_purna_viram(lang) {
        result = to_purna_viram(&result);
    }

    normalize_whitespace(&result)
}

fn to_purna_viram(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let is_digit = |c: char| digit_value(c).is_some();
    let mut result = String::with_capacity(text.len());

    for (i, &c) in chars.iter().enumerate() {
        match c {
            '|' => result.push(DANDA),
            '.' => {
                let prev = i.checked_sub(1).map(|p| chars[p]);
                let next = chars.get(i + 1).copied();
                if prev.is_some_and(is_digit) && next.is_some_and(is_digit) {
                    result.push('.');
                } else if prev != Some('.') {
                    result.push(DANDA);
                }
            }
            _ => result.push(c),
        }
    }

    result
}

/// Prepare a single split sentence for the synthesis models
pub fn pre_process_text(text: &str, lang: &str) -> String {
    let mut result = text.to_string();

    // only the Hindi models were trained with '.'
    if lang == "hi" {
        result = result.replace(DANDA, ".");
    }

    if lang == "en" && !result.ends_with('.') {
        result.push_str(". ");
    }

    result
}

/// Normalize punctuation for TTS
fn normalize_punctuation(text: &str) -> String {
    text.replace('\u{201C}', "\"")
        .replace('\u{201D}', "\"")
        .replace('\u{2018}', "'")
        .replace('\u{2019}', "'")
        .replace('\u{2014}', ", ")
        .replace('\u{2013}', ", ")
        .replace('\u{2026}', "...")
        .replace(['*', '_', '~'], "")
}

/// Collapse whitespace runs into single spaces and trim
pub fn normalize_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_was_space = true;

    for c in text.chars() {
        if c.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
                prev_was_space = true;
            }
        } else {
            result.push(c);
            prev_was_space = false;
        }
    }

    if result.ends_with(' ') {
        result.pop();
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_purna_viram_languages() {
        assert_eq!(normalize_text("नमस्ते. कैसे हो|", "hi"), "नमस्ते। कैसे हो।");
        assert_eq!(normalize_text("ভাল.", "bn"), "ভাল।");
    }

    #[test]
    fn test_purna_viram_keeps_decimals() {
        assert_eq!(normalize_text("कीमत 2.5 रुपये है.", "hi"), "कीमत 2.5 रुपये है।");
        assert_eq!(normalize_text("৩.৫ কেজি.", "bn"), "৩.৫ কেজি।");
    }

    #[test]
    fn test_purna_viram_collapses_dot_runs() {
        assert_eq!(normalize_text("रुको\u{2026} फिर...", "hi"), "रुको। फिर।");
        assert_eq!(normalize_text("2.. ठीक", "hi"), "2। ठीक");
    }

    #[test]
    fn test_other_languages_keep_periods() {
        assert_eq!(normalize_text("வணக்கம். நன்றி.", "ta"), "வணக்கம். நன்றி.");
        assert_eq!(normalize_text("Hello.  World", "en"), "Hello. World");
    }

    #[test]
    fn test_typographic_punctuation() {
        assert_eq!(normalize_text("\u{201C}Hi\u{201D} \u{2026}", "en"), "\"Hi\" ...");
        assert_eq!(normalize_text("*bold* and_so~", "en"), "bold andso");
    }

    #[test]
    fn test_pre_process_hindi() {
        assert_eq!(pre_process_text("नमस्ते।", "hi"), "नमस्ते.");
        assert_eq!(pre_process_text("ভাল।", "bn"), "ভাল।");
    }

    #[test]
    fn test_pre_process_english() {
        assert_eq!(pre_process_text("Hello there", "en"), "Hello there. ");
        assert_eq!(pre_process_text("Hello there.", "en"), "Hello there.");
    }

    #[test]
    fn test_whitespace() {
        assert_eq!(normalize_whitespace("  a \n\t b  "), "a b");
        assert_eq!(normalize_whitespace("   "), "");
    }
}
