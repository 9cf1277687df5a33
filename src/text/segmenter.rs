//! Sentence segmentation
//!
//! Splits paragraphs into sentences with language-specific rules:
//! - English follows the Moses splitter: a terminal `.`, `?` or `!` ends a
//!   sentence when the next word starts with an uppercase letter or digit,
//!   unless the period belongs to a non-breaking prefix (`Mr.`, `Dr.`, ...)
//!   or an acronym (`U.S.`)
//! - Indic languages break on `.`, `?`, `!`, `।` and `॥` followed by
//!   whitespace, keeping single-letter initials intact

use super::language::{is_indic, DANDA, DOUBLE_DANDA};

/// Prefixes that never end a sentence when followed by a period
const NONBREAKING_PREFIXES: &[&str] = &[
    "Adj", "Adm", "Adv", "Asst", "Bart", "Bldg", "Brig", "Bros", "Capt", "Cmdr", "Col", "Comdr",
    "Con", "Corp", "Cpl", "DR", "Dr", "Drs", "Ens", "Gen", "Gov", "Hon", "Hr", "Hosp", "Insp",
    "Lt", "MM", "MR", "MRS", "MS", "Maj", "Messrs", "Mlle", "Mme", "Mr", "Mrs", "Ms", "Msgr", "Op",
    "Ord", "Pfc", "Ph", "Prof", "Pvt", "Rep", "Reps", "Res", "Rev", "Rt", "Sen", "Sens", "Sfc",
    "Sgt", "Sr", "St", "Supt", "Surg", "Jr", "vs", "i.e", "e.g", "etc", "v", "Mt", "Ft",
];

/// Prefixes that only stay attached when a number follows (`No. 5`)
const NUMERIC_ONLY_PREFIXES: &[&str] = &["No", "Nos", "Art", "Nr", "pp"];

/// Opening punctuation allowed before the first letter of a sentence
const OPENING_PUNCT: &[char] = &['"', '\'', '(', '[', '\u{00BF}', '\u{00A1}', '\u{201C}', '\u{2018}'];

/// Closing punctuation allowed after a sentence terminator
const CLOSING_PUNCT: &[char] = &['"', '\'', ')', ']', '\u{201D}', '\u{2019}'];

/// Indic sentence terminators
const INDIC_TERMINATORS: &[char] = &['.', '?', '!', DANDA, DOUBLE_DANDA];

/// Split a paragraph into sentences for the given language
///
/// Unknown languages are returned as a single sentence. Empty fragments are
/// dropped, so an empty paragraph yields no sentences.
pub fn split_sentences(paragraph: &str, language: &str) -> Vec<String> {
    let paragraph = paragraph.trim();
    if paragraph.is_empty() {
        return Vec::new();
    }

    if language == "en" {
        split_english(paragraph)
    } else if is_indic(language) {
        split_indic(paragraph)
    } else {
        vec![paragraph.to_string()]
    }
}

/// Moses-style splitting on whitespace-separated words
fn split_english(paragraph: &str) -> Vec<String> {
    let words: Vec<&str> = paragraph.split_whitespace().collect();
    let mut sentences = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for (i, word) in words.iter().enumerate() {
        current.push(word);
        let Some(next) = words.get(i + 1) else {
            break;
        };

        if ends_english_sentence(word, next) {
            sentences.push(current.join(" "));
            current.clear();
        }
    }

    if !current.is_empty() {
        sentences.push(current.join(" "));
    }

    sentences
}

fn ends_english_sentence(word: &str, next: &str) -> bool {
    let core = word.trim_end_matches(CLOSING_PUNCT);
    let Some(last) = core.chars().last() else {
        return false;
    };

    let next_start = next.trim_start_matches(OPENING_PUNCT).chars().next();
    let starts_upper = next_start.is_some_and(|c| c.is_uppercase());
    let starts_digit = next_start.is_some_and(|c| c.is_ascii_digit());

    match last {
        '?' | '!' => starts_upper || starts_digit,
        '.' => {
            // a run of dots behaves like '?' and '!'
            if core.ends_with("..") {
                return starts_upper || starts_digit;
            }

            let prefix = core.trim_end_matches('.').trim_start_matches(OPENING_PUNCT);
            if is_acronym(prefix) || NONBREAKING_PREFIXES.contains(&prefix) {
                return false;
            }
            if is_single_initial(prefix) {
                return false;
            }
            if NUMERIC_ONLY_PREFIXES.contains(&prefix) && starts_digit {
                return false;
            }

            starts_upper || starts_digit
        }
        _ => false,
    }
}

/// Dotted acronyms such as `U.S` (the final period already stripped)
fn is_acronym(prefix: &str) -> bool {
    prefix.contains('.')
        && prefix
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_alphabetic()))
}

/// A lone uppercase Latin letter, e.g. the `J` in `J. Smith`
fn is_single_initial(prefix: &str) -> bool {
    let mut chars = prefix.chars();
    matches!((chars.next(), chars.next()), (Some(c), None) if c.is_ascii_uppercase())
}

/// Character-level splitting on Indic terminators
fn split_indic(paragraph: &str) -> Vec<String> {
    let chars: Vec<char> = paragraph.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        current.push(c);

        if INDIC_TERMINATORS.contains(&c) {
            // runs such as "?!" or "।”" stay with the sentence they close
            let mut end = i;
            while end + 1 < chars.len()
                && (INDIC_TERMINATORS.contains(&chars[end + 1]) || CLOSING_PUNCT.contains(&chars[end + 1]))
            {
                end += 1;
            }

            if is_indic_boundary(&chars, i, end) {
                current.extend(&chars[i + 1..=end]);
                push_sentence(&mut sentences, &current);
                current.clear();
                i = end;
            }
        }

        i += 1;
    }

    push_sentence(&mut sentences, &current);
    sentences
}

/// Whether the terminator at `pos`, closing a run that ends at `end`, ends a sentence
fn is_indic_boundary(chars: &[char], pos: usize, end: usize) -> bool {
    // the run has to be followed by whitespace or the end of input
    if chars.get(end + 1).is_some_and(|c| !c.is_whitespace()) {
        return false;
    }

    // single Latin initials such as "A. P. J."
    if chars[pos] == '.' || chars[pos] == DANDA {
        let prev = pos.checked_sub(1).map(|p| chars[p]);
        let before = pos.checked_sub(2).map(|q| chars[q]);
        if prev.is_some_and(|p| p.is_ascii_alphabetic()) && before.map_or(true, |b| !b.is_alphanumeric()) {
            return false;
        }
    }

    true
}

fn push_sentence(sentences: &mut Vec<String>, fragment: &str) {
    let trimmed = fragment.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_english_basic_split() {
        let sentences = split_sentences("Hello world. How are you? I am fine!", "en");
        assert_eq!(sentences, vec!["Hello world.", "How are you?", "I am fine!"]);
    }

    #[test]
    fn test_english_nonbreaking_prefixes() {
        let sentences = split_sentences("Mr. Smith met Dr. Jones. They talked.", "en");
        assert_eq!(sentences, vec!["Mr. Smith met Dr. Jones.", "They talked."]);
    }

    #[test]
    fn test_english_acronyms_and_initials() {
        let sentences = split_sentences("He moved to the U.S. Army base. J. Smith agreed.", "en");
        assert_eq!(sentences, vec!["He moved to the U.S. Army base.", "J. Smith agreed."]);
    }

    #[test]
    fn test_english_lowercase_continuation() {
        let sentences = split_sentences("This is e.g. fine. and continues", "en");
        assert_eq!(sentences, vec!["This is e.g. fine. and continues"]);
    }

    #[test]
    fn test_english_numeric_only_prefix() {
        let sentences = split_sentences("See No. 5 for details. Thanks.", "en");
        assert_eq!(sentences, vec!["See No. 5 for details.", "Thanks."]);
    }

    #[test]
    fn test_english_question_before_number() {
        let sentences = split_sentences("How many? 42 people came! 3 left.", "en");
        assert_eq!(sentences, vec!["How many?", "42 people came!", "3 left."]);
    }

    #[test]
    fn test_hindi_danda_split() {
        let sentences = split_sentences("मेरा नाम राम है। आप कैसे हैं? ठीक हूँ॥", "hi");
        assert_eq!(sentences, vec!["मेरा नाम राम है।", "आप कैसे हैं?", "ठीक हूँ॥"]);
    }

    #[test]
    fn test_indic_keeps_decimals() {
        let sentences = split_sentences("कीमत 2.5 रुपये है। धन्यवाद।", "hi");
        assert_eq!(sentences, vec!["कीमत 2.5 रुपये है।", "धन्यवाद।"]);
    }

    #[test]
    fn test_indic_terminator_needs_whitespace() {
        assert_eq!(split_sentences("क।ख ग", "hi"), vec!["क।ख ग"]);
        let sentences = split_sentences("मूल्य 2।5 है। ठीक", "hi");
        assert_eq!(sentences, vec!["मूल्य 2।5 है।", "ठीक"]);
    }

    #[test]
    fn test_indic_closing_quote_after_danda() {
        let sentences = split_sentences("उसने कहा \"चलो।\" फिर गया।", "hi");
        assert_eq!(sentences, vec!["उसने कहा \"चलो।\"", "फिर गया।"]);
    }

    #[test]
    fn test_indic_period_and_runs() {
        let sentences = split_sentences("வணக்கம்!! நன்றி. சரி", "ta");
        assert_eq!(sentences, vec!["வணக்கம்!!", "நன்றி.", "சரி"]);
    }

    #[test]
    fn test_indic_initials() {
        let sentences = split_sentences("A. P. J. अब्दुल कलाम। वैज्ञानिक थे।", "hi");
        assert_eq!(sentences, vec!["A. P. J. अब्दुल कलाम।", "वैज्ञानिक थे।"]);

        // initials after the purna viram rewrite
        let sentences = split_sentences("A। P। J। अब्दुल कलाम। वैज्ञानिक थे।", "hi");
        assert_eq!(sentences, vec!["A। P। J। अब्दुल कलाम।", "वैज्ञानिक थे।"]);
    }

    #[test]
    fn test_unknown_language_single_sentence() {
        let sentences = split_sentences("Bonjour. Ça va?", "fr");
        assert_eq!(sentences, vec!["Bonjour. Ça va?"]);
    }

    #[test]
    fn test_empty_input() {
        assert!(split_sentences("", "hi").is_empty());
        assert!(split_sentences("   ", "en").is_empty());
    }
}
