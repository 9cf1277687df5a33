//! Symbol tokenization
//!
//! Character-level encoder used by the Glow-TTS text encoder. The symbol
//! table is `["_"] + punctuation + characters` as listed in the model's
//! training config, so ids are positions in that list. Characters outside
//! the table are dropped.

use anyhow::Result;
use std::collections::HashMap;

/// Padding symbol, always id 0
pub const PAD_SYMBOL: char = '_';

/// Abbreviations expanded by the English cleaner
const ENGLISH_ABBREVIATIONS: &[(&str, &str)] = &[
    ("mrs", "misess"),
    ("mr", "mister"),
    ("dr", "doctor"),
    ("st", "saint"),
    ("co", "company"),
    ("jr", "junior"),
    ("maj", "major"),
    ("gen", "general"),
    ("drs", "doctors"),
    ("rev", "reverend"),
    ("lt", "lieutenant"),
    ("hon", "honorable"),
    ("sgt", "sergeant"),
    ("capt", "captain"),
    ("esq", "esquire"),
    ("ltd", "limited"),
    ("col", "colonel"),
    ("ft", "fort"),
];

/// Text cleaners a model may have been trained with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cleaner {
    /// Lowercase and collapse whitespace
    Basic,
    /// Collapse whitespace only; Indic scripts have no case
    BasicIndic,
    /// Lowercase, expand abbreviations, collapse whitespace
    English,
}

impl Cleaner {
    /// Parse a cleaner name from a training config
    pub fn from_name(name: &str) -> Result<Self> {
        match name {
            "basic_cleaners" => Ok(Cleaner::Basic),
            "basic_indic_cleaners" => Ok(Cleaner::BasicIndic),
            "english_cleaners" => Ok(Cleaner::English),
            other => anyhow::bail!("Unknown text cleaner: {}", other),
        }
    }

    /// Apply the cleaner to a sentence
    pub fn clean(&self, text: &str) -> String {
        match self {
            Cleaner::Basic => collapse_whitespace(&text.to_lowercase()),
            Cleaner::BasicIndic => collapse_whitespace(text),
            Cleaner::English => {
                let lowered = text.to_lowercase();
                collapse_whitespace(&expand_abbreviations(&lowered))
            }
        }
    }
}

/// Replace whitespace runs with a single space, keeping the leading one
fn collapse_whitespace(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut prev_was_space = false;
    for c in text.chars() {
        if c.is_whitespace() {
            if !prev_was_space {
                result.push(' ');
            }
            prev_was_space = true;
        } else {
            result.push(c);
            prev_was_space = false;
        }
    }
    result
}

fn expand_abbreviations(text: &str) -> String {
    text.split(' ')
        .map(|word| {
            let Some(stem) = word.strip_suffix('.') else {
                return word.to_string();
            };
            ENGLISH_ABBREVIATIONS
                .iter()
                .find(|(abbr, _)| *abbr == stem)
                .map(|(_, full)| full.to_string())
                .unwrap_or_else(|| word.to_string())
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Character-level tokenizer for Glow-TTS models
#[derive(Debug, Clone)]
pub struct SymbolTokenizer {
    symbol_to_id: HashMap<char, u32>,
    num_symbols: usize,
    cleaners: Vec<Cleaner>,
    add_blank: bool,
}

impl SymbolTokenizer {
    /// Build the symbol table from the punctuation and character sets
    pub fn new(punctuation: &str, characters: &str, cleaner_names: &[String], add_blank: bool) -> Result<Self> {
        let mut symbol_to_id = HashMap::new();
        let mut num_symbols = 0usize;

        for c in std::iter::once(PAD_SYMBOL).chain(punctuation.chars()).chain(characters.chars()) {
            // later duplicates win, matching a dict built from the symbol list
            symbol_to_id.insert(c, num_symbols as u32);
            num_symbols += 1;
        }

        let cleaners = cleaner_names
            .iter()
            .map(|name| Cleaner::from_name(name))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            symbol_to_id,
            num_symbols,
            cleaners,
            add_blank,
        })
    }

    /// Number of symbols in the table, excluding the blank
    pub fn num_symbols(&self) -> usize {
        self.num_symbols
    }

    /// Vocabulary size expected by the embedding table
    pub fn vocab_size(&self) -> usize {
        self.num_symbols + usize::from(self.add_blank)
    }

    /// Id of the blank token interspersed between symbols
    pub fn blank_id(&self) -> Option<u32> {
        self.add_blank.then_some(self.num_symbols as u32)
    }

    /// Run the configured cleaners over a sentence
    pub fn clean(&self, text: &str) -> String {
        self.cleaners
            .iter()
            .fold(text.to_string(), |acc, cleaner| cleaner.clean(&acc))
    }

    /// Encode a sentence into symbol ids
    pub fn encode(&self, text: &str) -> Result<Vec<u32>> {
        let cleaned = self.clean(text);
        let ids: Vec<u32> = cleaned
            .chars()
            .filter_map(|c| self.symbol_to_id.get(&c).copied())
            .collect();

        if ids.is_empty() {
            anyhow::bail!("No known symbols in text: {:?}", text);
        }

        Ok(match self.blank_id() {
            Some(blank) => intersperse(&ids, blank),
            None => ids,
        })
    }
}

/// Place `item` before, between and after every id
fn intersperse(ids: &[u32], item: u32) -> Vec<u32> {
    let mut result = Vec::with_capacity(ids.len() * 2 + 1);
    result.push(item);
    for &id in ids {
        result.push(id);
        result.push(item);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokenizer(add_blank: bool) -> SymbolTokenizer {
        SymbolTokenizer::new(" .,", "abc", &["basic_cleaners".to_string()], add_blank).unwrap()
    }

    #[test]
    fn test_symbol_ids() {
        let tok = tokenizer(false);
        assert_eq!(tok.num_symbols(), 7);
        assert_eq!(tok.encode(" abc.").unwrap(), vec![1, 4, 5, 6, 2]);
    }

    #[test]
    fn test_unknown_characters_dropped() {
        let tok = tokenizer(false);
        assert_eq!(tok.encode("a-z b").unwrap(), vec![4, 1, 5]);
    }

    #[test]
    fn test_add_blank() {
        let tok = tokenizer(true);
        assert_eq!(tok.vocab_size(), 8);
        assert_eq!(tok.blank_id(), Some(7));
        assert_eq!(tok.encode("ab").unwrap(), vec![7, 4, 7, 5, 7]);
    }

    #[test]
    fn test_basic_cleaner_lowercases() {
        let tok = tokenizer(false);
        assert_eq!(tok.encode("AB").unwrap(), vec![4, 5]);
    }

    #[test]
    fn test_english_cleaner() {
        assert_eq!(Cleaner::English.clean("Dr. Smith  and Mr. Jones"), "doctor smith and mister jones");
        assert_eq!(Cleaner::BasicIndic.clean("  नमस्ते   दुनिया "), " नमस्ते दुनिया ");
    }

    #[test]
    fn test_unknown_cleaner_rejected() {
        assert!(SymbolTokenizer::new("", "a", &["fancy_cleaners".to_string()], false).is_err());
    }

    #[test]
    fn test_empty_encoding_is_error() {
        let tok = tokenizer(false);
        assert!(tok.encode("xyz").is_err());
    }
}
