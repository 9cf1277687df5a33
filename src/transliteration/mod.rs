//! Transliteration
//!
//! Sentence-level transliteration into an Indic target script. Each
//! whitespace-separated word is routed by the script it is written in:
//! - Latin words go to the romanized backend when one is configured
//! - Indic words in another Brahmic script go through [`ScriptConverter`]
//! - Everything else is kept as written

mod remote;
mod script;

pub use remote::{RemoteConfig, RemoteTransliterator};
pub use script::{Script, ScriptConverter};

use async_trait::async_trait;
use std::sync::Arc;

use crate::core::error::{Result, TtsError};
use crate::text::language::{is_transliteration_target, DANDA, DOUBLE_DANDA};

/// Word-level transliteration backend
#[async_trait]
pub trait Transliterator: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &str;

    /// Whether the backend can produce text in `language`
    fn supports(&self, language: &str) -> bool;

    /// Transliterate a single word into the script of `language`
    async fn transliterate_word(&self, word: &str, language: &str) -> Result<String>;
}

/// Routes the words of a sentence to the matching backend
#[derive(Clone)]
pub struct SentenceTransliterator {
    script: ScriptConverter,
    romanized: Option<Arc<dyn Transliterator>>,
}

impl SentenceTransliterator {
    /// Create a transliterator with an optional romanized backend
    pub fn new(romanized: Option<Arc<dyn Transliterator>>) -> Self {
        Self {
            script: ScriptConverter::new(),
            romanized,
        }
    }

    /// Whether `language` is an accepted target
    pub fn supports(&self, language: &str) -> bool {
        is_transliteration_target(language)
    }

    /// Name of the romanized backend, if any
    pub fn romanized_backend(&self) -> Option<&str> {
        self.romanized.as_deref().map(|backend| backend.name())
    }

    /// Transliterate a sentence into the script of `target`
    pub async fn transliterate_sentence(&self, text: &str, target: &str) -> Result<String> {
        if !self.supports(target) {
            return Err(TtsError::TransliterationUnavailable {
                language: target.to_string(),
            });
        }

        let mut words = Vec::new();
        for token in text.split_whitespace() {
            words.push(self.transliterate_token(token, target).await?);
        }

        Ok(words.join(" "))
    }

    async fn transliterate_token(&self, token: &str, target: &str) -> Result<String> {
        let (prefix, word, suffix) = split_affixes(token);
        if word.is_empty() {
            return Ok(token.to_string());
        }

        let converted = if word.chars().any(|c| c.is_ascii_alphabetic()) {
            match &self.romanized {
                Some(backend) if backend.supports(target) => backend.transliterate_word(word, target).await?,
                _ => word.to_string(),
            }
        } else {
            match (Script::detect(word), Script::for_language(target)) {
                (Some(source), Some(dest)) if source != dest => {
                    self.script.convert(word, target).unwrap_or_else(|| word.to_string())
                }
                // the Assamese letters differ from Bengali
                (Some(_), Some(_)) if target == "as" => {
                    self.script.convert(word, target).unwrap_or_else(|| word.to_string())
                }
                _ => word.to_string(),
            }
        };

        Ok(format!("{}{}{}", prefix, converted, suffix))
    }
}

/// Letters, digits and any mark from the Brahmic blocks (virama included)
fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || (Script::of_char(c).is_some() && c != DANDA && c != DOUBLE_DANDA)
}

/// Split a token into leading punctuation, the word, and trailing punctuation
fn split_affixes(token: &str) -> (&str, &str, &str) {
    let start = token
        .char_indices()
        .find(|(_, c)| is_word_char(*c))
        .map_or(token.len(), |(i, _)| i);
    let end = token
        .char_indices()
        .rev()
        .find(|(_, c)| is_word_char(*c))
        .map_or(start, |(i, c)| i + c.len_utf8());

    (&token[..start], &token[start..end], &token[end..])
}
