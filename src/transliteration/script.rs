//! Rule-based conversion between Brahmic scripts
//!
//! The Unicode blocks for the major Indic scripts share one layout: the
//! same offset inside each 128-codepoint block encodes the same letter. A
//! word is converted by moving every character from the source block to the
//! target block at the same offset.

use async_trait::async_trait;

use super::Transliterator;
use crate::core::error::{Result, TtsError};
use crate::text::language::{DANDA, DOUBLE_DANDA};

/// Size of each Brahmic Unicode block
const BLOCK_SIZE: u32 = 0x80;

/// Assamese letters outside the shared layout: (Assamese, Bengali)
const ASSAMESE_LETTERS: &[(char, char)] = &[('\u{09F0}', '\u{09B0}'), ('\u{09F1}', '\u{09AC}')];

/// Letters Tamil lacks, spelled with offsets of letters it has
const TAMIL_FOLDS: &[(u32, &[u32])] = &[
    (0x01, &[0x02]),
    (0x0B, &[0x30, 0x41]),
    (0x0C, &[0x32, 0x41]),
    (0x0D, &[0x0F]),
    (0x11, &[0x13]),
    (0x16, &[0x15]),
    (0x17, &[0x15]),
    (0x18, &[0x15]),
    (0x1B, &[0x1A]),
    (0x1D, &[0x1C]),
    (0x20, &[0x1F]),
    (0x21, &[0x1F]),
    (0x22, &[0x1F]),
    (0x25, &[0x24]),
    (0x26, &[0x24]),
    (0x27, &[0x24]),
    (0x2B, &[0x2A]),
    (0x2C, &[0x2A]),
    (0x2D, &[0x2A]),
    (0x43, &[0x4D, 0x30, 0x41]),
    (0x44, &[0x4D, 0x30, 0x42]),
    (0x45, &[0x47]),
    (0x49, &[0x4B]),
    (0x60, &[0x30, 0x42]),
];

/// Letters Bengali lacks: va is written with ba, the Dravidian rra with ra
const BENGALI_FOLDS: &[(u32, &[u32])] = &[(0x31, &[0x30]), (0x35, &[0x2C])];

/// Assigned offsets per block (inclusive ranges, Unicode 15)
const BENGALI_ASSIGNED: &[(u32, u32)] = &[
    (0x00, 0x03), (0x05, 0x0C), (0x0F, 0x10), (0x13, 0x28), (0x2A, 0x30), (0x32, 0x32),
    (0x36, 0x39), (0x3C, 0x44), (0x47, 0x48), (0x4B, 0x4E), (0x57, 0x57), (0x5C, 0x5D),
    (0x5F, 0x63), (0x66, 0x7E),
];
const GURMUKHI_ASSIGNED: &[(u32, u32)] = &[
    (0x01, 0x03), (0x05, 0x0A), (0x0F, 0x10), (0x13, 0x28), (0x2A, 0x30), (0x32, 0x33),
    (0x35, 0x36), (0x38, 0x39), (0x3C, 0x3C), (0x3E, 0x42), (0x47, 0x48), (0x4B, 0x4D),
    (0x51, 0x51), (0x59, 0x5C), (0x5E, 0x5E), (0x66, 0x76),
];
const GUJARATI_ASSIGNED: &[(u32, u32)] = &[
    (0x01, 0x03), (0x05, 0x0D), (0x0F, 0x11), (0x13, 0x28), (0x2A, 0x30), (0x32, 0x33),
    (0x35, 0x39), (0x3C, 0x45), (0x47, 0x49), (0x4B, 0x4D), (0x50, 0x50), (0x60, 0x63),
    (0x66, 0x71), (0x79, 0x7F),
];
const ORIYA_ASSIGNED: &[(u32, u32)] = &[
    (0x01, 0x03), (0x05, 0x0C), (0x0F, 0x10), (0x13, 0x28), (0x2A, 0x30), (0x32, 0x33),
    (0x35, 0x39), (0x3C, 0x44), (0x47, 0x48), (0x4B, 0x4D), (0x55, 0x57), (0x5C, 0x5D),
    (0x5F, 0x63), (0x66, 0x77),
];
const TAMIL_ASSIGNED: &[(u32, u32)] = &[
    (0x02, 0x03), (0x05, 0x0A), (0x0E, 0x10), (0x12, 0x15), (0x19, 0x1A), (0x1C, 0x1C),
    (0x1E, 0x1F), (0x23, 0x24), (0x28, 0x2A), (0x2E, 0x39), (0x3E, 0x42), (0x46, 0x48),
    (0x4A, 0x4D), (0x50, 0x50), (0x57, 0x57), (0x66, 0x7A),
];
const TELUGU_ASSIGNED: &[(u32, u32)] = &[
    (0x00, 0x0C), (0x0E, 0x10), (0x12, 0x28), (0x2A, 0x39), (0x3C, 0x44), (0x46, 0x48),
    (0x4A, 0x4D), (0x55, 0x56), (0x58, 0x5A), (0x5D, 0x5D), (0x60, 0x63), (0x66, 0x6F),
    (0x77, 0x7F),
];
const KANNADA_ASSIGNED: &[(u32, u32)] = &[
    (0x00, 0x0C), (0x0E, 0x10), (0x12, 0x28), (0x2A, 0x33), (0x35, 0x39), (0x3C, 0x44),
    (0x46, 0x48), (0x4A, 0x4D), (0x55, 0x56), (0x5D, 0x5E), (0x60, 0x63), (0x66, 0x6F),
    (0x71, 0x73),
];
const MALAYALAM_ASSIGNED: &[(u32, u32)] = &[
    (0x00, 0x0C), (0x0E, 0x10), (0x12, 0x44), (0x46, 0x48), (0x4A, 0x4F), (0x54, 0x63),
    (0x66, 0x7F),
];

/// Brahmic scripts sharing the ISCII-derived Unicode layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Script {
    Devanagari,
    Bengali,
    Gurmukhi,
    Gujarati,
    Oriya,
    Tamil,
    Telugu,
    Kannada,
    Malayalam,
}

impl Script {
    const ALL: [Script; 9] = [
        Script::Devanagari,
        Script::Bengali,
        Script::Gurmukhi,
        Script::Gujarati,
        Script::Oriya,
        Script::Tamil,
        Script::Telugu,
        Script::Kannada,
        Script::Malayalam,
    ];

    /// First code point of the script's Unicode block
    pub fn block_start(self) -> u32 {
        match self {
            Script::Devanagari => 0x0900,
            Script::Bengali => 0x0980,
            Script::Gurmukhi => 0x0A00,
            Script::Gujarati => 0x0A80,
            Script::Oriya => 0x0B00,
            Script::Tamil => 0x0B80,
            Script::Telugu => 0x0C00,
            Script::Kannada => 0x0C80,
            Script::Malayalam => 0x0D00,
        }
    }

    /// Whether the code point at `offset` in this block is assigned
    pub fn has_offset(self, offset: u32) -> bool {
        let assigned: &[(u32, u32)] = match self {
            Script::Devanagari => return offset < BLOCK_SIZE,
            Script::Bengali => BENGALI_ASSIGNED,
            Script::Gurmukhi => GURMUKHI_ASSIGNED,
            Script::Gujarati => GUJARATI_ASSIGNED,
            Script::Oriya => ORIYA_ASSIGNED,
            Script::Tamil => TAMIL_ASSIGNED,
            Script::Telugu => TELUGU_ASSIGNED,
            Script::Kannada => KANNADA_ASSIGNED,
            Script::Malayalam => MALAYALAM_ASSIGNED,
        };
        assigned.iter().any(|&(lo, hi)| (lo..=hi).contains(&offset))
    }

    fn folds(self) -> &'static [(u32, &'static [u32])] {
        match self {
            Script::Tamil => TAMIL_FOLDS,
            Script::Bengali => BENGALI_FOLDS,
            _ => &[],
        }
    }

    /// Script a language is written in
    pub fn for_language(lang: &str) -> Option<Script> {
        match lang {
            "hi" | "mr" | "gom" | "mai" | "ne" | "sa" => Some(Script::Devanagari),
            "bn" | "as" => Some(Script::Bengali),
            "pa" => Some(Script::Gurmukhi),
            "gu" => Some(Script::Gujarati),
            "or" => Some(Script::Oriya),
            "ta" => Some(Script::Tamil),
            "te" => Some(Script::Telugu),
            "kn" => Some(Script::Kannada),
            "ml" => Some(Script::Malayalam),
            _ => None,
        }
    }

    /// Script a single character belongs to
    pub fn of_char(c: char) -> Option<Script> {
        let code = c as u32;
        Script::ALL
            .into_iter()
            .find(|script| (script.block_start()..script.block_start() + BLOCK_SIZE).contains(&code))
    }

    /// Script of the first Brahmic character in a word
    pub fn detect(word: &str) -> Option<Script> {
        word.chars().find_map(Script::of_char)
    }
}

/// Offset-mapping converter between Brahmic scripts
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptConverter;

impl ScriptConverter {
    pub fn new() -> Self {
        Self
    }

    /// Convert every Brahmic character of `text` into the script of `lang`
    ///
    /// Characters without a counterpart in the target script are kept.
    /// Returns `None` when `lang` is not written in a Brahmic script.
    pub fn convert(&self, text: &str, lang: &str) -> Option<String> {
        let target = Script::for_language(lang)?;
        let assamese = lang == "as";

        let mut converted = String::with_capacity(text.len());
        for c in text.chars() {
            // Assamese ra/wa live outside the shared layout
            let c = ASSAMESE_LETTERS
                .iter()
                .find(|(a, _)| *a == c)
                .map_or(c, |(_, b)| *b);
            self.push_converted(&mut converted, c, target, assamese);
        }

        Some(converted)
    }

    fn push_converted(&self, out: &mut String, c: char, target: Script, assamese: bool) {
        let source = match Script::of_char(c) {
            Some(source) if c != DANDA && c != DOUBLE_DANDA => source,
            _ => {
                out.push(c);
                return;
            }
        };
        let offset = c as u32 - source.block_start();
        let base = target.block_start();

        if let Some((_, folded)) = target.folds().iter().find(|(from, _)| *from == offset) {
            out.extend(folded.iter().filter_map(|o| char::from_u32(base + o)));
            return;
        }

        let mapped = match char::from_u32(base + offset) {
            Some(mapped) if target.has_offset(offset) => mapped,
            _ => c,
        };

        // only ra differs in everyday Assamese spelling
        let (assamese_ra, bengali_ra) = ASSAMESE_LETTERS[0];
        if assamese && mapped == bengali_ra {
            out.push(assamese_ra);
        } else {
            out.push(mapped);
        }
    }
}

#[async_trait]
impl Transliterator for ScriptConverter {
    fn name(&self) -> &str {
        "script"
    }

    fn supports(&self, language: &str) -> bool {
        Script::for_language(language).is_some()
    }

    async fn transliterate_word(&self, word: &str, language: &str) -> Result<String> {
        self.convert(word, language)
            .ok_or_else(|| TtsError::TransliterationUnavailable {
                language: language.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_detection() {
        assert_eq!(Script::detect("नमस्ते"), Some(Script::Devanagari));
        assert_eq!(Script::detect("வணக்கம்"), Some(Script::Tamil));
        assert_eq!(Script::detect("hello"), None);
        assert_eq!(Script::for_language("as"), Some(Script::Bengali));
        assert_eq!(Script::for_language("ur"), None);
    }

    #[test]
    fn test_devanagari_to_bengali() {
        let converter = ScriptConverter::new();
        assert_eq!(converter.convert("कमल", "bn").unwrap(), "কমল");
    }

    #[test]
    fn test_devanagari_to_gujarati_and_back() {
        let converter = ScriptConverter::new();
        let gujarati = converter.convert("नमस्ते", "gu").unwrap();
        assert_eq!(gujarati, "નમસ્તે");
        assert_eq!(converter.convert(&gujarati, "hi").unwrap(), "नमस्ते");
    }

    #[test]
    fn test_latin_and_danda_untouched() {
        let converter = ScriptConverter::new();
        assert_eq!(converter.convert("abc।", "te").unwrap(), "abc।");
    }

    #[test]
    fn test_tamil_folds_aspirates() {
        let converter = ScriptConverter::new();
        // ख (kha) has no Tamil letter and becomes க (ka)
        assert_eq!(converter.convert("ख", "ta").unwrap(), "க");
    }

    #[test]
    fn test_tamil_vowels() {
        let converter = ScriptConverter::new();
        assert_eq!(converter.convert("ऋषि", "ta").unwrap(), "ருஷி");
        assert_eq!(converter.convert("कृपा", "ta").unwrap(), "க்ருபா");
        assert_eq!(converter.convert("ऑफिस", "ta").unwrap(), "ஓபிஸ");
    }

    #[test]
    fn test_missing_letters_are_kept() {
        let converter = ScriptConverter::new();
        assert_eq!(converter.convert("ळ", "bn").unwrap(), "ळ");
        assert_eq!(converter.convert("ऋतु", "pa").unwrap(), "ऋਤੁ");
        assert_eq!(converter.convert("वन", "bn").unwrap(), "বন");
    }

    #[test]
    fn test_output_is_always_assigned() {
        let converter = ScriptConverter::new();
        let devanagari: String = (0x0900..0x0980).filter_map(char::from_u32).collect();
        for lang in ["bn", "pa", "gu", "or", "ta", "te", "kn", "ml"] {
            let target = Script::for_language(lang).unwrap();
            for c in converter.convert(&devanagari, lang).unwrap().chars() {
                if Script::of_char(c) == Some(target) {
                    assert!(
                        target.has_offset(c as u32 - target.block_start()),
                        "unassigned U+{:04X} for {}",
                        c as u32,
                        lang
                    );
                }
            }
        }
    }

    #[test]
    fn test_assamese_ra() {
        let converter = ScriptConverter::new();
        assert_eq!(converter.convert("र", "as").unwrap(), "ৰ");
        assert_eq!(converter.convert("ৰ", "hi").unwrap(), "र");
    }

    #[test]
    fn test_non_brahmic_target() {
        assert!(ScriptConverter::new().convert("नमस्ते", "ur").is_none());
    }

    #[tokio::test]
    async fn test_trait_unsupported_language() {
        let converter = ScriptConverter::new();
        assert!(converter.supports("kn"));
        assert!(converter.transliterate_word("नमस्ते", "si").await.is_err());
        assert_eq!(converter.transliterate_word("कमल", "pa").await.unwrap(), "ਕਮਲ");
    }
}
