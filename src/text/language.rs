//! Language tables shared by the text pipeline
//!
//! Languages are identified by their ISO 639 codes as sent by clients
//! (`hi`, `ta`, `en`, ...).

/// Indic languages handled by the Indic sentence splitter
pub const INDIC_LANGUAGES: &[&str] = &["as", "bn", "gu", "hi", "kn", "ml", "mr", "or", "pa", "ta", "te"];

/// Languages whose sentences end with the purna viram (danda)
pub const PURNA_VIRAM_LANGUAGES: &[&str] = &["hi", "or", "bn", "as"];

/// Languages for which embedded foreign words are not transliterated before synthesis
pub const TRANSLITERATION_NOT_AVAILABLE_IN: &[&str] = &["en", "or"];

/// Target languages accepted by the transliteration endpoint
pub const TRANSLITERATION_TARGETS: &[&str] = &[
    "hi", "gu", "mr", "bn", "te", "ta", "kn", "pa", "gom", "mai", "ml", "sd", "si", "ur", "as", "or",
];

/// Devanagari danda
pub const DANDA: char = '\u{0964}';

/// Devanagari double danda
pub const DOUBLE_DANDA: char = '\u{0965}';

/// Check whether a language uses the Indic sentence splitter
pub fn is_indic(lang: &str) -> bool {
    INDIC_LANGUAGES.contains(&lang)
}

/// Check whether a language terminates sentences with the purna viram
pub fn uses_purna_viram(lang: &str) -> bool {
    PURNA_VIRAM_LANGUAGES.contains(&lang)
}

/// Check whether foreign words should be transliterated before synthesis
pub fn transliterates_before_synthesis(lang: &str) -> bool {
    !TRANSLITERATION_NOT_AVAILABLE_IN.contains(&lang)
}

/// Check whether the transliteration endpoint accepts a target language
pub fn is_transliteration_target(lang: &str) -> bool {
    TRANSLITERATION_TARGETS.contains(&lang)
}

/// Canonical form of a language or gender code coming from a request
pub fn canonical_code(code: &str) -> String {
    code.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_tables() {
        assert!(is_indic("hi"));
        assert!(!is_indic("en"));
        assert!(uses_purna_viram("bn"));
        assert!(!uses_purna_viram("ta"));
        assert!(!transliterates_before_synthesis("or"));
        assert!(transliterates_before_synthesis("hi"));
        assert!(is_transliteration_target("gom"));
        assert!(!is_transliteration_target("en"));
    }

    #[test]
    fn test_canonical_code() {
        assert_eq!(canonical_code(" HI "), "hi");
        assert_eq!(canonical_code("Female"), "female");
    }
}
