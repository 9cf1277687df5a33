//! Text processing modules
//!
//! - Per-language punctuation normalization
//! - Sentence segmentation
//! - Number expansion
//! - Symbol tokenization for the mel generators

pub mod language;
mod normalizer;
mod numbers;
mod segmenter;
mod tokenizer;

pub use normalizer::{normalize_text, normalize_whitespace, pre_process_text};
pub use numbers::{digit_value, english_cardinal, hindi_cardinal, normalize_nums};
pub use segmenter::split_sentences;
pub use tokenizer::{Cleaner, SymbolTokenizer, PAD_SYMBOL};
