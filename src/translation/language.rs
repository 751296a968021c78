//! Character-set language sniffing.
//!
//! This is a heuristic, not a language detector. Input is classified as the source language
//! when it contains at least one character from the configured special set (Turkish letters by
//! default) and as the target language otherwise. Known blind spots:
//!
//! - Source-language text written without any special letters (`"Merhaba"`, `"Nasilsin"`,
//!   ASCII-folded input) is classified as the target language.
//! - Target-language text quoting a single special letter (`"the word çay"`) is classified as
//!   the source language.
//! - No stemming, no statistics: the result depends only on the input and the character set.

use serde::Serialize;

/// Turkish letters that never occur in plain English text.
pub const DEFAULT_SOURCE_CHARSET: &str = "çğıöşüÇĞİÖŞÜ";

/// Names of the two languages and the characters that identify the source language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LanguagePair {
    /// Human-readable name of the source language.
    pub source_name: String,
    /// Human-readable name of the target language.
    pub target_name: String,
    /// Characters whose presence marks input as source-language text.
    pub source_charset: String,
}

impl Default for LanguagePair {
    fn default() -> Self {
        Self {
            source_name: "Turkish".into(),
            target_name: "English".into(),
            source_charset: DEFAULT_SOURCE_CHARSET.into(),
        }
    }
}

/// Classification produced by [`sniff_language`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    /// Input contains at least one source-language marker character.
    Source,
    /// Input contains none of the marker characters.
    Target,
}

/// Classify `text` by character-set membership.
pub fn sniff_language(text: &str, source_charset: &str) -> Language {
    if text.chars().any(|ch| source_charset.contains(ch)) {
        Language::Source
    } else {
        Language::Target
    }
}
