//! Language codes recognized by the pipeline.
//!
//! Canonical codes match the per-language model directories and output file
//! prefixes. `JP` and `KO` are accepted as input aliases and normalized to
//! `JA` and `KR` everywhere downstream.

use std::fmt;

/// A language with a loadable synthesis model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    Ja,
    En,
    Kr,
    Zh,
    Fr,
    Es,
}

/// Positional routing order for dialogue turns.
///
/// Line *i* of a turn belongs to the *i*-th language of this order, whatever
/// subset of languages a run actually loads. The order is part of the script
/// format and never follows the command line.
pub const DECLARED_ORDER: [Language; 6] = [
    Language::Ja,
    Language::En,
    Language::Kr,
    Language::Zh,
    Language::Fr,
    Language::Es,
];

impl Language {
    /// Parse a language code, case-insensitively, accepting aliases.
    pub fn from_code(code: &str) -> Option<Self> {
        match code.trim().to_ascii_uppercase().as_str() {
            "JA" | "JP" => Some(Self::Ja),
            "EN" => Some(Self::En),
            "KR" | "KO" => Some(Self::Kr),
            "ZH" => Some(Self::Zh),
            "FR" => Some(Self::Fr),
            "ES" => Some(Self::Es),
            _ => None,
        }
    }

    /// Canonical code used in filenames and model directory names.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Ja => "JA",
            Self::En => "EN",
            Self::Kr => "KR",
            Self::Zh => "ZH",
            Self::Fr => "FR",
            Self::Es => "ES",
        }
    }

    /// Human-readable name for listings.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ja => "Japanese",
            Self::En => "English",
            Self::Kr => "Korean",
            Self::Zh => "Chinese",
            Self::Fr => "French",
            Self::Es => "Spanish",
        }
    }

    /// Classify an untagged line by its first script-significant character.
    ///
    /// Kana and CJK ideographs map to Japanese, Hangul syllables to Korean,
    /// anything else to English.
    pub fn detect(line: &str) -> Self {
        for ch in line.chars() {
            if ('\u{3040}'..='\u{30FF}').contains(&ch) {
                return Self::Ja;
            }
            if ('\u{AC00}'..='\u{D7A3}').contains(&ch) {
                return Self::Kr;
            }
            if ('\u{4E00}'..='\u{9FFF}').contains(&ch) {
                return Self::Ja;
            }
        }
        Self::En
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
