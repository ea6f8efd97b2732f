//! Tokenization of raw attribute text into deduplicated word sequences.

use once_cell::sync::Lazy;
use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use rustc_hash::FxHashSet;

use crate::error::{CloudError, Result};

/// Delimiter strings always part of the split pattern.
pub const BASE_DELIMITERS: &[&str] = &[
    " ", "\t", "\n", "\r", ".", ",", ";", ":", "!", "?", "\"", "'", "`", "(", ")", "[", "]", "{",
    "}", "<", ">", "/", "\\", "|", "@", "#", "$", "%", "^", "&", "*", "-", "_", "+", "=", "~",
];

static BASE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&pattern_source(BASE_DELIMITERS.iter().copied()))
        .expect("base delimiter pattern is valid")
});

fn pattern_source<'a, I: Iterator<Item = &'a str>>(delimiters: I) -> String {
    let escaped: Vec<String> = delimiters.map(regex::escape).collect();
    format!("(?:{})+", escaped.join("|"))
}

/// Splits raw text into a deduplicated, order-preserving sequence of
/// lowercase words.
#[derive(Debug, Clone)]
pub struct Tokenizer {
    pattern: Regex,
    stemming: bool,
}

impl Tokenizer {
    /// Builds a tokenizer from user-added delimiters and a stemming flag.
    ///
    /// Custom delimiters are regex-escaped and appended to
    /// [`BASE_DELIMITERS`]; with no custom entries the shared base pattern
    /// is reused.
    pub fn new(custom_delimiters: &[String], stemming: bool) -> Result<Self> {
        let pattern = if custom_delimiters.is_empty() {
            BASE_PATTERN.clone()
        } else {
            let source = pattern_source(
                BASE_DELIMITERS
                    .iter()
                    .copied()
                    .chain(custom_delimiters.iter().map(String::as_str)),
            );
            Regex::new(&source)
                .map_err(|err| CloudError::InvalidConfig(format!("bad delimiter set: {err}")))?
        };
        Ok(Self { pattern, stemming })
    }

    /// True when suffix stemming is applied to each token.
    #[must_use]
    pub fn stemming(&self) -> bool {
        self.stemming
    }

    /// Tokenizes one raw text value.
    ///
    /// Lowercases, splits on the delimiter pattern, discards empty tokens,
    /// stems (when enabled) before deduplication, and deduplicates while
    /// preserving first-occurrence order. Two tokens that stem to the same
    /// root therefore count once.
    #[must_use]
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        let lowered = text.to_lowercase();
        let stemmer = self.stemming.then(|| Stemmer::create(Algorithm::English));
        let mut seen: FxHashSet<String> = FxHashSet::default();
        let mut words = Vec::new();
        for token in self.pattern.split(&lowered) {
            if token.is_empty() {
                continue;
            }
            let word = match &stemmer {
                Some(stemmer) => stemmer.stem(token).into_owned(),
                None => token.to_string(),
            };
            if seen.insert(word.clone()) {
                words.push(word);
            }
        }
        words
    }
}
