//! Word filtering: stop words, flagged noise, user exclusions, numbers.

use rustc_hash::FxHashSet;

/// Base stop-word list, always consulted.
const STOP_WORDS: &[&str] = &[
    "a", "about", "above", "after", "again", "against", "all", "am", "an", "and", "any", "are",
    "as", "at", "be", "because", "been", "before", "being", "below", "between", "both", "but",
    "by", "can", "cannot", "could", "did", "do", "does", "doing", "down", "during", "each",
    "few", "for", "from", "further", "had", "has", "have", "having", "he", "her", "here",
    "hers", "herself", "him", "himself", "his", "how", "i", "if", "in", "into", "is", "it",
    "its", "itself", "just", "me", "more", "most", "my", "myself", "no", "nor", "not", "now",
    "of", "off", "on", "once", "only", "or", "other", "our", "ours", "ourselves", "out",
    "over", "own", "same", "she", "should", "so", "some", "such", "than", "that", "the",
    "their", "theirs", "them", "themselves", "then", "there", "these", "they", "this",
    "those", "through", "to", "too", "under", "until", "up", "very", "was", "we", "were",
    "what", "when", "where", "which", "while", "who", "whom", "why", "will", "with", "would",
    "you", "your", "yours", "yourself", "yourselves",
];

/// Pre-existing known-noise words; removable through [`WordFilter::unflag`].
const FLAGGED_WORDS: &[&str] = &[
    "com", "edu", "et", "etc", "gov", "html", "http", "https", "na", "net", "org", "vs", "www",
];

/// Set-membership predicate deciding which tokenized words are dropped.
///
/// Mutations take effect on the next [`WordFilter::contains`] query; no
/// state is cached beyond the active in-memory sets.
#[derive(Debug, Clone)]
pub struct WordFilter {
    stop: FxHashSet<String>,
    flagged: FxHashSet<String>,
    added: FxHashSet<String>,
    exclude_numbers: bool,
}

impl WordFilter {
    /// Creates a filter holding the base stop and flagged sets.
    #[must_use]
    pub fn new(exclude_numbers: bool) -> Self {
        Self {
            stop: STOP_WORDS.iter().map(|w| (*w).to_string()).collect(),
            flagged: FLAGGED_WORDS.iter().map(|w| (*w).to_string()).collect(),
            added: FxHashSet::default(),
            exclude_numbers,
        }
    }

    /// True when the word should be dropped.
    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        if self.exclude_numbers && is_small_integer(word) {
            return true;
        }
        self.stop.contains(word) || self.flagged.contains(word) || self.added.contains(word)
    }

    /// Adds a user exclusion.
    pub fn add(&mut self, word: &str) {
        self.added.insert(word.to_lowercase());
    }

    /// Removes a user exclusion. Returns true when the word was present.
    pub fn remove(&mut self, word: &str) -> bool {
        self.added.remove(&word.to_lowercase())
    }

    /// Removes a word from the flagged noise set. Returns true when the word
    /// was present.
    pub fn unflag(&mut self, word: &str) -> bool {
        self.flagged.remove(&word.to_lowercase())
    }

    /// Enables or disables exclusion of decimal integers 0-999.
    pub fn set_exclude_numbers(&mut self, enabled: bool) {
        self.exclude_numbers = enabled;
    }

    /// True when decimal integers 0-999 are excluded.
    #[must_use]
    pub fn exclude_numbers(&self) -> bool {
        self.exclude_numbers
    }
}

impl Default for WordFilter {
    fn default() -> Self {
        Self::new(false)
    }
}

/// Matches decimal integers 0-999: one to three ASCII digits.
fn is_small_integer(word: &str) -> bool {
    (1..=3).contains(&word.len()) && word.bytes().all(|b| b.is_ascii_digit())
}
