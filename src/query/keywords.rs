//! Domain vocabulary and case-insensitive keyword matching.
//!
//! The vocabulary is the union of the ambiance, time, occasion, weather,
//! season, group-size and budget term lists. Matching preserves vocabulary
//! order so callers can take a stable prefix of the matches.

use once_cell::sync::Lazy;
use std::collections::HashSet;

pub const AMBIANCE_KEYWORDS: &[&str] = &[
    "cozy",
    "intimate",
    "romantic",
    "quiet",
    "peaceful",
    "calm",
    "lively",
    "energetic",
    "vibrant",
    "bustling",
    "crowded",
    "busy",
    "trendy",
    "hip",
    "modern",
    "traditional",
    "classic",
    "outdoor",
    "patio",
    "rooftop",
    "garden",
    "terrace",
    "dim",
    "bright",
    "warm",
    "cool",
    "ambient",
    "atmospheric",
];

pub const TIME_KEYWORDS: &[&str] = &[
    "morning",
    "afternoon",
    "evening",
    "night",
    "dawn",
    "dusk",
    "breakfast",
    "lunch",
    "dinner",
    "brunch",
    "happy hour",
];

pub const OCCASION_KEYWORDS: &[&str] = &[
    "business",
    "meeting",
    "work",
    "professional",
    "date",
    "romantic",
    "anniversary",
    "valentine",
    "family",
    "kids",
    "children",
    "group",
    "friends",
    "solo",
    "alone",
    "personal",
    "leisure",
    "vacation",
];

pub const WEATHER_KEYWORDS: &[&str] = &[
    "sunny", "rainy", "cloudy", "snowy", "hot", "cold", "warm", "cool",
];

pub const SEASON_KEYWORDS: &[&str] = &["spring", "summer", "fall", "autumn", "winter"];

pub const GROUP_SIZE_KEYWORDS: &[&str] = &[
    "solo", "alone", "couple", "group", "family", "friends", "team", "party",
];

pub const BUDGET_KEYWORDS: &[&str] = &[
    "cheap",
    "budget",
    "affordable",
    "expensive",
    "luxury",
    "high-end",
    "mid-range",
];

/// Ambiance synonym groups used for query expansion.
///
/// A query token equal to a key is replaced by its whole group.
pub const AMBIANCE_SYNONYMS: &[(&str, &[&str])] = &[
    ("cozy", &["cozy", "warm", "intimate", "comfortable", "relaxing"]),
    ("cafe", &["coffee", "cafe", "coffeeshop", "coffeehouse", "espresso"]),
    ("quiet", &["quiet", "peaceful", "serene", "calm", "tranquil"]),
    ("lively", &["lively", "energetic", "vibrant", "bustling", "active"]),
    ("romantic", &["romantic", "intimate", "cozy", "candlelit", "date"]),
    ("work", &["work", "laptop", "wifi", "quiet", "productive"]),
    ("study", &["study", "quiet", "focused", "academic", "library-like"]),
];

/// Look up the synonym group for a single lower-cased token.
pub fn ambiance_synonyms(token: &str) -> Option<&'static [&'static str]> {
    AMBIANCE_SYNONYMS
        .iter()
        .find(|(key, _)| *key == token)
        .map(|(_, group)| *group)
}

static GLOBAL_INDEX: Lazy<KeywordIndex> = Lazy::new(KeywordIndex::new);

/// Precomputed, deduplicated keyword vocabulary.
#[derive(Debug, Clone)]
pub struct KeywordIndex {
    vocabulary: Vec<String>,
}

impl KeywordIndex {
    /// Build the index from the built-in term lists.
    pub fn new() -> Self {
        Self::from_lists(&[
            AMBIANCE_KEYWORDS,
            TIME_KEYWORDS,
            OCCASION_KEYWORDS,
            WEATHER_KEYWORDS,
            SEASON_KEYWORDS,
            GROUP_SIZE_KEYWORDS,
            BUDGET_KEYWORDS,
        ])
    }

    /// Build an index from arbitrary term lists.
    ///
    /// Terms are lower-cased and deduplicated; the first occurrence wins its
    /// position in the vocabulary.
    pub fn from_lists(lists: &[&[&str]]) -> Self {
        let mut seen = HashSet::new();
        let mut vocabulary = Vec::new();

        for term in lists.iter().flat_map(|list| list.iter()) {
            let term = term.to_lowercase();
            if seen.insert(term.clone()) {
                vocabulary.push(term);
            }
        }

        Self { vocabulary }
    }

    /// Shared process-wide index over the built-in vocabulary.
    pub fn global() -> &'static KeywordIndex {
        &GLOBAL_INDEX
    }

    pub fn vocabulary(&self) -> &[String] {
        &self.vocabulary
    }

    pub fn len(&self) -> usize {
        self.vocabulary.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vocabulary.is_empty()
    }

    /// Return every vocabulary term contained in `text`, in vocabulary order.
    pub fn find_keywords(&self, text: &str) -> Vec<&str> {
        let text = text.to_lowercase();

        self.vocabulary
            .iter()
            .filter(|keyword| text.contains(keyword.as_str()))
            .map(String::as_str)
            .collect()
    }
}

impl Default for KeywordIndex {
    fn default() -> Self {
        Self::new()
    }
}
