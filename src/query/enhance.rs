//! Query expansion from ambiance synonyms, note locations and note keywords.
//!
//! Everything here is pure string work; no I/O.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::query::keywords::{ambiance_synonyms, KeywordIndex};

/// How many note keywords are appended to an enhanced query.
pub const MAX_NOTE_KEYWORDS: usize = 3;

/// Tokens that trigger the cafe bias rule.
const COZINESS_TRIGGERS: &[&str] = &[
    "cozy",
    "cute",
    "warm",
    "intimate",
    "comfortable",
    "relaxing",
];

/// Tokens that suppress the cafe bias rule when already present.
const CAFE_TERMS: &[&str] = &["cafe", "coffee", "coffeeshop"];

const CAFE_BIAS_SUFFIX: &str = "coffee cafe";

/// Known-city patterns, tried in order. The first pattern to match anywhere
/// in the notes wins.
static LOCATION_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)trip:\s*(?:washington\s+dc|san\s+francisco|new\s+york|los\s+angeles|chicago|boston|seattle|miami|denver)",
        r"(?i)\b(?:washington\s+dc|san\s+francisco|new\s+york|los\s+angeles|chicago|boston|seattle|miami|denver)\b",
        r"(?i)\b(?:dc|sf|nyc|la|chi|boston|seattle|miami|denver)\b",
    ]
    .iter()
    .map(|pattern| Regex::new(pattern).expect("location pattern must compile"))
    .collect()
});

static TRIP_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^trip:\s*").expect("trip prefix pattern must compile"));

/// Abbreviation to display name.
const LOCATION_NAMES: &[(&str, &str)] = &[
    ("dc", "Washington DC"),
    ("sf", "San Francisco, CA"),
    ("nyc", "New York, NY"),
    ("la", "Los Angeles, CA"),
    ("chi", "Chicago, IL"),
    ("boston", "Boston, MA"),
    ("seattle", "Seattle, WA"),
    ("miami", "Miami, FL"),
    ("denver", "Denver, CO"),
];

/// Find the trip location mentioned in `notes`.
///
/// Returns the canonical display name when the match is a known
/// abbreviation, the matched text otherwise, and an empty string when no
/// pattern matches.
pub fn extract_location_context(notes: &str) -> String {
    for pattern in LOCATION_PATTERNS.iter() {
        let Some(found) = pattern.find(notes) else {
            continue;
        };

        let matched = TRIP_PREFIX.replace(found.as_str(), "");
        let matched = matched.trim();
        let key = matched.to_lowercase();

        return LOCATION_NAMES
            .iter()
            .find(|(abbr, _)| *abbr == key)
            .map(|(_, name)| name.to_string())
            .unwrap_or_else(|| matched.to_string());
    }

    String::new()
}

/// Expand each query token into its ambiance synonym group.
///
/// Unknown tokens pass through unchanged. See [`cafe_bias`] for the one
/// extra rule applied on top of the expansion.
pub fn extract_ambiance_terms(query: &str) -> String {
    let tokens: Vec<&str> = query.split_whitespace().collect();
    let lowered: Vec<String> = tokens.iter().map(|t| t.to_lowercase()).collect();

    let mut terms: Vec<String> = tokens
        .iter()
        .zip(&lowered)
        .map(|(token, lower)| match ambiance_synonyms(lower) {
            Some(group) => group.join(" "),
            None => token.to_string(),
        })
        .collect();

    if let Some(suffix) = cafe_bias(&lowered) {
        terms.push(suffix.to_string());
    }

    terms.join(" ")
}

/// Cafe bias rule: coziness words steer the search toward cafes unless the
/// query already names one.
fn cafe_bias(tokens: &[String]) -> Option<&'static str> {
    let cozy = tokens.iter().any(|t| COZINESS_TRIGGERS.contains(&t.as_str()));
    let has_cafe = tokens.iter().any(|t| CAFE_TERMS.contains(&t.as_str()));

    (cozy && !has_cafe).then_some(CAFE_BIAS_SUFFIX)
}

/// Compose the ambiance expansion, the note location and the first
/// [`MAX_NOTE_KEYWORDS`] keywords found in the notes.
pub fn enhance_query_with_keywords(query: &str, notes: &str) -> String {
    let ambiance = extract_ambiance_terms(query);
    let location = extract_location_context(notes);
    let keywords = KeywordIndex::global()
        .find_keywords(notes)
        .into_iter()
        .take(MAX_NOTE_KEYWORDS)
        .collect::<Vec<_>>()
        .join(" ");

    [ambiance, location, keywords]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
