//! Turns a raw query plus notes into business-search parameters.
//!
//! Used by the business-search provider and the `/api/locations` proxy:
//! - location: notes first, then the query, then the caller's own location
//! - category: first term of [`CATEGORY_MAP`] found in the query or notes
//! - search term: the query minus city names and explicit venue words

use once_cell::sync::Lazy;
use regex::Regex;

/// Term to business category alias. Order matters for substring matching.
pub const CATEGORY_MAP: &[(&str, &str)] = &[
    ("coffee", "coffee"),
    ("cafe", "coffee"),
    ("coffeeshop", "coffee"),
    ("coffeehouse", "coffee"),
    ("espresso", "coffee"),
    ("cappuccino", "coffee"),
    ("latte", "coffee"),
    ("mocha", "coffee"),
    ("americano", "coffee"),
    ("restaurant", "restaurants"),
    ("food", "restaurants"),
    ("dining", "restaurants"),
    ("meal", "restaurants"),
    ("lunch", "restaurants"),
    ("dinner", "restaurants"),
    ("breakfast", "restaurants"),
    ("brunch", "restaurants"),
    ("bar", "bars"),
    ("pub", "bars"),
    ("brewery", "breweries"),
    ("wine", "wine_bars"),
    ("cocktail", "cocktailbars"),
    ("drinks", "bars"),
    ("alcohol", "bars"),
    ("tea", "tea_rooms"),
    ("teahouse", "tea_rooms"),
    ("matcha", "tea_rooms"),
    ("boba", "bubble_tea"),
    ("bubbletea", "bubble_tea"),
    ("smoothie", "juice_bars"),
    ("juice", "juice_bars"),
    ("study", "study_spaces"),
    ("work", "coworking"),
    ("coworking", "coworking"),
    ("workspace", "coworking"),
    ("library", "libraries"),
    ("quiet", "libraries"),
    ("bookstore", "bookstores"),
    ("books", "bookstores"),
    ("reading", "bookstores"),
    ("record", "music_stores"),
    ("vinyl", "music_stores"),
    ("music", "music_venues"),
    ("club", "nightlife"),
    ("nightlife", "nightlife"),
    ("karaoke", "karaoke"),
    ("pool", "billiards"),
    ("arcade", "arcades"),
    ("bowling", "bowling"),
    ("casino", "casinos"),
    ("massage", "massage"),
    ("wellness", "wellness"),
    ("meditation", "wellness"),
    ("yoga", "yoga"),
    ("pilates", "fitness"),
    ("pizza", "pizza"),
    ("sushi", "sushi"),
    ("ice_cream", "ice_cream"),
    ("icecream", "ice_cream"),
    ("dessert", "desserts"),
    ("bakery", "bakeries"),
    ("pastry", "bakeries"),
    ("deli", "delis"),
    ("sandwich", "delis"),
    ("hiking", "hiking"),
    ("trail", "hiking"),
    ("garden", "gardens"),
    ("botanical", "gardens"),
    ("zoo", "zoos"),
    ("aquarium", "aquariums"),
    ("mini_golf", "mini_golf"),
    ("golf", "golf"),
    ("laundry", "laundromats"),
    ("dry_cleaning", "dry_cleaning"),
    ("auto", "auto_services"),
    ("mechanic", "auto_services"),
    ("pet", "pet_services"),
    ("veterinarian", "veterinarians"),
    ("vet", "veterinarians"),
    ("airport", "airports"),
    ("train", "train_stations"),
    ("subway", "train_stations"),
    ("metro", "train_stations"),
    ("bus", "bus_stations"),
    ("taxi", "transportation"),
    ("uber", "transportation"),
    ("cozy", "cozy_spaces"),
    ("romantic", "romantic"),
    ("date", "date_spots"),
    ("family", "family_friendly"),
    ("kids", "family_friendly"),
    ("outdoor", "outdoor_dining"),
    ("rooftop", "rooftop"),
    ("view", "scenic_views"),
    ("waterfront", "waterfront"),
    ("historic", "historic"),
    ("modern", "modern"),
    ("vintage", "vintage"),
    ("hipster", "trendy"),
    ("trendy", "trendy"),
    ("upscale", "upscale"),
    ("casual", "casual"),
    ("hotel", "hotels"),
    ("shopping", "shopping"),
    ("retail", "shopping"),
    ("store", "shopping"),
    ("market", "shopping"),
    ("grocery", "grocery"),
    ("gas", "gas_stations"),
    ("parking", "parking"),
    ("bank", "banks"),
    ("atm", "banks"),
    ("pharmacy", "pharmacy"),
    ("hospital", "hospitals"),
    ("doctor", "hospitals"),
    ("dentist", "dentists"),
    ("gym", "fitness"),
    ("fitness", "fitness"),
    ("spa", "beautysvc"),
    ("salon", "beautysvc"),
    ("beauty", "beautysvc"),
    ("movie", "movietheaters"),
    ("theater", "movietheaters"),
    ("cinema", "movietheaters"),
    ("museum", "museums"),
    ("art", "museums"),
    ("park", "parks"),
    ("beach", "beaches"),
    ("school", "education"),
    ("university", "education"),
    ("college", "education"),
];

/// Venue words removed from the search term; ambiance words are kept.
const EXPLICIT_CATEGORY_TERMS: &[&str] = &[
    "coffee",
    "cafe",
    "coffeeshop",
    "coffeehouse",
    "espresso",
    "restaurant",
    "food",
    "dining",
    "bar",
    "pub",
    "brewery",
    "wine",
    "cocktail",
    "hotel",
    "shopping",
    "store",
    "market",
];

/// Search terms shorter than this fall back to the raw query.
const MIN_SEARCH_TERM_LEN: usize = 3;

/// City aliases with the display name sent to the business search.
static CITY_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"(?i)\b(?:washington dc|washington|dc)\b", "Washington DC"),
        (r"(?i)\b(?:san francisco|sf|bay area)\b", "San Francisco, CA"),
        (r"(?i)\b(?:new york|nyc|manhattan)\b", "New York, NY"),
        (r"(?i)\b(?:los angeles|la|hollywood)\b", "Los Angeles, CA"),
        (r"(?i)\b(?:chicago|chi)\b", "Chicago, IL"),
        (r"(?i)\b(?:boston|beantown)\b", "Boston, MA"),
        (r"(?i)\b(?:seattle|emerald city)\b", "Seattle, WA"),
        (r"(?i)\b(?:miami|south beach)\b", "Miami, FL"),
        (r"(?i)\b(?:denver|mile high)\b", "Denver, CO"),
    ]
    .into_iter()
    .map(|(pattern, name)| {
        (
            Regex::new(pattern).expect("city pattern must compile"),
            name,
        )
    })
    .collect()
});

static EXPLICIT_CATEGORY_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    EXPLICIT_CATEGORY_TERMS
        .iter()
        .map(|term| Regex::new(&format!(r"(?i)\b{term}\b")).expect("term pattern must compile"))
        .collect()
});

static WHITESPACE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("whitespace pattern must compile"));

/// Parameters for one business-search request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlaceQuery {
    pub location: String,
    pub category: Option<&'static str>,
    pub term: String,
}

impl PlaceQuery {
    pub fn parse(query: &str, user_location: Option<&str>, notes: Option<&str>) -> Self {
        let mut location = notes.map(|n| extract_location(n, None)).unwrap_or_default();
        if location.is_empty() {
            location = extract_location(query, user_location);
        }

        Self {
            location,
            category: extract_category(query, notes),
            term: clean_search_terms(query),
        }
    }
}

/// First known city in `text`, else `user_location`, else empty.
pub fn extract_location(text: &str, user_location: Option<&str>) -> String {
    CITY_PATTERNS
        .iter()
        .find(|(pattern, _)| pattern.is_match(text))
        .map(|(_, name)| name.to_string())
        .or_else(|| user_location.map(str::to_string))
        .unwrap_or_default()
}

/// Pick a business category.
///
/// Exact query words win over substrings; the notes are only consulted when
/// the query yields nothing.
pub fn extract_category(query: &str, notes: Option<&str>) -> Option<&'static str> {
    let query = query.to_lowercase();

    let exact = query.split_whitespace().find_map(|word| {
        CATEGORY_MAP
            .iter()
            .find(|(term, _)| *term == word)
            .map(|(_, category)| *category)
    });

    exact
        .or_else(|| substring_category(&query))
        .or_else(|| notes.and_then(|n| substring_category(&n.to_lowercase())))
}

fn substring_category(text: &str) -> Option<&'static str> {
    CATEGORY_MAP
        .iter()
        .find(|(term, _)| text.contains(term))
        .map(|(_, category)| *category)
}

/// Strip city names and explicit venue words from the query.
pub fn clean_search_terms(query: &str) -> String {
    let mut term = query.to_string();

    for (pattern, _) in CITY_PATTERNS.iter() {
        term = pattern.replace_all(&term, "").trim().to_string();
    }
    for pattern in EXPLICIT_CATEGORY_PATTERNS.iter() {
        term = pattern.replace_all(&term, "").trim().to_string();
    }

    let term = WHITESPACE.replace_all(&term, " ").trim().to_string();

    if term.len() < MIN_SEARCH_TERM_LEN {
        return query.to_string();
    }
    term
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_prefers_notes() {
        let parsed = PlaceQuery::parse("coffee in boston", None, Some("trip: sf"));
        assert_eq!(parsed.location, "San Francisco, CA");
    }

    #[test]
    fn test_location_falls_back_to_query_then_user() {
        let parsed = PlaceQuery::parse("coffee in boston", Some("Austin, TX"), Some("nothing"));
        assert_eq!(parsed.location, "Boston, MA");

        let parsed = PlaceQuery::parse("coffee", Some("Austin, TX"), None);
        assert_eq!(parsed.location, "Austin, TX");

        let parsed = PlaceQuery::parse("coffee", None, None);
        assert_eq!(parsed.location, "");
    }

    #[test]
    fn test_city_aliases() {
        assert_eq!(extract_location("a night in manhattan", None), "New York, NY");
        assert_eq!(extract_location("bay area brunch", None), "San Francisco, CA");
        assert_eq!(extract_location("relaxing place", None), "");
    }

    #[test]
    fn test_category_exact_word_first() {
        // "tea" is an exact word; "coffee" only appears as a substring
        assert_eq!(extract_category("tea or coffeeish", None), Some("tea_rooms"));
    }

    #[test]
    fn test_category_substring_in_query() {
        assert_eq!(extract_category("pizzas nearby", None), Some("pizza"));
    }

    #[test]
    fn test_category_from_notes_when_query_has_none() {
        assert_eq!(extract_category("somewhere nice", Some("want SUSHI")), Some("sushi"));
        assert_eq!(extract_category("somewhere nice", None), None);
    }

    #[test]
    fn test_clean_search_terms_keeps_ambiance() {
        assert_eq!(clean_search_terms("cozy coffee shop in nyc"), "cozy shop in");
    }

    #[test]
    fn test_clean_search_terms_short_result_falls_back() {
        assert_eq!(clean_search_terms("sf cafe"), "sf cafe");
    }
}
