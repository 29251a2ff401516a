//! Query understanding: keyword vocabulary, ambiance expansion and
//! business-search parameter extraction.

pub mod enhance;
pub mod keywords;
pub mod places_terms;

pub use enhance::{enhance_query_with_keywords, extract_location_context};
pub use keywords::KeywordIndex;
pub use places_terms::PlaceQuery;
