//! Candidate text preparation for embedding.
//!
//! A place is embedded as one blob: name, description, address, category
//! tags and rating, skipping empty parts, truncated with an ellipsis.

use crate::places::LocationResult;

/// Maximum content length for embedding input (characters, not tokens)
const MAX_CONTENT_LENGTH: usize = 512;

/// Ellipsis suffix when content is truncated
const TRUNCATION_SUFFIX: &str = "...";

/// Build the text embedded for a candidate place.
pub fn candidate_text(place: &LocationResult) -> String {
    let types = place.types.join(" ");
    let rating = place.rating.map(|r| format!("rating {r}")).unwrap_or_default();

    let content = [
        place.name.as_str(),
        place.description.as_str(),
        place.formatted_address.as_str(),
        types.as_str(),
        rating.as_str(),
    ]
    .iter()
    .map(|part| part.trim())
    .filter(|part| !part.is_empty())
    .collect::<Vec<_>>()
    .join(" ");

    truncate_content(&content)
}

/// Truncate content to MAX_CONTENT_LENGTH, adding ellipsis if truncated.
fn truncate_content(content: &str) -> String {
    if content.chars().count() <= MAX_CONTENT_LENGTH {
        return content.to_string();
    }

    let max_chars = MAX_CONTENT_LENGTH - TRUNCATION_SUFFIX.len();
    let truncated: String = content.chars().take(max_chars).collect();

    format!("{}{}", truncated, TRUNCATION_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn place() -> LocationResult {
        LocationResult {
            place_id: "p".into(),
            name: "Quiet Reads".into(),
            description: "Bookstores, Coffee & Tea".into(),
            formatted_address: "12 Elm St".into(),
            rating: Some(4.5),
            types: vec!["bookstores".into(), "coffee".into()],
            ..Default::default()
        }
    }

    #[test]
    fn test_all_parts_joined_in_order() {
        assert_eq!(
            candidate_text(&place()),
            "Quiet Reads Bookstores, Coffee & Tea 12 Elm St bookstores coffee rating 4.5"
        );
    }

    #[test]
    fn test_empty_parts_are_skipped() {
        let sparse = LocationResult {
            name: "  Solo  ".into(),
            ..Default::default()
        };
        assert_eq!(candidate_text(&sparse), "Solo");
        assert_eq!(candidate_text(&LocationResult::default()), "");
    }

    #[test]
    fn test_truncation() {
        let long = LocationResult {
            name: "é".repeat(600),
            ..Default::default()
        };
        let text = candidate_text(&long);

        assert_eq!(text.chars().count(), MAX_CONTENT_LENGTH);
        assert!(text.ends_with(TRUNCATION_SUFFIX));
    }
}
