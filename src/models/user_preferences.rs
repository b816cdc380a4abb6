use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-axis content preference (violence, profanity, ...)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContentPreference {
    Avoid,
    Limit,
    Any,
}

/// Minimum quality bars a candidate's external rating must clear
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RatingThresholds {
    #[serde(default)]
    pub minimum_rating: Option<f64>,
    #[serde(default)]
    pub minimum_review_count: Option<u64>,
}

/// Knobs controlling how adventurous the recommendations get
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct DiscoverySettings {
    #[serde(default)]
    pub include_new_releases: bool,
    #[serde(default)]
    pub include_classics: bool,
    #[serde(default)]
    pub experiment_with_genres: bool,
}

/// Explicit reading preferences supplied per request; owned by a
/// preferences collaborator, not by this pipeline.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct UserPreferences {
    #[serde(default)]
    pub favorite_genres: Vec<String>,
    #[serde(default)]
    pub avoid_genres: Vec<String>,
    #[serde(default)]
    pub preferred_authors: Vec<String>,
    #[serde(default)]
    pub avoid_authors: Vec<String>,
    #[serde(default)]
    pub rating_thresholds: RatingThresholds,
    // BTreeMap keeps serialization order stable for cache key hashing
    #[serde(default)]
    pub content_preferences: BTreeMap<String, ContentPreference>,
    #[serde(default)]
    pub discovery_settings: DiscoverySettings,
}

impl UserPreferences {
    pub fn is_favorite_genre(&self, genre: &str) -> bool {
        self.favorite_genres.iter().any(|g| g.eq_ignore_ascii_case(genre))
    }

    pub fn is_avoided_genre(&self, genre: &str) -> bool {
        self.avoid_genres.iter().any(|g| g.eq_ignore_ascii_case(genre))
    }

    pub fn is_avoided_author(&self, author: &str) -> bool {
        self.avoid_authors.iter().any(|a| a.eq_ignore_ascii_case(author))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_empty_body() {
        let prefs: UserPreferences = serde_json::from_str("{}").unwrap();
        assert!(prefs.favorite_genres.is_empty());
        assert!(prefs.rating_thresholds.minimum_rating.is_none());
        assert!(!prefs.discovery_settings.include_classics);
    }

    #[test]
    fn test_genre_matching_is_case_insensitive() {
        let prefs = UserPreferences {
            favorite_genres: vec!["Science Fiction".to_string()],
            avoid_genres: vec!["Horror".to_string()],
            ..Default::default()
        };

        assert!(prefs.is_favorite_genre("science fiction"));
        assert!(prefs.is_avoided_genre("HORROR"));
        assert!(!prefs.is_avoided_genre("Fantasy"));
    }

    #[test]
    fn test_avoided_author() {
        let prefs = UserPreferences {
            avoid_authors: vec!["Some Author".to_string()],
            ..Default::default()
        };

        assert!(prefs.is_avoided_author("some author"));
        assert!(!prefs.is_avoided_author("Another Author"));
    }

    #[test]
    fn test_content_preference_wire_names() {
        let parsed: ContentPreference = serde_json::from_str(r#""avoid""#).unwrap();
        assert_eq!(parsed, ContentPreference::Avoid);
    }
}
