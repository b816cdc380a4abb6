use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Display;

/// How a reader's collection is distributed across genres, authors and series
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ReadingStyle {
    #[serde(rename = "eclectic")]
    Eclectic,
    #[serde(rename = "series-focused")]
    SeriesFocused,
    #[serde(rename = "author-loyal")]
    AuthorLoyal,
    #[serde(rename = "genre-focused")]
    GenreFocused,
    /// No books detected; no personalization possible
    #[serde(rename = "unknown")]
    Unknown,
}

impl Display for ReadingStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ReadingStyle::Eclectic => "eclectic",
            ReadingStyle::SeriesFocused => "series-focused",
            ReadingStyle::AuthorLoyal => "author-loyal",
            ReadingStyle::GenreFocused => "genre-focused",
            ReadingStyle::Unknown => "unknown",
        };
        write!(f, "{}", s)
    }
}

/// One of the profile's top genres, with its share of the collection
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GenreShare {
    pub genre: String,
    pub count: usize,
    /// Share of the collection in percent, e.g. 100.0
    pub percentage: f64,
}

/// Derived summary of a reader's detected collection. Immutable per request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReadingProfile {
    pub total_books: usize,
    pub genre_counts: HashMap<String, usize>,
    pub author_counts: HashMap<String, usize>,
    pub series_counts: HashMap<String, usize>,
    pub average_confidence: f64,
    /// Top 5 genres by count, ties broken by first-seen order
    pub top_genres: Vec<GenreShare>,
    /// Top 5 authors by count, ties broken by first-seen order
    pub top_authors: Vec<String>,
    pub reading_style: ReadingStyle,
    /// Distinct-genre count over total books, in [0, 1]
    pub diversity: f64,
}

impl ReadingProfile {
    /// Zero-value profile for empty input; callers treat this as
    /// "no personalization possible", not as an error.
    pub fn empty() -> Self {
        Self {
            total_books: 0,
            genre_counts: HashMap::new(),
            author_counts: HashMap::new(),
            series_counts: HashMap::new(),
            average_confidence: 0.0,
            top_genres: Vec::new(),
            top_authors: Vec::new(),
            reading_style: ReadingStyle::Unknown,
            diversity: 0.0,
        }
    }

    /// Whether a genre is one of the profile's top genres
    pub fn has_top_genre(&self, genre: &str) -> bool {
        self.top_genres.iter().any(|g| g.genre == genre)
    }

    /// Percentage share of a top genre, if present
    pub fn top_genre_percentage(&self, genre: &str) -> Option<f64> {
        self.top_genres
            .iter()
            .find(|g| g.genre == genre)
            .map(|g| g.percentage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_style_wire_names() {
        let json = serde_json::to_string(&ReadingStyle::SeriesFocused).unwrap();
        assert_eq!(json, r#""series-focused""#);

        let parsed: ReadingStyle = serde_json::from_str(r#""eclectic""#).unwrap();
        assert_eq!(parsed, ReadingStyle::Eclectic);
    }

    #[test]
    fn test_empty_profile() {
        let profile = ReadingProfile::empty();
        assert_eq!(profile.total_books, 0);
        assert_eq!(profile.diversity, 0.0);
        assert_eq!(profile.reading_style, ReadingStyle::Unknown);
        assert!(!profile.has_top_genre("Fantasy"));
    }

    #[test]
    fn test_top_genre_lookup() {
        let mut profile = ReadingProfile::empty();
        profile.top_genres.push(GenreShare {
            genre: "Mystery".to_string(),
            count: 3,
            percentage: 60.0,
        });

        assert!(profile.has_top_genre("Mystery"));
        assert_eq!(profile.top_genre_percentage("Mystery"), Some(60.0));
        assert_eq!(profile.top_genre_percentage("Romance"), None);
    }
}
