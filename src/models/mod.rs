use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Display;

pub mod profile;
pub mod user_preferences;

pub use profile::{GenreShare, ReadingProfile, ReadingStyle};
pub use user_preferences::{
    ContentPreference, DiscoverySettings, RatingThresholds, UserPreferences,
};

/// A book detected on the reader's shelf by the vision collaborator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectedBook {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub series: Option<String>,
    /// Detection confidence in [0, 1]
    #[serde(default = "default_detection_confidence")]
    pub confidence: f64,
}

fn default_detection_confidence() -> f64 {
    1.0
}

/// Which subsystem produced a candidate
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RecommendationSource {
    #[serde(rename = "ai-generated")]
    AiGenerated,
    #[serde(rename = "goodreads-popular")]
    GoodreadsPopular,
    #[serde(rename = "rule-based-genre")]
    RuleBasedGenre,
    #[serde(rename = "rule-based-discovery")]
    RuleBasedDiscovery,
}

impl Display for RecommendationSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RecommendationSource::AiGenerated => "ai-generated",
            RecommendationSource::GoodreadsPopular => "goodreads-popular",
            RecommendationSource::RuleBasedGenre => "rule-based-genre",
            RecommendationSource::RuleBasedDiscovery => "rule-based-discovery",
        };
        write!(f, "{}", s)
    }
}

/// How the Combiner admitted a candidate. Explainability metadata only;
/// the Scorer must never read this.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum CombinationSource {
    #[serde(rename = "ai-primary")]
    AiPrimary,
    #[serde(rename = "goodreads-diversity")]
    GoodreadsDiversity,
    #[serde(rename = "mixed-fill")]
    MixedFill,
}

/// Rating data attached by the catalog source
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExternalRatingData {
    pub rating: f64,
    pub ratings_count: u64,
    #[serde(default)]
    pub awards: Vec<String>,
}

/// Metadata attached by the optional enrichment service
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct BookMetadata {
    #[serde(default)]
    pub isbn: Option<String>,
    #[serde(default)]
    pub page_count: Option<u32>,
    #[serde(default)]
    pub average_rating: Option<f64>,
    #[serde(default)]
    pub ratings_count: Option<u64>,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A recommended book. `final_score` is absent until the Scorer runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recommendation {
    pub title: String,
    pub author: String,
    pub genre: String,
    pub reason: String,
    /// Source-assigned confidence in [0, 1]
    pub confidence: f64,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    pub source: RecommendationSource,
    #[serde(default)]
    pub external_rating_data: Option<ExternalRatingData>,
    #[serde(default)]
    pub metadata: Option<BookMetadata>,
    #[serde(default)]
    pub combination_source: Option<CombinationSource>,
    #[serde(default)]
    pub final_score: Option<f64>,
}

impl Recommendation {
    /// Case-folded, whitespace-collapsed title used for deduplication
    pub fn normalized_title(&self) -> String {
        normalize_title(&self.title)
    }
}

/// Case-folds and collapses whitespace so "The  HOBBIT " == "the hobbit"
pub fn normalize_title(title: &str) -> String {
    title
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Raw record from the external book-catalog service
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogBook {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    pub rating: f64,
    pub ratings_count: u64,
    #[serde(default)]
    pub awards: Vec<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
}

impl From<CatalogBook> for Recommendation {
    fn from(book: CatalogBook) -> Self {
        let confidence = (book.rating / 5.0).min(0.9);
        let reason = format!(
            "Popular on Goodreads with a {:.1} rating across {} reviews",
            book.rating, book.ratings_count
        );

        Recommendation {
            title: book.title,
            author: book.author.unwrap_or_else(|| "Unknown".to_string()),
            genre: book.genre.unwrap_or_else(|| "General".to_string()),
            reason,
            confidence,
            themes: Vec::new(),
            publication_year: book.publication_year,
            source: RecommendationSource::GoodreadsPopular,
            external_rating_data: Some(ExternalRatingData {
                rating: book.rating,
                ratings_count: book.ratings_count,
                awards: book.awards,
            }),
            metadata: None,
            combination_source: None,
            final_score: None,
        }
    }
}

/// One entry of the LLM's structured output. Every field except `title`
/// is tolerated missing.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmRecommendationEntry {
    pub title: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub genre: Option<String>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub themes: Vec<String>,
    #[serde(default)]
    pub similar_to: Option<String>,
    #[serde(default)]
    pub publication_year: Option<i32>,
    #[serde(default)]
    pub difficulty_level: Option<String>,
}

impl From<LlmRecommendationEntry> for Recommendation {
    fn from(entry: LlmRecommendationEntry) -> Self {
        let confidence = entry.confidence.unwrap_or(0.7).clamp(0.1, 1.0);
        let reason = entry.reason.unwrap_or_else(|| match &entry.similar_to {
            Some(similar) => format!("Similar to {}", similar),
            None => "Matches your reading profile".to_string(),
        });

        Recommendation {
            title: entry.title,
            author: entry.author.unwrap_or_else(|| "Unknown".to_string()),
            genre: entry.genre.unwrap_or_else(|| "General".to_string()),
            reason,
            confidence,
            themes: entry.themes,
            publication_year: entry.publication_year,
            source: RecommendationSource::AiGenerated,
            external_rating_data: None,
            metadata: None,
            combination_source: None,
            final_score: None,
        }
    }
}

/// Per-request knobs supplied by the caller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationOptions {
    #[serde(default = "default_max_recommendations")]
    pub max_recommendations: usize,
    #[serde(default)]
    pub enrich_metadata: bool,
    #[serde(default)]
    pub bypass_cache: bool,
}

fn default_max_recommendations() -> usize {
    20
}

impl Default for RecommendationOptions {
    fn default() -> Self {
        Self {
            max_recommendations: default_max_recommendations(),
            enrich_metadata: false,
            bypass_cache: false,
        }
    }
}

/// Human-readable explanation block of the response envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Explanations {
    pub why: String,
    pub top_genres: Vec<String>,
    pub reading_style: String,
}

/// Envelope metadata block
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResponseMetadata {
    pub total_recommendations: usize,
    pub processing_time_ms: u64,
    pub timestamp: DateTime<Utc>,
    pub confidence: f64,
    pub based_on_books: usize,
    pub from_cache: bool,
}

/// Full response envelope handed to the HTTP layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecommendationResponse {
    pub recommendations: Vec<Recommendation>,
    pub reading_profile: ReadingProfile,
    pub explanations: Explanations,
    pub metadata: ResponseMetadata,
}
