use std::sync::Arc;
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Deserialize;
use serde_json::json;

use crate::{
    error::{AppError, AppResult},
    models::{
        DetectedBook, LlmRecommendationEntry, ReadingProfile, Recommendation, UserPreferences,
    },
    services::rules,
};

/// Detected books embedded in the prompt, capped to bound token cost
const PROMPT_BOOK_LIMIT: usize = 20;

const SYSTEM_PROMPT: &str = "You are a book recommendation assistant. \
Respond with a single JSON object and nothing else. Schema: \
{\"recommendations\": [{\"title\", \"author\", \"genre\", \"reason\", \
\"confidence\", \"themes\", \"similar_to\", \"publication_year\", \
\"difficulty_level\"}], \"reasoning\": {}}";

/// Seam to the LLM completion service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CompletionClient: Send + Sync {
    /// Issues one completion request and returns the raw response text
    async fn complete(&self, system: &str, user: &str) -> AppResult<String>;
}

/// OpenAI-style chat completions provider
pub struct OpenAiCompletionClient {
    http_client: HttpClient,
    api_key: String,
    api_url: String,
    model: String,
}

impl OpenAiCompletionClient {
    pub fn new(api_key: String, api_url: String, model: String, timeout: Duration) -> Self {
        Self {
            http_client: HttpClient::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_key,
            api_url,
            model,
        }
    }
}

#[async_trait::async_trait]
impl CompletionClient for OpenAiCompletionClient {
    async fn complete(&self, system: &str, user: &str) -> AppResult<String> {
        let url = format!("{}/v1/chat/completions", self.api_url);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&json!({
                "model": self.model,
                "messages": [
                    { "role": "system", "content": system },
                    { "role": "user", "content": user },
                ],
            }))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Completion API returned status {}: {}",
                status, body
            )));
        }

        #[derive(Deserialize)]
        struct ChatResponse {
            choices: Vec<ChatChoice>,
        }

        #[derive(Deserialize)]
        struct ChatChoice {
            message: ChatMessage,
        }

        #[derive(Deserialize)]
        struct ChatMessage {
            content: String,
        }

        let chat: ChatResponse = response.json().await?;

        chat.choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| AppError::ExternalApi("Completion response had no choices".to_string()))
    }
}

/// Outcome of parsing the LLM's free-form text. The shape is never
/// assumed without validation.
#[derive(Debug)]
pub enum ParsedLlmResponse {
    Recommendations(Vec<Recommendation>),
    Malformed(String),
}

#[derive(Deserialize)]
struct LlmResponseBody {
    recommendations: Vec<LlmRecommendationEntry>,
}

/// Extracts the first top-level JSON object from free text, tolerating
/// markdown fencing and surrounding prose
fn extract_first_json_object(text: &str) -> Option<&str> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut start = None;
    for (i, &b) in bytes.iter().enumerate() {
        if b == b'{' {
            if depth == 0 {
                start = Some(i);
            }
            depth += 1;
        } else if b == b'}' {
            if depth > 0 {
                depth -= 1;
            }
            if depth == 0 {
                if let Some(st) = start {
                    return text.get(st..=i);
                }
            }
        }
    }
    None
}

/// Pure parser/validator for the LLM's output
pub fn parse_llm_response(text: &str) -> ParsedLlmResponse {
    let body: Option<LlmResponseBody> = match serde_json::from_str(text) {
        Ok(body) => Some(body),
        Err(_) => extract_first_json_object(text).and_then(|obj| serde_json::from_str(obj).ok()),
    };

    match body {
        Some(body) => {
            let recommendations: Vec<Recommendation> = body
                .recommendations
                .into_iter()
                .filter(|entry| !entry.title.trim().is_empty())
                .map(Recommendation::from)
                .collect();
            ParsedLlmResponse::Recommendations(recommendations)
        }
        None => ParsedLlmResponse::Malformed(text.to_string()),
    }
}

/// Profile-conditioned LLM candidate generator with a rule-based fallback.
///
/// A single request, no retries by default; any failure silently falls
/// back to the curated tables. The caller never learns which path fired.
pub struct LanguageModelRecommender {
    client: Arc<dyn CompletionClient>,
    max_retries: u32,
}

impl LanguageModelRecommender {
    pub fn new(client: Arc<dyn CompletionClient>, max_retries: u32) -> Self {
        Self {
            client,
            max_retries,
        }
    }

    /// Generates candidates. Infallible from the caller's view: LLM
    /// failures are logged and answered with rule-based candidates.
    pub async fn recommend(
        &self,
        books: &[DetectedBook],
        profile: &ReadingProfile,
        preferences: &UserPreferences,
        count: usize,
    ) -> Vec<Recommendation> {
        let prompt = build_prompt(books, profile, preferences, count);

        match self.complete_with_retries(&prompt).await {
            Ok(text) => match parse_llm_response(&text) {
                ParsedLlmResponse::Recommendations(recs) if !recs.is_empty() => {
                    tracing::info!(count = recs.len(), "LLM recommendations parsed");
                    recs
                }
                ParsedLlmResponse::Recommendations(_) => {
                    tracing::warn!("LLM returned no usable entries, falling back to rules");
                    rules::recommend(profile, count)
                }
                ParsedLlmResponse::Malformed(raw) => {
                    tracing::warn!(
                        raw_len = raw.len(),
                        "LLM response was not valid JSON, falling back to rules"
                    );
                    rules::recommend(profile, count)
                }
            },
            Err(e) => {
                tracing::warn!(error = %e, "LLM call failed, falling back to rules");
                rules::recommend(profile, count)
            }
        }
    }

    async fn complete_with_retries(&self, prompt: &str) -> AppResult<String> {
        let mut last_err = None;
        for attempt in 0..=self.max_retries {
            match self.client.complete(SYSTEM_PROMPT, prompt).await {
                Ok(text) => return Ok(text),
                Err(e) => {
                    if attempt < self.max_retries {
                        tracing::debug!(attempt = attempt + 1, error = %e, "Retrying LLM call");
                    }
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| AppError::Internal("No LLM attempt made".to_string())))
    }
}

/// Builds the single user prompt: top detected books by confidence,
/// profile summary, and preferences
fn build_prompt(
    books: &[DetectedBook],
    profile: &ReadingProfile,
    preferences: &UserPreferences,
    count: usize,
) -> String {
    let mut by_confidence: Vec<&DetectedBook> = books.iter().collect();
    by_confidence.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    let shelf: Vec<String> = by_confidence
        .iter()
        .take(PROMPT_BOOK_LIMIT)
        .map(|b| match (&b.author, &b.genre) {
            (Some(author), Some(genre)) => format!("- {} by {} ({})", b.title, author, genre),
            (Some(author), None) => format!("- {} by {}", b.title, author),
            (None, Some(genre)) => format!("- {} ({})", b.title, genre),
            (None, None) => format!("- {}", b.title),
        })
        .collect();

    let top_genres: Vec<String> = profile
        .top_genres
        .iter()
        .map(|g| format!("{} ({:.0}%)", g.genre, g.percentage))
        .collect();

    format!(
        "Recommend {count} books this reader has not read.\n\n\
         Books on their shelf:\n{shelf}\n\n\
         Reading profile: style={style}, diversity={diversity:.2}, \
         top genres: {genres}, top authors: {authors}\n\n\
         Favorite genres: {favorites}\nAvoid genres: {avoid}\n\
         Preferred authors: {preferred}\n\
         Experiment with new genres: {experiment}",
        count = count,
        shelf = shelf.join("\n"),
        style = profile.reading_style,
        diversity = profile.diversity,
        genres = top_genres.join(", "),
        authors = profile.top_authors.join(", "),
        favorites = preferences.favorite_genres.join(", "),
        avoid = preferences.avoid_genres.join(", "),
        preferred = preferences.preferred_authors.join(", "),
        experiment = preferences.discovery_settings.experiment_with_genres,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecommendationSource;
    use crate::services::profile;

    fn shelf() -> Vec<DetectedBook> {
        vec![
            DetectedBook {
                title: "Dune".to_string(),
                author: Some("Frank Herbert".to_string()),
                genre: Some("Science Fiction".to_string()),
                series: None,
                confidence: 0.9,
            },
            DetectedBook {
                title: "1984".to_string(),
                author: Some("George Orwell".to_string()),
                genre: Some("Science Fiction".to_string()),
                series: None,
                confidence: 0.9,
            },
        ]
    }

    #[test]
    fn test_extract_json_object_plain() {
        let text = r#"{"recommendations": []}"#;
        assert_eq!(extract_first_json_object(text), Some(text));
    }

    #[test]
    fn test_extract_json_object_fenced() {
        let text = "```json\n{\"recommendations\": []}\n```";
        assert_eq!(
            extract_first_json_object(text),
            Some(r#"{"recommendations": []}"#)
        );
    }

    #[test]
    fn test_extract_json_object_nested_braces() {
        let text = "noise {\"a\": {\"b\": 1}} trailing";
        assert_eq!(extract_first_json_object(text), Some(r#"{"a": {"b": 1}}"#));
    }

    #[test]
    fn test_parse_well_formed_response() {
        let text = r#"{"recommendations": [
            {"title": "Hyperion", "author": "Dan Simmons", "genre": "Science Fiction",
             "reason": "Epic space opera", "confidence": 0.85,
             "themes": ["space"], "publication_year": 1989}
        ], "reasoning": {"note": "classic pick"}}"#;

        match parse_llm_response(text) {
            ParsedLlmResponse::Recommendations(recs) => {
                assert_eq!(recs.len(), 1);
                assert_eq!(recs[0].title, "Hyperion");
                assert_eq!(recs[0].source, RecommendationSource::AiGenerated);
            }
            ParsedLlmResponse::Malformed(_) => panic!("expected parsed recommendations"),
        }
    }

    #[test]
    fn test_parse_fenced_response() {
        let text = "Here you go:\n```json\n{\"recommendations\": [{\"title\": \"Circe\"}]}\n```";
        match parse_llm_response(text) {
            ParsedLlmResponse::Recommendations(recs) => {
                assert_eq!(recs.len(), 1);
                assert_eq!(recs[0].title, "Circe");
            }
            ParsedLlmResponse::Malformed(_) => panic!("fenced JSON should parse"),
        }
    }

    #[test]
    fn test_parse_garbage_is_malformed() {
        match parse_llm_response("sorry, I can't do that") {
            ParsedLlmResponse::Malformed(raw) => assert!(raw.contains("sorry")),
            ParsedLlmResponse::Recommendations(_) => panic!("expected malformed"),
        }
    }

    #[test]
    fn test_parse_drops_empty_titles() {
        let text = r#"{"recommendations": [{"title": "  "}, {"title": "Real Book"}]}"#;
        match parse_llm_response(text) {
            ParsedLlmResponse::Recommendations(recs) => {
                assert_eq!(recs.len(), 1);
                assert_eq!(recs[0].title, "Real Book");
            }
            ParsedLlmResponse::Malformed(_) => panic!("expected parsed recommendations"),
        }
    }

    #[test]
    fn test_prompt_caps_books_and_orders_by_confidence() {
        let mut books: Vec<DetectedBook> = (0..30)
            .map(|i| DetectedBook {
                title: format!("Book {}", i),
                author: None,
                genre: None,
                series: None,
                confidence: i as f64 / 30.0,
            })
            .collect();
        books.reverse();

        let prefs = UserPreferences::default();
        let p = profile::analyze(&books);
        let prompt = build_prompt(&books, &p, &prefs, 20);

        // Highest-confidence book is in, the weakest detections are out
        assert!(prompt.contains("Book 29"));
        assert!(!prompt.contains("Book 0\n"));
    }

    #[tokio::test]
    async fn test_llm_failure_falls_back_to_rules() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .times(1)
            .returning(|_, _| Err(AppError::ExternalApi("quota exceeded".to_string())));

        let recommender = LanguageModelRecommender::new(Arc::new(mock), 0);
        let books = shelf();
        let p = profile::analyze(&books);
        let prefs = UserPreferences::default();

        let recs = recommender.recommend(&books, &p, &prefs, 10).await;

        assert!(!recs.is_empty());
        assert!(recs.iter().all(|r| matches!(
            r.source,
            RecommendationSource::RuleBasedGenre | RecommendationSource::RuleBasedDiscovery
        )));
    }

    #[tokio::test]
    async fn test_malformed_response_falls_back_to_rules() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .times(1)
            .returning(|_, _| Ok("not json at all".to_string()));

        let recommender = LanguageModelRecommender::new(Arc::new(mock), 0);
        let books = shelf();
        let p = profile::analyze(&books);
        let prefs = UserPreferences::default();

        let recs = recommender.recommend(&books, &p, &prefs, 10).await;
        assert!(!recs.is_empty());
        assert!(recs
            .iter()
            .all(|r| r.source != RecommendationSource::AiGenerated));
    }

    #[tokio::test]
    async fn test_retry_knob_reissues_call() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete()
            .times(2)
            .returning(|_, _| Err(AppError::ExternalApi("flaky".to_string())));

        let recommender = LanguageModelRecommender::new(Arc::new(mock), 1);
        let books = shelf();
        let p = profile::analyze(&books);
        let prefs = UserPreferences::default();

        // Still falls back after exhausting the retry
        let recs = recommender.recommend(&books, &p, &prefs, 10).await;
        assert!(!recs.is_empty());
    }

    #[tokio::test]
    async fn test_successful_path_maps_entries() {
        let mut mock = MockCompletionClient::new();
        mock.expect_complete().times(1).returning(|_, _| {
            Ok(r#"{"recommendations": [
                {"title": "Hyperion", "genre": "Science Fiction", "confidence": 1.5}
            ]}"#
            .to_string())
        });

        let recommender = LanguageModelRecommender::new(Arc::new(mock), 0);
        let books = shelf();
        let p = profile::analyze(&books);
        let prefs = UserPreferences::default();

        let recs = recommender.recommend(&books, &p, &prefs, 10).await;
        assert_eq!(recs.len(), 1);
        assert_eq!(recs[0].source, RecommendationSource::AiGenerated);
        // Out-of-range confidence clamped into [0.1, 1.0]
        assert_eq!(recs[0].confidence, 1.0);
    }
}
