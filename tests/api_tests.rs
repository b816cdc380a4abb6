use std::sync::Arc;
use std::time::Duration;

use axum_test::TestServer;
use serde_json::json;

use nextread_api::{
    error::{AppError, AppResult},
    models::{BookMetadata, CatalogBook},
    routes::{create_router, AppState},
    services::{
        catalog::CatalogClient,
        enrich::MetadataClient,
        llm::CompletionClient,
        EngineSettings, RecommendationEngine,
    },
};

/// Completion stub that always answers with the same structured output
struct CannedCompletion(&'static str);

#[async_trait::async_trait]
impl CompletionClient for CannedCompletion {
    async fn complete(&self, _system: &str, _user: &str) -> AppResult<String> {
        Ok(self.0.to_string())
    }
}

/// Completion stub that always fails
struct BrokenCompletion;

#[async_trait::async_trait]
impl CompletionClient for BrokenCompletion {
    async fn complete(&self, _system: &str, _user: &str) -> AppResult<String> {
        Err(AppError::ExternalApi("completion quota exceeded".to_string()))
    }
}

/// Catalog stub serving one fixed popular book per genre query
struct CannedCatalog;

#[async_trait::async_trait]
impl CatalogClient for CannedCatalog {
    async fn search_popular_by_genre(
        &self,
        genre: &str,
        _limit: usize,
    ) -> AppResult<Vec<CatalogBook>> {
        Ok(vec![CatalogBook {
            title: format!("Popular {} Pick", genre),
            author: Some("Catalog Author".to_string()),
            genre: Some(genre.to_string()),
            rating: 4.2,
            ratings_count: 120_000,
            awards: vec![],
            publication_year: Some(2015),
        }])
    }

    async fn get_highly_rated(
        &self,
        _min_rating: f64,
        _min_reviews: u64,
        _genres: &[String],
        _limit: usize,
    ) -> AppResult<Vec<CatalogBook>> {
        Ok(vec![])
    }
}

/// Metadata stub with nothing to say
struct EmptyMetadata;

#[async_trait::async_trait]
impl MetadataClient for EmptyMetadata {
    async fn lookup_by_title_author(
        &self,
        _title: &str,
        _author: &str,
    ) -> AppResult<Option<BookMetadata>> {
        Ok(None)
    }
}

const LLM_OUTPUT: &str = r#"{"recommendations": [
    {"title": "Hyperion", "author": "Dan Simmons",
     "genre": "Science Fiction", "confidence": 0.85,
     "similar_to": "Dune"},
    {"title": "Children of Time", "author": "Adrian Tchaikovsky",
     "genre": "Science Fiction", "confidence": 0.8}
]}"#;

fn create_test_server(completion: Arc<dyn CompletionClient>) -> TestServer {
    let engine = RecommendationEngine::new(
        completion,
        Arc::new(CannedCatalog),
        Arc::new(EmptyMetadata),
        EngineSettings {
            enrichment_delay: Duration::from_millis(0),
            ..Default::default()
        },
    );
    let app = create_router(AppState::new(engine));
    TestServer::new(app).unwrap()
}

fn shelf_request() -> serde_json::Value {
    json!({
        "books": [
            {"title": "Dune", "author": "Frank Herbert",
             "genre": "Science Fiction", "confidence": 0.92},
            {"title": "1984", "author": "George Orwell",
             "genre": "Science Fiction", "confidence": 0.88}
        ],
        "preferences": {
            "favorite_genres": ["Science Fiction"]
        }
    })
}

#[tokio::test]
async fn test_health_check() {
    let server = create_test_server(Arc::new(CannedCompletion(LLM_OUTPUT)));
    let response = server.get("/health").await;
    response.assert_status_ok();
}

#[tokio::test]
async fn test_recommendations_happy_path() {
    let server = create_test_server(Arc::new(CannedCompletion(LLM_OUTPUT)));

    let response = server
        .post("/api/v1/recommendations")
        .json(&shelf_request())
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let recommendations = body["recommendations"].as_array().unwrap();
    assert!(!recommendations.is_empty());

    // Both pipelines contributed
    let sources: Vec<&str> = recommendations
        .iter()
        .map(|r| r["source"].as_str().unwrap())
        .collect();
    assert!(sources.contains(&"ai-generated"));
    assert!(sources.contains(&"goodreads-popular"));

    // Already-detected shelf books never come back
    assert!(recommendations
        .iter()
        .all(|r| r["title"] != "Dune" && r["title"] != "1984"));

    assert_eq!(body["metadata"]["based_on_books"], 2);
    assert_eq!(body["metadata"]["from_cache"], false);
    assert_eq!(body["reading_profile"]["total_books"], 2);
    assert_eq!(body["explanations"]["reading_style"], "genre-focused");
}

#[tokio::test]
async fn test_scores_descending_and_in_unit_interval() {
    let server = create_test_server(Arc::new(CannedCompletion(LLM_OUTPUT)));

    let response = server
        .post("/api/v1/recommendations")
        .json(&shelf_request())
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let scores: Vec<f64> = body["recommendations"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["final_score"].as_f64().unwrap())
        .collect();

    assert!(scores.iter().all(|s| (0.0..=1.0).contains(s)));
    assert!(scores.windows(2).all(|w| w[0] >= w[1]));
}

#[tokio::test]
async fn test_empty_shelf_returns_empty_result() {
    let server = create_test_server(Arc::new(CannedCompletion(LLM_OUTPUT)));

    let response = server
        .post("/api/v1/recommendations")
        .json(&json!({ "books": [] }))
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["recommendations"].as_array().unwrap().len(), 0);
    assert_eq!(body["metadata"]["based_on_books"], 0);
    assert_eq!(body["reading_profile"]["total_books"], 0);
}

#[tokio::test]
async fn test_llm_outage_degrades_to_rules() {
    let server = create_test_server(Arc::new(BrokenCompletion));

    let response = server
        .post("/api/v1/recommendations")
        .json(&shelf_request())
        .await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    let recommendations = body["recommendations"].as_array().unwrap();
    assert!(!recommendations.is_empty());
    assert!(recommendations.iter().all(|r| {
        let source = r["source"].as_str().unwrap();
        source != "ai-generated"
    }));
}

#[tokio::test]
async fn test_repeat_request_served_from_cache() {
    let server = create_test_server(Arc::new(CannedCompletion(LLM_OUTPUT)));

    let first = server
        .post("/api/v1/recommendations")
        .json(&shelf_request())
        .await;
    let second = server
        .post("/api/v1/recommendations")
        .json(&shelf_request())
        .await;

    let first: serde_json::Value = first.json();
    let second: serde_json::Value = second.json();

    assert_eq!(first["metadata"]["from_cache"], false);
    assert_eq!(second["metadata"]["from_cache"], true);
    assert_eq!(first["recommendations"], second["recommendations"]);
}

#[tokio::test]
async fn test_zero_max_recommendations_rejected() {
    let server = create_test_server(Arc::new(CannedCompletion(LLM_OUTPUT)));

    let mut request = shelf_request();
    request["options"] = json!({ "max_recommendations": 0 });

    let response = server.post("/api/v1/recommendations").json(&request).await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stats_reflect_traffic() {
    let server = create_test_server(Arc::new(CannedCompletion(LLM_OUTPUT)));

    server
        .post("/api/v1/recommendations")
        .json(&shelf_request())
        .await;
    server
        .post("/api/v1/recommendations")
        .json(&shelf_request())
        .await;

    let response = server.get("/api/v1/stats").await;
    response.assert_status_ok();

    let stats: serde_json::Value = response.json();
    assert_eq!(stats["requests_served"], 2);
    assert_eq!(stats["cache_hits"], 1);
    assert_eq!(stats["llm_successes"], 1);
    assert_eq!(stats["cache_size"], 1);
}

#[tokio::test]
async fn test_cache_clear_endpoint() {
    let server = create_test_server(Arc::new(CannedCompletion(LLM_OUTPUT)));

    server
        .post("/api/v1/recommendations")
        .json(&shelf_request())
        .await;

    let response = server.post("/api/v1/cache/clear").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["evicted"], 1);

    // A repeat request misses the cleared cache
    let repeat = server
        .post("/api/v1/recommendations")
        .json(&shelf_request())
        .await;
    let repeat: serde_json::Value = repeat.json();
    assert_eq!(repeat["metadata"]["from_cache"], false);
}

#[tokio::test]
async fn test_request_id_echoed_in_response() {
    let server = create_test_server(Arc::new(CannedCompletion(LLM_OUTPUT)));

    let response = server.get("/health").await;
    assert!(response.headers().get("x-request-id").is_some());
}
