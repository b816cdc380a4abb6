use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client as HttpClient;
use serde::Deserialize;

use crate::{
    error::{AppError, AppResult},
    models::{CatalogBook, DetectedBook, Recommendation, UserPreferences},
};

/// Default quality bar when thresholds are queried without explicit values
const DEFAULT_MIN_RATING: f64 = 4.0;
const DEFAULT_MIN_REVIEWS: u64 = 1000;

/// Seam to the external book-catalog service
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogClient: Send + Sync {
    /// Popular books in one genre
    async fn search_popular_by_genre(
        &self,
        genre: &str,
        limit: usize,
    ) -> AppResult<Vec<CatalogBook>>;

    /// Books passing rating and review-count filters
    async fn get_highly_rated(
        &self,
        min_rating: f64,
        min_reviews: u64,
        genres: &[String],
        limit: usize,
    ) -> AppResult<Vec<CatalogBook>>;
}

/// HTTP provider for a Goodreads-style catalog API
pub struct HttpCatalogClient {
    http_client: HttpClient,
    api_url: String,
}

impl HttpCatalogClient {
    pub fn new(api_url: String, timeout: Duration) -> Self {
        Self {
            http_client: HttpClient::builder()
                .timeout(timeout)
                .build()
                .unwrap_or_default(),
            api_url,
        }
    }

    async fn fetch_books(&self, url: String, query: &[(&str, String)]) -> AppResult<Vec<CatalogBook>> {
        let response = self.http_client.get(&url).query(query).send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Catalog API returned status {}: {}",
                status, body
            )));
        }

        #[derive(Deserialize)]
        struct BooksResponse {
            books: Vec<CatalogBook>,
        }

        let books: BooksResponse = response.json().await?;
        Ok(books.books)
    }
}

#[async_trait::async_trait]
impl CatalogClient for HttpCatalogClient {
    async fn search_popular_by_genre(
        &self,
        genre: &str,
        limit: usize,
    ) -> AppResult<Vec<CatalogBook>> {
        let url = format!("{}/books/popular", self.api_url);
        self.fetch_books(
            url,
            &[
                ("genre", genre.to_string()),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }

    async fn get_highly_rated(
        &self,
        min_rating: f64,
        min_reviews: u64,
        genres: &[String],
        limit: usize,
    ) -> AppResult<Vec<CatalogBook>> {
        let url = format!("{}/books/top-rated", self.api_url);
        self.fetch_books(
            url,
            &[
                ("minRating", min_rating.to_string()),
                ("minReviews", min_reviews.to_string()),
                ("genres", genres.join(",")),
                ("limit", limit.to_string()),
            ],
        )
        .await
    }
}

/// Candidate generator backed by the external catalog. Degrades silently:
/// any call failure contributes an empty list, never a pipeline abort.
pub struct CatalogRecommender {
    client: Arc<dyn CatalogClient>,
}

impl CatalogRecommender {
    pub fn new(client: Arc<dyn CatalogClient>) -> Self {
        Self { client }
    }

    pub async fn recommend(
        &self,
        detected: &[DetectedBook],
        preferences: &UserPreferences,
        count: usize,
    ) -> Vec<Recommendation> {
        let already_read: HashSet<String> = detected
            .iter()
            .map(|b| b.title.to_lowercase())
            .collect();

        let mut candidates: Vec<CatalogBook> = Vec::new();

        for genre in &preferences.favorite_genres {
            match self.client.search_popular_by_genre(genre, count).await {
                Ok(books) => candidates.extend(books),
                Err(e) => {
                    tracing::warn!(genre = %genre, error = %e, "Popular-by-genre query failed");
                }
            }
        }

        let thresholds = &preferences.rating_thresholds;
        if thresholds.minimum_rating.is_some() || thresholds.minimum_review_count.is_some() {
            let min_rating = thresholds.minimum_rating.unwrap_or(DEFAULT_MIN_RATING);
            let min_reviews = thresholds.minimum_review_count.unwrap_or(DEFAULT_MIN_REVIEWS);

            match self
                .client
                .get_highly_rated(min_rating, min_reviews, &preferences.favorite_genres, count)
                .await
            {
                Ok(books) => candidates.extend(
                    books
                        .into_iter()
                        .filter(|b| b.rating >= min_rating && b.ratings_count >= min_reviews),
                ),
                Err(e) => {
                    tracing::warn!(error = %e, "Highly-rated query failed");
                }
            }
        }

        let recommendations: Vec<Recommendation> = candidates
            .into_iter()
            .filter(|book| !already_read.contains(&book.title.to_lowercase()))
            .map(Recommendation::from)
            .collect();

        tracing::debug!(
            count = recommendations.len(),
            "Catalog recommendations collected"
        );

        recommendations
    }
}
