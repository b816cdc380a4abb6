use axum::{extract::State, Extension, Json};
use serde::Deserialize;

use crate::{
    error::AppResult,
    middleware::request_id::RequestId,
    models::{DetectedBook, RecommendationOptions, RecommendationResponse, UserPreferences},
    routes::AppState,
};

#[derive(Debug, Deserialize)]
pub struct RecommendationRequest {
    pub books: Vec<DetectedBook>,
    #[serde(default)]
    pub preferences: UserPreferences,
    #[serde(default)]
    pub options: RecommendationOptions,
}

/// Handler for the recommendations endpoint
pub async fn recommend(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    Json(request): Json<RecommendationRequest>,
) -> AppResult<Json<RecommendationResponse>> {
    tracing::info!(
        request_id = %request_id,
        book_count = request.books.len(),
        "Processing recommendation request"
    );

    let response = state
        .engine
        .recommend(request.books, request.preferences, request.options)
        .await?;

    tracing::info!(
        request_id = %request_id,
        recommendations = response.recommendations.len(),
        from_cache = response.metadata.from_cache,
        "Recommendation request completed"
    );

    Ok(Json(response))
}
