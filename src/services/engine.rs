use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{Datelike, Utc};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{
    error::{AppError, AppResult},
    models::{
        DetectedBook, Explanations, ReadingProfile, RecommendationOptions,
        RecommendationResponse, RecommendationSource, ResponseMetadata, UserPreferences,
    },
    services::{
        cache::{cache_key, ResultCache},
        catalog::{CatalogClient, CatalogRecommender},
        combine,
        enrich::{Enricher, MetadataClient},
        llm::{CompletionClient, LanguageModelRecommender},
        profile,
        scoring::{Scorer, ScoringWeights},
    },
};

/// Engine-level tunables; everything defaults to the production values
#[derive(Debug, Clone)]
pub struct EngineSettings {
    pub max_retries: u32,
    pub cache_ttl: chrono::Duration,
    pub enrichment_delay: Duration,
    pub scoring_weights: ScoringWeights,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            max_retries: 0,
            cache_ttl: chrono::Duration::hours(2),
            enrichment_delay: Duration::from_millis(150),
            scoring_weights: ScoringWeights::default(),
        }
    }
}

/// Counters exposed on the admin surface
#[derive(Debug, Clone, Default, Serialize)]
pub struct StatsSnapshot {
    pub requests_served: u64,
    pub recommendations_served: u64,
    pub cache_hits: u64,
    pub llm_successes: u64,
    pub llm_fallbacks: u64,
    pub catalog_successes: u64,
    pub catalog_failures: u64,
    pub cache_size: usize,
}

#[derive(Debug, Default)]
struct EngineStats {
    requests_served: u64,
    recommendations_served: u64,
    cache_hits: u64,
    llm_successes: u64,
    llm_fallbacks: u64,
    catalog_successes: u64,
    catalog_failures: u64,
}

/// Orchestrates the full recommendation pipeline and owns its state.
///
/// Degradation policy: the LLM path falls back to rules, the catalog path
/// falls back to nothing, enrichment failures keep the bare record. The
/// caller sees a hard error only for invalid input or an unexpected
/// internal failure.
pub struct RecommendationEngine {
    llm: LanguageModelRecommender,
    catalog: CatalogRecommender,
    enricher: Enricher,
    scorer: Scorer,
    cache: ResultCache,
    stats: Mutex<EngineStats>,
}

impl RecommendationEngine {
    pub fn new(
        completion_client: Arc<dyn CompletionClient>,
        catalog_client: Arc<dyn CatalogClient>,
        metadata_client: Arc<dyn MetadataClient>,
        settings: EngineSettings,
    ) -> Self {
        Self {
            llm: LanguageModelRecommender::new(completion_client, settings.max_retries),
            catalog: CatalogRecommender::new(catalog_client),
            enricher: Enricher::new(metadata_client, settings.enrichment_delay),
            scorer: Scorer::new(settings.scoring_weights),
            cache: ResultCache::new(settings.cache_ttl),
            stats: Mutex::new(EngineStats::default()),
        }
    }

    /// Runs the pipeline for one request
    pub async fn recommend(
        &self,
        books: Vec<DetectedBook>,
        preferences: UserPreferences,
        options: RecommendationOptions,
    ) -> AppResult<RecommendationResponse> {
        if options.max_recommendations == 0 {
            return Err(AppError::InvalidInput(
                "max_recommendations must be positive".to_string(),
            ));
        }

        let started = Instant::now();

        // Books with no usable title are vision noise, not an error
        let books: Vec<DetectedBook> = books
            .into_iter()
            .filter(|b| !b.title.trim().is_empty())
            .collect();

        if books.is_empty() {
            tracing::info!("No valid detected books; returning empty result");
            let response =
                self.build_envelope(Vec::new(), ReadingProfile::empty(), 0, started, false);
            self.record_request(&response, false).await;
            return Ok(response);
        }

        let key = cache_key(&books, &preferences, &options);

        if !options.bypass_cache {
            if let Some(mut cached) = self.cache.get(&key).await {
                tracing::info!(key = %key, "Serving recommendations from cache");
                cached.metadata.from_cache = true;
                self.record_request(&cached, true).await;
                return Ok(cached);
            }
        }

        let reading_profile = profile::analyze(&books);

        tracing::debug!(
            total_books = reading_profile.total_books,
            style = %reading_profile.reading_style,
            diversity = reading_profile.diversity,
            "Reading profile derived"
        );

        // The two external calls are independent; run them concurrently
        // so wall clock is max(t_llm, t_catalog), not the sum
        let (llm_candidates, catalog_candidates) = tokio::join!(
            self.llm.recommend(
                &books,
                &reading_profile,
                &preferences,
                options.max_recommendations
            ),
            self.catalog
                .recommend(&books, &preferences, options.max_recommendations),
        );

        {
            let mut stats = self.stats.lock().await;
            if llm_candidates
                .iter()
                .any(|r| r.source == RecommendationSource::AiGenerated)
            {
                stats.llm_successes += 1;
            } else {
                stats.llm_fallbacks += 1;
            }
            if catalog_candidates.is_empty() {
                stats.catalog_failures += 1;
            } else {
                stats.catalog_successes += 1;
            }
        }

        let combined = combine::combine(
            llm_candidates,
            catalog_candidates,
            options.max_recommendations,
            &preferences,
        );

        let combined = if options.enrich_metadata {
            self.enricher.enrich(combined).await
        } else {
            combined
        };

        let mut ranked = self.scorer.rank(
            combined,
            &reading_profile,
            &preferences,
            Utc::now().year(),
        );
        ranked.truncate(options.max_recommendations);

        let based_on = books.len();
        let response = self.build_envelope(ranked, reading_profile, based_on, started, false);

        // Inserted only once the envelope is complete; a request dropped
        // mid-flight never writes a partial entry
        self.cache.insert(key, response.clone()).await;
        self.record_request(&response, false).await;

        tracing::info!(
            recommendations = response.recommendations.len(),
            elapsed_ms = response.metadata.processing_time_ms,
            "Recommendation request completed"
        );

        Ok(response)
    }

    fn build_envelope(
        &self,
        recommendations: Vec<crate::models::Recommendation>,
        reading_profile: ReadingProfile,
        based_on_books: usize,
        started: Instant,
        from_cache: bool,
    ) -> RecommendationResponse {
        let top_genres: Vec<String> = reading_profile
            .top_genres
            .iter()
            .map(|g| g.genre.clone())
            .collect();

        let why = if based_on_books == 0 {
            "No books were detected on your shelf, so no personalized \
             recommendations could be generated."
                .to_string()
        } else {
            format!(
                "Based on {} detected books and your {} reading style, we blended \
                 AI suggestions with popular catalog titles in {}.",
                based_on_books,
                reading_profile.reading_style,
                if top_genres.is_empty() {
                    "your favorite genres".to_string()
                } else {
                    top_genres.join(", ")
                }
            )
        };

        let confidence = if recommendations.is_empty() {
            0.0
        } else {
            recommendations
                .iter()
                .filter_map(|r| r.final_score)
                .sum::<f64>()
                / recommendations.len() as f64
        };

        RecommendationResponse {
            metadata: ResponseMetadata {
                total_recommendations: recommendations.len(),
                processing_time_ms: started.elapsed().as_millis() as u64,
                timestamp: Utc::now(),
                confidence,
                based_on_books,
                from_cache,
            },
            explanations: Explanations {
                why,
                top_genres,
                reading_style: reading_profile.reading_style.to_string(),
            },
            reading_profile,
            recommendations,
        }
    }

    async fn record_request(&self, response: &RecommendationResponse, cache_hit: bool) {
        let mut stats = self.stats.lock().await;
        stats.requests_served += 1;
        stats.recommendations_served += response.recommendations.len() as u64;
        if cache_hit {
            stats.cache_hits += 1;
        }
    }

    /// Admin surface: counter snapshot plus current cache size
    pub async fn stats(&self) -> StatsSnapshot {
        let stats = self.stats.lock().await;
        StatsSnapshot {
            requests_served: stats.requests_served,
            recommendations_served: stats.recommendations_served,
            cache_hits: stats.cache_hits,
            llm_successes: stats.llm_successes,
            llm_fallbacks: stats.llm_fallbacks,
            catalog_successes: stats.catalog_successes,
            catalog_failures: stats.catalog_failures,
            cache_size: self.cache.len().await,
        }
    }

    /// Admin surface: evicts all cache entries, returns the count
    pub async fn clear_cache(&self) -> usize {
        self.cache.clear().await
    }
}
