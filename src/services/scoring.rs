use serde::{Deserialize, Serialize};

use crate::models::{
    ReadingProfile, Recommendation, RecommendationSource, UserPreferences,
};

const MANY_RATINGS_FLOOR: u64 = 10_000;
const SOME_RATINGS_FLOOR: u64 = 1_000;
const NEW_RELEASE_WINDOW_YEARS: i32 = 2;
const CLASSIC_YEAR_CEILING: i32 = 1990;
const CLASSIC_MIN_RATING: f64 = 4.0;

/// Hand-tuned scoring weights. The exact values are part of the
/// observable behavior contract; override them, never rebalance them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScoringWeights {
    pub favorite_genre_bonus: f64,
    pub avoid_genre_penalty: f64,
    pub top_genre_bonus_cap: f64,
    pub top_genre_percentage_factor: f64,
    pub external_rating_factor: f64,
    pub many_ratings_bonus: f64,
    pub some_ratings_bonus: f64,
    pub metadata_rating_factor: f64,
    pub threshold_met_bonus: f64,
    pub threshold_missed_penalty: f64,
    pub awards_bonus: f64,
    pub ai_source_bonus: f64,
    pub catalog_source_bonus: f64,
    pub experiment_bonus: f64,
    pub new_release_bonus: f64,
    pub classic_bonus: f64,
}

impl Default for ScoringWeights {
    fn default() -> Self {
        Self {
            favorite_genre_bonus: 0.20,
            avoid_genre_penalty: 0.30,
            top_genre_bonus_cap: 0.15,
            top_genre_percentage_factor: 0.5,
            external_rating_factor: 0.15,
            many_ratings_bonus: 0.10,
            some_ratings_bonus: 0.05,
            metadata_rating_factor: 0.10,
            threshold_met_bonus: 0.05,
            threshold_missed_penalty: 0.20,
            awards_bonus: 0.10,
            ai_source_bonus: 0.05,
            catalog_source_bonus: 0.03,
            experiment_bonus: 0.08,
            new_release_bonus: 0.06,
            classic_bonus: 0.05,
        }
    }
}

/// Multi-factor scorer. Deterministic given its inputs; all adjustments
/// are additive and order-independent, clamped to [0, 1] only at the end.
pub struct Scorer {
    weights: ScoringWeights,
}

impl Scorer {
    pub fn new(weights: ScoringWeights) -> Self {
        Self { weights }
    }

    /// Scores every candidate and sorts descending. The sort is stable,
    /// so ties keep the Combiner's order; the full set is scored before
    /// any truncation so near-ties resolve the same regardless of cut.
    pub fn rank(
        &self,
        mut candidates: Vec<Recommendation>,
        profile: &ReadingProfile,
        preferences: &UserPreferences,
        current_year: i32,
    ) -> Vec<Recommendation> {
        for candidate in &mut candidates {
            candidate.final_score =
                Some(self.score(candidate, profile, preferences, current_year));
        }

        candidates.sort_by(|a, b| {
            b.final_score
                .partial_cmp(&a.final_score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        candidates
    }

    pub fn score(
        &self,
        candidate: &Recommendation,
        profile: &ReadingProfile,
        preferences: &UserPreferences,
        current_year: i32,
    ) -> f64 {
        let w = &self.weights;
        let mut score = candidate.confidence;

        if preferences.is_favorite_genre(&candidate.genre) {
            score += w.favorite_genre_bonus;
        }
        if preferences.is_avoided_genre(&candidate.genre) {
            score -= w.avoid_genre_penalty;
        }

        if let Some(percentage) = profile.top_genre_percentage(&candidate.genre) {
            score += (percentage / 100.0 * w.top_genre_percentage_factor)
                .min(w.top_genre_bonus_cap);
        }

        match &candidate.external_rating_data {
            Some(rating_data) => {
                score += (rating_data.rating - 3.0) * w.external_rating_factor;
                if rating_data.ratings_count > MANY_RATINGS_FLOOR {
                    score += w.many_ratings_bonus;
                } else if rating_data.ratings_count > SOME_RATINGS_FLOOR {
                    score += w.some_ratings_bonus;
                }

                if let Some(minimum) = preferences.rating_thresholds.minimum_rating {
                    if rating_data.rating >= minimum {
                        score += w.threshold_met_bonus;
                    } else {
                        score -= w.threshold_missed_penalty;
                    }
                }

                if !rating_data.awards.is_empty() {
                    score += w.awards_bonus;
                }
            }
            None => {
                if let Some(average) = candidate.metadata.as_ref().and_then(|m| m.average_rating)
                {
                    score += (average - 3.0) * w.metadata_rating_factor;
                }
            }
        }

        match candidate.source {
            RecommendationSource::AiGenerated => score += w.ai_source_bonus,
            RecommendationSource::GoodreadsPopular => score += w.catalog_source_bonus,
            _ => {}
        }

        let discovery = &preferences.discovery_settings;
        if discovery.experiment_with_genres && !profile.has_top_genre(&candidate.genre) {
            score += w.experiment_bonus;
        }
        if discovery.include_new_releases {
            if let Some(year) = candidate.publication_year {
                if year >= current_year - NEW_RELEASE_WINDOW_YEARS {
                    score += w.new_release_bonus;
                }
            }
        }
        if discovery.include_classics {
            if let (Some(year), Some(rating_data)) =
                (candidate.publication_year, &candidate.external_rating_data)
            {
                if year < CLASSIC_YEAR_CEILING && rating_data.rating >= CLASSIC_MIN_RATING {
                    score += w.classic_bonus;
                }
            }
        }

        score.clamp(0.0, 1.0)
    }
}
