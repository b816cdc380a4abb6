use std::collections::HashMap;

use crate::models::{DetectedBook, GenreShare, ReadingProfile, ReadingStyle};

const TOP_LIST_SIZE: usize = 5;
const ECLECTIC_DIVERSITY_THRESHOLD: f64 = 0.7;
const SERIES_SHARE_THRESHOLD: f64 = 0.3;
const AUTHOR_LOYALTY_THRESHOLD: f64 = 0.5;

/// Derives a reading profile from the detected shelf contents.
///
/// Pure: frequency counts, mean detection confidence, top-5 genre/author
/// lists (ties broken by first-seen order) and a style classification.
/// Empty input yields the zero profile, not an error.
pub fn analyze(books: &[DetectedBook]) -> ReadingProfile {
    if books.is_empty() {
        return ReadingProfile::empty();
    }

    let total_books = books.len();
    let mut genre_counts: HashMap<String, usize> = HashMap::new();
    let mut author_counts: HashMap<String, usize> = HashMap::new();
    let mut series_counts: HashMap<String, usize> = HashMap::new();

    // First-seen order for deterministic tie-breaking in the top lists
    let mut genre_order: Vec<String> = Vec::new();
    let mut author_order: Vec<String> = Vec::new();

    let mut confidence_sum = 0.0;

    for book in books {
        confidence_sum += book.confidence;

        if let Some(genre) = &book.genre {
            if !genre_counts.contains_key(genre) {
                genre_order.push(genre.clone());
            }
            *genre_counts.entry(genre.clone()).or_insert(0) += 1;
        }

        if let Some(author) = &book.author {
            if !author_counts.contains_key(author) {
                author_order.push(author.clone());
            }
            *author_counts.entry(author.clone()).or_insert(0) += 1;
        }

        if let Some(series) = &book.series {
            *series_counts.entry(series.clone()).or_insert(0) += 1;
        }
    }

    let average_confidence = confidence_sum / total_books as f64;
    let diversity = genre_counts.len() as f64 / total_books as f64;

    let top_genres: Vec<GenreShare> = ranked(&genre_counts, &genre_order)
        .into_iter()
        .take(TOP_LIST_SIZE)
        .map(|(genre, count)| GenreShare {
            percentage: count as f64 / total_books as f64 * 100.0,
            genre,
            count,
        })
        .collect();

    let top_authors: Vec<String> = ranked(&author_counts, &author_order)
        .into_iter()
        .take(TOP_LIST_SIZE)
        .map(|(author, _)| author)
        .collect();

    let reading_style = classify_style(
        diversity,
        series_counts.values().sum(),
        author_counts.len(),
        total_books,
    );

    ReadingProfile {
        total_books,
        genre_counts,
        author_counts,
        series_counts,
        average_confidence,
        top_genres,
        top_authors,
        reading_style,
        diversity,
    }
}

/// Sorts entries by count descending, ties by first-seen order
fn ranked(counts: &HashMap<String, usize>, first_seen: &[String]) -> Vec<(String, usize)> {
    let mut entries: Vec<(String, usize)> = first_seen
        .iter()
        .map(|key| (key.clone(), counts[key]))
        .collect();
    entries.sort_by(|a, b| b.1.cmp(&a.1));
    entries
}

/// Fixed precedence: eclectic, then series-focused, then author-loyal,
/// then genre-focused.
fn classify_style(
    diversity: f64,
    series_books: usize,
    distinct_authors: usize,
    total_books: usize,
) -> ReadingStyle {
    if diversity > ECLECTIC_DIVERSITY_THRESHOLD {
        ReadingStyle::Eclectic
    } else if series_books as f64 > SERIES_SHARE_THRESHOLD * total_books as f64 {
        ReadingStyle::SeriesFocused
    } else if (distinct_authors as f64) < AUTHOR_LOYALTY_THRESHOLD * total_books as f64 {
        ReadingStyle::AuthorLoyal
    } else {
        ReadingStyle::GenreFocused
    }
}
