use crate::models::{ReadingProfile, Recommendation, RecommendationSource};

/// Default confidence for curated picks. Lower than AI- or catalog-sourced
/// candidates, reflecting lower trust in a static table.
const GENRE_PICK_CONFIDENCE: f64 = 0.6;
const DISCOVERY_PICK_CONFIDENCE: f64 = 0.55;

/// Share of the requested count served from the reader's top genres
const GENRE_SHARE: f64 = 0.6;
/// Share reserved for picks outside the reader's top genres
const DISCOVERY_SHARE: f64 = 0.1;

struct CuratedPick {
    title: &'static str,
    author: &'static str,
    year: i32,
    themes: &'static [&'static str],
}

/// Hand-curated popular titles per genre. A genre with no shelf here
/// simply contributes nothing.
const GENRE_SHELVES: &[(&str, &[CuratedPick])] = &[
    (
        "Science Fiction",
        &[
            CuratedPick { title: "Project Hail Mary", author: "Andy Weir", year: 2021, themes: &["space", "first contact", "problem solving"] },
            CuratedPick { title: "Hyperion", author: "Dan Simmons", year: 1989, themes: &["space opera", "pilgrimage"] },
            CuratedPick { title: "The Left Hand of Darkness", author: "Ursula K. Le Guin", year: 1969, themes: &["gender", "politics", "first contact"] },
            CuratedPick { title: "Children of Time", author: "Adrian Tchaikovsky", year: 2015, themes: &["evolution", "civilization"] },
        ],
    ),
    (
        "Fantasy",
        &[
            CuratedPick { title: "The Name of the Wind", author: "Patrick Rothfuss", year: 2007, themes: &["magic", "coming of age"] },
            CuratedPick { title: "Mistborn: The Final Empire", author: "Brandon Sanderson", year: 2006, themes: &["heist", "magic systems"] },
            CuratedPick { title: "The Fifth Season", author: "N.K. Jemisin", year: 2015, themes: &["apocalypse", "oppression"] },
            CuratedPick { title: "Piranesi", author: "Susanna Clarke", year: 2020, themes: &["mystery", "labyrinth"] },
        ],
    ),
    (
        "Mystery",
        &[
            CuratedPick { title: "The Thursday Murder Club", author: "Richard Osman", year: 2020, themes: &["cozy mystery", "friendship"] },
            CuratedPick { title: "Gone Girl", author: "Gillian Flynn", year: 2012, themes: &["marriage", "unreliable narrator"] },
            CuratedPick { title: "In the Woods", author: "Tana French", year: 2007, themes: &["police procedural", "memory"] },
        ],
    ),
    (
        "Thriller",
        &[
            CuratedPick { title: "The Silent Patient", author: "Alex Michaelides", year: 2019, themes: &["psychological", "twist"] },
            CuratedPick { title: "I Am Pilgrim", author: "Terry Hayes", year: 2013, themes: &["espionage", "forensics"] },
        ],
    ),
    (
        "Romance",
        &[
            CuratedPick { title: "Beach Read", author: "Emily Henry", year: 2020, themes: &["writers", "opposites attract"] },
            CuratedPick { title: "Red, White & Royal Blue", author: "Casey McQuiston", year: 2019, themes: &["politics", "queer romance"] },
        ],
    ),
    (
        "Horror",
        &[
            CuratedPick { title: "Mexican Gothic", author: "Silvia Moreno-Garcia", year: 2020, themes: &["gothic", "family secrets"] },
            CuratedPick { title: "The Only Good Indians", author: "Stephen Graham Jones", year: 2020, themes: &["revenge", "folklore"] },
        ],
    ),
    (
        "Historical Fiction",
        &[
            CuratedPick { title: "The Nightingale", author: "Kristin Hannah", year: 2015, themes: &["war", "sisters"] },
            CuratedPick { title: "Wolf Hall", author: "Hilary Mantel", year: 2009, themes: &["tudor court", "power"] },
        ],
    ),
    (
        "Non-Fiction",
        &[
            CuratedPick { title: "Sapiens", author: "Yuval Noah Harari", year: 2011, themes: &["history", "anthropology"] },
            CuratedPick { title: "Educated", author: "Tara Westover", year: 2018, themes: &["memoir", "family"] },
        ],
    ),
    (
        "Literary Fiction",
        &[
            CuratedPick { title: "A Little Life", author: "Hanya Yanagihara", year: 2015, themes: &["friendship", "trauma"] },
            CuratedPick { title: "Klara and the Sun", author: "Kazuo Ishiguro", year: 2021, themes: &["artificial intelligence", "devotion"] },
        ],
    ),
];

/// Cross-genre picks used to nudge readers outside their usual shelves
const DISCOVERY_SHELF: &[(&str, CuratedPick)] = &[
    ("Science Fiction", CuratedPick { title: "The Martian", author: "Andy Weir", year: 2011, themes: &["survival", "humor"] }),
    ("Fantasy", CuratedPick { title: "The House in the Cerulean Sea", author: "TJ Klune", year: 2020, themes: &["found family", "whimsy"] }),
    ("Mystery", CuratedPick { title: "The Maid", author: "Nita Prose", year: 2022, themes: &["cozy mystery", "neurodivergence"] }),
    ("Non-Fiction", CuratedPick { title: "Braiding Sweetgrass", author: "Robin Wall Kimmerer", year: 2013, themes: &["nature", "indigenous wisdom"] }),
    ("Historical Fiction", CuratedPick { title: "Pachinko", author: "Min Jin Lee", year: 2017, themes: &["family saga", "identity"] }),
    ("Literary Fiction", CuratedPick { title: "Tomorrow, and Tomorrow, and Tomorrow", author: "Gabrielle Zevin", year: 2022, themes: &["games", "friendship"] }),
];

/// Deterministic, never-failing candidate generator used when the LLM
/// path is unavailable.
///
/// Emits up to ~60% of `count` from the profile's top genres and ~10%
/// from genres the reader has not touched.
pub fn recommend(profile: &ReadingProfile, count: usize) -> Vec<Recommendation> {
    let mut recommendations = Vec::new();

    let genre_budget = (count as f64 * GENRE_SHARE).ceil() as usize;
    let discovery_budget = (count as f64 * DISCOVERY_SHARE).ceil() as usize;

    let per_genre_quota = if profile.top_genres.is_empty() {
        0
    } else {
        (genre_budget / profile.top_genres.len()).max(1)
    };

    for share in &profile.top_genres {
        if recommendations.len() >= genre_budget {
            break;
        }
        let Some(shelf) = lookup_shelf(&share.genre) else {
            continue;
        };
        for pick in shelf.iter().take(per_genre_quota) {
            if recommendations.len() >= genre_budget {
                break;
            }
            recommendations.push(to_recommendation(
                pick,
                &share.genre,
                RecommendationSource::RuleBasedGenre,
                GENRE_PICK_CONFIDENCE,
                format!("A staple for {} readers", share.genre),
            ));
        }
    }

    let mut discovery_emitted = 0;
    for (genre, pick) in DISCOVERY_SHELF {
        if discovery_emitted >= discovery_budget {
            break;
        }
        if profile.has_top_genre(genre) {
            continue;
        }
        recommendations.push(to_recommendation(
            pick,
            genre,
            RecommendationSource::RuleBasedDiscovery,
            DISCOVERY_PICK_CONFIDENCE,
            format!("Something outside your usual shelves: {}", genre),
        ));
        discovery_emitted += 1;
    }

    tracing::debug!(
        genre_picks = recommendations.len() - discovery_emitted,
        discovery_picks = discovery_emitted,
        requested = count,
        "Rule-based recommendations generated"
    );

    recommendations
}

fn lookup_shelf(genre: &str) -> Option<&'static [CuratedPick]> {
    GENRE_SHELVES
        .iter()
        .find(|(shelf_genre, _)| shelf_genre.eq_ignore_ascii_case(genre))
        .map(|(_, picks)| *picks)
}

fn to_recommendation(
    pick: &CuratedPick,
    genre: &str,
    source: RecommendationSource,
    confidence: f64,
    reason: String,
) -> Recommendation {
    Recommendation {
        title: pick.title.to_string(),
        author: pick.author.to_string(),
        genre: genre.to_string(),
        reason,
        confidence,
        themes: pick.themes.iter().map(|t| t.to_string()).collect(),
        publication_year: Some(pick.year),
        source,
        external_rating_data: None,
        metadata: None,
        combination_source: None,
        final_score: None,
    }
}
