use std::collections::{HashSet, VecDeque};

use crate::models::{CombinationSource, Recommendation, UserPreferences};

/// Share of output slots reserved for the LLM list before spill-over
const LLM_SHARE: f64 = 0.7;

/// Merges the LLM list and the catalog list into at most `target` items.
///
/// Two ordered queues with a watermark: `ceil(0.7 * target)` slots go to
/// the LLM list in order, the remainder to the catalog list in order.
/// Normalized titles are deduplicated as items are admitted (a duplicate
/// is skipped, not replaced). Once either queue runs dry, remaining slots
/// spill over to whichever queue still has unseen titles. Candidates by
/// avoided authors are dropped before the merge.
pub fn combine(
    llm: Vec<Recommendation>,
    catalog: Vec<Recommendation>,
    target: usize,
    preferences: &UserPreferences,
) -> Vec<Recommendation> {
    let mut llm_queue: VecDeque<Recommendation> = llm
        .into_iter()
        .filter(|r| !preferences.is_avoided_author(&r.author))
        .collect();
    let mut catalog_queue: VecDeque<Recommendation> = catalog
        .into_iter()
        .filter(|r| !preferences.is_avoided_author(&r.author))
        .collect();

    let llm_quota = (target as f64 * LLM_SHARE).ceil() as usize;
    let catalog_quota = target.saturating_sub(llm_quota);

    let mut seen: HashSet<String> = HashSet::new();
    let mut combined: Vec<Recommendation> = Vec::with_capacity(target);

    admit_up_to(
        &mut llm_queue,
        llm_quota,
        CombinationSource::AiPrimary,
        &mut seen,
        &mut combined,
    );
    admit_up_to(
        &mut catalog_queue,
        catalog_quota,
        CombinationSource::GoodreadsDiversity,
        &mut seen,
        &mut combined,
    );

    // Spill-over: fill the rest from whichever list still has unseen titles
    while combined.len() < target {
        let next = llm_queue.pop_front().or_else(|| catalog_queue.pop_front());
        let Some(mut candidate) = next else {
            break;
        };
        if !seen.insert(candidate.normalized_title()) {
            continue;
        }
        candidate.combination_source = Some(CombinationSource::MixedFill);
        combined.push(candidate);
    }

    tracing::debug!(
        combined = combined.len(),
        target = target,
        "Candidate lists combined"
    );

    combined
}

/// Admits up to `quota` unseen items from the front of `queue`
fn admit_up_to(
    queue: &mut VecDeque<Recommendation>,
    quota: usize,
    tag: CombinationSource,
    seen: &mut HashSet<String>,
    combined: &mut Vec<Recommendation>,
) {
    let mut admitted = 0;
    while admitted < quota {
        let Some(mut candidate) = queue.pop_front() else {
            break;
        };
        if !seen.insert(candidate.normalized_title()) {
            continue;
        }
        candidate.combination_source = Some(tag);
        combined.push(candidate);
        admitted += 1;
    }
}
