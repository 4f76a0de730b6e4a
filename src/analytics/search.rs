use std::cmp::Ordering;

use crate::models::TradeRecord;

const SCORE_EXACT: u32 = 100;
const SCORE_PREFIX: u32 = 80;
const SCORE_SUBSTRING: u32 = 60;
const SCORE_SUBSEQUENCE_MAX: u32 = 40;
const SCORE_TAG: u32 = 30;
const SCORE_MODEL: u32 = 25;
const SCORE_NOTES: u32 = 10;

#[derive(Debug, Clone)]
pub struct SearchHit<'a> {
    pub record: &'a TradeRecord,
    pub score: u32,
}

/// Rank records against a free-text query. Instrument matches are fuzzy;
/// tags, model and notes match on substrings.
pub fn search<'a>(records: &'a [TradeRecord], query: &str) -> Vec<SearchHit<'a>> {
    let q = normalize(query);
    let raw = query.trim().to_lowercase();
    if q.is_empty() {
        return records
            .iter()
            .map(|record| SearchHit { record, score: 0 })
            .collect();
    }

    let mut hits: Vec<SearchHit<'a>> = records
        .iter()
        .filter_map(|record| {
            let score = score_record(record, &q, &raw);
            (score > 0).then_some(SearchHit { record, score })
        })
        .collect();

    hits.sort_by(|a, b| match b.score.cmp(&a.score) {
        Ordering::Equal => b.record.timestamp.cmp(&a.record.timestamp),
        other => other,
    });
    hits
}

fn score_record(record: &TradeRecord, q: &str, raw: &str) -> u32 {
    let mut best = instrument_score(&normalize(&record.instrument), q);

    if record.tags.iter().any(|t| normalize(t).contains(q)) {
        best = best.max(SCORE_TAG);
    }
    if record
        .model
        .as_deref()
        .is_some_and(|m| normalize(m).contains(q))
    {
        best = best.max(SCORE_MODEL);
    }
    if record.notes.to_lowercase().contains(raw) {
        best = best.max(SCORE_NOTES);
    }
    best
}

/// Exact > prefix > substring > in-order subsequence. Tighter subsequences
/// score higher.
pub fn instrument_score(instrument: &str, q: &str) -> u32 {
    if instrument == q {
        return SCORE_EXACT;
    }
    if instrument.starts_with(q) {
        return SCORE_PREFIX;
    }
    if instrument.contains(q) {
        return SCORE_SUBSTRING;
    }
    match subsequence_span(instrument, q) {
        Some(span) => {
            let slack = (span - q.chars().count()) as u32;
            SCORE_SUBSEQUENCE_MAX.saturating_sub(slack * 5).max(1)
        }
        None => 0,
    }
}

/// Length of the shortest window of `haystack` containing `needle` in order,
/// scanning greedily from each possible start.
fn subsequence_span(haystack: &str, needle: &str) -> Option<usize> {
    let hay: Vec<char> = haystack.chars().collect();
    let pat: Vec<char> = needle.chars().collect();
    let first = *pat.first()?;

    let mut best: Option<usize> = None;
    for start in (0..hay.len()).filter(|&i| hay[i] == first) {
        let mut pi = 0;
        for (hi, &c) in hay.iter().enumerate().skip(start) {
            if c == pat[pi] {
                pi += 1;
                if pi == pat.len() {
                    let span = hi - start + 1;
                    best = Some(best.map_or(span, |b: usize| b.min(span)));
                    break;
                }
            }
        }
    }
    best
}

/// Instruments are compared without separators so "eur/usd" finds "EURUSD".
fn normalize(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}
