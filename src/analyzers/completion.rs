//! Snapshot-level response totals, completion rate and completion time.
//!
//! These are order-based policies over the fetched question list. The trend
//! analyzer uses a separate, set-based completion definition.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::analyzers::utility::mean;
use crate::models::CollectedResponse;

/// Total responses of a survey, taken as the response count of its first question.
///
/// `counts` are per-question response counts in fetched order.
pub fn first_question_response_count(counts: &[usize]) -> usize {
    counts.first().copied().unwrap_or(0)
}

/// Share of first-question responders that also answered the last question.
///
/// Returns 100 when there is at most one question or nobody answered the
/// first question. Clamped to `[0, 100]`.
pub fn first_to_last_completion_rate(counts: &[usize]) -> f64 {
    let total = first_question_response_count(counts);
    if counts.len() <= 1 || total == 0 {
        return 100.0;
    }

    let last = counts.last().copied().unwrap_or(0);
    ((last as f64 / total as f64) * 100.0).clamp(0.0, 100.0)
}

/// Mean minutes between each identified respondent's first and last response.
///
/// Anonymous responses are ignored, and respondents whose responses all
/// share one timestamp do not contribute.
pub fn average_completion_minutes(pool: &[CollectedResponse]) -> f64 {
    let mut spans: HashMap<&str, (DateTime<Utc>, DateTime<Utc>)> = HashMap::new();

    for item in pool {
        let Some(respondent) = item.response.respondent_id.as_deref() else {
            continue;
        };
        let at = item.response.created_at;
        spans
            .entry(respondent)
            .and_modify(|(first, last)| {
                if at < *first {
                    *first = at;
                }
                if at > *last {
                    *last = at;
                }
            })
            .or_insert((at, at));
    }

    let minutes: Vec<f64> = spans
        .values()
        .map(|(first, last)| (*last - *first).num_milliseconds())
        .filter(|ms| *ms > 0)
        .map(|ms| ms as f64 / 60_000.0)
        .collect();

    mean(&minutes)
}
