//! Time-windowed response and completion trends.
//!
//! Trends are recomputed from raw responses on every call and never persisted.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::str::FromStr;

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::config::AnonymousPolicy;
use crate::error::AnalyticsError;
use crate::models::{CollectedResponse, Question};
use crate::stats::pct;

/// Respondent key shared by all anonymous responses under [`AnonymousPolicy::Shared`].
pub const ANONYMOUS_RESPONDENT: &str = "anonymous";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendPeriod {
    #[default]
    Day,
    Week,
    Month,
}

impl FromStr for TrendPeriod {
    type Err = AnalyticsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "day" => Ok(TrendPeriod::Day),
            "week" => Ok(TrendPeriod::Week),
            "month" => Ok(TrendPeriod::Month),
            other => Err(AnalyticsError::Validation(format!(
                "period must be one of day, week, month (got '{other}')"
            ))),
        }
    }
}

impl TrendPeriod {
    pub fn as_str(&self) -> &'static str {
        match self {
            TrendPeriod::Day => "day",
            TrendPeriod::Week => "week",
            TrendPeriod::Month => "month",
        }
    }

    /// Earliest instant included in the window ending at `now`.
    pub fn window_start(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            TrendPeriod::Day => now - Duration::days(1),
            TrendPeriod::Week => now - Duration::days(7),
            TrendPeriod::Month => now
                .checked_sub_months(Months::new(1))
                .unwrap_or(now - Duration::days(30)),
        }
    }

    /// Hourly buckets for `day`, calendar-day buckets otherwise.
    pub fn bucket_key(&self, at: DateTime<Utc>) -> String {
        match self {
            TrendPeriod::Day => at.format("%Y-%m-%d %H:00").to_string(),
            TrendPeriod::Week | TrendPeriod::Month => at.format("%Y-%m-%d").to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionTrend {
    pub question_text: String,
    pub total: usize,
    pub by_date: BTreeMap<String, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatePoint {
    pub date: String,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RatePoint {
    pub date: String,
    pub rate: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionSeries {
    pub question_id: String,
    pub question_text: String,
    pub total: usize,
    pub series: Vec<DatePoint>,
}

/// The report data as date-sorted arrays, ready for plotting.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartData {
    pub responses_by_date: Vec<DatePoint>,
    pub completion_rate_by_date: Vec<RatePoint>,
    pub responses_by_question: Vec<QuestionSeries>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendReport {
    pub period: TrendPeriod,
    pub window_start: DateTime<Utc>,
    pub generated_at: DateTime<Utc>,
    /// Responses inside the window; 0 means the window is empty, not the survey
    pub total_responses: usize,
    pub responses_by_date: BTreeMap<String, usize>,
    pub responses_by_question: BTreeMap<String, QuestionTrend>,
    pub completion_rate_by_date: BTreeMap<String, f64>,
    pub chart: ChartData,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TrendOutcome {
    /// The survey has no responses at all
    NoResponses { message: String },
    Report(TrendReport),
}

impl TrendOutcome {
    pub fn no_responses() -> Self {
        TrendOutcome::NoResponses {
            message: "No responses available for this survey".to_string(),
        }
    }

    pub fn report(&self) -> Option<&TrendReport> {
        match self {
            TrendOutcome::Report(report) => Some(report),
            TrendOutcome::NoResponses { .. } => None,
        }
    }
}

fn respondent_key(item: &CollectedResponse, policy: AnonymousPolicy) -> String {
    match (&item.response.respondent_id, policy) {
        (Some(id), _) => id.clone(),
        (None, AnonymousPolicy::Shared) => ANONYMOUS_RESPONDENT.to_string(),
        (None, AnonymousPolicy::PerResponse) => {
            format!("{ANONYMOUS_RESPONDENT}:{}", item.response.id)
        }
    }
}

/// Builds the trend report for the window of `period` ending at `now`.
///
/// `questions` is the survey's full question list; a respondent completes a
/// bucket when they answered every one of them within that bucket.
pub fn build_trend_report(
    questions: &[Question],
    mut collected: Vec<CollectedResponse>,
    period: TrendPeriod,
    anonymous: AnonymousPolicy,
    now: DateTime<Utc>,
) -> TrendOutcome {
    if collected.is_empty() {
        return TrendOutcome::no_responses();
    }

    collected.sort_by_key(|item| item.response.created_at);

    let window_start = period.window_start(now);
    let in_window: Vec<&CollectedResponse> = collected
        .iter()
        .filter(|item| item.response.created_at >= window_start)
        .collect();

    let mut responses_by_date: BTreeMap<String, usize> = BTreeMap::new();
    let mut responses_by_question: BTreeMap<String, QuestionTrend> = questions
        .iter()
        .map(|q| {
            (
                q.id.clone(),
                QuestionTrend {
                    question_text: q.text.clone(),
                    total: 0,
                    by_date: BTreeMap::new(),
                },
            )
        })
        .collect();
    let mut answered: BTreeMap<String, HashMap<String, HashSet<&str>>> = BTreeMap::new();

    for item in &in_window {
        let bucket = period.bucket_key(item.response.created_at);

        *responses_by_date.entry(bucket.clone()).or_insert(0) += 1;

        let trend = responses_by_question
            .entry(item.question_id.clone())
            .or_insert_with(|| QuestionTrend {
                question_text: item.question_text.clone(),
                total: 0,
                by_date: BTreeMap::new(),
            });
        trend.total += 1;
        *trend.by_date.entry(bucket.clone()).or_insert(0) += 1;

        answered
            .entry(bucket)
            .or_default()
            .entry(respondent_key(item, anonymous))
            .or_default()
            .insert(item.question_id.as_str());
    }

    let question_count = questions.len();
    let completion_rate_by_date: BTreeMap<String, f64> = answered
        .into_iter()
        .map(|(bucket, respondents)| {
            let completed = respondents
                .values()
                .filter(|set| question_count > 0 && set.len() == question_count)
                .count();
            (bucket, pct(completed, respondents.len()))
        })
        .collect();

    let chart = ChartData {
        responses_by_date: responses_by_date
            .iter()
            .map(|(date, count)| DatePoint {
                date: date.clone(),
                count: *count,
            })
            .collect(),
        completion_rate_by_date: completion_rate_by_date
            .iter()
            .map(|(date, rate)| RatePoint {
                date: date.clone(),
                rate: *rate,
            })
            .collect(),
        responses_by_question: responses_by_question
            .iter()
            .map(|(question_id, trend)| QuestionSeries {
                question_id: question_id.clone(),
                question_text: trend.question_text.clone(),
                total: trend.total,
                series: trend
                    .by_date
                    .iter()
                    .map(|(date, count)| DatePoint {
                        date: date.clone(),
                        count: *count,
                    })
                    .collect(),
            })
            .collect(),
    };

    TrendOutcome::Report(TrendReport {
        period,
        window_start,
        generated_at: now,
        total_responses: in_window.len(),
        responses_by_date,
        responses_by_question,
        completion_rate_by_date,
        chart,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{QuestionType, Response};
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 6, 15, 12, 30, 0).unwrap()
    }

    fn questions(n: usize) -> Vec<Question> {
        (1..=n)
            .map(|i| Question {
                id: format!("q{i}"),
                text: format!("Question {i}"),
                question_type: QuestionType::Text,
            })
            .collect()
    }

    fn answer(
        question: usize,
        respondent: Option<&str>,
        at: DateTime<Utc>,
        id: &str,
    ) -> CollectedResponse {
        CollectedResponse {
            question_id: format!("q{question}"),
            question_text: format!("Question {question}"),
            response: Response {
                id: id.to_string(),
                answer: "ok".to_string(),
                respondent_id: respondent.map(str::to_string),
                created_at: at,
            },
        }
    }

    #[test]
    fn test_period_parsing() {
        assert_eq!("week".parse::<TrendPeriod>().unwrap(), TrendPeriod::Week);
        let err = "year".parse::<TrendPeriod>().unwrap_err();
        assert_eq!(err.kind(), "ValidationFailure");
    }

    #[test]
    fn test_window_start() {
        let now = now();
        assert_eq!(TrendPeriod::Day.window_start(now), now - Duration::days(1));
        assert_eq!(TrendPeriod::Week.window_start(now), now - Duration::days(7));
        assert_eq!(
            TrendPeriod::Month.window_start(now),
            Utc.with_ymd_and_hms(2026, 5, 15, 12, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_bucket_keys() {
        let at = Utc.with_ymd_and_hms(2026, 6, 15, 9, 45, 12).unwrap();
        assert_eq!(TrendPeriod::Day.bucket_key(at), "2026-06-15 09:00");
        assert_eq!(TrendPeriod::Week.bucket_key(at), "2026-06-15");
        assert_eq!(TrendPeriod::Month.bucket_key(at), "2026-06-15");
    }

    #[test]
    fn test_no_responses_sentinel() {
        let outcome = build_trend_report(
            &questions(2),
            Vec::new(),
            TrendPeriod::Day,
            AnonymousPolicy::Shared,
            now(),
        );
        assert_eq!(outcome, TrendOutcome::no_responses());
    }

    #[test]
    fn test_empty_window_is_a_report() {
        let old = now() - Duration::days(3);
        let outcome = build_trend_report(
            &questions(1),
            vec![answer(1, Some("u1"), old, "r1")],
            TrendPeriod::Day,
            AnonymousPolicy::Shared,
            now(),
        );
        let report = outcome.report().expect("report for non-empty survey");
        assert_eq!(report.total_responses, 0);
        assert!(report.responses_by_date.is_empty());
        assert!(report.completion_rate_by_date.is_empty());
    }

    #[test]
    fn test_full_answer_set_in_one_bucket_completes() {
        let at = Utc.with_ymd_and_hms(2026, 6, 15, 10, 5, 0).unwrap();
        let collected = vec![
            answer(1, Some("u1"), at, "r1"),
            answer(2, Some("u1"), at, "r2"),
            answer(3, Some("u1"), at, "r3"),
            answer(1, Some("u2"), at, "r4"),
        ];
        let outcome = build_trend_report(
            &questions(3),
            collected,
            TrendPeriod::Day,
            AnonymousPolicy::Shared,
            now(),
        );
        let report = outcome.report().unwrap();

        assert_eq!(report.total_responses, 4);
        assert_eq!(report.responses_by_date["2026-06-15 10:00"], 4);
        assert_eq!(report.completion_rate_by_date["2026-06-15 10:00"], 50.0);
        assert_eq!(report.responses_by_question["q1"].total, 2);
        assert_eq!(report.responses_by_question["q1"].by_date["2026-06-15 10:00"], 2);
    }

    #[test]
    fn test_answers_split_across_buckets_do_not_complete() {
        let first = Utc.with_ymd_and_hms(2026, 6, 15, 8, 59, 0).unwrap();
        let second = Utc.with_ymd_and_hms(2026, 6, 15, 9, 1, 0).unwrap();
        let outcome = build_trend_report(
            &questions(2),
            vec![
                answer(1, Some("u1"), first, "r1"),
                answer(2, Some("u1"), second, "r2"),
            ],
            TrendPeriod::Day,
            AnonymousPolicy::Shared,
            now(),
        );
        let report = outcome.report().unwrap();
        assert_eq!(report.completion_rate_by_date["2026-06-15 08:00"], 0.0);
        assert_eq!(report.completion_rate_by_date["2026-06-15 09:00"], 0.0);
    }

    #[test]
    fn test_anonymous_policies() {
        let at = Utc.with_ymd_and_hms(2026, 6, 15, 11, 0, 0).unwrap();
        let collected = vec![answer(1, None, at, "r1"), answer(2, None, at, "r2")];

        let shared = build_trend_report(
            &questions(2),
            collected.clone(),
            TrendPeriod::Day,
            AnonymousPolicy::Shared,
            now(),
        );
        assert_eq!(
            shared.report().unwrap().completion_rate_by_date["2026-06-15 11:00"],
            100.0
        );

        let separate = build_trend_report(
            &questions(2),
            collected,
            TrendPeriod::Day,
            AnonymousPolicy::PerResponse,
            now(),
        );
        assert_eq!(
            separate.report().unwrap().completion_rate_by_date["2026-06-15 11:00"],
            0.0
        );
    }

    #[test]
    fn test_chart_series_sorted_by_date() {
        let collected = vec![
            answer(1, Some("u1"), now() - Duration::days(2), "r1"),
            answer(1, Some("u2"), now() - Duration::days(5), "r2"),
            answer(1, Some("u3"), now() - Duration::days(2), "r3"),
        ];
        let outcome = build_trend_report(
            &questions(1),
            collected,
            TrendPeriod::Week,
            AnonymousPolicy::Shared,
            now(),
        );
        let chart = &outcome.report().unwrap().chart;

        let dates: Vec<&str> = chart
            .responses_by_date
            .iter()
            .map(|p| p.date.as_str())
            .collect();
        assert_eq!(dates, vec!["2026-06-10", "2026-06-13"]);
        assert_eq!(chart.responses_by_date[1].count, 2);
        assert_eq!(chart.responses_by_question[0].series.len(), 2);
        assert_eq!(chart.completion_rate_by_date[0].rate, 100.0);
    }
}
