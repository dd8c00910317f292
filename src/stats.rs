//! Per-question statistics.
//!
//! Each question type gets its own statistic shape; all of them share the
//! `{questionText, count}` envelope of [`QuestionStat`].

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::ParsePolicy;
use crate::error::{AnalyticsError, Result};
use crate::models::{Question, QuestionType, Response};

/// Number of raw answers kept as examples for TEXT questions.
pub const TEXT_EXAMPLE_LIMIT: usize = 5;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionStat {
    pub question_text: String,
    /// Responses received for the question, valid or not
    pub count: usize,
    #[serde(flatten)]
    pub detail: StatDetail,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptionStat {
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingBucket {
    pub value: i64,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatDetail {
    SingleChoice {
        options: BTreeMap<String, OptionStat>,
    },
    MultipleChoice {
        options: BTreeMap<String, OptionStat>,
    },
    Rating {
        average: f64,
        min: i64,
        max: i64,
        /// Sorted by rating value
        distribution: Vec<RatingBucket>,
        invalid: usize,
    },
    #[serde(rename_all = "camelCase")]
    Text {
        average_length: f64,
        examples: Vec<String>,
    },
    #[serde(rename_all = "camelCase")]
    Date {
        /// Keyed by `YYYY-MM`
        date_distribution: BTreeMap<String, usize>,
        invalid: usize,
    },
    Other,
}

impl QuestionStat {
    /// Choice options, if this is a choice question.
    pub fn options(&self) -> Option<&BTreeMap<String, OptionStat>> {
        match &self.detail {
            StatDetail::SingleChoice { options } | StatDetail::MultipleChoice { options } => {
                Some(options)
            }
            _ => None,
        }
    }
}

/// Percentage of `part` in `total`, 0 when `total` is 0.
pub fn pct(part: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        (part as f64 * 100.0) / total as f64
    }
}

/// Computes the statistic for one question from its responses.
///
/// # Errors
///
/// Under [`ParsePolicy::Strict`], returns [`AnalyticsError::Parse`] for the
/// first RATING or DATE answer that does not parse.
pub fn analyze_question(
    question: &Question,
    responses: &[Response],
    policy: ParsePolicy,
) -> Result<QuestionStat> {
    let detail = match question.question_type {
        QuestionType::SingleChoice => StatDetail::SingleChoice {
            options: tally_options(responses),
        },
        QuestionType::MultipleChoice => StatDetail::MultipleChoice {
            options: tally_options(responses),
        },
        QuestionType::Rating => analyze_rating(question, responses, policy)?,
        QuestionType::Text => analyze_text(responses),
        QuestionType::Date => analyze_dates(question, responses, policy)?,
        QuestionType::Other => StatDetail::Other,
    };

    debug!(
        question_id = %question.id,
        question_type = question.question_type.label(),
        responses = responses.len(),
        "Question analyzed"
    );

    Ok(QuestionStat {
        question_text: question.text.clone(),
        count: responses.len(),
        detail,
    })
}

fn tally_options(responses: &[Response]) -> BTreeMap<String, OptionStat> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for response in responses {
        for token in response.answer.split(',') {
            let token = token.trim();
            if token.is_empty() {
                continue;
            }
            *counts.entry(token.to_string()).or_insert(0) += 1;
        }
    }

    let total = responses.len();
    counts
        .into_iter()
        .map(|(option, count)| {
            (
                option,
                OptionStat {
                    count,
                    percentage: pct(count, total),
                },
            )
        })
        .collect()
}

fn analyze_rating(
    question: &Question,
    responses: &[Response],
    policy: ParsePolicy,
) -> Result<StatDetail> {
    let mut sum = 0i64;
    let mut valid = 0usize;
    let mut invalid = 0usize;
    let mut min: Option<i64> = None;
    let mut max: Option<i64> = None;
    let mut distribution: BTreeMap<i64, usize> = BTreeMap::new();

    for response in responses {
        let value = match response.answer.trim().parse::<i64>() {
            Ok(value) => value,
            Err(_) => {
                reject_answer(question, response, "rating", policy)?;
                invalid += 1;
                continue;
            }
        };
        // A value that would overflow the running sum is rejected like a non-number.
        let Some(next_sum) = sum.checked_add(value) else {
            reject_answer(question, response, "rating", policy)?;
            invalid += 1;
            continue;
        };

        sum = next_sum;
        valid += 1;
        min = Some(min.map_or(value, |m| m.min(value)));
        max = Some(max.map_or(value, |m| m.max(value)));
        *distribution.entry(value).or_insert(0) += 1;
    }

    let average = if valid == 0 {
        0.0
    } else {
        sum as f64 / valid as f64
    };

    Ok(StatDetail::Rating {
        average,
        min: min.unwrap_or(0),
        max: max.unwrap_or(0),
        distribution: distribution
            .into_iter()
            .map(|(value, count)| RatingBucket { value, count })
            .collect(),
        invalid,
    })
}

fn analyze_text(responses: &[Response]) -> StatDetail {
    let total_length: usize = responses.iter().map(|r| r.answer.chars().count()).sum();
    let average_length = if responses.is_empty() {
        0.0
    } else {
        total_length as f64 / responses.len() as f64
    };

    StatDetail::Text {
        average_length,
        examples: responses
            .iter()
            .take(TEXT_EXAMPLE_LIMIT)
            .map(|r| r.answer.clone())
            .collect(),
    }
}

fn analyze_dates(
    question: &Question,
    responses: &[Response],
    policy: ParsePolicy,
) -> Result<StatDetail> {
    let mut date_distribution: BTreeMap<String, usize> = BTreeMap::new();
    let mut invalid = 0usize;

    for response in responses {
        match parse_calendar_date(&response.answer) {
            Some(date) => {
                *date_distribution
                    .entry(date.format("%Y-%m").to_string())
                    .or_insert(0) += 1;
            }
            None => {
                reject_answer(question, response, "date", policy)?;
                invalid += 1;
            }
        }
    }

    Ok(StatDetail::Date {
        date_distribution,
        invalid,
    })
}

/// Accepts `YYYY-MM-DD` or a full RFC 3339 timestamp.
pub fn parse_calendar_date(answer: &str) -> Option<NaiveDate> {
    let answer = answer.trim();
    NaiveDate::parse_from_str(answer, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            DateTime::parse_from_rfc3339(answer)
                .ok()
                .map(|dt| dt.date_naive())
        })
}

fn reject_answer(
    question: &Question,
    response: &Response,
    kind: &'static str,
    policy: ParsePolicy,
) -> Result<()> {
    match policy {
        ParsePolicy::Strict => Err(AnalyticsError::Parse {
            question_id: question.id.clone(),
            kind,
            value: response.answer.clone(),
        }),
        ParsePolicy::Lenient => {
            warn!(
                question_id = %question.id,
                response_id = %response.id,
                kind,
                "Skipping unparsable answer"
            );
            Ok(())
        }
    }
}
