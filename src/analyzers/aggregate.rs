use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::analyzers::completion::{
    average_completion_minutes, first_question_response_count, first_to_last_completion_rate,
};
use crate::analyzers::types::{AnalyticsSnapshot, DemographicData, ExportPaths};
use crate::config::ParsePolicy;
use crate::error::Result;
use crate::models::{CollectedResponse, Question, Survey};
use crate::output::ExportInput;
use crate::services::SurveySource;
use crate::stats::{QuestionStat, analyze_question};

/// Everything fetched for one survey, with per-question stats computed.
#[derive(Debug, Clone)]
pub struct CollectedSurvey {
    pub survey: Survey,
    /// Fetched order
    pub questions: Vec<Question>,
    pub stats: BTreeMap<String, QuestionStat>,
    /// Response count per question, parallel to `questions`
    pub counts: Vec<usize>,
    pub pool: Vec<CollectedResponse>,
}

impl CollectedSurvey {
    pub fn total_responses(&self) -> usize {
        first_question_response_count(&self.counts)
    }

    pub fn completion_rate(&self) -> f64 {
        first_to_last_completion_rate(&self.counts)
    }

    pub fn export_input(&self, generated_at: DateTime<Utc>) -> ExportInput<'_> {
        ExportInput {
            survey: &self.survey,
            questions: &self.questions,
            pool: &self.pool,
            stats: &self.stats,
            completion_rate: self.completion_rate(),
            generated_at,
        }
    }
}

/// Fetches the survey, its questions and every question's responses.
///
/// Any fetch failure aborts the whole collection.
pub async fn fetch_responses(
    source: &dyn SurveySource,
    survey_id: &str,
) -> Result<(Survey, Vec<Question>, Vec<Vec<CollectedResponse>>)> {
    let survey = source.get_survey(survey_id).await?;
    let questions = source.questions_by_survey(survey_id).await?;

    let mut grouped = Vec::with_capacity(questions.len());
    for question in &questions {
        let responses = source.responses_by_question(&question.id).await?;
        debug!(question_id = %question.id, responses = responses.len(), "Fetched responses");
        grouped.push(
            responses
                .into_iter()
                .map(|response| CollectedResponse {
                    question_id: question.id.clone(),
                    question_text: question.text.clone(),
                    response,
                })
                .collect(),
        );
    }

    Ok((survey, questions, grouped))
}

/// Fetches a survey and analyzes each of its questions.
pub async fn collect_survey(
    source: &dyn SurveySource,
    survey_id: &str,
    policy: ParsePolicy,
) -> Result<CollectedSurvey> {
    let (survey, questions, grouped) = fetch_responses(source, survey_id).await?;

    let mut stats = BTreeMap::new();
    let mut counts = Vec::with_capacity(questions.len());
    let mut pool = Vec::new();

    for (question, collected) in questions.iter().zip(grouped) {
        let responses: Vec<_> = collected.iter().map(|c| c.response.clone()).collect();
        let stat = analyze_question(question, &responses, policy)?;
        counts.push(responses.len());
        stats.insert(question.id.clone(), stat);
        pool.extend(collected);
    }

    Ok(CollectedSurvey {
        survey,
        questions,
        stats,
        counts,
        pool,
    })
}

/// Builds the snapshot record, keeping `created_at` of the record it replaces.
pub fn assemble_snapshot(
    collected: &CollectedSurvey,
    demographic_data: DemographicData,
    export_paths: ExportPaths,
    previous: Option<&AnalyticsSnapshot>,
    now: DateTime<Utc>,
) -> AnalyticsSnapshot {
    AnalyticsSnapshot {
        survey_id: collected.survey.id.clone(),
        total_responses: collected.total_responses(),
        completion_rate: collected.completion_rate(),
        question_stats: collected.stats.clone(),
        demographic_data,
        average_completion_time: average_completion_minutes(&collected.pool),
        export_paths,
        created_at: previous.map(|p| p.created_at).unwrap_or(now),
        updated_at: now,
    }
}
