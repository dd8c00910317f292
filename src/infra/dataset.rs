use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AnalyticsError, Result};
use crate::models::{Question, Response, Survey, User};
use crate::services::{SurveySource, UserDirectory};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetQuestion {
    pub survey_id: String,
    #[serde(flatten)]
    pub question: Question,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetResponse {
    pub question_id: String,
    #[serde(flatten)]
    pub response: Response,
}

/// An in-memory copy of the platform's survey data.
///
/// Stored on disk as a single JSON object:
/// ```json
/// {
///   "surveys":   [{"id": "s1", "title": "...", "status": "PUBLISHED", "type": "GENERAL", "createdAt": "..."}],
///   "questions": [{"surveyId": "s1", "id": "q1", "text": "...", "type": "RATING"}],
///   "responses": [{"questionId": "q1", "id": "r1", "answer": "4", "respondentId": "u1", "createdAt": "..."}],
///   "users":     [{"id": "u1", "role": "PARTICIPANT"}]
/// }
/// ```
/// Questions are returned in file order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    #[serde(default)]
    pub surveys: Vec<Survey>,
    #[serde(default)]
    pub questions: Vec<DatasetQuestion>,
    #[serde(default)]
    pub responses: Vec<DatasetResponse>,
    #[serde(default)]
    pub users: Vec<User>,
}

impl Dataset {
    /// Loads the dataset from a JSON file at `path`.
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AnalyticsError::Source(format!("cannot read dataset {path}: {e}")))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| AnalyticsError::Source(format!("invalid dataset: {e}")))
    }

    pub fn add_survey(&mut self, survey: Survey) -> &mut Self {
        self.surveys.push(survey);
        self
    }

    pub fn add_question(&mut self, survey_id: &str, question: Question) -> &mut Self {
        self.questions.push(DatasetQuestion {
            survey_id: survey_id.to_string(),
            question,
        });
        self
    }

    pub fn add_response(&mut self, question_id: &str, response: Response) -> &mut Self {
        self.responses.push(DatasetResponse {
            question_id: question_id.to_string(),
            response,
        });
        self
    }

    pub fn add_user(&mut self, user: User) -> &mut Self {
        self.users.push(user);
        self
    }
}

#[async_trait]
impl SurveySource for Dataset {
    async fn get_survey(&self, survey_id: &str) -> Result<Survey> {
        self.surveys
            .iter()
            .find(|s| s.id == survey_id)
            .cloned()
            .ok_or_else(|| AnalyticsError::not_found("Survey", survey_id))
    }

    async fn questions_by_survey(&self, survey_id: &str) -> Result<Vec<Question>> {
        Ok(self
            .questions
            .iter()
            .filter(|q| q.survey_id == survey_id)
            .map(|q| q.question.clone())
            .collect())
    }

    async fn responses_by_question(&self, question_id: &str) -> Result<Vec<Response>> {
        Ok(self
            .responses
            .iter()
            .filter(|r| r.question_id == question_id)
            .map(|r| r.response.clone())
            .collect())
    }
}

#[async_trait]
impl UserDirectory for Dataset {
    async fn get_user(&self, user_id: &str) -> Result<User> {
        self.users
            .iter()
            .find(|u| u.id == user_id)
            .cloned()
            .ok_or_else(|| AnalyticsError::not_found("User", user_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::QuestionType;

    const SAMPLE: &str = r#"{
        "surveys": [{
            "id": "s1", "title": "Onboarding", "status": "PUBLISHED",
            "type": "GENERAL", "createdAt": "2026-01-01T00:00:00Z"
        }],
        "questions": [
            {"surveyId": "s1", "id": "q2", "text": "Second", "type": "TEXT"},
            {"surveyId": "s1", "id": "q1", "text": "First", "type": "RATING"},
            {"surveyId": "s2", "id": "q9", "text": "Other survey", "type": "TEXT"}
        ],
        "responses": [
            {"questionId": "q1", "id": "r1", "answer": "4", "respondentId": "u1",
             "createdAt": "2026-01-02T10:00:00Z"}
        ],
        "users": [{"id": "u1", "role": "PARTICIPANT"}]
    }"#;

    #[tokio::test]
    async fn test_from_json_and_lookups() {
        let dataset = Dataset::from_json(SAMPLE).unwrap();

        let survey = dataset.get_survey("s1").await.unwrap();
        assert_eq!(survey.title, "Onboarding");
        assert!(survey.description.is_none());

        let questions = dataset.questions_by_survey("s1").await.unwrap();
        let ids: Vec<&str> = questions.iter().map(|q| q.id.as_str()).collect();
        assert_eq!(ids, vec!["q2", "q1"]);
        assert_eq!(questions[1].question_type, QuestionType::Rating);

        let responses = dataset.responses_by_question("q1").await.unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].respondent_id.as_deref(), Some("u1"));

        assert_eq!(dataset.get_user("u1").await.unwrap().role, "PARTICIPANT");
    }

    #[tokio::test]
    async fn test_missing_survey_is_not_found() {
        let dataset = Dataset::from_json(SAMPLE).unwrap();
        let err = dataset.get_survey("nope").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(dataset.get_user("ghost").await.unwrap_err().is_not_found());
    }

    #[test]
    fn test_invalid_json_is_source_error() {
        let err = Dataset::from_json("{not json").unwrap_err();
        assert_eq!(err.kind(), "SourceFailure");
    }
}
