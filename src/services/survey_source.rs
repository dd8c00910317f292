use async_trait::async_trait;

use crate::error::Result;
use crate::models::{Question, Response, Survey, User};

/// Read access to surveys, their questions and their responses.
#[async_trait]
pub trait SurveySource: Send + Sync {
    /// Fails with [`AnalyticsError::NotFound`] if the survey does not exist.
    ///
    /// [`AnalyticsError::NotFound`]: crate::error::AnalyticsError::NotFound
    async fn get_survey(&self, survey_id: &str) -> Result<Survey>;

    /// Questions of a survey in a stable order.
    async fn questions_by_survey(&self, survey_id: &str) -> Result<Vec<Question>>;

    async fn responses_by_question(&self, question_id: &str) -> Result<Vec<Response>>;
}

/// Resolves respondent ids to user records.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    async fn get_user(&self, user_id: &str) -> Result<User>;
}
