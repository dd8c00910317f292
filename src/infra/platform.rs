//! HTTP client for the survey platform API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{AnalyticsError, Result};
use crate::models::{Question, Response, Survey, User};
use crate::services::{SurveySource, UserDirectory};

/// Reads surveys, questions, responses and users over REST:
///
/// - `GET {base}/surveys/{id}`
/// - `GET {base}/surveys/{id}/questions`
/// - `GET {base}/questions/{id}/responses`
/// - `GET {base}/users/{id}`
///
/// Requests carry `Authorization: Bearer <token>` when a token is configured.
pub struct PlatformClient {
    base_url: String,
    token: Option<String>,
    http: reqwest::Client,
}

impl PlatformClient {
    pub fn new(base_url: &str, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .map_err(|e| AnalyticsError::Source(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            http,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        entity: &'static str,
        id: &str,
    ) -> Result<T> {
        let url = self.endpoint(path);
        debug!(url = %url, "Platform request");

        let mut request = self.http.get(&url);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| AnalyticsError::Source(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(AnalyticsError::not_found(entity, id));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalyticsError::Source(format!(
                "{url} returned status {status}: {body}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| AnalyticsError::Source(format!("invalid response from {url}: {e}")))
    }
}

#[async_trait]
impl SurveySource for PlatformClient {
    async fn get_survey(&self, survey_id: &str) -> Result<Survey> {
        self.get_json(&format!("surveys/{survey_id}"), "Survey", survey_id)
            .await
    }

    async fn questions_by_survey(&self, survey_id: &str) -> Result<Vec<Question>> {
        self.get_json(&format!("surveys/{survey_id}/questions"), "Survey", survey_id)
            .await
    }

    async fn responses_by_question(&self, question_id: &str) -> Result<Vec<Response>> {
        self.get_json(
            &format!("questions/{question_id}/responses"),
            "Question",
            question_id,
        )
        .await
    }
}

#[async_trait]
impl UserDirectory for PlatformClient {
    async fn get_user(&self, user_id: &str) -> Result<User> {
        self.get_json(&format!("users/{user_id}"), "User", user_id)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_cleanly() {
        let client = PlatformClient::new("https://surveys.example.com/api/", None).unwrap();
        assert_eq!(
            client.endpoint("/surveys/s1/questions"),
            "https://surveys.example.com/api/surveys/s1/questions"
        );
        assert_eq!(
            client.endpoint("users/u1"),
            "https://surveys.example.com/api/users/u1"
        );
    }
}
