use async_trait::async_trait;
use aws_sdk_s3::operation::get_object::GetObjectError;
use tracing::debug;

use super::checked_id;
use crate::analyzers::types::AnalyticsSnapshot;
use crate::error::{AnalyticsError, Result};
use crate::services::SnapshotStore;

pub const DEFAULT_PREFIX: &str = "analytics/snapshots";

/// Stores each snapshot as the JSON object `<prefix>/<surveyId>.json`.
pub struct S3SnapshotStore {
    client: aws_sdk_s3::Client,
    bucket: String,
    prefix: String,
}

impl S3SnapshotStore {
    pub fn new(client: aws_sdk_s3::Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into().trim_end_matches('/').to_string();
        self
    }

    fn key_for(&self, survey_id: &str) -> Result<String> {
        Ok(format!("{}/{}.json", self.prefix, checked_id(survey_id)?))
    }
}

#[async_trait]
impl SnapshotStore for S3SnapshotStore {
    async fn get(&self, survey_id: &str) -> Result<Option<AnalyticsSnapshot>> {
        let key = self.key_for(survey_id)?;
        let output = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(&key)
            .send()
            .await
        {
            Ok(output) => output,
            Err(err) => {
                if matches!(err.as_service_error(), Some(GetObjectError::NoSuchKey(_))) {
                    return Ok(None);
                }
                return Err(AnalyticsError::Storage(format!(
                    "s3://{}/{key}: {err}",
                    self.bucket
                )));
            }
        };

        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| AnalyticsError::Storage(format!("s3://{}/{key}: {e}", self.bucket)))?
            .into_bytes();
        let snapshot = serde_json::from_slice(&bytes).map_err(|e| {
            AnalyticsError::Storage(format!("corrupt snapshot s3://{}/{key}: {e}", self.bucket))
        })?;
        Ok(Some(snapshot))
    }

    async fn put(&self, snapshot: &AnalyticsSnapshot) -> Result<()> {
        let key = self.key_for(&snapshot.survey_id)?;
        let body = serde_json::to_vec(snapshot)?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(&key)
            .body(body.into())
            .content_type("application/json")
            .send()
            .await
            .map_err(|e| AnalyticsError::Storage(format!("s3://{}/{key}: {e}", self.bucket)))?;

        debug!(bucket = %self.bucket, key = %key, "Stored snapshot");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> aws_sdk_s3::Client {
        let conf = aws_sdk_s3::Config::builder()
            .behavior_version(aws_sdk_s3::config::BehaviorVersion::latest())
            .region(aws_sdk_s3::config::Region::new("us-east-1"))
            .build();
        aws_sdk_s3::Client::from_conf(conf)
    }

    #[test]
    fn test_key_layout() {
        let store = S3SnapshotStore::new(client(), "bucket");
        assert_eq!(store.key_for("s1").unwrap(), "analytics/snapshots/s1.json");

        let store = store.with_prefix("custom/");
        assert_eq!(store.key_for("s1").unwrap(), "custom/s1.json");
        assert!(store.key_for("a/b").is_err());
    }
}
