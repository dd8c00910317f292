//! Tabular export: one unquoted CSV row per response.

use chrono::SecondsFormat;
use csv::{QuoteStyle, WriterBuilder};

use crate::error::{AnalyticsError, Result};
use crate::models::CollectedResponse;
use crate::output::flatten_field;

pub const HEADER: [&str; 6] = [
    "ResponseID",
    "QuestionID",
    "QuestionText",
    "Answer",
    "UserID",
    "Timestamp",
];

/// Respondent column value for responses without a user.
pub const ANONYMOUS_USER: &str = "anonymous";

/// Renders the response pool as CSV.
///
/// Fields are never quoted; commas and line breaks inside them become spaces.
pub fn render(pool: &[CollectedResponse]) -> Result<Vec<u8>> {
    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .has_headers(false)
        .from_writer(Vec::new());

    writer.write_record(HEADER).map_err(csv_error)?;

    for item in pool {
        let response = &item.response;
        let user = response.respondent_id.as_deref().unwrap_or(ANONYMOUS_USER);
        writer
            .write_record([
                flatten_field(&response.id),
                flatten_field(&item.question_id),
                flatten_field(&item.question_text),
                flatten_field(&response.answer),
                flatten_field(user),
                response
                    .created_at
                    .to_rfc3339_opts(SecondsFormat::Millis, true),
            ])
            .map_err(csv_error)?;
    }

    writer
        .into_inner()
        .map_err(|e| AnalyticsError::Export(format!("CSV flush failed: {e}")))
}

fn csv_error(e: csv::Error) -> AnalyticsError {
    AnalyticsError::Export(format!("CSV write failed: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures::fixture;

    #[test]
    fn test_row_count_is_responses_plus_header() {
        let fixture = fixture();
        let bytes = render(&fixture.pool).unwrap();
        let content = String::from_utf8(bytes).unwrap();

        assert_eq!(content.lines().count(), fixture.pool.len() + 1);
        assert_eq!(
            content.lines().next().unwrap(),
            "ResponseID,QuestionID,QuestionText,Answer,UserID,Timestamp"
        );
    }

    #[test]
    fn test_commas_become_spaces_and_anonymous_user() {
        let fixture = fixture();
        let content = String::from_utf8(render(&fixture.pool).unwrap()).unwrap();

        assert!(content.contains("q3-r0,q3,Anything else  really?,More coffee  please,u1,"));
        assert!(content.contains("q1-r2,q1,Favourite tool,Git,anonymous,2026-03-02T10:02:00.000Z"));
        for line in content.lines() {
            assert_eq!(line.split(',').count(), HEADER.len());
        }
    }

    #[test]
    fn test_empty_pool_has_header_only() {
        let content = String::from_utf8(render(&[]).unwrap()).unwrap();
        assert_eq!(content.lines().count(), 1);
    }
}
