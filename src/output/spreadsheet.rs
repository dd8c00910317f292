//! Spreadsheet export: raw responses plus a per-question summary sheet.

use std::borrow::Cow;

use rust_xlsxwriter::{Format, Workbook, XlsxError};

use crate::error::{AnalyticsError, Result};
use crate::output::ExportInput;
use crate::output::tabular::ANONYMOUS_USER;
use crate::stats::{QuestionStat, StatDetail};

const RESPONSE_COLUMNS: [(&str, f64); 6] = [
    ("Response ID", 20.0),
    ("Question ID", 20.0),
    ("Question", 40.0),
    ("Answer", 40.0),
    ("User ID", 20.0),
    ("Timestamp", 26.0),
];

const SUMMARY_COLUMNS: [(&str, f64); 5] = [
    ("Question ID", 20.0),
    ("Question", 40.0),
    ("Type", 18.0),
    ("Responses", 12.0),
    ("Summary", 60.0),
];

pub const SUMMARY_SHEET: &str = "Summary Statistics";

/// Longest string Excel accepts in a single cell.
pub const EXCEL_MAX_CELL_CHARS: usize = 32_767;

const TIMESTAMP_FORMAT: &str = "yyyy-mm-dd hh:mm:ss.000";

/// Cuts `text` to [`EXCEL_MAX_CELL_CHARS`] characters. Longer answers are
/// stored truncated rather than failing the whole workbook.
pub fn cell_text(text: &str) -> Cow<'_, str> {
    match text.char_indices().nth(EXCEL_MAX_CELL_CHARS) {
        Some((cut, _)) => Cow::Owned(text[..cut].to_string()),
        None => Cow::Borrowed(text),
    }
}

/// One-line textual summary of a question statistic.
pub fn summarize(stat: &QuestionStat) -> String {
    match &stat.detail {
        StatDetail::SingleChoice { options } | StatDetail::MultipleChoice { options } => options
            .iter()
            .map(|(option, o)| format!("{}: {} ({:.1}%)", option, o.count, o.percentage))
            .collect::<Vec<_>>()
            .join(", "),
        StatDetail::Rating { average, .. } => format!("Average rating: {average:.2}/5"),
        _ => format!("{} responses", stat.count),
    }
}

pub fn render(input: &ExportInput<'_>) -> Result<Vec<u8>> {
    build_workbook(input).map_err(|e| AnalyticsError::Export(format!("spreadsheet: {e}")))
}

fn build_workbook(input: &ExportInput<'_>) -> std::result::Result<Vec<u8>, XlsxError> {
    let mut workbook = Workbook::new();
    let header_format = Format::new().set_bold();
    let timestamp_format = Format::new().set_num_format(TIMESTAMP_FORMAT);

    let worksheet = workbook.add_worksheet();
    worksheet.set_name("Responses")?;

    for (col, (title, width)) in RESPONSE_COLUMNS.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, *title, &header_format)?;
        worksheet.set_column_width(col, *width)?;
    }

    let mut row = 1u32;
    for item in input.pool {
        let response = &item.response;
        worksheet.write_string(row, 0, cell_text(&response.id))?;
        worksheet.write_string(row, 1, cell_text(&item.question_id))?;
        worksheet.write_string(row, 2, cell_text(&item.question_text))?;
        worksheet.write_string(row, 3, cell_text(&response.answer))?;
        let user = response.respondent_id.as_deref().unwrap_or(ANONYMOUS_USER);
        worksheet.write_string(row, 4, cell_text(user))?;
        worksheet.write_datetime_with_format(
            row,
            5,
            &response.created_at.naive_utc(),
            &timestamp_format,
        )?;
        row += 1;
    }

    let worksheet = workbook.add_worksheet();
    worksheet.set_name(SUMMARY_SHEET)?;

    for (col, (title, width)) in SUMMARY_COLUMNS.iter().enumerate() {
        let col = col as u16;
        worksheet.write_string_with_format(0, col, *title, &header_format)?;
        worksheet.set_column_width(col, *width)?;
    }

    let mut row = 1u32;
    for question in input.questions {
        worksheet.write_string(row, 0, cell_text(&question.id))?;
        worksheet.write_string(row, 1, cell_text(&question.text))?;
        worksheet.write_string(row, 2, question.question_type.label())?;
        match input.stats.get(&question.id) {
            Some(stat) => {
                worksheet.write_number(row, 3, stat.count as f64)?;
                worksheet.write_string(row, 4, cell_text(&summarize(stat)))?;
            }
            None => {
                worksheet.write_number(row, 3, 0.0)?;
            }
        }
        row += 1;
    }

    workbook.save_to_buffer()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::fixtures::fixture;

    #[test]
    fn test_summaries_by_type() {
        let fixture = fixture();
        assert_eq!(summarize(&fixture.stats["q1"]), "Git: 2 (66.7%), Vim: 1 (33.3%)");
        assert_eq!(summarize(&fixture.stats["q2"]), "Average rating: 4.50/5");
        assert_eq!(summarize(&fixture.stats["q3"]), "1 responses");
    }

    #[test]
    fn test_cell_text_caps_length() {
        assert_eq!(cell_text("short"), "short");
        let long = "é".repeat(40_000);
        let capped = cell_text(&long);
        assert_eq!(capped.chars().count(), EXCEL_MAX_CELL_CHARS);
    }

    #[test]
    fn test_render_accepts_oversized_answer() {
        let mut fixture = fixture();
        fixture.pool[0].response.answer = "x".repeat(40_000);
        fixture.questions[0].text = "q".repeat(33_000);
        let bytes = render(&fixture.input()).unwrap();
        assert_eq!(&bytes[..2], b"PK");
    }

    #[test]
    fn test_render_produces_xlsx_archive() {
        let fixture = fixture();
        let bytes = render(&fixture.input()).unwrap();
        // xlsx files are zip archives
        assert_eq!(&bytes[..2], b"PK");
    }
}
