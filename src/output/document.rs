//! Document export: a paginated PDF survey report.
//!
//! The report is first built as a list of styled lines, then laid out on A4
//! pages with the built-in Helvetica faces.

use printpdf::{BuiltinFont, Error as PdfError, Mm, PdfDocument};

use crate::analyzers::utility::round_to;
use crate::error::{AnalyticsError, Result};
use crate::output::ExportInput;
use crate::stats::StatDetail;

/// Longest text example shown before truncation.
pub const EXAMPLE_MAX_CHARS: usize = 100;

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const MARGIN_MM: f32 = 20.0;
const PT_TO_MM: f32 = 0.3528;
const LEADING: f32 = 1.4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Title,
    Heading,
    Subheading,
    Body,
}

impl LineStyle {
    fn font_size(self) -> f32 {
        match self {
            LineStyle::Title => 20.0,
            LineStyle::Heading => 15.0,
            LineStyle::Subheading => 12.0,
            LineStyle::Body => 10.0,
        }
    }

    fn is_bold(self) -> bool {
        !matches!(self, LineStyle::Body)
    }

    /// Characters per line that fit between the margins.
    fn wrap_width(self) -> usize {
        match self {
            LineStyle::Title => 45,
            LineStyle::Heading => 60,
            LineStyle::Subheading => 75,
            LineStyle::Body => 95,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportLine {
    pub style: LineStyle,
    pub text: String,
}

#[derive(Default)]
struct Report {
    lines: Vec<ReportLine>,
}

impl Report {
    fn push(&mut self, style: LineStyle, text: impl Into<String>) {
        self.lines.push(ReportLine {
            style,
            text: text.into(),
        });
    }

    fn body(&mut self, text: impl Into<String>) {
        self.push(LineStyle::Body, text);
    }

    fn gap(&mut self) {
        self.body("");
    }
}

/// Truncates to [`EXAMPLE_MAX_CHARS`] characters, marking the cut with `...`.
pub fn truncate_example(text: &str) -> String {
    if text.chars().count() <= EXAMPLE_MAX_CHARS {
        return text.to_string();
    }
    let head: String = text.chars().take(EXAMPLE_MAX_CHARS).collect();
    format!("{head}...")
}

/// The report content in reading order.
pub fn report_lines(input: &ExportInput<'_>) -> Vec<ReportLine> {
    let survey = input.survey;
    let mut report = Report::default();

    report.push(LineStyle::Title, format!("Survey Report: {}", survey.title));
    if let Some(description) = survey.description.as_deref().filter(|d| !d.is_empty()) {
        report.body(description);
    }
    report.gap();
    report.body(format!("Created: {}", survey.created_at.format("%Y-%m-%d")));
    report.body(format!("Status: {}", survey.status));
    report.body(format!("Type: {}", survey.survey_type));
    if let Some(start) = survey.start_date {
        report.body(format!("Start date: {}", start.format("%Y-%m-%d")));
    }
    if let Some(end) = survey.end_date {
        report.body(format!("End date: {}", end.format("%Y-%m-%d")));
    }

    let total_responses = input
        .questions
        .first()
        .and_then(|q| input.stats.get(&q.id))
        .map_or(0, |stat| stat.count);
    report.gap();
    report.push(LineStyle::Heading, "Summary");
    report.body(format!("Total responses: {total_responses}"));
    report.body(format!("Completion rate: {}%", round_to(input.completion_rate, 0)));

    report.gap();
    report.push(LineStyle::Heading, "Questions");

    for (index, question) in input.questions.iter().enumerate() {
        report.gap();
        report.push(LineStyle::Subheading, format!("{}. {}", index + 1, question.text));
        report.body(format!("Type: {}", question.question_type.label()));

        let Some(stat) = input.stats.get(&question.id) else {
            report.body("No statistics available.");
            continue;
        };
        report.body(format!("Responses: {}", stat.count));

        match &stat.detail {
            StatDetail::SingleChoice { options } | StatDetail::MultipleChoice { options } => {
                if options.is_empty() {
                    report.body("No answers recorded.");
                }
                for (option, o) in options {
                    report.body(format!("  {}: {} ({:.1}%)", option, o.count, o.percentage));
                }
            }
            StatDetail::Rating {
                average,
                min,
                max,
                distribution,
                ..
            } => {
                report.body(format!("Average: {average:.2}"));
                report.body(format!("Min: {min}"));
                report.body(format!("Max: {max}"));
                report.body("Distribution:");
                for bucket in distribution {
                    report.body(format!("  {}: {}", bucket.value, bucket.count));
                }
            }
            StatDetail::Text {
                average_length,
                examples,
            } => {
                report.body(format!("Average length: {average_length:.1} characters"));
                if !examples.is_empty() {
                    report.body("Examples:");
                    for example in examples {
                        report.body(format!("  \"{}\"", truncate_example(example)));
                    }
                }
            }
            StatDetail::Date {
                date_distribution, ..
            } => {
                report.body("By month:");
                for (month, count) in date_distribution {
                    report.body(format!("  {month}: {count}"));
                }
            }
            StatDetail::Other => {}
        }
    }

    report.gap();
    report.body(format!(
        "Generated at {}",
        input.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));

    report.lines
}

/// Splits `text` into chunks of at most `width` characters, breaking on
/// whitespace where possible. An empty string yields one empty chunk.
pub fn wrap(text: &str, width: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut word: Vec<char> = word.chars().collect();

        while word.len() > width {
            if current_len > 0 {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = word.split_off(width);
            chunks.push(word.into_iter().collect());
            word = rest;
        }

        let needed = if current_len == 0 {
            word.len()
        } else {
            current_len + 1 + word.len()
        };
        if needed > width && current_len > 0 {
            chunks.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(word.iter());
        current_len += word.len();
    }

    if current_len > 0 || chunks.is_empty() {
        chunks.push(current);
    }
    chunks
}

pub fn render(input: &ExportInput<'_>) -> Result<Vec<u8>> {
    let title = format!("Survey Report: {}", input.survey.title);
    layout_pdf(&title, &report_lines(input))
        .map_err(|e| AnalyticsError::Export(format!("document: {e}")))
}

fn layout_pdf(title: &str, lines: &[ReportLine]) -> std::result::Result<Vec<u8>, PdfError> {
    let (doc, page, layer) =
        PdfDocument::new(title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Report");
    let regular = doc.add_builtin_font(BuiltinFont::Helvetica)?;
    let bold = doc.add_builtin_font(BuiltinFont::HelveticaBold)?;

    let mut current = doc.get_page(page).get_layer(layer);
    let mut y = PAGE_HEIGHT_MM - MARGIN_MM;

    for line in lines {
        let size = line.style.font_size();
        let step = size * PT_TO_MM * LEADING;
        let font = if line.style.is_bold() {
            &bold
        } else {
            &regular
        };

        for chunk in wrap(&line.text, line.style.wrap_width()) {
            if y - step < MARGIN_MM {
                let (page, layer) = doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Report");
                current = doc.get_page(page).get_layer(layer);
                y = PAGE_HEIGHT_MM - MARGIN_MM;
            }
            y -= step;
            if !chunk.is_empty() {
                current.use_text(chunk, size, Mm(MARGIN_MM), Mm(y), font);
            }
        }
    }

    doc.save_to_bytes()
}
