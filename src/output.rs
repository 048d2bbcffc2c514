//! Summary formatting for the command-line front end.

use std::time::Duration;

use crate::cli::{OutputFormat, VerbosityLevel};
use crate::error::Result;
use crate::resolver::{CreditScore, PersonSummary, ReportSummary, StatusCode};

/// Formatter for response summaries
pub struct Output {
    verbosity: VerbosityLevel,
    format: OutputFormat,
    show_colors: bool,
}

impl Output {
    pub fn new(verbosity: VerbosityLevel, format: OutputFormat) -> Self {
        Self {
            verbosity,
            format,
            show_colors: atty::is(atty::Stream::Stdout),
        }
    }

    /// Disable ANSI colors regardless of the terminal
    pub fn without_colors(mut self) -> Self {
        self.show_colors = false;
        self
    }

    fn colorize(&self, text: &str, color: &str) -> String {
        if self.show_colors {
            format!("\x1b[{}m{}\x1b[0m", color, text)
        } else {
            text.to_string()
        }
    }

    pub fn format_summary(&self, summary: &ReportSummary) -> Result<String> {
        match self.format {
            OutputFormat::Json => Ok(serde_json::to_string_pretty(summary)? + "\n"),
            OutputFormat::Human => Ok(self.format_human(summary)),
        }
    }

    fn format_human(&self, summary: &ReportSummary) -> String {
        let mut output = self.format_status_line(summary);
        output.push('\n');

        if self.verbosity == VerbosityLevel::Quiet {
            return output;
        }

        for person in &summary.people {
            output.push_str(&self.format_person(person));
        }

        if !summary.documents.is_empty() {
            output.push_str("Documents:\n");
            for document in &summary.documents {
                let encoding = if document.encoding.is_empty() {
                    "inline"
                } else {
                    document.encoding.as_str()
                };
                output.push_str(&format!("  {} ({})\n", document.mime_type, encoding));
            }
        }

        output
    }

    fn format_status_line(&self, summary: &ReportSummary) -> String {
        let color = match summary.status {
            StatusCode::Completed => "32",
            StatusCode::New | StatusCode::Processing | StatusCode::Pending => "33",
            StatusCode::RequestError | StatusCode::ServiceError | StatusCode::Error => "31",
        };
        let mut line = format!(
            "Order {}: {}",
            summary.vendor_order_id.as_deref().unwrap_or("-"),
            self.colorize(summary.status.as_str(), color)
        );
        if !summary.status_description.is_empty() {
            line.push_str(&format!(" ({})", summary.status_description));
        }
        line
    }

    fn format_person(&self, person: &PersonSummary) -> String {
        let mut output = format!("{}:\n", capitalize(&person.person));

        for bureau in &person.bureaus {
            output.push_str(&format!("  {:<11} {}", bureau.bureau_name, bureau.result));
            if !bureau.error_description.is_empty() {
                output.push_str(&format!(
                    " - {}",
                    self.colorize(&bureau.error_description, "31")
                ));
            }
            output.push('\n');
        }

        if !person.scores.is_empty() {
            output.push_str("  Scores:\n");
            for score in &person.scores {
                output.push_str(&self.format_score(score));
            }
        }

        output.push_str(&format!("  Liabilities: {}\n", person.liability_count));
        output
    }

    fn format_score(&self, score: &CreditScore) -> String {
        let mut output = format!(
            "    {:<11} {} {}",
            score.bureau_name, score.model_name, score.value
        );
        if !score.minimum_value.is_empty() || !score.maximum_value.is_empty() {
            output.push_str(&format!(" ({}-{})", score.minimum_value, score.maximum_value));
        }
        if !score.date.is_empty() {
            output.push_str(&format!(" on {}", score.date));
        }
        output.push('\n');

        if self.verbosity >= VerbosityLevel::Verbose {
            for factor in &score.factors {
                output.push_str(&format!("      [{}] {}\n", factor.code, factor.text));
            }
        }
        output
    }
}

fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn format_duration(duration: Duration) -> String {
    let total_secs = duration.as_secs_f64();
    if total_secs < 1.0 {
        format!("{:.0}ms", duration.as_millis())
    } else if total_secs < 60.0 {
        format!("{:.2}s", total_secs)
    } else {
        let mins = (total_secs / 60.0) as u64;
        let secs = total_secs % 60.0;
        format!("{}m{:.1}s", mins, secs)
    }
}
