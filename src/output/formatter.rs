//! Output formatters for score reports

use crate::config::OutputFormat;
use crate::error::{Result, ResumeAtsError};
use crate::output::report::{ScoreBand, ScoreReport};
use colored::{Color, Colorize};
use std::path::Path;

/// How many missing phrases the non-detailed views list
const TOP_GAPS: usize = 5;

pub trait OutputFormatter {
    fn format_report(&self, report: &ScoreReport) -> Result<String>;
    fn supports_format(&self) -> OutputFormat;
}

/// Console formatter with colors
pub struct ConsoleFormatter {
    use_colors: bool,
    detailed: bool,
}

/// JSON formatter for scripting and API integration
pub struct JsonFormatter {
    pretty: bool,
}

pub struct MarkdownFormatter {
    include_metadata: bool,
    detailed: bool,
}

/// Report generator that coordinates the formatters
pub struct ReportGenerator {
    console_formatter: ConsoleFormatter,
    json_formatter: JsonFormatter,
    markdown_formatter: MarkdownFormatter,
}

impl ConsoleFormatter {
    pub fn new(use_colors: bool, detailed: bool) -> Self {
        Self { use_colors, detailed }
    }

    fn colorize(&self, text: &str, color: Color) -> String {
        if self.use_colors {
            text.color(color).to_string()
        } else {
            text.to_string()
        }
    }

    fn format_header(&self, title: &str, level: u8) -> String {
        let prefix = match level {
            1 => "█",
            2 => "▓",
            _ => "▒",
        };

        let color = match level {
            1 => Color::Blue,
            2 => Color::Green,
            _ => Color::Yellow,
        };

        if self.use_colors {
            format!("\n{} {}\n", prefix.color(color).bold(), title.color(color).bold())
        } else {
            format!("\n{} {}\n", prefix, title)
        }
    }

    fn format_score_badge(&self, band: ScoreBand) -> String {
        let color = match band {
            ScoreBand::Excellent => Color::Green,
            ScoreBand::Good => Color::BrightGreen,
            ScoreBand::Fair => Color::Yellow,
            ScoreBand::Poor => Color::BrightRed,
        };

        if self.use_colors {
            format!("[{}]", band.label().color(color).bold())
        } else {
            format!("[{}]", band.label())
        }
    }

    fn format_skill(&self, skill: &str, matched: bool) -> String {
        if matched {
            format!("  {} {}\n", self.colorize("✓", Color::Green), skill)
        } else {
            format!("  {} {}\n", self.colorize("✗", Color::Red), skill)
        }
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format_report(&self, report: &ScoreReport) -> Result<String> {
        let mut output = String::new();
        let result = &report.result;

        output.push_str(&self.format_header("📊 ATS SCORE", 1));
        output.push_str(&format!(
            "Generated: {} | Processing time: {}ms\n",
            report.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
            report.metadata.processing_time_ms
        ));

        match report.band() {
            Some(band) => output.push_str(&format!(
                "\nScore: {}% {}\n",
                result.score,
                self.format_score_badge(band)
            )),
            None => output.push_str(&format!(
                "\nScore: {}% {}\n",
                result.score,
                self.colorize(&format!("({})", result.outcome), Color::BrightRed)
            )),
        }
        output.push_str(&format!("{}\n", self.colorize(&result.feedback, Color::Cyan)));

        if !report.is_scored() {
            return Ok(output);
        }

        output.push_str(&self.format_header(
            &format!("Matched Skills ({})", result.matched_skills.len()),
            2,
        ));
        if result.matched_skills.is_empty() {
            output.push_str("  (none)\n");
        }
        for skill in &result.matched_skills {
            output.push_str(&self.format_skill(skill, true));
        }

        output.push_str(&self.format_header(
            &format!("Missing Skills ({})", result.missing_skills.len()),
            2,
        ));
        if result.missing_skills.is_empty() {
            output.push_str("  (none)\n");
        }
        for skill in &result.missing_skills {
            output.push_str(&self.format_skill(skill, false));
        }

        if self.detailed {
            output.push_str(&self.format_header("Phrase Detail", 3));
            output.push_str(&format!(
                "  {:<32} {:>9} {:>10}\n",
                "Phrase", "Relevance", "Similarity"
            ));
            for assessment in &report.assessments {
                let similarity = format!("{:.3}", assessment.similarity);
                let similarity = if assessment.matched {
                    self.colorize(&similarity, Color::Green)
                } else {
                    self.colorize(&similarity, Color::Red)
                };
                output.push_str(&format!(
                    "  {:<32} {:>9.3} {:>10}\n",
                    assessment.phrase, assessment.relevance, similarity
                ));
            }

            output.push_str(&format!(
                "\nThreshold: {:.2} | Model: {}\n",
                report.metadata.threshold,
                report.metadata.embedding_model.as_deref().unwrap_or("none")
            ));
        } else {
            let gaps = report.top_gaps(TOP_GAPS);
            if !gaps.is_empty() {
                output.push_str(&self.format_header("Top Gaps", 3));
                for (i, gap) in gaps.iter().enumerate() {
                    output.push_str(&format!("  {}. {}\n", i + 1, gap.phrase));
                }
            }
        }

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Console
    }
}

impl JsonFormatter {
    pub fn new(pretty: bool) -> Self {
        Self { pretty }
    }
}

impl OutputFormatter for JsonFormatter {
    fn format_report(&self, report: &ScoreReport) -> Result<String> {
        if self.pretty {
            Ok(serde_json::to_string_pretty(report)?)
        } else {
            Ok(serde_json::to_string(report)?)
        }
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Json
    }
}

impl MarkdownFormatter {
    pub fn new(include_metadata: bool, detailed: bool) -> Self {
        Self {
            include_metadata,
            detailed,
        }
    }

    fn markdown_score_badge(band: ScoreBand) -> &'static str {
        match band {
            ScoreBand::Excellent => "🟢 Excellent",
            ScoreBand::Good => "🟡 Good",
            ScoreBand::Fair => "🟠 Fair",
            ScoreBand::Poor => "🔴 Poor",
        }
    }

    fn file_name(path: &str) -> String {
        Path::new(path)
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| path.to_string())
    }
}

impl OutputFormatter for MarkdownFormatter {
    fn format_report(&self, report: &ScoreReport) -> Result<String> {
        let mut output = String::new();
        let result = &report.result;

        output.push_str("# 📊 ATS Score Report\n\n");

        if self.include_metadata {
            output.push_str(&format!(
                "**Generated:** {} | **Processing Time:** {}ms\n",
                report.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
                report.metadata.processing_time_ms
            ));
            output.push_str(&format!(
                "**Resume:** `{}` | **Job:** `{}`\n\n",
                Self::file_name(&report.metadata.resume_path),
                Self::file_name(&report.metadata.job_path)
            ));
        }

        output.push_str("## Summary\n\n");
        match report.band() {
            Some(band) => output.push_str(&format!(
                "**Score:** {}% {}\n\n",
                result.score,
                Self::markdown_score_badge(band)
            )),
            None => output.push_str(&format!("**Score:** {}% ({})\n\n", result.score, result.outcome)),
        }
        output.push_str(&format!("{}\n\n", result.feedback));

        if !report.is_scored() {
            return Ok(output);
        }

        output.push_str("## Matched Skills\n\n");
        if result.matched_skills.is_empty() {
            output.push_str("_None_\n");
        }
        for skill in &result.matched_skills {
            output.push_str(&format!("- ✅ {}\n", skill));
        }
        output.push('\n');

        output.push_str("## Missing Skills\n\n");
        if result.missing_skills.is_empty() {
            output.push_str("_None_\n");
        }
        for skill in &result.missing_skills {
            output.push_str(&format!("- ❌ {}\n", skill));
        }
        output.push('\n');

        if self.detailed && !report.assessments.is_empty() {
            output.push_str("## Phrase Detail\n\n");
            output.push_str("| Phrase | Relevance | Similarity | Matched |\n");
            output.push_str("|--------|-----------|------------|---------|\n");
            for assessment in &report.assessments {
                output.push_str(&format!(
                    "| {} | {:.3} | {:.3} | {} |\n",
                    assessment.phrase,
                    assessment.relevance,
                    assessment.similarity,
                    if assessment.matched { "yes" } else { "no" }
                ));
            }
            output.push('\n');
        }

        if self.include_metadata {
            output.push_str("---\n\n");
            output.push_str(&format!(
                "*Scored with `{}` at threshold {:.2} by resume-ats {}*\n",
                report.metadata.embedding_model.as_deref().unwrap_or("no model"),
                report.metadata.threshold,
                report.metadata.scorer_version
            ));
        }

        Ok(output)
    }

    fn supports_format(&self) -> OutputFormat {
        OutputFormat::Markdown
    }
}

impl ReportGenerator {
    pub fn new() -> Self {
        Self {
            console_formatter: ConsoleFormatter::new(true, false),
            json_formatter: JsonFormatter::new(true),
            markdown_formatter: MarkdownFormatter::new(true, false),
        }
    }

    pub fn with_options(use_colors: bool, detailed: bool, pretty_json: bool, include_metadata: bool) -> Self {
        Self {
            console_formatter: ConsoleFormatter::new(use_colors, detailed),
            json_formatter: JsonFormatter::new(pretty_json),
            markdown_formatter: MarkdownFormatter::new(include_metadata, detailed),
        }
    }

    pub fn generate_report(&self, report: &ScoreReport, format: OutputFormat) -> Result<String> {
        match format {
            OutputFormat::Console => self.console_formatter.format_report(report),
            OutputFormat::Json => self.json_formatter.format_report(report),
            OutputFormat::Markdown => self.markdown_formatter.format_report(report),
        }
    }
}

impl Default for ReportGenerator {
    fn default() -> Self {
        Self::new()
    }
}

pub fn save_report_to_file(content: &str, file_path: &Path) -> Result<()> {
    use std::fs;
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    fs::write(file_path, content).map_err(|e| {
        ResumeAtsError::OutputFormatting(format!("Failed to write {}: {}", file_path.display(), e))
    })
}

pub fn suggest_filename(format: OutputFormat, resume_name: &str, timestamp: bool) -> String {
    let base_name = Path::new(resume_name)
        .file_stem()
        .unwrap_or_default()
        .to_string_lossy();

    let timestamp_suffix = if timestamp {
        format!("_{}", chrono::Utc::now().format("%Y%m%d_%H%M%S"))
    } else {
        String::new()
    };

    match format {
        OutputFormat::Console => format!("{}_ats{}.txt", base_name, timestamp_suffix),
        OutputFormat::Json => format!("{}_ats{}.json", base_name, timestamp_suffix),
        OutputFormat::Markdown => format!("{}_ats{}.md", base_name, timestamp_suffix),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::analyzer::AtsAnalysis;
    use crate::processing::ats_matcher::{summarize, MatchResult, PhraseAssessment};
    use tempfile::TempDir;

    fn scored_report() -> ScoreReport {
        let assessments = vec![
            PhraseAssessment { phrase: "python".into(), relevance: 0.9, similarity: 0.71, matched: true },
            PhraseAssessment { phrase: "cloud computing".into(), relevance: 0.8, similarity: 0.12, matched: false },
            PhraseAssessment { phrase: "sql".into(), relevance: 0.6, similarity: 0.55, matched: true },
        ];
        let analysis = AtsAnalysis {
            result: summarize(&assessments),
            assessments,
            processing_time_ms: 7,
        };
        ScoreReport::from_analysis(analysis, Some("potion-base-8M".into()), 0.4, "/tmp/jane.pdf", "/tmp/job.md")
    }

    fn degraded_report() -> ScoreReport {
        let analysis = AtsAnalysis {
            result: MatchResult::missing_job_description(),
            assessments: Vec::new(),
            processing_time_ms: 0,
        };
        ScoreReport::from_analysis(analysis, None, 0.4, "cv.txt", "job.txt")
    }

    #[test]
    fn test_console_plain_output() {
        let output = ConsoleFormatter::new(false, false).format_report(&scored_report()).unwrap();

        assert!(output.contains("Score: 66% [GOOD]"));
        assert!(output.contains("Matched Skills (2)"));
        assert!(output.contains("✓ python"));
        assert!(output.contains("✗ cloud computing"));
        assert!(output.contains("1. cloud computing"));
        assert!(!output.contains('\u{1b}'));
    }

    #[test]
    fn test_console_detailed_lists_similarities() {
        let output = ConsoleFormatter::new(false, true).format_report(&scored_report()).unwrap();
        assert!(output.contains("Phrase Detail"));
        assert!(output.contains("0.710"));
        assert!(output.contains("Model: potion-base-8M"));
    }

    #[test]
    fn test_console_degraded_shows_feedback_only() {
        let output = ConsoleFormatter::new(false, false).format_report(&degraded_report()).unwrap();
        assert!(output.contains("Score: 0%"));
        assert!(output.contains("Please provide a job description."));
        assert!(!output.contains("Matched Skills"));
    }

    #[test]
    fn test_json_round_trips_result() {
        let report = scored_report();
        let json = JsonFormatter::new(false).format_report(&report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["result"]["score"], 66);
        assert_eq!(value["result"]["outcome"], "scored");
        assert_eq!(value["result"]["missing_skills"][0], "cloud computing");
        assert_eq!(value["metadata"]["job_path"], "/tmp/job.md");
    }

    #[test]
    fn test_markdown_output() {
        let output = MarkdownFormatter::new(true, true).format_report(&scored_report()).unwrap();

        assert!(output.starts_with("# 📊 ATS Score Report"));
        assert!(output.contains("**Resume:** `jane.pdf`"));
        assert!(output.contains("**Score:** 66% 🟡 Good"));
        assert!(output.contains("- ❌ cloud computing"));
        assert!(output.contains("| python | 0.900 | 0.710 | yes |"));
    }

    #[test]
    fn test_generator_dispatches_by_format() {
        let generator = ReportGenerator::with_options(false, false, true, false);
        let report = degraded_report();

        for format in [OutputFormat::Console, OutputFormat::Json, OutputFormat::Markdown] {
            let output = generator.generate_report(&report, format).unwrap();
            assert!(output.contains("Please provide a job description."));
        }
    }

    #[test]
    fn test_save_report_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("reports").join("cv_ats.md");

        save_report_to_file("# report", &path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "# report");
    }

    #[test]
    fn test_suggest_filename() {
        assert_eq!(suggest_filename(OutputFormat::Json, "/home/jane/cv.pdf", false), "cv_ats.json");
        assert_eq!(suggest_filename(OutputFormat::Markdown, "cv.md", false), "cv_ats.md");
        assert!(suggest_filename(OutputFormat::Console, "cv.txt", true).starts_with("cv_ats_"));
    }
}
