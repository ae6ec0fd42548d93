use crate::api::{AssessOptions, AuditError, assess_path};
use crate::cli::{AnalyzeArgs, OutputFormat};
use crate::fs::{FileSystem, default_fs};
use crate::model::AssessmentReport;
use crate::output::{JsonOutput, MarkdownOutput, OutputFormatter, TaskListOutput};
use crate::style;
use std::io::{self, Write};

pub fn cmd_analyze(args: AnalyzeArgs) -> i32 {
    cmd_analyze_with_fs(args, default_fs())
}

fn options(args: &AnalyzeArgs) -> AssessOptions {
    AssessOptions {
        languages: args.lang.clone().unwrap_or_default(),
        config_path: args.config.clone(),
        use_cache: !args.no_cache,
        self_loops: args.self_loops,
        expected_patterns: args.expected_patterns.clone(),
    }
}

fn render(report: &AssessmentReport, args: &AnalyzeArgs) -> io::Result<Vec<u8>> {
    let mut buffer = Vec::new();
    match args.format {
        OutputFormat::Markdown => MarkdownOutput::new(args.min_severity).format(report, &mut buffer)?,
        OutputFormat::Json => JsonOutput::new(args.min_severity).format(report, &mut buffer)?,
        OutputFormat::Tasks => TaskListOutput::new(args.min_severity).format(report, &mut buffer)?,
    }
    Ok(buffer)
}

pub fn cmd_analyze_with_fs(args: AnalyzeArgs, fs: &dyn FileSystem) -> i32 {
    let report = match assess_path(&args.path, options(&args)) {
        Ok(report) => report,
        Err(AuditError::Config(e)) => {
            style::error(&e.to_string());
            style::hint("run `archaudit init` to generate a valid starter configuration");
            return 2;
        }
        Err(e) => {
            style::error(&e.to_string());
            return 2;
        }
    };

    let buffer = match render(&report, &args) {
        Ok(buffer) => buffer,
        Err(e) => {
            style::error(&format!("Failed to format output: {}", e));
            return 2;
        }
    };
    let output_str = String::from_utf8_lossy(&buffer);

    let write_result = match &args.output {
        Some(path) => fs.write(path, &output_str).map(|_| {
            style::success(&format!("Report written to {}", style::path(path)));
        }),
        None if args.format == OutputFormat::Markdown => {
            style::render_markdown(&output_str, &mut io::stdout())
        }
        None => write!(io::stdout(), "{}", output_str),
    };
    if let Err(e) = write_result {
        style::error(&format!("Failed to write output: {}", e));
        return 2;
    }

    if !report.parse_errors.is_empty() {
        style::warning(&format!(
            "{} file(s) could not be parsed",
            report.parse_errors.len()
        ));
    }
    for failure in &report.analyzer_failures {
        style::warning(&format!("{} analyzer failed: {}", failure.analyzer, failure.message));
    }

    // 1 = violations at or above --fail-on, so CI can gate on it
    if report.count_at_least(args.fail_on) > 0 { 1 } else { 0 }
}
