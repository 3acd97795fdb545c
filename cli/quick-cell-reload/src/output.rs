//! Output formatting for CLI commands.

use colored::Colorize;
use serde::Serialize;
use tabled::{Table, Tabled};

use crate::client::JobStub;
use crate::jobmeta::{FanOutReport, JobStatus, UpdateOutcome};

const CLI_SCHEMA_VERSION: &str = "qcr.cli.v1";

/// Output format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table format.
    #[default]
    Table,
    /// JSON format.
    Json,
}

#[derive(Debug, Tabled)]
struct JobRow<'a> {
    #[tabled(rename = "ID")]
    id: &'a str,
    #[tabled(rename = "Namespace")]
    namespace: &'a str,
    #[tabled(rename = "Type")]
    kind: &'a str,
    #[tabled(rename = "Status")]
    status: &'a str,
}

#[derive(Debug, Tabled)]
struct ResultRow<'a> {
    #[tabled(rename = "Job")]
    job_id: &'a str,
    #[tabled(rename = "Result")]
    result: &'static str,
    #[tabled(rename = "Detail")]
    detail: String,
}

/// Print the jobs selected by a pattern.
pub fn print_jobs(jobs: &[JobStub], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if jobs.is_empty() {
                println!("{}", "No matching jobs found.".dimmed());
                return;
            }
            let rows: Vec<JobRow<'_>> = jobs
                .iter()
                .map(|job| JobRow {
                    id: &job.id,
                    namespace: &job.namespace,
                    kind: &job.r#type,
                    status: &job.status,
                })
                .collect();
            println!("{}", Table::new(rows));
        }
        OutputFormat::Json => println!("{}", format_json(jobs, "[]")),
    }
}

/// Print the result of a single-job update.
pub fn print_update(outcome: &UpdateOutcome, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let eval = if outcome.eval_id.is_empty() {
                "no evaluation created".to_string()
            } else {
                format!("evaluation {}", outcome.eval_id)
            };
            print_success(&format!(
                "Job {} update submitted ({})",
                outcome.job_id, eval
            ));
            if let Some(status) = &outcome.eval_status {
                print_info(&format!("Evaluation status: {}", status));
            }
        }
        OutputFormat::Json => println!("{}", format_json(outcome, "{}")),
    }
}

/// Print the summary of a fan-out run.
pub fn print_report(report: &FanOutReport, format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if report.results.is_empty() {
                println!(
                    "{}",
                    format!("No jobs matched '{}' in {}.", report.pattern, report.namespace)
                        .dimmed()
                );
                return;
            }

            let rows: Vec<ResultRow<'_>> = report.results.iter().map(result_row).collect();
            println!("{}", Table::new(rows));

            let summary = format!(
                "{} matched, {} updated, {} failed, {} cancelled",
                report.matched(),
                report.succeeded(),
                report.failed(),
                report.cancelled()
            );
            if report.failed() == 0 && report.cancelled() == 0 {
                print_success(&summary);
            } else {
                print_warning(&summary);
            }
        }
        OutputFormat::Json => println!("{}", format_json(report, "{}")),
    }
}

fn result_row(result: &crate::jobmeta::JobResult) -> ResultRow<'_> {
    let (label, detail) = match &result.status {
        JobStatus::Updated {
            eval_id,
            eval_status,
        } => {
            let detail = match eval_status {
                Some(status) => format!("{} ({})", eval_id, status),
                None => eval_id.clone(),
            };
            ("updated", detail)
        }
        JobStatus::Failed { error } => ("failed", error.clone()),
        JobStatus::Cancelled { in_flight: false } => ("cancelled", String::new()),
        JobStatus::Cancelled { in_flight: true } => {
            ("cancelled", "in flight, may have been submitted".to_string())
        }
    };

    ResultRow {
        job_id: &result.job_id,
        result: label,
        detail,
    }
}

/// Print a success message.
pub fn print_success(message: &str) {
    println!("{} {}", "Success:".green().bold(), message);
}

/// Print an info message.
pub fn print_info(message: &str) {
    println!("{} {}", "Info:".blue().bold(), message);
}

/// Print a warning message.
pub fn print_warning(message: &str) {
    println!("{} {}", "Warning:".yellow().bold(), message);
}

fn format_json<T: Serialize + ?Sized>(data: &T, fallback: &str) -> String {
    let value = serde_json::to_value(data).unwrap_or_else(|_| serde_json::json!({}));
    let wrapped = wrap_with_schema(value);
    let sorted = sort_json_value(wrapped);
    serde_json::to_string_pretty(&sorted).unwrap_or_else(|_| fallback.to_string())
}

fn wrap_with_schema(value: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "schemaVersion": CLI_SCHEMA_VERSION,
        "data": value
    })
}

fn sort_json_value(value: serde_json::Value) -> serde_json::Value {
    match value {
        serde_json::Value::Array(values) => {
            serde_json::Value::Array(values.into_iter().map(sort_json_value).collect())
        }
        serde_json::Value::Object(entries) => {
            let mut pairs: Vec<_> = entries.into_iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(&b.0));
            let mut mapped = serde_json::Map::new();
            for (key, value) in pairs {
                mapped.insert(key, sort_json_value(value));
            }
            serde_json::Value::Object(mapped)
        }
        other => other,
    }
}
