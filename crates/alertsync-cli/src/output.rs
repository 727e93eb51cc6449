//! Rendering of validation reports, plans and apply reports
//!
//! Every renderer returns the full text so commands can print it in one go
//! and tests can inspect it. Logs go to stderr; these go to stdout.

use std::fmt::Write as _;

use colored::Colorize;
use serde::Serialize;
use serde_json::{Value, json};

use alertsync_core::{ApplyReport, Outcome, Plan, PlanSummary, Severity, ValidationReport};

use crate::cli::Format;
use crate::error::Result;

/// Render a validation report
pub fn validation(report: &ValidationReport, format: Format) -> Result<String> {
    match format {
        Format::Human => Ok(validation_human(report)),
        Format::Json => {
            let doc = json!({
                "valid": !report.has_errors(),
                "errors": report.error_count(),
                "warnings": report.warning_count(),
                "report": report,
            });
            Ok(serde_json::to_string_pretty(&doc)?)
        }
        Format::Markdown => Ok(validation_markdown(report)),
    }
}

fn validation_human(report: &ValidationReport) -> String {
    let mut out = String::new();
    for finding in &report.findings {
        let v = &finding.violation;
        let label = match v.severity {
            Severity::Error => "ERROR".red().bold(),
            Severity::Warning => "WARN".yellow().bold(),
        };
        let _ = writeln!(
            out,
            "{label} {} {} {}: {}",
            finding.subject.to_string().cyan(),
            v.code.as_str().dimmed(),
            v.field,
            v.message
        );
    }
    if !report.findings.is_empty() {
        out.push('\n');
    }

    let status = if report.has_errors() {
        "FAILED".red().bold()
    } else {
        "OK".green().bold()
    };
    let _ = writeln!(
        out,
        "{status} {} rule(s) checked: {} error(s), {} warning(s)",
        report.rules_checked,
        report.error_count(),
        report.warning_count()
    );
    out
}

fn validation_markdown(report: &ValidationReport) -> String {
    let mut out = String::from("## Validation\n\n");
    let _ = writeln!(
        out,
        "{} rule(s) checked: **{}** error(s), **{}** warning(s)\n",
        report.rules_checked,
        report.error_count(),
        report.warning_count()
    );
    if report.findings.is_empty() {
        return out;
    }

    out.push_str("| Subject | Severity | Code | Field | Message |\n");
    out.push_str("|---|---|---|---|---|\n");
    for finding in &report.findings {
        let v = &finding.violation;
        let _ = writeln!(
            out,
            "| `{}` | {} | `{}` | `{}` | {} |",
            finding.subject,
            v.severity,
            v.code,
            v.field,
            escape_cell(&v.message)
        );
    }
    out
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct UpdateView<'a> {
    uid: &'a str,
    changed_fields: &'a [String],
    #[serde(skip_serializing_if = "Option::is_none")]
    diff: Option<String>,
}

/// Render a plan; `diff` adds unified diffs for updates
pub fn plan(plan: &Plan, format: Format, diff: bool) -> Result<String> {
    match format {
        Format::Human => Ok(plan_human(plan, diff)),
        Format::Json => Ok(serde_json::to_string_pretty(&plan_json(plan, diff))?),
        Format::Markdown => Ok(plan_markdown(plan, diff)),
    }
}

fn plan_json(plan: &Plan, diff: bool) -> Value {
    let updates: Vec<UpdateView<'_>> = plan
        .to_update
        .iter()
        .map(|u| UpdateView {
            uid: u.uid(),
            changed_fields: &u.changed_fields,
            diff: diff.then(|| u.unified_diff()),
        })
        .collect();

    json!({
        "summary": plan.summary(),
        "create": plan.to_create.iter().map(|r| r.uid.as_str()).collect::<Vec<_>>(),
        "update": updates,
        "delete": plan.to_delete.iter().map(|r| r.uid()).collect::<Vec<_>>(),
        "unchanged": plan.unchanged,
    })
}

fn summary_line(summary: PlanSummary) -> String {
    format!(
        "{} to create, {} to update, {} to delete, {} unchanged",
        summary.create, summary.update, summary.delete, summary.unchanged
    )
}

fn plan_human(plan: &Plan, diff: bool) -> String {
    let mut out = String::new();
    if plan.is_empty() {
        let _ = writeln!(
            out,
            "{} No changes. Backend matches {} local rule(s).",
            "OK".green().bold(),
            plan.unchanged.len()
        );
        return out;
    }

    let _ = writeln!(out, "{} {}", "Plan:".bold(), summary_line(plan.summary()));
    out.push('\n');

    for rule in &plan.to_create {
        let _ = writeln!(out, "  {} {} ({})", "+".green(), rule.uid.green(), rule.title);
    }
    for update in &plan.to_update {
        let _ = writeln!(
            out,
            "  {} {} (changed: {})",
            "~".yellow(),
            update.uid().yellow(),
            update.changed_fields.join(", ")
        );
        if diff {
            for line in update.unified_diff().lines() {
                let line = match line.chars().next() {
                    Some('+') => line.green().to_string(),
                    Some('-') => line.red().to_string(),
                    Some('@') => line.cyan().to_string(),
                    _ => line.to_string(),
                };
                let _ = writeln!(out, "      {line}");
            }
        }
    }
    for rule in &plan.to_delete {
        let _ = writeln!(out, "  {} {} ({})", "-".red(), rule.uid().red(), rule.rule.title);
    }
    out
}

fn plan_markdown(plan: &Plan, diff: bool) -> String {
    let mut out = String::from("## Plan\n\n");
    let _ = writeln!(out, "{}\n", summary_line(plan.summary()));

    let mut section = |title: &str, items: Vec<String>| {
        if items.is_empty() {
            return;
        }
        let _ = writeln!(out, "### {title}\n");
        for item in items {
            let _ = writeln!(out, "- {item}");
        }
        out.push('\n');
    };

    section(
        "Create",
        plan.to_create
            .iter()
            .map(|r| format!("`{}` {}", r.uid, escape_cell(&r.title)))
            .collect(),
    );
    section(
        "Update",
        plan.to_update
            .iter()
            .map(|u| format!("`{}` changed: {}", u.uid(), u.changed_fields.join(", ")))
            .collect(),
    );
    section(
        "Delete",
        plan.to_delete
            .iter()
            .map(|r| format!("`{}` {}", r.uid(), escape_cell(&r.rule.title)))
            .collect(),
    );

    if diff {
        for update in &plan.to_update {
            let _ = writeln!(out, "<details><summary>{}</summary>\n", update.uid());
            let _ = writeln!(out, "```diff\n{}```\n", update.unified_diff());
            out.push_str("</details>\n\n");
        }
    }
    out
}

/// Render the outcome of applying a plan
pub fn apply_report(report: &ApplyReport, format: Format) -> Result<String> {
    match format {
        Format::Human => Ok(apply_human(report)),
        Format::Json => {
            let doc = json!({
                "success": report.is_success(),
                "operations": report.operations,
            });
            Ok(serde_json::to_string_pretty(&doc)?)
        }
        Format::Markdown => Ok(apply_markdown(report)),
    }
}

fn apply_human(report: &ApplyReport) -> String {
    let mut out = String::new();
    for op in &report.operations {
        let outcome = match &op.outcome {
            Outcome::Applied => op.outcome.to_string().green(),
            Outcome::Failed(_) => op.outcome.to_string().red(),
            Outcome::Skipped(_) => op.outcome.to_string().yellow(),
        };
        let _ = writeln!(out, "  {} {}: {outcome}", op.action.to_string().dimmed(), op.uid);
    }
    out.push('\n');

    let applied = report.applied().count();
    if report.is_success() {
        let _ = writeln!(out, "{} {applied} operation(s) applied.", "OK".green().bold());
    } else {
        let _ = writeln!(
            out,
            "{} {applied} applied, {} failed, {} skipped. Unfinished: {}",
            "PARTIAL".red().bold(),
            report.failed().count(),
            report.skipped().count(),
            report.unfinished_uids().join(", ")
        );
    }
    out
}

fn apply_markdown(report: &ApplyReport) -> String {
    let mut out = String::from("## Apply\n\n| UID | Action | Outcome |\n|---|---|---|\n");
    for op in &report.operations {
        let _ = writeln!(
            out,
            "| `{}` | {} | {} |",
            op.uid,
            op.action,
            escape_cell(&op.outcome.to_string())
        );
    }
    out
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace('\n', " ")
}
