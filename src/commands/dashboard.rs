use std::fmt::Write as _;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tracing::info;

use crate::cli::DashboardArgs;
use crate::model::{Category, Report};
use crate::util::{ensure_directory, read_json, write_json_pretty};

const CATEGORY_TOLERANCE: f64 = 0.1;

pub fn run(args: DashboardArgs) -> Result<()> {
    render_dashboard(&args.report_path, &args.output_dir)
}

/// Reads a report from disk and writes `index.html` plus a `report.json` copy
/// into `output_dir`.
pub fn render_dashboard(report_path: &Path, output_dir: &Path) -> Result<()> {
    let report: Report = read_json(report_path)?;
    check_report(&report).with_context(|| format!("invalid report: {}", report_path.display()))?;

    ensure_directory(output_dir)?;
    let index_path = output_dir.join("index.html");
    fs::write(&index_path, render_html(&report)?)
        .with_context(|| format!("failed to write {}", index_path.display()))?;
    write_json_pretty(&output_dir.join("report.json"), &report)?;

    info!(
        path = %index_path.display(),
        detailed_errors = report.detailed_errors.len(),
        "wrote dashboard"
    );
    Ok(())
}

fn check_report(report: &Report) -> Result<()> {
    for (name, value) in [
        ("final_score", report.final_score),
        ("field_coverage", report.field_coverage),
    ] {
        if !(0.0..=100.0).contains(&value) {
            bail!("{name} out of range: {value}");
        }
    }

    let total = report.error_categories.total();
    let has_fields = total > 0.0 || !report.detailed_errors.is_empty();
    if has_fields && (total - 100.0).abs() > CATEGORY_TOLERANCE {
        bail!("error category percentages sum to {total}, expected 100");
    }
    if let Some(error) = report
        .detailed_errors
        .iter()
        .find(|error| error.category == Category::Perfect)
    {
        bail!("detailed error for '{}' is classified perfect", error.field);
    }
    Ok(())
}

pub fn render_html(report: &Report) -> Result<String> {
    let mut html = String::with_capacity(4096 + report.detailed_errors.len() * 256);

    html.push_str(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"utf-8\">\n\
         <title>HTR evaluation</title>\n<style>\n",
    );
    html.push_str(STYLE);
    html.push_str("</style>\n</head>\n<body>\n<h1>HTR evaluation</h1>\n<section class=\"cards\">\n");

    writeln!(
        html,
        "<div class=\"card\"><span>Overall score</span><strong>{:.1}%</strong></div>",
        report.final_score
    )?;
    writeln!(
        html,
        "<div class=\"card\"><span>Field coverage</span><strong>{:.1}%</strong></div>",
        report.field_coverage
    )?;
    writeln!(
        html,
        "<div class=\"card\"><span>Errors</span><strong>{}</strong></div>",
        report.detailed_errors.len()
    )?;
    html.push_str("</section>\n<section class=\"distribution\">\n<h2>Error distribution</h2>\n");

    for category in Category::ALL.iter().rev() {
        let share = report.error_categories.get(*category);
        writeln!(
            html,
            "<div class=\"bar-row\"><span class=\"label\">{name}</span>\
             <div class=\"bar\"><div class=\"fill {name}\" style=\"width: {share:.1}%\"></div></div>\
             <span class=\"value\">{share:.1}%</span></div>",
            name = category.as_str(),
        )?;
    }

    html.push_str("</section>\n<section>\n<h2>Detailed errors</h2>\n");
    if report.detailed_errors.is_empty() {
        html.push_str("<p class=\"empty\">No errors.</p>\n");
    } else {
        html.push_str(
            "<table>\n<thead><tr><th>Field</th><th>Gold</th><th>Predicted</th><th>Type</th></tr></thead>\n<tbody>\n",
        );
        for error in &report.detailed_errors {
            writeln!(
                html,
                "<tr class=\"{category}\"><td><code>{field}</code></td><td>{gold}</td><td>{pred}</td>\
                 <td><span class=\"badge {category}\">{category}</span></td></tr>",
                category = error.category.as_str(),
                field = escape_html(&error.field),
                gold = display_cell(&error.gold),
                pred = display_cell(&error.pred),
            )?;
        }
        html.push_str("</tbody>\n</table>\n");
    }

    html.push_str("</section>\n</body>\n</html>\n");
    Ok(html)
}

fn display_cell(value: &Value) -> String {
    match value {
        Value::Null => "<span class=\"missing\">missing</span>".to_string(),
        Value::String(text) if text.is_empty() => "<span class=\"missing\">empty</span>".to_string(),
        Value::String(text) => escape_html(text),
        other => escape_html(&other.to_string()),
    }
}

pub fn escape_html(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            other => escaped.push(other),
        }
    }
    escaped
}

const STYLE: &str = r#"body { font-family: system-ui, sans-serif; margin: 2rem auto; max-width: 1100px; color: #1f2933; }
.cards { display: flex; gap: 1rem; }
.card { flex: 1; padding: 1rem; border-radius: 8px; background: #f5f7fa; }
.card span { display: block; color: #616e7c; font-size: 0.9rem; }
.card strong { font-size: 1.8rem; }
.bar-row { display: flex; align-items: center; gap: 0.75rem; margin: 0.4rem 0; }
.bar-row .label { width: 6rem; text-transform: capitalize; }
.bar { flex: 1; height: 0.9rem; background: #e4e7eb; border-radius: 4px; overflow: hidden; }
.fill { height: 100%; }
.value { width: 4rem; text-align: right; }
table { width: 100%; border-collapse: collapse; }
th, td { text-align: left; padding: 0.4rem 0.6rem; border-bottom: 1px solid #e4e7eb; vertical-align: top; }
.badge { padding: 0.1rem 0.5rem; border-radius: 999px; color: #fff; font-size: 0.8rem; }
.missing { color: #9aa5b1; font-style: italic; }
.fill.perfect, .badge.perfect { background: #3ebd93; }
.fill.minor, .badge.minor { background: #f0b429; }
.fill.semantic, .badge.semantic { background: #f9703e; }
.fill.critical, .badge.critical { background: #e12d39; }
tr.critical td:first-child { border-left: 3px solid #e12d39; }
"#;

#[cfg(test)]
mod tests {
    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::model::{DetailedError, ErrorCategories};

    fn sample_report() -> Report {
        Report {
            final_score: 62.5,
            field_coverage: 75.0,
            error_categories: ErrorCategories {
                critical: 50.0,
                semantic: 0.0,
                minor: 0.0,
                perfect: 50.0,
            },
            detailed_errors: vec![DetailedError {
                field: "gerant.nom".to_string(),
                gold: json!("<b>Dupont & Fils</b>"),
                pred: Value::Null,
                category: Category::Critical,
            }],
        }
    }

    #[test]
    fn html_escapes_document_values() {
        let html = render_html(&sample_report()).expect("html renders");
        assert!(html.contains("&lt;b&gt;Dupont &amp; Fils&lt;/b&gt;"));
        assert!(!html.contains("<b>Dupont"));
        assert!(html.contains("<span class=\"missing\">missing</span>"));
        assert!(html.contains("62.5%"));
        assert!(html.contains("width: 50.0%"));
    }

    #[test]
    fn empty_report_renders_placeholder() {
        let report = Report {
            final_score: 0.0,
            field_coverage: 0.0,
            error_categories: ErrorCategories::default(),
            detailed_errors: Vec::new(),
        };
        check_report(&report).expect("degenerate report is valid");
        let html = render_html(&report).expect("html renders");
        assert!(html.contains("No errors."));
    }

    #[test]
    fn dashboard_is_written_next_to_report_copy() {
        let temp = TempDir::new().expect("temp dir");
        let report_path = temp.path().join("report.json");
        write_json_pretty(&report_path, &sample_report()).expect("report written");

        let output_dir = temp.path().join("dashboard");
        render_dashboard(&report_path, &output_dir).expect("dashboard renders");

        assert!(output_dir.join("index.html").is_file());
        let copy: Report = read_json(&output_dir.join("report.json")).expect("copy parses");
        assert_eq!(copy, sample_report());
    }

    #[test]
    fn inconsistent_reports_are_rejected() {
        let mut report = sample_report();
        report.error_categories.perfect = 10.0;
        assert!(check_report(&report).is_err());

        let mut report = sample_report();
        report.final_score = 120.0;
        assert!(check_report(&report).is_err());
    }

    #[test]
    fn reports_missing_required_fields_fail_to_load() {
        let temp = TempDir::new().expect("temp dir");
        let report_path = temp.path().join("partial.json");
        fs::write(&report_path, r#"{"final_score": 10.0}"#).expect("fixture written");

        assert!(render_dashboard(&report_path, &temp.path().join("out")).is_err());
    }
}
