use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::Value;
use tracing::{info, warn};

use crate::cli::EvaluateArgs;
use crate::commands::dashboard::render_dashboard;
use crate::config::{load_config, render_config};
use crate::eval::{Evaluation, evaluate_documents};
use crate::model::{InputDigest, RunCounts, RunManifest};
use crate::util::{
    ensure_directory, read_json, sha256_bytes, sha256_file, utc_compact_string,
    utc_rfc3339_string, write_json_pretty,
};

const RUN_MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone)]
pub struct EvaluateOutputs {
    pub report_path: PathBuf,
    pub dashboard_dir: Option<PathBuf>,
    pub manifest_path: PathBuf,
}

pub fn run(args: EvaluateArgs) -> Result<()> {
    let (evaluation, outputs) = execute(&args)?;

    if args.json {
        let mut output = io::BufWriter::new(io::stdout().lock());
        serde_json::to_writer_pretty(&mut output, &evaluation.report)
            .context("failed to serialize report json output")?;
        writeln!(output)?;
        output.flush()?;
    }

    info!(
        report = %outputs.report_path.display(),
        manifest = %outputs.manifest_path.display(),
        "evaluation results saved"
    );
    if let Some(dashboard_dir) = &outputs.dashboard_dir {
        info!(dashboard = %dashboard_dir.display(), "dashboard saved");
    }
    Ok(())
}

/// Evaluates both documents and writes the report, the dashboard and the run
/// manifest. Nothing is written when loading or evaluation fails.
pub fn execute(args: &EvaluateArgs) -> Result<(Evaluation, EvaluateOutputs)> {
    let started_at = Utc::now();
    let config = load_config(args.config.as_deref())?;
    let gold = load_document(&args.gold_path)?;
    let predicted = load_document(&args.pred_path)?;

    info!(
        gold = %args.gold_path.display(),
        predicted = %args.pred_path.display(),
        "evaluating prediction"
    );
    let evaluation = evaluate_documents(&gold, &predicted, &config)?;
    log_summary(&evaluation, args.summary_limit);

    let stem = args
        .pred_path
        .file_stem()
        .and_then(|stem| stem.to_str())
        .with_context(|| format!("invalid prediction filename: {}", args.pred_path.display()))?;

    ensure_directory(&args.output_dir)?;
    let report_path = args
        .output_dir
        .join(format!("{stem}_evaluation_results.json"));
    write_json_pretty(&report_path, &evaluation.report)?;
    info!(path = %report_path.display(), "wrote evaluation report");

    let dashboard_dir = if args.no_dashboard {
        None
    } else {
        let dashboard_dir = args.output_dir.join(format!("{stem}_dashboard"));
        render_dashboard(&report_path, &dashboard_dir)?;
        Some(dashboard_dir)
    };

    let manifest = RunManifest {
        manifest_version: RUN_MANIFEST_VERSION,
        run_id: format!("eval-{}", utc_compact_string(started_at)),
        generated_at: utc_rfc3339_string(started_at),
        command: std::env::args().collect::<Vec<String>>().join(" "),
        gold: input_digest(&args.gold_path)?,
        predicted: input_digest(&args.pred_path)?,
        config_source: args.config.as_ref().map(|path| path.display().to_string()),
        config_sha256: sha256_bytes(render_config(&config)?.as_bytes()),
        report_path: report_path.display().to_string(),
        dashboard_path: dashboard_dir
            .as_ref()
            .map(|path| path.display().to_string()),
        counts: run_counts(&evaluation),
    };
    let manifest_path = args.output_dir.join(format!("{stem}_run_manifest.json"));
    write_json_pretty(&manifest_path, &manifest)?;

    Ok((
        evaluation,
        EvaluateOutputs {
            report_path,
            dashboard_dir,
            manifest_path,
        },
    ))
}

fn load_document(path: &Path) -> Result<Value> {
    read_json(path).with_context(|| format!("malformed input document: {}", path.display()))
}

fn input_digest(path: &Path) -> Result<InputDigest> {
    Ok(InputDigest {
        path: path.display().to_string(),
        sha256: sha256_file(path)?,
    })
}

fn run_counts(evaluation: &Evaluation) -> RunCounts {
    RunCounts {
        field_count: evaluation.results.len(),
        gold_field_count: evaluation
            .results
            .iter()
            .filter(|result| result.gold.is_some())
            .count(),
        missing_field_count: evaluation.missing_fields().count(),
        extra_field_count: evaluation.extra_fields().count(),
        detailed_error_count: evaluation.report.detailed_errors.len(),
    }
}

fn log_summary(evaluation: &Evaluation, limit: usize) {
    let report = &evaluation.report;
    let categories = &report.error_categories;

    info!(
        final_score = report.final_score,
        field_coverage = report.field_coverage,
        fields = evaluation.results.len(),
        "evaluation summary"
    );
    info!(
        perfect = categories.perfect,
        minor = categories.minor,
        semantic = categories.semantic,
        critical = categories.critical,
        "error distribution (%)"
    );

    let missing = evaluation.missing_fields().count();
    let extra = evaluation.extra_fields().count();
    if missing > 0 || extra > 0 {
        warn!(missing, extra, "structural mismatches between gold and prediction");
    }

    for (rank, error) in report.detailed_errors.iter().take(limit).enumerate() {
        info!(
            rank = rank + 1,
            field = %error.field,
            gold = %error.gold,
            pred = %error.pred,
            category = error.category.as_str(),
            "detailed error"
        );
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use serde_json::json;
    use tempfile::TempDir;

    use super::*;
    use crate::model::Report;

    fn write_fixture(dir: &Path, name: &str, value: &Value) -> PathBuf {
        let path = dir.join(name);
        write_json_pretty(&path, value).expect("fixture written");
        path
    }

    fn args(temp: &TempDir, gold: PathBuf, pred: PathBuf) -> EvaluateArgs {
        EvaluateArgs {
            gold_path: gold,
            pred_path: pred,
            output_dir: temp.path().join("output"),
            config: None,
            no_dashboard: false,
            summary_limit: 10,
            json: false,
        }
    }

    #[test]
    fn writes_report_dashboard_and_manifest() {
        let temp = TempDir::new().expect("temp dir");
        let gold = write_fixture(
            temp.path(),
            "gold.json",
            &json!({"nom": "Marie DUPONT", "telephone": "01-42-88-65-32", "id": "12345"}),
        );
        let pred = write_fixture(
            temp.path(),
            "acte_042.json",
            &json!({"nom": "Marie DUPORT", "telephone": "0142886532", "extra": "x"}),
        );

        let (evaluation, outputs) = execute(&args(&temp, gold, pred)).expect("evaluation succeeds");

        let output_dir = temp.path().join("output");
        assert_eq!(outputs.report_path, output_dir.join("acte_042_evaluation_results.json"));
        assert_eq!(outputs.manifest_path, output_dir.join("acte_042_run_manifest.json"));
        assert_eq!(outputs.dashboard_dir, Some(output_dir.join("acte_042_dashboard")));
        assert!(output_dir.join("acte_042_dashboard").join("index.html").is_file());

        let on_disk: Report = read_json(&outputs.report_path).expect("report parses");
        assert_eq!(on_disk, evaluation.report);

        let manifest: Value = read_json(&outputs.manifest_path).expect("manifest parses");
        assert_eq!(manifest["counts"]["missing_field_count"], json!(1));
        assert_eq!(manifest["counts"]["extra_field_count"], json!(1));
        assert_eq!(manifest["gold"]["sha256"].as_str().map(str::len), Some(64));
    }

    #[test]
    fn report_json_has_exactly_the_artifact_shape() {
        let temp = TempDir::new().expect("temp dir");
        let gold = write_fixture(temp.path(), "gold.json", &json!({"id": "12345"}));
        let pred = write_fixture(temp.path(), "pred.json", &json!({}));

        let (_, outputs) = execute(&args(&temp, gold, pred)).expect("evaluation succeeds");
        let report: Value = read_json(&outputs.report_path).expect("report parses");

        let keys: Vec<&str> = report
            .as_object()
            .expect("report is an object")
            .keys()
            .map(String::as_str)
            .collect();
        assert_eq!(
            keys,
            vec!["final_score", "field_coverage", "error_categories", "detailed_errors"]
        );
        assert_eq!(
            report["detailed_errors"],
            json!([{"field": "id", "gold": "12345", "pred": null, "type": "critical"}])
        );
        assert_eq!(report["error_categories"]["critical"], json!(100.0));
    }

    #[test]
    fn repeated_runs_write_identical_reports() {
        let temp = TempDir::new().expect("temp dir");
        let gold = write_fixture(temp.path(), "gold.json", &json!({"nom": "Dupont", "ville": "Lyon"}));
        let pred = write_fixture(temp.path(), "pred.json", &json!({"nom": "Dupond"}));

        let (_, first) = execute(&args(&temp, gold.clone(), pred.clone())).expect("first run");
        let first_bytes = fs::read(&first.report_path).expect("first report");
        let (_, second) = execute(&args(&temp, gold, pred)).expect("second run");
        let second_bytes = fs::read(&second.report_path).expect("second report");
        assert_eq!(first_bytes, second_bytes);
    }

    #[test]
    fn malformed_input_writes_nothing() {
        let temp = TempDir::new().expect("temp dir");
        let gold = write_fixture(temp.path(), "gold.json", &json!({"nom": "Dupont"}));
        let pred = temp.path().join("pred.json");
        fs::write(&pred, "{\"nom\": \"Dupont\"").expect("fixture written");

        let error = execute(&args(&temp, gold, pred)).expect_err("truncated json must fail");
        assert!(format!("{error:#}").contains("malformed input document"));
        assert!(!temp.path().join("output").exists());
    }

    #[test]
    fn custom_config_changes_thresholds() {
        let temp = TempDir::new().expect("temp dir");
        let config_path = temp.path().join("eval.toml");
        fs::write(&config_path, "[thresholds]\nperfect = 1.0\nminor = 0.99\nsemantic = 0.9\n")
            .expect("config written");
        let gold = write_fixture(temp.path(), "gold.json", &json!({"name": "Marie DUPONT"}));
        let pred = write_fixture(temp.path(), "pred.json", &json!({"name": "Marie DUPORT"}));

        let mut args = args(&temp, gold, pred);
        args.config = Some(config_path);
        args.no_dashboard = true;

        let (evaluation, outputs) = execute(&args).expect("evaluation succeeds");
        assert_eq!(evaluation.report.error_categories.semantic, 100.0);
        assert_eq!(outputs.dashboard_dir, None);
    }
}
