use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "htr-eval",
    version,
    about = "Score structured HTR extractions against a gold-standard document"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Compare a predicted extraction with its gold standard and write the report.
    Evaluate(EvaluateArgs),
    /// Render the static dashboard for an existing report.
    Dashboard(DashboardArgs),
    /// Print the effective configuration as TOML.
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct EvaluateArgs {
    /// Gold-standard JSON document.
    pub gold_path: PathBuf,

    /// Predicted JSON document.
    pub pred_path: PathBuf,

    #[arg(long, default_value = "./output/")]
    pub output_dir: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,

    #[arg(long, default_value_t = false)]
    pub no_dashboard: bool,

    #[arg(long, default_value_t = 10)]
    pub summary_limit: usize,

    /// Also print the report to stdout.
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

#[derive(Args, Debug, Clone)]
pub struct DashboardArgs {
    pub report_path: PathBuf,

    pub output_dir: PathBuf,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[arg(long)]
    pub config: Option<PathBuf>,
}
