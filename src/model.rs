use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Error severity, ordered from worst to best.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Critical,
    Semantic,
    Minor,
    Perfect,
}

impl Category {
    pub const ALL: [Category; 4] = [
        Category::Critical,
        Category::Semantic,
        Category::Minor,
        Category::Perfect,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Critical => "critical",
            Self::Semantic => "semantic",
            Self::Minor => "minor",
            Self::Perfect => "perfect",
        }
    }

    /// Contribution of one field to the final score, out of 100.
    pub fn score_value(self) -> f64 {
        match self {
            Self::Critical => 0.0,
            Self::Semantic => 50.0,
            Self::Minor => 80.0,
            Self::Perfect => 100.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct ErrorCategories {
    pub critical: f64,
    pub semantic: f64,
    pub minor: f64,
    pub perfect: f64,
}

impl ErrorCategories {
    pub fn get(&self, category: Category) -> f64 {
        match category {
            Category::Critical => self.critical,
            Category::Semantic => self.semantic,
            Category::Minor => self.minor,
            Category::Perfect => self.perfect,
        }
    }

    pub fn set(&mut self, category: Category, value: f64) {
        match category {
            Category::Critical => self.critical = value,
            Category::Semantic => self.semantic = value,
            Category::Minor => self.minor = value,
            Category::Perfect => self.perfect = value,
        }
    }

    pub fn total(&self) -> f64 {
        Category::ALL.iter().map(|category| self.get(*category)).sum()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetailedError {
    pub field: String,
    pub gold: Value,
    pub pred: Value,
    #[serde(rename = "type")]
    pub category: Category,
}

/// The evaluation artifact handed to the dashboard.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub final_score: f64,
    pub field_coverage: f64,
    pub error_categories: ErrorCategories,
    pub detailed_errors: Vec<DetailedError>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InputDigest {
    pub path: String,
    pub sha256: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunCounts {
    pub field_count: usize,
    pub gold_field_count: usize,
    pub missing_field_count: usize,
    pub extra_field_count: usize,
    pub detailed_error_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RunManifest {
    pub manifest_version: u32,
    pub run_id: String,
    pub generated_at: String,
    pub command: String,
    pub gold: InputDigest,
    pub predicted: InputDigest,
    pub config_source: Option<String>,
    pub config_sha256: String,
    pub report_path: String,
    pub dashboard_path: Option<String>,
    pub counts: RunCounts,
}
