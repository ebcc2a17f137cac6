//! Comparison engine: flatten both documents, then normalize, score, classify
//! and weight each aligned field before folding everything into a [`Report`].

pub mod aggregate;
pub mod classify;
pub mod field_type;
pub mod flatten;
pub mod normalize;
pub mod similarity;
pub mod weighting;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::debug;

use crate::config::{EvalConfig, Thresholds};
use crate::model::{Category, Report};

use self::aggregate::aggregate;
use self::classify::{Presence, classify};
use self::field_type::FieldTypeClassifier;
use self::flatten::{FieldPair, Leaf, align};
use self::normalize::{Normalized, Normalizer};
use self::similarity::similarity;
use self::weighting::WeightingPolicy;

#[derive(Debug, Clone, PartialEq)]
pub struct FieldResult {
    pub path: String,
    pub gold: Option<Leaf>,
    pub predicted: Option<Leaf>,
    pub similarity: f64,
    pub category: Category,
    pub weight: f64,
}

impl FieldResult {
    pub fn gold_display(&self) -> Value {
        self.gold.as_ref().map_or(Value::Null, Leaf::to_json)
    }

    pub fn predicted_display(&self) -> Value {
        self.predicted.as_ref().map_or(Value::Null, Leaf::to_json)
    }

    /// Gold supplied a value the prediction omitted. A blank gold value with
    /// no counterpart is scored as a match and does not count.
    pub fn is_missing(&self) -> bool {
        self.gold.is_some() && self.predicted.is_none() && self.category == Category::Critical
    }

    /// The prediction supplied a value gold does not have. Blank extras do not count.
    pub fn is_extra(&self) -> bool {
        self.gold.is_none() && self.predicted.is_some() && self.category == Category::Critical
    }
}

#[derive(Debug, Clone)]
pub struct Evaluation {
    pub results: Vec<FieldResult>,
    pub report: Report,
}

impl Evaluation {
    pub fn missing_fields(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|result| result.is_missing())
            .map(|result| result.path.as_str())
    }

    pub fn extra_fields(&self) -> impl Iterator<Item = &str> {
        self.results
            .iter()
            .filter(|result| result.is_extra())
            .map(|result| result.path.as_str())
    }
}

/// Per-field evaluation step, built once from the configuration.
#[derive(Debug, Clone)]
pub struct FieldEvaluator {
    field_types: FieldTypeClassifier,
    normalizer: Normalizer,
    weights: WeightingPolicy,
    thresholds: Thresholds,
}

impl FieldEvaluator {
    pub fn new(config: &EvalConfig) -> Self {
        Self {
            field_types: FieldTypeClassifier::from_config(&config.field_types),
            normalizer: Normalizer::from_config(&config.normalization),
            weights: WeightingPolicy::from_config(&config.weights),
            thresholds: config.thresholds,
        }
    }

    /// Returns `None` only for a pair with neither side present, which
    /// alignment never produces.
    pub fn evaluate(&self, pair: FieldPair) -> Option<FieldResult> {
        let presence = Presence::of(pair.gold.as_ref(), pair.predicted.as_ref())?;
        let field_type = self.field_types.classify(&pair.path);

        let gold = pair
            .gold
            .as_ref()
            .map(|leaf| self.normalizer.normalize(field_type, leaf));
        let predicted = pair
            .predicted
            .as_ref()
            .map(|leaf| self.normalizer.normalize(field_type, leaf));

        // An absent key and a blank value carry the same information.
        let one_sided_blank = presence != Presence::Both
            && [&gold, &predicted]
                .into_iter()
                .any(|side| matches!(side, Some(Normalized::Blank)));
        let (similarity, presence) = if one_sided_blank {
            (1.0, Presence::Both)
        } else {
            (similarity(gold.as_ref(), predicted.as_ref()), presence)
        };
        let category = classify(similarity, presence, &self.thresholds);
        let weight = self.weights.weight(&pair.path);

        debug!(
            field = %pair.path,
            field_type = field_type.as_str(),
            similarity,
            category = category.as_str(),
            weight,
            "field evaluated"
        );

        Some(FieldResult {
            path: pair.path,
            gold: pair.gold,
            predicted: pair.predicted,
            similarity,
            category,
            weight,
        })
    }
}

/// Runs the whole comparison. Fails only when a document is not a JSON
/// object; every field-level problem becomes a classified result instead.
pub fn evaluate_documents(gold: &Value, predicted: &Value, config: &EvalConfig) -> Result<Evaluation> {
    let pairs = align(gold, predicted, &config.excluded_prefixes)
        .context("failed to align gold and predicted documents")?;

    let evaluator = FieldEvaluator::new(config);
    let results: Vec<FieldResult> = pairs
        .into_iter()
        .filter_map(|pair| evaluator.evaluate(pair))
        .collect();
    let report = aggregate(&results);

    Ok(Evaluation { results, report })
}
