use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PERFECT_THRESHOLD: f64 = 0.95;
pub const DEFAULT_MINOR_THRESHOLD: f64 = 0.80;
pub const DEFAULT_SEMANTIC_THRESHOLD: f64 = 0.50;
pub const DEFAULT_FIELD_WEIGHT: f64 = 1.0;

/// Every tunable knob of the comparison engine. Missing sections fall back to
/// the built-in defaults, so a config file only needs the values it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EvalConfig {
    pub excluded_prefixes: Vec<String>,
    pub thresholds: Thresholds,
    pub field_types: FieldTypeKeywords,
    pub weights: WeightConfig,
    pub normalization: NormalizationConfig,
}

/// Lower similarity bounds for each non-critical category.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Thresholds {
    pub perfect: f64,
    pub minor: f64,
    pub semantic: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FieldTypeKeywords {
    pub phone: Vec<String>,
    pub date: Vec<String>,
    pub numeric: Vec<String>,
    pub boolean: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WeightConfig {
    pub default: f64,
    pub rules: Vec<WeightRule>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct WeightRule {
    pub keyword: String,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct NormalizationConfig {
    pub truthy: Vec<String>,
    pub falsy: Vec<String>,
    pub blank_tokens: Vec<String>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            excluded_prefixes: strings(&["metadata"]),
            thresholds: Thresholds::default(),
            field_types: FieldTypeKeywords::default(),
            weights: WeightConfig::default(),
            normalization: NormalizationConfig::default(),
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            perfect: DEFAULT_PERFECT_THRESHOLD,
            minor: DEFAULT_MINOR_THRESHOLD,
            semantic: DEFAULT_SEMANTIC_THRESHOLD,
        }
    }
}

impl Default for FieldTypeKeywords {
    fn default() -> Self {
        Self {
            phone: strings(&["tel", "téléphone", "telephone", "phone", "fax", "mobile"]),
            date: strings(&["date"]),
            numeric: strings(&[
                "nombre", "nbre", "count", "montant", "amount", "numero", "numéro", "siret",
                "siren",
            ]),
            // Trailing `_` anchors the keyword to the start of a path segment.
            boolean: strings(&["is_", "has_", "est_", "coche", "checkbox"]),
        }
    }
}

impl Default for WeightConfig {
    fn default() -> Self {
        let rule = |keyword: &str, weight: f64| WeightRule {
            keyword: keyword.to_string(),
            weight,
        };

        Self {
            default: DEFAULT_FIELD_WEIGHT,
            rules: vec![
                rule("siret", 3.0),
                rule("siren", 3.0),
                rule("raison_sociale", 2.5),
                rule("nom", 2.0),
                rule("name", 2.0),
                rule("id", 2.0),
                rule("matricule", 2.0),
                rule("adresse", 1.5),
                rule("address", 1.5),
                rule("tel", 1.5),
                rule("email", 1.5),
                rule("nombre", 1.5),
                rule("nbre", 1.5),
                rule("count", 1.5),
                rule("montant", 1.5),
                rule("amount", 1.5),
            ],
        }
    }
}

impl Default for NormalizationConfig {
    fn default() -> Self {
        Self {
            truthy: strings(&["oui", "true", "1", "yes", "vrai", "x"]),
            falsy: strings(&["non", "false", "0", "no", "faux"]),
            blank_tokens: strings(&["", "null", "none", "-", "nan"]),
        }
    }
}

impl EvalConfig {
    pub fn validate(&self) -> Result<()> {
        self.thresholds.validate()?;

        let weights = &self.weights;
        if !weights.default.is_finite() || weights.default <= 0.0 {
            bail!("default weight must be a positive number, got {}", weights.default);
        }
        for rule in &weights.rules {
            if rule.keyword.trim().is_empty() {
                bail!("weight rule keyword must not be empty");
            }
            if !rule.weight.is_finite() || rule.weight <= 0.0 {
                bail!(
                    "weight for keyword '{}' must be a positive number, got {}",
                    rule.keyword,
                    rule.weight
                );
            }
        }

        let keyword_lists = [
            ("phone", &self.field_types.phone),
            ("date", &self.field_types.date),
            ("numeric", &self.field_types.numeric),
            ("boolean", &self.field_types.boolean),
        ];
        for (name, keywords) in keyword_lists {
            if keywords.iter().any(|keyword| keyword.trim().is_empty()) {
                bail!("field type '{name}' contains an empty keyword");
            }
        }

        let normalization = &self.normalization;
        if let Some(token) = normalization
            .truthy
            .iter()
            .find(|token| contains_token(&normalization.falsy, token))
        {
            bail!("token '{token}' is listed as both truthy and falsy");
        }

        if self.excluded_prefixes.iter().any(|prefix| prefix.trim().is_empty()) {
            bail!("excluded prefixes must not be empty");
        }

        Ok(())
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<()> {
        let values = [self.semantic, self.minor, self.perfect];
        if values.iter().any(|value| !value.is_finite()) {
            bail!("similarity thresholds must be finite");
        }
        if !(self.semantic > 0.0
            && self.semantic <= self.minor
            && self.minor <= self.perfect
            && self.perfect <= 1.0)
        {
            bail!(
                "similarity thresholds must satisfy 0 < semantic <= minor <= perfect <= 1 (got semantic={}, minor={}, perfect={})",
                self.semantic,
                self.minor,
                self.perfect
            );
        }
        Ok(())
    }
}

pub fn load_config(path: Option<&Path>) -> Result<EvalConfig> {
    let Some(path) = path else {
        return Ok(EvalConfig::default());
    };

    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read config file: {}", path.display()))?;
    let config = parse_config(&contents)
        .with_context(|| format!("invalid config file: {}", path.display()))?;
    Ok(config)
}

pub fn parse_config(contents: &str) -> Result<EvalConfig> {
    let config: EvalConfig =
        toml::from_str(contents).context("failed to parse config file as TOML")?;
    config.validate()?;
    Ok(config)
}

pub fn render_config(config: &EvalConfig) -> Result<String> {
    toml::to_string_pretty(config).context("failed to serialize config as TOML")
}

fn contains_token(tokens: &[String], needle: &str) -> bool {
    let needle = needle.trim().to_lowercase();
    tokens.iter().any(|token| token.trim().to_lowercase() == needle)
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|value| value.to_string()).collect()
}
