use crate::config::WeightConfig;
use crate::eval::field_type::KeywordTable;

/// Importance multiplier per field path, used only by the final score.
#[derive(Debug, Clone)]
pub struct WeightingPolicy {
    default: f64,
    table: KeywordTable<f64>,
}

impl WeightingPolicy {
    pub fn from_config(config: &WeightConfig) -> Self {
        let entries = config
            .rules
            .iter()
            .map(|rule| (rule.keyword.as_str(), rule.weight));

        Self {
            default: config.default,
            table: KeywordTable::new(entries),
        }
    }

    pub fn weight(&self, path: &str) -> f64 {
        self.table.lookup(path).unwrap_or(self.default)
    }
}
