use crate::config::Thresholds;
use crate::model::Category;

/// Which sides of a field pair carry a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Presence {
    Both,
    /// Omitted by the prediction.
    GoldOnly,
    /// Hallucinated by the prediction.
    PredictedOnly,
}

impl Presence {
    pub fn of<T>(gold: Option<&T>, predicted: Option<&T>) -> Option<Self> {
        match (gold, predicted) {
            (Some(_), Some(_)) => Some(Self::Both),
            (Some(_), None) => Some(Self::GoldOnly),
            (None, Some(_)) => Some(Self::PredictedOnly),
            (None, None) => None,
        }
    }
}

/// Maps a similarity score to a category. A one-sided field is critical
/// whatever its score.
pub fn classify(similarity: f64, presence: Presence, thresholds: &Thresholds) -> Category {
    if presence != Presence::Both {
        return Category::Critical;
    }

    if similarity >= thresholds.perfect {
        Category::Perfect
    } else if similarity >= thresholds.minor {
        Category::Minor
    } else if similarity >= thresholds.semantic {
        Category::Semantic
    } else {
        Category::Critical
    }
}
