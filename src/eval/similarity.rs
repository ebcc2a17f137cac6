use crate::eval::normalize::Normalized;

/// Similarity in `[0, 1]` between two normalized values. An absent side
/// scores 0.
pub fn similarity(gold: Option<&Normalized>, predicted: Option<&Normalized>) -> f64 {
    let (Some(gold), Some(predicted)) = (gold, predicted) else {
        return 0.0;
    };

    match (gold, predicted) {
        (Normalized::Blank, Normalized::Blank) => 1.0,
        (Normalized::Blank, _) | (_, Normalized::Blank) => 0.0,
        (left, right) if left.is_exact_kind() && right.is_exact_kind() => exact(left, right),
        (left, right) => edit_similarity(&left.as_comparable(), &right.as_comparable()),
    }
}

/// `1 - levenshtein(a, b) / max(len(a), len(b), 1)`, counted in characters.
pub fn edit_similarity(left: &str, right: &str) -> f64 {
    let longest = left.chars().count().max(right.chars().count()).max(1);
    let distance = strsim::levenshtein(left, right);
    (1.0 - distance as f64 / longest as f64).clamp(0.0, 1.0)
}

fn exact(left: &Normalized, right: &Normalized) -> f64 {
    if left == right { 1.0 } else { 0.0 }
}
