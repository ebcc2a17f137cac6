use crate::eval::FieldResult;
use crate::model::{Category, DetailedError, ErrorCategories, Report};

/// Folds per-field results into the report. Percentages are rounded to one
/// decimal; an empty result set yields zero scores.
pub fn aggregate(results: &[FieldResult]) -> Report {
    Report {
        final_score: final_score(results),
        field_coverage: field_coverage(results),
        error_categories: error_categories(results),
        detailed_errors: detailed_errors(results),
    }
}

pub fn final_score(results: &[FieldResult]) -> f64 {
    let total_weight: f64 = results.iter().map(|result| result.weight).sum();
    if results.is_empty() || total_weight <= 0.0 {
        return 0.0;
    }

    let weighted: f64 = results
        .iter()
        .map(|result| result.weight * result.category.score_value())
        .sum();
    round_tenth(weighted / total_weight)
}

/// Share of gold fields the prediction did not omit. A blank gold field with
/// no predicted counterpart counts as covered.
pub fn field_coverage(results: &[FieldResult]) -> f64 {
    let expected = results.iter().filter(|result| result.gold.is_some()).count();
    if expected == 0 {
        return 0.0;
    }

    let missing = results.iter().filter(|result| result.is_missing()).count();
    round_tenth((expected - missing) as f64 * 100.0 / expected as f64)
}

pub fn error_categories(results: &[FieldResult]) -> ErrorCategories {
    let mut counts = [0_usize; 4];
    for result in results {
        counts[category_index(result.category)] += 1;
    }

    let mut categories = ErrorCategories::default();
    for (category, tenths) in Category::ALL.iter().zip(apportion_tenths(counts)) {
        categories.set(*category, tenths as f64 / 10.0);
    }
    categories
}

pub fn detailed_errors(results: &[FieldResult]) -> Vec<DetailedError> {
    results
        .iter()
        .filter(|result| result.category != Category::Perfect)
        .map(|result| DetailedError {
            field: result.path.clone(),
            gold: result.gold_display(),
            pred: result.predicted_display(),
            category: result.category,
        })
        .collect()
}

/// Largest-remainder split of 1000 tenths of a percent, so the shares sum to
/// exactly 100.0. Equal remainders go to the earlier category.
fn apportion_tenths(counts: [usize; 4]) -> [u64; 4] {
    let total: u64 = counts.iter().map(|count| *count as u64).sum();
    if total == 0 {
        return [0; 4];
    }

    let mut tenths = [0_u64; 4];
    let mut remainders = [(0_u64, 0_usize); 4];
    for (index, count) in counts.iter().enumerate() {
        let scaled = *count as u64 * 1000;
        tenths[index] = scaled / total;
        remainders[index] = (scaled % total, index);
    }

    let leftover = 1000 - tenths.iter().sum::<u64>();
    remainders.sort_by(|left, right| right.0.cmp(&left.0).then(left.1.cmp(&right.1)));
    for (_, index) in remainders.iter().take(leftover as usize) {
        tenths[*index] += 1;
    }
    tenths
}

fn category_index(category: Category) -> usize {
    match category {
        Category::Critical => 0,
        Category::Semantic => 1,
        Category::Minor => 2,
        Category::Perfect => 3,
    }
}

pub fn round_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}
