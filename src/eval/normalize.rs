use std::collections::HashSet;

use regex::Regex;
use serde_json::Number;

use crate::config::NormalizationConfig;
use crate::eval::field_type::FieldType;
use crate::eval::flatten::Leaf;

/// A value after field-aware canonicalization.
#[derive(Debug, Clone, PartialEq)]
pub enum Normalized {
    /// No usable content (`null`, empty, or a configured blank token).
    Blank,
    Text(String),
    /// Digits only, in original order (phone numbers, dates).
    Digits(String),
    /// Canonical decimal with `.` as separator; compared exactly.
    Number(String),
    /// Compared exactly.
    Boolean(bool),
}

impl Normalized {
    pub fn as_comparable(&self) -> String {
        match self {
            Self::Blank => String::new(),
            Self::Text(value) | Self::Digits(value) | Self::Number(value) => value.clone(),
            Self::Boolean(value) => value.to_string(),
        }
    }

    pub fn is_exact_kind(&self) -> bool {
        matches!(self, Self::Number(_) | Self::Boolean(_))
    }
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    truthy: HashSet<String>,
    falsy: HashSet<String>,
    blank_tokens: HashSet<String>,
    digit_run: Regex,
}

impl Normalizer {
    pub fn from_config(config: &NormalizationConfig) -> Self {
        Self {
            truthy: token_set(&config.truthy),
            falsy: token_set(&config.falsy),
            blank_tokens: token_set(&config.blank_tokens),
            digit_run: Regex::new(r"\d+").expect("valid digit run regex"),
        }
    }

    /// Canonicalizes one value for its field type. Values that do not fit the
    /// type fall back to text normalization instead of failing.
    pub fn normalize(&self, field_type: FieldType, leaf: &Leaf) -> Normalized {
        let folded = fold_text(&leaf.as_text());
        if matches!(leaf, Leaf::Null) || self.blank_tokens.contains(&folded) {
            return Normalized::Blank;
        }

        let typed = match (field_type, leaf) {
            (FieldType::Boolean, Leaf::Bool(value)) => Some(Normalized::Boolean(*value)),
            (FieldType::Boolean, _) => self.boolean(&folded),
            (FieldType::Phone, _) => self.digits(&folded).map(Normalized::Digits),
            (FieldType::Date, _) => self.digits(&folded).map(Normalized::Digits),
            (FieldType::Numeric, Leaf::Number(number)) => {
                number_leaf(number).map(Normalized::Number)
            }
            (FieldType::Numeric, _) => canonical_number(&folded).map(Normalized::Number),
            (FieldType::Text, _) => None,
        };

        typed.unwrap_or(Normalized::Text(folded))
    }

    fn boolean(&self, folded: &str) -> Option<Normalized> {
        if self.truthy.contains(folded) {
            Some(Normalized::Boolean(true))
        } else if self.falsy.contains(folded) {
            Some(Normalized::Boolean(false))
        } else {
            None
        }
    }

    fn digits(&self, value: &str) -> Option<String> {
        let digits = self
            .digit_run
            .find_iter(value)
            .map(|run| run.as_str())
            .collect::<String>();
        (!digits.is_empty()).then_some(digits)
    }
}

fn token_set(tokens: &[String]) -> HashSet<String> {
    tokens.iter().map(|token| fold_text(token)).collect()
}

/// Trims, collapses whitespace runs to one space, and lower-cases.
pub fn fold_text(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<&str>>()
        .join(" ")
        .to_lowercase()
}

/// Keeps digits and the decimal separator, dropping grouping characters.
///
/// With both `.` and `,` present the last one is the decimal separator. With
/// only one kind present it groups thousands when it repeats or is followed
/// by exactly three digits, otherwise it is the decimal separator.
pub fn canonical_number(value: &str) -> Option<String> {
    let kept: Vec<char> = value
        .chars()
        .filter(|ch| ch.is_ascii_digit() || *ch == '.' || *ch == ',')
        .collect();
    if !kept.iter().any(char::is_ascii_digit) {
        return None;
    }

    let decimal_position = decimal_separator_position(&kept);
    let mut integer = String::new();
    let mut fraction = String::new();
    for (index, ch) in kept.iter().enumerate() {
        if !ch.is_ascii_digit() {
            continue;
        }
        match decimal_position {
            Some(position) if index > position => fraction.push(*ch),
            _ => integer.push(*ch),
        }
    }

    Some(assemble_decimal(&integer, &fraction))
}

/// JSON numbers carry an unambiguous `.` decimal point, so no grouping
/// heuristic applies. The sign is dropped like any other non-digit.
fn number_leaf(number: &Number) -> Option<String> {
    let rendered = if let Some(value) = number.as_u64() {
        value.to_string()
    } else if let Some(value) = number.as_i64() {
        value.unsigned_abs().to_string()
    } else {
        format!("{}", number.as_f64()?.abs())
    };

    let (integer, fraction) = rendered.split_once('.').unwrap_or((rendered.as_str(), ""));
    Some(assemble_decimal(integer, fraction))
}

fn assemble_decimal(integer: &str, fraction: &str) -> String {
    let fraction = fraction.trim_end_matches('0');
    let integer = if integer.is_empty() { "0" } else { integer };
    if fraction.is_empty() {
        integer.to_string()
    } else {
        format!("{integer}.{fraction}")
    }
}

fn decimal_separator_position(chars: &[char]) -> Option<usize> {
    let separators: Vec<(usize, char)> = chars
        .iter()
        .enumerate()
        .filter(|(_, ch)| **ch == '.' || **ch == ',')
        .map(|(index, ch)| (index, *ch))
        .collect();
    let (last_index, last_char) = *separators.last()?;

    if separators.iter().any(|(_, ch)| *ch != last_char) {
        return Some(last_index);
    }
    if separators.len() > 1 {
        return None;
    }

    let trailing_digits = chars[last_index + 1..]
        .iter()
        .take_while(|ch| ch.is_ascii_digit())
        .count();
    let leading_digits = chars[..last_index]
        .iter()
        .rev()
        .take_while(|ch| ch.is_ascii_digit())
        .count();
    if trailing_digits == 3 && leading_digits > 0 {
        None
    } else {
        Some(last_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalizer() -> Normalizer {
        Normalizer::from_config(&NormalizationConfig::default())
    }

    fn text(value: &str) -> Leaf {
        Leaf::Text(value.to_string())
    }

    #[test]
    fn phone_keeps_only_digits_including_prefix() {
        let normalizer = normalizer();
        assert_eq!(
            normalizer.normalize(FieldType::Phone, &text("01-42-88-65-32")),
            Normalized::Digits("0142886532".to_string())
        );
        assert_eq!(
            normalizer.normalize(FieldType::Phone, &text("+33 1 42 88 65 32")),
            Normalized::Digits("33142886532".to_string())
        );
    }

    #[test]
    fn date_reduces_to_numeric_components_in_order() {
        let normalizer = normalizer();
        assert_eq!(
            normalizer.normalize(FieldType::Date, &text("12 mars 2021")),
            Normalized::Digits("122021".to_string())
        );
        assert_eq!(
            normalizer.normalize(FieldType::Date, &text("12/03/2021")),
            Normalized::Digits("12032021".to_string())
        );
    }

    #[test]
    fn numeric_drops_grouping_and_keeps_decimal() {
        assert_eq!(canonical_number("2,125").as_deref(), Some("2125"));
        assert_eq!(canonical_number("1 234,50 €").as_deref(), Some("1234.5"));
        assert_eq!(canonical_number("1.234.567").as_deref(), Some("1234567"));
        assert_eq!(canonical_number("1,234.56").as_deref(), Some("1234.56"));
        assert_eq!(canonical_number("1.234,56").as_deref(), Some("1234.56"));
        assert_eq!(canonical_number("12,5").as_deref(), Some("12.5"));
        assert_eq!(canonical_number("42.000").as_deref(), Some("42000"));
        assert_eq!(canonical_number("0.50").as_deref(), Some("0.5"));
        assert_eq!(canonical_number("environ"), None);
    }

    #[test]
    fn numeric_leaves_normalize_like_their_text() {
        let normalizer = normalizer();
        assert_eq!(
            normalizer.normalize(FieldType::Numeric, &Leaf::Number(Number::from(2125))),
            normalizer.normalize(FieldType::Numeric, &text("2 125"))
        );

        let float = Number::from_f64(1000.125).expect("finite float");
        assert_eq!(
            normalizer.normalize(FieldType::Numeric, &Leaf::Number(float)),
            Normalized::Number("1000.125".to_string())
        );
        assert_eq!(canonical_number(",5").as_deref(), Some("0.5"));
    }

    #[test]
    fn boolean_tokens_map_to_canonical_values() {
        let normalizer = normalizer();
        assert_eq!(
            normalizer.normalize(FieldType::Boolean, &text(" OUI ")),
            Normalized::Boolean(true)
        );
        assert_eq!(
            normalizer.normalize(FieldType::Boolean, &text("false")),
            Normalized::Boolean(false)
        );
        assert_eq!(
            normalizer.normalize(FieldType::Boolean, &Leaf::Bool(true)),
            Normalized::Boolean(true)
        );
        assert_eq!(
            normalizer.normalize(FieldType::Boolean, &text("peut-être")),
            Normalized::Text("peut-être".to_string())
        );
    }

    #[test]
    fn text_is_trimmed_collapsed_and_lowercased() {
        assert_eq!(
            normalizer().normalize(FieldType::Text, &text("  Marie \n  DUPONT ")),
            Normalized::Text("marie dupont".to_string())
        );
    }

    #[test]
    fn blank_tokens_and_null_are_blank() {
        let normalizer = normalizer();
        for value in ["", "  ", "NULL", "None", "-", "nan"] {
            assert_eq!(normalizer.normalize(FieldType::Text, &text(value)), Normalized::Blank);
        }
        assert_eq!(normalizer.normalize(FieldType::Phone, &Leaf::Null), Normalized::Blank);
    }

    #[test]
    fn unrecognized_values_pass_through_as_text() {
        let normalizer = normalizer();
        assert_eq!(
            normalizer.normalize(FieldType::Phone, &text("inconnu")),
            Normalized::Text("inconnu".to_string())
        );
        assert_eq!(
            normalizer.normalize(FieldType::Numeric, &text("néant")),
            Normalized::Text("néant".to_string())
        );
    }
}
