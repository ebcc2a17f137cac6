//! Lock-step flattening of the gold and predicted documents into aligned
//! field pairs.
//!
//! Mappings extend the dotted path with one segment per key. A list made only
//! of scalars is a single multi-valued leaf whose value is its elements joined
//! with `"; "`; a list holding any mapping or nested list is expanded by index
//! (`parties.0.nom`). Both documents go through the same rules.

use std::collections::{HashMap, HashSet};

use anyhow::{Result, bail};
use serde_json::{Map, Number, Value};
use tracing::warn;

pub const PATH_SEPARATOR: char = '.';
pub const KEY_WHITESPACE_REPLACEMENT: &str = "_";
pub const LIST_JOIN_SEPARATOR: &str = "; ";

/// A comparable scalar found at a leaf position.
#[derive(Debug, Clone, PartialEq)]
pub enum Leaf {
    Null,
    Bool(bool),
    Number(Number),
    Text(String),
}

impl Leaf {
    /// Raw textual form used as normalization input.
    pub fn as_text(&self) -> String {
        match self {
            Self::Null => String::new(),
            Self::Bool(value) => value.to_string(),
            Self::Number(value) => value.to_string(),
            Self::Text(value) => value.clone(),
        }
    }

    /// Display form carried into the report, original casing intact.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(value) => Value::Bool(*value),
            Self::Number(value) => Value::Number(value.clone()),
            Self::Text(value) => Value::String(value.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldPair {
    pub path: String,
    pub gold: Option<Leaf>,
    pub predicted: Option<Leaf>,
}

/// Replaces every whitespace run in a key with a single `_`, keeping case.
pub fn normalize_key(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<&str>>()
        .join(KEY_WHITESPACE_REPLACEMENT)
}

pub fn is_excluded(path: &str, excluded_prefixes: &[String]) -> bool {
    excluded_prefixes.iter().any(|prefix| {
        path == prefix
            || path
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.starts_with(PATH_SEPARATOR))
    })
}

/// Flattens one document into its leaves, in document order.
pub fn flatten_document(document: &Value, excluded_prefixes: &[String]) -> Result<Vec<(String, Leaf)>> {
    let Value::Object(map) = document else {
        bail!(
            "document must be a JSON object at the top level, found {}",
            value_kind(document)
        );
    };

    let mut leaves = Vec::new();
    flatten_map(map, "", &mut leaves);

    let mut seen = HashSet::<String>::new();
    let mut unique = Vec::with_capacity(leaves.len());
    for (path, leaf) in leaves {
        if is_excluded(&path, excluded_prefixes) {
            continue;
        }
        if !seen.insert(path.clone()) {
            warn!(field = %path, "duplicate field path after key normalization; keeping first value");
            continue;
        }
        unique.push((path, leaf));
    }

    Ok(unique)
}

/// Aligns both documents over the union of their leaf paths. Gold order comes
/// first, followed by predicted-only paths in predicted order.
pub fn align(gold: &Value, predicted: &Value, excluded_prefixes: &[String]) -> Result<Vec<FieldPair>> {
    let gold_leaves = flatten_document(gold, excluded_prefixes)?;
    let predicted_leaves = flatten_document(predicted, excluded_prefixes)?;

    let mut predicted_slots: Vec<Option<Leaf>> = Vec::with_capacity(predicted_leaves.len());
    let mut predicted_index = HashMap::<String, usize>::with_capacity(predicted_leaves.len());
    let mut predicted_paths = Vec::with_capacity(predicted_leaves.len());
    for (path, leaf) in predicted_leaves {
        predicted_index.insert(path.clone(), predicted_slots.len());
        predicted_slots.push(Some(leaf));
        predicted_paths.push(path);
    }

    let mut pairs = Vec::with_capacity(gold_leaves.len() + predicted_paths.len());
    for (path, gold_leaf) in gold_leaves {
        let predicted_leaf = predicted_index
            .get(&path)
            .and_then(|&slot| predicted_slots[slot].take());
        pairs.push(FieldPair {
            path,
            gold: Some(gold_leaf),
            predicted: predicted_leaf,
        });
    }

    for (path, slot) in predicted_paths.into_iter().zip(predicted_slots) {
        if let Some(predicted_leaf) = slot {
            pairs.push(FieldPair {
                path,
                gold: None,
                predicted: Some(predicted_leaf),
            });
        }
    }

    Ok(pairs)
}

fn flatten_map(map: &Map<String, Value>, prefix: &str, out: &mut Vec<(String, Leaf)>) {
    for (key, value) in map {
        let path = join_path(prefix, &normalize_key(key));
        flatten_value(value, path, out);
    }
}

fn flatten_value(value: &Value, path: String, out: &mut Vec<(String, Leaf)>) {
    match value {
        Value::Object(map) => flatten_map(map, &path, out),
        Value::Array(items) if items.iter().all(is_scalar) => {
            let joined = items
                .iter()
                .filter_map(scalar_leaf)
                .map(|leaf| leaf.as_text())
                .collect::<Vec<String>>()
                .join(LIST_JOIN_SEPARATOR);
            out.push((path, Leaf::Text(joined)));
        }
        Value::Array(items) => {
            for (index, item) in items.iter().enumerate() {
                flatten_value(item, join_path(&path, &index.to_string()), out);
            }
        }
        scalar => {
            if let Some(leaf) = scalar_leaf(scalar) {
                out.push((path, leaf));
            }
        }
    }
}

fn scalar_leaf(value: &Value) -> Option<Leaf> {
    match value {
        Value::Null => Some(Leaf::Null),
        Value::Bool(flag) => Some(Leaf::Bool(*flag)),
        Value::Number(number) => Some(Leaf::Number(number.clone())),
        Value::String(text) => Some(Leaf::Text(text.clone())),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn is_scalar(value: &Value) -> bool {
    !matches!(value, Value::Array(_) | Value::Object(_))
}

fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}{PATH_SEPARATOR}{segment}")
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
