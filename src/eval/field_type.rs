use crate::config::FieldTypeKeywords;
use crate::eval::flatten::PATH_SEPARATOR;

const SEGMENT_PREFIX_MARKER: char = '_';

/// Semantic type of a field, derived once from its path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Phone,
    Date,
    Numeric,
    Boolean,
    Text,
}

impl FieldType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Phone => "phone",
            Self::Date => "date",
            Self::Numeric => "numeric",
            Self::Boolean => "boolean",
            Self::Text => "text",
        }
    }
}

/// Case-insensitive substring lookup over field paths. The longest matching
/// keyword wins; equal lengths resolve to the earliest declared entry.
///
/// A keyword ending in `_` is a prefix: it only matches at the start of a path
/// segment, so `is_` matches `societe.is_active` but not `ville_de_paris`.
#[derive(Debug, Clone)]
pub struct KeywordTable<T> {
    entries: Vec<(String, T)>,
}

impl<T: Copy> KeywordTable<T> {
    pub fn new<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, T)>,
        S: AsRef<str>,
    {
        let entries = entries
            .into_iter()
            .map(|(keyword, value)| (keyword.as_ref().trim().to_lowercase(), value))
            .filter(|(keyword, _)| !keyword.is_empty())
            .collect();
        Self { entries }
    }

    pub fn lookup(&self, path: &str) -> Option<T> {
        let haystack = path.to_lowercase();
        let mut best: Option<(usize, T)> = None;

        for (keyword, value) in &self.entries {
            if !keyword_matches(&haystack, keyword) {
                continue;
            }
            let length = keyword.chars().count();
            if best.is_none_or(|(best_length, _)| length > best_length) {
                best = Some((length, *value));
            }
        }

        best.map(|(_, value)| value)
    }
}

fn keyword_matches(haystack: &str, keyword: &str) -> bool {
    if !keyword.ends_with(SEGMENT_PREFIX_MARKER) {
        return haystack.contains(keyword);
    }
    haystack
        .match_indices(keyword)
        .any(|(index, _)| index == 0 || haystack[..index].ends_with(PATH_SEPARATOR))
}

#[derive(Debug, Clone)]
pub struct FieldTypeClassifier {
    table: KeywordTable<FieldType>,
}

impl FieldTypeClassifier {
    pub fn from_config(keywords: &FieldTypeKeywords) -> Self {
        let groups = [
            (FieldType::Phone, &keywords.phone),
            (FieldType::Date, &keywords.date),
            (FieldType::Numeric, &keywords.numeric),
            (FieldType::Boolean, &keywords.boolean),
        ];
        let entries = groups.into_iter().flat_map(|(field_type, list)| {
            list.iter().map(move |keyword| (keyword.as_str(), field_type))
        });

        Self {
            table: KeywordTable::new(entries),
        }
    }

    pub fn classify(&self, path: &str) -> FieldType {
        self.table.lookup(path).unwrap_or(FieldType::Text)
    }
}
