use serde_json::Value;

const HISTORY_COLUMNS: &[&str] = &[
    "timestamp",
    "user_id",
    "message_text",
    "response_text",
    "message_type",
];
const MEMBERS_COLUMNS: &[&str] = &[
    "user_id",
    "first_name",
    "is_registered",
    "is_admin",
    "is_banned",
];
const KEYWORDS_COLUMNS: &[&str] = &["keyword", "response", "usage_count", "created_at"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    History,
    Members,
    Keywords,
    Other,
}

impl DataType {
    /// Case-insensitive lookup, anything unknown is `Other`.
    pub fn from_label(label: &str) -> Self {
        if label.eq_ignore_ascii_case("History") {
            DataType::History
        } else if label.eq_ignore_ascii_case("Members") {
            DataType::Members
        } else if label.eq_ignore_ascii_case("Keywords") {
            DataType::Keywords
        } else {
            DataType::Other
        }
    }

    pub fn default_columns(&self) -> &'static [&'static str] {
        match self {
            DataType::History => HISTORY_COLUMNS,
            DataType::Members => MEMBERS_COLUMNS,
            DataType::Keywords => KEYWORDS_COLUMNS,
            DataType::Other => &[],
        }
    }
}

/// Ordered list of column names without duplicates.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnSet(Vec<String>);

impl ColumnSet {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Appends `name` unless it is already present. Returns whether it was added.
    pub fn push(&mut self, name: impl Into<String>) -> bool {
        let name = name.into();
        if self.contains(&name) {
            return false;
        }
        self.0.push(name);
        true
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.iter().any(|c| c == name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl<S: Into<String>> FromIterator<S> for ColumnSet {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut columns = ColumnSet::new();
        for name in iter {
            columns.push(name);
        }
        columns
    }
}

/// Default columns of `data_type` followed by the keys of the first sample
/// record that are not already present. Only the first record is inspected.
pub fn resolve_columns(data_type: &str, sample: &[Value]) -> ColumnSet {
    let mut columns: ColumnSet = DataType::from_label(data_type)
        .default_columns()
        .iter()
        .copied()
        .collect();

    if let Some(Value::Object(first)) = sample.first() {
        for key in first.keys() {
            columns.push(key.as_str());
        }
    }
    columns
}
