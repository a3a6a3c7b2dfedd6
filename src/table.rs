use serde_json::Value;
use tracing::{debug, warn};

use crate::columns::{ColumnSet, resolve_columns};
use crate::domain::DVError;

pub const ERROR_COLUMN: &str = "Error";

/// Rows of JSON values aligned to a fixed set of columns.
///
/// Every row holds exactly one cell per column; missing values are `Null`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableGrid {
    columns: ColumnSet,
    rows: Vec<Vec<Value>>,
}

impl TableGrid {
    /// Parses `json` and projects it for `data_type`.
    ///
    /// Accepts a bare array of records or an object carrying the array under
    /// `"history"`. Parse failures are not returned; they become a single
    /// `Error` cell describing the problem.
    pub fn from_json(data_type: &str, json: &str) -> Self {
        match Self::try_from_json(data_type, json) {
            Ok(grid) => {
                debug!(
                    "Projected {} rows x {} columns for {data_type}",
                    grid.nrows(),
                    grid.ncolumns()
                );
                grid
            }
            Err(e) => {
                warn!("Failed to parse {data_type} data: {e}");
                Self::error(format!("Failed to parse data: {e}"))
            }
        }
    }

    fn try_from_json(data_type: &str, json: &str) -> Result<Self, DVError> {
        match serde_json::from_str::<Value>(json)? {
            Value::Object(mut obj) => match obj.remove("history") {
                Some(Value::Array(records)) => records_to_grid(data_type, &records),
                Some(other) => Err(DVError::UnexpectedShape(format!(
                    "\"history\" is not an array but {}",
                    json_kind(&other)
                ))),
                None => Ok(project(&[], resolve_columns(data_type, &[]))),
            },
            Value::Array(records) => records_to_grid(data_type, &records),
            other => Err(DVError::UnexpectedShape(format!(
                "expected an array of records but found {}",
                json_kind(&other)
            ))),
        }
    }

    /// One column named `Error` holding `message` in its only row.
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            columns: [ERROR_COLUMN].into_iter().collect(),
            rows: vec![vec![Value::String(message.into())]],
        }
    }

    pub fn columns(&self) -> &ColumnSet {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncolumns(&self) -> usize {
        self.columns.len()
    }

    pub fn cell(&self, row: usize, column: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(column))
    }

    pub fn cell_text(&self, row: usize, column: usize) -> String {
        self.cell(row, column).map(cell_text).unwrap_or_default()
    }
}

/// The first record decides the extra columns, so it has to be an object.
fn records_to_grid(data_type: &str, records: &[Value]) -> Result<TableGrid, DVError> {
    if let Some(first) = records.first()
        && !first.is_object()
    {
        return Err(DVError::UnexpectedShape(format!(
            "first record is {}, not an object",
            json_kind(first)
        )));
    }
    Ok(project(records, resolve_columns(data_type, records)))
}

/// Aligns every record to `columns`. Non-object records yield empty rows.
pub fn project(records: &[Value], columns: ColumnSet) -> TableGrid {
    let rows = records
        .iter()
        .map(|record| {
            columns
                .iter()
                .map(|name| {
                    record
                        .as_object()
                        .and_then(|obj| obj.get(name))
                        .cloned()
                        .unwrap_or(Value::Null)
                })
                .collect()
        })
        .collect();
    TableGrid { columns, rows }
}

/// Text form of a cell: strings verbatim, null as empty, anything else as compact JSON.
pub fn cell_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn column_names(grid: &TableGrid) -> Vec<&str> {
        grid.columns().iter().collect()
    }

    fn row_text(grid: &TableGrid, row: usize) -> Vec<String> {
        (0..grid.ncolumns()).map(|c| grid.cell_text(row, c)).collect()
    }

    #[test]
    fn history_object_scenario() {
        let grid = TableGrid::from_json(
            "History",
            r#"{"history":[{"timestamp":"t1","user_id":"u1","message_text":"hi","response_text":"hello","message_type":"text"}]}"#,
        );
        assert_eq!(
            column_names(&grid),
            vec!["timestamp", "user_id", "message_text", "response_text", "message_type"]
        );
        assert_eq!(grid.nrows(), 1);
        assert_eq!(row_text(&grid, 0), vec!["t1", "u1", "hi", "hello", "text"]);
    }

    #[test]
    fn malformed_input_becomes_error_grid() {
        for input in ["not json", "\"not json\"", "", "42", "{\"history\": 3}"] {
            let grid = TableGrid::from_json("History", input);
            assert_eq!(column_names(&grid), vec![ERROR_COLUMN], "input {input:?}");
            assert_eq!(grid.nrows(), 1);
            assert!(
                grid.cell_text(0, 0).starts_with("Failed to parse data:"),
                "got {:?}",
                grid.cell_text(0, 0)
            );
        }
    }

    #[test]
    fn non_object_first_record_becomes_error_grid() {
        for input in ["[1, 2]", r#"{"history":["a",{"user_id":"u1"}]}"#, "[null]"] {
            let grid = TableGrid::from_json("History", input);
            assert_eq!(column_names(&grid), vec![ERROR_COLUMN], "input {input:?}");
            assert_eq!(grid.nrows(), 1);
            assert!(grid.cell_text(0, 0).starts_with("Failed to parse data:"));
        }
    }

    #[test]
    fn empty_array_keeps_defaults() {
        let grid = TableGrid::from_json("Keywords", "[]");
        assert_eq!(grid.ncolumns(), 4);
        assert_eq!(grid.nrows(), 0);
    }

    #[test]
    fn object_without_history_keeps_defaults_only() {
        let grid = TableGrid::from_json("Keywords", r#"{"items":[{"keyword":"x"}]}"#);
        assert_eq!(
            column_names(&grid),
            vec!["keyword", "response", "usage_count", "created_at"]
        );
        assert_eq!(grid.nrows(), 0);
    }

    #[test]
    fn members_fixture_detects_extra_columns() {
        let grid = TableGrid::from_json("members", include_str!("../tests/fixtures/members.json"));
        assert_eq!(
            column_names(&grid),
            vec![
                "user_id",
                "first_name",
                "is_registered",
                "is_admin",
                "is_banned",
                "username",
                "joined_at"
            ]
        );
        assert_eq!(grid.nrows(), 3);
        assert_eq!(grid.cell_text(0, 2), "true");
        // username missing in the third record
        assert_eq!(grid.cell_text(2, 5), "");
    }

    #[test]
    fn every_row_has_one_cell_per_column() {
        let grid = TableGrid::from_json("History", include_str!("../tests/fixtures/history.json"));
        assert!(grid.nrows() > 0);
        for row in grid.rows() {
            assert_eq!(row.len(), grid.ncolumns());
        }
    }

    #[test]
    fn later_keys_do_not_add_columns() {
        let records = vec![json!({"a": 1}), json!({"a": 2, "b": 3})];
        let grid = project(&records, resolve_columns("", &records));
        assert_eq!(column_names(&grid), vec!["a"]);
        assert_eq!(row_text(&grid, 1), vec!["2"]);
    }

    #[test]
    fn non_object_records_project_to_empty_rows() {
        let records = vec![json!({"a": "x"}), json!(7), json!(null)];
        let grid = project(&records, resolve_columns("", &records));
        assert_eq!(grid.nrows(), 3);
        assert_eq!(row_text(&grid, 1), vec![""]);
        assert_eq!(row_text(&grid, 2), vec![""]);
    }

    #[test]
    fn cell_text_renders_json_values() {
        assert_eq!(cell_text(&json!(null)), "");
        assert_eq!(cell_text(&json!("plain")), "plain");
        assert_eq!(cell_text(&json!(12)), "12");
        assert_eq!(cell_text(&json!(1.5)), "1.5");
        assert_eq!(cell_text(&json!(false)), "false");
        assert_eq!(cell_text(&json!({"k": [1, 2]})), r#"{"k":[1,2]}"#);
    }

    #[test]
    fn out_of_range_cells_are_empty() {
        let grid = TableGrid::error("boom");
        assert_eq!(grid.cell_text(0, 0), "boom");
        assert_eq!(grid.cell_text(5, 0), "");
        assert!(grid.cell(0, 3).is_none());
    }
}
