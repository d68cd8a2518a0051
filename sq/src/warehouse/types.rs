//! Tabular query results

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

/// Column names plus positional rows, as returned by the warehouse
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TabularResult {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Value>>,
}

impl TabularResult {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self { columns, rows }
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Build the tool payload: `{workspace, [warning], columns, row_count, rows}`
    ///
    /// Each row becomes a map keyed by column name in column order. Missing
    /// cells are null; cells beyond the last column are dropped.
    pub fn into_payload(self, workspace: &str, warning: Option<&str>) -> Value {
        let row_count = self.rows.len();
        let rows: Vec<Value> = self
            .rows
            .into_iter()
            .map(|row| {
                let mut cells = row.into_iter();
                let record: Map<String, Value> = self
                    .columns
                    .iter()
                    .map(|column| (column.clone(), cells.next().unwrap_or(Value::Null)))
                    .collect();
                Value::Object(record)
            })
            .collect();

        let mut payload = Map::new();
        payload.insert("workspace".to_string(), json!(workspace));
        if let Some(warning) = warning {
            payload.insert("warning".to_string(), json!(warning));
        }
        payload.insert("columns".to_string(), json!(self.columns));
        payload.insert("row_count".to_string(), json!(row_count));
        payload.insert("rows".to_string(), Value::Array(rows));
        Value::Object(payload)
    }
}
