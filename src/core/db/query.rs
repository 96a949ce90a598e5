/// Query Result Module
///
/// Associative result rows: every row is an ordered column-name-to-value
/// mapping, fully materialized before the statement is released.

use crate::core::{MultiDbError, Result};
use rusqlite::{types::ValueRef, Connection};
use serde::ser::{Serialize, SerializeMap, Serializer};

/// A single cell value as returned by the driver.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
#[serde(untagged)]
pub enum Value {
    Null,
    Integer(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    /// Returns the integer payload, if this is an integer cell.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Integer(i) => Some(*i),
            _ => None,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl From<ValueRef<'_>> for Value {
    fn from(value: ValueRef<'_>) -> Self {
        match value {
            ValueRef::Null => Value::Null,
            ValueRef::Integer(i) => Value::Integer(i),
            ValueRef::Real(f) => Value::Real(f),
            // TEXT that is not valid UTF-8 keeps its bytes
            ValueRef::Text(t) => match std::str::from_utf8(t) {
                Ok(text) => Value::Text(text.to_string()),
                Err(_) => Value::Blob(t.to_vec()),
            },
            ValueRef::Blob(b) => Value::Blob(b.to_vec()),
        }
    }
}

/// One result row: column name to value, in the column order of the statement.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Row {
    cells: Vec<(String, Value)>,
}

impl Row {
    pub fn new(cells: Vec<(String, Value)>) -> Self {
        Row { cells }
    }

    /// Looks up a cell by column name. With duplicate names the last one
    /// wins, as in an associative fetch.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.cells
            .iter()
            .rev()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value)
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.cells.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

impl Serialize for Row {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.cells.len()))?;
        for (name, value) in &self.cells {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Runs `sql` on `conn` and drains every row into memory.
///
/// An empty result set is an empty vector, not an error. Blank statement
/// text is a `Query` error.
pub fn fetch_assoc(conn: &Connection, sql: &str) -> Result<Vec<Row>> {
    if sql.trim().is_empty() {
        return Err(MultiDbError::Query("empty statement".to_string()));
    }

    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut rows = stmt.query([])?;
    let mut fetched = Vec::new();
    while let Some(row) = rows.next()? {
        let mut cells = Vec::with_capacity(columns.len());
        for (i, name) in columns.iter().enumerate() {
            cells.push((name.clone(), Value::from(row.get_ref(i)?)));
        }
        fetched.push(Row::new(cells));
    }

    Ok(fetched)
}
