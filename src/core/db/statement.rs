/// Statement Building Module
///
/// Escaping is a capability of the connection's dialect. The builders here
/// only concatenate: table and column names go through `Dialect::escape`,
/// values go through `Dialect::escape_literal` for the `"` delimiter and are
/// wrapped in double quotes.
///
/// # Trust boundary
///
/// The WHERE clause handed to [`update_statement`] is inserted verbatim.
/// Nothing in this module escapes or validates it; callers must never build
/// it from untrusted input.

use serde::Deserialize;

/// Column alias used by [`count_statement`].
pub const COUNT_ALIAS: &str = "retcntdatafield";

const LIST_SEPARATOR: &str = " ,";

/// Escaping rules of one SQL dialect.
pub trait Dialect {
    /// Escapes `input` so it can sit between two `quote` characters as a
    /// string literal payload.
    fn escape_literal(&self, input: &str, quote: char) -> String;

    /// Escapes `input` for a single-quoted SQL literal.
    fn escape(&self, input: &str) -> String {
        self.escape_literal(input, '\'')
    }
}

/// SQLite literal escaping.
///
/// The delimiting quote is doubled. NUL characters are removed because
/// SQLite stops reading statement text at the first NUL.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SqliteDialect;

impl Dialect for SqliteDialect {
    fn escape_literal(&self, input: &str, quote: char) -> String {
        let mut escaped = String::with_capacity(input.len() + 2);
        for ch in input.chars() {
            match ch {
                '\0' => {}
                c if c == quote => {
                    escaped.push(c);
                    escaped.push(c);
                }
                c => escaped.push(c),
            }
        }
        escaped
    }
}

/// Shape of the SET clause produced by [`update_statement`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateSyntax {
    /// `SET (col = "val" ,...)`, byte-compatible with the legacy tool.
    /// Strict dialects (SQLite included) reject it.
    #[default]
    Parenthesized,
    /// `SET col = "val" ,...`
    Standard,
}

fn quoted_value(dialect: &dyn Dialect, value: &str) -> String {
    format!("\"{}\"", dialect.escape_literal(value, '"'))
}

/// Builds `INSERT INTO <table> (<cols>) VALUES (<vals>)`.
pub fn insert_statement<K, V>(dialect: &dyn Dialect, table: &str, fields: &[(K, V)]) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let columns: Vec<String> = fields
        .iter()
        .map(|(column, _)| dialect.escape(column.as_ref()))
        .collect();
    let values: Vec<String> = fields
        .iter()
        .map(|(_, value)| quoted_value(dialect, value.as_ref()))
        .collect();

    format!(
        "INSERT INTO {} ({}) VALUES ({})",
        dialect.escape(table),
        columns.join(LIST_SEPARATOR),
        values.join(LIST_SEPARATOR)
    )
}

/// Builds `UPDATE <table> SET ... WHERE <where_clause>`.
///
/// `where_clause` is not escaped. See the module documentation.
///
/// # Caveat
///
/// Values are delimited with double quotes. SQLite only reads a
/// double-quoted token as a string when no column of that name is in scope,
/// so a value equal to a column name of `table` assigns that column's
/// current data instead of the literal text.
pub fn update_statement<K, V>(
    dialect: &dyn Dialect,
    table: &str,
    fields: &[(K, V)],
    where_clause: &str,
    syntax: UpdateSyntax,
) -> String
where
    K: AsRef<str>,
    V: AsRef<str>,
{
    let assignments: Vec<String> = fields
        .iter()
        .map(|(column, value)| {
            format!(
                "{} = {}",
                dialect.escape(column.as_ref()),
                quoted_value(dialect, value.as_ref())
            )
        })
        .collect();
    let assignments = assignments.join(LIST_SEPARATOR);

    let set_clause = match syntax {
        UpdateSyntax::Parenthesized => format!("({})", assignments),
        UpdateSyntax::Standard => assignments,
    };

    format!(
        "UPDATE {} SET {} WHERE {}",
        dialect.escape(table),
        set_clause,
        where_clause
    )
}

/// Builds `SELECT COUNT(*) AS retcntdatafield FROM <table>`.
pub fn count_statement(dialect: &dyn Dialect, table: &str) -> String {
    format!(
        "SELECT COUNT(*) AS {} FROM {}",
        COUNT_ALIAS,
        dialect.escape(table)
    )
}
