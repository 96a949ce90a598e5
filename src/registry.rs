/// Connection Registry Module
///
/// Named connections, a primary default, and broadcast statements.
/// Connections are keyed by `server_username_database` and kept in
/// registration order. Operations that take an optional identifier resolve
/// `None` to the primary connection. `execute`, `insert` and `update` ignore
/// the primary and run on every registered connection, one after another,
/// without stopping on failure.

use crate::core::db::{
    count_statement, insert_statement, update_statement, ConnectParams, DbConnection, Driver, Row,
    SqliteDriver, UpdateSyntax, COUNT_ALIAS,
};
use crate::core::{MultiDbError, Result};
use tracing::{debug, info, warn};

#[derive(Debug)]
struct Entry<C> {
    id: String,
    connection: C,
}

/// Outcome of one connection in a broadcast operation.
#[derive(Debug)]
pub struct ConnectionOutcome {
    pub connection_id: String,
    pub result: Result<()>,
}

/// Per-connection outcomes of a broadcast, in registration order.
///
/// Dropping the report is the fire-and-forget mode: every failure has
/// already been logged at `warn`.
#[derive(Debug, Default)]
pub struct BroadcastReport {
    outcomes: Vec<ConnectionOutcome>,
}

impl BroadcastReport {
    fn record(&mut self, connection_id: &str, operation: &str, result: Result<()>) {
        if let Err(e) = &result {
            warn!(connection_id, operation, error = %e, "broadcast statement failed");
        }
        self.outcomes.push(ConnectionOutcome {
            connection_id: connection_id.to_string(),
            result,
        });
    }

    pub fn outcomes(&self) -> &[ConnectionOutcome] {
        &self.outcomes
    }

    /// Number of connections the statement was sent to.
    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(|o| o.result.is_ok())
    }

    pub fn failures(&self) -> impl Iterator<Item = &ConnectionOutcome> {
        self.outcomes.iter().filter(|o| o.result.is_err())
    }

    /// Returns the first failure, if any.
    pub fn into_result(self) -> Result<()> {
        self.outcomes
            .into_iter()
            .map(|o| o.result)
            .find(|r| r.is_err())
            .unwrap_or(Ok(()))
    }
}

/// Owns every registered connection and the primary selection.
///
/// Not synchronized: callers sharing a registry between threads must
/// serialize access themselves.
#[derive(Debug)]
pub struct ConnectionRegistry<D: Driver = SqliteDriver> {
    driver: D,
    entries: Vec<Entry<D::Connection>>,
    primary: Option<String>,
    update_syntax: UpdateSyntax,
}

impl ConnectionRegistry<SqliteDriver> {
    /// Opens the first SQLite connection and makes it primary.
    pub fn open(username: &str, password: &str, server: &str, database: &str) -> Result<Self> {
        Self::connect(
            SqliteDriver::default(),
            &ConnectParams::new(username, password, server, database),
        )
    }
}

impl<D: Driver> ConnectionRegistry<D> {
    /// Creates an empty registry with no primary connection.
    pub fn new(driver: D) -> Self {
        ConnectionRegistry {
            driver,
            entries: Vec::new(),
            primary: None,
            update_syntax: UpdateSyntax::default(),
        }
    }

    /// Creates a registry holding one connection, selected as primary.
    pub fn connect(driver: D, params: &ConnectParams) -> Result<Self> {
        let mut registry = Self::new(driver);
        registry.add_connection(params, true)?;
        Ok(registry)
    }

    /// Opens a connection and registers it under `params.connection_id()`.
    ///
    /// The new connection always becomes primary; `is_primary` is accepted
    /// for call-site compatibility and has no effect. Re-adding an existing
    /// identifier replaces (and closes) the previous handle in place. On
    /// failure the registry is left untouched.
    pub fn add_connection(&mut self, params: &ConnectParams, is_primary: bool) -> Result<String> {
        let id = params.connection_id();
        let connection = self.driver.connect(params)?;

        match self.entries.iter_mut().find(|e| e.id == id) {
            Some(entry) => {
                let previous = std::mem::replace(&mut entry.connection, connection);
                if let Err(e) = previous.close() {
                    warn!(connection_id = %id, error = %e, "closing replaced connection failed");
                }
                info!(connection_id = %id, "replaced connection");
            }
            None => {
                self.entries.push(Entry {
                    id: id.clone(),
                    connection,
                });
                info!(connection_id = %id, "added connection");
            }
        }

        debug!(connection_id = %id, requested_primary = is_primary, "selecting as primary");
        self.primary = Some(id.clone());
        Ok(id)
    }

    /// Selects the primary connection. The identifier is not validated;
    /// an unknown one surfaces as `ConnectionNotFound` on next use.
    pub fn set_primary(&mut self, connection_id: impl Into<String>) {
        self.primary = Some(connection_id.into());
    }

    pub fn primary(&self) -> Option<&str> {
        self.primary.as_deref()
    }

    /// Registered identifiers in registration order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.id.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn update_syntax(&self) -> UpdateSyntax {
        self.update_syntax
    }

    pub fn set_update_syntax(&mut self, syntax: UpdateSyntax) {
        self.update_syntax = syntax;
    }

    fn resolve_id<'a>(&'a self, connection_id: Option<&'a str>) -> Result<&'a str> {
        connection_id
            .or(self.primary.as_deref())
            .ok_or(MultiDbError::NoPrimary)
    }

    /// Returns the handle for `connection_id`, or the primary when `None`.
    pub fn connection(&self, connection_id: Option<&str>) -> Result<&D::Connection> {
        let id = self.resolve_id(connection_id)?;
        self.entries
            .iter()
            .find(|e| e.id == id)
            .map(|e| &e.connection)
            .ok_or_else(|| MultiDbError::ConnectionNotFound(id.to_string()))
    }

    /// Closes one connection (the primary when `None`) and removes it.
    ///
    /// The primary selection is left as is, so closing the primary makes
    /// later default operations fail with `ConnectionNotFound`.
    pub fn close(&mut self, connection_id: Option<&str>) -> Result<()> {
        let id = self.resolve_id(connection_id)?.to_string();
        let index = self
            .entries
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| MultiDbError::ConnectionNotFound(id.clone()))?;

        let entry = self.entries.remove(index);
        info!(connection_id = %id, "closing connection");
        entry.connection.close()
    }

    /// Closes every connection and empties the registry.
    pub fn close_all(&mut self) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for entry in self.entries.drain(..) {
            info!(connection_id = %entry.id, "closing connection");
            let result = entry.connection.close();
            report.record(&entry.id, "close", result);
        }
        report
    }

    /// Escapes `input` for a single-quoted literal in the dialect of the
    /// resolved connection.
    pub fn escape(&self, input: &str, connection_id: Option<&str>) -> Result<String> {
        Ok(self.connection(connection_id)?.dialect().escape(input))
    }

    /// Runs one statement and returns every row as a column-to-value mapping.
    pub fn get_assoc(&self, sql: &str, connection_id: Option<&str>) -> Result<Vec<Row>> {
        let connection = self.connection(connection_id)?;
        debug!(sql, "get_assoc");
        connection.query_assoc(sql)
    }

    /// Runs a statement batch on every registered connection.
    pub fn execute(&self, sql: &str) -> BroadcastReport {
        let mut report = BroadcastReport::default();
        for entry in &self.entries {
            debug!(connection_id = %entry.id, sql, "execute");
            report.record(&entry.id, "execute", entry.connection.execute_batch(sql));
        }
        report
    }

    /// Inserts one row into `table` on every registered connection.
    ///
    /// Table, column names and values are escaped with each connection's
    /// dialect; values are delimited with double quotes.
    pub fn insert<K, V>(&self, table: &str, fields: &[(K, V)]) -> BroadcastReport
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut report = BroadcastReport::default();
        for entry in &self.entries {
            let sql = insert_statement(entry.connection.dialect(), table, fields);
            debug!(connection_id = %entry.id, sql = %sql, "insert");
            report.record(&entry.id, "insert", entry.connection.execute(&sql));
        }
        report
    }

    /// Updates `table` on every registered connection.
    ///
    /// # Trust boundary
    ///
    /// `where_clause` is appended to the statement verbatim, without any
    /// escaping. Never build it from untrusted input.
    ///
    /// # Caveat
    ///
    /// Values are delimited with double quotes, which SQLite resolves as a
    /// column reference whenever the target table has a column of that name.
    /// Updating a field to the text `"age"` on a table with an `age` column
    /// copies the `age` value rather than storing the word. `insert` is not
    /// affected.
    pub fn update<K, V>(&self, table: &str, fields: &[(K, V)], where_clause: &str) -> BroadcastReport
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut report = BroadcastReport::default();
        for entry in &self.entries {
            let sql = update_statement(
                entry.connection.dialect(),
                table,
                fields,
                where_clause,
                self.update_syntax,
            );
            debug!(connection_id = %entry.id, sql = %sql, "update");
            report.record(&entry.id, "update", entry.connection.execute(&sql));
        }
        report
    }

    /// Returns the number of rows in `table`.
    pub fn count(&self, table: &str, connection_id: Option<&str>) -> Result<u64> {
        let connection = self.connection(connection_id)?;
        let sql = count_statement(connection.dialect(), table);
        debug!(sql = %sql, "count");

        let rows = connection.query_assoc(&sql)?;
        let value = rows
            .first()
            .and_then(|row| row.get(COUNT_ALIAS))
            .ok_or_else(|| MultiDbError::Query(format!("count of '{}' returned no rows", table)))?;

        value
            .as_i64()
            .and_then(|n| u64::try_from(n).ok())
            .ok_or_else(|| MultiDbError::Query(format!("unexpected count value {:?}", value)))
    }
}
