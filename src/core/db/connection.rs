/// Connection Management Module
///
/// This module defines the boundary to the underlying database driver: how a
/// connection is opened from its parameters and which primitives a live
/// connection offers. The registry only ever talks to these traits.

use crate::core::db::query::{fetch_assoc, Row};
use crate::core::db::statement::{Dialect, SqliteDialect};
use crate::core::{MultiDbError, Result};
use rusqlite::config::DbConfig;
use rusqlite::{Connection, OpenFlags};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

/// Server name that selects a private in-memory database.
pub const MEMORY_SERVER: &str = ":memory:";

/// Parameters needed to open one connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectParams {
    pub username: String,
    pub password: String,
    pub server: String,
    pub database: String,
}

impl ConnectParams {
    pub fn new(
        username: impl Into<String>,
        password: impl Into<String>,
        server: impl Into<String>,
        database: impl Into<String>,
    ) -> Self {
        ConnectParams {
            username: username.into(),
            password: password.into(),
            server: server.into(),
            database: database.into(),
        }
    }

    /// Deterministic identifier `server_username_database`.
    pub fn connection_id(&self) -> String {
        format!("{}_{}_{}", self.server, self.username, self.database)
    }
}

/// Opens connections for one kind of database.
pub trait Driver {
    type Connection: DbConnection;

    fn connect(&self, params: &ConnectParams) -> Result<Self::Connection>;
}

/// The primitives a live connection offers.
pub trait DbConnection {
    /// Escaping rules for statements sent over this connection.
    fn dialect(&self) -> &dyn Dialect;

    /// Runs a single statement and materializes every row.
    fn query_assoc(&self, sql: &str) -> Result<Vec<Row>>;

    /// Runs a single statement that returns no rows.
    fn execute(&self, sql: &str) -> Result<()>;

    /// Runs a batch of statements separated by `;`, draining every result.
    fn execute_batch(&self, sql: &str) -> Result<()>;

    /// Closes the connection, reporting any error from the driver.
    fn close(self) -> Result<()>
    where
        Self: Sized;
}

/// Driver for SQLite database files.
///
/// `server` names the directory holding the database files (or `:memory:`)
/// and `database` is the file name inside it. SQLite has no authentication,
/// so the username only takes part in the connection identifier and the
/// password is ignored.
#[derive(Debug, Clone)]
pub struct SqliteDriver {
    busy_timeout: Option<Duration>,
    create_if_missing: bool,
}

impl Default for SqliteDriver {
    fn default() -> Self {
        SqliteDriver {
            busy_timeout: None,
            create_if_missing: true,
        }
    }
}

impl SqliteDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// How long a statement waits on a locked database before failing.
    /// Without it, lock contention fails immediately.
    pub fn with_busy_timeout(mut self, timeout: Duration) -> Self {
        self.busy_timeout = Some(timeout);
        self
    }

    /// When false, opening a database file that does not exist fails.
    pub fn with_create_if_missing(mut self, create: bool) -> Self {
        self.create_if_missing = create;
        self
    }

    fn open(&self, params: &ConnectParams) -> rusqlite::Result<Connection> {
        if params.server == MEMORY_SERVER {
            return Connection::open_in_memory();
        }

        let path = Path::new(&params.server).join(&params.database);
        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if self.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }
        Connection::open_with_flags(path, flags)
    }

    fn prepare(&self, conn: &Connection) -> rusqlite::Result<()> {
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        // Values are delimited with double quotes; keep them string literals.
        conn.set_db_config(DbConfig::SQLITE_DBCONFIG_DQS_DML, true)?;
        if let Some(timeout) = self.busy_timeout {
            conn.busy_timeout(timeout)?;
        }
        Ok(())
    }
}

impl Driver for SqliteDriver {
    type Connection = SqliteConnection;

    fn connect(&self, params: &ConnectParams) -> Result<SqliteConnection> {
        let connection_id = params.connection_id();
        if !params.password.is_empty() {
            debug!(connection_id = %connection_id, "ignoring password, SQLite has no authentication");
        }

        let conn = self
            .open(params)
            .map_err(|e| MultiDbError::connect(&connection_id, e))?;
        self.prepare(&conn)
            .map_err(|e| MultiDbError::connect(&connection_id, e))?;

        Ok(SqliteConnection { conn })
    }
}

/// A live SQLite connection.
#[derive(Debug)]
pub struct SqliteConnection {
    conn: Connection,
}

impl SqliteConnection {
    /// Direct access to the driver handle.
    pub fn raw(&self) -> &Connection {
        &self.conn
    }
}

impl DbConnection for SqliteConnection {
    fn dialect(&self) -> &dyn Dialect {
        &SqliteDialect
    }

    fn query_assoc(&self, sql: &str) -> Result<Vec<Row>> {
        fetch_assoc(&self.conn, sql)
    }

    fn execute(&self, sql: &str) -> Result<()> {
        self.conn.execute(sql, [])?;
        Ok(())
    }

    fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    fn close(self) -> Result<()> {
        self.conn.close().map_err(|(_, e)| MultiDbError::Database(e))
    }
}
