// Core infrastructure modules
pub mod core;

// Feature-specific modules
pub mod config;
pub mod registry;

#[cfg(test)]
mod test_utils;

pub use crate::core::db::{ConnectParams, DbConnection, Driver, Row, SqliteDriver, UpdateSyntax, Value};
pub use crate::core::{MultiDbError, Result};
pub use crate::registry::{BroadcastReport, ConnectionOutcome, ConnectionRegistry};
