/// Core Module for MultiDb
///
/// Shared infrastructure for the connection registry: the driver boundary,
/// result materialization, statement building and the error type.

pub mod db;
pub mod error;

// Re-export commonly used types for convenience
pub use error::{MultiDbError, Result};
