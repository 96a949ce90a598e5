/// Database Module
///
/// The database layer is split into three concerns:
/// - **Connections** (`connection.rs`): the driver boundary and the SQLite driver
/// - **Queries** (`query.rs`): cell values and associative result rows
/// - **Statements** (`statement.rs`): dialect escaping and the INSERT/UPDATE/COUNT builders
///
/// ## Error Handling
///
/// All database operations use the standardized `MultiDbError` type.
pub mod connection;
pub mod query;
pub mod statement;

pub use connection::*;
pub use query::*;
pub use statement::*;
