/// # Test Utilities Module
///
/// Fixtures for registry tests: registries backed by real SQLite files in a
/// temporary directory, plus a few assertion helpers.

use crate::core::db::{ConnectParams, SqliteDriver};
use crate::core::Result;
use crate::registry::ConnectionRegistry;
use tempfile::TempDir;

/// Schema shared by every database in a fixture.
pub const PEOPLE_SCHEMA: &str = "
    CREATE TABLE people (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL,
        age INTEGER
    );
";

/// A registry over several on-disk databases living in one temporary directory.
pub struct RegistryFixture {
    pub dir: TempDir,
    pub registry: ConnectionRegistry<SqliteDriver>,
    pub ids: Vec<String>,
}

impl RegistryFixture {
    /// Registers one database file per name, in order.
    pub fn new(databases: &[&str]) -> Result<Self> {
        let dir = TempDir::new()?;
        let mut registry = ConnectionRegistry::new(SqliteDriver::new());
        let mut ids = Vec::new();
        for database in databases {
            ids.push(registry.add_connection(&Self::params_in(&dir, database), false)?);
        }
        Ok(RegistryFixture { dir, registry, ids })
    }

    /// Same as `new`, with the people table created on every database.
    pub fn with_people(databases: &[&str]) -> Result<Self> {
        let fixture = Self::new(databases)?;
        fixture.registry.execute(PEOPLE_SCHEMA).into_result()?;
        Ok(fixture)
    }

    pub fn params(&self, database: &str) -> ConnectParams {
        Self::params_in(&self.dir, database)
    }

    fn params_in(dir: &TempDir, database: &str) -> ConnectParams {
        ConnectParams::new("tester", "", dir.path().to_string_lossy(), database)
    }
}

/// Error testing utilities
pub mod error_testing {
    /// Asserts that `result` failed with a message containing `fragment`.
    pub fn assert_error_contains<T, E>(result: &std::result::Result<T, E>, fragment: &str, context: &str)
    where
        E: std::fmt::Display,
    {
        match result {
            Ok(_) => panic!("Expected error but got Ok in {}", context),
            Err(e) => {
                let message = e.to_string();
                assert!(
                    message.to_lowercase().contains(&fragment.to_lowercase()),
                    "Expected '{}' in error message '{}', context: {}",
                    fragment,
                    message,
                    context
                );
            }
        }
    }
}

#[macro_export]
macro_rules! assert_multidb_error {
    ($result:expr, $expected:pat, $context:expr) => {
        match $result {
            Err($expected) => {}
            Ok(_) => panic!("Expected {} but got Ok in {}", stringify!($expected), $context),
            Err(other) => panic!("Expected {} but got {:?} in {}", stringify!($expected), other, $context),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::MultiDbError;

    #[test]
    fn test_fixture_registers_in_order() {
        let fixture = RegistryFixture::new(&["a.db", "b.db"]).unwrap();
        assert_eq!(fixture.registry.len(), 2);
        assert_eq!(fixture.registry.primary(), Some(fixture.ids[1].as_str()));
        assert!(fixture.dir.path().join("a.db").exists());
    }

    #[test]
    fn test_people_fixture() {
        let fixture = RegistryFixture::with_people(&["a.db"]).unwrap();
        assert_eq!(fixture.registry.count("people", None).unwrap(), 0);
    }

    #[test]
    fn test_error_assertion_macro() {
        let result: Result<()> = Err(MultiDbError::NoPrimary);
        assert_multidb_error!(&result, MultiDbError::NoPrimary, "macro test");
        error_testing::assert_error_contains(&result, "primary", "helper test");
    }
}
