//! System Catalog for ClutchDB
//!
//! This module tracks the user tables that exist. The catalog is persisted as
//! the reserved table `System_UserTables`: one record per created table, the
//! table name followed by a newline.

use std::path::Path;
use std::sync::RwLock;

use indexmap::IndexSet;
use tracing::debug;

use crate::error::Result;

/// Name of the reserved catalog table
pub const SYSTEM_USER_TABLES: &str = "System_UserTables";

/// Record terminator in the catalog file
const RECORD_TERMINATOR: char = '\n';

/// System Catalog - the set of user tables, in creation order
#[derive(Debug, Default)]
pub struct SystemCatalog {
    tables: RwLock<IndexSet<String>>,
}

impl SystemCatalog {
    /// Create a new empty catalog
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the catalog persisted under `data_dir`; a missing file means no tables
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let path = data_dir.as_ref().join(SYSTEM_USER_TABLES);
        let contents = match std::fs::read_to_string(&path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e.into()),
        };

        let tables: IndexSet<String> = contents
            .split(RECORD_TERMINATOR)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect();
        debug!(count = tables.len(), "catalog loaded");

        Ok(Self {
            tables: RwLock::new(tables),
        })
    }

    /// Encode a catalog record for `table`
    pub fn record(table: &str) -> Vec<u8> {
        let mut bytes = table.as_bytes().to_vec();
        bytes.push(RECORD_TERMINATOR as u8);
        bytes
    }

    /// Check if a table exists; the catalog table itself always does
    pub fn contains(&self, name: &str) -> bool {
        name == SYSTEM_USER_TABLES
            || self
                .tables
                .read()
                .unwrap_or_else(|e| e.into_inner())
                .contains(name)
    }

    /// Record a new table in memory, returning false if it was already known
    pub fn register(&self, name: &str) -> bool {
        self.tables
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(name.to_string())
    }

    /// List all user table names in creation order
    pub fn list_tables(&self) -> Vec<String> {
        self.tables
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_register_and_contains() {
        let catalog = SystemCatalog::new();
        assert!(!catalog.contains("users"));

        assert!(catalog.register("users"));
        assert!(!catalog.register("users"));
        assert!(catalog.contains("users"));
        assert!(!catalog.contains("Users"));
    }

    #[test]
    fn test_reserved_name_always_exists() {
        let catalog = SystemCatalog::new();
        assert!(catalog.contains(SYSTEM_USER_TABLES));
        assert!(catalog.list_tables().is_empty());
    }

    #[test]
    fn test_open_reads_records() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join(SYSTEM_USER_TABLES), "Foo\nbar\n").unwrap();

        let catalog = SystemCatalog::open(dir.path()).unwrap();
        assert_eq!(catalog.list_tables(), vec!["Foo", "bar"]);
    }

    #[test]
    fn test_open_without_file() {
        let dir = tempdir().unwrap();
        let catalog = SystemCatalog::open(dir.path()).unwrap();
        assert!(catalog.list_tables().is_empty());
    }

    #[test]
    fn test_record_encoding() {
        assert_eq!(SystemCatalog::record("Foo"), b"Foo\n");
    }
}
