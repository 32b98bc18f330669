//! Table storage for ClutchDB
//!
//! A table is an append-only row log on disk plus an in-memory B+ tree of the
//! live rows keyed by row id. The log holds one JSON record per line; replaying
//! it from the start rebuilds the index.

use std::io::{BufRead, BufReader};
use std::path::Path;

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::btree::BPlusTree;
use crate::error::{Error, Result};
use crate::sql::WhereClause;

/// Row identifier, assigned in insertion order
pub type RowId = u64;

/// Column name -> value, in the order the columns were written
pub type Row = IndexMap<String, String>;

/// One entry of a table's row log
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum RowRecord {
    Insert { row_id: RowId, values: Row },
    /// Full replacement of the row's values
    Update { row_id: RowId, values: Row },
    Delete { row_id: RowId },
}

impl RowRecord {
    /// Serialize as a single log line, newline included
    pub fn encode(&self) -> Result<Vec<u8>> {
        let mut bytes = serde_json::to_vec(self)?;
        bytes.push(b'\n');
        Ok(bytes)
    }

    pub fn row_id(&self) -> RowId {
        match self {
            RowRecord::Insert { row_id, .. }
            | RowRecord::Update { row_id, .. }
            | RowRecord::Delete { row_id } => *row_id,
        }
    }
}

/// The live rows of one table
#[derive(Debug)]
pub struct TableStore {
    name: String,
    rows: BPlusTree<RowId, Row>,
    next_row_id: RowId,
}

impl TableStore {
    /// Create an empty table store
    pub fn new(name: impl Into<String>, order: usize) -> Result<Self> {
        Ok(Self {
            name: name.into(),
            rows: BPlusTree::new(order)?,
            next_row_id: 1,
        })
    }

    /// Rebuild a table by replaying its row log under `data_dir`
    pub fn load(name: &str, data_dir: impl AsRef<Path>, order: usize) -> Result<Self> {
        let mut store = Self::new(name, order)?;
        let path = data_dir.as_ref().join(name);

        let file = match std::fs::File::open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(store),
            Err(e) => return Err(e.into()),
        };

        for (i, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let record: RowRecord =
                serde_json::from_str(&line).map_err(|_| Error::CorruptedRecord {
                    table: name.to_string(),
                    line: i + 1,
                })?;
            store.apply(record);
        }

        debug!(table = name, rows = store.len(), "table loaded");
        Ok(store)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Reserve the id for the next inserted row
    pub fn allocate_row_id(&mut self) -> RowId {
        let id = self.next_row_id;
        self.next_row_id += 1;
        id
    }

    /// Apply a log record to the in-memory index
    pub fn apply(&mut self, record: RowRecord) {
        self.next_row_id = self.next_row_id.max(record.row_id().saturating_add(1));
        match record {
            RowRecord::Insert { row_id, values } | RowRecord::Update { row_id, values } => {
                self.rows.insert(row_id, values);
            }
            RowRecord::Delete { row_id } => {
                self.rows.delete(&row_id);
            }
        }
    }

    pub fn get(&self, row_id: RowId) -> Option<&Row> {
        self.rows.find(&row_id)
    }

    /// All live rows in row id order
    pub fn scan(&self) -> impl Iterator<Item = (RowId, &Row)> + '_ {
        self.rows.iter().map(|(id, row)| (*id, row))
    }

    /// Rows satisfying the predicate; every row when there is none
    pub fn matching<'a>(
        &'a self,
        predicate: Option<&'a WhereClause>,
    ) -> impl Iterator<Item = (RowId, &'a Row)> + 'a {
        self.scan()
            .filter(move |(_, row)| predicate.map_or(true, |p| row_matches(row, p)))
    }

    /// Whether any live row has a value for `column`
    pub fn has_column(&self, column: &str) -> bool {
        self.scan().any(|(_, row)| row.contains_key(column))
    }
}

/// Equality on the stored text; a missing column never matches
fn row_matches(row: &Row, predicate: &WhereClause) -> bool {
    row.get(&predicate.column)
        .map_or(false, |value| *value == predicate.value)
}
