//! Storage engine module
//!
//! This module contains the storage engine components:
//! - B+ tree index
//! - Table row logs
//! - Durable byte sink

pub mod btree;
pub mod table;
pub mod writer;

pub use btree::BPlusTree;
pub use table::{Row, RowId, RowRecord, TableStore};
pub use writer::{BinaryWriter, DiskWriter};
