//! Catalog module
//!
//! This module contains the system catalog and data types.

pub mod catalog;
pub mod types;

pub use catalog::{SystemCatalog, SYSTEM_USER_TABLES};
pub use types::DataType;
