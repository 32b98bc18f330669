//! ClutchDB - A minimal relational data engine written in Rust
//!
//! This library provides the core components:
//! - SQL front end (lexer, parser, statement model, dispatch)
//! - Per-table locking with wait-for-free
//! - B+ tree indexed table storage over append-only files
//! - System catalog
//! - Statement handlers and the query dispatcher

pub mod catalog;
pub mod config;
pub mod error;
pub mod executor;
pub mod sql;
pub mod storage;
pub mod transaction;

pub use config::EngineConfig;
pub use error::{Error, Result};
pub use executor::{QueryDispatcher, QueryResult};
