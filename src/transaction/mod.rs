//! Concurrency control module
//!
//! This module contains the table lock manager.

pub mod lock_manager;

pub use lock_manager::{LockManager, TableLockGuard};
