//! Query execution module
//!
//! This module contains the query dispatcher and the statement handlers.

pub mod dispatcher;
pub mod handlers;

pub use dispatcher::QueryDispatcher;
pub use handlers::{ExecutionContext, QueryResult, StatementHandler};
