//! SQL front end
//!
//! This module contains the lexer, parser, statement model and the leading
//! keyword dispatch that picks a parser entry point.

pub mod ast;
pub mod dispatch;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{
    ColumnDefinition, CreateTableStatement, DeleteStatement, InsertStatement, SelectStatement,
    Statement, TableConstraint, UpdateStatement, WhereClause,
};
pub use dispatch::{determine_statement, StatementKind};
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Token, TokenKind};
