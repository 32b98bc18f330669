//! Statement type determination
//!
//! Sniffs the leading keyword of a query to pick the parser entry point. The
//! sniff works on an uppercased copy of the leading words only; the text handed
//! to the lexer is never modified, so literal contents keep their case.

use std::fmt;

use tracing::debug;

use super::ast::Statement;
use super::parser::Parser;
use crate::error::{Error, Result};

/// The statement shape announced by the leading keyword(s)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Insert,
    Select,
    Update,
    Delete,
    CreateTable,
}

impl StatementKind {
    /// Determine the statement kind from the leading keyword(s)
    pub fn sniff(sql: &str) -> Result<StatementKind> {
        let sql = sql.trim();
        if sql.is_empty() {
            return Err(Error::EmptyQuery);
        }

        let (first, rest) = leading_word(sql);
        let first = first.to_uppercase();

        match first.as_str() {
            "INSERT" => Ok(StatementKind::Insert),
            "SELECT" => Ok(StatementKind::Select),
            "UPDATE" => Ok(StatementKind::Update),
            "DELETE" => Ok(StatementKind::Delete),
            "CREATE" => {
                let (second, _) = leading_word(rest.trim_start());
                if second.eq_ignore_ascii_case("TABLE") {
                    Ok(StatementKind::CreateTable)
                } else {
                    Err(Error::UnsupportedStatementType(
                        format!("CREATE {}", second.to_uppercase())
                            .trim_end()
                            .to_string(),
                    ))
                }
            }
            _ if first.is_empty() => Err(Error::UnsupportedStatementType(
                sql.chars().take(1).collect(),
            )),
            _ => Err(Error::UnsupportedStatementType(first)),
        }
    }
}

impl fmt::Display for StatementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatementKind::Insert => write!(f, "INSERT"),
            StatementKind::Select => write!(f, "SELECT"),
            StatementKind::Update => write!(f, "UPDATE"),
            StatementKind::Delete => write!(f, "DELETE"),
            StatementKind::CreateTable => write!(f, "CREATE TABLE"),
        }
    }
}

/// Parse a query into a statement, using a fresh lexer and parser
pub fn determine_statement(sql: &str) -> Result<Statement> {
    let kind = StatementKind::sniff(sql)?;
    debug!(%kind, "parsing statement");

    let mut parser = Parser::new(sql)?;
    match kind {
        StatementKind::Insert => parser.parse_insert().map(Statement::Insert),
        StatementKind::Select => parser.parse_select().map(Statement::Select),
        StatementKind::Update => parser.parse_update().map(Statement::Update),
        StatementKind::Delete => parser.parse_delete().map(Statement::Delete),
        StatementKind::CreateTable => parser.parse_create_table().map(Statement::CreateTable),
    }
}

/// Split off the leading run of word characters
fn leading_word(s: &str) -> (&str, &str) {
    let end = s
        .char_indices()
        .find(|(_, c)| !(c.is_alphanumeric() || *c == '_'))
        .map_or(s.len(), |(i, _)| i);
    s.split_at(end)
}
