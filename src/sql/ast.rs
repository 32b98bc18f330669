//! SQL Abstract Syntax Tree (AST)
//!
//! This module defines the statements produced by the parser. Every statement
//! keeps the SQL text it was parsed from.

use std::fmt;

use indexmap::IndexMap;
use serde::Serialize;

use crate::catalog::DataType;

/// A SQL statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum Statement {
    /// INSERT statement
    Insert(InsertStatement),
    /// SELECT statement
    Select(SelectStatement),
    /// DELETE statement
    Delete(DeleteStatement),
    /// UPDATE statement
    Update(UpdateStatement),
    /// CREATE TABLE statement
    CreateTable(CreateTableStatement),
}

impl Statement {
    /// Name of the table the statement targets
    pub fn table_name(&self) -> &str {
        match self {
            Statement::Insert(s) => &s.table_name,
            Statement::Select(s) => &s.table_name,
            Statement::Delete(s) => &s.table_name,
            Statement::Update(s) => &s.table_name,
            Statement::CreateTable(s) => &s.table_name,
        }
    }

    /// The SQL text the statement was parsed from
    pub fn source_text(&self) -> &str {
        match self {
            Statement::Insert(s) => &s.source_text,
            Statement::Select(s) => &s.source_text,
            Statement::Delete(s) => &s.source_text,
            Statement::Update(s) => &s.source_text,
            Statement::CreateTable(s) => &s.source_text,
        }
    }

    /// Human readable variant name
    pub fn kind_name(&self) -> &'static str {
        match self {
            Statement::Insert(_) => "Insert",
            Statement::Select(_) => "Select",
            Statement::Delete(_) => "Delete",
            Statement::Update(_) => "Update",
            Statement::CreateTable(_) => "Create table",
        }
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Statement::Insert(s) => s.fmt(f),
            Statement::Select(s) => s.fmt(f),
            Statement::Delete(s) => s.fmt(f),
            Statement::Update(s) => s.fmt(f),
            Statement::CreateTable(s) => s.fmt(f),
        }
    }
}

/// Single equality predicate: `column = value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WhereClause {
    pub column: String,
    pub operator: String,
    pub value: String,
}

impl WhereClause {
    pub fn equals(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            column: column.into(),
            operator: "=".to_string(),
            value: value.into(),
        }
    }
}

impl fmt::Display for WhereClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} '{}'", self.column, self.operator, escape(&self.value))
    }
}

/// INSERT statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InsertStatement {
    pub source_text: String,
    pub table_name: String,
    /// Target columns, parallel to `values`
    pub columns: Vec<String>,
    pub values: Vec<String>,
}

impl fmt::Display for InsertStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let values: Vec<String> = self
            .values
            .iter()
            .map(|v| format!("'{}'", escape(v)))
            .collect();
        write!(
            f,
            "INSERT INTO {} ({}) VALUES ({});",
            self.table_name,
            self.columns.join(", "),
            values.join(", ")
        )
    }
}

/// SELECT statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectStatement {
    pub source_text: String,
    /// Projected columns
    pub columns: Vec<String>,
    pub table_name: String,
    pub where_clause: Option<WhereClause>,
}

impl fmt::Display for SelectStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SELECT {} FROM {}",
            self.columns.join(", "),
            self.table_name
        )?;
        write_where(f, &self.where_clause)?;
        write!(f, ";")
    }
}

/// DELETE statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeleteStatement {
    pub source_text: String,
    pub table_name: String,
    pub where_clause: Option<WhereClause>,
}

impl fmt::Display for DeleteStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DELETE FROM {}", self.table_name)?;
        write_where(f, &self.where_clause)?;
        write!(f, ";")
    }
}

/// UPDATE statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UpdateStatement {
    pub source_text: String,
    pub table_name: String,
    /// Column assignments in the order they were written
    pub set_clauses: IndexMap<String, String>,
    pub where_clause: Option<WhereClause>,
}

impl fmt::Display for UpdateStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let assignments: Vec<String> = self
            .set_clauses
            .iter()
            .map(|(c, v)| format!("{} = '{}'", c, escape(v)))
            .collect();
        write!(
            f,
            "UPDATE {} SET {}",
            self.table_name,
            assignments.join(", ")
        )?;
        write_where(f, &self.where_clause)?;
        write!(f, ";")
    }
}

/// CREATE TABLE statement
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CreateTableStatement {
    pub source_text: String,
    pub table_name: String,
    pub columns: Vec<ColumnDefinition>,
    pub constraints: Vec<TableConstraint>,
}

impl fmt::Display for CreateTableStatement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let elements: Vec<String> = self
            .columns
            .iter()
            .map(|c| c.to_string())
            .chain(self.constraints.iter().map(|c| c.to_string()))
            .collect();
        write!(
            f,
            "CREATE TABLE {} ({});",
            self.table_name,
            elements.join(", ")
        )
    }
}

/// Column definition
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnDefinition {
    pub name: String,
    pub data_type: DataType,
    /// Size argument, e.g. 255 in VARCHAR(255)
    pub size: Option<u32>,
    /// Normalized constraint words such as "NOT NULL" or "UNIQUE"
    pub constraints: Vec<String>,
}

impl fmt::Display for ColumnDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.data_type)?;
        if let Some(size) = self.size {
            write!(f, "({})", size)?;
        }
        for constraint in &self.constraints {
            write!(f, " {}", constraint)?;
        }
        Ok(())
    }
}

/// Table-level constraint
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum TableConstraint {
    PrimaryKey {
        columns: Vec<String>,
    },
    ForeignKey {
        constraint_name: Option<String>,
        column: String,
        referenced_table: String,
        referenced_column: String,
    },
}

impl fmt::Display for TableConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TableConstraint::PrimaryKey { columns } => {
                write!(f, "PRIMARY KEY ({})", columns.join(", "))
            }
            TableConstraint::ForeignKey {
                constraint_name,
                column,
                referenced_table,
                referenced_column,
            } => {
                if let Some(name) = constraint_name {
                    write!(f, "CONSTRAINT {} ", name)?;
                }
                write!(
                    f,
                    "FOREIGN KEY ({}) REFERENCES {}({})",
                    column, referenced_table, referenced_column
                )
            }
        }
    }
}

fn write_where(f: &mut fmt::Formatter<'_>, where_clause: &Option<WhereClause>) -> fmt::Result {
    match where_clause {
        Some(w) => write!(f, " WHERE {}", w),
        None => Ok(()),
    }
}

fn escape(value: &str) -> String {
    value.replace('\'', "''")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_table_display() {
        let stmt = CreateTableStatement {
            source_text: String::new(),
            table_name: "orders".to_string(),
            columns: vec![ColumnDefinition {
                name: "note".to_string(),
                data_type: DataType::Varchar,
                size: Some(40),
                constraints: vec!["NOT NULL".to_string()],
            }],
            constraints: vec![
                TableConstraint::PrimaryKey {
                    columns: vec!["id".to_string(), "line".to_string()],
                },
                TableConstraint::ForeignKey {
                    constraint_name: Some("fk_user".to_string()),
                    column: "user_id".to_string(),
                    referenced_table: "users".to_string(),
                    referenced_column: "id".to_string(),
                },
            ],
        };

        assert_eq!(
            stmt.to_string(),
            "CREATE TABLE orders (note VARCHAR(40) NOT NULL, PRIMARY KEY (id, line), \
             CONSTRAINT fk_user FOREIGN KEY (user_id) REFERENCES users(id));"
        );
    }

    #[test]
    fn test_update_display_keeps_assignment_order() {
        let mut set_clauses = IndexMap::new();
        set_clauses.insert("name".to_string(), "O'Brien".to_string());
        set_clauses.insert("age".to_string(), "30".to_string());

        let stmt = Statement::Update(UpdateStatement {
            source_text: String::new(),
            table_name: "users".to_string(),
            set_clauses,
            where_clause: Some(WhereClause::equals("id", "1")),
        });

        assert_eq!(
            stmt.to_string(),
            "UPDATE users SET name = 'O''Brien', age = '30' WHERE id = '1';"
        );
        assert_eq!(stmt.table_name(), "users");
        assert_eq!(stmt.kind_name(), "Update");
    }
}
