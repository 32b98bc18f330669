//! SQL Parser
//!
//! Recursive-descent parser over a lazily consumed token stream. Whitespace
//! tokens are dropped on every advance, so grammar code only ever sees
//! significant tokens.

use indexmap::IndexMap;

use super::ast::*;
use super::lexer::Lexer;
use super::token::{Token, TokenKind};
use crate::catalog::DataType;
use crate::error::{Error, Result};

/// SQL Parser
pub struct Parser {
    lexer: Lexer,
    current: Token,
}

impl Parser {
    /// Create a new parser from a SQL string
    pub fn new(sql: &str) -> Result<Self> {
        let mut lexer = Lexer::new(sql);
        let current = Self::next_significant(&mut lexer)?;

        Ok(Self { lexer, current })
    }

    /// Parse whichever statement the leading keyword introduces
    pub fn parse(&mut self) -> Result<Statement> {
        if self.check_keyword("INSERT") {
            self.parse_insert().map(Statement::Insert)
        } else if self.check_keyword("SELECT") {
            self.parse_select().map(Statement::Select)
        } else if self.check_keyword("UPDATE") {
            self.parse_update().map(Statement::Update)
        } else if self.check_keyword("DELETE") {
            self.parse_delete().map(Statement::Delete)
        } else if self.check_keyword("CREATE") {
            self.parse_create_table().map(Statement::CreateTable)
        } else {
            Err(self.unexpected("INSERT, SELECT, UPDATE, DELETE or CREATE"))
        }
    }

    // ========== CREATE TABLE Statement ==========

    pub fn parse_create_table(&mut self) -> Result<CreateTableStatement> {
        self.expect_keyword("CREATE")?;
        self.expect_keyword("TABLE")?;
        let table_name = self.expect_identifier()?;
        self.expect(TokenKind::OpenParen, None)?;

        let mut columns = Vec::new();
        let mut constraints = Vec::new();

        loop {
            if self.check_keyword("PRIMARY") {
                constraints.push(self.parse_primary_key()?);
            } else if self.check_keyword("CONSTRAINT") || self.check_keyword("FOREIGN") {
                constraints.push(self.parse_foreign_key()?);
            } else {
                let (column, inline_key) = self.parse_column_definition()?;
                columns.push(column);
                constraints.extend(inline_key);
            }

            if !self.match_token(TokenKind::Comma, None)? {
                break;
            }
        }

        self.expect(TokenKind::CloseParen, None)?;
        self.expect_end()?;

        Ok(CreateTableStatement {
            source_text: self.source_text(),
            table_name,
            columns,
            constraints,
        })
    }

    /// Parse `name TYPE [(size)] constraint*`. A `PRIMARY KEY (...)` column
    /// list written after the column comes back as a table constraint.
    fn parse_column_definition(&mut self) -> Result<(ColumnDefinition, Option<TableConstraint>)> {
        let name = self.expect_identifier()?;

        let type_token = self.expect(TokenKind::DataType, None)?;
        let data_type = DataType::from_keyword(&type_token.text).ok_or_else(|| {
            Error::UnexpectedToken {
                expected: TokenKind::DataType.to_string(),
                found: type_token.to_string(),
                position: type_token.position,
            }
        })?;

        let size = if self.match_token(TokenKind::OpenParen, None)? {
            let size_token = self.expect(TokenKind::Literal, None)?;
            let size = size_token
                .text
                .parse::<u32>()
                .map_err(|_| Error::UnexpectedToken {
                    expected: "column size".to_string(),
                    found: size_token.to_string(),
                    position: size_token.position,
                })?;
            self.expect(TokenKind::CloseParen, None)?;
            Some(size)
        } else {
            None
        };

        let mut constraints = Vec::new();
        let mut inline_key = None;

        loop {
            if self.match_keyword("NOT")? {
                self.expect_keyword("NULL")?;
                constraints.push("NOT NULL".to_string());
            } else if self.match_keyword("NULL")? {
                constraints.push("NULL".to_string());
            } else if self.match_keyword("UNIQUE")? {
                constraints.push("UNIQUE".to_string());
            } else if self.match_keyword("PRIMARY")? {
                self.expect_keyword("KEY")?;
                if self.match_token(TokenKind::OpenParen, None)? {
                    let columns = self.parse_identifier_list()?;
                    self.expect(TokenKind::CloseParen, None)?;
                    inline_key = Some(TableConstraint::PrimaryKey { columns });
                } else {
                    constraints.push("PRIMARY KEY".to_string());
                }
            } else {
                break;
            }
        }

        Ok((
            ColumnDefinition {
                name,
                data_type,
                size,
                constraints,
            },
            inline_key,
        ))
    }

    fn parse_primary_key(&mut self) -> Result<TableConstraint> {
        self.expect_keyword("PRIMARY")?;
        self.expect_keyword("KEY")?;
        self.expect(TokenKind::OpenParen, None)?;
        let columns = self.parse_identifier_list()?;
        self.expect(TokenKind::CloseParen, None)?;

        Ok(TableConstraint::PrimaryKey { columns })
    }

    fn parse_foreign_key(&mut self) -> Result<TableConstraint> {
        let constraint_name = if self.match_keyword("CONSTRAINT")? {
            Some(self.expect_identifier()?)
        } else {
            None
        };

        self.expect_keyword("FOREIGN")?;
        self.expect_keyword("KEY")?;
        self.expect(TokenKind::OpenParen, None)?;
        let column = self.expect_identifier()?;
        self.expect(TokenKind::CloseParen, None)?;

        self.expect_keyword("REFERENCES")?;
        let referenced_table = self.expect_identifier()?;
        self.expect(TokenKind::OpenParen, None)?;
        let referenced_column = self.expect_identifier()?;
        self.expect(TokenKind::CloseParen, None)?;

        Ok(TableConstraint::ForeignKey {
            constraint_name,
            column,
            referenced_table,
            referenced_column,
        })
    }

    // ========== INSERT Statement ==========

    pub fn parse_insert(&mut self) -> Result<InsertStatement> {
        self.expect_keyword("INSERT")?;
        self.expect_keyword("INTO")?;
        let table_name = self.expect_identifier()?;

        self.expect(TokenKind::OpenParen, None)?;
        let columns = self.parse_identifier_list()?;
        self.expect(TokenKind::CloseParen, None)?;

        if let Some(i) = (1..columns.len()).find(|&i| columns[..i].contains(&columns[i])) {
            return Err(Error::DuplicateColumn(columns[i].clone()));
        }

        self.expect_keyword("VALUES")?;

        self.expect(TokenKind::OpenParen, None)?;
        let mut values = vec![self.expect_literal()?];
        while self.match_token(TokenKind::Comma, None)? {
            values.push(self.expect_literal()?);
        }
        self.expect(TokenKind::CloseParen, None)?;
        self.expect_end()?;

        if columns.len() != values.len() {
            return Err(Error::ArgumentCountMismatch {
                columns: columns.len(),
                values: values.len(),
            });
        }

        Ok(InsertStatement {
            source_text: self.source_text(),
            table_name,
            columns,
            values,
        })
    }

    // ========== SELECT Statement ==========

    pub fn parse_select(&mut self) -> Result<SelectStatement> {
        self.expect_keyword("SELECT")?;
        let columns = self.parse_identifier_list()?;
        self.expect_keyword("FROM")?;
        let table_name = self.expect_identifier()?;
        let where_clause = self.parse_where_clause()?;
        self.expect_end()?;

        Ok(SelectStatement {
            source_text: self.source_text(),
            columns,
            table_name,
            where_clause,
        })
    }

    // ========== DELETE Statement ==========

    pub fn parse_delete(&mut self) -> Result<DeleteStatement> {
        self.expect_keyword("DELETE")?;
        self.expect_keyword("FROM")?;
        let table_name = self.expect_identifier()?;
        let where_clause = self.parse_where_clause()?;
        self.expect_end()?;

        Ok(DeleteStatement {
            source_text: self.source_text(),
            table_name,
            where_clause,
        })
    }

    // ========== UPDATE Statement ==========

    pub fn parse_update(&mut self) -> Result<UpdateStatement> {
        self.expect_keyword("UPDATE")?;
        let table_name = self.expect_identifier()?;
        self.expect_keyword("SET")?;

        let mut set_clauses = IndexMap::new();
        loop {
            let column = self.expect_identifier()?;
            self.expect(TokenKind::Operator, Some("="))?;
            let value = self.expect_literal()?;

            if set_clauses.contains_key(&column) {
                return Err(Error::DuplicateColumn(column));
            }
            set_clauses.insert(column, value);

            if !self.match_token(TokenKind::Comma, None)? {
                break;
            }
        }

        let where_clause = self.parse_where_clause()?;
        self.expect_end()?;

        Ok(UpdateStatement {
            source_text: self.source_text(),
            table_name,
            set_clauses,
            where_clause,
        })
    }

    // ========== Helper functions ==========

    fn parse_where_clause(&mut self) -> Result<Option<WhereClause>> {
        if !self.match_keyword("WHERE")? {
            return Ok(None);
        }

        let column = self.expect_identifier()?;
        let operator = self.expect(TokenKind::Operator, Some("="))?;
        let value = self.expect_literal()?;

        Ok(Some(WhereClause {
            column,
            operator: operator.text,
            value,
        }))
    }

    fn parse_identifier_list(&mut self) -> Result<Vec<String>> {
        let mut identifiers = vec![self.expect_identifier()?];

        while self.match_token(TokenKind::Comma, None)? {
            identifiers.push(self.expect_identifier()?);
        }

        Ok(identifiers)
    }

    /// Consume the current token if it matches, else fail naming both sides
    pub fn expect(&mut self, kind: TokenKind, text: Option<&str>) -> Result<Token> {
        if self.current.is(kind, text) {
            self.advance()
        } else {
            Err(self.unexpected(describe(kind, text)))
        }
    }

    /// Consume the current token if it matches and report whether it did
    pub fn match_token(&mut self, kind: TokenKind, text: Option<&str>) -> Result<bool> {
        if self.current.is(kind, text) {
            self.advance()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn match_keyword(&mut self, keyword: &str) -> Result<bool> {
        self.match_token(TokenKind::Keyword, Some(keyword))
    }

    fn check_keyword(&self, keyword: &str) -> bool {
        self.current.is_keyword(keyword)
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        self.expect(TokenKind::Keyword, Some(keyword)).map(|_| ())
    }

    fn expect_identifier(&mut self) -> Result<String> {
        self.expect(TokenKind::Identifier, None).map(|t| t.text)
    }

    fn expect_literal(&mut self) -> Result<String> {
        self.expect(TokenKind::Literal, None).map(|t| t.text)
    }

    fn expect_end(&mut self) -> Result<()> {
        self.expect(TokenKind::EndOfInput, None).map(|_| ())
    }

    fn unexpected(&self, expected: impl Into<String>) -> Error {
        Error::UnexpectedToken {
            expected: expected.into(),
            found: self.current.to_string(),
            position: self.current.position,
        }
    }

    fn source_text(&self) -> String {
        self.lexer.source().to_string()
    }

    /// Move to the next significant token, returning the one just consumed
    fn advance(&mut self) -> Result<Token> {
        let next = Self::next_significant(&mut self.lexer)?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn next_significant(lexer: &mut Lexer) -> Result<Token> {
        loop {
            let token = lexer.next_token()?;
            if token.kind != TokenKind::Whitespace {
                return Ok(token);
            }
        }
    }
}

fn describe(kind: TokenKind, text: Option<&str>) -> String {
    match text {
        Some(text) => format!("{} '{}'", kind, text),
        None => kind.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(sql: &str) -> Result<Statement> {
        Parser::new(sql)?.parse()
    }

    #[test]
    fn test_parse_select_with_where() {
        let stmt = parse("SELECT id, name FROM users WHERE id = '123'").unwrap();

        match stmt {
            Statement::Select(s) => {
                assert_eq!(s.columns, vec!["id", "name"]);
                assert_eq!(s.table_name, "users");
                assert_eq!(s.where_clause, Some(WhereClause::equals("id", "123")));
                assert_eq!(s.source_text, "SELECT id, name FROM users WHERE id = '123'");
            }
            _ => panic!("Expected SELECT statement"),
        }
    }

    #[test]
    fn test_parse_select_without_where() {
        let stmt = parse("select a from t;").unwrap();

        match stmt {
            Statement::Select(s) => {
                assert_eq!(s.columns, vec!["a"]);
                assert!(s.where_clause.is_none());
            }
            _ => panic!("Expected SELECT statement"),
        }
    }

    #[test]
    fn test_parse_create_table() {
        let stmt = parse(
            "CREATE TABLE users (
                id INT NOT NULL,
                name VARCHAR(100) UNIQUE,
                joined DATE,
                PRIMARY KEY (id, name)
            )",
        )
        .unwrap();

        match stmt {
            Statement::CreateTable(ct) => {
                assert_eq!(ct.table_name, "users");
                assert_eq!(ct.columns.len(), 3);
                assert_eq!(ct.columns[0].data_type, DataType::Int);
                assert_eq!(ct.columns[0].constraints, vec!["NOT NULL"]);
                assert_eq!(ct.columns[1].size, Some(100));
                assert_eq!(ct.columns[1].constraints, vec!["UNIQUE"]);
                assert!(ct.columns[2].constraints.is_empty());
                assert_eq!(
                    ct.constraints,
                    vec![TableConstraint::PrimaryKey {
                        columns: vec!["id".to_string(), "name".to_string()]
                    }]
                );
            }
            _ => panic!("Expected CREATE TABLE statement"),
        }
    }

    #[test]
    fn test_parse_create_table_inline_primary_key() {
        let stmt = parse("CREATE TABLE Foo (id INT PRIMARY KEY (id))").unwrap();

        match stmt {
            Statement::CreateTable(ct) => {
                assert_eq!(ct.table_name, "Foo");
                assert_eq!(ct.columns.len(), 1);
                assert_eq!(
                    ct.constraints,
                    vec![TableConstraint::PrimaryKey {
                        columns: vec!["id".to_string()]
                    }]
                );
            }
            _ => panic!("Expected CREATE TABLE statement"),
        }
    }

    #[test]
    fn test_parse_create_table_column_primary_key_word() {
        let stmt = parse("CREATE TABLE t (id INT PRIMARY KEY, v FLOAT)").unwrap();

        match stmt {
            Statement::CreateTable(ct) => {
                assert_eq!(ct.columns[0].constraints, vec!["PRIMARY KEY"]);
                assert!(ct.constraints.is_empty());
            }
            _ => panic!("Expected CREATE TABLE statement"),
        }
    }

    #[test]
    fn test_parse_create_table_foreign_keys() {
        let stmt = parse(
            "CREATE TABLE orders (id INT, user_id INT, \
             CONSTRAINT fk_user FOREIGN KEY (user_id) REFERENCES users (id), \
             FOREIGN KEY (id) REFERENCES items(item_id))",
        )
        .unwrap();

        match stmt {
            Statement::CreateTable(ct) => {
                assert_eq!(ct.columns.len(), 2);
                assert_eq!(
                    ct.constraints[0],
                    TableConstraint::ForeignKey {
                        constraint_name: Some("fk_user".to_string()),
                        column: "user_id".to_string(),
                        referenced_table: "users".to_string(),
                        referenced_column: "id".to_string(),
                    }
                );
                assert!(matches!(
                    &ct.constraints[1],
                    TableConstraint::ForeignKey { constraint_name: None, referenced_table, .. }
                        if referenced_table == "items"
                ));
            }
            _ => panic!("Expected CREATE TABLE statement"),
        }
    }

    #[test]
    fn test_parse_create_table_missing_type_fails() {
        let err = parse("CREATE TABLE t (id, name INT)").unwrap_err();

        match err {
            Error::UnexpectedToken {
                expected, found, ..
            } => {
                assert_eq!(expected, "data type");
                assert_eq!(found, "','");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_parse_insert() {
        let stmt = parse("INSERT INTO users (id, name) VALUES (1, 'Alice')").unwrap();

        match stmt {
            Statement::Insert(i) => {
                assert_eq!(i.table_name, "users");
                assert_eq!(i.columns, vec!["id", "name"]);
                assert_eq!(i.values, vec!["1", "Alice"]);
            }
            _ => panic!("Expected INSERT statement"),
        }
    }

    #[test]
    fn test_parse_insert_count_mismatch() {
        let err = parse("INSERT INTO users (id, name) VALUES (1)").unwrap_err();
        assert!(matches!(
            err,
            Error::ArgumentCountMismatch {
                columns: 2,
                values: 1
            }
        ));

        let err = parse("INSERT INTO users (id) VALUES (1, 2, 3)").unwrap_err();
        assert!(matches!(
            err,
            Error::ArgumentCountMismatch {
                columns: 1,
                values: 3
            }
        ));
    }

    #[test]
    fn test_parse_insert_duplicate_column() {
        let err = parse("INSERT INTO t (a, b, a) VALUES ('1', '2', '3')").unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn(c) if c == "a"));
    }

    #[test]
    fn test_insert_count_property() {
        for columns in 1..5 {
            for values in 1..5 {
                let cols: Vec<String> = (0..columns).map(|i| format!("c{i}")).collect();
                let vals: Vec<String> = (0..values).map(|i| format!("'{i}'")).collect();
                let sql = format!(
                    "INSERT INTO t ({}) VALUES ({})",
                    cols.join(", "),
                    vals.join(", ")
                );

                match parse(&sql) {
                    Ok(Statement::Insert(i)) => {
                        assert_eq!(columns, values);
                        assert_eq!(i.columns.len(), i.values.len());
                    }
                    Err(Error::ArgumentCountMismatch { .. }) => assert_ne!(columns, values),
                    other => panic!("unexpected result {other:?}"),
                }
            }
        }
    }

    #[test]
    fn test_parse_update() {
        let stmt = parse("UPDATE users SET name = 'Charlie', age = 30 WHERE id = 1").unwrap();

        match stmt {
            Statement::Update(u) => {
                assert_eq!(u.table_name, "users");
                let keys: Vec<&String> = u.set_clauses.keys().collect();
                assert_eq!(keys, vec!["name", "age"]);
                assert_eq!(u.set_clauses["age"], "30");
                assert_eq!(u.where_clause, Some(WhereClause::equals("id", "1")));
            }
            _ => panic!("Expected UPDATE statement"),
        }
    }

    #[test]
    fn test_parse_update_duplicate_column() {
        let err = parse("UPDATE users SET a = 1, a = 2").unwrap_err();
        assert!(matches!(err, Error::DuplicateColumn(c) if c == "a"));
    }

    #[test]
    fn test_parse_delete() {
        let stmt = parse("DELETE FROM users WHERE id = 1").unwrap();

        match stmt {
            Statement::Delete(d) => {
                assert_eq!(d.table_name, "users");
                assert!(d.where_clause.is_some());
            }
            _ => panic!("Expected DELETE statement"),
        }
    }

    #[test]
    fn test_trailing_tokens_rejected() {
        let err = parse("DELETE FROM users extra").unwrap_err();
        match err {
            Error::UnexpectedToken {
                expected, position, ..
            } => {
                assert_eq!(expected, "end of input");
                assert_eq!(position, 18);
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_expect_reports_expected_and_found() {
        let err = parse("SELECT a WHERE").unwrap_err();
        match err {
            Error::UnexpectedToken {
                expected, found, ..
            } => {
                assert_eq!(expected, "keyword 'FROM'");
                assert_eq!(found, "keyword 'WHERE'");
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_match_token_does_not_fail() {
        let mut parser = Parser::new("a , b").unwrap();
        assert!(!parser.match_token(TokenKind::Comma, None).unwrap());
        assert!(parser.match_token(TokenKind::Identifier, Some("a")).unwrap());
        assert!(parser.match_token(TokenKind::Comma, None).unwrap());
        assert_eq!(parser.expect(TokenKind::Identifier, None).unwrap().text, "b");
    }
}
