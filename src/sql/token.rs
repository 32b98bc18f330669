//! SQL Token definitions
//!
//! This module defines the token kinds produced by the lexer and the reserved
//! word tables used to classify words.

use std::fmt;

/// Words classified as `Keyword`
pub const KEYWORDS: &[&str] = &[
    "SELECT",
    "FROM",
    "WHERE",
    "INSERT",
    "INTO",
    "VALUES",
    "UPDATE",
    "DELETE",
    "SET",
    "CREATE",
    "TABLE",
    "PRIMARY",
    "KEY",
    "NOT",
    "NULL",
    "UNIQUE",
    "CONSTRAINT",
    "FOREIGN",
    "REFERENCES",
];

/// Words classified as `DataType`
pub const DATA_TYPES: &[&str] = &["DATE", "BOOLEAN", "FLOAT", "VARCHAR", "INT", "DECIMAL"];

/// Token classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Keyword,
    Identifier,
    Operator,
    Literal,
    Comma,
    Whitespace,
    OpenParen,
    CloseParen,
    DataType,
    EndOfInput,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TokenKind::Keyword => "keyword",
            TokenKind::Identifier => "identifier",
            TokenKind::Operator => "operator",
            TokenKind::Literal => "literal",
            TokenKind::Comma => "','",
            TokenKind::Whitespace => "whitespace",
            TokenKind::OpenParen => "'('",
            TokenKind::CloseParen => "')'",
            TokenKind::DataType => "data type",
            TokenKind::EndOfInput => "end of input",
        };
        f.write_str(name)
    }
}

/// A classified piece of SQL text
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Normalized text: uppercase for keywords and data types, unescaped
    /// interior for quoted literals
    pub text: String,
    /// Character offset of the first character of the token
    pub position: usize,
}

impl Token {
    pub fn new(kind: TokenKind, text: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            text: text.into(),
            position,
        }
    }

    /// Check kind and, when given, the exact text
    pub fn is(&self, kind: TokenKind, text: Option<&str>) -> bool {
        self.kind == kind && text.map_or(true, |t| self.text == t)
    }

    /// Check for a specific keyword
    pub fn is_keyword(&self, keyword: &str) -> bool {
        self.is(TokenKind::Keyword, Some(keyword))
    }

    /// Classify a word as keyword, data type or identifier
    pub fn classify_word(word: &str, position: usize) -> Token {
        let upper = word.to_uppercase();
        if KEYWORDS.contains(&upper.as_str()) {
            Token::new(TokenKind::Keyword, upper, position)
        } else if DATA_TYPES.contains(&upper.as_str()) {
            Token::new(TokenKind::DataType, upper, position)
        } else {
            Token::new(TokenKind::Identifier, word, position)
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::EndOfInput => write!(f, "end of input"),
            TokenKind::Whitespace => write!(f, "whitespace"),
            TokenKind::Comma | TokenKind::OpenParen | TokenKind::CloseParen => {
                write!(f, "{}", self.kind)
            }
            kind => write!(f, "{} '{}'", kind, self.text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keyword_classification() {
        assert_eq!(Token::classify_word("select", 0).kind, TokenKind::Keyword);
        assert_eq!(Token::classify_word("SeLeCt", 0).text, "SELECT");
        assert_eq!(Token::classify_word("varchar", 3).kind, TokenKind::DataType);
        assert_eq!(Token::classify_word("varchar", 3).text, "VARCHAR");

        let ident = Token::classify_word("Users", 7);
        assert_eq!(ident.kind, TokenKind::Identifier);
        assert_eq!(ident.text, "Users");
        assert_eq!(ident.position, 7);
    }

    #[test]
    fn test_token_display() {
        let token = Token::new(TokenKind::Keyword, "FROM", 0);
        assert_eq!(token.to_string(), "keyword 'FROM'");
        assert_eq!(
            Token::new(TokenKind::EndOfInput, "", 4).to_string(),
            "end of input"
        );
    }
}
