//! SQL Lexer (Tokenizer)
//!
//! This module converts SQL strings into a lazy stream of tokens. Each lexer
//! owns one forward cursor over one input; it cannot be rewound.

use super::token::{Token, TokenKind};
use crate::error::{Error, Result};

/// SQL Lexer
pub struct Lexer {
    /// Original input, kept for provenance
    source: String,
    /// Input characters
    input: Vec<char>,
    /// Current position in input
    position: usize,
    /// Set once EndOfInput has been handed out
    finished: bool,
}

impl Lexer {
    /// Create a new lexer for the given input
    pub fn new(input: &str) -> Self {
        Self {
            source: input.to_string(),
            input: input.chars().collect(),
            position: 0,
            finished: false,
        }
    }

    /// The SQL text this lexer was created with
    pub fn source(&self) -> &str {
        &self.source
    }

    /// Tokenize the entire input, including Whitespace tokens and the final
    /// EndOfInput
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::EndOfInput;
            tokens.push(token);
            if done {
                break;
            }
        }

        Ok(tokens)
    }

    /// Get the next token from the input
    pub fn next_token(&mut self) -> Result<Token> {
        if self.is_at_end() {
            return Ok(Token::new(TokenKind::EndOfInput, "", self.position));
        }

        let start = self.position;
        let ch = self.current_char();

        if ch.is_alphabetic() {
            let word = self.read_while(|c| c.is_alphanumeric() || c == '_');
            return Ok(Token::classify_word(&word, start));
        }

        if ch.is_ascii_digit() {
            return Ok(self.read_number());
        }

        if ch.is_whitespace() {
            self.read_while(char::is_whitespace);
            return Ok(Token::new(TokenKind::Whitespace, " ", start));
        }

        let kind = match ch {
            '=' => TokenKind::Operator,
            ',' => TokenKind::Comma,
            '(' => TokenKind::OpenParen,
            ')' => TokenKind::CloseParen,
            ';' => {
                // Nothing after a semicolon is ever tokenized
                self.position = self.input.len();
                return Ok(Token::new(TokenKind::EndOfInput, ";", start));
            }
            '\'' => return self.read_string(),
            _ => return Err(Error::UnexpectedCharacter(ch, start)),
        };

        self.advance();
        Ok(Token::new(kind, ch.to_string(), start))
    }

    fn is_at_end(&self) -> bool {
        self.position >= self.input.len()
    }

    fn current_char(&self) -> char {
        self.input[self.position]
    }

    fn peek_char(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn read_while(&mut self, predicate: impl Fn(char) -> bool) -> String {
        let mut value = String::new();
        while !self.is_at_end() && predicate(self.current_char()) {
            value.push(self.current_char());
            self.advance();
        }
        value
    }

    /// Read a numeric literal; one decimal point is allowed when digits follow
    fn read_number(&mut self) -> Token {
        let start = self.position;
        let mut value = self.read_while(|c| c.is_ascii_digit());

        if !self.is_at_end()
            && self.current_char() == '.'
            && self.peek_char().is_some_and(|c| c.is_ascii_digit())
        {
            self.advance();
            value.push('.');
            value.push_str(&self.read_while(|c| c.is_ascii_digit()));
        }

        Token::new(TokenKind::Literal, value, start)
    }

    /// Read a string literal (single-quoted)
    fn read_string(&mut self) -> Result<Token> {
        let start = self.position;
        self.advance(); // skip opening quote

        let mut value = String::new();

        while !self.is_at_end() {
            let ch = self.current_char();

            if ch == '\'' {
                // Check for escaped quote ''
                if self.peek_char() == Some('\'') {
                    value.push('\'');
                    self.advance();
                    self.advance();
                } else {
                    self.advance(); // skip closing quote
                    return Ok(Token::new(TokenKind::Literal, value, start));
                }
            } else {
                value.push(ch);
                self.advance();
            }
        }

        Err(Error::UnterminatedString(start))
    }
}

impl Iterator for Lexer {
    type Item = Result<Token>;

    /// Yields tokens up to and including EndOfInput, or up to the first error
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let token = self.next_token();
        match &token {
            Ok(t) if t.kind == TokenKind::EndOfInput => self.finished = true,
            Err(_) => self.finished = true,
            Ok(_) => {}
        }
        Some(token)
    }
}
