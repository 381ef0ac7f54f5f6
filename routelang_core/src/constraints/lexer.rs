//! Lex a constraint clause into a series of tokens for pattern matching
use thiserror::Error;

use crate::constraints::token::Token;

pub struct Lexer {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Lexer {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
        }
    }

    pub fn scan_tokens(mut self) -> Result<Vec<Token>, LexerError> {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token()?;
        }
        Ok(self.tokens)
    }

    fn scan_token(&mut self) -> Result<(), LexerError> {
        let c = self.advance();
        match c {
            ',' => self.add_token(Token::Comma),
            c if c.is_alphabetic() => self.read_word(),
            '0'..='9' => self.read_number()?,
            c if c.is_whitespace() => {}
            c => self.add_token(Token::Other(c)),
        };
        Ok(())
    }

    fn advance(&mut self) -> char {
        let char_at_current = self.source[self.current];
        self.current += 1;
        char_at_current
    }

    fn read_word(&mut self) {
        loop {
            let c = self.peek();
            if c.is_alphabetic() {
                self.advance();
            } else if Lexer::is_apostrophe(c) && self.peek_next().is_alphabetic() {
                self.advance();
            } else {
                break;
            }
        }
        let text: String = self.source[self.start..self.current]
            .iter()
            .map(|&c| if Lexer::is_apostrophe(c) { '\'' } else { c })
            .collect();
        self.add_token(Token::Word(text.to_lowercase()));
    }

    fn read_number(&mut self) -> Result<(), LexerError> {
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        let mut decimal = false;
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            decimal = true;
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }
        let text: String = self.source[self.start..self.current].iter().collect();
        let token = if decimal {
            Token::Decimal(
                text.parse()
                    .map_err(|_| LexerError::InvalidNumber(text.clone()))?,
            )
        } else {
            // Only digits were read, so the parse fails on overflow alone
            Token::Integer(text.parse().unwrap_or(u64::MAX))
        };
        self.add_token(token);
        Ok(())
    }

    fn is_apostrophe(c: char) -> bool {
        matches!(c, '\'' | '\u{2019}')
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            return '\0';
        }
        self.source[self.current]
    }

    fn peek_next(&self) -> char {
        if self.current + 1 >= self.source.len() {
            return '\0';
        }
        self.source[self.current + 1]
    }

    fn add_token(&mut self, token: Token) {
        self.tokens.push(token);
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

/// Tokenize a clause
pub fn tokenize(source: &str) -> Result<Vec<Token>, LexerError> {
    Lexer::new(source).scan_tokens()
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LexerError {
    #[error("Number can't be represented: {0}")]
    InvalidNumber(String),
}
