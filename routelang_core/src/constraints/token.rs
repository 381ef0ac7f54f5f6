//! Module providing the Token enum for lexing constraint clauses

/// Represents tokens in a constraint clause
#[derive(Debug, PartialEq, Clone)]
pub enum Token {
    /// Lowercased word, apostrophes kept ("can't")
    Word(String),
    Integer(u64),
    Decimal(f64),
    Comma,
    /// Any other punctuation
    Other(char),
}

impl Token {
    pub fn word(&self) -> Option<&str> {
        match self {
            Token::Word(w) => Some(w.as_str()),
            _ => None,
        }
    }

    pub fn integer(&self) -> Option<u64> {
        match self {
            Token::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer or decimal value
    pub fn number(&self) -> Option<f64> {
        match self {
            Token::Integer(i) => Some(*i as f64),
            Token::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    pub fn is_word_in(&self, words: &[&str]) -> bool {
        self.word().is_some_and(|w| words.contains(&w))
    }
}
