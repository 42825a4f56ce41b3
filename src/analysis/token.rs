//! Token types for text analysis.
//!
//! A [`Token`] is one normalized word produced by a
//! [`Tokenizer`](crate::analysis::tokenizer::Tokenizer). Tokens carry their
//! position so phrase matching (greetings, generic question starters) can
//! work on whole-token sequences instead of raw substrings.
//!
//! # Examples
//!
//! ```
//! use parley::analysis::token::Token;
//!
//! let token = Token::new("hello", 0);
//! assert_eq!(token.text, "hello");
//! assert_eq!(token.position, 0);
//! ```

use std::fmt;

use serde::{Deserialize, Serialize};

/// A single normalized word.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    /// The normalized text of the token.
    pub text: String,

    /// The position of the token in the stream (0-based).
    pub position: usize,
}

impl Token {
    /// Create a new token.
    pub fn new<S: Into<String>>(text: S, position: usize) -> Self {
        Token {
            text: text.into(),
            position,
        }
    }

    /// Length of the token text in characters.
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text)
    }
}

/// A stream of tokens, as returned by tokenizers.
pub type TokenStream = Box<dyn Iterator<Item = Token> + Send>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_creation() {
        let token = Token::new("résumé", 3);
        assert_eq!(token.text, "résumé");
        assert_eq!(token.position, 3);
        assert_eq!(token.char_len(), 6);
        assert_eq!(token.to_string(), "résumé");
    }
}
