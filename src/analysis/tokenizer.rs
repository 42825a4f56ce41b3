//! Tokenizer shared by vocabulary building, encoding and relevance scoring.
//!
//! Every component that turns text into words goes through
//! [`NormalizingTokenizer`]. Vocabulary indices are positional, so the
//! encoder must see exactly the tokens the vocabulary builder saw: a second,
//! slightly different normalization would silently misalign vector slots.
//!
//! # Examples
//!
//! ```
//! use parley::analysis::tokenizer::{NormalizingTokenizer, Tokenizer};
//!
//! let tokenizer = NormalizingTokenizer::new();
//! let words: Vec<_> = tokenizer.tokenize("What's your RATE?").map(|t| t.text).collect();
//! assert_eq!(words, vec!["whats", "your", "rate"]);
//! ```

use std::sync::LazyLock;

use regex::Regex;

use crate::analysis::token::{Token, TokenStream};

/// Characters that are neither word characters nor whitespace.
static NON_WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s]").expect("non-word pattern should be valid"));

/// Trait for tokenizers that convert text into tokens.
///
/// Tokenization never fails: text without recognizable words simply yields
/// an empty stream.
pub trait Tokenizer: Send + Sync {
    /// Tokenize the given text into a stream of tokens.
    fn tokenize(&self, text: &str) -> TokenStream;

    /// Get the name of this tokenizer (for debugging and configuration).
    fn name(&self) -> &'static str;
}

/// Lowercases, strips punctuation and splits on whitespace.
#[derive(Clone, Debug, Default)]
pub struct NormalizingTokenizer;

impl NormalizingTokenizer {
    /// Create a new normalizing tokenizer.
    pub fn new() -> Self {
        NormalizingTokenizer
    }

    /// Lowercase the text and remove every non-word, non-space character.
    pub fn normalize(&self, text: &str) -> String {
        NON_WORD.replace_all(&text.to_lowercase(), "").into_owned()
    }

    /// Tokenize into plain strings.
    pub fn terms(&self, text: &str) -> Vec<String> {
        self.normalize(text)
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

impl Tokenizer for NormalizingTokenizer {
    fn tokenize(&self, text: &str) -> TokenStream {
        let tokens: Vec<Token> = self
            .terms(text)
            .into_iter()
            .enumerate()
            .map(|(position, term)| Token::new(term, position))
            .collect();

        Box::new(tokens.into_iter())
    }

    fn name(&self) -> &'static str {
        "normalizing"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalizing_tokenizer() {
        let tokenizer = NormalizingTokenizer::new();
        let tokens: Vec<Token> = tokenizer.tokenize("Hello,  World!").collect();

        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].text, "hello");
        assert_eq!(tokens[0].position, 0);
        assert_eq!(tokens[1].text, "world");
        assert_eq!(tokens[1].position, 1);
    }

    #[test]
    fn test_apostrophes_are_removed_not_split() {
        let tokenizer = NormalizingTokenizer::new();
        assert_eq!(tokenizer.terms("don't stop"), vec!["dont", "stop"]);
        assert_eq!(tokenizer.terms("e-commerce"), vec!["ecommerce"]);
    }

    #[test]
    fn test_empty_and_punctuation_only() {
        let tokenizer = NormalizingTokenizer::new();
        assert!(tokenizer.terms("").is_empty());
        assert!(tokenizer.terms("?!  ...").is_empty());
    }

    #[test]
    fn test_unicode_words_survive() {
        let tokenizer = NormalizingTokenizer::new();
        assert_eq!(tokenizer.terms("Kumusta Ka?"), vec!["kumusta", "ka"]);
        assert_eq!(tokenizer.terms("Café"), vec!["café"]);
    }

    #[test]
    fn test_tokenizer_name() {
        assert_eq!(NormalizingTokenizer::new().name(), "normalizing");
    }
}
