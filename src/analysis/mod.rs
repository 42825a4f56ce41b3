//! Text analysis module for Parley.
//!
//! Tokenization, vocabulary construction and bag-of-words encoding. All three
//! share one normalization (lowercase, strip punctuation, split on
//! whitespace).

pub mod encoder;
pub mod token;
pub mod tokenizer;
pub mod vocabulary;

// Re-export commonly used types
pub use encoder::BagOfWordsEncoder;
pub use token::{Token, TokenStream};
pub use tokenizer::{NormalizingTokenizer, Tokenizer};
pub use vocabulary::Vocabulary;
