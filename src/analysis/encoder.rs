//! Bag-of-words encoding against a [`Vocabulary`].

use crate::analysis::tokenizer::NormalizingTokenizer;
use crate::analysis::vocabulary::Vocabulary;

/// Binary presence encoder.
///
/// Each slot is `1.0` when the vocabulary term occurs anywhere in the text
/// and `0.0` otherwise. Word order and repetition are discarded and unknown
/// words have no slot.
#[derive(Clone, Debug, Default)]
pub struct BagOfWordsEncoder {
    tokenizer: NormalizingTokenizer,
}

impl BagOfWordsEncoder {
    pub fn new() -> Self {
        Self {
            tokenizer: NormalizingTokenizer::new(),
        }
    }

    /// Encode text into a vector of length `vocabulary.len()`.
    pub fn encode(&self, text: &str, vocabulary: &Vocabulary) -> Vec<f32> {
        let mut bag = vec![0.0; vocabulary.len()];
        for term in self.tokenizer.terms(text) {
            if let Some(idx) = vocabulary.index_of(&term) {
                bag[idx] = 1.0;
            }
        }
        bag
    }
}
