//! Ordered vocabulary built from intent patterns.

use ahash::AHashMap;
use serde::{Deserialize, Serialize};

use crate::analysis::tokenizer::NormalizingTokenizer;
use crate::intent::IntentRecord;

/// An ordered, deduplicated list of tokens.
///
/// The position of a term is the index of its slot in every encoded vector,
/// so the order must not change between training and inference. Terms are
/// kept in first-seen order over intents, then patterns.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    terms: Vec<String>,
    index: AHashMap<String, usize>,
}

impl Vocabulary {
    /// Build the vocabulary from every pattern of every intent.
    pub fn build(intents: &[IntentRecord]) -> Self {
        let tokenizer = NormalizingTokenizer::new();
        let mut vocabulary = Vocabulary::default();

        for intent in intents {
            for pattern in &intent.patterns {
                for term in tokenizer.terms(pattern) {
                    vocabulary.insert(term);
                }
            }
        }

        vocabulary
    }

    fn insert(&mut self, term: String) {
        if !self.index.contains_key(&term) {
            self.index.insert(term.clone(), self.terms.len());
            self.terms.push(term);
        }
    }

    /// Slot index of a term.
    pub fn index_of(&self, term: &str) -> Option<usize> {
        self.index.get(term).copied()
    }

    /// Whether the term has a slot.
    pub fn contains(&self, term: &str) -> bool {
        self.index.contains_key(term)
    }

    /// Terms in slot order.
    pub fn terms(&self) -> &[String] {
        &self.terms
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }
}

impl From<Vec<String>> for Vocabulary {
    fn from(terms: Vec<String>) -> Self {
        let mut vocabulary = Vocabulary::default();
        for term in terms {
            vocabulary.insert(term);
        }
        vocabulary
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocabulary: Vocabulary) -> Self {
        vocabulary.terms
    }
}

impl PartialEq for Vocabulary {
    fn eq(&self, other: &Self) -> bool {
        self.terms == other.terms
    }
}
