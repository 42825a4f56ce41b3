//! Profanity and personal-question filter.
//!
//! Runs before any relevance scoring, inference or caching. A rejected
//! input never reaches the model; the caller renders its own refusal.

use std::fmt;

use ahash::AHashSet;
use serde::{Deserialize, Serialize};

use crate::analysis::tokenizer::NormalizingTokenizer;
use crate::lexicon::Lexicon;

/// Why an input was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SafetyKind {
    Profanity,
    Personal,
    None,
}

impl fmt::Display for SafetyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SafetyKind::Profanity => "profanity",
            SafetyKind::Personal => "personal",
            SafetyKind::None => "none",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetyVerdict {
    pub is_inappropriate: bool,
    pub kind: SafetyKind,
}

impl SafetyVerdict {
    pub fn clean() -> Self {
        Self {
            is_inappropriate: false,
            kind: SafetyKind::None,
        }
    }

    fn rejected(kind: SafetyKind) -> Self {
        Self {
            is_inappropriate: true,
            kind,
        }
    }
}

/// Whole-word profanity and personal-word checks plus substring
/// personal-question checks.
#[derive(Debug, Clone)]
pub struct ContentFilter {
    tokenizer: NormalizingTokenizer,
    profanity: AHashSet<String>,
    personal_words: AHashSet<String>,
    personal_phrases: Vec<String>,
}

impl ContentFilter {
    pub fn new(lexicon: &Lexicon) -> Self {
        let tokenizer = NormalizingTokenizer::new();
        Self {
            profanity: lexicon.profanity.iter().map(|w| w.to_lowercase()).collect(),
            personal_words: lexicon
                .personal_words
                .iter()
                .map(|w| w.to_lowercase())
                .collect(),
            personal_phrases: lexicon
                .personal_phrases
                .iter()
                .map(|p| tokenizer.normalize(p))
                .filter(|p| !p.trim().is_empty())
                .collect(),
            tokenizer,
        }
    }

    /// Classify `text`. Profanity takes precedence over personal content.
    pub fn check(&self, text: &str) -> SafetyVerdict {
        let tokens = self.tokenizer.terms(text);

        if tokens.iter().any(|token| self.profanity.contains(token)) {
            return SafetyVerdict::rejected(SafetyKind::Profanity);
        }

        let normalized = tokens.join(" ");
        let personal_word = tokens.iter().any(|token| self.personal_words.contains(token));
        let personal_question = self
            .personal_phrases
            .iter()
            .any(|phrase| normalized.contains(phrase.as_str()));
        if personal_word || personal_question {
            return SafetyVerdict::rejected(SafetyKind::Personal);
        }

        SafetyVerdict::clean()
    }
}
