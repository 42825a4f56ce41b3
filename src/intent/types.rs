//! Common types for intent classification.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ParleyError, Result};

/// A named category of user request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRecord {
    /// Unique identifier, e.g. `about.background` or `learned_1718000000000`.
    pub tag: String,
    /// Example phrasings that map to this intent.
    pub patterns: Vec<String>,
    /// Candidate replies; one is chosen at random when the intent matches.
    pub responses: Vec<String>,
}

impl IntentRecord {
    /// Create a new intent record.
    pub fn new<T, P, R>(tag: T, patterns: Vec<P>, responses: Vec<R>) -> Self
    where
        T: Into<String>,
        P: Into<String>,
        R: Into<String>,
    {
        Self {
            tag: tag.into(),
            patterns: patterns.into_iter().map(Into::into).collect(),
            responses: responses.into_iter().map(Into::into).collect(),
        }
    }

    /// Check that the record can take part in training.
    pub fn validate(&self) -> Result<()> {
        if self.tag.trim().is_empty() {
            return Err(ParleyError::configuration("intent tag must not be empty"));
        }
        if self.patterns.is_empty() {
            return Err(ParleyError::configuration(format!(
                "intent '{}' has no patterns",
                self.tag
            )));
        }
        if self.responses.is_empty() {
            return Err(ParleyError::configuration(format!(
                "intent '{}' has no responses",
                self.tag
            )));
        }
        Ok(())
    }
}

/// Where a classification answer came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseSource {
    /// A static intent from the bundled dataset.
    Faq,
    /// An intent learned at runtime from an external answer.
    Learned,
    /// A heuristic answer from the fallback responder.
    Fallback,
}

impl fmt::Display for ResponseSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResponseSource::Faq => "faq",
            ResponseSource::Learned => "learned",
            ResponseSource::Fallback => "fallback",
        };
        f.write_str(name)
    }
}

/// The answer produced for one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    /// Tag of the winning intent.
    pub tag: String,
    /// Softmax probability of the winning intent (0-1).
    pub confidence: f32,
    /// Chosen reply text.
    pub response: String,
    /// Topical relevance of the input (0-1).
    pub relevance: f32,
    /// Origin of the answer.
    pub source: ResponseSource,
}
