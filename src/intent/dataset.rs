//! Intent datasets in the `{"intents": [...]}` JSON format.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ParleyError, Result};
use crate::intent::types::IntentRecord;

/// An ordered collection of intents.
///
/// This is both the bundled training dataset and the on-disk shape of the
/// learned-examples collection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentDataset {
    pub intents: Vec<IntentRecord>,
}

impl IntentDataset {
    pub fn new(intents: Vec<IntentRecord>) -> Self {
        Self { intents }
    }

    /// Parse a dataset from JSON text and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let dataset: IntentDataset = serde_json::from_str(json)?;
        dataset.validate()?;
        Ok(dataset)
    }

    /// Load a dataset from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Serialize to pretty JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Every record must be valid and tags must be unique.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for intent in &self.intents {
            intent.validate()?;
            if !seen.insert(intent.tag.as_str()) {
                return Err(ParleyError::configuration(format!(
                    "duplicate intent tag '{}'",
                    intent.tag
                )));
            }
        }
        Ok(())
    }

    /// Number of (pattern, intent) training pairs.
    pub fn pattern_count(&self) -> usize {
        self.intents.iter().map(|intent| intent.patterns.len()).sum()
    }

    pub fn len(&self) -> usize {
        self.intents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.intents.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &IntentRecord> {
        self.intents.iter()
    }
}

impl From<Vec<IntentRecord>> for IntentDataset {
    fn from(intents: Vec<IntentRecord>) -> Self {
        Self::new(intents)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"{
        "intents": [
            {"tag": "greeting", "patterns": ["hello", "hi there"], "responses": ["Hi!"]},
            {"tag": "pricing", "patterns": ["how much does it cost"], "responses": ["It depends."]}
        ]
    }"#;

    #[test]
    fn test_from_json_str() {
        let dataset = IntentDataset::from_json_str(SAMPLE).unwrap();
        assert_eq!(dataset.len(), 2);
        assert_eq!(dataset.pattern_count(), 3);
        assert_eq!(dataset.intents[1].tag, "pricing");
    }

    #[test]
    fn test_duplicate_tags_rejected() {
        let json = r#"{"intents": [
            {"tag": "a", "patterns": ["x"], "responses": ["y"]},
            {"tag": "a", "patterns": ["z"], "responses": ["w"]}
        ]}"#;
        let err = IntentDataset::from_json_str(json).unwrap_err();
        assert!(err.to_string().contains("duplicate intent tag"));
    }

    #[test]
    fn test_round_trip_through_file() {
        let dataset = IntentDataset::from_json_str(SAMPLE).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("intents.json");
        std::fs::write(&path, dataset.to_json().unwrap()).unwrap();

        let loaded = IntentDataset::from_path(&path).unwrap();
        assert_eq!(loaded, dataset);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = IntentDataset::from_path("/nonexistent/intents.json").unwrap_err();
        assert!(matches!(err, ParleyError::Io(_)));
    }
}
