//! Configuration for the classifier service.
//!
//! Every constant used by training, inference and learning is a default of
//! one of these structs. All of them deserialize from partial JSON: missing
//! fields take their default value.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ParleyError, Result};
use crate::lexicon::Lexicon;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParleyConfig {
    pub model: ModelConfig,
    pub policy: PolicyConfig,
    pub relevance: RelevanceConfig,
    pub cache: CacheConfig,
    pub learning: LearningConfig,
    pub persistence: PersistenceConfig,
    pub lexicon: Lexicon,
    pub fallback: FallbackConfig,
}

impl ParleyConfig {
    /// Parse a configuration from JSON text and validate it.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: ParleyConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_json_str(&content)
    }

    /// Reject values that would make training or inference meaningless.
    pub fn validate(&self) -> Result<()> {
        self.model.validate()?;
        self.policy.validate()?;
        if self.cache.max_size == 0 {
            return Err(ParleyError::configuration(
                "cache.max_size must be at least 1",
            ));
        }
        if self.learning.min_input_len > self.learning.max_input_len {
            return Err(ParleyError::configuration(
                "learning.min_input_len must not exceed learning.max_input_len",
            ));
        }
        Ok(())
    }
}

/// One hidden layer of the network.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HiddenLayerConfig {
    /// Number of ReLU units.
    pub units: usize,
    /// Fraction of units dropped during training.
    pub dropout: f32,
    /// L2 penalty on the layer's kernel.
    #[serde(default)]
    pub l2: f32,
}

impl HiddenLayerConfig {
    pub fn new(units: usize, dropout: f32, l2: f32) -> Self {
        Self { units, dropout, l2 }
    }
}

/// Network shape and training schedule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub hidden_layers: Vec<HiddenLayerConfig>,
    pub learning_rate: f32,
    /// Upper bound on training epochs.
    pub epochs: usize,
    pub batch_size: usize,
    /// Fraction of each intent's patterns held out for monitoring.
    pub validation_split: f32,
    /// Epochs without improvement before training stops.
    pub patience: usize,
    /// Smallest loss decrease that counts as an improvement.
    pub min_delta: f32,
    /// Seed for initialisation, shuffling, dropout and the split.
    pub seed: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            hidden_layers: vec![
                HiddenLayerConfig::new(256, 0.2, 0.001),
                HiddenLayerConfig::new(128, 0.3, 0.001),
                HiddenLayerConfig::new(64, 0.2, 0.0),
            ],
            learning_rate: 0.005,
            epochs: 200,
            batch_size: 32,
            validation_split: 0.2,
            patience: 10,
            min_delta: 1e-4,
            seed: 42,
        }
    }
}

impl ModelConfig {
    pub fn validate(&self) -> Result<()> {
        if self.hidden_layers.iter().any(|layer| layer.units == 0) {
            return Err(ParleyError::configuration(
                "hidden layers must have at least one unit",
            ));
        }
        if self
            .hidden_layers
            .iter()
            .any(|layer| !(0.0..1.0).contains(&layer.dropout) || layer.l2 < 0.0)
        {
            return Err(ParleyError::configuration(
                "dropout must be in [0, 1) and l2 must be non-negative",
            ));
        }
        if self.batch_size == 0 || self.epochs == 0 {
            return Err(ParleyError::configuration(
                "batch_size and epochs must be at least 1",
            ));
        }
        if self.learning_rate.is_nan() || self.learning_rate <= 0.0 {
            return Err(ParleyError::configuration(
                "learning_rate must be positive",
            ));
        }
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(ParleyError::configuration(
                "validation_split must be in [0, 1)",
            ));
        }
        Ok(())
    }
}

/// Thresholds that decide between answering locally and deferring.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub confidence_threshold: f32,
    pub relevance_threshold: f32,
    /// Ceiling on the adjusted threshold for greetings.
    pub greeting_threshold: f32,
    /// Generic questions at or above this relevance are explicit deferrals.
    pub generic_min_relevance: f32,
    /// Tag prefix that marks learned intents.
    pub learned_prefix: String,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.75,
            relevance_threshold: 0.5,
            greeting_threshold: 0.3,
            generic_min_relevance: 0.3,
            learned_prefix: "learned_".to_string(),
        }
    }
}

impl PolicyConfig {
    pub fn validate(&self) -> Result<()> {
        let unit = 0.0..=1.0;
        if !unit.contains(&self.confidence_threshold)
            || !unit.contains(&self.relevance_threshold)
            || !unit.contains(&self.greeting_threshold)
            || !unit.contains(&self.generic_min_relevance)
        {
            return Err(ParleyError::configuration(
                "policy thresholds must be in [0, 1]",
            ));
        }
        if self.learned_prefix.is_empty() {
            return Err(ParleyError::configuration(
                "policy.learned_prefix must not be empty",
            ));
        }
        Ok(())
    }
}

/// Weights of the relevance heuristic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
    /// Fixed relevance of greetings.
    pub greeting_relevance: f32,
    pub persona_boost: f32,
    pub professional_boost: f32,
    pub hobby_penalty: f32,
    /// Shortest string allowed to match by containment.
    pub min_substring_len: usize,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            greeting_relevance: 0.8,
            persona_boost: 0.3,
            professional_boost: 0.2,
            hobby_penalty: 0.3,
            min_substring_len: 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub max_size: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self { max_size: 100 }
    }
}

/// Limits applied to runtime learning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LearningConfig {
    pub min_input_len: usize,
    pub max_input_len: usize,
    pub max_response_len: usize,
    /// Minimum time between accepted submissions.
    pub min_interval_ms: i64,
    /// How long an accepted input blocks resubmission.
    pub duplicate_window_ms: i64,
}

impl Default for LearningConfig {
    fn default() -> Self {
        Self {
            min_input_len: 3,
            max_input_len: 500,
            max_response_len: 2000,
            min_interval_ms: 1000,
            duplicate_window_ms: 24 * 60 * 60 * 1000,
        }
    }
}

/// How save failures after training are treated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistenceConfig {
    /// When false, a model that trained but failed to save is still
    /// installed in memory and the failure is only logged. Learning always
    /// requires a successful save.
    pub require_save: bool,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self { require_save: true }
    }
}

/// A canned answer for relevant inputs the model did not match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FallbackRule {
    pub tag: String,
    /// Phrases that select this rule, matched on whole tokens.
    pub triggers: Vec<String>,
    pub response: String,
}

impl FallbackRule {
    pub fn new<S: Into<String>>(tag: S, triggers: &[&str], response: S) -> Self {
        Self {
            tag: tag.into(),
            triggers: triggers.iter().map(|t| t.to_string()).collect(),
            response: response.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackConfig {
    /// Below this relevance no fallback is produced.
    pub min_relevance: f32,
    pub rule_confidence: f32,
    pub greeting_confidence: f32,
    pub greeting_tag: String,
    pub rules: Vec<FallbackRule>,
    pub greeting_responses: Vec<String>,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        Self {
            min_relevance: 0.3,
            rule_confidence: 0.8,
            greeting_confidence: 0.95,
            greeting_tag: "fallback.greeting".to_string(),
            rules: vec![
                FallbackRule::new(
                    "fallback.pricing",
                    &["pricing", "cost", "costs", "price", "prices", "rate", "rates"],
                    "There are three website packages: Starter, Professional and Enterprise. \
                     All include responsive design, SEO, hosting and chatbot integration.",
                ),
                FallbackRule::new(
                    "fallback.ecommerce",
                    &["ecommerce", "online store", "shop"],
                    "Yes, e-commerce sites are available: full online stores with payment \
                     integration, inventory management and chatbot support.",
                ),
                FallbackRule::new(
                    "fallback.services",
                    &["services", "solutions"],
                    "Services include website development, AI chatbot integration, \
                     full-stack development, business rules solutions and QA leadership.",
                ),
            ],
            greeting_responses: vec![
                "Hey there! Nice to meet you. How can I help you today?".to_string(),
                "Hi! Great to connect. What brings you here?".to_string(),
                "Hello! What can I help you with today?".to_string(),
                "Hi there! Ready to chat. What can I do for you?".to_string(),
            ],
        }
    }
}
