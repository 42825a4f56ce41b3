//! Read-only observability snapshots.

use serde::{Deserialize, Serialize};

use crate::classifier::cache::CacheStats;
use crate::ml::TrainingMetrics;

/// Shape and settings of the current model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelStats {
    pub is_ready: bool,
    pub vocabulary_size: usize,
    pub intent_count: usize,
    pub learned_intents: usize,
    pub parameter_count: usize,
    pub confidence_threshold: f32,
    pub relevance_threshold: f32,
    pub trainer: String,
}

/// Runtime counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub model_ready: bool,
    pub is_training: bool,
    /// Number of forward passes run for classification.
    pub inference_calls: u64,
    /// Number of completed training runs.
    pub training_runs: u64,
    pub cache: CacheStats,
    pub last_training: TrainingMetrics,
}
