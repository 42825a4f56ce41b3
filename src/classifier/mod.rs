//! Intent classification: the service, its confidence policy, response
//! cache, fallback rules and runtime learning.

pub mod cache;
pub mod fallback;
pub mod learning;
pub mod policy;
pub mod service;
pub mod stats;

pub use cache::{CacheStats, ResponseCache};
pub use fallback::FallbackResponder;
pub use learning::{LearningOutcome, LearningRejection, LearningStore, ScreenedExample};
pub use policy::{ClassificationOutcome, ClassificationPolicy, Decision};
pub use service::{IntentService, IntentServiceBuilder, TrainingOutcome};
pub use stats::{ModelStats, PerformanceStats};
