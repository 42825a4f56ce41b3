//! # Parley
//!
//! An intent classifier for a portfolio chatbot. Parley answers the
//! questions it knows from a small neural model over bag-of-words vectors,
//! and tells the caller to defer to an external AI for everything else.
//!
//! ## Features
//!
//! - Pure Rust feed-forward classifier trained with Adam
//! - Keyword relevance gating and a content safety filter
//! - Confidence policy with relevance-scaled thresholds
//! - Bounded response cache
//! - Runtime learning of externally produced answers
//! - Crash-safe model persistence over pluggable storage backends
//!
//! ## Example
//!
//! ```no_run
//! use parley::classifier::IntentService;
//! use parley::intent::IntentDataset;
//!
//! # async fn run() -> parley::error::Result<()> {
//! let dataset = IntentDataset::from_path("data/portfolio_intents.json")?;
//! let service = IntentService::builder(dataset).build()?;
//! if !service.load_model()? {
//!     service.train_model().await?;
//! }
//! match service.classify_input("hello").await? {
//!     Some(result) => println!("{}", result.response),
//!     None => println!("defer to the external AI"),
//! }
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod classifier;
pub mod cli;
pub mod clock;
pub mod config;
pub mod error;
pub mod intent;
pub mod lexicon;
pub mod ml;
pub mod persistence;
pub mod relevance;
pub mod safety;
pub mod storage;

pub mod prelude {
    pub use crate::classifier::{
        ClassificationOutcome, IntentService, IntentServiceBuilder, LearningOutcome,
        TrainingOutcome,
    };
    pub use crate::config::ParleyConfig;
    pub use crate::error::{ParleyError, Result};
    pub use crate::intent::{ClassificationResult, IntentDataset, IntentRecord, ResponseSource};
    pub use crate::storage::{FileStorage, MemoryStorage, Storage};
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
