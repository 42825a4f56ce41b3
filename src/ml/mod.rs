//! Neural intent model for Parley.
//!
//! This module provides the classifier network, its optimizer and the
//! training loop:
//!
//! - [`IntentNetwork`]: dense ReLU layers with dropout and a softmax output
//! - [`Adam`]: the optimizer used by every training run
//! - [`Trainer`]: the training interface; [`FullRetrainer`] rebuilds the
//!   vocabulary and trains from scratch
//!
//! # Example
//!
//! ```
//! use parley::config::ModelConfig;
//! use parley::intent::IntentRecord;
//! use parley::ml::{FullRetrainer, Trainer};
//!
//! # fn main() -> parley::error::Result<()> {
//! let intents = vec![
//!     IntentRecord::new("greeting", vec!["hello", "hi"], vec!["Hi!"]),
//!     IntentRecord::new("pricing", vec!["how much"], vec!["It depends."]),
//! ];
//! let model = FullRetrainer::new(ModelConfig::default()).train(&intents)?;
//! assert_eq!(model.network.output_dim(), 2);
//! # Ok(())
//! # }
//! ```

pub mod network;
pub mod optimizer;
pub mod trainer;

pub use network::{Activation, DenseLayer, Gradients, IntentNetwork, argmax};
pub use optimizer::Adam;
pub use trainer::{FullRetrainer, TrainedModel, Trainer, TrainingMetrics, TrainingSet};
