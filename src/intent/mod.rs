//! Intent records, classification results and datasets.

mod dataset;
mod types;

pub use dataset::IntentDataset;
pub use types::{ClassificationResult, IntentRecord, ResponseSource};
