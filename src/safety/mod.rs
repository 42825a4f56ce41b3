//! Content safety: the inference-time filter and the learning validators.

pub mod content_filter;
pub mod validator;

pub use content_filter::{ContentFilter, SafetyKind, SafetyVerdict};
pub use validator::{InputValidator, Validation};
