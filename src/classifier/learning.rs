//! Learning store: accepted external answers become new intents.
//!
//! The store screens a submission (validation, rate limit, duplicates),
//! stages it as a learned intent and, once the service has retrained and
//! saved, commits it. A failed retrain rolls the staged intent back.

use std::fmt;

use ahash::AHashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::analysis::tokenizer::NormalizingTokenizer;
use crate::config::LearningConfig;
use crate::intent::{IntentDataset, IntentRecord};
use crate::lexicon::Lexicon;
use crate::safety::InputValidator;

/// Result of a learning attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LearningOutcome {
    pub success: bool,
    pub reason: Option<String>,
    /// Tag of the new intent when the example was learned.
    pub tag: Option<String>,
}

impl LearningOutcome {
    pub fn learned(tag: String) -> Self {
        Self {
            success: true,
            reason: None,
            tag: Some(tag),
        }
    }

    pub fn rejected(rejection: LearningRejection) -> Self {
        Self {
            success: false,
            reason: Some(rejection.to_string()),
            tag: None,
        }
    }
}

impl From<LearningRejection> for LearningOutcome {
    fn from(rejection: LearningRejection) -> Self {
        Self::rejected(rejection)
    }
}

/// Why a learning example was not learned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LearningRejection {
    InvalidInput(String),
    InvalidResponse(String),
    RateLimited,
    Duplicate,
    TrainingInProgress,
    TrainingFailed(String),
}

impl fmt::Display for LearningRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LearningRejection::InvalidInput(reason) => write!(f, "Invalid input: {reason}"),
            LearningRejection::InvalidResponse(reason) => write!(f, "Invalid response: {reason}"),
            LearningRejection::RateLimited => f.write_str("Rate limit exceeded"),
            LearningRejection::Duplicate => f.write_str("Duplicate learning attempt"),
            LearningRejection::TrainingInProgress => f.write_str("Training already in progress"),
            LearningRejection::TrainingFailed(reason) => write!(f, "Training failed: {reason}"),
        }
    }
}

/// A submission that passed screening.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScreenedExample {
    pub input: String,
    pub response: String,
    /// Dedup key: the normalized input.
    pub key: String,
}

/// Learned intents plus rate-limit and dedup bookkeeping.
#[derive(Debug)]
pub struct LearningStore {
    config: LearningConfig,
    tag_prefix: String,
    validator: InputValidator,
    tokenizer: NormalizingTokenizer,
    learned: Vec<IntentRecord>,
    last_accepted: Option<DateTime<Utc>>,
    recent: AHashMap<String, DateTime<Utc>>,
}

impl LearningStore {
    pub fn new(config: LearningConfig, lexicon: &Lexicon, tag_prefix: impl Into<String>) -> Self {
        Self {
            validator: InputValidator::new(&config, lexicon),
            config,
            tag_prefix: tag_prefix.into(),
            tokenizer: NormalizingTokenizer::new(),
            learned: Vec::new(),
            last_accepted: None,
            recent: AHashMap::new(),
        }
    }

    /// Validate, rate-limit and dedup a submission.
    pub fn screen(
        &self,
        input: &str,
        response: &str,
        now: DateTime<Utc>,
    ) -> Result<ScreenedExample, LearningRejection> {
        let input_check = self.validator.validate_user_input(input);
        if !input_check.is_valid {
            return Err(LearningRejection::InvalidInput(
                input_check.reason.unwrap_or_default(),
            ));
        }
        let response_check = self.validator.validate_response(response);
        if !response_check.is_valid {
            return Err(LearningRejection::InvalidResponse(
                response_check.reason.unwrap_or_default(),
            ));
        }

        if let Some(last) = self.last_accepted {
            if now - last < Duration::milliseconds(self.config.min_interval_ms) {
                return Err(LearningRejection::RateLimited);
            }
        }

        let sanitized = input_check.sanitized.unwrap_or_else(|| input.trim().to_string());
        let key = self.tokenizer.terms(&sanitized).join(" ");
        if let Some(&accepted_at) = self.recent.get(&key) {
            if now - accepted_at < Duration::milliseconds(self.config.duplicate_window_ms) {
                return Err(LearningRejection::Duplicate);
            }
        }

        Ok(ScreenedExample {
            input: sanitized,
            response: response.trim().to_string(),
            key,
        })
    }

    /// Append a learned intent for `example` and return its tag.
    pub fn stage(&mut self, example: &ScreenedExample, now: DateTime<Utc>) -> String {
        let base = format!("{}{}", self.tag_prefix, now.timestamp_millis());
        let mut tag = base.clone();
        let mut suffix = 1;
        while self.learned.iter().any(|intent| intent.tag == tag) {
            tag = format!("{base}_{suffix}");
            suffix += 1;
        }

        self.learned.push(IntentRecord::new(
            tag.clone(),
            vec![example.input.clone()],
            vec![example.response.clone()],
        ));
        tag
    }

    /// Remove a staged intent.
    pub fn rollback(&mut self, tag: &str) {
        self.learned.retain(|intent| intent.tag != tag);
    }

    /// Record the timestamps of an accepted submission.
    pub fn commit(&mut self, example: &ScreenedExample, now: DateTime<Utc>) {
        self.last_accepted = Some(now);
        let window = Duration::milliseconds(self.config.duplicate_window_ms);
        self.recent.retain(|_, accepted_at| now - *accepted_at < window);
        self.recent.insert(example.key.clone(), now);
    }

    pub fn learned(&self) -> &[IntentRecord] {
        &self.learned
    }

    pub fn len(&self) -> usize {
        self.learned.len()
    }

    pub fn is_empty(&self) -> bool {
        self.learned.is_empty()
    }

    /// The learned collection in dataset form.
    pub fn to_dataset(&self) -> IntentDataset {
        IntentDataset::new(self.learned.clone())
    }

    /// Replace the learned collection, e.g. after loading it from storage.
    ///
    /// The accept time of each intent is recovered from its tag, so the
    /// rate limit and duplicate window carry over a restart.
    pub fn restore(&mut self, learned: Vec<IntentRecord>) {
        self.recent.clear();
        self.last_accepted = None;
        for intent in &learned {
            let Some(accepted_at) = self.accepted_at(&intent.tag) else {
                continue;
            };
            for pattern in &intent.patterns {
                let key = self.tokenizer.terms(pattern).join(" ");
                let entry = self.recent.entry(key).or_insert(accepted_at);
                *entry = (*entry).max(accepted_at);
            }
            self.last_accepted = self.last_accepted.max(Some(accepted_at));
        }
        self.learned = learned;
    }

    /// Accept time encoded in a learned tag (`<prefix><millis>[_<n>]`).
    fn accepted_at(&self, tag: &str) -> Option<DateTime<Utc>> {
        let stamp = tag.strip_prefix(&self.tag_prefix)?;
        let millis = stamp.split('_').next()?.parse::<i64>().ok()?;
        DateTime::from_timestamp_millis(millis)
    }

    pub fn validator(&self) -> &InputValidator {
        &self.validator
    }
}
