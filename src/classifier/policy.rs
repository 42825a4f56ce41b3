//! The confidence policy: when to answer locally and when to defer.

use serde::{Deserialize, Serialize};

use crate::config::PolicyConfig;
use crate::intent::{ClassificationResult, ResponseSource};
use crate::relevance::RelevanceSignal;
use crate::safety::SafetyKind;

/// What happened to one input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ClassificationOutcome {
    /// Served from the response cache.
    Cached(ClassificationResult),
    /// Answered by the model.
    Matched(ClassificationResult),
    /// Rejected by the safety filter.
    Refused { kind: SafetyKind },
    /// Not about the portfolio.
    OffTopic { relevance: f32 },
    /// The model's best guess was not confident enough.
    LowConfidence {
        tag: String,
        confidence: f32,
        threshold: f32,
    },
    /// An open-ended, relevant question left to the external AI.
    DeferredGeneric {
        tag: String,
        confidence: f32,
        relevance: f32,
    },
}

impl ClassificationOutcome {
    /// The answer, if the input was answered locally.
    pub fn into_result(self) -> Option<ClassificationResult> {
        match self {
            ClassificationOutcome::Cached(result) | ClassificationOutcome::Matched(result) => {
                Some(result)
            }
            _ => None,
        }
    }

    pub fn is_answered(&self) -> bool {
        matches!(
            self,
            ClassificationOutcome::Cached(_) | ClassificationOutcome::Matched(_)
        )
    }
}

/// The policy's verdict on a model prediction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Decision {
    Accept,
    LowConfidence { threshold: f32 },
    DeferGeneric { threshold: f32 },
}

/// Thresholds and the rules that combine them.
#[derive(Debug, Clone)]
pub struct ClassificationPolicy {
    config: PolicyConfig,
}

impl ClassificationPolicy {
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    pub fn confidence_threshold(&self) -> f32 {
        self.config.confidence_threshold
    }

    pub fn relevance_threshold(&self) -> f32 {
        self.config.relevance_threshold
    }

    /// Clamp into `[0.1, 1.0]` and store.
    pub fn set_confidence_threshold(&mut self, threshold: f32) -> f32 {
        self.config.confidence_threshold = clamp_threshold(threshold);
        self.config.confidence_threshold
    }

    /// Clamp into `[0.1, 1.0]` and store.
    pub fn set_relevance_threshold(&mut self, threshold: f32) -> f32 {
        self.config.relevance_threshold = clamp_threshold(threshold);
        self.config.relevance_threshold
    }

    pub fn passes_relevance(&self, relevance: f32) -> bool {
        relevance >= self.config.relevance_threshold
    }

    /// `base * (1 - 0.2 * relevance)`, capped at the greeting threshold
    /// for greetings. A more relevant input never faces a higher bar.
    pub fn adjusted_threshold(&self, relevance: f32, is_greeting: bool) -> f32 {
        let relevance = if relevance.is_nan() {
            0.0
        } else {
            relevance.clamp(0.0, 1.0)
        };
        let adjusted = self.config.confidence_threshold * (1.0 - 0.2 * relevance);
        if is_greeting {
            adjusted.min(self.config.greeting_threshold)
        } else {
            adjusted
        }
    }

    pub fn decide(&self, signal: &RelevanceSignal, confidence: f32) -> Decision {
        let threshold = self.adjusted_threshold(signal.score, signal.is_greeting);
        if confidence >= threshold {
            Decision::Accept
        } else if signal.is_generic_question && signal.score >= self.config.generic_min_relevance
        {
            Decision::DeferGeneric { threshold }
        } else {
            Decision::LowConfidence { threshold }
        }
    }

    /// `learned` for runtime-learned tags, `faq` otherwise.
    pub fn source_for(&self, tag: &str) -> ResponseSource {
        if tag.starts_with(&self.config.learned_prefix) {
            ResponseSource::Learned
        } else {
            ResponseSource::Faq
        }
    }
}

fn clamp_threshold(threshold: f32) -> f32 {
    if threshold.is_nan() {
        return 1.0;
    }
    threshold.clamp(0.1, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> ClassificationPolicy {
        ClassificationPolicy::new(PolicyConfig::default())
    }

    fn signal(score: f32, is_greeting: bool, is_generic_question: bool) -> RelevanceSignal {
        RelevanceSignal {
            score,
            is_greeting,
            is_generic_question,
        }
    }

    #[test]
    fn test_adjusted_threshold_scaling() {
        let policy = policy();
        assert!((policy.adjusted_threshold(1.0, false) - 0.6).abs() < 1e-6);
        assert!((policy.adjusted_threshold(0.5, false) - 0.675).abs() < 1e-6);
        assert!((policy.adjusted_threshold(0.0, false) - 0.75).abs() < 1e-6);
    }

    #[test]
    fn test_higher_relevance_never_raises_the_threshold() {
        let policy = policy();
        let mut previous = f32::INFINITY;
        for step in 0..=10 {
            let threshold = policy.adjusted_threshold(step as f32 / 10.0, false);
            assert!(threshold <= previous);
            previous = threshold;
        }
        assert!(policy.adjusted_threshold(0.9, false) <= policy.adjusted_threshold(0.2, false));

        // Same confidence: the on-topic input passes, the weakly relevant one does not.
        let confidence = 0.65;
        assert_eq!(policy.decide(&signal(0.9, false, false), confidence), Decision::Accept);
        assert!(matches!(
            policy.decide(&signal(0.2, false, false), confidence),
            Decision::LowConfidence { .. }
        ));
    }

    #[test]
    fn test_greeting_threshold_cap() {
        let policy = policy();
        assert_eq!(policy.adjusted_threshold(0.8, true), 0.3);
        assert_eq!(policy.decide(&signal(0.8, true, false), 0.35), Decision::Accept);
    }

    #[test]
    fn test_decide() {
        let policy = policy();
        assert_eq!(policy.decide(&signal(1.0, false, false), 0.9), Decision::Accept);
        assert!(matches!(
            policy.decide(&signal(1.0, false, false), 0.5),
            Decision::LowConfidence { .. }
        ));
        assert!(matches!(
            policy.decide(&signal(0.6, false, true), 0.5),
            Decision::DeferGeneric { .. }
        ));
    }

    #[test]
    fn test_threshold_updates_are_clamped() {
        let mut policy = policy();
        assert_eq!(policy.set_confidence_threshold(0.01), 0.1);
        assert_eq!(policy.set_confidence_threshold(3.0), 1.0);
        assert_eq!(policy.set_relevance_threshold(0.4), 0.4);
        assert_eq!(policy.set_relevance_threshold(f32::NAN), 1.0);
    }

    #[test]
    fn test_source_for() {
        let policy = policy();
        assert_eq!(policy.source_for("learned_1700000000000"), ResponseSource::Learned);
        assert_eq!(policy.source_for("about.background"), ResponseSource::Faq);
    }

    #[test]
    fn test_outcome_into_result() {
        let refused = ClassificationOutcome::Refused {
            kind: SafetyKind::Profanity,
        };
        assert!(!refused.is_answered());
        assert_eq!(refused.into_result(), None);
    }
}
