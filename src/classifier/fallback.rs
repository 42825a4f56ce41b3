//! Canned answers for relevant inputs the model did not match.

use log::debug;
use rand::Rng;

use crate::analysis::tokenizer::NormalizingTokenizer;
use crate::config::{FallbackConfig, FallbackRule};
use crate::intent::{ClassificationResult, ResponseSource};
use crate::lexicon::PhraseMatcher;
use crate::relevance::RelevanceSignal;

/// Rule-based responder used after the model defers.
#[derive(Debug, Clone)]
pub struct FallbackResponder {
    config: FallbackConfig,
    tokenizer: NormalizingTokenizer,
    triggers: Vec<PhraseMatcher>,
}

impl FallbackResponder {
    pub fn new(config: FallbackConfig) -> Self {
        let triggers = config
            .rules
            .iter()
            .map(|rule| PhraseMatcher::new(&rule.triggers))
            .collect();
        Self {
            config,
            tokenizer: NormalizingTokenizer::new(),
            triggers,
        }
    }

    /// Answer `text` from the rules, or `None` to leave it to the external
    /// AI. The caller has already run the safety filter.
    pub fn respond<R: Rng + ?Sized>(
        &self,
        text: &str,
        signal: &RelevanceSignal,
        rng: &mut R,
    ) -> Option<ClassificationResult> {
        if signal.score < self.config.min_relevance {
            debug!("No fallback: relevance {:.2} too low", signal.score);
            return None;
        }
        if signal.is_generic_question {
            debug!("No fallback: generic question");
            return None;
        }

        let tokens = self.tokenizer.terms(text);
        if let Some(rule) = self.first_rule(&tokens) {
            return Some(ClassificationResult {
                tag: rule.tag.clone(),
                confidence: self.config.rule_confidence,
                response: rule.response.clone(),
                relevance: signal.score,
                source: ResponseSource::Fallback,
            });
        }

        if signal.is_greeting && !self.config.greeting_responses.is_empty() {
            let idx = rng.random_range(0..self.config.greeting_responses.len());
            return Some(ClassificationResult {
                tag: self.config.greeting_tag.clone(),
                confidence: self.config.greeting_confidence,
                response: self.config.greeting_responses[idx].clone(),
                relevance: signal.score,
                source: ResponseSource::Fallback,
            });
        }

        None
    }

    fn first_rule(&self, tokens: &[String]) -> Option<&FallbackRule> {
        self.triggers
            .iter()
            .position(|matcher| matcher.matches(tokens))
            .map(|idx| &self.config.rules[idx])
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;

    fn signal(score: f32, is_greeting: bool, is_generic_question: bool) -> RelevanceSignal {
        RelevanceSignal {
            score,
            is_greeting,
            is_generic_question,
        }
    }

    #[test]
    fn test_rule_match() {
        let responder = FallbackResponder::new(FallbackConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        let result = responder
            .respond("pricing please", &signal(0.6, false, false), &mut rng)
            .unwrap();
        assert_eq!(result.tag, "fallback.pricing");
        assert_eq!(result.confidence, 0.8);
        assert_eq!(result.source, ResponseSource::Fallback);
        assert_eq!(result.relevance, 0.6);
    }

    #[test]
    fn test_triggers_match_whole_words() {
        let responder = FallbackResponder::new(FallbackConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        // "accurate" contains "rate".
        assert!(
            responder
                .respond("accurate websites", &signal(0.6, false, false), &mut rng)
                .is_none()
        );
    }

    #[test]
    fn test_low_relevance_and_generic_give_none() {
        let responder = FallbackResponder::new(FallbackConfig::default());
        let mut rng = StdRng::seed_from_u64(0);
        assert!(responder.respond("pricing", &signal(0.2, false, false), &mut rng).is_none());
        assert!(responder.respond("pricing", &signal(0.9, false, true), &mut rng).is_none());
    }

    #[test]
    fn test_greeting_reply() {
        let config = FallbackConfig::default();
        let responder = FallbackResponder::new(config.clone());
        let mut rng = StdRng::seed_from_u64(0);
        let result = responder
            .respond("hello", &signal(0.8, true, false), &mut rng)
            .unwrap();
        assert_eq!(result.confidence, 0.95);
        assert!(config.greeting_responses.contains(&result.response));
    }

    #[test]
    fn test_greeting_reply_is_seeded() {
        let responder = FallbackResponder::new(FallbackConfig::default());
        let pick = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            responder
                .respond("hey", &signal(0.8, true, false), &mut rng)
                .unwrap()
                .response
        };
        assert_eq!(pick(5), pick(5));
    }
}
