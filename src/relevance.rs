//! Keyword relevance scoring and greeting / generic-question detection.
//!
//! Relevance is a cheap topicality estimate in `[0, 1]`: the fraction of
//! tokens that hit a domain keyword, adjusted by persona, professional and
//! hobby signals. It gates inference before the model runs.

use ahash::AHashSet;

use crate::analysis::tokenizer::NormalizingTokenizer;
use crate::config::RelevanceConfig;
use crate::lexicon::{Lexicon, PhraseMatcher};

/// Everything the policy needs to know about an input's topicality.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RelevanceSignal {
    pub score: f32,
    pub is_greeting: bool,
    pub is_generic_question: bool,
}

/// Scores inputs against a [`Lexicon`].
#[derive(Debug, Clone)]
pub struct RelevanceScorer {
    tokenizer: NormalizingTokenizer,
    config: RelevanceConfig,
    domain_keywords: Vec<String>,
    persona_refs: Vec<String>,
    professional_terms: Vec<String>,
    hobby_terms: Vec<String>,
    greeting_words: AHashSet<String>,
    greeting_phrases: PhraseMatcher,
    generic_starters: PhraseMatcher,
}

impl RelevanceScorer {
    pub fn new(lexicon: &Lexicon, config: RelevanceConfig) -> Self {
        let lower = |terms: &[String]| -> Vec<String> {
            terms.iter().map(|term| term.to_lowercase()).collect()
        };

        Self {
            tokenizer: NormalizingTokenizer::new(),
            config,
            domain_keywords: lower(&lexicon.domain_keywords),
            persona_refs: lower(&lexicon.persona_refs),
            professional_terms: lower(&lexicon.professional_terms),
            hobby_terms: lower(&lexicon.hobby_terms),
            greeting_words: lexicon
                .greeting_words
                .iter()
                .map(|word| word.to_lowercase())
                .collect(),
            greeting_phrases: PhraseMatcher::new(&lexicon.greeting_phrases),
            generic_starters: PhraseMatcher::new(&lexicon.generic_question_starters),
        }
    }

    /// Tokenize once and compute every signal.
    pub fn analyze(&self, text: &str) -> RelevanceSignal {
        let tokens = self.tokenizer.terms(text);
        let is_greeting = self.greeting_tokens(&tokens);
        RelevanceSignal {
            score: self.score_tokens(&tokens, is_greeting),
            is_greeting,
            is_generic_question: !is_greeting && self.generic_starters.matches(&tokens),
        }
    }

    /// Relevance of `text` in `[0, 1]`.
    pub fn score(&self, text: &str) -> f32 {
        self.analyze(text).score
    }

    pub fn is_greeting(&self, text: &str) -> bool {
        self.greeting_tokens(&self.tokenizer.terms(text))
    }

    /// Open-ended questions that the external AI answers better. Greetings
    /// are never generic.
    pub fn is_generic_question(&self, text: &str) -> bool {
        self.analyze(text).is_generic_question
    }

    pub fn config(&self) -> &RelevanceConfig {
        &self.config
    }

    fn greeting_tokens(&self, tokens: &[String]) -> bool {
        tokens.iter().any(|token| self.greeting_words.contains(token))
            || self.greeting_phrases.matches(tokens)
    }

    fn score_tokens(&self, tokens: &[String], is_greeting: bool) -> f32 {
        if tokens.is_empty() {
            return 0.0;
        }
        if is_greeting {
            return self.config.greeting_relevance;
        }

        let min_len = self.config.min_substring_len;
        let matched = tokens
            .iter()
            .filter(|token| {
                self.domain_keywords
                    .iter()
                    .any(|keyword| loose_match(token, keyword, min_len))
            })
            .count();
        let mut relevance = matched as f32 / tokens.len() as f32;

        if self.mentions(tokens, &self.persona_refs) {
            relevance += self.config.persona_boost;
        }
        if self.mentions(tokens, &self.professional_terms) {
            relevance += self.config.professional_boost;
        }
        if self.mentions(tokens, &self.hobby_terms) {
            relevance -= self.config.hobby_penalty;
        }

        relevance.clamp(0.0, 1.0)
    }

    /// Whether any token contains any of `terms`.
    fn mentions(&self, tokens: &[String], terms: &[String]) -> bool {
        let min_len = self.config.min_substring_len;
        tokens.iter().any(|token| {
            terms
                .iter()
                .any(|term| contains_term(token, term, min_len))
        })
    }
}

/// Exact match, or containment in either direction when the shorter string
/// has at least `min_len` characters.
fn loose_match(token: &str, term: &str, min_len: usize) -> bool {
    if token == term {
        return true;
    }
    let (short, long) = if token.chars().count() <= term.chars().count() {
        (token, term)
    } else {
        (term, token)
    };
    short.chars().count() >= min_len && long.contains(short)
}

/// Exact match, or `token` containing `term` when the term has at least
/// `min_len` characters.
fn contains_term(token: &str, term: &str, min_len: usize) -> bool {
    token == term || (term.chars().count() >= min_len && token.contains(term))
}
