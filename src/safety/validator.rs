//! Validators for learning examples.
//!
//! An input/response pair only becomes training data after both halves pass
//! these checks. Failures are values, not errors.

use std::sync::LazyLock;

use ahash::AHashSet;
use regex::{Regex, RegexSet};

use crate::analysis::tokenizer::NormalizingTokenizer;
use crate::config::LearningConfig;
use crate::lexicon::Lexicon;

static MALICIOUS: LazyLock<RegexSet> = LazyLock::new(|| {
    RegexSet::new([
        r"(?is)<script[^>]*>.*?</script>",
        r"(?i)javascript:",
        r"(?i)\bon\w+\s*=",
        r"(?is)<iframe[^>]*>.*?</iframe>",
        r"(?is)<object[^>]*>.*?</object>",
        r"(?is)<embed[^>]*>.*?</embed>",
        r"(?is)<link[^>]*>.*?</link>",
        r"(?is)<meta[^>]*>.*?</meta>",
        r"(?i)eval\s*\(",
        r"(?i)expression\s*\(",
        r"(?i)vbscript:",
        r"(?i)data:text/html",
        r"(?i)data:application/javascript",
    ])
    .expect("malicious patterns should be valid")
});

static SPECIAL_RUN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^\w\s.,!?]{20,}").expect("special-run pattern should be valid"));

static ANGLE_BRACKETS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[<>]").expect("angle-bracket pattern should be valid"));

static SCRIPT_PROTOCOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript:").expect("protocol pattern should be valid"));

static EVENT_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bon\w+\s*=").expect("handler pattern should be valid"));

/// Identical characters in a row that count as spam.
const SPAM_RUN: usize = 6;

/// Result of validating one piece of text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validation {
    pub is_valid: bool,
    pub reason: Option<String>,
    /// Cleaned text, present only for accepted user input.
    pub sanitized: Option<String>,
}

impl Validation {
    fn accepted(sanitized: Option<String>) -> Self {
        Self {
            is_valid: true,
            reason: None,
            sanitized,
        }
    }

    fn rejected<S: Into<String>>(reason: S) -> Self {
        Self {
            is_valid: false,
            reason: Some(reason.into()),
            sanitized: None,
        }
    }
}

/// Checks learning inputs and externally produced answers.
#[derive(Debug, Clone)]
pub struct InputValidator {
    tokenizer: NormalizingTokenizer,
    min_input_len: usize,
    max_input_len: usize,
    max_response_len: usize,
    harmful: AHashSet<String>,
}

impl InputValidator {
    pub fn new(config: &LearningConfig, lexicon: &Lexicon) -> Self {
        Self {
            tokenizer: NormalizingTokenizer::new(),
            min_input_len: config.min_input_len,
            max_input_len: config.max_input_len,
            max_response_len: config.max_response_len,
            harmful: lexicon
                .harmful_terms
                .iter()
                .map(|term| term.to_lowercase())
                .collect(),
        }
    }

    /// Validate a user question and return its sanitized form.
    pub fn validate_user_input(&self, input: &str) -> Validation {
        let len = input.chars().count();
        if len < self.min_input_len {
            return Validation::rejected("Input too short");
        }
        if len > self.max_input_len {
            return Validation::rejected("Input too long");
        }
        if MALICIOUS.is_match(input) {
            return Validation::rejected("Potentially malicious content detected");
        }
        if is_spam(input) {
            return Validation::rejected("Spam-like content detected");
        }
        if self.is_harmful(input) {
            return Validation::rejected("Inappropriate content detected");
        }

        Validation::accepted(Some(sanitize(input)))
    }

    /// Validate an answer produced by the external AI.
    pub fn validate_response(&self, response: &str) -> Validation {
        if response.chars().count() > self.max_response_len {
            return Validation::rejected("Response too long");
        }
        if response.trim().is_empty() {
            return Validation::rejected("Response is empty");
        }
        if MALICIOUS.is_match(response) {
            return Validation::rejected("Response contains potentially malicious content");
        }
        if self.is_harmful(response) {
            return Validation::rejected("Response contains inappropriate content");
        }

        Validation::accepted(None)
    }

    fn is_harmful(&self, text: &str) -> bool {
        self.tokenizer
            .terms(text)
            .iter()
            .any(|term| self.harmful.contains(term))
    }
}

fn is_spam(text: &str) -> bool {
    has_repeated_run(text, SPAM_RUN) || SPECIAL_RUN.is_match(text)
}

/// Whether some character occurs `run` or more times in a row.
fn has_repeated_run(text: &str, run: usize) -> bool {
    let mut previous = None;
    let mut count = 0;
    for c in text.chars() {
        if Some(c) == previous {
            count += 1;
        } else {
            previous = Some(c);
            count = 1;
        }
        if count >= run {
            return true;
        }
    }
    false
}

/// Strip angle brackets, script protocols and inline handlers, then trim.
pub fn sanitize(input: &str) -> String {
    let text = ANGLE_BRACKETS.replace_all(input, "");
    let text = SCRIPT_PROTOCOL.replace_all(&text, "");
    let text = EVENT_HANDLER.replace_all(&text, "");
    text.trim().to_string()
}
