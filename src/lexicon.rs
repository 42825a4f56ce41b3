//! Named term tables used by the relevance scorer, the safety filter and
//! the fallback responder.
//!
//! Every table is plain data so that a deployment can replace the persona,
//! the language or the domain without touching code. [`Lexicon::default`]
//! describes a freelance full-stack developer's portfolio.

use serde::{Deserialize, Serialize};

use crate::analysis::tokenizer::NormalizingTokenizer;

const DOMAIN_KEYWORDS: &[&str] = &[
    "developer",
    "software",
    "programmer",
    "engineer",
    "portfolio",
    "website",
    "websites",
    "web",
    "qa",
    "quality",
    "assurance",
    "team",
    "manager",
    "lead",
    "leadership",
    "specialist",
    "brms",
    "odm",
    "ibm",
    "typescript",
    "javascript",
    "react",
    "nextjs",
    "tailwind",
    "node",
    "express",
    "postgresql",
    "python",
    "java",
    "rust",
    "php",
    "mysql",
    "docker",
    "aws",
    "vercel",
    "git",
    "github",
    "netlify",
    "chatbot",
    "ai",
    "tensorflow",
    "openai",
    "services",
    "pricing",
    "price",
    "cost",
    "rates",
    "package",
    "packages",
    "ecommerce",
    "store",
    "projects",
    "experience",
    "skills",
    "hire",
    "contact",
    "resume",
    "seo",
    "hosting",
];

const PERSONA_REFS: &[&str] = &["you", "your", "yourself"];

const PROFESSIONAL_TERMS: &[&str] = &[
    "developer",
    "software",
    "programming",
    "code",
    "project",
    "website",
    "chatbot",
    "ai",
    "development",
    "service",
    "work",
    "job",
    "career",
    "skill",
    "build",
    "create",
    "develop",
    "design",
    "app",
    "application",
];

const HOBBY_TERMS: &[&str] = &[
    "cycling",
    "coffee",
    "racing",
    "rc",
    "youtube",
    "hobby",
    "hobbies",
    "entertainment",
    "fun",
    "game",
    "gaming",
];

const GREETING_WORDS: &[&str] = &[
    "hello", "hi", "hey", "yo", "hiya", "howdy", "greetings", "sup", "kumusta",
];

const GREETING_PHRASES: &[&str] = &[
    "good morning",
    "good afternoon",
    "good evening",
    "good day",
    "whats up",
    "whats happening",
    "how are you",
    "hows it going",
    "how do you do",
    "nice to meet you",
    "pleasure to meet you",
    "good to see you",
    "great to see you",
    "welcome",
];

const GENERIC_QUESTION_STARTERS: &[&str] = &[
    "what kind of",
    "what types of",
    "what sort of",
    "what can you",
    "what do you",
    "how do you",
    "can you help",
    "what are your",
    "tell me about",
    "explain",
    "describe",
    "what is",
    "how does",
    "what would",
    "what should",
    "what could",
    "what might",
    "what are",
    "how are",
    "why do",
    "when do",
    "where do",
    "which do",
];

const PROFANITY: &[&str] = &[
    // English
    "fuck",
    "shit",
    "damn",
    "bitch",
    "ass",
    "hell",
    "crap",
    "piss",
    // Filipino
    "tite",
    "puke",
    "puki",
    "puta",
    "gago",
    "tangina",
    "ulol",
    "bobo",
    "tanga",
    "walanghiya",
    "lintik",
    "hayop",
    "pokpok",
    "putang",
];

const PERSONAL_WORDS: &[&str] = &[
    "girls",
    "boys",
    "women",
    "men",
    "sex",
    "sexy",
    "hot",
    "beautiful",
    "cute",
    "attractive",
    "single",
    "girlfriend",
    "boyfriend",
    "wife",
    "husband",
    "marriage",
    "dating",
    "love",
    "kiss",
    "hug",
];

const PERSONAL_PHRASES: &[&str] = &[
    "do you like girls",
    "are you single",
    "do you have a girlfriend",
    "are you married",
    "do you have a wife",
    "are you dating",
    "do you like women",
    "are you straight",
    "do you like boys",
    "what do you think about girls",
    "do you find me attractive",
    "are you gay",
    "whats your type",
    "do you want to date",
];

const HARMFUL_TERMS: &[&str] = &[
    "fuck",
    "shit",
    "damn",
    "bitch",
    "asshole",
    "kill",
    "murder",
    "suicide",
    "bomb",
    "terrorist",
];

fn owned(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|term| term.to_string()).collect()
}

/// Keyword tables for one persona and language mix.
///
/// Single-word tables hold lowercase tokens. Phrase tables hold lowercase
/// phrases; they are normalized with the shared tokenizer before matching,
/// so `"what's up"` and `"whats up"` are equivalent entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lexicon {
    /// Words that make an input on-topic.
    pub domain_keywords: Vec<String>,
    /// Words that address the persona directly.
    pub persona_refs: Vec<String>,
    /// Words that signal a professional question.
    pub professional_terms: Vec<String>,
    /// Off-topic interests that lower relevance.
    pub hobby_terms: Vec<String>,
    /// Single-word greetings.
    pub greeting_words: Vec<String>,
    /// Multi-word greetings.
    pub greeting_phrases: Vec<String>,
    /// Openers of open-ended questions better answered by the external AI.
    pub generic_question_starters: Vec<String>,
    /// Profanity, matched as whole words.
    pub profanity: Vec<String>,
    /// Relationship and appearance words, matched as whole words.
    pub personal_words: Vec<String>,
    /// Personal questions, matched as substrings.
    pub personal_phrases: Vec<String>,
    /// Words that make a learning example unacceptable.
    pub harmful_terms: Vec<String>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self {
            domain_keywords: owned(DOMAIN_KEYWORDS),
            persona_refs: owned(PERSONA_REFS),
            professional_terms: owned(PROFESSIONAL_TERMS),
            hobby_terms: owned(HOBBY_TERMS),
            greeting_words: owned(GREETING_WORDS),
            greeting_phrases: owned(GREETING_PHRASES),
            generic_question_starters: owned(GENERIC_QUESTION_STARTERS),
            profanity: owned(PROFANITY),
            personal_words: owned(PERSONAL_WORDS),
            personal_phrases: owned(PERSONAL_PHRASES),
            harmful_terms: owned(HARMFUL_TERMS),
        }
    }
}

impl Lexicon {
    /// A lexicon with every table empty.
    pub fn empty() -> Self {
        Self {
            domain_keywords: Vec::new(),
            persona_refs: Vec::new(),
            professional_terms: Vec::new(),
            hobby_terms: Vec::new(),
            greeting_words: Vec::new(),
            greeting_phrases: Vec::new(),
            generic_question_starters: Vec::new(),
            profanity: Vec::new(),
            personal_words: Vec::new(),
            personal_phrases: Vec::new(),
            harmful_terms: Vec::new(),
        }
    }

    /// Replace the domain keyword table.
    pub fn with_domain_keywords<S: Into<String>>(mut self, keywords: Vec<S>) -> Self {
        self.domain_keywords = keywords.into_iter().map(Into::into).collect();
        self
    }
}

/// A set of phrases matched as whole-token subsequences.
///
/// `"how are you"` matches `"hi, how are you today?"` but not
/// `"show are yours"`.
#[derive(Debug, Clone, Default)]
pub struct PhraseMatcher {
    phrases: Vec<Vec<String>>,
}

impl PhraseMatcher {
    /// Normalize and compile the phrases. Phrases with no words are dropped.
    pub fn new<S: AsRef<str>>(phrases: &[S]) -> Self {
        let tokenizer = NormalizingTokenizer::new();
        let phrases = phrases
            .iter()
            .map(|phrase| tokenizer.terms(phrase.as_ref()))
            .filter(|terms| !terms.is_empty())
            .collect();
        Self { phrases }
    }

    /// Whether any phrase occurs contiguously in `tokens`.
    pub fn matches(&self, tokens: &[String]) -> bool {
        self.phrases.iter().any(|phrase| {
            tokens
                .windows(phrase.len())
                .any(|window| window == phrase.as_slice())
        })
    }

    /// Index of the first phrase that occurs in `tokens`.
    pub fn first_match(&self, tokens: &[String]) -> Option<usize> {
        self.phrases.iter().position(|phrase| {
            tokens
                .windows(phrase.len())
                .any(|window| window == phrase.as_slice())
        })
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens(text: &str) -> Vec<String> {
        NormalizingTokenizer::new().terms(text)
    }

    #[test]
    fn test_default_tables_are_populated() {
        let lexicon = Lexicon::default();
        assert!(lexicon.domain_keywords.contains(&"chatbot".to_string()));
        assert!(lexicon.profanity.contains(&"tangina".to_string()));
        assert!(lexicon.greeting_words.contains(&"hello".to_string()));
    }

    #[test]
    fn test_hobby_terms_are_not_domain_keywords() {
        let lexicon = Lexicon::default();
        for hobby in &lexicon.hobby_terms {
            assert!(!lexicon.domain_keywords.contains(hobby), "{hobby}");
        }
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let lexicon: Lexicon = serde_json::from_str(r#"{"domain_keywords": ["rust"]}"#).unwrap();
        assert_eq!(lexicon.domain_keywords, vec!["rust"]);
        assert_eq!(lexicon.persona_refs, Lexicon::default().persona_refs);
    }

    #[test]
    fn test_phrase_matcher_whole_tokens() {
        let matcher = PhraseMatcher::new(&["how are you", "what's up"]);
        assert!(matcher.matches(&tokens("Hi, how are you today?")));
        assert!(matcher.matches(&tokens("whats up")));
        assert!(!matcher.matches(&tokens("show are yours")));
        assert_eq!(matcher.first_match(&tokens("what's up")), Some(1));
    }

    #[test]
    fn test_phrase_matcher_drops_empty_phrases() {
        let matcher = PhraseMatcher::new(&["", "?!"]);
        assert!(matcher.is_empty());
        assert!(!matcher.matches(&tokens("anything")));
    }
}
