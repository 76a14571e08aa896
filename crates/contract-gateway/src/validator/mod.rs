//! Prompt validation
//!
//! Decides whether a free-text prompt plausibly describes a business before
//! it is allowed anywhere near the upstream API. Checks run in a fixed order
//! and the first failure wins:
//!
//! 1. empty or whitespace-only input
//! 2. length ceiling
//! 3. length floor
//! 4. disallowed (non-business) patterns
//! 5. business keyword score, bypassed by any legal term
//! 6. minimum word count
//! 7. distinct-word ratio

mod vocab;

use regex::{Regex, RegexBuilder};
use std::fmt;
use thiserror::Error;

use crate::config::ValidatorConfig;
use crate::error::{GatewayError, Result};

pub use vocab::{BUSINESS_ACTIVITIES, BUSINESS_ENTITIES, LEGAL_TERMS, NON_BUSINESS_PATTERNS};

/// Reason a prompt was rejected. `Display` is the message shown to callers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidPrompt {
    #[error("Prompt is required and cannot be empty")]
    Empty,

    #[error("Prompt is too long. Maximum {max} characters allowed")]
    TooLong { max: usize },

    #[error("Prompt is too short. Please provide more details about your business or service")]
    TooShort { min: usize },

    #[error(
        "Please provide information about your business, company, or service. \
         Your input should describe what your business does or what kind of contract you need."
    )]
    NonBusiness { pattern: &'static str },

    #[error(
        "Please provide more specific information about your business or service. \
         Include details like: what type of business you have, what services you provide, \
         or what kind of contract you need (terms of service, privacy policy, etc.). \
         Found keywords: {}",
        format_found(.found)
    )]
    InsufficientContext { found: Vec<&'static str> },

    #[error("Please provide a more detailed description of your business or service needs")]
    TooFewWords,

    #[error("Please provide more varied and specific information about your business")]
    Repetitive,
}

fn format_found(found: &[&'static str]) -> String {
    if found.is_empty() {
        "none".to_string()
    } else {
        found.join(", ")
    }
}

impl InvalidPrompt {
    /// Stable tag for logging
    pub fn category(&self) -> &'static str {
        match self {
            InvalidPrompt::Empty => "empty",
            InvalidPrompt::TooLong { .. } => "too_long",
            InvalidPrompt::TooShort { .. } => "too_short",
            InvalidPrompt::NonBusiness { .. } => "non_business",
            InvalidPrompt::InsufficientContext { .. } => "insufficient_context",
            InvalidPrompt::TooFewWords => "too_few_words",
            InvalidPrompt::Repetitive => "repetitive",
        }
    }
}

/// A prompt that passed every check, trimmed of surrounding whitespace.
///
/// Only [`PromptValidator`] can construct one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedPrompt(String);

impl ValidatedPrompt {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for ValidatedPrompt {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ValidatedPrompt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for ValidatedPrompt {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Outcome of the business keyword scan
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeywordReport {
    /// Keyword occurrences, scored per vocabulary and summed
    pub score: usize,
    /// Entity and activity keywords that occurred at least once, in table order
    pub found: Vec<&'static str>,
    /// Whether any legal term occurs
    pub has_legal_term: bool,
}

impl KeywordReport {
    pub fn is_sufficient(&self, min_score: usize) -> bool {
        self.score >= min_score || self.has_legal_term
    }
}

struct CompiledPattern {
    name: &'static str,
    regex: Regex,
    distinct_groups: Option<(usize, usize)>,
}

impl CompiledPattern {
    fn is_match(&self, text: &str) -> bool {
        match self.distinct_groups {
            None => self.regex.is_match(text),
            Some((a, b)) => {
                let mut start = 0;
                while let Some(caps) = self.regex.captures_at(text, start) {
                    let (Some(x), Some(y)) = (caps.get(a), caps.get(b)) else {
                        return false;
                    };
                    if !x.as_str().eq_ignore_ascii_case(y.as_str()) {
                        return true;
                    }
                    // The second group may open the next pair
                    start = y.start();
                }
                false
            }
        }
    }
}

/// Heuristic classifier for business prompts
pub struct PromptValidator {
    config: ValidatorConfig,
    patterns: Vec<CompiledPattern>,
}

impl PromptValidator {
    /// Compile the pattern table and build a validator with the given thresholds
    pub fn new(config: ValidatorConfig) -> Result<Self> {
        let patterns = NON_BUSINESS_PATTERNS
            .iter()
            .map(|p| -> Result<CompiledPattern> {
                let regex = RegexBuilder::new(p.pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| {
                        GatewayError::Config(format!("Invalid pattern '{}': {e}", p.name))
                    })?;
                Ok(CompiledPattern {
                    name: p.name,
                    regex,
                    distinct_groups: p.distinct_groups,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { config, patterns })
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate a prompt against the configured length ceiling.
    ///
    /// `None` is treated the same as an empty string.
    pub fn validate(
        &self,
        prompt: Option<&str>,
    ) -> std::result::Result<ValidatedPrompt, InvalidPrompt> {
        self.validate_with_max(prompt, self.config.max_length)
    }

    /// Validate a prompt against an explicit length ceiling
    pub fn validate_with_max(
        &self,
        prompt: Option<&str>,
        max_length: usize,
    ) -> std::result::Result<ValidatedPrompt, InvalidPrompt> {
        let trimmed = prompt.map(str::trim).unwrap_or_default();
        if trimmed.is_empty() {
            return Err(InvalidPrompt::Empty);
        }

        let length = trimmed.chars().count();
        if length > max_length {
            return Err(InvalidPrompt::TooLong { max: max_length });
        }
        if length < self.config.min_length {
            return Err(InvalidPrompt::TooShort {
                min: self.config.min_length,
            });
        }

        self.check_business_context(trimmed)?;

        Ok(ValidatedPrompt(trimmed.to_string()))
    }

    /// Name of the first disallowed pattern the text matches, if any
    pub fn matched_pattern(&self, text: &str) -> Option<&'static str> {
        self.patterns
            .iter()
            .find(|p| p.is_match(text))
            .map(|p| p.name)
    }

    /// Scan the text for business and legal vocabulary
    pub fn business_context(&self, text: &str) -> KeywordReport {
        let lower = text.to_lowercase();
        let mut report = KeywordReport::default();

        for vocabulary in [BUSINESS_ENTITIES, BUSINESS_ACTIVITIES] {
            for &keyword in vocabulary {
                let occurrences = lower.matches(keyword).count();
                if occurrences == 0 {
                    continue;
                }
                report.score += occurrences;
                if !report.found.contains(&keyword) {
                    report.found.push(keyword);
                }
            }
        }

        report.has_legal_term = LEGAL_TERMS.iter().any(|term| lower.contains(term));
        report
    }

    fn check_business_context(&self, text: &str) -> std::result::Result<(), InvalidPrompt> {
        if let Some(pattern) = self.matched_pattern(text) {
            return Err(InvalidPrompt::NonBusiness { pattern });
        }

        let report = self.business_context(text);
        if !report.is_sufficient(self.config.min_keyword_score) {
            return Err(InvalidPrompt::InsufficientContext {
                found: report.found,
            });
        }

        let words: Vec<&str> = text.split_whitespace().collect();
        if words.len() < self.config.min_words {
            return Err(InvalidPrompt::TooFewWords);
        }

        let mut distinct = words.clone();
        distinct.sort_unstable();
        distinct.dedup();
        if (distinct.len() as f64) < (words.len() as f64) * self.config.min_distinct_ratio {
            return Err(InvalidPrompt::Repetitive);
        }

        Ok(())
    }
}
