//! Refusal detection for model answers.
//!
//! A substring heuristic, not a semantic check: a genuine identification
//! that mentions a lexicon phrase (e.g. "unclear" in a caveat) is treated
//! as a failure, and unusually phrased refusals slip through.

use std::path::Path;

use tracing::debug;

use crate::defaults::FALLBACK_MESSAGE;
use crate::error::{Error, Result};

/// Phrases that mark an answer as a refusal or an uncertain non-answer.
pub const DEFAULT_FAILURE_PHRASES: &[&str] = &[
    "sorry",
    "unable",
    "can't view",
    "cannot view",
    "issue with the image upload",
    "describe the watch",
    "not identifiable",
    "unclear",
    "not a watch",
    "not a wristwatch",
    "no watch detected",
    "no wristwatch detected",
    "no watch in the image",
    "no wristwatch in the image",
    "not recognized",
    "not recognized as a watch",
    "not recognized as a wristwatch",
    "not enough information",
    "not enough detail",
    "not able to determine",
    "not able to analyze",
    "could not identify",
    "cannot identify",
    "couldn't identify",
];

/// Ordered set of lower-cased literal phrases.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureLexicon {
    phrases: Vec<String>,
}

impl Default for FailureLexicon {
    fn default() -> Self {
        Self::new(DEFAULT_FAILURE_PHRASES.iter().copied())
    }
}

impl FailureLexicon {
    /// Build a lexicon, lower-casing and dropping blanks and duplicates
    /// while keeping first-seen order.
    pub fn new<I, S>(phrases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut out: Vec<String> = Vec::new();
        for phrase in phrases {
            let phrase = phrase.as_ref().trim().to_lowercase();
            if !phrase.is_empty() && !out.contains(&phrase) {
                out.push(phrase);
            }
        }
        Self { phrases: out }
    }

    /// Parse one phrase per line; `#` comments and blank lines are ignored.
    pub fn parse(text: &str) -> Self {
        Self::new(
            text.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#')),
        )
    }

    /// Load a lexicon file. An empty file is rejected.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let lexicon = Self::parse(&text);
        if lexicon.is_empty() {
            return Err(Error::Config(format!(
                "Failure lexicon {} contains no phrases",
                path.display()
            )));
        }
        Ok(lexicon)
    }

    pub fn phrases(&self) -> &[String] {
        &self.phrases
    }

    pub fn len(&self) -> usize {
        self.phrases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phrases.is_empty()
    }

    /// First phrase contained in `text`, if any.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        let lowered = text.to_lowercase();
        self.phrases
            .iter()
            .find(|phrase| lowered.contains(phrase.as_str()))
            .map(String::as_str)
    }
}

/// Outcome of classifying one raw answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_failure: bool,
    pub display_text: String,
    pub matched_phrase: Option<String>,
}

/// Decides whether an answer is an identification or a refusal.
#[derive(Debug, Clone, Default)]
pub struct ResultClassifier {
    lexicon: FailureLexicon,
}

impl ResultClassifier {
    pub fn new(lexicon: FailureLexicon) -> Self {
        Self { lexicon }
    }

    pub fn lexicon(&self) -> &FailureLexicon {
        &self.lexicon
    }

    pub fn classify(&self, raw_text: &str) -> Classification {
        match self.lexicon.first_match(raw_text) {
            Some(phrase) => {
                debug!(
                    subsystem = "session",
                    component = "classifier",
                    matched_phrase = phrase,
                    "Answer classified as failure"
                );
                Classification {
                    is_failure: true,
                    display_text: FALLBACK_MESSAGE.to_string(),
                    matched_phrase: Some(phrase.to_string()),
                }
            }
            None => Classification {
                is_failure: false,
                display_text: raw_text.to_string(),
                matched_phrase: None,
            },
        }
    }
}
