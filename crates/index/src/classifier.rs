//! Intent classification for incoming queries.
//!
//! A classifier only produces a label. Turning that label into an `Intent`
//! and deciding what it means against the pending result slot is the
//! router's job.

use crate::prompt::render_template;
use recall_core::{AppError, AppResult};
use recall_llm::{LlmClient, LlmRequest};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// What a query asks the router to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Intent {
    /// Run a fresh similarity search
    NewSearch,
    /// Pick the 0-based `i`-th item of the pending result slot
    Select(usize),
}

impl Intent {
    /// Parse a classifier label.
    ///
    /// Accepts `NEW_SEARCH`, `SELECT(i)`, `SELECT i` and `SELECT: i` in any
    /// case, on the first non-empty line. Anything else, including negative
    /// or non-numeric indices, is `NewSearch`.
    pub fn parse(label: &str) -> Self {
        let line = label
            .lines()
            .map(str::trim)
            .find(|l| !l.is_empty())
            .unwrap_or_default()
            .trim_matches(|c: char| c == '`' || c == '"' || c == '\'' || c == '.')
            .to_ascii_uppercase();

        let Some(rest) = line.strip_prefix("SELECT") else {
            return Intent::NewSearch;
        };

        let index = rest
            .trim()
            .trim_start_matches(':')
            .trim()
            .strip_prefix('(')
            .and_then(|r| r.strip_suffix(')'))
            .unwrap_or(rest.trim().trim_start_matches(':').trim())
            .trim();

        match index.parse::<usize>() {
            Ok(i) => Intent::Select(i),
            Err(_) => {
                tracing::debug!("Classifier label '{}' has no usable index", label.trim());
                Intent::NewSearch
            }
        }
    }
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Intent::NewSearch => f.write_str("NEW_SEARCH"),
            Intent::Select(i) => write!(f, "SELECT({})", i),
        }
    }
}

/// Trait for intent classifiers.
#[async_trait::async_trait]
pub trait IntentClassifier: Send + Sync + fmt::Debug {
    /// Return a raw label (`NEW_SEARCH` or `SELECT(i)`) for the query.
    async fn classify(&self, query: &str, has_pending_slot: bool) -> AppResult<String>;
}

const ORDINAL_WORDS: &[(&str, usize)] = &[
    ("first", 1),
    ("second", 2),
    ("third", 3),
    ("fourth", 4),
    ("fifth", 5),
    ("sixth", 6),
    ("seventh", 7),
    ("eighth", 8),
    ("ninth", 9),
    ("tenth", 10),
];

/// Words allowed around the ordinal in a selection ("show me the 2nd one").
const FILLER_WORDS: &[&str] = &[
    "the", "one", "item", "result", "option", "number", "no", "show", "me", "open", "pick",
    "select", "choose", "give", "get", "i", "want", "like", "please", "that", "id", "take",
    "doc", "document", "image", "picture", "photo",
];

/// Offline heuristic classifier.
///
/// Only fires while a slot is pending. A query made of one ordinal
/// ("second", "2nd", "#2", "number 2", "2") plus filler words is a 1-based
/// selection and comes back as a 0-based `SELECT(i)`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RuleClassifier;

impl RuleClassifier {
    pub fn new() -> Self {
        Self
    }

    fn ordinal_of(token: &str) -> Option<usize> {
        if let Some((_, n)) = ORDINAL_WORDS.iter().find(|(word, _)| *word == token) {
            return Some(*n);
        }

        let digits = token
            .strip_suffix("st")
            .or_else(|| token.strip_suffix("nd"))
            .or_else(|| token.strip_suffix("rd"))
            .or_else(|| token.strip_suffix("th"))
            .unwrap_or(token);
        digits.parse().ok()
    }

    /// The 1-based position a selection-shaped query names, if any.
    pub fn selection(query: &str) -> Option<usize> {
        let lower = query.to_lowercase();
        let tokens: Vec<&str> = lower
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
            .collect();

        let mut position = None;
        for token in tokens {
            if FILLER_WORDS.contains(&token) {
                continue;
            }
            match (Self::ordinal_of(token), position) {
                (Some(n), None) => position = Some(n),
                _ => return None,
            }
        }

        position.filter(|n| *n >= 1)
    }
}

#[async_trait::async_trait]
impl IntentClassifier for RuleClassifier {
    async fn classify(&self, query: &str, has_pending_slot: bool) -> AppResult<String> {
        let intent = match Self::selection(query) {
            Some(n) if has_pending_slot => Intent::Select(n - 1),
            _ => Intent::NewSearch,
        };
        Ok(intent.to_string())
    }
}

const CLASSIFY_TEMPLATE: &str = "\
You route messages for a search assistant over documents and images.
Reply with exactly one label and nothing else.

NEW_SEARCH: the user asks for something new.
{{#if has_pending}}SELECT(i): the user picks one of the {{noun}} they were just shown. i is the 0-based position, so \"the first one\" is SELECT(0) and \"the third\" is SELECT(2).
{{else}}There are no previous results, so the answer is NEW_SEARCH.
{{/if}}
Message: {{query}}
Label:";

#[derive(Serialize)]
struct ClassifyVars<'a> {
    query: &'a str,
    has_pending: bool,
    noun: &'a str,
}

/// Classifier that asks a language model for the label.
pub struct LlmClassifier {
    client: Arc<dyn LlmClient>,
    model: String,
}

impl fmt::Debug for LlmClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmClassifier")
            .field("provider", &self.client.provider_name())
            .field("model", &self.model)
            .finish()
    }
}

impl LlmClassifier {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }
}

#[async_trait::async_trait]
impl IntentClassifier for LlmClassifier {
    async fn classify(&self, query: &str, has_pending_slot: bool) -> AppResult<String> {
        let prompt = render_template(
            CLASSIFY_TEMPLATE,
            &ClassifyVars {
                query,
                has_pending: has_pending_slot,
                noun: "results",
            },
        )?;

        let request = LlmRequest::new(prompt, &self.model)
            .with_temperature(0.0)
            .with_max_tokens(16);

        let response = self.client.complete(&request).await.map_err(|e| {
            AppError::BackendUnavailable(format!(
                "Intent classifier ({}) failed: {}",
                self.client.provider_name(),
                e
            ))
        })?;

        tracing::debug!("Classifier label for '{}': {}", query, response.content.trim());
        Ok(response.content)
    }
}
