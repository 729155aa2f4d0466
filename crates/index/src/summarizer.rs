//! Document summarizers.
//!
//! A document's summary is what gets embedded and returned as its content.

use crate::prompt::render_template;
use recall_core::{AppError, AppResult};
use recall_llm::{LlmClient, LlmRequest};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;

/// Trait for summarizers.
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync + fmt::Debug {
    async fn summarize(&self, raw_text: &str) -> AppResult<String>;
}

/// Offline summarizer: collapses whitespace and keeps the first `max_chars`.
#[derive(Debug, Clone, Copy)]
pub struct TruncatingSummarizer {
    max_chars: usize,
}

impl TruncatingSummarizer {
    pub fn new(max_chars: usize) -> Self {
        Self { max_chars }
    }
}

impl Default for TruncatingSummarizer {
    fn default() -> Self {
        Self::new(2000)
    }
}

/// Collapse runs of whitespace and cut at a char boundary.
fn truncate_chars(text: &str, max_chars: usize) -> String {
    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match collapsed.char_indices().nth(max_chars) {
        Some((cut, _)) => collapsed[..cut].to_string(),
        None => collapsed,
    }
}

#[async_trait::async_trait]
impl Summarizer for TruncatingSummarizer {
    async fn summarize(&self, raw_text: &str) -> AppResult<String> {
        Ok(truncate_chars(raw_text, self.max_chars))
    }
}

const SUMMARY_TEMPLATE: &str = "\
Summarize the following document in one short paragraph.
Mention its subject, the people or organisations involved and any dates.
Reply with the summary only.

Document:
{{text}}";

#[derive(Serialize)]
struct SummaryVars<'a> {
    text: &'a str,
}

/// Summarizer backed by a language model.
///
/// Input longer than `max_chars` is cut before prompting.
pub struct LlmSummarizer {
    client: Arc<dyn LlmClient>,
    model: String,
    max_chars: usize,
}

impl fmt::Debug for LlmSummarizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSummarizer")
            .field("provider", &self.client.provider_name())
            .field("model", &self.model)
            .field("max_chars", &self.max_chars)
            .finish()
    }
}

impl LlmSummarizer {
    pub fn new(client: Arc<dyn LlmClient>, model: impl Into<String>, max_chars: usize) -> Self {
        Self {
            client,
            model: model.into(),
            max_chars,
        }
    }
}

#[async_trait::async_trait]
impl Summarizer for LlmSummarizer {
    async fn summarize(&self, raw_text: &str) -> AppResult<String> {
        let text = truncate_chars(raw_text, self.max_chars);
        let prompt = render_template(SUMMARY_TEMPLATE, &SummaryVars { text: &text })?;

        let request = LlmRequest::new(prompt, &self.model)
            .with_temperature(0.2)
            .with_max_tokens(256);

        let response = self.client.complete(&request).await.map_err(|e| {
            AppError::BackendUnavailable(format!(
                "Summarizer ({}) failed: {}",
                self.client.provider_name(),
                e
            ))
        })?;

        let summary = response.content.trim();
        if summary.is_empty() {
            return Err(AppError::BackendUnavailable(
                "Summarizer returned an empty summary".to_string(),
            ));
        }

        tracing::debug!(
            "Summarized {} chars into {} chars",
            raw_text.len(),
            summary.len()
        );
        Ok(summary.to_string())
    }
}
