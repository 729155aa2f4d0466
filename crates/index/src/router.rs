//! Two-state query router.
//!
//! ```text
//!            NEW_SEARCH                     SELECT(i), any i
//!   IDLE ─────────────────▶ AWAITING ─────────────────────────▶ IDLE
//!                           SELECTION ◀──┐
//!                                 └──────┘ NEW_SEARCH
//! ```
//!
//! A selection with no pending slot is a new search. A selection outside the
//! slot discards the slot and returns nothing.

use crate::classifier::{Intent, IntentClassifier};
use crate::slot::SlotCache;
use crate::store::Searchable;
use crate::types::SearchResult;
use recall_core::{AppError, AppResult};
use serde::Serialize;
use std::sync::Arc;

/// Whether a session has a result slot to select from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouterState {
    Idle,
    AwaitingSelection,
}

/// What one routed query produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutcome {
    /// The intent that was acted on (a selection with nothing pending is
    /// reported as `NewSearch`)
    pub intent: Intent,
    pub results: Vec<SearchResult>,
    /// Session state after the query
    pub state: RouterState,
}

/// Routes queries between fresh searches and selections from the last results.
#[derive(Debug, Clone)]
pub struct QueryRouter {
    classifier: Arc<dyn IntentClassifier>,
    slots: Arc<SlotCache>,
}

impl QueryRouter {
    pub fn new(classifier: Arc<dyn IntentClassifier>, slots: Arc<SlotCache>) -> Self {
        Self { classifier, slots }
    }

    pub fn state(&self, session: &str) -> RouterState {
        if self.slots.has_pending(session) {
            RouterState::AwaitingSelection
        } else {
            RouterState::Idle
        }
    }

    /// Classify `query` and either search `index` or resolve a selection.
    ///
    /// Classifier and search failures are returned as errors and leave the
    /// session's slot as it was.
    pub async fn route(
        &self,
        session: &str,
        query: &str,
        k: usize,
        index: &dyn Searchable,
    ) -> AppResult<RouteOutcome> {
        let pending = self.slots.has_pending(session);
        let label = self.classifier.classify(query, pending).await?;

        match Intent::parse(&label) {
            Intent::Select(i) if pending => self.select(session, i),
            Intent::Select(i) => {
                tracing::debug!(
                    "SELECT({}) with no pending results in session '{}', searching instead",
                    i,
                    session
                );
                self.search(session, query, k, index).await
            }
            Intent::NewSearch => self.search(session, query, k, index).await,
        }
    }

    async fn search(
        &self,
        session: &str,
        query: &str,
        k: usize,
        index: &dyn Searchable,
    ) -> AppResult<RouteOutcome> {
        let results = index.search(query, k).await?;
        self.slots.put(session, results.clone());

        tracing::info!(
            "Session '{}': new search returned {} result(s), awaiting selection",
            session,
            results.len()
        );

        Ok(RouteOutcome {
            intent: Intent::NewSearch,
            results,
            state: RouterState::AwaitingSelection,
        })
    }

    fn select(&self, session: &str, index: usize) -> AppResult<RouteOutcome> {
        let results = match self.pick(session, index) {
            Ok(item) => vec![item],
            Err(e) if e.is_recoverable() => {
                tracing::warn!("Session '{}': {}; pending results discarded", session, e);
                Vec::new()
            }
            Err(e) => return Err(e),
        };

        tracing::info!(
            "Session '{}': SELECT({}) returned {} result(s), now idle",
            session,
            index,
            results.len()
        );

        Ok(RouteOutcome {
            intent: Intent::Select(index),
            results,
            state: RouterState::Idle,
        })
    }

    /// Consume the slot and return its `index`-th result.
    fn pick(&self, session: &str, index: usize) -> AppResult<SearchResult> {
        let slot = self.slots.take(session).ok_or_else(|| {
            AppError::MalformedSelection(format!("no pending results for SELECT({})", index))
        })?;

        let available = slot.len();
        slot.results.into_iter().nth(index).ok_or_else(|| {
            AppError::MalformedSelection(format!(
                "SELECT({}) is out of range for {} pending result(s)",
                index, available
            ))
        })
    }
}
