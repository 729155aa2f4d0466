//! Session-keyed result slots.
//!
//! Each session holds at most one slot: the ranked results of its most
//! recent search. A new search overwrites it, a selection consumes it, and
//! a slot older than the TTL is treated as absent.

use crate::types::SearchResult;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

/// The most recent ranked result set of one session.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultSlot {
    pub results: Vec<SearchResult>,
    pub created_at: DateTime<Utc>,
}

impl ResultSlot {
    pub fn new(results: Vec<SearchResult>) -> Self {
        Self {
            results,
            created_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    fn is_expired(&self, ttl: Option<Duration>, now: DateTime<Utc>) -> bool {
        ttl.is_some_and(|ttl| now - self.created_at >= ttl)
    }
}

/// In-memory slot storage keyed by session id.
#[derive(Debug)]
pub struct SlotCache {
    ttl: Option<Duration>,
    slots: Mutex<HashMap<String, ResultSlot>>,
}

impl SlotCache {
    /// A TTL of zero seconds disables expiry.
    pub fn new(ttl_secs: u64) -> Self {
        let ttl = i64::try_from(ttl_secs)
            .ok()
            .filter(|secs| *secs > 0)
            .and_then(Duration::try_seconds);
        Self {
            ttl,
            slots: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ResultSlot>> {
        // Slots are replaced whole, so a poisoned map is still consistent.
        self.slots.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Replace the session's slot with fresh results.
    pub fn put(&self, session: &str, results: Vec<SearchResult>) {
        self.put_slot(session, ResultSlot::new(results));
    }

    pub fn put_slot(&self, session: &str, slot: ResultSlot) {
        tracing::debug!(
            "Slot for session '{}' now holds {} result(s)",
            session,
            slot.len()
        );
        let mut slots = self.lock();
        self.sweep(&mut slots);
        slots.insert(session.to_string(), slot);
    }

    /// Drop every expired slot, including those of abandoned sessions.
    fn sweep(&self, slots: &mut HashMap<String, ResultSlot>) {
        let now = Utc::now();
        let before = slots.len();
        slots.retain(|_, slot| !slot.is_expired(self.ttl, now));
        if slots.len() < before {
            tracing::debug!("Swept {} expired result slot(s)", before - slots.len());
        }
    }

    /// Remove and return the session's live slot.
    pub fn take(&self, session: &str) -> Option<ResultSlot> {
        let slot = self.lock().remove(session)?;
        if slot.is_expired(self.ttl, Utc::now()) {
            tracing::warn!("Discarding expired result slot for session '{}'", session);
            return None;
        }
        Some(slot)
    }

    /// Copy of the session's live slot, dropping it if it has expired.
    pub fn peek(&self, session: &str) -> Option<ResultSlot> {
        let mut slots = self.lock();
        match slots.get(session) {
            Some(slot) if slot.is_expired(self.ttl, Utc::now()) => {
                tracing::warn!("Discarding expired result slot for session '{}'", session);
                slots.remove(session);
                None
            }
            Some(slot) => Some(slot.clone()),
            None => None,
        }
    }

    pub fn has_pending(&self, session: &str) -> bool {
        self.peek(session).is_some()
    }

    pub fn clear(&self, session: &str) {
        self.lock().remove(session);
    }

    /// Number of sessions currently holding a slot (expired ones included).
    pub fn session_count(&self) -> usize {
        self.lock().len()
    }
}
