//! User-facing notices: the single, non-blocking notification channel.
//!
//! Every failure that reaches the user (and the few successes worth
//! confirming) lands here as a [`Notice`] that dismisses itself once its
//! duration has elapsed.

#[cfg(test)]
#[path = "notice_test.rs"]
mod notice_test;

use serde::{Deserialize, Serialize};

use crate::consts::DEFAULT_NOTICE_DURATION_MS;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Success,
    Error,
    Info,
    Warning,
}

/// One transient notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    pub id: u64,
    pub kind: NoticeKind,
    pub message: String,
    pub created_ms: i64,
    pub duration_ms: i64,
}

impl Notice {
    /// Whether the notice should still be shown at `now_ms`.
    #[must_use]
    pub fn is_live(&self, now_ms: i64) -> bool {
        now_ms.saturating_sub(self.created_ms) < self.duration_ms
    }
}

/// Queue of live notices in the order they were raised.
#[derive(Debug, Clone)]
pub struct NoticeQueue {
    items: Vec<Notice>,
    next_id: u64,
    duration_ms: i64,
}

impl Default for NoticeQueue {
    fn default() -> Self {
        Self::with_duration(DEFAULT_NOTICE_DURATION_MS)
    }
}

impl NoticeQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_duration(duration_ms: i64) -> Self {
        Self { items: Vec::new(), next_id: 1, duration_ms }
    }

    /// Raise a notice and return its id.
    pub fn push(&mut self, kind: NoticeKind, message: impl Into<String>, now_ms: i64) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.items.push(Notice { id, kind, message: message.into(), created_ms: now_ms, duration_ms: self.duration_ms });
        id
    }

    /// Drop notices whose duration has elapsed.
    pub fn expire(&mut self, now_ms: i64) {
        self.items.retain(|n| n.is_live(now_ms));
    }

    /// Dismiss a notice early. Returns `false` if it was already gone.
    pub fn dismiss(&mut self, id: u64) -> bool {
        let before = self.items.len();
        self.items.retain(|n| n.id != id);
        self.items.len() != before
    }

    /// Notices currently raised, oldest first.
    #[must_use]
    pub fn active(&self) -> &[Notice] {
        &self.items
    }

    pub fn clear(&mut self) {
        self.items.clear();
    }
}
