#![forbid(unsafe_code)]

//! Transient notices for failed gestures.
//!
//! A notice is a non-blocking message that expires after a configurable
//! lifetime or when dismissed. The queue is bounded; when full, the oldest
//! notice is dropped. Time is whatever the host clock says, so expiry is
//! deterministic under test.

use std::collections::VecDeque;
use std::time::Duration;

/// Unique identifier for a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NoticeId(pub u64);

/// Severity, used for styling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NoticeLevel {
    #[default]
    Info,
    Warning,
    Error,
}

impl NoticeLevel {
    /// CSS modifier / log label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Error => "error",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub id: NoticeId,
    pub level: NoticeLevel,
    pub message: String,
    /// Host time at which the notice was raised.
    pub created_at: Duration,
    /// `None` keeps the notice until dismissed.
    pub ttl: Option<Duration>,
}

impl Notice {
    #[must_use]
    pub fn is_expired(&self, now: Duration) -> bool {
        self.ttl
            .is_some_and(|ttl| now.saturating_sub(self.created_at) >= ttl)
    }

    /// Remaining lifetime at `now`.
    #[must_use]
    pub fn remaining(&self, now: Duration) -> Option<Duration> {
        let ttl = self.ttl?;
        Some(ttl.saturating_sub(now.saturating_sub(self.created_at)))
    }
}

/// Bounded notice queue, oldest first.
#[derive(Debug, Clone)]
pub struct NoticeQueue {
    notices: VecDeque<Notice>,
    next_id: u64,
    max: usize,
    ttl: Option<Duration>,
}

impl NoticeQueue {
    /// `max` of zero is treated as one.
    #[must_use]
    pub fn new(max: usize, ttl: Option<Duration>) -> Self {
        Self {
            notices: VecDeque::new(),
            next_id: 1,
            max: max.max(1),
            ttl,
        }
    }

    /// Raise a notice at host time `now`.
    pub fn push(&mut self, level: NoticeLevel, message: impl Into<String>, now: Duration) -> NoticeId {
        let id = NoticeId(self.next_id);
        self.next_id += 1;
        while self.notices.len() >= self.max {
            self.notices.pop_front();
        }
        self.notices.push_back(Notice {
            id,
            level,
            message: message.into(),
            created_at: now,
            ttl: self.ttl,
        });
        id
    }

    /// Drop expired notices; returns how many were removed.
    pub fn expire(&mut self, now: Duration) -> usize {
        let before = self.notices.len();
        self.notices.retain(|n| !n.is_expired(now));
        before - self.notices.len()
    }

    /// Dismiss a notice by id.
    pub fn dismiss(&mut self, id: NoticeId) -> bool {
        let before = self.notices.len();
        self.notices.retain(|n| n.id != id);
        before != self.notices.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Notice> {
        self.notices.iter()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&Notice> {
        self.notices.back()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notices.is_empty()
    }
}
