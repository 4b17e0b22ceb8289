#![forbid(unsafe_code)]

//! Per-title in-flight guard.
//!
//! At most one list-mutating request (type change, move, delete) is
//! outstanding per entry title. A second gesture on the same title is either
//! rejected or parked until the first completes, depending on
//! [`InflightPolicy`]. Gestures on different titles are never serialized.

use std::collections::{HashMap, VecDeque};

use chartdeck_core::Gesture;

use crate::config::InflightPolicy;

/// Outcome of asking the guard for permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// No mutation outstanding; the request may be issued.
    Proceed,
    /// A mutation is outstanding and the gesture was dropped.
    Rejected,
    /// A mutation is outstanding and the gesture was parked at `depth`.
    Queued { depth: usize },
}

#[derive(Debug, Default)]
pub struct InFlightGuard {
    policy: InflightPolicy,
    /// Titles with an outstanding mutation, and gestures parked behind it.
    active: HashMap<String, VecDeque<Gesture>>,
}

impl InFlightGuard {
    #[must_use]
    pub fn new(policy: InflightPolicy) -> Self {
        Self {
            policy,
            active: HashMap::new(),
        }
    }

    #[must_use]
    pub const fn policy(&self) -> InflightPolicy {
        self.policy
    }

    #[must_use]
    pub fn is_active(&self, title: &str) -> bool {
        self.active.contains_key(title)
    }

    /// Number of gestures parked behind `title`.
    #[must_use]
    pub fn queued(&self, title: &str) -> usize {
        self.active.get(title).map_or(0, VecDeque::len)
    }

    /// Ask to issue `gesture` against `title`.
    ///
    /// On [`Admission::Proceed`] the title becomes active and must later be
    /// passed to [`release`](Self::release).
    pub fn admit(&mut self, title: &str, gesture: &Gesture) -> Admission {
        match self.active.get_mut(title) {
            None => {
                self.active.insert(title.to_string(), VecDeque::new());
                Admission::Proceed
            }
            Some(_) if self.policy == InflightPolicy::Reject => Admission::Rejected,
            Some(queue) => {
                queue.push_back(gesture.clone());
                Admission::Queued { depth: queue.len() }
            }
        }
    }

    /// Mark the outstanding mutation on `title` finished.
    ///
    /// Returns the parked gestures in arrival order; the caller replays them
    /// (the first one will be admitted again) or discards them.
    pub fn release(&mut self, title: &str) -> Vec<Gesture> {
        self.active
            .remove(title)
            .map(Vec::from)
            .unwrap_or_default()
    }
}
