// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 robotat.dev

//! Registry of topics observed on the broker.
//!
//! Grows monotonically for the lifetime of the process; topic cardinality
//! is bounded by the device count, so entries are never pruned. Shared
//! between the broker receive loop and viewer `list_topics` queries.

use std::collections::BTreeSet;
use std::sync::{Mutex, PoisonError};

/// Deduplicated set of observed topic names, sorted on query.
#[derive(Debug, Default)]
pub struct TopicRegistry {
    topics: Mutex<BTreeSet<String>>,
}

impl TopicRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a topic. Recording an already-known topic is a no-op.
    pub fn record(&self, topic: &str) {
        let mut topics = self.lock();
        if !topics.contains(topic) {
            topics.insert(topic.to_string());
        }
    }

    /// Lexicographically sorted snapshot of every topic seen so far.
    pub fn snapshot(&self) -> Vec<String> {
        self.lock().iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, BTreeSet<String>> {
        self.topics.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
