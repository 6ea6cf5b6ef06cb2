//! Duplicate detection within a topic
//!
//! Two texts are duplicates when they are equal after lowercasing and
//! collapsing whitespace.

use std::collections::HashSet;

use crate::types::Topic;

pub fn normalize(text: &str) -> String {
    text.split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Linear scan over the topic's stored entries
pub fn is_duplicate(candidate: &str, topic: &Topic) -> bool {
    let candidate = normalize(candidate);
    topic
        .entries
        .iter()
        .any(|entry| normalize(&entry.content) == candidate)
}

/// Normalized texts of a topic, for repeated lookups during one generation run
#[derive(Debug, Default, Clone)]
pub struct DuplicateIndex {
    seen: HashSet<String>,
}

impl DuplicateIndex {
    pub fn from_topic(topic: &Topic) -> Self {
        Self {
            seen: topic.entries.iter().map(|e| normalize(&e.content)).collect(),
        }
    }

    pub fn contains(&self, candidate: &str) -> bool {
        self.seen.contains(&normalize(candidate))
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}
