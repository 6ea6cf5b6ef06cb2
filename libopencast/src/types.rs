//! Core types for OpenCast
//!
//! A category file holds a prompt template, validation overrides and an
//! ordered list of topics. Each topic accumulates the entries generated for it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{OpenCastError, Result};

pub const TOPIC_PLACEHOLDER: &str = "{topic}";

/// Language tag used when a category file does not specify one
pub const DEFAULT_LANGUAGE: &str = "tr";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMetadata {
    /// Length of the content in characters, hashtags included
    pub length: usize,
    /// Provenance of the content (e.g. "openai")
    pub source: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// One accepted, stored piece of generated content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub content: String,
    pub metadata: EntryMetadata,
    #[serde(default = "Utc::now", with = "lenient_datetime")]
    pub created_at: DateTime<Utc>,
}

impl Entry {
    pub fn new(content: String, source: &str, tags: Vec<String>) -> Self {
        let length = content.chars().count();
        Self {
            content,
            metadata: EntryMetadata {
                length,
                source: source.to_string(),
                tags,
            },
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub topic: String,
    #[serde(default)]
    pub entries: Vec<Entry>,
}

impl Topic {
    pub fn new(name: &str) -> Self {
        Self {
            topic: name.trim().to_string(),
            entries: Vec::new(),
        }
    }

    pub fn matches(&self, name: &str) -> bool {
        self.topic.to_lowercase() == name.trim().to_lowercase()
    }
}

/// Length and hashtag rules resolved for one category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRules {
    pub min_length: usize,
    pub max_length: usize,
    pub required_hashtags: usize,
}

impl ContentRules {
    /// Reject rules no text can satisfy
    pub fn check(&self, category_id: &str) -> Result<()> {
        if self.min_length > self.max_length {
            return Err(invalid(&format!(
                "category '{}' resolves to min_length {} greater than max_length {}",
                category_id, self.min_length, self.max_length
            )));
        }
        Ok(())
    }
}

impl Default for ContentRules {
    fn default() -> Self {
        Self {
            min_length: 20,
            max_length: 220,
            required_hashtags: 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub category_id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub prompt_template: Option<String>,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub min_length: Option<usize>,
    #[serde(default)]
    pub max_length: Option<usize>,
    #[serde(default)]
    pub required_hashtags: Option<usize>,
    #[serde(default = "Utc::now", with = "lenient_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(default = "Utc::now", with = "lenient_datetime")]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub topics: Vec<Topic>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl Category {
    pub fn new(category_id: &str, name: &str, description: &str) -> Self {
        let now = Utc::now();
        Self {
            category_id: category_id.trim().to_lowercase().replace(' ', "-"),
            name: name.trim().to_string(),
            description: description.to_string(),
            prompt_template: None,
            language: default_language(),
            min_length: None,
            max_length: None,
            required_hashtags: None,
            created_at: now,
            updated_at: now,
            topics: Vec::new(),
        }
    }

    pub fn with_topics(mut self, names: &[&str]) -> Self {
        self.topics.extend(names.iter().map(|name| Topic::new(name)));
        self
    }

    pub fn with_prompt_template(mut self, template: &str) -> Self {
        self.prompt_template = Some(template.to_string());
        self
    }

    /// Look up a topic by name, ignoring case
    pub fn topic(&self, name: &str) -> Option<&Topic> {
        self.topics.iter().find(|t| t.matches(name))
    }

    pub fn topic_mut(&mut self, name: &str) -> Option<&mut Topic> {
        self.topics.iter_mut().find(|t| t.matches(name))
    }

    pub fn total_entries(&self) -> usize {
        self.topics.iter().map(|t| t.entries.len()).sum()
    }

    /// Category overrides layered over the configured defaults
    pub fn rules(&self, defaults: &ContentRules) -> ContentRules {
        ContentRules {
            min_length: self.min_length.unwrap_or(defaults.min_length),
            max_length: self.max_length.unwrap_or(defaults.max_length),
            required_hashtags: self.required_hashtags.unwrap_or(defaults.required_hashtags),
        }
    }

    pub fn prompt_template_or<'a>(&'a self, default: &'a str) -> &'a str {
        self.prompt_template.as_deref().unwrap_or(default)
    }

    /// Structural checks applied whenever a category file is read
    pub fn check(&self) -> Result<()> {
        if self.category_id.trim().is_empty() {
            return Err(invalid("category_id cannot be empty"));
        }
        if self.name.trim().is_empty() {
            return Err(invalid(&format!(
                "category '{}' has an empty name",
                self.category_id
            )));
        }
        if let Some(template) = &self.prompt_template {
            if !template.contains(TOPIC_PLACEHOLDER) {
                return Err(invalid(&format!(
                    "prompt template of '{}' must contain {}",
                    self.category_id, TOPIC_PLACEHOLDER
                )));
            }
        }
        if let (Some(min), Some(max)) = (self.min_length, self.max_length) {
            if min > max {
                return Err(invalid(&format!(
                    "category '{}' has min_length {} greater than max_length {}",
                    self.category_id, min, max
                )));
            }
        }
        if self.topics.iter().any(|t| t.topic.trim().is_empty()) {
            return Err(invalid(&format!(
                "category '{}' contains a topic with an empty name",
                self.category_id
            )));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> OpenCastError {
    OpenCastError::InvalidData(message.to_string())
}

/// Timestamps are written as RFC 3339. Older category files carry naive
/// local timestamps without an offset; those are read as UTC.
mod lenient_datetime {
    use chrono::{DateTime, NaiveDateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(parsed) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(parsed.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(&raw, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| naive.and_utc())
            .map_err(serde::de::Error::custom)
    }
}
