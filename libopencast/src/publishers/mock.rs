//! Mock publisher for testing
//!
//! Records every text it is asked to publish and answers with a fixed
//! outcome, so publishing logic can be exercised without credentials or
//! network access.

use async_trait::async_trait;
use std::sync::{Arc, Mutex};

use crate::error::PublishError;
use crate::publishers::Publisher;

#[derive(Clone)]
pub struct MockPublisher {
    name: String,
    outcome: Result<String, PublishError>,
    published: Arc<Mutex<Vec<String>>>,
}

impl MockPublisher {
    /// Succeeds with `<name>-<n>` as the post id
    pub fn success(name: &str) -> Self {
        Self {
            name: name.to_string(),
            outcome: Ok(String::new()),
            published: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn failing(name: &str, error: PublishError) -> Self {
        Self {
            outcome: Err(error),
            ..Self::success(name)
        }
    }

    pub fn published(&self) -> Vec<String> {
        self.published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

#[async_trait]
impl Publisher for MockPublisher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn publish(&self, text: &str) -> Result<String, PublishError> {
        let mut published = self
            .published
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        published.push(text.to_string());
        match &self.outcome {
            Ok(_) => Ok(format!("{}-{}", self.name, published.len())),
            Err(e) => Err(e.clone()),
        }
    }

    async fn test_connection(&self) -> Result<String, PublishError> {
        match &self.outcome {
            Ok(_) => Ok(format!("@{}", self.name)),
            Err(e) => Err(e.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_success_records_text() {
        let publisher = MockPublisher::success("twitter");
        assert_eq!(publisher.publish("first").await.unwrap(), "twitter-1");
        assert_eq!(publisher.publish("second").await.unwrap(), "twitter-2");
        assert_eq!(publisher.published(), vec!["first", "second"]);
    }

    #[tokio::test]
    async fn test_failure_still_records_attempt() {
        let publisher = MockPublisher::failing(
            "telegram",
            PublishError::PayloadRejected("chat not found".to_string()),
        );
        assert!(publisher.publish("text").await.is_err());
        assert!(publisher.test_connection().await.is_err());
        assert_eq!(publisher.published().len(), 1);
    }
}
