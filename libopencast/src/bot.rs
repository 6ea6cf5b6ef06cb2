//! One scheduled run: generate, store, publish
//!
//! The stored entry is the durable outcome of a run. Publishing happens after
//! the store write and never rolls it back.

use async_trait::async_trait;
use tracing::{info, warn};

use crate::error::{OpenCastError, PublishError, Result};
use crate::orchestrator::{pick_topic, Orchestrator};
use crate::poster::{publish_all, PublishReport};
use crate::publishers::mock::MockPublisher;
use crate::publishers::telegram::{format_alert, TelegramPublisher};
use crate::publishers::Publisher;
use crate::types::Entry;

/// Destination for failure notices
#[async_trait]
pub trait ErrorAlert: Send + Sync {
    async fn send_error_alert(&self, message: &str) -> std::result::Result<String, PublishError>;
}

#[async_trait]
impl ErrorAlert for TelegramPublisher {
    async fn send_error_alert(&self, message: &str) -> std::result::Result<String, PublishError> {
        TelegramPublisher::send_error_alert(self, message).await
    }
}

#[async_trait]
impl ErrorAlert for MockPublisher {
    async fn send_error_alert(&self, message: &str) -> std::result::Result<String, PublishError> {
        self.publish(&format_alert(message)).await
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub category_id: String,
    pub topic: String,
    pub entry: Entry,
    pub publish: PublishReport,
}

pub struct Bot {
    orchestrator: Orchestrator,
    alerts: Option<Box<dyn ErrorAlert>>,
}

impl Bot {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self {
            orchestrator,
            alerts: None,
        }
    }

    /// Send a notice through `alerts` whenever generation fails
    pub fn with_alerts(mut self, alerts: Box<dyn ErrorAlert>) -> Self {
        self.alerts = Some(alerts);
        self
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Generate and store one entry, then publish it to every channel
    ///
    /// Without a topic, the least-used topic of the category is chosen.
    pub async fn run<P: Publisher>(
        &self,
        category_id: &str,
        topic: Option<&str>,
        channels: &[P],
        dry_run: bool,
    ) -> Result<RunReport> {
        let outcome = self.generate(category_id, topic).await;
        let (topic, entry) = match outcome {
            Ok(generated) => generated,
            Err(e) => {
                self.alert(category_id, &e).await;
                return Err(e);
            }
        };

        let publish = publish_all(channels, &entry.content, dry_run).await;
        if publish.is_partial() {
            warn!(
                category_id,
                failed = publish.failures().count(),
                "Some channels failed; entry remains stored"
            );
        }

        info!(
            category_id,
            topic = %topic,
            published = publish.successes().count(),
            channels = channels.len(),
            "Run complete"
        );

        Ok(RunReport {
            category_id: category_id.to_string(),
            topic,
            entry,
            publish,
        })
    }

    /// Generate and store without publishing
    pub async fn generate(&self, category_id: &str, topic: Option<&str>) -> Result<(String, Entry)> {
        let topic = match topic {
            Some(name) => name.to_string(),
            None => {
                let category = self.orchestrator.store().load(category_id)?;
                let picked = pick_topic(&category).ok_or_else(|| {
                    OpenCastError::NotFound(format!("any topic in category '{}'", category_id))
                })?;
                info!(category_id, topic = %picked.topic, "Picked topic");
                picked.topic.clone()
            }
        };

        let entry = self
            .orchestrator
            .generate_and_store(category_id, &topic)
            .await?;
        Ok((topic, entry))
    }

    async fn alert(&self, category_id: &str, error: &OpenCastError) {
        let Some(alerts) = &self.alerts else {
            return;
        };
        let message = format!("Category: {}\nError: {}", category_id, error);
        if let Err(e) = alerts.send_error_alert(&message).await {
            warn!(category_id, error = %e, "Error alert could not be delivered");
        }
    }
}
