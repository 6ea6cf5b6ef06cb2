//! Multi-channel publishing
//!
//! Channels are called one after another. A failure on one channel is
//! recorded and the next channel is still tried. Nothing is retried: a
//! request that timed out may still have been posted, and a second attempt
//! would duplicate it.

use tracing::{info, warn};

use crate::error::PublishError;
use crate::publishers::Publisher;

/// Result of publishing to a single channel
#[derive(Debug, Clone, PartialEq)]
pub struct PostResult {
    /// Channel name (e.g., "twitter", "telegram")
    pub platform: String,
    pub success: bool,
    /// Channel-specific post id (if successful and not a dry run)
    pub platform_post_id: Option<String>,
    pub error: Option<PublishError>,
    pub dry_run: bool,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublishReport {
    pub results: Vec<PostResult>,
}

impl PublishReport {
    pub fn successes(&self) -> impl Iterator<Item = &PostResult> {
        self.results.iter().filter(|r| r.success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &PostResult> {
        self.results.iter().filter(|r| !r.success)
    }

    /// True when no channel failed (including when there were no channels)
    pub fn all_succeeded(&self) -> bool {
        self.results.iter().all(|r| r.success)
    }

    /// Some channels succeeded and some failed
    pub fn is_partial(&self) -> bool {
        self.successes().next().is_some() && self.failures().next().is_some()
    }

    /// At least one channel was tried and none succeeded
    pub fn all_failed(&self) -> bool {
        !self.results.is_empty() && self.successes().next().is_none()
    }
}

/// Publish `text` to every channel in order
pub async fn publish_all<P: Publisher>(publishers: &[P], text: &str, dry_run: bool) -> PublishReport {
    let mut results = Vec::with_capacity(publishers.len());

    for publisher in publishers {
        let platform = publisher.name().to_string();

        if dry_run {
            info!(platform = %platform, "Dry run: not publishing");
            results.push(PostResult {
                platform,
                success: true,
                platform_post_id: None,
                error: None,
                dry_run: true,
            });
            continue;
        }

        match publisher.publish(text).await {
            Ok(post_id) => {
                info!(platform = %platform, post_id = %post_id, "Published");
                results.push(PostResult {
                    platform,
                    success: true,
                    platform_post_id: Some(post_id),
                    error: None,
                    dry_run: false,
                });
            }
            Err(e) => {
                warn!(platform = %platform, error = %e, "Publishing failed");
                results.push(PostResult {
                    platform,
                    success: false,
                    platform_post_id: None,
                    error: Some(e),
                    dry_run: false,
                });
            }
        }
    }

    PublishReport { results }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::publishers::mock::MockPublisher;
    use std::time::Duration;

    #[tokio::test]
    async fn test_all_channels_succeed() {
        let publishers = vec![MockPublisher::success("twitter"), MockPublisher::success("telegram")];
        let report = publish_all(&publishers, "hello #a #b", false).await;

        assert!(report.all_succeeded());
        assert!(!report.is_partial());
        assert_eq!(report.successes().count(), 2);
        assert_eq!(report.results[0].platform_post_id.as_deref(), Some("twitter-1"));
    }

    #[tokio::test]
    async fn test_failure_does_not_block_later_channels() {
        let twitter = MockPublisher::failing(
            "twitter",
            PublishError::RateLimited {
                message: "Too Many Requests".to_string(),
                retry_after: Some(Duration::from_secs(900)),
            },
        );
        let telegram = MockPublisher::success("telegram");
        let publishers = vec![twitter.clone(), telegram.clone()];

        let report = publish_all(&publishers, "hello #a #b", false).await;

        assert!(report.is_partial());
        assert!(!report.all_succeeded());
        assert!(!report.all_failed());
        let failed: Vec<_> = report.failures().map(|r| r.platform.as_str()).collect();
        assert_eq!(failed, vec!["twitter"]);
        assert!(matches!(
            report.results[0].error,
            Some(PublishError::RateLimited { .. })
        ));
        assert_eq!(twitter.published().len(), 1);
        assert_eq!(telegram.published(), vec!["hello #a #b"]);
    }

    #[tokio::test]
    async fn test_dry_run_calls_nothing() {
        let twitter = MockPublisher::success("twitter");
        let publishers = vec![twitter.clone()];

        let report = publish_all(&publishers, "hello #a #b", true).await;

        assert!(report.all_succeeded());
        assert!(report.results[0].dry_run);
        assert!(report.results[0].platform_post_id.is_none());
        assert!(twitter.published().is_empty());
    }

    #[tokio::test]
    async fn test_all_failed() {
        let publishers = vec![MockPublisher::failing(
            "telegram",
            PublishError::AuthFailure("Unauthorized".to_string()),
        )];
        let report = publish_all(&publishers, "hello #a #b", false).await;
        assert!(report.all_failed());
        assert!(!report.is_partial());
    }

    #[tokio::test]
    async fn test_no_channels() {
        let publishers: Vec<MockPublisher> = Vec::new();
        let report = publish_all(&publishers, "hello", false).await;
        assert!(report.all_succeeded());
        assert!(!report.all_failed());
    }
}
