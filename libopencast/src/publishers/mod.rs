//! Publishing channels
//!
//! Every channel implements [`Publisher`]. The configured set is the closed
//! [`Channel`] enum, built from configuration by [`build_channels`]. Tests
//! drive [`crate::poster::publish_all`] with [`mock::MockPublisher`] instead.
//!
//! # Examples
//!
//! ```no_run
//! use libopencast::config::Config;
//! use libopencast::publishers::{build_channels, Publisher};
//!
//! # async fn example() -> libopencast::error::Result<()> {
//! let config = Config::load(None)?;
//! for channel in build_channels(&config, None)? {
//!     let account = channel.test_connection().await?;
//!     println!("{}: {}", channel.name(), account);
//! }
//! # Ok(())
//! # }
//! ```

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use std::time::Duration;

use crate::config::Config;
use crate::error::{ConfigError, PublishError, Result};

pub mod mock;
pub mod telegram;
pub mod twitter;

pub use telegram::TelegramPublisher;
pub use twitter::TwitterPublisher;

/// Known channel names, in publishing order
pub const CHANNEL_NAMES: &[&str] = &["twitter", "telegram"];

#[async_trait]
pub trait Publisher: Send + Sync {
    fn name(&self) -> &str;

    /// Post text, returning the channel's identifier for the new message
    async fn publish(&self, text: &str) -> std::result::Result<String, PublishError>;

    /// Check credentials, returning the account the channel posts as
    async fn test_connection(&self) -> std::result::Result<String, PublishError>;
}

pub enum Channel {
    Twitter(TwitterPublisher),
    Telegram(TelegramPublisher),
}

#[async_trait]
impl Publisher for Channel {
    fn name(&self) -> &str {
        match self {
            Channel::Twitter(p) => p.name(),
            Channel::Telegram(p) => p.name(),
        }
    }

    async fn publish(&self, text: &str) -> std::result::Result<String, PublishError> {
        match self {
            Channel::Twitter(p) => p.publish(text).await,
            Channel::Telegram(p) => p.publish(text).await,
        }
    }

    async fn test_connection(&self) -> std::result::Result<String, PublishError> {
        match self {
            Channel::Twitter(p) => p.test_connection().await,
            Channel::Telegram(p) => p.test_connection().await,
        }
    }
}

/// Build the enabled channels, optionally restricted to `filter`
///
/// Naming a channel in `filter` that is unknown or not enabled is a
/// configuration error rather than a silent skip.
pub fn build_channels(config: &Config, filter: Option<&[String]>) -> Result<Vec<Channel>> {
    let enabled = config.enabled_platforms();

    if let Some(requested) = filter {
        for name in requested {
            let name = name.trim().to_lowercase();
            if !CHANNEL_NAMES.contains(&name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "unknown platform '{}' (expected one of: {})",
                    name,
                    CHANNEL_NAMES.join(", ")
                ))
                .into());
            }
            if !enabled.contains(&name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "platform '{}' is not enabled or not configured",
                    name
                ))
                .into());
            }
        }
    }

    let wanted = |name: &str| {
        filter.map_or(true, |requested| {
            requested.iter().any(|r| r.trim().eq_ignore_ascii_case(name))
        })
    };

    let mut channels = Vec::new();
    for name in enabled.into_iter().filter(|n| wanted(*n)) {
        match name {
            "twitter" => {
                if let Some(twitter) = &config.twitter {
                    channels.push(Channel::Twitter(TwitterPublisher::from_config(twitter)?));
                }
            }
            "telegram" => {
                if let Some(telegram) = &config.telegram {
                    channels.push(Channel::Telegram(TelegramPublisher::from_config(telegram)?));
                }
            }
            _ => {}
        }
    }

    tracing::debug!(count = channels.len(), "Channels built");
    Ok(channels)
}

/// `Retry-After` header in seconds, when present
pub(crate) fn retry_after_header(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

pub(crate) fn transport_error(platform: &str, error: reqwest::Error) -> PublishError {
    PublishError::TransientNetworkError(format!("{}: {}", platform, error))
}

pub(crate) fn http_client(timeout: Duration) -> std::result::Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| ConfigError::Invalid(format!("Failed to build HTTP client: {}", e)))
}
